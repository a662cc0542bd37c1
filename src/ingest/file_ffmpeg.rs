//! Local file frame source using FFmpeg.
//!
//! Packets are decoded in-memory and converted to RGB24. A packet the decoder
//! rejects as invalid data surfaces as an empty frame so the pipeline can
//! record it as dropped; any other decoder error is a mid-stream failure.

use anyhow::{anyhow, Context, Result};
use ffmpeg_next as ffmpeg;

use super::ReadOutcome;
use crate::frame::Frame;

pub(crate) struct FfmpegFileSource {
    path: String,
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    eof_sent: bool,
}

impl FfmpegFileSource {
    pub(crate) fn open(path: &str) -> Result<Self> {
        ffmpeg::init().context("initialize ffmpeg")?;
        let input = ffmpeg::format::input(&path)
            .with_context(|| format!("failed to open video '{}' with ffmpeg", path))?;
        let input_stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| anyhow!("'{}' has no video track", path))?;
        let stream_index = input_stream.index();
        let context = ffmpeg::codec::context::Context::from_parameters(input_stream.parameters())
            .context("load video decoder parameters")?;
        let decoder = context
            .decoder()
            .video()
            .context("open ffmpeg video decoder")?;

        let scaler = ffmpeg::software::scaling::context::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg::util::format::pixel::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .context("create ffmpeg scaler")?;

        Ok(Self {
            path: path.to_string(),
            input,
            stream_index,
            decoder,
            scaler,
            eof_sent: false,
        })
    }

    pub(crate) fn read(&mut self) -> Result<ReadOutcome> {
        if let Some(frame) = self.receive()? {
            return Ok(ReadOutcome::Frame(frame));
        }

        while !self.eof_sent {
            let Some((stream, packet)) = self.input.packets().next() else {
                self.decoder
                    .send_eof()
                    .context("flush ffmpeg decoder")?;
                self.eof_sent = true;
                break;
            };
            if stream.index() != self.stream_index {
                continue;
            }
            match self.decoder.send_packet(&packet) {
                Ok(()) => {}
                Err(ffmpeg::Error::InvalidData) => {
                    log::warn!("FileSource: corrupt packet in {}", self.path);
                    return Ok(ReadOutcome::Frame(Frame::empty()));
                }
                Err(e) => return Err(e).context("send packet to ffmpeg decoder"),
            }
            if let Some(frame) = self.receive()? {
                return Ok(ReadOutcome::Frame(frame));
            }
        }

        match self.receive()? {
            Some(frame) => Ok(ReadOutcome::Frame(frame)),
            None => Ok(ReadOutcome::EndOfStream),
        }
    }

    fn receive(&mut self) -> Result<Option<Frame>> {
        let mut decoded = ffmpeg::frame::Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return Ok(None);
        }
        if decoded.width() == 0 || decoded.height() == 0 {
            return Ok(Some(Frame::empty()));
        }
        let mut rgb_frame = ffmpeg::frame::Video::empty();
        self.scaler
            .run(&decoded, &mut rgb_frame)
            .context("scale frame to RGB")?;
        let (pixels, width, height) = frame_to_pixels(&rgb_frame)?;
        Ok(Some(Frame::new(pixels, width, height)?))
    }
}

fn frame_to_pixels(frame: &ffmpeg::frame::Video) -> Result<(Vec<u8>, u32, u32)> {
    let width = frame.width();
    let height = frame.height();
    let row_bytes = (width as usize) * 3;
    let stride = frame.stride(0);
    let data = frame.data(0);

    if stride == row_bytes {
        let plane = data
            .get(..row_bytes * height as usize)
            .context("ffmpeg frame plane is truncated")?;
        return Ok((plane.to_vec(), width, height));
    }

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        let end = start + row_bytes;
        pixels.extend_from_slice(
            data.get(start..end)
                .context("ffmpeg frame row is out of bounds")?,
        );
    }

    Ok((pixels, width, height))
}
