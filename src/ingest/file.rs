//! Local file frame source.
//!
//! `FileSource` opens either a local video file (FFmpeg backend, feature
//! `ingest-file-ffmpeg`) or a `stub://` synthetic stream. Synthetic streams
//! take their shape from the query string:
//!
//! `stub://name?frames=120&width=320&height=240&drop_every=25`
//!
//! They draw a bright square sliding over a dark background, and every
//! `drop_every`-th read (1-based) yields an empty frame.

use std::path::Path;

use anyhow::{anyhow, Result};

#[cfg(feature = "ingest-file-ffmpeg")]
use super::file_ffmpeg::FfmpegFileSource;
use super::{ReadOutcome, VideoSource};
use crate::frame::{Frame, CHANNELS};

const STUB_SCHEME: &str = "stub://";

/// Local file frame source.
pub struct FileSource {
    path: String,
    backend: Option<FileBackend>,
    frames_read: u64,
}

enum FileBackend {
    Synthetic(SyntheticFileSource),
    #[cfg(feature = "ingest-file-ffmpeg")]
    Ffmpeg(FfmpegFileSource),
}

impl FileSource {
    /// Open a source. Fails when the path is not local, does not exist, or
    /// cannot be decoded by any compiled-in backend.
    pub fn open(path: &str) -> Result<Self> {
        if !is_local_file_path(path) {
            return Err(anyhow!(
                "file ingestion only supports local paths or stub:// (got '{}')",
                path
            ));
        }
        let backend = if let Some(rest) = path.strip_prefix(STUB_SCHEME) {
            let spec = SyntheticSpec::parse(rest)?;
            FileBackend::Synthetic(SyntheticFileSource::new(spec))
        } else {
            if !Path::new(path).exists() {
                return Err(anyhow!("video file not found: {}", path));
            }
            open_decoder(path)?
        };
        log::info!("FileSource: opened {}", path);
        Ok(Self {
            path: path.to_string(),
            backend: Some(backend),
            frames_read: 0,
        })
    }

    pub fn is_open(&self) -> bool {
        self.backend.is_some()
    }

    /// Get frame statistics.
    pub fn stats(&self) -> FileStats {
        FileStats {
            frames_read: self.frames_read,
            path: self.path.clone(),
        }
    }
}

#[cfg(feature = "ingest-file-ffmpeg")]
fn open_decoder(path: &str) -> Result<FileBackend> {
    Ok(FileBackend::Ffmpeg(FfmpegFileSource::open(path)?))
}

#[cfg(not(feature = "ingest-file-ffmpeg"))]
fn open_decoder(path: &str) -> Result<FileBackend> {
    Err(anyhow!(
        "cannot open {}: file decoding requires the ingest-file-ffmpeg feature",
        path
    ))
}

impl VideoSource for FileSource {
    fn read(&mut self) -> Result<ReadOutcome> {
        let outcome = match self.backend.as_mut() {
            None => return Err(anyhow!("read from released source {}", self.path)),
            Some(FileBackend::Synthetic(source)) => source.read()?,
            #[cfg(feature = "ingest-file-ffmpeg")]
            Some(FileBackend::Ffmpeg(source)) => source.read()?,
        };
        if matches!(outcome, ReadOutcome::Frame(_)) {
            self.frames_read += 1;
        }
        Ok(outcome)
    }

    fn release(&mut self) {
        if self.backend.take().is_some() {
            log::info!(
                "FileSource: released {} after {} reads",
                self.path,
                self.frames_read
            );
        }
    }
}

impl Drop for FileSource {
    fn drop(&mut self) {
        self.release();
    }
}

/// Statistics for a file source.
#[derive(Clone, Debug)]
pub struct FileStats {
    pub frames_read: u64,
    pub path: String,
}

// ----------------------------------------------------------------------------
// Synthetic source (stub://)
// ----------------------------------------------------------------------------

/// Shape of a synthetic stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyntheticSpec {
    pub frames: u64,
    pub width: u32,
    pub height: u32,
    /// Every n-th read is an empty frame. 0 disables drops.
    pub drop_every: u64,
}

impl Default for SyntheticSpec {
    fn default() -> Self {
        Self {
            frames: 100,
            width: 320,
            height: 240,
            drop_every: 0,
        }
    }
}

impl SyntheticSpec {
    /// Parse the part of a stub URL after the scheme.
    pub fn parse(rest: &str) -> Result<Self> {
        let mut spec = Self::default();
        let Some((_, query)) = rest.split_once('?') else {
            return Ok(spec);
        };
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| anyhow!("malformed stub parameter '{}'", pair))?;
            let parsed: u64 = value
                .parse()
                .map_err(|_| anyhow!("stub parameter '{}' must be an integer", key))?;
            match key {
                "frames" => spec.frames = parsed,
                "width" => spec.width = to_u32(key, parsed)?,
                "height" => spec.height = to_u32(key, parsed)?,
                "drop_every" => spec.drop_every = parsed,
                other => return Err(anyhow!("unknown stub parameter '{}'", other)),
            }
        }
        if spec.width == 0 || spec.height == 0 {
            return Err(anyhow!("stub frame dimensions must be non-zero"));
        }
        Ok(spec)
    }
}

fn to_u32(key: &str, value: u64) -> Result<u32> {
    u32::try_from(value).map_err(|_| anyhow!("stub parameter '{}' is too large", key))
}

struct SyntheticFileSource {
    spec: SyntheticSpec,
    frame_count: u64,
}

impl SyntheticFileSource {
    fn new(spec: SyntheticSpec) -> Self {
        Self {
            spec,
            frame_count: 0,
        }
    }

    fn read(&mut self) -> Result<ReadOutcome> {
        if self.frame_count >= self.spec.frames {
            return Ok(ReadOutcome::EndOfStream);
        }
        self.frame_count += 1;

        if self.spec.drop_every > 0 && self.frame_count % self.spec.drop_every == 0 {
            return Ok(ReadOutcome::Frame(Frame::empty()));
        }
        let pixels = self.generate_synthetic_pixels();
        Ok(ReadOutcome::Frame(Frame::new(
            pixels,
            self.spec.width,
            self.spec.height,
        )?))
    }

    fn generate_synthetic_pixels(&self) -> Vec<u8> {
        let (w, h) = (self.spec.width as usize, self.spec.height as usize);
        let side = (w.min(h) / 6).max(1);
        let span = w.saturating_sub(side).max(1);
        let x0 = (self.frame_count as usize * 2) % span;
        let y0 = (h - side) / 2;

        let mut pixels = vec![16u8; w * h * CHANNELS];
        for y in y0..y0 + side {
            let row = y * w;
            for x in x0..(x0 + side).min(w) {
                let idx = (row + x) * CHANNELS;
                pixels[idx..idx + CHANNELS].copy_from_slice(&[235, 235, 235]);
            }
        }
        pixels
    }
}

fn is_local_file_path(path: &str) -> bool {
    if path.trim().is_empty() {
        return false;
    }
    if path.starts_with(STUB_SCHEME) {
        return true;
    }
    !path.contains("://")
}
