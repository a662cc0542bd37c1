//! Decoded video frames.
//!
//! A `Frame` owns one RGB24 image. Frames are produced by an ingest source,
//! handed to the detector for the duration of one pipeline iteration, and
//! dropped at the end of that iteration.

use anyhow::{anyhow, Result};

/// Bytes per pixel for the RGB24 layout every source produces.
pub const CHANNELS: usize = 3;

pub struct Frame {
    /// Row-major RGB24 pixels, `width * height * 3` bytes.
    data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    /// Wrap decoded pixels. The buffer length must match the dimensions.
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(CHANNELS))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if data.len() != expected {
            return Err(anyhow!(
                "expected {} RGB bytes for {}x{}, received {}",
                expected,
                width,
                height,
                data.len()
            ));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// A zero-size frame, what a source yields for a corrupt or blank read.
    pub fn empty() -> Self {
        Self {
            data: Vec::new(),
            width: 0,
            height: 0,
        }
    }

    /// True when the frame carries no image data.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty() || self.width == 0 || self.height == 0
    }

    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    /// Integer luma (BT.601 weights) at `(x, y)`.
    #[inline]
    pub fn luma(&self, x: u32, y: u32) -> u8 {
        let idx = (y as usize * self.width as usize + x as usize) * CHANNELS;
        let r = self.data[idx] as u32;
        let g = self.data[idx + 1] as u32;
        let b = self.data[idx + 2] as u32;
        ((299 * r + 587 * g + 114 * b) / 1000) as u8
    }

    /// Luma plane, one byte per pixel.
    pub fn luma_plane(&self) -> Vec<u8> {
        self.data
            .chunks_exact(CHANNELS)
            .map(|px| ((299 * px[0] as u32 + 587 * px[1] as u32 + 114 * px[2] as u32) / 1000) as u8)
            .collect()
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_mismatched_buffer() {
        assert!(Frame::new(vec![0; 10], 2, 2).is_err());
        assert!(Frame::new(vec![0; 12], 2, 2).is_ok());
    }

    #[test]
    fn empty_frame_is_empty() {
        assert!(Frame::empty().is_empty());
        assert!(Frame::new(Vec::new(), 0, 480).unwrap().is_empty());
        assert!(!Frame::new(vec![0; 3], 1, 1).unwrap().is_empty());
    }

    #[test]
    fn luma_matches_plane() {
        let frame = Frame::new(vec![255, 255, 255, 10, 20, 30], 2, 1).unwrap();
        let plane = frame.luma_plane();
        assert_eq!(plane, vec![frame.luma(0, 0), frame.luma(1, 0)]);
        assert_eq!(plane[0], 255);
    }
}
