use anyhow::Result;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::Detection;
use crate::frame::Frame;

/// Luma delta above which a pixel counts as changed.
const DEFAULT_PIXEL_DELTA: u8 = 25;
/// Changed-pixel count at which confidence reaches 0.5.
const DEFAULT_HALF_CONFIDENCE_PIXELS: usize = 64;

pub const MOTION_CLASS_ID: i32 = 0;
pub const MOTION_CLASS_NAME: &str = "motion";

/// CPU backend: frame differencing against the previous frame.
///
/// Emits at most one detection per frame, covering every pixel whose luma
/// moved by more than the delta threshold.
pub struct MotionBackend {
    previous: Option<(u32, u32, Vec<u8>)>,
    conf_threshold: f32,
    pixel_delta: u8,
    half_confidence_pixels: usize,
}

impl MotionBackend {
    pub fn new(conf_threshold: f32) -> Self {
        Self {
            previous: None,
            conf_threshold,
            pixel_delta: DEFAULT_PIXEL_DELTA,
            half_confidence_pixels: DEFAULT_HALF_CONFIDENCE_PIXELS,
        }
    }

    fn diff(&self, prev: &[u8], curr: &[u8], width: u32) -> Option<Detection> {
        let width = width as usize;
        let (mut x1, mut y1, mut x2, mut y2) = (usize::MAX, usize::MAX, 0usize, 0usize);
        let mut changed = 0usize;

        for (i, (a, b)) in prev.iter().zip(curr).enumerate() {
            if a.abs_diff(*b) <= self.pixel_delta {
                continue;
            }
            let (x, y) = (i % width, i / width);
            x1 = x1.min(x);
            y1 = y1.min(y);
            x2 = x2.max(x);
            y2 = y2.max(y);
            changed += 1;
        }

        if changed == 0 {
            return None;
        }

        let confidence = changed as f32 / (changed + self.half_confidence_pixels) as f32;
        if confidence < self.conf_threshold {
            return None;
        }

        Some(Detection::new(
            [x1 as f32, y1 as f32, (x2 + 1) as f32, (y2 + 1) as f32],
            confidence,
            MOTION_CLASS_ID,
            MOTION_CLASS_NAME,
        ))
    }
}

impl Default for MotionBackend {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl DetectorBackend for MotionBackend {
    fn name(&self) -> &'static str {
        "motion"
    }

    fn detect(&mut self, frame: Option<&Frame>) -> Result<Vec<Detection>> {
        let Some(frame) = frame.filter(|f| !f.is_empty()) else {
            return Ok(Vec::new());
        };

        let luma = frame.luma_plane();
        let detection = match &self.previous {
            Some((w, h, prev)) if *w == frame.width && *h == frame.height => {
                self.diff(prev, &luma, frame.width)
            }
            _ => None,
        };
        self.previous = Some((frame.width, frame.height, luma));

        Ok(detection.into_iter().collect())
    }
}
