use anyhow::Result;

use crate::detect::result::Detection;
use crate::frame::Frame;

/// Detector backend trait.
///
/// Backends are owned by one pipeline run and called sequentially, one frame
/// at a time. An absent frame yields an empty list, never an error.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Device the backend executes on ("cpu", "replay", ...).
    fn device(&self) -> &str {
        "cpu"
    }

    /// Optional warm-up hook, run once before the first frame.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }

    /// Run detection on a frame.
    fn detect(&mut self, frame: Option<&Frame>) -> Result<Vec<Detection>>;
}

impl<B: DetectorBackend + ?Sized> DetectorBackend for Box<B> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn device(&self) -> &str {
        (**self).device()
    }

    fn warm_up(&mut self) -> Result<()> {
        (**self).warm_up()
    }

    fn detect(&mut self, frame: Option<&Frame>) -> Result<Vec<Detection>> {
        (**self).detect(frame)
    }
}
