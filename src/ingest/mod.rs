//! Frame ingestion sources.
//!
//! A source is opened once per run, read until it reports end of stream, and
//! released exactly once. Reads may block on I/O but are bounded by the
//! source itself; end of stream is a normal termination, not an error.
//!
//! Available backends:
//! - `stub://` synthetic streams (tests, demos)
//! - Local video files (feature: ingest-file-ffmpeg)

pub mod file;
#[cfg(feature = "ingest-file-ffmpeg")]
pub(crate) mod file_ffmpeg;

use anyhow::Result;

use crate::frame::Frame;

pub use file::{FileSource, FileStats, SyntheticSpec};

/// Result of one read from a video source.
#[derive(Debug)]
pub enum ReadOutcome {
    /// A decoded frame. May be empty (zero-size) for a corrupt read.
    Frame(Frame),
    EndOfStream,
}

/// Sequential frame source.
pub trait VideoSource {
    /// Read the next frame. Errors are mid-stream failures.
    fn read(&mut self) -> Result<ReadOutcome>;

    /// Release the underlying handle. Idempotent.
    fn release(&mut self);
}

impl<S: VideoSource + ?Sized> VideoSource for &mut S {
    fn read(&mut self) -> Result<ReadOutcome> {
        (**self).read()
    }

    fn release(&mut self) {
        (**self).release()
    }
}

impl<S: VideoSource + ?Sized> VideoSource for Box<S> {
    fn read(&mut self) -> Result<ReadOutcome> {
        (**self).read()
    }

    fn release(&mut self) {
        (**self).release()
    }
}
