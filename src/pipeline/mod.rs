//! Frame orchestration.
//!
//! `PipelineRunner` drives acquire, detect, track and validate strictly in
//! sequence, one frame at a time, and emits one metrics record per iteration.
//! Cancellation is cooperative and only observed between frames.

mod runner;
mod timing;
mod validate;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub use runner::{open_source, run_video, PipelineRunner, RunReport, RunState};
pub use timing::{timed, FpsWindow, StageTimings};
pub use validate::validate_outputs;

/// Shared interruption flag, set from a signal handler or another thread.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
