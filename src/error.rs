use thiserror::Error;

/// Output contract breach detected by the post-process validator.
///
/// These indicate a broken upstream component, never a transient condition.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContractViolation {
    #[error("detection {index} bbox malformed: {bbox:?}")]
    MalformedBBox { index: usize, bbox: Vec<f32> },
    #[error("detection {index} confidence {confidence} outside [0, 1]")]
    ConfidenceOutOfRange { index: usize, confidence: f32 },
    #[error("track {index} has invalid id {track_id}")]
    InvalidTrackId { index: usize, track_id: u64 },
}

/// Run-level failure taxonomy.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("video source {path} unavailable: {reason}")]
    SourceUnavailable { path: String, reason: String },

    #[error("detector initialization failed: {0:#}")]
    DetectorInit(#[source] anyhow::Error),

    #[error("contract violation at frame {frame_index}: {violation}")]
    ContractViolation {
        frame_index: u64,
        violation: ContractViolation,
    },

    #[error("pipeline aborted at frame {frame_index}: {source:#}")]
    FrameFailed {
        frame_index: u64,
        #[source]
        source: anyhow::Error,
    },

    /// Metrics log could not be opened or closed.
    #[error("metrics sink failed: {0:#}")]
    Metrics(#[source] anyhow::Error),

    #[error("metrics record for frame {frame_index} not written: {source:#}")]
    MetricsWrite {
        frame_index: u64,
        #[source]
        source: anyhow::Error,
    },
}

impl PipelineError {
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, PipelineError::ContractViolation { .. })
    }

    /// Frame index at which a mid-stream failure happened.
    pub fn frame_index(&self) -> Option<u64> {
        match self {
            PipelineError::ContractViolation { frame_index, .. }
            | PipelineError::FrameFailed { frame_index, .. }
            | PipelineError::MetricsWrite { frame_index, .. } => Some(*frame_index),
            _ => None,
        }
    }
}
