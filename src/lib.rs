//! Traffyx: real-time detection and tracking pipeline.
//!
//! # Architecture
//!
//! A run pulls frames from a video source one at a time and pushes each
//! through four strictly sequential stages:
//!
//! 1. **Decode**: read the next frame; an empty read is a dropped frame.
//! 2. **Inference**: a detector backend turns the frame into detections.
//! 3. **Tracking**: a greedy IoU tracker assigns persistent track ids.
//! 4. **Postprocess**: outputs are validated against their contract.
//!
//! Every stage is timed. The runner keeps a rolling FPS window over
//! end-to-end latency and emits one metrics record per frame.
//!
//! # Module Structure
//!
//! - `geometry`: boxes and IoU
//! - `tracker`: `Tracker` and its configuration
//! - `frame`: owned RGB frame buffers
//! - `ingest`: video sources (synthetic `stub://`, local files)
//! - `detect`: detector backends (motion, replay, ONNX)
//! - `pipeline`: the frame orchestrator, timing and validation
//! - `metrics`: per-frame records, sinks, offline summaries
//! - `config`: file and environment configuration

pub mod config;
pub mod detect;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod ingest;
pub mod metrics;
pub mod pipeline;
mod track;
pub mod tracker;
pub mod ui;

pub use config::PipelineConfig;
pub use detect::{select_backend, Detection, DetectorBackend, DetectorSettings};
pub use error::{ContractViolation, PipelineError};
pub use frame::Frame;
pub use geometry::{iou, BBox};
pub use ingest::{FileSource, ReadOutcome, VideoSource};
pub use metrics::{InMemoryMetricsSink, JsonlMetricsLogger, MetricsRecord, MetricsSink};
pub use pipeline::{run_video, CancelToken, PipelineRunner, RunReport, RunState};
pub use track::TrackSnapshot;
pub use tracker::{Tracker, TrackerConfig};
