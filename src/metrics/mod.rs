//! Per-frame metrics records and where they go.
//!
//! The pipeline emits one record per loop iteration: a full `FrameMetrics`
//! for processed frames, a `DroppedFrame` marker for skipped ones. Records
//! are newline-delimited JSON when written to disk.

pub mod memory;
mod record;
mod sink;
pub mod summary;

pub use record::{round2, DroppedFrame, FrameMetrics, LatencyBreakdown, MetricsRecord};
pub use sink::{default_log_path, InMemoryMetricsSink, JsonlMetricsLogger, MetricsSink};
pub use summary::{read_jsonl, MetricsSummary};
