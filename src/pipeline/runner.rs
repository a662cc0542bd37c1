//! Frame orchestration loop.

use crate::config::{PerformanceSettings, PipelineConfig};
use crate::detect::{select_backend, DetectorBackend};
use crate::error::{ContractViolation, PipelineError};
use crate::frame::Frame;
use crate::ingest::{FileSource, ReadOutcome, VideoSource};
use crate::metrics::memory::resident_memory_mb;
use crate::metrics::{
    round2, DroppedFrame, FrameMetrics, JsonlMetricsLogger, MetricsRecord, MetricsSink,
};
use crate::pipeline::timing::{timed, FpsWindow, StageTimings};
use crate::pipeline::validate::validate_outputs;
use crate::pipeline::CancelToken;
use crate::tracker::Tracker;

/// How a run that did not abort came to an end.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    /// Source reported end of stream.
    Drained,
    /// Cancelled between frames; a clean termination.
    Interrupted,
}

/// Outcome of a run that terminated without error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunReport {
    pub final_state: RunState,
    /// Loop iterations that yielded a frame, dropped ones included.
    pub frames_seen: u64,
    pub frames_processed: u64,
    pub frames_dropped: u64,
}

/// Drives decode, detect, track and validate over one video source.
///
/// A runner owns its detector, tracker and FPS window for exactly one run;
/// `run` consumes it. The metrics sink is closed when the run ends, whatever
/// the outcome.
pub struct PipelineRunner<D, M> {
    detector: D,
    tracker: Tracker,
    sink: M,
    performance: PerformanceSettings,
    window: FpsWindow,
    cancel: CancelToken,
    frame_index: u64,
    processed: u64,
    dropped: u64,
}

impl PipelineRunner<Box<dyn DetectorBackend>, JsonlMetricsLogger> {
    /// Build the detector and a JSONL metrics log from `config`.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, PipelineError> {
        let detector =
            select_backend(&config.detector_settings()).map_err(PipelineError::DetectorInit)?;
        let sink =
            JsonlMetricsLogger::create(config.metrics_path()).map_err(PipelineError::Metrics)?;
        Ok(Self::new(config, detector, sink))
    }
}

impl<D: DetectorBackend, M: MetricsSink> PipelineRunner<D, M> {
    pub fn new(config: &PipelineConfig, detector: D, sink: M) -> Self {
        Self {
            detector,
            tracker: Tracker::new(config.tracker),
            sink,
            performance: config.performance.clone(),
            window: FpsWindow::new(config.performance.fps_window),
            cancel: CancelToken::new(),
            frame_index: 0,
            processed: 0,
            dropped: 0,
        }
    }

    /// Share an externally owned cancellation flag.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Run until the source drains, the token is cancelled, or a frame fails.
    ///
    /// The source is released and the sink closed on every path. Errors carry
    /// the index of the frame that failed.
    pub fn run<S: VideoSource>(mut self, mut source: S) -> Result<RunReport, PipelineError> {
        log::info!(
            "pipeline starting (detector={}, device={})",
            self.detector.name(),
            self.detector.device()
        );
        let streamed = self.stream(&mut source);

        source.release();
        let closed = self.sink.close().map_err(PipelineError::Metrics);

        let state = match (streamed, closed) {
            (Ok(state), Ok(())) => state,
            (Ok(_), Err(e)) => return Err(self.abort(e)),
            (Err(e), closed) => {
                if let Err(close_err) = closed {
                    log::error!("{}", close_err);
                }
                return Err(self.abort(e));
            }
        };

        let report = RunReport {
            final_state: state,
            frames_seen: self.frame_index,
            frames_processed: self.processed,
            frames_dropped: self.dropped,
        };
        log::info!(
            "pipeline {:?}: {} frames ({} processed, {} dropped)",
            state,
            report.frames_seen,
            report.frames_processed,
            report.frames_dropped
        );
        Ok(report)
    }

    fn abort(&self, e: PipelineError) -> PipelineError {
        log::error!("critical error at frame {}: {}", self.frame_index, e);
        e
    }

    fn stream<S: VideoSource>(&mut self, source: &mut S) -> Result<RunState, PipelineError> {
        loop {
            if self.cancel.is_cancelled() {
                log::warn!("interrupted by user at frame {}", self.frame_index);
                return Ok(RunState::Interrupted);
            }

            let frame_index = self.frame_index;
            let mut timings = StageTimings::default();
            let outcome = timed(&mut timings.decode, || source.read())
                .map_err(|source| PipelineError::FrameFailed {
                    frame_index,
                    source,
                })?;
            let frame = match outcome {
                ReadOutcome::Frame(frame) => frame,
                ReadOutcome::EndOfStream => {
                    log::info!("end of stream after {} frames", frame_index);
                    return Ok(RunState::Drained);
                }
            };

            if frame.is_empty() {
                log::warn!("frame {} is empty, dropping", frame_index);
                self.emit(frame_index, MetricsRecord::Dropped(DroppedFrame::new(frame_index)))?;
                self.dropped += 1;
            } else {
                self.process(frame_index, &frame, timings)?;
                self.processed += 1;
            }
            self.frame_index += 1;
        }
    }

    fn process(
        &mut self,
        frame_index: u64,
        frame: &Frame,
        mut timings: StageTimings,
    ) -> Result<(), PipelineError> {
        let detector = &mut self.detector;
        let detections = timed(&mut timings.inference, || detector.detect(Some(frame)))
            .map_err(|source| match source.downcast::<ContractViolation>() {
                Ok(violation) => PipelineError::ContractViolation {
                    frame_index,
                    violation,
                },
                Err(source) => PipelineError::FrameFailed {
                    frame_index,
                    source,
                },
            })?;

        let tracker = &mut self.tracker;
        let tracks = timed(&mut timings.tracking, || tracker.update(&detections));

        timed(&mut timings.postprocess, || {
            validate_outputs(&detections, &tracks)
        })
        .map_err(|violation| PipelineError::ContractViolation {
            frame_index,
            violation,
        })?;

        let e2e = timings.e2e();
        self.window.push(e2e);
        let fps = self.window.fps();
        let memory_mb = if self.performance.measure_memory {
            resident_memory_mb().map(round2)
        } else {
            None
        };

        let record = MetricsRecord::Processed(FrameMetrics {
            frame: frame_index,
            fps: round2(fps),
            latency_ms: timings.breakdown(),
            memory_mb,
            detections: detections.len(),
            tracks: tracks.len(),
        });
        self.emit(frame_index, record)?;

        if frame_index % self.performance.log_every_n_frames.max(1) == 0 {
            log::info!(
                "[Frame {}] FPS: {:.1} | E2E: {:.1} ms | Tracks: {}",
                frame_index,
                fps,
                e2e,
                tracks.len()
            );
        }
        Ok(())
    }

    fn emit(&mut self, frame_index: u64, record: MetricsRecord) -> Result<(), PipelineError> {
        self.sink
            .log(&record)
            .map_err(|source| PipelineError::MetricsWrite {
                frame_index,
                source,
            })
    }
}

/// Open a video source, mapping failures to `SourceUnavailable`.
pub fn open_source(path: &str) -> Result<FileSource, PipelineError> {
    FileSource::open(path).map_err(|e| PipelineError::SourceUnavailable {
        path: path.to_string(),
        reason: format!("{:#}", e),
    })
}

/// Open `video`, build a runner from `config`, and run it to completion.
///
/// The source is opened first so an unreadable path leaves no metrics log.
pub fn run_video(
    video: &str,
    config: &PipelineConfig,
    cancel: CancelToken,
) -> Result<RunReport, PipelineError> {
    let source = open_source(video)?;
    PipelineRunner::from_config(config)?
        .with_cancel(cancel)
        .run(source)
}
