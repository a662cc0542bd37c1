//! Offline analysis of a metrics log.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use super::record::{round2, FrameMetrics, MetricsRecord};

/// Parse a newline-delimited metrics log. Blank lines are skipped.
pub fn read_jsonl<P: AsRef<Path>>(path: P) -> Result<Vec<MetricsRecord>> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("failed to open metrics log {}", path.display()))?;
    let mut records = Vec::new();
    for (lineno, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("failed to read {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line)
            .with_context(|| format!("invalid record at {}:{}", path.display(), lineno + 1))?;
        records.push(record);
    }
    Ok(records)
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct StageMeans {
    pub decode: f64,
    pub inference: f64,
    pub tracking: f64,
    pub postprocess: f64,
    pub e2e: f64,
}

/// Aggregate statistics over one run.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct MetricsSummary {
    pub processed: usize,
    pub dropped: usize,
    pub avg_fps: f64,
    pub p50_latency_ms: f64,
    pub p95_latency_ms: f64,
    pub mean_latency_ms: StageMeans,
    pub peak_memory_mb: Option<f64>,
}

impl MetricsSummary {
    pub fn from_records(records: &[MetricsRecord]) -> Self {
        let processed: Vec<_> = records.iter().filter_map(MetricsRecord::as_processed).collect();
        let dropped = records.len() - processed.len();
        if processed.is_empty() {
            return Self {
                dropped,
                ..Self::default()
            };
        }

        let mean = |f: fn(&FrameMetrics) -> f64| round2(mean_of(&processed, f));

        let mut e2e: Vec<f64> = processed.iter().map(|m| m.latency_ms.e2e).collect();
        e2e.sort_by(f64::total_cmp);

        let peak_memory_mb = processed
            .iter()
            .filter_map(|m| m.memory_mb)
            .reduce(f64::max);

        Self {
            processed: processed.len(),
            dropped,
            avg_fps: mean(|m| m.fps),
            p50_latency_ms: round2(quantile(&e2e, 0.5)),
            p95_latency_ms: round2(quantile(&e2e, 0.95)),
            mean_latency_ms: StageMeans {
                decode: mean(|m| m.latency_ms.decode),
                inference: mean(|m| m.latency_ms.inference),
                tracking: mean(|m| m.latency_ms.tracking),
                postprocess: mean(|m| m.latency_ms.postprocess),
                e2e: mean(|m| m.latency_ms.e2e),
            },
            peak_memory_mb,
        }
    }

    /// FPS ratio of `other` over `self`; `None` when this run has no FPS.
    pub fn speedup(&self, other: &MetricsSummary) -> Option<f64> {
        (self.avg_fps > 0.0).then(|| round2(other.avg_fps / self.avg_fps))
    }
}

fn mean_of(items: &[&FrameMetrics], f: fn(&FrameMetrics) -> f64) -> f64 {
    items.iter().map(|m| f(m)).sum::<f64>() / items.len() as f64
}

/// Quantile of sorted data, linear interpolation between order statistics.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        len => {
            let pos = q.clamp(0.0, 1.0) * (len - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{DroppedFrame, LatencyBreakdown};

    fn processed(frame: u64, e2e: f64, memory_mb: Option<f64>) -> MetricsRecord {
        MetricsRecord::Processed(FrameMetrics {
            frame,
            fps: 1000.0 / e2e,
            latency_ms: LatencyBreakdown {
                decode: 1.0,
                inference: e2e - 2.0,
                tracking: 0.5,
                postprocess: 0.5,
                e2e,
            },
            memory_mb,
            detections: 1,
            tracks: 1,
        })
    }

    #[test]
    fn quantiles_interpolate() {
        let data = [10.0, 20.0, 30.0, 40.0];
        assert_eq!(quantile(&data, 0.5), 25.0);
        assert!((quantile(&data, 0.95) - 38.5).abs() < 1e-9);
        assert_eq!(quantile(&[7.0], 0.95), 7.0);
        assert_eq!(quantile(&[], 0.5), 0.0);
    }

    #[test]
    fn summarises_processed_and_dropped() {
        let records = vec![
            processed(0, 10.0, Some(100.0)),
            MetricsRecord::Dropped(DroppedFrame::new(1)),
            processed(2, 20.0, Some(120.0)),
            processed(3, 40.0, None),
        ];
        let s = MetricsSummary::from_records(&records);
        assert_eq!(s.processed, 3);
        assert_eq!(s.dropped, 1);
        assert_eq!(s.p50_latency_ms, 20.0);
        assert_eq!(s.mean_latency_ms.decode, 1.0);
        assert_eq!(s.peak_memory_mb, Some(120.0));
        assert_eq!(s.avg_fps, round2((100.0 + 50.0 + 25.0) / 3.0));
    }

    #[test]
    fn empty_run_summary() {
        let s = MetricsSummary::from_records(&[MetricsRecord::Dropped(DroppedFrame::new(0))]);
        assert_eq!(s.processed, 0);
        assert_eq!(s.dropped, 1);
        assert_eq!(s.speedup(&s), None);
    }

    #[test]
    fn speedup_compares_fps() {
        let slow = MetricsSummary::from_records(&[processed(0, 40.0, None)]);
        let fast = MetricsSummary::from_records(&[processed(0, 10.0, None)]);
        assert_eq!(slow.speedup(&fast), Some(4.0));
    }

    #[test]
    fn reads_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.jsonl");
        std::fs::write(
            &path,
            "{\"frame\":0,\"dropped\":true}\n\n{\"frame\":1,\"fps\":50.0,\"latency_ms\":{\"decode\":1.0,\"inference\":17.0,\"tracking\":1.0,\"postprocess\":1.0,\"e2e\":20.0},\"memory_mb\":null,\"detections\":0,\"tracks\":0}\n",
        )
        .unwrap();
        let records = read_jsonl(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].is_dropped());
        assert_eq!(records[1].as_processed().unwrap().fps, 50.0);
    }
}
