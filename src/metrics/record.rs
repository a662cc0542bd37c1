use serde::{Deserialize, Serialize};

/// Round to two decimals, the precision every emitted float carries.
#[inline]
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Stage latencies in milliseconds. `e2e` is the sum of the other four.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencyBreakdown {
    pub decode: f64,
    pub inference: f64,
    pub tracking: f64,
    pub postprocess: f64,
    pub e2e: f64,
}

/// Record for a frame that went through detection, tracking and validation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameMetrics {
    pub frame: u64,
    pub fps: f64,
    pub latency_ms: LatencyBreakdown,
    pub memory_mb: Option<f64>,
    pub detections: usize,
    pub tracks: usize,
}

/// Marker for a frame that yielded no image data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DroppedFrame {
    pub frame: u64,
    pub dropped: bool,
}

impl DroppedFrame {
    pub fn new(frame: u64) -> Self {
        Self {
            frame,
            dropped: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricsRecord {
    Processed(FrameMetrics),
    Dropped(DroppedFrame),
}

impl MetricsRecord {
    pub fn frame(&self) -> u64 {
        match self {
            MetricsRecord::Processed(m) => m.frame,
            MetricsRecord::Dropped(d) => d.frame,
        }
    }

    pub fn is_dropped(&self) -> bool {
        matches!(self, MetricsRecord::Dropped(_))
    }

    pub fn as_processed(&self) -> Option<&FrameMetrics> {
        match self {
            MetricsRecord::Processed(m) => Some(m),
            MetricsRecord::Dropped(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn processed_record_has_expected_shape() {
        let record = MetricsRecord::Processed(FrameMetrics {
            frame: 7,
            fps: 42.5,
            latency_ms: LatencyBreakdown {
                decode: 1.25,
                inference: 20.0,
                tracking: 0.5,
                postprocess: 0.01,
                e2e: 21.76,
            },
            memory_mb: None,
            detections: 3,
            tracks: 2,
        });
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            json!({
                "frame": 7,
                "fps": 42.5,
                "latency_ms": {
                    "decode": 1.25,
                    "inference": 20.0,
                    "tracking": 0.5,
                    "postprocess": 0.01,
                    "e2e": 21.76
                },
                "memory_mb": null,
                "detections": 3,
                "tracks": 2
            })
        );
    }

    #[test]
    fn dropped_marker_is_distinct() {
        let line = serde_json::to_string(&MetricsRecord::Dropped(DroppedFrame::new(3))).unwrap();
        assert_eq!(line, r#"{"frame":3,"dropped":true}"#);

        let parsed: MetricsRecord = serde_json::from_str(&line).unwrap();
        assert!(parsed.is_dropped());
        assert_eq!(parsed.frame(), 3);
    }

    #[test]
    fn rounds_to_two_decimals() {
        assert_eq!(round2(1.23456), 1.23);
        assert_eq!(round2(99.999), 100.0);
    }
}
