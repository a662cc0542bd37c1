use std::collections::VecDeque;
use std::time::Instant;

use crate::metrics::{round2, LatencyBreakdown};

/// Guard added to the average latency before inverting it.
pub const FPS_EPSILON: f64 = 1e-6;

/// Run `f`, storing its wall time in milliseconds into `slot`.
pub fn timed<T>(slot: &mut f64, f: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    let out = f();
    *slot = start.elapsed().as_secs_f64() * 1000.0;
    out
}

/// Per-frame stage latencies in milliseconds.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StageTimings {
    pub decode: f64,
    pub inference: f64,
    pub tracking: f64,
    pub postprocess: f64,
}

impl StageTimings {
    /// Sum of the four stages. Not a wall-clock span.
    pub fn e2e(&self) -> f64 {
        self.decode + self.inference + self.tracking + self.postprocess
    }

    /// Breakdown rounded to two decimals, `e2e` computed before rounding.
    pub fn breakdown(&self) -> LatencyBreakdown {
        LatencyBreakdown {
            decode: round2(self.decode),
            inference: round2(self.inference),
            tracking: round2(self.tracking),
            postprocess: round2(self.postprocess),
            e2e: round2(self.e2e()),
        }
    }
}

/// Rolling window of the most recent end-to-end latencies.
#[derive(Clone, Debug)]
pub struct FpsWindow {
    samples: VecDeque<f64>,
    window_size: usize,
}

impl FpsWindow {
    pub fn new(window_size: usize) -> Self {
        let window_size = window_size.max(1);
        Self {
            samples: VecDeque::with_capacity(window_size + 1),
            window_size,
        }
    }

    /// Append a sample, evicting the oldest once the window is over capacity.
    pub fn push(&mut self, e2e_ms: f64) {
        self.samples.push_back(e2e_ms);
        while self.samples.len() > self.window_size {
            self.samples.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Mean latency over the window, 0 when empty.
    pub fn avg_latency(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    /// Instantaneous FPS from the average latency, 0 when empty.
    pub fn fps(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        1000.0 / (self.avg_latency() + FPS_EPSILON)
    }

    pub fn oldest(&self) -> Option<f64> {
        self.samples.front().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steady_10ms_is_100_fps() {
        let mut w = FpsWindow::new(30);
        for _ in 0..30 {
            w.push(10.0);
        }
        assert_eq!(w.len(), 30);
        assert!((w.avg_latency() - 10.0).abs() < 1e-9);
        assert!((w.fps() - 100.0).abs() < 1e-3);
    }

    #[test]
    fn window_never_exceeds_capacity() {
        let mut w = FpsWindow::new(3);
        for v in [1.0, 2.0, 3.0, 4.0] {
            w.push(v);
        }
        assert_eq!(w.len(), 3);
        assert_eq!(w.oldest(), Some(2.0));
        assert!((w.avg_latency() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn empty_window_reports_zero() {
        let w = FpsWindow::new(5);
        assert_eq!(w.avg_latency(), 0.0);
        assert_eq!(w.fps(), 0.0);
    }

    #[test]
    fn zero_latency_does_not_divide_by_zero() {
        let mut w = FpsWindow::new(2);
        w.push(0.0);
        assert!(w.fps().is_finite());
    }

    #[test]
    fn e2e_is_sum_of_stages() {
        let t = StageTimings {
            decode: 1.111,
            inference: 20.222,
            tracking: 0.333,
            postprocess: 0.044,
        };
        assert!((t.e2e() - 21.71).abs() < 1e-9);
        let b = t.breakdown();
        assert_eq!(b.e2e, 21.71);
        assert_eq!(b.decode, 1.11);
    }

    #[test]
    fn timed_records_elapsed() {
        let mut slot = -1.0;
        let v = timed(&mut slot, || 7);
        assert_eq!(v, 7);
        assert!(slot >= 0.0);
    }
}
