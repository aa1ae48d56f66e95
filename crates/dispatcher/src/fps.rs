//! Rolling throughput meter per binding.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

const DEFAULT_WINDOW: Duration = Duration::from_secs(1);
const DEFAULT_MAX_SAMPLES: usize = 120;

/// Rolling dispatch-rate estimator.
///
/// Keeps recent dispatch instants inside a bounded window; purely
/// observational, never blocks, carries no correctness invariant beyond
/// reporting close to the true event rate.
#[derive(Debug)]
pub struct FpsMeter {
    samples: VecDeque<Instant>,
    window: Duration,
    max_samples: usize,
}

impl Default for FpsMeter {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW, DEFAULT_MAX_SAMPLES)
    }
}

impl FpsMeter {
    /// Create a meter with an explicit window and sample bound.
    pub fn new(window: Duration, max_samples: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(max_samples),
            window,
            max_samples: max_samples.max(1),
        }
    }

    /// Record one dispatched bundle.
    pub fn tick(&mut self) {
        let now = Instant::now();
        self.samples.push_back(now);
        self.prune(now);
    }

    /// Instantaneous rate estimate: events inside the window divided by the
    /// window length.
    pub fn fps(&self) -> f64 {
        let now = Instant::now();
        let in_window = self
            .samples
            .iter()
            .filter(|t| now.duration_since(**t) <= self.window)
            .count();
        in_window as f64 / self.window.as_secs_f64()
    }

    /// Drop all samples (binding teardown).
    pub fn reset(&mut self) {
        self.samples.clear();
    }

    fn prune(&mut self, now: Instant) {
        while self.samples.len() > self.max_samples {
            self.samples.pop_front();
        }
        while let Some(front) = self.samples.front() {
            if now.duration_since(*front) > self.window {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }
}
