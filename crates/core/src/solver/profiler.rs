//! Tick timing: a scope guard that traces its lifetime and a smoothed timer
use std::time::Instant;
use tracing::trace;

/// Measures from creation; logs the elapsed time at `trace` level on drop.
pub struct ProfilerScope {
    start: Instant,
    name: &'static str,
}

impl ProfilerScope {
    /// Start timing `name`
    pub fn new(name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            name,
        }
    }

    /// Milliseconds since creation
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for ProfilerScope {
    fn drop(&mut self) {
        trace!(scope = self.name, elapsed_ms = self.elapsed_ms(), "Scope finished");
    }
}

/// Keeps the last and smoothed tick duration.
#[derive(Debug, Clone, Default)]
pub struct FrameTimer {
    last_frame_time_ms: f64,
    average_ms: f64,
    samples: u64,
}

impl FrameTimer {
    /// Smoothing factor for the moving average.
    const ALPHA: f64 = 0.1;

    /// Timer with no samples
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one tick duration (ms)
    pub fn record(&mut self, time_ms: f64) {
        self.average_ms = if self.samples == 0 {
            time_ms
        } else {
            self.average_ms + Self::ALPHA * (time_ms - self.average_ms)
        };
        self.last_frame_time_ms = time_ms;
        self.samples += 1;
    }

    /// Most recent sample (ms)
    pub fn last_frame_time_ms(&self) -> f64 {
        self.last_frame_time_ms
    }

    /// Exponential moving average of recorded frame times.
    pub fn average_ms(&self) -> f64 {
        self.average_ms
    }
}
