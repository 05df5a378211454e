//! Clock and timing utilities for detection pacing.
//!
//! The detection pipeline measures time in fractional milliseconds through
//! the [`Clock`] trait. Live sessions use [`MonotonicClock`]; replays drive a
//! [`ManualClock`] from video timestamps so throttling follows media time.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Instant;

/// Source of monotonic time in milliseconds.
pub trait Clock: Send + Sync {
    /// Milliseconds since an arbitrary fixed origin.
    fn now_ms(&self) -> f64;
}

/// A wall clock that provides monotonic timestamps relative to the moment
/// it was started.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    /// The instant the clock started.
    epoch: Instant,

    /// Wall-clock time at epoch (ISO 8601 string).
    epoch_wall: String,
}

impl MonotonicClock {
    /// Create a new clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Wall-clock time at clock start.
    pub fn epoch_wall(&self) -> &str {
        &self.epoch_wall
    }

    /// Get seconds elapsed since clock start.
    pub fn elapsed_secs(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::start()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64() * 1000.0
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: Mutex<f64>,
}

impl ManualClock {
    pub fn new(start_ms: f64) -> Self {
        Self {
            now_ms: Mutex::new(start_ms),
        }
    }

    /// Jump to an absolute time.
    pub fn set_ms(&self, ms: f64) {
        *self.lock() = ms;
    }

    /// Move forward by `delta_ms`.
    pub fn advance_ms(&self, delta_ms: f64) {
        *self.lock() += delta_ms;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, f64> {
        self.now_ms.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        *self.lock()
    }
}

/// Minimum-interval throttle for detector invocations.
///
/// Unlike a tick counter, the throttle is only re-armed by [`mark`], which the
/// caller invokes after a detection succeeds.
///
/// [`mark`]: DetectionThrottle::mark
#[derive(Debug, Clone)]
pub struct DetectionThrottle {
    min_interval_ms: f64,
    last_mark_ms: Option<f64>,
}

impl DetectionThrottle {
    /// Create a throttle allowing at most `max_fps` marks per second.
    pub fn new(max_fps: f64) -> Self {
        Self {
            min_interval_ms: interval_for(max_fps),
            last_mark_ms: None,
        }
    }

    /// Whether enough time has passed since the last mark.
    /// Always true before the first mark.
    pub fn is_ready(&self, now_ms: f64) -> bool {
        match self.last_mark_ms {
            None => true,
            Some(last) => now_ms - last >= self.min_interval_ms,
        }
    }

    /// Record a completed detection.
    pub fn mark(&mut self, now_ms: f64) {
        self.last_mark_ms = Some(now_ms);
    }

    /// Change the rate without forgetting the last mark.
    pub fn set_max_fps(&mut self, max_fps: f64) {
        self.min_interval_ms = interval_for(max_fps);
    }

    /// Forget the last mark.
    pub fn reset(&mut self) {
        self.last_mark_ms = None;
    }

    /// Minimum interval in milliseconds.
    pub fn interval_ms(&self) -> f64 {
        self.min_interval_ms
    }
}

fn interval_for(max_fps: f64) -> f64 {
    if max_fps.is_finite() && max_fps > 0.0 {
        1000.0 / max_fps
    } else {
        0.0
    }
}

/// Rolling throughput estimate from recent operation durations.
#[derive(Debug, Clone)]
pub struct FpsEstimator {
    window: usize,
    durations_ms: VecDeque<f64>,
}

impl FpsEstimator {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            durations_ms: VecDeque::with_capacity(window),
        }
    }

    /// Record the duration of one operation.
    pub fn record(&mut self, duration_ms: f64) {
        if !duration_ms.is_finite() || duration_ms < 0.0 {
            return;
        }
        if self.durations_ms.len() == self.window {
            self.durations_ms.pop_front();
        }
        self.durations_ms.push_back(duration_ms);
    }

    /// Operations per second implied by the mean recorded duration.
    /// Zero until something has been recorded.
    pub fn fps(&self) -> f64 {
        if self.durations_ms.is_empty() {
            return 0.0;
        }
        let mean = self.durations_ms.iter().sum::<f64>() / self.durations_ms.len() as f64;
        if mean <= f64::EPSILON {
            return 0.0;
        }
        1000.0 / mean
    }

    pub fn sample_count(&self) -> usize {
        self.durations_ms.len()
    }

    pub fn reset(&mut self) {
        self.durations_ms.clear();
    }
}

impl Default for FpsEstimator {
    fn default() -> Self {
        Self::new(30)
    }
}
