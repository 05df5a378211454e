//! Smoothing strategies for center-of-mass samples.
//!
//! Smoothing is opt-in. With [`SmoothingStrategy::Identity`] samples pass
//! through untouched and speeds are derived from raw measurements.

use std::collections::VecDeque;

use kinetrace_common::config::SmoothingConfig;
use kinetrace_pose_model::Point3;

/// Available smoothing strategies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SmoothingStrategy {
    /// No smoothing: raw samples pass through.
    Identity,

    /// Single-pole low-pass filter.
    ///
    /// `alpha` is in (0.0, 1.0]; `smoothed = alpha * current + (1 - alpha) * previous`.
    Exponential { alpha: f64 },

    /// Mean of the last `window` raw samples.
    WindowAverage { window: usize },
}

impl From<SmoothingConfig> for SmoothingStrategy {
    fn from(config: SmoothingConfig) -> Self {
        match config {
            SmoothingConfig::Identity => Self::Identity,
            SmoothingConfig::Exponential { alpha } => Self::Exponential {
                alpha: alpha.clamp(f64::EPSILON, 1.0),
            },
            SmoothingConfig::WindowAverage { window } => Self::WindowAverage {
                window: window.max(1),
            },
        }
    }
}

/// Stateful smoother applying a [`SmoothingStrategy`] to a sample stream.
#[derive(Debug, Clone)]
pub struct PointSmoother {
    strategy: SmoothingStrategy,
    previous: Option<Point3>,
    window: VecDeque<Point3>,
}

impl PointSmoother {
    pub fn new(strategy: SmoothingStrategy) -> Self {
        Self {
            strategy,
            previous: None,
            window: VecDeque::new(),
        }
    }

    pub fn strategy(&self) -> SmoothingStrategy {
        self.strategy
    }

    /// Feed one raw sample and get the smoothed value.
    pub fn apply(&mut self, sample: Point3) -> Point3 {
        match self.strategy {
            SmoothingStrategy::Identity => sample,
            SmoothingStrategy::Exponential { alpha } => {
                let smoothed = match self.previous {
                    Some(prev) => sample * alpha + prev * (1.0 - alpha),
                    None => sample,
                };
                self.previous = Some(smoothed);
                smoothed
            }
            SmoothingStrategy::WindowAverage { window } => {
                if self.window.len() == window {
                    self.window.pop_front();
                }
                self.window.push_back(sample);
                let sum = self
                    .window
                    .iter()
                    .fold(Point3::ZERO, |acc, p| acc + *p);
                sum / self.window.len() as f64
            }
        }
    }

    /// Forget all state.
    pub fn reset(&mut self) {
        self.previous = None;
        self.window.clear();
    }
}

impl Default for PointSmoother {
    fn default() -> Self {
        Self::new(SmoothingStrategy::Identity)
    }
}
