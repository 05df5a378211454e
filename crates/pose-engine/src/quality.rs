//! Adaptive quality control.
//!
//! Small hysteretic steps keep detection throughput near a target: below 80%
//! of the target the pipeline skips more frames and accepts weaker poses;
//! above 120% it backs off. Inside the band nothing changes.

use serde::{Deserialize, Serialize};

pub const MIN_FRAME_SKIP: u32 = 1;
pub const MAX_FRAME_SKIP: u32 = 4;
pub const MIN_CONFIDENCE_FLOOR: f64 = 0.1;
pub const MIN_CONFIDENCE_CAP: f64 = 0.7;

const DEGRADE_BELOW: f64 = 0.8;
const IMPROVE_ABOVE: f64 = 1.2;
const DEGRADE_CONFIDENCE_STEP: f64 = 0.1;
const IMPROVE_CONFIDENCE_STEP: f64 = 0.05;

/// Direction of a quality adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityStep {
    /// Throughput too low: cheaper detection.
    Degrade,
    /// Throughput comfortably high: better detection.
    Improve,
    /// Within the band.
    Hold,
}

/// Settings the quality controller is allowed to change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualitySettings {
    pub frame_skip: u32,
    pub min_confidence: f64,
}

/// Classify achieved throughput against the target.
///
/// Non-finite or non-positive inputs hold.
pub fn quality_step(current_fps: f64, target_fps: f64) -> QualityStep {
    if !current_fps.is_finite() || !target_fps.is_finite() || target_fps <= 0.0 {
        return QualityStep::Hold;
    }
    if current_fps < DEGRADE_BELOW * target_fps {
        QualityStep::Degrade
    } else if current_fps > IMPROVE_ABOVE * target_fps {
        QualityStep::Improve
    } else {
        QualityStep::Hold
    }
}

impl QualitySettings {
    /// Apply one step, respecting the frame-skip and confidence bounds.
    pub fn apply(self, step: QualityStep) -> Self {
        match step {
            QualityStep::Degrade => Self {
                frame_skip: self.frame_skip.saturating_add(1).min(MAX_FRAME_SKIP),
                min_confidence: (self.min_confidence - DEGRADE_CONFIDENCE_STEP)
                    .max(MIN_CONFIDENCE_FLOOR),
            },
            QualityStep::Improve => Self {
                frame_skip: self.frame_skip.saturating_sub(1).max(MIN_FRAME_SKIP),
                min_confidence: (self.min_confidence + IMPROVE_CONFIDENCE_STEP)
                    .min(MIN_CONFIDENCE_CAP),
            },
            QualityStep::Hold => self,
        }
    }

    /// Convenience for `apply(quality_step(current, target))`.
    pub fn adjust(self, current_fps: f64, target_fps: f64) -> Self {
        self.apply(quality_step(current_fps, target_fps))
    }
}
