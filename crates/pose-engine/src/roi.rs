//! Region-of-interest gate for choosing which detected person to track.
//!
//! A pose passes when at least 60% of its visible central landmarks (nose,
//! shoulders, elbows, hips) lie inside the box. Counting only visible points
//! keeps the gate usable under partial occlusion.

use kinetrace_common::config::RoiConfig;
use kinetrace_pose_model::{LandmarkSet, RoiBox, CENTRAL_LANDMARKS};

/// Central landmarks at or below this visibility are not counted.
pub const ROI_VISIBILITY_THRESHOLD: f64 = 0.3;

/// Minimum fraction of counted landmarks that must be inside the box.
pub const ROI_INSIDE_RATIO: f64 = 0.6;

#[derive(Debug, Clone, Default)]
pub struct RoiGate {
    enabled: bool,
    region: Option<RoiBox>,
}

impl RoiGate {
    /// A disabled gate without a region.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &RoiConfig) -> Self {
        Self {
            enabled: config.enabled,
            region: config.region.map(|r| RoiBox::new(r.x, r.y, r.w, r.h)),
        }
    }

    /// Set the region and enable the gate.
    pub fn set_region(&mut self, region: RoiBox) {
        self.region = Some(region);
        self.enabled = true;
    }

    /// Remove the region and disable the gate.
    pub fn clear(&mut self) {
        self.region = None;
        self.enabled = false;
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Flip the enabled flag, keeping the region. Returns the new state.
    pub fn toggle(&mut self) -> bool {
        self.enabled = !self.enabled;
        self.enabled
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn region(&self) -> Option<RoiBox> {
        self.region
    }

    /// Whether the gate filters anything at all.
    pub fn is_active(&self) -> bool {
        self.enabled && self.region.is_some()
    }

    /// Fraction of visible central landmarks inside `region`, or `None` when
    /// no central landmark is visible.
    pub fn inside_ratio(region: &RoiBox, landmarks: &LandmarkSet) -> Option<f64> {
        let mut counted = 0usize;
        let mut inside = 0usize;

        for idx in CENTRAL_LANDMARKS {
            let Some(lm) = landmarks.get(idx) else {
                continue;
            };
            if !lm.is_visible(ROI_VISIBILITY_THRESHOLD) {
                continue;
            }
            counted += 1;
            if region.contains(lm.x, lm.y) {
                inside += 1;
            }
        }

        (counted > 0).then(|| inside as f64 / counted as f64)
    }

    /// Whether a pose qualifies. Always true while the gate is inactive.
    pub fn accepts(&self, landmarks: &LandmarkSet) -> bool {
        let Some(region) = self.region.filter(|_| self.enabled) else {
            return true;
        };
        match Self::inside_ratio(&region, landmarks) {
            Some(ratio) => ratio >= ROI_INSIDE_RATIO,
            None => false,
        }
    }
}
