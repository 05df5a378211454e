//! Segment-weighted center of mass and center-of-gravity height.
//!
//! # Algorithm
//!
//! 1. For each body segment, keep member landmarks that are finite and
//!    visible (visibility > 0.5).
//! 2. Average the kept landmarks into a segment centroid.
//! 3. Sum `centroid * weight` over segments that have a centroid; segments
//!    without one are left out of the total weight, so the remaining weights
//!    are re-normalized under partial visibility.

use kinetrace_pose_model::{BodySegment, LandmarkSet, Point3, COG_HEIGHT_WEIGHTS};

/// Landmarks at or below this visibility are ignored.
pub const VISIBILITY_THRESHOLD: f64 = 0.5;

/// Centroid of the qualifying landmarks of one segment.
pub fn segment_centroid(landmarks: &LandmarkSet, segment: BodySegment) -> Option<Point3> {
    let mut sum = Point3::ZERO;
    let mut count = 0usize;

    for idx in segment.landmarks() {
        if let Some(lm) = landmarks.get(idx) {
            if lm.is_finite() && lm.is_visible(VISIBILITY_THRESHOLD) {
                sum = sum + Point3::new(lm.x, lm.y, lm.z);
                count += 1;
            }
        }
    }

    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Whole-body center of mass.
///
/// Returns `None` when no segment qualifies or the result is not finite.
pub fn compute_com(landmarks: &LandmarkSet) -> Option<Point3> {
    let mut weighted = Point3::ZERO;
    let mut total_weight = 0.0;

    for segment in BodySegment::ALL {
        if let Some(centroid) = segment_centroid(landmarks, segment) {
            let weight = segment.weight();
            weighted = weighted + centroid * weight;
            total_weight += weight;
        }
    }

    if total_weight <= 0.0 {
        return None;
    }

    let com = weighted / total_weight;
    com.is_finite().then_some(com)
}

/// Vertical position of the approximate mass center, from hips, knees and
/// ankles weighted 0.3 / 0.2 / 0.1.
pub fn compute_cog_height(landmarks: &LandmarkSet) -> Option<f64> {
    let mut weighted = 0.0;
    let mut total_weight = 0.0;

    for (idx, weight) in COG_HEIGHT_WEIGHTS {
        if let Some(lm) = landmarks.get(idx) {
            if lm.y.is_finite() && lm.is_visible(VISIBILITY_THRESHOLD) {
                weighted += lm.y * weight;
                total_weight += weight;
            }
        }
    }

    if total_weight <= 0.0 {
        return None;
    }

    let height = weighted / total_weight;
    height.is_finite().then_some(height)
}
