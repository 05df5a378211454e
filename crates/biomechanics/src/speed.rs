//! Velocity and speed derivation from successive pose updates.
//!
//! Each update computes the center of mass from world landmarks and the
//! center-of-gravity height from image landmarks, appends the center of mass
//! to the motion history, and derives velocity from the two newest samples.
//! Published metrics are replaced as a whole: a reader sees either the
//! previous coherent state or the new one.

use kinetrace_common::config::MotionConfig;
use kinetrace_pose_model::{LandmarkIndex, LandmarkSet, Point3};
use serde::{Deserialize, Serialize};

use crate::com::{compute_cog_height, compute_com, VISIBILITY_THRESHOLD};
use crate::history::{MotionHistory, MotionSample, DEFAULT_HISTORY_CAPACITY};
use crate::smoothing::{PointSmoother, SmoothingStrategy};

/// Default upper bound for published speeds (m/s).
pub const DEFAULT_MAX_SPEED: f64 = 50.0;

/// Samples further apart than this (seconds) are treated as a seek.
pub const MAX_TIME_DELTA_SECS: f64 = 1.0;

/// Latest published motion metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedMetrics {
    pub center_of_mass: Point3,
    pub center_of_gravity_height: f64,
    /// Center-of-mass velocity (units per second).
    pub velocity: Point3,
    /// Magnitude of `velocity`, clamped.
    pub speed: f64,
    /// Magnitude of the horizontal (x, z) velocity, clamped.
    pub general_moving_speed: f64,
    /// Speed of `speed_landmark`, clamped; zero when it was not visible.
    pub landmark_speed: f64,
    pub speed_landmark: LandmarkIndex,
    pub is_valid: bool,
}

impl SpeedMetrics {
    fn zeroed(speed_landmark: LandmarkIndex) -> Self {
        Self {
            center_of_mass: Point3::ZERO,
            center_of_gravity_height: 0.0,
            velocity: Point3::ZERO,
            speed: 0.0,
            general_moving_speed: 0.0,
            landmark_speed: 0.0,
            speed_landmark,
            is_valid: false,
        }
    }
}

impl Default for SpeedMetrics {
    fn default() -> Self {
        Self::zeroed(LandmarkIndex::RightFootIndex)
    }
}

/// Configuration for the speed calculator.
#[derive(Debug, Clone)]
pub struct SpeedConfig {
    pub history_capacity: usize,
    pub speed_landmark: LandmarkIndex,
    pub max_speed: f64,
    pub smoothing: SmoothingStrategy,
}

impl Default for SpeedConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            speed_landmark: LandmarkIndex::RightFootIndex,
            max_speed: DEFAULT_MAX_SPEED,
            smoothing: SmoothingStrategy::Identity,
        }
    }
}

impl From<&MotionConfig> for SpeedConfig {
    fn from(config: &MotionConfig) -> Self {
        let speed_landmark = LandmarkIndex::from_index(config.speed_landmark).unwrap_or_else(|| {
            tracing::warn!(
                index = config.speed_landmark,
                "Unknown speed landmark, using right_foot_index"
            );
            LandmarkIndex::RightFootIndex
        });
        let max_speed = if config.max_speed.is_finite() && config.max_speed > 0.0 {
            config.max_speed
        } else {
            DEFAULT_MAX_SPEED
        };
        Self {
            history_capacity: config.history_capacity,
            speed_landmark,
            max_speed,
            smoothing: config.smoothing.into(),
        }
    }
}

/// Maintains motion history and publishes [`SpeedMetrics`].
#[derive(Debug, Clone)]
pub struct SpeedCalculator {
    config: SpeedConfig,
    history: MotionHistory,
    smoother: PointSmoother,
    latest_world: Option<LandmarkSet>,
    previous_world: Option<LandmarkSet>,
    metrics: SpeedMetrics,
}

impl SpeedCalculator {
    pub fn new(config: SpeedConfig) -> Self {
        Self {
            history: MotionHistory::new(config.history_capacity),
            smoother: PointSmoother::new(config.smoothing),
            latest_world: None,
            previous_world: None,
            metrics: SpeedMetrics::zeroed(config.speed_landmark),
            config,
        }
    }

    /// Create a calculator with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(SpeedConfig::default())
    }

    /// Feed one pose observation. Returns whether the published metrics are
    /// valid afterwards.
    ///
    /// Invalid input marks the metrics invalid and leaves every other field
    /// untouched.
    pub fn update(
        &mut self,
        landmarks: &LandmarkSet,
        world_landmarks: &LandmarkSet,
        timestamp_secs: f64,
    ) -> bool {
        if landmarks.is_empty() || world_landmarks.is_empty() {
            tracing::debug!("Speed update skipped: empty landmark set");
            self.metrics.is_valid = false;
            return false;
        }
        if !timestamp_secs.is_finite() || timestamp_secs < 0.0 {
            tracing::debug!(timestamp = timestamp_secs, "Speed update skipped: bad timestamp");
            self.metrics.is_valid = false;
            return false;
        }

        let Some(raw_com) = compute_com(world_landmarks) else {
            tracing::debug!("Speed update skipped: no center of mass");
            self.metrics.is_valid = false;
            return false;
        };
        let cog_height = compute_cog_height(landmarks).unwrap_or(0.0);
        let center_of_mass = self.smoother.apply(raw_com);

        self.history.push(MotionSample {
            center_of_mass,
            timestamp: timestamp_secs,
        });
        self.previous_world = self.latest_world.replace(world_landmarks.clone());

        let mut next = SpeedMetrics {
            center_of_mass,
            center_of_gravity_height: cog_height,
            is_valid: true,
            ..self.metrics.clone()
        };

        if let (Some(latest), Some(previous)) = (self.history.latest(), self.history.previous()) {
            let dt = latest.timestamp - previous.timestamp;
            if dt > 0.0 && dt < MAX_TIME_DELTA_SECS {
                let velocity = (latest.center_of_mass - previous.center_of_mass) / dt;
                next.velocity = velocity;
                next.speed = self.clamp_speed(velocity.norm());
                next.general_moving_speed = self.clamp_speed(velocity.horizontal_norm());
                next.landmark_speed = self.landmark_speed(dt);
            } else {
                tracing::debug!(dt, "Velocity not updated: time delta out of range");
            }
        }

        self.metrics = next;
        true
    }

    /// Speed of the configured landmark between the two newest world sets.
    fn landmark_speed(&self, dt: f64) -> f64 {
        let idx = self.config.speed_landmark;
        let (Some(prev_set), Some(last_set)) = (&self.previous_world, &self.latest_world) else {
            return 0.0;
        };
        match (prev_set.get(idx), last_set.get(idx)) {
            (Some(a), Some(b))
                if a.is_visible(VISIBILITY_THRESHOLD)
                    && b.is_visible(VISIBILITY_THRESHOLD)
                    && a.is_finite()
                    && b.is_finite() =>
            {
                self.clamp_speed(a.distance_to(b) / dt)
            }
            _ => 0.0,
        }
    }

    fn clamp_speed(&self, speed: f64) -> f64 {
        if speed.is_nan() {
            return 0.0;
        }
        speed.clamp(0.0, self.config.max_speed)
    }

    /// Latest published metrics.
    pub fn metrics(&self) -> &SpeedMetrics {
        &self.metrics
    }

    pub fn history(&self) -> &MotionHistory {
        &self.history
    }

    pub fn speed_landmark(&self) -> LandmarkIndex {
        self.config.speed_landmark
    }

    /// Change which landmark's speed is published from the next update on.
    pub fn set_speed_landmark(&mut self, landmark: LandmarkIndex) {
        self.config.speed_landmark = landmark;
        self.metrics.speed_landmark = landmark;
    }

    /// Clear history and zero every published field.
    pub fn reset(&mut self) {
        self.history.clear();
        self.smoother.reset();
        self.latest_world = None;
        self.previous_world = None;
        self.metrics = SpeedMetrics::zeroed(self.config.speed_landmark);
    }
}

impl Default for SpeedCalculator {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinetrace_pose_model::Landmark;

    /// Every landmark at `p`, fully visible: the center of mass is `p`.
    fn body_at(p: Point3) -> LandmarkSet {
        LandmarkSet::from_landmarks(
            LandmarkIndex::ALL
                .iter()
                .map(|_| Landmark::new(p.x, p.y, p.z, 1.0)),
        )
    }

    fn image_pose() -> LandmarkSet {
        body_at(Point3::new(0.5, 0.5, 0.0))
    }

    #[test]
    fn test_first_update_publishes_position_only() {
        let mut calc = SpeedCalculator::with_defaults();
        assert!(calc.update(&image_pose(), &body_at(Point3::new(1.0, 1.0, 1.0)), 0.0));

        let m = calc.metrics();
        assert!(m.is_valid);
        assert!(m.center_of_mass.distance_to(&Point3::new(1.0, 1.0, 1.0)) < 1e-9);
        assert!((m.center_of_gravity_height - 0.5).abs() < 1e-9);
        assert_eq!(m.velocity, Point3::ZERO);
        assert_eq!(m.speed, 0.0);
    }

    #[test]
    fn test_velocity_and_speeds() {
        let mut calc = SpeedCalculator::with_defaults();
        calc.update(&image_pose(), &body_at(Point3::new(0.0, 0.0, 0.0)), 1.0);
        calc.update(&image_pose(), &body_at(Point3::new(0.3, 0.4, 0.0)), 1.1);

        let m = calc.metrics();
        assert!((m.velocity.x - 3.0).abs() < 1e-6);
        assert!((m.velocity.y - 4.0).abs() < 1e-6);
        assert!((m.speed - 5.0).abs() < 1e-6);
        assert!((m.general_moving_speed - 3.0).abs() < 1e-6);
        assert!((m.landmark_speed - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_speed_clamps_to_maximum() {
        let mut calc = SpeedCalculator::with_defaults();
        calc.update(&image_pose(), &body_at(Point3::new(0.0, 0.0, 0.0)), 2.0);
        calc.update(&image_pose(), &body_at(Point3::new(1000.0, 0.0, 0.0)), 2.01);

        let m = calc.metrics();
        assert_eq!(m.speed, 50.0);
        assert_eq!(m.general_moving_speed, 50.0);
        assert_eq!(m.landmark_speed, 50.0);
    }

    #[test]
    fn test_negative_time_delta_keeps_velocity() {
        let mut calc = SpeedCalculator::with_defaults();
        calc.update(&image_pose(), &body_at(Point3::new(0.0, 0.0, 0.0)), 4.9);
        calc.update(&image_pose(), &body_at(Point3::new(0.1, 0.0, 0.0)), 5.0);
        let before = calc.metrics().clone();
        assert!(before.speed > 0.0);

        assert!(calc.update(&image_pose(), &body_at(Point3::new(2.0, 0.0, 0.0)), 3.0));
        let after = calc.metrics();
        assert!(after.is_valid);
        assert_eq!(after.velocity, before.velocity);
        assert_eq!(after.speed, before.speed);
        assert_eq!(after.landmark_speed, before.landmark_speed);
        assert!(after.center_of_mass.distance_to(&Point3::new(2.0, 0.0, 0.0)) < 1e-9);
    }

    #[test]
    fn test_seek_gap_keeps_velocity() {
        let mut calc = SpeedCalculator::with_defaults();
        calc.update(&image_pose(), &body_at(Point3::new(0.0, 0.0, 0.0)), 0.0);
        calc.update(&image_pose(), &body_at(Point3::new(5.0, 0.0, 0.0)), 1.0);
        assert_eq!(calc.metrics().speed, 0.0);
        assert!(calc.metrics().is_valid);
    }

    #[test]
    fn test_invalid_input_preserves_prior_values() {
        let mut calc = SpeedCalculator::with_defaults();
        calc.update(&image_pose(), &body_at(Point3::new(0.0, 0.0, 0.0)), 0.0);
        calc.update(&image_pose(), &body_at(Point3::new(0.1, 0.0, 0.0)), 0.1);
        let good = calc.metrics().clone();

        assert!(!calc.update(&LandmarkSet::empty(), &body_at(Point3::ZERO), 0.2));
        assert!(!calc.update(&image_pose(), &body_at(Point3::ZERO), -1.0));
        assert!(!calc.update(&image_pose(), &body_at(Point3::ZERO), f64::NAN));

        let m = calc.metrics();
        assert!(!m.is_valid);
        assert_eq!(m.center_of_mass, good.center_of_mass);
        assert_eq!(m.speed, good.speed);
        assert_eq!(calc.history().len(), 2);
    }

    #[test]
    fn test_missing_com_marks_invalid() {
        let mut calc = SpeedCalculator::with_defaults();
        let mut hidden = LandmarkSet::empty();
        hidden.set(LandmarkIndex::Nose, Landmark::new(0.0, 0.0, 0.0, 0.1));
        assert!(!calc.update(&image_pose(), &hidden, 0.0));
        assert!(calc.history().is_empty());
    }

    #[test]
    fn test_cog_failure_degrades_to_zero() {
        let mut calc = SpeedCalculator::with_defaults();
        let mut head_only = LandmarkSet::empty();
        head_only.set(LandmarkIndex::Nose, Landmark::new(0.5, 0.1, 0.0, 0.9));
        assert!(calc.update(&head_only, &body_at(Point3::ZERO), 0.0));
        assert_eq!(calc.metrics().center_of_gravity_height, 0.0);
    }

    #[test]
    fn test_oldest_sample_is_evicted_after_overflow() {
        let mut calc = SpeedCalculator::with_defaults();
        for i in 0..11 {
            let t = i as f64 * 0.1;
            calc.update(&image_pose(), &body_at(Point3::new(t, 0.0, 0.0)), t);
        }
        let history = calc.history();
        assert_eq!(history.len(), 10);
        assert!((history.oldest().unwrap().timestamp - 0.1).abs() < 1e-12);
        assert!((history.previous().unwrap().timestamp - 0.9).abs() < 1e-12);
        assert!((calc.metrics().speed - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_landmark_speed_requires_visibility() {
        let mut calc = SpeedCalculator::with_defaults();
        calc.update(&image_pose(), &body_at(Point3::ZERO), 0.0);

        let mut moved = body_at(Point3::new(0.1, 0.0, 0.0));
        moved.set(
            LandmarkIndex::RightFootIndex,
            Landmark::new(0.5, 0.0, 0.0, 0.4),
        );
        calc.update(&image_pose(), &moved, 0.1);
        assert_eq!(calc.metrics().landmark_speed, 0.0);
        assert!(calc.metrics().speed > 0.0);
    }

    #[test]
    fn test_configured_landmark() {
        let mut calc = SpeedCalculator::with_defaults();
        calc.set_speed_landmark(LandmarkIndex::LeftWrist);
        calc.update(&image_pose(), &body_at(Point3::ZERO), 0.0);

        let mut moved = body_at(Point3::ZERO);
        moved.set(LandmarkIndex::LeftWrist, Landmark::new(0.0, 0.2, 0.0, 1.0));
        calc.update(&image_pose(), &moved, 0.1);
        assert!((calc.metrics().landmark_speed - 2.0).abs() < 1e-9);
        assert_eq!(calc.metrics().speed_landmark, LandmarkIndex::LeftWrist);
    }

    #[test]
    fn test_reset_zeroes_everything() {
        let mut calc = SpeedCalculator::with_defaults();
        calc.update(&image_pose(), &body_at(Point3::ZERO), 0.0);
        calc.update(&image_pose(), &body_at(Point3::new(1.0, 0.0, 0.0)), 0.5);
        calc.reset();

        assert!(calc.history().is_empty());
        assert_eq!(calc.metrics(), &SpeedMetrics::default());
    }

    #[test]
    fn test_exponential_smoothing_damps_speed() {
        let config = SpeedConfig {
            smoothing: SmoothingStrategy::Exponential { alpha: 0.5 },
            ..SpeedConfig::default()
        };
        let mut calc = SpeedCalculator::new(config);
        calc.update(&image_pose(), &body_at(Point3::ZERO), 0.0);
        calc.update(&image_pose(), &body_at(Point3::new(1.0, 0.0, 0.0)), 0.5);
        assert!((calc.metrics().speed - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_from_motion_config() {
        let motion = MotionConfig {
            speed_landmark: 99,
            ..MotionConfig::default()
        };
        let config = SpeedConfig::from(&motion);
        assert_eq!(config.speed_landmark, LandmarkIndex::RightFootIndex);
        assert_eq!(config.history_capacity, 10);
    }
}
