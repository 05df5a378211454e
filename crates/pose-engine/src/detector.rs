//! Pose detector contract.
//!
//! A detector wraps an external pose-estimation model. It is an owned
//! resource with an explicit lifecycle: `initialize`, any number of `detect`
//! calls, then `close`. Implementations need not be thread-safe; the
//! detection controller only calls them from behind its in-flight guard.

use kinetrace_common::config::DetectionConfig;
use kinetrace_common::error::KinetraceResult;
use kinetrace_pose_model::LandmarkSet;

/// Options forwarded to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorOptions {
    pub min_pose_detection_confidence: f64,
    pub min_pose_presence_confidence: f64,
    pub min_tracking_confidence: f64,
    pub num_poses: u32,
}

impl Default for DetectorOptions {
    fn default() -> Self {
        Self::from(&DetectionConfig::default())
    }
}

impl From<&DetectionConfig> for DetectorOptions {
    fn from(config: &DetectionConfig) -> Self {
        Self {
            min_pose_detection_confidence: config.min_pose_detection_confidence,
            min_pose_presence_confidence: config.min_pose_presence_confidence,
            min_tracking_confidence: config.min_tracking_confidence,
            num_poses: config.num_poses.max(1),
        }
    }
}

/// Poses found in one frame. `world_landmark_sets[i]` belongs to
/// `landmark_sets[i]` when present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionOutput {
    pub landmark_sets: Vec<LandmarkSet>,
    pub world_landmark_sets: Vec<LandmarkSet>,
}

impl DetectionOutput {
    pub fn pose_count(&self) -> usize {
        self.landmark_sets.len()
    }

    /// Remove and return pose `index` with its world landmarks (empty if the
    /// detector did not provide them). Later poses shift down by one, so
    /// pairs stay aligned across repeated takes.
    pub fn take_pose(&mut self, index: usize) -> Option<(LandmarkSet, LandmarkSet)> {
        if index >= self.landmark_sets.len() {
            return None;
        }
        let landmarks = self.landmark_sets.remove(index);
        let world = if index < self.world_landmark_sets.len() {
            self.world_landmark_sets.remove(index)
        } else {
            LandmarkSet::empty()
        };
        Some((landmarks, world))
    }
}

/// Lifecycle state of the detector as seen by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectorStatus {
    /// `initialize` has not completed yet.
    Uninitialized,
    /// Ready to detect.
    Ready,
    /// The last `initialize` failed; calling it again retries.
    Failed(String),
    /// `close` was called.
    Closed,
}

impl DetectorStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

/// Interface to an external pose-estimation model.
#[async_trait::async_trait]
pub trait PoseDetector: Send {
    /// Frame handle type the model consumes.
    type Frame: ?Sized + Sync;

    /// Load the model. May be called again after a failure.
    async fn initialize(&mut self, options: &DetectorOptions) -> KinetraceResult<()>;

    /// Detect zero or more poses in a frame.
    async fn detect(
        &mut self,
        frame: &Self::Frame,
        timestamp_ms: f64,
    ) -> KinetraceResult<DetectionOutput>;

    /// Apply changed options to a loaded model.
    async fn update_options(&mut self, _options: &DetectorOptions) -> KinetraceResult<()> {
        Ok(())
    }

    /// Release the model.
    fn close(&mut self);

    /// Detector name for logging.
    fn name(&self) -> &str;
}
