//! Frame-synchronous detection controller.
//!
//! The host submits every video frame it renders. The controller decides
//! whether the frame is worth sending to the detector (enabled, throttled,
//! frame skip, nothing already in flight) and otherwise answers from the
//! frame cache. Detector failures never propagate out of `submit_frame`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use kinetrace_common::clock::{Clock, DetectionThrottle, FpsEstimator, MonotonicClock};
use kinetrace_common::config::{DetectionConfig, RoiConfig};
use kinetrace_common::error::{KinetraceError, KinetraceResult};
use kinetrace_pose_model::{
    FrameNumber, LandmarkIndex, PoseExport, PoseFrame, RejectionReason, RoiBox,
};

use crate::cache::FramePoseCache;
use crate::detector::{DetectionOutput, DetectorOptions, DetectorStatus, PoseDetector};
use crate::quality::{quality_step, QualitySettings, QualityStep};
use crate::roi::RoiGate;

/// Mutable controller state. Never held across an await.
#[derive(Debug)]
struct ControllerState {
    status: DetectorStatus,
    enabled: bool,
    frame_skip: u32,
    max_fps: f64,
    options: DetectorOptions,
    /// Options changed since they were last handed to the detector.
    options_dirty: bool,
    throttle: DetectionThrottle,
    fps: FpsEstimator,
    roi: RoiGate,
    cache: FramePoseCache,
    selected_landmarks: Option<Vec<LandmarkIndex>>,
}

impl ControllerState {
    fn lookup_radius(&self) -> u64 {
        2 * u64::from(self.frame_skip)
    }

    fn lookup(&self, frame_number: FrameNumber) -> Option<Arc<PoseFrame>> {
        self.cache.lookup(frame_number, self.lookup_radius())
    }

    /// Pick the tracked pose and build the stored record.
    fn build_frame(
        &self,
        mut output: DetectionOutput,
        frame_number: FrameNumber,
        timestamp_secs: f64,
    ) -> PoseFrame {
        let total = output.pose_count();
        if total == 0 {
            return PoseFrame::rejected(
                frame_number,
                timestamp_secs,
                0,
                RejectionReason::NoPoseDetected,
            );
        }

        let chosen = output
            .landmark_sets
            .iter()
            .position(|landmarks| self.roi.accepts(landmarks));

        match chosen.and_then(|index| output.take_pose(index)) {
            Some((landmarks, world_landmarks)) => {
                PoseFrame::tracked(frame_number, timestamp_secs, landmarks, world_landmarks, total)
            }
            None => {
                tracing::debug!(
                    frame = frame_number,
                    poses = total,
                    "No pose inside region of interest"
                );
                PoseFrame::rejected(
                    frame_number,
                    timestamp_secs,
                    total,
                    RejectionReason::OutsideRegionOfInterest,
                )
            }
        }
    }
}

/// Marks a detection as in flight until dropped.
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Owns the detector and the frame cache.
pub struct DetectionController<D: PoseDetector> {
    detector: tokio::sync::Mutex<D>,
    /// Drives the throttle. May follow media time.
    clock: Arc<dyn Clock>,
    /// Times detector calls for the throughput estimate.
    timer: MonotonicClock,
    state: Mutex<ControllerState>,
    in_flight: AtomicBool,
}

impl<D: PoseDetector> DetectionController<D> {
    pub fn new(
        detector: D,
        detection: &DetectionConfig,
        roi: &RoiConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let selected_landmarks = detection
            .selected_landmarks
            .as_ref()
            .map(|indices| landmark_indices(indices));

        let state = ControllerState {
            status: DetectorStatus::Uninitialized,
            enabled: true,
            frame_skip: detection.frame_skip.max(1),
            max_fps: detection.max_fps,
            options: DetectorOptions::from(detection),
            options_dirty: false,
            throttle: DetectionThrottle::new(detection.max_fps),
            fps: FpsEstimator::default(),
            roi: RoiGate::from_config(roi),
            cache: FramePoseCache::new(detection.cache_capacity),
            selected_landmarks,
        };

        Self {
            detector: tokio::sync::Mutex::new(detector),
            clock,
            timer: MonotonicClock::start(),
            state: Mutex::new(state),
            in_flight: AtomicBool::new(false),
        }
    }

    fn state(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Load the detector. On failure the status becomes
    /// [`DetectorStatus::Failed`] and calling this again retries.
    pub async fn initialize(&self) -> KinetraceResult<()> {
        let options = self.state().options.clone();
        let mut detector = self.detector.lock().await;

        match detector.initialize(&options).await {
            Ok(()) => {
                let mut state = self.state();
                state.status = DetectorStatus::Ready;
                state.options_dirty = false;
                state.throttle.reset();
                tracing::info!(detector = %detector.name(), "Pose detector initialized");
                Ok(())
            }
            Err(error) => {
                tracing::error!(
                    detector = %detector.name(),
                    error = %error,
                    "Pose detector failed to initialize"
                );
                self.state().status = DetectorStatus::Failed(error.to_string());
                Err(error)
            }
        }
    }

    /// Release the detector. Cached poses stay queryable.
    pub async fn close(&self) {
        let mut detector = self.detector.lock().await;
        detector.close();
        self.state().status = DetectorStatus::Closed;
        tracing::info!(detector = %detector.name(), "Pose detector closed");
    }

    /// Offer a frame for detection.
    ///
    /// Returns the pose stored for this frame (or the nearest detected one)
    /// when detection is skipped, the fresh record when it runs, and `None`
    /// while disabled or not initialized.
    pub async fn submit_frame(
        &self,
        frame: &D::Frame,
        timestamp_secs: f64,
        frame_number: FrameNumber,
    ) -> Option<Arc<PoseFrame>> {
        {
            let state = self.state();
            if !state.enabled || !state.status.is_ready() {
                return None;
            }
            if !state.throttle.is_ready(self.clock.now_ms()) {
                return state.lookup(frame_number);
            }
            if frame_number % u64::from(state.frame_skip) != 0 {
                return state.lookup(frame_number);
            }
        }

        let Some(_guard) = InFlightGuard::try_acquire(&self.in_flight) else {
            tracing::trace!(frame = frame_number, "Detection in flight, serving cache");
            return self.lookup(frame_number);
        };

        let pending_options = {
            let mut state = self.state();
            std::mem::take(&mut state.options_dirty).then(|| state.options.clone())
        };

        let started = self.timer.now_ms();
        let (options_failed, result) = {
            let mut detector = self.detector.lock().await;
            let mut options_failed = false;
            if let Some(options) = pending_options {
                if let Err(error) = detector.update_options(&options).await {
                    tracing::warn!(error = %error, "Failed to apply detector options");
                    options_failed = true;
                }
            }
            (options_failed, detector.detect(frame, timestamp_secs * 1000.0).await)
        };
        let elapsed_ms = self.timer.now_ms() - started;

        let mut state = self.state();
        if options_failed {
            // Retry with the next detection.
            state.options_dirty = true;
        }
        match result {
            Ok(output) => {
                let record = Arc::new(state.build_frame(output, frame_number, timestamp_secs));
                state.cache.insert(Arc::clone(&record));
                state.throttle.mark(self.clock.now_ms());
                state.fps.record(elapsed_ms);
                tracing::trace!(
                    frame = frame_number,
                    detected = record.detected,
                    poses = record.total_poses_detected,
                    "Frame processed"
                );
                Some(record)
            }
            Err(error) => {
                tracing::warn!(frame = frame_number, error = %error, "Pose detection failed");
                state.lookup(frame_number)
            }
        }
    }

    /// Exact cache hit, else the nearest detected frame within two frame
    /// skips.
    pub fn lookup(&self, frame_number: FrameNumber) -> Option<Arc<PoseFrame>> {
        self.state().lookup(frame_number)
    }

    /// Pose to draw for a frame. Same resolution as [`lookup`](Self::lookup).
    pub fn query_pose(&self, frame_number: FrameNumber) -> Option<Arc<PoseFrame>> {
        self.lookup(frame_number)
    }

    /// Export the pose for a frame, restricted to the selected landmarks.
    /// `None` unless a detected pose resolves for the frame.
    pub fn export_pose_data(&self, frame_number: FrameNumber) -> Option<PoseExport> {
        let state = self.state();
        let frame = state.lookup(frame_number).filter(|f| f.detected)?;
        Some(PoseExport::from_frame(
            &frame,
            state.selected_landmarks.as_deref(),
            chrono::Utc::now(),
        ))
    }

    /// Pause or resume detection. A detection already in flight still stores
    /// its result.
    pub fn set_enabled(&self, enabled: bool) {
        self.state().enabled = enabled;
        tracing::debug!(enabled, "Detection toggled");
    }

    pub fn status(&self) -> DetectorStatus {
        self.state().status.clone()
    }

    /// Whether frames submitted now can reach the detector.
    pub fn is_detecting(&self) -> bool {
        let state = self.state();
        state.enabled && state.status.is_ready()
    }

    /// Run detection on every `frame_skip`-th frame. Values below 1 become 1.
    pub fn set_frame_skip(&self, frame_skip: u32) {
        self.state().frame_skip = frame_skip.max(1);
    }

    pub fn frame_skip(&self) -> u32 {
        self.state().frame_skip
    }

    pub fn set_max_fps(&self, max_fps: f64) -> KinetraceResult<()> {
        if !max_fps.is_finite() || max_fps <= 0.0 {
            return Err(KinetraceError::invalid_input(format!(
                "max fps must be positive, got {max_fps}"
            )));
        }
        let mut state = self.state();
        state.max_fps = max_fps;
        state.throttle.set_max_fps(max_fps);
        Ok(())
    }

    pub fn max_fps(&self) -> f64 {
        self.state().max_fps
    }

    /// Current detector options, including pending changes.
    pub fn options(&self) -> DetectorOptions {
        self.state().options.clone()
    }

    /// Update confidence thresholds. Values are clamped to `[0, 1]` and handed
    /// to the detector before its next detection.
    pub fn set_confidence_thresholds(&self, detection: f64, presence: f64, tracking: f64) {
        let mut state = self.state();
        state.options.min_pose_detection_confidence = unit(detection);
        state.options.min_pose_presence_confidence = unit(presence);
        state.options.min_tracking_confidence = unit(tracking);
        state.options_dirty = true;
    }

    /// Restrict tracking to poses inside `region`.
    pub fn set_roi(&self, region: RoiBox) {
        self.state().roi.set_region(region);
        tracing::debug!(?region, "Region of interest set");
    }

    pub fn clear_roi(&self) {
        self.state().roi.clear();
    }

    /// Flip the ROI gate. Returns whether it is now enabled.
    pub fn toggle_roi(&self) -> bool {
        self.state().roi.toggle()
    }

    pub fn roi(&self) -> Option<RoiBox> {
        self.state().roi.region()
    }

    /// Limit exports to a subset of landmarks. `None` exports all.
    pub fn set_selected_landmarks(&self, selection: Option<Vec<LandmarkIndex>>) {
        self.state().selected_landmarks = selection;
    }

    /// Rolling detection throughput, measured in wall-clock time.
    pub fn detection_fps(&self) -> f64 {
        self.state().fps.fps()
    }

    /// One adaptive-quality step against `target_fps`.
    ///
    /// Adjusts frame skip and the pose detection confidence; the new
    /// threshold reaches the detector before its next detection.
    pub fn adjust_quality(&self, current_fps: f64, target_fps: f64) -> QualityStep {
        let step = quality_step(current_fps, target_fps);
        if step == QualityStep::Hold {
            return step;
        }

        let mut state = self.state();
        let before = QualitySettings {
            frame_skip: state.frame_skip,
            min_confidence: state.options.min_pose_detection_confidence,
        };
        let after = before.apply(step);
        if after != before {
            state.frame_skip = after.frame_skip;
            state.options.min_pose_detection_confidence = after.min_confidence;
            state.options_dirty = true;
            tracing::info!(
                ?step,
                fps = current_fps,
                target_fps,
                frame_skip = after.frame_skip,
                min_confidence = after.min_confidence,
                "Detection quality adjusted"
            );
        }
        step
    }

    pub fn clear_cache(&self) {
        self.state().cache.clear();
    }

    pub fn cache_len(&self) -> usize {
        self.state().cache.len()
    }

    /// Cached frame numbers in ascending order.
    pub fn cached_frames(&self) -> Vec<FrameNumber> {
        self.state().cache.frame_numbers().collect()
    }
}

fn unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

fn landmark_indices(indices: &[usize]) -> Vec<LandmarkIndex> {
    indices
        .iter()
        .filter_map(|&index| {
            let landmark = LandmarkIndex::from_index(index);
            if landmark.is_none() {
                tracing::warn!(index, "Ignoring unknown landmark index in selection");
            }
            landmark
        })
        .collect()
}
