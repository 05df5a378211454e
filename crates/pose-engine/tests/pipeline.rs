use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use kinetrace_common::clock::{Clock, ManualClock};
use kinetrace_common::config::{AppConfig, DetectionConfig, RoiConfig};
use kinetrace_common::error::{KinetraceError, KinetraceResult};
use kinetrace_pose_engine::{
    DetectionController, DetectionOutput, DetectorOptions, DetectorStatus, PoseDetector,
    PoseSession, QualityStep,
};
use kinetrace_pose_model::{
    Landmark, LandmarkIndex, LandmarkSet, RejectionReason, RoiBox, CENTRAL_LANDMARKS,
};
use tokio::sync::Notify;

/// Shared view into a [`ScriptedDetector`] that outlives the controller's
/// ownership of it.
#[derive(Default)]
struct Observed {
    detect_calls: AtomicUsize,
    update_calls: AtomicUsize,
    started: AtomicBool,
    last_options: Mutex<Option<DetectorOptions>>,
}

/// Test detector whose output is a function of the frame number.
struct ScriptedDetector {
    observed: Arc<Observed>,
    poses: Box<dyn Fn(u64) -> Vec<LandmarkSet> + Send>,
    init_failures: usize,
    update_failures: usize,
    failing_frames: HashSet<u64>,
    gate: Option<Arc<Notify>>,
    /// Real time spent inside every detection.
    latency: Option<Duration>,
    ready: bool,
}

impl ScriptedDetector {
    fn new(poses: impl Fn(u64) -> Vec<LandmarkSet> + Send + 'static) -> (Self, Arc<Observed>) {
        let observed = Arc::new(Observed::default());
        let detector = Self {
            observed: Arc::clone(&observed),
            poses: Box::new(poses),
            init_failures: 0,
            update_failures: 0,
            failing_frames: HashSet::new(),
            gate: None,
            latency: None,
            ready: false,
        };
        (detector, observed)
    }

    fn one_person() -> (Self, Arc<Observed>) {
        Self::new(|_| vec![person_at(0.5, 0.5)])
    }
}

#[async_trait::async_trait]
impl PoseDetector for ScriptedDetector {
    type Frame = u64;

    async fn initialize(&mut self, options: &DetectorOptions) -> KinetraceResult<()> {
        if self.init_failures > 0 {
            self.init_failures -= 1;
            return Err(KinetraceError::detector("model file missing"));
        }
        *self.observed.last_options.lock().unwrap() = Some(options.clone());
        self.ready = true;
        Ok(())
    }

    async fn detect(
        &mut self,
        frame: &u64,
        _timestamp_ms: f64,
    ) -> KinetraceResult<DetectionOutput> {
        assert!(self.ready, "detect called before initialize");
        self.observed.detect_calls.fetch_add(1, Ordering::SeqCst);
        self.observed.started.store(true, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.failing_frames.remove(frame) {
            return Err(KinetraceError::detector("inference failed"));
        }

        let landmark_sets = (self.poses)(*frame);
        let world_landmark_sets = landmark_sets.clone();
        Ok(DetectionOutput {
            landmark_sets,
            world_landmark_sets,
        })
    }

    async fn update_options(&mut self, options: &DetectorOptions) -> KinetraceResult<()> {
        self.observed.update_calls.fetch_add(1, Ordering::SeqCst);
        if self.update_failures > 0 {
            self.update_failures -= 1;
            return Err(KinetraceError::detector("options rejected"));
        }
        *self.observed.last_options.lock().unwrap() = Some(options.clone());
        Ok(())
    }

    fn close(&mut self) {
        self.ready = false;
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Central landmarks at `(x, y)`, fully visible.
fn person_at(x: f64, y: f64) -> LandmarkSet {
    let mut set = LandmarkSet::empty();
    for idx in CENTRAL_LANDMARKS {
        set.set(idx, Landmark::new(x, y, 0.0, 1.0));
    }
    set
}

/// All 33 landmarks at one point, fully visible.
fn body_at(x: f64, y: f64, z: f64) -> LandmarkSet {
    LandmarkSet::from_landmarks(
        LandmarkIndex::ALL
            .iter()
            .map(|_| Landmark::new(x, y, z, 1.0)),
    )
}

fn detection_config(frame_skip: u32, max_fps: f64) -> DetectionConfig {
    DetectionConfig {
        frame_skip,
        max_fps,
        ..DetectionConfig::default()
    }
}

fn controller(
    detector: ScriptedDetector,
    config: DetectionConfig,
) -> (DetectionController<ScriptedDetector>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(0.0));
    let controller = DetectionController::new(
        detector,
        &config,
        &RoiConfig::default(),
        Arc::clone(&clock) as Arc<dyn Clock>,
    );
    (controller, clock)
}

#[tokio::test]
async fn uninitialized_or_disabled_returns_none() {
    let (detector, observed) = ScriptedDetector::one_person();
    let (controller, _clock) = controller(detector, detection_config(1, 30.0));

    assert_eq!(controller.status(), DetectorStatus::Uninitialized);
    assert!(controller.submit_frame(&0, 0.0, 0).await.is_none());

    controller.initialize().await.unwrap();
    controller.set_enabled(false);
    assert!(!controller.is_detecting());
    assert!(controller.submit_frame(&0, 0.0, 0).await.is_none());

    assert_eq!(observed.detect_calls.load(Ordering::SeqCst), 0);
    assert_eq!(controller.cache_len(), 0);
}

#[tokio::test]
async fn initialization_failure_can_be_retried() {
    let (mut detector, _observed) = ScriptedDetector::one_person();
    detector.init_failures = 1;
    let (controller, _clock) = controller(detector, detection_config(1, 30.0));

    assert!(controller.initialize().await.is_err());
    assert!(matches!(
        controller.status(),
        DetectorStatus::Failed(ref msg) if msg.contains("model file missing")
    ));
    assert!(controller.submit_frame(&0, 0.0, 0).await.is_none());

    controller.initialize().await.unwrap();
    assert_eq!(controller.status(), DetectorStatus::Ready);
    assert!(controller.submit_frame(&0, 0.0, 0).await.is_some());
}

#[tokio::test]
async fn second_submission_while_detecting_is_served_from_cache() {
    let gate = Arc::new(Notify::new());
    let (mut detector, observed) = ScriptedDetector::one_person();
    detector.gate = Some(Arc::clone(&gate));
    let (controller, _clock) = controller(detector, detection_config(1, 30.0));
    controller.initialize().await.unwrap();

    let first = controller.submit_frame(&0, 0.0, 0);
    let second = async {
        while !observed.started.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
        let served = controller.submit_frame(&0, 0.0, 0).await;
        gate.notify_one();
        served
    };
    let (first, second) = tokio::join!(first, second);

    assert!(first.unwrap().detected);
    assert!(second.is_none()); // nothing cached yet
    assert_eq!(observed.detect_calls.load(Ordering::SeqCst), 1);
    assert_eq!(controller.cache_len(), 1);
}

#[tokio::test]
async fn throttle_serves_cache_until_interval_elapses() {
    let (detector, observed) = ScriptedDetector::one_person();
    let (controller, clock) = controller(detector, detection_config(1, 10.0));
    controller.initialize().await.unwrap();

    assert!(controller.submit_frame(&0, 0.0, 0).await.is_some());

    clock.set_ms(50.0);
    let served = controller.submit_frame(&1, 0.05, 1).await.unwrap();
    assert_eq!(served.frame_number, 0);
    assert_eq!(observed.detect_calls.load(Ordering::SeqCst), 1);

    clock.set_ms(100.0);
    let served = controller.submit_frame(&2, 0.1, 2).await.unwrap();
    assert_eq!(served.frame_number, 2);
    assert_eq!(observed.detect_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn frame_skip_only_detects_every_nth_frame() {
    let (detector, observed) = ScriptedDetector::one_person();
    let (controller, clock) = controller(detector, detection_config(3, 1000.0));
    controller.initialize().await.unwrap();

    let mut served = Vec::new();
    for frame in 0..7u64 {
        clock.advance_ms(10.0);
        let pose = controller.submit_frame(&frame, frame as f64 / 30.0, frame).await;
        served.push(pose.map(|p| p.frame_number));
    }

    assert_eq!(observed.detect_calls.load(Ordering::SeqCst), 3); // frames 0, 3, 6
    assert_eq!(controller.cached_frames(), vec![0, 3, 6]);
    assert_eq!(served[1], Some(0));
    assert_eq!(served[2], Some(0));
    assert_eq!(served[4], Some(3));
    assert_eq!(served[5], Some(3));
}

#[tokio::test]
async fn detector_failure_leaves_frame_unset() {
    let (mut detector, observed) = ScriptedDetector::one_person();
    detector.failing_frames.insert(0);
    let (controller, _clock) = controller(detector, detection_config(1, 30.0));
    controller.initialize().await.unwrap();

    assert!(controller.submit_frame(&0, 0.0, 0).await.is_none());
    assert_eq!(controller.cache_len(), 0);
    assert!(controller.query_pose(0).is_none());

    // Failures do not arm the throttle, so the retry runs immediately.
    let retried = controller.submit_frame(&0, 0.0, 0).await.unwrap();
    assert!(retried.detected);
    assert_eq!(observed.detect_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn roi_selects_the_person_inside_the_region() {
    let (detector, _observed) =
        ScriptedDetector::new(|_| vec![person_at(0.9, 0.9), person_at(0.5, 0.5)]);
    let (controller, clock) = controller(detector, detection_config(1, 30.0));
    controller.initialize().await.unwrap();

    let unfiltered = controller.submit_frame(&0, 0.0, 0).await.unwrap();
    assert_eq!(unfiltered.landmarks, person_at(0.9, 0.9));
    assert_eq!(unfiltered.total_poses_detected, 2);

    controller.set_roi(RoiBox::new(0.25, 0.25, 0.5, 0.5));
    clock.advance_ms(100.0);
    let gated = controller.submit_frame(&1, 0.1, 1).await.unwrap();
    assert!(gated.detected);
    assert_eq!(gated.landmarks, person_at(0.5, 0.5));
    assert_eq!(gated.total_poses_detected, 2);

    controller.set_roi(RoiBox::new(0.0, 0.0, 0.1, 0.1));
    clock.advance_ms(100.0);
    let rejected = controller.submit_frame(&2, 0.2, 2).await.unwrap();
    assert!(!rejected.detected);
    assert_eq!(rejected.rejection, Some(RejectionReason::OutsideRegionOfInterest));

    // The rejected frame keeps its slot but neighbours fall back to detected frames.
    assert!(!controller.query_pose(2).unwrap().detected);
    assert_eq!(controller.query_pose(3).unwrap().frame_number, 1);
}

#[tokio::test]
async fn no_pose_is_stored_as_undetected() {
    let (detector, observed) = ScriptedDetector::new(|_| Vec::new());
    let (controller, _clock) = controller(detector, detection_config(1, 30.0));
    controller.initialize().await.unwrap();

    let frame = controller.submit_frame(&4, 0.1, 4).await.unwrap();
    assert!(!frame.detected);
    assert_eq!(frame.rejection, Some(RejectionReason::NoPoseDetected));
    assert!(controller.export_pose_data(4).is_none());

    // Served from the cache without another detection.
    assert!(controller.submit_frame(&4, 0.1, 4).await.is_some());
    assert_eq!(observed.detect_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn redetection_overwrites_the_frame() {
    let (detector, observed) = ScriptedDetector::one_person();
    let (controller, clock) = controller(detector, detection_config(1, 30.0));
    controller.initialize().await.unwrap();

    controller.submit_frame(&5, 0.0, 5).await.unwrap();
    clock.advance_ms(100.0);
    controller.submit_frame(&5, 0.0, 5).await.unwrap();

    assert_eq!(observed.detect_calls.load(Ordering::SeqCst), 2);
    assert_eq!(controller.cache_len(), 1);

    controller.clear_cache();
    assert!(controller.query_pose(5).is_none());
}

#[tokio::test]
async fn export_respects_landmark_selection() {
    let (detector, _observed) = ScriptedDetector::one_person();
    let (controller, _clock) = controller(detector, detection_config(1, 30.0));
    controller.initialize().await.unwrap();
    controller.submit_frame(&0, 0.0, 0).await.unwrap();

    controller.set_selected_landmarks(Some(vec![LandmarkIndex::LeftHip, LandmarkIndex::Nose]));
    let export = controller.export_pose_data(0).unwrap();
    assert_eq!(export.frame_number, 0);
    assert_eq!(export.landmark_names.len(), 2);
    assert_eq!(export.landmark_names[0].name, "nose");
    assert_eq!(export.landmarks.present_count(), 2);
    assert_eq!(export.segments.len(), 14);

    controller.set_selected_landmarks(None);
    let export = controller.export_pose_data(0).unwrap();
    assert_eq!(export.landmark_names.len(), 33);
}

#[tokio::test]
async fn quality_adjustment_reaches_detector_options() {
    let (detector, observed) = ScriptedDetector::one_person();
    let (controller, _clock) = controller(detector, detection_config(1, 30.0));
    controller.initialize().await.unwrap();

    assert_eq!(controller.adjust_quality(10.0, 30.0), QualityStep::Degrade);
    assert_eq!(controller.frame_skip(), 2);
    let pending = controller.options().min_pose_detection_confidence;
    assert!((pending - 0.4).abs() < 1e-9);

    controller.submit_frame(&0, 0.0, 0).await.unwrap();
    let applied = observed.last_options.lock().unwrap().clone().unwrap();
    assert!((applied.min_pose_detection_confidence - 0.4).abs() < 1e-9);

    assert_eq!(controller.adjust_quality(30.0, 30.0), QualityStep::Hold);
    assert_eq!(controller.frame_skip(), 2);
}

#[tokio::test]
async fn detection_fps_tracks_detector_duration() {
    let (mut detector, _observed) = ScriptedDetector::one_person();
    detector.latency = Some(Duration::from_millis(20));
    let (controller, clock) = controller(detector, detection_config(1, 1000.0));
    controller.initialize().await.unwrap();

    // Media time moves only between frames, never during a detection.
    for frame in 0..3u64 {
        clock.set_ms(frame as f64 * 100.0);
        controller.submit_frame(&frame, frame as f64 * 0.1, frame).await.unwrap();
    }
    let fps = controller.detection_fps();
    assert!(fps > 0.0, "fps = {fps}");
    assert!(fps <= 50.0 + 1e-9, "fps = {fps}");
}

#[tokio::test]
async fn detection_fps_is_measured_with_a_frozen_clock() {
    let (detector, _observed) = ScriptedDetector::new(|frame| {
        std::thread::sleep(Duration::from_millis(2));
        vec![person_at(0.5, 0.5 + frame as f64 * 0.01)]
    });
    let (controller, _clock) = controller(detector, detection_config(1, 30.0));
    controller.initialize().await.unwrap();

    controller.submit_frame(&0, 0.0, 0).await.unwrap();
    assert!(controller.detection_fps() > 0.0);
}

#[tokio::test]
async fn session_publishes_speed_from_served_poses() {
    let (detector, observed) =
        ScriptedDetector::new(|frame| vec![body_at(frame as f64 * 0.01, 1.0, 0.0)]);
    let mut config = AppConfig::default();
    config.detection.max_fps = 1000.0;
    let clock = Arc::new(ManualClock::new(0.0));
    let session =
        PoseSession::from_config(detector, &config, Arc::clone(&clock) as Arc<dyn Clock>);
    session.controller().initialize().await.unwrap();

    for frame in 0..2u64 {
        let ts = frame as f64 / 30.0;
        clock.set_ms(ts * 1000.0);
        session.process_frame(&frame, ts, frame).await.unwrap();
    }
    let metrics = session.current_speed_metrics();
    assert!(metrics.is_valid);
    assert!((metrics.velocity.x - 0.3).abs() < 1e-9);
    assert!((metrics.speed - 0.3).abs() < 1e-9);
    assert!((metrics.general_moving_speed - 0.3).abs() < 1e-9);
    assert!((metrics.landmark_speed - 0.3).abs() < 1e-9);

    // A throttled resubmission serves the same frame and adds no sample.
    session.process_frame(&1, 1.0 / 30.0, 1).await.unwrap();
    assert_eq!(observed.detect_calls.load(Ordering::SeqCst), 2);
    assert_eq!(session.current_speed_metrics(), metrics);

    session.reset_motion();
    let reset = session.current_speed_metrics();
    assert!(!reset.is_valid);
    assert_eq!(reset.speed, 0.0);
}

#[tokio::test]
async fn quality_monitor_degrades_slow_detection() {
    let (mut detector, _observed) = ScriptedDetector::one_person();
    detector.latency = Some(Duration::from_millis(50));
    let session = Arc::new(PoseSession::from_config(
        detector,
        &AppConfig::default(),
        Arc::new(ManualClock::new(0.0)) as Arc<dyn Clock>,
    ));
    session.controller().initialize().await.unwrap();
    session.process_frame(&0, 0.0, 0).await.unwrap();

    let handle = Arc::clone(&session).spawn_quality_monitor(30.0, Duration::from_millis(5));
    tokio::time::sleep(Duration::from_millis(50)).await;
    session.stop_quality_monitor();
    handle.await.unwrap();

    assert!(session.controller().frame_skip() >= 2);
    assert!(session.controller().options().min_pose_detection_confidence < 0.5);
}

#[tokio::test]
async fn degrading_from_an_oversized_frame_skip_clamps() {
    let (detector, observed) = ScriptedDetector::one_person();
    let (controller, _clock) = controller(detector, detection_config(1, 30.0));
    controller.initialize().await.unwrap();

    controller.set_frame_skip(u32::MAX);
    assert_eq!(controller.adjust_quality(1.0, 30.0), QualityStep::Degrade);
    assert_eq!(controller.frame_skip(), 4);

    assert!(controller.submit_frame(&0, 0.0, 0).await.is_some());
    assert_eq!(observed.detect_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn rejected_options_are_retried_on_the_next_detection() {
    let (mut detector, observed) = ScriptedDetector::one_person();
    detector.update_failures = 1;
    let (controller, clock) = controller(detector, detection_config(1, 30.0));
    controller.initialize().await.unwrap();

    controller.set_confidence_thresholds(0.9, 0.5, 0.5);
    controller.submit_frame(&0, 0.0, 0).await.unwrap();
    assert_eq!(observed.update_calls.load(Ordering::SeqCst), 1);
    let applied = observed.last_options.lock().unwrap().clone().unwrap();
    assert!((applied.min_pose_detection_confidence - 0.5).abs() < 1e-9);

    clock.advance_ms(100.0);
    controller.submit_frame(&1, 0.1, 1).await.unwrap();
    assert_eq!(observed.update_calls.load(Ordering::SeqCst), 2);
    let applied = observed.last_options.lock().unwrap().clone().unwrap();
    assert!((applied.min_pose_detection_confidence - 0.9).abs() < 1e-9);

    // Applied options are not pushed again.
    clock.advance_ms(100.0);
    controller.submit_frame(&2, 0.2, 2).await.unwrap();
    assert_eq!(observed.update_calls.load(Ordering::SeqCst), 2);
}
