//! Pose analysis session.
//!
//! Couples the detection controller with the speed calculator: every pose the
//! controller serves is fed to motion analysis once, keyed by its frame
//! number, so repeated cache hits do not create duplicate samples.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use kinetrace_biomechanics::{SpeedCalculator, SpeedConfig, SpeedMetrics};
use kinetrace_common::clock::Clock;
use kinetrace_common::config::AppConfig;
use kinetrace_pose_model::{FrameNumber, LandmarkIndex, PoseExport, PoseFrame};
use tokio::task::JoinHandle;

use crate::controller::DetectionController;
use crate::detector::PoseDetector;

#[derive(Debug)]
struct MotionState {
    calculator: SpeedCalculator,
    /// Frame of the last pose fed to the calculator.
    last_frame: Option<FrameNumber>,
}

pub struct PoseSession<D: PoseDetector> {
    controller: DetectionController<D>,
    motion: Mutex<MotionState>,
    monitor_stop: AtomicBool,
}

impl<D: PoseDetector> PoseSession<D> {
    pub fn new(controller: DetectionController<D>, speed: SpeedConfig) -> Self {
        Self {
            controller,
            motion: Mutex::new(MotionState {
                calculator: SpeedCalculator::new(speed),
                last_frame: None,
            }),
            monitor_stop: AtomicBool::new(false),
        }
    }

    pub fn from_config(detector: D, config: &AppConfig, clock: Arc<dyn Clock>) -> Self {
        let controller =
            DetectionController::new(detector, &config.detection, &config.roi, clock);
        Self::new(controller, SpeedConfig::from(&config.motion))
    }

    fn motion(&self) -> MutexGuard<'_, MotionState> {
        self.motion.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn controller(&self) -> &DetectionController<D> {
        &self.controller
    }

    /// Submit a frame and update motion metrics from the pose it resolves to.
    pub async fn process_frame(
        &self,
        frame: &D::Frame,
        timestamp_secs: f64,
        frame_number: FrameNumber,
    ) -> Option<Arc<PoseFrame>> {
        let pose = self
            .controller
            .submit_frame(frame, timestamp_secs, frame_number)
            .await?;

        if pose.detected {
            let mut motion = self.motion();
            if motion.last_frame != Some(pose.frame_number) {
                motion.last_frame = Some(pose.frame_number);
                motion
                    .calculator
                    .update(&pose.landmarks, &pose.world_landmarks, pose.timestamp);
            }
        }
        Some(pose)
    }

    pub fn current_speed_metrics(&self) -> SpeedMetrics {
        self.motion().calculator.metrics().clone()
    }

    /// Clear motion history, e.g. after a seek.
    pub fn reset_motion(&self) {
        let mut motion = self.motion();
        motion.calculator.reset();
        motion.last_frame = None;
    }

    pub fn set_speed_landmark(&self, landmark: LandmarkIndex) {
        self.motion().calculator.set_speed_landmark(landmark);
    }

    pub fn export_pose_data(&self, frame_number: FrameNumber) -> Option<PoseExport> {
        self.controller.export_pose_data(frame_number)
    }

    /// Stop a running quality monitor after its current tick.
    pub fn stop_quality_monitor(&self) {
        self.monitor_stop.store(true, Ordering::Release);
    }
}

impl<D> PoseSession<D>
where
    D: PoseDetector + 'static,
{
    /// Periodically feed the rolling detection FPS into adaptive quality.
    ///
    /// Ticks before any detection has been timed are skipped.
    pub fn spawn_quality_monitor(
        self: Arc<Self>,
        target_fps: f64,
        period: Duration,
    ) -> JoinHandle<()> {
        self.monitor_stop.store(false, Ordering::Release);
        tracing::info!(
            target_fps,
            period_ms = period.as_millis() as u64,
            "Quality monitor started"
        );

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period.max(Duration::from_millis(1)));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                if self.monitor_stop.load(Ordering::Acquire) {
                    break;
                }
                let fps = self.controller.detection_fps();
                if fps <= 0.0 {
                    continue;
                }
                self.controller.adjust_quality(fps, target_fps);
            }

            tracing::debug!("Quality monitor stopped");
        })
    }
}
