//! Detector that replays recorded detections.
//!
//! Frames are addressed by frame number, so the "frame handle" handed to
//! `detect` is simply the frame number. Frames missing from the recording
//! produce no poses.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use kinetrace_common::error::{KinetraceError, KinetraceResult};
use kinetrace_pose_model::{parse_recording, FrameNumber, RecordedFrame};

use crate::detector::{DetectionOutput, DetectorOptions, PoseDetector};

#[derive(Debug)]
pub struct RecordedDetector {
    frames: HashMap<FrameNumber, RecordedFrame>,
    source: Option<PathBuf>,
    options: Option<DetectorOptions>,
    detections: u64,
}

impl RecordedDetector {
    pub fn new(frames: Vec<RecordedFrame>) -> Self {
        Self {
            frames: frames.into_iter().map(|f| (f.frame, f)).collect(),
            source: None,
            options: None,
            detections: 0,
        }
    }

    /// Read a JSONL recording from disk.
    pub fn from_path(path: &Path) -> KinetraceResult<Self> {
        if !path.exists() {
            return Err(KinetraceError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let frames = parse_recording(&content).map_err(|e| {
            KinetraceError::invalid_input(format!("{}: {e}", path.display()))
        })?;
        tracing::debug!(path = %path.display(), frames = frames.len(), "Loaded recording");

        let mut detector = Self::new(frames);
        detector.source = Some(path.to_path_buf());
        Ok(detector)
    }

    /// Recorded frames in ascending frame order.
    pub fn frames(&self) -> Vec<&RecordedFrame> {
        let mut frames: Vec<_> = self.frames.values().collect();
        frames.sort_by_key(|f| f.frame);
        frames
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Number of `detect` calls served so far.
    pub fn detections(&self) -> u64 {
        self.detections
    }

    /// Options received from the controller, once initialized.
    pub fn options(&self) -> Option<&DetectorOptions> {
        self.options.as_ref()
    }
}

#[async_trait::async_trait]
impl PoseDetector for RecordedDetector {
    type Frame = FrameNumber;

    async fn initialize(&mut self, options: &DetectorOptions) -> KinetraceResult<()> {
        self.options = Some(options.clone());
        Ok(())
    }

    async fn detect(
        &mut self,
        frame: &FrameNumber,
        _timestamp_ms: f64,
    ) -> KinetraceResult<DetectionOutput> {
        if self.options.is_none() {
            return Err(KinetraceError::NotInitialized);
        }
        self.detections += 1;

        let Some(recorded) = self.frames.get(frame) else {
            return Ok(DetectionOutput::default());
        };
        let (landmark_sets, world_landmark_sets) = recorded
            .poses
            .iter()
            .map(|pose| (pose.landmarks.clone(), pose.world_landmarks.clone()))
            .unzip();
        Ok(DetectionOutput {
            landmark_sets,
            world_landmark_sets,
        })
    }

    async fn update_options(&mut self, options: &DetectorOptions) -> KinetraceResult<()> {
        self.options = Some(options.clone());
        Ok(())
    }

    fn close(&mut self) {
        self.options = None;
    }

    fn name(&self) -> &str {
        match &self.source {
            Some(_) => "recording",
            None => "in-memory recording",
        }
    }
}
