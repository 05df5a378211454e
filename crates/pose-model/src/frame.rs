//! Per-frame detection results and their export record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::landmark::{LandmarkIndex, LandmarkSet};
use crate::segment::BodySegment;

/// Video frame number. Frames are addressed by number, never by arrival order.
pub type FrameNumber = u64;

/// Why a processed frame holds no tracked pose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    /// The detector returned no poses.
    NoPoseDetected,
    /// Poses were found but none passed the region-of-interest gate.
    OutsideRegionOfInterest,
}

/// The detection result stored for one video frame.
///
/// A frame with `detected == false` still occupies its cache slot so the
/// frame is not sent to the detector again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseFrame {
    pub frame_number: FrameNumber,

    /// Video timestamp in seconds.
    pub timestamp: f64,

    /// Normalized image-space landmarks of the tracked pose.
    pub landmarks: LandmarkSet,

    /// Metric world-space landmarks of the tracked pose.
    pub world_landmarks: LandmarkSet,

    /// Mean visibility of the tracked pose's landmarks.
    pub confidence: f64,

    pub detected: bool,

    /// Number of poses the detector reported, before ROI filtering.
    pub total_poses_detected: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection: Option<RejectionReason>,
}

impl PoseFrame {
    /// A frame with a tracked pose.
    pub fn tracked(
        frame_number: FrameNumber,
        timestamp: f64,
        landmarks: LandmarkSet,
        world_landmarks: LandmarkSet,
        total_poses_detected: usize,
    ) -> Self {
        let confidence = landmarks.mean_visibility().unwrap_or(0.0);
        Self {
            frame_number,
            timestamp,
            landmarks,
            world_landmarks,
            confidence,
            detected: true,
            total_poses_detected,
            rejection: None,
        }
    }

    /// A processed frame without a tracked pose.
    pub fn rejected(
        frame_number: FrameNumber,
        timestamp: f64,
        total_poses_detected: usize,
        reason: RejectionReason,
    ) -> Self {
        Self {
            frame_number,
            timestamp,
            landmarks: LandmarkSet::empty(),
            world_landmarks: LandmarkSet::empty(),
            confidence: 0.0,
            detected: false,
            total_poses_detected,
            rejection: Some(reason),
        }
    }
}

/// Index and name of an exported landmark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkName {
    pub index: usize,
    pub name: String,
}

/// A body segment as listed in exports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentEntry {
    pub name: String,
    pub weight: f64,
    pub landmarks: Vec<usize>,
}

/// Self-describing pose record for external consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseExport {
    pub frame_number: FrameNumber,
    pub timestamp: f64,
    pub landmarks: LandmarkSet,
    pub world_landmarks: LandmarkSet,
    pub confidence: f64,
    pub landmark_names: Vec<LandmarkName>,
    pub segments: Vec<SegmentEntry>,
    pub exported_at: DateTime<Utc>,
}

impl PoseExport {
    /// Build an export from a stored frame. `selection` limits the landmarks
    /// and the naming table to a subset; `None` keeps all of them.
    pub fn from_frame(
        frame: &PoseFrame,
        selection: Option<&[LandmarkIndex]>,
        exported_at: DateTime<Utc>,
    ) -> Self {
        let selected: Vec<LandmarkIndex> = match selection {
            Some(subset) => {
                let mut subset = subset.to_vec();
                subset.sort();
                subset.dedup();
                subset
            }
            None => LandmarkIndex::ALL.to_vec(),
        };

        let landmark_names = selected
            .iter()
            .map(|idx| LandmarkName {
                index: idx.index(),
                name: idx.name().to_string(),
            })
            .collect();

        let segments = BodySegment::ALL
            .iter()
            .map(|segment| SegmentEntry {
                name: segment.name().to_string(),
                weight: segment.weight(),
                landmarks: segment.landmarks().map(LandmarkIndex::index).collect(),
            })
            .collect();

        Self {
            frame_number: frame.frame_number,
            timestamp: frame.timestamp,
            landmarks: frame.landmarks.subset(&selected),
            world_landmarks: frame.world_landmarks.subset(&selected),
            confidence: frame.confidence,
            landmark_names,
            segments,
            exported_at,
        }
    }
}
