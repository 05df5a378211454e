//! Body segment table used for the segment-weighted center of mass.
//!
//! Weights are percentages of total body mass and sum to 100. Segment
//! membership comes from [`LandmarkIndex::segment`], so the table cannot
//! disagree with the landmark registry.

use serde::{Deserialize, Serialize};

use crate::landmark::LandmarkIndex;

/// A rigid body segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodySegment {
    Head,
    Torso,
    LeftUpperArm,
    RightUpperArm,
    LeftForearm,
    RightForearm,
    LeftHand,
    RightHand,
    LeftThigh,
    RightThigh,
    LeftShank,
    RightShank,
    LeftFoot,
    RightFoot,
}

impl BodySegment {
    pub const ALL: [BodySegment; 14] = [
        Self::Head,
        Self::Torso,
        Self::LeftUpperArm,
        Self::RightUpperArm,
        Self::LeftForearm,
        Self::RightForearm,
        Self::LeftHand,
        Self::RightHand,
        Self::LeftThigh,
        Self::RightThigh,
        Self::LeftShank,
        Self::RightShank,
        Self::LeftFoot,
        Self::RightFoot,
    ];

    /// Mass fraction in percent of body mass.
    pub fn weight(self) -> f64 {
        match self {
            Self::Head => 8.26,
            Self::Torso => 48.33,
            Self::LeftUpperArm | Self::RightUpperArm => 2.71,
            Self::LeftForearm | Self::RightForearm => 1.62,
            Self::LeftHand | Self::RightHand => 0.61,
            Self::LeftThigh | Self::RightThigh => 10.50,
            Self::LeftShank | Self::RightShank => 4.83,
            Self::LeftFoot | Self::RightFoot => 1.435,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Head => "head",
            Self::Torso => "torso",
            Self::LeftUpperArm => "left_upper_arm",
            Self::RightUpperArm => "right_upper_arm",
            Self::LeftForearm => "left_forearm",
            Self::RightForearm => "right_forearm",
            Self::LeftHand => "left_hand",
            Self::RightHand => "right_hand",
            Self::LeftThigh => "left_thigh",
            Self::RightThigh => "right_thigh",
            Self::LeftShank => "left_shank",
            Self::RightShank => "right_shank",
            Self::LeftFoot => "left_foot",
            Self::RightFoot => "right_foot",
        }
    }

    /// Landmarks that make up this segment.
    pub fn landmarks(self) -> impl Iterator<Item = LandmarkIndex> {
        LandmarkIndex::ALL
            .into_iter()
            .filter(move |idx| idx.segment() == self)
    }
}

/// Per-landmark weights for the center-of-gravity height estimate.
pub const COG_HEIGHT_WEIGHTS: [(LandmarkIndex, f64); 6] = [
    (LandmarkIndex::LeftHip, 0.3),
    (LandmarkIndex::RightHip, 0.3),
    (LandmarkIndex::LeftKnee, 0.2),
    (LandmarkIndex::RightKnee, 0.2),
    (LandmarkIndex::LeftAnkle, 0.1),
    (LandmarkIndex::RightAnkle, 0.1),
];
