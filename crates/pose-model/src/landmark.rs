//! Anatomical landmark registry and landmark sets.
//!
//! The detector reports 33 body landmarks in a fixed order. The index, the
//! name, and the body segment a landmark belongs to are all defined here, so
//! the ROI gate, the center-of-mass calculator, and exports agree by
//! construction.

use serde::{Deserialize, Serialize};

use crate::segment::BodySegment;

/// Number of landmark slots in every landmark set.
pub const LANDMARK_COUNT: usize = 33;

/// Fixed anatomical landmark indexing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(usize)]
pub enum LandmarkIndex {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl LandmarkIndex {
    /// All landmarks in index order.
    pub const ALL: [LandmarkIndex; LANDMARK_COUNT] = [
        Self::Nose,
        Self::LeftEyeInner,
        Self::LeftEye,
        Self::LeftEyeOuter,
        Self::RightEyeInner,
        Self::RightEye,
        Self::RightEyeOuter,
        Self::LeftEar,
        Self::RightEar,
        Self::MouthLeft,
        Self::MouthRight,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftElbow,
        Self::RightElbow,
        Self::LeftWrist,
        Self::RightWrist,
        Self::LeftPinky,
        Self::RightPinky,
        Self::LeftIndex,
        Self::RightIndex,
        Self::LeftThumb,
        Self::RightThumb,
        Self::LeftHip,
        Self::RightHip,
        Self::LeftKnee,
        Self::RightKnee,
        Self::LeftAnkle,
        Self::RightAnkle,
        Self::LeftHeel,
        Self::RightHeel,
        Self::LeftFootIndex,
        Self::RightFootIndex,
    ];

    /// Numeric slot of this landmark.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Look a landmark up by its snake_case name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|l| l.name() == name)
    }

    /// Stable snake_case name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Nose => "nose",
            Self::LeftEyeInner => "left_eye_inner",
            Self::LeftEye => "left_eye",
            Self::LeftEyeOuter => "left_eye_outer",
            Self::RightEyeInner => "right_eye_inner",
            Self::RightEye => "right_eye",
            Self::RightEyeOuter => "right_eye_outer",
            Self::LeftEar => "left_ear",
            Self::RightEar => "right_ear",
            Self::MouthLeft => "mouth_left",
            Self::MouthRight => "mouth_right",
            Self::LeftShoulder => "left_shoulder",
            Self::RightShoulder => "right_shoulder",
            Self::LeftElbow => "left_elbow",
            Self::RightElbow => "right_elbow",
            Self::LeftWrist => "left_wrist",
            Self::RightWrist => "right_wrist",
            Self::LeftPinky => "left_pinky",
            Self::RightPinky => "right_pinky",
            Self::LeftIndex => "left_index",
            Self::RightIndex => "right_index",
            Self::LeftThumb => "left_thumb",
            Self::RightThumb => "right_thumb",
            Self::LeftHip => "left_hip",
            Self::RightHip => "right_hip",
            Self::LeftKnee => "left_knee",
            Self::RightKnee => "right_knee",
            Self::LeftAnkle => "left_ankle",
            Self::RightAnkle => "right_ankle",
            Self::LeftHeel => "left_heel",
            Self::RightHeel => "right_heel",
            Self::LeftFootIndex => "left_foot_index",
            Self::RightFootIndex => "right_foot_index",
        }
    }

    /// The body segment whose centroid this landmark contributes to.
    ///
    /// Every landmark belongs to exactly one segment.
    pub fn segment(self) -> BodySegment {
        use LandmarkIndex::*;
        match self {
            Nose | LeftEyeInner | LeftEye | LeftEyeOuter | RightEyeInner | RightEye
            | RightEyeOuter | LeftEar | RightEar | MouthLeft | MouthRight => BodySegment::Head,
            LeftShoulder | RightShoulder | LeftHip | RightHip => BodySegment::Torso,
            LeftElbow => BodySegment::LeftUpperArm,
            RightElbow => BodySegment::RightUpperArm,
            LeftWrist => BodySegment::LeftForearm,
            RightWrist => BodySegment::RightForearm,
            LeftPinky | LeftIndex | LeftThumb => BodySegment::LeftHand,
            RightPinky | RightIndex | RightThumb => BodySegment::RightHand,
            LeftKnee => BodySegment::LeftThigh,
            RightKnee => BodySegment::RightThigh,
            LeftAnkle => BodySegment::LeftShank,
            RightAnkle => BodySegment::RightShank,
            LeftHeel | LeftFootIndex => BodySegment::LeftFoot,
            RightHeel | RightFootIndex => BodySegment::RightFoot,
        }
    }
}

/// Landmarks used to decide whether a pose lies inside a region of interest.
pub const CENTRAL_LANDMARKS: [LandmarkIndex; 7] = [
    LandmarkIndex::Nose,
    LandmarkIndex::LeftShoulder,
    LandmarkIndex::RightShoulder,
    LandmarkIndex::LeftElbow,
    LandmarkIndex::RightElbow,
    LandmarkIndex::LeftHip,
    LandmarkIndex::RightHip,
];

/// A single detected keypoint.
///
/// For image-space landmarks `x` and `y` are normalized to `[0.0, 1.0]` and
/// `z` is relative depth. For world landmarks all three are metric
/// camera-relative coordinates with `y` vertical.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
    /// Detection confidence in `[0.0, 1.0]`.
    #[serde(default)]
    pub visibility: f64,
}

impl Landmark {
    pub fn new(x: f64, y: f64, z: f64, visibility: f64) -> Self {
        Self {
            x,
            y,
            z,
            visibility,
        }
    }

    /// Whether visibility strictly exceeds `threshold`.
    pub fn is_visible(&self, threshold: f64) -> bool {
        self.visibility > threshold
    }

    /// Whether every coordinate is a finite number.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Euclidean distance in all three dimensions.
    pub fn distance_to(&self, other: &Landmark) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2) + (self.z - other.z).powi(2))
            .sqrt()
    }
}

/// A full set of landmark slots for one pose. Absent slots are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Option<Landmark>>", into = "Vec<Option<Landmark>>")]
pub struct LandmarkSet {
    slots: Vec<Option<Landmark>>,
}

impl LandmarkSet {
    /// A set with every slot absent.
    pub fn empty() -> Self {
        Self {
            slots: vec![None; LANDMARK_COUNT],
        }
    }

    /// Build a set from up to 33 landmarks in index order.
    pub fn from_landmarks(landmarks: impl IntoIterator<Item = Landmark>) -> Self {
        landmarks.into_iter().map(Some).collect::<Vec<_>>().into()
    }

    pub fn get(&self, index: LandmarkIndex) -> Option<&Landmark> {
        self.slots[index.index()].as_ref()
    }

    pub fn set(&mut self, index: LandmarkIndex, landmark: Landmark) {
        self.slots[index.index()] = Some(landmark);
    }

    pub fn clear_slot(&mut self, index: LandmarkIndex) {
        self.slots[index.index()] = None;
    }

    /// Present landmarks with their indices.
    pub fn iter(&self) -> impl Iterator<Item = (LandmarkIndex, &Landmark)> + '_ {
        LandmarkIndex::ALL
            .iter()
            .zip(self.slots.iter())
            .filter_map(|(idx, slot)| slot.as_ref().map(|lm| (*idx, lm)))
    }

    /// Number of present landmarks.
    pub fn present_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// True when no slot holds a landmark.
    pub fn is_empty(&self) -> bool {
        self.present_count() == 0
    }

    /// Mean visibility over present landmarks.
    pub fn mean_visibility(&self) -> Option<f64> {
        let count = self.present_count();
        if count == 0 {
            return None;
        }
        let sum: f64 = self.iter().map(|(_, lm)| lm.visibility).sum();
        Some(sum / count as f64)
    }

    /// Copy of this set keeping only the given landmarks.
    pub fn subset(&self, keep: &[LandmarkIndex]) -> LandmarkSet {
        let mut out = LandmarkSet::empty();
        for &idx in keep {
            if let Some(lm) = self.get(idx) {
                out.set(idx, *lm);
            }
        }
        out
    }
}

impl Default for LandmarkSet {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Vec<Option<Landmark>>> for LandmarkSet {
    fn from(mut slots: Vec<Option<Landmark>>) -> Self {
        slots.resize(LANDMARK_COUNT, None);
        Self { slots }
    }
}

impl From<LandmarkSet> for Vec<Option<Landmark>> {
    fn from(set: LandmarkSet) -> Self {
        set.slots
    }
}
