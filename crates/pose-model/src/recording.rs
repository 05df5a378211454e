//! Recorded detector output in JSON Lines form.
//!
//! Each non-empty line holds the poses a detector produced for one frame:
//!
//! ```text
//! {"frame":0,"timestamp":0.0,"poses":[{"landmarks":[...],"world_landmarks":[...]}]}
//! ```
//!
//! Lines starting with `#` are comments.

use serde::{Deserialize, Serialize};

use crate::frame::FrameNumber;
use crate::landmark::LandmarkSet;

/// One pose as reported by a detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedPose {
    pub landmarks: LandmarkSet,
    #[serde(default)]
    pub world_landmarks: LandmarkSet,
}

/// Detector output for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedFrame {
    pub frame: FrameNumber,

    /// Video timestamp in seconds, if the recording carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,

    #[serde(default)]
    pub poses: Vec<RecordedPose>,
}

/// Failure to read a recording.
#[derive(Debug, thiserror::Error)]
pub enum RecordingError {
    #[error("line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Parse a recording from JSONL content.
pub fn parse_recording(jsonl: &str) -> Result<Vec<RecordedFrame>, RecordingError> {
    jsonl
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(line, content)| {
            serde_json::from_str(content).map_err(|source| RecordingError::Parse { line, source })
        })
        .collect()
}

/// Serialize frames to JSONL format.
pub fn serialize_recording(frames: &[RecordedFrame]) -> Result<String, serde_json::Error> {
    let mut output = String::new();
    for frame in frames {
        output.push_str(&serde_json::to_string(frame)?);
        output.push('\n');
    }
    Ok(output)
}
