//! Kinetrace Pose Model
//!
//! Defines the core data contracts for pose analysis:
//! - **Landmarks:** The fixed 33-point anatomical registry and landmark sets
//! - **Segments:** Body segments with mass fractions for center-of-mass estimation
//! - **Frames:** Per-frame detection results and export records
//! - **Geometry:** Regions of interest and 3D points
//! - **Recordings:** Detector output captured as JSON Lines
//!
//! Image-space coordinates are normalized to `[0.0, 1.0]` relative to the
//! video frame; world-space coordinates are metric.

pub mod frame;
pub mod geometry;
pub mod landmark;
pub mod recording;
pub mod segment;

pub use frame::*;
pub use geometry::*;
pub use landmark::*;
pub use recording::*;
pub use segment::*;
