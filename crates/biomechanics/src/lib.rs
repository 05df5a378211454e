//! Kinetrace Biomechanics
//!
//! Derives motion metrics from pose landmarks:
//! - **Center of mass:** Segment-weighted centroid with re-normalization under occlusion
//! - **Center-of-gravity height:** Hip/knee/ankle weighted posture proxy
//! - **Motion history:** Bounded FIFO of center-of-mass samples
//! - **Speed:** Velocity, scalar speed, horizontal speed, and per-landmark speed
//!
//! This crate is pure computation with no I/O and no detector dependency.

pub mod com;
pub mod history;
pub mod smoothing;
pub mod speed;

pub use com::{compute_cog_height, compute_com};
pub use history::{MotionHistory, MotionSample};
pub use smoothing::{PointSmoother, SmoothingStrategy};
pub use speed::{SpeedCalculator, SpeedConfig, SpeedMetrics};
