//! Kinetrace Pose Engine
//!
//! Runs pose detection in step with video playback:
//! - **Controller:** Rate-limited, frame-skipping, single-flight detector invocation
//! - **Cache:** Frame-addressed pose storage with nearest-frame fallback
//! - **ROI gate:** Selects the tracked person by region of interest
//! - **Quality:** Adaptive frame skip and confidence from measured throughput
//! - **Session:** Feeds served poses into motion analysis
//!
//! The detector itself is external and plugs in through [`PoseDetector`].

pub mod cache;
pub mod controller;
pub mod detector;
pub mod quality;
pub mod replay;
pub mod roi;
pub mod session;

pub use cache::FramePoseCache;
pub use controller::DetectionController;
pub use detector::{DetectionOutput, DetectorOptions, DetectorStatus, PoseDetector};
pub use quality::{quality_step, QualitySettings, QualityStep};
pub use replay::RecordedDetector;
pub use roi::RoiGate;
pub use session::PoseSession;
