//! Kinetrace Common Utilities
//!
//! Shared infrastructure for all Kinetrace crates:
//! - Error types and result aliases
//! - Clocks, detection throttling, and throughput estimation
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
