//! Error types shared across Kinetrace crates.

use std::path::PathBuf;

/// Top-level error type for Kinetrace operations.
#[derive(Debug, thiserror::Error)]
pub enum KinetraceError {
    #[error("Detector error: {message}")]
    Detector { message: String },

    #[error("Detector not initialized")]
    NotInitialized,

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using KinetraceError.
pub type KinetraceResult<T> = Result<T, KinetraceError>;

impl KinetraceError {
    pub fn detector(msg: impl Into<String>) -> Self {
        Self::Detector {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: msg.into(),
        }
    }
}
