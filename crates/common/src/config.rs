//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{KinetraceError, KinetraceResult};

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Detector invocation and cache settings.
    pub detection: DetectionConfig,

    /// Region-of-interest person selection.
    pub roi: RoiConfig,

    /// Motion history and speed derivation.
    pub motion: MotionConfig,

    /// Adaptive quality control.
    pub quality: QualityConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Detection rate and detector option defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Run detection on every Nth frame.
    pub frame_skip: u32,

    /// Upper bound on detector invocations per second.
    pub max_fps: f64,

    /// Minimum confidence for the detector to report a pose.
    pub min_pose_detection_confidence: f64,

    /// Minimum presence score for a reported pose.
    pub min_pose_presence_confidence: f64,

    /// Minimum confidence to keep tracking between frames.
    pub min_tracking_confidence: f64,

    /// Maximum number of poses the detector returns per frame.
    pub num_poses: u32,

    /// Maximum number of frames kept in the pose cache.
    pub cache_capacity: usize,

    /// Landmark indices included in exports. `None` exports all of them.
    pub selected_landmarks: Option<Vec<usize>>,
}

/// Region-of-interest settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RoiConfig {
    /// Whether the ROI gate is active.
    pub enabled: bool,

    /// Normalized region; ignored while `enabled` is false.
    pub region: Option<RegionConfig>,
}

/// Normalized rectangle as stored in config files.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionConfig {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

/// Motion history and speed settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Number of center-of-mass samples kept.
    pub history_capacity: usize,

    /// Landmark index whose speed is published separately (default: right foot index).
    pub speed_landmark: usize,

    /// Published speeds are clamped to this value (m/s).
    pub max_speed: f64,

    /// Smoothing applied to center-of-mass samples.
    pub smoothing: SmoothingConfig,
}

/// Smoothing strategy selection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SmoothingConfig {
    /// Samples are used as measured.
    #[default]
    Identity,
    /// Single-pole low-pass filter, `alpha` weights the newest sample.
    Exponential { alpha: f64 },
    /// Mean over the last `window` samples.
    WindowAverage { window: usize },
}

/// Adaptive quality settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Whether the background quality monitor runs.
    pub adaptive: bool,

    /// Detection throughput the controller steers towards.
    pub target_fps: f64,

    /// Period of the quality monitor in milliseconds.
    pub monitor_interval_ms: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "kinetrace=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            frame_skip: 1,
            max_fps: 30.0,
            min_pose_detection_confidence: 0.5,
            min_pose_presence_confidence: 0.5,
            min_tracking_confidence: 0.5,
            num_poses: 2,
            cache_capacity: 10_000,
            selected_landmarks: None,
        }
    }
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            history_capacity: 10,
            speed_landmark: 32,
            max_speed: 50.0,
            smoothing: SmoothingConfig::Identity,
        }
    }
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            adaptive: false,
            target_fps: 30.0,
            monitor_interval_ms: 1000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load and validate config from an explicit path.
    pub fn load_from(path: &Path) -> KinetraceResult<Self> {
        if !path.exists() {
            return Err(KinetraceError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to the standard location.
    pub fn save(&self) -> KinetraceResult<()> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, json)?;
        Ok(())
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> KinetraceResult<()> {
        let d = &self.detection;
        if d.frame_skip == 0 {
            return Err(KinetraceError::config("detection.frame_skip must be >= 1"));
        }
        if !(d.max_fps.is_finite() && d.max_fps > 0.0) {
            return Err(KinetraceError::config("detection.max_fps must be > 0"));
        }
        for (name, value) in [
            ("min_pose_detection_confidence", d.min_pose_detection_confidence),
            ("min_pose_presence_confidence", d.min_pose_presence_confidence),
            ("min_tracking_confidence", d.min_tracking_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(KinetraceError::config(format!(
                    "detection.{name} must be within [0, 1], got {value}"
                )));
            }
        }
        if d.cache_capacity == 0 {
            return Err(KinetraceError::config("detection.cache_capacity must be >= 1"));
        }
        if self.motion.history_capacity < 2 {
            return Err(KinetraceError::config("motion.history_capacity must be >= 2"));
        }
        if !(self.motion.max_speed.is_finite() && self.motion.max_speed > 0.0) {
            return Err(KinetraceError::config("motion.max_speed must be > 0"));
        }
        match self.motion.smoothing {
            SmoothingConfig::Exponential { alpha } if !(alpha > 0.0 && alpha <= 1.0) => {
                return Err(KinetraceError::config(
                    "motion.smoothing.alpha must be within (0, 1]",
                ));
            }
            SmoothingConfig::WindowAverage { window: 0 } => {
                return Err(KinetraceError::config("motion.smoothing.window must be >= 1"));
            }
            _ => {}
        }
        if !(self.quality.target_fps.is_finite() && self.quality.target_fps > 0.0) {
            return Err(KinetraceError::config("quality.target_fps must be > 0"));
        }
        Ok(())
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("kinetrace").join("config.json")
}
