//! Replay a detection recording through a pose session.
//!
//! Every frame from 0 to the last recorded frame is submitted in order, as a
//! video player would. Media time drives the session clock, so throttling and
//! speeds follow the video rather than how fast the replay runs.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use kinetrace_biomechanics::SpeedMetrics;
use kinetrace_common::clock::{Clock, ManualClock};
use kinetrace_common::config::{AppConfig, RegionConfig};
use kinetrace_pose_engine::{PoseSession, RecordedDetector};
use kinetrace_pose_model::{LandmarkIndex, PoseFrame};

/// Command-line overrides for a replay.
pub struct ReplayOptions {
    pub fps: f64,
    pub frame_skip: Option<u32>,
    pub max_fps: Option<f64>,
    pub roi: Option<String>,
    pub speed_landmark: Option<String>,
    pub export_frame: Option<u64>,
    pub json: bool,
}

pub async fn run(path: PathBuf, mut config: AppConfig, options: ReplayOptions) -> anyhow::Result<()> {
    if !(options.fps.is_finite() && options.fps > 0.0) {
        anyhow::bail!("--fps must be positive, got {}", options.fps);
    }
    apply_overrides(&mut config, &options)?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {e}"))?;

    let detector = RecordedDetector::from_path(&path)
        .with_context(|| format!("Failed to load recording {}", path.display()))?;

    let recorded_times: HashMap<u64, f64> = detector
        .frames()
        .iter()
        .filter_map(|f| f.timestamp.map(|ts| (f.frame, ts)))
        .collect();
    let Some(last_frame) = detector.frames().last().map(|f| f.frame) else {
        println!("Recording is empty: {}", path.display());
        return Ok(());
    };

    let clock = Arc::new(ManualClock::new(0.0));
    let session = Arc::new(PoseSession::from_config(
        detector,
        &config,
        Arc::clone(&clock) as Arc<dyn Clock>,
    ));
    session.controller().initialize().await?;

    let monitor = config.quality.adaptive.then(|| {
        Arc::clone(&session).spawn_quality_monitor(
            config.quality.target_fps,
            Duration::from_millis(config.quality.monitor_interval_ms),
        )
    });

    tracing::info!(
        path = %path.display(),
        frames = last_frame + 1,
        frame_skip = session.controller().frame_skip(),
        max_fps = session.controller().max_fps(),
        "Replay started"
    );

    let mut detected_frames = 0usize;
    for frame in 0..=last_frame {
        let timestamp = recorded_times
            .get(&frame)
            .copied()
            .unwrap_or(frame as f64 / options.fps);
        clock.set_ms(timestamp * 1000.0);

        let pose = session.process_frame(&frame, timestamp, frame).await;
        if pose.as_ref().is_some_and(|p| p.detected && p.frame_number == frame) {
            detected_frames += 1;
        }
        let metrics = session.current_speed_metrics();

        if options.json {
            println!("{}", frame_json(frame, timestamp, pose.as_deref(), &metrics));
        } else {
            println!("{}", frame_line(frame, timestamp, pose.as_deref(), &metrics));
        }
    }

    if let Some(handle) = monitor {
        session.stop_quality_monitor();
        handle.await.context("Quality monitor panicked")?;
    }

    tracing::info!(
        frames = last_frame + 1,
        detected = detected_frames,
        cached = session.controller().cache_len(),
        "Replay finished"
    );

    if let Some(frame) = options.export_frame {
        match session.export_pose_data(frame) {
            Some(export) => println!("{}", serde_json::to_string_pretty(&export)?),
            None => println!("No detected pose for frame {frame}"),
        }
    }

    session.controller().close().await;
    Ok(())
}

fn apply_overrides(config: &mut AppConfig, options: &ReplayOptions) -> anyhow::Result<()> {
    if let Some(frame_skip) = options.frame_skip {
        config.detection.frame_skip = frame_skip;
    }
    if let Some(max_fps) = options.max_fps {
        config.detection.max_fps = max_fps;
    }
    if let Some(roi) = &options.roi {
        config.roi.region = Some(parse_roi(roi)?);
        config.roi.enabled = true;
    }
    if let Some(landmark) = &options.speed_landmark {
        config.motion.speed_landmark = parse_landmark(landmark)?.index();
    }
    Ok(())
}

/// Parse `x,y,w,h`.
fn parse_roi(value: &str) -> anyhow::Result<RegionConfig> {
    let parts = value
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Invalid ROI '{value}', expected x,y,w,h"))?;

    match parts.as_slice() {
        &[x, y, w, h] => Ok(RegionConfig { x, y, w, h }),
        _ => anyhow::bail!("Invalid ROI '{value}', expected 4 values, got {}", parts.len()),
    }
}

/// Accept a landmark name (`right_foot_index`) or index (`32`).
fn parse_landmark(value: &str) -> anyhow::Result<LandmarkIndex> {
    let found = match value.parse::<usize>() {
        Ok(index) => LandmarkIndex::from_index(index),
        Err(_) => LandmarkIndex::from_name(value),
    };
    found.ok_or_else(|| anyhow::anyhow!("Unknown landmark '{value}'"))
}

fn frame_line(frame: u64, timestamp: f64, pose: Option<&PoseFrame>, m: &SpeedMetrics) -> String {
    let source = match pose {
        Some(p) if p.detected => format!("pose@{}", p.frame_number),
        Some(p) => format!("none@{}", p.frame_number),
        None => "-".to_string(),
    };
    let com = m.center_of_mass;
    format!(
        "{frame:>6}  t={timestamp:>8.3}s  {source:<10} com=({:.3}, {:.3}, {:.3})  speed={:.3}  horizontal={:.3}  {}={:.3}{}",
        com.x,
        com.y,
        com.z,
        m.speed,
        m.general_moving_speed,
        m.speed_landmark.name(),
        m.landmark_speed,
        if m.is_valid { "" } else { "  (invalid)" }
    )
}

fn frame_json(
    frame: u64,
    timestamp: f64,
    pose: Option<&PoseFrame>,
    metrics: &SpeedMetrics,
) -> serde_json::Value {
    serde_json::json!({
        "frame": frame,
        "timestamp": timestamp,
        "served_frame": pose.map(|p| p.frame_number),
        "detected": pose.is_some_and(|p| p.detected),
        "confidence": pose.map(|p| p.confidence),
        "metrics": metrics,
    })
}
