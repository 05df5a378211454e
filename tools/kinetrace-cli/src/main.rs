//! Kinetrace CLI: pose replay and landmark inspection.
//!
//! Usage:
//!   kinetrace replay <PATH>    Replay recorded detections and print motion metrics
//!   kinetrace landmarks        List landmarks and body segments

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use kinetrace_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "kinetrace",
    about = "Pose tracking and motion analysis for video",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to the standard location)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a JSONL detection recording through the analysis pipeline
    Replay {
        /// Path to the recording
        path: PathBuf,

        /// Video frame rate, used for frames without a timestamp
        #[arg(long, default_value = "30")]
        fps: f64,

        /// Run detection on every Nth frame
        #[arg(long)]
        frame_skip: Option<u32>,

        /// Maximum detections per second of video time
        #[arg(long)]
        max_fps: Option<f64>,

        /// Region of interest as normalized x,y,w,h
        #[arg(long)]
        roi: Option<String>,

        /// Landmark whose speed is reported (name or index)
        #[arg(long)]
        speed_landmark: Option<String>,

        /// Print the pose export for this frame after the replay
        #[arg(long)]
        export_frame: Option<u64>,

        /// Emit one JSON object per frame
        #[arg(long)]
        json: bool,
    },

    /// List the landmark registry and body segment table
    Landmarks,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .map_err(|e| anyhow::anyhow!("Failed to load config {}: {e}", path.display()))?,
        None => AppConfig::load(),
    };

    // Initialize logging
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    kinetrace_common::logging::init_logging(&config.logging);

    match cli.command {
        Commands::Replay {
            path,
            fps,
            frame_skip,
            max_fps,
            roi,
            speed_landmark,
            export_frame,
            json,
        } => {
            let options = commands::replay::ReplayOptions {
                fps,
                frame_skip,
                max_fps,
                roi,
                speed_landmark,
                export_frame,
                json,
            };
            commands::replay::run(path, config, options).await
        }
        Commands::Landmarks => commands::landmarks::run(),
    }
}
