//! Reel CLI: command-line interface for analysis and export.
//!
//! Usage:
//!   reel export <RECORDING>    Export a recording to video
//!   reel analyze <CURSOR>      Detect zoom regions from cursor metadata
//!   reel info <RECORDING>      Show recording information
//!   reel check                 Check system capabilities

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reel_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "reel",
    about = "Composite and export screen recordings",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a recording to video
    Export {
        /// Path to the recording manifest (recording.json)
        recording: PathBuf,

        /// Editor state to apply (editor.json)
        #[arg(short, long)]
        editor: Option<PathBuf>,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Video codec: h264|h265|prores
        #[arg(long)]
        codec: Option<String>,

        /// Frame rate: original|24|30|60
        #[arg(long)]
        fps: Option<String>,

        /// Output width: original|720p|1080p|1440p|4k
        #[arg(long)]
        resolution: Option<String>,

        /// Container: mp4|mov
        #[arg(long)]
        format: Option<String>,
    },

    /// Detect zoom regions from cursor metadata
    Analyze {
        /// Path to the cursor metadata file (cursor.json)
        cursor: PathBuf,

        /// Recording duration in seconds
        #[arg(long)]
        duration: f64,

        /// Zoom level held inside a region
        #[arg(long)]
        zoom_level: Option<f64>,

        /// Max gap between clicks of one region (seconds)
        #[arg(long)]
        dwell: Option<f64>,

        /// Ease-in / ease-out length (seconds)
        #[arg(long)]
        transition: Option<f64>,

        /// Write the detected keyframes into this editor state file
        #[arg(long)]
        write_editor: Option<PathBuf>,
    },

    /// Show recording information
    Info {
        /// Path to the recording manifest (recording.json)
        recording: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check system capabilities
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load();

    // Initialize logging
    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    reel_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Export {
            recording,
            editor,
            output,
            codec,
            fps,
            resolution,
            format,
        } => {
            commands::export::run(
                &config,
                recording,
                editor,
                output,
                commands::export::Overrides {
                    codec,
                    fps,
                    resolution,
                    format,
                },
            )
            .await
        }
        Commands::Analyze {
            cursor,
            duration,
            zoom_level,
            dwell,
            transition,
            write_editor,
        } => commands::analyze::run(
            &config,
            cursor,
            duration,
            zoom_level,
            dwell,
            transition,
            write_editor,
        ),
        Commands::Info { recording, json } => commands::info::run(&config, recording, json),
        Commands::Check => commands::check::run(&config),
    }
}
