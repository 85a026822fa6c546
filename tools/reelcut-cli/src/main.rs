//! Reelcut CLI — cut highlight reels from raw action footage.
//!
//! Usage:
//!   reelcut highlight <INPUT>     Keep the steady, high-action moments
//!   reelcut steady <INPUTS>...    Join the steady footage of several files
//!   reelcut action <INPUT>        Keep the high-action moments of steady footage
//!   reelcut info <INPUT>          Show probed source information
//!   reelcut check                 Check for ffmpeg and ffprobe

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use reelcut_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "reelcut",
    about = "Cut highlight reels from raw action-camera footage",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to $XDG_CONFIG_HOME/reelcut/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Keep the steady, high-action moments of a video
    Highlight {
        /// Input video
        input: PathBuf,

        /// Output file (defaults to highlight_<name> next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Minimum sharpness (Laplacian variance) for a frame to count as steady
        #[arg(long)]
        blur: Option<f64>,

        /// Percentage of the most dynamic transitions to keep
        #[arg(long)]
        top: Option<f64>,

        /// Also write the steady footage as steady_<name>
        #[arg(long)]
        persist_steady: bool,

        /// Write <output>.report.json
        #[arg(long)]
        report: bool,

        /// Give up after this many seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Join the steady footage of one or more videos
    Steady {
        /// Input videos
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output file (defaults to steady_<first input name>)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Minimum sharpness (Laplacian variance) for a frame to count as steady
        #[arg(long)]
        blur: Option<f64>,
    },

    /// Keep the high-action moments of already stabilized footage
    Action {
        /// Input video
        input: PathBuf,

        /// Output file (defaults to highlight_<name> next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Percentage of the most dynamic transitions to keep
        #[arg(long)]
        top: Option<f64>,

        /// Score motion by whole-frame mean instead of the central 95th percentile
        #[arg(long)]
        mean: bool,
    },

    /// Show probed source information
    Info {
        /// Input video
        input: PathBuf,
    },

    /// Check for ffmpeg and ffprobe
    Check,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match AppConfig::load_from(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
        },
        None => AppConfig::load(),
    };
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    if cli.json_logs {
        config.logging.json = true;
    }
    reelcut_common::logging::init_logging(&config.logging);

    let outcome = match cli.command {
        Commands::Highlight {
            input,
            output,
            blur,
            top,
            persist_steady,
            report,
            timeout,
        } => {
            let analysis = &mut config.analysis;
            if let Some(blur) = blur {
                analysis.blur_threshold = blur;
            }
            if let Some(top) = top {
                analysis.top_percent = top;
            }
            analysis.persist_steady |= persist_steady;
            commands::highlight::run(&config, input, output, report, timeout).await
        }
        Commands::Steady {
            inputs,
            output,
            blur,
        } => {
            if let Some(blur) = blur {
                config.analysis.blur_threshold = blur;
            }
            commands::steady::run(&config, inputs, output).await
        }
        Commands::Action {
            input,
            output,
            top,
            mean,
        } => {
            if let Some(top) = top {
                config.analysis.top_percent = top;
            }
            if mean {
                config.analysis.motion_policy = reelcut_common::config::MotionPolicy::Mean;
            }
            commands::action::run(&config, input, output).await
        }
        Commands::Info { input } => commands::info::run(input),
        Commands::Check => commands::check::run(),
    };

    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
