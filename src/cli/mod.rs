//! Command-line interface implementation
//!
//! This module provides the CLI entry point and dispatches to submodules
//! for specific command implementations.

mod export;
mod view;

use clap::{Args, Parser, Subcommand};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{load_config, CliOverrides, LogLevel};
use crate::session::{ErrorKind, LoadRequest, SessionError};

pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// framelog - Replay and export step-by-step simulation logs
#[derive(Parser)]
#[command(name = "framelog")]
#[command(about = "framelog - Replay colored simulation logs and export them as GIF or PNG frames")]
#[command(version)]
pub struct Cli {
    /// Configuration file (default: discover framelog.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Which log to open
#[derive(Args, Debug, Clone)]
pub struct LoadArgs {
    /// Log file with step frames
    pub log: PathBuf,

    /// Byte-offset index (default: <log>.index.jsonl next to the log)
    #[arg(long)]
    pub index: Option<PathBuf>,

    /// Step-delimited annotation file
    #[arg(long)]
    pub annotations: Option<PathBuf>,
}

impl LoadArgs {
    pub fn request(&self) -> LoadRequest {
        LoadRequest {
            log: self.log.clone(),
            index: self.index.clone(),
            annotations: self.annotations.clone(),
        }
    }
}

/// Image export options
#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    /// Output file
    #[arg(short, long)]
    pub output: PathBuf,

    /// First frame to export (1-based)
    #[arg(long)]
    pub start: Option<usize>,

    /// Last frame to export (inclusive)
    #[arg(long)]
    pub end: Option<usize>,

    /// Frames per second (GIF only)
    #[arg(long)]
    pub fps: Option<f64>,

    /// Character size in pixels
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=512))]
    pub font_size: Option<u32>,

    /// Background color (#rgb or #rrggbb)
    #[arg(long = "bg", value_name = "COLOR")]
    pub background: Option<String>,

    /// TrueType monospace font file
    #[arg(long)]
    pub font: Option<PathBuf>,
}

impl ExportArgs {
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            font_size: self.font_size,
            background: self.background.clone(),
            fps: self.fps,
            font: self.font.clone(),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load a log and print its summary and metrics as JSON
    Info {
        #[command(flatten)]
        load: LoadArgs,
    },

    /// Print one frame as HTML with its metrics and annotations (JSON)
    Frame {
        #[command(flatten)]
        load: LoadArgs,

        /// Frame number (1-based)
        #[arg(id = "frame_index", value_name = "INDEX")]
        index: usize,
    },

    /// Export a frame range as an animated GIF
    Gif {
        #[command(flatten)]
        load: LoadArgs,

        #[command(flatten)]
        export: ExportArgs,
    },

    /// Export a frame range as a ZIP of numbered PNG frames
    Pngzip {
        #[command(flatten)]
        load: LoadArgs,

        #[command(flatten)]
        export: ExportArgs,
    },
}

/// Install the stderr log subscriber; `RUST_LOG` wins over the config level.
fn init_tracing(level: LogLevel) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    // A subscriber may already be installed when embedded; keep it
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .try_init();
}

/// Exit code for a failed session operation.
pub(crate) fn exit_code(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::NotFound | ErrorKind::BadInput => EXIT_INVALID_ARGS,
        ErrorKind::CapabilityMissing | ErrorKind::Internal => EXIT_ERROR,
    }
}

/// Print a session error and convert it to an exit code.
pub(crate) fn report(err: &SessionError) -> ExitCode {
    eprintln!("Error: {}", err);
    ExitCode::from(exit_code(err.kind()))
}

/// Run the CLI application
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };
    init_tracing(config.log.level);

    match cli.command {
        Commands::Info { load } => view::run_info(&load),
        Commands::Frame { load, index } => view::run_frame(&load, index),
        Commands::Gif { load, export } => {
            export::run_export(&load, &export, config, export::Artifact::Gif)
        }
        Commands::Pngzip { load, export } => {
            export::run_export(&load, &export, config, export::Artifact::PngZip)
        }
    }
}
