//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

/// Keeps the non-blocking file writer alive; taken before exit so buffered lines flush.
pub static FILE_GUARD: Mutex<Option<tracing_appender::non_blocking::WorkerGuard>> =
    Mutex::new(None);
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "jetgrid", version, about = "Jetting-grid protocol generator")]
pub struct Cli {
    /// Path to config TOML
    #[arg(long, value_name = "FILE", default_value = "etc/jetgrid.toml")]
    pub config: PathBuf,

    /// Log and report as JSON lines instead of pretty text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a protocol and export it as header text plus binary frames
    Generate {
        /// Base output directory; [export] subfolder and filename are appended
        #[arg(long, value_name = "DIR", default_value = ".")]
        out: PathBuf,
        /// Override protocol.n_frames
        #[arg(long, value_name = "N")]
        frames: Option<u32>,
        /// Override generator.workers (0 = all cores)
        #[arg(long, value_name = "N")]
        workers: Option<usize>,
        /// Write per-frame solver and valve statistics as CSV
        #[arg(long, value_name = "FILE")]
        stats: Option<PathBuf>,
    },
    /// Decode a binary protocol and report its statistics
    Inspect {
        /// Binary protocol file
        file: PathBuf,
        /// Fail if any valve holds a state shorter than this many frames
        #[arg(long, value_name = "N")]
        min_run: Option<usize>,
    },
    /// Stream a binary protocol into the jetting-grid controller
    Upload {
        /// Binary protocol file
        file: PathBuf,
        /// Serial device node of the controller
        #[arg(long, value_name = "PATH", required_unless_present = "sim")]
        port: Option<PathBuf>,
        /// Program name stored on the device (defaults to the file stem)
        #[arg(long)]
        name: Option<String>,
        /// Upload into a simulated controller instead of real hardware
        #[arg(long, action = ArgAction::SetTrue)]
        sim: bool,
        /// UART baud rate (hardware builds only)
        #[arg(long, default_value_t = 115_200)]
        baud: u32,
        /// Seconds to wait for each device reply
        #[arg(long, value_name = "SECS", default_value_t = 4.0)]
        reply_timeout: f64,
    },
}
