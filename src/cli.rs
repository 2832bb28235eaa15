//! Command-line interface for polyvox
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Multilingual voice question answering for the terminal
#[derive(Parser, Debug)]
#[command(name = "polyvox", version, about = "Ask questions by typing, speaking, or uploading audio")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress output (quiet mode)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (-v: debug, -vv: trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Skip speech synthesis, print the answer as text only
    #[arg(long, global = true)]
    pub no_audio: bool,

    /// Chat model deadline override (e.g. 30s, 2m)
    #[arg(long, global = true, value_name = "DURATION", value_parser = parse_secs)]
    pub timeout: Option<u64>,
}

/// Parse a duration string into seconds.
///
/// Supports bare numbers (seconds) and anything `humantime` accepts
/// (`30s`, `2m`, `1h30m`).
fn parse_secs(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(secs);
    }
    humantime::parse_duration(s)
        .map(|d| d.as_secs())
        .map_err(|e| e.to_string())
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask a single typed question
    Ask {
        /// The question text
        text: String,
    },

    /// Interactive conversation: type questions, follow-ups keep context
    Chat,

    /// Ask by speaking into the microphone
    Listen {
        /// Audio input device name (see `polyvox devices`)
        #[arg(long, value_name = "DEVICE")]
        device: Option<String>,
    },

    /// Ask with a recorded audio file (wav/mp3/m4a/flac/ogg)
    Upload {
        /// Path to the audio file
        path: PathBuf,
    },

    /// List available audio input devices
    Devices,
}
