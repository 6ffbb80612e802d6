//! Command-line interface for voiceloop
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Spoken conversations with a language model, answered in a cloned voice
#[derive(Parser, Debug)]
#[command(
    name = "voiceloop",
    version,
    about = "Spoken conversations with a language model, answered in a cloned voice"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose logging (-v: debug, -vv: trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a single turn in process and print the reply
    Chat {
        /// Recorded question (wav, webm, ogg, ...)
        audio: PathBuf,

        /// Voice sample to clone (default: the question itself)
        #[arg(long, value_name = "FILE")]
        voice: Option<PathBuf>,

        /// Print the turn as JSON
        #[arg(long)]
        json: bool,
    },

    /// Start the daemon (foreground process for systemd)
    Daemon {
        /// Path to Unix socket (default: $XDG_RUNTIME_DIR/voiceloop.sock)
        #[arg(long, value_name = "PATH")]
        socket: Option<PathBuf>,
    },

    /// Send a recorded question to the daemon
    Send {
        /// Recorded question (wav, webm, ogg, ...)
        audio: PathBuf,

        /// Conversation to continue
        #[arg(long, value_name = "NAME", default_value = "default")]
        session: String,

        /// Path to Unix socket (default: $XDG_RUNTIME_DIR/voiceloop.sock)
        #[arg(long, value_name = "PATH")]
        socket: Option<PathBuf>,
    },

    /// Show a session's conversation history
    History {
        /// Conversation to show
        #[arg(long, value_name = "NAME", default_value = "default")]
        session: String,

        /// Path to Unix socket (default: $XDG_RUNTIME_DIR/voiceloop.sock)
        #[arg(long, value_name = "PATH")]
        socket: Option<PathBuf>,
    },

    /// Forget a session's conversation history
    Reset {
        /// Conversation to forget
        #[arg(long, value_name = "NAME", default_value = "default")]
        session: String,

        /// Path to Unix socket (default: $XDG_RUNTIME_DIR/voiceloop.sock)
        #[arg(long, value_name = "PATH")]
        socket: Option<PathBuf>,
    },

    /// Get daemon status via IPC
    Status {
        /// Path to Unix socket (default: $XDG_RUNTIME_DIR/voiceloop.sock)
        #[arg(long, value_name = "PATH")]
        socket: Option<PathBuf>,
    },

    /// Ask the daemon to shut down
    Stop {
        /// Path to Unix socket (default: $XDG_RUNTIME_DIR/voiceloop.sock)
        #[arg(long, value_name = "PATH")]
        socket: Option<PathBuf>,
    },

    /// Delete generated audio older than storage.retention
    Sweep,

    /// View configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Configuration actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Print the default configuration file path
    Path,
}
