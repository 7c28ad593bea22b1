//! CLI definitions for Enkidu.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Enkidu CLI.
#[derive(Parser)]
#[command(name = "enkidu")]
#[command(about = "Signal-aware dispatcher sidekick")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path (default: <config dir>/enkidu/config.toml if present)
    #[arg(short, long, env = "ENKIDU_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub(crate) enum Commands {
    /// Run the sidekick in the foreground until a shutdown signal (default)
    Run,

    /// Print the platform signal table
    Signals,

    /// Send a signal to a process
    Send {
        /// Target process id
        pid: i32,

        /// Signal name or number (INT, SIGTERM, 10, ...)
        #[arg(default_value = "TERM")]
        signal: String,
    },

    /// Print the effective configuration
    Config,
}
