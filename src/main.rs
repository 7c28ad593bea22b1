//! Enkidu - signal-aware dispatcher sidekick
//!
//! Main entry point for the Enkidu CLI.

mod cli;
mod logging;
mod sidekick;

use clap::Parser;
use tracing::warn;

use enkidu_config::{ConfigLoader, ConfigValidator};
use enkidu_signals::{send_signal, signal_table};

use crate::cli::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::load_or_default(cli.config.as_deref())?;
    let warnings = ConfigValidator::validate(&config).into_result()?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            logging::init_tracing(&config.logging)?;
            for warning in warnings {
                warn!("Config {}: {}", warning.path, warning.message);
            }
            sidekick::run(&config)
        }
        Commands::Signals => {
            for (name, number) in signal_table() {
                println!("{:>3}  {}", number, name);
            }
            Ok(())
        }
        Commands::Send { pid, signal } => {
            send_signal(pid, signal.as_str())?;
            Ok(())
        }
        Commands::Config => {
            print!("{}", toml::to_string_pretty(&config)?);
            for warning in warnings {
                eprintln!("warning: {}: {}", warning.path, warning.message);
            }
            Ok(())
        }
    }
}
