//! Configuration schema definitions.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use enkidu_dispatcher::DispatcherConfig;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub dispatcher: DispatcherConfig,

    #[serde(default)]
    pub signals: SignalsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Signal handling configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalsConfig {
    /// Signals that stop the sidekick.
    #[serde(default = "default_shutdown")]
    pub shutdown: Vec<String>,

    /// Signals that log a status line.
    #[serde(default = "default_status")]
    pub status: Vec<String>,
}

impl Default for SignalsConfig {
    fn default() -> Self {
        Self {
            shutdown: default_shutdown(),
            status: default_status(),
        }
    }
}

impl SignalsConfig {
    /// Every configured signal, shutdown signals first.
    pub fn trapped(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for name in self.shutdown.iter().chain(&self.status) {
            if !names.contains(&name.as_str()) {
                names.push(name);
            }
        }
        names
    }
}

fn default_shutdown() -> Vec<String> {
    vec!["INT".to_string(), "TERM".to_string()]
}

fn default_status() -> Vec<String> {
    vec!["USR1".to_string()]
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`.
    #[serde(default = "default_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,

    /// Directory for daily rolling log files. Logs go to stderr when unset.
    #[serde(default)]
    pub dir: Option<PathBuf>,

    /// Topic pattern the stdout log sink subscribes to.
    #[serde(default = "default_sink_filter")]
    pub sink_filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
            dir: None,
            sink_filter: default_sink_filter(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

fn default_sink_filter() -> String {
    "log.#".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.dispatcher, DispatcherConfig::default());
        assert_eq!(config.signals.shutdown, vec!["INT", "TERM"]);
        assert_eq!(config.signals.status, vec!["USR1"]);
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);
        assert!(config.logging.dir.is_none());
        assert_eq!(config.logging.sink_filter, "log.#");
    }

    #[test]
    fn test_trapped_dedupes() {
        let signals = SignalsConfig {
            shutdown: vec!["INT".to_string(), "TERM".to_string()],
            status: vec!["USR1".to_string(), "TERM".to_string()],
        };
        assert_eq!(signals.trapped(), vec!["INT", "TERM", "USR1"]);
    }

    #[test]
    fn test_serialize_roundtrip_keeps_defaults() {
        let config = Config::default();
        let text = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.signals, config.signals);
        assert_eq!(parsed.logging, config.logging);
    }
}
