//! Configuration for the dispatcher.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Dispatcher configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Name given to the worker thread of a threaded dispatcher.
    #[serde(default = "default_thread_name")]
    pub thread_name: String,

    /// How often a threaded dispatcher polls for its start marker (in milliseconds).
    #[serde(default = "default_start_poll_interval_ms")]
    pub start_poll_interval_ms: u64,
}

fn default_thread_name() -> String {
    "enkidu-dispatcher".to_string()
}

fn default_start_poll_interval_ms() -> u64 {
    10
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            thread_name: default_thread_name(),
            start_poll_interval_ms: default_start_poll_interval_ms(),
        }
    }
}

impl DispatcherConfig {
    /// Get the start poll interval as a Duration.
    pub fn start_poll_interval(&self) -> Duration {
        Duration::from_millis(self.start_poll_interval_ms)
    }
}
