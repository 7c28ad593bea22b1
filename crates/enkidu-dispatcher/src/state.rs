//! Dispatcher run state.

use serde::{Deserialize, Serialize};

/// Dispatcher state.
///
/// Moves to `Running` only on entry to `run`, and back to `Stopped` only
/// while the loop processes a stop command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatcherState {
    /// Not running; the queue may still hold items.
    #[default]
    Stopped,
    /// A thread is inside `run`.
    Running,
}

impl std::fmt::Display for DispatcherState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatcherState::Stopped => write!(f, "stopped"),
            DispatcherState::Running => write!(f, "running"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(DispatcherState::Stopped.to_string(), "stopped");
        assert_eq!(DispatcherState::Running.to_string(), "running");
    }

    #[test]
    fn test_default_is_stopped() {
        assert_eq!(DispatcherState::default(), DispatcherState::Stopped);
    }
}
