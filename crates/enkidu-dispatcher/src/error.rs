//! Error types for the dispatcher.

use thiserror::Error;

/// Errors that can occur in the dispatcher.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A scheduled entry was submitted without anything to invoke.
    #[error("No callable detected")]
    InvalidInvocable,

    /// `run` was called while the loop is already running.
    #[error("Dispatcher is already running")]
    AlreadyRunning,

    /// `join` was called on a threaded dispatcher that was never started.
    #[error("Dispatcher is not running")]
    NotRunning,

    /// A raw regular expression pattern failed to compile.
    #[error("Invalid topic pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A queued invocable returned an error; the loop was terminated.
    #[error("Invocable failed: {0}")]
    Invocable(#[source] anyhow::Error),

    /// The worker thread could not be spawned.
    #[error("Failed to spawn dispatcher thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Result type for dispatcher operations.
pub type DispatchResult<T> = Result<T, DispatchError>;
