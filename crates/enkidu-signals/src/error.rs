//! Error types for signal handling.

use enkidu_dispatcher::DispatchError;
use thiserror::Error;

/// Signal handling errors.
#[derive(Debug, Error)]
pub enum SignalError {
    #[error("Unrecognized signal {0}")]
    UnrecognizedSignal(String),

    #[error("Signal {0} cannot be trapped")]
    Forbidden(&'static str),

    #[error("Signal pipe error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Signal trapper is not running")]
    NotRunning,

    #[error("Dispatcher has been dropped")]
    DispatcherDropped,

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Result type for signal operations.
pub type SignalResult<T> = Result<T, SignalError>;
