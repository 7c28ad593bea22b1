//! # Enkidu Signals
//!
//! OS signal handling for the Enkidu dispatcher.
//!
//! - [`SignalTrapper`]: traps signals and runs their callbacks serially on a
//!   dedicated thread, outside the signal handler
//! - [`SignalSource`]: re-publishes trapped signals as `signal.<NAME>`
//!   dispatcher events
//! - [`normalize`] / [`signal_table`]: canonical signal names
//!
//! Signal dispositions belong to the whole process. Create a single
//! [`SignalTrapper`], wrap it in an `Arc`, and hand it to everything that
//! needs signals.

#![cfg(unix)]

pub mod error;
pub mod names;
pub mod send;
pub mod source;
pub mod trapper;

// Re-exports
pub use error::{SignalError, SignalResult};
pub use names::{normalize, signal_table, IntoSignal};
pub use nix::sys::signal::Signal;
pub use send::send_signal;
pub use source::SignalSource;
pub use trapper::{SignalCallback, SignalTrapper, Subscription};
