//! Sending signals to processes.

use nix::sys::signal::kill;
use nix::unistd::Pid;
use tracing::info;

use crate::error::SignalResult;
use crate::names::{self, IntoSignal};

/// Send a signal to a process.
pub fn send_signal<S: IntoSignal>(pid: i32, signal: S) -> SignalResult<()> {
    let signal = signal.into_signal()?;
    kill(Pid::from_raw(pid), signal).map_err(std::io::Error::from)?;
    info!("Sent SIG{} to PID {}", names::name(signal), pid);
    Ok(())
}
