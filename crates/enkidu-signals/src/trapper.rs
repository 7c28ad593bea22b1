//! Deferred, serialized signal handling.
//!
//! Signal handlers run in a context where locks, allocation and most library
//! calls are off limits. The trapper keeps the handler down to a single
//! `write(2)` of the signal number onto a socket pair; a dedicated consumer
//! thread reads the numbers back in delivery order and runs the registered
//! callbacks one at a time, where anything goes.
//!
//! Signal dispositions are process-wide. Create one trapper per process and
//! share it.

use std::collections::HashMap;
use std::io::{ErrorKind, Read, Write};
use std::os::fd::AsFd;
use std::os::unix::net::UnixStream;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use nix::sys::signal::Signal;
use parking_lot::Mutex;
use signal_hook::consts::FORBIDDEN;
use signal_hook::SigId;
use tracing::{debug, error, info, warn};

use crate::error::{SignalError, SignalResult};
use crate::names::{self, IntoSignal};

/// Byte written to the pipe to end the consumer thread. No signal has number 0.
const STOP: u8 = 0;

const THREAD_NAME: &str = "enkidu-signals";

/// Callback run on the consumer thread with the canonical signal name.
pub type SignalCallback = Arc<dyn Fn(&'static str) + Send + Sync>;

/// Handle to one registered callback, for [`SignalTrapper::deregister`].
///
/// Two subscriptions are equal when their ids are.
#[derive(Debug, Clone, Copy)]
pub struct Subscription {
    signal: Signal,
    id: u64,
}

impl Subscription {
    pub fn signal(&self) -> Signal {
        self.signal
    }

    /// Canonical name of the subscribed signal.
    pub fn name(&self) -> &'static str {
        names::name(self.signal)
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

impl PartialEq for Subscription {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Subscription {}

impl PartialEq<u64> for Subscription {
    fn eq(&self, other: &u64) -> bool {
        self.id == *other
    }
}

#[derive(Default)]
struct Registry {
    callbacks: Vec<(Subscription, SignalCallback)>,
    trapped: HashMap<Signal, SigId>,
    next_id: u64,
}

impl Registry {
    fn callbacks_for(&self, signal: Signal) -> Vec<SignalCallback> {
        self.callbacks
            .iter()
            .filter(|(sub, _)| sub.signal == signal)
            .map(|(_, callback)| callback.clone())
            .collect()
    }
}

/// Runs signal callbacks serially on a background thread.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use enkidu_signals::SignalTrapper;
///
/// let trapper = Arc::new(SignalTrapper::new().unwrap());
/// let handle = trapper.clone();
/// let shutdown = move |sig: &str| {
///     println!("Received {}, shutting down", sig);
///     handle.stop().ok();
/// };
/// trapper.register("INT", shutdown.clone()).unwrap();
/// trapper.register("TERM", shutdown).unwrap();
/// trapper.register("USR1", |_| println!("still here")).unwrap();
///
/// trapper.join().unwrap();
/// ```
pub struct SignalTrapper {
    registry: Arc<Mutex<Registry>>,
    writer: Arc<UnixStream>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SignalTrapper {
    /// Create a trapper and start its consumer thread. No signal is trapped
    /// until a callback is registered for it.
    pub fn new() -> SignalResult<Self> {
        let (reader, writer) = UnixStream::pair()?;
        // A full pipe drops deliveries instead of blocking the handler.
        writer.set_nonblocking(true)?;

        let registry = Arc::new(Mutex::new(Registry::default()));
        let consumer = registry.clone();
        let worker = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || consume(reader, consumer))?;

        Ok(Self {
            registry,
            writer: Arc::new(writer),
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Register a callback for a signal, trapping the signal if this is its
    /// first callback.
    pub fn register<S, F>(&self, signal: S, callback: F) -> SignalResult<Subscription>
    where
        S: IntoSignal,
        F: Fn(&'static str) + Send + Sync + 'static,
    {
        let signal = signal.into_signal()?;
        let mut registry = self.registry.lock();

        if !registry.trapped.contains_key(&signal) {
            let id = self.trap(signal)?;
            registry.trapped.insert(signal, id);
            info!("Trapped SIG{}", names::name(signal));
        }

        let subscription = Subscription {
            signal,
            id: registry.next_id,
        };
        registry.next_id += 1;
        registry.callbacks.push((subscription, Arc::new(callback)));
        debug!("Callback {} registered for {}", subscription.id, subscription.name());
        Ok(subscription)
    }

    /// Remove one callback. The signal stays trapped.
    pub fn deregister(&self, subscription: &Subscription) -> bool {
        let mut registry = self.registry.lock();
        let before = registry.callbacks.len();
        registry.callbacks.retain(|(sub, _)| sub != subscription);
        registry.callbacks.len() != before
    }

    pub fn is_trapped<S: IntoSignal>(&self, signal: S) -> bool {
        match signal.into_signal() {
            Ok(signal) => self.registry.lock().trapped.contains_key(&signal),
            Err(_) => false,
        }
    }

    /// Number of callbacks registered for a signal.
    pub fn callback_count<S: IntoSignal>(&self, signal: S) -> usize {
        match signal.into_signal() {
            Ok(signal) => self
                .registry
                .lock()
                .callbacks
                .iter()
                .filter(|(sub, _)| sub.signal == signal)
                .count(),
            Err(_) => 0,
        }
    }

    /// Tell the consumer thread to exit once it has handled every delivery
    /// queued so far.
    ///
    /// Stopping a trapper whose consumer has already exited is a no-op. While
    /// the consumer still runs, a full socket buffer fails with
    /// [`SignalError::Io`] of kind `WouldBlock`.
    pub fn stop(&self) -> SignalResult<()> {
        match (&*self.writer).write_all(&[STOP]) {
            Ok(()) => {}
            Err(e)
                if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::BrokenPipe)
                    && self.consumer_exited() =>
            {
                debug!("Signal trapper already stopped");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }
        debug!("Signal trapper stop requested");
        Ok(())
    }

    fn consumer_exited(&self) -> bool {
        self.worker
            .lock()
            .as_ref()
            .is_none_or(JoinHandle::is_finished)
    }

    /// Block until the consumer thread exits.
    ///
    /// A panic raised by a callback is resumed on the caller.
    pub fn join(&self) -> SignalResult<()> {
        let handle = self
            .worker
            .lock()
            .take()
            .ok_or(SignalError::NotRunning)?;
        match handle.join() {
            Ok(()) => Ok(()),
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    /// `stop` then `join`.
    pub fn wait(&self) -> SignalResult<()> {
        self.stop()?;
        self.join()
    }

    /// Queue a delivery exactly as the OS-level handler does.
    #[cfg(test)]
    pub(crate) fn deliver(&self, signal: Signal) -> SignalResult<()> {
        (&*self.writer).write_all(&[signal as i32 as u8])?;
        Ok(())
    }

    fn trap(&self, signal: Signal) -> SignalResult<SigId> {
        ensure_trappable(signal)?;
        let number = signal as i32;

        let writer = self.writer.clone();
        let byte = [number as u8];
        // SAFETY: the action only performs a single write(2) on a socket that
        // outlives the registration; it neither locks nor allocates.
        let id = unsafe {
            signal_hook::low_level::register(number, move || {
                let _ = nix::unistd::write(writer.as_fd(), &byte);
            })
        }?;
        Ok(id)
    }
}

/// Fails with [`SignalError::Forbidden`] for signals that cannot be trapped.
pub(crate) fn ensure_trappable(signal: Signal) -> SignalResult<()> {
    if FORBIDDEN.contains(&(signal as i32)) {
        return Err(SignalError::Forbidden(names::name(signal)));
    }
    Ok(())
}

impl Drop for SignalTrapper {
    fn drop(&mut self) {
        let trapped: Vec<SigId> = self.registry.lock().trapped.drain().map(|(_, id)| id).collect();
        for id in trapped {
            signal_hook::low_level::unregister(id);
        }
        if self.worker.lock().is_some() {
            let _ = (&*self.writer).write_all(&[STOP]);
        }
    }
}

/// Consumer loop: one byte per delivery, `STOP` ends it.
fn consume(mut reader: UnixStream, registry: Arc<Mutex<Registry>>) {
    let mut byte = [0u8; 1];
    loop {
        match reader.read(&mut byte) {
            Ok(0) => {
                warn!("Signal pipe closed");
                break;
            }
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                error!("Signal pipe read failed: {}", e);
                break;
            }
        }

        if byte[0] == STOP {
            break;
        }

        let signal = match Signal::try_from(byte[0] as i32) {
            Ok(signal) => signal,
            Err(_) => {
                warn!("Ignoring unknown signal number {}", byte[0]);
                continue;
            }
        };

        let name = names::name(signal);
        let callbacks = registry.lock().callbacks_for(signal);
        debug!("Handling SIG{} ({} callbacks)", name, callbacks.len());
        for callback in callbacks {
            callback(name);
        }
    }
    debug!("Signal trapper stopped");
}

#[cfg(test)]
#[path = "trapper_tests.rs"]
mod tests;
