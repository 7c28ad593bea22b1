//! Signals as dispatcher events.

use std::sync::{Arc, Weak};

use enkidu_dispatcher::{Args, Dispatcher, HandlerId, InvokeResult, Source};
use nix::sys::signal::Signal;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

use crate::error::{SignalError, SignalResult};
use crate::names::{self, IntoSignal};
use crate::trapper::{ensure_trappable, SignalTrapper, Subscription};

/// Topic a signal is published on.
pub fn topic(name: &str) -> String {
    format!("signal.{}", name)
}

/// Turns OS signals into `signal.<NAME>` events on a dispatcher, so their
/// handlers run on the dispatcher's loop like any other scheduled work.
///
/// Handlers receive the canonical signal name as their only argument.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use enkidu_dispatcher::ThreadedDispatcher;
/// use enkidu_signals::{SignalSource, SignalTrapper};
///
/// let d = ThreadedDispatcher::new();
/// let trapper = Arc::new(SignalTrapper::new().unwrap());
/// let signals = SignalSource::new(d.dispatcher(), trapper);
///
/// let dispatcher = d.dispatcher().clone();
/// signals
///     .on(["INT", "TERM"], move |args| {
///         println!("Received {:?}, shutting down", args);
///         dispatcher.stop();
///         Ok(())
///     })
///     .unwrap();
///
/// d.run().unwrap();
/// d.join().unwrap();
/// ```
pub struct SignalSource {
    dispatcher: Weak<Dispatcher>,
    trapper: Arc<SignalTrapper>,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl SignalSource {
    pub fn new(dispatcher: &Arc<Dispatcher>, trapper: Arc<SignalTrapper>) -> Self {
        Self {
            dispatcher: Arc::downgrade(dispatcher),
            trapper,
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    pub fn trapper(&self) -> &Arc<SignalTrapper> {
        &self.trapper
    }

    /// Subscribe `f` to each of `signals` and make sure they are trapped.
    ///
    /// All names are normalized and checked before anything is subscribed,
    /// so an unrecognized or untrappable name leaves nothing behind. If
    /// trapping fails after that, the new handlers are removed again.
    pub fn on<I, S, F>(&self, signals: I, f: F) -> SignalResult<Vec<HandlerId>>
    where
        I: IntoIterator<Item = S>,
        S: IntoSignal,
        F: Fn(Args) -> InvokeResult + Send + Sync + 'static,
    {
        let signals = signals
            .into_iter()
            .map(IntoSignal::into_signal)
            .collect::<SignalResult<Vec<Signal>>>()?;
        for &signal in &signals {
            ensure_trappable(signal)?;
        }
        let dispatcher = self.dispatcher()?;

        let f = Arc::new(f);
        let mut ids = Vec::with_capacity(signals.len());
        for &signal in &signals {
            let handler = f.clone();
            match dispatcher.on(topic(names::name(signal)), move |args| handler(args)) {
                Ok(id) => ids.push(id),
                Err(e) => {
                    self.off(&ids);
                    return Err(e.into());
                }
            }
        }
        if let Err(e) = self.register(signals) {
            self.off(&ids);
            return Err(e);
        }
        Ok(ids)
    }

    /// Alias of [`SignalSource::on`].
    pub fn trap<I, S, F>(&self, signals: I, f: F) -> SignalResult<Vec<HandlerId>>
    where
        I: IntoIterator<Item = S>,
        S: IntoSignal,
        F: Fn(Args) -> InvokeResult + Send + Sync + 'static,
    {
        self.on(signals, f)
    }

    /// Subscribe to a single signal.
    ///
    /// ```rust,ignore
    /// signals.on_signal(Signal::SIGUSR1, |_| { /* dump stats */ Ok(()) })?;
    /// ```
    pub fn on_signal<S, F>(&self, signal: S, f: F) -> SignalResult<HandlerId>
    where
        S: IntoSignal,
        F: Fn(Args) -> InvokeResult + Send + Sync + 'static,
    {
        let signal = signal.into_signal()?;
        ensure_trappable(signal)?;
        let dispatcher = self.dispatcher()?;
        let id = dispatcher.on(topic(names::name(signal)), f)?;
        if let Err(e) = self.register([signal]) {
            dispatcher.unsubscribe(id);
            return Err(e);
        }
        Ok(id)
    }

    /// Remove dispatcher handlers. The signals stay trapped.
    pub fn off(&self, ids: &[HandlerId]) {
        if let Some(dispatcher) = self.dispatcher.upgrade() {
            for &id in ids {
                dispatcher.unsubscribe(id);
            }
        }
    }

    /// Trap signals without subscribing anything. Each signal is registered
    /// with the trapper at most once per source.
    pub fn register<I, S>(&self, signals: I) -> SignalResult<()>
    where
        I: IntoIterator<Item = S>,
        S: IntoSignal,
    {
        for signal in signals {
            let signal = signal.into_signal()?;
            let mut subscriptions = self.subscriptions.lock();
            if subscriptions.iter().any(|s| s.signal() == signal) {
                continue;
            }

            let dispatcher = self.dispatcher.clone();
            let subscription = self.trapper.register(signal, move |name| {
                if let Some(dispatcher) = dispatcher.upgrade() {
                    dispatcher.signal(topic(name), vec![Value::String(name.to_string())]);
                }
            })?;
            debug!("Signal source registered {}", subscription.name());
            subscriptions.push(subscription);
        }
        Ok(())
    }

    /// Canonical names of the signals this source has registered.
    pub fn registered(&self) -> Vec<&'static str> {
        self.subscriptions.lock().iter().map(Subscription::name).collect()
    }

    fn dispatcher(&self) -> SignalResult<Arc<Dispatcher>> {
        self.dispatcher.upgrade().ok_or(SignalError::DispatcherDropped)
    }
}

impl Source for SignalSource {}

#[cfg(test)]
#[path = "source_tests.rs"]
mod tests;
