//! Dispatcher core implementation.
//!
//! The Dispatcher maintains a queue of invocables that are run in the order
//! they were added, on whichever thread calls [`Dispatcher::run`]. When the
//! queue is empty the running thread sleeps until something is scheduled.
//!
//! Every operation is thread-safe. One mutex guards the queue, the handler
//! table and the source registry; invocables always execute outside of it,
//! so a running invocable may schedule, signal or stop the same dispatcher.
//!
//! ```rust
//! use std::sync::Arc;
//! use enkidu_dispatcher::Dispatcher;
//! use serde_json::json;
//!
//! let d = Arc::new(Dispatcher::new());
//! d.schedule(vec![], |_| {
//!     println!("hello from the scheduler");
//!     Ok(())
//! });
//! d.on("event", |args| {
//!     println!("{:?}", args);
//!     Ok(())
//! })
//! .unwrap();
//!
//! // Signalling doesn't run handlers, it only schedules them.
//! d.signal("event", vec![json!("argument here")]);
//! d.run_once().unwrap();
//! ```

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, info};

use crate::config::DispatcherConfig;
use crate::error::{DispatchError, DispatchResult};
use crate::queue::{
    Args, BatchEntry, HandlerFn, InvokeResult, Position, QueueItem, StopCallback, StopCommand,
};
use crate::source::{Source, SourceRegistry};
use crate::state::DispatcherState;
use crate::topic::{IntoPattern, Pattern, Topic};

/// Identifier of a registered handler, unique per dispatcher and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

impl HandlerId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for HandlerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct Handler {
    id: HandlerId,
    pattern: Pattern,
    callable: Arc<HandlerFn>,
}

/// State guarded by the dispatcher lock.
#[derive(Default)]
struct Inner {
    queue: VecDeque<QueueItem>,
    handlers: Vec<Handler>,
    next_handler_id: u64,
    sources: SourceRegistry,
    state: DispatcherState,
}

impl Inner {
    fn insert(&mut self, position: Position, item: QueueItem) {
        match position {
            Position::Front => self.queue.push_front(item),
            Position::Back => self.queue.push_back(item),
        }
    }
}

/// Single-consumer event loop with topic-based publish/subscribe.
pub struct Dispatcher {
    inner: Mutex<Inner>,
    /// Signalled on every enqueue; the running thread waits on it while the queue is empty.
    wakeup: Condvar,
    config: DispatcherConfig,
}

impl Dispatcher {
    /// Create a new, stopped dispatcher.
    pub fn new() -> Self {
        Self::with_config(DispatcherConfig::default())
    }

    /// Create a new dispatcher with the given configuration.
    pub fn with_config(config: DispatcherConfig) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            wakeup: Condvar::new(),
            config,
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Get current state.
    pub fn state(&self) -> DispatcherState {
        self.inner.lock().state
    }

    pub fn is_running(&self) -> bool {
        self.state() == DispatcherState::Running
    }

    pub fn is_stopped(&self) -> bool {
        self.state() == DispatcherState::Stopped
    }

    /// Number of queued items, stop commands included.
    pub fn pending(&self) -> usize {
        self.inner.lock().queue.len()
    }

    /// Number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.inner.lock().handlers.len()
    }

    /// Number of attached sources.
    pub fn source_count(&self) -> usize {
        self.inner.lock().sources.len()
    }

    // ========================================================================
    // Scheduling
    // ========================================================================

    /// Schedule an invocable at the back of the queue, so anything scheduled
    /// before it runs first.
    pub fn schedule<F>(&self, args: Args, f: F)
    where
        F: FnOnce(Args) -> InvokeResult + Send + 'static,
    {
        self.enqueue(
            Position::Back,
            QueueItem::Invoke {
                job: Box::new(f),
                args,
            },
        );
    }

    /// Alias of [`Dispatcher::schedule`].
    pub fn push<F>(&self, args: Args, f: F)
    where
        F: FnOnce(Args) -> InvokeResult + Send + 'static,
    {
        self.schedule(args, f);
    }

    /// Schedule an invocable at the front of the queue, cutting in line.
    pub fn unshift<F>(&self, args: Args, f: F)
    where
        F: FnOnce(Args) -> InvokeResult + Send + 'static,
    {
        self.enqueue(
            Position::Front,
            QueueItem::Invoke {
                job: Box::new(f),
                args,
            },
        );
    }

    /// Schedule several entries under a single lock acquisition.
    ///
    /// No other producer can insert between entries of the batch. Entries are
    /// applied in list order, each at its own position. If any entry lacks a
    /// callable nothing is enqueued.
    pub fn schedule_batch(&self, entries: Vec<BatchEntry>) -> DispatchResult<()> {
        let items = entries
            .into_iter()
            .map(|entry| {
                let job = entry.job.ok_or(DispatchError::InvalidInvocable)?;
                Ok((
                    entry.position,
                    QueueItem::Invoke {
                        job,
                        args: entry.args,
                    },
                ))
            })
            .collect::<DispatchResult<Vec<_>>>()?;

        let mut inner = self.inner.lock();
        for (position, item) in items {
            inner.insert(position, item);
        }
        drop(inner);
        self.wakeup.notify_one();
        Ok(())
    }

    fn enqueue(&self, position: Position, item: QueueItem) {
        self.inner.lock().insert(position, item);
        self.wakeup.notify_one();
    }

    // ========================================================================
    // Handlers
    // ========================================================================

    /// Add a handler, scheduled every time a topic matching `pattern` is signalled.
    ///
    /// The pattern is a dot-delimited string, a list of segments, or a
    /// [`regex::Regex`]. See [`crate::topic`] for the matching rules.
    pub fn on<P, F>(&self, pattern: P, f: F) -> DispatchResult<HandlerId>
    where
        P: IntoPattern,
        F: Fn(Args) -> InvokeResult + Send + Sync + 'static,
    {
        let pattern = pattern.into_pattern()?;
        let mut inner = self.inner.lock();
        let id = HandlerId(inner.next_handler_id);
        inner.next_handler_id += 1;
        debug!("Handler {} registered for {}", id, pattern.as_str());
        inner.handlers.push(Handler {
            id,
            pattern,
            callable: Arc::new(f),
        });
        Ok(id)
    }

    /// Alias of [`Dispatcher::on`].
    pub fn subscribe<P, F>(&self, pattern: P, f: F) -> DispatchResult<HandlerId>
    where
        P: IntoPattern,
        F: Fn(Args) -> InvokeResult + Send + Sync + 'static,
    {
        self.on(pattern, f)
    }

    /// Remove a handler. Returns `false` if no handler had this id.
    ///
    /// Invocations already scheduled by an earlier `signal` still run.
    pub fn remove_handler(&self, id: HandlerId) -> bool {
        let mut inner = self.inner.lock();
        let before = inner.handlers.len();
        inner.handlers.retain(|h| h.id != id);
        let removed = inner.handlers.len() != before;
        if removed {
            debug!("Handler {} removed", id);
        }
        removed
    }

    /// Alias of [`Dispatcher::remove_handler`].
    pub fn unsubscribe(&self, id: HandlerId) -> bool {
        self.remove_handler(id)
    }

    /// Signal a topic.
    ///
    /// Every handler whose pattern matches is scheduled at the back of the
    /// queue with a copy of `args`, in registration order. Nothing runs
    /// synchronously. Returns the number of handlers scheduled.
    ///
    /// ```rust,ignore
    /// d.signal("foo.bar.baz", args);
    /// d.signal(["foo", "bar", "baz"], args); // same as above
    /// ```
    pub fn signal(&self, topic: impl Into<Topic>, args: Args) -> usize {
        let topic = topic.into();
        let mut inner = self.inner.lock();
        let matched: Vec<Arc<HandlerFn>> = inner
            .handlers
            .iter()
            .filter(|h| h.pattern.is_match(topic.as_str()))
            .map(|h| h.callable.clone())
            .collect();
        let count = matched.len();
        for handler in matched {
            inner
                .queue
                .push_back(QueueItem::handler(handler, args.clone()));
        }
        drop(inner);

        if count > 0 {
            self.wakeup.notify_one();
        }
        count
    }

    // ========================================================================
    // Sources
    // ========================================================================

    /// Attach a source, optionally under a name.
    ///
    /// If the dispatcher is running the source's `run` hook is called right
    /// away on this thread; otherwise it is called when `run` next starts.
    pub fn add<S: Source>(&self, source: Arc<S>, name: Option<&str>) {
        let running = {
            let mut inner = self.inner.lock();
            let running = inner.state == DispatcherState::Running;
            inner.sources.add(source.clone(), name, running);
            running
        };
        debug!("Source attached (name: {:?}, running: {})", name, running);
        if running {
            source.run();
        }
    }

    /// Build a source from this dispatcher and attach it.
    pub fn add_with<S, F>(self: &Arc<Self>, name: Option<&str>, factory: F) -> Arc<S>
    where
        S: Source,
        F: FnOnce(&Arc<Dispatcher>) -> S,
    {
        let source = Arc::new(factory(self));
        self.add(source.clone(), name);
        source
    }

    /// Look up a named source.
    pub fn source(&self, name: &str) -> Option<Arc<dyn Source>> {
        self.inner.lock().sources.get(name)
    }

    /// Look up a named source by its concrete type.
    pub fn source_as<T: Source>(&self, name: &str) -> Option<Arc<T>> {
        self.inner.lock().sources.get_as::<T>(name)
    }

    // ========================================================================
    // Run / Stop
    // ========================================================================

    /// Run the loop, blocking the current thread until a stop command is processed.
    ///
    /// An error returned by an invocable ends the loop and is returned as
    /// [`DispatchError::Invocable`]; the rest of the queue is left in place.
    pub fn run(&self) -> DispatchResult<()> {
        let pending_sources = {
            let mut inner = self.inner.lock();
            if inner.state == DispatcherState::Running {
                return Err(DispatchError::AlreadyRunning);
            }
            inner.state = DispatcherState::Running;
            inner.sources.take_pending()
        };
        let _running = RunningGuard { dispatcher: self };
        info!("Dispatcher running");

        for source in pending_sources {
            source.run();
        }

        loop {
            match self.next_item() {
                QueueItem::Invoke { job, args } => {
                    job(args).map_err(DispatchError::Invocable)?;
                }
                QueueItem::Stop(command) => {
                    self.process_stop(command);
                    info!("Dispatcher stopped");
                    return Ok(());
                }
            }
        }
    }

    /// Run everything queued so far, then stop.
    pub fn run_once(&self) -> DispatchResult<()> {
        self.schedule_stop_command(None, false);
        self.run()
    }

    /// Like [`Dispatcher::run_once`], calling `callback` as the stop completes.
    pub fn run_once_with<F>(&self, callback: F) -> DispatchResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.schedule_stop_command(Some(Box::new(callback)), false);
        self.run()
    }

    /// Append a stop command regardless of the current state.
    pub fn schedule_stop(&self, cleanup: bool) {
        self.schedule_stop_command(None, cleanup);
    }

    fn schedule_stop_command(&self, callback: Option<StopCallback>, cleanup: bool) {
        self.enqueue(Position::Back, QueueItem::Stop(StopCommand { callback, cleanup }));
    }

    /// Stop the dispatcher once everything scheduled before now has run.
    /// Attached sources have their `stop` hook called.
    ///
    /// Idempotent: returns `true` if the dispatcher is running and a stop
    /// was scheduled, `false` if it is already stopped.
    pub fn stop(&self) -> bool {
        self.request_stop(None, true, Position::Back)
    }

    /// Like [`Dispatcher::stop`]. `callback` runs as the stop completes, or
    /// immediately if the dispatcher is already stopped.
    pub fn stop_with<F>(&self, callback: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.request_stop(Some(Box::new(callback)), true, Position::Back)
    }

    /// Stop the dispatcher before anything else already queued runs.
    ///
    /// Source cleanup only happens if `cleanup` is set. Same idempotence as
    /// [`Dispatcher::stop`].
    pub fn stop_now(&self, cleanup: bool) -> bool {
        self.request_stop(None, cleanup, Position::Front)
    }

    /// Like [`Dispatcher::stop_now`], with a completion callback.
    pub fn stop_now_with<F>(&self, cleanup: bool, callback: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.request_stop(Some(Box::new(callback)), cleanup, Position::Front)
    }

    fn request_stop(
        &self,
        callback: Option<StopCallback>,
        cleanup: bool,
        position: Position,
    ) -> bool {
        let mut inner = self.inner.lock();
        if inner.state == DispatcherState::Stopped {
            drop(inner);
            if let Some(callback) = callback {
                callback();
            }
            return false;
        }

        debug!("Stop requested (position: {:?}, cleanup: {})", position, cleanup);
        inner.insert(position, QueueItem::Stop(StopCommand { callback, cleanup }));
        drop(inner);
        self.wakeup.notify_one();
        true
    }

    /// Block until an item is available and pop it.
    fn next_item(&self) -> QueueItem {
        let mut inner = self.inner.lock();
        loop {
            if let Some(item) = inner.queue.pop_front() {
                return item;
            }
            self.wakeup.wait(&mut inner);
        }
    }

    fn process_stop(&self, command: StopCommand) {
        if command.cleanup {
            let sources = self.inner.lock().sources.take_for_cleanup();
            for source in sources {
                source.stop();
            }
        }
        if let Some(callback) = command.callback {
            callback();
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns the dispatcher to `Stopped` when `run` exits, by any path.
struct RunningGuard<'a> {
    dispatcher: &'a Dispatcher,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.dispatcher.inner.lock().state = DispatcherState::Stopped;
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
