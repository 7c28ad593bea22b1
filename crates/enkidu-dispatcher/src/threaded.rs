//! Dispatcher running on a dedicated worker thread.

use std::ops::Deref;
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};

use parking_lot::Mutex;
use tracing::{debug, error};

use crate::config::DispatcherConfig;
use crate::dispatcher::Dispatcher;
use crate::error::{DispatchError, DispatchResult};

/// A [`Dispatcher`] whose loop runs on its own thread, so `run` does not block.
///
/// ```rust,no_run
/// use enkidu_dispatcher::{DispatcherConfig, ThreadedDispatcher};
///
/// let d = ThreadedDispatcher::start(DispatcherConfig::default()).unwrap();
/// d.schedule(vec![], |_| {
///     println!("running on the worker thread");
///     Ok(())
/// });
/// d.wait().unwrap();
/// ```
pub struct ThreadedDispatcher {
    dispatcher: Arc<Dispatcher>,
    worker: Mutex<Option<JoinHandle<DispatchResult<()>>>>,
}

impl ThreadedDispatcher {
    /// Create a stopped threaded dispatcher.
    pub fn new() -> Self {
        Self::with_config(DispatcherConfig::default())
    }

    /// Create a stopped threaded dispatcher with the given configuration.
    pub fn with_config(config: DispatcherConfig) -> Self {
        Self::from_dispatcher(Arc::new(Dispatcher::with_config(config)))
    }

    /// Wrap an existing dispatcher.
    pub fn from_dispatcher(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            worker: Mutex::new(None),
        }
    }

    /// Create a threaded dispatcher and start it.
    pub fn start(config: DispatcherConfig) -> DispatchResult<Self> {
        let threaded = Self::with_config(config);
        threaded.run()?;
        Ok(threaded)
    }

    /// The wrapped dispatcher, for handing to sources and handlers.
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Start the loop on a worker thread.
    ///
    /// Returns once the loop has executed a start marker on that worker, so
    /// the caller can rely on it being live. Concurrent callers are
    /// serialized; all but the first get [`DispatchError::AlreadyRunning`].
    pub fn run(&self) -> DispatchResult<()> {
        let mut worker = self.worker.lock();
        if self.dispatcher.is_running() {
            return Err(DispatchError::AlreadyRunning);
        }
        if let Some(previous) = worker.take() {
            // Stopped but never joined; the thread is on its way out.
            match previous.join() {
                Ok(Err(e)) => debug!("Discarding result of previous dispatcher thread: {}", e),
                Ok(Ok(())) => {}
                Err(panic) => std::panic::resume_unwind(panic),
            }
        }

        // The marker records which thread ran it. A loop already running
        // elsewhere may pick it up, in which case it is scheduled again.
        let started: Arc<Mutex<Option<ThreadId>>> = Arc::new(Mutex::new(None));
        self.schedule_marker(&started);

        let config = self.dispatcher.config();
        let dispatcher = self.dispatcher.clone();
        let handle = thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || {
                let result = dispatcher.run();
                if let Err(ref e) = result {
                    error!("Dispatcher thread terminated: {}", e);
                }
                result
            })?;

        let poll_interval = config.start_poll_interval();
        loop {
            let ran_on = started.lock().take();
            if ran_on == Some(handle.thread().id()) {
                break;
            }
            if handle.is_finished() {
                // The loop exited, or never started, before reaching the marker.
                return finish(handle);
            }
            if ran_on.is_some() {
                self.schedule_marker(&started);
            }
            thread::sleep(poll_interval);
        }

        debug!("Dispatcher thread {} started", config.thread_name);
        *worker = Some(handle);
        Ok(())
    }

    fn schedule_marker(&self, started: &Arc<Mutex<Option<ThreadId>>>) {
        let marker = started.clone();
        self.dispatcher.schedule(vec![], move |_| {
            *marker.lock() = Some(thread::current().id());
            Ok(())
        });
    }

    /// Wait for the worker thread to exit and return its result.
    ///
    /// A panic on the worker thread is resumed on the caller.
    pub fn join(&self) -> DispatchResult<()> {
        let handle = self
            .worker
            .lock()
            .take()
            .ok_or(DispatchError::NotRunning)?;
        finish(handle)
    }

    /// `stop` then `join`.
    pub fn wait(&self) -> DispatchResult<()> {
        self.dispatcher.stop();
        self.join()
    }
}

fn finish(handle: JoinHandle<DispatchResult<()>>) -> DispatchResult<()> {
    match handle.join() {
        Ok(result) => result,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}

impl Default for ThreadedDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for ThreadedDispatcher {
    type Target = Dispatcher;

    fn deref(&self) -> &Dispatcher {
        &self.dispatcher
    }
}

#[cfg(test)]
#[path = "threaded_tests.rs"]
mod tests;
