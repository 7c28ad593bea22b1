//! Items flowing through the dispatcher queue.

use std::sync::Arc;

use serde_json::Value;

/// Positional arguments passed to an invocable.
pub type Args = Vec<Value>;

/// Result returned by invocables. An error terminates the run loop.
pub type InvokeResult = anyhow::Result<()>;

/// A one-shot scheduled invocable.
pub type Job = Box<dyn FnOnce(Args) -> InvokeResult + Send>;

/// A topic handler; invoked once per matching signal.
pub type HandlerFn = dyn Fn(Args) -> InvokeResult + Send + Sync;

/// Completion callback for a stop command.
pub type StopCallback = Box<dyn FnOnce() + Send>;

/// Where an item is inserted into the queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Position {
    /// Ahead of everything already queued.
    Front,
    /// Behind everything already queued.
    #[default]
    Back,
}

/// Terminal marker consumed by the run loop.
pub(crate) struct StopCommand {
    pub(crate) callback: Option<StopCallback>,
    /// Whether to call `stop` on every registered source.
    pub(crate) cleanup: bool,
}

pub(crate) enum QueueItem {
    Invoke { job: Job, args: Args },
    Stop(StopCommand),
}

impl QueueItem {
    pub(crate) fn handler(handler: Arc<HandlerFn>, args: Args) -> Self {
        QueueItem::Invoke {
            job: Box::new(move |args| handler(args)),
            args,
        }
    }
}

/// One entry of a batch submitted with `schedule_batch`.
///
/// ```rust
/// use enkidu_dispatcher::{BatchEntry, Position};
///
/// let entry = BatchEntry::new(Position::Front)
///     .with_args(vec![serde_json::json!("humbaba")])
///     .callable(|args| {
///         println!("{:?}", args);
///         Ok(())
///     });
/// ```
#[derive(Default)]
pub struct BatchEntry {
    pub(crate) job: Option<Job>,
    pub(crate) args: Args,
    pub(crate) position: Position,
}

impl BatchEntry {
    /// Create an entry with no callable yet.
    pub fn new(position: Position) -> Self {
        Self {
            job: None,
            args: Vec::new(),
            position,
        }
    }

    /// An entry appended to the back of the queue.
    pub fn back<F>(f: F) -> Self
    where
        F: FnOnce(Args) -> InvokeResult + Send + 'static,
    {
        Self::new(Position::Back).callable(f)
    }

    /// An entry inserted at the front of the queue.
    pub fn front<F>(f: F) -> Self
    where
        F: FnOnce(Args) -> InvokeResult + Send + 'static,
    {
        Self::new(Position::Front).callable(f)
    }

    /// Set the invocable.
    pub fn callable<F>(mut self, f: F) -> Self
    where
        F: FnOnce(Args) -> InvokeResult + Send + 'static,
    {
        self.job = Some(Box::new(f));
        self
    }

    /// Set the positional arguments.
    pub fn with_args(mut self, args: Args) -> Self {
        self.args = args;
        self
    }

    /// Where this entry will be inserted.
    pub fn position(&self) -> Position {
        self.position
    }
}
