//! # Enkidu Dispatcher
//!
//! Thread-safe work queue and topic router for a process sidekick.
//!
//! ## Architecture
//!
//! ```text
//!   producers (any thread)                     loop thread
//!  ┌────────────────────────┐               ┌────────────────────────┐
//!  │ schedule / unshift     │──┐            │ run()                  │
//!  │ schedule_batch         │  │  ┌──────┐  │  fire source hooks     │
//!  │ signal(topic, args)    │──┼─▶│queue │─▶│  pop, invoke, repeat   │
//!  │ stop / stop_now        │──┘  └──────┘  │  stop: cleanup, exit   │
//!  └────────────────────────┘               └────────────────────────┘
//! ```
//!
//! Everything that touches the queue, the handler table, the source registry
//! or the state happens under one lock. Invocables always run on the loop
//! thread, one at a time, outside the lock.
//!
//! ## Key Components
//!
//! - [`Dispatcher`]: the queue, the handler table and the loop
//! - [`ThreadedDispatcher`]: the same loop on a worker thread
//! - [`Pattern`] / [`Topic`]: dot-delimited topic matching with `*` and `#`
//! - [`Source`]: lifecycle hooks for attached objects
//! - [`LogSource`] / [`LogSink`]: structured log messages carried as signals
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use enkidu_dispatcher::Dispatcher;
//! use serde_json::json;
//!
//! let d = Arc::new(Dispatcher::new());
//! d.on("door.*", |args| {
//!     println!("door event: {:?}", args);
//!     Ok(())
//! })
//! .unwrap();
//!
//! d.signal("door.opened", vec![json!({"by": "gilgamesh"})]);
//! d.run_once().unwrap();
//! ```

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod log;
pub mod merge;
pub mod queue;
pub mod source;
pub mod state;
pub mod threaded;
pub mod topic;

// Re-exports
pub use config::DispatcherConfig;
pub use dispatcher::{Dispatcher, HandlerId};
pub use error::{DispatchError, DispatchResult};
pub use log::{format_message, Formatter, LogSink, LogSource};
pub use merge::{deep_merge, MergeError};
pub use queue::{Args, BatchEntry, InvokeResult, Position, StopCallback};
pub use source::Source;
pub use state::DispatcherState;
pub use threaded::ThreadedDispatcher;
pub use topic::{IntoPattern, Pattern, Topic};
