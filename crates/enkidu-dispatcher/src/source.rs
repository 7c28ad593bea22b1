//! Sources attached to a dispatcher.
//!
//! A source is any external object that wants to be told when the dispatcher
//! starts and when it shuts down with cleanup. Both hooks are optional.

use std::any::Any;
use std::sync::Arc;

/// An object attached to a dispatcher for lifecycle coordination.
pub trait Source: Any + Send + Sync {
    /// Called when the source is attached to a running dispatcher, or when
    /// the dispatcher next starts running.
    fn run(&self) {}

    /// Called during a cleanup-flagged shutdown.
    fn stop(&self) {}
}

struct SourceEntry {
    source: Arc<dyn Source>,
    any: Arc<dyn Any + Send + Sync>,
    name: Option<String>,
    started: bool,
}

/// Registered sources, in registration order.
#[derive(Default)]
pub(crate) struct SourceRegistry {
    entries: Vec<SourceEntry>,
}

impl SourceRegistry {
    /// Register a source. `started` marks whether its `run` hook is being
    /// fired by the caller right away.
    pub(crate) fn add<S: Source>(&mut self, source: Arc<S>, name: Option<&str>, started: bool) {
        self.entries.push(SourceEntry {
            source: source.clone(),
            any: source,
            name: name.map(str::to_string),
            started,
        });
    }

    /// Sources whose `run` hook has not fired yet. They are marked as started.
    pub(crate) fn take_pending(&mut self) -> Vec<Arc<dyn Source>> {
        self.entries
            .iter_mut()
            .filter(|e| !e.started)
            .map(|e| {
                e.started = true;
                e.source.clone()
            })
            .collect()
    }

    /// All sources, for cleanup. They become pending again for the next run.
    pub(crate) fn take_for_cleanup(&mut self) -> Vec<Arc<dyn Source>> {
        self.entries
            .iter_mut()
            .map(|e| {
                e.started = false;
                e.source.clone()
            })
            .collect()
    }

    /// Look up a named source. The most recent registration wins.
    pub(crate) fn get(&self, name: &str) -> Option<Arc<dyn Source>> {
        self.find(name).map(|e| e.source.clone())
    }

    /// Look up a named source by its concrete type.
    pub(crate) fn get_as<T: Source>(&self, name: &str) -> Option<Arc<T>> {
        self.find(name)
            .and_then(|e| Arc::downcast::<T>(e.any.clone()).ok())
    }

    fn find(&self, name: &str) -> Option<&SourceEntry> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.name.as_deref() == Some(name))
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
