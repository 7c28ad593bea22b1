//! Structured log messages carried over the dispatcher.
//!
//! A [`LogSource`] turns attribute objects into signals on the `log` topic
//! (or the topic named by their `type` attribute). A [`LogSink`] subscribes to
//! those topics and writes one formatted line per message.
//!
//! Messages are JSON objects. Recognized attributes:
//!
//! - `type`: topic to signal, defaults to `log`
//! - `tags`: list of tags, rendered as `[TAG]` prefixes
//! - `atts`: object of short key/value pairs, rendered as `[key=value]`
//! - `message`: the text
//! - `exception`: `{ "message": ..., "cause": [...] }`

use std::io::Write;
use std::sync::Arc;

use anyhow::Context;
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use tracing::warn;

use crate::dispatcher::{Dispatcher, HandlerId};
use crate::error::DispatchResult;
use crate::merge::{deep_merge, MergeError};
use crate::queue::{Args, InvokeResult};
use crate::source::Source;

const DEFAULT_TYPE: &str = "log";
const DEFAULT_FILTER: &str = "log.#";
const ATT_WIDTH: usize = 10;

// ============================================================================
// LogSource
// ============================================================================

/// Emits log messages as dispatcher signals.
pub struct LogSource {
    dispatcher: Arc<Dispatcher>,
    defaults: Value,
}

impl LogSource {
    /// Create a source whose messages are merged over `defaults`.
    pub fn new(dispatcher: Arc<Dispatcher>, defaults: Value) -> Self {
        Self {
            dispatcher,
            defaults,
        }
    }

    /// Create a source without defaults.
    pub fn plain(dispatcher: Arc<Dispatcher>) -> Self {
        Self::new(dispatcher, Value::Object(Map::new()))
    }

    pub fn defaults(&self) -> &Value {
        &self.defaults
    }

    /// Signal a message. Returns the number of handlers it was scheduled for.
    pub fn log(&self, atts: Value) -> Result<usize, MergeError> {
        let atts = deep_merge(&self.defaults, &atts)?;
        let topic = atts
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_TYPE)
            .to_string();
        Ok(self.dispatcher.signal(topic, vec![atts]))
    }

    pub fn info(&self, atts: Value) -> Result<usize, MergeError> {
        self.log(deep_merge(&json!({"tags": ["INFO"]}), &atts)?)
    }

    pub fn error(&self, atts: Value) -> Result<usize, MergeError> {
        self.log(deep_merge(&json!({"tags": ["ERROR"]}), &atts)?)
    }

    /// Log an error along with every error in its `source()` chain.
    pub fn exception(&self, err: &(dyn std::error::Error + 'static)) -> Result<usize, MergeError> {
        let mut causes = Vec::new();
        let mut current = err.source();
        while let Some(cause) = current {
            causes.push(Value::String(cause.to_string()));
            current = cause.source();
        }

        let message = err.to_string();
        self.log(json!({
            "tags": ["ERROR", "EXCEPTION"],
            "message": message,
            "exception": {
                "message": message,
                "cause": causes,
            },
        }))
    }

    /// Subscribe to `log.<pattern>`.
    pub fn tail<F>(&self, pattern: &str, f: F) -> DispatchResult<HandlerId>
    where
        F: Fn(Args) -> InvokeResult + Send + Sync + 'static,
    {
        self.dispatcher.on(format!("log.{}", pattern), f)
    }

    /// Subscribe to every log message.
    pub fn tail_all<F>(&self, f: F) -> DispatchResult<HandlerId>
    where
        F: Fn(Args) -> InvokeResult + Send + Sync + 'static,
    {
        self.tail("#", f)
    }
}

// ============================================================================
// LogSink
// ============================================================================

/// Formats a message into a single line (without the trailing newline).
pub type Formatter = Box<dyn Fn(&Value) -> String + Send + Sync>;

/// Writes log messages signalled on the dispatcher to a writer.
///
/// ```rust
/// use std::sync::Arc;
/// use enkidu_dispatcher::{Dispatcher, LogSink, LogSource};
/// use serde_json::json;
///
/// let d = Arc::new(Dispatcher::new());
/// LogSink::new(std::io::stdout()).attach(&d).unwrap();
/// LogSource::plain(d.clone())
///     .info(json!({"message": "gate opened"}))
///     .unwrap();
/// d.run_once().unwrap();
/// ```
pub struct LogSink {
    writer: Mutex<Box<dyn Write + Send>>,
    filter: String,
    formatter: Formatter,
}

impl LogSink {
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
            filter: DEFAULT_FILTER.to_string(),
            formatter: Box::new(format_message),
        }
    }

    /// Subscribe to `filter` instead of every log topic.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    pub fn with_formatter<F>(mut self, formatter: F) -> Self
    where
        F: Fn(&Value) -> String + Send + Sync + 'static,
    {
        self.formatter = Box::new(formatter);
        self
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Subscribe to the filter and register as a source, so the writer is
    /// flushed when the dispatcher stops with cleanup.
    pub fn attach(self, dispatcher: &Dispatcher) -> DispatchResult<Arc<Self>> {
        let sink = Arc::new(self);
        let handler = sink.clone();
        dispatcher.on(sink.filter.as_str(), move |args| {
            match args.first() {
                Some(msg) => handler.write(msg),
                None => Ok(()),
            }
        })?;
        dispatcher.add(sink.clone(), None);
        Ok(sink)
    }

    /// Format and write one message.
    pub fn write(&self, msg: &Value) -> InvokeResult {
        let line = (self.formatter)(msg);
        let mut writer = self.writer.lock();
        writeln!(writer, "{}", line).context("Failed to write log line")?;
        Ok(())
    }
}

impl Source for LogSink {
    fn stop(&self) {
        if let Err(e) = self.writer.lock().flush() {
            warn!("Failed to flush log sink: {}", e);
        }
    }
}

/// Default line format:
///
/// ```text
/// [INFO][AUDIT] [pid=4242] [user=gilgamesh] gate opened
/// ```
///
/// followed by the exception message and its causes on separate lines.
pub fn format_message(msg: &Value) -> String {
    let mut line = String::new();

    if let Some(tags) = msg.get("tags").and_then(Value::as_array) {
        for tag in tags {
            line.push_str(&format!("[{}]", text(tag)));
        }
        line.push(' ');
    }

    if let Some(atts) = msg.get("atts").and_then(Value::as_object) {
        for (key, value) in atts {
            let value: String = text(value).chars().take(ATT_WIDTH).collect();
            line.push_str(&format!("[{}={}]", key, value));
        }
        line.push(' ');
    }

    if let Some(message) = msg.get("message") {
        line.push_str(&text(message));
    }

    if let Some(exception) = msg.get("exception") {
        line.push('\n');
        line.push_str(&exception.get("message").map(text).unwrap_or_default());
        if let Some(causes) = exception.get("cause").and_then(Value::as_array) {
            for cause in causes {
                line.push_str(&format!("\n  caused by: {}", text(cause)));
            }
        }
    }

    line
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
