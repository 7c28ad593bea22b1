//! The `run` command: a threaded dispatcher with a stdout log sink and
//! signal-driven shutdown.

use std::io;
use std::sync::{Arc, Weak};

use serde_json::json;
use tracing::{error, info};

use enkidu_config::Config;
use enkidu_dispatcher::{Dispatcher, LogSink, LogSource, ThreadedDispatcher};
use enkidu_signals::{SignalSource, SignalTrapper};

/// Run until a shutdown signal is handled.
pub(crate) fn run(config: &Config) -> anyhow::Result<()> {
    info!("Starting Enkidu v{}", env!("CARGO_PKG_VERSION"));
    info!("Trapping {}", config.signals.trapped().join(", "));

    let d = ThreadedDispatcher::with_config(config.dispatcher.clone());
    LogSink::new(io::stdout())
        .with_filter(config.logging.sink_filter.as_str())
        .attach(d.dispatcher())?;
    let log = Arc::new(LogSource::new(
        d.dispatcher().clone(),
        json!({"atts": {"pid": std::process::id()}}),
    ));

    let trapper = Arc::new(SignalTrapper::new()?);
    let signals = d
        .dispatcher()
        .add_with(Some("signals"), |d| SignalSource::new(d, trapper.clone()));

    let dispatcher = Arc::downgrade(d.dispatcher());
    let shutdown_log = log.clone();
    signals.on(&config.signals.shutdown, move |args| {
        let name = args.first().and_then(|v| v.as_str()).unwrap_or("?");
        shutdown_log.info(json!({"message": format!("Received {}, shutting down", name)}))?;
        if let Some(dispatcher) = dispatcher.upgrade() {
            dispatcher.stop();
        }
        Ok(())
    })?;

    let dispatcher = Arc::downgrade(d.dispatcher());
    let status_log = log.clone();
    signals.on(&config.signals.status, move |_| {
        if let Some(message) = status_message(&dispatcher) {
            status_log.info(json!({"message": message}))?;
        }
        Ok(())
    })?;

    d.run()?;
    log.info(json!({
        "message": format!("Running; trapping {}", signals.registered().join(", "))
    }))?;

    let result = d.join();
    trapper.wait()?;

    match result {
        Ok(()) => {
            info!("Enkidu stopped");
            Ok(())
        }
        Err(e) => {
            error!("Dispatcher failed: {}", e);
            Err(e.into())
        }
    }
}

fn status_message(dispatcher: &Weak<Dispatcher>) -> Option<String> {
    let d = dispatcher.upgrade()?;
    Some(format!(
        "Status: {} ({} pending, {} handlers, {} sources)",
        d.state(),
        d.pending(),
        d.handler_count(),
        d.source_count()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_message() {
        let d = Arc::new(Dispatcher::new());
        d.on("x", |_| Ok(())).unwrap();
        d.schedule(vec![], |_| Ok(()));

        let message = status_message(&Arc::downgrade(&d)).unwrap();
        assert_eq!(message, "Status: stopped (1 pending, 1 handlers, 0 sources)");
    }

    #[test]
    fn test_status_message_after_drop() {
        let d = Arc::new(Dispatcher::new());
        let weak = Arc::downgrade(&d);
        drop(d);
        assert!(status_message(&weak).is_none());
    }
}
