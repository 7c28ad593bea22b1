use super::*;
use std::sync::mpsc;
use std::time::Duration;

use enkidu_dispatcher::ThreadedDispatcher;
use serde_json::json;

fn setup() -> (Arc<Dispatcher>, Arc<SignalTrapper>, SignalSource) {
    let d = Arc::new(Dispatcher::new());
    let trapper = Arc::new(SignalTrapper::new().unwrap());
    let source = SignalSource::new(&d, trapper.clone());
    (d, trapper, source)
}

#[test]
fn test_topic() {
    assert_eq!(topic("INT"), "signal.INT");
}

#[test]
fn test_on_subscribes_normalized_topics() {
    let (d, trapper, source) = setup();
    let ids = source.on(["SIGUSR1", "usr2"], |_| Ok(())).unwrap();

    assert_eq!(ids.len(), 2);
    assert_eq!(d.handler_count(), 2);
    assert_eq!(source.registered(), vec!["USR1", "USR2"]);
    assert!(trapper.is_trapped("USR1"));
    assert!(trapper.is_trapped("USR2"));
    trapper.wait().unwrap();
}

#[test]
fn test_signal_registered_with_trapper_once() {
    let (d, trapper, source) = setup();
    source.on(["USR1"], |_| Ok(())).unwrap();
    source.trap(["SIGUSR1"], |_| Ok(())).unwrap();
    source.register(["USR1"]).unwrap();

    assert_eq!(d.handler_count(), 2);
    assert_eq!(trapper.callback_count("USR1"), 1);
    trapper.wait().unwrap();
}

#[test]
fn test_unrecognized_signal_subscribes_nothing() {
    let (d, trapper, source) = setup();
    let result = source.on(["USR1", "HUMBABA"], |_| Ok(()));

    assert!(matches!(result, Err(SignalError::UnrecognizedSignal(_))));
    assert_eq!(d.handler_count(), 0);
    assert!(source.registered().is_empty());
    trapper.wait().unwrap();
}

#[test]
fn test_forbidden_signal_subscribes_nothing() {
    let (d, trapper, source) = setup();
    let result = source.on(["USR2", "KILL"], |_| Ok(()));

    assert!(matches!(result, Err(SignalError::Forbidden("KILL"))));
    assert_eq!(d.handler_count(), 0);
    assert!(source.registered().is_empty());
    assert!(!trapper.is_trapped("USR2"));

    let result = source.on_signal("STOP", |_| Ok(()));
    assert!(matches!(result, Err(SignalError::Forbidden("STOP"))));
    assert_eq!(d.handler_count(), 0);
    trapper.wait().unwrap();
}

#[test]
fn test_delivery_is_scheduled_on_dispatcher() {
    let d = ThreadedDispatcher::new();
    let trapper = Arc::new(SignalTrapper::new().unwrap());
    let source = SignalSource::new(d.dispatcher(), trapper.clone());

    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    source
        .on(["USR1", "USR2"], move |args| {
            tx.lock().send(args).ok();
            Ok(())
        })
        .unwrap();
    d.run().unwrap();

    trapper.deliver(Signal::SIGUSR2).unwrap();
    trapper.deliver(Signal::SIGUSR1).unwrap();

    let first = rx.recv_timeout(Duration::from_secs(2)).unwrap();
    let second = rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(first, vec![json!("USR2")]);
    assert_eq!(second, vec![json!("USR1")]);

    trapper.wait().unwrap();
    d.wait().unwrap();
}

#[test]
fn test_off_keeps_signal_trapped() {
    let (d, trapper, source) = setup();
    let ids = source.on(["HUP"], |_| Ok(())).unwrap();

    source.off(&ids);
    assert_eq!(d.handler_count(), 0);
    assert!(trapper.is_trapped("HUP"));

    // Delivery now matches nothing.
    trapper.deliver(Signal::SIGHUP).unwrap();
    trapper.wait().unwrap();
    assert_eq!(d.pending(), 0);
}

#[test]
fn test_on_signal() {
    let (d, trapper, source) = setup();
    let id = source.on_signal(Signal::SIGUSR1, |_| Ok(())).unwrap();

    assert_eq!(source.registered(), vec!["USR1"]);
    assert!(d.unsubscribe(id));
    trapper.wait().unwrap();
}

#[test]
fn test_dispatcher_dropped() {
    let (d, trapper, source) = setup();
    drop(d);
    assert!(matches!(
        source.on(["USR1"], |_| Ok(())),
        Err(SignalError::DispatcherDropped)
    ));
    trapper.wait().unwrap();
}

#[test]
fn test_attach_as_named_source() {
    let d = Arc::new(Dispatcher::new());
    let trapper = Arc::new(SignalTrapper::new().unwrap());
    let attached = d.add_with(Some("signals"), |d| SignalSource::new(d, trapper.clone()));
    attached.register(["USR2"]).unwrap();

    let found = d.source_as::<SignalSource>("signals").unwrap();
    assert_eq!(found.registered(), vec!["USR2"]);
    assert!(Arc::ptr_eq(found.trapper(), &trapper));
    trapper.wait().unwrap();
}
