use super::*;
use std::sync::atomic::Ordering;
use std::sync::{mpsc, Barrier};
use std::time::Duration;

use crate::source::Source;

#[test]
fn test_run_returns_with_loop_live() {
    let d = ThreadedDispatcher::new();
    d.run().unwrap();
    assert!(d.is_running());
    d.wait().unwrap();
    assert!(d.is_stopped());
}

#[test]
fn test_work_runs_on_worker_thread() {
    let config = DispatcherConfig {
        thread_name: "enkidu-test-worker".to_string(),
        ..Default::default()
    };
    let d = ThreadedDispatcher::start(config).unwrap();
    let (tx, rx) = mpsc::channel();
    d.schedule(vec![], move |_| {
        tx.send(thread::current().name().map(str::to_string)).ok();
        Ok(())
    });
    let name = rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(name.as_deref(), Some("enkidu-test-worker"));
    d.wait().unwrap();
}

#[test]
fn test_run_twice_fails() {
    let d = ThreadedDispatcher::new();
    d.run().unwrap();
    assert!(matches!(d.run(), Err(DispatchError::AlreadyRunning)));
    d.wait().unwrap();
}

#[test]
fn test_join_without_run_fails() {
    let d = ThreadedDispatcher::new();
    assert!(matches!(d.join(), Err(DispatchError::NotRunning)));
}

#[test]
fn test_join_surfaces_invocable_error() {
    let d = ThreadedDispatcher::new();
    d.run().unwrap();
    d.schedule(vec![], |_| Err(anyhow::anyhow!("humbaba")));
    let result = d.join();
    assert!(matches!(result, Err(DispatchError::Invocable(_))));
}

#[test]
fn test_worker_exits_before_marker() {
    let d = ThreadedDispatcher::new();
    d.schedule(vec![], |_| Err(anyhow::anyhow!("early failure")));
    assert!(matches!(d.run(), Err(DispatchError::Invocable(_))));
    assert!(matches!(d.join(), Err(DispatchError::NotRunning)));
}

#[test]
fn test_sources_run_on_start_and_stop_on_wait() {
    #[derive(Default)]
    struct Hooks {
        runs: std::sync::atomic::AtomicU32,
        stops: std::sync::atomic::AtomicU32,
    }
    impl Source for Hooks {
        fn run(&self) {
            self.runs.fetch_add(1, Ordering::SeqCst);
        }
        fn stop(&self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    let d = ThreadedDispatcher::new();
    let hooks = Arc::new(Hooks::default());
    d.add(hooks.clone(), Some("hooks"));
    d.run().unwrap();
    assert_eq!(hooks.runs.load(Ordering::SeqCst), 1);
    d.wait().unwrap();
    assert_eq!(hooks.stops.load(Ordering::SeqCst), 1);
}

#[test]
fn test_restart_after_wait() {
    let d = ThreadedDispatcher::new();
    d.run().unwrap();
    d.wait().unwrap();
    d.run().unwrap();
    d.wait().unwrap();
}

#[test]
fn test_concurrent_run_starts_one_worker() {
    for _ in 0..50 {
        let d = Arc::new(ThreadedDispatcher::new());
        let barrier = Arc::new(Barrier::new(2));
        let callers: Vec<_> = (0..2)
            .map(|_| {
                let d = d.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    d.run()
                })
            })
            .collect();
        let results: Vec<_> = callers.into_iter().map(|c| c.join().unwrap()).collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(DispatchError::AlreadyRunning))));
        assert!(d.is_running());
        // The stored worker is the live loop.
        d.wait().unwrap();
        assert!(d.is_stopped());
    }
}

#[test]
fn test_run_while_loop_runs_elsewhere() {
    let d = ThreadedDispatcher::new();
    let dispatcher = d.dispatcher().clone();
    let direct = thread::spawn(move || dispatcher.run());
    while !d.is_running() {
        thread::sleep(Duration::from_millis(1));
    }

    assert!(matches!(d.run(), Err(DispatchError::AlreadyRunning)));
    assert!(matches!(d.join(), Err(DispatchError::NotRunning)));
    d.stop();
    direct.join().unwrap().unwrap();
}
