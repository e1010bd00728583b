//! End-to-end shutdown scenarios driven through `GracefulShutdown::wait`.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Barrier, Notify};

use shutdown_tree::{ShutdownError, TerminationSignal};

mod common;
use common::{signalled_shutdown, Flag};

#[tokio::test]
async fn test_tree_dependencies_shutdown() {
    let (signals, shutdown) = signalled_shutdown(Duration::from_secs(5));

    let db_down = Flag::new();
    let http_down = Flag::new();
    let grpc_down = Flag::new();
    let cache_down = Flag::new();

    let db = db_down.clone();
    shutdown.must_register("db", move |_| {
        let db = db.clone();
        async move { db.set() }
    });

    let (db, http) = (db_down.clone(), http_down.clone());
    shutdown.must_register_dependent("db", "http_server", move |_| {
        let (db, http) = (db.clone(), http.clone());
        async move {
            // Only flip if the dependency already finished.
            if db.is_set() {
                http.set();
            }
        }
    });

    let (db, grpc) = (db_down.clone(), grpc_down.clone());
    shutdown.must_register_dependent("db", "grpc_server", move |_| {
        let (db, grpc) = (db.clone(), grpc.clone());
        async move {
            if db.is_set() {
                grpc.set();
            }
        }
    });

    let (http, cache) = (http_down.clone(), cache_down.clone());
    shutdown.must_register_dependent("http_server", "cache", move |_| {
        let (http, cache) = (http.clone(), cache.clone());
        async move {
            if http.is_set() {
                cache.set();
            }
        }
    });

    let handle = shutdown.wait();
    signals.send(TerminationSignal::Terminate);

    assert!(handle.await.is_ok());
    assert!(db_down.is_set());
    assert!(http_down.is_set());
    assert!(grpc_down.is_set());
    assert!(cache_down.is_set());
}

#[tokio::test]
async fn test_siblings_run_concurrently() {
    let (_signals, shutdown) = signalled_shutdown(Duration::from_secs(2));
    // Both siblings must be inside their callbacks at once to pass the barrier.
    let barrier = Arc::new(Barrier::new(2));
    let flags = [Flag::new(), Flag::new()];

    shutdown.must_register("db", |_| async {});
    for (name, flag) in ["http_server", "grpc_server"].into_iter().zip(flags.clone()) {
        let barrier = barrier.clone();
        shutdown.must_register_dependent("db", name, move |_| {
            let (barrier, flag) = (barrier.clone(), flag.clone());
            async move {
                barrier.wait().await;
                flag.set();
            }
        });
    }

    shutdown.force_shutdown().await;

    assert!(flags.iter().all(Flag::is_set));
}

#[tokio::test]
async fn test_registration_errors() {
    let (_signals, shutdown) = signalled_shutdown(Duration::from_secs(1));

    let err = shutdown
        .register_dependent("db", "http_server", |_| async {})
        .unwrap_err();
    assert!(matches!(err, ShutdownError::NoDependencyRoot(_)));

    shutdown.register("a", |_| async {}).unwrap();
    shutdown.register_dependent("a", "b", |_| async {}).unwrap();
    let err = shutdown.register_dependent("b", "a", |_| async {}).unwrap_err();
    assert!(matches!(err, ShutdownError::CyclicDependency { .. }));

    let err = shutdown.register("b", |_| async {}).unwrap_err();
    assert!(matches!(err, ShutdownError::DuplicateKey(_)));

    assert_eq!(shutdown.tree().len(), 2);
}

#[tokio::test]
async fn test_empty_tree_completes_immediately() {
    let (signals, shutdown) = signalled_shutdown(Duration::from_secs(5));
    let handle = shutdown.wait();
    signals.send(TerminationSignal::Interrupt);

    let result = tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("empty shutdown should not wait for the timeout");
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_second_signal_forces_stop() {
    let (signals, shutdown) = signalled_shutdown(Duration::from_secs(2));
    let saw_abort = Flag::new();
    let started = Arc::new(Notify::new());

    let flag = saw_abort.clone();
    let running = started.clone();
    shutdown.must_register("slow", move |ctx| {
        let flag = flag.clone();
        let running = running.clone();
        async move {
            running.notify_one();
            tokio::select! {
                () = tokio::time::sleep(Duration::from_secs(10)) => {}
                () = ctx.cancelled() => {
                    if ctx.is_cancelled() {
                        flag.set();
                    }
                }
            }
        }
    });

    let handle = shutdown.wait();
    signals.send(TerminationSignal::Interrupt);
    tokio::time::timeout(Duration::from_secs(1), started.notified())
        .await
        .expect("callback never started");
    signals.send(TerminationSignal::Interrupt);

    let result = tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("force stop must not hang");
    assert!(matches!(result, Err(ShutdownError::ForceStop)));

    // Callbacks observe the abort through their context.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(saw_abort.is_set());
}

#[tokio::test]
async fn test_queued_second_signal_skips_callbacks() {
    let (signals, shutdown) = signalled_shutdown(Duration::from_secs(2));
    let ran = Flag::new();

    let flag = ran.clone();
    shutdown.must_register("cache", move |_| {
        let flag = flag.clone();
        async move { flag.set() }
    });

    // Both signals are queued before the orchestrator task is polled.
    let handle = shutdown.wait();
    signals.send(TerminationSignal::Interrupt);
    signals.send(TerminationSignal::Terminate);

    let result = tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("force stop must not hang");
    assert!(matches!(result, Err(ShutdownError::ForceStop)));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!ran.is_set());
}

#[tokio::test]
async fn test_timeout_resolves_successfully() {
    let (signals, shutdown) = signalled_shutdown(Duration::from_millis(100));
    let finished = Flag::new();

    let flag = finished.clone();
    shutdown.must_register("slow", move |_| {
        let flag = flag.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            flag.set();
        }
    });

    let started = Instant::now();
    let handle = shutdown.wait();
    signals.send(TerminationSignal::Terminate);

    assert!(handle.await.is_ok());
    assert!(started.elapsed() < Duration::from_millis(450));
    // The slow callback is still in flight; it is not killed.
    assert!(!finished.is_set());

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert!(finished.is_set());
}

#[tokio::test]
async fn test_expired_deadline_skips_dependents() {
    let (signals, shutdown) = signalled_shutdown(Duration::from_millis(100));
    let parent_done = Flag::new();
    let child_ran = Flag::new();

    let flag = parent_done.clone();
    shutdown.must_register("db", move |_| {
        let flag = flag.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(250)).await;
            flag.set();
        }
    });
    let flag = child_ran.clone();
    shutdown.must_register_dependent("db", "http_server", move |_| {
        let flag = flag.clone();
        async move { flag.set() }
    });

    let handle = shutdown.wait();
    signals.send(TerminationSignal::Terminate);
    assert!(handle.await.is_ok());

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(parent_done.is_set());
    assert!(!child_ran.is_set());
}

#[tokio::test]
async fn test_registration_continues_until_signal() {
    let (signals, shutdown) = signalled_shutdown(Duration::from_secs(5));
    let late = Flag::new();

    let handle = shutdown.wait();

    let registrar = shutdown.clone();
    let flag = late.clone();
    tokio::spawn(async move {
        registrar.must_register("late_component", move |_| {
            let flag = flag.clone();
            async move { flag.set() }
        });
    })
    .await
    .unwrap();

    signals.send(TerminationSignal::Terminate);
    assert!(handle.await.is_ok());
    assert!(late.is_set());
}

#[tokio::test]
async fn test_timeout_read_when_shutdown_starts() {
    let (signals, shutdown) = signalled_shutdown(Duration::from_secs(30));
    shutdown.must_register("slow", |_| async {
        tokio::time::sleep(Duration::from_secs(10)).await;
    });

    let handle = shutdown.wait();
    shutdown.set_timeout(Duration::from_millis(50));
    signals.send(TerminationSignal::Terminate);

    let result = tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("updated timeout should apply");
    assert!(result.is_ok());
}
