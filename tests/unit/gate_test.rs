//! Trigger gate tests
//!
//! At-most-once per key, serialization of concurrent dumps, client
//! registration and panic propagation.

#[allow(dead_code)]
mod common {
    include!("../common/mod.rs");
}

use dscdiag::config::DiagnosticsConfig;
use dscdiag::debug::{DiagnosticKey, Diagnostics, DumpOutcome};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn diagnostics() -> Diagnostics {
    Diagnostics::new(DiagnosticsConfig::default())
}

// ============================================================================
// Key independence
// ============================================================================

#[tokio::test]
async fn test_distinct_keys_each_run_once() {
    let diag = diagnostics();
    diag.set_client(common::unreachable_client("default"));
    let runs = AtomicUsize::new(0);
    let runs_ref = &runs;
    let count = move || async move {
        runs_ref.fetch_add(1, Ordering::SeqCst);
    };

    let keys = [
        DiagnosticKey::Panic,
        DiagnosticKey::TestFailure("TestDataScienceCluster".into()),
        DiagnosticKey::TestFailure("TestDSCInitialization".into()),
        DiagnosticKey::Manual("ci".into()),
    ];
    for key in &keys {
        assert_eq!(diag.run_once_with(key, |_, _| count()).await, DumpOutcome::Ran);
    }
    for key in &keys {
        assert_eq!(
            diag.run_once_with(key, |_, _| count()).await,
            DumpOutcome::AlreadyTriggered
        );
        assert!(diag.is_triggered(key));
    }

    assert_eq!(runs.load(Ordering::SeqCst), keys.len());
}

#[tokio::test]
async fn test_untriggered_key_not_marked() {
    let diag = diagnostics();
    diag.set_client(common::unreachable_client("default"));
    diag.run_once_with(&DiagnosticKey::Panic, |_, _| async {}).await;

    assert!(!diag.is_triggered(&DiagnosticKey::TestFailure("other".into())));
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_same_key_runs_once() {
    let diag = Arc::new(diagnostics());
    diag.set_client(common::unreachable_client("default"));
    let runs = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..16 {
        let diag = diag.clone();
        let runs = runs.clone();
        handles.push(tokio::spawn(async move {
            diag.run_once_with(&DiagnosticKey::TestFailure("TestRace".into()), move |_, _| async move {
                runs.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
            })
            .await
        }));
    }

    let mut ran = 0;
    for handle in handles {
        if handle.await.unwrap() == DumpOutcome::Ran {
            ran += 1;
        }
    }

    assert_eq!(ran, 1);
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_dumps_for_different_keys_do_not_overlap() {
    let diag = Arc::new(diagnostics());
    diag.set_client(common::unreachable_client("default"));
    let in_flight = Arc::new(AtomicUsize::new(0));
    let max_in_flight = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for i in 0..6 {
        let diag = diag.clone();
        let in_flight = in_flight.clone();
        let max_in_flight = max_in_flight.clone();
        handles.push(tokio::spawn(async move {
            diag.run_once_with(&DiagnosticKey::TestFailure(format!("Test{i}")), move |_, _| async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max_in_flight.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            })
            .await
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), DumpOutcome::Ran);
    }

    assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Client registration
// ============================================================================

#[tokio::test]
async fn test_first_client_wins() {
    let diag = diagnostics();
    assert!(diag.client().is_none());

    assert!(diag.set_client(common::unreachable_client("first")));
    assert!(!diag.set_client(common::unreachable_client("second")));

    assert_eq!(diag.client().unwrap().default_namespace(), "first");
}

#[tokio::test]
async fn test_global_registration_first_wins() {
    assert!(dscdiag::set_global_debug_client(common::unreachable_client("global-first")));
    assert!(!dscdiag::set_global_debug_client(common::unreachable_client("global-second")));
    assert_eq!(
        dscdiag::global_debug_client().unwrap().default_namespace(),
        "global-first"
    );
}

#[tokio::test]
async fn test_missing_client_aborts_gracefully() {
    let diag = diagnostics();
    let runs = AtomicUsize::new(0);
    let runs_ref = &runs;

    let outcome = diag
        .run_once_with(&DiagnosticKey::Manual("no-client".into()), move |_, _| async move {
            runs_ref.fetch_add(1, Ordering::SeqCst);
        })
        .await;

    assert_eq!(outcome, DumpOutcome::NoClient);
    assert_eq!(runs.load(Ordering::SeqCst), 0);
}

// ============================================================================
// Panic and failure entry points
// ============================================================================

#[tokio::test]
async fn test_panic_payload_is_rethrown_unchanged() {
    let diag = diagnostics();

    let result = AssertUnwindSafe(diag.handle_global_panic(async {
        panic!("reconcile failed: {}", 42);
    }))
    .catch_unwind()
    .await;

    let payload = result.unwrap_err();
    assert_eq!(
        payload.downcast_ref::<String>().map(String::as_str),
        Some("reconcile failed: 42")
    );
    assert!(diag.is_triggered(&DiagnosticKey::Panic));
    assert!(diag.last_panic_at().is_some());
}

#[tokio::test]
async fn test_second_panic_does_not_dump_again() {
    let diag = diagnostics();

    for _ in 0..2 {
        let result = AssertUnwindSafe(diag.handle_global_panic(async {
            panic!("static message");
        }))
        .catch_unwind()
        .await;
        let payload = result.unwrap_err();
        assert_eq!(payload.downcast_ref::<&str>(), Some(&"static message"));
    }

    assert!(diag.is_triggered(&DiagnosticKey::Panic));
}

#[tokio::test]
async fn test_panicking_dump_keeps_original_payload() {
    let diag = diagnostics();
    diag.set_client(common::unreachable_client("default"));

    let result = AssertUnwindSafe(diag.handle_global_panic_with(
        async {
            panic!("test body failed");
        },
        |_, _| async {
            panic!("dump blew up");
        },
    ))
    .catch_unwind()
    .await;

    let payload = result.unwrap_err();
    assert_eq!(payload.downcast_ref::<&str>(), Some(&"test body failed"));
    assert!(diag.is_triggered(&DiagnosticKey::Panic));

    // dump lock was released by the unwinding dump
    let outcome = diag
        .run_once_with(&DiagnosticKey::Manual("after".into()), |_, _| async {})
        .await;
    assert_eq!(outcome, DumpOutcome::Ran);
}

#[tokio::test]
async fn test_no_panic_passes_output_through() {
    let diag = diagnostics();
    let value = diag.handle_global_panic(async { 7 }).await;

    assert_eq!(value, 7);
    assert!(!diag.is_triggered(&DiagnosticKey::Panic));
    assert!(diag.last_panic_at().is_none());
}

#[tokio::test]
async fn test_test_failure_runs_once_per_name() {
    let diag = diagnostics();

    assert_eq!(diag.handle_test_failure("TestA").await, DumpOutcome::NoClient);
    assert_eq!(diag.handle_test_failure("TestA").await, DumpOutcome::AlreadyTriggered);
    assert_eq!(diag.handle_test_failure("TestB").await, DumpOutcome::NoClient);
    assert!(diag.is_triggered(&DiagnosticKey::TestFailure("TestA".into())));
}
