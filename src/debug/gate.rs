//! Diagnostic trigger gate
//!
//! Decides whether a dump runs for a given trigger. Each trigger key runs at
//! most once per process; concurrent dumps for different keys are
//! serialized so their output does not interleave.

use super::run_all_diagnostics;
use super::types::DumpLog;
use crate::config::DiagnosticsConfig;
use chrono::{DateTime, TimeZone, Utc};
use dashmap::DashSet;
use futures::FutureExt;
use kube::Client;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::OnceLock;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// What caused a dump request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DiagnosticKey {
    /// Any panic in the wrapped test body; shared by all panics
    Panic,
    /// A named test failure
    TestFailure(String),
    /// An explicit request, e.g. from the CLI
    Manual(String),
}

impl fmt::Display for DiagnosticKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKey::Panic => write!(f, "panic"),
            DiagnosticKey::TestFailure(name) => write!(f, "test:{name}"),
            DiagnosticKey::Manual(label) => write!(f, "manual:{label}"),
        }
    }
}

/// Result of a dump request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpOutcome {
    Ran,
    AlreadyTriggered,
    NoClient,
}

/// Process-wide diagnostics state
pub struct Diagnostics {
    config: DiagnosticsConfig,
    client: OnceLock<Client>,
    triggered: DashSet<String>,
    dump_lock: Mutex<()>,
    /// Unix nanos of the last panic dump, 0 when none
    last_panic_nanos: AtomicI64,
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("config", &self.config)
            .field("has_client", &self.client.get().is_some())
            .field("triggered", &self.triggered.len())
            .finish()
    }
}

impl Diagnostics {
    pub fn new(config: DiagnosticsConfig) -> Self {
        Self {
            config,
            client: OnceLock::new(),
            triggered: DashSet::new(),
            dump_lock: Mutex::new(()),
            last_panic_nanos: AtomicI64::new(0),
        }
    }

    pub fn config(&self) -> &DiagnosticsConfig {
        &self.config
    }

    /// Register the cluster client. Only the first call takes effect;
    /// returns whether this call stored the client.
    pub fn set_client(&self, client: Client) -> bool {
        self.client.set(client).is_ok()
    }

    pub fn client(&self) -> Option<Client> {
        self.client.get().cloned()
    }

    pub fn is_triggered(&self, key: &DiagnosticKey) -> bool {
        self.triggered.contains(&key.to_string())
    }

    /// Mark `key` as triggered; true only for the first caller
    pub fn try_claim(&self, key: &DiagnosticKey) -> bool {
        self.triggered.insert(key.to_string())
    }

    /// Run the full dump pipeline once for `key`
    pub async fn run_once(&self, key: &DiagnosticKey) -> DumpOutcome {
        self.run_once_with(key, full_dump).await
    }

    /// Run `dump` once for `key`, holding the dump lock for its duration.
    ///
    /// Callers that lose the race for `key` return immediately without
    /// waiting on the lock.
    pub async fn run_once_with<F, Fut>(&self, key: &DiagnosticKey, dump: F) -> DumpOutcome
    where
        F: FnOnce(Client, DiagnosticsConfig) -> Fut,
        Fut: Future<Output = ()>,
    {
        if !self.try_claim(key) {
            info!("Diagnostics already ran for key {key}");
            return DumpOutcome::AlreadyTriggered;
        }

        info!(target: "dscdiag::dump", "=== RUNNING CLUSTER DIAGNOSTICS (triggered by {key}) ===");
        let _guard = self.dump_lock.lock().await;

        let Some(client) = self.client() else {
            error!("Global debug client not available; skipping diagnostics for {key}");
            return DumpOutcome::NoClient;
        };

        dump(client, self.config.clone()).await;
        info!(target: "dscdiag::dump", "=== END CLUSTER DIAGNOSTICS ({key}) ===");
        DumpOutcome::Ran
    }

    /// Await `fut`; if it panics, dump diagnostics once and re-raise the
    /// original panic payload.
    pub async fn handle_global_panic<F: Future>(&self, fut: F) -> F::Output {
        self.handle_global_panic_with(fut, full_dump).await
    }

    /// [`Self::handle_global_panic`] with a caller-supplied dump. A panic
    /// inside `dump` is logged and swallowed; the payload re-raised is
    /// always the one from `fut`.
    pub async fn handle_global_panic_with<F, D, DFut>(&self, fut: F, dump: D) -> F::Output
    where
        F: Future,
        D: FnOnce(Client, DiagnosticsConfig) -> DFut,
        DFut: Future<Output = ()>,
    {
        match AssertUnwindSafe(fut).catch_unwind().await {
            Ok(output) => output,
            Err(payload) => {
                error!(target: "dscdiag::dump", "=== PANIC DETECTED: {} ===", panic_message(&*payload));
                self.last_panic_nanos
                    .store(Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX), Ordering::Relaxed);
                let dumped = AssertUnwindSafe(self.run_once_with(&DiagnosticKey::Panic, dump))
                    .catch_unwind()
                    .await;
                if let Err(secondary) = dumped {
                    error!(
                        "Diagnostics panicked while handling a panic: {}",
                        panic_message(&*secondary)
                    );
                }
                std::panic::resume_unwind(payload)
            }
        }
    }

    /// Dump diagnostics once for a named failing test. Never panics.
    pub async fn handle_test_failure(&self, test_name: &str) -> DumpOutcome {
        warn!(target: "dscdiag::dump", "=== TEST FAILURE DETECTED: {test_name} ===");
        let outcome = self
            .run_once(&DiagnosticKey::TestFailure(test_name.to_string()))
            .await;
        info!("Diagnostics for test {test_name} finished: {outcome:?}");
        outcome
    }

    /// When the last panic dump started, if any
    pub fn last_panic_at(&self) -> Option<DateTime<Utc>> {
        match self.last_panic_nanos.load(Ordering::Relaxed) {
            0 => None,
            nanos => Some(Utc.timestamp_nanos(nanos)),
        }
    }
}

async fn full_dump(client: Client, config: DiagnosticsConfig) {
    let mut log = DumpLog::streaming();
    run_all_diagnostics(&client, &config, &mut log).await;
}

/// Text of a panic payload from `panic!` with a literal or formatted message
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

static GLOBAL: OnceLock<Diagnostics> = OnceLock::new();

/// Process-wide instance; configuration comes from the environment on
/// first use
pub fn global() -> &'static Diagnostics {
    GLOBAL.get_or_init(|| Diagnostics::new(DiagnosticsConfig::from_env()))
}

/// Register the client used by all diagnostics in this process.
/// The first registration wins.
pub fn set_global_debug_client(client: Client) -> bool {
    let stored = global().set_client(client);
    if !stored {
        warn!("Global debug client already set; ignoring");
    }
    stored
}

pub fn global_debug_client() -> Option<Client> {
    global().client()
}

/// Wrap a test body so a panic dumps diagnostics before propagating
pub async fn handle_global_panic<F: Future>(fut: F) -> F::Output {
    global().handle_global_panic(fut).await
}

pub async fn handle_test_failure(test_name: &str) -> DumpOutcome {
    global().handle_test_failure(test_name).await
}

pub fn last_panic_at() -> Option<DateTime<Utc>> {
    global().last_panic_at()
}
