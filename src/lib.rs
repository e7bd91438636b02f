//! dscdiag - failure-triggered cluster diagnostics for DataScienceCluster e2e tests
//!
//! Register a client once, wrap test bodies with [`handle_global_panic`], and
//! call [`handle_test_failure`] from failure hooks. Each trigger dumps the
//! cluster state at most once per process.

pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod debug;
pub mod error;
pub mod redact;

pub use debug::gate::{
    global, global_debug_client, handle_global_panic, handle_test_failure, last_panic_at,
    set_global_debug_client,
};
pub use redact::redact_sensitive_info;
