//! Cluster diagnostics
//!
//! Failure-triggered dump of cluster state for the DataScienceCluster e2e
//! suite, plus a structured health report built from the same checks.
//! The dump is driven through [`gate`]; each stage writes to a [`DumpLog`].

pub mod deployment;
pub mod events;
pub mod gate;
pub mod health;
pub mod node;
pub mod operator;
pub mod platform;
pub mod pod;
pub mod quantity;
pub mod resources;
pub mod types;

pub use gate::{DiagnosticKey, Diagnostics, DumpOutcome};
pub use types::*;

use crate::config::DiagnosticsConfig;
use kube::Client;

/// Run every dump stage in order.
///
/// Stages are sequential and independent; a failing cluster read is logged
/// and only ends the stage it happened in.
pub async fn run_all_diagnostics(client: &Client, config: &DiagnosticsConfig, log: &mut DumpLog) {
    node::debug_cluster_state(client, log).await;
    deployment::debug_namespace_resources(client, config, log).await;
    operator::debug_operator_status(client, config, log).await;
    platform::debug_platform_status(client, config, log).await;
    events::debug_recent_events(client, config, log).await;
    resources::debug_resource_quotas(client, config, log).await;
}
