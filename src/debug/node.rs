//! Node diagnostics
//!
//! Reports node conditions that are not in their healthy state, resource
//! pressure, and allocatable vs. capacity for CPU and memory.

use super::quantity::ParsedQuantity;
use super::types::*;
use crate::error::Result;
use k8s_openapi::api::core::v1::Node;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::{api::ListParams, Api, Client};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Conditions whose healthy status is `False`
const PRESSURE_CONDITIONS: [&str; 3] = ["MemoryPressure", "DiskPressure", "PIDPressure"];

/// Per-node summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub name: String,
    /// Conditions that are not in their healthy state
    pub conditions: Vec<ConditionSummary>,
    pub allocatable: String,
    pub capacity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unhealthy_reason: Option<String>,
}

/// Whether a node condition is in its healthy state.
///
/// `Ready` must be `True`; pressure conditions and `NetworkUnavailable` must
/// be `False`. Unknown condition types are healthy only when `True`.
pub fn node_condition_is_healthy(type_: &str, status: &str) -> bool {
    if PRESSURE_CONDITIONS.contains(&type_) || type_ == "NetworkUnavailable" {
        status == "False"
    } else {
        status == CONDITION_TRUE
    }
}

/// Summarize a node's unhealthy conditions and resources
pub fn summarize_node(node: &Node) -> NodeInfo {
    let name = node.metadata.name.clone().unwrap_or_else(|| "unknown".to_string());
    let status = node.status.as_ref();

    let conditions: Vec<ConditionSummary> = status
        .and_then(|s| s.conditions.as_ref())
        .into_iter()
        .flatten()
        .filter(|c| !node_condition_is_healthy(&c.type_, &c.status))
        .map(|c| {
            ConditionSummary::new(&c.type_, &c.status, c.reason.as_deref(), c.message.as_deref())
        })
        .collect();

    let unhealthy_reason = if conditions.is_empty() {
        None
    } else {
        Some(
            conditions
                .iter()
                .map(|c| format!("{}={}", c.type_, c.status))
                .collect::<Vec<_>>()
                .join(", "),
        )
    };

    NodeInfo {
        name,
        conditions,
        allocatable: describe_resources(status.and_then(|s| s.allocatable.as_ref())),
        capacity: describe_resources(status.and_then(|s| s.capacity.as_ref())),
        unhealthy_reason,
    }
}

/// Human-readable CPU and memory, e.g. `4000m CPU, 16Gi memory`
fn describe_resources(resources: Option<&BTreeMap<String, Quantity>>) -> String {
    let Some(resources) = resources else {
        return String::new();
    };
    let mut parts = Vec::new();
    if let Some(cpu) = resources.get("cpu") {
        match ParsedQuantity::try_from(cpu) {
            Ok(parsed) => parts.push(format!("{}m CPU", parsed.milli_value())),
            Err(_) => parts.push(format!("{} CPU", cpu.0)),
        }
    }
    if let Some(memory) = resources.get("memory") {
        parts.push(format!("{} memory", memory.0));
    }
    parts.join(", ")
}

/// List all nodes
pub async fn list_nodes(client: &Client) -> Result<Vec<Node>> {
    let api: Api<Node> = Api::all(client.clone());
    Ok(api.list(&ListParams::default()).await?.items)
}

/// Write node findings to the log
pub fn log_nodes(nodes: &[Node], log: &mut DumpLog) {
    if nodes.is_empty() {
        log.line("No nodes found in cluster");
        return;
    }

    for node in nodes {
        let name = node.metadata.name.as_deref().unwrap_or("unknown");
        log.line(format!("Node: {name}"));

        let Some(status) = &node.status else {
            log.line("  No node status reported");
            continue;
        };

        for condition in status.conditions.iter().flatten() {
            if !node_condition_is_healthy(&condition.type_, &condition.status) {
                log.line(format!(
                    "  Condition {}: {} - {}",
                    condition.type_,
                    condition.status,
                    condition.message.as_deref().unwrap_or("")
                ));
            }

            if PRESSURE_CONDITIONS.contains(&condition.type_.as_str())
                && condition.status == CONDITION_TRUE
            {
                log.line(format!(
                    "  RESOURCE PRESSURE {}: {}",
                    condition.type_,
                    condition.message.as_deref().unwrap_or("")
                ));
            }
        }

        log_resource_allocation(status.allocatable.as_ref(), status.capacity.as_ref(), log);
    }
}

fn log_resource_allocation(
    allocatable: Option<&BTreeMap<String, Quantity>>,
    capacity: Option<&BTreeMap<String, Quantity>>,
    log: &mut DumpLog,
) {
    let lookup = |map: Option<&BTreeMap<String, Quantity>>, key: &str| {
        map.and_then(|m| m.get(key)).cloned()
    };

    if let Some(cpu_cap) = lookup(capacity, "cpu") {
        let cap = ParsedQuantity::try_from(&cpu_cap).ok();
        if cap.is_some_and(|c| !c.is_zero()) {
            let alloc = lookup(allocatable, "cpu")
                .and_then(|q| ParsedQuantity::try_from(&q).ok())
                .map(|q| q.milli_value())
                .unwrap_or(0);
            let total = cap.map(|c| c.milli_value()).unwrap_or(0);
            log.line(format!("  CPU: {alloc}m allocatable (of {total}m total)"));
        }
    }

    if let Some(mem_cap) = lookup(capacity, "memory") {
        let nonzero = ParsedQuantity::try_from(&mem_cap).is_ok_and(|m| !m.is_zero());
        if nonzero {
            let alloc = lookup(allocatable, "memory")
                .map(|q| q.0)
                .unwrap_or_else(|| "0".to_string());
            log.line(format!("  Memory: {alloc} allocatable (of {} total)", mem_cap.0));
        }
    }
}

/// CLUSTER STATE stage
pub async fn debug_cluster_state(client: &Client, log: &mut DumpLog) {
    log.banner("CLUSTER STATE");

    match list_nodes(client).await {
        Ok(nodes) => log_nodes(&nodes, log),
        Err(e) => log.failure(format!("Failed to list nodes: {e}")),
    }
}
