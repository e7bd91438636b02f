//! Node diagnostics tests

#[allow(dead_code)]
mod common {
    include!("../common/mod.rs");
}

use dscdiag::debug::node::{log_nodes, node_condition_is_healthy, summarize_node};
use dscdiag::debug::DumpLog;

#[test]
fn test_empty_node_list_logs_explicit_line() {
    let mut log = DumpLog::capture();
    log_nodes(&[], &mut log);
    assert_eq!(log.lines(), ["No nodes found in cluster"]);
}

#[test]
fn test_healthy_condition_values() {
    assert!(node_condition_is_healthy("Ready", "True"));
    assert!(!node_condition_is_healthy("Ready", "Unknown"));
    assert!(node_condition_is_healthy("MemoryPressure", "False"));
    assert!(!node_condition_is_healthy("DiskPressure", "True"));
    assert!(!node_condition_is_healthy("NetworkUnavailable", "True"));
}

#[test]
fn test_healthy_node_logs_only_resources() {
    let node = common::create_mock_node(
        "worker-0",
        &[("Ready", "True"), ("MemoryPressure", "False")],
        "4",
        "16Gi",
    );
    let mut log = DumpLog::capture();
    log_nodes(&[node], &mut log);

    assert_eq!(
        log.lines(),
        [
            "Node: worker-0",
            "  CPU: 4000m allocatable (of 4000m total)",
            "  Memory: 16Gi allocatable (of 16Gi total)",
        ]
    );
}

#[test]
fn test_pressure_reported() {
    let node = common::create_mock_node(
        "worker-1",
        &[("Ready", "True"), ("DiskPressure", "True")],
        "2",
        "8Gi",
    );
    let mut log = DumpLog::capture();
    log_nodes(&[node.clone()], &mut log);

    assert!(log.contains("  Condition DiskPressure: True - DiskPressure is True"));
    assert!(log.contains("  RESOURCE PRESSURE DiskPressure: DiskPressure is True"));

    let info = summarize_node(&node);
    assert_eq!(info.unhealthy_reason.as_deref(), Some("DiskPressure=True"));
}

#[test]
fn test_not_ready_node_summarized() {
    let node = common::create_mock_node("worker-2", &[("Ready", "False")], "2", "8Gi");
    let info = summarize_node(&node);

    assert_eq!(info.conditions.len(), 1);
    assert_eq!(info.allocatable, "2000m CPU, 8Gi memory");
}
