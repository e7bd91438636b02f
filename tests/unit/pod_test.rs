//! Pod deep-dive tests
//!
//! Issue detection and snapshot rendering, without a cluster.

#[allow(dead_code)]
mod common {
    include!("../common/mod.rs");
}

use chrono::Utc;
use dscdiag::debug::pod::{
    container_has_issues, init_container_has_issues, pod_has_issues, read_log_lines, LogTail,
    PodSnapshot, ProbeHandler, ProbeSummary,
};
use dscdiag::debug::DumpLog;
use k8s_openapi::api::core::v1::{Container, HTTPGetAction, Probe};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

// ============================================================================
// Issue detection
// ============================================================================

#[test]
fn test_pod_phase_rules() {
    assert!(!pod_has_issues(&common::create_mock_pod("p", "ns", "Running")));
    assert!(!pod_has_issues(&common::create_mock_pod("p", "ns", "Succeeded")));
    assert!(!pod_has_issues(&common::create_mock_pod("p", "ns", "Pending")));
    assert!(pod_has_issues(&common::create_mock_pod("p", "ns", "Failed")));
    assert!(pod_has_issues(&common::create_mock_pod("p", "ns", "Unknown")));
}

#[test]
fn test_running_pod_with_restarts_has_issues() {
    let healthy = common::with_container_status(
        common::create_mock_pod("p", "ns", "Running"),
        common::create_container_status("manager", true, 0, common::running_state()),
    );
    assert!(!pod_has_issues(&healthy));

    let restarted = common::with_container_status(
        common::create_mock_pod("p", "ns", "Running"),
        common::create_container_status("manager", true, 2, common::running_state()),
    );
    assert!(pod_has_issues(&restarted));
}

#[test]
fn test_container_issue_rules() {
    let ok = common::create_container_status("c", true, 0, common::running_state());
    assert!(!container_has_issues(&ok));

    let not_ready = common::create_container_status("c", false, 0, common::running_state());
    assert!(container_has_issues(&not_ready));

    let waiting = common::create_container_status(
        "c",
        true,
        0,
        common::waiting_state("CrashLoopBackOff", "back-off"),
    );
    assert!(container_has_issues(&waiting));
}

#[test]
fn test_completed_init_container_ignored() {
    let done = common::create_container_status("init", false, 0, common::terminated_state("Completed", 0));
    assert!(!init_container_has_issues(&done));

    let failed = common::create_container_status("init", false, 0, common::terminated_state("Error", 1));
    assert!(init_container_has_issues(&failed));
}

// ============================================================================
// Probe summary
// ============================================================================

#[test]
fn test_probe_defaults_filled() {
    let probe = Probe {
        http_get: Some(HTTPGetAction {
            path: Some("/readyz".to_string()),
            port: IntOrString::Int(8081),
            ..Default::default()
        }),
        ..Default::default()
    };
    let summary = ProbeSummary::from(&probe);

    assert_eq!(
        summary.handler,
        ProbeHandler::HttpGet {
            path: "/readyz".to_string(),
            port: "8081".to_string(),
            scheme: None,
        }
    );
    assert_eq!(summary.initial_delay_seconds, 0);
    assert_eq!(summary.period_seconds, 10);
    assert_eq!(summary.timeout_seconds, 1);
    assert_eq!(summary.success_threshold, 1);
    assert_eq!(summary.failure_threshold, 3);
}

// ============================================================================
// Rendering
// ============================================================================

fn crashing_pod() -> k8s_openapi::api::core::v1::Pod {
    let mut pod = common::with_container_status(
        common::create_mock_pod("operator-abc", "opendatahub-operator-system", "Running"),
        common::create_container_status(
            "manager",
            false,
            3,
            common::waiting_state("CrashLoopBackOff", "back-off 5m0s"),
        ),
    );
    if let Some(spec) = pod.spec.as_mut() {
        spec.containers = vec![Container {
            name: "manager".to_string(),
            readiness_probe: Some(Probe {
                http_get: Some(HTTPGetAction {
                    path: Some("/readyz".to_string()),
                    port: IntOrString::String("health".to_string()),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        }];
    }
    pod
}

#[test]
fn test_snapshot_render_structure() {
    let mut snapshot = PodSnapshot::from_pod(&crashing_pod(), Utc::now());
    assert!(snapshot.containers[0].needs_logs());

    snapshot.containers[0].current_logs = Some(LogTail::new::<String>(
        100,
        Ok(vec!["starting".to_string(), "password=hunter2".to_string()]),
    ));
    snapshot.containers[0].previous_logs = Some(LogTail::new(50, Err("previous terminated container not found")));

    let mut log = DumpLog::capture();
    snapshot.render(&mut log);
    let lines = log.lines();

    assert_eq!(lines[0], "=== POD DIAGNOSTICS: opendatahub-operator-system/operator-abc ===");
    assert!(lines[1].starts_with("Pod Phase: Running (age: 1h0m"));
    assert_eq!(lines.last().unwrap(), "=== END POD DIAGNOSTICS ===");

    assert!(log.contains("    State: Waiting"));
    assert!(log.contains("      Reason: CrashLoopBackOff"));
    assert!(log.contains("      Type: HTTP GET"));
    assert!(log.contains("      Port: health"));
    assert!(log.contains("    === Recent Logs (last 100 lines) ==="));
    assert!(log.contains("    password=[REDACTED]"));
    assert!(!log.contains("hunter2"));
    assert!(log.contains("    === Previous Logs (before restart, last 50 lines) ==="));
    assert!(log.contains("Failed to retrieve previous logs"));
    assert!(log.contains("Pod Events: No events found"));
}

#[test]
fn test_snapshot_without_status() {
    let mut pod = common::create_mock_pod("bare", "ns", "Pending");
    pod.status = None;
    let snapshot = PodSnapshot::from_pod(&pod, Utc::now());

    assert_eq!(snapshot.phase, "Unknown");
    assert!(snapshot.containers.is_empty());
}

// ============================================================================
// Log stream decoding
// ============================================================================

#[tokio::test]
async fn test_invalid_utf8_keeps_every_line() {
    let stream = futures::io::Cursor::new(b"line one\nbad \xff byte\nline three\n".to_vec());
    let lines = read_log_lines(stream).await.unwrap();

    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "line one");
    assert_eq!(lines[1], "bad \u{FFFD} byte");
    assert_eq!(lines[2], "line three");
}

#[tokio::test]
async fn test_empty_log_stream() {
    let lines = read_log_lines(futures::io::Cursor::new(Vec::new())).await.unwrap();
    assert!(lines.is_empty());
}
