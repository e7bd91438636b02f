//! Integration tests for the health report
//!
//! These tests require a real Kubernetes cluster.
//! Run with: cargo test integration::health_test -- --ignored

use dscdiag::client::create_client;
use dscdiag::config::DiagnosticsConfig;
use dscdiag::debug::health::{run_health_check, HealthSelection, Layer};

/// Infrastructure layer only touches nodes and quotas
#[tokio::test]
#[ignore]
async fn test_infrastructure_layer() {
    let client = create_client(None).await.expect("Should create client");
    let config = DiagnosticsConfig::from_env();
    let selection = HealthSelection::new(&[Layer::Infrastructure], &[]);

    let report = run_health_check(&client, &config, &selection).await;

    assert!(!report.nodes.skipped);
    assert!(!report.nodes.data.nodes.is_empty());
    assert!(report.pods.skipped);
    assert!(report.dsc.skipped);
}

/// Report serializes to JSON
#[tokio::test]
#[ignore]
async fn test_report_to_json() {
    let client = create_client(None).await.expect("Should create client");
    let config = DiagnosticsConfig::from_env();

    let report = run_health_check(&client, &config, &HealthSelection::all()).await;
    let json = serde_json::to_string(&report).expect("Should serialize");

    assert!(json.contains("collectedAt"));
}
