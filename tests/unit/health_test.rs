//! Health report section tests

#[allow(dead_code)]
mod common {
    include!("../common/mod.rs");
}

use chrono::{Duration as ChronoDuration, Utc};
use dscdiag::debug::health::{
    deployments_section, events_section, operator_section, platform_section, pods_section,
    quotas_section, HealthSelection, Layer, Section,
};
use dscdiag::debug::platform::PlatformResource;
use kube::api::DynamicObject;
use serde_json::json;
use std::collections::BTreeMap;

#[test]
fn test_default_selection_is_everything() {
    let selection = HealthSelection::new(&[], &[]);
    for section in Section::ALL {
        assert!(selection.includes(section));
    }
}

#[test]
fn test_workload_layer() {
    let selection = HealthSelection::new(&[Layer::Workload], &[]);
    assert!(selection.includes(Section::Operator));
    assert!(selection.includes(Section::Dsc));
    assert!(!selection.includes(Section::Nodes));
    assert!(!selection.includes(Section::Quotas));
}

#[test]
fn test_not_ready_deployment_sets_error() {
    let by_ns = BTreeMap::from([(
        "opendatahub".to_string(),
        vec![
            common::create_mock_deployment("dashboard", "opendatahub", 2, 2),
            common::create_mock_deployment("kserve", "opendatahub", 1, 0),
        ],
    )]);
    let result = deployments_section(&by_ns, Vec::new());

    assert_eq!(result.error.as_deref(), Some("deployment opendatahub/kserve: 0/1 ready"));
    assert_eq!(result.data.by_namespace["opendatahub"].len(), 2);
}

#[test]
fn test_fetch_errors_are_kept_with_data() {
    let by_ns = BTreeMap::from([("opendatahub".to_string(), vec![common::create_mock_pod("p", "opendatahub", "Running")])]);
    let result = pods_section(&by_ns, vec!["failed to list pods in kube-system: denied".to_string()]);

    assert!(result.error.unwrap().contains("kube-system"));
    assert_eq!(result.data.by_namespace["opendatahub"][0].phase, "Running");
}

#[test]
fn test_warning_events_reported_without_error() {
    let by_ns = BTreeMap::from([(
        "opendatahub".to_string(),
        vec![
            common::create_mock_event("opendatahub", "Pod", "a", "Warning", "BackOff", 10),
            common::create_mock_event("opendatahub", "Pod", "b", "Normal", "Pulled", 10),
            common::create_mock_event("opendatahub", "Pod", "c", "Warning", "Old", 3600),
        ],
    )]);
    let result = events_section(by_ns, Utc::now() - ChronoDuration::minutes(5), 10, Vec::new());

    assert!(result.is_healthy());
    assert_eq!(result.data.events.len(), 1);
    assert_eq!(result.data.events[0].reason, "BackOff");
}

#[test]
fn test_exceeded_quota_sets_error() {
    let by_ns = BTreeMap::from([(
        "opendatahub".to_string(),
        vec![common::create_mock_quota("compute", "opendatahub", &[("pods", "10")], &[("pods", "10")])],
    )]);
    let result = quotas_section(&by_ns, Vec::new());

    assert_eq!(result.error.as_deref(), Some("quota opendatahub/compute exceeded: pods"));
    assert_eq!(result.data.by_namespace["opendatahub"][0].exceeded, vec!["pods"]);
}

#[test]
fn test_operator_pod_not_running() {
    let deploy = common::create_mock_deployment(
        "opendatahub-operator-controller-manager",
        "opendatahub-operator-system",
        1,
        1,
    );
    let pods = vec![common::create_mock_pod("op-1", "opendatahub-operator-system", "Pending")];
    let result = operator_section("opendatahub-operator-controller-manager", &deploy, &pods);

    assert_eq!(result.error.as_deref(), Some("operator pod op-1: Pending"));
    assert_eq!(result.data.deployment.unwrap().ready, 1);
}

#[test]
fn test_platform_missing_and_not_ready() {
    let missing = platform_section(PlatformResource::Dsc, "default-dsc", None);
    assert!(!missing.data.found);
    assert_eq!(missing.error.as_deref(), Some("no DSC instance found"));

    let ar = PlatformResource::Dsci.api_resource("v2");
    let obj = DynamicObject::new("default-dsci", &ar).data(json!({
        "status": {"conditions": [
            {"type": "Ready", "status": "False", "message": "reconciling"},
            {"type": "CapabilityServiceMesh", "status": "False"}
        ]}
    }));
    let result = platform_section(PlatformResource::Dsci, "default-dsci", Some(&obj));

    assert!(result.data.found);
    assert_eq!(result.data.conditions.len(), 2);
    assert_eq!(result.error.as_deref(), Some("DSCI Ready: False - reconciling"));
}

#[test]
fn test_report_serializes_camel_case() {
    let result = deployments_section(&BTreeMap::new(), Vec::new());
    let value = serde_json::to_value(&result).unwrap();

    assert!(value.get("error").is_none());
    assert!(value.get("skipped").is_none());
    assert!(value["data"].get("byNamespace").is_some());
}
