//! Namespace workload analysis
//!
//! Checks each monitored namespace for:
//! - Deployments whose ready replicas differ from desired
//! - The pods behind those deployments
//! - Unhealthy pods regardless of owner

use super::pod::{capture_pod_diagnostics, pod_has_issues};
use super::types::*;
use crate::config::DiagnosticsConfig;
use crate::error::Result;
use k8s_openapi::api::apps::v1::{Deployment, ReplicaSet};
use k8s_openapi::api::core::v1::Pod;
use kube::{api::ListParams, Api, Client};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Label keys tried, in order, when a deployment has no usable selector
const COMMON_POD_LABELS: [&str; 3] = ["app", "app.kubernetes.io/name", "deployment"];

/// Desired replica count: `spec.replicas`, else `status.replicas`
pub fn desired_replicas(deploy: &Deployment) -> i32 {
    deploy
        .spec
        .as_ref()
        .and_then(|s| s.replicas)
        .or_else(|| deploy.status.as_ref().and_then(|s| s.replicas))
        .unwrap_or(0)
}

pub fn ready_replicas(deploy: &Deployment) -> i32 {
    deploy
        .status
        .as_ref()
        .and_then(|s| s.ready_replicas)
        .unwrap_or(0)
}

/// Ready replicas equal desired replicas
pub fn deployment_is_ready(deploy: &Deployment) -> bool {
    ready_replicas(deploy) == desired_replicas(deploy)
}

/// Deployment conditions whose status is not `True`
pub fn deployment_problem_conditions(deploy: &Deployment) -> Vec<ConditionSummary> {
    deploy
        .status
        .as_ref()
        .and_then(|s| s.conditions.as_ref())
        .into_iter()
        .flatten()
        .filter(|c| c.status != CONDITION_TRUE)
        .map(|c| ConditionSummary::new(&c.type_, &c.status, c.reason.as_deref(), c.message.as_deref()))
        .collect()
}

/// `k1=v1,k2=v2` selector string
pub fn label_selector(labels: &BTreeMap<String, String>) -> String {
    labels
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Pods whose owning ReplicaSet is owned by the named deployment
pub fn pods_owned_via_replicasets(
    deployment_name: &str,
    pods: Vec<Pod>,
    replicasets: &[ReplicaSet],
) -> Vec<Pod> {
    let owned_sets: HashSet<&str> = replicasets
        .iter()
        .filter(|rs| {
            rs.metadata
                .owner_references
                .iter()
                .flatten()
                .any(|o| o.kind == "Deployment" && o.name == deployment_name)
        })
        .filter_map(|rs| rs.metadata.name.as_deref())
        .collect();

    pods.into_iter()
        .filter(|pod| {
            pod.metadata
                .owner_references
                .iter()
                .flatten()
                .any(|o| o.kind == "ReplicaSet" && owned_sets.contains(o.name.as_str()))
        })
        .collect()
}

pub async fn list_deployments(client: &Client, namespace: &str) -> Result<Vec<Deployment>> {
    let api: Api<Deployment> = Api::namespaced(client.clone(), namespace);
    Ok(api.list(&ListParams::default()).await?.items)
}

pub async fn list_pods(client: &Client, namespace: &str, selector: Option<&str>) -> Result<Vec<Pod>> {
    let api: Api<Pod> = Api::namespaced(client.clone(), namespace);
    let params = match selector {
        Some(s) => ListParams::default().labels(s),
        None => ListParams::default(),
    };
    Ok(api.list(&params).await?.items)
}

/// Find the pods backing a deployment.
///
/// Tries the deployment's own `matchLabels`, then the common label
/// conventions, then falls back to walking ReplicaSet owner references.
/// The first lookup that returns pods wins.
pub async fn find_deployment_pods(client: &Client, namespace: &str, deploy: &Deployment) -> Vec<Pod> {
    let name = deploy.metadata.name.as_deref().unwrap_or_default();

    let mut selectors = Vec::new();
    if let Some(labels) = deploy
        .spec
        .as_ref()
        .and_then(|s| s.selector.match_labels.as_ref())
        .filter(|l| !l.is_empty())
    {
        selectors.push(label_selector(labels));
    }
    selectors.extend(COMMON_POD_LABELS.iter().map(|key| format!("{key}={name}")));

    for selector in &selectors {
        match list_pods(client, namespace, Some(selector)).await {
            Ok(pods) if !pods.is_empty() => return pods,
            Ok(_) => {}
            Err(e) => debug!("Pod lookup by {selector} in {namespace} failed: {e}"),
        }
    }

    let pods = match list_pods(client, namespace, None).await {
        Ok(pods) => pods,
        Err(e) => {
            debug!("Listing pods in {namespace} failed: {e}");
            return Vec::new();
        }
    };
    let rs_api: Api<ReplicaSet> = Api::namespaced(client.clone(), namespace);
    match rs_api.list(&ListParams::default()).await {
        Ok(replicasets) => pods_owned_via_replicasets(name, pods, &replicasets.items),
        Err(e) => {
            debug!("Listing replicasets in {namespace} failed: {e}");
            Vec::new()
        }
    }
}

fn pod_phase(pod: &Pod) -> &str {
    pod.status
        .as_ref()
        .and_then(|s| s.phase.as_deref())
        .unwrap_or("Unknown")
}

/// Write a not-ready deployment's summary line and non-True conditions
pub fn log_deployment_not_ready(deploy: &Deployment, log: &mut DumpLog) {
    log.line(format!(
        "  Deployment {}: {}/{} (NOT READY)",
        deploy.metadata.name.as_deref().unwrap_or("unknown"),
        ready_replicas(deploy),
        desired_replicas(deploy)
    ));
    for condition in deployment_problem_conditions(deploy) {
        log.line(format!("    {condition}"));
    }
}

/// Write the clean verdict when no deployment is unready and no pod has
/// issues; returns whether the namespace is clean
pub fn log_namespace_verdict(deployments: &[Deployment], pods: &[Pod], log: &mut DumpLog) -> bool {
    let clean = deployments.iter().all(deployment_is_ready) && !pods.iter().any(pod_has_issues);
    if clean {
        log.line("  No problematic deployments or pods found");
    }
    clean
}

/// NAMESPACE RESOURCES stage
pub async fn debug_namespace_resources(client: &Client, config: &DiagnosticsConfig, log: &mut DumpLog) {
    log.banner("NAMESPACE RESOURCES");

    for ns in config.monitored_namespaces() {
        log.line(format!("Namespace: {ns}"));
        // Pods already deep-dived through their deployment
        let mut inspected: HashSet<String> = HashSet::new();

        let deployments = match list_deployments(client, &ns).await {
            Ok(d) => d,
            Err(e) => {
                log.failure(format!("  Failed to list deployments: {e}"));
                continue;
            }
        };

        for deploy in deployments.iter().filter(|d| !deployment_is_ready(d)) {
            log_deployment_not_ready(deploy, log);

            let pods = find_deployment_pods(client, &ns, deploy).await;
            if pods.is_empty() {
                log.line(format!(
                    "    No pods found for deployment {}",
                    deploy.metadata.name.as_deref().unwrap_or("unknown")
                ));
            }
            for pod in &pods {
                let pod_name = pod.metadata.name.clone().unwrap_or_default();
                log.line(format!("    Pod {pod_name}: {}", pod_phase(pod)));
                if inspected.insert(pod_name.clone()) {
                    capture_pod_diagnostics(client, &ns, &pod_name, config, log).await;
                }
            }
        }

        let pods = match list_pods(client, &ns, None).await {
            Ok(p) => p,
            Err(e) => {
                log.failure(format!("  Failed to list pods: {e}"));
                continue;
            }
        };

        for pod in pods.iter().filter(|p| pod_has_issues(p)) {
            let pod_name = pod.metadata.name.clone().unwrap_or_default();
            log.line(format!("  Pod {pod_name}: {}", pod_phase(pod)));
            if inspected.insert(pod_name.clone()) {
                capture_pod_diagnostics(client, &ns, &pod_name, config, log).await;
            }
        }

        log_namespace_verdict(&deployments, &pods, log);
    }
}
