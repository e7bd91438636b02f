//! Operator deployment and pod status

use super::deployment::{deployment_problem_conditions, desired_replicas, ready_replicas};
use super::platform::{get_platform_object, release_name, PlatformResource};
use super::types::*;
use crate::config::DiagnosticsConfig;
use crate::error::Result;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Pod;
use kube::{api::ListParams, Api, Client};
use std::collections::HashSet;
use tracing::debug;

pub const ODH_OPERATOR_DEPLOYMENT: &str = "opendatahub-operator-controller-manager";
pub const RHOAI_OPERATOR_DEPLOYMENT: &str = "rhods-operator";

/// Label selectors for operator pods on either platform
pub const OPERATOR_POD_SELECTORS: [&str; 2] = ["control-plane=controller-manager", "name=rhods-operator"];

/// Product flavor reported in the DSCI `status.release.name`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    OpenDataHub,
    SelfManagedRhoai,
    ManagedRhoai,
}

impl Platform {
    pub fn from_release_name(name: &str) -> Option<Self> {
        match name {
            "Open Data Hub" => Some(Platform::OpenDataHub),
            "OpenShift AI Self-Managed" => Some(Platform::SelfManagedRhoai),
            "OpenShift AI Cloud Service" => Some(Platform::ManagedRhoai),
            _ => None,
        }
    }

    pub fn operator_deployment(&self) -> &'static str {
        match self {
            Platform::OpenDataHub => ODH_OPERATOR_DEPLOYMENT,
            Platform::SelfManagedRhoai | Platform::ManagedRhoai => RHOAI_OPERATOR_DEPLOYMENT,
        }
    }
}

/// Deployment name for a release name; unknown platforms get the Open Data
/// Hub default
pub fn deployment_for_release(release: Option<&str>) -> &'static str {
    release
        .and_then(Platform::from_release_name)
        .map(|p| p.operator_deployment())
        .unwrap_or(ODH_OPERATOR_DEPLOYMENT)
}

/// Configured override, else derived from the DSCI release name
pub async fn resolve_operator_deployment(client: &Client, config: &DiagnosticsConfig) -> String {
    if let Some(name) = &config.operator_deployment {
        return name.clone();
    }

    let release = match get_platform_object(client, config, PlatformResource::Dsci).await {
        Ok(Some(dsci)) => release_name(&dsci).map(str::to_string),
        Ok(None) => None,
        Err(e) => {
            debug!("Failed to read DSCI for platform detection: {e}");
            None
        }
    };
    if release.is_none() {
        debug!("Platform not found in DSCI, assuming {ODH_OPERATOR_DEPLOYMENT}");
    }
    deployment_for_release(release.as_deref()).to_string()
}

/// Operator pods matched by either platform's selector, without duplicates
pub async fn get_operator_pods(client: &Client, namespace: &str) -> Result<Vec<Pod>> {
    let api: Api<Pod> = Api::namespaced(client.clone(), namespace);
    let mut seen = HashSet::new();
    let mut pods = Vec::new();

    for selector in OPERATOR_POD_SELECTORS {
        for pod in api.list(&ListParams::default().labels(selector)).await?.items {
            if seen.insert(pod.metadata.name.clone().unwrap_or_default()) {
                pods.push(pod);
            }
        }
    }

    Ok(pods)
}

/// Write the operator deployment summary
pub fn log_operator_deployment(deploy: &Deployment, log: &mut DumpLog) {
    log.line(format!(
        "Operator deployment: {}/{} ready",
        ready_replicas(deploy),
        desired_replicas(deploy)
    ));
    for condition in deployment_problem_conditions(deploy) {
        log.line(format!("  {condition}"));
    }
}

/// Write operator pods that are not Running, with restart counts
pub fn log_operator_pods(pods: &[Pod], log: &mut DumpLog) {
    for pod in pods {
        let Some(status) = &pod.status else { continue };
        let phase = status.phase.as_deref().unwrap_or("Unknown");
        if phase == "Running" {
            continue;
        }

        log.line(format!(
            "Operator pod {}: {phase}",
            pod.metadata.name.as_deref().unwrap_or("unknown")
        ));
        for cs in status.container_statuses.iter().flatten() {
            if cs.restart_count > 0 {
                log.line(format!("  Container {} restarted {} times", cs.name, cs.restart_count));
            }
        }
    }
}

/// OPERATOR STATUS stage
pub async fn debug_operator_status(client: &Client, config: &DiagnosticsConfig, log: &mut DumpLog) {
    log.banner("OPERATOR STATUS");

    let name = resolve_operator_deployment(client, config).await;
    let api: Api<Deployment> = Api::namespaced(client.clone(), &config.operator_namespace);
    match api.get(&name).await {
        Ok(deploy) => log_operator_deployment(&deploy, log),
        Err(e) => {
            log.failure(format!("Cannot find operator deployment {name}: {e}"));
            return;
        }
    }

    match get_operator_pods(client, &config.operator_namespace).await {
        Ok(pods) => log_operator_pods(&pods, log),
        Err(e) => log.failure(format!("Failed to list operator pods: {e}")),
    }
}
