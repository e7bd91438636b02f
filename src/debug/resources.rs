//! Resource quota analysis

use super::quantity::quota_exceeded;
use super::types::*;
use crate::config::DiagnosticsConfig;
use crate::error::Result;
use k8s_openapi::api::core::v1::{Pod, ResourceQuota};
use kube::{api::ListParams, Api, Client};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A quota resource whose usage reached its hard limit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaViolation {
    pub resource: String,
    pub used: String,
    pub hard: String,
}

/// Resources with `used >= hard`, compared exactly.
///
/// Resources without a hard limit are ignored; unparseable quantities are
/// skipped with a warning.
pub fn quota_violations(quota: &ResourceQuota) -> Vec<QuotaViolation> {
    let Some(status) = &quota.status else {
        return Vec::new();
    };
    let (Some(used), Some(hard)) = (&status.used, &status.hard) else {
        return Vec::new();
    };

    used.iter()
        .filter_map(|(resource, used_q)| {
            let hard_q = hard.get(resource)?;
            match quota_exceeded(used_q, hard_q) {
                Ok(true) => Some(QuotaViolation {
                    resource: resource.clone(),
                    used: used_q.0.clone(),
                    hard: hard_q.0.clone(),
                }),
                Ok(false) => None,
                Err(e) => {
                    warn!(
                        "Skipping quota resource {resource} in {}: {e}",
                        quota.metadata.name.as_deref().unwrap_or("unknown")
                    );
                    None
                }
            }
        })
        .collect()
}

pub async fn list_quotas(client: &Client, namespace: &str) -> Result<Vec<ResourceQuota>> {
    let api: Api<ResourceQuota> = Api::namespaced(client.clone(), namespace);
    Ok(api.list(&ListParams::default()).await?.items)
}

/// Write each quota's violations; returns true if any quota is violated
pub fn log_quotas(namespace: &str, quotas: &[ResourceQuota], log: &mut DumpLog) -> bool {
    let mut any_violation = false;

    for quota in quotas {
        log.line(format!(
            "Namespace {namespace}, ResourceQuota {}:",
            quota.metadata.name.as_deref().unwrap_or("unknown")
        ));
        let violations = quota_violations(quota);
        if violations.is_empty() {
            log.line("  No quota violations detected");
            continue;
        }
        any_violation = true;
        for v in violations {
            log.line(format!("  QUOTA EXCEEDED {}: {}/{}", v.resource, v.used, v.hard));
        }
    }

    any_violation
}

/// Write the pods of a namespace with their phases
pub fn log_namespace_pods(namespace: &str, pods: &[Pod], log: &mut DumpLog) {
    log.line(format!("Pods in namespace {namespace} ({} total):", pods.len()));
    for pod in pods {
        log.line(format!(
            "  Pod {}: Phase={}",
            pod.metadata.name.as_deref().unwrap_or("unknown"),
            pod.status
                .as_ref()
                .and_then(|s| s.phase.as_deref())
                .unwrap_or("Unknown")
        ));
    }
}

/// Closing line of the quota stage
pub fn log_quota_verdict(has_quotas: bool, has_violations: bool, log: &mut DumpLog) {
    if !has_quotas {
        log.line("No resource quotas found in monitored namespaces");
    } else if !has_violations {
        log.line("All resource quotas are within limits");
    }
}

/// RESOURCE QUOTAS stage
pub async fn debug_resource_quotas(client: &Client, config: &DiagnosticsConfig, log: &mut DumpLog) {
    log.banner("RESOURCE QUOTAS");

    let mut has_quotas = false;
    let mut has_violations = false;

    for ns in config.quota_namespaces() {
        let quotas = match list_quotas(client, &ns).await {
            Ok(q) => q,
            Err(e) => {
                log.failure(format!("Failed to list resource quotas in namespace {ns}: {e}"));
                continue;
            }
        };
        if quotas.is_empty() {
            continue;
        }

        has_quotas = true;
        has_violations |= log_quotas(&ns, &quotas, log);

        match super::deployment::list_pods(client, &ns, None).await {
            Ok(pods) => log_namespace_pods(&ns, &pods, log),
            Err(e) => log.failure(format!("Failed to list pods in namespace {ns}: {e}")),
        }
    }

    log_quota_verdict(has_quotas, has_violations, log);
}
