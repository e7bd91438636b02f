//! DSCInitialization and DataScienceCluster status
//!
//! Both are cluster-scoped singletons read as dynamic objects, so no
//! generated CRD types are needed.

use super::types::*;
use crate::config::DiagnosticsConfig;
use crate::error::Result;
use kube::api::{ApiResource, DynamicObject, GroupVersionKind};
use kube::{Api, Client};
use serde_json::Value;

pub const DSCI_GROUP: &str = "dscinitialization.opendatahub.io";
pub const DSCI_KIND: &str = "DSCInitialization";
pub const DSC_GROUP: &str = "datasciencecluster.opendatahub.io";
pub const DSC_KIND: &str = "DataScienceCluster";

/// Which platform singleton
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformResource {
    Dsci,
    Dsc,
}

impl PlatformResource {
    pub fn label(&self) -> &'static str {
        match self {
            PlatformResource::Dsci => "DSCI",
            PlatformResource::Dsc => "DSC",
        }
    }

    pub fn api_resource(&self, version: &str) -> ApiResource {
        let (group, kind) = match self {
            PlatformResource::Dsci => (DSCI_GROUP, DSCI_KIND),
            PlatformResource::Dsc => (DSC_GROUP, DSC_KIND),
        };
        ApiResource::from_gvk(&GroupVersionKind::gvk(group, version, kind))
    }

    pub fn instance_name<'a>(&self, config: &'a DiagnosticsConfig) -> &'a str {
        match self {
            PlatformResource::Dsci => &config.dsci_name,
            PlatformResource::Dsc => &config.dsc_name,
        }
    }
}

/// Get a platform singleton; `Ok(None)` when it does not exist
pub async fn get_platform_object(
    client: &Client,
    config: &DiagnosticsConfig,
    resource: PlatformResource,
) -> Result<Option<DynamicObject>> {
    let ar = resource.api_resource(&config.platform_api_version);
    let api: Api<DynamicObject> = Api::all_with(client.clone(), &ar);
    Ok(api.get_opt(resource.instance_name(config)).await?)
}

/// `status.conditions` of a dynamic object. Entries without a string
/// `type` and `status` are skipped.
pub fn status_conditions(obj: &DynamicObject) -> Vec<ConditionSummary> {
    let Some(Value::Array(conditions)) = obj.data.pointer("/status/conditions") else {
        return Vec::new();
    };

    conditions
        .iter()
        .filter_map(|c| {
            let field = |key: &str| c.get(key).and_then(Value::as_str);
            Some(ConditionSummary::new(
                field("type")?,
                field("status")?,
                field("reason"),
                field("message"),
            ))
        })
        .collect()
}

/// Conditions whose status is not `True`
pub fn problem_conditions(obj: &DynamicObject) -> Vec<ConditionSummary> {
    status_conditions(obj)
        .into_iter()
        .filter(|c| !c.is_true())
        .collect()
}

/// `status.release.name` of the DSCI
pub fn release_name(obj: &DynamicObject) -> Option<&str> {
    obj.data.pointer("/status/release/name").and_then(Value::as_str)
}

/// Write one singleton's header and its non-True conditions
pub fn log_platform_object(resource: PlatformResource, obj: &DynamicObject, log: &mut DumpLog) {
    log.line(format!(
        "{} {}:",
        resource.label(),
        obj.metadata.name.as_deref().unwrap_or("unknown")
    ));
    for condition in problem_conditions(obj) {
        log.line(format!("  {condition}"));
    }
}

/// DSCI/DSC STATUS stage.
///
/// A failing DSCI read does not prevent the DSC read; a failing DSC read
/// ends the stage.
pub async fn debug_platform_status(client: &Client, config: &DiagnosticsConfig, log: &mut DumpLog) {
    log.banner("DSCI/DSC STATUS");

    for resource in [PlatformResource::Dsci, PlatformResource::Dsc] {
        match get_platform_object(client, config, resource).await {
            Ok(Some(obj)) => log_platform_object(resource, &obj, log),
            Ok(None) => log.line(format!("No {} instance found", resource.label())),
            Err(e) => log.failure(format!("Failed to get {}: {e}", resource.label())),
        }
    }
}
