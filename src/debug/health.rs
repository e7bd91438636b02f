//! Structured cluster health report
//!
//! The same checks as the dump pipeline, collected into typed sections
//! instead of log lines. Every section is independent: a failed fetch or an
//! unhealthy finding sets that section's `error` and leaves the others
//! untouched.

use super::deployment::{
    deployment_is_ready, deployment_problem_conditions, desired_replicas, list_deployments,
    list_pods, ready_replicas,
};
use super::events::{list_events, recent_events, EventInfo};
use super::node::{list_nodes, summarize_node, NodeInfo};
use super::operator::{get_operator_pods, resolve_operator_deployment};
use super::platform::{get_platform_object, status_conditions, PlatformResource};
use super::pod::pod_has_issues;
use super::resources::{list_quotas, quota_violations};
use super::types::*;
use crate::config::DiagnosticsConfig;
use crate::error::Result;
use chrono::{DateTime, Utc};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Event, Node, Pod, ResourceQuota};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::api::DynamicObject;
use kube::{Api, Client};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::future::Future;

/// Individual health sections
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Nodes,
    Deployments,
    Pods,
    Events,
    Quotas,
    Operator,
    Dsci,
    Dsc,
}

impl Section {
    pub const ALL: [Section; 8] = [
        Section::Nodes,
        Section::Deployments,
        Section::Pods,
        Section::Events,
        Section::Quotas,
        Section::Operator,
        Section::Dsci,
        Section::Dsc,
    ];
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Section::Nodes => "nodes",
            Section::Deployments => "deployments",
            Section::Pods => "pods",
            Section::Events => "events",
            Section::Quotas => "quotas",
            Section::Operator => "operator",
            Section::Dsci => "dsci",
            Section::Dsc => "dsc",
        };
        f.write_str(name)
    }
}

/// Groups of sections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Infrastructure,
    Workload,
}

impl Layer {
    pub fn sections(&self) -> &'static [Section] {
        match self {
            Layer::Infrastructure => &[Section::Nodes, Section::Quotas],
            Layer::Workload => &[
                Section::Deployments,
                Section::Pods,
                Section::Events,
                Section::Operator,
                Section::Dsci,
                Section::Dsc,
            ],
        }
    }
}

/// Which sections to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthSelection {
    sections: BTreeSet<Section>,
}

impl Default for HealthSelection {
    fn default() -> Self {
        Self::all()
    }
}

impl HealthSelection {
    pub fn all() -> Self {
        Self {
            sections: Section::ALL.into_iter().collect(),
        }
    }

    /// Explicit sections take precedence over layers; neither means all
    pub fn new(layers: &[Layer], sections: &[Section]) -> Self {
        if !sections.is_empty() {
            Self {
                sections: sections.iter().copied().collect(),
            }
        } else if !layers.is_empty() {
            Self {
                sections: layers.iter().flat_map(|l| l.sections().iter().copied()).collect(),
            }
        } else {
            Self::all()
        }
    }

    pub fn includes(&self, section: Section) -> bool {
        self.sections.contains(&section)
    }
}

/// Outcome of one section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectionResult<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub skipped: bool,
    pub data: T,
}

impl<T: Default> SectionResult<T> {
    pub fn skipped() -> Self {
        Self {
            error: None,
            skipped: true,
            data: T::default(),
        }
    }

    pub fn failed(error: impl fmt::Display) -> Self {
        Self {
            error: Some(error.to_string()),
            skipped: false,
            data: T::default(),
        }
    }
}

impl<T> SectionResult<T> {
    /// Data plus problems found; any problem marks the section unhealthy
    pub fn with_problems(data: T, problems: Vec<String>) -> Self {
        Self {
            error: (!problems.is_empty()).then(|| problems.join("; ")),
            skipped: false,
            data,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodesSection {
    pub nodes: Vec<NodeInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentInfo {
    pub namespace: String,
    pub name: String,
    pub ready: i32,
    pub replicas: i32,
    /// Non-True conditions only
    pub conditions: Vec<ConditionSummary>,
}

impl From<&Deployment> for DeploymentInfo {
    fn from(deploy: &Deployment) -> Self {
        Self {
            namespace: deploy.metadata.namespace.clone().unwrap_or_default(),
            name: deploy.metadata.name.clone().unwrap_or_default(),
            ready: ready_replicas(deploy),
            replicas: desired_replicas(deploy),
            conditions: deployment_problem_conditions(deploy),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentsSection {
    pub by_namespace: BTreeMap<String, Vec<DeploymentInfo>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerInfo {
    pub name: String,
    pub ready: bool,
    pub restart_count: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waiting: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminated: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PodInfo {
    pub namespace: String,
    pub name: String,
    pub phase: String,
    pub containers: Vec<ContainerInfo>,
}

impl From<&Pod> for PodInfo {
    fn from(pod: &Pod) -> Self {
        let status = pod.status.as_ref();
        let containers = status
            .and_then(|s| s.container_statuses.as_ref())
            .into_iter()
            .flatten()
            .map(|cs| {
                let state = cs.state.as_ref();
                ContainerInfo {
                    name: cs.name.clone(),
                    ready: cs.ready,
                    restart_count: cs.restart_count,
                    waiting: state.and_then(|s| s.waiting.as_ref()).map(|w| {
                        format!(
                            "{}: {}",
                            w.reason.as_deref().unwrap_or_default(),
                            w.message.as_deref().unwrap_or_default()
                        )
                    }),
                    terminated: state
                        .and_then(|s| s.terminated.as_ref())
                        .map(|t| format!("{} (exit {})", t.reason.as_deref().unwrap_or_default(), t.exit_code)),
                }
            })
            .collect();

        Self {
            namespace: pod.metadata.namespace.clone().unwrap_or_default(),
            name: pod.metadata.name.clone().unwrap_or_default(),
            phase: status
                .and_then(|s| s.phase.clone())
                .unwrap_or_else(|| "Unknown".to_string()),
            containers,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodsSection {
    pub by_namespace: BTreeMap<String, Vec<PodInfo>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventsSection {
    /// Recent Warning events, newest first
    pub events: Vec<EventInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuotaInfo {
    pub namespace: String,
    pub name: String,
    pub used: BTreeMap<String, String>,
    pub hard: BTreeMap<String, String>,
    pub exceeded: Vec<String>,
}

impl From<&ResourceQuota> for QuotaInfo {
    fn from(quota: &ResourceQuota) -> Self {
        let status = quota.status.as_ref();
        let flatten = |map: Option<&BTreeMap<String, Quantity>>| -> BTreeMap<String, String> {
            map.into_iter()
                .flatten()
                .map(|(k, v)| (k.clone(), v.0.clone()))
                .collect()
        };
        Self {
            namespace: quota.metadata.namespace.clone().unwrap_or_default(),
            name: quota.metadata.name.clone().unwrap_or_default(),
            used: flatten(status.and_then(|s| s.used.as_ref())),
            hard: flatten(status.and_then(|s| s.hard.as_ref())),
            exceeded: quota_violations(quota).into_iter().map(|v| v.resource).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotasSection {
    pub by_namespace: BTreeMap<String, Vec<QuotaInfo>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorSection {
    pub deployment_name: String,
    pub deployment: Option<DeploymentInfo>,
    pub pods: Vec<PodInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlatformSection {
    pub name: String,
    pub found: bool,
    pub conditions: Vec<ConditionSummary>,
}

/// Condition types whose non-True status makes a platform resource unhealthy
const PLATFORM_READY_CONDITIONS: [&str; 2] = ["Ready", "Available"];

/// Full report
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub collected_at: DateTime<Utc>,
    pub nodes: SectionResult<NodesSection>,
    pub deployments: SectionResult<DeploymentsSection>,
    pub pods: SectionResult<PodsSection>,
    pub events: SectionResult<EventsSection>,
    pub quotas: SectionResult<QuotasSection>,
    pub operator: SectionResult<OperatorSection>,
    pub dsci: SectionResult<PlatformSection>,
    pub dsc: SectionResult<PlatformSection>,
}

impl HealthReport {
    /// No section reported an error
    pub fn healthy(&self) -> bool {
        self.section_status().iter().all(|(_, error, _)| error.is_none())
    }

    /// `(section, error, skipped)` for every section, in report order
    pub fn section_status(&self) -> Vec<(Section, Option<&str>, bool)> {
        vec![
            (Section::Nodes, self.nodes.error.as_deref(), self.nodes.skipped),
            (Section::Deployments, self.deployments.error.as_deref(), self.deployments.skipped),
            (Section::Pods, self.pods.error.as_deref(), self.pods.skipped),
            (Section::Events, self.events.error.as_deref(), self.events.skipped),
            (Section::Quotas, self.quotas.error.as_deref(), self.quotas.skipped),
            (Section::Operator, self.operator.error.as_deref(), self.operator.skipped),
            (Section::Dsci, self.dsci.error.as_deref(), self.dsci.skipped),
            (Section::Dsc, self.dsc.error.as_deref(), self.dsc.skipped),
        ]
    }
}

pub fn nodes_section(nodes: &[Node]) -> SectionResult<NodesSection> {
    let infos: Vec<NodeInfo> = nodes.iter().map(summarize_node).collect();
    let mut problems: Vec<String> = infos
        .iter()
        .filter_map(|n| n.unhealthy_reason.as_ref().map(|r| format!("node {}: {r}", n.name)))
        .collect();
    if infos.is_empty() {
        problems.push("no nodes found".to_string());
    }
    SectionResult::with_problems(NodesSection { nodes: infos }, problems)
}

pub fn deployments_section(
    by_namespace: &BTreeMap<String, Vec<Deployment>>,
    mut problems: Vec<String>,
) -> SectionResult<DeploymentsSection> {
    let mut data = DeploymentsSection::default();
    for (ns, deployments) in by_namespace {
        for deploy in deployments {
            let info = DeploymentInfo::from(deploy);
            if !deployment_is_ready(deploy) {
                problems.push(format!(
                    "deployment {ns}/{}: {}/{} ready",
                    info.name, info.ready, info.replicas
                ));
            }
            data.by_namespace.entry(ns.clone()).or_default().push(info);
        }
    }
    SectionResult::with_problems(data, problems)
}

pub fn pods_section(
    by_namespace: &BTreeMap<String, Vec<Pod>>,
    mut problems: Vec<String>,
) -> SectionResult<PodsSection> {
    let mut data = PodsSection::default();
    for (ns, pods) in by_namespace {
        for pod in pods {
            let info = PodInfo::from(pod);
            if pod_has_issues(pod) {
                problems.push(format!("pod {ns}/{}: {}", info.name, info.phase));
            }
            data.by_namespace.entry(ns.clone()).or_default().push(info);
        }
    }
    SectionResult::with_problems(data, problems)
}

/// Recent Warning events are reported, not counted as failures
pub fn events_section(
    by_namespace: BTreeMap<String, Vec<Event>>,
    cutoff: DateTime<Utc>,
    max_per_namespace: usize,
    problems: Vec<String>,
) -> SectionResult<EventsSection> {
    let events = by_namespace
        .into_values()
        .flat_map(|events| {
            let warnings: Vec<Event> = events
                .into_iter()
                .filter(|e| e.type_.as_deref() == Some("Warning"))
                .collect();
            recent_events(warnings, cutoff, max_per_namespace)
        })
        .map(|e| EventInfo::from(&e))
        .collect();
    SectionResult::with_problems(EventsSection { events }, problems)
}

pub fn quotas_section(
    by_namespace: &BTreeMap<String, Vec<ResourceQuota>>,
    mut problems: Vec<String>,
) -> SectionResult<QuotasSection> {
    let mut data = QuotasSection::default();
    for (ns, quotas) in by_namespace {
        for quota in quotas {
            let info = QuotaInfo::from(quota);
            if !info.exceeded.is_empty() {
                problems.push(format!(
                    "quota {ns}/{} exceeded: {}",
                    info.name,
                    info.exceeded.join(", ")
                ));
            }
            data.by_namespace.entry(ns.clone()).or_default().push(info);
        }
    }
    SectionResult::with_problems(data, problems)
}

pub fn operator_section(deployment_name: &str, deploy: &Deployment, pods: &[Pod]) -> SectionResult<OperatorSection> {
    let mut problems = Vec::new();
    if !deployment_is_ready(deploy) {
        problems.push(format!(
            "operator deployment {deployment_name}: {}/{} ready",
            ready_replicas(deploy),
            desired_replicas(deploy)
        ));
    }
    let pod_infos: Vec<PodInfo> = pods.iter().map(PodInfo::from).collect();
    for pod in pod_infos.iter().filter(|p| p.phase != "Running") {
        problems.push(format!("operator pod {}: {}", pod.name, pod.phase));
    }

    SectionResult::with_problems(
        OperatorSection {
            deployment_name: deployment_name.to_string(),
            deployment: Some(DeploymentInfo::from(deploy)),
            pods: pod_infos,
        },
        problems,
    )
}

pub fn platform_section(
    resource: PlatformResource,
    name: &str,
    obj: Option<&DynamicObject>,
) -> SectionResult<PlatformSection> {
    let Some(obj) = obj else {
        return SectionResult::with_problems(
            PlatformSection {
                name: name.to_string(),
                found: false,
                conditions: Vec::new(),
            },
            vec![format!("no {} instance found", resource.label())],
        );
    };

    let conditions = status_conditions(obj);
    let problems = conditions
        .iter()
        .filter(|c| PLATFORM_READY_CONDITIONS.contains(&c.type_.as_str()) && !c.is_true())
        .map(|c| format!("{} {c}", resource.label()))
        .collect();

    SectionResult::with_problems(
        PlatformSection {
            name: name.to_string(),
            found: true,
            conditions,
        },
        problems,
    )
}

/// Fetch a list per namespace; failures become problem strings
async fn collect_namespaced<T, F, Fut>(
    namespaces: &[String],
    what: &str,
    fetch: F,
) -> (BTreeMap<String, Vec<T>>, Vec<String>)
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
{
    let mut items = BTreeMap::new();
    let mut errors = Vec::new();
    for ns in namespaces {
        match fetch(ns.clone()).await {
            Ok(list) => {
                items.insert(ns.clone(), list);
            }
            Err(e) => errors.push(format!("failed to list {what} in {ns}: {e}")),
        }
    }
    (items, errors)
}

async fn check_operator(client: &Client, config: &DiagnosticsConfig) -> SectionResult<OperatorSection> {
    let name = resolve_operator_deployment(client, config).await;
    let api: Api<Deployment> = Api::namespaced(client.clone(), &config.operator_namespace);
    let deploy = match api.get_opt(&name).await {
        Ok(Some(d)) => d,
        Ok(None) => {
            return SectionResult::with_problems(
                OperatorSection {
                    deployment_name: name.clone(),
                    ..Default::default()
                },
                vec![format!("operator deployment {name} not found")],
            )
        }
        Err(e) => return SectionResult::failed(format!("failed to get operator deployment {name}: {e}")),
    };
    match get_operator_pods(client, &config.operator_namespace).await {
        Ok(pods) => operator_section(&name, &deploy, &pods),
        Err(e) => {
            let mut result = operator_section(&name, &deploy, &[]);
            let message = format!("failed to list operator pods: {e}");
            result.error = Some(match result.error {
                Some(existing) => format!("{existing}; {message}"),
                None => message,
            });
            result
        }
    }
}

async fn check_platform(
    client: &Client,
    config: &DiagnosticsConfig,
    resource: PlatformResource,
) -> SectionResult<PlatformSection> {
    let name = resource.instance_name(config);
    match get_platform_object(client, config, resource).await {
        Ok(obj) => platform_section(resource, name, obj.as_ref()),
        Err(e) => SectionResult::failed(format!("failed to get {}: {e}", resource.label())),
    }
}

/// Run the selected sections and collect them into a report
pub async fn run_health_check(
    client: &Client,
    config: &DiagnosticsConfig,
    selection: &HealthSelection,
) -> HealthReport {
    let namespaces = config.monitored_namespaces();
    let quota_namespaces = config.quota_namespaces();
    let cutoff = Utc::now() - chrono::Duration::from_std(config.event_lookback()).unwrap_or_default();

    let nodes = if selection.includes(Section::Nodes) {
        match list_nodes(client).await {
            Ok(nodes) => nodes_section(&nodes),
            Err(e) => SectionResult::failed(format!("failed to list nodes: {e}")),
        }
    } else {
        SectionResult::skipped()
    };

    let deployments = if selection.includes(Section::Deployments) {
        let (items, errors) = collect_namespaced(&namespaces, "deployments", |ns| async move {
            list_deployments(client, &ns).await
        })
        .await;
        deployments_section(&items, errors)
    } else {
        SectionResult::skipped()
    };

    let pods = if selection.includes(Section::Pods) {
        let (items, errors) = collect_namespaced(&namespaces, "pods", |ns| async move {
            list_pods(client, &ns, None).await
        })
        .await;
        pods_section(&items, errors)
    } else {
        SectionResult::skipped()
    };

    let events = if selection.includes(Section::Events) {
        let (items, errors) = collect_namespaced(&namespaces, "events", |ns| async move {
            list_events(client, &ns).await
        })
        .await;
        events_section(items, cutoff, config.max_events, errors)
    } else {
        SectionResult::skipped()
    };

    let quotas = if selection.includes(Section::Quotas) {
        let (items, errors) = collect_namespaced(&quota_namespaces, "resource quotas", |ns| async move {
            list_quotas(client, &ns).await
        })
        .await;
        quotas_section(&items, errors)
    } else {
        SectionResult::skipped()
    };

    let operator = if selection.includes(Section::Operator) {
        check_operator(client, config).await
    } else {
        SectionResult::skipped()
    };

    let dsci = if selection.includes(Section::Dsci) {
        check_platform(client, config, PlatformResource::Dsci).await
    } else {
        SectionResult::skipped()
    };

    let dsc = if selection.includes(Section::Dsc) {
        check_platform(client, config, PlatformResource::Dsc).await
    } else {
        SectionResult::skipped()
    };

    HealthReport {
        collected_at: Utc::now(),
        nodes,
        deployments,
        pods,
        events,
        quotas,
        operator,
        dsci,
        dsc,
    }
}
