//! Pod diagnostics
//!
//! Deep-dive for a single pod:
//! - Phase, age and conditions
//! - Container state, last termination and exit code interpretation
//! - Readiness probe configuration
//! - Current and previous log tails (redacted)
//! - Most recent pod events
//! - Resource requests and limits

use super::events::{list_events, pod_events, EventInfo};
use super::types::*;
use crate::config::DiagnosticsConfig;
use crate::error::{DiagError, Result};
use crate::redact::redact_sensitive_info;
use chrono::{DateTime, Utc};
use futures::{AsyncRead, AsyncReadExt};
use tracing::debug;
use k8s_openapi::api::core::v1::{Container, ContainerStatus, Pod, Probe};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::api::LogParams;
use kube::{Api, Client};

/// Whether a pod should get a deep-dive.
///
/// Running, Succeeded and Pending pods are considered healthy, except Running
/// pods with a container that is not ready, has restarted, or is waiting or
/// terminated. Any other phase (Failed, Unknown, missing) is flagged.
pub fn pod_has_issues(pod: &Pod) -> bool {
    let status = pod.status.as_ref();
    let phase = status.and_then(|s| s.phase.as_deref()).unwrap_or("Unknown");

    match phase {
        "Running" => status
            .and_then(|s| s.container_statuses.as_ref())
            .into_iter()
            .flatten()
            .any(container_has_issues),
        "Succeeded" | "Pending" => false,
        _ => true,
    }
}

/// Not ready, restarted, waiting or terminated
pub fn container_has_issues(cs: &ContainerStatus) -> bool {
    let state = cs.state.as_ref();
    !cs.ready
        || cs.restart_count > 0
        || state.and_then(|s| s.waiting.as_ref()).is_some()
        || state.and_then(|s| s.terminated.as_ref()).is_some()
}

/// Init containers that finished cleanly are expected to be terminated and
/// not ready; only the other cases are interesting.
pub fn init_container_has_issues(cs: &ContainerStatus) -> bool {
    let completed = cs
        .state
        .as_ref()
        .and_then(|s| s.terminated.as_ref())
        .is_some_and(|t| t.exit_code == 0);
    !(completed && cs.restart_count == 0)
}

/// Current container state
#[derive(Debug, Clone, PartialEq)]
pub enum ContainerStateSummary {
    Running {
        started_at: Option<DateTime<Utc>>,
    },
    Waiting {
        reason: String,
        message: String,
    },
    Terminated(TerminationRecord),
    Unknown,
}

/// A termination, current or previous
#[derive(Debug, Clone, PartialEq)]
pub struct TerminationRecord {
    pub reason: String,
    pub exit_code: i32,
    pub message: String,
}

/// Readiness probe handler
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeHandler {
    HttpGet {
        path: String,
        port: String,
        scheme: Option<String>,
    },
    TcpSocket {
        port: String,
    },
    Exec {
        command: Vec<String>,
    },
    Grpc {
        port: i32,
        service: Option<String>,
    },
    Unspecified,
}

/// Readiness probe handler and timing, with API server defaults filled in
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeSummary {
    pub handler: ProbeHandler,
    pub initial_delay_seconds: i32,
    pub period_seconds: i32,
    pub timeout_seconds: i32,
    pub success_threshold: i32,
    pub failure_threshold: i32,
}

impl From<&Probe> for ProbeSummary {
    fn from(probe: &Probe) -> Self {
        let handler = if let Some(http) = &probe.http_get {
            ProbeHandler::HttpGet {
                path: http.path.clone().unwrap_or_else(|| "/".to_string()),
                port: int_or_string(&http.port),
                scheme: http.scheme.clone(),
            }
        } else if let Some(tcp) = &probe.tcp_socket {
            ProbeHandler::TcpSocket {
                port: int_or_string(&tcp.port),
            }
        } else if let Some(exec) = &probe.exec {
            ProbeHandler::Exec {
                command: exec.command.clone().unwrap_or_default(),
            }
        } else if let Some(grpc) = &probe.grpc {
            ProbeHandler::Grpc {
                port: grpc.port,
                service: grpc.service.clone(),
            }
        } else {
            ProbeHandler::Unspecified
        };

        Self {
            handler,
            initial_delay_seconds: probe.initial_delay_seconds.unwrap_or(0),
            period_seconds: probe.period_seconds.unwrap_or(10),
            timeout_seconds: probe.timeout_seconds.unwrap_or(1),
            success_threshold: probe.success_threshold.unwrap_or(1),
            failure_threshold: probe.failure_threshold.unwrap_or(3),
        }
    }
}

fn int_or_string(value: &IntOrString) -> String {
    match value {
        IntOrString::Int(i) => i.to_string(),
        IntOrString::String(s) => s.clone(),
    }
}

/// Outcome of a log fetch, with the tail length that was asked for
#[derive(Debug, Clone, PartialEq)]
pub struct LogTail {
    pub requested: i64,
    pub outcome: std::result::Result<Vec<String>, String>,
}

impl LogTail {
    pub fn new<E: std::fmt::Display>(
        requested: i64,
        result: std::result::Result<Vec<String>, E>,
    ) -> Self {
        Self {
            requested,
            outcome: result.map_err(|e| e.to_string()),
        }
    }
}

/// Per-container view
#[derive(Debug, Clone)]
pub struct ContainerSnapshot {
    pub name: String,
    pub ready: bool,
    pub restart_count: i32,
    pub image: String,
    pub state: ContainerStateSummary,
    pub last_termination: Option<TerminationRecord>,
    pub readiness_probe: Option<ProbeSummary>,
    pub current_logs: Option<LogTail>,
    pub previous_logs: Option<LogTail>,
}

impl ContainerSnapshot {
    fn from_status(cs: &ContainerStatus, spec: Option<&Container>) -> Self {
        let state = cs.state.as_ref();
        let summary = if let Some(running) = state.and_then(|s| s.running.as_ref()) {
            ContainerStateSummary::Running {
                started_at: running.started_at.as_ref().map(|t| t.0),
            }
        } else if let Some(waiting) = state.and_then(|s| s.waiting.as_ref()) {
            ContainerStateSummary::Waiting {
                reason: waiting.reason.clone().unwrap_or_default(),
                message: waiting.message.clone().unwrap_or_default(),
            }
        } else if let Some(terminated) = state.and_then(|s| s.terminated.as_ref()) {
            ContainerStateSummary::Terminated(TerminationRecord {
                reason: terminated.reason.clone().unwrap_or_default(),
                exit_code: terminated.exit_code,
                message: terminated.message.clone().unwrap_or_default(),
            })
        } else {
            ContainerStateSummary::Unknown
        };

        let last_termination = cs
            .last_state
            .as_ref()
            .and_then(|s| s.terminated.as_ref())
            .map(|t| TerminationRecord {
                reason: t.reason.clone().unwrap_or_default(),
                exit_code: t.exit_code,
                message: t.message.clone().unwrap_or_default(),
            });

        Self {
            name: cs.name.clone(),
            ready: cs.ready,
            restart_count: cs.restart_count,
            image: cs.image.clone(),
            state: summary,
            last_termination,
            readiness_probe: spec
                .and_then(|c| c.readiness_probe.as_ref())
                .map(ProbeSummary::from),
            current_logs: None,
            previous_logs: None,
        }
    }

    /// Logs are fetched only for containers that look unhealthy
    pub fn needs_logs(&self) -> bool {
        !self.ready
            || self.restart_count > 0
            || matches!(
                self.state,
                ContainerStateSummary::Waiting { .. } | ContainerStateSummary::Terminated(_)
            )
    }
}

/// Requests and limits of one container
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerResources {
    pub name: String,
    pub cpu_request: Option<String>,
    pub cpu_limit: Option<String>,
    pub memory_request: Option<String>,
    pub memory_limit: Option<String>,
}

impl From<&Container> for ContainerResources {
    fn from(container: &Container) -> Self {
        let resources = container.resources.as_ref();
        let pick = |limits: bool, key: &str| {
            resources
                .and_then(|r| if limits { r.limits.as_ref() } else { r.requests.as_ref() })
                .and_then(|m| m.get(key))
                .map(|q| q.0.clone())
                .filter(|v| !is_zero_quantity(v))
        };
        Self {
            name: container.name.clone(),
            cpu_request: pick(false, "cpu"),
            cpu_limit: pick(true, "cpu"),
            memory_request: pick(false, "memory"),
            memory_limit: pick(true, "memory"),
        }
    }
}

fn is_zero_quantity(value: &str) -> bool {
    super::quantity::ParsedQuantity::parse(value).is_ok_and(|q| q.is_zero())
}

/// Read-only view of one pod at dump time
#[derive(Debug, Clone)]
pub struct PodSnapshot {
    pub namespace: String,
    pub name: String,
    pub phase: String,
    pub created_at: Option<DateTime<Utc>>,
    pub captured_at: DateTime<Utc>,
    pub conditions: Vec<ConditionSummary>,
    pub containers: Vec<ContainerSnapshot>,
    pub init_containers: Vec<ContainerSnapshot>,
    pub events: std::result::Result<Vec<EventInfo>, String>,
    pub resources: Vec<ContainerResources>,
}

impl PodSnapshot {
    /// Build the snapshot from the pod object alone; logs and events are
    /// filled in by [`capture_pod_snapshot`]
    pub fn from_pod(pod: &Pod, captured_at: DateTime<Utc>) -> Self {
        let spec = pod.spec.as_ref();
        let status = pod.status.as_ref();

        let find_spec = |name: &str, init: bool| {
            spec.and_then(|s| {
                let list = if init {
                    s.init_containers.as_deref().unwrap_or_default()
                } else {
                    s.containers.as_slice()
                };
                list.iter().find(|c| c.name == name)
            })
        };

        let containers = status
            .and_then(|s| s.container_statuses.as_ref())
            .into_iter()
            .flatten()
            .map(|cs| ContainerSnapshot::from_status(cs, find_spec(&cs.name, false)))
            .collect();

        let init_containers = status
            .and_then(|s| s.init_container_statuses.as_ref())
            .into_iter()
            .flatten()
            .filter(|cs| init_container_has_issues(cs))
            .map(|cs| ContainerSnapshot::from_status(cs, find_spec(&cs.name, true)))
            .collect();

        let conditions = status
            .and_then(|s| s.conditions.as_ref())
            .into_iter()
            .flatten()
            .map(|c| ConditionSummary::new(&c.type_, &c.status, c.reason.as_deref(), c.message.as_deref()))
            .collect();

        Self {
            namespace: pod.metadata.namespace.clone().unwrap_or_default(),
            name: pod.metadata.name.clone().unwrap_or_default(),
            phase: status
                .and_then(|s| s.phase.clone())
                .unwrap_or_else(|| "Unknown".to_string()),
            created_at: pod.metadata.creation_timestamp.as_ref().map(|t| t.0),
            captured_at,
            conditions,
            containers,
            init_containers,
            events: Ok(Vec::new()),
            resources: spec
                .map(|s| s.containers.iter().map(ContainerResources::from).collect())
                .unwrap_or_default(),
        }
    }

    /// Write the full POD DIAGNOSTICS block
    pub fn render(&self, log: &mut DumpLog) {
        log.banner(format!("POD DIAGNOSTICS: {}/{}", self.namespace, self.name));

        let age = self
            .created_at
            .map(|t| format_duration(age_since(t, self.captured_at)))
            .unwrap_or_else(|| "unknown".to_string());
        log.line(format!("Pod Phase: {} (age: {age})", self.phase));

        log.line("Pod Conditions:");
        for condition in &self.conditions {
            let symbol = if condition.is_true() { "✓" } else { "✗" };
            log.line(format!("  {symbol} {}: {}", condition.type_, condition.status));
            if !condition.is_true() {
                if !condition.message.is_empty() {
                    log.line(format!("    Message: {}", condition.message));
                }
                if !condition.reason.is_empty() {
                    log.line(format!("    Reason: {}", condition.reason));
                }
            }
        }

        log.line("Container Status:");
        for container in &self.containers {
            self.render_container(container, log);
        }

        for container in &self.init_containers {
            log.line("Init Container Status:");
            self.render_container(container, log);
        }

        self.render_events(log);
        self.render_resources(log);

        log.line("=== END POD DIAGNOSTICS ===");
    }

    fn render_container(&self, container: &ContainerSnapshot, log: &mut DumpLog) {
        log.line(format!("  Container: {}", container.name));
        log.line(format!("    Ready: {}", container.ready));
        log.line(format!("    Restart Count: {}", container.restart_count));
        log.line(format!("    Image: {}", container.image));

        match &container.state {
            ContainerStateSummary::Running { started_at } => {
                let running_for = started_at
                    .map(|t| format_duration(age_since(t, self.captured_at)))
                    .unwrap_or_else(|| "unknown".to_string());
                log.line(format!("    State: Running (started {running_for} ago)"));
            }
            ContainerStateSummary::Waiting { reason, message } => {
                log.line("    State: Waiting");
                log.line(format!("      Reason: {reason}"));
                if !message.is_empty() {
                    log.line(format!("      Message: {message}"));
                }
            }
            ContainerStateSummary::Terminated(record) => {
                log.line("    State: Terminated");
                render_termination(record, log);
            }
            ContainerStateSummary::Unknown => log.line("    State: Unknown"),
        }

        if let Some(record) = &container.last_termination {
            log.line("    Last Termination:");
            render_termination(record, log);
        }

        if let Some(probe) = &container.readiness_probe {
            render_probe(probe, log);
        }

        if let Some(logs) = &container.current_logs {
            log.line(format!("    === Recent Logs (last {} lines) ===", logs.requested));
            render_log_tail(logs, "logs", log);
            log.line("    === End Logs ===");
        }

        if let Some(logs) = &container.previous_logs {
            log.line(format!(
                "    === Previous Logs (before restart, last {} lines) ===",
                logs.requested
            ));
            render_log_tail(logs, "previous logs", log);
            log.line("    === End Previous Logs ===");
        }
    }

    fn render_events(&self, log: &mut DumpLog) {
        match &self.events {
            Err(e) => log.failure(format!("Failed to list events: {e}")),
            Ok(events) if events.is_empty() => log.line("Pod Events: No events found"),
            Ok(events) => {
                log.line(format!("Pod Events (most recent {}):", events.len()));
                for event in events {
                    let age = event
                        .last_seen
                        .map(|t| format_duration(age_since(t, self.captured_at)))
                        .unwrap_or_else(|| "unknown".to_string());
                    let kind = if event.type_ == "Warning" { "WARNING" } else { "Normal" };
                    log.line(format!(
                        "  [{age} ago] {kind}: {} - {}",
                        event.reason, event.message
                    ));
                }
            }
        }
    }

    fn render_resources(&self, log: &mut DumpLog) {
        log.line("Resource Requests and Limits:");
        for resources in &self.resources {
            log.line(format!("  Container: {}", resources.name));
            let entries = [
                ("CPU Request", &resources.cpu_request),
                ("CPU Limit", &resources.cpu_limit),
                ("Memory Request", &resources.memory_request),
                ("Memory Limit", &resources.memory_limit),
            ];
            for (label, value) in entries {
                if let Some(value) = value {
                    log.line(format!("    {label}: {value}"));
                }
            }
        }
    }
}

fn render_termination(record: &TerminationRecord, log: &mut DumpLog) {
    log.line(format!("      Reason: {}", record.reason));
    let exit = ExitCodeInfo::analyze(record.exit_code);
    log.line(format!("      Exit Code: {} ({})", record.exit_code, exit.meaning));
    if !record.message.is_empty() {
        log.line(format!("      Message: {}", record.message));
    }
}

fn render_probe(probe: &ProbeSummary, log: &mut DumpLog) {
    log.line("    Readiness Probe:");
    match &probe.handler {
        ProbeHandler::HttpGet { path, port, scheme } => {
            log.line("      Type: HTTP GET");
            log.line(format!("      Path: {path}"));
            log.line(format!("      Port: {port}"));
            if let Some(scheme) = scheme {
                log.line(format!("      Scheme: {scheme}"));
            }
        }
        ProbeHandler::TcpSocket { port } => {
            log.line("      Type: TCP Socket");
            log.line(format!("      Port: {port}"));
        }
        ProbeHandler::Exec { command } => {
            log.line("      Type: Exec");
            log.line(format!("      Command: {command:?}"));
        }
        ProbeHandler::Grpc { port, service } => {
            log.line("      Type: gRPC");
            log.line(format!("      Port: {port}"));
            if let Some(service) = service {
                log.line(format!("      Service: {service}"));
            }
        }
        ProbeHandler::Unspecified => log.line("      Type: Unspecified"),
    }
    log.line(format!("      Initial Delay: {}s", probe.initial_delay_seconds));
    log.line(format!("      Period: {}s", probe.period_seconds));
    log.line(format!("      Timeout: {}s", probe.timeout_seconds));
    log.line(format!("      Success Threshold: {}", probe.success_threshold));
    log.line(format!("      Failure Threshold: {}", probe.failure_threshold));
}

fn render_log_tail(logs: &LogTail, what: &str, log: &mut DumpLog) {
    match &logs.outcome {
        Err(e) => log.failure(format!("    Failed to retrieve {what}: {e}")),
        Ok(lines) if lines.iter().all(|l| l.trim().is_empty()) => {
            log.line(format!("    No {what} available"));
        }
        Ok(lines) => {
            let redacted = redact_sensitive_info(&lines.join("\n"));
            for line in redacted.lines().filter(|l| !l.trim().is_empty()) {
                log.line(format!("    {line}"));
            }
        }
    }
}

/// Fetch the last `tail_lines` lines of a container's log.
///
/// The stream is dropped, closing the connection, on every return path.
pub async fn fetch_container_logs(
    client: &Client,
    namespace: &str,
    pod: &str,
    container: &str,
    previous: bool,
    tail_lines: i64,
) -> Result<Vec<String>> {
    let api: Api<Pod> = Api::namespaced(client.clone(), namespace);
    let params = LogParams {
        container: Some(container.to_string()),
        tail_lines: Some(tail_lines),
        previous,
        ..Default::default()
    };

    let stream = api.log_stream(pod, &params).await?;
    read_log_lines(stream).await
}

/// Drain a log stream into lines.
///
/// Invalid UTF-8 is replaced rather than rejected. A read error after some
/// bytes arrived keeps what was read; an error before any data is returned.
pub async fn read_log_lines<R: AsyncRead>(reader: R) -> Result<Vec<String>> {
    futures::pin_mut!(reader);
    let mut buf = Vec::new();
    if let Err(e) = reader.read_to_end(&mut buf).await {
        if buf.is_empty() {
            return Err(e.into());
        }
        debug!("Log stream ended early after {} bytes: {e}", buf.len());
    }
    Ok(String::from_utf8_lossy(&buf).lines().map(str::to_string).collect())
}

/// Get a pod and collect its logs and events
pub async fn capture_pod_snapshot(
    client: &Client,
    namespace: &str,
    name: &str,
    config: &DiagnosticsConfig,
) -> Result<PodSnapshot> {
    let api: Api<Pod> = Api::namespaced(client.clone(), namespace);
    let pod = api.get_opt(name).await?.ok_or_else(|| DiagError::NotFound {
        kind: "Pod".to_string(),
        name: format!("{namespace}/{name}"),
    })?;

    let mut snapshot = PodSnapshot::from_pod(&pod, Utc::now());

    for container in snapshot
        .containers
        .iter_mut()
        .chain(snapshot.init_containers.iter_mut())
    {
        if !container.needs_logs() {
            continue;
        }
        let container_name = container.name.clone();

        let current = fetch_container_logs(
            client,
            namespace,
            name,
            &container_name,
            false,
            config.log_tail_lines,
        )
        .await;
        container.current_logs = Some(LogTail::new(config.log_tail_lines, current));

        if container.restart_count > 0 {
            let previous = fetch_container_logs(
                client,
                namespace,
                name,
                &container_name,
                true,
                config.previous_log_tail_lines,
            )
            .await;
            container.previous_logs = Some(LogTail::new(config.previous_log_tail_lines, previous));
        }
    }

    snapshot.events = match list_events(client, namespace).await {
        Ok(events) => Ok(pod_events(events, name, config.max_events)
            .iter()
            .map(EventInfo::from)
            .collect()),
        Err(e) => Err(e.to_string()),
    };

    Ok(snapshot)
}

/// POD DIAGNOSTICS block for one pod
pub async fn capture_pod_diagnostics(
    client: &Client,
    namespace: &str,
    name: &str,
    config: &DiagnosticsConfig,
    log: &mut DumpLog,
) {
    match capture_pod_snapshot(client, namespace, name, config).await {
        Ok(snapshot) => snapshot.render(log),
        Err(e) => {
            log.banner(format!("POD DIAGNOSTICS: {namespace}/{name}"));
            log.failure(format!("Failed to get pod: {e}"));
        }
    }
}
