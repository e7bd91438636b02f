//! Event diagnostics
//!
//! Recent events per monitored namespace and the event history of a single
//! pod, always newest first and capped.

use super::types::*;
use crate::config::DiagnosticsConfig;
use crate::error::Result;
use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::Event;
use kube::{api::ListParams, Api, Client};
use serde::{Deserialize, Serialize};

/// One event for reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventInfo {
    pub namespace: String,
    pub kind: String,
    pub name: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub reason: String,
    pub message: String,
    pub last_seen: Option<DateTime<Utc>>,
}

impl From<&Event> for EventInfo {
    fn from(event: &Event) -> Self {
        let involved = &event.involved_object;
        Self {
            namespace: event
                .metadata
                .namespace
                .clone()
                .or_else(|| involved.namespace.clone())
                .unwrap_or_default(),
            kind: involved.kind.clone().unwrap_or_default(),
            name: involved.name.clone().unwrap_or_default(),
            type_: event.type_.clone().unwrap_or_else(|| "Normal".to_string()),
            reason: event.reason.clone().unwrap_or_default(),
            message: event.message.clone().unwrap_or_default(),
            last_seen: event_last_seen(event),
        }
    }
}

/// When the event was last observed.
///
/// Core/v1 events from older reporters only carry `lastTimestamp`; events
/// written through events.k8s.io only carry `eventTime`.
pub fn event_last_seen(event: &Event) -> Option<DateTime<Utc>> {
    event
        .last_timestamp
        .as_ref()
        .map(|t| t.0)
        .or_else(|| event.event_time.as_ref().map(|t| t.0))
        .or_else(|| event.first_timestamp.as_ref().map(|t| t.0))
}

/// Sort events newest first; events without a timestamp sort last
pub fn sort_newest_first(events: &mut [Event]) {
    events.sort_by(|a, b| event_last_seen(b).cmp(&event_last_seen(a)));
}

/// Events last seen at or after `cutoff`, newest first, at most `max`
pub fn recent_events(events: Vec<Event>, cutoff: DateTime<Utc>, max: usize) -> Vec<Event> {
    let mut recent: Vec<Event> = events
        .into_iter()
        .filter(|e| event_last_seen(e).is_some_and(|t| t >= cutoff))
        .collect();
    sort_newest_first(&mut recent);
    recent.truncate(max);
    recent
}

/// Events about the named pod, newest first, at most `max`
pub fn pod_events(events: Vec<Event>, pod_name: &str, max: usize) -> Vec<Event> {
    let mut matching: Vec<Event> = events
        .into_iter()
        .filter(|e| {
            e.involved_object.name.as_deref() == Some(pod_name)
                && e.involved_object.kind.as_deref() == Some("Pod")
        })
        .collect();
    sort_newest_first(&mut matching);
    matching.truncate(max);
    matching
}

/// List events in a namespace
pub async fn list_events(client: &Client, namespace: &str) -> Result<Vec<Event>> {
    let api: Api<Event> = Api::namespaced(client.clone(), namespace);
    Ok(api.list(&ListParams::default()).await?.items)
}

/// Write one namespace's recent events
pub fn log_recent_events(namespace: &str, events: &[Event], log: &mut DumpLog) {
    log.line(format!("Namespace {namespace}:"));
    for event in events {
        let info = EventInfo::from(event);
        let level = if info.type_ == "Warning" { "WARN" } else { "INFO" };
        let time = info
            .last_seen
            .map(|t| t.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "--:--:--".to_string());
        log.line(format!(
            "  {time} {level} {}/{}: {} - {}",
            info.kind, info.name, info.reason, info.message
        ));
    }
}

/// RECENT EVENTS stage
pub async fn debug_recent_events(client: &Client, config: &DiagnosticsConfig, log: &mut DumpLog) {
    let window = config.event_lookback();
    log.banner(format!(
        "RECENT EVENTS (last {})",
        humantime::format_duration(window)
    ));

    let cutoff = Utc::now() - chrono::Duration::from_std(window).unwrap_or_default();
    let mut has_events = false;

    for ns in config.monitored_namespaces() {
        let events = match list_events(client, &ns).await {
            Ok(events) => events,
            Err(e) => {
                log.failure(format!("Failed to list events in namespace {ns}: {e}"));
                continue;
            }
        };

        let recent = recent_events(events, cutoff, config.max_events);
        if recent.is_empty() {
            continue;
        }

        has_events = true;
        log_recent_events(&ns, &recent, log);
    }

    if !has_events {
        log.line("No recent events found in monitored namespaces");
    }
}
