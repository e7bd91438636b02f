//! Diagnostics configuration
//!
//! Values are layered: built-in defaults, then an optional TOML file
//! (`~/.dscdiag/config.toml` or an explicit path), then the environment
//! variables shared with the e2e suite.

use crate::error::{DiagError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_OPERATOR_NAMESPACE: &str = "E2E_TEST_OPERATOR_NAMESPACE";
pub const ENV_APPLICATIONS_NAMESPACE: &str = "E2E_TEST_APPLICATIONS_NAMESPACE";
pub const ENV_OPERATOR_DEPLOYMENT: &str = "E2E_TEST_OPERATOR_DEPLOYMENT_NAME";
pub const ENV_EVENT_LOOKBACK: &str = "DSCDIAG_EVENT_LOOKBACK";

/// Settings consumed by the dump pipeline and the health report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Namespace the operator is deployed into
    pub operator_namespace: String,

    /// Namespace holding the managed component workloads
    pub applications_namespace: String,

    /// Additional namespaces inspected for workloads and events
    pub extra_namespaces: Vec<String>,

    /// Operator deployment name; derived from the DSCI platform when unset
    pub operator_deployment: Option<String>,

    /// Name of the DSCInitialization singleton
    pub dsci_name: String,

    /// Name of the DataScienceCluster singleton
    pub dsc_name: String,

    /// API version used for both platform resources
    pub platform_api_version: String,

    /// Recent-events lookback window in seconds
    pub event_lookback_secs: u64,

    /// Maximum events printed per namespace or per pod
    pub max_events: usize,

    /// Tail lines fetched from the current container instance
    pub log_tail_lines: i64,

    /// Tail lines fetched from the previous container instance
    pub previous_log_tail_lines: i64,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            operator_namespace: "opendatahub-operator-system".to_string(),
            applications_namespace: "opendatahub".to_string(),
            extra_namespaces: vec!["kube-system".to_string()],
            operator_deployment: None,
            dsci_name: "default-dsci".to_string(),
            dsc_name: "default-dsc".to_string(),
            platform_api_version: "v2".to_string(),
            event_lookback_secs: 300,
            max_events: 10,
            log_tail_lines: 100,
            previous_log_tail_lines: 50,
        }
    }
}

impl DiagnosticsConfig {
    /// Defaults with environment overrides applied
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Err(e) = config.apply_env(|key| std::env::var(key).ok()) {
            tracing::warn!("Ignoring invalid diagnostics environment: {e}");
        }
        config
    }

    /// Apply overrides from an environment lookup function.
    ///
    /// Blank values are ignored. Every valid override is applied even when a
    /// later one fails to parse.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(ns) = get(ENV_OPERATOR_NAMESPACE) {
            self.operator_namespace = ns;
        }
        if let Some(ns) = get(ENV_APPLICATIONS_NAMESPACE) {
            self.applications_namespace = ns;
        }
        if let Some(name) = get(ENV_OPERATOR_DEPLOYMENT) {
            self.operator_deployment = Some(name);
        }
        if let Some(window) = get(ENV_EVENT_LOOKBACK) {
            let parsed = humantime::parse_duration(&window).map_err(|e| {
                DiagError::Config(format!("{ENV_EVENT_LOOKBACK}={window}: {e}"))
            })?;
            self.event_lookback_secs = parsed.as_secs();
        }

        Ok(())
    }

    /// Recent-events lookback window
    pub fn event_lookback(&self) -> Duration {
        Duration::from_secs(self.event_lookback_secs)
    }

    /// Namespaces inspected for workloads and events, without duplicates
    pub fn monitored_namespaces(&self) -> Vec<String> {
        let mut namespaces = Vec::new();
        let candidates = [&self.applications_namespace, &self.operator_namespace]
            .into_iter()
            .chain(self.extra_namespaces.iter());
        for ns in candidates {
            if !ns.is_empty() && !namespaces.contains(ns) {
                namespaces.push(ns.clone());
            }
        }
        namespaces
    }

    /// Namespaces inspected for resource quotas
    pub fn quota_namespaces(&self) -> Vec<String> {
        let mut namespaces = vec![self.applications_namespace.clone()];
        if self.operator_namespace != self.applications_namespace {
            namespaces.push(self.operator_namespace.clone());
        }
        namespaces
    }
}

/// Get the dscdiag config directory (~/.dscdiag)
pub fn config_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|h| h.join(".dscdiag"))
        .ok_or_else(|| DiagError::Config("Could not determine home directory".to_string()))
}

/// Load configuration from a TOML file, then apply the environment.
///
/// With no explicit path, `~/.dscdiag/config.toml` is read when it exists.
/// An explicit path that does not exist is an error.
pub fn load_config(path: Option<&Path>) -> Result<DiagnosticsConfig> {
    let mut config = match path {
        Some(p) => read_config_file(p)?,
        None => {
            let default_path = config_dir()?.join("config.toml");
            if default_path.exists() {
                read_config_file(&default_path)?
            } else {
                DiagnosticsConfig::default()
            }
        }
    };

    config.apply_env(|key| std::env::var(key).ok())?;
    Ok(config)
}

fn read_config_file(path: &Path) -> Result<DiagnosticsConfig> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}
