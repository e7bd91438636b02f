//! Shared diagnostic types and the dump log sink

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{info, warn};

/// Condition status treated as healthy for most condition types
pub const CONDITION_TRUE: &str = "True";

/// Line-oriented sink for dump output.
///
/// A streaming log forwards each line to `tracing` as it is written and
/// keeps nothing, so a dump interrupted halfway still leaves its findings
/// in the test output. A capturing log records lines in order instead.
#[derive(Debug)]
pub struct DumpLog {
    lines: Vec<String>,
    echo: bool,
    retain: bool,
}

impl Default for DumpLog {
    fn default() -> Self {
        Self::capture()
    }
}

impl DumpLog {
    /// Log that forwards every line to tracing without recording it
    pub fn streaming() -> Self {
        Self {
            lines: Vec::new(),
            echo: true,
            retain: false,
        }
    }

    /// Log that only records lines
    pub fn capture() -> Self {
        Self {
            lines: Vec::new(),
            echo: false,
            retain: true,
        }
    }

    /// Section banner, e.g. `=== CLUSTER STATE ===`
    pub fn banner(&mut self, title: impl fmt::Display) {
        self.line(format!("=== {title} ==="));
    }

    /// Informational finding
    pub fn line(&mut self, line: impl Into<String>) {
        let line = line.into();
        if self.echo {
            info!(target: "dscdiag::dump", "{line}");
        }
        self.record(line);
    }

    /// Failure of a single read; the stage carries on or returns
    pub fn failure(&mut self, line: impl Into<String>) {
        let line = line.into();
        if self.echo {
            warn!(target: "dscdiag::dump", "{line}");
        }
        self.record(line);
    }

    fn record(&mut self, line: String) {
        if self.retain {
            self.lines.push(line);
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// True if any line contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|l| l.contains(needle))
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Consume the log, returning the recorded lines
    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

/// Minimal condition view used by every stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionSummary {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub message: String,
}

impl ConditionSummary {
    pub fn new(
        type_: impl Into<String>,
        status: impl Into<String>,
        reason: Option<&str>,
        message: Option<&str>,
    ) -> Self {
        Self {
            type_: type_.into(),
            status: status.into(),
            reason: reason.unwrap_or_default().to_string(),
            message: message.unwrap_or_default().to_string(),
        }
    }

    pub fn is_true(&self) -> bool {
        self.status == CONDITION_TRUE
    }
}

impl fmt::Display for ConditionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} - {}", self.type_, self.status, self.message)
    }
}

/// Exit code interpretation for terminated containers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitCodeInfo {
    pub code: i32,
    pub signal: Option<String>,
    pub meaning: String,
}

impl ExitCodeInfo {
    /// Analyze exit code
    pub fn analyze(code: i32) -> Self {
        let meaning = match code {
            0 => "Success",
            1 => "General error",
            2 => "Misuse of shell command",
            126 => "Command not executable",
            127 => "Command not found",
            128 => "Invalid exit argument",
            // 128 + N = killed by signal N
            129 => "SIGHUP",
            130 => "SIGINT",
            131 => "SIGQUIT",
            134 => "SIGABRT",
            137 => "SIGKILL (OOMKilled or killed by kubelet)",
            139 => "SIGSEGV",
            143 => "SIGTERM",
            255 => "Exit status out of range",
            _ => "Unknown exit code",
        };

        let signal = if code > 128 && code < 165 {
            Some(format!("Signal {}", code - 128))
        } else {
            None
        };

        Self {
            code,
            signal,
            meaning: meaning.to_string(),
        }
    }
}

/// Render a duration the way Go's `Duration.Round(time.Second)` prints it,
/// e.g. `1h2m3s`
pub fn format_duration(d: Duration) -> String {
    let total = d.as_secs();
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    match (h, m) {
        (0, 0) => format!("{s}s"),
        (0, _) => format!("{m}m{s}s"),
        _ => format!("{h}h{m}m{s}s"),
    }
}

/// Elapsed time from `since` until `now`, clamped at zero
pub fn age_since(since: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - since).to_std().unwrap_or_default()
}
