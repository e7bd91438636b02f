//! Secret redaction for captured container logs
//!
//! Each pattern keeps the keyword and delimiter (`password=`, `token: `,
//! `Authorization: Bearer `) and replaces only the value with [`REDACTED`].
//! The marker never contains a keyword, so applying the set twice yields the
//! same text as applying it once.

use regex::Regex;
use std::sync::OnceLock;

/// Placeholder substituted for secret values
pub const REDACTED: &str = "[REDACTED]";

/// Ordered set of secret patterns
pub struct Redactor {
    patterns: Vec<Regex>,
}

/// Keyword prefix, optional closing quote, delimiter run, optional opening
/// quote. The value stops at whitespace, `&`, or a quote.
const KEYED_VALUE: &str = r#"["']?[=:\s]+["']?)[^\s&"']+"#;

fn pattern_sources() -> [String; 6] {
    [
        r#"(?i)(Authorization:\s*Bearer\s+)[^\s"']+"#.to_string(),
        format!("(?i)(password{KEYED_VALUE}"),
        format!("(?i)(token{KEYED_VALUE}"),
        format!("(?i)(secret{KEYED_VALUE}"),
        format!("(?i)(api[ _-]?key{KEYED_VALUE}"),
        format!("(?i)(access[ _-]?key{KEYED_VALUE}"),
    ]
}

static GLOBAL_REDACTOR: OnceLock<Redactor> = OnceLock::new();

impl Redactor {
    /// Compile the pattern set
    pub fn new() -> Self {
        let patterns = pattern_sources()
            .iter()
            .map(|source| Regex::new(source).expect("redaction pattern"))
            .collect();
        Self { patterns }
    }

    /// Shared compiled instance
    pub fn global() -> &'static Redactor {
        GLOBAL_REDACTOR.get_or_init(Redactor::new)
    }

    /// Replace secret values, keeping the identifying prefix
    pub fn redact(&self, text: &str) -> String {
        let replacement = format!("${{1}}{REDACTED}");
        let mut result = text.to_string();
        for pattern in &self.patterns {
            result = pattern
                .replace_all(&result, replacement.as_str())
                .into_owned();
        }
        result
    }
}

impl Default for Redactor {
    fn default() -> Self {
        Self::new()
    }
}

/// Redact secrets from log content using the shared pattern set
pub fn redact_sensitive_info(text: &str) -> String {
    Redactor::global().redact(text)
}
