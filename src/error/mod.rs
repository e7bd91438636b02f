//! Error types for dscdiag

use thiserror::Error;

/// Main error type for dscdiag
#[derive(Debug, Error)]
pub enum DiagError {
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("Resource not found: {kind}/{name}")]
    NotFound { kind: String, name: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid quantity '{value}': {reason}")]
    InvalidQuantity { value: String, reason: String },
}

impl From<serde_json::Error> for DiagError {
    fn from(e: serde_json::Error) -> Self {
        DiagError::Serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for DiagError {
    fn from(e: serde_yaml::Error) -> Self {
        DiagError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for DiagError {
    fn from(e: toml::de::Error) -> Self {
        DiagError::Config(e.to_string())
    }
}

/// Result type alias for dscdiag
pub type Result<T> = std::result::Result<T, DiagError>;
