//! Tests for src/error/mod.rs - DiagError

use dscdiag::error::DiagError;
use std::error::Error;

#[test]
fn test_not_found_error_display() {
    let err = DiagError::NotFound {
        kind: "Pod".to_string(),
        name: "opendatahub/dashboard-0".to_string(),
    };
    let display = format!("{}", err);
    assert!(display.contains("Resource not found"));
    assert!(display.contains("Pod/opendatahub/dashboard-0"));
}

#[test]
fn test_invalid_quantity_display() {
    let err = DiagError::InvalidQuantity {
        value: "12Q".to_string(),
        reason: "unknown suffix".to_string(),
    };
    assert_eq!(err.to_string(), "Invalid quantity '12Q': unknown suffix");
}

#[test]
fn test_io_error_conversion() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
    let err: DiagError = io.into();
    assert!(matches!(err, DiagError::Io(_)));
    assert!(err.source().is_some());
}

#[test]
fn test_serde_errors_convert() {
    let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    assert!(matches!(DiagError::from(json_err), DiagError::Serialization(_)));

    let toml_err = toml::from_str::<toml::Value>("= nope").unwrap_err();
    assert!(matches!(DiagError::from(toml_err), DiagError::Config(_)));
}

#[test]
fn test_quantity_parse_error_variant() {
    let err = dscdiag::debug::quantity::ParsedQuantity::parse("12Q").unwrap_err();
    assert!(matches!(err, DiagError::InvalidQuantity { .. }));
}
