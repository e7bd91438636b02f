//! Redaction tests
//!
//! Coverage of every secret pattern, idempotence, and pass-through of
//! ordinary log lines.

use dscdiag::redact::{redact_sensitive_info, Redactor, REDACTED};

const CASES: &[(&str, &str)] = &[
    (
        "Authorization: Bearer abc.def.ghi",
        "Authorization: Bearer [REDACTED]",
    ),
    ("authorization: bearer xyz", "authorization: bearer [REDACTED]"),
    ("password=hunter2", "password=[REDACTED]"),
    ("Password: hunter2 next", "Password: [REDACTED] next"),
    ("token=abc123&x=1", "token=[REDACTED]&x=1"),
    ("TOKEN: 'quoted'", "TOKEN: '[REDACTED]'"),
    ("secret=s", "secret=[REDACTED]"),
    ("client_secret=s3", "client_secret=[REDACTED]"),
    ("apikey=k", "apikey=[REDACTED]"),
    ("api_key: k", "api_key: [REDACTED]"),
    ("API-KEY=k", "API-KEY=[REDACTED]"),
    ("api key k", "api key [REDACTED]"),
    ("accesskey=AKIA", "accesskey=[REDACTED]"),
    ("access_key=AKIA", "access_key=[REDACTED]"),
    ("Access-Key: AKIA", "Access-Key: [REDACTED]"),
    (
        r#"{"token": "t0k3n"}"#,
        r#"{"token": "[REDACTED]"}"#,
    ),
];

#[test]
fn test_every_pattern_redacts_value() {
    for (input, expected) in CASES {
        assert_eq!(redact_sensitive_info(input), *expected, "input: {input}");
    }
}

#[test]
fn test_redaction_is_idempotent() {
    let inputs = CASES
        .iter()
        .map(|(input, _)| *input)
        .chain([
            "password=a token=b secret=c api_key=d access_key=e",
            "Authorization: Bearer t password: p",
            "nothing to see here",
            "",
        ]);

    for input in inputs {
        let once = redact_sensitive_info(input);
        let twice = redact_sensitive_info(&once);
        assert_eq!(once, twice, "input: {input}");
    }
}

#[test]
fn test_multiline_log_keeps_other_lines() {
    let log = "starting manager\npassword=hunter2\nreconciled dsc";
    assert_eq!(
        redact_sensitive_info(log),
        "starting manager\npassword=[REDACTED]\nreconciled dsc"
    );
}

#[test]
fn test_ordinary_lines_unchanged() {
    for line in [
        "INFO controller-runtime.metrics Starting metrics server",
        "component dashboard is Ready",
        "observed generation 3",
    ] {
        assert_eq!(redact_sensitive_info(line), line);
    }
}

#[test]
fn test_redacted_value_never_survives() {
    let out = Redactor::new().redact("password=supersecretvalue");
    assert!(!out.contains("supersecretvalue"));
    assert!(out.contains(REDACTED));
}
