// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Tests for logger
//! Privacy levels and the tracing-backed sink.

use netclient_core::*;

#[test]
fn test_hashed_is_sha256_hex() {
    assert_eq!(
        LogPrivacy::Hashed.redact("https://api.example.com/v1"),
        "53aee2ca762b9729196afeefd22bd5abdcbdf87a0f29cc0dd2f6902a22e73e4f"
    );
}

#[test]
fn test_encapsulated_hides_details() {
    assert_eq!(LogPrivacy::Encapsulated.redact("secret"), "<private>");
    assert_eq!(LogPrivacy::Open.redact("secret"), "secret");
}

#[test]
fn test_tracing_logger_accepts_every_severity() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();

    let error = NetworkError::malformed_url();
    for severity in [Severity::Debug, Severity::Info, Severity::Warning, Severity::Error] {
        assert!(TracingLogger
            .log_request("https://api.example.com", &error, severity, LogPrivacy::Hashed)
            .is_ok());
    }
}

#[test]
fn test_privacy_deserializes_snake_case() {
    let privacy: LogPrivacy = serde_json::from_str("\"encapsulated\"").unwrap();
    assert_eq!(privacy, LogPrivacy::Encapsulated);
}
