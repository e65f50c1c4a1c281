// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Tests for error
//! Status mapping, catalog loading and transport failure normalization.

mod common;

use std::io::Write;

use common::fixtures::catalog;
use common::strategies::*;
use netclient_core::*;
use proptest::prelude::*;

proptest! {
    #[test]
    fn prop_success_status_maps_to_none(status in success_status_strategy()) {
        prop_assert!(NetworkError::from_http_status(status, &catalog()).is_none());
        prop_assert!(NetworkError::from_http_status(status, &ErrorCatalog::Unavailable).is_none());
    }

    #[test]
    fn prop_failure_status_always_maps(status in failure_status_strategy()) {
        prop_assert!(NetworkError::from_http_status(status, &catalog()).is_some());
        prop_assert!(NetworkError::from_http_status(status, &ErrorCatalog::Unavailable).is_some());
    }

    #[test]
    fn prop_transport_failure_keeps_native_code(code in transport_code_strategy(), url in url_strategy()) {
        let failure = TransportFailure::new(code, "boom").with_url(url.clone());
        let error = NetworkError::from_transport_failure(&failure);
        prop_assert_eq!(error.code.value(), code);
        prop_assert_eq!(&error.message, &ErrorMessage::Custom(url));
        prop_assert!(!error.is_cancellation());
    }
}

#[test]
fn test_catalog_entry_code_is_the_status() {
    let error = NetworkError::from_http_status(404, &catalog()).unwrap();

    assert_eq!(error.code.value(), 404);
    assert_eq!(error.title, ErrorTitle::Custom("Not found".into()));
    assert_eq!(error.message, ErrorMessage::Custom("Resource missing".into()));
    assert_eq!(error.user_message, "We could not find that");
}

#[test]
fn test_status_missing_from_catalog_is_json_error() {
    let error = NetworkError::from_http_status(503, &catalog()).unwrap();

    assert_eq!(error.code, ErrorCode::JsonError);
    assert_eq!(error.title, ErrorTitle::Json);
    assert!(error.message.value().contains("503"));
}

#[test]
fn test_unavailable_catalog_degrades_to_json_error() {
    let error = NetworkError::from_http_status(500, &ErrorCatalog::Unavailable).unwrap();

    assert_eq!(error.code, ErrorCode::JsonError);
    assert_eq!(error.message, ErrorMessage::CatalogUnavailable);
}

#[test]
fn test_malformed_catalog_carries_parse_reason() {
    let catalog = ErrorCatalog::from_json_slice(b"{not json");
    assert!(matches!(catalog, ErrorCatalog::Malformed(_)));

    let error = NetworkError::from_http_status(400, &catalog).unwrap();
    assert_eq!(error.code, ErrorCode::JsonError);
    assert!(error
        .message
        .value()
        .starts_with(ErrorMessage::CodableConversion.value()));
}

#[test]
fn test_catalog_loads_camel_case_records() {
    let json = br#"[{"httpStatusCode": 401, "title": "Unauthorized", "message": "Token rejected"}]"#;
    let catalog = ErrorCatalog::from_json_slice(json);

    let entry = catalog.lookup(401).unwrap();
    assert_eq!(entry.title, "Unauthorized");
    assert_eq!(entry.user_message, "");
    assert!(catalog.lookup(404).is_none());
}

#[test]
fn test_catalog_from_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(br#"[{"httpStatusCode": 418, "title": "Teapot", "message": "Short and stout", "userMessage": "Tip me over"}]"#)
        .unwrap();

    let catalog = ErrorCatalog::from_path(file.path());
    assert!(catalog.is_loaded());
    assert_eq!(catalog.lookup(418).unwrap().user_message, "Tip me over");
}

#[test]
fn test_missing_catalog_file_is_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = ErrorCatalog::from_path(&dir.path().join("errors.json"));
    assert_eq!(catalog, ErrorCatalog::Unavailable);
}

#[test]
fn test_catalog_title_matching_fixed_copy_is_not_custom() {
    let entry = CatalogEntry {
        http_status_code: 502,
        title: "Api error".into(),
        message: "Upstream failed".into(),
        user_message: String::new(),
    };
    assert_eq!(entry.to_error().title, ErrorTitle::Api);
}

#[test]
fn test_cancelled_transport_failure_is_cancellation() {
    let error = NetworkError::from_transport_failure(&TransportFailure::cancelled());

    assert!(error.is_cancellation());
    assert_eq!(error.title, ErrorTitle::Cancelled);
    assert_eq!(error, NetworkError::from_transport_failure(&TransportFailure::cancelled()));
}

#[test]
fn test_transport_failure_title_is_domain() {
    let failure = TransportFailure::new(TransportFailure::TIMED_OUT, "timed out").with_domain("reqwest");
    let error = NetworkError::from_transport_failure(&failure);

    assert_eq!(error.title, ErrorTitle::Custom("reqwest".into()));
    assert_eq!(error.user_message, "timed out");
    assert_eq!(error.message, ErrorMessage::Custom(String::new()));
}

#[test]
fn test_task_failure_is_direction_specific() {
    let failure = TransportFailure::new(TransportFailure::CONNECTION_LOST, "lost")
        .with_url("https://files.example.com/a.bin");

    let download = NetworkError::from_task_failure(Direction::Download, &failure);
    assert_eq!(download.code, ErrorCode::Download);
    assert_eq!(download.title, ErrorTitle::Download);
    assert!(download.message.value().contains("https://files.example.com/a.bin"));

    let upload = NetworkError::from_task_failure(Direction::Upload, &failure);
    assert_eq!(upload.code, ErrorCode::Upload);
    assert_eq!(upload.title, ErrorTitle::Upload);
}

#[test]
fn test_decode_error_names_the_field() {
    #[derive(Debug, serde::Deserialize)]
    #[allow(dead_code)]
    struct Item {
        id: u64,
    }

    let decode = serde_json::from_slice::<Item>(br#"{"id": "seven"}"#).unwrap_err();
    let error = NetworkError::from_decode_error(&decode);

    assert_eq!(error.code, ErrorCode::JsonError);
    assert!(error.message.value().contains("line 1"));
}

#[test]
fn test_error_code_equality_uses_value() {
    assert_eq!(ErrorCode::Custom(-1), ErrorCode::NoInternet);
    assert_eq!(ErrorCode::from_value(-222), ErrorCode::Download);
    assert_eq!(ErrorCode::from_value(404), ErrorCode::Custom(404));
}

#[test]
fn test_error_serializes_with_camel_case_fields() {
    let error = NetworkError::no_connectivity();
    let json = serde_json::to_value(&error).unwrap();

    assert_eq!(json["code"], -1);
    assert_eq!(json["title"], "No internet");
    assert_eq!(json["userMessage"], "");

    let back: NetworkError = serde_json::from_value(json).unwrap();
    assert_eq!(back, error);
}
