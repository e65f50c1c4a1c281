// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Tests for coordinator
//! Upload and download task creation.

mod common;

use common::fixtures::{AvatarForm, FileDownload, FileUpload, Harness};
use netclient_core::*;

#[tokio::test]
async fn test_upload_bytes_creates_running_task_without_request_body() {
    let harness = Harness::new();

    let stream = harness.session.upload(&FileUpload::bytes("/files", b"payload"));
    let id = stream.task_id().unwrap();

    let task = harness.transport.task(id).unwrap();
    assert_eq!(task.kind, TaskKind::Upload);
    assert_eq!(task.state, TaskState::Running);
    assert_eq!(task.original_request.body, None);
    assert_eq!(
        harness.transport.upload_source(id),
        Some(UploadSource::Bytes(b"payload".to_vec()))
    );
}

#[tokio::test]
async fn test_upload_file_source_is_passed_through() {
    let harness = Harness::new();
    let file = tempfile::NamedTempFile::new().unwrap();

    let stream = harness
        .session
        .upload(&FileUpload::file("/files", file.path().to_path_buf()));
    let id = stream.task_id().unwrap();

    assert_eq!(
        harness.transport.upload_source(id),
        Some(UploadSource::File(file.path().to_path_buf()))
    );
}

#[tokio::test]
async fn test_missing_upload_file_fails_without_task() {
    let harness = Harness::new();
    let dir = tempfile::tempdir().unwrap();

    let stream = harness
        .session
        .upload(&FileUpload::file("/files", dir.path().join("absent.bin")));

    assert_eq!(stream.task_id(), None);
    let error = stream.completion().await.unwrap_err();
    assert_eq!(error.code, ErrorCode::Upload);
    assert!(harness.transport.tasks().is_empty());
    assert_eq!(harness.logger.entries().len(), 1);
}

#[tokio::test]
async fn test_no_connectivity_fails_upload_before_file_check() {
    let harness = Harness::new();
    harness.connectivity.set(false);
    let dir = tempfile::tempdir().unwrap();

    let stream = harness
        .session
        .upload(&FileUpload::file("/files", dir.path().join("absent.bin")));

    assert_eq!(stream.completion().await.unwrap_err(), NetworkError::no_connectivity());
}

#[tokio::test]
async fn test_multipart_upload_sets_content_type_and_body() {
    let harness = Harness::new();

    let stream = harness.session.upload_multipart(&AvatarForm);
    let id = stream.task_id().unwrap();

    let task = harness.transport.task(id).unwrap();
    assert_eq!(
        task.original_request.header("content-type"),
        Some("multipart/form-data; boundary=XyZ")
    );
    let Some(UploadSource::Bytes(body)) = harness.transport.upload_source(id) else {
        panic!("multipart body should be uploaded from memory");
    };
    assert_eq!(body, AvatarForm.form_body());
    assert!(body.ends_with(b"--XyZ--\r\n"));
}

#[tokio::test]
async fn test_download_creates_running_download_task() {
    let harness = Harness::new();

    let stream = harness.session.download(&FileDownload::new("/report", None));
    let id = stream.task_id().unwrap();

    let task = harness.transport.task(id).unwrap();
    assert_eq!(task.kind, TaskKind::Download);
    assert_eq!(task.state, TaskState::Running);
    assert!(harness.transport.purged_requests().is_empty());
}

#[tokio::test]
async fn test_download_clear_cache_purges() {
    let harness = Harness::new();
    let mut download = FileDownload::new("/report", None);
    download.call.clear_cache = true;

    let stream = harness.session.download(&download);
    let id = stream.task_id().unwrap();

    assert_eq!(
        harness.transport.purged_requests(),
        vec![harness.transport.task(id).unwrap().original_request]
    );
}

#[tokio::test]
async fn test_download_with_malformed_url_fails_without_task() {
    let harness = Harness::new();
    let mut download = FileDownload::new("/report", None);
    download.call.base = "not a url".into();

    let stream = harness.session.download(&download);

    assert_eq!(stream.completion().await.unwrap_err().code, ErrorCode::BadUrl);
    assert!(harness.transport.tasks().is_empty());
}
