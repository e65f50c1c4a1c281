// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Test Fixtures
//!
//! Descriptors, a recording logger and a session wired to [`MockTransport`].

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

use netclient_core::{
    CatalogEntry, Connectivity, ConnectivityFlag, DownloadDescriptor, ErrorCatalog, HeaderFields, HeaderKey,
    HeaderValue, HttpMethod, LogPrivacy, LoggerError, MockTransport, MultipartDescriptor,
    MultipartPart, NetworkError, NetworkLogger, NetworkSession, RequestDescriptor, SessionConfig,
    Severity, StaticTrustEvaluator, TransportSession, UploadDescriptor, UploadSource,
};

pub const BASE_URL: &str = "https://api.example.com/v1";

/// Plain JSON call.
#[derive(Debug, Clone)]
pub struct ApiCall {
    pub base: String,
    pub path: String,
    pub method: HttpMethod,
    pub body: Option<serde_json::Value>,
    pub clear_cache: bool,
}

impl ApiCall {
    pub fn get(path: &str) -> Self {
        ApiCall {
            base: BASE_URL.to_string(),
            path: path.to_string(),
            method: HttpMethod::Get,
            body: None,
            clear_cache: false,
        }
    }

    pub fn post(path: &str, body: serde_json::Value) -> Self {
        ApiCall {
            method: HttpMethod::Post,
            body: Some(body),
            ..ApiCall::get(path)
        }
    }

    pub fn with_base(mut self, base: &str) -> Self {
        self.base = base.to_string();
        self
    }

    pub fn clearing_cache(mut self) -> Self {
        self.clear_cache = true;
        self
    }

    pub fn url(&self) -> String {
        format!("{}{}", self.base, self.path)
    }
}

impl RequestDescriptor for ApiCall {
    fn base_url(&self) -> String {
        self.base.clone()
    }

    fn path(&self) -> String {
        self.path.clone()
    }

    fn method(&self) -> HttpMethod {
        self.method
    }

    fn headers(&self) -> Option<HeaderFields> {
        Some(HeaderFields::new().with(HeaderKey::Accept, HeaderValue::Json))
    }

    fn body_parameters(&self) -> Option<serde_json::Value> {
        self.body.clone()
    }

    fn clear_cache(&self) -> bool {
        self.clear_cache
    }
}

/// Download into an optional destination.
#[derive(Debug, Clone)]
pub struct FileDownload {
    pub call: ApiCall,
    pub destination: Option<PathBuf>,
}

impl FileDownload {
    pub fn new(path: &str, destination: Option<PathBuf>) -> Self {
        FileDownload {
            call: ApiCall::get(path),
            destination,
        }
    }
}

impl RequestDescriptor for FileDownload {
    fn base_url(&self) -> String {
        self.call.base_url()
    }

    fn path(&self) -> String {
        self.call.path()
    }

    fn method(&self) -> HttpMethod {
        HttpMethod::Get
    }

    fn clear_cache(&self) -> bool {
        self.call.clear_cache
    }
}

impl DownloadDescriptor for FileDownload {
    fn destination(&self) -> Option<PathBuf> {
        self.destination.clone()
    }
}

/// Upload of raw bytes or a file.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub call: ApiCall,
    pub source: UploadSource,
}

impl FileUpload {
    pub fn bytes(path: &str, bytes: &[u8]) -> Self {
        FileUpload {
            call: ApiCall::post(path, serde_json::json!({"ignored": true})),
            source: UploadSource::Bytes(bytes.to_vec()),
        }
    }

    pub fn file(path: &str, file: PathBuf) -> Self {
        FileUpload {
            source: UploadSource::File(file),
            ..FileUpload::bytes(path, b"")
        }
    }
}

impl RequestDescriptor for FileUpload {
    fn base_url(&self) -> String {
        self.call.base_url()
    }

    fn path(&self) -> String {
        self.call.path()
    }

    fn method(&self) -> HttpMethod {
        HttpMethod::Post
    }

    fn body_parameters(&self) -> Option<serde_json::Value> {
        self.call.body_parameters()
    }
}

impl UploadDescriptor for FileUpload {
    fn upload_source(&self) -> UploadSource {
        self.source.clone()
    }
}

/// Avatar form with one text and one file part.
#[derive(Debug, Clone)]
pub struct AvatarForm;

impl RequestDescriptor for AvatarForm {
    fn base_url(&self) -> String {
        BASE_URL.to_string()
    }

    fn path(&self) -> String {
        "/avatar".to_string()
    }

    fn method(&self) -> HttpMethod {
        HttpMethod::Post
    }
}

impl MultipartDescriptor for AvatarForm {
    fn boundary(&self) -> String {
        "XyZ".to_string()
    }

    fn form_parts(&self) -> Vec<MultipartPart> {
        vec![
            MultipartPart::Text {
                name: "user".into(),
                value: "42".into(),
            },
            MultipartPart::Data {
                name: "avatar".into(),
                file_name: "a.png".into(),
                mime_type: "image/png".into(),
                data: vec![0x89, 0x50],
            },
        ]
    }
}

/// One captured logger call.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggedFailure {
    pub url: String,
    pub error: NetworkError,
    pub severity: Severity,
    pub privacy: LogPrivacy,
}

/// Logger sink that records every call.
#[derive(Default)]
pub struct RecordingLogger {
    entries: Mutex<Vec<LoggedFailure>>,
    fail: bool,
}

impl RecordingLogger {
    pub fn failing() -> Self {
        RecordingLogger {
            entries: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn entries(&self) -> Vec<LoggedFailure> {
        self.entries.lock().clone()
    }
}

impl NetworkLogger for RecordingLogger {
    fn log_request(
        &self,
        url: &str,
        error: &NetworkError,
        severity: Severity,
        privacy: LogPrivacy,
    ) -> Result<(), LoggerError> {
        self.entries.lock().push(LoggedFailure {
            url: url.to_string(),
            error: error.clone(),
            severity,
            privacy,
        });
        if self.fail {
            return Err(LoggerError::Write("disk full".into()));
        }
        Ok(())
    }
}

/// Catalog with entries for 401 and 404.
pub fn catalog() -> ErrorCatalog {
    ErrorCatalog::Loaded(vec![
        CatalogEntry {
            http_status_code: 401,
            title: "Unauthorized".into(),
            message: "Token rejected".into(),
            user_message: "Please sign in again".into(),
        },
        CatalogEntry {
            http_status_code: 404,
            title: "Not found".into(),
            message: "Resource missing".into(),
            user_message: "We could not find that".into(),
        },
    ])
}

/// Session on a mock transport plus its collaborators.
pub struct Harness {
    pub transport: Arc<MockTransport>,
    pub connectivity: Arc<ConnectivityFlag>,
    pub logger: Arc<RecordingLogger>,
    pub session: NetworkSession,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(SessionConfig::default())
    }

    pub fn with_config(config: SessionConfig) -> Self {
        let transport = Arc::new(MockTransport::new());
        let connectivity = Arc::new(ConnectivityFlag::new(true));
        let logger = Arc::new(RecordingLogger::default());
        let session = NetworkSession::with_trust_evaluator(
            Arc::clone(&transport) as Arc<dyn TransportSession>,
            config,
            catalog(),
            Arc::clone(&connectivity) as Arc<dyn Connectivity>,
            Some(Arc::clone(&logger) as Arc<dyn NetworkLogger>),
            Arc::new(StaticTrustEvaluator::trusting()),
        );
        Harness {
            transport,
            connectivity,
            logger,
            session,
        }
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
