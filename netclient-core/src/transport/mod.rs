// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Transport Session
//!
//! Platform-agnostic abstraction over the networking stack: plain calls,
//! downloads, uploads, WebSockets, and task enumeration/control.
//!
//! Long-running tasks report back through the [`SessionDelegate`] callback
//! contract; transports deliver those callbacks on their own threads. Tasks
//! are created suspended so the caller can register interest before the
//! first callback can fire, then started with [`TransportSession::resume`].

#[cfg(feature = "http-transport")]
pub mod http;
mod mock;
#[cfg(feature = "http-transport")]
mod socket;
#[cfg(feature = "http-transport")]
pub mod tls;

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::descriptor::{HttpMethod, UploadSource};
use crate::pinning::ServerTrust;

pub use mock::{MockSocket, MockTransport};

/// Identity of one in-flight transport task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// Transfer direction of a long-running task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Upload,
    Download,
}

/// What a task does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Data,
    Upload,
    Download,
    WebSocket,
}

impl TaskKind {
    /// Transfer direction, for upload and download tasks.
    pub fn direction(&self) -> Option<Direction> {
        match self {
            TaskKind::Upload => Some(Direction::Upload),
            TaskKind::Download => Some(Direction::Download),
            TaskKind::Data | TaskKind::WebSocket => None,
        }
    }
}

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    Running,
    Suspended,
    Completed,
    Canceled,
}

/// Snapshot of one task as seen by the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskInfo {
    pub id: TaskId,
    pub kind: TaskKind,
    pub state: TaskState,
    /// Request the task was created from.
    pub original_request: TransportRequest,
}

/// Transport-neutral request built from a descriptor.
///
/// Two tasks belong to "the same request" when their original requests
/// compare equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
    pub url: String,
    pub method: HttpMethod,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl TransportRequest {
    pub fn new(url: impl Into<String>, method: HttpMethod) -> Self {
        TransportRequest {
            url: url.into(),
            method,
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(url, HttpMethod::Get)
    }

    /// Sets a header, replacing any existing value (case-insensitive name).
    pub fn set_header(&mut self, name: &str, value: &str) {
        self.headers
            .retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.to_string()));
    }

    /// Returns a header value (case-insensitive name).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Response of a plain call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        TransportResponse {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }
}

/// Opaque token that lets the transport continue a failed download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeData(Vec<u8>);

impl ResumeData {
    pub fn new(bytes: Vec<u8>) -> Self {
        ResumeData(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Native failure representation of a transport.
///
/// Never crosses the crate boundary: it is always mapped to a
/// [`crate::NetworkError`] by the error taxonomy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportFailure {
    /// Stable native failure code.
    pub code: i64,
    /// Originating domain.
    pub domain: String,
    /// Human description.
    pub description: String,
    pub failing_url: Option<String>,
    /// Attached by transports that can continue a failed download.
    pub resume_data: Option<ResumeData>,
}

impl TransportFailure {
    /// Domain of failures raised by the bundled transports.
    pub const DOMAIN: &'static str = "netclient.transport";

    pub const CANCELLED: i64 = -999;
    pub const BAD_URL: i64 = -1000;
    pub const TIMED_OUT: i64 = -1001;
    pub const CANNOT_CONNECT: i64 = -1004;
    pub const CONNECTION_LOST: i64 = -1005;
    pub const BAD_SERVER_RESPONSE: i64 = -1011;
    pub const SECURE_CONNECTION_FAILED: i64 = -1200;
    pub const SOCKET_CLOSED: i64 = -1300;
    pub const FILE_IO: i64 = -3000;

    pub fn new(code: i64, description: impl Into<String>) -> Self {
        TransportFailure {
            code,
            domain: Self::DOMAIN.to_string(),
            description: description.into(),
            failing_url: None,
            resume_data: None,
        }
    }

    pub fn cancelled() -> Self {
        Self::new(Self::CANCELLED, "cancelled")
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.failing_url = Some(url.into());
        self
    }

    pub fn with_resume_data(mut self, resume_data: ResumeData) -> Self {
        self.resume_data = Some(resume_data);
        self
    }

    pub fn is_cancellation(&self) -> bool {
        self.code == Self::CANCELLED
    }
}

impl fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.domain, self.code, self.description)
    }
}

/// Kind of authentication a challenge asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMethod {
    ServerTrust,
    ClientCertificate,
    HttpBasic,
    Other(String),
}

/// Authentication challenge raised during connection setup.
#[derive(Debug, Clone)]
pub struct AuthChallenge {
    pub method: AuthMethod,
    pub host: String,
    /// Presented chain, for server-trust challenges.
    pub trust: Option<ServerTrust>,
}

impl AuthChallenge {
    pub fn server_trust(trust: ServerTrust) -> Self {
        AuthChallenge {
            method: AuthMethod::ServerTrust,
            host: trust.host.clone(),
            trust: Some(trust),
        }
    }
}

/// Decision returned for a challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeDisposition {
    UseCredential,
    CancelChallenge,
    PerformDefaultHandling,
}

/// Receives the challenge decision. Called exactly once.
pub type ChallengeCompletion = Box<dyn FnOnce(ChallengeDisposition) + Send + 'static>;

/// Application message on a WebSocket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketMessage {
    Text(String),
    Binary(Vec<u8>),
}

/// One inbound WebSocket delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    Message(SocketMessage),
    /// Frame type the transport cannot express as a [`SocketMessage`].
    Unrecognized(String),
}

/// WebSocket close status codes (RFC 6455 §7.4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseCode {
    Normal,
    GoingAway,
    ProtocolError,
    UnsupportedData,
    NoStatusReceived,
    Abnormal,
    InvalidPayload,
    PolicyViolation,
    MessageTooBig,
    MandatoryExtension,
    InternalServerError,
    TlsHandshakeFailure,
    Other(u16),
}

impl CloseCode {
    pub fn value(&self) -> u16 {
        match self {
            CloseCode::Normal => 1000,
            CloseCode::GoingAway => 1001,
            CloseCode::ProtocolError => 1002,
            CloseCode::UnsupportedData => 1003,
            CloseCode::NoStatusReceived => 1005,
            CloseCode::Abnormal => 1006,
            CloseCode::InvalidPayload => 1007,
            CloseCode::PolicyViolation => 1008,
            CloseCode::MessageTooBig => 1009,
            CloseCode::MandatoryExtension => 1010,
            CloseCode::InternalServerError => 1011,
            CloseCode::TlsHandshakeFailure => 1015,
            CloseCode::Other(code) => *code,
        }
    }

    pub fn from_value(value: u16) -> Self {
        match value {
            1000 => CloseCode::Normal,
            1001 => CloseCode::GoingAway,
            1002 => CloseCode::ProtocolError,
            1003 => CloseCode::UnsupportedData,
            1005 => CloseCode::NoStatusReceived,
            1006 => CloseCode::Abnormal,
            1007 => CloseCode::InvalidPayload,
            1008 => CloseCode::PolicyViolation,
            1009 => CloseCode::MessageTooBig,
            1010 => CloseCode::MandatoryExtension,
            1011 => CloseCode::InternalServerError,
            1015 => CloseCode::TlsHandshakeFailure,
            other => CloseCode::Other(other),
        }
    }
}

/// An open WebSocket task.
///
/// `receive` delivers exactly one frame per call; callers re-arm it.
#[async_trait]
pub trait WebSocketTask: Send + Sync {
    fn id(&self) -> TaskId;

    async fn send(&self, message: SocketMessage) -> Result<(), TransportFailure>;

    async fn receive(&self) -> Result<InboundFrame, TransportFailure>;

    async fn close(&self, code: CloseCode, reason: Option<String>);
}

/// Callback contract a transport drives for long-running tasks.
///
/// Callbacks for one task arrive in order; callbacks for different tasks
/// may interleave and may arrive on any thread.
pub trait SessionDelegate: Send + Sync {
    /// TLS or HTTP authentication challenge. `completion` must be called
    /// exactly once and implementations must not block the caller.
    fn did_receive_challenge(&self, challenge: AuthChallenge, completion: ChallengeCompletion);

    /// Download byte progress. `total_expected` is `None` when unknown.
    fn did_write_data(
        &self,
        session: &dyn TransportSession,
        task: &TaskInfo,
        total_written: u64,
        total_expected: Option<u64>,
    );

    /// Download body fully written to a temporary `location`.
    fn did_finish_downloading(&self, session: &dyn TransportSession, task: &TaskInfo, location: &Path);

    /// Upload byte progress. `total_expected` is `None` when unknown.
    fn did_send_body_data(
        &self,
        session: &dyn TransportSession,
        task: &TaskInfo,
        total_sent: u64,
        total_expected: Option<u64>,
    );

    /// Response head received for an upload or download task.
    fn did_receive_response(&self, session: &dyn TransportSession, task: &TaskInfo, status: u16);

    /// Response body bytes of an upload task.
    fn did_receive_data(&self, session: &dyn TransportSession, task: &TaskInfo, data: &[u8]);

    /// Final callback of every upload/download task.
    fn did_complete(
        &self,
        session: &dyn TransportSession,
        task: &TaskInfo,
        failure: Option<TransportFailure>,
    );

    fn websocket_did_open(&self, task: &TaskInfo, protocol: Option<&str>);

    fn websocket_did_close(&self, task: &TaskInfo, code: CloseCode, reason: Option<&str>);

    /// All queued background events delivered.
    fn did_finish_events(&self);
}

/// Transport session trait.
///
/// Abstracts the host's networking stack so the core can run over the
/// production adapter or a test double.
#[async_trait]
pub trait TransportSession: Send + Sync {
    /// Installs the callback receiver. Called once at session construction.
    fn attach(&self, delegate: Arc<dyn SessionDelegate>);

    /// Performs a plain call and returns the full response.
    async fn data(&self, request: TransportRequest) -> Result<TransportResponse, TransportFailure>;

    /// Creates a suspended download task.
    fn download_task(&self, request: TransportRequest) -> TaskId;

    /// Creates a suspended download task continuing from `resume_data`.
    fn resume_download(&self, resume_data: ResumeData) -> Result<TaskId, TransportFailure>;

    /// Releases whatever `resume_data` keeps alive; it will not be resumed.
    fn discard_resume_data(&self, resume_data: &ResumeData);

    /// Creates a suspended upload task.
    fn upload_task(&self, request: TransportRequest, source: UploadSource) -> TaskId;

    /// Opens a WebSocket task.
    async fn websocket_task(
        &self,
        request: TransportRequest,
    ) -> Result<Arc<dyn WebSocketTask>, TransportFailure>;

    /// Enumerates all tasks the session knows about.
    fn tasks(&self) -> Vec<TaskInfo>;

    /// Starts a new task or continues a suspended one.
    fn resume(&self, id: TaskId);

    fn suspend(&self, id: TaskId);

    /// Cancels a task; the task completes with a cancellation failure.
    fn cancel(&self, id: TaskId);

    /// Cancels every task and stops accepting new ones.
    fn invalidate_and_cancel(&self);

    /// Drops any cached response for `request`.
    fn remove_cached_response(&self, request: &TransportRequest);
}
