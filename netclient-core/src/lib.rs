// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Netclient Core Library
//!
//! Client-side network session layer. Executes HTTP requests, uploads,
//! downloads and WebSocket sessions over a pluggable transport, enforces
//! TLS trust through certificate or public-key pinning, and normalizes
//! every transport failure into a single [`NetworkError`].
//!
//! # Architecture
//!
//! - **Error taxonomy**: the only place error codes and titles are assigned
//! - **Pinning validator**: certificate / public-key hash trust decisions
//! - **Transport**: object-safe session trait with a production adapter
//!   ([`HttpTransport`]) and a scriptable test double ([`MockTransport`])
//! - **Multiplexer**: turns transport callbacks into per-task streams
//! - **Executor**: descriptor → request → validated response
//! - **Coordinators / WebSocket channel**: transfer and socket surfaces
//! - **Session**: the façade tying them together

pub mod config;
pub mod connectivity;
pub mod coordinator;
pub mod descriptor;
pub mod error;
pub mod executor;
pub mod logger;
pub mod multiplexer;
pub mod pinning;
pub mod session;
pub mod stream;
pub mod transport;
pub mod websocket;

pub use config::{SessionConfig, SessionMode};
pub use connectivity::{Connectivity, ConnectivityFlag};
pub use coordinator::{DownloadCoordinator, UploadCoordinator};
pub use descriptor::{
    DownloadDescriptor, HeaderFields, HeaderKey, HeaderValue, HttpMethod, MultipartDescriptor,
    MultipartPart, RequestDescriptor, UploadDescriptor, UploadSource,
};
pub use error::{CatalogEntry, ErrorCatalog, ErrorCode, ErrorMessage, ErrorTitle, NetworkError};
pub use executor::RequestExecutor;
pub use logger::{LogPrivacy, LoggerError, NetworkLogger, Severity, TracingLogger};
pub use multiplexer::{SessionEvent, SessionEventMultiplexer};
pub use pinning::{
    CertificatePinningValidator, PinningPolicy, ServerTrust, StaticTrustEvaluator, TrustError,
    TrustEvaluator,
};
pub use session::NetworkSession;
pub use stream::{
    BatchStream, DownloadStream, ProgressEvent, SocketStream, TaskStream, TransferProgress,
    UploadStream,
};
pub use transport::{
    AuthChallenge, AuthMethod, ChallengeCompletion, ChallengeDisposition, CloseCode, Direction,
    InboundFrame, MockSocket, MockTransport, ResumeData, SessionDelegate, SocketMessage, TaskId, TaskInfo,
    TaskKind, TaskState, TransportFailure, TransportRequest, TransportResponse, TransportSession,
    WebSocketTask,
};
pub use websocket::WebSocketChannel;

#[cfg(feature = "http-transport")]
pub use transport::http::HttpTransport;
#[cfg(feature = "http-transport")]
pub use transport::tls::WebPkiTrustEvaluator;
