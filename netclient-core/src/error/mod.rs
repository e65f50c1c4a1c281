// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Error Taxonomy
//!
//! Closed set of error kinds and their human copy. Every failure that
//! crosses the crate boundary is a [`NetworkError`] built by one of the
//! constructors in this module; no other module assigns codes or titles.

mod catalog;

use std::fmt;
use std::hash::{Hash, Hasher};
use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::transport::{Direction, TransportFailure};

pub use catalog::{CatalogEntry, CatalogError, ErrorCatalog};

/// Numeric error code.
///
/// Equality and hashing use [`ErrorCode::value`], so an HTTP status can be
/// matched against `code.value()` regardless of which variant carries it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum ErrorCode {
    /// Unclassified failure.
    Unknown,
    /// No network connectivity.
    NoInternet,
    /// Request URL could not be constructed.
    BadUrl,
    /// JSON encoding/decoding or error catalog failure.
    JsonError,
    /// Error reported by the API.
    Api,
    /// Download task failure.
    Download,
    /// Upload task failure.
    Upload,
    /// Any other code (HTTP status, native transport code).
    Custom(i64),
}

impl ErrorCode {
    /// Returns the numeric value of the code.
    pub fn value(&self) -> i64 {
        match self {
            ErrorCode::Unknown => 0,
            ErrorCode::NoInternet => -1,
            ErrorCode::BadUrl => -2,
            ErrorCode::JsonError => -3,
            ErrorCode::Api => -111,
            ErrorCode::Download => -222,
            ErrorCode::Upload => -333,
            ErrorCode::Custom(code) => *code,
        }
    }

    /// Maps a numeric value back to its named kind, or `Custom`.
    pub fn from_value(value: i64) -> Self {
        match value {
            0 => ErrorCode::Unknown,
            -1 => ErrorCode::NoInternet,
            -2 => ErrorCode::BadUrl,
            -3 => ErrorCode::JsonError,
            -111 => ErrorCode::Api,
            -222 => ErrorCode::Download,
            -333 => ErrorCode::Upload,
            other => ErrorCode::Custom(other),
        }
    }
}

impl PartialEq for ErrorCode {
    fn eq(&self, other: &Self) -> bool {
        self.value() == other.value()
    }
}

impl Eq for ErrorCode {}

impl Hash for ErrorCode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value().hash(state);
    }
}

impl From<i64> for ErrorCode {
    fn from(value: i64) -> Self {
        ErrorCode::from_value(value)
    }
}

impl From<ErrorCode> for i64 {
    fn from(code: ErrorCode) -> Self {
        code.value()
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// Short diagnostic title of an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ErrorTitle {
    NoInternet,
    BadUrl,
    Unknown,
    Api,
    HttpResponse,
    Json,
    Download,
    DownloadToLocation,
    Upload,
    Delegate,
    Socket,
    Cancelled,
    Custom(String),
}

impl ErrorTitle {
    const FIXED: [ErrorTitle; 12] = [
        ErrorTitle::NoInternet,
        ErrorTitle::BadUrl,
        ErrorTitle::Unknown,
        ErrorTitle::Api,
        ErrorTitle::HttpResponse,
        ErrorTitle::Json,
        ErrorTitle::Download,
        ErrorTitle::DownloadToLocation,
        ErrorTitle::Upload,
        ErrorTitle::Delegate,
        ErrorTitle::Socket,
        ErrorTitle::Cancelled,
    ];

    /// Returns the title copy.
    pub fn value(&self) -> &str {
        match self {
            ErrorTitle::NoInternet => "No internet",
            ErrorTitle::BadUrl => "Bad request constructed",
            ErrorTitle::Unknown => "Unknown",
            ErrorTitle::Api => "Api error",
            ErrorTitle::HttpResponse => "HTTP response error",
            ErrorTitle::Json => "Json or codable error",
            ErrorTitle::Download => "Api download error",
            ErrorTitle::DownloadToLocation => "Download to location",
            ErrorTitle::Upload => "Api upload error",
            ErrorTitle::Delegate => "Session delegate error",
            ErrorTitle::Socket => "Websocket error",
            ErrorTitle::Cancelled => "Cancelled",
            ErrorTitle::Custom(title) => title,
        }
    }
}

impl From<String> for ErrorTitle {
    fn from(value: String) -> Self {
        ErrorTitle::FIXED
            .into_iter()
            .find(|title| title.value() == value)
            .unwrap_or(ErrorTitle::Custom(value))
    }
}

impl From<ErrorTitle> for String {
    fn from(title: ErrorTitle) -> Self {
        title.value().to_string()
    }
}

impl fmt::Display for ErrorTitle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.value())
    }
}

/// Diagnostic message of an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ErrorMessage {
    NoInternet,
    BadUrl,
    Unknown,
    CodableConversion,
    CatalogUnavailable,
    Custom(String),
}

impl ErrorMessage {
    const FIXED: [ErrorMessage; 5] = [
        ErrorMessage::NoInternet,
        ErrorMessage::BadUrl,
        ErrorMessage::Unknown,
        ErrorMessage::CodableConversion,
        ErrorMessage::CatalogUnavailable,
    ];

    /// Returns the message copy.
    pub fn value(&self) -> &str {
        match self {
            ErrorMessage::NoInternet => {
                "The network is not reachable, please check the connection and try again"
            }
            ErrorMessage::BadUrl => {
                "Something wrong with the url that has been constructed, please check and try again"
            }
            ErrorMessage::Unknown => {
                "An unknown error occurred while processing request, please check and try again."
            }
            ErrorMessage::CodableConversion => "Issue in converting the error catalog via codable model.",
            ErrorMessage::CatalogUnavailable => "The error catalog is not available.",
            ErrorMessage::Custom(message) => message,
        }
    }
}

impl From<String> for ErrorMessage {
    fn from(value: String) -> Self {
        ErrorMessage::FIXED
            .into_iter()
            .find(|message| message.value() == value)
            .unwrap_or(ErrorMessage::Custom(value))
    }
}

impl From<ErrorMessage> for String {
    fn from(message: ErrorMessage) -> Self {
        message.value().to_string()
    }
}

impl fmt::Display for ErrorMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.value())
    }
}

/// The single error type surfaced by every operation.
///
/// Constructed at the point of failure and never mutated afterwards.
/// Only `user_message` is meant for display; `title` and `message` are
/// diagnostic.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{title} ({code}): {message}")]
#[serde(rename_all = "camelCase")]
pub struct NetworkError {
    pub title: ErrorTitle,
    pub code: ErrorCode,
    pub message: ErrorMessage,
    pub user_message: String,
}

impl NetworkError {
    pub fn new(
        title: ErrorTitle,
        code: ErrorCode,
        message: ErrorMessage,
        user_message: impl Into<String>,
    ) -> Self {
        NetworkError {
            title,
            code,
            message,
            user_message: user_message.into(),
        }
    }

    /// Connectivity precondition failed before any transport work.
    pub fn no_connectivity() -> Self {
        NetworkError::new(
            ErrorTitle::NoInternet,
            ErrorCode::NoInternet,
            ErrorMessage::NoInternet,
            "",
        )
    }

    /// The descriptor did not produce a usable URL.
    pub fn malformed_url() -> Self {
        NetworkError::new(ErrorTitle::BadUrl, ErrorCode::BadUrl, ErrorMessage::BadUrl, "")
    }

    /// The transport returned no usable response.
    pub fn unknown_response() -> Self {
        NetworkError::new(
            ErrorTitle::HttpResponse,
            ErrorCode::Unknown,
            ErrorMessage::Custom(String::new()),
            ErrorMessage::Unknown.value(),
        )
    }

    /// The task was cancelled locally (per-request or session-wide).
    pub fn cancelled() -> Self {
        NetworkError::new(
            ErrorTitle::Cancelled,
            ErrorCode::Custom(TransportFailure::CANCELLED),
            ErrorMessage::Custom("The task was cancelled".into()),
            "",
        )
    }

    /// Maps an HTTP status to an error, `None` for 2xx.
    pub fn from_http_status(status: u16, catalog: &ErrorCatalog) -> Option<Self> {
        if (200..=299).contains(&status) {
            return None;
        }

        match catalog {
            ErrorCatalog::Unavailable => Some(NetworkError::new(
                ErrorTitle::Json,
                ErrorCode::JsonError,
                ErrorMessage::CatalogUnavailable,
                "",
            )),
            ErrorCatalog::Malformed(reason) => Some(NetworkError::new(
                ErrorTitle::Json,
                ErrorCode::JsonError,
                ErrorMessage::Custom(format!(
                    "{} {}",
                    ErrorMessage::CodableConversion.value(),
                    reason
                )),
                "",
            )),
            ErrorCatalog::Loaded(_) => Some(match catalog.lookup(status) {
                Some(entry) => entry.to_error(),
                None => NetworkError::new(
                    ErrorTitle::Json,
                    ErrorCode::JsonError,
                    ErrorMessage::Custom(format!(
                        "{} No entry for HTTP status {}.",
                        ErrorMessage::CodableConversion.value(),
                        status
                    )),
                    "",
                ),
            }),
        }
    }

    /// Maps a native transport failure. Total: never fails, never `None`.
    pub fn from_transport_failure(failure: &TransportFailure) -> Self {
        let message = failure
            .failing_url
            .clone()
            .map(ErrorMessage::Custom)
            .unwrap_or_else(|| ErrorMessage::Custom(String::new()));
        let title = if failure.is_cancellation() {
            ErrorTitle::Cancelled
        } else {
            ErrorTitle::Custom(failure.domain.clone())
        };

        NetworkError::new(
            title,
            ErrorCode::Custom(failure.code),
            message,
            failure.description.clone(),
        )
    }

    /// Direction-specific failure of a long-running transfer task.
    pub fn from_task_failure(direction: Direction, failure: &TransportFailure) -> Self {
        let (title, code) = match direction {
            Direction::Download => (ErrorTitle::Download, ErrorCode::Download),
            Direction::Upload => (ErrorTitle::Upload, ErrorCode::Upload),
        };
        let target = failure.failing_url.as_deref().unwrap_or("<unknown url>");

        NetworkError::new(
            title,
            code,
            ErrorMessage::Custom(format!(
                "{} {} ({}) for {}",
                failure.domain, failure.code, failure.description, target
            )),
            failure.description.clone(),
        )
    }

    /// Response body could not be decoded into the requested shape.
    ///
    /// The serde message names the offending field and its position.
    pub fn from_decode_error(error: &serde_json::Error) -> Self {
        NetworkError::new(
            ErrorTitle::Json,
            ErrorCode::JsonError,
            ErrorMessage::Custom(error.to_string()),
            "",
        )
    }

    /// Request body could not be serialized.
    pub fn from_encode_error(error: &serde_json::Error) -> Self {
        NetworkError::new(
            ErrorTitle::Json,
            ErrorCode::JsonError,
            ErrorMessage::Custom(error.to_string()),
            "",
        )
    }

    /// Moving a finished download into its destination failed.
    pub fn from_filesystem_error(error: &io::Error) -> Self {
        NetworkError::new(
            ErrorTitle::DownloadToLocation,
            ErrorCode::Download,
            ErrorMessage::Custom(error.to_string()),
            "Failed to save the download to the given location",
        )
    }

    /// Reading an upload source file failed before the transfer started.
    pub fn from_upload_source_error(error: &io::Error) -> Self {
        NetworkError::new(
            ErrorTitle::Upload,
            ErrorCode::Upload,
            ErrorMessage::Custom(error.to_string()),
            "Failed to read the file to upload",
        )
    }

    /// A transfer finished without the payload the transport promised.
    pub fn incomplete_transfer(direction: Direction) -> Self {
        let (title, code) = match direction {
            Direction::Download => (ErrorTitle::Download, ErrorCode::Download),
            Direction::Upload => (ErrorTitle::Upload, ErrorCode::Upload),
        };
        NetworkError::new(
            title,
            code,
            ErrorMessage::Custom("Task completed without delivering a payload".into()),
            ErrorMessage::Unknown.value(),
        )
    }

    /// WebSocket failure that did not come from the transport.
    pub fn socket(message: impl Into<String>) -> Self {
        NetworkError::new(
            ErrorTitle::Socket,
            ErrorCode::Unknown,
            ErrorMessage::Custom(message.into()),
            ErrorMessage::Unknown.value(),
        )
    }

    /// Inbound frame type the socket layer does not understand.
    pub fn unknown() -> Self {
        NetworkError::new(
            ErrorTitle::Unknown,
            ErrorCode::Unknown,
            ErrorMessage::Custom(String::new()),
            ErrorMessage::Unknown.value(),
        )
    }

    /// True if this error stands for a local cancellation.
    pub fn is_cancellation(&self) -> bool {
        self.code.value() == TransportFailure::CANCELLED
    }
}

// INLINE_TEST_REQUIRED: Tests private FIXED copy tables
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_titles_round_trip_through_strings() {
        for title in ErrorTitle::FIXED {
            let text: String = title.clone().into();
            assert_eq!(ErrorTitle::from(text), title);
        }
    }

    #[test]
    fn test_fixed_messages_round_trip_through_strings() {
        for message in ErrorMessage::FIXED {
            let text: String = message.clone().into();
            assert_eq!(ErrorMessage::from(text), message);
        }
    }

    #[test]
    fn test_fixed_code_values_are_distinct() {
        let codes = [
            ErrorCode::Unknown,
            ErrorCode::NoInternet,
            ErrorCode::BadUrl,
            ErrorCode::JsonError,
            ErrorCode::Api,
            ErrorCode::Download,
            ErrorCode::Upload,
        ];
        let values: std::collections::HashSet<i64> = codes.iter().map(|c| c.value()).collect();
        assert_eq!(values.len(), codes.len());
    }
}
