// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Logger Sink
//!
//! Failures are forwarded to a [`NetworkLogger`] before they propagate.
//! A logger failure is reported and dropped; it never replaces the error
//! being logged.

use ring::digest::{digest, SHA256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::NetworkError;

/// Severity of a logged failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
}

/// How much of the logged details may appear in the log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogPrivacy {
    /// Verbatim.
    Open,
    /// Replaced by `<private>`.
    Encapsulated,
    /// One-way SHA-256 hex digest.
    Hashed,
}

impl LogPrivacy {
    /// Applies the privacy level to `details`.
    pub fn redact(&self, details: &str) -> String {
        match self {
            LogPrivacy::Open => details.to_string(),
            LogPrivacy::Encapsulated => "<private>".to_string(),
            LogPrivacy::Hashed => hex::encode(digest(&SHA256, details.as_bytes())),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoggerError {
    #[error("Logger sink unavailable: {0}")]
    Unavailable(String),

    #[error("Logger write failed: {0}")]
    Write(String),
}

/// Consumed logger sink.
pub trait NetworkLogger: Send + Sync {
    fn log_request(
        &self,
        url: &str,
        error: &NetworkError,
        severity: Severity,
        privacy: LogPrivacy,
    ) -> Result<(), LoggerError>;
}

/// Logs through `tracing`, redacting the URL and diagnostic message.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl NetworkLogger for TracingLogger {
    fn log_request(
        &self,
        url: &str,
        error: &NetworkError,
        severity: Severity,
        privacy: LogPrivacy,
    ) -> Result<(), LoggerError> {
        let url = privacy.redact(url);
        let details = privacy.redact(&error.message.to_string());
        let title = error.title.to_string();
        let code = error.code.value();

        match severity {
            Severity::Debug => tracing::debug!(%url, %title, code, %details, "request failed"),
            Severity::Info => tracing::info!(%url, %title, code, %details, "request failed"),
            Severity::Warning => tracing::warn!(%url, %title, code, %details, "request failed"),
            Severity::Error => tracing::error!(%url, %title, code, %details, "request failed"),
        }
        Ok(())
    }
}

/// Forwards `error` to `logger`, swallowing logger failures.
pub(crate) fn log_failure(
    logger: Option<&dyn NetworkLogger>,
    url: &str,
    error: &NetworkError,
    privacy: LogPrivacy,
) {
    let Some(logger) = logger else {
        return;
    };
    let severity = if error.is_cancellation() {
        Severity::Info
    } else {
        Severity::Error
    };
    if let Err(e) = logger.log_request(url, error, severity, privacy) {
        tracing::warn!(error = %e, "network logger failed");
    }
}
