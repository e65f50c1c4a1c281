// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Session Configuration
//!
//! Construction-time settings for a session. Timeouts are enforced by the
//! transport, not by the core.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::logger::LogPrivacy;
use crate::pinning::PinningPolicy;

/// How the transport session is set up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    #[default]
    Default,
    /// Transfers owned by the host's background service, under `identifier`.
    Background(String),
    /// No persistent cookies, credentials or cache.
    Ephemeral,
    /// Responses to plain GET calls are cached in memory.
    Cache,
}

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub mode: SessionMode,
    pub pinning: Option<PinningPolicy>,
    /// Per-request idle timeout in milliseconds.
    pub request_timeout_ms: u64,
    /// Whole-resource timeout in milliseconds.
    pub resource_timeout_ms: u64,
    /// Connection timeout in milliseconds.
    pub connect_timeout_ms: u64,
    pub user_agent: Option<String>,
    /// Chunk size for streamed upload bodies, in bytes.
    pub upload_chunk_size: usize,
    /// Privacy level passed to the logger sink.
    pub log_privacy: LogPrivacy,
    /// Where in-flight downloads are written; the system temp dir if unset.
    pub download_directory: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            mode: SessionMode::Default,
            pinning: None,
            request_timeout_ms: 60_000,
            resource_timeout_ms: 7 * 24 * 60 * 60 * 1_000,
            connect_timeout_ms: 30_000,
            user_agent: None,
            upload_chunk_size: 64 * 1024,
            log_privacy: LogPrivacy::Hashed,
            download_directory: None,
        }
    }
}

impl SessionConfig {
    pub fn with_mode(mut self, mode: SessionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_pinning(mut self, policy: PinningPolicy) -> Self {
        self.pinning = Some(policy);
        self
    }

    pub fn with_request_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.request_timeout_ms = timeout_ms;
        self
    }

    pub fn with_resource_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.resource_timeout_ms = timeout_ms;
        self
    }

    pub fn with_connect_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.connect_timeout_ms = timeout_ms;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_upload_chunk_size(mut self, bytes: usize) -> Self {
        // Zero would never make progress.
        self.upload_chunk_size = bytes.max(1);
        self
    }

    pub fn with_log_privacy(mut self, privacy: LogPrivacy) -> Self {
        self.log_privacy = privacy;
        self
    }

    pub fn with_download_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.download_directory = Some(directory.into());
        self
    }

    /// Directory for in-flight download files.
    pub fn download_directory(&self) -> PathBuf {
        self.download_directory
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }

    /// Label used in tracing spans.
    pub fn mode_label(&self) -> &str {
        match &self.mode {
            SessionMode::Default => "default",
            SessionMode::Background(identifier) => identifier,
            SessionMode::Ephemeral => "ephemeral",
            SessionMode::Cache => "cache",
        }
    }
}
