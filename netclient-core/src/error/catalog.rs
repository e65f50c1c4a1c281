// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Static error catalog.
//!
//! Keyed list of `{httpStatusCode, title, message, userMessage}` records
//! loaded once by the host. A missing or unparsable catalog degrades to the
//! generic `JsonError` errors instead of failing.

use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{ErrorCode, ErrorMessage, ErrorTitle, NetworkError};

/// One catalog record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub http_status_code: u16,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub user_message: String,
}

impl CatalogEntry {
    /// Builds the error this entry describes. `code.value()` is the status.
    pub fn to_error(&self) -> NetworkError {
        NetworkError::new(
            ErrorTitle::from(self.title.clone()),
            ErrorCode::Custom(i64::from(self.http_status_code)),
            ErrorMessage::from(self.message.clone()),
            self.user_message.clone(),
        )
    }
}

/// Catalog parse failure.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("catalog io error: {0}")]
    Io(#[from] io::Error),

    #[error("catalog json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Status-to-error mapping source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ErrorCatalog {
    /// No catalog was supplied.
    #[default]
    Unavailable,
    /// A catalog was supplied but could not be parsed.
    Malformed(String),
    /// Parsed catalog records.
    Loaded(Vec<CatalogEntry>),
}

impl ErrorCatalog {
    /// Parses a JSON array of records. Never fails; bad input is `Malformed`.
    pub fn from_json_slice(bytes: &[u8]) -> Self {
        match serde_json::from_slice::<Vec<CatalogEntry>>(bytes) {
            Ok(entries) => ErrorCatalog::Loaded(entries),
            Err(e) => ErrorCatalog::Malformed(CatalogError::from(e).to_string()),
        }
    }

    /// Reads and parses a catalog file. A missing file is `Unavailable`.
    pub fn from_path(path: &Path) -> Self {
        match std::fs::read(path) {
            Ok(bytes) => Self::from_json_slice(&bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => ErrorCatalog::Unavailable,
            Err(e) => ErrorCatalog::Malformed(CatalogError::from(e).to_string()),
        }
    }

    /// Returns the record for `status`, if the catalog is loaded and has one.
    pub fn lookup(&self, status: u16) -> Option<&CatalogEntry> {
        match self {
            ErrorCatalog::Loaded(entries) => {
                entries.iter().find(|entry| entry.http_status_code == status)
            }
            _ => None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, ErrorCatalog::Loaded(_))
    }
}
