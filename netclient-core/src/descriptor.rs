// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Request Descriptors
//!
//! The contract a caller's request type satisfies. Descriptors are
//! immutable per call and are read synchronously before every execution.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::NetworkError;

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Header name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HeaderKey {
    Authorization,
    ContentType,
    Accept,
    Other(String),
}

impl HeaderKey {
    pub fn as_str(&self) -> &str {
        match self {
            HeaderKey::Authorization => "Authorization",
            HeaderKey::ContentType => "Content-Type",
            HeaderKey::Accept => "Accept",
            HeaderKey::Other(name) => name,
        }
    }
}

/// Header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderValue {
    Json,
    MultipartFormData { boundary: String },
    Other(String),
}

impl HeaderValue {
    pub fn to_header_string(&self) -> String {
        match self {
            HeaderValue::Json => "application/json".to_string(),
            HeaderValue::MultipartFormData { boundary } => {
                format!("multipart/form-data; boundary={}", boundary)
            }
            HeaderValue::Other(value) => value.clone(),
        }
    }
}

/// Ordered header set. Setting an existing key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderFields(Vec<(HeaderKey, HeaderValue)>);

impl HeaderFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: HeaderKey, value: HeaderValue) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: HeaderKey, value: HeaderValue) {
        match self.0.iter_mut().find(|(existing, _)| *existing == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &HeaderKey) -> Option<&HeaderValue> {
        self.0
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(HeaderKey, HeaderValue)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Declarative description of one network call.
pub trait RequestDescriptor: Send + Sync {
    fn base_url(&self) -> String;

    fn path(&self) -> String;

    fn method(&self) -> HttpMethod;

    /// Query parameters appended in order.
    fn query(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    fn headers(&self) -> Option<HeaderFields> {
        None
    }

    /// JSON body. `None` sends no body.
    fn body_parameters(&self) -> Option<serde_json::Value> {
        None
    }

    /// Drop any cached response before executing.
    fn clear_cache(&self) -> bool {
        false
    }

    /// Pre-flight connectivity check, given the current reachability.
    fn connectivity_error(&self, reachable: bool) -> Option<NetworkError> {
        if reachable {
            None
        } else {
            Some(NetworkError::no_connectivity())
        }
    }
}

/// Upload payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadSource {
    Bytes(Vec<u8>),
    File(PathBuf),
}

pub trait UploadDescriptor: RequestDescriptor {
    fn upload_source(&self) -> UploadSource;
}

pub trait DownloadDescriptor: RequestDescriptor {
    /// Where the finished file should end up. `None` keeps the temporary file.
    fn destination(&self) -> Option<PathBuf> {
        None
    }
}

/// One part of a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultipartPart {
    Text {
        name: String,
        value: String,
    },
    Data {
        name: String,
        file_name: String,
        mime_type: String,
        data: Vec<u8>,
    },
}

/// Upload whose body is a `multipart/form-data` form.
pub trait MultipartDescriptor: RequestDescriptor {
    fn boundary(&self) -> String;

    fn form_parts(&self) -> Vec<MultipartPart>;

    /// Encodes the parts, terminated by the closing boundary.
    fn form_body(&self) -> Vec<u8> {
        encode_multipart(&self.boundary(), &self.form_parts())
    }
}

pub(crate) fn encode_multipart(boundary: &str, parts: &[MultipartPart]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        match part {
            MultipartPart::Text { name, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n", name).as_bytes(),
                );
                body.extend_from_slice(b"Content-Type: text/plain; charset=ISO-8859-1\r\n");
                body.extend_from_slice(b"Content-Transfer-Encoding: 8bit\r\n\r\n");
                body.extend_from_slice(value.as_bytes());
            }
            MultipartPart::Data {
                name,
                file_name,
                mime_type,
                data,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                        name, file_name
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", mime_type).as_bytes());
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());
    body
}
