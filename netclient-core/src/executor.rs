// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Request Executor
//!
//! Descriptor → transport request → validated response body.
//!
//! Pre-flight order: connectivity hook, URL, headers, JSON body. Each
//! failure is forwarded to the logger before it is returned.

use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::connectivity::Connectivity;
use crate::descriptor::RequestDescriptor;
use crate::error::{ErrorCatalog, NetworkError};
use crate::logger::{log_failure, LogPrivacy, NetworkLogger};
use crate::stream::{BatchStream, ResultStream};
use crate::transport::{TransportRequest, TransportSession};

/// Builds the transport request for `descriptor`.
pub(crate) fn build_request(
    descriptor: &dyn RequestDescriptor,
    reachable: bool,
) -> Result<TransportRequest, NetworkError> {
    if let Some(error) = descriptor.connectivity_error(reachable) {
        return Err(error);
    }

    let raw = format!("{}{}", descriptor.base_url(), descriptor.path());
    let mut url = url::Url::parse(&raw).map_err(|e| {
        tracing::debug!(url = %raw, error = %e, "descriptor produced an invalid url");
        NetworkError::malformed_url()
    })?;
    if url.scheme().is_empty() || !url.has_host() {
        return Err(NetworkError::malformed_url());
    }
    let query = descriptor.query();
    if !query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (name, value) in &query {
            pairs.append_pair(name, value);
        }
    }

    let mut request = TransportRequest::new(url.to_string(), descriptor.method());
    if let Some(headers) = descriptor.headers() {
        for (key, value) in headers.iter() {
            request.set_header(key.as_str(), &value.to_header_string());
        }
    }
    if let Some(body) = descriptor.body_parameters() {
        let bytes = serde_json::to_vec_pretty(&body).map_err(|e| NetworkError::from_encode_error(&e))?;
        request.body = Some(bytes);
    }
    Ok(request)
}

/// Best-effort URL of a descriptor, for logging.
pub(crate) fn descriptor_url(descriptor: &dyn RequestDescriptor) -> String {
    format!("{}{}", descriptor.base_url(), descriptor.path())
}

/// Executes plain requests.
pub struct RequestExecutor {
    transport: Arc<dyn TransportSession>,
    catalog: Arc<ErrorCatalog>,
    connectivity: Arc<dyn Connectivity>,
    logger: Option<Arc<dyn NetworkLogger>>,
    privacy: LogPrivacy,
}

impl RequestExecutor {
    pub fn new(
        transport: Arc<dyn TransportSession>,
        catalog: Arc<ErrorCatalog>,
        connectivity: Arc<dyn Connectivity>,
        logger: Option<Arc<dyn NetworkLogger>>,
        privacy: LogPrivacy,
    ) -> Self {
        RequestExecutor {
            transport,
            catalog,
            connectivity,
            logger,
            privacy,
        }
    }

    /// Resolves `descriptor` against the current connectivity.
    pub fn build_request(
        &self,
        descriptor: &dyn RequestDescriptor,
    ) -> Result<TransportRequest, NetworkError> {
        build_request(descriptor, self.connectivity.is_reachable())
    }

    /// Builds the request, logging a pre-flight failure.
    pub(crate) fn prepare(
        &self,
        descriptor: &dyn RequestDescriptor,
    ) -> Result<TransportRequest, NetworkError> {
        self.build_request(descriptor).inspect_err(|error| {
            self.log(&descriptor_url(descriptor), error);
        })
    }

    pub(crate) fn log(&self, url: &str, error: &NetworkError) {
        log_failure(self.logger.as_deref(), url, error, self.privacy);
    }

    /// Executes `descriptor` and returns the response body.
    pub async fn execute(&self, descriptor: &dyn RequestDescriptor) -> Result<Vec<u8>, NetworkError> {
        let request = self.prepare(descriptor)?;
        let url = request.url.clone();
        tracing::debug!(method = %request.method, %url, "executing request");

        self.send(request, descriptor.clear_cache())
            .await
            .inspect_err(|error| self.log(&url, error))
    }

    /// Executes `descriptor` and decodes the JSON body into `T`.
    pub async fn execute_decoding<T>(&self, descriptor: &dyn RequestDescriptor) -> Result<T, NetworkError>
    where
        T: DeserializeOwned,
    {
        let body = self.execute(descriptor).await?;
        serde_json::from_slice(&body).map_err(|e| {
            let error = NetworkError::from_decode_error(&e);
            self.log(&descriptor_url(descriptor), &error);
            error
        })
    }

    /// Executes `descriptors` one at a time on a worker task.
    ///
    /// Each body is forwarded as it arrives; the first failure is forwarded
    /// and the remaining descriptors are never started.
    pub fn execute_serial(self: &Arc<Self>, descriptors: Vec<Arc<dyn RequestDescriptor>>) -> BatchStream {
        let (tx, stream) = ResultStream::channel();
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                tracing::warn!(error = %e, "serial batch needs a tokio runtime");
                let _ = tx.send(Err(NetworkError::unknown_response()));
                return stream;
            }
        };

        let executor = Arc::clone(self);
        handle.spawn(async move {
            let total = descriptors.len();
            for (index, descriptor) in descriptors.into_iter().enumerate() {
                match executor.execute(descriptor.as_ref()).await {
                    Ok(body) => {
                        if tx.send(Ok(body)).is_err() {
                            tracing::debug!(index, "serial batch stream dropped");
                            return;
                        }
                    }
                    Err(error) => {
                        tracing::debug!(index, total, "serial batch aborted");
                        let _ = tx.send(Err(error));
                        return;
                    }
                }
            }
        });
        stream
    }

    async fn send(&self, request: TransportRequest, clear_cache: bool) -> Result<Vec<u8>, NetworkError> {
        if clear_cache {
            self.transport.remove_cached_response(&request);
        }
        let response = self
            .transport
            .data(request)
            .await
            .map_err(|failure| NetworkError::from_transport_failure(&failure))?;

        match NetworkError::from_http_status(response.status, &self.catalog) {
            Some(error) => Err(error),
            None => Ok(response.body),
        }
    }
}

// INLINE_TEST_REQUIRED: Tests crate-private build_request with explicit reachability
#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{HeaderFields, HeaderKey, HeaderValue, HttpMethod};
    use crate::error::ErrorCode;

    struct Probe {
        base: &'static str,
        body: Option<serde_json::Value>,
    }

    impl RequestDescriptor for Probe {
        fn base_url(&self) -> String {
            self.base.to_string()
        }
        fn path(&self) -> String {
            "/items".to_string()
        }
        fn method(&self) -> HttpMethod {
            HttpMethod::Post
        }
        fn query(&self) -> Vec<(String, String)> {
            vec![("page".into(), "2".into())]
        }
        fn headers(&self) -> Option<HeaderFields> {
            Some(HeaderFields::new().with(HeaderKey::ContentType, HeaderValue::Json))
        }
        fn body_parameters(&self) -> Option<serde_json::Value> {
            self.body.clone()
        }
    }

    #[test]
    fn test_connectivity_checked_before_url() {
        let probe = Probe {
            base: "not a url",
            body: None,
        };
        let error = build_request(&probe, false).unwrap_err();
        assert_eq!(error.code, ErrorCode::NoInternet);
    }

    #[test]
    fn test_url_without_host_is_malformed() {
        let probe = Probe {
            base: "mailto:someone",
            body: None,
        };
        let error = build_request(&probe, true).unwrap_err();
        assert_eq!(error.code, ErrorCode::BadUrl);
    }

    #[test]
    fn test_request_carries_query_headers_and_pretty_body() {
        let probe = Probe {
            base: "https://api.example.com/v1",
            body: Some(serde_json::json!({"name": "a"})),
        };
        let request = build_request(&probe, true).unwrap();

        assert_eq!(request.url, "https://api.example.com/v1/items?page=2");
        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.header("content-type"), Some("application/json"));
        assert_eq!(request.body.as_deref(), Some(b"{\n  \"name\": \"a\"\n}".as_slice()));
    }
}
