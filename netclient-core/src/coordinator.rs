// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Upload and download coordinators.
//!
//! Each call creates a suspended transport task, registers it with the
//! multiplexer (direction and destination are fixed here, before the first
//! callback can arrive) and only then starts it.

use std::sync::Arc;

use crate::descriptor::{
    DownloadDescriptor, HeaderKey, HeaderValue, MultipartDescriptor, UploadDescriptor, UploadSource,
};
use crate::error::NetworkError;
use crate::executor::RequestExecutor;
use crate::multiplexer::SessionEventMultiplexer;
use crate::stream::{DownloadStream, TaskStream, UploadStream};
use crate::transport::{TransportRequest, TransportSession};

pub struct DownloadCoordinator {
    transport: Arc<dyn TransportSession>,
    executor: Arc<RequestExecutor>,
    multiplexer: Arc<SessionEventMultiplexer>,
}

impl DownloadCoordinator {
    pub fn new(
        transport: Arc<dyn TransportSession>,
        executor: Arc<RequestExecutor>,
        multiplexer: Arc<SessionEventMultiplexer>,
    ) -> Self {
        DownloadCoordinator {
            transport,
            executor,
            multiplexer,
        }
    }

    pub fn start<D: DownloadDescriptor>(&self, descriptor: &D) -> DownloadStream {
        let request = match self.executor.prepare(descriptor) {
            Ok(request) => request,
            Err(error) => return TaskStream::failed(error),
        };
        if descriptor.clear_cache() {
            self.transport.remove_cached_response(&request);
        }

        let task_id = self.transport.download_task(request);
        let stream = self.multiplexer.register_download(task_id, descriptor.destination());
        tracing::debug!(%task_id, "download started");
        self.transport.resume(task_id);
        stream
    }
}

pub struct UploadCoordinator {
    transport: Arc<dyn TransportSession>,
    executor: Arc<RequestExecutor>,
    multiplexer: Arc<SessionEventMultiplexer>,
}

impl UploadCoordinator {
    pub fn new(
        transport: Arc<dyn TransportSession>,
        executor: Arc<RequestExecutor>,
        multiplexer: Arc<SessionEventMultiplexer>,
    ) -> Self {
        UploadCoordinator {
            transport,
            executor,
            multiplexer,
        }
    }

    pub fn start<D: UploadDescriptor>(&self, descriptor: &D) -> UploadStream {
        let request = match self.executor.prepare(descriptor) {
            Ok(request) => request,
            Err(error) => return TaskStream::failed(error),
        };
        let source = descriptor.upload_source();
        if let UploadSource::File(path) = &source {
            if let Err(e) = std::fs::metadata(path) {
                let error = NetworkError::from_upload_source_error(&e);
                self.executor.log(&request.url, &error);
                return TaskStream::failed(error);
            }
        }
        self.launch(request, source)
    }

    /// Uploads the encoded multipart form of `descriptor`.
    ///
    /// Sets the multipart `Content-Type` unless the descriptor supplies one.
    pub fn start_multipart<D: MultipartDescriptor>(&self, descriptor: &D) -> UploadStream {
        let mut request = match self.executor.prepare(descriptor) {
            Ok(request) => request,
            Err(error) => return TaskStream::failed(error),
        };
        if request.header(HeaderKey::ContentType.as_str()).is_none() {
            let value = HeaderValue::MultipartFormData {
                boundary: descriptor.boundary(),
            };
            request.set_header(HeaderKey::ContentType.as_str(), &value.to_header_string());
        }
        self.launch(request, UploadSource::Bytes(descriptor.form_body()))
    }

    fn launch(&self, mut request: TransportRequest, source: UploadSource) -> UploadStream {
        // The payload travels as the upload source, not the request body.
        request.body = None;
        let task_id = self.transport.upload_task(request, source);
        let stream = self.multiplexer.register_upload(task_id);
        tracing::debug!(%task_id, "upload started");
        self.transport.resume(task_id);
        stream
    }
}
