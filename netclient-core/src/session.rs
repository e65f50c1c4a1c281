// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Network Session
//!
//! The caller-facing façade. Owns the multiplexer, installs it as the
//! transport's delegate, and exposes requests, transfers, sockets and task
//! control.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::sync::broadcast;

use crate::config::SessionConfig;
use crate::connectivity::Connectivity;
use crate::coordinator::{DownloadCoordinator, UploadCoordinator};
use crate::descriptor::{DownloadDescriptor, MultipartDescriptor, RequestDescriptor, UploadDescriptor};
use crate::error::{ErrorCatalog, NetworkError};
use crate::executor::RequestExecutor;
use crate::logger::NetworkLogger;
use crate::multiplexer::{SessionEvent, SessionEventMultiplexer};
use crate::pinning::{CertificatePinningValidator, TrustEvaluator};
use crate::stream::{BatchStream, DownloadStream, UploadStream};
use crate::transport::{
    SessionDelegate, TaskId, TaskInfo, TaskState, TransportRequest, TransportSession,
};
use crate::websocket::WebSocketChannel;

/// Default trust evaluation when none is supplied.
#[cfg(feature = "http-transport")]
fn default_trust_evaluator() -> Arc<dyn TrustEvaluator> {
    match crate::transport::tls::WebPkiTrustEvaluator::new() {
        Ok(evaluator) => Arc::new(evaluator),
        Err(e) => {
            tracing::warn!(error = %e, "webpki evaluator unavailable, rejecting all chains");
            Arc::new(crate::pinning::StaticTrustEvaluator::rejecting())
        }
    }
}

/// Without a platform verifier every chain is rejected.
#[cfg(not(feature = "http-transport"))]
fn default_trust_evaluator() -> Arc<dyn TrustEvaluator> {
    Arc::new(crate::pinning::StaticTrustEvaluator::rejecting())
}

pub struct NetworkSession {
    config: SessionConfig,
    transport: Arc<dyn TransportSession>,
    logger: Option<Arc<dyn NetworkLogger>>,
    multiplexer: Arc<SessionEventMultiplexer>,
    executor: Arc<RequestExecutor>,
    uploads: UploadCoordinator,
    downloads: DownloadCoordinator,
}

impl NetworkSession {
    pub fn new(
        transport: Arc<dyn TransportSession>,
        config: SessionConfig,
        catalog: ErrorCatalog,
        connectivity: Arc<dyn Connectivity>,
        logger: Option<Arc<dyn NetworkLogger>>,
    ) -> Self {
        Self::with_trust_evaluator(
            transport,
            config,
            catalog,
            connectivity,
            logger,
            default_trust_evaluator(),
        )
    }

    pub fn with_trust_evaluator(
        transport: Arc<dyn TransportSession>,
        config: SessionConfig,
        catalog: ErrorCatalog,
        connectivity: Arc<dyn Connectivity>,
        logger: Option<Arc<dyn NetworkLogger>>,
        evaluator: Arc<dyn TrustEvaluator>,
    ) -> Self {
        if !catalog.is_loaded() {
            tracing::warn!("error catalog not loaded, HTTP errors map to the generic json error");
        }
        let catalog = Arc::new(catalog);
        let validator = Arc::new(CertificatePinningValidator::new(
            config.pinning.clone(),
            evaluator,
        ));
        let multiplexer = Arc::new(SessionEventMultiplexer::new(
            validator,
            Arc::clone(&catalog),
            logger.clone(),
            config.log_privacy,
        ));
        transport.attach(Arc::clone(&multiplexer) as Arc<dyn SessionDelegate>);

        let executor = Arc::new(RequestExecutor::new(
            Arc::clone(&transport),
            catalog,
            connectivity,
            logger.clone(),
            config.log_privacy,
        ));
        let uploads = UploadCoordinator::new(
            Arc::clone(&transport),
            Arc::clone(&executor),
            Arc::clone(&multiplexer),
        );
        let downloads = DownloadCoordinator::new(
            Arc::clone(&transport),
            Arc::clone(&executor),
            Arc::clone(&multiplexer),
        );

        tracing::info!(
            mode = config.mode_label(),
            pinning = config.pinning.is_some(),
            "network session created"
        );

        NetworkSession {
            config,
            transport,
            logger,
            multiplexer,
            executor,
            uploads,
            downloads,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn executor(&self) -> &Arc<RequestExecutor> {
        &self.executor
    }

    /// Response body of a plain request.
    pub async fn request<D: RequestDescriptor>(&self, descriptor: &D) -> Result<Vec<u8>, NetworkError> {
        self.executor.execute(descriptor).await
    }

    /// Plain request decoded into `T`.
    pub async fn request_decoded<T, D>(&self, descriptor: &D) -> Result<T, NetworkError>
    where
        T: DeserializeOwned,
        D: RequestDescriptor,
    {
        self.executor.execute_decoding(descriptor).await
    }

    /// Runs `descriptors` strictly one after another.
    pub fn serial_requests(&self, descriptors: Vec<Arc<dyn RequestDescriptor>>) -> BatchStream {
        self.executor.execute_serial(descriptors)
    }

    pub fn upload<D: UploadDescriptor>(&self, descriptor: &D) -> UploadStream {
        self.uploads.start(descriptor)
    }

    pub fn upload_multipart<D: MultipartDescriptor>(&self, descriptor: &D) -> UploadStream {
        self.uploads.start_multipart(descriptor)
    }

    pub fn download<D: DownloadDescriptor>(&self, descriptor: &D) -> DownloadStream {
        self.downloads.start(descriptor)
    }

    pub async fn websocket<D: RequestDescriptor>(
        &self,
        descriptor: &D,
    ) -> Result<WebSocketChannel, NetworkError> {
        WebSocketChannel::open(
            self.transport.as_ref(),
            &self.executor,
            descriptor,
            self.logger.clone(),
            self.config.log_privacy,
        )
        .await
    }

    /// All tasks the transport knows about.
    pub fn tasks(&self) -> Vec<TaskInfo> {
        self.transport.tasks()
    }

    /// Suspends the running task created from `request`.
    pub fn suspend(&self, request: &TransportRequest) -> bool {
        self.control(request, TaskState::Running, |id| self.transport.suspend(id))
    }

    /// Resumes the suspended task created from `request`.
    pub fn resume(&self, request: &TransportRequest) -> bool {
        self.control(request, TaskState::Suspended, |id| self.transport.resume(id))
    }

    /// Cancels the running task created from `request`.
    pub fn cancel(&self, request: &TransportRequest) -> bool {
        self.control(request, TaskState::Running, |id| self.transport.cancel(id))
    }

    /// Cancels every running task whose request targets `url`.
    pub fn cancel_task_with_url(&self, url: &str) -> usize {
        let matching: Vec<_> = self
            .transport
            .tasks()
            .into_iter()
            .filter(|task| task.state == TaskState::Running && task.original_request.url == url)
            .map(|task| task.id)
            .collect();
        for id in &matching {
            self.transport.cancel(*id);
        }
        matching.len()
    }

    /// Invalidates the session; every outstanding stream fails as cancelled.
    pub fn cancel_all(&self) {
        tracing::info!(active = self.multiplexer.active_tasks(), "cancelling all tasks");
        self.transport.invalidate_and_cancel();
        self.multiplexer.fail_all(NetworkError::cancelled());
    }

    /// Session-wide event feed.
    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.multiplexer.subscribe()
    }

    /// Called once the transport has delivered all queued background events.
    pub fn on_background_events_finished<F>(&self, hook: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.multiplexer.set_events_finished_hook(hook);
    }

    fn control<F>(&self, request: &TransportRequest, required: TaskState, action: F) -> bool
    where
        F: FnOnce(TaskId),
    {
        let task = self
            .transport
            .tasks()
            .into_iter()
            .find(|task| task.state == required && task.original_request == *request);
        match task {
            Some(task) => {
                tracing::debug!(task_id = %task.id, ?required, "task control");
                action(task.id);
                true
            }
            None => false,
        }
    }
}

impl std::fmt::Debug for NetworkSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkSession")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
