// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! HTTP Transport
//!
//! Production [`TransportSession`] over reqwest (plain calls, uploads,
//! downloads) and tokio-tungstenite (WebSockets). Both share one rustls
//! configuration whose certificate verifier raises a server-trust
//! challenge on the attached delegate.
//!
//! Every upload/download task runs as its own tokio task. Suspension is a
//! watch gate checked between body chunks. Downloads stream into a
//! temporary file; when the server accepts byte ranges, a failure after
//! some bytes arrived carries resume data for a `Range` request.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use reqwest::header::{ACCEPT_RANGES, CONTENT_LENGTH, RANGE};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::Connector;

use super::socket::TungsteniteSocket;
use super::tls::{self, DelegateSlot};
use super::{
    ResumeData, SessionDelegate, TaskId, TaskInfo, TaskKind, TaskState, TransportFailure,
    TransportRequest, TransportResponse, TransportSession, WebSocketTask,
};
use crate::config::{SessionConfig, SessionMode};
use crate::descriptor::{HttpMethod, UploadSource};

/// Everything needed to continue a download with a `Range` request.
#[derive(Debug, Serialize, Deserialize)]
struct ResumeToken {
    url: String,
    method: HttpMethod,
    headers: Vec<(String, String)>,
    received: u64,
    partial: PathBuf,
}

impl ResumeToken {
    fn encode(request: &TransportRequest, received: u64, partial: &Path) -> Option<ResumeData> {
        let token = ResumeToken {
            url: request.url.clone(),
            method: request.method,
            headers: request.headers.clone(),
            received,
            partial: partial.to_path_buf(),
        };
        match bincode::serialize(&token) {
            Ok(bytes) => Some(ResumeData::new(bytes)),
            Err(e) => {
                tracing::warn!(error = %e, "resume token not encodable");
                None
            }
        }
    }

    fn decode(data: &ResumeData) -> Result<Self, TransportFailure> {
        bincode::deserialize(data.as_bytes()).map_err(|e| {
            TransportFailure::new(TransportFailure::BAD_URL, format!("invalid resume data: {}", e))
        })
    }

    fn request(&self) -> TransportRequest {
        TransportRequest {
            url: self.url.clone(),
            method: self.method,
            headers: self.headers.clone(),
            body: None,
        }
    }
}

/// In-flight download file, removed on drop unless kept.
struct PartialFile {
    path: PathBuf,
    keep: bool,
}

impl PartialFile {
    fn new(path: PathBuf) -> Self {
        PartialFile { path, keep: false }
    }

    fn keep(&mut self) {
        self.keep = true;
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if !self.keep {
            remove_partial(&self.path);
        }
    }
}

fn remove_partial(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "removed partial download"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "partial download not removed"),
    }
}

/// Whether `path` is named like a file this transport downloads into.
fn is_partial_download(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with(PARTIAL_PREFIX) && name.ends_with(PARTIAL_SUFFIX))
}

const PARTIAL_PREFIX: &str = "netclient-";
const PARTIAL_SUFFIX: &str = ".download";

enum Job {
    Download(Option<ResumeToken>),
    Upload(UploadSource),
}

struct TaskSlot {
    info: TaskInfo,
    /// Work not yet started; taken on the first resume.
    job: Option<Job>,
    /// `true` while the task may transfer.
    gate: watch::Sender<bool>,
    abort: Option<AbortHandle>,
}

struct Inner {
    client: reqwest::Client,
    tls: Arc<rustls::ClientConfig>,
    config: SessionConfig,
    delegate: DelegateSlot,
    runtime: Handle,
    tasks: Mutex<HashMap<TaskId, TaskSlot>>,
    next_id: AtomicU64,
    cache: Mutex<HashMap<String, TransportResponse>>,
    invalidated: AtomicBool,
}

/// reqwest + tokio-tungstenite transport.
#[derive(Clone)]
pub struct HttpTransport {
    inner: Arc<Inner>,
}

impl HttpTransport {
    /// Creates the transport. Must be called within a tokio runtime.
    pub fn new(config: SessionConfig) -> Result<Self, TransportFailure> {
        let runtime = Handle::try_current()
            .map_err(|e| TransportFailure::new(TransportFailure::CANNOT_CONNECT, e.to_string()))?;
        let delegate: DelegateSlot = Arc::new(Mutex::new(None));
        let connect_timeout = Duration::from_millis(config.connect_timeout_ms);

        let tls = tls::client_config(Arc::clone(&delegate), connect_timeout).map_err(|e| {
            TransportFailure::new(TransportFailure::SECURE_CONNECTION_FAILED, e.to_string())
        })?;

        let mut builder = reqwest::Client::builder()
            .use_preconfigured_tls(tls.clone())
            .connect_timeout(connect_timeout);
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        let client = builder.build().map_err(|e| map_reqwest_error(&e, None))?;

        tracing::info!(mode = config.mode_label(), "http transport ready");

        Ok(HttpTransport {
            inner: Arc::new(Inner {
                client,
                tls: Arc::new(tls),
                config,
                delegate,
                runtime,
                tasks: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(0),
                cache: Mutex::new(HashMap::new()),
                invalidated: AtomicBool::new(false),
            }),
        })
    }
}

impl Inner {
    fn handle(self: &Arc<Self>) -> HttpTransport {
        HttpTransport {
            inner: Arc::clone(self),
        }
    }

    fn ensure_valid(&self, request: &TransportRequest) -> Result<(), TransportFailure> {
        if self.invalidated.load(Ordering::SeqCst) {
            return Err(TransportFailure::cancelled().with_url(request.url.clone()));
        }
        Ok(())
    }

    fn resource_timeout(&self) -> Duration {
        Duration::from_millis(self.config.resource_timeout_ms)
    }

    fn create_task(
        &self,
        request: TransportRequest,
        kind: TaskKind,
        job: Option<Job>,
        state: TaskState,
    ) -> TaskId {
        let id = TaskId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let (gate, _) = watch::channel(false);
        let slot = TaskSlot {
            info: TaskInfo {
                id,
                kind,
                state,
                original_request: request,
            },
            job,
            gate,
            abort: None,
        };
        self.tasks.lock().insert(id, slot);
        id
    }

    fn task(&self, id: TaskId) -> Option<TaskInfo> {
        self.tasks.lock().get(&id).map(|slot| slot.info.clone())
    }

    // Delegate calls run with no lock held.
    fn notify<F>(self: &Arc<Self>, id: TaskId, call: F)
    where
        F: FnOnce(&dyn SessionDelegate, &dyn TransportSession, &TaskInfo),
    {
        let delegate = self.delegate.lock().clone();
        if let (Some(delegate), Some(task)) = (delegate, self.task(id)) {
            call(delegate.as_ref(), &self.handle(), &task);
        }
    }

    /// Moves a task to its terminal state, evicts it and reports it, once.
    fn finish(self: &Arc<Self>, id: TaskId, failure: Option<TransportFailure>) {
        let (task, unstarted) = {
            let mut tasks = self.tasks.lock();
            let Some(mut slot) = tasks.remove(&id) else {
                return;
            };
            slot.info.state = match &failure {
                Some(f) if f.is_cancellation() => TaskState::Canceled,
                _ => TaskState::Completed,
            };
            // Closes the gate for a job that is still starting.
            slot.gate.send_replace(false);
            let unstarted = match slot.job.take() {
                Some(Job::Download(Some(token))) => Some(token.partial),
                _ => None,
            };
            (slot.info, unstarted)
        };
        if let Some(path) = unstarted {
            remove_partial(&path);
        }
        let delegate = self.delegate.lock().clone();
        if let Some(delegate) = delegate {
            delegate.did_complete(&self.handle(), &task, failure);
        }
    }

    fn request_builder(
        &self,
        request: &TransportRequest,
        timeout: Duration,
    ) -> Result<reqwest::RequestBuilder, TransportFailure> {
        let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes()).map_err(|e| {
            TransportFailure::new(TransportFailure::BAD_URL, e.to_string()).with_url(request.url.clone())
        })?;
        let mut builder = self.client.request(method, &request.url).timeout(timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }
        Ok(builder)
    }

    fn start(self: &Arc<Self>, id: TaskId, job: Job) {
        let Some((request, gate)) = self
            .tasks
            .lock()
            .get(&id)
            .map(|slot| (slot.info.original_request.clone(), slot.gate.subscribe()))
        else {
            return;
        };

        let inner = Arc::clone(self);
        let join = self.runtime.spawn(async move {
            let outcome = match job {
                Job::Download(token) => inner.run_download(id, request, token, gate).await,
                Job::Upload(source) => inner.run_upload(id, request, source, gate).await,
            };
            inner.finish(id, outcome.err());
        });
        if let Some(slot) = self.tasks.lock().get_mut(&id) {
            slot.abort = Some(join.abort_handle());
        }
    }

    async fn run_download(
        self: &Arc<Self>,
        id: TaskId,
        request: TransportRequest,
        token: Option<ResumeToken>,
        mut gate: watch::Receiver<bool>,
    ) -> Result<(), TransportFailure> {
        let (path, mut received) = match &token {
            Some(token) => (token.partial.clone(), token.received),
            None => (
                self.config.download_directory().join(format!(
                    "{}{}{}",
                    PARTIAL_PREFIX,
                    uuid::Uuid::new_v4(),
                    PARTIAL_SUFFIX
                )),
                0,
            ),
        };
        let mut partial = PartialFile::new(path);
        wait_running(&mut gate).await?;
        let url = request.url.clone();

        let mut builder = self.request_builder(&request, self.resource_timeout())?;
        if received > 0 {
            builder = builder.header(RANGE, format!("bytes={}-", received));
        }
        let mut response = builder
            .send()
            .await
            .map_err(|e| map_reqwest_error(&e, Some(&url)))?;

        let status = response.status().as_u16();
        self.notify(id, |d, s, t| d.did_receive_response(s, t, status));
        if received > 0 && status != 206 {
            tracing::debug!(task_id = %id, status, "range ignored, restarting download");
            received = 0;
        }
        let resumable = response
            .headers()
            .get(ACCEPT_RANGES)
            .is_some_and(|value| value.as_bytes() == b"bytes");
        let expected = response.content_length().map(|length| length + received);

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .append(received > 0)
            .truncate(received == 0)
            .open(&partial.path)
            .await
            .map_err(|e| file_failure(&e, &url))?;

        loop {
            wait_running(&mut gate).await?;
            let chunk = match response.chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) => {
                    let _ = file.flush().await;
                    let failure = map_reqwest_error(&e, Some(&url));
                    let resume = (resumable && received > 0)
                        .then(|| ResumeToken::encode(&request, received, &partial.path))
                        .flatten();
                    return Err(match resume {
                        Some(data) => {
                            partial.keep();
                            failure.with_resume_data(data)
                        }
                        None => failure,
                    });
                }
            };
            file.write_all(&chunk).await.map_err(|e| file_failure(&e, &url))?;
            received += chunk.len() as u64;
            self.notify(id, |d, s, t| d.did_write_data(s, t, received, expected));
        }
        file.flush().await.map_err(|e| file_failure(&e, &url))?;
        drop(file);

        // The delegate takes the file from here.
        partial.keep();
        self.notify(id, |d, s, t| d.did_finish_downloading(s, t, &partial.path));
        Ok(())
    }

    async fn run_upload(
        self: &Arc<Self>,
        id: TaskId,
        request: TransportRequest,
        source: UploadSource,
        mut gate: watch::Receiver<bool>,
    ) -> Result<(), TransportFailure> {
        wait_running(&mut gate).await?;
        let url = request.url.clone();
        let payload = match source {
            UploadSource::Bytes(bytes) => bytes,
            UploadSource::File(path) => tokio::fs::read(&path)
                .await
                .map_err(|e| file_failure(&e, &url))?,
        };

        let total = payload.len() as u64;
        let mut sent = 0u64;
        let chunks: Vec<(Vec<u8>, u64)> = payload
            .chunks(self.config.upload_chunk_size.max(1))
            .map(|chunk| {
                sent += chunk.len() as u64;
                (chunk.to_vec(), sent)
            })
            .collect();

        let inner = Arc::clone(self);
        let body = futures::stream::iter(chunks).then(move |(chunk, sent)| {
            let inner = Arc::clone(&inner);
            let mut gate = gate.clone();
            async move {
                wait_running(&mut gate)
                    .await
                    .map_err(|f| std::io::Error::other(f.to_string()))?;
                inner.notify(id, |d, s, t| d.did_send_body_data(s, t, sent, Some(total)));
                Ok::<Vec<u8>, std::io::Error>(chunk)
            }
        });

        let response = self
            .request_builder(&request, self.resource_timeout())?
            .header(CONTENT_LENGTH, total)
            .body(reqwest::Body::wrap_stream(body))
            .send()
            .await
            .map_err(|e| map_reqwest_error(&e, Some(&url)))?;

        let status = response.status().as_u16();
        self.notify(id, |d, s, t| d.did_receive_response(s, t, status));
        let body = response
            .bytes()
            .await
            .map_err(|e| map_reqwest_error(&e, Some(&url)))?;
        if !body.is_empty() {
            self.notify(id, |d, s, t| d.did_receive_data(s, t, &body));
        }
        Ok(())
    }
}

/// Waits until the task's gate is open.
async fn wait_running(gate: &mut watch::Receiver<bool>) -> Result<(), TransportFailure> {
    while !*gate.borrow_and_update() {
        gate.changed()
            .await
            .map_err(|_| TransportFailure::cancelled())?;
    }
    Ok(())
}

fn file_failure(error: &std::io::Error, url: &str) -> TransportFailure {
    TransportFailure::new(TransportFailure::FILE_IO, error.to_string())
        .with_domain("io")
        .with_url(url.to_string())
}

fn is_tls_failure(error: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(error);
    while let Some(err) = current {
        if err.downcast_ref::<rustls::Error>().is_some() {
            return true;
        }
        // io::Error hides its payload from source().
        let wrapped = err
            .downcast_ref::<std::io::Error>()
            .and_then(|io| io.get_ref())
            .is_some_and(|inner| inner.downcast_ref::<rustls::Error>().is_some());
        if wrapped {
            return true;
        }
        current = err.source();
    }
    false
}

fn map_reqwest_error(error: &reqwest::Error, url: Option<&str>) -> TransportFailure {
    let code = if error.is_timeout() {
        TransportFailure::TIMED_OUT
    } else if is_tls_failure(error) {
        TransportFailure::SECURE_CONNECTION_FAILED
    } else if error.is_connect() {
        TransportFailure::CANNOT_CONNECT
    } else if error.is_builder() {
        TransportFailure::BAD_URL
    } else if error.is_body() || error.is_decode() || error.is_request() {
        TransportFailure::CONNECTION_LOST
    } else {
        TransportFailure::BAD_SERVER_RESPONSE
    };
    let failure = TransportFailure::new(code, error.to_string()).with_domain("reqwest");
    match url.map(str::to_string).or_else(|| error.url().map(|u| u.to_string())) {
        Some(url) => failure.with_url(url),
        None => failure,
    }
}

#[async_trait]
impl TransportSession for HttpTransport {
    fn attach(&self, delegate: Arc<dyn SessionDelegate>) {
        *self.inner.delegate.lock() = Some(delegate);
    }

    async fn data(&self, request: TransportRequest) -> Result<TransportResponse, TransportFailure> {
        self.inner.ensure_valid(&request)?;
        let cacheable =
            self.inner.config.mode == SessionMode::Cache && request.method == HttpMethod::Get;
        if cacheable {
            let hit = self.inner.cache.lock().get(&request.url).cloned();
            if let Some(hit) = hit {
                tracing::debug!(url = %request.url, "cache hit");
                return Ok(hit);
            }
        }

        let timeout = Duration::from_millis(self.inner.config.request_timeout_ms);
        let response = self
            .inner
            .request_builder(&request, timeout)?
            .send()
            .await
            .map_err(|e| map_reqwest_error(&e, Some(&request.url)))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| map_reqwest_error(&e, Some(&request.url)))?
            .to_vec();

        let response = TransportResponse {
            status,
            headers,
            body,
        };
        if cacheable && (200..300).contains(&status) {
            self.inner
                .cache
                .lock()
                .insert(request.url.clone(), response.clone());
        }
        Ok(response)
    }

    fn download_task(&self, request: TransportRequest) -> TaskId {
        self.inner.create_task(
            request,
            TaskKind::Download,
            Some(Job::Download(None)),
            TaskState::Suspended,
        )
    }

    fn resume_download(&self, resume_data: ResumeData) -> Result<TaskId, TransportFailure> {
        let token = ResumeToken::decode(&resume_data)?;
        if !is_partial_download(&token.partial) {
            return Err(TransportFailure::new(
                TransportFailure::BAD_URL,
                "resume data names a foreign file",
            ));
        }
        let request = token.request();
        Ok(self.inner.create_task(
            request,
            TaskKind::Download,
            Some(Job::Download(Some(token))),
            TaskState::Suspended,
        ))
    }

    fn discard_resume_data(&self, resume_data: &ResumeData) {
        match ResumeToken::decode(resume_data) {
            Ok(token) if is_partial_download(&token.partial) => remove_partial(&token.partial),
            Ok(token) => {
                tracing::warn!(path = %token.partial.display(), "resume data names a foreign file")
            }
            Err(e) => tracing::debug!(error = %e, "discarding undecodable resume data"),
        }
    }

    fn upload_task(&self, request: TransportRequest, source: UploadSource) -> TaskId {
        self.inner.create_task(
            request,
            TaskKind::Upload,
            Some(Job::Upload(source)),
            TaskState::Suspended,
        )
    }

    async fn websocket_task(
        &self,
        request: TransportRequest,
    ) -> Result<Arc<dyn WebSocketTask>, TransportFailure> {
        self.inner.ensure_valid(&request)?;
        let url = request.url.clone();
        let mut ws_request = url.as_str().into_client_request().map_err(|e| {
            TransportFailure::new(TransportFailure::BAD_URL, e.to_string()).with_url(url.clone())
        })?;
        for (name, value) in &request.headers {
            match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
                (Ok(name), Ok(value)) => {
                    ws_request.headers_mut().insert(name, value);
                }
                _ => tracing::warn!(header = %name, "skipping invalid websocket header"),
            }
        }

        let connector = Connector::Rustls(Arc::clone(&self.inner.tls));
        let connect = tokio_tungstenite::connect_async_tls_with_config(
            ws_request,
            None,
            false,
            Some(connector),
        );
        let (stream, response) =
            tokio::time::timeout(Duration::from_millis(self.inner.config.connect_timeout_ms), connect)
                .await
                .map_err(|_| {
                    TransportFailure::new(TransportFailure::TIMED_OUT, "websocket connect timed out")
                        .with_url(url.clone())
                })?
                .map_err(|e| {
                    TransportFailure::new(TransportFailure::CANNOT_CONNECT, e.to_string())
                        .with_domain("tungstenite")
                        .with_url(url.clone())
                })?;
        let protocol = response
            .headers()
            .get("sec-websocket-protocol")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let id = self
            .inner
            .create_task(request, TaskKind::WebSocket, None, TaskState::Running);
        let info = self.inner.task(id).ok_or_else(|| {
            TransportFailure::new(TransportFailure::BAD_SERVER_RESPONSE, "socket task vanished")
        })?;

        let inner = Arc::clone(&self.inner);
        let socket = TungsteniteSocket::new(
            info,
            stream,
            Box::new(move |task, code, reason| {
                inner.tasks.lock().remove(&task.id);
                let delegate = inner.delegate.lock().clone();
                if let Some(delegate) = delegate {
                    delegate.websocket_did_close(task, code, reason);
                }
            }),
        );

        self.inner
            .notify(id, |d, _, t| d.websocket_did_open(t, protocol.as_deref()));
        Ok(socket)
    }

    fn tasks(&self) -> Vec<TaskInfo> {
        let mut tasks: Vec<TaskInfo> = self
            .inner
            .tasks
            .lock()
            .values()
            .map(|slot| slot.info.clone())
            .collect();
        tasks.sort_by_key(|task| task.id);
        tasks
    }

    fn resume(&self, id: TaskId) {
        if self.inner.invalidated.load(Ordering::SeqCst) {
            self.inner.finish(id, Some(TransportFailure::cancelled()));
            return;
        }
        let job = {
            let mut tasks = self.inner.tasks.lock();
            let Some(slot) = tasks.get_mut(&id) else {
                return;
            };
            if slot.info.state != TaskState::Suspended {
                return;
            }
            slot.info.state = TaskState::Running;
            slot.gate.send_replace(true);
            slot.job.take()
        };
        if let Some(job) = job {
            self.inner.start(id, job);
        }
    }

    fn suspend(&self, id: TaskId) {
        let mut tasks = self.inner.tasks.lock();
        if let Some(slot) = tasks.get_mut(&id) {
            let transfer = matches!(slot.info.kind, TaskKind::Upload | TaskKind::Download);
            if transfer && slot.info.state == TaskState::Running {
                slot.info.state = TaskState::Suspended;
                slot.gate.send_replace(false);
            }
        }
    }

    fn cancel(&self, id: TaskId) {
        let (abort, url) = {
            let mut tasks = self.inner.tasks.lock();
            let Some(slot) = tasks.get_mut(&id) else {
                return;
            };
            if !matches!(slot.info.state, TaskState::Running | TaskState::Suspended) {
                return;
            }
            slot.gate.send_replace(false);
            (slot.abort.take(), slot.info.original_request.url.clone())
        };
        if let Some(abort) = abort {
            abort.abort();
        }
        self.inner
            .finish(id, Some(TransportFailure::cancelled().with_url(url)));
    }

    fn invalidate_and_cancel(&self) {
        self.inner.invalidated.store(true, Ordering::SeqCst);
        let live: Vec<TaskId> = self
            .inner
            .tasks
            .lock()
            .values()
            .filter(|slot| matches!(slot.info.state, TaskState::Running | TaskState::Suspended))
            .map(|slot| slot.info.id)
            .collect();
        tracing::info!(tasks = live.len(), "invalidating http transport");
        for id in live {
            self.cancel(id);
        }
    }

    fn remove_cached_response(&self, request: &TransportRequest) {
        self.inner.cache.lock().remove(&request.url);
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("mode", &self.inner.config.mode)
            .finish_non_exhaustive()
    }
}

// INLINE_TEST_REQUIRED: Tests private resume token encoding
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resume_token_restores_request() {
        let mut request = TransportRequest::get("https://files.example.com/a.bin");
        request.set_header("Authorization", "Bearer t");
        let data = ResumeToken::encode(&request, 512, Path::new("/tmp/a.part")).unwrap();

        let token = ResumeToken::decode(&data).unwrap();
        assert_eq!(token.received, 512);
        assert_eq!(token.partial, PathBuf::from("/tmp/a.part"));
        assert_eq!(token.request(), request);
    }

    #[test]
    fn test_garbage_resume_data_is_rejected() {
        let error = ResumeToken::decode(&ResumeData::new(vec![0xff; 3])).unwrap_err();
        assert_eq!(error.code, TransportFailure::BAD_URL);
    }

    #[tokio::test]
    async fn test_invalidated_transport_refuses_calls() {
        let transport = HttpTransport::new(SessionConfig::default()).unwrap();
        transport.invalidate_and_cancel();

        let failure = transport
            .data(TransportRequest::get("https://example.com"))
            .await
            .unwrap_err();
        assert!(failure.is_cancellation());
    }

    #[tokio::test]
    async fn test_suspended_download_is_listed_until_cancelled() {
        let transport = HttpTransport::new(SessionConfig::default()).unwrap();
        let id = transport.download_task(TransportRequest::get("https://example.com/f"));
        assert_eq!(transport.tasks()[0].state, TaskState::Suspended);

        transport.cancel(id);
        assert!(transport.tasks().is_empty());
    }

    fn partial_in(dir: &Path) -> PathBuf {
        let path = dir.join(format!("{}left{}", PARTIAL_PREFIX, PARTIAL_SUFFIX));
        std::fs::write(&path, b"half").unwrap();
        path
    }

    #[tokio::test]
    async fn test_cancelled_unstarted_resume_removes_partial() {
        let dir = tempfile::tempdir().unwrap();
        let path = partial_in(dir.path());
        let request = TransportRequest::get("https://example.com/f");
        let transport = HttpTransport::new(SessionConfig::default()).unwrap();

        let data = ResumeToken::encode(&request, 4, &path).unwrap();
        let id = transport.resume_download(data).unwrap();
        transport.cancel(id);

        assert!(!path.exists());
        assert!(transport.tasks().is_empty());
    }

    #[tokio::test]
    async fn test_discarded_resume_data_removes_partial() {
        let dir = tempfile::tempdir().unwrap();
        let path = partial_in(dir.path());
        let request = TransportRequest::get("https://example.com/f");
        let transport = HttpTransport::new(SessionConfig::default()).unwrap();

        transport.discard_resume_data(&ResumeToken::encode(&request, 4, &path).unwrap());

        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_resume_rejects_foreign_file() {
        let request = TransportRequest::get("https://example.com/f");
        let transport = HttpTransport::new(SessionConfig::default()).unwrap();

        let data = ResumeToken::encode(&request, 4, Path::new("/etc/hosts")).unwrap();
        let failure = transport.resume_download(data).unwrap_err();

        assert_eq!(failure.code, TransportFailure::BAD_URL);
        assert!(transport.tasks().is_empty());
    }

    #[tokio::test]
    async fn test_discard_leaves_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"keep").unwrap();
        let request = TransportRequest::get("https://example.com/f");
        let transport = HttpTransport::new(SessionConfig::default()).unwrap();

        transport.discard_resume_data(&ResumeToken::encode(&request, 4, &path).unwrap());

        assert!(path.exists());
    }
}
