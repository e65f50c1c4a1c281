// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Mock Transport
//!
//! Scriptable [`TransportSession`] for tests. Plain calls are answered from
//! a queue; task callbacks are fired explicitly with the `emit_*` methods.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};

use super::{
    AuthChallenge, ChallengeDisposition, CloseCode, InboundFrame, ResumeData, SessionDelegate,
    SocketMessage, TaskId, TaskInfo, TaskKind, TaskState, TransportFailure, TransportRequest,
    TransportResponse, TransportSession, WebSocketTask,
};
use crate::descriptor::UploadSource;

const RESUME_PREFIX: &str = "mock-resume:";

#[derive(Default)]
struct MockState {
    next_id: u64,
    tasks: Vec<TaskInfo>,
    responses: VecDeque<Result<TransportResponse, TransportFailure>>,
    sent_requests: Vec<TransportRequest>,
    uploads: Vec<(TaskId, UploadSource)>,
    resume_attempts: Vec<ResumeData>,
    discarded: Vec<ResumeData>,
    purged: Vec<TransportRequest>,
    socket_error: Option<TransportFailure>,
    sockets: Vec<Arc<MockSocket>>,
    invalidated: bool,
}

impl MockState {
    fn create_task(&mut self, request: TransportRequest, kind: TaskKind) -> TaskId {
        self.next_id += 1;
        let id = TaskId(self.next_id);
        self.tasks.push(TaskInfo {
            id,
            kind,
            state: TaskState::Suspended,
            original_request: request,
        });
        id
    }

    fn task_mut(&mut self, id: TaskId) -> Option<&mut TaskInfo> {
        self.tasks.iter_mut().find(|task| task.id == id)
    }
}

/// Mock transport for testing.
#[derive(Default)]
pub struct MockTransport {
    state: Mutex<MockState>,
    delegate: Mutex<Option<Arc<dyn SessionDelegate>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the response of the next plain call.
    pub fn queue_response(&self, response: TransportResponse) {
        self.state.lock().responses.push_back(Ok(response));
    }

    /// Queues a failure for the next plain call.
    pub fn inject_error(&self, failure: TransportFailure) {
        self.state.lock().responses.push_back(Err(failure));
    }

    /// Makes the next `websocket_task` fail.
    pub fn inject_socket_error(&self, failure: TransportFailure) {
        self.state.lock().socket_error = Some(failure);
    }

    /// Requests seen by `data`, in call order.
    pub fn sent_requests(&self) -> Vec<TransportRequest> {
        self.state.lock().sent_requests.clone()
    }

    pub fn upload_source(&self, id: TaskId) -> Option<UploadSource> {
        self.state
            .lock()
            .uploads
            .iter()
            .find(|(task, _)| *task == id)
            .map(|(_, source)| source.clone())
    }

    pub fn resume_attempts(&self) -> usize {
        self.state.lock().resume_attempts.len()
    }

    /// Resume data the session gave up on.
    pub fn discarded_resume_data(&self) -> Vec<ResumeData> {
        self.state.lock().discarded.clone()
    }

    /// Requests whose cached response was dropped.
    pub fn purged_requests(&self) -> Vec<TransportRequest> {
        self.state.lock().purged.clone()
    }

    pub fn is_invalidated(&self) -> bool {
        self.state.lock().invalidated
    }

    pub fn task(&self, id: TaskId) -> Option<TaskInfo> {
        self.state.lock().tasks.iter().find(|t| t.id == id).cloned()
    }

    pub fn last_task(&self) -> Option<TaskInfo> {
        self.state.lock().tasks.last().cloned()
    }

    pub fn last_socket(&self) -> Option<Arc<MockSocket>> {
        self.state.lock().sockets.last().cloned()
    }

    /// Resume token the mock accepts to continue task `id`.
    pub fn resume_data_for(id: TaskId) -> ResumeData {
        ResumeData::new(format!("{}{}", RESUME_PREFIX, id.0).into_bytes())
    }

    fn delegate(&self) -> Option<Arc<dyn SessionDelegate>> {
        self.delegate.lock().clone()
    }

    // Delegate calls run with no lock held.
    fn with_task<F>(&self, id: TaskId, call: F)
    where
        F: FnOnce(&dyn SessionDelegate, &TaskInfo),
    {
        let task = self.task(id);
        if let (Some(delegate), Some(task)) = (self.delegate(), task) {
            call(delegate.as_ref(), &task);
        }
    }

    fn set_state(&self, id: TaskId, state: TaskState) {
        if let Some(task) = self.state.lock().task_mut(id) {
            task.state = state;
        }
    }

    pub fn emit_download_progress(&self, id: TaskId, written: u64, expected: Option<u64>) {
        self.with_task(id, |d, task| d.did_write_data(self, task, written, expected));
    }

    pub fn emit_upload_progress(&self, id: TaskId, sent: u64, expected: Option<u64>) {
        self.with_task(id, |d, task| d.did_send_body_data(self, task, sent, expected));
    }

    pub fn emit_response(&self, id: TaskId, status: u16) {
        self.with_task(id, |d, task| d.did_receive_response(self, task, status));
    }

    pub fn emit_data(&self, id: TaskId, data: &[u8]) {
        self.with_task(id, |d, task| d.did_receive_data(self, task, data));
    }

    pub fn emit_download_finished(&self, id: TaskId, location: &Path) {
        self.with_task(id, |d, task| d.did_finish_downloading(self, task, location));
    }

    /// Completes task `id`, successfully when `failure` is `None`.
    pub fn emit_complete(&self, id: TaskId, failure: Option<TransportFailure>) {
        let state = match &failure {
            Some(f) if f.is_cancellation() => TaskState::Canceled,
            _ => TaskState::Completed,
        };
        self.set_state(id, state);
        self.with_task(id, |d, task| d.did_complete(self, task, failure));
    }

    /// Fails task `id` with a resumable failure.
    pub fn emit_resumable_failure(&self, id: TaskId, code: i64) {
        let url = self.task(id).map(|t| t.original_request.url).unwrap_or_default();
        let failure = TransportFailure::new(code, "connection interrupted")
            .with_url(url)
            .with_resume_data(Self::resume_data_for(id));
        self.emit_complete(id, Some(failure));
    }

    /// Raises a challenge and returns the eventual decision.
    pub fn emit_challenge(&self, challenge: AuthChallenge) -> oneshot::Receiver<ChallengeDisposition> {
        let (tx, rx) = oneshot::channel();
        if let Some(delegate) = self.delegate() {
            delegate.did_receive_challenge(
                challenge,
                Box::new(move |disposition| {
                    let _ = tx.send(disposition);
                }),
            );
        }
        rx
    }

    pub fn emit_socket_open(&self, id: TaskId, protocol: Option<&str>) {
        self.with_task(id, |d, task| d.websocket_did_open(task, protocol));
    }

    pub fn emit_socket_close(&self, id: TaskId, code: CloseCode, reason: Option<&str>) {
        self.with_task(id, |d, task| d.websocket_did_close(task, code, reason));
    }

    pub fn emit_finish_events(&self) {
        if let Some(delegate) = self.delegate() {
            delegate.did_finish_events();
        }
    }

    fn cancel_with_callback(&self, id: TaskId) {
        let live = self
            .task(id)
            .is_some_and(|t| matches!(t.state, TaskState::Running | TaskState::Suspended));
        if live {
            self.emit_complete(id, Some(TransportFailure::cancelled()));
        }
    }
}

#[async_trait]
impl TransportSession for MockTransport {
    fn attach(&self, delegate: Arc<dyn SessionDelegate>) {
        *self.delegate.lock() = Some(delegate);
    }

    async fn data(&self, request: TransportRequest) -> Result<TransportResponse, TransportFailure> {
        let mut state = self.state.lock();
        state.sent_requests.push(request.clone());
        state.responses.pop_front().unwrap_or_else(|| {
            Err(TransportFailure::new(
                TransportFailure::BAD_SERVER_RESPONSE,
                "no scripted response",
            )
            .with_url(request.url))
        })
    }

    fn download_task(&self, request: TransportRequest) -> TaskId {
        self.state.lock().create_task(request, TaskKind::Download)
    }

    fn resume_download(&self, resume_data: ResumeData) -> Result<TaskId, TransportFailure> {
        let mut state = self.state.lock();
        state.resume_attempts.push(resume_data.clone());

        let original = std::str::from_utf8(resume_data.as_bytes())
            .ok()
            .and_then(|text| text.strip_prefix(RESUME_PREFIX))
            .and_then(|id| id.parse::<u64>().ok())
            .and_then(|id| state.tasks.iter().find(|t| t.id == TaskId(id)))
            .map(|t| t.original_request.clone())
            .ok_or_else(|| TransportFailure::new(TransportFailure::BAD_URL, "invalid resume data"))?;

        Ok(state.create_task(original, TaskKind::Download))
    }

    fn discard_resume_data(&self, resume_data: &ResumeData) {
        self.state.lock().discarded.push(resume_data.clone());
    }

    fn upload_task(&self, request: TransportRequest, source: UploadSource) -> TaskId {
        let mut state = self.state.lock();
        let id = state.create_task(request, TaskKind::Upload);
        state.uploads.push((id, source));
        id
    }

    async fn websocket_task(
        &self,
        request: TransportRequest,
    ) -> Result<Arc<dyn WebSocketTask>, TransportFailure> {
        let mut state = self.state.lock();
        if let Some(failure) = state.socket_error.take() {
            return Err(failure);
        }
        let id = state.create_task(request, TaskKind::WebSocket);
        if let Some(task) = state.task_mut(id) {
            task.state = TaskState::Running;
        }
        let socket = Arc::new(MockSocket::new(id));
        state.sockets.push(Arc::clone(&socket));
        Ok(socket)
    }

    fn tasks(&self) -> Vec<TaskInfo> {
        self.state.lock().tasks.clone()
    }

    fn resume(&self, id: TaskId) {
        let mut state = self.state.lock();
        if let Some(task) = state.task_mut(id) {
            if task.state == TaskState::Suspended {
                task.state = TaskState::Running;
            }
        }
    }

    fn suspend(&self, id: TaskId) {
        let mut state = self.state.lock();
        if let Some(task) = state.task_mut(id) {
            if task.state == TaskState::Running {
                task.state = TaskState::Suspended;
            }
        }
    }

    fn cancel(&self, id: TaskId) {
        self.cancel_with_callback(id);
    }

    fn invalidate_and_cancel(&self) {
        let ids: Vec<TaskId> = {
            let mut state = self.state.lock();
            state.invalidated = true;
            state.tasks.iter().map(|t| t.id).collect()
        };
        for id in ids {
            self.cancel_with_callback(id);
        }
    }

    fn remove_cached_response(&self, request: &TransportRequest) {
        self.state.lock().purged.push(request.clone());
    }
}

/// Scriptable WebSocket task.
pub struct MockSocket {
    id: TaskId,
    inbound_tx: mpsc::UnboundedSender<Result<InboundFrame, TransportFailure>>,
    inbound_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Result<InboundFrame, TransportFailure>>>,
    sent: Mutex<Vec<SocketMessage>>,
    send_error: Mutex<Option<TransportFailure>>,
    closed: Mutex<Option<(CloseCode, Option<String>)>>,
}

impl MockSocket {
    fn new(id: TaskId) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        MockSocket {
            id,
            inbound_tx,
            inbound_rx: tokio::sync::Mutex::new(inbound_rx),
            sent: Mutex::new(Vec::new()),
            send_error: Mutex::new(None),
            closed: Mutex::new(None),
        }
    }

    /// Delivers `frame` to the next `receive`.
    pub fn push_frame(&self, frame: InboundFrame) {
        let _ = self.inbound_tx.send(Ok(frame));
    }

    pub fn push_failure(&self, failure: TransportFailure) {
        let _ = self.inbound_tx.send(Err(failure));
    }

    /// Makes the next `send` fail.
    pub fn inject_send_error(&self, failure: TransportFailure) {
        *self.send_error.lock() = Some(failure);
    }

    pub fn sent_messages(&self) -> Vec<SocketMessage> {
        self.sent.lock().clone()
    }

    pub fn close_status(&self) -> Option<(CloseCode, Option<String>)> {
        self.closed.lock().clone()
    }
}

#[async_trait]
impl WebSocketTask for MockSocket {
    fn id(&self) -> TaskId {
        self.id
    }

    async fn send(&self, message: SocketMessage) -> Result<(), TransportFailure> {
        if let Some(failure) = self.send_error.lock().take() {
            return Err(failure);
        }
        self.sent.lock().push(message);
        Ok(())
    }

    async fn receive(&self) -> Result<InboundFrame, TransportFailure> {
        if self.closed.lock().is_some() {
            return Err(TransportFailure::new(TransportFailure::SOCKET_CLOSED, "socket closed"));
        }
        let mut inbound = self.inbound_rx.lock().await;
        match inbound.recv().await {
            Some(frame) => frame,
            None => Err(TransportFailure::new(TransportFailure::SOCKET_CLOSED, "socket closed")),
        }
    }

    async fn close(&self, code: CloseCode, reason: Option<String>) {
        *self.closed.lock() = Some((code, reason));
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MockTransport")
            .field("tasks", &state.tasks.len())
            .field("queued_responses", &state.responses.len())
            .finish()
    }
}
