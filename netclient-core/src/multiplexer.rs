// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Session Event Multiplexer
//!
//! Receives the transport's callbacks and republishes them as one progress
//! stream per upload/download task, plus a session-wide broadcast feed.
//!
//! Per-task state machine: `started → progressing* → completed | failed`.
//! A failed download carrying resume data is restarted once under a new
//! transport task; its entry (and stream) moves to the new id, so the
//! caller keeps reading the same stream. The entry is removed when the
//! terminal item is sent, and later callbacks for that task are ignored,
//! so every stream gets exactly one terminal item.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::error::{ErrorCatalog, NetworkError};
use crate::logger::{log_failure, LogPrivacy, NetworkLogger};
use crate::pinning::CertificatePinningValidator;
use crate::stream::{
    DownloadStream, ProgressEvent, TaskSender, TaskStream, TransferProgress, UploadStream,
};
use crate::transport::{
    AuthChallenge, AuthMethod, ChallengeCompletion, ChallengeDisposition, CloseCode, Direction,
    SessionDelegate, TaskId, TaskInfo, TransportFailure, TransportSession,
};

const EVENT_FEED_CAPACITY: usize = 256;

/// Session-wide observation of task and socket lifecycle.
///
/// `task_id` is always the id the task's stream was created with.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Progress {
        task_id: TaskId,
        direction: Direction,
        progress: TransferProgress,
    },
    Completed {
        task_id: TaskId,
        direction: Direction,
    },
    Failed {
        task_id: TaskId,
        direction: Direction,
        error: NetworkError,
    },
    /// A failed download continues as transport task `attempt`.
    Resumed {
        task_id: TaskId,
        attempt: TaskId,
    },
    SocketOpened {
        task_id: TaskId,
        protocol: Option<String>,
    },
    SocketClosed {
        task_id: TaskId,
        code: CloseCode,
        reason: Option<String>,
    },
    BackgroundEventsFinished,
}

enum EntrySender {
    Download(TaskSender<PathBuf>),
    Upload(TaskSender<Vec<u8>>),
}

struct TaskEntry {
    origin: TaskId,
    sender: EntrySender,
    /// Set once at registration.
    destination: Option<PathBuf>,
    resumed: bool,
    status: Option<u16>,
    body: Vec<u8>,
}

impl TaskEntry {
    fn direction(&self) -> Direction {
        match self.sender {
            EntrySender::Download(_) => Direction::Download,
            EntrySender::Upload(_) => Direction::Upload,
        }
    }

    // Send errors mean the caller dropped the stream.
    fn send_progress(&self, progress: TransferProgress) {
        match &self.sender {
            EntrySender::Download(tx) => {
                let _ = tx.send(Ok(ProgressEvent::Progress(progress)));
            }
            EntrySender::Upload(tx) => {
                let _ = tx.send(Ok(ProgressEvent::Progress(progress)));
            }
        }
    }

    fn send_failure(&self, error: NetworkError) {
        match &self.sender {
            EntrySender::Download(tx) => {
                let _ = tx.send(Err(error));
            }
            EntrySender::Upload(tx) => {
                let _ = tx.send(Err(error));
            }
        }
    }
}

type EventsFinishedHook = Arc<dyn Fn() + Send + Sync>;

/// Implements [`SessionDelegate`] for one session.
pub struct SessionEventMultiplexer {
    validator: Arc<CertificatePinningValidator>,
    catalog: Arc<ErrorCatalog>,
    logger: Option<Arc<dyn NetworkLogger>>,
    privacy: LogPrivacy,
    entries: Mutex<HashMap<TaskId, TaskEntry>>,
    feed: broadcast::Sender<SessionEvent>,
    events_finished: Mutex<Option<EventsFinishedHook>>,
}

impl SessionEventMultiplexer {
    pub fn new(
        validator: Arc<CertificatePinningValidator>,
        catalog: Arc<ErrorCatalog>,
        logger: Option<Arc<dyn NetworkLogger>>,
        privacy: LogPrivacy,
    ) -> Self {
        let (feed, _) = broadcast::channel(EVENT_FEED_CAPACITY);
        SessionEventMultiplexer {
            validator,
            catalog,
            logger,
            privacy,
            entries: Mutex::new(HashMap::new()),
            feed,
            events_finished: Mutex::new(None),
        }
    }

    /// Registers a download task before it is resumed.
    pub fn register_download(&self, task_id: TaskId, destination: Option<PathBuf>) -> DownloadStream {
        let (sender, stream) = TaskStream::channel(task_id);
        self.insert(task_id, EntrySender::Download(sender), destination);
        stream
    }

    /// Registers an upload task before it is resumed.
    pub fn register_upload(&self, task_id: TaskId) -> UploadStream {
        let (sender, stream) = TaskStream::channel(task_id);
        self.insert(task_id, EntrySender::Upload(sender), None);
        stream
    }

    fn insert(&self, task_id: TaskId, sender: EntrySender, destination: Option<PathBuf>) {
        let entry = TaskEntry {
            origin: task_id,
            sender,
            destination,
            resumed: false,
            status: None,
            body: Vec::new(),
        };
        if self.entries.lock().insert(task_id, entry).is_some() {
            tracing::warn!(%task_id, "task registered twice, previous stream dropped");
        }
    }

    /// Subscribes to the session-wide event feed.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.feed.subscribe()
    }

    /// Number of tasks that have not reached a terminal item.
    pub fn active_tasks(&self) -> usize {
        self.entries.lock().len()
    }

    /// Terminates every open stream with `error`.
    pub fn fail_all(&self, error: NetworkError) {
        let drained: Vec<TaskEntry> = self.entries.lock().drain().map(|(_, e)| e).collect();
        for entry in drained {
            entry.send_failure(error.clone());
            self.broadcast(SessionEvent::Failed {
                task_id: entry.origin,
                direction: entry.direction(),
                error: error.clone(),
            });
        }
    }

    pub fn set_events_finished_hook<F>(&self, hook: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *self.events_finished.lock() = Some(Arc::new(hook));
    }

    fn broadcast(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.feed.send(event);
    }

    fn progress(&self, task: &TaskInfo, transferred: u64, expected: Option<u64>) {
        let progress = TransferProgress::from_bytes(transferred, expected);
        let observed = {
            let entries = self.entries.lock();
            entries.get(&task.id).map(|entry| {
                entry.send_progress(progress);
                (entry.origin, entry.direction())
            })
        };
        if let Some((task_id, direction)) = observed {
            self.broadcast(SessionEvent::Progress {
                task_id,
                direction,
                progress,
            });
        }
    }

    fn terminate(&self, entry: TaskEntry, error: NetworkError) {
        entry.send_failure(error.clone());
        self.broadcast(SessionEvent::Failed {
            task_id: entry.origin,
            direction: entry.direction(),
            error,
        });
    }

    fn status_error(&self, status: Option<u16>) -> Option<NetworkError> {
        status.and_then(|status| NetworkError::from_http_status(status, &self.catalog))
    }

    /// Restarts a failed download once. Returns the entry back if no
    /// resumed attempt was started.
    fn try_resume(
        &self,
        session: &dyn TransportSession,
        task: &TaskInfo,
        failure: &TransportFailure,
        entry: TaskEntry,
    ) -> Option<TaskEntry> {
        let eligible = entry.direction() == Direction::Download
            && !entry.resumed
            && !failure.is_cancellation();
        let resume_data = match (&failure.resume_data, eligible) {
            (Some(data), true) => data.clone(),
            _ => return Some(entry),
        };

        let attempt = match session.resume_download(resume_data) {
            Ok(attempt) => attempt,
            Err(e) => {
                tracing::warn!(task_id = %task.id, error = %e, "download resume rejected");
                return Some(entry);
            }
        };

        let origin = entry.origin;
        let mut entry = entry;
        entry.resumed = true;
        entry.status = None;
        self.entries.lock().insert(attempt, entry);

        tracing::info!(task_id = %origin, %attempt, "resuming failed download");
        self.broadcast(SessionEvent::Resumed {
            task_id: origin,
            attempt,
        });
        session.resume(attempt);
        None
    }

    fn complete_without_failure(&self, task: &TaskInfo) {
        let Some(entry) = self.entries.lock().remove(&task.id) else {
            return;
        };
        let direction = entry.direction();

        if let Some(error) = self.status_error(entry.status) {
            log_failure(self.logger.as_deref(), &task.original_request.url, &error, self.privacy);
            self.terminate(entry, error);
            return;
        }

        if let EntrySender::Upload(tx) = &entry.sender {
            let _ = tx.send(Ok(ProgressEvent::Completed(entry.body.clone())));
            self.broadcast(SessionEvent::Completed {
                task_id: entry.origin,
                direction,
            });
            return;
        }

        // Finished downloads are delivered and removed on
        // did_finish_downloading, so reaching here means no file.
        let error = NetworkError::incomplete_transfer(direction);
        log_failure(self.logger.as_deref(), &task.original_request.url, &error, self.privacy);
        self.terminate(entry, error);
    }
}

impl SessionDelegate for SessionEventMultiplexer {
    fn did_receive_challenge(&self, challenge: AuthChallenge, completion: ChallengeCompletion) {
        match (challenge.method, challenge.trust) {
            (AuthMethod::ServerTrust, Some(trust)) => {
                self.validator.evaluate_async(trust, move |trusted| {
                    completion(if trusted {
                        ChallengeDisposition::UseCredential
                    } else {
                        ChallengeDisposition::CancelChallenge
                    })
                });
            }
            (AuthMethod::ServerTrust, None) => {
                tracing::warn!(host = %challenge.host, "server trust challenge without a chain");
                completion(ChallengeDisposition::CancelChallenge);
            }
            (method, _) => {
                if self.validator.is_pinning() {
                    tracing::debug!(?method, "cancelling non server-trust challenge under pinning");
                    completion(ChallengeDisposition::CancelChallenge);
                } else {
                    completion(ChallengeDisposition::PerformDefaultHandling);
                }
            }
        }
    }

    fn did_write_data(
        &self,
        _session: &dyn TransportSession,
        task: &TaskInfo,
        total_written: u64,
        total_expected: Option<u64>,
    ) {
        self.progress(task, total_written, total_expected);
    }

    fn did_finish_downloading(&self, _session: &dyn TransportSession, task: &TaskInfo, location: &Path) {
        let Some(entry) = self.entries.lock().remove(&task.id) else {
            return;
        };

        if let Some(error) = self.status_error(entry.status) {
            let _ = fs::remove_file(location);
            log_failure(self.logger.as_deref(), &task.original_request.url, &error, self.privacy);
            self.terminate(entry, error);
            return;
        }

        let delivered = match &entry.destination {
            None => Ok(location.to_path_buf()),
            Some(destination) => move_or_replace(location, destination).map(|()| destination.clone()),
        };

        match delivered {
            Ok(path) => {
                tracing::debug!(task_id = %entry.origin, path = %path.display(), "download delivered");
                if let EntrySender::Download(tx) = &entry.sender {
                    let _ = tx.send(Ok(ProgressEvent::Completed(path)));
                }
                self.broadcast(SessionEvent::Completed {
                    task_id: entry.origin,
                    direction: Direction::Download,
                });
            }
            Err(e) => {
                let error = NetworkError::from_filesystem_error(&e);
                log_failure(self.logger.as_deref(), &task.original_request.url, &error, self.privacy);
                self.terminate(entry, error);
            }
        }
    }

    fn did_send_body_data(
        &self,
        _session: &dyn TransportSession,
        task: &TaskInfo,
        total_sent: u64,
        total_expected: Option<u64>,
    ) {
        self.progress(task, total_sent, total_expected);
    }

    fn did_receive_response(&self, _session: &dyn TransportSession, task: &TaskInfo, status: u16) {
        if let Some(entry) = self.entries.lock().get_mut(&task.id) {
            entry.status = Some(status);
        }
    }

    fn did_receive_data(&self, _session: &dyn TransportSession, task: &TaskInfo, data: &[u8]) {
        if let Some(entry) = self.entries.lock().get_mut(&task.id) {
            entry.body.extend_from_slice(data);
        }
    }

    fn did_complete(
        &self,
        session: &dyn TransportSession,
        task: &TaskInfo,
        failure: Option<TransportFailure>,
    ) {
        let Some(failure) = failure else {
            self.complete_without_failure(task);
            return;
        };

        let Some(entry) = self.entries.lock().remove(&task.id) else {
            return;
        };

        let error = if failure.is_cancellation() {
            NetworkError::cancelled()
        } else {
            NetworkError::from_task_failure(entry.direction(), &failure)
        };
        log_failure(self.logger.as_deref(), &task.original_request.url, &error, self.privacy);

        if let Some(entry) = self.try_resume(session, task, &failure, entry) {
            if let Some(data) = &failure.resume_data {
                session.discard_resume_data(data);
            }
            self.terminate(entry, error);
        }
    }

    fn websocket_did_open(&self, task: &TaskInfo, protocol: Option<&str>) {
        tracing::info!(task_id = %task.id, protocol, "websocket opened");
        self.broadcast(SessionEvent::SocketOpened {
            task_id: task.id,
            protocol: protocol.map(str::to_string),
        });
    }

    fn websocket_did_close(&self, task: &TaskInfo, code: CloseCode, reason: Option<&str>) {
        tracing::info!(task_id = %task.id, code = code.value(), reason, "websocket closed");
        self.broadcast(SessionEvent::SocketClosed {
            task_id: task.id,
            code,
            reason: reason.map(str::to_string),
        });
    }

    fn did_finish_events(&self) {
        self.broadcast(SessionEvent::BackgroundEventsFinished);
        let hook = self.events_finished.lock().clone();
        if let Some(hook) = hook {
            hook();
        }
    }
}

/// Moves `from` to `to`, replacing any existing file.
fn move_or_replace(from: &Path, to: &Path) -> io::Result<()> {
    if to.exists() {
        fs::remove_file(to)?;
    }
    if let Some(parent) = to.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    if fs::rename(from, to).is_err() {
        // Cross-device rename.
        fs::copy(from, to)?;
        let _ = fs::remove_file(from);
    }
    Ok(())
}
