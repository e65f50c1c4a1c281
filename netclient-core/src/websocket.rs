// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! WebSocket Channel
//!
//! Typed send/receive over a transport WebSocket task. The transport
//! delivers one frame per receive call, so the receive loop re-arms after
//! every message until a failure or an unrecognized frame ends it.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::AbortHandle;

use crate::descriptor::RequestDescriptor;
use crate::error::NetworkError;
use crate::executor::RequestExecutor;
use crate::logger::{log_failure, LogPrivacy, NetworkLogger};
use crate::stream::{ResultStream, SocketStream};
use crate::transport::{
    CloseCode, InboundFrame, SocketMessage, TaskId, TransportSession, WebSocketTask,
};

pub struct WebSocketChannel {
    task: Arc<dyn WebSocketTask>,
    url: String,
    logger: Option<Arc<dyn NetworkLogger>>,
    privacy: LogPrivacy,
    receive_loop: Mutex<Option<AbortHandle>>,
}

impl WebSocketChannel {
    /// Opens a socket for `descriptor`.
    pub async fn open<D: RequestDescriptor>(
        transport: &dyn TransportSession,
        executor: &RequestExecutor,
        descriptor: &D,
        logger: Option<Arc<dyn NetworkLogger>>,
        privacy: LogPrivacy,
    ) -> Result<Self, NetworkError> {
        let request = executor.prepare(descriptor)?;
        let url = request.url.clone();
        let task = transport.websocket_task(request).await.map_err(|failure| {
            let error = NetworkError::from_transport_failure(&failure);
            log_failure(logger.as_deref(), &url, &error, privacy);
            error
        })?;
        tracing::debug!(task_id = %task.id(), "websocket task opened");

        Ok(WebSocketChannel {
            task,
            url,
            logger,
            privacy,
            receive_loop: Mutex::new(None),
        })
    }

    pub fn task_id(&self) -> TaskId {
        self.task.id()
    }

    /// Sends one message. Completes exactly once.
    pub async fn send(&self, message: SocketMessage) -> Result<(), NetworkError> {
        self.task.send(message).await.map_err(|failure| {
            let error = NetworkError::from_transport_failure(&failure);
            log_failure(self.logger.as_deref(), &self.url, &error, self.privacy);
            error
        })
    }

    /// Continuous stream of inbound messages.
    ///
    /// Only one receive loop runs per channel; a second call while one is
    /// active yields a stream holding a single socket error.
    pub fn receive_stream(&self) -> SocketStream {
        let (tx, stream) = ResultStream::channel();

        let mut receive_loop = self.receive_loop.lock();
        if receive_loop.as_ref().is_some_and(|handle| !handle.is_finished()) {
            let _ = tx.send(Err(NetworkError::socket("receive stream already active")));
            return stream;
        }
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                let _ = tx.send(Err(NetworkError::socket(e.to_string())));
                return stream;
            }
        };

        let task = Arc::clone(&self.task);
        let logger = self.logger.clone();
        let url = self.url.clone();
        let privacy = self.privacy;
        let join = handle.spawn(async move {
            loop {
                let received = tokio::select! {
                    received = task.receive() => received,
                    _ = tx.closed() => return,
                };
                let error = match received {
                    Ok(InboundFrame::Message(message)) => {
                        if tx.send(Ok(message)).is_err() {
                            return;
                        }
                        continue;
                    }
                    Ok(InboundFrame::Unrecognized(kind)) => {
                        tracing::warn!(task_id = %task.id(), %kind, "unrecognized websocket frame");
                        NetworkError::unknown()
                    }
                    Err(failure) => NetworkError::from_transport_failure(&failure),
                };
                log_failure(logger.as_deref(), &url, &error, privacy);
                let _ = tx.send(Err(error));
                return;
            }
        });
        *receive_loop = Some(join.abort_handle());
        stream
    }

    /// Closes the socket and stops the receive loop.
    pub async fn close(&self, code: CloseCode, reason: Option<String>) {
        let receive_loop = self.receive_loop.lock().take();
        if let Some(handle) = receive_loop {
            handle.abort();
        }
        tracing::debug!(task_id = %self.task.id(), code = code.value(), "closing websocket");
        self.task.close(code, reason).await;
    }
}

impl std::fmt::Debug for WebSocketChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketChannel")
            .field("task_id", &self.task.id())
            .finish_non_exhaustive()
    }
}
