// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Result Streams
//!
//! Caller-facing streams. Each stream is finite: once it yields a terminal
//! item (a completion or any error) it yields nothing further.

use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

use crate::error::NetworkError;
use crate::transport::{SocketMessage, TaskId};

/// Byte progress of a transfer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransferProgress {
    /// Completed share in `[0, 1]`.
    Fraction(f32),
    /// Total size unknown.
    Indeterminate { bytes_transferred: u64 },
}

impl TransferProgress {
    pub fn from_bytes(transferred: u64, expected: Option<u64>) -> Self {
        match expected {
            Some(total) if total > 0 => {
                let fraction = (transferred as f64 / total as f64).clamp(0.0, 1.0);
                TransferProgress::Fraction(fraction as f32)
            }
            _ => TransferProgress::Indeterminate {
                bytes_transferred: transferred,
            },
        }
    }
}

/// One item of an upload or download stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent<T> {
    Progress(TransferProgress),
    /// Terminal success. Always the last item.
    Completed(T),
}

impl<T> ProgressEvent<T> {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProgressEvent::Completed(_))
    }
}

pub(crate) type TaskItem<T> = Result<ProgressEvent<T>, NetworkError>;
pub(crate) type TaskSender<T> = mpsc::UnboundedSender<TaskItem<T>>;

/// Progress stream of one upload or download task.
#[derive(Debug)]
pub struct TaskStream<T> {
    task_id: Option<TaskId>,
    receiver: mpsc::UnboundedReceiver<TaskItem<T>>,
    done: bool,
}

/// Completes with the final file location.
pub type DownloadStream = TaskStream<PathBuf>;
/// Completes with the server response body.
pub type UploadStream = TaskStream<Vec<u8>>;

impl<T> TaskStream<T> {
    pub(crate) fn channel(task_id: TaskId) -> (TaskSender<T>, Self) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            sender,
            TaskStream {
                task_id: Some(task_id),
                receiver,
                done: false,
            },
        )
    }

    /// A stream whose only item is `error`; no task was created.
    pub(crate) fn failed(error: NetworkError) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let _ = sender.send(Err(error));
        TaskStream {
            task_id: None,
            receiver,
            done: false,
        }
    }

    /// Task the stream was created for. Stays the same across a resumed attempt.
    pub fn task_id(&self) -> Option<TaskId> {
        self.task_id
    }

    pub async fn next_event(&mut self) -> Option<TaskItem<T>> {
        if self.done {
            return None;
        }
        let item = self.receiver.recv().await;
        self.observe(&item);
        item
    }

    /// Skips progress and returns the terminal result.
    pub async fn completion(mut self) -> Result<T, NetworkError> {
        while let Some(item) = self.next_event().await {
            match item {
                Ok(ProgressEvent::Progress(_)) => continue,
                Ok(ProgressEvent::Completed(value)) => return Ok(value),
                Err(e) => return Err(e),
            }
        }
        Err(NetworkError::unknown_response())
    }

    fn observe(&mut self, item: &Option<TaskItem<T>>) {
        match item {
            Some(Ok(event)) if !event.is_terminal() => {}
            _ => {
                self.done = true;
                self.receiver.close();
            }
        }
    }
}

impl<T> Stream for TaskStream<T> {
    type Item = TaskItem<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.done {
            return Poll::Ready(None);
        }
        let polled = self.receiver.poll_recv(cx);
        if let Poll::Ready(item) = &polled {
            self.observe(item);
        }
        polled
    }
}

/// Stream of successes ending at the first error.
#[derive(Debug)]
pub struct ResultStream<I> {
    receiver: mpsc::UnboundedReceiver<Result<I, NetworkError>>,
    done: bool,
}

/// Bodies of a serial batch, in request order.
pub type BatchStream = ResultStream<Vec<u8>>;
/// Inbound WebSocket messages.
pub type SocketStream = ResultStream<SocketMessage>;

impl<I> ResultStream<I> {
    pub(crate) fn channel() -> (mpsc::UnboundedSender<Result<I, NetworkError>>, Self) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            sender,
            ResultStream {
                receiver,
                done: false,
            },
        )
    }

    pub async fn next_result(&mut self) -> Option<Result<I, NetworkError>> {
        if self.done {
            return None;
        }
        let item = self.receiver.recv().await;
        self.observe(&item);
        item
    }

    fn observe(&mut self, item: &Option<Result<I, NetworkError>>) {
        if !matches!(item, Some(Ok(_))) {
            self.done = true;
            self.receiver.close();
        }
    }
}

impl<I> Stream for ResultStream<I> {
    type Item = Result<I, NetworkError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.done {
            return Poll::Ready(None);
        }
        let polled = self.receiver.poll_recv(cx);
        if let Poll::Ready(item) = &polled {
            self.observe(item);
        }
        polled
    }
}
