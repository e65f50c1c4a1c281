// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! WebSocket task over tokio-tungstenite.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex as AsyncMutex;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WsCloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use super::{
    CloseCode, InboundFrame, SocketMessage, TaskId, TaskInfo, TransportFailure, WebSocketTask,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Called once when the socket closes, from either side.
pub(super) type CloseHook = Box<dyn Fn(&TaskInfo, CloseCode, Option<&str>) + Send + Sync>;

pub(super) struct TungsteniteSocket {
    info: TaskInfo,
    sink: AsyncMutex<SplitSink<WsStream, Message>>,
    stream: AsyncMutex<SplitStream<WsStream>>,
    on_close: parking_lot::Mutex<Option<CloseHook>>,
}

impl TungsteniteSocket {
    pub(super) fn new(info: TaskInfo, socket: WsStream, on_close: CloseHook) -> Arc<Self> {
        let (sink, stream) = socket.split();
        Arc::new(TungsteniteSocket {
            info,
            sink: AsyncMutex::new(sink),
            stream: AsyncMutex::new(stream),
            on_close: parking_lot::Mutex::new(Some(on_close)),
        })
    }

    fn closed(&self, code: CloseCode, reason: Option<&str>) {
        let hook = self.on_close.lock().take();
        if let Some(hook) = hook {
            hook(&self.info, code, reason);
        }
    }

    fn failure(&self, error: tungstenite::Error) -> TransportFailure {
        let code = match error {
            tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
                TransportFailure::SOCKET_CLOSED
            }
            tungstenite::Error::Tls(_) => TransportFailure::SECURE_CONNECTION_FAILED,
            tungstenite::Error::Io(_) => TransportFailure::CONNECTION_LOST,
            _ => TransportFailure::BAD_SERVER_RESPONSE,
        };
        TransportFailure::new(code, error.to_string())
            .with_domain("tungstenite")
            .with_url(self.info.original_request.url.clone())
    }
}

#[async_trait]
impl WebSocketTask for TungsteniteSocket {
    fn id(&self) -> TaskId {
        self.info.id
    }

    async fn send(&self, message: SocketMessage) -> Result<(), TransportFailure> {
        let frame = match message {
            SocketMessage::Text(text) => Message::Text(text),
            SocketMessage::Binary(data) => Message::Binary(data),
        };
        let mut sink = self.sink.lock().await;
        sink.send(frame).await.map_err(|e| self.failure(e))
    }

    async fn receive(&self) -> Result<InboundFrame, TransportFailure> {
        let mut stream = self.stream.lock().await;
        loop {
            let frame = match stream.next().await {
                Some(Ok(frame)) => frame,
                Some(Err(e)) => return Err(self.failure(e)),
                None => {
                    self.closed(CloseCode::Abnormal, None);
                    return Err(self.failure(tungstenite::Error::ConnectionClosed));
                }
            };
            match frame {
                Message::Text(text) => return Ok(InboundFrame::Message(SocketMessage::Text(text))),
                Message::Binary(data) => {
                    return Ok(InboundFrame::Message(SocketMessage::Binary(data)))
                }
                // tungstenite queues the pong; a split sink only writes it on flush.
                Message::Ping(_) => {
                    if let Err(e) = self.sink.lock().await.flush().await {
                        tracing::debug!(task_id = %self.info.id, error = %e, "pong flush failed");
                    }
                    continue;
                }
                Message::Pong(_) => continue,
                Message::Close(frame) => {
                    let (code, reason) = match &frame {
                        Some(frame) => (
                            CloseCode::from_value(u16::from(frame.code)),
                            Some(frame.reason.to_string()),
                        ),
                        None => (CloseCode::NoStatusReceived, None),
                    };
                    self.closed(code, reason.as_deref());
                    return Err(self.failure(tungstenite::Error::ConnectionClosed));
                }
                Message::Frame(_) => return Ok(InboundFrame::Unrecognized("raw frame".into())),
            }
        }
    }

    async fn close(&self, code: CloseCode, reason: Option<String>) {
        let frame = CloseFrame {
            code: WsCloseCode::from(code.value()),
            reason: reason.clone().unwrap_or_default().into(),
        };
        let mut sink = self.sink.lock().await;
        if let Err(e) = sink.send(Message::Close(Some(frame))).await {
            tracing::debug!(task_id = %self.info.id, error = %e, "close frame not sent");
        }
        drop(sink);
        self.closed(code, reason.as_deref());
    }
}
