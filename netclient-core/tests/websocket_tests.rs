// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Tests for websocket
//! WebSocket channel over MockSocket.

mod common;

use std::time::Duration;

use common::fixtures::{ApiCall, Harness};
use netclient_core::*;

fn chat() -> ApiCall {
    ApiCall::get("/chat").with_base("wss://socket.example.com")
}

async fn next(stream: &mut SocketStream) -> Option<Result<SocketMessage, NetworkError>> {
    tokio::time::timeout(Duration::from_secs(5), stream.next_result())
        .await
        .expect("socket stream stalled")
}

#[tokio::test]
async fn test_open_creates_running_socket_task() {
    let harness = Harness::new();

    let channel = harness.session.websocket(&chat()).await.unwrap();

    let task = harness.transport.task(channel.task_id()).unwrap();
    assert_eq!(task.kind, TaskKind::WebSocket);
    assert_eq!(task.state, TaskState::Running);
    assert_eq!(task.original_request.url, "wss://socket.example.com/chat");
}

#[tokio::test]
async fn test_open_failure_is_normalized_and_logged() {
    let harness = Harness::new();
    harness.transport.inject_socket_error(
        TransportFailure::new(TransportFailure::CANNOT_CONNECT, "refused").with_domain("tungstenite"),
    );

    let error = harness.session.websocket(&chat()).await.unwrap_err();

    assert_eq!(error.code.value(), TransportFailure::CANNOT_CONNECT);
    assert_eq!(error.title, ErrorTitle::Custom("tungstenite".into()));
    assert_eq!(harness.logger.entries().len(), 1);
}

#[tokio::test]
async fn test_open_without_connectivity_creates_no_task() {
    let harness = Harness::new();
    harness.connectivity.set(false);

    let error = harness.session.websocket(&chat()).await.unwrap_err();

    assert_eq!(error.code, ErrorCode::NoInternet);
    assert!(harness.transport.tasks().is_empty());
}

#[tokio::test]
async fn test_send_delivers_messages_in_order() {
    let harness = Harness::new();
    let channel = harness.session.websocket(&chat()).await.unwrap();

    channel.send(SocketMessage::Text("hello".into())).await.unwrap();
    channel.send(SocketMessage::Binary(vec![1, 2])).await.unwrap();

    let socket = harness.transport.last_socket().unwrap();
    assert_eq!(
        socket.sent_messages(),
        vec![SocketMessage::Text("hello".into()), SocketMessage::Binary(vec![1, 2])]
    );
}

#[tokio::test]
async fn test_send_failure_is_reported() {
    let harness = Harness::new();
    let channel = harness.session.websocket(&chat()).await.unwrap();
    let socket = harness.transport.last_socket().unwrap();
    socket.inject_send_error(TransportFailure::new(TransportFailure::SOCKET_CLOSED, "closed"));

    let error = channel.send(SocketMessage::Text("late".into())).await.unwrap_err();

    assert_eq!(error.code.value(), TransportFailure::SOCKET_CLOSED);
    assert!(socket.sent_messages().is_empty());
    assert_eq!(harness.logger.entries().len(), 1);
}

#[tokio::test]
async fn test_receive_stream_rearms_until_failure() {
    let harness = Harness::new();
    let channel = harness.session.websocket(&chat()).await.unwrap();
    let socket = harness.transport.last_socket().unwrap();
    let mut stream = channel.receive_stream();

    socket.push_frame(InboundFrame::Message(SocketMessage::Text("one".into())));
    socket.push_frame(InboundFrame::Message(SocketMessage::Binary(vec![2])));
    socket.push_failure(TransportFailure::new(TransportFailure::CONNECTION_LOST, "reset"));

    assert_eq!(next(&mut stream).await, Some(Ok(SocketMessage::Text("one".into()))));
    assert_eq!(next(&mut stream).await, Some(Ok(SocketMessage::Binary(vec![2]))));
    let error = next(&mut stream).await.unwrap().unwrap_err();
    assert_eq!(error.code.value(), TransportFailure::CONNECTION_LOST);
    assert!(next(&mut stream).await.is_none());
}

#[tokio::test]
async fn test_unrecognized_frame_ends_stream_with_unknown_error() {
    let harness = Harness::new();
    let channel = harness.session.websocket(&chat()).await.unwrap();
    let socket = harness.transport.last_socket().unwrap();
    let mut stream = channel.receive_stream();

    socket.push_frame(InboundFrame::Unrecognized("continuation".into()));
    socket.push_frame(InboundFrame::Message(SocketMessage::Text("never".into())));

    assert_eq!(next(&mut stream).await, Some(Err(NetworkError::unknown())));
    assert!(next(&mut stream).await.is_none());
}

#[tokio::test]
async fn test_second_receive_stream_is_rejected_while_active() {
    let harness = Harness::new();
    let channel = harness.session.websocket(&chat()).await.unwrap();
    let _first = channel.receive_stream();

    let mut second = channel.receive_stream();

    let error = next(&mut second).await.unwrap().unwrap_err();
    assert_eq!(error.title, ErrorTitle::Socket);
}

#[tokio::test]
async fn test_close_stops_receiving_and_records_status() {
    let harness = Harness::new();
    let channel = harness.session.websocket(&chat()).await.unwrap();
    let socket = harness.transport.last_socket().unwrap();
    let mut stream = channel.receive_stream();

    channel.close(CloseCode::Normal, Some("done".into())).await;

    assert!(next(&mut stream).await.is_none());
    assert_eq!(socket.close_status(), Some((CloseCode::Normal, Some("done".into()))));
}

#[tokio::test]
async fn test_receive_after_close_fails() {
    let harness = Harness::new();
    let channel = harness.session.websocket(&chat()).await.unwrap();
    channel.close(CloseCode::GoingAway, None).await;

    let mut stream = channel.receive_stream();

    let error = next(&mut stream).await.unwrap().unwrap_err();
    assert_eq!(error.code.value(), TransportFailure::SOCKET_CLOSED);
}

#[test]
fn test_close_code_values() {
    assert_eq!(CloseCode::Normal.value(), 1000);
    assert_eq!(CloseCode::from_value(1001), CloseCode::GoingAway);
    assert_eq!(CloseCode::from_value(4000), CloseCode::Other(4000));
}
