//! End-to-end tests of the WebSocket transport against a local server.

mod common;

use acorn_store_rs::transport::Message;
use acorn_store_rs::{ConnectionError, Database, RequestError};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message as Frame;
use tokio_tungstenite::{accept_async, WebSocketStream};

type ServerSocket = WebSocketStream<tokio::net::TcpStream>;

async fn send(ws: &mut ServerSocket, tag: &str, body: &str) {
    let text = Message::with_tag(tag, body).to_json().unwrap();
    ws.send(Frame::Text(text)).await.unwrap();
}

async fn recv(ws: &mut ServerSocket) -> Option<Message> {
    while let Some(frame) = ws.next().await {
        match frame.ok()? {
            Frame::Text(text) => return Some(Message::from_json(&text).unwrap()),
            Frame::Close(_) => return None,
            _ => continue,
        }
    }
    None
}

/// Minimal document server: accepts `alice:secret`, answers inserts and
/// collection listings, and hangs up on `delete collection`.
async fn spawn_server() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut ws = accept_async(stream).await.unwrap();
                send(&mut ws, "auth request", "").await;

                let Some(auth) = recv(&mut ws).await else {
                    return;
                };
                assert_eq!(auth.message_type, "auth");
                let credentials: serde_json::Value = serde_json::from_str(&auth.body).unwrap();
                if credentials["password"] != "secret" {
                    send(&mut ws, "rejected", "").await;
                    return;
                }
                send(&mut ws, "connected", "").await;

                while let Some(request) = recv(&mut ws).await {
                    match request.message_type.as_str() {
                        "insert" => send(&mut ws, "response", "insert success").await,
                        "collections" => send(&mut ws, "response", r#"["people"]"#).await,
                        "delete collection" => {
                            let _ = ws.close(None).await;
                            return;
                        }
                        _ => send(&mut ws, "server error response", "unsupported").await,
                    }
                }
            });
        }
    });

    port
}

fn url(port: u16, password: &str) -> String {
    format!("acorn-store://127.0.0.1:{}/mydb/alice:{}", port, password)
}

#[tokio::test]
async fn test_websocket_round_trip() {
    common::init_tracing();
    let port = spawn_server().await;

    let db = Database::connect(&url(port, "secret")).await.unwrap();
    assert!(db.is_connected());

    db.collection("people")
        .insert(r#"{"name":"alice"}"#)
        .await
        .unwrap();
    assert_eq!(db.collection_names().await.unwrap(), vec!["people"]);
    assert_eq!(db.request_count(), 2);

    db.close().await.unwrap();
}

#[tokio::test]
async fn test_websocket_rejected() {
    common::init_tracing();
    let port = spawn_server().await;

    let err = Database::connect(&url(port, "wrong")).await.unwrap_err();
    assert!(matches!(err, ConnectionError::Rejected { .. }));
}

#[tokio::test]
async fn test_websocket_dial_failure() {
    common::init_tracing();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let err = Database::connect(&url(port, "secret")).await.unwrap_err();
    assert!(matches!(err, ConnectionError::DialFailed { .. }));
}

#[tokio::test]
async fn test_websocket_server_hangs_up() {
    common::init_tracing();
    let port = spawn_server().await;
    let db = Database::connect(&url(port, "secret")).await.unwrap();

    let err = db.delete_collection("people").await.unwrap_err();
    assert!(matches!(err, RequestError::ConnectionClosed));
    assert!(!db.is_connected());
}

#[tokio::test]
async fn test_dropping_database_closes_socket() {
    common::init_tracing();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (ended_tx, ended_rx) = tokio::sync::oneshot::channel();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        send(&mut ws, "auth request", "").await;
        recv(&mut ws).await.unwrap();
        send(&mut ws, "connected", "").await;

        // Returns once the client side of the socket is gone
        while recv(&mut ws).await.is_some() {}
        let _ = ended_tx.send(());
    });

    let db = Database::connect(&url(port, "secret")).await.unwrap();
    drop(db);

    tokio::time::timeout(Duration::from_secs(2), ended_rx)
        .await
        .expect("server should see the connection end")
        .unwrap();
}
