//! Integration tests for the WebSocket transport.
//!
//! A minimal WebSocket server on a loopback port stands in for Tinode: it
//! checks the endpoint path, answers requests with canned frames and
//! finishes the close handshake.

#![cfg(feature = "transport")]

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tinode_client::{ClientConfig, Connection, TransportError, transport};
use tinode_proto::{
    ClientMessage, Request, ServerMessage,
    client::{Leave, Publish},
};
use tokio::{net::TcpListener, time::timeout};
use tokio_tungstenite::{
    accept_hdr_async,
    tungstenite::{
        Message,
        handshake::server::{ErrorResponse, Request as HandshakeRequest, Response},
    },
};

/// Accept one client, reply to each text frame via `reply`, return the
/// request path and every frame received.
async fn start_server<F>(reply: F) -> (String, tokio::task::JoinHandle<(String, Vec<String>)>)
where
    F: Fn(&str) -> Vec<String> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut path = String::new();
        let record_path = |request: &HandshakeRequest, response: Response| -> Result<Response, ErrorResponse> {
            path = request.uri().to_string();
            Ok(response)
        };
        let mut socket = accept_hdr_async(stream, record_path).await.unwrap();

        let mut received = Vec::new();
        while let Some(Ok(frame)) = socket.next().await {
            match frame {
                Message::Text(text) => {
                    for line in reply(&text) {
                        socket.send(Message::Text(line)).await.unwrap();
                    }
                    received.push(text);
                },
                Message::Close(_) => break,
                _ => {},
            }
        }
        (path, received)
    });

    (addr, handle)
}

fn config(addr: String) -> ClientConfig {
    ClientConfig { host: addr, api_key: "TESTKEY".into(), ..ClientConfig::default() }
}

fn leave(id: &str) -> ClientMessage {
    ClientMessage::new(Request::Leave(Leave { id: id.into(), topic: Some("grp1".into()), unsub: false }))
}

async fn next(connection: &mut Connection) -> ServerMessage {
    timeout(Duration::from_secs(5), connection.recv()).await.unwrap().unwrap().unwrap()
}

#[tokio::test]
async fn request_and_ack_round_trip() {
    let (addr, server) = start_server(|_| {
        vec![r#"{"ctrl":{"id":"1","code":200,"text":"ok","ts":"2024-01-01T00:00:00Z"}}"#.to_string()]
    })
    .await;

    let mut connection = transport::connect(&config(addr)).await.unwrap();
    connection.send(leave("1")).await.unwrap();

    let ServerMessage::Ctrl(ctrl) = next(&mut connection).await else {
        panic!("expected ctrl");
    };
    assert_eq!(ctrl.id.as_deref(), Some("1"));

    connection.close_outbound();
    let (path, received) = server.await.unwrap();
    assert_eq!(path, "/v0/channels?apikey=TESTKEY");
    assert_eq!(received, vec![r#"{"leave":{"id":"1","topic":"grp1"}}"#]);
}

#[tokio::test]
async fn undecodable_frames_are_skipped() {
    let (addr, server) = start_server(|_| {
        vec![
            "not json".to_string(),
            r#"{"mystery":{}}"#.to_string(),
            r#"{"data":{"topic":"grp1","from":"usr2","seq":1,"content":"hi"}}"#.to_string(),
        ]
    })
    .await;

    let mut connection = transport::connect(&config(addr)).await.unwrap();
    connection
        .send(ClientMessage::new(Request::Publish(Publish {
            id: "2".into(),
            topic: Some("grp1".into()),
            no_echo: true,
            content: None,
        })))
        .await
        .unwrap();

    assert_eq!(next(&mut connection).await.kind(), "data");

    connection.close_outbound();
    server.await.unwrap();
    let end = timeout(Duration::from_secs(5), connection.recv()).await.unwrap();
    assert!(end.is_none());
}

#[tokio::test]
async fn unreachable_server_is_connection_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);

    let result = transport::connect(&config(addr)).await;
    assert!(matches!(result, Err(TransportError::Connection(_))));
}
