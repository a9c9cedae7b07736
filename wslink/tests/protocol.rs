//! Bare `tokio-tungstenite` client driving a real bound `WslinkServer`
//! (spec §8 testable properties).

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio_tungstenite::tungstenite::Message as ClientMessage;

use wslink::argument::Argument;
use wslink::registry::{MethodRegistry, Protocol};
use wslink::server::{ServerConfig, WslinkServer};

struct EchoProtocol;

impl Protocol for EchoProtocol {
    fn secret(&self) -> String {
        "s3cr3t".to_string()
    }

    fn register(self: Arc<Self>, registry: &mut MethodRegistry) {
        registry.method("echo.value", |mut args, _kwargs| {
            Box::pin(async move { Ok(args.pop().unwrap_or(Argument::Null)) })
        });
        registry.method("echo.blob", |mut args, _kwargs| {
            Box::pin(async move { Ok(args.pop().unwrap_or(Argument::Null)) })
        });
    }
}

async fn spawn_server(port: u16, timeout: Duration) -> Arc<WslinkServer> {
    let config = ServerConfig::new("127.0.0.1", port, timeout, "s3cr3t");
    let server = WslinkServer::build(Arc::new(EchoProtocol), config);
    let server_ = server.clone();
    tokio::spawn(async move {
        let _ = server_.start().await;
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    server
}

async fn connect(port: u16) -> (
    futures_util::stream::SplitSink<
        tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
        ClientMessage,
    >,
    futures_util::stream::SplitStream<
        tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
    >,
) {
    let url = format!("ws://127.0.0.1:{port}");
    let (stream, _) = tokio_tungstenite::connect_async(url).await.expect("client connects");
    stream.split()
}

/// Read frames until one is text, returning it parsed as JSON. Binary
/// and control frames encountered along the way are handed back too so
/// a caller can assert on ordering when attachments are involved.
async fn next_frame(
    read: &mut futures_util::stream::SplitStream<
        tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
    >,
) -> ClientMessage {
    loop {
        match read.next().await {
            Some(Ok(ClientMessage::Ping(_) | ClientMessage::Pong(_))) => continue,
            Some(Ok(msg)) => return msg,
            Some(Err(err)) => panic!("websocket error: {err}"),
            None => panic!("connection closed before expected frame"),
        }
    }
}

async fn next_json(
    read: &mut futures_util::stream::SplitStream<
        tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
    >,
) -> Value {
    match next_frame(read).await {
        ClientMessage::Text(text) => serde_json::from_str(&text).expect("valid JSON frame"),
        other => panic!("expected a text frame, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn hello_then_rpc_round_trip() {
    let port = 19301;
    let _server = spawn_server(port, Duration::from_secs(30)).await;
    let (mut write, mut read) = connect(port).await;

    write
        .send(ClientMessage::Text(
            json!({
                "wslink": "1.0",
                "id": "system:0",
                "method": "wslink.hello",
                "args": [{"secret": "s3cr3t"}],
            })
            .to_string(),
        ))
        .await
        .unwrap();

    let hello_reply = next_json(&mut read).await;
    assert_eq!(hello_reply["id"], "system:0");
    assert!(hello_reply["result"]["clientID"].as_str().unwrap().starts_with('c'));
    assert!(hello_reply.get("error").is_none());

    write
        .send(ClientMessage::Text(
            json!({
                "wslink": "1.0",
                "id": "rpc:1",
                "method": "echo.value",
                "args": ["hi"],
            })
            .to_string(),
        ))
        .await
        .unwrap();

    let reply = next_json(&mut read).await;
    assert_eq!(reply["id"], "rpc:1");
    assert_eq!(reply["result"], "hi");
}

#[tokio::test(flavor = "multi_thread")]
async fn hello_with_wrong_secret_is_rejected() {
    let port = 19302;
    let _server = spawn_server(port, Duration::from_secs(30)).await;
    let (mut write, mut read) = connect(port).await;

    write
        .send(ClientMessage::Text(
            json!({
                "wslink": "1.0",
                "id": "system:0",
                "method": "wslink.hello",
                "args": [{"secret": "wrong"}],
            })
            .to_string(),
        ))
        .await
        .unwrap();

    let reply = next_json(&mut read).await;
    assert_eq!(reply["id"], "system:0");
    assert_eq!(reply["error"]["code"], 1);
    assert!(reply.get("result").is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn unregistered_method_returns_method_not_found() {
    let port = 19303;
    let _server = spawn_server(port, Duration::from_secs(30)).await;
    let (mut write, mut read) = connect(port).await;

    write
        .send(ClientMessage::Text(
            json!({
                "wslink": "1.0",
                "id": "rpc:7",
                "method": "no.such.method",
                "args": [],
            })
            .to_string(),
        ))
        .await
        .unwrap();

    let reply = next_json(&mut read).await;
    assert_eq!(reply["id"], "rpc:7");
    assert_eq!(reply["error"]["code"], 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn binary_attachment_round_trips_through_echo() {
    let port = 19304;
    let _server = spawn_server(port, Duration::from_secs(30)).await;
    let (mut write, mut read) = connect(port).await;

    // Attach a blob under a placeholder key, then call a method whose
    // args reference that key (spec §4.1 send/decode round trip).
    write
        .send(ClientMessage::Text(
            json!({
                "wslink": "1.0",
                "method": "wslink.binary.attachment",
                "args": ["wslink_bin0"],
            })
            .to_string(),
        ))
        .await
        .unwrap();
    write.send(ClientMessage::Binary(vec![1, 2, 3, 4])).await.unwrap();

    write
        .send(ClientMessage::Text(
            json!({
                "wslink": "1.0",
                "id": "rpc:9",
                "method": "echo.blob",
                "args": ["wslink_bin0"],
            })
            .to_string(),
        ))
        .await
        .unwrap();

    // Reply carries the blob back out-of-band: header, then binary,
    // then the JSON reply naming the (new) placeholder key.
    let header = next_json(&mut read).await;
    assert_eq!(header["method"], "wslink.binary.attachment");
    let reply_key = header["args"][0].as_str().unwrap().to_string();

    let binary = next_frame(&mut read).await;
    match binary {
        ClientMessage::Binary(data) => assert_eq!(data, vec![1, 2, 3, 4]),
        other => panic!("expected binary frame, got {other:?}"),
    }

    let reply = next_json(&mut read).await;
    assert_eq!(reply["id"], "rpc:9");
    assert_eq!(reply["result"], reply_key);
}

#[tokio::test(flavor = "multi_thread")]
async fn disconnect_rearms_idle_timer_and_server_stops() {
    let port = 19305;
    let config = ServerConfig::new("127.0.0.1", port, Duration::from_millis(150), "s3cr3t");
    let server = WslinkServer::build(Arc::new(EchoProtocol), config);
    let server_ = server.clone();
    let handle = tokio::spawn(async move { server_.start().await });
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Connecting cancels the idle timer; disconnecting re-arms it.
    let (write, read) = connect(port).await;
    drop(write);
    drop(read);

    let result = tokio::time::timeout(Duration::from_secs(2), handle).await;
    assert!(result.is_ok(), "server must stop once re-armed idle timer fires");
}
