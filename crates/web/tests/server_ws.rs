use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use strand_web::ws::{WsFailure, WsHandler, WsSession};
use strand_web::{Server, ServerConfig, WsMode};
use strand_http::protocol::WsMessage;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::task::JoinHandle;

const MASK: [u8; 4] = [0xa1, 0x07, 0x5c, 0x3e];

const UPGRADE: &str = "GET /ws HTTP/1.1\r\n\
    Host: example.com\r\n\
    Upgrade: websocket\r\n\
    Connection: Upgrade\r\n\
    Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
    Sec-WebSocket-Version: 13\r\n\r\n";

/// Echoes events back and reports failures as `fatal`/`recoverable` text messages.
#[derive(Default)]
struct Echo {
    closed: Arc<AtomicUsize>,
}

#[async_trait]
impl WsHandler for Echo {
    async fn on_open(&self, session: &WsSession) {
        if session.connection().query().contains_key("greet") {
            session.send_text("welcome").await.unwrap();
        }
    }

    async fn on_message(&self, session: &WsSession, message: WsMessage) {
        session.send(message).await.unwrap();
    }

    async fn on_event(&self, session: &WsSession, event: &str, data: Value) {
        if event == "boom" {
            panic!("boom requested");
        }
        session.send_event(event, data).await.unwrap();
    }

    async fn on_error(&self, session: &WsSession, error: &WsFailure) {
        let kind = if error.is_fatal() { "fatal" } else { "recoverable" };
        session.send_text(kind).await.unwrap();
    }

    async fn on_close(&self, _session: &WsSession) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

struct Client {
    stream: DuplexStream,
    task: JoinHandle<()>,
}

impl Client {
    async fn connect(server: &Server, request: &str) -> (Self, String) {
        let (mut stream, server_stream) = tokio::io::duplex(4096);
        let (reader, writer) = tokio::io::split(server_stream);
        let remote: SocketAddr = "127.0.0.1:40000".parse().unwrap();
        let local: SocketAddr = "127.0.0.1:8080".parse().unwrap();

        let server = server.clone();
        let task = tokio::spawn(async move { server.serve_connection(reader, writer, remote, local).await });

        stream.write_all(request.as_bytes()).await.unwrap();

        let mut head = Vec::new();
        while !head.ends_with(b"\r\n\r\n") {
            head.push(stream.read_u8().await.unwrap());
        }
        (Self { stream, task }, String::from_utf8(head).unwrap())
    }

    async fn send(&mut self, opcode: u8, payload: &[u8]) {
        let mut frame = vec![0x80 | opcode, 0x80 | u8::try_from(payload.len()).unwrap()];
        frame.extend_from_slice(&MASK);
        frame.extend(payload.iter().enumerate().map(|(i, byte)| byte ^ MASK[i % 4]));
        self.stream.write_all(&frame).await.unwrap();
    }

    async fn send_text(&mut self, text: &str) {
        self.send(0x1, text.as_bytes()).await;
    }

    /// Reads one unfragmented server frame, short lengths only.
    async fn recv(&mut self) -> (u8, Vec<u8>) {
        let first = self.stream.read_u8().await.unwrap();
        let len = self.stream.read_u8().await.unwrap();
        assert!(len < 126, "unexpected frame length {len}");
        let mut payload = vec![0; len as usize];
        self.stream.read_exact(&mut payload).await.unwrap();
        (first, payload)
    }

    async fn recv_text(&mut self) -> String {
        let (first, payload) = self.recv().await;
        assert_eq!(first, 0x81);
        String::from_utf8(payload).unwrap()
    }

    /// Everything the server writes until it drops the connection.
    async fn finish(mut self) -> Vec<u8> {
        let mut rest = Vec::new();
        self.stream.read_to_end(&mut rest).await.unwrap();
        self.task.await.unwrap();
        rest
    }
}

fn server(config: ServerConfig, echo: Echo) -> Server {
    Server::builder().config(config).ws_host("/ws", echo).build().unwrap()
}

#[tokio::test]
async fn handshake_sets_session_cookie() {
    let server = server(ServerConfig::default(), Echo::default());
    let (client, head) = Client::connect(&server, UPGRADE).await;

    assert!(head.starts_with("HTTP/1.1 101 Switching Protocols\r\n"), "{head}");
    assert!(head.contains("upgrade: websocket\r\n"), "{head}");
    assert!(head.contains("sec-websocket-accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n"), "{head}");
    assert!(head.contains("set-cookie: _session="), "{head}");
    assert!(!head.contains("content-length"), "{head}");
    assert_eq!(server.sessions().len(), 1);

    drop(client);
}

#[tokio::test]
async fn refused_upgrades() {
    let server = server(ServerConfig::default(), Echo::default());

    let (client, head) = Client::connect(&server, &UPGRADE.replace("GET /ws ", "GET /other ")).await;
    assert!(head.starts_with("HTTP/1.1 404 Not Found\r\n"), "{head}");
    assert_eq!(client.finish().await, b"Not Found");

    let (client, head) = Client::connect(&server, &UPGRADE.replace("Version: 13", "Version: 8")).await;
    assert!(head.starts_with("HTTP/1.1 400 Bad Request\r\n"), "{head}");
    assert_eq!(client.finish().await, b"Bad Request");

    let config = ServerConfig { origins: vec!["example.com".to_string()], ..ServerConfig::default() };
    let server = self::server(config, Echo::default());
    let request = UPGRADE.replace("Host: example.com\r\n", "Host: example.com\r\nOrigin: https://evil.test\r\n");
    let (client, head) = Client::connect(&server, &request).await;
    assert!(head.starts_with("HTTP/1.1 400 Bad Request\r\n"), "{head}");
    client.finish().await;
}

#[tokio::test]
async fn advanced_mode_events() {
    let echo = Echo::default();
    let closed = Arc::clone(&echo.closed);
    let server = server(ServerConfig::default(), echo);
    let (mut client, _) = Client::connect(&server, &UPGRADE.replace("GET /ws ", "GET /ws?greet=1 ")).await;

    assert_eq!(client.recv_text().await, "welcome");

    client.send_text(r#"{"event":"chat","data":{"text":"hey"}}"#).await;
    assert_eq!(client.recv_text().await, r#"{"event":"chat","data":{"text":"hey"}}"#);

    client.send_text(r#"{"event":"bare"}"#).await;
    assert_eq!(client.recv_text().await, r#"{"event":"bare","data":null}"#);

    // a broken message only costs that message
    client.send_text("not json").await;
    assert_eq!(client.recv_text().await, "recoverable");

    client.send_text(r#"{"event":"boom"}"#).await;
    assert_eq!(client.recv_text().await, "recoverable");

    client.send(0x9, b"are you there").await;
    let (first, payload) = client.recv().await;
    assert_eq!(first, 0x8A);
    assert_eq!(payload, b"are you there");

    // binary messages skip event dispatch
    client.send(0x2, &[1, 2, 3]).await;
    assert_eq!(client.recv().await, (0x82, vec![1, 2, 3]));

    client.send(0x8, b"").await;
    assert_eq!(client.finish().await, [0x88, 0x00]);
    assert_eq!(closed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn raw_mode_messages() {
    let config = ServerConfig { ws_mode: WsMode::Raw, ..ServerConfig::default() };
    let server = server(config, Echo::default());
    let (mut client, _) = Client::connect(&server, UPGRADE).await;

    client.send_text(r#"{"event":"chat"}"#).await;
    assert_eq!(client.recv_text().await, r#"{"event":"chat"}"#);

    client.send_text("plain words").await;
    assert_eq!(client.recv_text().await, "plain words");

    client.send(0x8, b"").await;
    assert_eq!(client.finish().await, [0x88, 0x00]);
}

#[tokio::test]
async fn oversized_message_closes_connection() {
    let echo = Echo::default();
    let closed = Arc::clone(&echo.closed);
    let config = ServerConfig { message_limit: 16, ..ServerConfig::default() };
    let server = server(config, echo);
    let (mut client, _) = Client::connect(&server, UPGRADE).await;

    client.send_text("this message is longer than sixteen bytes").await;

    let mut expected = vec![0x81, 5];
    expected.extend_from_slice(b"fatal");
    expected.extend_from_slice(&[0x88, 0x00]);
    assert_eq!(client.finish().await, expected);
    assert_eq!(closed.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn idle_client_gets_pinged() {
    let config = ServerConfig { keep_alive: 5, ..ServerConfig::default() };
    let server = server(config, Echo::default());
    let (mut client, _) = Client::connect(&server, UPGRADE).await;

    let started = tokio::time::Instant::now();
    assert_eq!(client.recv().await, (0x89, vec![]));
    assert!(started.elapsed() >= std::time::Duration::from_secs(5));

    client.send(0x8, b"").await;
    assert_eq!(client.finish().await, [0x88, 0x00]);
}
