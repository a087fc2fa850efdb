//! End-to-end tests: start a real server and drive it over WS + HTTP.
//!
//! Run with: `cargo test -p brutal-wui-gateway --test integration`

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use brutal_wui_core::config::Config;
use brutal_wui_gateway::{background_fn, Asset, Broadcaster, SessionRegistry, UiHandler, WebUi};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct EchoApp;

#[async_trait]
impl UiHandler for EchoApp {
    async fn on_init(&self, ui: &Broadcaster) -> anyhow::Result<()> {
        ui.el_set_text(&["#status"], "ready");
        Ok(())
    }

    async fn on_event(&self, ui: &Broadcaster, event: &str, data: Value) -> anyhow::Result<()> {
        match event {
            "echo" => {
                let text = data.as_str().unwrap_or_default().to_string();
                ui.el_set_text(&["#out"], text);
                Ok(())
            }
            "fail" => anyhow::bail!("requested failure"),
            "stall" => {
                ui.el_set_text(&["#out"], "stalling");
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    async fn on_asset(&self, name: &str) -> Option<Asset> {
        (name == "hello.txt").then(|| Asset::new("hello", "text/plain"))
    }
}

struct TestServer {
    addr: SocketAddr,
    registry: Arc<SessionRegistry>,
    shutdown: CancellationToken,
    task: JoinHandle<anyhow::Result<()>>,
}

impl TestServer {
    async fn start(ui: WebUi) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let registry = ui.registry();
        let shutdown = ui.shutdown_token();
        let task = tokio::spawn(ui.serve(listener));
        Self {
            addr,
            registry,
            shutdown,
            task,
        }
    }

    async fn echo() -> Self {
        Self::start(WebUi::new(Config::default()).with_handler(EchoApp)).await
    }

    fn http(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    async fn connect(&self) -> Client {
        let (ws, _) = connect_async(format!("ws://{}/wui", self.addr))
            .await
            .expect("WS connect failed");
        ws
    }

    async fn wait_for_sessions(&self, n: usize) {
        for _ in 0..200 {
            if self.registry.len() == n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {n} sessions, have {}", self.registry.len());
    }
}

/// Next text frame as JSON.
async fn next_json(ws: &mut Client) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .expect("transport error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

async fn send_event(ws: &mut Client, event: &str, data: Value) {
    let frame = json!({"event": event, "data": data}).to_string();
    ws.send(Message::Text(frame.into())).await.unwrap();
}

fn text_cmd(selector: &str, content: &str) -> Value {
    json!({"event": "el_text", "data": {selector: content}})
}

#[tokio::test]
async fn test_init_paints_new_session() {
    let server = TestServer::echo().await;
    let mut ws = server.connect().await;

    assert_eq!(next_json(&mut ws).await, text_cmd("#status", "ready"));
    assert_eq!(server.registry.len(), 1);
}

#[tokio::test]
async fn test_event_round_trip() {
    let server = TestServer::echo().await;
    let mut ws = server.connect().await;
    next_json(&mut ws).await;

    send_event(&mut ws, "echo", json!("hello")).await;
    assert_eq!(next_json(&mut ws).await, text_cmd("#out", "hello"));
}

#[tokio::test]
async fn test_bad_frames_and_failed_callbacks_are_skipped() {
    let server = TestServer::echo().await;
    let mut ws = server.connect().await;
    next_json(&mut ws).await;

    ws.send(Message::Text("{not json".into())).await.unwrap();
    ws.send(Message::Text(r#"{"data": 1}"#.into())).await.unwrap();
    send_event(&mut ws, "fail", Value::Null).await;
    send_event(&mut ws, "echo", json!("still alive")).await;

    assert_eq!(next_json(&mut ws).await, text_cmd("#out", "still alive"));
    assert_eq!(server.registry.len(), 1);
}

#[tokio::test]
async fn test_broadcast_reaches_all_sessions_without_replay() {
    let server = TestServer::echo().await;
    let mut a = server.connect().await;
    next_json(&mut a).await;

    send_event(&mut a, "echo", json!("before b")).await;
    assert_eq!(next_json(&mut a).await, text_cmd("#out", "before b"));

    // B sees its own init first, never the earlier command.
    let mut b = server.connect().await;
    assert_eq!(next_json(&mut b).await, text_cmd("#status", "ready"));
    // B's init is broadcast to A as well.
    assert_eq!(next_json(&mut a).await, text_cmd("#status", "ready"));

    send_event(&mut b, "echo", json!("from b")).await;
    assert_eq!(next_json(&mut a).await, text_cmd("#out", "from b"));
    assert_eq!(next_json(&mut b).await, text_cmd("#out", "from b"));
}

#[tokio::test]
async fn test_disconnect_removes_session() {
    let server = TestServer::echo().await;
    let mut a = server.connect().await;
    let mut b = server.connect().await;
    server.wait_for_sessions(2).await;

    a.close(None).await.unwrap();
    server.wait_for_sessions(1).await;

    // The remaining session still gets broadcasts.
    while next_json(&mut b).await != text_cmd("#status", "ready") {}
    send_event(&mut b, "echo", json!("alone")).await;
    loop {
        if next_json(&mut b).await == text_cmd("#out", "alone") {
            break;
        }
    }
}

#[tokio::test]
async fn test_background_loop_broadcasts() {
    let mut config = Config::default();
    config.background.interval_ms = 20;
    let ui = WebUi::new(config).with_background_task(background_fn(|ui: Broadcaster| async move {
        ui.el_set_text(&["#tick"], "tock");
        Ok(())
    }));
    let server = TestServer::start(ui).await;
    let mut ws = server.connect().await;

    loop {
        if next_json(&mut ws).await == text_cmd("#tick", "tock") {
            break;
        }
    }
}

#[tokio::test]
async fn test_http_routes() {
    let server = TestServer::echo().await;

    let resp = reqwest::get(server.http("/health")).await.unwrap();
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());

    let resp = reqwest::get(server.http("/assets/hello.txt")).await.unwrap();
    assert!(resp.status().is_success());
    assert_eq!(resp.text().await.unwrap(), "hello");

    let resp = reqwest::get(server.http("/assets/nope.txt")).await.unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);

    let script = reqwest::get(server.http("/script.js"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(script.contains("/wui"));
    assert!(script.contains("var DEBUG = false;"));

    let page = reqwest::get(server.http("/")).await.unwrap().text().await.unwrap();
    assert!(page.contains("/script.js"));
}

/// Read until the server's close frame and return its code.
async fn next_close(ws: &mut Client) -> Option<CloseCode> {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for close")?;
        match msg {
            Ok(Message::Close(frame)) => return frame.map(|f| f.code),
            Ok(_) => continue,
            Err(_) => return None,
        }
    }
}

#[tokio::test]
async fn test_shutdown_tears_down_sessions() {
    let server = TestServer::echo().await;
    let mut a = server.connect().await;
    let mut b = server.connect().await;
    server.wait_for_sessions(2).await;

    server.shutdown.cancel();
    // Idempotent.
    server.shutdown.cancel();

    let result = tokio::time::timeout(Duration::from_secs(5), server.task)
        .await
        .expect("server did not stop")
        .unwrap();
    assert!(result.is_ok());
    assert!(server.registry.is_empty());
    assert_eq!(next_close(&mut a).await, Some(CloseCode::Away));
    assert_eq!(next_close(&mut b).await, Some(CloseCode::Away));
}

#[tokio::test]
async fn test_shutdown_interrupts_stalled_callback() {
    let server = TestServer::echo().await;
    let mut ws = server.connect().await;
    assert_eq!(next_json(&mut ws).await, text_cmd("#status", "ready"));

    send_event(&mut ws, "stall", Value::Null).await;
    assert_eq!(next_json(&mut ws).await, text_cmd("#out", "stalling"));

    server.shutdown.cancel();
    let result = tokio::time::timeout(Duration::from_secs(5), server.task)
        .await
        .expect("server did not stop with a callback still running")
        .unwrap();
    assert!(result.is_ok());
    assert!(server.registry.is_empty());
    assert_eq!(next_close(&mut ws).await, Some(CloseCode::Away));
}
