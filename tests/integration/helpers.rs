//! Shared test helpers for integration tests.
//!
//! Every test boots a real server on an ephemeral port over the in-memory
//! store, so HTTP and WebSocket traffic go through the full stack.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;

use chathub_api::AppState;
use chathub_auth::{JwtEncoder, JwtIdentityVerifier};
use chathub_core::config::AppConfig;
use chathub_core::config::database::StorageProvider;
use chathub_core::types::{ChatId, UserId};
use chathub_database::{MemoryStore, Storage};

const TEST_SECRET: &str = "integration-test-secret-at-least-32-chars";
const EVENT_TIMEOUT: Duration = Duration::from_secs(3);

/// A running server plus direct access to its store.
pub struct TestServer {
    /// Bound address.
    pub addr: SocketAddr,
    /// Backing store for seeding and assertions.
    pub mem: Arc<MemoryStore>,
    /// Shared state, for peeking at the registry.
    pub state: AppState,
    encoder: JwtEncoder,
    http: reqwest::Client,
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

/// Status code and JSON body of an HTTP response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: u16,
    pub body: Value,
}

impl TestServer {
    /// Starts a server with test defaults.
    pub async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    /// Starts a server after letting the caller adjust the configuration.
    pub async fn start_with(configure: impl FnOnce(&mut AppConfig)) -> Self {
        let mut config = AppConfig::default();
        config.auth.jwt_secret = TEST_SECRET.to_string();
        config.database.provider = StorageProvider::Memory;
        config.server.shutdown_grace_seconds = 2;
        config.realtime.ring_timeout_seconds = 0;
        configure(&mut config);

        let (storage, mem) = Storage::memory();
        let verifier = Arc::new(JwtIdentityVerifier::new(&config.auth, storage.users.clone()));
        let encoder = JwtEncoder::new(&config.auth);
        let state = AppState::new(config, storage, verifier).expect("Failed to build state");

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Listener has no address");

        let shutdown = CancellationToken::new();
        let task = tokio::spawn({
            let state = state.clone();
            let shutdown = shutdown.clone();
            async move {
                chathub_api::serve(state, listener, async move { shutdown.cancelled().await })
                    .await
                    .expect("Server failed");
            }
        });

        Self {
            addr,
            mem,
            state,
            encoder,
            http: reqwest::Client::new(),
            shutdown,
            task: Some(task),
        }
    }

    /// Stops the server and waits for it to finish.
    pub async fn stop(mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.task.take() {
            let _ = tokio::time::timeout(Duration::from_secs(5), task).await;
        }
    }

    /// Seeds a user and returns its id.
    pub async fn user(&self, name: &str) -> UserId {
        self.mem.seed_user(name).await.id
    }

    /// Seeds contact edges in both directions.
    pub async fn befriend(&self, a: UserId, b: UserId) {
        self.mem.seed_contact(a, b, false).await;
        self.mem.seed_contact(b, a, false).await;
    }

    /// Seeds a conversation.
    pub async fn chat(&self, participants: &[UserId]) -> ChatId {
        self.mem.seed_chat(participants).await.id
    }

    /// A valid access token for `user`.
    pub fn token(&self, user: UserId) -> String {
        self.encoder
            .generate_access_token(user)
            .expect("Failed to mint token")
            .0
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> TestResponse {
        self.send(self.http.get(self.url(path)), token, None).await
    }

    pub async fn post(&self, path: &str, token: Option<&str>, body: Option<Value>) -> TestResponse {
        self.send(self.http.post(self.url(path)), token, body).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> TestResponse {
        self.send(self.http.delete(self.url(path)), token, None).await
    }

    async fn send(
        &self,
        mut builder: reqwest::RequestBuilder,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = body {
            builder = builder.json(&body);
        }
        let response = builder.send().await.expect("Request failed");
        let status = response.status().as_u16();
        let text = response.text().await.expect("Failed to read body");
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        TestResponse { status, body }
    }

    /// Opens a WebSocket with an arbitrary query string, without waiting
    /// for registration.
    pub async fn ws_raw(&self, query: &str) -> WsClient {
        let url = format!("ws://{}/ws{}", self.addr, query);
        let (stream, _) = connect_async(url).await.expect("WebSocket handshake failed");
        WsClient {
            stream,
            pending: VecDeque::new(),
        }
    }

    /// Opens an authenticated WebSocket for `user` and waits until the
    /// server has registered it.
    pub async fn ws(&self, user: UserId) -> WsClient {
        let mut client = self.ws_raw(&format!("?token={}", self.token(user))).await;
        client.sync().await;
        client
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// A test WebSocket client speaking the JSON event protocol.
pub struct WsClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    pending: VecDeque<Value>,
}

impl WsClient {
    /// Sends `{"event", "data", "requestId"?}`.
    pub async fn emit(&mut self, event: &str, data: Value, request_id: Option<&str>) {
        let mut frame = json!({ "event": event, "data": data });
        if let Some(id) = request_id {
            frame["requestId"] = json!(id);
        }
        self.stream
            .send(Message::text(frame.to_string()))
            .await
            .expect("Failed to send frame");
    }

    /// Round-trips a ping; events that arrive first are kept for later.
    pub async fn sync(&mut self) {
        self.emit("ping", json!({}), None).await;
        loop {
            let event = self.read().await.expect("Connection closed during sync");
            if event["event"] == "pong" {
                return;
            }
            self.pending.push_back(event);
        }
    }

    /// The next event, failing the test if none arrives in time.
    pub async fn next_event(&mut self) -> Value {
        if let Some(event) = self.pending.pop_front() {
            return event;
        }
        self.read().await.expect("Connection closed while waiting for an event")
    }

    /// The next event, which must be named `name`.
    pub async fn expect(&mut self, name: &str) -> Value {
        let event = self.next_event().await;
        assert_eq!(event["event"], name, "unexpected event: {event}");
        event
    }

    /// Asserts nothing but `pong` arrives before a ping round-trip.
    pub async fn expect_quiet(&mut self) {
        self.sync().await;
        assert!(
            self.pending.is_empty(),
            "unexpected events: {:?}",
            self.pending
        );
    }

    /// Waits for the server to close the socket.
    pub async fn expect_closed(&mut self) {
        let result = tokio::time::timeout(EVENT_TIMEOUT, async {
            while let Some(Ok(msg)) = self.stream.next().await {
                if msg.is_close() {
                    break;
                }
            }
        })
        .await;
        assert!(result.is_ok(), "socket was not closed");
    }

    /// Closes the socket from the client side.
    pub async fn close(mut self) {
        let _ = self.stream.close(None).await;
    }

    async fn read(&mut self) -> Option<Value> {
        loop {
            let msg = tokio::time::timeout(EVENT_TIMEOUT, self.stream.next())
                .await
                .expect("Timed out waiting for an event")?
                .ok()?;
            match msg {
                Message::Text(text) => {
                    return Some(serde_json::from_str(text.as_str()).expect("Invalid JSON event"));
                }
                Message::Close(_) => return None,
                _ => continue,
            }
        }
    }
}
