//! Test utilities for realtime (WebSocket) integration tests

use futures_util::StreamExt;
use serde_json::Value;
use signalfeed::config::ServiceConfig;
use signalfeed::core::http::{create_router, AppState};
use signalfeed::db::MemorySignalStore;
use signalfeed::metrics::Metrics;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

pub type ViewerSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub const FRAME_TIMEOUT: Duration = Duration::from_secs(5);

/// A server bound to an ephemeral port, stopped on drop
#[allow(dead_code)]
pub struct TestRealtimeServer {
    pub addr: SocketAddr,
    pub store: Arc<MemorySignalStore>,
    pub state: AppState,
    handle: JoinHandle<()>,
}

impl TestRealtimeServer {
    pub async fn new() -> Self {
        Self::with_config(ServiceConfig::default()).await
    }

    pub async fn with_config(config: ServiceConfig) -> Self {
        let metrics = Arc::new(Metrics::new().expect("metrics initialization"));
        let store = Arc::new(MemorySignalStore::new());
        let state = AppState::new(config, store.clone(), metrics);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener address");
        let app = create_router(state.clone());
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });

        Self {
            addr,
            store,
            state,
            handle,
        }
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub async fn connect(&self) -> ViewerSocket {
        let (socket, _) = connect_async(self.ws_url())
            .await
            .expect("websocket handshake");
        socket
    }

    /// Ingest an alert through the same path the webhook uses
    pub async fn ingest(&self, payload: &Value) -> Value {
        let signal = self
            .state
            .pipeline
            .ingest(payload.to_string().as_bytes())
            .await
            .expect("ingest alert");
        serde_json::to_value(signal).expect("serialize signal")
    }

    /// Wait until the notifier registry holds `expected` viewers
    pub async fn wait_for_viewers(&self, expected: usize) -> bool {
        for _ in 0..100 {
            if self.state.pipeline.notifier().subscriber_count() == expected {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        false
    }
}

impl Drop for TestRealtimeServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Next JSON frame from the server, skipping transport pings and pongs
pub async fn next_event(socket: &mut ViewerSocket) -> Value {
    loop {
        let message = tokio::time::timeout(FRAME_TIMEOUT, socket.next())
            .await
            .expect("timed out waiting for frame")
            .expect("stream ended")
            .expect("websocket error");

        match message {
            Message::Text(text) => return serde_json::from_str(&text).expect("json frame"),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {:?}", other),
        }
    }
}

/// Read until the server closes the connection; returns the close code when one was sent
pub async fn wait_for_close(socket: &mut ViewerSocket) -> Option<u16> {
    loop {
        let message = tokio::time::timeout(FRAME_TIMEOUT, socket.next())
            .await
            .expect("timed out waiting for close");

        match message {
            Some(Ok(Message::Close(frame))) => return frame.map(|f| u16::from(f.code)),
            Some(Ok(_)) => continue,
            Some(Err(_)) | None => return None,
        }
    }
}
