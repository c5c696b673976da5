//! Realtime viewer sessions over WebSocket
//!
//! Each connection owns its subscription and its [`ClientWindow`]. The
//! session sends one snapshot frame, then one frame per live insert that
//! survives the window merge.

use axum::body::Bytes;
use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::error::{EvictionReason, SubscriptionDeliveryFailure};
use crate::ingest::SignalPipeline;
use crate::metrics::Metrics;
use crate::models::signal::Signal;
use crate::services::fanout::{ClientWindow, Merge};

/// Frames sent to viewers
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewerEvent<'a> {
    Snapshot { signals: Vec<&'a Signal> },
    Signal { signal: &'a Signal },
    Error { message: String },
    Pong,
}

#[derive(Debug, Clone)]
pub struct ViewerSettings {
    pub window_size: usize,
    pub ping_interval: Duration,
    pub idle_timeout: Duration,
}

#[derive(Debug)]
enum ViewerExit {
    ClientClosed,
    SendFailed,
    ReceiveFailed,
    IdleTimeout,
    Evicted(EvictionReason),
    NotifierClosed,
}

/// Keeps `viewers_connected` accurate on every exit path
struct ViewerGauge(Option<Arc<Metrics>>);

impl ViewerGauge {
    fn new(metrics: Option<Arc<Metrics>>) -> Self {
        if let Some(m) = &metrics {
            m.viewers_connected.inc();
        }
        Self(metrics)
    }
}

impl Drop for ViewerGauge {
    fn drop(&mut self) {
        if let Some(m) = &self.0 {
            m.viewers_connected.dec();
        }
    }
}

async fn send_event(socket: &mut WebSocket, event: &ViewerEvent<'_>) -> Result<(), axum::Error> {
    let payload = serde_json::to_string(event).map_err(axum::Error::new)?;
    socket.send(Message::Text(payload.into())).await
}

async fn close(socket: &mut WebSocket, code: u16, reason: &str) {
    let frame = CloseFrame {
        code,
        reason: reason.to_string().into(),
    };
    if let Err(e) = socket.send(Message::Close(Some(frame))).await {
        debug!(error = %e, "Failed to send close frame");
    }
}

fn is_ping(text: &str) -> bool {
    let text = text.trim();
    text.eq_ignore_ascii_case("ping")
        || serde_json::from_str::<serde_json::Value>(text)
            .ok()
            .and_then(|json| json.get("type").and_then(|t| t.as_str()).map(|t| t == "ping"))
            .unwrap_or(false)
}

/// Drive one viewer connection until it ends
pub async fn run_viewer_session(
    mut socket: WebSocket,
    pipeline: SignalPipeline,
    settings: ViewerSettings,
    metrics: Option<Arc<Metrics>>,
) {
    let _gauge = ViewerGauge::new(metrics);

    let (mut subscription, mut window) = match pipeline.connect_viewer(settings.window_size).await {
        Ok(connected) => connected,
        Err(e) => {
            warn!(error = %e, "Viewer snapshot failed");
            let event = ViewerEvent::Error {
                message: "signal history unavailable".to_string(),
            };
            let _ = send_event(&mut socket, &event).await;
            close(&mut socket, close_code::ERROR, "store unavailable").await;
            return;
        }
    };
    let viewer_id = subscription.id();
    info!(viewer_id = viewer_id, snapshot = window.len(), "Viewer connected");

    let exit = stream_to_viewer(&mut socket, &mut subscription, &mut window, &settings).await;

    subscription.unsubscribe();
    info!(viewer_id = viewer_id, reason = ?exit, "Viewer disconnected");
}

async fn stream_to_viewer(
    socket: &mut WebSocket,
    subscription: &mut crate::services::notifier::Subscription,
    window: &mut ClientWindow,
    settings: &ViewerSettings,
) -> ViewerExit {
    let snapshot = ViewerEvent::Snapshot {
        signals: window.iter().collect(),
    };
    if send_event(socket, &snapshot).await.is_err() {
        return ViewerExit::SendFailed;
    }

    let mut heartbeat = tokio::time::interval(settings.ping_interval);
    heartbeat.tick().await;
    let mut last_seen = Instant::now();

    loop {
        tokio::select! {
            delivery = subscription.recv() => match delivery {
                Ok(signal) => match window.apply((*signal).clone()) {
                    Merge::Prepended => {
                        if send_event(socket, &ViewerEvent::Signal { signal: &signal }).await.is_err() {
                            return ViewerExit::SendFailed;
                        }
                    }
                    merge => debug!(signal_id = signal.id, merge = ?merge, "Live signal skipped"),
                },
                Err(SubscriptionDeliveryFailure::Evicted(reason)) => {
                    close(socket, close_code::POLICY, &format!("evicted: {}", reason)).await;
                    return ViewerExit::Evicted(reason);
                }
                Err(SubscriptionDeliveryFailure::Closed) => {
                    close(socket, close_code::AWAY, "server shutting down").await;
                    return ViewerExit::NotifierClosed;
                }
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(message)) => {
                    last_seen = Instant::now();
                    match message {
                        Message::Text(text) if is_ping(text.as_str()) => {
                            if send_event(socket, &ViewerEvent::Pong).await.is_err() {
                                return ViewerExit::SendFailed;
                            }
                        }
                        Message::Close(_) => return ViewerExit::ClientClosed,
                        _ => {}
                    }
                }
                Some(Err(e)) => {
                    debug!(error = %e, "Viewer receive error");
                    return ViewerExit::ReceiveFailed;
                }
                None => return ViewerExit::ClientClosed,
            },
            _ = heartbeat.tick() => {
                if last_seen.elapsed() >= settings.idle_timeout {
                    close(socket, close_code::AWAY, "idle timeout").await;
                    return ViewerExit::IdleTimeout;
                }
                if socket.send(Message::Ping(Bytes::new())).await.is_err() {
                    return ViewerExit::SendFailed;
                }
            }
        }
    }
}
