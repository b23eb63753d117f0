use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use super::ClientError;
use crate::config::WebSocketSettings;
use crate::types::{Signal, SignalsResponse};

/// Connection lifecycle of the signal stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SocketState {
    Disconnected,
    Connecting { attempt: u32 },
    Connected,
    /// Retry budget exhausted; no further attempts are made.
    Failed { attempts: u32 },
    /// Stopped on request. Not a connection loss.
    Closed,
}

impl SocketState {
    pub fn label(&self) -> String {
        match self {
            SocketState::Disconnected => "Disconnected".to_string(),
            SocketState::Connecting { attempt } => format!("Connecting (attempt {})", attempt),
            SocketState::Connected => "Live".to_string(),
            SocketState::Failed { attempts } => format!("Offline after {} attempts", attempts),
            SocketState::Closed => "Closed".to_string(),
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, SocketState::Connected)
    }
}

#[derive(Debug, Clone)]
pub enum SocketEvent {
    State(SocketState),
    /// Full replacement of the signal list, newest first.
    Signals(Vec<Signal>),
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl ReconnectPolicy {
    /// Delay before retry number `attempt` (1-based), doubling each time.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(1u32 << exp)
            .min(self.max_backoff)
    }
}

impl From<&WebSocketSettings> for ReconnectPolicy {
    fn from(settings: &WebSocketSettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            initial_backoff: Duration::from_millis(settings.initial_backoff_ms),
            max_backoff: Duration::from_millis(settings.max_backoff_ms),
        }
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::from(&WebSocketSettings::default())
    }
}

enum SessionEnd {
    Shutdown,
    ServerClosed,
}

/// Subscriber for the backend's `/ws` signal stream.
pub struct SignalSocket {
    url: String,
    policy: ReconnectPolicy,
}

impl SignalSocket {
    pub fn new(url: impl Into<String>, policy: ReconnectPolicy) -> Self {
        Self {
            url: url.into(),
            policy,
        }
    }

    /// Starts the connection loop. It stops when `shutdown` turns `true` (or
    /// its sender is dropped), sending a Close frame if connected.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> (mpsc::Receiver<SocketEvent>, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(64);
        let handle = tokio::spawn(self.run(tx, shutdown));
        (rx, handle)
    }

    async fn run(self, tx: mpsc::Sender<SocketEvent>, mut shutdown: watch::Receiver<bool>) {
        let mut failures: u32 = 0;

        loop {
            if *shutdown.borrow() {
                break;
            }

            let _ = tx
                .send(SocketEvent::State(SocketState::Connecting { attempt: failures + 1 }))
                .await;
            info!("Connecting to signal stream: {}", self.url);

            let connected = tokio::select! {
                res = connect_async(self.url.as_str()) => res,
                _ = wait_for_shutdown(&mut shutdown) => break,
            };

            let delay = match connected {
                Ok((stream, _)) => {
                    failures = 0;
                    info!("Signal stream connected");
                    let _ = tx.send(SocketEvent::State(SocketState::Connected)).await;

                    match Self::run_connection(stream, &tx, &mut shutdown).await {
                        Ok(SessionEnd::Shutdown) => break,
                        Ok(SessionEnd::ServerClosed) => {
                            warn!("Signal stream closed by server, reconnecting...");
                        }
                        Err(e) => {
                            error!("WebSocket error: {}, reconnecting...", e);
                            let _ = tx.send(SocketEvent::Error(e.to_string())).await;
                        }
                    }
                    let _ = tx.send(SocketEvent::State(SocketState::Disconnected)).await;
                    self.policy.backoff(1)
                }
                Err(e) => {
                    failures += 1;
                    let e = ClientError::from(e);
                    error!("WebSocket connection failed ({} of {}): {}", failures, self.policy.max_retries + 1, e);
                    let _ = tx.send(SocketEvent::Error(e.to_string())).await;

                    if failures > self.policy.max_retries {
                        warn!("Giving up on signal stream after {} attempts", failures);
                        let _ = tx
                            .send(SocketEvent::State(SocketState::Failed { attempts: failures }))
                            .await;
                        return;
                    }
                    let _ = tx.send(SocketEvent::State(SocketState::Disconnected)).await;
                    self.policy.backoff(failures)
                }
            };

            debug!("Reconnecting in {:?}", delay);
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = wait_for_shutdown(&mut shutdown) => break,
            }
        }

        let _ = tx.send(SocketEvent::State(SocketState::Closed)).await;
        info!("Signal stream stopped");
    }

    async fn run_connection<S>(
        stream: tokio_tungstenite::WebSocketStream<S>,
        tx: &mpsc::Sender<SocketEvent>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<SessionEnd, ClientError>
    where
        S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
    {
        let (mut write, mut read) = stream.split();

        loop {
            tokio::select! {
                _ = wait_for_shutdown(shutdown) => {
                    if let Err(e) = write.send(Message::Close(None)).await {
                        debug!("Close frame not delivered: {}", e);
                    }
                    return Ok(SessionEnd::Shutdown);
                }
                msg = read.next() => match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(signals) = Self::parse_frame(&text) {
                            if tx.send(SocketEvent::Signals(signals)).await.is_err() {
                                return Ok(SessionEnd::Shutdown);
                            }
                        }
                    }
                    Some(Ok(Message::Ping(_))) => {
                        debug!("Received ping");
                    }
                    Some(Ok(Message::Close(_))) | None => return Ok(SessionEnd::ServerClosed),
                    Some(Err(e)) => return Err(e.into()),
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    /// Decodes one frame into the display-ordered signal list.
    ///
    /// Frames without `signal_data` and malformed frames yield `None`.
    pub fn parse_frame(text: &str) -> Option<Vec<Signal>> {
        match serde_json::from_str::<SignalsResponse>(text) {
            Ok(frame) => {
                let signals = frame.into_display_order();
                if signals.is_none() {
                    debug!("Ignoring frame without signal_data: {}", text);
                }
                signals
            }
            Err(e) => {
                warn!("Malformed signal frame: {}", e);
                None
            }
        }
    }
}

async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}
