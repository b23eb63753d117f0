use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

use crate::client::SocketState;
use crate::notifications::Notification;
use crate::types::{Frequency, Signal, Tick, TickBuffer};

/// Shared dashboard state. Each slot has a single writer path; readers take
/// cloned snapshots.
#[derive(Clone)]
pub struct DashboardState {
    inner: Arc<RwLock<DashboardData>>,
    pub tx: broadcast::Sender<DashboardEvent>,
}

impl DashboardState {
    pub fn new(frequency: Frequency, tick_capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(100);
        Self {
            inner: Arc::new(RwLock::new(DashboardData {
                signals: Vec::new(),
                running: false,
                frequency,
                ticks: TickBuffer::new(tick_capacity),
                socket: SocketState::Disconnected,
                last_error: None,
            })),
            tx,
        }
    }

    /// Overwrites the signal list; no merge with the previous one.
    pub async fn replace_signals(&self, signals: Vec<Signal>) {
        let count = signals.len();
        self.inner.write().await.signals = signals;
        let _ = self.tx.send(DashboardEvent::SignalsReplaced { count });
    }

    pub async fn set_running(&self, running: bool) {
        let mut data = self.inner.write().await;
        let changed = data.running != running;
        data.running = running;
        drop(data);

        if changed {
            let _ = self.tx.send(DashboardEvent::RunningChanged { running });
        }
    }

    pub async fn set_frequency(&self, frequency: Frequency) {
        self.inner.write().await.frequency = frequency;
        let _ = self.tx.send(DashboardEvent::FrequencyChanged { frequency });
    }

    pub async fn push_tick(&self, tick: Tick) {
        self.inner.write().await.ticks.push(tick.clone());
        let _ = self.tx.send(DashboardEvent::NewTick(tick));
    }

    pub async fn set_socket_state(&self, state: SocketState) {
        self.inner.write().await.socket = state;
        let _ = self.tx.send(DashboardEvent::SocketChanged { state });
    }

    pub async fn record_error(&self, notification: &Notification) {
        self.inner.write().await.last_error = Some(notification.alert_type.detail());
    }

    pub fn publish_notice(&self, notification: Notification) {
        let _ = self.tx.send(DashboardEvent::Notice(notification));
    }

    pub async fn running(&self) -> bool {
        self.inner.read().await.running
    }

    pub async fn frequency(&self) -> Frequency {
        self.inner.read().await.frequency
    }

    pub async fn snapshot(&self) -> DashboardData {
        self.inner.read().await.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DashboardEvent> {
        self.tx.subscribe()
    }
}

impl Default for DashboardState {
    fn default() -> Self {
        Self::new(Frequency::default(), crate::types::DEFAULT_TICK_CAPACITY)
    }
}

#[derive(Debug, Clone)]
pub struct DashboardData {
    /// Newest first; `signals[0]` is the current signal.
    pub signals: Vec<Signal>,
    pub running: bool,
    pub frequency: Frequency,
    pub ticks: TickBuffer,
    pub socket: SocketState,
    pub last_error: Option<String>,
}

impl DashboardData {
    pub fn current_signal(&self) -> Option<&Signal> {
        self.signals.first()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum DashboardEvent {
    SignalsReplaced { count: usize },
    RunningChanged { running: bool },
    FrequencyChanged { frequency: Frequency },
    NewTick(Tick),
    SocketChanged { state: SocketState },
    Notice(Notification),
}
