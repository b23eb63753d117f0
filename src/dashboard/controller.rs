use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::{DashboardData, DashboardState};
use crate::client::{
    ClientError, ReconnectPolicy, SignalBackend, SignalSocket, SocketEvent, SocketState, TickSource,
};
use crate::config::AppConfig;
use crate::notifications::{request_failed, AlertType, NotificationManager, Operation};
use crate::types::{Frequency, ProcessCommand, Signal};

const STREAM_SERVICE: &str = "signal stream";

#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub ws_url: String,
    pub reconnect: ReconnectPolicy,
    pub tick_interval: Duration,
    pub tick_capacity: usize,
    pub frequency: Frequency,
}

impl From<&AppConfig> for ControllerSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            ws_url: config.api.ws_url(),
            reconnect: ReconnectPolicy::from(&config.websocket),
            tick_interval: config.ticks.interval(),
            tick_capacity: config.ticks.capacity,
            frequency: config.frequency,
        }
    }
}

struct MountedTasks {
    shutdown: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

/// Owns the dashboard state and drives it from three independent sources:
/// the signal stream, the tick timer and operator commands.
pub struct DashboardController {
    backend: Arc<dyn SignalBackend>,
    ticks: Arc<dyn TickSource>,
    state: DashboardState,
    notifications: Arc<NotificationManager>,
    settings: ControllerSettings,
    stream_lost: AtomicBool,
    tasks: Mutex<Option<MountedTasks>>,
}

impl DashboardController {
    pub fn new(
        backend: Arc<dyn SignalBackend>,
        ticks: Arc<dyn TickSource>,
        settings: ControllerSettings,
    ) -> Self {
        Self {
            backend,
            ticks,
            state: DashboardState::new(settings.frequency, settings.tick_capacity),
            notifications: Arc::new(NotificationManager::default()),
            settings,
            stream_lost: AtomicBool::new(false),
            tasks: Mutex::new(None),
        }
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    pub fn notifications(&self) -> &Arc<NotificationManager> {
        &self.notifications
    }

    pub async fn snapshot(&self) -> DashboardData {
        self.state.snapshot().await
    }

    /// Polls `/is_running` for the selected frequency. On failure the last
    /// known flag is kept and the error is reported.
    pub async fn check_if_running(&self) -> Result<bool, ClientError> {
        let frequency = self.state.frequency().await;
        match self.backend.is_running(frequency).await {
            Ok(status) => {
                debug!("is_running({}) -> {}", frequency, status.message);
                self.state.set_running(status.is_running()).await;
                Ok(status.is_running())
            }
            Err(e) => {
                self.report(Operation::StatusPoll, &e).await;
                Err(e)
            }
        }
    }

    /// Replaces the feed with `/signals`, newest first.
    pub async fn fetch_signals(&self) -> Result<usize, ClientError> {
        match self.backend.signals().await {
            Ok(response) => {
                let signals = response.into_display_order().unwrap_or_default();
                let count = signals.len();
                self.replace_signals(signals).await;
                Ok(count)
            }
            Err(e) => {
                self.report(Operation::SignalFetch, &e).await;
                Err(e)
            }
        }
    }

    /// Issues the opposite of the last known running flag and takes the new
    /// flag from the command's acknowledgment.
    pub async fn handle_start_stop(&self) -> Result<bool, ClientError> {
        let command = ProcessCommand::toggle_from(self.state.running().await);
        let frequency = self.state.frequency().await;
        let operation = match command {
            ProcessCommand::Start => Operation::StartFetch,
            ProcessCommand::Stop => Operation::StopFetch,
        };

        info!("{} requested for {}", command, frequency);
        match self.backend.send_command(command, frequency).await {
            Ok(ack) => {
                let running = ack.running_after(command);
                info!("{} acknowledged: {}", command, ack.describe());
                self.state.set_running(running).await;

                let alert = if running {
                    AlertType::ProcessStarted { frequency }
                } else {
                    AlertType::ProcessStopped { frequency }
                };
                let notification = self.notifications.notify(alert).await;
                self.state.publish_notice(notification);
                Ok(running)
            }
            Err(e) => {
                if command == ProcessCommand::Stop && e.status_code() == Some(400) {
                    warn!("Backend has no {} process to stop", frequency);
                }
                self.report(operation, &e).await;
                Err(e)
            }
        }
    }

    pub async fn set_frequency(&self, frequency: Frequency) {
        self.state.set_frequency(frequency).await;
    }

    /// Appends one sample from the ticker to the bounded buffer.
    pub async fn poll_tick(&self) -> Result<(), ClientError> {
        match self.ticks.second_ticks().await {
            Ok(tick) => {
                self.state.push_tick(tick).await;
                Ok(())
            }
            Err(e) => {
                self.report(Operation::TickPoll, &e).await;
                Err(e)
            }
        }
    }

    pub async fn apply_socket_event(&self, event: SocketEvent) {
        match event {
            SocketEvent::Signals(signals) => self.replace_signals(signals).await,
            SocketEvent::State(state) => {
                let previous = self.state.snapshot().await.socket;
                self.state.set_socket_state(state).await;

                let alert = match (previous, state) {
                    (SocketState::Connected, SocketState::Disconnected) => {
                        self.stream_lost.store(true, Ordering::SeqCst);
                        Some(AlertType::ConnectionLost {
                            service: STREAM_SERVICE.to_string(),
                        })
                    }
                    (_, SocketState::Connected) if self.stream_lost.swap(false, Ordering::SeqCst) => {
                        Some(AlertType::ConnectionRestored {
                            service: STREAM_SERVICE.to_string(),
                        })
                    }
                    (_, SocketState::Failed { attempts }) => Some(AlertType::ReconnectAbandoned {
                        service: STREAM_SERVICE.to_string(),
                        attempts,
                    }),
                    _ => None,
                };
                if let Some(alert) = alert {
                    let is_error = alert.is_error();
                    let notification = self.notifications.notify(alert).await;
                    if is_error {
                        self.state.record_error(&notification).await;
                    }
                    self.state.publish_notice(notification);
                }
            }
            SocketEvent::Error(message) => {
                self.report(Operation::SignalStream, &message).await;
            }
        }
    }

    async fn replace_signals(&self, signals: Vec<Signal>) {
        let previous_head = self
            .state
            .snapshot()
            .await
            .current_signal()
            .map(|s| (s.signal, s.time.clone()));
        let head = signals.first().map(|s| (s.signal, s.time.clone()));

        self.state.replace_signals(signals).await;

        if let Some((signal, time)) = head {
            if previous_head.as_ref() != Some(&(signal, time.clone())) {
                let notification = self
                    .notifications
                    .notify(AlertType::SignalReceived { signal, time })
                    .await;
                self.state.publish_notice(notification);
            }
        }
    }

    async fn report(&self, operation: Operation, err: &impl std::fmt::Display) {
        let notification = self.notifications.notify(request_failed(operation, err)).await;
        self.state.record_error(&notification).await;
        self.state.publish_notice(notification);
    }

    /// Starts the initial fetches, the signal stream and the tick timer.
    /// Calling it again while mounted does nothing.
    pub async fn mount(self: &Arc<Self>) {
        let mut tasks = self.tasks.lock().await;
        if tasks.is_some() {
            warn!("Dashboard already mounted");
            return;
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut handles = Vec::with_capacity(4);

        // Status and signals, unordered relative to each other
        let controller = Arc::clone(self);
        handles.push(tokio::spawn(async move {
            let _ = tokio::join!(controller.check_if_running(), controller.fetch_signals());
        }));

        let socket = SignalSocket::new(self.settings.ws_url.clone(), self.settings.reconnect);
        let (mut events, socket_handle) = socket.spawn(shutdown_rx.clone());
        handles.push(socket_handle);

        let controller = Arc::clone(self);
        handles.push(tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                controller.apply_socket_event(event).await;
            }
        }));

        let controller = Arc::clone(self);
        let period = self.settings.tick_interval;
        let mut shutdown = shutdown_rx;
        handles.push(tokio::spawn(async move {
            let mut timer = interval_at(Instant::now() + period, period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = timer.tick() => {
                        let _ = controller.poll_tick().await;
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!("Tick timer stopped");
        }));

        info!(
            "Dashboard mounted: stream={}, tick interval={:?}",
            self.settings.ws_url, period
        );
        *tasks = Some(MountedTasks {
            shutdown: shutdown_tx,
            handles,
        });
    }

    /// Closes the signal stream and stops the tick timer. Idempotent.
    pub async fn teardown(&self) {
        let Some(mounted) = self.tasks.lock().await.take() else {
            return;
        };

        let _ = mounted.shutdown.send(true);
        for handle in mounted.handles {
            let abort = handle.abort_handle();
            if tokio::time::timeout(Duration::from_secs(2), handle).await.is_err() {
                abort.abort();
            }
        }
        info!("Dashboard torn down");
    }

    pub async fn is_mounted(&self) -> bool {
        self.tasks.lock().await.is_some()
    }
}
