use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::types::{Frequency, SignalKind};

const DEFAULT_MAX_NOTIFICATIONS: usize = 200;

/// Notification severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub fn css_class(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

/// Which dashboard operation produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    StatusPoll,
    SignalFetch,
    StartFetch,
    StopFetch,
    TickPoll,
    SignalStream,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Operation::StatusPoll => "status poll",
            Operation::SignalFetch => "signal fetch",
            Operation::StartFetch => "start",
            Operation::StopFetch => "stop",
            Operation::TickPoll => "tick poll",
            Operation::SignalStream => "signal stream",
        };
        f.write_str(name)
    }
}

/// Types of notifications
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum AlertType {
    RequestFailed {
        operation: Operation,
        message: String,
    },
    ConnectionLost {
        service: String,
    },
    ConnectionRestored {
        service: String,
    },
    ReconnectAbandoned {
        service: String,
        attempts: u32,
    },
    ProcessStarted {
        frequency: Frequency,
    },
    ProcessStopped {
        frequency: Frequency,
    },
    SignalReceived {
        signal: SignalKind,
        time: String,
    },
}

impl AlertType {
    /// Get default severity for this alert type
    pub fn default_severity(&self) -> Severity {
        match self {
            AlertType::ReconnectAbandoned { .. } => Severity::Critical,
            AlertType::RequestFailed { operation: Operation::TickPoll, .. } => Severity::Warning,
            AlertType::RequestFailed { .. } => Severity::Critical,
            AlertType::ConnectionLost { .. } => Severity::Warning,
            _ => Severity::Info,
        }
    }

    /// Get a human-readable title for this alert
    pub fn title(&self) -> String {
        match self {
            AlertType::RequestFailed { operation, .. } => format!("Request failed: {}", operation),
            AlertType::ConnectionLost { service } => format!("Connection Lost: {}", service),
            AlertType::ConnectionRestored { service } => format!("Connection Restored: {}", service),
            AlertType::ReconnectAbandoned { service, .. } => format!("Gave up reconnecting: {}", service),
            AlertType::ProcessStarted { frequency } => format!("Prediction started ({})", frequency),
            AlertType::ProcessStopped { frequency } => format!("Prediction stopped ({})", frequency),
            AlertType::SignalReceived { signal, .. } => format!("New signal: {}", signal),
        }
    }

    pub fn detail(&self) -> String {
        match self {
            AlertType::RequestFailed { message, .. } => message.clone(),
            AlertType::ReconnectAbandoned { attempts, .. } => {
                format!("{} connection attempts failed", attempts)
            }
            AlertType::SignalReceived { time, .. } => time.clone(),
            _ => String::new(),
        }
    }

    /// Operation of a failed request, used to fold repeats into one notice.
    pub fn failed_operation(&self) -> Option<Operation> {
        match self {
            AlertType::RequestFailed { operation, .. } => Some(*operation),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self,
            AlertType::RequestFailed { .. } | AlertType::ReconnectAbandoned { .. }
        )
    }
}

/// A notification/alert
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub alert_type: AlertType,
    pub acknowledged: bool,
    /// How many times the same failure was seen while unacknowledged.
    #[serde(default = "one")]
    pub occurrences: u32,
}

fn one() -> u32 {
    1
}

impl Notification {
    pub fn new(alert_type: AlertType) -> Self {
        let severity = alert_type.default_severity();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            severity,
            alert_type,
            acknowledged: false,
            occurrences: 1,
        }
    }
}

/// Bounded, newest-first store of notifications rendered by the dashboard.
pub struct NotificationManager {
    notifications: Arc<RwLock<VecDeque<Notification>>>,
    max_notifications: usize,
}

impl NotificationManager {
    pub fn new(max_notifications: usize) -> Self {
        Self {
            notifications: Arc::new(RwLock::new(VecDeque::new())),
            max_notifications: max_notifications.max(1),
        }
    }

    /// Records a notification and returns it.
    ///
    /// A failed request whose operation already has an unacknowledged notice
    /// updates that notice in place and moves it to the front, so a failing
    /// poll cannot push other errors out of the store.
    pub async fn notify(&self, alert_type: AlertType) -> Notification {
        let mut notifications = self.notifications.write().await;

        if let Some(operation) = alert_type.failed_operation() {
            let repeat = notifications.iter().position(|n| {
                !n.acknowledged && n.alert_type.failed_operation() == Some(operation)
            });
            if let Some(mut notification) = repeat.and_then(|i| notifications.remove(i)) {
                notification.alert_type = alert_type;
                notification.timestamp = Utc::now();
                notification.occurrences = notification.occurrences.saturating_add(1);
                debug!(
                    "{} - {} (x{})",
                    notification.alert_type.title(),
                    notification.alert_type.detail(),
                    notification.occurrences
                );
                notifications.push_front(notification.clone());
                return notification;
            }
        }

        let notification = Notification::new(alert_type);
        let title = notification.alert_type.title();
        let detail = notification.alert_type.detail();
        match notification.severity {
            Severity::Critical => error!("{} - {}", title, detail),
            Severity::Warning => warn!("{} - {}", title, detail),
            Severity::Info => info!("{} {}", title, detail),
        }

        notifications.push_front(notification.clone());
        notifications.truncate(self.max_notifications);

        notification
    }

    pub async fn get_all(&self) -> Vec<Notification> {
        self.notifications.read().await.iter().cloned().collect()
    }

    pub async fn get_recent(&self, limit: usize) -> Vec<Notification> {
        let notifications = self.notifications.read().await;
        notifications.iter().take(limit).cloned().collect()
    }

    /// Unacknowledged errors, newest first
    pub async fn get_unacknowledged_errors(&self) -> Vec<Notification> {
        let notifications = self.notifications.read().await;
        notifications
            .iter()
            .filter(|n| n.alert_type.is_error() && !n.acknowledged)
            .cloned()
            .collect()
    }

    /// Acknowledge a notification. Returns false for unknown ids.
    pub async fn acknowledge(&self, id: &str) -> bool {
        let mut notifications = self.notifications.write().await;
        match notifications.iter_mut().find(|n| n.id == id) {
            Some(notification) => {
                notification.acknowledged = true;
                true
            }
            None => false,
        }
    }

    pub async fn acknowledge_all(&self) -> usize {
        let mut notifications = self.notifications.write().await;
        let mut count = 0;
        for notification in notifications.iter_mut().filter(|n| !n.acknowledged) {
            notification.acknowledged = true;
            count += 1;
        }
        count
    }
}

impl Default for NotificationManager {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_NOTIFICATIONS)
    }
}

pub fn request_failed(operation: Operation, err: &impl std::fmt::Display) -> AlertType {
    AlertType::RequestFailed {
        operation,
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_defaults() {
        let failed = request_failed(Operation::StatusPoll, &"Error: 500");
        assert_eq!(failed.default_severity(), Severity::Critical);

        let tick = request_failed(Operation::TickPoll, &"timeout");
        assert_eq!(tick.default_severity(), Severity::Warning);

        let started = AlertType::ProcessStarted { frequency: Frequency::Minute };
        assert_eq!(started.default_severity(), Severity::Info);
        assert!(!started.is_error());
    }

    #[test]
    fn test_notification_creation() {
        let notification = Notification::new(AlertType::ConnectionLost {
            service: "signal stream".to_string(),
        });
        assert_eq!(notification.severity, Severity::Warning);
        assert!(!notification.acknowledged);
        assert_eq!(notification.alert_type.title(), "Connection Lost: signal stream");
    }

    #[tokio::test]
    async fn test_manager_is_bounded_newest_first() {
        let manager = NotificationManager::new(3);
        for i in 0..5 {
            manager
                .notify(AlertType::SignalReceived {
                    signal: SignalKind::Buy,
                    time: format!("t{}", i),
                })
                .await;
        }

        let all = manager.get_all().await;
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].alert_type.detail(), "t4");
        assert_eq!(manager.get_recent(1).await.len(), 1);
    }

    #[tokio::test]
    async fn test_acknowledge_clears_errors() {
        let manager = NotificationManager::default();
        let failure = manager
            .notify(request_failed(Operation::SignalFetch, &"Error: 502"))
            .await;
        manager
            .notify(AlertType::ProcessStopped { frequency: Frequency::Day })
            .await;

        assert_eq!(manager.get_unacknowledged_errors().await.len(), 1);
        assert!(manager.acknowledge(&failure.id).await);
        assert!(!manager.acknowledge("missing").await);
        assert!(manager.get_unacknowledged_errors().await.is_empty());
        assert_eq!(manager.acknowledge_all().await, 1);
    }

    #[tokio::test]
    async fn test_repeated_failures_fold_into_one_notice() {
        let manager = NotificationManager::default();
        let start = manager
            .notify(request_failed(Operation::StartFetch, &"Error: 503 from /start_fetch"))
            .await;
        let mut last = None;
        for i in 0..DEFAULT_MAX_NOTIFICATIONS {
            last = Some(
                manager
                    .notify(request_failed(Operation::TickPoll, &format!("timeout {}", i)))
                    .await,
            );
        }
        let last = last.unwrap();

        let errors = manager.get_unacknowledged_errors().await;
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].id, last.id);
        assert_eq!(errors[0].occurrences, DEFAULT_MAX_NOTIFICATIONS as u32);
        assert_eq!(errors[0].alert_type.detail(), "timeout 199");
        assert_eq!(errors[1].id, start.id);
        assert_eq!(errors[1].severity, Severity::Critical);
    }

    #[tokio::test]
    async fn test_acknowledged_failure_starts_a_new_notice() {
        let manager = NotificationManager::default();
        let first = manager.notify(request_failed(Operation::SignalFetch, &"Error: 502")).await;
        assert!(manager.acknowledge(&first.id).await);

        let second = manager.notify(request_failed(Operation::SignalFetch, &"Error: 502")).await;
        assert_ne!(second.id, first.id);
        assert_eq!(second.occurrences, 1);
        assert_eq!(manager.get_all().await.len(), 2);
    }
}
