//! User-facing notification side channel

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Severity of a notification; each maps onto a display colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Info,
    Error,
}

impl Severity {
    pub fn color(&self) -> &'static str {
        match self {
            Self::Success => "green",
            Self::Info => "blue",
            Self::Error => "red",
        }
    }
}

/// A short-lived message for the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub severity: Severity,
}

impl Notification {
    pub fn new(title: impl Into<String>, message: impl Into<String>, severity: Severity) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            severity,
        }
    }
}

/// Cloneable publisher for [`Notification`]s.
///
/// Publishing never blocks and never fails from the caller's point of view:
/// with nobody subscribed the notification is dropped.
#[derive(Debug, Clone)]
pub struct Notifier {
    sender: broadcast::Sender<Notification>,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Get a receiver for subsequent notifications
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    pub fn show(&self, notification: Notification) {
        log::debug!(
            "Notification [{}] {}: {}",
            notification.severity.color(),
            notification.title,
            notification.message
        );
        // Nobody listening is fine
        let _ = self.sender.send(notification);
    }

    pub fn success(&self, title: &str, message: impl Into<String>) {
        self.show(Notification::new(title, message, Severity::Success));
    }

    pub fn info(&self, title: &str, message: impl Into<String>) {
        self.show(Notification::new(title, message, Severity::Info));
    }

    pub fn error(&self, title: &str, message: impl Into<String>) {
        self.show(Notification::new(title, message, Severity::Error));
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(64)
    }
}
