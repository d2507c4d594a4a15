//! User-facing notifications ("toasts").
//!
//! Components publish; whoever owns the UI subscribes. Sending never fails:
//! with no subscribers the notification is only logged.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub level: Level,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Cloneable publisher over a broadcast channel.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notification>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(64)
    }
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    pub fn notify(&self, notification: Notification) {
        match notification.level {
            Level::Error => tracing::error!(title = %notification.title, description = ?notification.description, "notification"),
            Level::Warning => tracing::warn!(title = %notification.title, description = ?notification.description, "notification"),
            _ => tracing::info!(title = %notification.title, "notification"),
        }
        let _ = self.tx.send(notification); // Ignore error if no receivers
    }

    pub fn info(&self, title: impl Into<String>) {
        self.notify(Notification {
            level: Level::Info,
            title: title.into(),
            description: None,
        });
    }

    pub fn success(&self, title: impl Into<String>) {
        self.notify(Notification {
            level: Level::Success,
            title: title.into(),
            description: None,
        });
    }

    pub fn warning(&self, title: impl Into<String>, description: impl Into<String>) {
        self.notify(Notification {
            level: Level::Warning,
            title: title.into(),
            description: Some(description.into()),
        });
    }

    pub fn error(&self, title: impl Into<String>, description: impl Into<String>) {
        self.notify(Notification {
            level: Level::Error,
            title: title.into(),
            description: Some(description.into()),
        });
    }
}
