use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub kind: NotificationKind,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Transient user-facing messages. Each entry expires on its own after the
/// timeout; order of insertion is kept.
#[derive(Debug)]
pub struct NotificationQueue {
    items: Vec<Notification>,
    timeout: Duration,
}

impl Default for NotificationQueue {
    fn default() -> Self {
        NotificationQueue::new(5000)
    }
}

impl NotificationQueue {
    pub fn new(timeout_ms: i64) -> Self {
        NotificationQueue {
            items: Vec::new(),
            timeout: Duration::milliseconds(timeout_ms),
        }
    }

    pub fn set_timeout_ms(&mut self, timeout_ms: i64) {
        self.timeout = Duration::milliseconds(timeout_ms);
    }

    /// Queues a message, dropping whatever has already expired at `now`.
    pub fn push_at(&mut self, kind: NotificationKind, message: impl Into<String>, now: DateTime<Utc>) -> String {
        self.expire(now);
        let id = Uuid::new_v4().to_string();
        self.items.push(Notification {
            id: id.clone(),
            kind,
            message: message.into(),
            created_at: now,
        });
        id
    }

    pub fn push(&mut self, kind: NotificationKind, message: impl Into<String>) -> String {
        self.push_at(kind, message, Utc::now())
    }

    pub fn success(&mut self, message: impl Into<String>) -> String {
        self.push(NotificationKind::Success, message)
    }

    pub fn error(&mut self, message: impl Into<String>) -> String {
        self.push(NotificationKind::Error, message)
    }

    pub fn info(&mut self, message: impl Into<String>) -> String {
        self.push(NotificationKind::Info, message)
    }

    pub fn expire(&mut self, now: DateTime<Utc>) {
        let timeout = self.timeout;
        self.items.retain(|n| now - n.created_at < timeout);
    }

    pub fn dismiss(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|n| n.id != id);
        self.items.len() != before
    }

    pub fn items(&self) -> &[Notification] {
        &self.items
    }
}
