//! Notification data model
//!
//! Notifications are created by the D-Bus transport on receipt and never
//! change afterwards. Every received notification is kept in [`History`].

use std::path::PathBuf;

/// Transport-assigned notification id (the value returned by `Notify`)
pub type NotificationId = u32;

/// Three-level severity classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Urgency {
    Low,
    #[default]
    Normal,
    Critical,
}

impl Urgency {
    /// Map the `urgency` hint byte; unrecognized values are normal urgency
    pub fn from_hint(value: Option<u8>) -> Self {
        match value {
            Some(0) => Self::Low,
            Some(2) => Self::Critical,
            _ => Self::Normal,
        }
    }

    /// Index into per-urgency option triples
    pub fn index(self) -> usize {
        match self {
            Self::Low => 0,
            Self::Normal => 1,
            Self::Critical => 2,
        }
    }
}

/// A single received notification
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: NotificationId,
    pub summary: String,
    pub body: String,
    pub app_name: String,
    pub app_icon: Option<PathBuf>,
    pub urgency: Urgency,
    /// Requested timeout in milliseconds. `None` means "use the default".
    pub timeout_ms: Option<i32>,
    pub replaces_id: Option<NotificationId>,
}

impl Notification {
    /// Key used to find a shown popup this notification may update in place
    pub fn replaces_key(&self) -> NotificationId {
        self.replaces_id.unwrap_or(self.id)
    }
}

/// Why a notification left the screen (values of the `NotificationClosed` signal)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    Expired = 1,
    Dismissed = 2,
    Closed = 3,
}

/// Append-only record of every notification received, in arrival order
#[derive(Debug, Default)]
pub struct History {
    entries: Vec<Notification>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, notification: Notification) {
        self.entries.push(notification);
    }

    pub fn get(&self, index: usize) -> Option<&Notification> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
