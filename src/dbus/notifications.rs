//! Desktop notifications server for org.freedesktop.Notifications
//!
//! Implements the receiving side of the freedesktop notification
//! specification. Calls are converted into [`Notification`] values and
//! posted to the main loop; nothing is drawn from here.

use std::collections::HashMap;
use std::path::PathBuf;
use tracing::debug;
use zbus::interface;
use zbus::object_server::SignalEmitter;
use zbus::zvariant::{OwnedValue, Value};

use crate::events::{EventSender, LoopEvent};
use crate::notification::{CloseReason, Notification, NotificationId, Urgency};

pub const NAME: &str = "org.freedesktop.Notifications";
pub const PATH: &str = "/org/freedesktop/Notifications";

/// Advertised by `GetCapabilities`
pub const CAPABILITIES: [&str; 2] = ["body", "body-markup"];

/// The hints this server understands
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Hints {
    pub urgency: Option<u8>,
    pub image_path: Option<String>,
}

impl Hints {
    pub fn from_dbus(hints: &HashMap<String, OwnedValue>) -> Self {
        let urgency = hints.get("urgency").and_then(|value| match &**value {
            Value::U8(urgency) => Some(*urgency),
            _ => None,
        });
        let image_path = hints.get("image-path").and_then(|value| match &**value {
            Value::Str(path) => Some(path.as_str().to_string()),
            _ => None,
        });
        Self { urgency, image_path }
    }
}

/// Only file paths can be loaded; themed icon names are ignored
fn icon_path(value: &str) -> Option<PathBuf> {
    let path = value.strip_prefix("file://").unwrap_or(value);
    path.starts_with('/').then(|| PathBuf::from(path))
}

/// Build a notification from the arguments of a `Notify` call
#[allow(clippy::too_many_arguments)]
pub fn build_notification(
    id: NotificationId,
    app_name: String,
    replaces_id: u32,
    app_icon: &str,
    summary: String,
    body: String,
    hints: &Hints,
    expire_timeout: i32,
) -> Notification {
    let app_icon = icon_path(app_icon).or_else(|| hints.image_path.as_deref().and_then(icon_path));

    Notification {
        id,
        summary,
        body,
        app_name,
        app_icon,
        urgency: Urgency::from_hint(hints.urgency),
        timeout_ms: (expire_timeout >= 0).then_some(expire_timeout),
        replaces_id: (replaces_id != 0).then_some(replaces_id),
    }
}

/// `org.freedesktop.Notifications` object
pub struct NotificationsServer {
    events: EventSender,
    last_id: NotificationId,
}

impl NotificationsServer {
    pub fn new(events: EventSender) -> Self {
        Self { events, last_id: 0 }
    }

    fn post(&self, event: LoopEvent) -> zbus::fdo::Result<()> {
        self.events
            .send(event)
            .map_err(|_| zbus::fdo::Error::Failed("Notification server is shutting down".into()))
    }
}

#[interface(name = "org.freedesktop.Notifications")]
impl NotificationsServer {
    /// Show a notification, or update the one with id `replaces_id`
    #[allow(clippy::too_many_arguments)]
    async fn notify(
        &mut self,
        app_name: String,
        replaces_id: u32,
        app_icon: String,
        summary: String,
        body: String,
        _actions: Vec<String>,
        hints: HashMap<String, OwnedValue>,
        expire_timeout: i32,
    ) -> zbus::fdo::Result<u32> {
        let id = if replaces_id != 0 {
            // Never hand out an id a client has already claimed
            self.last_id = self.last_id.max(replaces_id);
            replaces_id
        } else {
            self.last_id = self.last_id.wrapping_add(1).max(1);
            self.last_id
        };

        let hints = Hints::from_dbus(&hints);
        let notif = build_notification(
            id,
            app_name,
            replaces_id,
            &app_icon,
            summary,
            body,
            &hints,
            expire_timeout,
        );
        debug!("Received notification {} from {:?}", id, notif.app_name);
        self.post(LoopEvent::Notify(notif))?;
        Ok(id)
    }

    /// Close a notification on behalf of its sender
    async fn close_notification(&self, id: u32) -> zbus::fdo::Result<()> {
        self.post(LoopEvent::CloseNotification(id))
    }

    fn get_capabilities(&self) -> Vec<String> {
        CAPABILITIES.iter().map(|c| c.to_string()).collect()
    }

    fn get_server_information(&self) -> (String, String, String, String) {
        (
            "area-notify".to_string(),
            "Area".to_string(),
            env!("CARGO_PKG_VERSION").to_string(),
            "1.2".to_string(),
        )
    }

    #[zbus(signal)]
    async fn notification_closed(
        emitter: &SignalEmitter<'_>,
        id: u32,
        reason: u32,
    ) -> zbus::Result<()>;
}

/// Emit `NotificationClosed` for a notification that left the screen
pub async fn emit_closed(conn: &zbus::Connection, id: NotificationId, reason: CloseReason) -> zbus::Result<()> {
    let emitter = SignalEmitter::new(conn, PATH)?;
    NotificationsServer::notification_closed(&emitter, id, reason as u32).await
}
