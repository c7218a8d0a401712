//! D-Bus integration
//!
//! Owns the notification server name and the control interface on the
//! session bus.

use anyhow::{Context, Result};
use zbus::Connection;
use zbus::connection::Builder;

use crate::events::EventSender;
use crate::notification::{CloseReason, NotificationId};

pub mod control;
pub mod notifications;

pub struct DbusManager {
    conn: Connection,
}

impl DbusManager {
    /// Connect to the session bus, export both interfaces and claim their names
    pub async fn serve(events: EventSender, actions: Vec<String>) -> Result<Self> {
        let conn = Builder::session()?
            .serve_at(
                notifications::PATH,
                notifications::NotificationsServer::new(events.clone()),
            )?
            .serve_at(control::PATH, control::ControlServer::new(events, actions))?
            .name(notifications::NAME)?
            .name(control::NAME)?
            .build()
            .await
            .context("Failed to own org.freedesktop.Notifications (is another notification daemon running?)")?;

        tracing::info!("Serving {} on the session bus", notifications::NAME);

        Ok(Self { conn })
    }

    /// Report a notification that left the screen
    pub async fn notification_closed(&self, id: NotificationId, reason: CloseReason) -> Result<()> {
        notifications::emit_closed(&self.conn, id, reason)
            .await
            .with_context(|| format!("Failed to emit NotificationClosed for {}", id))
    }
}
