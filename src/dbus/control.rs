//! Control interface for key bindings
//!
//! Exposes the key-bindable actions on the session bus so a window
//! manager binding can run `area-notify <action>`.

use anyhow::{Context, Result};
use zbus::{Connection, interface, proxy};

use crate::events::{EventSender, LoopEvent};

pub const NAME: &str = "org.area.Notify";
pub const PATH: &str = "/org/area/Notify";

/// `org.area.Notify1` object
pub struct ControlServer {
    events: EventSender,
    actions: Vec<String>,
}

impl ControlServer {
    pub fn new(events: EventSender, actions: Vec<String>) -> Self {
        Self { events, actions }
    }
}

#[interface(name = "org.area.Notify1")]
impl ControlServer {
    /// Run a named action (close, close_all, prev, next, pause)
    fn invoke(&self, action: String) -> zbus::fdo::Result<()> {
        if !self.actions.contains(&action) {
            return Err(zbus::fdo::Error::InvalidArgs(format!(
                "Unknown action {:?}, expected one of: {}",
                action,
                self.actions.join(", ")
            )));
        }
        self.events
            .send(LoopEvent::Action(action))
            .map_err(|_| zbus::fdo::Error::Failed("Notification server is shutting down".into()))
    }

    fn list_actions(&self) -> Vec<String> {
        self.actions.clone()
    }
}

/// Proxy for the control interface of a running daemon
#[proxy(
    interface = "org.area.Notify1",
    default_service = "org.area.Notify",
    default_path = "/org/area/Notify"
)]
trait Control {
    fn invoke(&self, action: &str) -> zbus::Result<()>;

    fn list_actions(&self) -> zbus::Result<Vec<String>>;
}

/// Ask the running daemon to perform an action
pub async fn invoke(action: &str) -> Result<()> {
    let conn = Connection::session()
        .await
        .context("Failed to connect to D-Bus session bus")?;
    let proxy = ControlProxy::new(&conn).await?;
    proxy
        .invoke(action)
        .await
        .with_context(|| format!("Failed to invoke {:?} (is area-notify running?)", action))?;
    Ok(())
}
