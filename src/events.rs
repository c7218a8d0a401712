//! Main loop events
//!
//! Everything that mutates the popup server arrives here first: D-Bus calls
//! and timer expiries are posted to one channel and handled in order on the
//! main loop.

use tokio::sync::mpsc;

use crate::notification::{Notification, NotificationId};
use crate::server::popup::SlotId;

#[derive(Debug)]
pub enum LoopEvent {
    /// A client called `Notify`
    Notify(Notification),
    /// A client called `CloseNotification`
    CloseNotification(NotificationId),
    /// A named key-bound action was invoked
    Action(String),
    /// A popup's auto-close timer fired
    Expire { slot: SlotId, display_id: u64 },
}

pub type EventSender = mpsc::UnboundedSender<LoopEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<LoopEvent>;

pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
