//! Popup slots
//!
//! A slot is one reusable popup window. Slots are created once and move
//! between the hidden and shown pools for the lifetime of the server.

use crate::config::Style;
use crate::notification::NotificationId;

/// Stable slot identity, also the index into the server's slot table
pub type SlotId = usize;

/// Top-left corner of a popup on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

/// One popup window
#[derive(Debug, Clone, PartialEq)]
pub struct PopupSlot {
    pub id: SlotId,
    pub position: Position,
    /// Value of the server's display counter when this slot was last drawn
    pub display_id: u64,
    /// Key a later notification's `replaces_id` is matched against
    pub replaces_key: Option<NotificationId>,
    /// Live notification on display; `None` while showing history
    pub notification: Option<NotificationId>,
}

impl PopupSlot {
    pub fn new(id: SlotId) -> Self {
        Self {
            id,
            position: Position::default(),
            display_id: 0,
            replaces_key: None,
            notification: None,
        }
    }
}

/// Screen position for every stack index, topmost first
pub fn stack_positions(style: &Style) -> Vec<Position> {
    let step = style.height as i32 + 2 * style.border_width as i32 + style.gap;
    (0..style.max_windows)
        .map(|index| Position {
            x: style.x,
            y: style.y + index as i32 * step,
        })
        .collect()
}
