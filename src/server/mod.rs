//! Popup Server
//!
//! Owns a fixed pool of popup slots and decides which notification is shown
//! in which slot, when popups are recycled, queued or closed. Also
//! implements pause/resume and history browsing.
//!
//! Everything here runs on the main loop thread; operations never
//! interleave. Deferred closes carry the slot's `display_id` and are
//! dropped when the slot has been redrawn since.

pub mod actions;
pub mod backend;
pub mod icons;
pub mod popup;
pub mod text;

use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{FullscreenPolicy, Style};
use crate::notification::{CloseReason, History, Notification, NotificationId};
use backend::{FullscreenProbe, RenderSurface, TextLine, TimerService};
use icons::IconCache;
use popup::{PopupSlot, Position, SlotId};

/// Active history browsing state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScrollCursor {
    slot: SlotId,
    /// Index into the history
    index: usize,
}

/// Notification popup server
pub struct Server {
    style: Style,
    positions: Vec<Position>,
    slots: Vec<PopupSlot>,
    /// Free slots, used as a stack
    hidden: Vec<SlotId>,
    /// Visible slots, index 0 is the topmost position
    shown: Vec<SlotId>,
    queue: VecDeque<Notification>,
    scroll: Option<ScrollCursor>,
    display_counter: u64,
    paused: bool,
    /// Waiting for fullscreen to end before replaying the queue
    watching_fullscreen: bool,
    icons: IconCache,
    /// Live notifications that left the screen, not yet reported
    closed: Vec<(NotificationId, CloseReason)>,
    surface: Box<dyn RenderSurface>,
    timers: Box<dyn TimerService>,
    fullscreen: Box<dyn FullscreenProbe>,
}

impl Server {
    /// Create a server with `style.max_windows` hidden slots
    pub fn new(
        style: Style,
        surface: Box<dyn RenderSurface>,
        timers: Box<dyn TimerService>,
        fullscreen: Box<dyn FullscreenProbe>,
    ) -> Self {
        let positions = popup::stack_positions(&style);
        let slots: Vec<PopupSlot> = (0..style.max_windows).map(PopupSlot::new).collect();
        let hidden = (0..style.max_windows).collect();
        info!("Popup server configured with {} windows", slots.len());

        Self {
            icons: IconCache::new(style.icon_size),
            style,
            positions,
            slots,
            hidden,
            shown: Vec::new(),
            queue: VecDeque::new(),
            scroll: None,
            display_counter: 0,
            paused: false,
            watching_fullscreen: false,
            closed: Vec::new(),
            surface,
            timers,
            fullscreen,
        }
    }

    /// Handle an inbound notification: show it, update a popup in place, or queue it
    pub fn notify(&mut self, notif: Notification) {
        if self.paused {
            debug!("Paused, queueing notification {}", notif.id);
            self.queue.push_back(notif);
            return;
        }

        if self.style.fullscreen != FullscreenPolicy::Show && self.fullscreen.fullscreen_active() {
            if self.style.fullscreen == FullscreenPolicy::Queue {
                if !self.watching_fullscreen {
                    debug!("Fullscreen active, holding notifications until it ends");
                    self.watching_fullscreen = true;
                }
                self.queue.push_back(notif);
            } else {
                debug!("Fullscreen active, dropping notification {}", notif.id);
                self.closed.push((notif.id, CloseReason::Dismissed));
            }
            return;
        }

        if let Some(replaces_id) = notif.replaces_id {
            let target = self
                .shown
                .iter()
                .position(|&slot| self.slots[slot].replaces_key == Some(replaces_id));
            if let Some(index) = target {
                let slot = self.shown.remove(index);
                debug!("Notification {} replaces popup in slot {}", notif.id, slot);
                self.send(notif, slot, None);
                self.reposition();
                return;
            }
        }

        match self.hidden.pop() {
            Some(slot) => self.send(notif, slot, None),
            None => {
                debug!("All popups in use, queueing notification {}", notif.id);
                self.queue.push_back(notif);
            }
        }
    }

    /// Draw a notification into a slot and arm its close timer
    ///
    /// A `timeout_override` of zero or less disables the timer.
    fn send(&mut self, notif: Notification, slot: SlotId, timeout_override: Option<i32>) {
        self.display_counter += 1;
        let display_id = self.display_counter;

        let index = match self.shown.iter().position(|&s| s == slot) {
            Some(index) => index,
            None => {
                self.shown.push(slot);
                self.shown.len() - 1
            }
        };

        let popup = &mut self.slots[slot];
        popup.display_id = display_id;
        popup.position = self.positions[index];
        popup.replaces_key = Some(notif.replaces_key());
        popup.notification = Some(notif.id);

        if let Err(e) = self.draw(&notif, slot) {
            warn!("Failed to draw notification {} in slot {}: {:#}", notif.id, slot, e);
        }

        let urgency = notif.urgency.index();
        let timeout = match timeout_override {
            Some(timeout) => timeout,
            None => match notif.timeout_ms {
                Some(timeout) if timeout >= 0 => timeout,
                _ => self.style.timeout[urgency],
            },
        };
        if timeout > 0 {
            self.timers
                .call_later(Duration::from_millis(timeout as u64), slot, display_id);
        }
    }

    /// Render a notification into a slot
    ///
    /// Only a failed `clear` aborts; later failures are logged and the
    /// popup is still revealed.
    fn draw(&mut self, notif: &Notification, slot: SlotId) -> anyhow::Result<()> {
        let Self {
            style,
            icons,
            surface,
            slots,
            ..
        } = self;

        let urgency = notif.urgency.index();
        let background = style.background[urgency];
        let foreground = style.foreground[urgency];
        let padding = style.horizontal_padding as i32;
        let text = text::compose(&style.format, notif);

        surface.clear(slot, background)?;

        let mut left = padding;
        if let Some(icon) = notif.app_icon.as_deref().and_then(|path| icons.get(path)) {
            let y = 1 + (style.height as i32 - icon.height as i32) / 2;
            match surface.draw_image(slot, icon, background, padding, y) {
                Ok(()) => left += style.icon_size as i32 + padding / 2,
                Err(e) => warn!("Failed to draw icon for notification {}: {:#}", notif.id, e),
            }
        }

        let line_height = surface.line_height() as i32;
        for (num, line) in text.split('\n').enumerate() {
            let y = style.vertical_padding as i32 + num as i32 * (line_height + style.line_spacing as i32);
            let line = TextLine {
                text: line,
                foreground,
                background,
                alignment: style.alignment,
                left,
                right: style.width as i32 - padding,
                y,
            };
            if let Err(e) = surface.draw_text(slot, &line) {
                warn!("Failed to draw text in slot {}: {:#}", slot, e);
            }
        }

        if style.border_width > 0 {
            if let Err(e) = surface.set_border(slot, style.border[urgency]) {
                warn!("Failed to set border of slot {}: {:#}", slot, e);
            }
        }
        if let Err(e) = surface.place(slot, slots[slot].position) {
            warn!("Failed to move popup {}: {:#}", slot, e);
        }
        surface.unhide(slot)
    }

    /// Close a shown popup and recycle its slot
    ///
    /// With `expected_display_id`, nothing happens unless the slot still
    /// shows what it showed when the timer was armed.
    fn close_slot(&mut self, slot: SlotId, expected_display_id: Option<u64>, reason: CloseReason) {
        let Some(index) = self.shown.iter().position(|&s| s == slot) else {
            return;
        };
        if expected_display_id.is_some_and(|id| id != self.slots[slot].display_id) {
            return;
        }

        self.shown.remove(index);
        if self.scroll.is_some_and(|cursor| cursor.slot == slot) {
            self.scroll = None;
        }
        let popup = &mut self.slots[slot];
        popup.replaces_key = None;
        if let Some(id) = popup.notification.take() {
            self.closed.push((id, reason));
        }
        if let Err(e) = self.surface.hide(slot) {
            warn!("Failed to hide popup {}: {:#}", slot, e);
        }

        let next = if self.paused { None } else { self.queue.pop_front() };
        match next {
            Some(next) => self.send(next, slot, None),
            None => self.hidden.push(slot),
        }
        self.reposition();
    }

    fn reposition(&mut self) {
        for (index, &slot) in self.shown.iter().enumerate() {
            let position = self.positions[index];
            self.slots[slot].position = position;
            if let Err(e) = self.surface.place(slot, position) {
                warn!("Failed to move popup {}: {:#}", slot, e);
            }
        }
    }

    /// Timer callback for a slot's auto-close
    pub fn expire(&mut self, slot: SlotId, display_id: u64) {
        if slot < self.slots.len() {
            self.close_slot(slot, Some(display_id), CloseReason::Expired);
        }
    }

    /// Close the popup the user clicked
    pub fn dismiss(&mut self, slot: SlotId) {
        if slot < self.slots.len() {
            self.close_slot(slot, None, CloseReason::Dismissed);
        }
    }

    /// Close the oldest visible popup
    pub fn close_oldest(&mut self) {
        if let Some(&slot) = self.shown.first() {
            self.close_slot(slot, None, CloseReason::Dismissed);
        }
    }

    /// Drop the queue and close every visible popup
    pub fn close_all(&mut self) {
        for notif in self.queue.drain(..) {
            self.closed.push((notif.id, CloseReason::Dismissed));
        }
        while let Some(&slot) = self.shown.first() {
            self.close_slot(slot, None, CloseReason::Dismissed);
        }
    }

    /// Close a live notification on request of its sender
    pub fn close_notification(&mut self, id: NotificationId) {
        let shown = self
            .shown
            .iter()
            .copied()
            .find(|&slot| self.slots[slot].notification == Some(id));
        if let Some(slot) = shown {
            self.close_slot(slot, None, CloseReason::Closed);
        } else if let Some(index) = self.queue.iter().position(|n| n.id == id) {
            self.queue.remove(index);
            self.closed.push((id, CloseReason::Closed));
        }
    }

    /// Show the previous notification in the history
    pub fn prev(&mut self, history: &History) {
        if history.is_empty() {
            return;
        }
        let cursor = match self.scroll {
            Some(cursor) => cursor,
            None => {
                let slot = if self.hidden.is_empty() {
                    match self.shown.first() {
                        Some(&slot) => slot,
                        None => return,
                    }
                } else {
                    self.hidden.remove(0)
                };
                ScrollCursor {
                    slot,
                    index: history.len(),
                }
            }
        };

        let index = cursor.index.saturating_sub(1);
        self.scroll = Some(ScrollCursor { index, ..cursor });
        self.show_history(history, cursor.slot, index);
    }

    /// Show the next notification in the history; only while browsing
    pub fn next(&mut self, history: &History) {
        let Some(cursor) = self.scroll else {
            return;
        };
        if history.is_empty() {
            return;
        }

        let index = (cursor.index + 1).min(history.len() - 1);
        self.scroll = Some(ScrollCursor { index, ..cursor });
        if let Some(pos) = self.shown.iter().position(|&s| s == cursor.slot) {
            self.shown.remove(pos);
        }
        self.show_history(history, cursor.slot, index);
        self.reposition();
    }

    fn show_history(&mut self, history: &History, slot: SlotId, index: usize) {
        let Some(notif) = history.get(index).cloned() else {
            return;
        };
        // A borrowed popup's live notification is gone from the screen
        if let Some(id) = self.slots[slot].notification.take() {
            self.closed.push((id, CloseReason::Dismissed));
        }
        let timeout = self.style.sticky_history.then_some(0);
        self.send(notif, slot, timeout);
        self.slots[slot].notification = None;
    }

    /// Toggle pause. Pausing hides everything; resuming replays the queue.
    pub fn pause(&mut self) {
        if self.paused {
            info!("Resuming notifications, {} queued", self.queue.len());
            self.paused = false;
            self.renotify();
        } else {
            info!("Pausing notifications");
            self.paused = true;
            while let Some(&slot) = self.shown.first() {
                self.close_slot(slot, None, CloseReason::Dismissed);
            }
        }
    }

    /// Re-check fullscreen state; replays the queue once fullscreen has ended
    pub fn fullscreen_changed(&mut self) {
        if self.watching_fullscreen && !self.fullscreen.fullscreen_active() {
            debug!("Fullscreen ended, replaying {} queued notifications", self.queue.len());
            self.watching_fullscreen = false;
            self.renotify();
        }
    }

    /// Feed every queued notification back through `notify`, in order
    fn renotify(&mut self) {
        let queued: Vec<Notification> = self.queue.drain(..).collect();
        for notif in queued {
            self.notify(notif);
        }
    }

    /// Take the list of live notifications that have left the screen
    pub fn drain_closed(&mut self) -> Vec<(NotificationId, CloseReason)> {
        std::mem::take(&mut self.closed)
    }

    pub fn watching_fullscreen(&self) -> bool {
        self.watching_fullscreen
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn shown(&self) -> &[SlotId] {
        &self.shown
    }

    pub fn hidden(&self) -> &[SlotId] {
        &self.hidden
    }

    pub fn slot(&self, slot: SlotId) -> Option<&PopupSlot> {
        self.slots.get(slot)
    }

    /// Ids of queued notifications, oldest first
    pub fn queued(&self) -> Vec<NotificationId> {
        self.queue.iter().map(|n| n.id).collect()
    }

    /// History index being browsed, if any
    pub fn history_index(&self) -> Option<usize> {
        self.scroll.map(|cursor| cursor.index)
    }
}
