//! Collaborators the popup server drives
//!
//! The server never touches X11 or the async runtime directly; it talks to
//! a render surface, a timer service and a fullscreen probe through these
//! traits. Production implementations live in `crate::render` and
//! `crate::timers`.

use anyhow::Result;
use std::time::Duration;

use crate::config::Alignment;
use crate::server::icons::Icon;
use crate::server::popup::{Position, SlotId};

/// Where and how a single text line is drawn
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextLine<'a> {
    /// Markup-escaped text
    pub text: &'a str,
    pub foreground: u32,
    pub background: u32,
    pub alignment: Alignment,
    /// Left edge of the text area
    pub left: i32,
    /// Right edge of the text area
    pub right: i32,
    /// Top of the line
    pub y: i32,
}

/// Draws popups; one window per slot, created up front
pub trait RenderSurface {
    /// Height of one line of text in pixels
    fn line_height(&self) -> u32;

    /// Fill the slot's drawing area with the background colour
    fn clear(&mut self, slot: SlotId, background: u32) -> Result<()>;

    fn draw_image(&mut self, slot: SlotId, icon: &Icon, background: u32, x: i32, y: i32) -> Result<()>;

    fn draw_text(&mut self, slot: SlotId, line: &TextLine<'_>) -> Result<()>;

    fn set_border(&mut self, slot: SlotId, color: u32) -> Result<()>;

    /// Move the slot's window to its position
    fn place(&mut self, slot: SlotId, position: Position) -> Result<()>;

    /// Map and raise the window, presenting what was drawn
    fn unhide(&mut self, slot: SlotId) -> Result<()>;

    fn hide(&mut self, slot: SlotId) -> Result<()>;
}

/// Schedules a deferred close
///
/// There is no cancel: a callback for a slot that has since been reused is
/// recognised by its stale `display_id` and ignored.
pub trait TimerService {
    fn call_later(&mut self, delay: Duration, slot: SlotId, display_id: u64);
}

/// Reports whether the focused window is fullscreen
pub trait FullscreenProbe {
    fn fullscreen_active(&self) -> bool;
}
