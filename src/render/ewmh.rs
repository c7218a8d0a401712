//! EWMH atoms and fullscreen detection
//!
//! Popups never go above a fullscreen client when the policy says so; the
//! probe answers whether the currently active window is fullscreen.

use anyhow::Result;
use std::sync::Arc;
use tracing::debug;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::*;
use x11rb::rust_connection::RustConnection;

use crate::server::backend::FullscreenProbe;

/// Interned atoms used by the popup windows and the probe
#[derive(Debug, Clone, Copy)]
pub struct Atoms {
    pub net_active_window: Atom,
    pub net_wm_state: Atom,
    pub _net_wm_state_fullscreen: Atom,
    pub net_wm_window_type: Atom,
    pub _net_wm_window_type_notification: Atom,
    pub net_wm_window_opacity: Atom,
}

impl Atoms {
    pub fn new<C: Connection>(conn: &C) -> Result<Self> {
        let intern = |name: &str| -> Result<Atom> {
            Ok(conn.intern_atom(false, name.as_bytes())?.reply()?.atom)
        };

        Ok(Self {
            net_active_window: intern("_NET_ACTIVE_WINDOW")?,
            net_wm_state: intern("_NET_WM_STATE")?,
            _net_wm_state_fullscreen: intern("_NET_WM_STATE_FULLSCREEN")?,
            net_wm_window_type: intern("_NET_WM_WINDOW_TYPE")?,
            _net_wm_window_type_notification: intern("_NET_WM_WINDOW_TYPE_NOTIFICATION")?,
            net_wm_window_opacity: intern("_NET_WM_WINDOW_OPACITY")?,
        })
    }
}

/// Asks the X server whether the active window is fullscreen
pub struct X11Fullscreen {
    conn: Arc<RustConnection>,
    root: Window,
    atoms: Atoms,
}

impl X11Fullscreen {
    /// Also subscribes to property changes on the root window so that
    /// `_NET_ACTIVE_WINDOW` updates reach the event loop.
    pub fn new(conn: Arc<RustConnection>, root: Window, atoms: Atoms) -> Result<Self> {
        conn.change_window_attributes(
            root,
            &ChangeWindowAttributesAux::new().event_mask(EventMask::PROPERTY_CHANGE),
        )?;
        conn.flush()?;
        Ok(Self { conn, root, atoms })
    }

    fn active_window(&self) -> Result<Option<Window>> {
        let reply = self
            .conn
            .get_property(false, self.root, self.atoms.net_active_window, AtomEnum::WINDOW, 0, 1)?
            .reply()?;
        Ok(reply
            .value32()
            .and_then(|mut values| values.next())
            .filter(|&window| window != x11rb::NONE))
    }

    fn query(&self) -> Result<bool> {
        let Some(window) = self.active_window()? else {
            return Ok(false);
        };
        let reply = self
            .conn
            .get_property(false, window, self.atoms.net_wm_state, AtomEnum::ATOM, 0, 32)?
            .reply()?;
        let states: Vec<Atom> = reply.value32().map(|values| values.collect()).unwrap_or_default();
        Ok(has_atom(&states, self.atoms._net_wm_state_fullscreen))
    }
}

impl FullscreenProbe for X11Fullscreen {
    fn fullscreen_active(&self) -> bool {
        match self.query() {
            Ok(fullscreen) => fullscreen,
            Err(e) => {
                // Active window may have been destroyed between the two reads
                debug!("Fullscreen query failed: {}", e);
                false
            }
        }
    }
}

fn has_atom(states: &[Atom], atom: Atom) -> bool {
    states.contains(&atom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_atom() {
        assert!(has_atom(&[10, 42, 7], 42));
        assert!(!has_atom(&[10, 7], 42));
        assert!(!has_atom(&[], 42));
    }
}
