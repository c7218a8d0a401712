//! Key-bindable actions
//!
//! Each action is a plain function over the server and the history, looked
//! up by name. The table is built once at startup and shared by the control
//! interface (to validate names) and the main loop (to run them).

use anyhow::{Result, bail};
use std::collections::BTreeMap;

use crate::notification::History;
use crate::server::Server;

pub type ActionFn = fn(&mut Server, &History);

/// Name → action table
pub struct ActionMap {
    actions: BTreeMap<&'static str, ActionFn>,
}

impl ActionMap {
    pub fn new() -> Self {
        let mut actions: BTreeMap<&'static str, ActionFn> = BTreeMap::new();
        actions.insert("close", |server, _| server.close_oldest());
        actions.insert("close_all", |server, _| server.close_all());
        actions.insert("prev", |server, history| server.prev(history));
        actions.insert("next", |server, history| server.next(history));
        actions.insert("pause", |server, _| server.pause());
        Self { actions }
    }

    /// Action names, sorted
    pub fn names(&self) -> Vec<String> {
        self.actions.keys().map(|name| name.to_string()).collect()
    }

    /// Run the named action
    pub fn dispatch(&self, name: &str, server: &mut Server, history: &History) -> Result<()> {
        let Some(action) = self.actions.get(name) else {
            bail!("Unknown action {:?}", name);
        };
        action(server, history);
        Ok(())
    }
}

impl Default for ActionMap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Style;
    use crate::server::backend::{FullscreenProbe, RenderSurface, TextLine, TimerService};
    use crate::server::icons::Icon;
    use crate::server::popup::{Position, SlotId};
    use std::time::Duration;

    struct NullSurface;

    impl RenderSurface for NullSurface {
        fn line_height(&self) -> u32 {
            12
        }
        fn clear(&mut self, _: SlotId, _: u32) -> Result<()> {
            Ok(())
        }
        fn draw_image(&mut self, _: SlotId, _: &Icon, _: u32, _: i32, _: i32) -> Result<()> {
            Ok(())
        }
        fn draw_text(&mut self, _: SlotId, _: &TextLine<'_>) -> Result<()> {
            Ok(())
        }
        fn set_border(&mut self, _: SlotId, _: u32) -> Result<()> {
            Ok(())
        }
        fn place(&mut self, _: SlotId, _: Position) -> Result<()> {
            Ok(())
        }
        fn unhide(&mut self, _: SlotId) -> Result<()> {
            Ok(())
        }
        fn hide(&mut self, _: SlotId) -> Result<()> {
            Ok(())
        }
    }

    struct NoTimers;

    impl TimerService for NoTimers {
        fn call_later(&mut self, _: Duration, _: SlotId, _: u64) {}
    }

    struct NeverFullscreen;

    impl FullscreenProbe for NeverFullscreen {
        fn fullscreen_active(&self) -> bool {
            false
        }
    }

    fn server() -> Server {
        Server::new(
            Style::default(),
            Box::new(NullSurface),
            Box::new(NoTimers),
            Box::new(NeverFullscreen),
        )
    }

    #[test]
    fn test_names() {
        let actions = ActionMap::new();
        assert_eq!(actions.names(), vec!["close", "close_all", "next", "pause", "prev"]);
        assert!(!actions.names().contains(&"lazy_pause".to_string()));
    }

    #[test]
    fn test_dispatch_runs_action() {
        let actions = ActionMap::new();
        let mut server = server();
        let history = History::new();

        actions.dispatch("pause", &mut server, &history).unwrap();
        assert!(server.is_paused());
        actions.dispatch("pause", &mut server, &history).unwrap();
        assert!(!server.is_paused());
    }

    #[test]
    fn test_dispatch_unknown_action() {
        let actions = ActionMap::new();
        let mut server = server();
        let err = actions
            .dispatch("explode", &mut server, &History::new())
            .unwrap_err();
        assert!(err.to_string().contains("explode"));
    }
}
