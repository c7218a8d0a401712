//! Timer service backed by the tokio runtime

use std::time::Duration;
use tracing::debug;

use crate::events::{EventSender, LoopEvent};
use crate::server::backend::TimerService;
use crate::server::popup::SlotId;

/// Posts `Expire` events back to the main loop after a delay
pub struct TokioTimers {
    events: EventSender,
}

impl TokioTimers {
    pub fn new(events: EventSender) -> Self {
        Self { events }
    }
}

impl TimerService for TokioTimers {
    fn call_later(&mut self, delay: Duration, slot: SlotId, display_id: u64) {
        let events = self.events.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if events.send(LoopEvent::Expire { slot, display_id }).is_err() {
                debug!("Main loop gone, dropping expiry for slot {}", slot);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events;

    #[tokio::test(start_paused = true)]
    async fn test_expiry_is_posted_after_delay() {
        let (tx, mut rx) = events::channel();
        let mut timers = TokioTimers::new(tx);
        timers.call_later(Duration::from_millis(5000), 1, 7);
        timers.call_later(Duration::from_millis(100), 0, 8);

        match rx.recv().await {
            Some(LoopEvent::Expire { slot, display_id }) => {
                assert_eq!((slot, display_id), (0, 8));
            }
            other => panic!("Unexpected event {:?}", other),
        }
        match rx.recv().await {
            Some(LoopEvent::Expire { slot, display_id }) => {
                assert_eq!((slot, display_id), (1, 7));
            }
            other => panic!("Unexpected event {:?}", other),
        }
    }
}
