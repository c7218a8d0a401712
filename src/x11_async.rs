//! Async wakeups for the X11 connection
//!
//! A blocking task polls the connection's socket with mio and pokes a tokio
//! `Notify` whenever it turns readable. The main loop then drains queued
//! events without ever blocking the runtime.

use anyhow::{Context, Result};
use std::os::unix::io::AsRawFd;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, oneshot};
use x11rb::connection::Connection;
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;

const X11_TOKEN: mio::Token = mio::Token(0);

/// Poll interval; bounds how long shutdown of the polling task takes
const POLL_TIMEOUT: Duration = Duration::from_millis(100);

pub struct PopupEventStream {
    conn: Arc<RustConnection>,
    readable: Arc<Notify>,
    // Dropping this stops the polling task
    _guard: oneshot::Receiver<()>,
}

impl PopupEventStream {
    pub fn new(conn: Arc<RustConnection>) -> Result<Self> {
        let fd = conn.stream().as_raw_fd();
        let readable = Arc::new(Notify::new());
        let task_readable = readable.clone();
        let (alive, guard) = oneshot::channel::<()>();

        let mut poll = mio::Poll::new().context("Failed to create mio Poll")?;
        poll.registry()
            .register(&mut mio::unix::SourceFd(&fd), X11_TOKEN, mio::Interest::READABLE)
            .context("Failed to register X11 socket with mio")?;

        tokio::task::spawn_blocking(move || {
            let mut events = mio::Events::with_capacity(1);
            loop {
                if alive.is_closed() {
                    tracing::debug!("X11 polling task stopped");
                    return;
                }
                if let Err(e) = poll.poll(&mut events, Some(POLL_TIMEOUT)) {
                    tracing::warn!("X11 socket poll failed: {:?}", e);
                    continue;
                }
                if events.iter().any(|event| event.token() == X11_TOKEN) {
                    task_readable.notify_one();
                }
            }
        });

        Ok(Self {
            conn,
            readable,
            _guard: guard,
        })
    }

    /// Next already-received event, if any
    pub fn poll_next_event(&self) -> Result<Option<Event>> {
        Ok(self.conn.poll_for_event()?)
    }

    pub async fn wait_readable(&self) {
        self.readable.notified().await;
    }

    pub fn flush(&self) -> Result<()> {
        self.conn.flush()?;
        Ok(())
    }
}
