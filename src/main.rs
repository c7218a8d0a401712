//! area-notify - notification popup server
//!
//! `area-notify` runs the daemon. `area-notify <action>` asks a running
//! daemon to perform a key-bindable action.

use anyhow::{Context, Result, bail};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use x11rb::connection::Connection;
use x11rb::protocol::Event;
use x11rb::protocol::xproto::Window;

use area_notify::config::Config;
use area_notify::dbus::{DbusManager, control};
use area_notify::events::{self, EventReceiver, LoopEvent};
use area_notify::notification::History;
use area_notify::render::X11Popups;
use area_notify::render::ewmh::{Atoms, X11Fullscreen};
use area_notify::server::Server;
use area_notify::server::actions::ActionMap;
use area_notify::server::popup::SlotId;
use area_notify::timers::TokioTimers;
use area_notify::x11_async::PopupEventStream;

/// How often the active window is re-checked while fullscreen matters
const FULLSCREEN_POLL: Duration = Duration::from_secs(1);

const USAGE: &str = "usage: area-notify [--config <path>] | area-notify <action>";

enum Command {
    Daemon { config: Option<PathBuf> },
    Action(String),
    Help,
}

fn parse_args(args: &[String]) -> Result<Command> {
    match args {
        [] => Ok(Command::Daemon { config: None }),
        [flag] if flag == "-h" || flag == "--help" => Ok(Command::Help),
        [flag, path] if flag == "--config" || flag == "-c" => Ok(Command::Daemon {
            config: Some(PathBuf::from(path)),
        }),
        [action] if !action.starts_with('-') => Ok(Command::Action(action.clone())),
        _ => bail!("{}", USAGE),
    }
}

/// The running daemon: popup server plus its event sources
struct App {
    server: Server,
    history: History,
    actions: ActionMap,
    dbus: DbusManager,
    events: EventReceiver,
    x11_stream: PopupEventStream,
    window_slots: HashMap<Window, SlotId>,
    root: Window,
    atoms: Atoms,
}

impl App {
    async fn new(config: Config) -> Result<Self> {
        let style = config.notifier.validate();
        let actions = ActionMap::new();
        let (tx, rx) = events::channel();

        let dbus = DbusManager::serve(tx.clone(), actions.names()).await?;

        let (conn, screen_num) = x11rb::connect(None).context("Failed to connect to X server")?;
        let conn = Arc::new(conn);
        let root = conn
            .setup()
            .roots
            .get(screen_num)
            .context("Invalid screen number")?
            .root;
        let atoms = Atoms::new(conn.as_ref())?;
        info!("Connected to X server (screen {})", screen_num);

        let popups = X11Popups::new(conn.clone(), screen_num, &atoms, &style)?;
        let window_slots = popups.window_slots();
        let fullscreen = X11Fullscreen::new(conn.clone(), root, atoms)?;
        let x11_stream = PopupEventStream::new(conn)?;

        let server = Server::new(
            style,
            Box::new(popups),
            Box::new(TokioTimers::new(tx)),
            Box::new(fullscreen),
        );

        Ok(Self {
            server,
            history: History::new(),
            actions,
            dbus,
            events: rx,
            x11_stream,
            window_slots,
            root,
            atoms,
        })
    }

    async fn run(mut self) -> Result<()> {
        let mut fullscreen_interval = tokio::time::interval(FULLSCREEN_POLL);
        fullscreen_interval.tick().await;

        info!("Starting main event loop");

        loop {
            if let Err(e) = self.x11_stream.flush() {
                warn!("Failed to flush X11 requests: {}", e);
            }

            // Replies read during the last iteration may have queued events
            // without the socket turning readable again
            self.drain_x11()?;
            self.report_closed().await;

            let watching = self.server.watching_fullscreen();

            tokio::select! {
                event = self.events.recv() => {
                    let Some(event) = event else {
                        info!("Event channel closed, exiting");
                        return Ok(());
                    };
                    self.handle_event(event);
                }

                () = self.x11_stream.wait_readable() => {}

                _ = fullscreen_interval.tick(), if watching => {
                    self.server.fullscreen_changed();
                }
            }
        }
    }

    fn handle_event(&mut self, event: LoopEvent) {
        match event {
            LoopEvent::Notify(notif) => {
                debug!("Notify {} ({:?})", notif.id, notif.summary);
                self.history.push(notif.clone());
                self.server.notify(notif);
            }
            LoopEvent::CloseNotification(id) => self.server.close_notification(id),
            LoopEvent::Action(name) => {
                debug!("Action {:?}", name);
                if let Err(e) = self.actions.dispatch(&name, &mut self.server, &self.history) {
                    warn!("{}", e);
                }
            }
            LoopEvent::Expire { slot, display_id } => self.server.expire(slot, display_id),
        }
    }

    fn drain_x11(&mut self) -> Result<()> {
        while let Some(event) = self
            .x11_stream
            .poll_next_event()
            .context("X11 connection lost")?
        {
            self.handle_x11_event(event);
        }
        Ok(())
    }

    fn handle_x11_event(&mut self, event: Event) {
        match event {
            Event::ButtonPress(press) if press.detail == 1 => {
                if let Some(&slot) = self.window_slots.get(&press.event) {
                    debug!("Popup in slot {} clicked", slot);
                    self.server.dismiss(slot);
                }
            }
            Event::PropertyNotify(prop)
                if prop.window == self.root && prop.atom == self.atoms.net_active_window =>
            {
                self.server.fullscreen_changed();
            }
            Event::Error(e) => debug!("X11 error: {:?}", e),
            _ => {}
        }
    }

    async fn report_closed(&mut self) {
        for (id, reason) in self.server.drain_closed() {
            if let Err(e) = self.dbus.notification_closed(id, reason).await {
                warn!("{:#}", e);
            }
        }
    }
}

async fn run_daemon(config: Option<PathBuf>) -> Result<()> {
    info!("Starting area-notify");

    let config = Config::load_or_default(config.as_deref());

    let (shutdown_tx, mut shutdown_rx) = tokio::sync::mpsc::channel::<()>(1);
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        tokio::spawn(async move {
            tokio::select! {
                _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
                _ = sigint.recv() => info!("Received SIGINT, shutting down"),
            }
            let _ = shutdown_tx.send(()).await;
        });
    }

    let app = App::new(config).await?;

    tokio::select! {
        result = app.run() => {
            if let Err(e) = result {
                error!("Notification server error: {:#}", e);
                return Err(e);
            }
        }
        _ = shutdown_rx.recv() => {
            info!("Shutdown signal received, closing popups");
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "area_notify=debug,info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    match parse_args(&args)? {
        Command::Help => {
            println!("{}", USAGE);
            Ok(())
        }
        Command::Action(action) => control::invoke(&action).await,
        Command::Daemon { config } => run_daemon(config).await,
    }
}
