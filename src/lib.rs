//! area-notify: notification popups for the Area desktop
//!
//! The popup pool and scheduling live in [`server`] and are independent of
//! X11 and D-Bus; [`render`], [`timers`] and [`dbus`] plug them into the
//! desktop.

pub mod config;
pub mod dbus;
pub mod events;
pub mod notification;
pub mod render;
pub mod server;
pub mod timers;
pub mod x11_async;
