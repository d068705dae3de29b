//! # Unity Capture
//! The native plugin a Unity host loads to stream its rendered frames to a virtual camera.
//!
//! The exported entry points are only built on Windows. Everything they act on is an ordinary
//! [`Plugin`] value.
//!

pub mod config;
pub mod failure;
#[cfg(windows)]
mod ffi;
pub mod host;
pub mod logger;
#[cfg(windows)]
mod platform;
mod plugin;

#[cfg(windows)]
pub use ffi::RenderingEvent;
#[cfg(windows)]
pub use platform::WindowsPlatform;
pub use plugin::{Platform, Plugin, TransportError};
