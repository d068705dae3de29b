//! Parsing of the raw values the host passes through the entry points.
//!

use core::time::Duration;
use std::path::PathBuf;

use frame_capture::{CaptureSettings, DeviceEvent, MirrorMode, ResizeMode, TextureHandle};
use thiserror::Error;

/// The longest still path read from the host, in UTF-16 code units.
pub const MAX_PATH_UNITS: usize = 32768;

/// The host's renderer, by its `UnityGfxRenderer` tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Renderer {
    /// `kUnityGfxRendererD3D11`
    Direct3D11,
    /// `kUnityGfxRendererOpenGL`
    OpenGl,
    /// `kUnityGfxRendererOpenGLCore`
    OpenGlCore,
}

impl TryFrom<i32> for Renderer {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::OpenGl),
            2 => Ok(Self::Direct3D11),
            17 => Ok(Self::OpenGlCore),
            value => Err(value),
        }
    }
}

/// Parses a `UnityGfxDeviceEventType` tag.
pub fn device_event(value: i32) -> Option<DeviceEvent> {
    match value {
        0 => Some(DeviceEvent::Initialize),
        1 => Some(DeviceEvent::Shutdown),
        2 => Some(DeviceEvent::BeforeReset),
        3 => Some(DeviceEvent::AfterReset),
        _ => None,
    }
}

/// The capture settings exactly as the host passes them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct HostSettings {
    /// The native texture pointer or name.
    pub texture: usize,
    /// Milliseconds.
    pub timeout: i32,
    /// Non-zero `BOOL` from the host.
    pub double_buffering: bool,
    /// A [`ResizeMode`] tag.
    pub resize_mode: i32,
    /// A [`MirrorMode`] tag.
    pub mirror_mode: i32,
    /// Non-zero `BOOL` from the host.
    pub linear_color_space: bool,
    /// The render width in pixels.
    pub width: i32,
    /// The render height in pixels.
    pub height: i32,
}

/// Host settings that cannot be captured with.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    /// A size or timeout is negative.
    #[error("The {0} must not be negative, got {1}")]
    Negative(&'static str, i32),

    /// The resize mode tag is unknown.
    #[error("Unknown resize mode {0}")]
    ResizeMode(i32),

    /// The mirror mode tag is unknown.
    #[error("Unknown mirror mode {0}")]
    MirrorMode(i32),
}

fn non_negative(name: &'static str, value: i32) -> Result<u32, SettingsError> {
    u32::try_from(value).map_err(|_| SettingsError::Negative(name, value))
}

impl TryFrom<HostSettings> for CaptureSettings {
    type Error = SettingsError;

    fn try_from(value: HostSettings) -> Result<Self, Self::Error> {
        Ok(Self {
            texture: TextureHandle(value.texture),
            width: non_negative("width", value.width)?,
            height: non_negative("height", value.height)?,
            timeout: Duration::from_millis(non_negative("timeout", value.timeout)?.into()),
            double_buffering: value.double_buffering,
            resize_mode: ResizeMode::try_from(value.resize_mode).map_err(SettingsError::ResizeMode)?,
            mirror_mode: MirrorMode::try_from(value.mirror_mode).map_err(SettingsError::MirrorMode)?,
            linear_color_space: value.linear_color_space,
        })
    }
}

/// Reads a NUL terminated UTF-16 string of at most [`MAX_PATH_UNITS`] units.
///
/// Returns `None` for a null pointer, a string with no terminator within the limit, an empty
/// string or invalid UTF-16.
///
/// # Safety
/// `raw` must be null or readable up to its terminator or [`MAX_PATH_UNITS`] units, whichever
/// comes first.
pub unsafe fn read_wide_path(raw: *const u16) -> Option<PathBuf> {
    if raw.is_null() {
        return None;
    }

    let mut length = 0;
    while length < MAX_PATH_UNITS {
        if unsafe { *raw.add(length) } == 0 {
            break;
        }
        length += 1;
    }
    if length == 0 || length == MAX_PATH_UNITS {
        return None;
    }

    let units = unsafe { core::slice::from_raw_parts(raw, length) };
    String::from_utf16(units).ok().map(PathBuf::from)
}
