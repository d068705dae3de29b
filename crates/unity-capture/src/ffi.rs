//! The C entry points the host script imports.
//!

#![allow(non_snake_case)]

use core::{ffi::c_void, ptr::null_mut};
use std::sync::LazyLock;

use frame_capture::SharedInstance;
use parking_lot::Mutex;
use tracing::warn;
use tracing_appender::non_blocking::WorkerGuard;

use crate::{
    config::{Config, config_dir},
    host::{HostSettings, read_wide_path},
    logger::setup_logger,
    platform::WindowsPlatform,
    plugin::Plugin,
};

/// A host rendering callback, `UnityRenderingEvent`.
pub type RenderingEvent = extern "system" fn(event_id: i32);

struct State {
    plugin: Plugin,
    _logger_guard: Option<WorkerGuard>,
}

impl State {
    fn new() -> Self {
        let dir = config_dir();

        let (config, config_error) = match dir.as_deref().map(Config::load) {
            Some(Ok(config)) => (config, None),
            Some(Err(e)) => (Config::default(), Some(e)),
            None => (Config::default(), None),
        };

        let logger_guard = setup_logger(&config, dir.as_deref());
        if let Some(e) = config_error {
            warn!("Using the default configuration:\n{e}");
        }

        Self {
            plugin: Plugin::new(Box::new(WindowsPlatform::new(config.max_frame_bytes))),
            _logger_guard: logger_guard,
        }
    }
}

static STATE: LazyLock<Mutex<State>> = LazyLock::new(|| Mutex::new(State::new()));

#[allow(clippy::too_many_arguments)]
fn host_settings(
    texture: *mut c_void,
    timeout: i32,
    double_buffering: i32,
    resize_mode: i32,
    mirror_mode: i32,
    linear_color_space: i32,
    width: i32,
    height: i32,
) -> HostSettings {
    HostSettings {
        texture: texture as usize,
        timeout,
        double_buffering: double_buffering != 0,
        resize_mode,
        mirror_mode,
        linear_color_space: linear_color_space != 0,
        width,
        height,
    }
}

/// Creates a capture instance for capture device `index`, null on failure.
#[unsafe(no_mangle)]
pub extern "system" fn CaptureCreateInstance(index: i32) -> *mut SharedInstance {
    match STATE.lock().plugin.create_instance(index) {
        Some(instance) => Box::into_raw(Box::new(instance)),
        None => null_mut(),
    }
}

/// Deactivates and frees an instance.
#[unsafe(no_mangle)]
pub unsafe extern "system" fn CaptureDeleteInstance(instance: *mut SharedInstance) {
    if instance.is_null() {
        return;
    }

    let instance = unsafe { Box::from_raw(instance) };
    STATE.lock().plugin.delete_instance(&instance);
}

/// Boolean parameters arrive as 4-byte `BOOL`s.
#[unsafe(no_mangle)]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "system" fn SetTextureFromUnity(
    instance: *mut SharedInstance,
    texture: *mut c_void,
    timeout: i32,
    double_buffering: i32,
    resize_mode: i32,
    mirror_mode: i32,
    linear_color_space: i32,
    width: i32,
    height: i32,
) {
    let Some(instance) = (unsafe { instance.as_ref() }) else {
        return;
    };

    let settings = host_settings(
        texture,
        timeout,
        double_buffering,
        resize_mode,
        mirror_mode,
        linear_color_space,
        width,
        height,
    );
    STATE.lock().plugin.set_texture(instance, settings);
}

/// As [`SetTextureFromUnity`], also setting the path of the next still capture.
#[unsafe(no_mangle)]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "system" fn PrepareScreenshot(
    instance: *mut SharedInstance,
    texture: *mut c_void,
    timeout: i32,
    double_buffering: i32,
    resize_mode: i32,
    mirror_mode: i32,
    linear_color_space: i32,
    width: i32,
    height: i32,
    file_name: *const u16,
) {
    let Some(instance) = (unsafe { instance.as_ref() }) else {
        return;
    };

    let settings = host_settings(
        texture,
        timeout,
        double_buffering,
        resize_mode,
        mirror_mode,
        linear_color_space,
        width,
        height,
    );
    let path = unsafe { read_wide_path(file_name) };
    STATE.lock().plugin.prepare_still(instance, settings, path);
}

/// The result of the active instance's last operation.
#[unsafe(no_mangle)]
pub extern "system" fn GetLastResult() -> i32 {
    STATE.lock().plugin.last_result().into()
}

/// The result of `instance`'s last operation.
#[unsafe(no_mangle)]
pub unsafe extern "system" fn CaptureGetLastResult(instance: *mut SharedInstance) -> i32 {
    Plugin::instance_result(unsafe { instance.as_ref() }).into()
}

/// The plugin state is unlocked while the frame is sent.
extern "system" fn on_render_event(event_id: i32) {
    let captured = STATE.lock().plugin.capture_frame(event_id);
    let Ok(frame) = captured else {
        return;
    };

    let outcome = frame.send();
    STATE.lock().plugin.finish_frame(frame, outcome);
}

extern "system" fn on_take_still_event(event_id: i32) {
    STATE.lock().plugin.take_still_event(event_id);
}

/// The callback to issue once per rendered frame.
#[unsafe(no_mangle)]
pub extern "system" fn GetRenderEventFunc() -> RenderingEvent {
    on_render_event
}

/// The callback to issue to write a prepared still capture.
#[unsafe(no_mangle)]
pub extern "system" fn GetTakeScreenshotEventFunc() -> RenderingEvent {
    on_take_still_event
}

/// The host's graphics device lifecycle callback.
#[unsafe(no_mangle)]
pub unsafe extern "system" fn UnitySetGraphicsDevice(
    device: *mut c_void,
    device_type: i32,
    event_type: i32,
) {
    unsafe {
        STATE
            .lock()
            .plugin
            .graphics_device_event(device, device_type, event_type)
    };
}
