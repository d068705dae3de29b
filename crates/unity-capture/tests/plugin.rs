use core::{ffi::c_void, ptr::null_mut};
use std::{path::PathBuf, sync::Arc};

use UnityCapturePlugin::{Platform, Plugin, TransportError, host::{HostSettings, Renderer}};
use frame_capture::{
    FrameDispatcher, FrameTransport, GraphicsApi, GraphicsDevice, Outcome, PixelFormat,
    SourceFormat,
};
use parking_lot::Mutex;
use test_helper::{
    encoder::{EncodedStill, MockEncoder},
    graphics::{GpuState, MockDevice, ReaderState},
    logger::init_logger,
    transport::{MockTransport, TransportState},
};

const D3D11: i32 = 2;
const OPENGL_CORE: i32 = 17;
const D3D12: i32 = 18;

const INITIALIZE: i32 = 0;
const SHUTDOWN: i32 = 1;
const BEFORE_RESET: i32 = 2;
const AFTER_RESET: i32 = 3;

const GL_RGBA8: u32 = 0x8058;

struct MockPlatform {
    gpu: Arc<Mutex<GpuState>>,
    reader: Arc<Mutex<ReaderState>>,
    transports: Arc<Mutex<Vec<Arc<Mutex<TransportState>>>>>,
}

impl Platform for MockPlatform {
    unsafe fn graphics_device(
        &self,
        renderer: Renderer,
        _device: *mut c_void,
    ) -> Option<Arc<dyn GraphicsDevice>> {
        match renderer {
            Renderer::Direct3D11 => Some(MockDevice::staging(&self.gpu)),
            Renderer::OpenGl | Renderer::OpenGlCore => Some(MockDevice::readback(&self.reader)),
        }
    }

    fn transport(&self, index: u32) -> Result<Box<dyn FrameTransport>, TransportError> {
        if index == 99 {
            return Err(TransportError::new(index, "channel unavailable"));
        }

        let (transport, state) = MockTransport::new();
        self.transports.lock().push(state);
        Ok(transport)
    }
}

struct Harness {
    plugin: Plugin,
    gpu: Arc<Mutex<GpuState>>,
    transports: Arc<Mutex<Vec<Arc<Mutex<TransportState>>>>>,
    stills: Arc<Mutex<Vec<EncodedStill>>>,
}

fn harness() -> Harness {
    init_logger();

    let gpu = Arc::new(Mutex::new(GpuState::new(64, 32, SourceFormat::Rgba8Unorm)));
    let reader = Arc::new(Mutex::new(ReaderState::new(64, 32, GL_RGBA8)));
    let transports = Arc::new(Mutex::new(Vec::new()));

    let platform = MockPlatform {
        gpu: Arc::clone(&gpu),
        reader,
        transports: Arc::clone(&transports),
    };

    let (encoder, stills) = MockEncoder::new();
    let plugin = Plugin::with_dispatcher(
        Box::new(platform),
        FrameDispatcher::with_encoder(encoder),
    );

    Harness {
        plugin,
        gpu,
        transports,
        stills,
    }
}

fn host_settings(width: i32, height: i32) -> HostSettings {
    HostSettings {
        texture: 0x4000,
        timeout: 1000,
        double_buffering: true,
        resize_mode: 0,
        mirror_mode: 0,
        linear_color_space: false,
        width,
        height,
    }
}

fn device_event(plugin: &mut Plugin, renderer: i32, event: i32) {
    unsafe { plugin.graphics_device_event(null_mut(), renderer, event) };
}

#[test]
fn streams_frames_from_the_active_instance() {
    let mut harness = harness();
    device_event(&mut harness.plugin, D3D11, INITIALIZE);

    let instance = harness.plugin.create_instance(0).unwrap();
    assert_eq!(
        harness.plugin.set_texture(&instance, host_settings(64, 32)),
        Outcome::Success
    );
    assert_eq!(instance.lock().staging_len(), 2);

    assert_eq!(harness.plugin.render_event(1), Outcome::Success);
    assert_eq!(harness.plugin.last_result(), Outcome::Success);
    assert_eq!(Plugin::instance_result(Some(&instance)), Outcome::Success);

    let transports = harness.transports.lock();
    let sent = &transports[0].lock().sent;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].format, PixelFormat::Uint8);
    assert_eq!((sent[0].width, sent[0].height), (64, 32));
}

#[test]
fn nothing_is_captured_before_configuration() {
    let mut harness = harness();
    device_event(&mut harness.plugin, D3D11, INITIALIZE);

    let _instance = harness.plugin.create_instance(0).unwrap();

    assert_eq!(harness.plugin.render_event(1), Outcome::CaptureInactive);
    assert_eq!(harness.plugin.last_result(), Outcome::CaptureInactive);
    assert_eq!(harness.gpu.lock().gpu_work(), 0);
}

#[test]
fn invalid_settings_are_parameter_errors() {
    let mut harness = harness();
    device_event(&mut harness.plugin, D3D11, INITIALIZE);
    let instance = harness.plugin.create_instance(0).unwrap();

    let mut settings = host_settings(64, 32);
    settings.width = -1;
    assert_eq!(harness.plugin.set_texture(&instance, settings), Outcome::Parameter);
    assert_eq!(Plugin::instance_result(Some(&instance)), Outcome::Parameter);

    let mut settings = host_settings(64, 32);
    settings.mirror_mode = 7;
    assert_eq!(harness.plugin.set_texture(&instance, settings), Outcome::Parameter);

    // The rejection is what the host's status poll sees, and nothing is captured.
    assert!(harness.plugin.dispatcher().active().is_some());
    assert_eq!(harness.plugin.last_result(), Outcome::Parameter);
    assert_eq!(harness.plugin.render_event(1), Outcome::Parameter);
    assert_eq!(harness.plugin.last_result(), Outcome::Parameter);
    assert_eq!(harness.gpu.lock().created, 0);

    assert_eq!(
        harness.plugin.set_texture(&instance, host_settings(64, 32)),
        Outcome::Success
    );
    assert_eq!(harness.plugin.render_event(1), Outcome::Success);
}

#[test]
fn failed_configuration_is_the_last_result() {
    let mut harness = harness();
    device_event(&mut harness.plugin, D3D11, INITIALIZE);
    harness.gpu.lock().description.format = SourceFormat::Other(2);

    let instance = harness.plugin.create_instance(0).unwrap();
    for _ in 0..3 {
        assert_eq!(
            harness.plugin.set_texture(&instance, host_settings(64, 32)),
            Outcome::TextureFormat
        );
        assert_eq!(harness.plugin.render_event(1), Outcome::TextureFormat);
        assert_eq!(harness.plugin.last_result(), Outcome::TextureFormat);
        assert_eq!(Plugin::instance_result(Some(&instance)), Outcome::TextureFormat);
    }
}

#[test]
fn frames_are_sent_after_capture_returns() {
    let mut harness = harness();
    device_event(&mut harness.plugin, D3D11, INITIALIZE);

    let instance = harness.plugin.create_instance(0).unwrap();
    harness.plugin.set_texture(&instance, host_settings(64, 32));

    let frame = harness.plugin.capture_frame(1).unwrap();
    assert!(harness.transports.lock()[0].lock().sent.is_empty());

    // Status and configuration calls are served while the frame is pending.
    assert_eq!(harness.plugin.last_result(), Outcome::CaptureInactive);
    assert_eq!(
        harness.plugin.set_texture(&instance, host_settings(64, 32)),
        Outcome::Success
    );

    let outcome = frame.send();
    assert_eq!(harness.plugin.finish_frame(frame, outcome), Outcome::Success);
    assert_eq!(harness.transports.lock()[0].lock().sent.len(), 1);
    assert_eq!(Plugin::instance_result(Some(&instance)), Outcome::Success);
}

#[test]
fn null_instance_is_invalid() {
    assert_eq!(Plugin::instance_result(None), Outcome::InvalidInstance);
}

#[test]
fn failed_transports_create_no_instance() {
    let mut harness = harness();

    assert!(harness.plugin.create_instance(99).is_none());
    assert!(harness.plugin.create_instance(-1).is_none());
    assert!(harness.plugin.create_instance(1).is_some());
}

#[test]
fn deleted_instance_is_inactive_and_released() {
    let mut harness = harness();
    device_event(&mut harness.plugin, D3D11, INITIALIZE);

    let instance = harness.plugin.create_instance(0).unwrap();
    harness.plugin.set_texture(&instance, host_settings(64, 32));
    assert_eq!(harness.gpu.lock().live_textures, 2);

    harness.plugin.delete_instance(&instance);
    drop(instance);

    assert!(harness.plugin.dispatcher().active().is_none());
    assert_eq!(harness.gpu.lock().live_textures, 0);
    assert_eq!(harness.plugin.render_event(1), Outcome::CaptureInactive);
}

#[test]
fn unsupported_renderers_have_no_device() {
    let mut harness = harness();
    device_event(&mut harness.plugin, D3D12, INITIALIZE);

    assert!(harness.plugin.dispatcher().device().is_none());

    let instance = harness.plugin.create_instance(0).unwrap();
    harness.plugin.set_texture(&instance, host_settings(64, 32));
    assert_eq!(harness.plugin.render_event(1), Outcome::UnsupportedDevice);
}

#[test]
fn device_lifecycle_follows_the_host() {
    let mut harness = harness();

    device_event(&mut harness.plugin, OPENGL_CORE, INITIALIZE);
    let device = harness.plugin.dispatcher().device().unwrap();
    assert_eq!(device.api(), GraphicsApi::OpenGl);
    let generation = harness.plugin.dispatcher().generation();

    device_event(&mut harness.plugin, OPENGL_CORE, BEFORE_RESET);
    assert!(harness.plugin.dispatcher().device().is_none());

    device_event(&mut harness.plugin, D3D11, AFTER_RESET);
    assert_eq!(
        harness.plugin.dispatcher().device().unwrap().api(),
        GraphicsApi::Direct3D11
    );
    assert_eq!(harness.plugin.dispatcher().generation(), generation + 1);

    device_event(&mut harness.plugin, D3D11, SHUTDOWN);
    assert!(harness.plugin.dispatcher().device().is_none());

    // Unknown events change nothing.
    device_event(&mut harness.plugin, D3D11, 42);
    assert!(harness.plugin.dispatcher().device().is_none());
}

#[test]
fn stills_are_written_to_the_prepared_path() {
    let mut harness = harness();
    device_event(&mut harness.plugin, D3D11, INITIALIZE);
    let instance = harness.plugin.create_instance(0).unwrap();

    let path = PathBuf::from("capture.png");
    assert_eq!(
        harness
            .plugin
            .prepare_still(&instance, host_settings(64, 32), Some(path.clone())),
        Outcome::Success
    );
    assert_eq!(harness.plugin.take_still_event(1), Outcome::Success);

    let stills = harness.stills.lock();
    assert_eq!(stills.len(), 1);
    assert_eq!(stills[0].path, path);
    assert_eq!((stills[0].width, stills[0].height), (64, 32));
}

#[test]
fn missing_still_path_is_a_parameter_error() {
    let mut harness = harness();
    device_event(&mut harness.plugin, D3D11, INITIALIZE);
    let instance = harness.plugin.create_instance(0).unwrap();

    assert_eq!(
        harness
            .plugin
            .prepare_still(&instance, host_settings(64, 32), None),
        Outcome::Parameter
    );
    assert_eq!(Plugin::instance_result(Some(&instance)), Outcome::Parameter);
    assert!(harness.stills.lock().is_empty());
}
