use std::{
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use frame_capture::{
    CaptureInstance, CaptureSettings, DeviceEvent, FrameDispatcher, InstanceState, MirrorMode,
    Outcome, PixelFormat, ResizeMode, SendResult, SharedInstance, SourceFormat, TextureHandle,
};
use parking_lot::Mutex;
use test_helper::{
    graphics::{GpuState, MockDevice, ReaderState},
    logger::init_logger,
    transport::{MockTransport, TransportState},
};

const GL_RGBA8: u32 = 0x8058;

fn settings(width: u32, height: u32, double_buffering: bool) -> CaptureSettings {
    CaptureSettings {
        texture: TextureHandle(0x1000),
        width,
        height,
        timeout: Duration::from_millis(250),
        double_buffering,
        resize_mode: ResizeMode::Letterbox,
        mirror_mode: MirrorMode::Horizontal,
        linear_color_space: false,
    }
}

struct Staged {
    dispatcher: FrameDispatcher,
    instance: SharedInstance,
    gpu: Arc<Mutex<GpuState>>,
    transport: Arc<Mutex<TransportState>>,
}

fn staged(gpu: GpuState) -> Staged {
    init_logger();

    let gpu = Arc::new(Mutex::new(gpu));
    let mut dispatcher = FrameDispatcher::new();
    dispatcher.device_event(DeviceEvent::Initialize, Some(MockDevice::staging(&gpu)));

    let (transport_box, transport) = MockTransport::new();
    let instance = CaptureInstance::shared(0, transport_box);

    Staged {
        dispatcher,
        instance,
        gpu,
        transport,
    }
}

#[test]
fn double_buffered_full_hd_frame_is_sent() {
    let mut staged = staged(GpuState::new(1920, 1080, SourceFormat::Rgba8Unorm));

    staged
        .dispatcher
        .configure(&staged.instance, settings(1920, 1080, true))
        .unwrap();
    assert_eq!(staged.instance.lock().staging_len(), 2);

    assert_eq!(staged.dispatcher.render_frame(), Outcome::Success);
    assert_eq!(staged.dispatcher.last_outcome(), Outcome::Success);

    let transport = staged.transport.lock();
    let frame = &transport.sent[0];
    assert_eq!(frame.width, 1920);
    assert_eq!(frame.height, 1080);
    assert_eq!(frame.stride_pixels, 1920);
    assert_eq!(frame.total_bytes, 1920 * 1080 * 4);
    assert_eq!(frame.data.len(), 1920 * 1080 * 4);
    assert_eq!(frame.format, PixelFormat::Uint8);
    assert_eq!(frame.resize_mode, ResizeMode::Letterbox);
    assert_eq!(frame.mirror_mode, MirrorMode::Horizontal);
    assert_eq!(frame.timeout, Duration::from_millis(250));
}

#[test]
fn receiver_not_ready_does_no_gpu_work() {
    let mut staged = staged(GpuState::new(64, 64, SourceFormat::Rgba8Unorm));
    staged
        .dispatcher
        .configure(&staged.instance, settings(64, 64, true))
        .unwrap();

    staged.transport.lock().ready = false;

    assert_eq!(staged.dispatcher.render_frame(), Outcome::CaptureInactive);
    assert_eq!(staged.gpu.lock().gpu_work(), 0);
    assert!(staged.transport.lock().sent.is_empty());
}

#[test]
fn zero_width_texture_is_not_sent() {
    let mut staged = staged(GpuState::new(64, 64, SourceFormat::Rgba8Unorm));
    staged
        .dispatcher
        .configure(&staged.instance, settings(64, 64, false))
        .unwrap();

    staged.gpu.lock().description.width = 0;

    assert_eq!(staged.dispatcher.render_frame(), Outcome::ReadTexture);
    assert!(staged.transport.lock().sent.is_empty());
}

#[test]
fn zero_width_readback_texture_is_not_sent() {
    init_logger();

    let reader = Arc::new(Mutex::new(ReaderState::new(0, 64, GL_RGBA8)));
    let mut dispatcher = FrameDispatcher::new();
    dispatcher.device_event(DeviceEvent::Initialize, Some(MockDevice::readback(&reader)));

    let (transport_box, transport) = MockTransport::new();
    let instance = CaptureInstance::shared(0, transport_box);
    dispatcher.configure(&instance, settings(64, 64, false)).unwrap();

    assert_eq!(dispatcher.render_frame(), Outcome::ReadTexture);
    assert!(transport.lock().sent.is_empty());
}

#[test]
fn linear_half_float_resolves_per_backend() {
    let mut linear = settings(32, 32, false);
    linear.linear_color_space = true;

    let mut staged = staged(GpuState::new(32, 32, SourceFormat::Rgba16Float));
    staged.dispatcher.configure(&staged.instance, linear).unwrap();
    assert_eq!(staged.instance.lock().pixel_format(), PixelFormat::Fp16Linear);

    assert_eq!(staged.dispatcher.render_frame(), Outcome::Success);
    let transport = staged.transport.lock();
    assert_eq!(transport.sent[0].format, PixelFormat::Fp16Linear);
    assert_eq!(transport.sent[0].stride_pixels, 32);
    assert_eq!(transport.sent[0].total_bytes, 32 * 32 * 8);
}

#[test]
fn transport_results_map_exclusively() {
    let cases = [
        (SendResult::Sent, Outcome::Success),
        (SendResult::TooLarge, Outcome::TooLargeResolution),
        (SendResult::Skipped, Outcome::FrameSkipped),
    ];

    for (result, outcome) in cases {
        let mut staged = staged(GpuState::new(16, 16, SourceFormat::Rgba8Unorm));
        staged
            .dispatcher
            .configure(&staged.instance, settings(16, 16, true))
            .unwrap();
        staged.transport.lock().result = result;

        assert_eq!(staged.dispatcher.render_frame(), outcome);
        assert_eq!(staged.instance.lock().outcome(), outcome);
    }
}

#[test]
fn inactive_is_checked_first() {
    let mut dispatcher = FrameDispatcher::new();

    assert_eq!(dispatcher.render_frame(), Outcome::CaptureInactive);
    assert_eq!(dispatcher.last_outcome(), Outcome::CaptureInactive);
}

#[test]
fn device_is_checked_before_texture_and_transport() {
    init_logger();

    let mut dispatcher = FrameDispatcher::new();
    let (transport_box, transport) = MockTransport::new();
    let instance = CaptureInstance::shared(0, transport_box);

    let mut settings = settings(16, 16, false);
    settings.texture = TextureHandle::NULL;
    transport.lock().ready = false;

    dispatcher.configure(&instance, settings).unwrap();
    assert_eq!(instance.lock().state(), InstanceState::Configured);

    assert_eq!(dispatcher.render_frame(), Outcome::UnsupportedDevice);
    assert_eq!(transport.lock().polls, 0);
}

#[test]
fn texture_is_checked_before_transport() {
    let mut staged = staged(GpuState::new(16, 16, SourceFormat::Rgba8Unorm));
    staged
        .dispatcher
        .configure(&staged.instance, settings(16, 16, false))
        .unwrap();

    let mut null = settings(16, 16, false);
    null.texture = TextureHandle::NULL;
    assert_eq!(
        staged.dispatcher.configure(&staged.instance, null),
        Err(Outcome::TextureHandle)
    );
    staged.transport.lock().ready = false;

    assert_eq!(staged.dispatcher.render_frame(), Outcome::TextureHandle);
    assert_eq!(staged.transport.lock().polls, 0);
    assert_eq!(staged.gpu.lock().live_textures, 0);
}

#[test]
fn readiness_is_checked_before_transport() {
    init_logger();

    let reader = Arc::new(Mutex::new(ReaderState::new(16, 16, GL_RGBA8)));
    let mut dispatcher = FrameDispatcher::new();
    dispatcher.device_event(DeviceEvent::Initialize, Some(MockDevice::readback(&reader)));

    let (transport_box, transport) = MockTransport::new();
    let instance = CaptureInstance::shared(0, transport_box);
    transport.lock().ready = false;

    dispatcher.configure(&instance, settings(0, 16, false)).unwrap();

    assert_eq!(dispatcher.render_frame(), Outcome::Parameter);
    assert_eq!(transport.lock().polls, 0);
    assert!(reader.lock().binds.is_empty());
}

#[test]
fn context_failure_is_unsupported_device() {
    init_logger();

    let gpu = Arc::new(Mutex::new(GpuState::new(16, 16, SourceFormat::Rgba8Unorm)));
    let mut dispatcher = FrameDispatcher::new();
    dispatcher.device_event(
        DeviceEvent::Initialize,
        Some(MockDevice::without_context(&gpu)),
    );

    let (transport_box, _transport) = MockTransport::new();
    let instance = CaptureInstance::shared(0, transport_box);

    assert_eq!(
        dispatcher.configure(&instance, settings(16, 16, false)),
        Err(Outcome::UnsupportedDevice)
    );
    assert_eq!(instance.lock().outcome(), Outcome::UnsupportedDevice);
    assert!(instance.lock().settings().texture.is_null());

    assert!(dispatcher.active().is_some());
    assert_eq!(dispatcher.last_outcome(), Outcome::UnsupportedDevice);
    assert_eq!(dispatcher.render_frame(), Outcome::UnsupportedDevice);
}

#[test]
fn failed_configuration_is_reported_until_reconfigured() {
    let mut staged = staged(GpuState::new(16, 16, SourceFormat::Other(2)));

    assert_eq!(
        staged
            .dispatcher
            .configure(&staged.instance, settings(16, 16, false)),
        Err(Outcome::TextureFormat)
    );
    assert_eq!(staged.dispatcher.last_outcome(), Outcome::TextureFormat);

    for _ in 0..3 {
        assert_eq!(staged.dispatcher.render_frame(), Outcome::TextureFormat);
        assert_eq!(staged.dispatcher.last_outcome(), Outcome::TextureFormat);
    }
    assert_eq!(staged.gpu.lock().gpu_work(), 0);
    assert_eq!(staged.transport.lock().polls, 0);

    staged.gpu.lock().description.format = SourceFormat::Rgba8Unorm;
    staged
        .dispatcher
        .configure(&staged.instance, settings(16, 16, false))
        .unwrap();

    assert_eq!(staged.dispatcher.render_frame(), Outcome::Success);
    assert_eq!(staged.dispatcher.last_outcome(), Outcome::Success);
}

#[test]
fn readback_configures_without_a_current_context() {
    init_logger();

    let reader = Arc::new(Mutex::new(ReaderState::new(16, 16, GL_RGBA8)));
    reader.lock().no_context = true;

    let mut dispatcher = FrameDispatcher::new();
    dispatcher.device_event(DeviceEvent::Initialize, Some(MockDevice::readback(&reader)));

    let (transport_box, transport) = MockTransport::new();
    let instance = CaptureInstance::shared(0, transport_box);
    dispatcher.configure(&instance, settings(16, 16, false)).unwrap();

    assert_eq!(dispatcher.render_frame(), Outcome::UnsupportedDevice);
    assert!(reader.lock().binds.is_empty());
    assert_eq!(transport.lock().polls, 0);

    // The render thread has its context current.
    reader.lock().no_context = false;
    assert_eq!(dispatcher.render_frame(), Outcome::Success);
    assert_eq!(transport.lock().sent.len(), 1);
}

#[test]
fn instance_is_unlocked_while_sending() {
    let mut staged = staged(GpuState::new(16, 16, SourceFormat::Rgba8Unorm));
    staged
        .dispatcher
        .configure(&staged.instance, settings(16, 16, false))
        .unwrap();
    staged.transport.lock().delay = Duration::from_millis(800);

    let mut dispatcher = staged.dispatcher;
    let render = thread::spawn(move || dispatcher.render_frame());

    while staged.transport.lock().started == 0 {
        thread::sleep(Duration::from_millis(1));
    }

    let start = Instant::now();
    let outcome = staged.instance.lock().outcome();
    assert!(start.elapsed() < Duration::from_millis(400));
    assert_eq!(outcome, Outcome::CaptureInactive);

    assert_eq!(render.join().unwrap(), Outcome::Success);
    assert_eq!(staged.instance.lock().outcome(), Outcome::Success);
}

#[test]
fn configuration_during_send_keeps_its_outcome() {
    let mut staged = staged(GpuState::new(16, 16, SourceFormat::Rgba8Unorm));
    staged
        .dispatcher
        .configure(&staged.instance, settings(16, 16, false))
        .unwrap();

    let frame = staged.dispatcher.capture_frame().unwrap();

    let mut null = settings(16, 16, false);
    null.texture = TextureHandle::NULL;
    assert_eq!(
        staged.dispatcher.configure(&staged.instance, null),
        Err(Outcome::TextureHandle)
    );

    let outcome = frame.send();
    assert_eq!(staged.dispatcher.finish_frame(frame, outcome), Outcome::Success);

    assert_eq!(staged.transport.lock().sent.len(), 1);
    assert_eq!(staged.instance.lock().outcome(), Outcome::TextureHandle);
    assert_eq!(staged.dispatcher.last_outcome(), Outcome::TextureHandle);
}

#[test]
fn newest_configuration_is_active() {
    let mut staged = staged(GpuState::new(16, 16, SourceFormat::Rgba8Unorm));
    let (transport_box, second_transport) = MockTransport::new();
    let second = CaptureInstance::shared(1, transport_box);

    staged
        .dispatcher
        .configure(&staged.instance, settings(16, 16, false))
        .unwrap();
    staged
        .dispatcher
        .configure(&second, settings(16, 16, false))
        .unwrap();

    assert_eq!(staged.dispatcher.render_frame(), Outcome::Success);
    assert!(staged.transport.lock().sent.is_empty());
    assert_eq!(second_transport.lock().sent.len(), 1);

    // The superseded instance keeps its resources.
    assert_eq!(staged.instance.lock().staging_len(), 1);

    staged.dispatcher.deactivate(&staged.instance);
    assert!(staged.dispatcher.active().is_some());

    staged.dispatcher.deactivate(&second);
    assert!(staged.dispatcher.active().is_none());
    assert_eq!(staged.dispatcher.render_frame(), Outcome::CaptureInactive);
}

#[test]
fn device_reset_rebuilds_resources() {
    let mut staged = staged(GpuState::new(16, 16, SourceFormat::Rgba8Unorm));
    staged
        .dispatcher
        .configure(&staged.instance, settings(16, 16, true))
        .unwrap();

    staged.dispatcher.device_event(DeviceEvent::BeforeReset, None);
    assert_eq!(staged.dispatcher.render_frame(), Outcome::UnsupportedDevice);

    staged.dispatcher.device_event(
        DeviceEvent::AfterReset,
        Some(MockDevice::staging(&staged.gpu)),
    );
    assert_eq!(staged.dispatcher.render_frame(), Outcome::UnsupportedDevice);

    staged
        .dispatcher
        .configure(&staged.instance, settings(16, 16, true))
        .unwrap();
    assert_eq!(staged.dispatcher.render_frame(), Outcome::Success);

    let gpu = staged.gpu.lock();
    assert_eq!(gpu.created, 4);
    assert_eq!(gpu.live_textures, 2);
}

#[test]
fn unchanged_settings_keep_resources() {
    let mut staged = staged(GpuState::new(16, 16, SourceFormat::Rgba8Unorm));

    for timeout in [100, 200, 300] {
        let mut settings = settings(16, 16, true);
        settings.timeout = Duration::from_millis(timeout);
        settings.mirror_mode = MirrorMode::Vertical;

        staged
            .dispatcher
            .configure(&staged.instance, settings)
            .unwrap();
        assert_eq!(staged.dispatcher.render_frame(), Outcome::Success);
    }

    assert_eq!(staged.gpu.lock().created, 2);

    let transport = staged.transport.lock();
    assert_eq!(transport.sent[2].timeout, Duration::from_millis(300));
    assert_eq!(transport.sent[2].mirror_mode, MirrorMode::Vertical);
}

#[test]
fn dropping_instance_releases_resources() {
    let mut staged = staged(GpuState::new(16, 16, SourceFormat::Rgba8Unorm));
    staged
        .dispatcher
        .configure(&staged.instance, settings(16, 16, true))
        .unwrap();
    assert_eq!(staged.gpu.lock().live_textures, 2);

    staged.dispatcher.deactivate(&staged.instance);
    drop(staged.instance);

    assert_eq!(staged.gpu.lock().live_textures, 0);
}
