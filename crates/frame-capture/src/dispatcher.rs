use alloc::{boxed::Box, sync::Arc, vec::Vec};
use core::{mem, time::Duration};
use std::path::PathBuf;

use tracing::{debug, error, info, instrument, warn};

use crate::{
    CaptureError, CaptureInstance, CaptureMode, CaptureSettings, Frame, FrameView, GraphicsDevice,
    MirrorMode, Outcome, PixelFormat, PngStillEncoder, ResizeMode, SendResult, SharedInstance,
    SharedTransport, StillEncoder, still::encode_frame,
};

/// A graphics device lifecycle event raised by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceEvent {
    /// The device was created.
    Initialize,
    /// The device is about to be destroyed.
    Shutdown,
    /// The device is about to be reset.
    BeforeReset,
    /// The device was reset and is usable again.
    AfterReset,
}

/// A frame copied out of the GPU, sent with no instance lock held.
pub struct PendingFrame {
    instance: SharedInstance,
    transport: SharedTransport,
    epoch: u64,
    width: u32,
    height: u32,
    stride_pixels: u32,
    format: PixelFormat,
    resize_mode: ResizeMode,
    mirror_mode: MirrorMode,
    timeout: Duration,
    data: Vec<u8>,
}

impl PendingFrame {
    /// Hands the frame to the transport, waiting at most the frame timeout.
    pub fn send(&self) -> Outcome {
        let frame = Frame {
            width: self.width,
            height: self.height,
            stride_pixels: self.stride_pixels,
            total_bytes: self.data.len(),
            format: self.format,
            resize_mode: self.resize_mode,
            mirror_mode: self.mirror_mode,
            timeout: self.timeout,
            data: &self.data,
        };

        match self.transport.lock().send(&frame) {
            SendResult::Sent => Outcome::Success,
            SendResult::TooLarge => Outcome::TooLargeResolution,
            SendResult::Skipped => Outcome::FrameSkipped,
        }
    }

    /// The instance the frame was captured from.
    pub fn instance(&self) -> &SharedInstance {
        &self.instance
    }
}

struct CopiedFrame {
    width: u32,
    height: u32,
    stride_pixels: u32,
    format: PixelFormat,
}

/// Drives the active capture instance once per rendered frame.
pub struct FrameDispatcher {
    device: Option<Arc<dyn GraphicsDevice>>,
    generation: u64,
    active: Option<SharedInstance>,
    encoder: Box<dyn StillEncoder>,
    frame_buffer: Vec<u8>,
    last_logged: Option<Outcome>,
}

impl FrameDispatcher {
    /// Creates a dispatcher with no device that writes stills as PNG files.
    pub fn new() -> Self {
        Self::with_encoder(Box::new(PngStillEncoder))
    }

    /// Creates a dispatcher with no device that writes stills through `encoder`.
    pub fn with_encoder(encoder: Box<dyn StillEncoder>) -> Self {
        Self {
            device: None,
            generation: 0,
            active: None,
            encoder,
            frame_buffer: Vec::new(),
            last_logged: None,
        }
    }

    /// Handles a device lifecycle event.
    pub fn device_event(&mut self, event: DeviceEvent, device: Option<Arc<dyn GraphicsDevice>>) {
        match event {
            DeviceEvent::Initialize | DeviceEvent::AfterReset => {
                self.generation += 1;

                match &device {
                    Some(device) => info!("Using {:?} graphics device", device.api()),
                    None => warn!("Graphics device is not supported"),
                }

                self.device = device;
            }

            DeviceEvent::Shutdown | DeviceEvent::BeforeReset => {
                debug!("Graphics device removed on {event:?}");
                self.device = None;
            }
        }
    }

    /// The current graphics device.
    pub fn device(&self) -> Option<&Arc<dyn GraphicsDevice>> {
        self.device.as_ref()
    }

    /// Incremented each time a device is installed.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Configures `instance` and makes it the active capture.
    ///
    /// The instance is made active even when configuration fails, it then reports the failure
    /// and captures nothing until it is configured again.
    pub fn configure(
        &mut self,
        instance: &SharedInstance,
        settings: CaptureSettings,
    ) -> Result<(), Outcome> {
        let configured =
            instance
                .lock()
                .configure(self.device.as_deref(), self.generation, settings);

        self.active = Some(Arc::clone(instance));

        if let Err(outcome) = configured {
            self.log_change(outcome);
        }
        configured
    }

    /// Configures `instance`, makes it the active capture and sets where its next still is written.
    pub fn configure_still(
        &mut self,
        instance: &SharedInstance,
        settings: CaptureSettings,
        path: PathBuf,
    ) -> Result<(), Outcome> {
        self.configure(instance, settings)?;
        instance.lock().set_still_path(path);
        Ok(())
    }

    /// Fails `instance` with `outcome` as a failed configuration and makes it the active capture.
    pub fn reject(&mut self, instance: &SharedInstance, outcome: Outcome) {
        instance.lock().reject(outcome);
        self.active = Some(Arc::clone(instance));
        self.log_change(outcome);
    }

    /// Stops `instance` being the active capture if it is.
    pub fn deactivate(&mut self, instance: &SharedInstance) {
        if self
            .active
            .as_ref()
            .is_some_and(|active| Arc::ptr_eq(active, instance))
        {
            self.active = None;
        }
    }

    /// The active capture instance.
    pub fn active(&self) -> Option<&SharedInstance> {
        self.active.as_ref()
    }

    /// The outcome of the active instance's last operation.
    pub fn last_outcome(&self) -> Outcome {
        self.active
            .as_ref()
            .map_or(Outcome::CaptureInactive, |instance| instance.lock().outcome())
    }

    /// Captures the current frame of the active instance and sends it to the transport.
    pub fn render_frame(&mut self) -> Outcome {
        match self.capture_frame() {
            Ok(frame) => {
                let outcome = frame.send();
                self.finish_frame(frame, outcome)
            }
            Err(outcome) => outcome,
        }
    }

    /// Runs the frame checks on the active instance and copies its current frame out of the GPU.
    ///
    /// The instance is unlocked again before this returns. Send the frame with
    /// [`PendingFrame::send`] and pass the outcome to [`FrameDispatcher::finish_frame`].
    pub fn capture_frame(&mut self) -> Result<PendingFrame, Outcome> {
        let Some(shared) = self.active.clone() else {
            return Err(Outcome::CaptureInactive);
        };
        let mut instance = shared.lock();

        let mut data = mem::take(&mut self.frame_buffer);
        let copied = match self.copy_frame(&mut instance, &mut data) {
            Ok(copied) => copied,
            Err(outcome) => {
                instance.record(outcome);
                drop(instance);

                self.frame_buffer = data;
                self.log_change(outcome);
                return Err(outcome);
            }
        };

        let settings = *instance.settings();
        let epoch = instance.epoch();
        let transport = Arc::clone(instance.transport());
        drop(instance);

        Ok(PendingFrame {
            instance: shared,
            transport,
            epoch,
            width: copied.width,
            height: copied.height,
            stride_pixels: copied.stride_pixels,
            format: copied.format,
            resize_mode: settings.resize_mode,
            mirror_mode: settings.mirror_mode,
            timeout: settings.timeout,
            data,
        })
    }

    /// Records the outcome of sending `frame` on its instance, unless the instance was
    /// configured while the frame was being sent.
    pub fn finish_frame(&mut self, frame: PendingFrame, outcome: Outcome) -> Outcome {
        if !frame.instance.lock().record_frame(frame.epoch, outcome) {
            debug!("Instance was configured while its frame was sent");
        }

        self.frame_buffer = frame.data;
        self.log_change(outcome);
        outcome
    }

    fn copy_frame(
        &self,
        instance: &mut CaptureInstance,
        data: &mut Vec<u8>,
    ) -> Result<CopiedFrame, Outcome> {
        self.check_backend(instance)?;

        let (Some(strategy), settings, transport) = instance.parts_mut() else {
            return Err(Outcome::UnsupportedDevice);
        };

        strategy.check_ready(settings).map_err(|e| e.outcome())?;

        if !transport.lock().is_ready() {
            return Err(Outcome::CaptureInactive);
        }

        let mut copied = None;
        strategy
            .capture(CaptureMode::Stream, settings, &mut |view: FrameView<'_>| {
                data.clear();
                data.extend_from_slice(&view.data[..view.total_bytes()]);

                copied = Some(CopiedFrame {
                    width: view.width,
                    height: view.height,
                    stride_pixels: view.stride_pixels(),
                    format: view.format,
                });
                Ok(())
            })
            .map_err(|e| {
                debug!("Failed to capture frame:\n{e}");
                e.outcome()
            })?;

        copied.ok_or(Outcome::ReadTextureData)
    }

    /// Requires a supported device and no failed configuration, then a strategy built for the
    /// device, then a non-null texture.
    fn check_backend(&self, instance: &CaptureInstance) -> Result<(), Outcome> {
        if self.device.is_none() {
            return Err(Outcome::UnsupportedDevice);
        }

        if let Some(failure) = instance.failure() {
            return Err(failure);
        }

        if !instance.has_strategy() || instance.generation() != self.generation {
            return Err(Outcome::UnsupportedDevice);
        }

        if instance.settings().texture.is_null() {
            return Err(Outcome::TextureHandle);
        }

        Ok(())
    }

    /// Captures the active instance's current frame to its pending still path.
    ///
    /// Once the device and texture checks pass, the pending path is consumed whatever the outcome.
    #[instrument("FrameDispatcher::take_still", skip_all)]
    pub fn take_still(&mut self) -> Outcome {
        let Some(instance) = self.active.clone() else {
            return Outcome::CaptureInactive;
        };
        let mut instance = instance.lock();

        let outcome = match self.write_still(&mut instance) {
            Ok(()) => {
                info!("Saved still capture");
                Outcome::Success
            }
            Err(outcome) => outcome,
        };
        instance.record(outcome);
        drop(instance);

        self.log_change(outcome);
        outcome
    }

    fn write_still(&self, instance: &mut CaptureInstance) -> Result<(), Outcome> {
        self.check_backend(instance)?;

        let path = instance
            .take_still_path()
            .ok_or(CaptureError::NoStillPath.outcome())?;

        let (Some(strategy), settings, _) = instance.parts_mut() else {
            return Err(Outcome::UnsupportedDevice);
        };

        strategy.check_ready(settings).map_err(|e| e.outcome())?;

        let encoder = &*self.encoder;
        strategy
            .capture(CaptureMode::Still, settings, &mut |view: FrameView<'_>| {
                encode_frame(encoder, &path, view).map_err(CaptureError::from)
            })
            .map_err(|e| {
                error!("Failed to capture still to {}:\n{e}", path.display());
                e.outcome()
            })
    }

    fn log_change(&mut self, outcome: Outcome) {
        if self.last_logged == Some(outcome) {
            return;
        }
        self.last_logged = Some(outcome);

        if outcome.is_error() {
            error!("{}", outcome.message());
        } else if outcome.is_warning() {
            warn!("{}", outcome.message());
        } else {
            debug!("{}", outcome.message());
        }
    }
}

impl Default for FrameDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
