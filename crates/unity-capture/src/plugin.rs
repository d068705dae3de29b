use core::{error::Error, ffi::c_void};
use std::{path::PathBuf, sync::Arc};

use frame_capture::{
    CaptureInstance, CaptureSettings, DeviceEvent, FrameDispatcher, FrameTransport,
    GraphicsDevice, Outcome, PendingFrame, SharedInstance,
};
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::host::{HostSettings, Renderer, device_event};

/// Failed to open the frame transport for a capture device.
#[derive(Debug, Error)]
#[error("Failed to open the frame transport for capture device {index}:\n{source}")]
pub struct TransportError {
    /// The capture device index.
    pub index: u32,
    /// Why the transport could not be opened.
    #[source]
    pub source: Box<dyn Error + Send + Sync>,
}

impl TransportError {
    /// Creates an error for capture device `index`.
    pub fn new<E>(index: u32, source: E) -> Self
    where
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        Self {
            index,
            source: source.into(),
        }
    }
}

/// The native services the plugin is built on.
pub trait Platform: Send {
    /// The graphics device for `renderer` behind the host's raw device pointer.
    ///
    /// # Safety
    /// `device` must be null or the host's native device for `renderer`.
    unsafe fn graphics_device(
        &self,
        renderer: Renderer,
        device: *mut c_void,
    ) -> Option<Arc<dyn GraphicsDevice>>;

    /// Opens the transport for capture device `index`.
    fn transport(&self, index: u32) -> Result<Box<dyn FrameTransport>, TransportError>;
}

/// Everything the host's entry points act on.
pub struct Plugin {
    dispatcher: FrameDispatcher,
    platform: Box<dyn Platform>,
}

impl Plugin {
    /// Creates a plugin with no graphics device that writes stills as PNG files.
    pub fn new(platform: Box<dyn Platform>) -> Self {
        Self::with_dispatcher(platform, FrameDispatcher::new())
    }

    /// Creates a plugin driving `dispatcher`.
    pub fn with_dispatcher(platform: Box<dyn Platform>, dispatcher: FrameDispatcher) -> Self {
        Self {
            dispatcher,
            platform,
        }
    }

    /// The dispatcher driving the active capture.
    pub fn dispatcher(&self) -> &FrameDispatcher {
        &self.dispatcher
    }

    /// Creates a capture instance sending to capture device `index`.
    pub fn create_instance(&mut self, index: i32) -> Option<SharedInstance> {
        let Ok(index) = u32::try_from(index) else {
            warn!("Capture device index {index} is negative");
            return None;
        };

        match self.platform.transport(index) {
            Ok(transport) => {
                info!("Created capture instance for device {index}");
                Some(CaptureInstance::shared(index, transport))
            }
            Err(e) => {
                error!("{e}");
                None
            }
        }
    }

    /// Stops `instance` being the active capture, its resources are released once the last
    /// reference is dropped.
    pub fn delete_instance(&mut self, instance: &SharedInstance) {
        self.dispatcher.deactivate(instance);
        info!("Deleted capture instance for device {}", instance.lock().index());
    }

    /// Hands the texture to stream to `instance` and makes it the active capture.
    pub fn set_texture(&mut self, instance: &SharedInstance, settings: HostSettings) -> Outcome {
        let Some(settings) = self.settings(instance, settings) else {
            return Outcome::Parameter;
        };

        match self.dispatcher.configure(instance, settings) {
            Ok(()) => Outcome::Success,
            Err(outcome) => outcome,
        }
    }

    /// Hands the texture to `instance` and sets where its next still is written.
    pub fn prepare_still(
        &mut self,
        instance: &SharedInstance,
        settings: HostSettings,
        path: Option<PathBuf>,
    ) -> Outcome {
        let Some(path) = path else {
            debug!("Still path is missing or invalid");
            instance.lock().record(Outcome::Parameter);
            return Outcome::Parameter;
        };

        let Some(settings) = self.settings(instance, settings) else {
            return Outcome::Parameter;
        };

        match self.dispatcher.configure_still(instance, settings, path) {
            Ok(()) => Outcome::Success,
            Err(outcome) => outcome,
        }
    }

    /// Rejected settings fail the instance and make it active, as a failed configuration does.
    fn settings(
        &mut self,
        instance: &SharedInstance,
        settings: HostSettings,
    ) -> Option<CaptureSettings> {
        match CaptureSettings::try_from(settings) {
            Ok(settings) => Some(settings),
            Err(e) => {
                debug!("Rejected capture settings: {e}");
                self.dispatcher.reject(instance, Outcome::Parameter);
                None
            }
        }
    }

    /// The host's per frame render callback.
    pub fn render_event(&mut self, _event_id: i32) -> Outcome {
        self.dispatcher.render_frame()
    }

    /// The first half of the render callback, copies the active instance's frame out of the GPU.
    ///
    /// The frame is sent with [`PendingFrame::send`] and finished with [`Plugin::finish_frame`].
    pub fn capture_frame(&mut self, _event_id: i32) -> Result<PendingFrame, Outcome> {
        self.dispatcher.capture_frame()
    }

    /// Records the outcome of sending a frame from [`Plugin::capture_frame`].
    pub fn finish_frame(&mut self, frame: PendingFrame, outcome: Outcome) -> Outcome {
        self.dispatcher.finish_frame(frame, outcome)
    }

    /// The host's still capture callback.
    pub fn take_still_event(&mut self, _event_id: i32) -> Outcome {
        self.dispatcher.take_still()
    }

    /// The outcome of the active instance's last operation.
    pub fn last_result(&self) -> Outcome {
        self.dispatcher.last_outcome()
    }

    /// The outcome of `instance`'s last operation.
    pub fn instance_result(instance: Option<&SharedInstance>) -> Outcome {
        instance.map_or(Outcome::InvalidInstance, |instance| instance.lock().outcome())
    }

    /// Handles the host's graphics device lifecycle callback.
    ///
    /// # Safety
    /// `device` must be null or the host's native device for the renderer tagged `renderer`.
    #[instrument("Plugin::graphics_device_event", skip(self, device))]
    pub unsafe fn graphics_device_event(&mut self, device: *mut c_void, renderer: i32, event: i32) {
        let Some(event) = device_event(event) else {
            debug!("Ignoring unknown device event");
            return;
        };

        let device = match event {
            DeviceEvent::Initialize | DeviceEvent::AfterReset => match Renderer::try_from(renderer) {
                Ok(renderer) => unsafe { self.platform.graphics_device(renderer, device) },
                Err(tag) => {
                    warn!("Renderer {tag} is not supported");
                    None
                }
            },

            DeviceEvent::Shutdown | DeviceEvent::BeforeReset => None,
        };

        self.dispatcher.device_event(event, device);
    }
}
