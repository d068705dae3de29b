use alloc::{boxed::Box, sync::Arc};
use core::time::Duration;
use std::path::PathBuf;

use parking_lot::Mutex;
use tracing::{debug, instrument};

use crate::{
    FrameTransport, GraphicsDevice, MirrorMode, Outcome, PixelFormat, ReadbackStrategy, ResizeMode,
    SharedTransport,
};

/// An instance shared between the host's configuration calls and the render callback.
pub type SharedInstance = Arc<Mutex<CaptureInstance>>;

/// An opaque native texture handle, a D3D11 texture pointer or a GL texture name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct TextureHandle(pub usize);

impl TextureHandle {
    /// The null handle.
    pub const NULL: Self = Self(0);

    /// If the handle is null.
    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// The capture settings the host supplies each time it hands over a texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CaptureSettings {
    /// The texture to capture.
    pub texture: TextureHandle,
    /// The width the host renders at.
    pub width: u32,
    /// The height the host renders at.
    pub height: u32,
    /// How long the transport may wait for the receiver.
    pub timeout: Duration,
    /// Read back the previous frame while the current one is copied.
    pub double_buffering: bool,
    /// How the receiver fits frames to its output size.
    pub resize_mode: ResizeMode,
    /// How the receiver mirrors frames.
    pub mirror_mode: MirrorMode,
    /// The host renders in linear colour space.
    pub linear_color_space: bool,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            texture: TextureHandle::NULL,
            width: 0,
            height: 0,
            timeout: Duration::from_millis(1000),
            double_buffering: false,
            resize_mode: ResizeMode::Disabled,
            mirror_mode: MirrorMode::Disabled,
            linear_color_space: false,
        }
    }
}

/// Whether an instance has been configured since it was created.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstanceState {
    /// Created and never handed a texture.
    Unconfigured,
    /// Handed a texture at least once.
    Configured,
}

/// One logical capture channel.
pub struct CaptureInstance {
    index: u32,
    settings: CaptureSettings,
    format: PixelFormat,
    state: InstanceState,
    strategy: Option<Box<dyn ReadbackStrategy>>,
    generation: u64,
    epoch: u64,
    transport: SharedTransport,
    outcome: Outcome,
    failure: Option<Outcome>,
    still_path: Option<PathBuf>,
}

impl CaptureInstance {
    /// Creates an unconfigured instance sending through `transport`.
    pub fn new(index: u32, transport: Box<dyn FrameTransport>) -> Self {
        Self {
            index,
            settings: CaptureSettings::default(),
            format: PixelFormat::Uint8,
            state: InstanceState::Unconfigured,
            strategy: None,
            generation: 0,
            epoch: 0,
            transport: Arc::new(Mutex::new(transport)),
            outcome: Outcome::CaptureInactive,
            failure: None,
            still_path: None,
        }
    }

    /// Creates a shared unconfigured instance.
    pub fn shared(index: u32, transport: Box<dyn FrameTransport>) -> SharedInstance {
        Arc::new(Mutex::new(Self::new(index, transport)))
    }

    /// Applies `settings`, reallocating backend resources when anything they depend on changed.
    ///
    /// On failure the outcome is recorded, the texture handle is cleared and every backend
    /// resource is released. The failure is kept until a later configuration succeeds.
    #[instrument("CaptureInstance::configure", skip_all, fields(index = self.index))]
    pub fn configure(
        &mut self,
        device: Option<&dyn GraphicsDevice>,
        generation: u64,
        settings: CaptureSettings,
    ) -> Result<(), Outcome> {
        let device_reset = self.generation != generation;
        let needs_reconfigure = self.state == InstanceState::Unconfigured
            || self.settings.width != settings.width
            || self.settings.height != settings.height
            || self.settings.texture != settings.texture
            || self.settings.double_buffering != settings.double_buffering
            || device_reset;

        self.settings.timeout = settings.timeout;
        self.settings.resize_mode = settings.resize_mode;
        self.settings.mirror_mode = settings.mirror_mode;
        self.settings.linear_color_space = settings.linear_color_space;

        if !needs_reconfigure {
            return self.failure.map_or(Ok(()), Err);
        }

        self.epoch += 1;
        self.settings = settings;
        self.failure = None;
        self.state = InstanceState::Configured;
        self.generation = generation;

        let Some(device) = device else {
            debug!("No graphics device, capture will report an unsupported device");
            self.drop_strategy();
            return Ok(());
        };

        let reuse = !device_reset
            && self
                .strategy
                .as_ref()
                .is_some_and(|strategy| strategy.api() == device.api());

        if !reuse {
            self.drop_strategy();
            match device.create_strategy() {
                Ok(strategy) => self.strategy = Some(strategy),
                Err(e) => {
                    debug!("Failed to create a readback strategy:\n{e}");
                    self.fail(e.outcome());
                    return Err(self.outcome);
                }
            }
        }

        let Some(strategy) = self.strategy.as_mut() else {
            self.fail(Outcome::UnsupportedDevice);
            return Err(self.outcome);
        };

        match strategy.reconfigure(&self.settings) {
            Ok(format) => {
                debug!(
                    "Configured {}x{} {:?} capture",
                    self.settings.width, self.settings.height, format
                );
                self.format = format;
                Ok(())
            }

            Err(e) => {
                debug!("Failed to configure the capture:\n{e}");
                self.fail(e.outcome());
                Err(self.outcome)
            }
        }
    }

    /// Fails the instance with `outcome` as if its configuration had failed.
    pub fn reject(&mut self, outcome: Outcome) {
        self.epoch += 1;
        self.fail(outcome);
    }

    fn fail(&mut self, outcome: Outcome) {
        self.outcome = outcome;
        self.failure = Some(outcome);
        self.settings.texture = TextureHandle::NULL;
        self.release();
    }

    /// Releases every backend resource held by the instance, keeping the strategy for the next
    /// configuration.
    pub fn release(&mut self) {
        if let Some(strategy) = self.strategy.as_mut() {
            strategy.release();
        }
    }

    fn drop_strategy(&mut self) {
        self.release();
        self.strategy = None;
    }

    /// The capture index this instance sends to.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// The outcome of the last operation.
    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Records the outcome of an operation.
    pub fn record(&mut self, outcome: Outcome) {
        self.outcome = outcome;
    }

    /// Records the outcome of a frame captured at `epoch`, unless the instance was configured
    /// since. Returns if it was recorded.
    pub fn record_frame(&mut self, epoch: u64, outcome: Outcome) -> bool {
        if self.epoch != epoch {
            return false;
        }

        self.outcome = outcome;
        true
    }

    /// Incremented by every configuration that reallocates or fails.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// The outcome of the failed configuration the instance is left in, if any.
    pub fn failure(&self) -> Option<Outcome> {
        self.failure
    }

    /// Whether the instance was ever configured.
    pub fn state(&self) -> InstanceState {
        self.state
    }

    /// The current capture settings.
    pub fn settings(&self) -> &CaptureSettings {
        &self.settings
    }

    /// The resolved outbound pixel format.
    pub fn pixel_format(&self) -> PixelFormat {
        self.format
    }

    /// The device generation the instance was last configured against.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The number of staging resources currently held.
    pub fn staging_len(&self) -> usize {
        self.strategy
            .as_ref()
            .map_or(0, |strategy| strategy.staging_len())
    }

    /// Sets where the next still capture is written.
    pub fn set_still_path(&mut self, path: PathBuf) {
        self.still_path = Some(path);
    }

    /// Takes the pending still capture path.
    pub fn take_still_path(&mut self) -> Option<PathBuf> {
        self.still_path.take()
    }

    /// The pending still capture path.
    pub fn still_path(&self) -> Option<&PathBuf> {
        self.still_path.as_ref()
    }

    /// If a readback strategy is held.
    pub fn has_strategy(&self) -> bool {
        self.strategy.is_some()
    }

    pub(crate) fn parts_mut(
        &mut self,
    ) -> (
        Option<&mut Box<dyn ReadbackStrategy>>,
        &CaptureSettings,
        &SharedTransport,
    ) {
        (self.strategy.as_mut(), &self.settings, &self.transport)
    }

    /// The transport frames are sent through.
    pub fn transport(&self) -> &SharedTransport {
        &self.transport
    }
}

impl Drop for CaptureInstance {
    fn drop(&mut self) {
        self.drop_strategy();
    }
}
