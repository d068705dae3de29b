use alloc::boxed::Box;

use tracing::{debug, instrument};

use crate::{
    CaptureError, CaptureSettings, DoubleBuffer, PixelFormat, SourceFormat, TextureHandle,
    resolve_staging_format,
};

use super::{
    CaptureMode, DeviceError, FrameView, GraphicsApi, ReadbackStrategy, RowOrder, SampleEncoding,
};

/// The description of a texture on a staging-copy device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureDescription {
    /// Width in pixels.
    pub width: u32,

    /// Height in pixels.
    pub height: u32,

    /// The number of mip levels, staging copies must match the source.
    pub mip_levels: u32,

    /// The native format.
    pub format: SourceFormat,
}

/// A staging texture mapped for CPU reads.
#[derive(Debug)]
pub struct MappedTexture<'a> {
    /// The mapped bytes, `row_pitch * height` long.
    pub data: &'a [u8],

    /// The number of bytes between the start of consecutive rows.
    pub row_pitch: usize,
}

/// A device that copies textures into CPU readable staging textures and maps them.
pub trait StagingDevice: Send {
    /// A staging texture, released when dropped.
    type Texture: Send;

    /// Describes the live texture behind `texture`.
    fn describe(&self, texture: TextureHandle) -> Result<TextureDescription, DeviceError>;

    /// Creates a CPU readable staging texture matching `description`.
    fn create_staging(&self, description: &TextureDescription)
    -> Result<Self::Texture, DeviceError>;

    /// Queues a copy of the live texture into `destination`.
    fn copy(&self, source: TextureHandle, destination: &Self::Texture) -> Result<(), DeviceError>;

    /// Maps `texture` for reading.
    fn map<'a>(&'a self, texture: &'a Self::Texture) -> Result<MappedTexture<'a>, DeviceError>;

    /// Unmaps a texture previously mapped with [`StagingDevice::map`].
    fn unmap(&self, texture: &Self::Texture);
}

/// Unmaps the texture when dropped.
struct Unmap<'a, D: StagingDevice> {
    device: &'a D,
    texture: &'a D::Texture,
}

impl<D: StagingDevice> Drop for Unmap<'_, D> {
    fn drop(&mut self) {
        self.device.unmap(self.texture);
    }
}

/// Reads frames by copying the live texture into a staging texture and mapping it.
pub struct StagingCopy<D: StagingDevice> {
    device: D,
    buffers: DoubleBuffer<D::Texture>,
    description: Option<TextureDescription>,
    format: PixelFormat,
}

impl<D: StagingDevice> StagingCopy<D> {
    /// Creates a strategy with no staging textures.
    pub fn new(device: D) -> Self {
        Self {
            device,
            buffers: DoubleBuffer::new(),
            description: None,
            format: PixelFormat::Uint8,
        }
    }

    /// The device used by this strategy.
    pub fn device(&self) -> &D {
        &self.device
    }
}

impl<D: StagingDevice + 'static> ReadbackStrategy for StagingCopy<D> {
    fn api(&self) -> GraphicsApi {
        GraphicsApi::Direct3D11
    }

    #[instrument("StagingCopy::reconfigure", skip_all, err)]
    fn reconfigure(&mut self, settings: &CaptureSettings) -> Result<PixelFormat, CaptureError> {
        self.release();

        if settings.texture.is_null() {
            return Err(CaptureError::NullTexture);
        }

        let description = self
            .device
            .describe(settings.texture)
            .map_err(CaptureError::Describe)?;

        if description.width == 0 || description.height == 0 {
            return Err(CaptureError::EmptyTexture(
                description.width,
                description.height,
            ));
        }

        let format = resolve_staging_format(description.format, settings.linear_color_space)
            .ok_or(CaptureError::UnsupportedFormat(description.format))?;

        self.buffers
            .reallocate(settings.double_buffering, || {
                self.device.create_staging(&description)
            })
            .map_err(CaptureError::CreateStaging)?;

        debug!(
            "Allocated {} staging texture(s) for {}x{} {:?}",
            self.buffers.len(),
            description.width,
            description.height,
            format
        );

        self.description = Some(description);
        self.format = format;

        Ok(format)
    }

    fn check_ready(&self, settings: &CaptureSettings) -> Result<(), CaptureError> {
        if settings.texture.is_null() {
            return Err(CaptureError::NullTexture);
        }

        if self.buffers.is_empty() {
            return Err(CaptureError::NoStaging);
        }

        Ok(())
    }

    fn capture(
        &mut self,
        mode: CaptureMode,
        settings: &CaptureSettings,
        consume: &mut dyn FnMut(FrameView<'_>) -> Result<(), CaptureError>,
    ) -> Result<(), CaptureError> {
        let description = self
            .device
            .describe(settings.texture)
            .map_err(CaptureError::Describe)?;

        if description.width == 0 || description.height == 0 {
            return Err(CaptureError::EmptyTexture(
                description.width,
                description.height,
            ));
        }

        if self.description != Some(description) {
            return Err(CaptureError::StaleStaging);
        }

        let format = self.format;
        let targets = match mode {
            CaptureMode::Stream => self.buffers.acquire(),
            CaptureMode::Still => self.buffers.first().map(|buffer| (buffer, buffer)),
        };
        let (write, read) = targets.ok_or(CaptureError::NoStaging)?;

        // Copy render texture into the staging texture, then map the one that is ready.
        self.device
            .copy(settings.texture, write)
            .map_err(CaptureError::Copy)?;

        let mapped = self.device.map(read).map_err(CaptureError::Map)?;
        let _unmap = Unmap {
            device: &self.device,
            texture: read,
        };

        consume(FrameView {
            data: mapped.data,
            width: description.width,
            height: description.height,
            row_pitch: mapped.row_pitch,
            format,
            encoding: match format {
                PixelFormat::Uint8 => SampleEncoding::Unorm8,
                PixelFormat::Fp16Gamma | PixelFormat::Fp16Linear => SampleEncoding::Float16,
            },
            row_order: RowOrder::BottomUp,
        })
    }

    fn release(&mut self) {
        self.buffers.clear();
        self.description = None;
    }

    fn staging_len(&self) -> usize {
        self.buffers.len()
    }
}

impl<D: StagingDevice + 'static> From<StagingCopy<D>> for Box<dyn ReadbackStrategy> {
    fn from(value: StagingCopy<D>) -> Self {
        Box::new(value)
    }
}
