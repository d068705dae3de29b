use alloc::{boxed::Box, vec::Vec};

use tracing::debug;

use crate::{CaptureError, CaptureSettings, PixelFormat, TextureHandle, resolve_readback_format};

use super::{
    CaptureMode, DeviceError, FrameView, GraphicsApi, ReadbackStrategy, RowOrder, SampleEncoding,
};

/// The channel type pixels are read back as.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadChannel {
    /// One byte per channel.
    UnsignedByte,

    /// Two native endian bytes per channel.
    UnsignedShort,
}

impl ReadChannel {
    /// The number of bytes for a single RGBA pixel.
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::UnsignedByte => 4,
            Self::UnsignedShort => 8,
        }
    }
}

/// A device that reads the pixels of a bound texture straight into client memory.
pub trait PixelReader: Send {
    /// If a rendering context is current on the calling thread.
    fn has_context(&self) -> bool;

    /// Binds `texture` as the current 2D texture.
    fn bind(&mut self, texture: TextureHandle) -> Result<(), DeviceError>;

    /// The internal format of the bound texture's base level.
    fn internal_format(&mut self) -> Result<u32, DeviceError>;

    /// The `[width, height]` of the bound texture's base level.
    fn texture_size(&mut self) -> Result<[u32; 2], DeviceError>;

    /// Reads the bound texture's base level as RGBA into `destination`.
    fn read_pixels(&mut self, channel: ReadChannel, destination: &mut [u8])
    -> Result<(), DeviceError>;
}

/// Reads frames by binding the live texture and reading its pixels into persistent scratch
/// buffers.
pub struct ClientReadback<R: PixelReader> {
    reader: R,
    stream_scratch: Vec<u8>,
    still_scratch: Vec<u8>,
}

impl<R: PixelReader> ClientReadback<R> {
    /// Creates a strategy with no scratch allocated.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            stream_scratch: Vec::new(),
            still_scratch: Vec::new(),
        }
    }

    /// The reader used by this strategy.
    pub fn reader(&self) -> &R {
        &self.reader
    }

    /// The combined capacity of the scratch buffers in bytes.
    pub fn scratch_capacity(&self) -> usize {
        self.stream_scratch.capacity() + self.still_scratch.capacity()
    }
}

impl<R: PixelReader + 'static> ReadbackStrategy for ClientReadback<R> {
    fn api(&self) -> GraphicsApi {
        GraphicsApi::OpenGl
    }

    fn reconfigure(&mut self, _settings: &CaptureSettings) -> Result<PixelFormat, CaptureError> {
        // Streaming frames are always read back as 8-bit.
        Ok(PixelFormat::Uint8)
    }

    fn check_ready(&self, settings: &CaptureSettings) -> Result<(), CaptureError> {
        if !self.reader.has_context() {
            return Err(CaptureError::NoContext);
        }

        if settings.width as u64 * settings.height as u64 == 0 {
            return Err(CaptureError::EmptyScratch);
        }

        Ok(())
    }

    fn capture(
        &mut self,
        mode: CaptureMode,
        settings: &CaptureSettings,
        consume: &mut dyn FnMut(FrameView<'_>) -> Result<(), CaptureError>,
    ) -> Result<(), CaptureError> {
        self.reader
            .bind(settings.texture)
            .map_err(CaptureError::Bind)?;

        let internal_format = self
            .reader
            .internal_format()
            .map_err(CaptureError::QueryFormat)?;

        let [width, height] = self.reader.texture_size().map_err(CaptureError::QuerySize)?;
        if width == 0 || height == 0 {
            return Err(CaptureError::EmptyTexture(width, height));
        }

        let (format, channel, encoding, scratch) = match mode {
            CaptureMode::Stream => (
                PixelFormat::Uint8,
                ReadChannel::UnsignedByte,
                SampleEncoding::Unorm8,
                &mut self.stream_scratch,
            ),

            CaptureMode::Still => {
                match resolve_readback_format(internal_format, settings.linear_color_space) {
                    PixelFormat::Uint8 => (
                        PixelFormat::Uint8,
                        ReadChannel::UnsignedByte,
                        SampleEncoding::Unorm8,
                        &mut self.still_scratch,
                    ),
                    format => (
                        format,
                        ReadChannel::UnsignedShort,
                        SampleEncoding::Unorm16,
                        &mut self.still_scratch,
                    ),
                }
            }
        };

        let row_pitch = width as usize * channel.bytes_per_pixel();
        let length = row_pitch * height as usize;
        if scratch.len() != length {
            debug!("Resizing {mode:?} scratch to {length} bytes");
            scratch.resize(length, 0);
        }

        self.reader
            .read_pixels(channel, scratch)
            .map_err(CaptureError::ReadPixels)?;

        consume(FrameView {
            data: scratch,
            width,
            height,
            row_pitch,
            format,
            encoding,
            row_order: RowOrder::BottomUp,
        })
    }

    fn release(&mut self) {
        self.stream_scratch = Vec::new();
        self.still_scratch = Vec::new();
    }

    fn staging_len(&self) -> usize {
        0
    }
}

impl<R: PixelReader + 'static> From<ClientReadback<R>> for Box<dyn ReadbackStrategy> {
    fn from(value: ClientReadback<R>) -> Self {
        Box::new(value)
    }
}
