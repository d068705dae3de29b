//! The readback strategies, one per GPU API family, behind one capability interface.
//!

mod readback;
mod staging;

use alloc::boxed::Box;
use core::fmt::{self, Display};

pub use readback::{ClientReadback, PixelReader, ReadChannel};
pub use staging::{MappedTexture, StagingCopy, StagingDevice, TextureDescription};

use crate::{CaptureError, CaptureSettings, PixelFormat};

/// The GPU API family a device belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GraphicsApi {
    /// Direct3D 11, read back through staging textures.
    Direct3D11,

    /// OpenGL, read back through client-side pixel reads.
    OpenGl,
}

/// A graphics device provided by the host.
pub trait GraphicsDevice: Send + Sync {
    /// The API family of this device.
    fn api(&self) -> GraphicsApi;

    /// Creates the readback strategy for a capture instance on this device.
    fn create_strategy(&self) -> Result<Box<dyn ReadbackStrategy>, CaptureError>;
}

/// Whether a capture feeds the stream or a one-shot still image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureMode {
    /// Streaming capture, double buffered when enabled.
    Stream,

    /// One-shot capture, always reads the frame it copied.
    Still,
}

/// The order rows are laid out in a [`FrameView`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RowOrder {
    /// The first row is the top of the image.
    TopDown,

    /// The first row is the bottom of the image.
    BottomUp,
}

/// How each channel sample in a [`FrameView`] is encoded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleEncoding {
    /// One byte per sample.
    Unorm8,

    /// Little endian IEEE half floats.
    Float16,

    /// Native endian unsigned normalised 16-bit integers.
    Unorm16,
}

/// A frame of pixel data borrowed from a readback strategy.
#[derive(Clone, Copy, Debug)]
pub struct FrameView<'a> {
    /// The pixel data, `row_pitch * height` bytes.
    pub data: &'a [u8],

    /// The frame width in pixels.
    pub width: u32,

    /// The frame height in pixels.
    pub height: u32,

    /// The number of bytes between the start of consecutive rows.
    pub row_pitch: usize,

    /// The pixel format of the data.
    pub format: PixelFormat,

    /// The encoding of each sample.
    pub encoding: SampleEncoding,

    /// The order of the rows.
    pub row_order: RowOrder,
}

impl FrameView<'_> {
    /// The total size of the frame in bytes.
    pub fn total_bytes(&self) -> usize {
        self.row_pitch * self.height as usize
    }

    /// The row pitch expressed in pixels.
    pub fn stride_pixels(&self) -> u32 {
        (self.row_pitch / self.format.bytes_per_pixel()) as u32
    }

    /// The bytes of a row that hold pixels, excluding any row padding.
    pub fn row(&self, index: usize) -> &[u8] {
        let start = index * self.row_pitch;
        let length = self.width as usize * self.format.bytes_per_pixel();
        &self.data[start..start + length]
    }
}

/// Turns the current frame's GPU texture into CPU addressable pixels.
pub trait ReadbackStrategy: Send {
    /// The API family this strategy reads from.
    fn api(&self) -> GraphicsApi;

    /// Releases the current resources and allocates new ones for `settings`, returning the
    /// resolved outbound pixel format.
    fn reconfigure(&mut self, settings: &CaptureSettings) -> Result<PixelFormat, CaptureError>;

    /// Checks the backend specific resources needed to capture are in place.
    fn check_ready(&self, settings: &CaptureSettings) -> Result<(), CaptureError>;

    /// Reads back the current frame and hands it to `consume`.
    ///
    /// Any GPU mapping is released after `consume` returns, whatever it returns.
    fn capture(
        &mut self,
        mode: CaptureMode,
        settings: &CaptureSettings,
        consume: &mut dyn FnMut(FrameView<'_>) -> Result<(), CaptureError>,
    ) -> Result<(), CaptureError>;

    /// Releases every GPU and CPU resource held by the strategy.
    fn release(&mut self);

    /// The number of staging resources currently held.
    fn staging_len(&self) -> usize;
}

/// A failed call into a graphics API, labelled with the call that failed.
#[derive(Debug)]
pub struct DeviceError {
    call: &'static str,
    source: Box<dyn core::error::Error + Send + Sync>,
}

impl DeviceError {
    /// Creates an error for `call` from its underlying cause.
    pub fn new<E>(call: &'static str, source: E) -> Self
    where
        E: Into<Box<dyn core::error::Error + Send + Sync>>,
    {
        Self {
            call,
            source: source.into(),
        }
    }

    /// The call that failed.
    pub fn call(&self) -> &'static str {
        self.call
    }
}

impl Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} call failed:\n{}", self.call, self.source)
    }
}

impl core::error::Error for DeviceError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        Some(&*self.source)
    }
}
