use thiserror::Error;

use crate::{DeviceError, SourceFormat, StillEncoderError};

/// The result of the last capture operation on an instance.
///
/// The numeric values are part of the host contract and must not change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Outcome {
    /// The frame was captured and accepted by the transport.
    Success = 0,

    /// The receiver is present but skipped this frame.
    FrameSkipped = 1,

    /// There is no active capture, or the receiver is not ready for a frame.
    CaptureInactive = 2,

    /// The host's graphics device is not supported or could not be initialised.
    UnsupportedDevice = 100,

    /// A parameter or capture resource is invalid.
    Parameter = 101,

    /// The frame is too large for the transport.
    TooLargeResolution = 102,

    /// The texture format is not supported.
    TextureFormat = 103,

    /// The texture could not be read.
    ReadTexture = 104,

    /// The texture data could not be read back to the CPU.
    ReadTextureData = 105,

    /// The texture handle is invalid.
    TextureHandle = 106,

    /// The instance pointer handed to the plugin is invalid.
    InvalidInstance = 200,
}

impl Outcome {
    /// If this outcome is a warning, the frame was not delivered but nothing is wrong.
    pub fn is_warning(self) -> bool {
        matches!(self, Self::FrameSkipped | Self::CaptureInactive)
    }

    /// If this outcome is an error.
    pub fn is_error(self) -> bool {
        (self as i32) >= 100
    }

    /// Human readable description of the outcome.
    pub fn message(self) -> &'static str {
        match self {
            Self::Success => "Capture succeeded",
            Self::FrameSkipped => {
                "Capture device did skip a frame read, capture frame rate will not match render frame rate"
            }
            Self::CaptureInactive => "Capture device is inactive",
            Self::UnsupportedDevice => {
                "Unsupported graphics device (only D3D11 and OpenGL Core are supported)"
            }
            Self::Parameter => "Input parameter error",
            Self::TooLargeResolution => "Render resolution is too large to send to capture device",
            Self::TextureFormat => {
                "Render texture format is unsupported (only RGBA8 and RGBA16 half float formats are supported)"
            }
            Self::ReadTexture => "Error while reading texture image data",
            Self::ReadTextureData => "Error while reading texture buffer data",
            Self::TextureHandle => "Texture handle error",
            Self::InvalidInstance => "Invalid capture instance pointer",
        }
    }
}

impl From<Outcome> for i32 {
    fn from(value: Outcome) -> Self {
        value as Self
    }
}

impl TryFrom<i32> for Outcome {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        let outcome = match value {
            0 => Self::Success,
            1 => Self::FrameSkipped,
            2 => Self::CaptureInactive,
            100 => Self::UnsupportedDevice,
            101 => Self::Parameter,
            102 => Self::TooLargeResolution,
            103 => Self::TextureFormat,
            104 => Self::ReadTexture,
            105 => Self::ReadTextureData,
            106 => Self::TextureHandle,
            200 => Self::InvalidInstance,
            value => return Err(value),
        };

        Ok(outcome)
    }
}

/// Why a capture operation failed. Every variant maps onto exactly one [`Outcome`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CaptureError {
    /// The device could not provide a context to read back with.
    #[error("Failed to obtain a rendering context from the device:\n{0}")]
    Context(#[source] DeviceError),

    /// No rendering context is current on the capturing thread.
    #[error("No rendering context is current on this thread")]
    NoContext,

    /// The texture handle is null.
    #[error("The source texture handle is null")]
    NullTexture,

    /// The source texture could not be described.
    #[error("Failed to describe the source texture:\n{0}")]
    Describe(#[source] DeviceError),

    /// The source texture format has no outbound pixel format.
    #[error("Source texture format {0:?} is not supported")]
    UnsupportedFormat(SourceFormat),

    /// The source texture format could not be queried.
    #[error("Failed to query the source texture format:\n{0}")]
    QueryFormat(#[source] DeviceError),

    /// The source texture has a zero width or height.
    #[error("The source texture has a zero dimension ({0}x{1})")]
    EmptyTexture(u32, u32),

    /// The source texture could not be bound.
    #[error("Failed to bind the source texture:\n{0}")]
    Bind(#[source] DeviceError),

    /// The source texture size could not be queried.
    #[error("Failed to query the source texture size:\n{0}")]
    QuerySize(#[source] DeviceError),

    /// A staging texture could not be created.
    #[error("Failed to create a staging texture:\n{0}")]
    CreateStaging(#[source] DeviceError),

    /// The source texture changed since the staging textures were allocated.
    #[error("The staging textures do not match the source texture")]
    StaleStaging,

    /// No staging textures are allocated.
    #[error("No staging textures are allocated")]
    NoStaging,

    /// The source texture could not be copied into a staging texture.
    #[error("Failed to copy the source texture into the staging texture:\n{0}")]
    Copy(#[source] DeviceError),

    /// A staging texture could not be mapped.
    #[error("Failed to map the staging texture:\n{0}")]
    Map(#[source] DeviceError),

    /// The pixels could not be read back.
    #[error("Failed to read back the texture data:\n{0}")]
    ReadPixels(#[source] DeviceError),

    /// The configured size has no pixels.
    #[error("The capture has no pixels to read back into")]
    EmptyScratch,

    /// A still capture was requested with no destination.
    #[error("No still capture destination was set")]
    NoStillPath,

    /// The still capture could not be written.
    #[error("Failed to encode the still capture:\n{0}")]
    Encode(#[from] StillEncoderError),
}

impl CaptureError {
    /// The outcome recorded on the instance for this error.
    pub fn outcome(&self) -> Outcome {
        match self {
            Self::Context(_) | Self::NoContext => Outcome::UnsupportedDevice,
            Self::NullTexture | Self::Describe(_) => Outcome::TextureHandle,
            Self::UnsupportedFormat(_) | Self::QueryFormat(_) => Outcome::TextureFormat,
            Self::EmptyTexture(..) | Self::Bind(_) | Self::QuerySize(_) | Self::CreateStaging(_) => {
                Outcome::ReadTexture
            }
            Self::Copy(_) | Self::Map(_) | Self::ReadPixels(_) => Outcome::ReadTextureData,
            Self::StaleStaging
            | Self::NoStaging
            | Self::EmptyScratch
            | Self::NoStillPath
            | Self::Encode(_) => Outcome::Parameter,
        }
    }
}
