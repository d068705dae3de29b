/// `GL_RGBA16F`, also `GL_RGBA16F_EXT` and `GL_RGBA16F_ARB`.
const GL_RGBA16F: u32 = 0x881A;
/// `GL_RGBA16`.
const GL_RGBA16: u32 = 0x805B;

/// The pixel format of frames handed to the transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum PixelFormat {
    /// RGBA, 8 bits per channel.
    #[default]
    Uint8 = 0,

    /// RGBA, 16 bits per channel, gamma encoded.
    Fp16Gamma = 1,

    /// RGBA, 16 bits per channel, linear.
    Fp16Linear = 2,
}

impl PixelFormat {
    /// The number of bytes for a single pixel.
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Uint8 => 4,
            Self::Fp16Gamma | Self::Fp16Linear => 8,
        }
    }

    /// The number of bits per channel.
    pub fn bit_depth(self) -> u8 {
        match self {
            Self::Uint8 => 8,
            Self::Fp16Gamma | Self::Fp16Linear => 16,
        }
    }
}

/// The native format of a texture on the staging-copy backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    /// `R8G8B8A8_UNORM`
    Rgba8Unorm,
    /// `R8G8B8A8_UNORM_SRGB`
    Rgba8UnormSrgb,
    /// `R8G8B8A8_UINT`
    Rgba8Uint,
    /// `R8G8B8A8_TYPELESS`
    Rgba8Typeless,
    /// `R16G16B16A16_FLOAT`
    Rgba16Float,
    /// `R16G16B16A16_TYPELESS`
    Rgba16Typeless,
    /// Any other native format, by its raw value.
    Other(u32),
}

/// Resolves the outbound pixel format for a texture read through the staging-copy backend.
///
/// Returns `None` for formats that cannot be sent.
pub fn resolve_staging_format(format: SourceFormat, linear_color_space: bool) -> Option<PixelFormat> {
    match format {
        SourceFormat::Rgba8Unorm
        | SourceFormat::Rgba8UnormSrgb
        | SourceFormat::Rgba8Uint
        | SourceFormat::Rgba8Typeless => Some(PixelFormat::Uint8),

        SourceFormat::Rgba16Float | SourceFormat::Rgba16Typeless => {
            if linear_color_space {
                Some(PixelFormat::Fp16Linear)
            } else {
                Some(PixelFormat::Fp16Gamma)
            }
        }

        SourceFormat::Other(_) => None,
    }
}

/// Resolves the pixel format for a texture read through the client-readback backend from its
/// queried internal format.
///
/// The readback backend has no reliable colour space signal, 16-bit sources always resolve to
/// [`PixelFormat::Fp16Gamma`] whatever `linear_color_space` says.
pub fn resolve_readback_format(internal_format: u32, _linear_color_space: bool) -> PixelFormat {
    match internal_format {
        GL_RGBA16F | GL_RGBA16 => PixelFormat::Fp16Gamma,
        _ => PixelFormat::Uint8,
    }
}

/// How the receiver should fit a frame that does not match its resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum ResizeMode {
    /// No resizing, the frame is centred.
    #[default]
    Disabled = 0,
    /// Stretch to fill.
    Stretch = 1,
    /// Scale preserving aspect ratio, padding the remainder.
    Letterbox = 2,
    /// Scale preserving aspect ratio, cropping the overflow.
    Crop = 3,
}

impl TryFrom<i32> for ResizeMode {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Disabled),
            1 => Ok(Self::Stretch),
            2 => Ok(Self::Letterbox),
            3 => Ok(Self::Crop),
            value => Err(value),
        }
    }
}

/// How the receiver should mirror the frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum MirrorMode {
    /// No mirroring.
    #[default]
    Disabled = 0,
    /// Mirror left to right.
    Horizontal = 1,
    /// Mirror top to bottom.
    Vertical = 2,
}

impl TryFrom<i32> for MirrorMode {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Disabled),
            1 => Ok(Self::Horizontal),
            2 => Ok(Self::Vertical),
            value => Err(value),
        }
    }
}
