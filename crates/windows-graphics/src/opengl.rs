use frame_capture::{
    CaptureError, ClientReadback, DeviceError, GraphicsApi, GraphicsDevice, PixelReader,
    ReadChannel, ReadbackStrategy, TextureHandle,
};
use tracing::debug;
use windows::Win32::Graphics::OpenGL::{
    glBindTexture, glGetError, glGetTexImage, glGetTexLevelParameteriv, wglGetCurrentContext,
};

use crate::WinError;

const GL_NO_ERROR: u32 = 0;
const GL_TEXTURE_2D: u32 = 0x0DE1;
const GL_TEXTURE_WIDTH: u32 = 0x1000;
const GL_TEXTURE_HEIGHT: u32 = 0x1001;
const GL_TEXTURE_INTERNAL_FORMAT: u32 = 0x1003;
const GL_RGBA: u32 = 0x1908;
const GL_UNSIGNED_BYTE: u32 = 0x1401;
const GL_UNSIGNED_SHORT: u32 = 0x1403;

/// The host's OpenGL device, used from the thread owning its context.
#[derive(Clone, Copy, Debug, Default)]
pub struct OpenGl;

impl GraphicsDevice for OpenGl {
    fn api(&self) -> GraphicsApi {
        GraphicsApi::OpenGl
    }

    /// The context is checked on the render thread before each capture.
    fn create_strategy(&self) -> Result<Box<dyn ReadbackStrategy>, CaptureError> {
        debug!("Created OpenGL readback strategy");

        Ok(ClientReadback::new(GlReader).into())
    }
}

/// Reads textures on the current OpenGL context.
#[derive(Clone, Copy, Debug, Default)]
pub struct GlReader;

impl GlReader {
    fn check(call: &'static str) -> Result<(), DeviceError> {
        let error = unsafe { glGetError() };
        if error != GL_NO_ERROR {
            return Err(WinError::from_gl(error, call).into());
        }

        Ok(())
    }

    fn level_parameter(pname: u32, call: &'static str) -> Result<i32, DeviceError> {
        let mut value = 0;
        unsafe { glGetTexLevelParameteriv(GL_TEXTURE_2D, 0, pname, &mut value) };
        Self::check(call)?;

        Ok(value)
    }
}

impl PixelReader for GlReader {
    fn has_context(&self) -> bool {
        !unsafe { wglGetCurrentContext() }.0.is_null()
    }

    fn bind(&mut self, texture: TextureHandle) -> Result<(), DeviceError> {
        // Clear errors left by the host.
        for _ in 0..16 {
            if unsafe { glGetError() } == GL_NO_ERROR {
                break;
            }
        }

        unsafe { glBindTexture(GL_TEXTURE_2D, texture.0 as u32) };
        Self::check("glBindTexture")
    }

    fn internal_format(&mut self) -> Result<u32, DeviceError> {
        let format = Self::level_parameter(
            GL_TEXTURE_INTERNAL_FORMAT,
            "glGetTexLevelParameteriv(GL_TEXTURE_INTERNAL_FORMAT)",
        )?;

        Ok(format as u32)
    }

    fn texture_size(&mut self) -> Result<[u32; 2], DeviceError> {
        let width = Self::level_parameter(
            GL_TEXTURE_WIDTH,
            "glGetTexLevelParameteriv(GL_TEXTURE_WIDTH)",
        )?;
        let height = Self::level_parameter(
            GL_TEXTURE_HEIGHT,
            "glGetTexLevelParameteriv(GL_TEXTURE_HEIGHT)",
        )?;

        Ok([width.max(0) as u32, height.max(0) as u32])
    }

    fn read_pixels(
        &mut self,
        channel: ReadChannel,
        destination: &mut [u8],
    ) -> Result<(), DeviceError> {
        let kind = match channel {
            ReadChannel::UnsignedByte => GL_UNSIGNED_BYTE,
            ReadChannel::UnsignedShort => GL_UNSIGNED_SHORT,
        };

        unsafe {
            glGetTexImage(
                GL_TEXTURE_2D,
                0,
                GL_RGBA,
                kind,
                destination.as_mut_ptr().cast(),
            )
        };
        Self::check("glGetTexImage")
    }
}
