use core::ffi::c_void;
use std::sync::Arc;

use frame_capture::{FrameTransport, GraphicsDevice};
use windows_graphics::{Direct3D11, OpenGl, SharedMemorySender};

use crate::{
    host::Renderer,
    plugin::{Platform, TransportError},
};

/// Direct3D 11 and OpenGL devices with shared memory frame channels.
pub struct WindowsPlatform {
    max_frame_bytes: usize,
}

impl WindowsPlatform {
    pub fn new(max_frame_bytes: usize) -> Self {
        Self { max_frame_bytes }
    }
}

impl Platform for WindowsPlatform {
    unsafe fn graphics_device(
        &self,
        renderer: Renderer,
        device: *mut c_void,
    ) -> Option<Arc<dyn GraphicsDevice>> {
        match renderer {
            Renderer::Direct3D11 => {
                let device = unsafe { Direct3D11::from_raw(device) }?;
                Some(Arc::new(device))
            }

            Renderer::OpenGl | Renderer::OpenGlCore => Some(Arc::new(OpenGl)),
        }
    }

    fn transport(&self, index: u32) -> Result<Box<dyn FrameTransport>, TransportError> {
        let sender = SharedMemorySender::new(index, self.max_frame_bytes)
            .map_err(|e| TransportError::new(index, e))?;

        Ok(Box::new(sender))
    }
}
