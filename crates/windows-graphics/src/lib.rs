//! # Windows Graphics
//! Direct3D 11 and OpenGL readback devices for the frame capture pipeline, and the shared memory
//! channel frames are sent to the virtual camera through.
//!
//! Only the channel layout is available on other targets.
//!

mod channel;
#[cfg(windows)]
mod direct3d11;
#[cfg(windows)]
mod opengl;
#[cfg(windows)]
mod result;
#[cfg(windows)]
mod send;
#[cfg(windows)]
mod shared_memory;

pub use channel::{
    ChannelNames, FrameHeader, MAX_CHANNEL_BYTES, MAX_SHARED_FRAME_BYTES, fits_channel,
};
#[cfg(windows)]
pub use direct3d11::{D3D11Staging, D3D11StagingTexture, Direct3D11, dxgi_to_source, source_to_dxgi};
#[cfg(windows)]
pub use opengl::{GlReader, OpenGl};
#[cfg(windows)]
pub use result::{LabelledWinResult, WinError, WinErrorSource};
#[cfg(windows)]
pub use shared_memory::SharedMemorySender;
