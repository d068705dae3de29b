//! # Frame Capture
//! Reads back frames rendered by a host application's GPU and hands them to a cross-process
//! frame transport, one frame per host render callback.
//!

extern crate alloc;

pub use backend::{
    CaptureMode, ClientReadback, DeviceError, FrameView, GraphicsApi, GraphicsDevice,
    MappedTexture, PixelReader, ReadChannel, ReadbackStrategy, RowOrder, SampleEncoding,
    StagingCopy, StagingDevice, TextureDescription,
};
pub use dispatcher::{DeviceEvent, FrameDispatcher, PendingFrame};
pub use double_buffer::DoubleBuffer;
pub use instance::{CaptureInstance, CaptureSettings, InstanceState, SharedInstance, TextureHandle};
pub use outcome::{CaptureError, Outcome};
pub use pixel_format::{
    MirrorMode, PixelFormat, ResizeMode, SourceFormat, resolve_readback_format,
    resolve_staging_format,
};
pub use still::{PngStillEncoder, StillEncoder, StillEncoderError, StillImage, top_down_rows};
pub use transport::{Frame, FrameTransport, SendResult, SharedTransport};

mod backend;
mod dispatcher;
mod double_buffer;
mod instance;
mod outcome;
mod pixel_format;
mod still;
mod transport;
