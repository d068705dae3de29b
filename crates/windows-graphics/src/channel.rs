//! The layout of the shared memory frame channel.
//!

use bytemuck::{Pod, Zeroable};
use frame_capture::Frame;

/// The largest frame the channel can hold, a 3840x2160 frame at 16 bits per channel.
pub const MAX_SHARED_FRAME_BYTES: usize = 3840 * 2160 * 8;

/// The largest data section the header's 32-bit sizes can describe.
pub const MAX_CHANNEL_BYTES: usize = u32::MAX as usize;

/// The header at the start of the shared frame buffer, followed by the pixel data.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct FrameHeader {
    /// The capacity of the data section in bytes.
    pub max_size: u32,
    pub width: u32,
    pub height: u32,
    /// The row pitch in pixels.
    pub stride: u32,
    pub format: u32,
    pub resize_mode: u32,
    pub mirror_mode: u32,
    /// The sender's timeout in milliseconds.
    pub timeout_ms: u32,
    /// Incremented for every frame written.
    pub sequence: u32,
    pub data_size: u32,
}

impl FrameHeader {
    /// The header describing `frame` in a channel of `max_size` bytes.
    ///
    /// Sizes above [`MAX_CHANNEL_BYTES`] saturate, such frames never [fit](fits_channel).
    pub fn new(frame: &Frame<'_>, max_size: usize, sequence: u32) -> Self {
        Self {
            max_size: u32::try_from(max_size).unwrap_or(u32::MAX),
            width: frame.width,
            height: frame.height,
            stride: frame.stride_pixels,
            format: frame.format as u32,
            resize_mode: frame.resize_mode as u32,
            mirror_mode: frame.mirror_mode as u32,
            timeout_ms: frame.timeout.as_millis().min(u32::MAX as u128) as u32,
            sequence,
            data_size: u32::try_from(frame.total_bytes).unwrap_or(u32::MAX),
        }
    }
}

/// If `frame` fits a channel with `max_size` bytes of data.
pub fn fits_channel(frame: &Frame<'_>, max_size: usize) -> bool {
    frame.total_bytes <= max_size.min(MAX_CHANNEL_BYTES) && frame.data.len() >= frame.total_bytes
}

/// The names of the kernel objects making up the channel for one capture device.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelNames {
    /// The file mapping holding the header and data.
    pub data: String,
    /// The mutex guarding the file mapping.
    pub mutex: String,
    /// The auto-reset event the receiver signals when it wants a frame.
    pub want_frame: String,
    /// The auto-reset event signalled after a frame is written.
    pub sent_frame: String,
}

impl ChannelNames {
    /// The names for capture device `index`.
    pub fn new(index: u32) -> Self {
        Self {
            data: format!("UnityCapture_Data{index}"),
            mutex: format!("UnityCapture_Mutx{index}"),
            want_frame: format!("UnityCapture_Want{index}"),
            sent_frame: format!("UnityCapture_Sent{index}"),
        }
    }
}
