use alloc::{boxed::Box, sync::Arc};
use core::time::Duration;

use parking_lot::Mutex;

use crate::{MirrorMode, PixelFormat, ResizeMode};

/// A transport shared between an instance and the frames captured from it.
///
/// Locked only while polling or sending, never together with the instance.
pub type SharedTransport = Arc<Mutex<Box<dyn FrameTransport>>>;

/// A frame handed to the transport.
#[derive(Clone, Copy, Debug)]
pub struct Frame<'a> {
    /// The frame width in pixels.
    pub width: u32,
    /// The frame height in pixels.
    pub height: u32,

    /// The row pitch in pixels, may exceed `width` when rows are padded.
    pub stride_pixels: u32,

    /// The size of `data` in bytes.
    pub total_bytes: usize,

    /// The outbound pixel format.
    pub format: PixelFormat,
    /// How the receiver fits the frame to its output size.
    pub resize_mode: ResizeMode,
    /// How the receiver mirrors the frame.
    pub mirror_mode: MirrorMode,

    /// How long the transport may wait for the receiver.
    pub timeout: Duration,

    /// The pixel data, rows bottom first.
    pub data: &'a [u8],
}

/// What the transport did with a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendResult {
    /// The receiver accepted the frame.
    Sent,

    /// The frame does not fit the channel.
    TooLarge,

    /// The receiver skipped the frame.
    Skipped,
}

/// The cross-process channel frames are sent through.
pub trait FrameTransport: Send {
    /// If a receiver is waiting for frames. Must not block.
    fn is_ready(&self) -> bool;

    /// Sends a frame, waiting at most `frame.timeout` for the receiver.
    fn send(&mut self, frame: &Frame<'_>) -> SendResult;
}
