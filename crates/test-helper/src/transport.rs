use std::{sync::Arc, thread, time::Duration};

use frame_capture::{Frame, FrameTransport, MirrorMode, PixelFormat, ResizeMode, SendResult};
use parking_lot::Mutex;

/// An owned copy of a sent [`Frame`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentFrame {
    pub width: u32,
    pub height: u32,
    pub stride_pixels: u32,
    pub total_bytes: usize,
    pub format: PixelFormat,
    pub resize_mode: ResizeMode,
    pub mirror_mode: MirrorMode,
    pub timeout: Duration,
    pub data: Vec<u8>,
}

/// The state of a [`MockTransport`].
#[derive(Debug)]
pub struct TransportState {
    pub ready: bool,

    /// What every send returns.
    pub result: SendResult,

    /// How long every send blocks before recording the frame.
    pub delay: Duration,

    pub sent: Vec<SentFrame>,
    pub polls: usize,
    /// Sends entered, including ones still blocked.
    pub started: usize,
}

impl Default for TransportState {
    fn default() -> Self {
        Self {
            ready: true,
            result: SendResult::Sent,
            delay: Duration::ZERO,
            sent: Vec::new(),
            polls: 0,
            started: 0,
        }
    }
}

/// A transport that records every frame it is sent.
pub struct MockTransport {
    pub state: Arc<Mutex<TransportState>>,
}

impl MockTransport {
    /// A ready transport accepting every frame, and a handle to its state.
    pub fn new() -> (Box<dyn FrameTransport>, Arc<Mutex<TransportState>>) {
        let state = Arc::new(Mutex::new(TransportState::default()));
        let transport = Box::new(Self {
            state: Arc::clone(&state),
        });

        (transport, state)
    }
}

impl FrameTransport for MockTransport {
    fn is_ready(&self) -> bool {
        let mut state = self.state.lock();
        state.polls += 1;
        state.ready
    }

    fn send(&mut self, frame: &Frame<'_>) -> SendResult {
        let delay = {
            let mut state = self.state.lock();
            state.started += 1;
            state.delay
        };
        if !delay.is_zero() {
            thread::sleep(delay);
        }

        let mut state = self.state.lock();

        state.sent.push(SentFrame {
            width: frame.width,
            height: frame.height,
            stride_pixels: frame.stride_pixels,
            total_bytes: frame.total_bytes,
            format: frame.format,
            resize_mode: frame.resize_mode,
            mirror_mode: frame.mirror_mode,
            timeout: frame.timeout,
            data: frame.data.to_vec(),
        });

        state.result
    }
}
