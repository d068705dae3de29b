use core::mem::size_of;

use frame_capture::{Frame, FrameTransport, SendResult};
use tracing::{debug, info, trace};
use windows::Win32::{
    Foundation::{INVALID_HANDLE_VALUE, WAIT_ABANDONED, WAIT_OBJECT_0, WAIT_TIMEOUT},
    System::{
        Memory::{
            CreateFileMappingW, FILE_MAP_ALL_ACCESS, MEMORY_MAPPED_VIEW_ADDRESS, MapViewOfFile,
            PAGE_READWRITE, UnmapViewOfFile,
        },
        Threading::{
            CreateEventW, CreateMutexW, OpenEventW, ReleaseMutex, SYNCHRONIZATION_SYNCHRONIZE,
            SetEvent, WaitForSingleObject,
        },
    },
};
use windows_core::HSTRING;

use crate::{
    ChannelNames, FrameHeader, LabelledWinResult, MAX_CHANNEL_BYTES, WinError, fits_channel,
    send::OwnedHandle,
};

/// Sends frames to a virtual camera through a named file mapping.
///
/// The mapping holds a [`FrameHeader`] followed by up to `max_frame_bytes` of pixel data. Writes
/// are guarded by a named mutex, the receiver signals the want event when it is ready for a
/// frame and the sender signals the sent event after every write.
pub struct SharedMemorySender {
    want_frame: HSTRING,
    max_frame_bytes: usize,
    sequence: u32,

    view: MEMORY_MAPPED_VIEW_ADDRESS,
    _mapping: OwnedHandle,
    mutex: OwnedHandle,
    sent_frame: OwnedHandle,
}
unsafe impl Send for SharedMemorySender {}

impl SharedMemorySender {
    /// Creates or opens the channel for capture device `index`, holding at most
    /// [`MAX_CHANNEL_BYTES`] of data.
    pub fn new(index: u32, max_frame_bytes: usize) -> LabelledWinResult<Self> {
        let max_frame_bytes = max_frame_bytes.min(MAX_CHANNEL_BYTES);
        let names = ChannelNames::new(index);
        let mapping_size = size_of::<FrameHeader>() + max_frame_bytes;

        let mutex = unsafe { CreateMutexW(None, false, &HSTRING::from(&names.mutex)) }
            .map_err(|e| WinError::new(e, "CreateMutexW"))?;
        let mutex = OwnedHandle(mutex);

        let sent_frame =
            unsafe { CreateEventW(None, false, false, &HSTRING::from(&names.sent_frame)) }
                .map_err(|e| WinError::new(e, "CreateEventW"))?;
        let sent_frame = OwnedHandle(sent_frame);

        let mapping = unsafe {
            CreateFileMappingW(
                INVALID_HANDLE_VALUE,
                None,
                PAGE_READWRITE,
                (mapping_size as u64 >> 32) as u32,
                mapping_size as u32,
                &HSTRING::from(&names.data),
            )
        }
        .map_err(|e| WinError::new(e, "CreateFileMappingW"))?;
        let mapping = OwnedHandle(mapping);

        let view = unsafe { MapViewOfFile(mapping.0, FILE_MAP_ALL_ACCESS, 0, 0, mapping_size) };
        if view.Value.is_null() {
            return Err(WinError::new(
                windows_result::Error::from_win32(),
                "MapViewOfFile",
            ));
        }

        info!("Opened frame channel {}", names.data);

        Ok(Self {
            want_frame: HSTRING::from(&names.want_frame),
            max_frame_bytes,
            sequence: 0,
            view,
            _mapping: mapping,
            mutex,
            sent_frame,
        })
    }

    /// The capacity of the data section in bytes.
    pub fn max_frame_bytes(&self) -> usize {
        self.max_frame_bytes
    }

    fn open_want_frame(&self) -> Option<OwnedHandle> {
        unsafe { OpenEventW(SYNCHRONIZATION_SYNCHRONIZE, false, &self.want_frame) }
            .ok()
            .map(OwnedHandle)
    }

    fn write(&mut self, frame: &Frame<'_>) {
        self.sequence = self.sequence.wrapping_add(1);
        let header = FrameHeader::new(frame, self.max_frame_bytes, self.sequence);
        let header = bytemuck::bytes_of(&header);
        let data = &frame.data[..frame.total_bytes];

        let base = self.view.Value as *mut u8;
        unsafe {
            core::ptr::copy_nonoverlapping(header.as_ptr(), base, header.len());
            core::ptr::copy_nonoverlapping(data.as_ptr(), base.add(header.len()), data.len());
        }
    }
}

impl FrameTransport for SharedMemorySender {
    fn is_ready(&self) -> bool {
        self.open_want_frame().is_some()
    }

    fn send(&mut self, frame: &Frame<'_>) -> SendResult {
        if !fits_channel(frame, self.max_frame_bytes) {
            return SendResult::TooLarge;
        }

        let Some(want_frame) = self.open_want_frame() else {
            return SendResult::Skipped;
        };

        let timeout = frame.timeout.as_millis().min(u32::MAX as u128) as u32;
        let wait = unsafe { WaitForSingleObject(self.mutex.0, timeout) };
        if wait == WAIT_TIMEOUT {
            trace!("Timed out waiting for the frame channel");
            return SendResult::Skipped;
        }
        if wait != WAIT_OBJECT_0 && wait != WAIT_ABANDONED {
            debug!("{}", WinError::from_wait(wait, "WaitForSingleObject"));
            return SendResult::Skipped;
        }

        let wanted = unsafe { WaitForSingleObject(want_frame.0, 0) } == WAIT_OBJECT_0;

        self.write(frame);

        if let Err(e) = unsafe { ReleaseMutex(self.mutex.0) } {
            debug!("{}", WinError::new(e, "ReleaseMutex"));
        }
        if let Err(e) = unsafe { SetEvent(self.sent_frame.0) } {
            debug!("{}", WinError::new(e, "SetEvent"));
        }

        if wanted {
            SendResult::Sent
        } else {
            SendResult::Skipped
        }
    }
}

impl Drop for SharedMemorySender {
    fn drop(&mut self) {
        if let Err(e) = unsafe { UnmapViewOfFile(self.view) } {
            debug!("{}", WinError::new(e, "UnmapViewOfFile"));
        }
    }
}
