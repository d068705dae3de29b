use core::fmt::Display;

use frame_capture::DeviceError;
use thiserror::Error;
use windows::Win32::Foundation::WAIT_EVENT;
use windows_core::HRESULT;

/// A shortcut for `Result<T, WinError>`.
pub type LabelledWinResult<T> = Result<T, WinError>;

/// A failed graphics or kernel call, labelled with the call that failed.
#[derive(Debug, Error)]
pub struct WinError {
    call: &'static str,
    #[source]
    source: WinErrorSource,
}

/// Possible sources for a WinError.
#[derive(Debug, Error)]
pub enum WinErrorSource {
    /// A [windows_result::Error].
    #[error(transparent)]
    WindowsError(#[from] windows_result::Error),

    /// An [HRESULT].
    #[error("HRESULT: {0}")]
    HResult(HRESULT),

    /// An unexpected wait result.
    #[error("Wait: {0:?}")]
    Wait(WAIT_EVENT),

    /// A `glGetError` code.
    #[error("GL error: {0:#06x}")]
    Gl(u32),

    /// A call that returned nothing.
    #[error("Returned null")]
    Null,
}

impl WinError {
    /// Create a WinError from a `windows_result::Error` and a label.
    pub fn new(source: windows_result::Error, call: &'static str) -> Self {
        Self {
            call,
            source: source.into(),
        }
    }

    /// Create a new WinError from an `HRESULT` and a label.
    pub fn from_hresult(source: HRESULT, call: &'static str) -> Self {
        Self {
            call,
            source: WinErrorSource::HResult(source),
        }
    }

    /// Create a new WinError from an unexpected wait result and a label.
    pub fn from_wait(source: WAIT_EVENT, call: &'static str) -> Self {
        Self {
            call,
            source: WinErrorSource::Wait(source),
        }
    }

    /// Create a new WinError from a `glGetError` code and a label.
    pub fn from_gl(source: u32, call: &'static str) -> Self {
        Self {
            call,
            source: WinErrorSource::Gl(source),
        }
    }

    /// Create a new WinError for a call that returned nothing.
    pub fn null(call: &'static str) -> Self {
        Self {
            call,
            source: WinErrorSource::Null,
        }
    }

    /// The call that failed.
    pub fn call(&self) -> &'static str {
        self.call
    }
}

impl Display for WinError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Windows {} call failed:\n{}", self.call, self.source)
    }
}

impl From<WinError> for DeviceError {
    fn from(value: WinError) -> Self {
        Self::new(value.call, value.source)
    }
}
