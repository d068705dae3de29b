use core::ops::Deref;

use windows::Win32::{
    Foundation::{CloseHandle, HANDLE},
    Graphics::Direct3D11::{ID3D11Device, ID3D11DeviceContext},
};

/// A wrapper to make [ID3D11Device] [Send] and [Sync], the device is free threaded.
#[derive(Clone)]
pub struct SendD3D11Device(pub ID3D11Device);
unsafe impl Send for SendD3D11Device {}
unsafe impl Sync for SendD3D11Device {}

impl Deref for SendD3D11Device {
    type Target = ID3D11Device;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// A wrapper to make [ID3D11DeviceContext] [Send].
///
/// The immediate context is only used from the host's render thread.
pub struct SendD3D11Context(pub ID3D11DeviceContext);
unsafe impl Send for SendD3D11Context {}

impl Deref for SendD3D11Context {
    type Target = ID3D11DeviceContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// An owned kernel object [HANDLE], closed on drop.
#[derive(Debug)]
pub struct OwnedHandle(pub HANDLE);
unsafe impl Send for OwnedHandle {}

impl Drop for OwnedHandle {
    fn drop(&mut self) {
        if !self.0.is_invalid() {
            let _ = unsafe { CloseHandle(self.0) };
        }
    }
}
