use core::ffi::c_void;

use frame_capture::{
    CaptureError, DeviceError, GraphicsApi, GraphicsDevice, MappedTexture, ReadbackStrategy,
    SourceFormat, StagingCopy, StagingDevice, TextureDescription, TextureHandle,
};
use tracing::debug;
use windows::Win32::Graphics::{
    Direct3D11::{
        D3D11_CPU_ACCESS_READ, D3D11_MAP_READ, D3D11_MAPPED_SUBRESOURCE, D3D11_TEXTURE2D_DESC,
        D3D11_USAGE_STAGING, ID3D11Device, ID3D11Resource, ID3D11Texture2D,
    },
    Dxgi::Common::{
        DXGI_FORMAT, DXGI_FORMAT_R8G8B8A8_TYPELESS, DXGI_FORMAT_R8G8B8A8_UINT,
        DXGI_FORMAT_R8G8B8A8_UNORM, DXGI_FORMAT_R8G8B8A8_UNORM_SRGB,
        DXGI_FORMAT_R16G16B16A16_FLOAT, DXGI_FORMAT_R16G16B16A16_TYPELESS, DXGI_SAMPLE_DESC,
    },
};
use windows_core::Interface;

use crate::{
    WinError,
    send::{SendD3D11Context, SendD3D11Device},
};

/// Maps a DXGI format to the source formats the staging-copy backend understands.
pub fn dxgi_to_source(format: DXGI_FORMAT) -> SourceFormat {
    match format {
        DXGI_FORMAT_R8G8B8A8_UNORM => SourceFormat::Rgba8Unorm,
        DXGI_FORMAT_R8G8B8A8_UNORM_SRGB => SourceFormat::Rgba8UnormSrgb,
        DXGI_FORMAT_R8G8B8A8_UINT => SourceFormat::Rgba8Uint,
        DXGI_FORMAT_R8G8B8A8_TYPELESS => SourceFormat::Rgba8Typeless,
        DXGI_FORMAT_R16G16B16A16_FLOAT => SourceFormat::Rgba16Float,
        DXGI_FORMAT_R16G16B16A16_TYPELESS => SourceFormat::Rgba16Typeless,
        other => SourceFormat::Other(other.0 as u32),
    }
}

/// Maps a source format back to its DXGI format.
pub fn source_to_dxgi(format: SourceFormat) -> DXGI_FORMAT {
    match format {
        SourceFormat::Rgba8Unorm => DXGI_FORMAT_R8G8B8A8_UNORM,
        SourceFormat::Rgba8UnormSrgb => DXGI_FORMAT_R8G8B8A8_UNORM_SRGB,
        SourceFormat::Rgba8Uint => DXGI_FORMAT_R8G8B8A8_UINT,
        SourceFormat::Rgba8Typeless => DXGI_FORMAT_R8G8B8A8_TYPELESS,
        SourceFormat::Rgba16Float => DXGI_FORMAT_R16G16B16A16_FLOAT,
        SourceFormat::Rgba16Typeless => DXGI_FORMAT_R16G16B16A16_TYPELESS,
        SourceFormat::Other(raw) => DXGI_FORMAT(raw as i32),
    }
}

/// The host's Direct3D 11 device.
#[derive(Clone)]
pub struct Direct3D11 {
    device: SendD3D11Device,
}

impl Direct3D11 {
    /// Wraps an existing device.
    pub fn new(device: ID3D11Device) -> Self {
        Self {
            device: SendD3D11Device(device),
        }
    }

    /// Borrows the device behind a raw `ID3D11Device` pointer, adding a reference.
    ///
    /// # Safety
    /// `raw` must be null or a valid `ID3D11Device` pointer.
    pub unsafe fn from_raw(raw: *mut c_void) -> Option<Self> {
        let device = unsafe { ID3D11Device::from_raw_borrowed(&raw) }?;
        Some(Self::new(device.clone()))
    }

    /// The wrapped device.
    pub fn device(&self) -> &ID3D11Device {
        &self.device
    }
}

impl GraphicsDevice for Direct3D11 {
    fn api(&self) -> GraphicsApi {
        GraphicsApi::Direct3D11
    }

    fn create_strategy(&self) -> Result<Box<dyn ReadbackStrategy>, CaptureError> {
        let context = unsafe { self.device.GetImmediateContext() }
            .map_err(|e| WinError::new(e, "ID3D11Device::GetImmediateContext"))
            .map_err(|e| CaptureError::Context(e.into()))?;

        debug!("Created Direct3D 11 staging strategy");

        Ok(StagingCopy::new(D3D11Staging {
            device: self.device.clone(),
            context: SendD3D11Context(context),
        })
        .into())
    }
}

/// A CPU readable staging texture.
pub struct D3D11StagingTexture {
    resource: ID3D11Resource,
    height: u32,
}
unsafe impl Send for D3D11StagingTexture {}

/// Copies and maps textures through a device's immediate context.
pub struct D3D11Staging {
    device: SendD3D11Device,
    context: SendD3D11Context,
}

impl D3D11Staging {
    fn source(texture: TextureHandle) -> Result<ID3D11Texture2D, WinError> {
        let raw = texture.0 as *mut c_void;
        unsafe { ID3D11Texture2D::from_raw_borrowed(&raw) }
            .cloned()
            .ok_or(WinError::null("ID3D11Texture2D::from_raw_borrowed"))
    }
}

impl StagingDevice for D3D11Staging {
    type Texture = D3D11StagingTexture;

    fn describe(&self, texture: TextureHandle) -> Result<TextureDescription, DeviceError> {
        let source = Self::source(texture)?;

        let mut desc = D3D11_TEXTURE2D_DESC::default();
        unsafe { source.GetDesc(&mut desc) };

        Ok(TextureDescription {
            width: desc.Width,
            height: desc.Height,
            mip_levels: desc.MipLevels,
            format: dxgi_to_source(desc.Format),
        })
    }

    fn create_staging(
        &self,
        description: &TextureDescription,
    ) -> Result<Self::Texture, DeviceError> {
        let desc = D3D11_TEXTURE2D_DESC {
            Width: description.width,
            Height: description.height,
            MipLevels: description.mip_levels,
            ArraySize: 1,
            Format: source_to_dxgi(description.format),
            SampleDesc: DXGI_SAMPLE_DESC {
                Count: 1,
                Quality: 0,
            },
            Usage: D3D11_USAGE_STAGING,
            BindFlags: 0,
            CPUAccessFlags: D3D11_CPU_ACCESS_READ.0 as u32,
            MiscFlags: 0,
        };

        let mut texture = None;
        unsafe { self.device.CreateTexture2D(&desc, None, Some(&mut texture)) }
            .map_err(|e| WinError::new(e, "ID3D11Device::CreateTexture2D"))?;
        let texture = texture.ok_or(WinError::null("ID3D11Device::CreateTexture2D"))?;

        let resource: ID3D11Resource = texture
            .cast()
            .map_err(|e| WinError::new(e, "ID3D11Texture2D::cast"))?;

        Ok(D3D11StagingTexture {
            resource,
            height: description.height,
        })
    }

    fn copy(&self, source: TextureHandle, destination: &Self::Texture) -> Result<(), DeviceError> {
        let source: ID3D11Resource = Self::source(source)?
            .cast()
            .map_err(|e| WinError::new(e, "ID3D11Texture2D::cast"))?;

        unsafe {
            self.context
                .CopyResource(&destination.resource, &source)
        };

        Ok(())
    }

    fn map<'a>(&'a self, texture: &'a Self::Texture) -> Result<MappedTexture<'a>, DeviceError> {
        let mut mapped = D3D11_MAPPED_SUBRESOURCE::default();
        unsafe {
            self.context.Map(
                &texture.resource,
                0,
                D3D11_MAP_READ,
                0,
                Some(&mut mapped),
            )
        }
        .map_err(|e| WinError::new(e, "ID3D11DeviceContext::Map"))?;

        if mapped.pData.is_null() {
            unsafe { self.context.Unmap(&texture.resource, 0) };
            return Err(WinError::null("ID3D11DeviceContext::Map").into());
        }

        let row_pitch = mapped.RowPitch as usize;
        let data = unsafe {
            core::slice::from_raw_parts(
                mapped.pData as *const u8,
                row_pitch * texture.height as usize,
            )
        };

        Ok(MappedTexture { data, row_pitch })
    }

    fn unmap(&self, texture: &Self::Texture) {
        unsafe { self.context.Unmap(&texture.resource, 0) };
    }
}
