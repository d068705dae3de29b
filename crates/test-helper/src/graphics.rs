use std::sync::Arc;

use frame_capture::{
    CaptureError, ClientReadback, DeviceError, GraphicsApi, GraphicsDevice, MappedTexture,
    PixelReader, ReadChannel, ReadbackStrategy, SourceFormat, StagingCopy, StagingDevice,
    TextureDescription, TextureHandle,
};
use parking_lot::Mutex;

/// The state of a mock staging-copy GPU.
#[derive(Debug)]
pub struct GpuState {
    /// The description of every live texture.
    pub description: TextureDescription,

    /// The live texture's pixels, bottom row first, `row_pitch` bytes per row.
    pub pixels: Vec<u8>,
    pub row_pitch: usize,

    /// Staging textures currently alive.
    pub live_textures: usize,
    pub created: usize,

    /// The ids of the staging textures copied into, in order.
    pub copies: Vec<usize>,
    /// The ids of the staging textures mapped, in order.
    pub maps: Vec<usize>,
    pub unmaps: usize,

    pub fail_describe: bool,
    pub fail_create: bool,
    pub fail_map: bool,
}

impl GpuState {
    /// A GPU whose live texture is `width` by `height` in `format`, with unpadded zeroed rows.
    pub fn new(width: u32, height: u32, format: SourceFormat) -> Self {
        let bytes_per_pixel = match format {
            SourceFormat::Rgba16Float | SourceFormat::Rgba16Typeless => 8,
            _ => 4,
        };
        let row_pitch = width as usize * bytes_per_pixel;

        Self {
            description: TextureDescription {
                width,
                height,
                mip_levels: 1,
                format,
            },
            pixels: vec![0; row_pitch * height as usize],
            row_pitch,
            live_textures: 0,
            created: 0,
            copies: Vec::new(),
            maps: Vec::new(),
            unmaps: 0,
            fail_describe: false,
            fail_create: false,
            fail_map: false,
        }
    }

    /// GPU work done since creation: copies and maps.
    pub fn gpu_work(&self) -> usize {
        self.copies.len() + self.maps.len()
    }
}

/// A staging texture holding a snapshot of the live texture at creation.
pub struct MockTexture {
    id: usize,
    data: Vec<u8>,
    gpu: Arc<Mutex<GpuState>>,
}

impl Drop for MockTexture {
    fn drop(&mut self) {
        self.gpu.lock().live_textures -= 1;
    }
}

/// A staging device backed by [`GpuState`].
pub struct MockStagingDevice {
    pub gpu: Arc<Mutex<GpuState>>,
}

impl StagingDevice for MockStagingDevice {
    type Texture = MockTexture;

    fn describe(&self, _texture: TextureHandle) -> Result<TextureDescription, DeviceError> {
        let gpu = self.gpu.lock();
        if gpu.fail_describe {
            return Err(DeviceError::new("GetDesc", "mock failure"));
        }

        Ok(gpu.description)
    }

    fn create_staging(
        &self,
        description: &TextureDescription,
    ) -> Result<Self::Texture, DeviceError> {
        let mut gpu = self.gpu.lock();
        if gpu.fail_create {
            return Err(DeviceError::new("CreateTexture2D", "mock failure"));
        }

        assert_eq!(*description, gpu.description);

        gpu.live_textures += 1;
        gpu.created += 1;

        Ok(MockTexture {
            id: gpu.created,
            data: gpu.pixels.clone(),
            gpu: Arc::clone(&self.gpu),
        })
    }

    fn copy(&self, _source: TextureHandle, destination: &Self::Texture) -> Result<(), DeviceError> {
        self.gpu.lock().copies.push(destination.id);
        Ok(())
    }

    fn map<'a>(&'a self, texture: &'a Self::Texture) -> Result<MappedTexture<'a>, DeviceError> {
        let mut gpu = self.gpu.lock();
        if gpu.fail_map {
            return Err(DeviceError::new("Map", "mock failure"));
        }
        gpu.maps.push(texture.id);

        Ok(MappedTexture {
            data: &texture.data,
            row_pitch: gpu.row_pitch,
        })
    }

    fn unmap(&self, _texture: &Self::Texture) {
        self.gpu.lock().unmaps += 1;
    }
}

/// The state of a mock client-readback GPU.
#[derive(Debug, Default)]
pub struct ReaderState {
    pub internal_format: u32,
    pub size: [u32; 2],

    /// The textures bound, in order.
    pub binds: Vec<TextureHandle>,
    /// The channel of each read, in order.
    pub reads: Vec<ReadChannel>,

    /// No rendering context is current.
    pub no_context: bool,
    pub fail_bind: bool,
    pub fail_read: bool,
}

impl ReaderState {
    /// A reader whose bound texture is `width` by `height` with `internal_format`.
    pub fn new(width: u32, height: u32, internal_format: u32) -> Self {
        Self {
            internal_format,
            size: [width, height],
            ..Default::default()
        }
    }
}

/// A pixel reader backed by [`ReaderState`], filling reads with `index % 251`.
pub struct MockReader {
    pub state: Arc<Mutex<ReaderState>>,
}

impl PixelReader for MockReader {
    fn has_context(&self) -> bool {
        !self.state.lock().no_context
    }

    fn bind(&mut self, texture: TextureHandle) -> Result<(), DeviceError> {
        let mut state = self.state.lock();
        if state.fail_bind {
            return Err(DeviceError::new("glBindTexture", "mock failure"));
        }
        state.binds.push(texture);
        Ok(())
    }

    fn internal_format(&mut self) -> Result<u32, DeviceError> {
        Ok(self.state.lock().internal_format)
    }

    fn texture_size(&mut self) -> Result<[u32; 2], DeviceError> {
        Ok(self.state.lock().size)
    }

    fn read_pixels(
        &mut self,
        channel: ReadChannel,
        destination: &mut [u8],
    ) -> Result<(), DeviceError> {
        let mut state = self.state.lock();
        if state.fail_read {
            return Err(DeviceError::new("glGetTexImage", "mock failure"));
        }
        state.reads.push(channel);

        for (index, byte) in destination.iter_mut().enumerate() {
            *byte = (index % 251) as u8;
        }

        Ok(())
    }
}

/// The backing state of a [`MockDevice`].
pub enum MockBackend {
    Staging(Arc<Mutex<GpuState>>),
    Readback(Arc<Mutex<ReaderState>>),
}

/// A host graphics device building strategies over the mock GPUs.
pub struct MockDevice {
    pub backend: MockBackend,
    pub fail_context: bool,
}

impl MockDevice {
    pub fn staging(gpu: &Arc<Mutex<GpuState>>) -> Arc<dyn GraphicsDevice> {
        Arc::new(Self {
            backend: MockBackend::Staging(Arc::clone(gpu)),
            fail_context: false,
        })
    }

    pub fn readback(state: &Arc<Mutex<ReaderState>>) -> Arc<dyn GraphicsDevice> {
        Arc::new(Self {
            backend: MockBackend::Readback(Arc::clone(state)),
            fail_context: false,
        })
    }

    /// A staging device that cannot provide a rendering context.
    pub fn without_context(gpu: &Arc<Mutex<GpuState>>) -> Arc<dyn GraphicsDevice> {
        Arc::new(Self {
            backend: MockBackend::Staging(Arc::clone(gpu)),
            fail_context: true,
        })
    }
}

impl GraphicsDevice for MockDevice {
    fn api(&self) -> GraphicsApi {
        match self.backend {
            MockBackend::Staging(_) => GraphicsApi::Direct3D11,
            MockBackend::Readback(_) => GraphicsApi::OpenGl,
        }
    }

    fn create_strategy(&self) -> Result<Box<dyn ReadbackStrategy>, CaptureError> {
        if self.fail_context {
            return Err(CaptureError::Context(DeviceError::new(
                "GetImmediateContext",
                "mock failure",
            )));
        }

        let strategy: Box<dyn ReadbackStrategy> = match &self.backend {
            MockBackend::Staging(gpu) => StagingCopy::new(MockStagingDevice {
                gpu: Arc::clone(gpu),
            })
            .into(),

            MockBackend::Readback(state) => ClientReadback::new(MockReader {
                state: Arc::clone(state),
            })
            .into(),
        };

        Ok(strategy)
    }
}
