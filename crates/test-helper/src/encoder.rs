use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use frame_capture::{StillEncoder, StillEncoderError, StillImage};
use parking_lot::Mutex;

/// An owned copy of an encoded [`StillImage`].
#[derive(Clone, Debug)]
pub struct EncodedStill {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub bit_depth: u8,
    pub rows: Vec<Vec<u8>>,
}

/// An encoder that records every still instead of writing it.
pub struct MockEncoder {
    pub stills: Arc<Mutex<Vec<EncodedStill>>>,
}

impl MockEncoder {
    /// A recording encoder, and a handle to what it records.
    pub fn new() -> (Box<dyn StillEncoder>, Arc<Mutex<Vec<EncodedStill>>>) {
        let stills = Arc::new(Mutex::new(Vec::new()));
        let encoder = Box::new(Self {
            stills: Arc::clone(&stills),
        });

        (encoder, stills)
    }
}

impl StillEncoder for MockEncoder {
    fn encode(&self, path: &Path, image: &StillImage<'_>) -> Result<(), StillEncoderError> {
        self.stills.lock().push(EncodedStill {
            path: path.to_path_buf(),
            width: image.width,
            height: image.height,
            bit_depth: image.bit_depth,
            rows: image.rows.iter().map(|row| row.to_vec()).collect(),
        });

        Ok(())
    }
}
