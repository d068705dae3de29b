//! Still captures, written as PNG images.
//!

use alloc::vec::Vec;
use std::{
    fs::File,
    io::{self, BufWriter},
    path::Path,
};

use half::f16;
use image::{ExtendedColorType, ImageEncoder, ImageError, codecs::png::PngEncoder};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::{FrameView, PixelFormat, RowOrder, SampleEncoding};

/// An RGBA image ready to be encoded.
#[derive(Debug)]
pub struct StillImage<'a> {
    /// The image width in pixels.
    pub width: u32,
    /// The image height in pixels.
    pub height: u32,

    /// 8 or 16 bits per channel.
    pub bit_depth: u8,

    /// The rows from top to bottom, each `width * 4 * bit_depth / 8` bytes. 16-bit samples are
    /// big endian.
    pub rows: Vec<&'a [u8]>,
}

/// Writes still images to disk.
pub trait StillEncoder: Send {
    /// Writes `image` to `path`, replacing any existing file.
    fn encode(&self, path: &Path, image: &StillImage<'_>) -> Result<(), StillEncoderError>;
}

/// Failed to write a still image.
#[derive(Debug, Error)]
pub enum StillEncoderError {
    /// The file could not be created.
    #[error("Failed to create the image file:\n{0}")]
    CreateFile(#[source] io::Error),

    /// The image could not be encoded.
    #[error("Failed to encode the image:\n{0}")]
    Encode(#[source] ImageError),

    /// The bit depth is not 8 or 16.
    #[error("Image has {0} bits per channel, only 8 and 16 are supported")]
    BitDepth(u8),
}

/// Encodes still images as RGBA PNG files.
#[derive(Clone, Copy, Debug, Default)]
pub struct PngStillEncoder;

impl StillEncoder for PngStillEncoder {
    #[instrument("PngStillEncoder::encode", skip_all, err)]
    fn encode(&self, path: &Path, image: &StillImage<'_>) -> Result<(), StillEncoderError> {
        let (color_type, pixels) = match image.bit_depth {
            8 => (ExtendedColorType::Rgba8, image.rows.concat()),

            // The encoder takes native endian samples.
            16 => {
                let pixels = image
                    .rows
                    .iter()
                    .flat_map(|row| row.chunks_exact(2))
                    .flat_map(|sample| u16::from_be_bytes([sample[0], sample[1]]).to_ne_bytes())
                    .collect();
                (ExtendedColorType::Rgba16, pixels)
            }

            bit_depth => return Err(StillEncoderError::BitDepth(bit_depth)),
        };

        let file = File::create(path).map_err(StillEncoderError::CreateFile)?;
        PngEncoder::new(BufWriter::new(file))
            .write_image(&pixels, image.width, image.height, color_type)
            .map_err(StillEncoderError::Encode)?;

        debug!("Wrote {}x{} still to {}", image.width, image.height, path.display());

        Ok(())
    }
}

/// Returns the rows of a frame from top to bottom, each trimmed to `row_bytes`.
pub fn top_down_rows(
    data: &[u8],
    row_pitch: usize,
    row_bytes: usize,
    height: u32,
    order: RowOrder,
) -> Vec<&[u8]> {
    let row = |index: usize| &data[index * row_pitch..index * row_pitch + row_bytes];
    let height = height as usize;

    match order {
        RowOrder::TopDown => (0..height).map(row).collect(),
        RowOrder::BottomUp => (0..height).rev().map(row).collect(),
    }
}

/// Encodes a captured frame through `encoder`.
pub(crate) fn encode_frame(
    encoder: &dyn StillEncoder,
    path: &Path,
    view: FrameView<'_>,
) -> Result<(), StillEncoderError> {
    let row_bytes = view.width as usize * view.format.bytes_per_pixel();

    match view.encoding {
        SampleEncoding::Unorm8 => {
            let rows = top_down_rows(
                view.data,
                view.row_pitch,
                row_bytes,
                view.height,
                view.row_order,
            );
            encoder.encode(path, &still_image(&view, 8, rows))
        }

        SampleEncoding::Unorm16 => {
            let packed = repack_rows(&view, row_bytes, |sample| {
                u16::from_ne_bytes(sample).to_be_bytes()
            });
            let rows = top_down_rows(&packed, row_bytes, row_bytes, view.height, view.row_order);
            encoder.encode(path, &still_image(&view, 16, rows))
        }

        SampleEncoding::Float16 => {
            let linear = view.format == PixelFormat::Fp16Linear;
            let mut channel = 0;
            let packed = repack_rows(&view, row_bytes, |sample| {
                let mut value = f16::from_le_bytes(sample).to_f32();
                if linear && channel != 3 {
                    value = srgb_encode(value);
                }
                channel = (channel + 1) % 4;

                unorm16(value).to_be_bytes()
            });
            let rows = top_down_rows(&packed, row_bytes, row_bytes, view.height, view.row_order);
            encoder.encode(path, &still_image(&view, 16, rows))
        }
    }
}

fn still_image<'a>(view: &FrameView<'_>, bit_depth: u8, rows: Vec<&'a [u8]>) -> StillImage<'a> {
    StillImage {
        width: view.width,
        height: view.height,
        bit_depth,
        rows,
    }
}

/// Copies the pixel bytes of every row into a tightly packed buffer, converting each 16-bit
/// sample with `convert`.
fn repack_rows<F>(view: &FrameView<'_>, row_bytes: usize, mut convert: F) -> Vec<u8>
where
    F: FnMut([u8; 2]) -> [u8; 2],
{
    let mut packed = Vec::with_capacity(row_bytes * view.height as usize);

    for index in 0..view.height as usize {
        for sample in view.row(index).chunks_exact(2) {
            packed.extend_from_slice(&convert([sample[0], sample[1]]));
        }
    }

    packed
}

fn srgb_encode(linear: f32) -> f32 {
    if linear <= 0.003_130_8 {
        linear * 12.92
    } else {
        1.055 * linear.powf(1.0 / 2.4) - 0.055
    }
}

fn unorm16(value: f32) -> u16 {
    if value.is_nan() {
        return 0;
    }

    (value.clamp(0.0, 1.0) * 65535.0).round() as u16
}
