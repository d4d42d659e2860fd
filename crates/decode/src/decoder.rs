//! Downsampling decoder
//!
//! Decoding happens in two passes over the same encoded bytes: the first pass
//! reads only the header to learn the source dimensions, the second decodes
//! and subsamples to the factor chosen by [`compute_sample_factor`].
//!
//! JPEG sources are scaled in the DCT domain (1/2, 1/4 or 1/8) while
//! decoding, so the full-resolution bitmap is never materialized. Every
//! decode is bounded by an allocation limit.

use crate::bitmap::{Bitmap, ImageSize};
use crate::sample::{compute_sample_factor, sampled_size};
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, ImageFormat, ImageReader, Limits, RgbImage};
use std::fs;
use std::io::{self, Cursor};
use std::path::Path;

/// Largest pixel buffer a single decode may allocate
pub const DEFAULT_MAX_DECODE_BYTES: u64 = 128 * 1024 * 1024;

/// Errors produced while decoding or encoding images
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("image codec error: {0}")]
    Image(#[from] image::ImageError),
    #[error("JPEG decode error: {0}")]
    Jpeg(#[from] jpeg_decoder::Error),
    #[error("decoded buffer does not match {width}x{height}")]
    BufferSize { width: u32, height: u32 },
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Read the pixel dimensions of an encoded image without decoding its pixels.
pub fn read_dimensions(bytes: &[u8]) -> Result<ImageSize, DecodeError> {
    let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    let (width, height) = reader.into_dimensions()?;
    Ok(ImageSize::new(width, height))
}

/// Decode `bytes`, subsampling so the result is close to `target`.
///
/// With `target == None` the image is decoded at its native size. The aspect
/// ratio is preserved and neither dimension drops below one pixel.
///
/// # Errors
///
/// Returns an error if the format cannot be recognized, the data is
/// corrupt or truncated, or decoding would allocate more than
/// [`DEFAULT_MAX_DECODE_BYTES`].
pub fn decode_sampled(bytes: &[u8], target: Option<ImageSize>) -> Result<Bitmap, DecodeError> {
    decode_sampled_with_limit(bytes, target, DEFAULT_MAX_DECODE_BYTES)
}

/// [`decode_sampled`] with an explicit allocation limit in bytes.
pub fn decode_sampled_with_limit(
    bytes: &[u8],
    target: Option<ImageSize>,
    max_alloc: u64,
) -> Result<Bitmap, DecodeError> {
    let source = read_dimensions(bytes)?;
    let factor = match target {
        Some(target) => compute_sample_factor(source, target),
        None => 1,
    };
    let sampled = sampled_size(source, factor);

    let image = if factor > 1 && image::guess_format(bytes).ok() == Some(ImageFormat::Jpeg) {
        match decode_jpeg_scaled(bytes, sampled, max_alloc)? {
            Some(image) => image,
            None => decode_full(bytes, max_alloc)?,
        }
    } else {
        decode_full(bytes, max_alloc)?
    };

    if image.width() == sampled.width && image.height() == sampled.height {
        return Ok(Bitmap::new(image));
    }

    tracing::trace!(
        source_width = source.width,
        source_height = source.height,
        decoded_width = image.width(),
        decoded_height = image.height(),
        factor,
        "subsampling decoded image"
    );
    Ok(Bitmap::new(image.resize_exact(
        sampled.width,
        sampled.height,
        FilterType::Triangle,
    )))
}

fn decode_full(bytes: &[u8], max_alloc: u64) -> Result<DynamicImage, DecodeError> {
    let mut limits = Limits::default();
    limits.max_alloc = Some(max_alloc);

    let mut reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    reader.limits(limits);
    Ok(reader.decode()?)
}

/// Decode a JPEG at the smallest DCT scale that still covers `sampled`.
///
/// Returns `Ok(None)` for pixel formats this path does not handle.
fn decode_jpeg_scaled(
    bytes: &[u8],
    sampled: ImageSize,
    max_alloc: u64,
) -> Result<Option<DynamicImage>, DecodeError> {
    let mut decoder = jpeg_decoder::Decoder::new(Cursor::new(bytes));
    decoder.set_max_decoding_buffer_size(usize::try_from(max_alloc).unwrap_or(usize::MAX));
    decoder.read_info()?;

    let requested_width = u16::try_from(sampled.width).unwrap_or(u16::MAX);
    let requested_height = u16::try_from(sampled.height).unwrap_or(u16::MAX);
    let (width, height) = decoder.scale(requested_width, requested_height)?;
    let pixels = decoder.decode()?;
    let Some(info) = decoder.info() else {
        return Ok(None);
    };

    let (width, height) = (u32::from(width), u32::from(height));
    let buffer_error = DecodeError::BufferSize { width, height };
    let image = match info.pixel_format {
        jpeg_decoder::PixelFormat::RGB24 => {
            DynamicImage::ImageRgb8(RgbImage::from_raw(width, height, pixels).ok_or(buffer_error)?)
        }
        jpeg_decoder::PixelFormat::L8 => {
            DynamicImage::ImageLuma8(GrayImage::from_raw(width, height, pixels).ok_or(buffer_error)?)
        }
        jpeg_decoder::PixelFormat::L16 | jpeg_decoder::PixelFormat::CMYK32 => return Ok(None),
    };
    Ok(Some(image))
}

/// Decode the file at `path` with [`decode_sampled`].
pub fn decode_sampled_file<P: AsRef<Path>>(
    path: P,
    target: Option<ImageSize>,
) -> Result<Bitmap, DecodeError> {
    let bytes = fs::read(path.as_ref())?;
    decode_sampled(&bytes, target)
}
