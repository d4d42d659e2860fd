//! Bitmap encoding for the disk cache

use crate::bitmap::Bitmap;
use crate::decoder::DecodeError;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Codec used when writing bitmaps to the disk cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressFormat {
    /// Lossy; honours the quality setting. Alpha is dropped.
    #[default]
    Jpeg,
    /// Lossless; quality is ignored.
    Png,
    /// Lossless WebP; quality is ignored.
    WebP,
}

impl CompressFormat {
    /// Returns true if the codec discards information
    pub fn is_lossy(&self) -> bool {
        matches!(self, CompressFormat::Jpeg)
    }
}

/// Encode `bitmap` into `writer` using `format`.
///
/// `quality` is clamped to `1..=100` and only affects lossy formats.
pub fn encode<W: Write>(
    bitmap: &Bitmap,
    format: CompressFormat,
    quality: u8,
    writer: W,
) -> Result<(), DecodeError> {
    let image = bitmap.image();
    match format {
        CompressFormat::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(writer, quality.clamp(1, 100));
            DynamicImage::ImageRgb8(image.to_rgb8()).write_with_encoder(encoder)?;
        }
        CompressFormat::Png => {
            image.write_with_encoder(PngEncoder::new(writer))?;
        }
        CompressFormat::WebP => {
            let encoder = WebPEncoder::new_lossless(writer);
            DynamicImage::ImageRgba8(image.to_rgba8()).write_with_encoder(encoder)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::decode_sampled;
    use image::{Rgba, RgbaImage};

    fn gradient(width: u32, height: u32) -> Bitmap {
        let image = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x * 7) as u8, (y * 5) as u8, 128, 255])
        });
        Bitmap::new(DynamicImage::ImageRgba8(image))
    }

    #[test]
    fn test_every_format_preserves_dimensions() {
        let bitmap = gradient(37, 21);
        for format in [CompressFormat::Jpeg, CompressFormat::Png, CompressFormat::WebP] {
            let mut bytes = Vec::new();
            encode(&bitmap, format, 70, &mut bytes).unwrap();
            let decoded = decode_sampled(&bytes, None).unwrap();
            assert_eq!(decoded.size(), bitmap.size(), "format {:?}", format);
        }
    }

    #[test]
    fn test_jpeg_quality_affects_size() {
        let bitmap = gradient(64, 64);
        let mut low = Vec::new();
        let mut high = Vec::new();
        encode(&bitmap, CompressFormat::Jpeg, 10, &mut low).unwrap();
        encode(&bitmap, CompressFormat::Jpeg, 100, &mut high).unwrap();
        assert!(low.len() < high.len());
    }

    #[test]
    fn test_default_is_lossy_jpeg() {
        assert_eq!(CompressFormat::default(), CompressFormat::Jpeg);
        assert!(CompressFormat::Jpeg.is_lossy());
        assert!(!CompressFormat::Png.is_lossy());
    }
}
