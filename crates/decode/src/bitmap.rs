//! Decoded bitmaps and pixel dimensions

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Width and height of an image in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    /// Create a new size
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Create a square size (used for grid thumbnails)
    pub fn square(size: u32) -> Self {
        Self::new(size, size)
    }

    /// Total number of pixels
    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Returns true if either dimension is zero
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Returns true if this size fits within `bounds` in both dimensions
    pub fn fits_within(&self, bounds: ImageSize) -> bool {
        self.width <= bounds.width && self.height <= bounds.height
    }
}

/// A decoded image shared between the memory cache and display targets.
///
/// Cloning a `Bitmap` is cheap: the pixel buffer is reference counted and
/// never copied.
#[derive(Debug, Clone)]
pub struct Bitmap {
    image: Arc<DynamicImage>,
}

impl Bitmap {
    pub fn new(image: DynamicImage) -> Self {
        Self {
            image: Arc::new(image),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn size(&self) -> ImageSize {
        ImageSize::new(self.width(), self.height())
    }

    /// Borrow the underlying decoded image
    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    /// Estimated in-memory footprint in bytes (pixel count × bytes per pixel)
    pub fn byte_size(&self) -> usize {
        let bytes_per_pixel = self.image.color().bytes_per_pixel() as u64;
        (self.size().pixel_count() * bytes_per_pixel) as usize
    }

    /// Returns true if both bitmaps share the same pixel buffer
    pub fn ptr_eq(&self, other: &Bitmap) -> bool {
        Arc::ptr_eq(&self.image, &other.image)
    }
}

impl From<DynamicImage> for Bitmap {
    fn from(image: DynamicImage) -> Self {
        Self::new(image)
    }
}
