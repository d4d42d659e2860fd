//! Decode sample-factor calculation
//!
//! Computes how much a source image should be subsampled so the decoded
//! bitmap is close to (but not smaller than) a requested target size.

use crate::bitmap::ImageSize;

/// Maximum ratio between decoded pixels and target pixels.
///
/// Very wide or very tall sources (panoramas) can satisfy the per-axis ratio
/// while still decoding to many times the target area. The factor keeps
/// growing until the decoded area is at most this multiple of the target area.
pub const PIXEL_OVERSHOOT_LIMIT: u64 = 2;

/// Compute the subsampling factor for decoding `source` into `target`.
///
/// Returns 1 when the source already fits the target. Otherwise the factor is
/// the smaller of the rounded width and height ratios, then incremented while
/// the decoded area would exceed `target area × PIXEL_OVERSHOOT_LIMIT`.
///
/// The result is not restricted to powers of two. A zero-sized target imposes
/// no bound and yields 1.
///
/// # Example
///
/// ```
/// use thumbgrid_decode::{compute_sample_factor, ImageSize};
///
/// let factor = compute_sample_factor(ImageSize::new(1600, 1200), ImageSize::square(400));
/// assert_eq!(factor, 3);
/// ```
pub fn compute_sample_factor(source: ImageSize, target: ImageSize) -> u32 {
    if target.is_empty() || source.is_empty() {
        return 1;
    }

    let mut factor: u64 = 1;
    if !source.fits_within(target) {
        let width_ratio = (source.width as f64 / target.width as f64).round() as u64;
        let height_ratio = (source.height as f64 / target.height as f64).round() as u64;
        factor = width_ratio.min(height_ratio).max(1);
    }

    let total_pixels = source.pixel_count() as f64;
    let allowed_pixels = (target.pixel_count() * PIXEL_OVERSHOOT_LIMIT) as f64;
    while total_pixels / (factor * factor) as f64 > allowed_pixels {
        factor += 1;
    }

    factor.min(u32::MAX as u64) as u32
}

/// Dimensions of `source` after subsampling by `factor`, never below 1×1.
pub fn sampled_size(source: ImageSize, factor: u32) -> ImageSize {
    let factor = factor.max(1);
    ImageSize::new(
        (source.width / factor).max(1),
        (source.height / factor).max(1),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factor(sw: u32, sh: u32, tw: u32, th: u32) -> u32 {
        compute_sample_factor(ImageSize::new(sw, sh), ImageSize::new(tw, th))
    }

    #[test]
    fn test_source_within_target_is_one() {
        assert_eq!(factor(100, 100, 100, 100), 1);
        assert_eq!(factor(50, 80, 100, 100), 1);
        assert_eq!(factor(1, 1, 1000, 1000), 1);

        for (sw, sh) in [(10, 10), (99, 1), (1, 99), (100, 100)] {
            assert_eq!(factor(sw, sh, 100, 100), 1);
        }
    }

    #[test]
    fn test_uses_smaller_rounded_ratio() {
        // widths 4, heights 2; 2_000_000 / 4 is exactly the 500_000 limit
        assert_eq!(factor(2000, 1000, 500, 500), 2);
        // ratios 2.5 -> 3 and 2.0 -> 2
        assert_eq!(factor(1250, 1000, 500, 500), 2);
    }

    #[test]
    fn test_ratio_rounds_to_nearest() {
        // 1.6 rounds to 2
        assert_eq!(factor(800, 800, 500, 500), 2);
        // 1.2 rounds to 1 and 360_000 is already under the area limit
        assert_eq!(factor(600, 600, 500, 500), 1);
    }

    #[test]
    fn test_panorama_refines_factor() {
        // ratios 8 and 2 -> start at 2; 4_000_000 / 4 > 500_000 -> 3; 444_444 <= 500_000
        assert_eq!(factor(4000, 1000, 500, 500), 3);
        // extreme strip: ratios 20 and 1 -> start at 1, then refine
        let f = factor(10_000, 500, 500, 500);
        let decoded = 10_000u64 * 500 / (f as u64 * f as u64);
        assert!(decoded <= 500 * 500 * PIXEL_OVERSHOOT_LIMIT);
        assert!(f > 1);
    }

    #[test]
    fn test_small_ratio_never_zero() {
        // width ratio 0.2 rounds to 0, but the factor is at least 1
        assert!(factor(100, 1000, 500, 500) >= 1);
    }

    #[test]
    fn test_zero_target_is_unbounded() {
        assert_eq!(factor(4000, 4000, 0, 0), 1);
        assert_eq!(factor(4000, 4000, 0, 100), 1);
    }

    #[test]
    fn test_sampled_size_has_floor() {
        assert_eq!(sampled_size(ImageSize::new(2000, 1000), 2), ImageSize::new(1000, 500));
        assert_eq!(sampled_size(ImageSize::new(3, 1), 4), ImageSize::new(1, 1));
        assert_eq!(sampled_size(ImageSize::new(30, 10), 0), ImageSize::new(30, 10));
    }
}
