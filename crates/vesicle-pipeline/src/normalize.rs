//! Intensity normalization to the 8-bit range consumed by segmentation.
//!
//! Raw micrograph values are arbitrary floats (electron counts, or
//! already-rescaled values). They are mapped linearly so the minimum
//! becomes 0 and the maximum 255. A constant image maps to all zeros.

use image::GrayImage;

use crate::types::IntensityImage;

/// Linearly rescale `image` into `0..=255`.
///
/// Non-finite pixels are treated as the minimum.
#[must_use]
pub fn normalize_to_u8(image: &IntensityImage) -> GrayImage {
    let (min, max) = image
        .pixels()
        .map(|p| p.0[0])
        .filter(|v| v.is_finite())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });

    let range = max - min;
    if !range.is_finite() || range <= 0.0 {
        return GrayImage::new(image.width(), image.height());
    }

    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let v = image.get_pixel(x, y).0[0];
        let v = if v.is_finite() { v } else { min };
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let scaled = ((v - min) / range * 255.0).round().clamp(0.0, 255.0) as u8;
        image::Luma([scaled])
    })
}
