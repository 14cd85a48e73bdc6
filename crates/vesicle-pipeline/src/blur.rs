//! Low-pass filters applied to the downsampled micrograph before
//! segmentation.
//!
//! [`gaussian_blur`] wraps [`imageproc::filter::gaussian_blur_f32`].
//! [`bilateral_blur`] wraps [`imageproc::filter::bilateral_filter`], an
//! edge-preserving filter that smooths the ice background while keeping
//! membrane edges sharp. Its parameters follow the usual `d` /
//! `sigmaColor` / `sigmaSpace` convention: `d` is the neighbourhood
//! diameter, and a non-positive `d` derives the radius from
//! `sigma_space`.

use image::GrayImage;
use imageproc::filter::bilateral::GaussianEuclideanColorDistance;

/// Apply Gaussian blur to a grayscale image.
///
/// Non-positive sigma values return the image unchanged, since
/// `imageproc`'s underlying function panics on `sigma <= 0.0`.
#[must_use = "returns the blurred image"]
pub fn gaussian_blur(image: &GrayImage, sigma: f32) -> GrayImage {
    if sigma <= 0.0 {
        return image.clone();
    }

    imageproc::filter::gaussian_blur_f32(image, sigma)
}

/// Apply an edge-preserving bilateral filter.
///
/// Wraps [`imageproc::filter::bilateral_filter`] with a Gaussian range
/// kernel of `sigma_color`. The square window has radius `d / 2`, or
/// `1.5 × sigma_space` when `d` is non-positive, clamped to `1..=255`.
///
/// Non-positive sigmas and empty images return the image unchanged.
#[must_use = "returns the filtered image"]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn bilateral_blur(image: &GrayImage, d: i32, sigma_color: f64, sigma_space: f64) -> GrayImage {
    if sigma_color <= 0.0 || sigma_space <= 0.0 || image.width() == 0 || image.height() == 0 {
        return image.clone();
    }

    let radius = if d > 0 {
        d / 2
    } else {
        (sigma_space * 1.5).round().min(255.0) as i32
    };
    let radius = u8::try_from(radius.clamp(1, 255)).unwrap_or(u8::MAX);

    imageproc::filter::bilateral_filter(
        image,
        radius,
        sigma_space as f32,
        GaussianEuclideanColorDistance::new(sigma_color as f32),
    )
}
