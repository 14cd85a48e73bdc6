//! Integer-factor downsampling of raw micrograph intensities.
//!
//! Each output pixel is the mean of a `factor`×`factor` block of input
//! pixels, so the output is `floor(width / factor)` by
//! `floor(height / factor)`. Trailing rows and columns that do not fill
//! a whole block are discarded, keeping the mapping between downsampled
//! and full-resolution coordinates an exact multiplication by `factor`.

use crate::types::{IntensityImage, PipelineError};

/// Block-average `image` by `factor`.
///
/// A factor of 1 returns a copy.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] if `factor` is zero and
/// [`PipelineError::ImageTooSmall`] if either output dimension would be
/// zero.
pub fn downsample(image: &IntensityImage, factor: u32) -> Result<IntensityImage, PipelineError> {
    if factor == 0 {
        return Err(PipelineError::InvalidConfig(
            "downsample must be at least 1".to_string(),
        ));
    }

    let (w, h) = (image.width() / factor, image.height() / factor);
    if w == 0 || h == 0 {
        return Err(PipelineError::ImageTooSmall {
            width: image.width(),
            height: image.height(),
            downsample: factor,
        });
    }
    if factor == 1 {
        return Ok(image.clone());
    }

    #[allow(clippy::cast_precision_loss)]
    let block = (factor * factor) as f64;
    Ok(IntensityImage::from_fn(w, h, |x, y| {
        let mut sum = 0.0_f64;
        for by in 0..factor {
            for bx in 0..factor {
                sum += f64::from(image.get_pixel(x * factor + bx, y * factor + by).0[0]);
            }
        }
        #[allow(clippy::cast_possible_truncation)]
        let mean = (sum / block) as f32;
        image::Luma([mean])
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[allow(clippy::cast_precision_loss)]
    fn ramp(w: u32, h: u32) -> IntensityImage {
        IntensityImage::from_fn(w, h, |x, y| image::Luma([(x + y * w) as f32]))
    }

    #[test]
    fn output_is_floor_of_dimension() {
        let out = downsample(&ramp(10, 7), 3).unwrap();
        assert_eq!(out.dimensions(), (3, 2));
    }

    #[test]
    fn factor_one_is_identity() {
        let img = ramp(5, 4);
        assert_eq!(downsample(&img, 1).unwrap(), img);
    }

    #[test]
    fn blocks_are_averaged() {
        // 4x2 ramp: row0 = 0 1 2 3, row1 = 4 5 6 7.
        let out = downsample(&ramp(4, 2), 2).unwrap();
        assert!((out.get_pixel(0, 0).0[0] - 2.5).abs() < 1e-6);
        assert!((out.get_pixel(1, 0).0[0] - 4.5).abs() < 1e-6);
    }

    #[test]
    fn zero_factor_is_config_error() {
        assert!(matches!(
            downsample(&ramp(4, 4), 0),
            Err(PipelineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn too_small_image_is_rejected() {
        assert!(matches!(
            downsample(&ramp(3, 8), 4),
            Err(PipelineError::ImageTooSmall { .. })
        ));
    }
}
