//! Mask morphology: grow or shrink a mask boundary by a Euclidean
//! radius before picking.
//!
//! Radii come from configuration in Angstrom and are converted with
//! `radius_px = radius_A / (psize × downsample)`. The raster operations
//! are thresholds on `imageproc`'s exact Euclidean distance transform, so
//! fractional pixel radii are honoured and there is no upper bound on the
//! radius.
//!
//! Every collection-level operation returns records with a freshly
//! derived contour, including the zero-radius case, because contours do
//! not survive the mask store. Records eroded down to nothing are dropped.

use imageproc::distance_transform::euclidean_squared_distance_transform;

use crate::mask::{MASK_ON, MaskRecord};
use crate::types::{GrayImage, PixelScale};

/// Grow a binary mask: a pixel is set when it lies within `radius` of
/// any set pixel.
#[must_use]
pub fn dilate_mask(mask: &GrayImage, radius: f64) -> GrayImage {
    if radius <= 0.0 {
        return mask.clone();
    }
    let dist = euclidean_squared_distance_transform(mask);
    let r2 = radius * radius;
    GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
        if dist.get_pixel(x, y).0[0] <= r2 {
            image::Luma([MASK_ON])
        } else {
            image::Luma([0])
        }
    })
}

/// Shrink a binary mask: a set pixel survives when every unset pixel is
/// farther than `radius` away.
///
/// The canvas border is not treated as background, so masks touching
/// the edge only erode from their interior boundary.
#[must_use]
pub fn erode_mask(mask: &GrayImage, radius: f64) -> GrayImage {
    if radius <= 0.0 {
        return mask.clone();
    }
    let background = GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
        if mask.get_pixel(x, y).0[0] == 0 {
            image::Luma([MASK_ON])
        } else {
            image::Luma([0])
        }
    });
    let dist = euclidean_squared_distance_transform(&background);
    let r2 = radius * radius;
    GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
        if mask.get_pixel(x, y).0[0] != 0 && dist.get_pixel(x, y).0[0] > r2 {
            image::Luma([MASK_ON])
        } else {
            image::Luma([0])
        }
    })
}

/// Shrink every mask by `radius_px` downsampled pixels.
///
/// Masks that vanish are dropped from the output.
#[must_use]
pub fn erode(collection: Vec<MaskRecord>, radius_px: f64) -> Vec<MaskRecord> {
    reshape(collection, |seg| erode_mask(seg, radius_px))
}

/// Grow every mask by `radius_px` downsampled pixels.
#[must_use]
pub fn dilate(collection: Vec<MaskRecord>, radius_px: f64) -> Vec<MaskRecord> {
    reshape(collection, |seg| dilate_mask(seg, radius_px))
}

/// Apply a signed physical offset: negative erodes, positive dilates,
/// zero only re-derives contours.
#[must_use]
pub fn offset(collection: Vec<MaskRecord>, radius_a: f64, scale: &PixelScale) -> Vec<MaskRecord> {
    let radius_px = scale.to_pixels(radius_a.abs());
    if radius_a < 0.0 {
        log::debug!("eroding {} masks by {radius_px:.2} px", collection.len());
        erode(collection, radius_px)
    } else if radius_a > 0.0 {
        log::debug!("dilating {} masks by {radius_px:.2} px", collection.len());
        dilate(collection, radius_px)
    } else {
        with_contours(collection)
    }
}

/// Re-derive contours without changing geometry.
#[must_use]
pub fn with_contours(collection: Vec<MaskRecord>) -> Vec<MaskRecord> {
    collection
        .into_iter()
        .map(|mut record| {
            record.ensure_contour();
            record
        })
        .collect()
}

fn reshape(
    collection: Vec<MaskRecord>,
    op: impl Fn(&GrayImage) -> GrayImage,
) -> Vec<MaskRecord> {
    collection
        .into_iter()
        .filter_map(|record| {
            let shaped = op(record.segmentation());
            let mut record = record.with_segmentation(shaped)?;
            record.ensure_contour();
            Some(record)
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::cast_precision_loss)]
mod tests {
    use super::*;
    use crate::mask::disc_mask;

    fn disc_record(radius: f64) -> MaskRecord {
        MaskRecord::from_segmentation(disc_mask(120, 120, 60.0, 60.0, radius), 0.95, 0.9).unwrap()
    }

    #[test]
    fn zero_radius_only_derives_contour() {
        let record = disc_record(20.0);
        let before = record.clone();
        let out = erode(vec![record.clone()], 0.0);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].segmentation(), before.segmentation());
        assert!(out[0].contour.is_some());

        let out = dilate(vec![record], 0.0);
        assert!(out[0].contour.is_some());
    }

    #[test]
    fn erosion_shrinks_and_dilation_grows() {
        let record = disc_record(20.0);
        let area = record.area();
        let eroded = erode(vec![record.clone()], 3.0);
        let dilated = dilate(vec![record], 3.0);
        assert!(eroded[0].area() < area);
        assert!(dilated[0].area() > area);

        let r_eroded = (eroded[0].area() as f64 / std::f64::consts::PI).sqrt();
        let r_dilated = (dilated[0].area() as f64 / std::f64::consts::PI).sqrt();
        assert!((r_eroded - 17.0).abs() < 1.0, "eroded radius {r_eroded}");
        assert!((r_dilated - 23.0).abs() < 1.0, "dilated radius {r_dilated}");
    }

    #[test]
    fn erode_then_dilate_restores_area() {
        let record = disc_record(25.0);
        let area = record.area() as f64;
        let restored = dilate(erode(vec![record], 4.0), 4.0);
        assert_eq!(restored.len(), 1);
        let perimeter = 2.0 * std::f64::consts::PI * 25.0;
        let diff = (restored[0].area() as f64 - area).abs();
        assert!(
            diff <= perimeter,
            "area changed by {diff}, more than one pixel ring ({perimeter})"
        );
    }

    #[test]
    fn fully_eroded_mask_is_dropped() {
        let out = erode(vec![disc_record(3.0), disc_record(30.0)], 5.0);
        assert_eq!(out.len(), 1);
        assert!(out[0].area() > 0);
    }

    #[test]
    fn contour_follows_reshaped_boundary() {
        let out = dilate(vec![disc_record(15.0)], 5.0);
        let contour = out[0].contour.as_ref().unwrap();
        let centre = crate::types::Point::new(60.0, 60.0);
        for p in contour.points() {
            assert!((p.distance(centre) - 20.0).abs() <= 1.5, "{p:?}");
        }
    }

    #[test]
    fn signed_offset_dispatch() {
        let scale = PixelScale::new(1.0, 4).unwrap();
        let base = disc_record(20.0);

        let shrunk = offset(vec![base.clone()], -12.0, &scale);
        let grown = offset(vec![base.clone()], 12.0, &scale);
        let same = offset(vec![base.clone()], 0.0, &scale);

        assert!(shrunk[0].area() < base.area());
        assert!(grown[0].area() > base.area());
        assert_eq!(same[0].area(), base.area());
        assert!(same[0].contour.is_some());
    }

    #[test]
    fn erosion_keeps_scores() {
        let out = erode(vec![disc_record(20.0)], 2.0);
        assert!((out[0].stability_score - 0.95).abs() < f64::EPSILON);
        assert!((out[0].predicted_iou - 0.9).abs() < f64::EPSILON);
    }
}
