//! Segmentation backends: turn a preprocessed micrograph into raw
//! mask records.
//!
//! The [`MaskGenerator`] trait is the seam to the segmentation model.
//! Model inference is expensive and typically bound to an accelerator,
//! so callers serialize access to a generator (see the admission gate in
//! the I/O layer) while everything downstream runs freely in parallel.
//!
//! [`ThresholdSegmenter`] is a classical backend that needs no model
//! weights. Membranes are darker than the surrounding ice, so an Otsu
//! threshold separates a dark wall class from a bright class. Bright
//! regions fully enclosed by walls (not touching the image border) are
//! vesicle interiors; each interior grown by one pixel so it covers the
//! inner leaflet becomes a mask.

use imageproc::region_labelling::{Connectivity, connected_components};

use crate::mask::{MASK_ON, MaskRecord};
use crate::types::{GrayImage, PipelineError};

/// A segmentation backend.
pub trait MaskGenerator {
    /// Produce mask records for a preprocessed micrograph. Records are
    /// in the image's (downsampled) pixel space.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Segmentation`] when inference fails.
    fn generate(&self, image: &GrayImage) -> Result<Vec<MaskRecord>, PipelineError>;
}

/// Otsu-threshold enclosed-region segmenter.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdSegmenter {
    /// Interiors with fewer pixels are discarded.
    pub min_mask_region_area: u64,
    /// Records whose predicted IoU falls below this are discarded.
    pub pred_iou_thresh: f64,
    /// Records whose stability score falls below this are discarded.
    pub stability_score_thresh: f64,
}

impl Default for ThresholdSegmenter {
    fn default() -> Self {
        Self {
            min_mask_region_area: 100,
            pred_iou_thresh: 0.0,
            stability_score_thresh: 0.0,
        }
    }
}

impl MaskGenerator for ThresholdSegmenter {
    fn generate(&self, image: &GrayImage) -> Result<Vec<MaskRecord>, PipelineError> {
        let (w, h) = image.dimensions();
        if w == 0 || h == 0 {
            return Err(PipelineError::Segmentation("empty image".to_string()));
        }

        let level = imageproc::contrast::otsu_level(image);
        let bright = GrayImage::from_fn(w, h, |x, y| {
            if image.get_pixel(x, y).0[0] > level {
                image::Luma([MASK_ON])
            } else {
                image::Luma([0])
            }
        });
        let labels = connected_components(&bright, Connectivity::Four, image::Luma([0]));

        let mut regions: Vec<Region> = Vec::new();
        for (x, y, label) in labels.enumerate_pixels() {
            let label = label.0[0] as usize;
            if label == 0 {
                continue;
            }
            if regions.len() < label {
                regions.resize(label, Region::default());
            }
            let region = &mut regions[label - 1];
            region.area += 1;
            region.touches_border |= x == 0 || y == 0 || x == w - 1 || y == h - 1;
        }

        let mut records = Vec::new();
        for (idx, region) in regions.iter().enumerate() {
            if region.touches_border || region.area < self.min_mask_region_area {
                continue;
            }
            let target = u32::try_from(idx + 1)
                .map_err(|_| PipelineError::Segmentation("too many regions".to_string()))?;
            let interior = GrayImage::from_fn(w, h, |x, y| {
                if labels.get_pixel(x, y).0[0] == target {
                    image::Luma([MASK_ON])
                } else {
                    image::Luma([0])
                }
            });
            let grown = crate::morphology::dilate_mask(&interior, 1.0);
            // No model confidence is available for a classical threshold.
            let Some(record) = MaskRecord::from_segmentation(grown, 1.0, 1.0) else {
                continue;
            };
            if record.predicted_iou >= self.pred_iou_thresh
                && record.stability_score >= self.stability_score_thresh
            {
                records.push(record);
            }
        }

        log::debug!(
            "threshold segmenter: level {level}, {} regions, {} masks",
            regions.len(),
            records.len()
        );
        Ok(records)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Region {
    area: u64,
    touches_border: bool,
}
