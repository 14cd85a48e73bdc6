//! vesicle-pipeline: pure mask-to-pick processing core (sans-IO).
//!
//! Takes a micrograph from raw intensities to particle coordinates:
//! preprocess -> segment -> statistics -> filter -> morphology ->
//! pick generation.
//!
//! Every step operates on in-memory data. Reading micrographs, persisting
//! mask collections and scheduling a batch live in `vesicle-io`; output
//! formats live in `vesicle-export`.
//!
//! Two coordinate spaces are in play. Masks, contours and pixel-unit
//! statistics are in the *downsampled* space the segmenter sees. Picks
//! are in *full-resolution* pixel space. [`PixelScale`] converts between
//! them and to Angstrom.

pub mod blur;
pub mod contour;
pub mod downsample;
pub mod filter;
pub mod mask;
pub mod morphology;
pub mod normalize;
pub mod picks;
pub mod preprocess;
pub mod segment;
pub mod stats;
pub mod types;

pub use filter::{Bound, FilterThresholds, filter_masks};
pub use mask::{EllipseStats, IntensityStats, MaskField, MaskRecord};
pub use picks::{Pick, PickMode, PickSet, generate_picks};
pub use preprocess::{LowpassMode, Micrograph, MicrographHeader, PreprocessConfig, preprocess};
pub use segment::{MaskGenerator, ThresholdSegmenter};
pub use stats::{MaskStatistic, StatisticContext, StatisticKind, postprocess};
pub use types::{
    BoundingBox, Dimensions, GrayImage, IntensityImage, PipelineError, PixelScale, Point, Polyline,
};

/// Run segmentation and the configured statistics on one preprocessed
/// micrograph.
///
/// # Errors
///
/// Propagates [`PipelineError::Segmentation`] from the backend.
pub fn find_masks<G: MaskGenerator + ?Sized>(
    image: &GrayImage,
    generator: &G,
    statistics: &[StatisticKind],
    scale: PixelScale,
) -> Result<Vec<MaskRecord>, PipelineError> {
    let raw = generator.generate(image)?;
    Ok(postprocess(
        raw,
        statistics,
        &StatisticContext { image, scale },
    ))
}
