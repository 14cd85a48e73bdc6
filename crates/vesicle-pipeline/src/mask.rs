//! The mask record: one segmented vesicle candidate plus its derived
//! geometry and statistics.
//!
//! Every stage after segmentation consumes and produces [`MaskRecord`]s.
//! Geometry (`area`, `bounding_box`, `centroid`) is always derived from
//! the segmentation raster through [`MaskRecord::from_segmentation`] or
//! [`MaskRecord::with_segmentation`], so the two can never disagree.
//!
//! The `contour` is a cache: it is dropped by the mask store and must be
//! re-derived with [`MaskRecord::ensure_contour`] after a reload.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::contour::find_contour;
use crate::types::{BoundingBox, Dimensions, GrayImage, Point, Polyline};

/// Pixel value marking a mask pixel. Any non-zero value counts as set
/// when reading; this is the value written.
pub const MASK_ON: u8 = 255;

/// Ellipse-fit statistics in downsampled pixel units and in Angstrom.
///
/// Both unit systems are stored together so the Angstrom values are
/// always `pixels × psize × downsample` of the same fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EllipseStats {
    /// Mean of the two semi-axes, pixels.
    pub average_radius: f64,
    /// Shorter semi-axis, pixels.
    pub semi_minor: f64,
    /// Longer semi-axis, pixels.
    pub semi_major: f64,
    /// `average_radius` in Angstrom.
    #[serde(rename = "average_radius_A")]
    pub average_radius_a: f64,
    /// `semi_minor` in Angstrom.
    #[serde(rename = "semi_minor_A")]
    pub semi_minor_a: f64,
    /// `semi_major` in Angstrom.
    #[serde(rename = "semi_major_A")]
    pub semi_major_a: f64,
}

/// Intensity of the preprocessed micrograph inside a mask.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntensityStats {
    /// Mean pixel value (0-255 scale).
    pub mean_intensity: f64,
    /// Population standard deviation of pixel values.
    pub std_intensity: f64,
}

/// One detected vesicle candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskRecord {
    segmentation: GrayImage,
    bounding_box: BoundingBox,
    area: u64,
    centroid: Point,
    /// Boundary polygon in downsampled pixel space, when derived.
    pub contour: Option<Polyline>,
    /// Model stability score, carried through unchanged.
    pub stability_score: f64,
    /// Model predicted IoU, carried through unchanged.
    pub predicted_iou: f64,
    /// Filled in by the `fit_ellipse` statistic.
    pub ellipse: Option<EllipseStats>,
    /// Filled in by the `find_mask_intensity` statistic.
    pub intensity: Option<IntensityStats>,
    /// Filled in by the `find_circularity` statistic.
    pub circularity: Option<f64>,
}

impl MaskRecord {
    /// Build a record from a binary segmentation raster, deriving
    /// area, bounding box and centroid.
    ///
    /// Returns `None` when the raster has no set pixels.
    #[must_use]
    pub fn from_segmentation(
        segmentation: GrayImage,
        stability_score: f64,
        predicted_iou: f64,
    ) -> Option<Self> {
        let geometry = Geometry::measure(&segmentation)?;
        Some(Self {
            segmentation,
            bounding_box: geometry.bounding_box,
            area: geometry.area,
            centroid: geometry.centroid,
            contour: None,
            stability_score,
            predicted_iou,
            ellipse: None,
            intensity: None,
            circularity: None,
        })
    }

    /// Replace the segmentation, re-deriving geometry and dropping the
    /// now-stale contour. All other fields are kept.
    ///
    /// Returns `None` when the new raster is empty.
    #[must_use]
    pub fn with_segmentation(self, segmentation: GrayImage) -> Option<Self> {
        let geometry = Geometry::measure(&segmentation)?;
        Some(Self {
            segmentation,
            bounding_box: geometry.bounding_box,
            area: geometry.area,
            centroid: geometry.centroid,
            contour: None,
            ..self
        })
    }

    /// The binary segmentation raster in downsampled pixel space.
    #[must_use]
    pub const fn segmentation(&self) -> &GrayImage {
        &self.segmentation
    }

    /// Canvas size of the segmentation raster.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.segmentation.width(),
            height: self.segmentation.height(),
        }
    }

    /// Tight bounding box of the set pixels.
    #[must_use]
    pub const fn bounding_box(&self) -> BoundingBox {
        self.bounding_box
    }

    /// Number of set pixels.
    #[must_use]
    pub const fn area(&self) -> u64 {
        self.area
    }

    /// Mean position of the set pixels.
    #[must_use]
    pub const fn centroid(&self) -> Point {
        self.centroid
    }

    /// Whether the pixel at `(x, y)` belongs to the mask. Out-of-canvas
    /// coordinates are outside.
    #[must_use]
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x < self.segmentation.width()
            && y < self.segmentation.height()
            && self.segmentation.get_pixel(x, y).0[0] != 0
    }

    /// Re-derive the contour from the segmentation if it is missing.
    ///
    /// Contour extraction is deterministic, so calling this on a record
    /// whose contour came from the same segmentation changes nothing.
    pub fn ensure_contour(&mut self) -> Option<&Polyline> {
        if self.contour.is_none() {
            self.contour = find_contour(&self.segmentation);
        }
        self.contour.as_ref()
    }

    /// Read a filterable field, `None` when the statistic that produces
    /// it has not been computed for this record.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn field(&self, field: MaskField) -> Option<f64> {
        match field {
            MaskField::Area => Some(self.area as f64),
            MaskField::StabilityScore => Some(self.stability_score),
            MaskField::PredictedIou => Some(self.predicted_iou),
            MaskField::AverageRadius => self.ellipse.map(|e| e.average_radius),
            MaskField::SemiMinor => self.ellipse.map(|e| e.semi_minor),
            MaskField::SemiMajor => self.ellipse.map(|e| e.semi_major),
            MaskField::AverageRadiusA => self.ellipse.map(|e| e.average_radius_a),
            MaskField::SemiMinorA => self.ellipse.map(|e| e.semi_minor_a),
            MaskField::SemiMajorA => self.ellipse.map(|e| e.semi_major_a),
            MaskField::MeanIntensity => self.intensity.map(|i| i.mean_intensity),
            MaskField::StdIntensity => self.intensity.map(|i| i.std_intensity),
            MaskField::Circularity => self.circularity,
        }
    }
}

/// Geometry measured from a segmentation raster.
struct Geometry {
    bounding_box: BoundingBox,
    area: u64,
    centroid: Point,
}

impl Geometry {
    #[allow(clippy::cast_precision_loss)]
    fn measure(segmentation: &GrayImage) -> Option<Self> {
        let mut area = 0_u64;
        let (mut sum_x, mut sum_y) = (0.0_f64, 0.0_f64);
        let (mut min_x, mut min_y) = (u32::MAX, u32::MAX);
        let (mut max_x, mut max_y) = (0_u32, 0_u32);

        for (x, y, pixel) in segmentation.enumerate_pixels() {
            if pixel.0[0] == 0 {
                continue;
            }
            area += 1;
            sum_x += f64::from(x);
            sum_y += f64::from(y);
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }

        if area == 0 {
            return None;
        }

        let n = area as f64;
        Some(Self {
            bounding_box: BoundingBox {
                x: min_x,
                y: min_y,
                width: max_x - min_x + 1,
                height: max_y - min_y + 1,
            },
            area,
            centroid: Point::new(sum_x / n, sum_y / n),
        })
    }
}

/// Record fields that can be thresholded by the filter stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MaskField {
    /// Pixel count.
    Area,
    /// Model stability score.
    StabilityScore,
    /// Model predicted IoU.
    PredictedIou,
    /// Ellipse mean radius, pixels.
    AverageRadius,
    /// Ellipse semi-minor axis, pixels.
    SemiMinor,
    /// Ellipse semi-major axis, pixels.
    SemiMajor,
    /// Ellipse mean radius, Angstrom.
    AverageRadiusA,
    /// Ellipse semi-minor axis, Angstrom.
    SemiMinorA,
    /// Ellipse semi-major axis, Angstrom.
    SemiMajorA,
    /// Mean intensity inside the mask.
    MeanIntensity,
    /// Intensity standard deviation inside the mask.
    StdIntensity,
    /// `4π·area / perimeter²`.
    Circularity,
}

impl MaskField {
    /// Every filterable field, in declaration order.
    pub const ALL: [Self; 12] = [
        Self::Area,
        Self::StabilityScore,
        Self::PredictedIou,
        Self::AverageRadius,
        Self::SemiMinor,
        Self::SemiMajor,
        Self::AverageRadiusA,
        Self::SemiMinorA,
        Self::SemiMajorA,
        Self::MeanIntensity,
        Self::StdIntensity,
        Self::Circularity,
    ];

    /// Canonical name as used in configuration keys.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Area => "area",
            Self::StabilityScore => "stability_score",
            Self::PredictedIou => "predicted_iou",
            Self::AverageRadius => "average_radius",
            Self::SemiMinor => "semi_minor",
            Self::SemiMajor => "semi_major",
            Self::AverageRadiusA => "average_radius_A",
            Self::SemiMinorA => "semi_minor_A",
            Self::SemiMajorA => "semi_major_A",
            Self::MeanIntensity => "mean_intensity",
            Self::StdIntensity => "std_intensity",
            Self::Circularity => "circularity",
        }
    }
}

impl fmt::Display for MaskField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a field name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown mask field `{0}`")]
pub struct UnknownField(pub String);

impl FromStr for MaskField {
    type Err = UnknownField;

    /// Case-insensitive; `radius` and `radius_A` are accepted as
    /// shorthands for the average radius.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.as_str() {
            "radius" => return Ok(Self::AverageRadius),
            "radius_a" => return Ok(Self::AverageRadiusA),
            _ => {}
        }
        Self::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(&lower))
            .ok_or_else(|| UnknownField(s.to_string()))
    }
}

/// Render a disc of `radius` pixels centred on `(cx, cy)` into a
/// `width`×`height` mask raster. Used to build synthetic masks.
#[must_use]
pub fn disc_mask(width: u32, height: u32, cx: f64, cy: f64, radius: f64) -> GrayImage {
    let r2 = radius * radius;
    GrayImage::from_fn(width, height, |x, y| {
        let dx = f64::from(x) - cx;
        let dy = f64::from(y) - cy;
        if dx.mul_add(dx, dy * dy) <= r2 {
            image::Luma([MASK_ON])
        } else {
            image::Luma([0])
        }
    })
}
