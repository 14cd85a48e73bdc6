//! Per-mask statistics computed after segmentation.
//!
//! Which statistics run is configuration (`postprocessing.functions`),
//! so the set is a registry of named [`StatisticKind`] variants rather
//! than hard-coded calls. Names are resolved with [`FromStr`] when the
//! configuration is loaded; an unknown name is rejected there, before
//! any micrograph is touched.
//!
//! Each statistic reads a [`MaskRecord`] plus the preprocessed
//! micrograph and writes its result back onto the record.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::mask::{EllipseStats, IntensityStats, MaskField, MaskRecord};
use crate::types::{GrayImage, PixelScale};

/// Everything a statistic may read besides the record itself.
#[derive(Debug, Clone, Copy)]
pub struct StatisticContext<'a> {
    /// The preprocessed (downsampled) micrograph.
    pub image: &'a GrayImage,
    /// Unit conversion for physical-unit fields.
    pub scale: PixelScale,
}

/// Trait for statistic strategies.
pub trait MaskStatistic {
    /// Compute the statistic and store it on `record`.
    fn compute(&self, record: &mut MaskRecord, ctx: &StatisticContext<'_>);
}

/// The known statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatisticKind {
    /// Derive the boundary contour.
    FindContour,
    /// Second-moment ellipse fit, in pixels and Angstrom.
    FitEllipse,
    /// Mean and standard deviation of intensity inside the mask.
    FindMaskIntensity,
    /// `4π·area / perimeter²`, 1.0 for a perfect disc.
    FindCircularity,
}

impl StatisticKind {
    /// Every registered statistic.
    pub const ALL: [Self; 4] = [
        Self::FindContour,
        Self::FitEllipse,
        Self::FindMaskIntensity,
        Self::FindCircularity,
    ];

    /// Registry name as used in configuration.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::FindContour => "find_contour",
            Self::FitEllipse => "fit_ellipse",
            Self::FindMaskIntensity => "find_mask_intensity",
            Self::FindCircularity => "find_circularity",
        }
    }

    /// The statistic that fills `field`, or `None` for fields the
    /// segmenter sets itself.
    #[must_use]
    pub const fn source_of(field: MaskField) -> Option<Self> {
        match field {
            MaskField::Area | MaskField::StabilityScore | MaskField::PredictedIou => None,
            MaskField::AverageRadius
            | MaskField::SemiMinor
            | MaskField::SemiMajor
            | MaskField::AverageRadiusA
            | MaskField::SemiMinorA
            | MaskField::SemiMajorA => Some(Self::FitEllipse),
            MaskField::MeanIntensity | MaskField::StdIntensity => Some(Self::FindMaskIntensity),
            MaskField::Circularity => Some(Self::FindCircularity),
        }
    }
}

impl fmt::Display for StatisticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned for an unregistered statistic name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown statistic function `{0}` (known: find_contour, fit_ellipse, find_mask_intensity, find_circularity)")]
pub struct UnknownStatistic(pub String);

impl FromStr for StatisticKind {
    type Err = UnknownStatistic;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Self::ALL
            .into_iter()
            .find(|k| k.name() == name)
            .ok_or_else(|| UnknownStatistic(name.to_string()))
    }
}

impl MaskStatistic for StatisticKind {
    fn compute(&self, record: &mut MaskRecord, ctx: &StatisticContext<'_>) {
        match *self {
            Self::FindContour => {
                record.ensure_contour();
            }
            Self::FitEllipse => record.ellipse = fit_ellipse(record, &ctx.scale),
            Self::FindMaskIntensity => record.intensity = mask_intensity(record, ctx.image),
            Self::FindCircularity => record.circularity = circularity(record),
        }
    }
}

/// Run `statistics` in order over every record, returning the updated
/// collection.
#[must_use]
pub fn postprocess(
    collection: Vec<MaskRecord>,
    statistics: &[StatisticKind],
    ctx: &StatisticContext<'_>,
) -> Vec<MaskRecord> {
    collection
        .into_iter()
        .map(|mut record| {
            for statistic in statistics {
                statistic.compute(&mut record, ctx);
            }
            record
        })
        .collect()
}

/// Fit an ellipse to the mask pixels from their second moments.
///
/// For a uniformly filled ellipse with semi-axes `a ≥ b`, the pixel
/// coordinate covariance has eigenvalues `a²/4` and `b²/4`, so the
/// semi-axes are twice the square roots of the eigenvalues.
#[allow(clippy::cast_precision_loss)]
fn fit_ellipse(record: &MaskRecord, scale: &PixelScale) -> Option<EllipseStats> {
    let centre = record.centroid();
    let bbox = record.bounding_box();
    let (mut sxx, mut syy, mut sxy) = (0.0_f64, 0.0_f64, 0.0_f64);
    for y in bbox.y..bbox.y + bbox.height {
        for x in bbox.x..bbox.x + bbox.width {
            if !record.contains(x, y) {
                continue;
            }
            let dx = f64::from(x) - centre.x;
            let dy = f64::from(y) - centre.y;
            sxx += dx * dx;
            syy += dy * dy;
            sxy += dx * dy;
        }
    }
    let n = record.area() as f64;
    if n == 0.0 {
        return None;
    }
    let (sxx, syy, sxy) = (sxx / n, syy / n, sxy / n);

    let mean = (sxx + syy) / 2.0;
    let spread = ((sxx - syy) / 2.0).hypot(sxy);
    let major_var = mean + spread;
    let minor_var = (mean - spread).max(0.0);

    let semi_major = 2.0 * major_var.sqrt();
    let semi_minor = 2.0 * minor_var.sqrt();
    let average_radius = (semi_major + semi_minor) / 2.0;

    Some(EllipseStats {
        average_radius,
        semi_minor,
        semi_major,
        average_radius_a: scale.to_angstrom(average_radius),
        semi_minor_a: scale.to_angstrom(semi_minor),
        semi_major_a: scale.to_angstrom(semi_major),
    })
}

#[allow(clippy::cast_precision_loss)]
fn mask_intensity(record: &MaskRecord, image: &GrayImage) -> Option<IntensityStats> {
    let bbox = record.bounding_box();
    let (mut sum, mut sum_sq, mut n) = (0.0_f64, 0.0_f64, 0_u64);
    for y in bbox.y..bbox.y + bbox.height {
        for x in bbox.x..bbox.x + bbox.width {
            if !record.contains(x, y) || x >= image.width() || y >= image.height() {
                continue;
            }
            let v = f64::from(image.get_pixel(x, y).0[0]);
            sum += v;
            sum_sq += v * v;
            n += 1;
        }
    }
    if n == 0 {
        return None;
    }
    let n = n as f64;
    let mean = sum / n;
    let variance = (sum_sq / n - mean * mean).max(0.0);
    Some(IntensityStats {
        mean_intensity: mean,
        std_intensity: variance.sqrt(),
    })
}

#[allow(clippy::cast_precision_loss)]
fn circularity(record: &mut MaskRecord) -> Option<f64> {
    let area = record.area() as f64;
    let perimeter = record.ensure_contour()?.closed_length();
    if perimeter <= 0.0 {
        return None;
    }
    Some(4.0 * PI * area / (perimeter * perimeter))
}
