//! Shared types for the vesicle mask-to-pick pipeline.

use serde::{Deserialize, Serialize};

/// Re-export `GrayImage` so downstream crates can reference mask and
/// preprocessed rasters without depending on `image` directly.
pub use image::GrayImage;

/// Single-channel `f32` raster holding raw micrograph intensities.
pub type IntensityImage = image::ImageBuffer<image::Luma<f32>, Vec<f32>>;

/// A 2D point in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (pixels from left edge).
    pub x: f64,
    /// Vertical position (pixels from top edge).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    ///
    /// Avoids the square root for comparison purposes.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }

    /// Multiply both coordinates by `factor`.
    #[must_use]
    pub fn scaled(self, factor: f64) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }
}

/// A sequence of connected points, used for mask boundaries.
///
/// Boundary polylines are closed implicitly: the last point is adjacent
/// to the first, and the first point is not repeated at the end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline(Vec<Point>);

impl Polyline {
    /// Create a new polyline from a vector of points.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Returns `true` if the polyline has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of points in the polyline.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns the first point, if any.
    #[must_use]
    pub fn first(&self) -> Option<&Point> {
        self.0.first()
    }

    /// Returns the last point, if any.
    #[must_use]
    pub fn last(&self) -> Option<&Point> {
        self.0.last()
    }

    /// Returns a slice of all points.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// Length of the closed ring, including the closing segment from the
    /// last point back to the first.
    #[must_use]
    pub fn closed_length(&self) -> f64 {
        use geo::Euclidean;
        use geo::line_measures::Distance;

        let n = self.0.len();
        if n < 2 {
            return 0.0;
        }
        (0..n)
            .map(|i| {
                let a = self.0[i];
                let b = self.0[(i + 1) % n];
                Euclidean.distance(geo::Point::new(a.x, a.y), geo::Point::new(b.x, b.y))
            })
            .sum()
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Axis-aligned pixel bounding box in `XYWH` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left column.
    pub x: u32,
    /// Top row.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl BoundingBox {
    /// Whether the box covers no pixels.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Conversion between downsampled pixel space, full-resolution pixel
/// space, and physical units (Angstrom).
///
/// `psize` is the full-resolution pixel size in Angstrom per pixel and
/// `downsample` the integer factor applied during preprocessing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelScale {
    psize: f64,
    downsample: u32,
}

impl PixelScale {
    /// Create a scale, validating both factors.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if `psize` is not a
    /// positive finite number or `downsample` is zero.
    pub fn new(psize: f64, downsample: u32) -> Result<Self, PipelineError> {
        if !psize.is_finite() || psize <= 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "psize must be positive, got {psize}"
            )));
        }
        if downsample == 0 {
            return Err(PipelineError::InvalidConfig(
                "downsample must be at least 1".to_string(),
            ));
        }
        Ok(Self { psize, downsample })
    }

    /// Full-resolution pixel size in Angstrom.
    #[must_use]
    pub const fn psize(&self) -> f64 {
        self.psize
    }

    /// Downsample factor.
    #[must_use]
    pub const fn downsample(&self) -> u32 {
        self.downsample
    }

    /// Angstrom covered by one downsampled pixel.
    #[must_use]
    pub fn angstrom_per_pixel(&self) -> f64 {
        self.psize * f64::from(self.downsample)
    }

    /// Convert a downsampled-pixel length to Angstrom.
    #[must_use]
    pub fn to_angstrom(&self, pixels: f64) -> f64 {
        pixels * self.angstrom_per_pixel()
    }

    /// Convert an Angstrom length to downsampled pixels.
    #[must_use]
    pub fn to_pixels(&self, angstrom: f64) -> f64 {
        angstrom / self.angstrom_per_pixel()
    }

    /// Map a downsampled-space point to full-resolution pixel space.
    #[must_use]
    pub fn to_full_resolution(&self, point: Point) -> Point {
        point.scaled(f64::from(self.downsample))
    }
}

/// Errors that can occur inside the processing core.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A parameter is outside its valid range.
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),

    /// The input raster has no pixels, or is smaller than one
    /// downsampled pixel.
    #[error("image of {width}x{height} is too small for downsample factor {downsample}")]
    ImageTooSmall {
        /// Input width.
        width: u32,
        /// Input height.
        height: u32,
        /// Requested factor.
        downsample: u32,
    },

    /// The segmentation backend failed on this micrograph.
    #[error("segmentation failed: {0}")]
    Segmentation(String),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn point_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert!((a.distance(b) - 5.0).abs() < f64::EPSILON);
        assert!((a.distance_squared(b) - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn point_scaled() {
        assert_eq!(Point::new(1.5, 2.0).scaled(4.0), Point::new(6.0, 8.0));
    }

    #[test]
    fn polyline_closed_length_of_unit_square() {
        let square = Polyline::new(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 1.0),
        ]);
        assert!((square.closed_length() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn polyline_closed_length_degenerate() {
        assert!(Polyline::new(vec![]).closed_length().abs() < f64::EPSILON);
        let single = Polyline::new(vec![Point::new(2.0, 2.0)]);
        assert!(single.closed_length().abs() < f64::EPSILON);
    }

    #[test]
    fn pixel_scale_conversions() {
        let scale = PixelScale::new(1.5, 4).unwrap();
        assert!((scale.angstrom_per_pixel() - 6.0).abs() < 1e-12);
        assert!((scale.to_angstrom(50.0) - 300.0).abs() < 1e-12);
        assert!((scale.to_pixels(300.0) - 50.0).abs() < 1e-12);
        assert_eq!(
            scale.to_full_resolution(Point::new(10.0, 2.5)),
            Point::new(40.0, 10.0)
        );
    }

    #[test]
    fn pixel_scale_rejects_bad_factors() {
        assert!(matches!(
            PixelScale::new(0.0, 4),
            Err(PipelineError::InvalidConfig(_))
        ));
        assert!(matches!(
            PixelScale::new(f64::NAN, 4),
            Err(PipelineError::InvalidConfig(_))
        ));
        assert!(matches!(
            PixelScale::new(1.0, 0),
            Err(PipelineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn bounding_box_empty() {
        assert!(BoundingBox::default().is_empty());
        let bbox = BoundingBox {
            x: 1,
            y: 1,
            width: 2,
            height: 3,
        };
        assert!(!bbox.is_empty());
    }

    #[test]
    fn error_display() {
        let err = PipelineError::ImageTooSmall {
            width: 3,
            height: 3,
            downsample: 4,
        };
        assert_eq!(
            err.to_string(),
            "image of 3x3 is too small for downsample factor 4"
        );
    }
}
