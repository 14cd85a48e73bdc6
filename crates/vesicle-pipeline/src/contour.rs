//! Contour extraction: recover a mask's boundary polygon from its
//! binary segmentation.
//!
//! Uses Suzuki-Abe border following via
//! `imageproc::contours::find_contours`. When a mask has several
//! components (or holes), the longest outer border wins, so a vesicle is
//! always described by a single closed ring.

use imageproc::contours::{BorderType, Contour};

use crate::types::{GrayImage, Point, Polyline};

/// Extract the ordered outer boundary of a binary mask.
///
/// The returned ring is closed implicitly: its last point is
/// 8-adjacent to its first, and the first point is not repeated.
/// Extraction is deterministic, so re-deriving from an unchanged mask
/// yields the identical polygon.
///
/// Returns `None` for a mask with no set pixels.
#[must_use]
pub fn find_contour(mask: &GrayImage) -> Option<Polyline> {
    let contours: Vec<Contour<u32>> = imageproc::contours::find_contours(mask);

    let outer = contours
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && !c.points.is_empty())
        .fold(None::<Contour<u32>>, |best, c| match best {
            Some(b) if b.points.len() >= c.points.len() => Some(b),
            _ => Some(c),
        })?;

    let mut points: Vec<Point> = outer
        .points
        .into_iter()
        .map(|p| Point::new(f64::from(p.x), f64::from(p.y)))
        .collect();

    // Border following may revisit the start pixel as its final step.
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }

    Some(Polyline::new(points))
}
