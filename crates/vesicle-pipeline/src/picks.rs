//! Pick generation: turn masks into spaced particle coordinates.
//!
//! Masks live in downsampled pixel space; picks are emitted in
//! full-resolution pixel space (`× downsample`). `box_size` is a
//! physical length, so the spacing in downsampled pixels is
//! `box_size / (psize × downsample)`.
//!
//! Within one mask no two picks are closer than the spacing. Both modes
//! check every candidate against the picks already accepted for that
//! mask through an R-tree, so the guarantee holds across the
//! wrap-around of a closed contour as well as between lattice rows.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use rstar::RTree;
use serde::{Deserialize, Serialize};

use crate::contour::find_contour;
use crate::mask::MaskRecord;
use crate::types::{PipelineError, PixelScale, Point, Polyline};

/// Coordinate generation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PickMode {
    /// Along the mask boundary.
    #[default]
    Edge,
    /// On a square lattice filling the mask interior.
    Surface,
}

impl PickMode {
    /// Lower-case name, as used on the command line and in directory
    /// names.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Edge => "edge",
            Self::Surface => "surface",
        }
    }
}

impl fmt::Display for PickMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PickMode {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "edge" => Ok(Self::Edge),
            "surface" => Ok(Self::Surface),
            other => Err(PipelineError::InvalidConfig(format!(
                "pick mode must be `edge` or `surface`, got `{other}`"
            ))),
        }
    }
}

/// One particle coordinate in full-resolution pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pick {
    /// Column, full-resolution pixels.
    pub x: f64,
    /// Row, full-resolution pixels.
    pub y: f64,
}

impl From<Point> for Pick {
    fn from(p: Point) -> Self {
        Self { x: p.x, y: p.y }
    }
}

/// All picks for one micrograph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickSet {
    /// Micrograph base name.
    pub micrograph: String,
    /// Picks in emission order.
    pub picks: Vec<Pick>,
}

/// Generate picks for every mask of one micrograph.
///
/// Records without a contour have it derived on the fly for edge mode.
/// A mask too small for even one pick contributes nothing.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] if `box_size` is not a
/// positive finite length.
pub fn generate_picks(
    collection: &[MaskRecord],
    scale: &PixelScale,
    box_size: f64,
    mode: PickMode,
) -> Result<Vec<Pick>, PipelineError> {
    if !box_size.is_finite() || box_size <= 0.0 {
        return Err(PipelineError::InvalidConfig(format!(
            "box_size must be positive, got {box_size}"
        )));
    }
    let spacing = scale.to_pixels(box_size);

    let mut picks = Vec::new();
    for record in collection {
        let points = match mode {
            PickMode::Edge => edge_points(record, spacing),
            PickMode::Surface => surface_points(record, spacing),
        };
        picks.extend(
            points
                .into_iter()
                .map(|p| Pick::from(scale.to_full_resolution(p))),
        );
    }
    log::debug!(
        "{} picks from {} masks ({mode}, spacing {spacing:.2} px)",
        picks.len(),
        collection.len()
    );
    Ok(picks)
}

/// Greedy walk along the contour: a vertex is taken when no previously
/// taken vertex lies within `spacing`.
fn edge_points(record: &MaskRecord, spacing: f64) -> Vec<Point> {
    let contour: Cow<'_, Polyline> = match &record.contour {
        Some(c) => Cow::Borrowed(c),
        None => match find_contour(record.segmentation()) {
            Some(c) => Cow::Owned(c),
            None => return Vec::new(),
        },
    };
    if contour.closed_length() < spacing {
        return Vec::new();
    }
    spaced(contour.points().iter().copied(), spacing)
}

/// Square lattice over the bounding box, offset by half a step, keeping
/// points whose pixel lies inside the mask.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn surface_points(record: &MaskRecord, spacing: f64) -> Vec<Point> {
    let bbox = record.bounding_box();
    let x0 = f64::from(bbox.x);
    let y0 = f64::from(bbox.y);
    let x_end = x0 + f64::from(bbox.width);
    let y_end = y0 + f64::from(bbox.height);

    let mut candidates = Vec::new();
    let mut y = y0 + spacing / 2.0;
    while y < y_end {
        let mut x = x0 + spacing / 2.0;
        while x < x_end {
            let (px, py) = (x.round(), y.round());
            if px >= 0.0 && py >= 0.0 && record.contains(px as u32, py as u32) {
                candidates.push(Point::new(x, y));
            }
            x += spacing;
        }
        y += spacing;
    }
    spaced(candidates, spacing)
}

fn spaced(candidates: impl IntoIterator<Item = Point>, spacing: f64) -> Vec<Point> {
    let min_sq = spacing * spacing;
    let mut tree: RTree<[f64; 2]> = RTree::new();
    let mut out = Vec::new();
    for p in candidates {
        let clear = tree.nearest_neighbor_iter(&[p.x, p.y]).next().is_none_or(|q| {
            let (dx, dy) = (q[0] - p.x, q[1] - p.y);
            dx.mul_add(dx, dy * dy) >= min_sq
        });
        if clear {
            tree.insert([p.x, p.y]);
            out.push(p);
        }
    }
    out
}
