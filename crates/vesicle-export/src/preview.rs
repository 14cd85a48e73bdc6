//! Three-panel preview raster.
//!
//! Left to right: the preprocessed micrograph, the per-pixel count of
//! all detected masks, the per-pixel count of masks that survived
//! filtering. Counts are colour-mapped against the larger of the two
//! mask panels' maxima so both panels share one scale.

use image::{Rgba, RgbaImage};
use vesicle_pipeline::{GrayImage, MaskRecord};

/// Columns of white between panels.
pub const PANEL_GAP: u32 = 8;

const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Colour stops from zero coverage to maximum overlap.
const RAMP: [[u8; 3]; 5] = [
    [68, 1, 84],
    [59, 82, 139],
    [33, 145, 140],
    [94, 201, 98],
    [253, 231, 37],
];

/// Render the preview for one micrograph.
///
/// `filtered` is `None` when the filter stage has produced nothing for
/// this micrograph; the third panel is then drawn with zero coverage.
#[must_use]
pub fn render_preview(
    micrograph: &GrayImage,
    detected: &[MaskRecord],
    filtered: Option<&[MaskRecord]>,
) -> RgbaImage {
    let (w, h) = micrograph.dimensions();
    let all = coverage(w, h, detected);
    let kept = coverage(w, h, filtered.unwrap_or_default());
    let peak = all.iter().chain(kept.iter()).copied().max().unwrap_or(0);

    let mut out = RgbaImage::from_pixel(3 * w + 2 * PANEL_GAP, h, BACKGROUND);
    for y in 0..h {
        for x in 0..w {
            let v = micrograph.get_pixel(x, y).0[0];
            out.put_pixel(x, y, Rgba([v, v, v, 255]));

            let i = (y * w + x) as usize;
            out.put_pixel(w + PANEL_GAP + x, y, colour(all[i], peak));
            out.put_pixel(2 * (w + PANEL_GAP) + x, y, colour(kept[i], peak));
        }
    }
    out
}

/// Per-pixel count of masks covering each pixel, row-major.
fn coverage(w: u32, h: u32, masks: &[MaskRecord]) -> Vec<u32> {
    let mut counts = vec![0_u32; (w as usize) * (h as usize)];
    for mask in masks {
        let bbox = mask.bounding_box();
        for y in bbox.y..(bbox.y + bbox.height).min(h) {
            for x in bbox.x..(bbox.x + bbox.width).min(w) {
                if mask.contains(x, y) {
                    counts[(y * w + x) as usize] += 1;
                }
            }
        }
    }
    counts
}

#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn colour(count: u32, peak: u32) -> Rgba<u8> {
    let t = if peak == 0 {
        0.0
    } else {
        f64::from(count) / f64::from(peak)
    };
    let pos = t * (RAMP.len() - 1) as f64;
    let lo = (pos.floor() as usize).min(RAMP.len() - 1);
    let hi = (lo + 1).min(RAMP.len() - 1);
    let frac = pos - lo as f64;
    let mix = |a: u8, b: u8| (f64::from(b) - f64::from(a)).mul_add(frac, f64::from(a)).round() as u8;
    Rgba([
        mix(RAMP[lo][0], RAMP[hi][0]),
        mix(RAMP[lo][1], RAMP[hi][1]),
        mix(RAMP[lo][2], RAMP[hi][2]),
        255,
    ])
}
