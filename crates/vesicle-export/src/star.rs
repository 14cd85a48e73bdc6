//! STAR coordinate file serializer.
//!
//! The layout is fixed by the downstream importer: a `data_` block with a
//! two-column loop, then one tab-separated `x\ty` line per pick. Every
//! pick line is *preceded* by a newline, so the file never ends with one.

use std::fmt::Write;

use vesicle_pipeline::PickSet;

/// Header block written before the first pick.
pub const STAR_HEADER: &str = "\ndata_\n\nloop_\n_rlnCoordinateX #1\n_rlnCoordinateY #2";

/// Render one micrograph's picks as a STAR coordinate file.
///
/// Coordinates use the shortest representation that round-trips, so
/// integral values have no fractional part. An empty set yields the
/// header alone. The micrograph name is not written; it names the file.
///
/// # Examples
///
/// ```
/// use vesicle_pipeline::{Pick, PickSet};
/// use vesicle_export::to_star;
///
/// let set = PickSet {
///     micrograph: "mic_001".to_string(),
///     picks: vec![Pick { x: 120.0, y: 48.5 }],
/// };
/// assert!(to_star(&set).ends_with("_rlnCoordinateY #2\n120\t48.5"));
/// ```
#[must_use]
pub fn to_star(set: &PickSet) -> String {
    let mut out = String::with_capacity(STAR_HEADER.len() + set.picks.len() * 16);
    out.push_str(STAR_HEADER);
    for pick in &set.picks {
        let _ = write!(out, "\n{}\t{}", pick.x, pick.y);
    }
    out
}
