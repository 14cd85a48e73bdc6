//! vesicle-export: pure output serializers (sans-IO).
//!
//! Converts pipeline results into output formats: the STAR coordinate
//! file consumed by particle-picking tools, and the three-panel preview
//! raster. Nothing here touches the filesystem.

pub mod preview;
pub mod star;

pub use preview::{PANEL_GAP, render_preview};
pub use star::{STAR_HEADER, to_star};
