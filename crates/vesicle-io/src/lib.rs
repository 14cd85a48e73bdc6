//! vesicle-io: the filesystem side of vesicle picking.
//!
//! Reads job parameters and MRC micrographs, persists mask collections,
//! and runs the four batch stages over a project directory:
//!
//! ```text
//! <motioncorr>/*.mrc
//!   -> find    -> <output>/masks/<mic>_mask.json
//!   -> filter  -> <output>/filter/<mic>_filter.json
//!   -> display -> <output>/display/<mic>_display.png
//!   -> picks   -> <output>/picks_<mode>/<mic>_manualpick.star
//! ```
//!
//! All image processing is delegated to `vesicle-pipeline` and all
//! output formatting to `vesicle-export`.

pub mod config;
pub mod gate;
pub mod layout;
pub mod mrc;
pub mod run;
pub mod stages;
pub mod store;

pub use config::{Config, ConfigError};
pub use layout::{Layout, Stage};
pub use mrc::{MrcError, read_mrc, read_mrc_file};
pub use run::{CancelToken, Outcome, RunError, RunOptions, StageError, StageReport};
pub use stages::{run_display, run_filter, run_find, run_picks};
pub use store::{Compression, StoreError};
