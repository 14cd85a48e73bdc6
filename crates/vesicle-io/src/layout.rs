//! On-disk naming scheme shared by every stage.
//!
//! A micrograph is identified by its *base name*: the file stem of its
//! `.mrc` file. Each stage writes one file per micrograph into its own
//! directory under the output root, named `<base><suffix>`. Mapping in
//! both directions goes through [`Stage`], so no caller slices file
//! names by length.

use std::io;
use std::path::{Path, PathBuf};

use vesicle_pipeline::PickMode;

use crate::config::IoConfig;

/// A stage output kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Segmented masks.
    Masks,
    /// Masks that passed filtering.
    Filter,
    /// Preview panels.
    Display,
    /// Pick coordinates for one mode.
    Picks(PickMode),
}

impl Stage {
    /// Directory name under the output root.
    #[must_use]
    pub fn dir_name(self) -> String {
        match self {
            Self::Masks => "masks".to_string(),
            Self::Filter => "filter".to_string(),
            Self::Display => "display".to_string(),
            Self::Picks(mode) => format!("picks_{mode}"),
        }
    }

    /// File name suffix appended to the base name.
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Masks => "_mask.json",
            Self::Filter => "_filter.json",
            Self::Display => "_display.png",
            Self::Picks(_) => "_manualpick.star",
        }
    }

    /// `<base><suffix>`.
    #[must_use]
    pub fn file_name(self, base: &str) -> String {
        format!("{base}{}", self.suffix())
    }

    /// Recover the base name from a staged file name, `None` if the name
    /// does not belong to this stage.
    #[must_use]
    pub fn base_name(self, file_name: &str) -> Option<&str> {
        file_name
            .strip_suffix(self.suffix())
            .filter(|base| !base.is_empty())
    }
}

/// Whether a file name is a micrograph: `.mrc` extension, and not a
/// power spectrum (`PS` in the name).
#[must_use]
pub fn is_micrograph(file_name: &str) -> bool {
    let path = Path::new(file_name);
    path.extension().is_some_and(|e| e.eq_ignore_ascii_case("mrc")) && !file_name.contains("PS")
}

/// Resolved directories for one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    micrographs: PathBuf,
    output: PathBuf,
}

impl Layout {
    /// Layout rooted at the given directories.
    #[must_use]
    pub const fn new(micrographs: PathBuf, output: PathBuf) -> Self {
        Self {
            micrographs,
            output,
        }
    }

    /// Layout from the `[io]` section.
    #[must_use]
    pub fn from_config(io: &IoConfig) -> Self {
        Self::new(io.micrographs.clone(), io.output.clone())
    }

    /// Directory holding the input micrographs.
    #[must_use]
    pub fn micrograph_dir(&self) -> &Path {
        &self.micrographs
    }

    /// Path of the micrograph with `base` name.
    #[must_use]
    pub fn micrograph_path(&self, base: &str) -> PathBuf {
        self.micrographs.join(format!("{base}.mrc"))
    }

    /// Output directory of `stage`.
    #[must_use]
    pub fn stage_dir(&self, stage: Stage) -> PathBuf {
        self.output.join(stage.dir_name())
    }

    /// Output file of `stage` for `base`.
    #[must_use]
    pub fn staged_path(&self, stage: Stage, base: &str) -> PathBuf {
        self.stage_dir(stage).join(stage.file_name(base))
    }

    /// Whether `stage` has already produced output for `base`.
    #[must_use]
    pub fn is_done(&self, stage: Stage, base: &str) -> bool {
        self.staged_path(stage, base).is_file()
    }

    /// Base names of all micrographs, sorted.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the micrograph directory cannot be read.
    pub fn list_micrographs(&self) -> io::Result<Vec<String>> {
        let mut bases: Vec<String> = list_file_names(&self.micrographs)?
            .into_iter()
            .filter(|name| is_micrograph(name))
            .filter_map(|name| {
                Path::new(&name)
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .map(str::to_string)
            })
            .collect();
        bases.sort();
        Ok(bases)
    }

    /// Base names with output from `stage`, sorted. A stage directory
    /// that does not exist yet lists as empty.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the directory exists but cannot be read.
    pub fn list_stage(&self, stage: Stage) -> io::Result<Vec<String>> {
        let dir = self.stage_dir(stage);
        let names = match list_file_names(&dir) {
            Ok(names) => names,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let mut bases: Vec<String> = names
            .iter()
            .filter_map(|name| stage.base_name(name).map(str::to_string))
            .collect();
        bases.sort();
        Ok(bases)
    }
}

fn list_file_names(dir: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    Ok(names)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_for_every_stage() {
        let stages = [
            Stage::Masks,
            Stage::Filter,
            Stage::Display,
            Stage::Picks(PickMode::Edge),
            Stage::Picks(PickMode::Surface),
        ];
        for stage in stages {
            let name = stage.file_name("FoilHole_123_Data_456");
            assert_eq!(stage.base_name(&name), Some("FoilHole_123_Data_456"));
        }
        assert_eq!(Stage::Masks.base_name("x_filter.json"), None);
        assert_eq!(Stage::Masks.base_name("_mask.json"), None);
        assert_eq!(Stage::Masks.base_name("x_mask.json.tmp"), None);
    }

    #[test]
    fn pick_dirs_are_per_mode() {
        assert_eq!(Stage::Picks(PickMode::Edge).dir_name(), "picks_edge");
        assert_eq!(Stage::Picks(PickMode::Surface).dir_name(), "picks_surface");
    }

    #[test]
    fn micrograph_detection() {
        assert!(is_micrograph("mic_001.mrc"));
        assert!(is_micrograph("mic_001.MRC"));
        assert!(!is_micrograph("mic_001_PS.mrc"));
        assert!(!is_micrograph("mic_001.mrcs.txt"));
        assert!(!is_micrograph("mic_001.tif"));
    }

    #[test]
    fn listing() {
        let dir = tempfile::tempdir().unwrap();
        let mics = dir.path().join("mics");
        std::fs::create_dir_all(&mics).unwrap();
        for name in ["b.mrc", "a.mrc", "a_PS.mrc", "notes.txt"] {
            std::fs::write(mics.join(name), b"").unwrap();
        }
        let layout = Layout::new(mics, dir.path().join("out"));
        assert_eq!(layout.list_micrographs().unwrap(), vec!["a", "b"]);
        assert!(layout.list_stage(Stage::Masks).unwrap().is_empty());

        let masks = layout.stage_dir(Stage::Masks);
        std::fs::create_dir_all(&masks).unwrap();
        std::fs::write(layout.staged_path(Stage::Masks, "b"), b"{}").unwrap();
        std::fs::write(masks.join("a_mask.json.tmp"), b"").unwrap();
        assert_eq!(layout.list_stage(Stage::Masks).unwrap(), vec!["b"]);
        assert!(layout.is_done(Stage::Masks, "b"));
        assert!(!layout.is_done(Stage::Masks, "a"));
    }

    #[test]
    fn missing_micrograph_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path().join("absent"), dir.path().join("out"));
        assert!(layout.list_micrographs().is_err());
    }
}
