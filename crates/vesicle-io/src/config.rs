//! Job parameters: INI parsing and the typed [`Config`].
//!
//! The text is read with `rust-ini`; section and key names are then
//! folded to lower case so lookups are case-insensitive. Lines starting
//! with `#` or `;` are comments; `key = value` and `key: value` are both
//! accepted. Every value is validated when the
//! file is loaded, so a bad parameter stops the run before any
//! micrograph is touched.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use ini::ParseOption;
use vesicle_pipeline::{
    FilterThresholds, LowpassMode, MaskField, PipelineError, PixelScale, PreprocessConfig,
    StatisticKind, ThresholdSegmenter,
};

/// Errors raised while loading or validating parameters.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The parameters file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The text is not well-formed INI.
    #[error("malformed parameters file: {message}")]
    Syntax {
        /// Parser message, with position when known.
        message: String,
    },

    /// A required key is absent.
    #[error("missing required parameter [{section}] {key}")]
    Missing {
        /// Section name.
        section: String,
        /// Key name.
        key: String,
    },

    /// A value could not be parsed or is out of range.
    #[error("invalid value for [{section}] {key}: {message}")]
    Invalid {
        /// Section name.
        section: String,
        /// Key name.
        key: String,
        /// What was wrong.
        message: String,
    },

    /// The segmentation backend named in `model_type` is not available.
    #[error("unsupported segmentation model_type `{0}` (available: threshold)")]
    UnsupportedModel(String),
}

// ── Raw INI ───────────────────────────────────────────────────────

/// Sections of key/value strings, names lower-cased.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ini {
    sections: BTreeMap<String, BTreeMap<String, String>>,
}

impl Ini {
    /// Parse INI text.
    ///
    /// Values are taken verbatim: quotes and backslashes are not
    /// interpreted, so Windows paths and quoted function lists survive.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Syntax`] for malformed text or a key
    /// outside any section.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let options = ParseOption {
            enabled_quote: false,
            enabled_escape: false,
            ..ParseOption::default()
        };
        let file = ini::Ini::load_from_str_opt(text, options).map_err(|e| ConfigError::Syntax {
            message: e.to_string(),
        })?;

        let mut sections: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
        for (name, properties) in file.iter() {
            let Some(name) = name else {
                if let Some((key, _)) = properties.iter().next() {
                    return Err(ConfigError::Syntax {
                        message: format!("`{key}` is outside of any section"),
                    });
                }
                continue;
            };
            let entries = sections.entry(name.trim().to_ascii_lowercase()).or_default();
            for (key, value) in properties.iter() {
                entries.insert(key.to_ascii_lowercase(), value.to_string());
            }
        }
        Ok(Self { sections })
    }

    /// Raw value lookup.
    #[must_use]
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(&section.to_ascii_lowercase())
            .and_then(|s| s.get(&key.to_ascii_lowercase()))
            .map(String::as_str)
    }

    /// All key/value pairs of a section, empty if the section is absent.
    pub fn section(&self, section: &str) -> impl Iterator<Item = (&str, &str)> {
        self.sections
            .get(&section.to_ascii_lowercase())
            .into_iter()
            .flat_map(|s| s.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }

    fn require(&self, section: &str, key: &str) -> Result<&str, ConfigError> {
        self.get(section, key).ok_or_else(|| ConfigError::Missing {
            section: section.to_string(),
            key: key.to_string(),
        })
    }

    fn parse_required<T: FromStr>(&self, section: &str, key: &str) -> Result<T, ConfigError>
    where
        T::Err: std::fmt::Display,
    {
        parse_value(section, key, self.require(section, key)?)
    }

    fn parse_or<T: FromStr>(&self, section: &str, key: &str, default: T) -> Result<T, ConfigError>
    where
        T::Err: std::fmt::Display,
    {
        self.get(section, key)
            .map_or(Ok(default), |v| parse_value(section, key, v))
    }
}

fn parse_value<T: FromStr>(section: &str, key: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        section: section.to_string(),
        key: key.to_string(),
        message: format!("`{value}`: {e}"),
    })
}

fn invalid(section: &str, key: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        section: section.to_string(),
        key: key.to_string(),
        message: message.into(),
    }
}

// ── Typed configuration ──────────────────────────────────────────

/// `[io]`: where micrographs are read from and results written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IoConfig {
    /// Project root.
    pub basedir: PathBuf,
    /// Micrograph directory (`basedir/motioncorr`).
    pub micrographs: PathBuf,
    /// Output root (`basedir/output`).
    pub output: PathBuf,
    /// Maximum micrographs per stage invocation; `None` is unlimited.
    pub number_process: Option<usize>,
    /// Worker threads per stage.
    pub workers: usize,
}

/// `[segmentation]`: backend selection and its parameters.
///
/// The sampling and crop parameters belong to prompt-grid model
/// backends; they are validated and carried but the built-in threshold
/// backend does not use them.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentationConfig {
    /// Backend name.
    pub model_type: String,
    /// Model weights, for backends that need them.
    pub model_weights_path: Option<PathBuf>,
    /// Accelerator devices; one concurrent inference per entry.
    pub devices: Vec<String>,
    /// Prompt points sampled along each image side.
    pub points_per_side: u32,
    /// Prompt points evaluated per inference batch.
    pub points_per_batch: u32,
    /// Masks below this predicted IoU are discarded, 0..=1.
    pub pred_iou_thresh: f64,
    /// Masks below this stability score are discarded, 0..=1.
    pub stability_score_thresh: f64,
    /// Extra layers of image crops; 0 segments the whole image only.
    pub crop_n_layers: u32,
    /// Divisor of `points_per_side` for each crop layer.
    pub crop_n_points_downscale_factor: u32,
    /// Box IoU above which masks from different crops are merged, 0..=1.
    pub crop_nms_thresh: f64,
    /// Masks with fewer pixels are discarded.
    pub min_mask_region_area: u64,
}

impl SegmentationConfig {
    /// Build the configured backend.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnsupportedModel`] for any backend other
    /// than `threshold`.
    pub fn build_generator(&self) -> Result<ThresholdSegmenter, ConfigError> {
        if !self.model_type.eq_ignore_ascii_case("threshold") {
            return Err(ConfigError::UnsupportedModel(self.model_type.clone()));
        }
        Ok(ThresholdSegmenter {
            min_mask_region_area: self.min_mask_region_area,
            pred_iou_thresh: self.pred_iou_thresh,
            stability_score_thresh: self.stability_score_thresh,
        })
    }

    /// How many inferences may run at once.
    #[must_use]
    pub fn device_slots(&self) -> usize {
        self.devices.len().max(1)
    }
}

/// `[picking]`: pick spacing and pre-pick morphology, Angstrom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickingConfig {
    /// Minimum spacing between picks of one mask.
    pub box_size: f64,
    /// Signed offset applied before surface picking.
    pub surface_dilation_radius: f64,
    /// Signed offset applied before edge picking.
    pub edge_dilation_radius: f64,
}

/// The validated job parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// `[io]` paths and batch limits.
    pub io: IoConfig,
    /// `[general]` pixel size and downsampling factor.
    pub scale: PixelScale,
    /// `[preprocessing]` low-pass settings.
    pub preprocess: PreprocessConfig,
    /// `[segmentation]` backend and its parameters.
    pub segmentation: SegmentationConfig,
    /// Statistics computed on every detected mask.
    pub statistics: Vec<StatisticKind>,
    /// `[filtering]` bounds, each backed by a configured statistic.
    pub thresholds: FilterThresholds,
    /// Absent when the file has no `[picking]` section; required only by
    /// the picking stage.
    pub picking: Option<PickingConfig>,
}

impl Config {
    /// Read and validate a parameters file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read, or any
    /// parse/validation error from [`Config::from_ini`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_ini(&Ini::parse(&text)?)?;
        log::debug!("loaded parameters from {}", path.display());
        Ok(config)
    }

    /// Build the typed configuration from parsed INI sections.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] for absent required keys and
    /// [`ConfigError::Invalid`] for values that fail to parse or are out
    /// of range.
    pub fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let io = parse_io(ini)?;

        let downsample: u32 = ini.parse_required("general", "downsample")?;
        let psize: f64 = ini.parse_required("general", "psize")?;
        let scale = PixelScale::new(psize, downsample).map_err(|e| pipeline_invalid("general", &e))?;

        let preprocess = parse_preprocess(ini, downsample)?;
        let segmentation = parse_segmentation(ini)?;

        let statistics = match ini.get("postprocessing", "functions") {
            Some(list) => parse_function_list(list)?,
            None => Vec::new(),
        };

        let thresholds = parse_thresholds(ini)?;
        check_thresholds_are_computed(&thresholds, &statistics)?;
        let picking = parse_picking(ini)?;

        Ok(Self {
            io,
            scale,
            preprocess,
            segmentation,
            statistics,
            thresholds,
            picking,
        })
    }

    /// Picking parameters, or an error naming the missing section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when `[picking] box_size` was not
    /// given.
    pub fn require_picking(&self) -> Result<PickingConfig, ConfigError> {
        self.picking.ok_or_else(|| ConfigError::Missing {
            section: "picking".to_string(),
            key: "box_size".to_string(),
        })
    }
}

fn pipeline_invalid(section: &str, err: &PipelineError) -> ConfigError {
    ConfigError::Invalid {
        section: section.to_string(),
        key: String::new(),
        message: err.to_string(),
    }
}

fn parse_io(ini: &Ini) -> Result<IoConfig, ConfigError> {
    let basedir = PathBuf::from(ini.require("io", "basedir")?);
    let micrographs = basedir.join(ini.require("io", "motioncorr")?);
    let output = basedir.join(ini.require("io", "output")?);

    let number_process: i64 = ini.parse_or("io", "number_process", -1)?;
    let number_process = usize::try_from(number_process).ok();

    let default_workers = std::thread::available_parallelism().map_or(1, std::num::NonZero::get);
    let workers: usize = ini.parse_or("io", "workers", default_workers)?;
    if workers == 0 {
        return Err(invalid("io", "workers", "must be at least 1"));
    }

    Ok(IoConfig {
        basedir,
        micrographs,
        output,
        number_process,
        workers,
    })
}

fn parse_preprocess(ini: &Ini, downsample: u32) -> Result<PreprocessConfig, ConfigError> {
    let defaults = PreprocessConfig::default();
    let lowpass_mode = match ini.get("preprocessing", "lowpass_mode") {
        Some(v) => v
            .parse::<LowpassMode>()
            .map_err(|e| invalid("preprocessing", "lowpass_mode", e.to_string()))?,
        None => defaults.lowpass_mode,
    };
    let config = PreprocessConfig {
        downsample,
        lowpass_mode,
        d: ini.parse_or("preprocessing", "d", defaults.d)?,
        sigma_color: ini.parse_or("preprocessing", "sigmacolor", defaults.sigma_color)?,
        sigma_space: ini.parse_or("preprocessing", "sigmaspace", defaults.sigma_space)?,
        sigma: ini.parse_or("preprocessing", "sigma", defaults.sigma)?,
    };
    config
        .validate()
        .map_err(|e| pipeline_invalid("preprocessing", &e))?;
    Ok(config)
}

fn parse_segmentation(ini: &Ini) -> Result<SegmentationConfig, ConfigError> {
    const S: &str = "segmentation";
    let devices = ini
        .get(S, "device")
        .unwrap_or("cpu")
        .split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .collect();
    let config = SegmentationConfig {
        model_type: ini.get(S, "model_type").unwrap_or("threshold").to_string(),
        model_weights_path: ini.get(S, "model_weights_path").map(PathBuf::from),
        devices,
        points_per_side: ini.parse_or(S, "points_per_side", 32)?,
        points_per_batch: ini.parse_or(S, "points_per_batch", 64)?,
        pred_iou_thresh: ini.parse_or(S, "pred_iou_thresh", 0.88)?,
        stability_score_thresh: ini.parse_or(S, "stability_score_thresh", 0.95)?,
        crop_n_layers: ini.parse_or(S, "crop_n_layers", 0)?,
        crop_n_points_downscale_factor: ini.parse_or(S, "crop_n_points_downscale_factor", 1)?,
        crop_nms_thresh: ini.parse_or(S, "crop_nms_thresh", 0.7)?,
        min_mask_region_area: ini.parse_or(S, "min_mask_region_area", 0)?,
    };
    for (key, value) in [
        ("pred_iou_thresh", config.pred_iou_thresh),
        ("stability_score_thresh", config.stability_score_thresh),
        ("crop_nms_thresh", config.crop_nms_thresh),
    ] {
        if !(0.0..=1.0).contains(&value) {
            return Err(invalid(S, key, format!("{value} is outside 0..=1")));
        }
    }
    Ok(config)
}

/// Parse `postprocessing.functions`: either a bracketed, quoted list
/// (`['fit_ellipse', 'find_contour']`) or plain comma separation.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] naming the first unknown function.
pub fn parse_function_list(list: &str) -> Result<Vec<StatisticKind>, ConfigError> {
    let inner = list.trim();
    let inner = inner
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(inner);
    inner
        .split(',')
        .map(|item| item.trim().trim_matches(|c| c == '\'' || c == '"').trim())
        .filter(|item| !item.is_empty())
        .map(|item| {
            item.parse::<StatisticKind>()
                .map_err(|e| invalid("postprocessing", "functions", e.to_string()))
        })
        .collect()
}

fn parse_thresholds(ini: &Ini) -> Result<FilterThresholds, ConfigError> {
    let mut thresholds = FilterThresholds::new();
    for (key, value) in ini.section("filtering") {
        let (is_min, field) = if let Some(f) = key.strip_prefix("min_") {
            (true, f)
        } else if let Some(f) = key.strip_prefix("max_") {
            (false, f)
        } else {
            return Err(invalid(
                "filtering",
                key,
                "keys must look like min_<field> or max_<field>",
            ));
        };
        let field: MaskField = field
            .parse()
            .map_err(|e: vesicle_pipeline::mask::UnknownField| invalid("filtering", key, e.to_string()))?;
        let bound: f64 = parse_value("filtering", key, value)?;
        thresholds = if is_min {
            thresholds.with_min(field, bound)
        } else {
            thresholds.with_max(field, bound)
        };
    }
    Ok(thresholds)
}

/// Every bounded field must be filled by a configured statistic.
fn check_thresholds_are_computed(
    thresholds: &FilterThresholds,
    statistics: &[StatisticKind],
) -> Result<(), ConfigError> {
    for (field, _) in thresholds.iter() {
        if let Some(source) = StatisticKind::source_of(field).filter(|s| !statistics.contains(s)) {
            return Err(invalid(
                "filtering",
                field.name(),
                format!("requires `{source}` in [postprocessing] functions"),
            ));
        }
    }
    Ok(())
}

fn parse_picking(ini: &Ini) -> Result<Option<PickingConfig>, ConfigError> {
    let Some(box_size) = ini.get("picking", "box_size") else {
        return Ok(None);
    };
    let box_size: f64 = parse_value("picking", "box_size", box_size)?;
    if !box_size.is_finite() || box_size <= 0.0 {
        return Err(invalid("picking", "box_size", "must be positive"));
    }
    Ok(Some(PickingConfig {
        box_size,
        surface_dilation_radius: ini.parse_or("picking", "surface_dilation_radius", 0.0)?,
        edge_dilation_radius: ini.parse_or("picking", "edge_dilation_radius", 0.0)?,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
[io]
basedir = /data/job
motioncorr = MotionCorr/job002/Movies
output = vesicles
number_process = -1

[general]
downsample = 4
psize = 1.06

[preprocessing]
lowpass_mode = bilateral
d = 9
sigmaColor = 150
sigmaSpace = 150

[segmentation]
model_type = threshold
device = cuda:0, cuda:1
pred_iou_thresh = 0.9
stability_score_thresh = 0.9
min_mask_region_area = 100

[postprocessing]
functions = ['find_contour', 'fit_ellipse', 'find_mask_intensity']

; filter on physical radius
[filtering]
min_radius_A = 100
max_radius_A: 300
min_stability_score = 0.9

[picking]
box_size = 180
surface_dilation_radius = -20
edge_dilation_radius = 0
";

    #[test]
    fn full_file_parses() {
        let config = Config::from_ini(&Ini::parse(SAMPLE).unwrap()).unwrap();

        assert_eq!(config.io.micrographs, PathBuf::from("/data/job/MotionCorr/job002/Movies"));
        assert_eq!(config.io.output, PathBuf::from("/data/job/vesicles"));
        assert_eq!(config.io.number_process, None);
        assert_eq!(config.scale.downsample(), 4);
        assert!((config.scale.psize() - 1.06).abs() < 1e-12);
        assert_eq!(config.preprocess.lowpass_mode, LowpassMode::Bilateral);
        assert!((config.preprocess.sigma_color - 150.0).abs() < 1e-12);
        assert_eq!(config.segmentation.device_slots(), 2);
        assert_eq!(
            config.statistics,
            vec![
                StatisticKind::FindContour,
                StatisticKind::FitEllipse,
                StatisticKind::FindMaskIntensity
            ]
        );

        let radius = config.thresholds.bound(MaskField::AverageRadiusA).unwrap();
        assert_eq!(radius.min, Some(100.0));
        assert_eq!(radius.max, Some(300.0));
        assert_eq!(
            config.thresholds.bound(MaskField::StabilityScore).unwrap().min,
            Some(0.9)
        );

        let picking = config.require_picking().unwrap();
        assert!((picking.box_size - 180.0).abs() < 1e-12);
        assert!((picking.surface_dilation_radius + 20.0).abs() < 1e-12);
    }

    #[test]
    fn absolute_output_overrides_basedir() {
        let text = SAMPLE.replace("output = vesicles", "output = /scratch/out");
        let config = Config::from_ini(&Ini::parse(&text).unwrap()).unwrap();
        assert_eq!(config.io.output, PathBuf::from("/scratch/out"));
    }

    #[test]
    fn positive_number_process_is_a_limit() {
        let text = SAMPLE.replace("number_process = -1", "number_process = 12");
        let config = Config::from_ini(&Ini::parse(&text).unwrap()).unwrap();
        assert_eq!(config.io.number_process, Some(12));
    }

    #[test]
    fn missing_psize_is_reported() {
        let text = SAMPLE.replace("psize = 1.06", "");
        let err = Config::from_ini(&Ini::parse(&text).unwrap()).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { ref key, .. } if key == "psize"));
    }

    #[test]
    fn unknown_statistic_is_rejected_at_load() {
        let text = SAMPLE.replace("'find_mask_intensity'", "'os.system'");
        let err = Config::from_ini(&Ini::parse(&text).unwrap()).unwrap_err();
        assert!(err.to_string().contains("os.system"), "{err}");
    }

    #[test]
    fn unknown_filter_field_is_rejected() {
        let text = SAMPLE.replace("min_stability_score", "min_sharpness");
        assert!(Config::from_ini(&Ini::parse(&text).unwrap()).is_err());
    }

    #[test]
    fn bound_without_its_statistic_is_rejected() {
        let text = SAMPLE.replace("'find_contour', 'fit_ellipse', ", "");
        let err = Config::from_ini(&Ini::parse(&text).unwrap()).unwrap_err();
        assert!(
            matches!(err, ConfigError::Invalid { ref section, ref key, .. }
                if section == "filtering" && key == "average_radius_A"),
            "{err}"
        );
        assert!(err.to_string().contains("fit_ellipse"), "{err}");

        let text = SAMPLE.replace("min_stability_score = 0.9", "min_circularity = 0.8");
        let err = Config::from_ini(&Ini::parse(&text).unwrap()).unwrap_err();
        assert!(err.to_string().contains("find_circularity"), "{err}");
    }

    #[test]
    fn segmenter_fields_need_no_statistic() {
        let text = SAMPLE
            .replace("min_radius_A = 100\nmax_radius_A: 300\n", "min_area = 50\n")
            .replace("['find_contour', 'fit_ellipse', 'find_mask_intensity']", "[]");
        let config = Config::from_ini(&Ini::parse(&text).unwrap()).unwrap();
        assert!(config.statistics.is_empty());
        assert_eq!(config.thresholds.bound(MaskField::Area).unwrap().min, Some(50.0));
    }

    #[test]
    fn bad_lowpass_mode_is_rejected() {
        let text = SAMPLE.replace("lowpass_mode = bilateral", "lowpass_mode = median");
        let err = Config::from_ini(&Ini::parse(&text).unwrap()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == "lowpass_mode"));
    }

    #[test]
    fn zero_downsample_is_rejected() {
        let text = SAMPLE.replace("downsample = 4", "downsample = 0");
        assert!(Config::from_ini(&Ini::parse(&text).unwrap()).is_err());
    }

    #[test]
    fn unsupported_model_fails_when_building() {
        let text = SAMPLE.replace("model_type = threshold", "model_type = vit_h");
        let config = Config::from_ini(&Ini::parse(&text).unwrap()).unwrap();
        assert!(matches!(
            config.segmentation.build_generator(),
            Err(ConfigError::UnsupportedModel(ref m)) if m == "vit_h"
        ));
    }

    #[test]
    fn picking_is_optional_until_needed() {
        let text = SAMPLE.replace("box_size = 180", "");
        let config = Config::from_ini(&Ini::parse(&text).unwrap()).unwrap();
        assert!(config.require_picking().is_err());
    }

    #[test]
    fn function_list_forms() {
        assert_eq!(
            parse_function_list("fit_ellipse, find_circularity").unwrap(),
            vec![StatisticKind::FitEllipse, StatisticKind::FindCircularity]
        );
        assert_eq!(
            parse_function_list("[\"fit_ellipse\"]").unwrap(),
            vec![StatisticKind::FitEllipse]
        );
        assert!(parse_function_list("[]").unwrap().is_empty());
    }

    #[test]
    fn malformed_text_is_a_syntax_error() {
        for text in ["[io]\nbasedir /data\n", "basedir = /data\n"] {
            let err = Ini::parse(text).unwrap_err();
            assert!(matches!(err, ConfigError::Syntax { .. }), "{text:?}: {err}");
        }
    }

    #[test]
    fn mixed_case_names_fold_to_lower_case() {
        let ini = Ini::parse("[Preprocessing]\nsigmaColor = 150\nd: 9\n").unwrap();
        assert_eq!(ini.get("preprocessing", "sigmacolor"), Some("150"));
        assert_eq!(ini.get("PREPROCESSING", "D"), Some("9"));
        assert_eq!(ini.section("preprocessing").count(), 2);
    }

    #[test]
    fn values_are_verbatim() {
        let ini = Ini::parse(
            "[io]\nbasedir = C:\\data\\job\n[postprocessing]\nfunctions = ['fit_ellipse']\n",
        )
        .unwrap();
        assert_eq!(ini.get("io", "basedir"), Some("C:\\data\\job"));
        assert_eq!(ini.get("postprocessing", "functions"), Some("['fit_ellipse']"));
    }
}
