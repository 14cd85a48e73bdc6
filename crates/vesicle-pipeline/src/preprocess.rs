//! Micrograph preprocessing: downsample, normalize, low-pass.
//!
//! Turns a full-resolution [`Micrograph`] into the reduced 8-bit image
//! the segmentation backend consumes:
//!
//! 1. block-average downsample by the integer factor
//!    (output is `floor(dim / downsample)`),
//! 2. linear rescale into `0..=255`,
//! 3. Gaussian or bilateral low-pass.
//!
//! The result is deterministic for identical inputs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::{GrayImage, IntensityImage, PipelineError};

/// Acquisition metadata carried alongside the pixel data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MicrographHeader {
    /// Number of sections in the source file (frames or slices).
    pub sections: u32,
    /// Pixel size recorded in the file header, Angstrom, if present.
    pub pixel_size: Option<f64>,
    /// Minimum density recorded in the header.
    pub min: f32,
    /// Maximum density recorded in the header.
    pub max: f32,
    /// Mean density recorded in the header.
    pub mean: f32,
}

/// A raw micrograph: full-resolution intensities plus metadata.
#[derive(Debug, Clone)]
pub struct Micrograph {
    /// Full-resolution intensities.
    pub image: IntensityImage,
    /// File header metadata.
    pub header: MicrographHeader,
}

/// Which low-pass filter to apply after downsampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LowpassMode {
    /// Isotropic Gaussian with [`PreprocessConfig::sigma`].
    Gaussian,
    /// Edge-preserving bilateral with `d` / `sigma_color` / `sigma_space`.
    #[default]
    Bilateral,
}

impl fmt::Display for LowpassMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gaussian => f.write_str("gaussian"),
            Self::Bilateral => f.write_str("bilateral"),
        }
    }
}

impl FromStr for LowpassMode {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gaussian" => Ok(Self::Gaussian),
            "bilateral" => Ok(Self::Bilateral),
            other => Err(PipelineError::InvalidConfig(format!(
                "lowpass_mode must be `gaussian` or `bilateral`, got `{other}`"
            ))),
        }
    }
}

/// Preprocessing parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessConfig {
    /// Integer downsample factor (at least 1).
    pub downsample: u32,
    /// Low-pass filter selection.
    pub lowpass_mode: LowpassMode,
    /// Bilateral neighbourhood diameter; non-positive derives it from
    /// `sigma_space`.
    pub d: i32,
    /// Bilateral range sigma, intensity units.
    pub sigma_color: f64,
    /// Bilateral spatial sigma, pixels.
    pub sigma_space: f64,
    /// Gaussian sigma, pixels.
    pub sigma: f32,
}

impl PreprocessConfig {
    /// Default Gaussian sigma.
    pub const DEFAULT_SIGMA: f32 = 1.4;

    /// Check every parameter the selected mode uses.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] naming the first bad
    /// parameter.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.downsample == 0 {
            return Err(PipelineError::InvalidConfig(
                "downsample must be at least 1".to_string(),
            ));
        }
        match self.lowpass_mode {
            LowpassMode::Gaussian => {
                if !self.sigma.is_finite() || self.sigma < 0.0 {
                    return Err(PipelineError::InvalidConfig(format!(
                        "gaussian sigma must be non-negative, got {}",
                        self.sigma
                    )));
                }
            }
            LowpassMode::Bilateral => {
                if !(self.sigma_color.is_finite() && self.sigma_color > 0.0) {
                    return Err(PipelineError::InvalidConfig(format!(
                        "sigmaColor must be positive, got {}",
                        self.sigma_color
                    )));
                }
                if !(self.sigma_space.is_finite() && self.sigma_space > 0.0) {
                    return Err(PipelineError::InvalidConfig(format!(
                        "sigmaSpace must be positive, got {}",
                        self.sigma_space
                    )));
                }
            }
        }
        Ok(())
    }
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            downsample: 4,
            lowpass_mode: LowpassMode::default(),
            d: 9,
            sigma_color: 150.0,
            sigma_space: 150.0,
            sigma: Self::DEFAULT_SIGMA,
        }
    }
}

/// Reduce a raw micrograph to the segmentation input image.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] for out-of-range parameters
/// and [`PipelineError::ImageTooSmall`] when the micrograph is smaller
/// than one downsampled pixel.
pub fn preprocess(
    micrograph: &Micrograph,
    config: &PreprocessConfig,
) -> Result<GrayImage, PipelineError> {
    config.validate()?;

    let reduced = crate::downsample::downsample(&micrograph.image, config.downsample)?;
    let normalized = crate::normalize::normalize_to_u8(&reduced);

    Ok(match config.lowpass_mode {
        LowpassMode::Gaussian => crate::blur::gaussian_blur(&normalized, config.sigma),
        LowpassMode::Bilateral => crate::blur::bilateral_blur(
            &normalized,
            config.d,
            config.sigma_color,
            config.sigma_space,
        ),
    })
}
