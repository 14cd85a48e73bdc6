//! Mask store: one JSON file per micrograph holding its mask
//! collection.
//!
//! Each segmentation raster is cropped to its bounding box and stored
//! with the canvas size so the full raster can be rebuilt. With
//! [`Compression::Uint64`] every cropped row is packed into 64-bit words,
//! bit `i` of word `k` being column `64·k + i`. Geometry is re-measured
//! from the raster on load, and the contour is never stored.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use vesicle_pipeline::mask::MASK_ON;
use vesicle_pipeline::{
    BoundingBox, Dimensions, EllipseStats, GrayImage, IntensityStats, MaskRecord,
};

/// Current file format version.
pub const FORMAT_VERSION: u32 = 1;

/// Largest canvas, in pixels, a stored mask may declare.
pub const MAX_CANVAS_PIXELS: u64 = 1 << 28;

/// Segmentation bitmap encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    /// One byte per cropped pixel.
    None,
    /// Rows packed into `u64` words.
    #[default]
    Uint64,
}

/// Errors raised by the mask store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading or writing the file failed.
    #[error("{path}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },

    /// The file is not valid JSON for this format.
    #[error("malformed mask file: {0}")]
    Json(#[from] serde_json::Error),

    /// The file was written by an unknown format version.
    #[error("unsupported mask file version {0}")]
    UnsupportedVersion(u32),

    /// A mask's bitmap does not match its declared shape.
    #[error("corrupt mask {index}: {message}")]
    Corrupt {
        /// Position in the collection.
        index: usize,
        /// What did not match.
        message: String,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct MaskFile {
    version: u32,
    compression: Compression,
    masks: Vec<StoredMask>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredMask {
    canvas: Dimensions,
    bbox: BoundingBox,
    bits: StoredBits,
    stability_score: f64,
    predicted_iou: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ellipse: Option<EllipseStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    intensity: Option<IntensityStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    circularity: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum StoredBits {
    Dense(Vec<u8>),
    Packed(Vec<u64>),
}

const fn words_per_row(width: u32) -> usize {
    (width as usize).div_ceil(64)
}

impl StoredMask {
    fn from_record(record: &MaskRecord, compression: Compression) -> Self {
        let bbox = record.bounding_box();
        let inside = |x: u32, y: u32| record.contains(bbox.x + x, bbox.y + y);

        let bits = match compression {
            Compression::None => {
                let mut dense = Vec::with_capacity(bbox.width as usize * bbox.height as usize);
                for y in 0..bbox.height {
                    for x in 0..bbox.width {
                        dense.push(u8::from(inside(x, y)));
                    }
                }
                StoredBits::Dense(dense)
            }
            Compression::Uint64 => {
                let per_row = words_per_row(bbox.width);
                let mut words = vec![0_u64; per_row * bbox.height as usize];
                for y in 0..bbox.height {
                    for x in 0..bbox.width {
                        if inside(x, y) {
                            let k = y as usize * per_row + (x / 64) as usize;
                            words[k] |= 1_u64 << (x % 64);
                        }
                    }
                }
                StoredBits::Packed(words)
            }
        };

        Self {
            canvas: record.dimensions(),
            bbox,
            bits,
            stability_score: record.stability_score,
            predicted_iou: record.predicted_iou,
            ellipse: record.ellipse,
            intensity: record.intensity,
            circularity: record.circularity,
        }
    }

    fn into_record(self, index: usize) -> Result<MaskRecord, StoreError> {
        let corrupt = |message: String| StoreError::Corrupt { index, message };
        let Self {
            canvas,
            bbox,
            bits,
            ..
        } = self;

        let pixels = u64::from(canvas.width).checked_mul(u64::from(canvas.height));
        if pixels.is_none_or(|p| p > MAX_CANVAS_PIXELS) {
            return Err(corrupt(format!(
                "canvas {}x{} exceeds {MAX_CANVAS_PIXELS} pixels",
                canvas.width, canvas.height
            )));
        }
        if bbox.x.saturating_add(bbox.width) > canvas.width
            || bbox.y.saturating_add(bbox.height) > canvas.height
        {
            return Err(corrupt(format!(
                "bounding box {bbox:?} exceeds canvas {}x{}",
                canvas.width, canvas.height
            )));
        }

        let cells = bbox.width as usize * bbox.height as usize;
        let per_row = words_per_row(bbox.width);
        match &bits {
            StoredBits::Dense(dense) if dense.len() != cells => {
                return Err(corrupt(format!("{} bytes for {cells} pixels", dense.len())));
            }
            StoredBits::Packed(words) if words.len() != per_row * bbox.height as usize => {
                return Err(corrupt(format!(
                    "{} words for {} rows of {per_row}",
                    words.len(),
                    bbox.height
                )));
            }
            _ => {}
        }

        let mut raster = GrayImage::new(canvas.width, canvas.height);
        match bits {
            StoredBits::Dense(dense) => {
                for (i, v) in dense.iter().enumerate() {
                    if *v != 0 {
                        let (x, y) = cell_xy(i, bbox.width);
                        raster.put_pixel(bbox.x + x, bbox.y + y, image::Luma([MASK_ON]));
                    }
                }
            }
            StoredBits::Packed(words) => {
                for y in 0..bbox.height {
                    for x in 0..bbox.width {
                        let word = words[y as usize * per_row + (x / 64) as usize];
                        if (word >> (x % 64)) & 1 == 1 {
                            raster.put_pixel(bbox.x + x, bbox.y + y, image::Luma([MASK_ON]));
                        }
                    }
                }
            }
        }

        let mut record = MaskRecord::from_segmentation(raster, self.stability_score, self.predicted_iou)
            .ok_or_else(|| corrupt("empty segmentation".to_string()))?;
        if record.bounding_box() != bbox {
            return Err(corrupt(format!(
                "stored bounding box {bbox:?} does not match bitmap {:?}",
                record.bounding_box()
            )));
        }
        record.ellipse = self.ellipse;
        record.intensity = self.intensity;
        record.circularity = self.circularity;
        Ok(record)
    }
}

#[allow(clippy::cast_possible_truncation)]
const fn cell_xy(i: usize, width: u32) -> (u32, u32) {
    let w = width as usize;
    ((i % w) as u32, (i / w) as u32)
}

/// Serialize a collection to JSON text.
///
/// # Errors
///
/// Returns [`StoreError::Json`] if serialization fails.
pub fn encode(collection: &[MaskRecord], compression: Compression) -> Result<String, StoreError> {
    let file = MaskFile {
        version: FORMAT_VERSION,
        compression,
        masks: collection
            .iter()
            .map(|r| StoredMask::from_record(r, compression))
            .collect(),
    };
    Ok(serde_json::to_string(&file)?)
}

/// Deserialize a collection from JSON text. Contours are absent.
///
/// # Errors
///
/// Returns [`StoreError::Json`], [`StoreError::UnsupportedVersion`] or
/// [`StoreError::Corrupt`] for malformed input.
pub fn decode(text: &str) -> Result<Vec<MaskRecord>, StoreError> {
    let file: MaskFile = serde_json::from_str(text)?;
    if file.version != FORMAT_VERSION {
        return Err(StoreError::UnsupportedVersion(file.version));
    }
    file.masks
        .into_iter()
        .enumerate()
        .map(|(i, m)| m.into_record(i))
        .collect()
}

/// Write a collection to `path`, creating parent directories.
///
/// # Errors
///
/// Returns [`StoreError::Io`] if the file cannot be written.
pub fn save(
    collection: &[MaskRecord],
    path: &Path,
    compression: Compression,
) -> Result<(), StoreError> {
    let text = encode(collection, compression)?;
    write_atomic(path, text.as_bytes()).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Read a collection from `path`.
///
/// # Errors
///
/// Returns [`StoreError::Io`] if the file cannot be read, otherwise as
/// [`decode`].
pub fn load(path: &Path) -> Result<Vec<MaskRecord>, StoreError> {
    let text = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    decode(&text)
}

/// Write `bytes` to `<path>.tmp` and rename it over `path`, so readers
/// never observe a partial file.
///
/// # Errors
///
/// Returns any I/O error from creating the directory, writing, or
/// renaming.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use vesicle_pipeline::mask::disc_mask;

    fn sample() -> Vec<MaskRecord> {
        let mut a =
            MaskRecord::from_segmentation(disc_mask(150, 90, 40.0, 45.0, 30.0), 0.971_3, 0.912_7)
                .unwrap();
        a.ellipse = Some(EllipseStats {
            average_radius: 30.1,
            semi_minor: 29.9,
            semi_major: 30.3,
            average_radius_a: 127.624,
            semi_minor_a: 126.776,
            semi_major_a: 128.472,
        });
        a.circularity = Some(0.93);

        // Wider than one word, touching the canvas edge.
        let mut wide = GrayImage::new(150, 90);
        for y in 80..90 {
            for x in 2..149 {
                if (x + y) % 3 != 0 {
                    wide.put_pixel(x, y, image::Luma([MASK_ON]));
                }
            }
        }
        let mut b = MaskRecord::from_segmentation(wide, 0.5, 0.25).unwrap();
        b.intensity = Some(IntensityStats {
            mean_intensity: 101.5,
            std_intensity: 3.25,
        });
        vec![a, b]
    }

    #[test]
    fn round_trip_both_encodings() {
        for compression in [Compression::None, Compression::Uint64] {
            let original = sample();
            let restored = decode(&encode(&original, compression).unwrap()).unwrap();
            assert_eq!(restored, original, "{compression:?}");
        }
    }

    #[test]
    fn contour_is_dropped_and_rederives_identically() {
        let mut original = sample();
        let direct = original[0].ensure_contour().cloned();
        assert!(direct.is_some());

        let mut restored = decode(&encode(&original, Compression::Uint64).unwrap()).unwrap();
        assert!(restored[0].contour.is_none());
        assert_eq!(restored[0].ensure_contour().cloned(), direct);
    }

    #[test]
    fn packed_is_smaller_than_dense() {
        let masks = sample();
        let dense = encode(&masks, Compression::None).unwrap();
        let packed = encode(&masks, Compression::Uint64).unwrap();
        assert!(packed.len() < dense.len());
        assert!(packed.contains("\"compression\":\"uint64\""));
        assert!(!packed.contains("contour"));
    }

    #[test]
    fn empty_collection_round_trips() {
        let text = encode(&[], Compression::Uint64).unwrap();
        assert!(decode(&text).unwrap().is_empty());
    }

    #[test]
    fn rejects_bad_files() {
        assert!(matches!(decode("not json"), Err(StoreError::Json(_))));
        assert!(matches!(
            decode(r#"{"version":9,"compression":"none","masks":[]}"#),
            Err(StoreError::UnsupportedVersion(9))
        ));
        let short = r#"{"version":1,"compression":"none","masks":[{
            "canvas":{"width":4,"height":4},
            "bbox":{"x":0,"y":0,"width":2,"height":2},
            "bits":{"dense":[1,1,1]},
            "stability_score":1.0,"predicted_iou":1.0}]}"#;
        assert!(matches!(decode(short), Err(StoreError::Corrupt { index: 0, .. })));
    }

    #[test]
    fn rejects_oversized_canvas_before_allocating() {
        let huge = r#"{"version":1,"compression":"uint64","masks":[{
            "canvas":{"width":4000000000,"height":4000000000},
            "bbox":{"x":0,"y":0,"width":1,"height":1},
            "bits":{"packed":[1]},
            "stability_score":1.0,"predicted_iou":1.0}]}"#;
        let err = decode(huge).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { index: 0, .. }), "{err}");
        assert!(err.to_string().contains("4000000000x4000000000"));
    }

    #[test]
    fn save_and_load_via_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("masks").join("mic_mask.json");
        let original = sample();
        save(&original, &path, Compression::Uint64).unwrap();
        assert!(!dir.path().join("masks").join("mic_mask.json.tmp").exists());
        assert_eq!(load(&path).unwrap(), original);
        assert!(matches!(
            load(&dir.path().join("absent.json")),
            Err(StoreError::Io { .. })
        ));
    }
}
