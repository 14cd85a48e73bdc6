//! MRC2014 micrograph reading.
//!
//! Only the first section of a file is read: motion-corrected
//! micrographs are single images. Byte order comes from the machine
//! stamp at offset 212 (`0x11` in the first byte means big-endian;
//! anything else is read as little-endian, which is what every current
//! writer produces).

use std::path::Path;

use vesicle_pipeline::{IntensityImage, Micrograph, MicrographHeader};

/// Fixed header length before any extended header.
pub const HEADER_LEN: usize = 1024;

/// Errors raised while decoding an MRC file.
#[derive(Debug, thiserror::Error)]
pub enum MrcError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that failed.
        path: std::path::PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The byte stream ends before the header or first section does.
    #[error("truncated MRC data: need {needed} bytes, have {actual}")]
    Truncated {
        /// Bytes required.
        needed: usize,
        /// Bytes present.
        actual: usize,
    },

    /// The data mode is not one of 0, 1, 2 or 6.
    #[error("unsupported MRC mode {0}")]
    UnsupportedMode(i32),

    /// The header dimensions are non-positive.
    #[error("invalid MRC dimensions {nx}x{ny}x{nz}")]
    BadDimensions {
        /// Columns.
        nx: i32,
        /// Rows.
        ny: i32,
        /// Sections.
        nz: i32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endian {
    Little,
    Big,
}

struct Reader<'a> {
    bytes: &'a [u8],
    endian: Endian,
}

impl Reader<'_> {
    fn word(&self, offset: usize) -> [u8; 4] {
        let mut w = [0_u8; 4];
        w.copy_from_slice(&self.bytes[offset..offset + 4]);
        w
    }

    fn i32_at(&self, offset: usize) -> i32 {
        let w = self.word(offset);
        match self.endian {
            Endian::Little => i32::from_le_bytes(w),
            Endian::Big => i32::from_be_bytes(w),
        }
    }

    fn f32_at(&self, offset: usize) -> f32 {
        let w = self.word(offset);
        match self.endian {
            Endian::Little => f32::from_le_bytes(w),
            Endian::Big => f32::from_be_bytes(w),
        }
    }

    fn u16_at(&self, offset: usize) -> u16 {
        let w = [self.bytes[offset], self.bytes[offset + 1]];
        match self.endian {
            Endian::Little => u16::from_le_bytes(w),
            Endian::Big => u16::from_be_bytes(w),
        }
    }
}

/// Decode the first section of an in-memory MRC file.
///
/// # Errors
///
/// Returns [`MrcError::Truncated`], [`MrcError::UnsupportedMode`] or
/// [`MrcError::BadDimensions`] for malformed input.
#[allow(clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub fn read_mrc(bytes: &[u8]) -> Result<Micrograph, MrcError> {
    if bytes.len() < HEADER_LEN {
        return Err(MrcError::Truncated {
            needed: HEADER_LEN,
            actual: bytes.len(),
        });
    }
    let endian = if bytes[212] == 0x11 {
        Endian::Big
    } else {
        Endian::Little
    };
    let r = Reader { bytes, endian };

    let (nx, ny, nz) = (r.i32_at(0), r.i32_at(4), r.i32_at(8));
    if nx <= 0 || ny <= 0 || nz <= 0 {
        return Err(MrcError::BadDimensions { nx, ny, nz });
    }
    let mode = r.i32_at(12);
    let item = match mode {
        0 => 1,
        1 | 6 => 2,
        2 => 4,
        other => return Err(MrcError::UnsupportedMode(other)),
    };
    let mx = r.i32_at(28);
    let cella_x = r.f32_at(40);
    let nsymbt = usize::try_from(r.i32_at(92).max(0)).unwrap_or(0);

    let width = nx as u32;
    let height = ny as u32;
    let start = HEADER_LEN + nsymbt;
    let count = (width as usize) * (height as usize);
    let needed = start + count * item;
    if bytes.len() < needed {
        return Err(MrcError::Truncated {
            needed,
            actual: bytes.len(),
        });
    }

    let data = &bytes[start..needed];
    let values: Vec<f32> = match mode {
        0 => data.iter().map(|&b| f32::from(b.cast_signed())).collect(),
        1 => (0..count)
            .map(|i| f32::from(r.u16_at(start + 2 * i).cast_signed()))
            .collect(),
        6 => (0..count).map(|i| f32::from(r.u16_at(start + 2 * i))).collect(),
        _ => (0..count).map(|i| r.f32_at(start + 4 * i)).collect(),
    };

    let image = IntensityImage::from_raw(width, height, values).ok_or(MrcError::Truncated {
        needed,
        actual: bytes.len(),
    })?;

    let pixel_size = (mx > 0 && cella_x > 0.0).then(|| f64::from(cella_x) / f64::from(mx));
    let header = MicrographHeader {
        sections: nz as u32,
        pixel_size,
        min: r.f32_at(76),
        max: r.f32_at(80),
        mean: r.f32_at(84),
    };
    Ok(Micrograph { image, header })
}

/// Read and decode an MRC file from disk.
///
/// # Errors
///
/// Returns [`MrcError::Io`] if the file cannot be read, otherwise as
/// [`read_mrc`].
pub fn read_mrc_file(path: &Path) -> Result<Micrograph, MrcError> {
    let bytes = std::fs::read(path).map_err(|source| MrcError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_mrc(&bytes)
}

/// Encode a single-section, mode 2, little-endian MRC file.
///
/// `psize` (Angstrom per pixel) is recorded in the cell dimensions.
#[must_use]
#[allow(
    clippy::cast_possible_wrap,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss
)]
pub fn encode_mrc(image: &IntensityImage, psize: f32) -> Vec<u8> {
    let (w, h) = image.dimensions();
    let mut out = vec![0_u8; HEADER_LEN];
    let mut put_i32 = |offset: usize, v: i32| out[offset..offset + 4].copy_from_slice(&v.to_le_bytes());
    put_i32(0, w as i32);
    put_i32(4, h as i32);
    put_i32(8, 1);
    put_i32(12, 2);
    put_i32(28, w as i32);
    put_i32(32, h as i32);
    put_i32(36, 1);
    put_i32(64, 1);
    put_i32(68, 2);
    put_i32(72, 3);

    let (mut min, mut max, mut sum) = (f32::INFINITY, f32::NEG_INFINITY, 0.0_f64);
    for p in image.pixels() {
        min = min.min(p.0[0]);
        max = max.max(p.0[0]);
        sum += f64::from(p.0[0]);
    }
    let n = f64::from(w) * f64::from(h);
    let mean = if n > 0.0 { (sum / n) as f32 } else { 0.0 };

    let mut put_f32 = |offset: usize, v: f32| out[offset..offset + 4].copy_from_slice(&v.to_le_bytes());
    put_f32(40, psize * w as f32);
    put_f32(44, psize * h as f32);
    put_f32(48, psize);
    put_f32(52, 90.0);
    put_f32(56, 90.0);
    put_f32(60, 90.0);
    put_f32(76, min);
    put_f32(80, max);
    put_f32(84, mean);

    out[208..212].copy_from_slice(b"MAP ");
    out[212..216].copy_from_slice(&[0x44, 0x44, 0, 0]);

    out.reserve(image.as_raw().len() * 4);
    for v in image.as_raw() {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[allow(clippy::cast_precision_loss)]
    fn ramp(w: u32, h: u32) -> IntensityImage {
        IntensityImage::from_fn(w, h, |x, y| image::Luma([(x + 10 * y) as f32 - 3.5]))
    }

    fn header(nx: i32, ny: i32, mode: i32, big: bool) -> Vec<u8> {
        let mut out = vec![0_u8; HEADER_LEN];
        let enc = |v: i32| if big { v.to_be_bytes() } else { v.to_le_bytes() };
        out[0..4].copy_from_slice(&enc(nx));
        out[4..8].copy_from_slice(&enc(ny));
        out[8..12].copy_from_slice(&enc(1));
        out[12..16].copy_from_slice(&enc(mode));
        out[212] = if big { 0x11 } else { 0x44 };
        out
    }

    #[test]
    fn float_mode_round_trip() {
        let image = ramp(7, 5);
        let micrograph = read_mrc(&encode_mrc(&image, 1.25)).unwrap();
        assert_eq!(micrograph.image, image);
        assert_eq!(micrograph.header.sections, 1);
        assert!((micrograph.header.pixel_size.unwrap() - 1.25).abs() < 1e-6);
        assert!((micrograph.header.min + 3.5).abs() < 1e-6);
    }

    #[test]
    fn int16_big_endian() {
        let mut bytes = header(2, 1, 1, true);
        bytes.extend_from_slice(&(-300_i16).to_be_bytes());
        bytes.extend_from_slice(&(1200_i16).to_be_bytes());
        let m = read_mrc(&bytes).unwrap();
        assert_eq!(m.image.as_raw(), &vec![-300.0, 1200.0]);
        assert_eq!(m.header.pixel_size, None);
    }

    #[test]
    fn uint16_and_int8_modes() {
        let mut bytes = header(2, 1, 6, false);
        bytes.extend_from_slice(&60_000_u16.to_le_bytes());
        bytes.extend_from_slice(&7_u16.to_le_bytes());
        assert_eq!(read_mrc(&bytes).unwrap().image.as_raw(), &vec![60_000.0, 7.0]);

        let mut bytes = header(3, 1, 0, false);
        bytes.extend_from_slice(&[0xff, 0x00, 0x7f]);
        assert_eq!(read_mrc(&bytes).unwrap().image.as_raw(), &vec![-1.0, 0.0, 127.0]);
    }

    #[test]
    fn extended_header_is_skipped() {
        let mut bytes = header(1, 1, 2, false);
        bytes[92..96].copy_from_slice(&8_i32.to_le_bytes());
        bytes.extend_from_slice(&[0xAA; 8]);
        bytes.extend_from_slice(&2.5_f32.to_le_bytes());
        assert_eq!(read_mrc(&bytes).unwrap().image.as_raw(), &vec![2.5]);
    }

    #[test]
    fn malformed_inputs() {
        assert!(matches!(
            read_mrc(&[0_u8; 100]),
            Err(MrcError::Truncated { needed: 1024, actual: 100 })
        ));
        assert!(matches!(
            read_mrc(&header(4, 4, 2, false)),
            Err(MrcError::Truncated { .. })
        ));
        assert!(matches!(
            read_mrc(&header(4, 4, 4, false)),
            Err(MrcError::UnsupportedMode(4))
        ));
        assert!(matches!(
            read_mrc(&header(0, 4, 2, false)),
            Err(MrcError::BadDimensions { .. })
        ));
    }
}
