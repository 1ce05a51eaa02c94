//! Big-endian field readers and ICC tag type decoders.

use crate::color::curve::{ParametricCurve, ToneCurve};
use crate::color::matrix::Matrix3;
use crate::types::{Error, Result};

/// 4-byte ICC signature (tag or type).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature(pub [u8; 4]);

impl Signature {
    /// Signature as text, with non-printable bytes replaced.
    pub fn as_string(&self) -> String {
        self.0
            .iter()
            .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '?' })
            .collect()
    }
}

impl core::fmt::Debug for Signature {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "'{}'", self.as_string())
    }
}

impl core::fmt::Display for Signature {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.as_string())
    }
}

impl From<&[u8; 4]> for Signature {
    fn from(b: &[u8; 4]) -> Self {
        Self(*b)
    }
}

#[inline]
pub(crate) fn read_u16(data: &[u8], offset: usize) -> Option<u16> {
    let b = data.get(offset..offset + 2)?;
    Some(u16::from_be_bytes([b[0], b[1]]))
}

#[inline]
pub(crate) fn read_u32(data: &[u8], offset: usize) -> Option<u32> {
    let b = data.get(offset..offset + 4)?;
    Some(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}

#[inline]
pub(crate) fn read_sig(data: &[u8], offset: usize) -> Option<Signature> {
    let b = data.get(offset..offset + 4)?;
    Some(Signature([b[0], b[1], b[2], b[3]]))
}

/// Decode an `s15Fixed16Number`: signed i32 scaled by 1/65536.
#[inline]
pub fn s15_fixed16(raw: [u8; 4]) -> f64 {
    i32::from_be_bytes(raw) as f64 / 65536.0
}

/// Encode an `s15Fixed16Number`, rounding to the nearest step.
#[inline]
pub fn to_s15_fixed16(value: f64) -> [u8; 4] {
    let scaled = (value * 65536.0).round();
    let clamped = scaled.clamp(i32::MIN as f64, i32::MAX as f64) as i32;
    clamped.to_be_bytes()
}

#[inline]
fn read_s15(data: &[u8], offset: usize) -> Option<f64> {
    let b = data.get(offset..offset + 4)?;
    Some(s15_fixed16([b[0], b[1], b[2], b[3]]))
}

fn expect_type(tag: &[u8], expected: &[u8; 4]) -> Result<()> {
    let found = read_sig(tag, 0).ok_or_else(|| Error::Format("tag shorter than type signature".into()))?;
    if found.0 != *expected {
        return Err(Error::Format(format!(
            "expected tag type '{}', found {}",
            Signature(*expected),
            found
        )));
    }
    Ok(())
}

/// `XYZ ` tag: three s15Fixed16 values after the 8-byte type header.
pub fn parse_xyz(tag: &[u8]) -> Result<[f64; 3]> {
    expect_type(tag, b"XYZ ")?;
    match (read_s15(tag, 8), read_s15(tag, 12), read_s15(tag, 16)) {
        (Some(x), Some(y), Some(z)) => Ok([x, y, z]),
        _ => Err(Error::Format("XYZ tag truncated".into())),
    }
}

/// `sf32` tag holding a row-major 3x3 matrix.
pub fn parse_sf32_matrix(tag: &[u8]) -> Result<Matrix3> {
    expect_type(tag, b"sf32")?;
    let mut m = [[0.0f64; 3]; 3];
    for (i, cell) in m.iter_mut().flatten().enumerate() {
        *cell = read_s15(tag, 8 + i * 4)
            .ok_or_else(|| Error::Format("sf32 matrix truncated".into()))?;
    }
    Ok(Matrix3(m))
}

/// `curv` or `para` tag.
pub fn parse_curve(tag: &[u8]) -> Result<ToneCurve> {
    let kind = read_sig(tag, 0).ok_or_else(|| Error::Format("curve tag truncated".into()))?;
    match &kind.0 {
        b"curv" => parse_curv(tag),
        b"para" => parse_para(tag),
        _ => Err(Error::Format(format!("unsupported curve tag type {}", kind))),
    }
}

fn parse_curv(tag: &[u8]) -> Result<ToneCurve> {
    let count = read_u32(tag, 8).ok_or_else(|| Error::Format("curv count truncated".into()))? as usize;
    match count {
        0 => Ok(ToneCurve::Linear),
        1 => {
            let raw = read_u16(tag, 12).ok_or_else(|| Error::Format("curv gamma truncated".into()))?;
            Ok(ToneCurve::Gamma(raw as f64 / 256.0))
        }
        n => {
            let end = n
                .checked_mul(2)
                .and_then(|len| len.checked_add(12))
                .ok_or_else(|| Error::Format("curv count overflow".into()))?;
            if end > tag.len() {
                return Err(Error::Format(format!(
                    "curv declares {} samples but tag holds {} bytes",
                    n,
                    tag.len()
                )));
            }
            let samples = tag[12..end]
                .chunks_exact(2)
                .map(|b| u16::from_be_bytes([b[0], b[1]]) as f64 / 65535.0)
                .collect();
            Ok(ToneCurve::Sampled(samples))
        }
    }
}

fn parse_para(tag: &[u8]) -> Result<ToneCurve> {
    let function_type =
        read_u16(tag, 8).ok_or_else(|| Error::Format("para function type truncated".into()))?;
    let arity = crate::color::curve::PARAMETRIC_ARITY
        .get(function_type as usize)
        .copied()
        .ok_or_else(|| {
            Error::Format(format!("unknown parametric function type {}", function_type))
        })?;
    let params = (0..arity)
        .map(|i| read_s15(tag, 12 + i * 4))
        .collect::<Option<Vec<f64>>>()
        .ok_or_else(|| Error::Format("para parameters truncated".into()))?;
    Ok(ToneCurve::Parametric(ParametricCurve::from_params(
        function_type,
        &params,
    )?))
}

/// `desc` (ASCII) or `mluc` (first record, UTF-16BE) text.
pub fn parse_text(tag: &[u8]) -> Result<String> {
    let kind = read_sig(tag, 0).ok_or_else(|| Error::Format("text tag truncated".into()))?;
    match &kind.0 {
        b"desc" => {
            let count = read_u32(tag, 8).ok_or_else(|| Error::Format("desc truncated".into()))?;
            let end = 12usize.saturating_add(count as usize).min(tag.len());
            let ascii = tag.get(12..end).unwrap_or(&[]);
            Ok(String::from_utf8_lossy(ascii)
                .trim_end_matches('\0')
                .to_string())
        }
        b"mluc" => {
            let records = read_u32(tag, 8).unwrap_or(0);
            if records == 0 {
                return Ok(String::new());
            }
            let (Some(len), Some(offset)) = (read_u32(tag, 20), read_u32(tag, 24)) else {
                return Err(Error::Format("mluc record truncated".into()));
            };
            let start = offset as usize;
            let end = start.saturating_add(len as usize).min(tag.len());
            let units: Vec<u16> = tag
                .get(start..end)
                .unwrap_or(&[])
                .chunks_exact(2)
                .map(|b| u16::from_be_bytes([b[0], b[1]]))
                .collect();
            Ok(String::from_utf16_lossy(&units)
                .trim_end_matches('\0')
                .to_string())
        }
        _ => Err(Error::Format(format!("unsupported text tag type {}", kind))),
    }
}
