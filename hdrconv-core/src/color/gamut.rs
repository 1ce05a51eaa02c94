//! Colour primaries, named colour spaces and gamut conversion matrices.
//!
//! Matrices are derived from xy chromaticities at runtime rather than
//! stored as rounded constants, so forward and inverse stay consistent.

#![allow(clippy::excessive_precision)]

use super::matrix::Matrix3;
use super::transfer::Transfer;

/// CIE 1931 xy chromaticity.
pub type Chromaticity = [f64; 2];

/// D65 white point.
pub const D65: Chromaticity = [0.3127, 0.3290];

/// D50 white point (ICC profile connection space).
pub const D50: Chromaticity = [0.3457, 0.3585];

/// D50 tristimulus as encoded in ICC profiles.
pub const D50_XYZ: [f64; 3] = [0.9642, 1.0, 0.8249];

/// Red, green and blue chromaticities of an RGB colour space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Primaries {
    /// Red primary.
    pub red: Chromaticity,
    /// Green primary.
    pub green: Chromaticity,
    /// Blue primary.
    pub blue: Chromaticity,
}

impl Primaries {
    /// BT.709 / sRGB primaries.
    pub const BT709: Self = Self {
        red: [0.640, 0.330],
        green: [0.300, 0.600],
        blue: [0.150, 0.060],
    };

    /// Display P3 primaries.
    pub const DISPLAY_P3: Self = Self {
        red: [0.680, 0.320],
        green: [0.265, 0.690],
        blue: [0.150, 0.060],
    };

    /// BT.2020 / BT.2100 primaries.
    pub const BT2020: Self = Self {
        red: [0.708, 0.292],
        green: [0.170, 0.797],
        blue: [0.131, 0.046],
    };
}

/// Colour space declared for an image: primaries, white point and transfer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorSpace {
    /// RGB primaries.
    pub primaries: Primaries,
    /// White point chromaticity.
    pub white: Chromaticity,
    /// Transfer characteristics of stored samples.
    pub transfer: Transfer,
}

impl ColorSpace {
    /// sRGB (IEC 61966-2-1).
    pub const SRGB: Self = Self {
        primaries: Primaries::BT709,
        white: D65,
        transfer: Transfer::Srgb,
    };

    /// Display P3 with the sRGB transfer curve.
    pub const DISPLAY_P3: Self = Self {
        primaries: Primaries::DISPLAY_P3,
        white: D65,
        transfer: Transfer::Srgb,
    };

    /// BT.709 with the camera OETF.
    pub const REC709: Self = Self {
        primaries: Primaries::BT709,
        white: D65,
        transfer: Transfer::Bt709,
    };

    /// BT.2020 SDR (BT.709 camera OETF).
    pub const REC2020: Self = Self {
        primaries: Primaries::BT2020,
        white: D65,
        transfer: Transfer::Bt709,
    };

    /// BT.2020 with PQ.
    pub const REC2020_PQ: Self = Self {
        primaries: Primaries::BT2020,
        white: D65,
        transfer: Transfer::Pq,
    };

    /// BT.2020 with HLG.
    pub const REC2020_HLG: Self = Self {
        primaries: Primaries::BT2020,
        white: D65,
        transfer: Transfer::Hlg,
    };

    /// Linear BT.2020, D65. The working space of every intermediate rendering.
    pub const BT2020_LINEAR: Self = Self {
        primaries: Primaries::BT2020,
        white: D65,
        transfer: Transfer::Linear,
    };

    /// Same primaries and white, different transfer.
    pub const fn with_transfer(self, transfer: Transfer) -> Self {
        Self { transfer, ..self }
    }

    /// RGB (linear) → XYZ at this space's own white.
    pub fn rgb_to_xyz(&self) -> Option<Matrix3> {
        rgb_to_xyz_matrix(&self.primaries, self.white)
    }
}

/// xy chromaticity → XYZ with Y = 1.
#[inline]
pub fn xy_to_xyz(xy: Chromaticity) -> [f64; 3] {
    let [x, y] = xy;
    if y.abs() < 1e-12 {
        return [0.0, 0.0, 0.0];
    }
    [x / y, 1.0, (1.0 - x - y) / y]
}

/// Derive the linear RGB → XYZ matrix from primaries and white point.
///
/// Returns `None` if the primaries are degenerate.
pub fn rgb_to_xyz_matrix(primaries: &Primaries, white: Chromaticity) -> Option<Matrix3> {
    let r = xy_to_xyz(primaries.red);
    let g = xy_to_xyz(primaries.green);
    let b = xy_to_xyz(primaries.blue);
    let m = Matrix3::from_columns(r, g, b);
    let s = m.inverse()?.transform(xy_to_xyz(white));
    Some(m.multiply(&Matrix3::diagonal(s)))
}

const BRADFORD: Matrix3 = Matrix3([
    [0.8951, 0.2664, -0.1614],
    [-0.7502, 1.7135, 0.0367],
    [0.0389, -0.0685, 1.0296],
]);

/// Bradford chromatic adaptation from `src` white to `dst` white (XYZ).
pub fn bradford_adaptation(src: [f64; 3], dst: [f64; 3]) -> Option<Matrix3> {
    let inv = BRADFORD.inverse()?;
    let s = BRADFORD.transform(src);
    let d = BRADFORD.transform(dst);
    if s.iter().any(|v| v.abs() < 1e-12) {
        return None;
    }
    let scale = Matrix3::diagonal([d[0] / s[0], d[1] / s[1], d[2] / s[2]]);
    Some(inv.multiply(&scale).multiply(&BRADFORD))
}

/// Linear RGB in `src` → linear RGB in `dst`, adapting white points.
pub fn conversion_matrix(src: &ColorSpace, dst: &ColorSpace) -> Option<Matrix3> {
    let src_to_xyz = src.rgb_to_xyz()?;
    let xyz_to_dst = dst.rgb_to_xyz()?.inverse()?;
    if src.white == dst.white {
        return Some(xyz_to_dst.multiply(&src_to_xyz));
    }
    let adapt = bradford_adaptation(xy_to_xyz(src.white), xy_to_xyz(dst.white))?;
    Some(xyz_to_dst.multiply(&adapt).multiply(&src_to_xyz))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_srgb_matrix_matches_standard() {
        let m = ColorSpace::SRGB.rgb_to_xyz().unwrap();
        // IEC 61966-2-1 reference values
        assert!((m.0[0][0] - 0.4124564).abs() < 1e-4);
        assert!((m.0[1][1] - 0.7151522).abs() < 1e-4);
        assert!((m.0[2][2] - 0.9503041).abs() < 1e-4);
    }

    #[test]
    fn test_white_maps_to_white_point() {
        let m = ColorSpace::BT2020_LINEAR.rgb_to_xyz().unwrap();
        let xyz = m.transform([1.0, 1.0, 1.0]);
        let expected = xy_to_xyz(D65);
        for c in 0..3 {
            assert!((xyz[c] - expected[c]).abs() < 1e-9);
        }
    }

    #[test]
    fn test_bt709_to_bt2020_matches_published() {
        let m = conversion_matrix(&ColorSpace::SRGB, &ColorSpace::BT2020_LINEAR).unwrap();
        // BT.2087 Table 2
        assert!((m.0[0][0] - 0.6274).abs() < 1e-3, "{}", m.0[0][0]);
        assert!((m.0[0][1] - 0.3293).abs() < 1e-3, "{}", m.0[0][1]);
        assert!((m.0[2][2] - 0.8956).abs() < 1e-3, "{}", m.0[2][2]);
    }

    #[test]
    fn test_bradford_identity_for_same_white() {
        let w = xy_to_xyz(D65);
        let m = bradford_adaptation(w, w).unwrap();
        assert!(m.max_abs_diff(&Matrix3::IDENTITY) < 1e-12);
    }

    #[test]
    fn test_bradford_d65_to_d50() {
        let m = bradford_adaptation(xy_to_xyz(D65), D50_XYZ).unwrap();
        let adapted = m.transform(xy_to_xyz(D65));
        for c in 0..3 {
            assert!((adapted[c] - D50_XYZ[c]).abs() < 1e-9);
        }
    }
}
