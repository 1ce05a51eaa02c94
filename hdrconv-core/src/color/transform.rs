//! RGB ↔ XYZ conversion driven by an ICC matrix/TRC profile.
//!
//! The forward path is `chad⁻¹ · colorant · trc(rgb)`: device RGB through
//! the PCS (D50) and back to the profile's own white. The reverse path is
//! its exact algebraic inverse, clamping out-of-gamut RGB to `[0,1]`.

use super::curve::ToneCurve;
use super::matrix::Matrix3;
use crate::icc::IccProfile;
use crate::types::{Error, Result};

/// A colour transform built from a profile's matrices and curves.
#[derive(Debug, Clone)]
pub struct ColorTransform {
    colorant: Option<Matrix3>,
    colorant_inv: Option<Matrix3>,
    chad: Option<Matrix3>,
    chad_inv: Option<Matrix3>,
    curves: Option<[ToneCurve; 3]>,
}

impl ColorTransform {
    /// Build from explicit parts. Missing parts limit which operations work.
    pub fn new(
        colorant: Option<Matrix3>,
        chad: Option<Matrix3>,
        curves: Option<[ToneCurve; 3]>,
    ) -> Self {
        Self {
            colorant_inv: colorant.and_then(|m| m.inverse()),
            chad_inv: chad.and_then(|m| m.inverse()),
            colorant,
            chad,
            curves,
        }
    }

    /// Build from a parsed profile.
    pub fn from_profile(profile: &IccProfile) -> Self {
        Self::new(
            profile.colorant_matrix,
            profile.chromatic_adaptation,
            profile.curves(),
        )
    }

    /// True when both matrices and their inverses are available.
    pub fn is_invertible(&self) -> bool {
        self.colorant_inv.is_some() && self.chad_inv.is_some()
    }

    /// Linear device RGB → XYZ at the device white, as one matrix.
    pub fn rgb_to_device_xyz(&self) -> Result<Matrix3> {
        let (colorant, _) = self.colorant_pair()?;
        let (_, chad_inv) = self.chad_pair()?;
        Ok(chad_inv.multiply(&colorant))
    }

    /// Apply the tone curves to each channel (encoded → linear).
    pub fn linearize(&self, rgb: [f64; 3]) -> Result<[f64; 3]> {
        let curves = self.curves()?;
        Ok([
            curves[0].evaluate(rgb[0]),
            curves[1].evaluate(rgb[1]),
            curves[2].evaluate(rgb[2]),
        ])
    }

    /// Apply the inverse tone curves to each channel (linear → encoded).
    pub fn delinearize(&self, rgb: [f64; 3]) -> Result<[f64; 3]> {
        let curves = self.curves()?;
        Ok([
            curves[0].invert(rgb[0])?,
            curves[1].invert(rgb[1])?,
            curves[2].invert(rgb[2])?,
        ])
    }

    /// Device RGB → XYZ relative to the device's reference white.
    pub fn to_reference_white_xyz(&self, rgb: [f64; 3], linearize: bool) -> Result<[f64; 3]> {
        let (colorant, _) = self.colorant_pair()?;
        let (_, chad_inv) = self.chad_pair()?;
        let linear = if linearize { self.linearize(rgb)? } else { rgb };
        let pcs = colorant.transform(linear);
        Ok(chad_inv.transform(pcs))
    }

    /// XYZ relative to the device white → device RGB, clamped to `[0,1]`.
    pub fn from_reference_white_xyz(&self, xyz: [f64; 3], delinearize: bool) -> Result<[f64; 3]> {
        let (_, colorant_inv) = self.colorant_pair()?;
        let (chad, _) = self.chad_pair()?;
        let pcs = chad.transform(xyz);
        let rgb = colorant_inv.transform(pcs).map(|v| v.clamp(0.0, 1.0));
        if delinearize {
            self.delinearize(rgb)
        } else {
            Ok(rgb)
        }
    }

    fn colorant_pair(&self) -> Result<(Matrix3, Matrix3)> {
        let m = self.colorant.ok_or_else(|| {
            Error::Capability("profile has no colorant matrix (rXYZ/gXYZ/bXYZ)".into())
        })?;
        let inv = self
            .colorant_inv
            .ok_or_else(|| Error::Capability("colorant matrix is singular".into()))?;
        Ok((m, inv))
    }

    fn chad_pair(&self) -> Result<(Matrix3, Matrix3)> {
        let m = self.chad.ok_or_else(|| {
            Error::Capability("profile has no chromatic adaptation matrix (chad)".into())
        })?;
        let inv = self
            .chad_inv
            .ok_or_else(|| Error::Capability("chromatic adaptation matrix is singular".into()))?;
        Ok((m, inv))
    }

    fn curves(&self) -> Result<&[ToneCurve; 3]> {
        self.curves
            .as_ref()
            .ok_or_else(|| Error::Capability("profile has no tone reproduction curve".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::gamut::ColorSpace;

    fn srgb_like() -> ColorTransform {
        let colorant = ColorSpace::SRGB.rgb_to_xyz().unwrap();
        let chad = Matrix3([
            [1.0479, 0.0229, -0.0502],
            [0.0296, 0.9904, -0.0171],
            [-0.0092, 0.0151, 0.7519],
        ]);
        let c = ToneCurve::Gamma(2.2);
        ColorTransform::new(Some(colorant), Some(chad), Some([c.clone(), c.clone(), c]))
    }

    #[test]
    fn test_roundtrip_grid() {
        let t = srgb_like();
        let steps = 16;
        for r in 0..=steps {
            for g in 0..=steps {
                for b in 0..=steps {
                    let rgb = [
                        r as f64 / steps as f64,
                        g as f64 / steps as f64,
                        b as f64 / steps as f64,
                    ];
                    let xyz = t.to_reference_white_xyz(rgb, true).unwrap();
                    let back = t.from_reference_white_xyz(xyz, true).unwrap();
                    for c in 0..3 {
                        assert!(
                            (back[c] - rgb[c]).abs() < 1e-3,
                            "roundtrip of {:?} gave {:?}",
                            rgb,
                            back
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_missing_colorant_is_capability_error() {
        let t = ColorTransform::new(None, Some(Matrix3::IDENTITY), None);
        let err = t.to_reference_white_xyz([0.5; 3], false).unwrap_err();
        assert!(matches!(err, Error::Capability(ref m) if m.contains("colorant")));
        let err = t.from_reference_white_xyz([0.5; 3], false).unwrap_err();
        assert!(matches!(err, Error::Capability(ref m) if m.contains("colorant")));
    }

    #[test]
    fn test_missing_chad_is_capability_error() {
        let t = ColorTransform::new(Some(Matrix3::IDENTITY), None, None);
        let err = t.to_reference_white_xyz([0.5; 3], false).unwrap_err();
        assert!(matches!(err, Error::Capability(ref m) if m.contains("chad")));
        assert!(t.from_reference_white_xyz([0.5; 3], false).is_err());
    }

    /// No matrices at all: every matrix operation fails instead of
    /// falling back to identity.
    #[test]
    fn test_no_matrices_is_capability_error() {
        let t = ColorTransform::new(None, None, None);
        assert!(matches!(t.rgb_to_device_xyz(), Err(Error::Capability(_))));
        assert!(matches!(
            t.to_reference_white_xyz([1.0; 3], false),
            Err(Error::Capability(_))
        ));
        assert!(!t.is_invertible());
    }

    #[test]
    fn test_linearize_without_curve_fails() {
        let t = ColorTransform::new(Some(Matrix3::IDENTITY), Some(Matrix3::IDENTITY), None);
        assert!(t.to_reference_white_xyz([0.5; 3], false).is_ok());
        assert!(matches!(
            t.to_reference_white_xyz([0.5; 3], true),
            Err(Error::Capability(_))
        ));
    }

    /// Out-of-gamut XYZ is clamped, not wrapped.
    #[test]
    fn test_out_of_gamut_is_clamped() {
        let t = srgb_like();
        let xyz = t.to_reference_white_xyz([1.0, 1.0, 1.0], false).unwrap();
        let bright = xyz.map(|v| v * 4.0);
        let rgb = t.from_reference_white_xyz(bright, false).unwrap();
        assert_eq!(rgb, [1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_singular_colorant() {
        let singular = Matrix3([[1.0, 1.0, 1.0], [1.0, 1.0, 1.0], [1.0, 1.0, 1.0]]);
        let t = ColorTransform::new(Some(singular), Some(Matrix3::IDENTITY), None);
        assert!(!t.is_invertible());
        assert!(t.rgb_to_device_xyz().is_err());
    }
}
