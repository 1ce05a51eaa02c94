//! Linear RGB conversion between an image's space and the working space.
//!
//! An embedded ICC profile with usable colorant and adaptation matrices
//! takes precedence over the declared primaries.

use hdrconv_core::color::gamut::conversion_matrix;
use hdrconv_core::{ColorSpace, Error, IccProfile, IntermediateRendering, Matrix3, Result};

const WORKING: ColorSpace = IntermediateRendering::COLOR_SPACE;

/// Linear RGB in `space` (or the space `icc` describes) → working space.
pub fn to_working_matrix(space: &ColorSpace, icc: Option<&[u8]>) -> Result<Matrix3> {
    if let Some(m) = icc.and_then(profile_to_working) {
        return Ok(m);
    }
    conversion_matrix(space, &WORKING)
        .ok_or_else(|| Error::Capability("declared primaries have no RGB→XYZ matrix".into()))
}

/// Working space → linear RGB in `space`.
pub fn from_working_matrix(space: &ColorSpace) -> Result<Matrix3> {
    conversion_matrix(&WORKING, space)
        .ok_or_else(|| Error::Capability("declared primaries have no RGB→XYZ matrix".into()))
}

fn profile_to_working(icc: &[u8]) -> Option<Matrix3> {
    let profile = match IccProfile::parse(icc) {
        Ok(p) if p.is_rgb() => p,
        Ok(_) => {
            log::debug!("embedded ICC profile is not RGB, using declared primaries");
            return None;
        }
        Err(e) => {
            log::debug!("unreadable embedded ICC profile ({}), using declared primaries", e);
            return None;
        }
    };
    let rgb_to_xyz = match profile.transform().rgb_to_device_xyz() {
        Ok(m) => m,
        Err(e) => {
            log::debug!("ICC profile unusable for conversion: {}", e);
            return None;
        }
    };
    let xyz_to_working = WORKING.rgb_to_xyz()?.inverse()?;
    Some(xyz_to_working.multiply(&rgb_to_xyz))
}

/// Apply a 3×3 matrix to interleaved RGB in place.
pub fn convert_in_place(data: &mut [f32], m: &Matrix3) {
    for px in data.chunks_exact_mut(3) {
        let out = m.transform_f32([px[0], px[1], px[2]]);
        px.copy_from_slice(&out);
    }
}
