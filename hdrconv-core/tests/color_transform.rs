//! ICC-driven colour transform tests.
//!
//! Profiles are assembled byte by byte so the parser sees exactly the tag
//! layouts a camera or display profile would carry.

mod common;

use approx::assert_abs_diff_eq;
use common::{build_profile, gamma_tag, identity_colorants, para_tag, sf32_tag, xyz_tag};
use hdrconv_core::color::gamut::{bradford_adaptation, xy_to_xyz, D50_XYZ};
use hdrconv_core::icc::ProfileBuilder;
use hdrconv_core::{ColorSpace, Error, IccProfile, Matrix3, ToneCurve};

// ============================================================================
// Tone curve selection
// ============================================================================

/// A profile whose only curve is gTRC (gamma 2.2) linearises 0.5 to 0.5^2.2
/// before the matrices are applied.
#[test]
fn test_green_trc_gamma_with_identity_chad() {
    let mut tags = identity_colorants();
    tags.push((b"chad", sf32_tag(&Matrix3::IDENTITY)));
    tags.push((b"gTRC", gamma_tag(2.2)));
    let profile = IccProfile::parse(&build_profile(&tags)).unwrap();

    assert!(profile.channel_curves.is_none());
    assert!(matches!(profile.tone_curve, Some(ToneCurve::Gamma(_))));

    let transform = profile.transform();
    let linear = transform.linearize([0.5, 0.5, 0.5]).unwrap();
    for v in linear {
        assert_abs_diff_eq!(v, 0.2176, epsilon = 1e-3);
    }

    // Identity matrices leave the linearised value untouched.
    let xyz = transform.to_reference_white_xyz([0.5, 0.5, 0.5], true).unwrap();
    for (a, b) in xyz.iter().zip(linear.iter()) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-4);
    }
}

/// rTRC wins over gTRC when choosing the representative curve.
#[test]
fn test_red_trc_preferred() {
    let tags = vec![
        (b"rTRC", gamma_tag(1.8)),
        (b"gTRC", gamma_tag(2.2)),
    ];
    let profile = IccProfile::parse(&build_profile(&tags)).unwrap();
    assert_eq!(profile.tone_curve, Some(ToneCurve::Gamma(461.0 / 256.0)));
}

// ============================================================================
// Round-trip law
// ============================================================================

/// sRGB-like parametric profile with a real Bradford chad survives
/// RGB → XYZ → RGB within 1e-3 everywhere on a grid.
#[test]
fn test_parametric_profile_roundtrip() {
    let white = xy_to_xyz(ColorSpace::SRGB.white);
    let chad = bradford_adaptation(white, D50_XYZ).unwrap();
    let colorant = chad.multiply(&ColorSpace::SRGB.rgb_to_xyz().unwrap());

    let trc = para_tag(3, &[2.4, 1.0 / 1.055, 0.055 / 1.055, 1.0 / 12.92, 0.04045]);
    let tags = vec![
        (b"rXYZ", xyz_tag(colorant.column(0))),
        (b"gXYZ", xyz_tag(colorant.column(1))),
        (b"bXYZ", xyz_tag(colorant.column(2))),
        (b"chad", sf32_tag(&chad)),
        (b"rTRC", trc.clone()),
        (b"gTRC", trc.clone()),
        (b"bTRC", trc),
    ];
    let transform = IccProfile::parse(&build_profile(&tags)).unwrap().transform();
    assert!(transform.is_invertible());

    let steps = 10;
    for r in 0..=steps {
        for g in 0..=steps {
            for b in 0..=steps {
                let rgb = [
                    r as f64 / steps as f64,
                    g as f64 / steps as f64,
                    b as f64 / steps as f64,
                ];
                let xyz = transform.to_reference_white_xyz(rgb, true).unwrap();
                let back = transform.from_reference_white_xyz(xyz, true).unwrap();
                for c in 0..3 {
                    assert_abs_diff_eq!(back[c], rgb[c], epsilon = 1e-3);
                }
            }
        }
    }
}

/// White maps to the device white (D65), not the PCS white.
#[test]
fn test_white_lands_on_device_white() {
    let bytes = ProfileBuilder::new(ColorSpace::DISPLAY_P3).build();
    let transform = IccProfile::parse(&bytes).unwrap().transform();
    let xyz = transform.to_reference_white_xyz([1.0, 1.0, 1.0], true).unwrap();
    let d65 = xy_to_xyz(ColorSpace::DISPLAY_P3.white);
    for c in 0..3 {
        assert_abs_diff_eq!(xyz[c], d65[c], epsilon = 2e-3);
    }
}

// ============================================================================
// Missing capabilities
// ============================================================================

#[test]
fn test_missing_chad_fails_both_directions() {
    let mut tags = identity_colorants();
    tags.push((b"rTRC", gamma_tag(2.2)));
    let transform = IccProfile::parse(&build_profile(&tags)).unwrap().transform();

    let err = transform.to_reference_white_xyz([0.5; 3], true).unwrap_err();
    assert!(matches!(err, Error::Capability(ref m) if m.contains("chad")));
    let err = transform.from_reference_white_xyz([0.5; 3], true).unwrap_err();
    assert!(matches!(err, Error::Capability(ref m) if m.contains("chad")));
}

/// Two of three colorant tags do not make a matrix.
#[test]
fn test_partial_colorants_are_absent() {
    let tags = vec![
        (b"rXYZ", xyz_tag([0.4, 0.2, 0.0])),
        (b"gXYZ", xyz_tag([0.3, 0.7, 0.1])),
        (b"chad", sf32_tag(&Matrix3::IDENTITY)),
    ];
    let profile = IccProfile::parse(&build_profile(&tags)).unwrap();
    assert!(profile.colorant_matrix.is_none());
    let err = profile
        .transform()
        .to_reference_white_xyz([0.5; 3], false)
        .unwrap_err();
    assert!(matches!(err, Error::Capability(ref m) if m.contains("colorant")));
}

/// A malformed curve tag is treated as absent, not as a parse failure.
#[test]
fn test_malformed_tag_degrades() {
    let mut tags = identity_colorants();
    tags.push((b"rTRC", b"curv\0\0\0\0\0\0\0\x09".to_vec()));
    let profile = IccProfile::parse(&build_profile(&tags)).unwrap();
    assert!(profile.tone_curve.is_none());
    assert!(profile.colorant_matrix.is_some());
}
