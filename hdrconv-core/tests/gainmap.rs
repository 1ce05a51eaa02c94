//! Gain map encode/decode tests on synthetic images.

mod common;

use approx::assert_abs_diff_eq;
use common::{hdr_gradient, solid_plane, solid_rgb8};
use hdrconv_core::gainmap::{apply_gainmap_headroom, apply_gainmap_iso, compute_gainmap};
use hdrconv_core::metadata::apple::{resolve_headroom, AppleHdrMetadata};
use hdrconv_core::metadata::xmp::{generate_gainmap_xmp, read_namespace_properties, HDRGM_NAMESPACE};
use hdrconv_core::metadata::{attributes_for, metadata_from_attributes};
use hdrconv_core::{ColorSpace, EncodeConfig, GainmapMetadata, ImageRole, PerChannel, Transfer};

/// Encoding then decoding reproduces the HDR input away from the clipped
/// percentile tails.
#[test]
fn test_encode_decode_gradient() {
    let (w, h) = (64, 4);
    let hdr = hdr_gradient(w, h, 6.0);
    let enc = compute_gainmap(&hdr, w, h, None, ColorSpace::SRGB, &EncodeConfig::default()).unwrap();
    let decoded = apply_gainmap_iso(&enc.baseline, &enc.gainmap, &enc.metadata).unwrap();

    for x in 8..56 {
        let i = x * 3;
        let rel = (decoded[i] - hdr[i]).abs() / hdr[i];
        assert!(rel < 0.03, "x={}: {} vs {}", x, decoded[i], hdr[i]);
    }
}

/// Gamma other than 1 is undone exactly by the decoder.
#[test]
fn test_encode_decode_with_gamma() {
    let (w, h) = (32, 2);
    let hdr = hdr_gradient(w, h, 3.0);
    let config = EncodeConfig::default().with_gamma(2.0);
    let enc = compute_gainmap(&hdr, w, h, None, ColorSpace::SRGB, &config).unwrap();
    assert_eq!(enc.metadata.gainmap_gamma.get(1), 2.0);
    let decoded = apply_gainmap_iso(&enc.baseline, &enc.gainmap, &enc.metadata).unwrap();
    for x in 6..26 {
        let i = x * 3;
        let rel = (decoded[i] - hdr[i]).abs() / hdr[i];
        assert!(rel < 0.05, "x={}: {} vs {}", x, decoded[i], hdr[i]);
    }
}

/// Metadata written to XMP and read back decodes identically.
#[test]
fn test_metadata_survives_xmp() {
    let (w, h) = (16, 2);
    let hdr = hdr_gradient(w, h, 4.0);
    let enc = compute_gainmap(&hdr, w, h, None, ColorSpace::SRGB, &EncodeConfig::default()).unwrap();

    let xmp = generate_gainmap_xmp(&attributes_for(&enc.metadata));
    let attrs = read_namespace_properties(xmp.as_bytes(), HDRGM_NAMESPACE).unwrap();
    let parsed = metadata_from_attributes(&attrs).unwrap();

    let a = apply_gainmap_iso(&enc.baseline, &enc.gainmap, &enc.metadata).unwrap();
    let b = apply_gainmap_iso(&enc.baseline, &enc.gainmap, &parsed).unwrap();
    for (x, y) in a.iter().zip(&b) {
        assert_abs_diff_eq!(*x, *y, epsilon = 1e-3);
    }
}

/// Apple-style container: sRGB-encoded P3 base, BT.709-encoded gain map,
/// headroom from maker notes.
#[test]
fn test_headroom_variant() {
    let headroom = resolve_headroom(None, Some(AppleHdrMetadata::new(2.0, 1.0)));
    assert_abs_diff_eq!(headroom, 4.0, epsilon = 1e-4);

    let base = solid_rgb8(4, 4, [255, 255, 255], ColorSpace::DISPLAY_P3, ImageRole::Sdr);
    let gain = solid_plane(2, 2, 255, ColorSpace::REC709, ImageRole::Gainmap);
    let hdr = apply_gainmap_headroom(&base, &gain, headroom).unwrap();
    assert_eq!(hdr.len(), 4 * 4 * 3);
    for v in hdr {
        assert_abs_diff_eq!(v, 4.0, epsilon = 1e-3);
    }
}

/// The ISO decode uses the baseline's declared transfer.
#[test]
fn test_iso_decode_linearises_base() {
    let srgb = solid_rgb8(1, 1, [128; 3], ColorSpace::SRGB, ImageRole::Sdr);
    let linear = solid_rgb8(
        1,
        1,
        [128; 3],
        ColorSpace::SRGB.with_transfer(Transfer::Linear),
        ImageRole::Sdr,
    );
    let gain = solid_plane(1, 1, 0, ColorSpace::REC709, ImageRole::Gainmap);
    let mut m = GainmapMetadata::new();
    m.baseline_offset = PerChannel::Uniform(0.0);
    m.alternate_offset = PerChannel::Uniform(0.0);

    let a = apply_gainmap_iso(&srgb, &gain, &m).unwrap();
    let b = apply_gainmap_iso(&linear, &gain, &m).unwrap();
    assert_abs_diff_eq!(a[0], 0.2158, epsilon = 1e-3);
    assert_abs_diff_eq!(b[0], 128.0 / 255.0, epsilon = 1e-5);
}
