//! Container splitting on real encoder output.

mod common;

use common::{apple_style_jpeg, plain_jpeg, ultrahdr_bytes};
use hdrconv::jpeg::mpf::{absolute_offset, parse_mpf};
use hdrconv::jpeg::{extract_icc_profile, scan_app_segments, split_container, split_streams, SplitOutcome};
use hdrconv::IccProfile;

// ============================================================================
// Stream boundaries
// ============================================================================

/// Two concatenated JPEGs split into exactly two sub-streams at the seam.
#[test]
fn test_two_concatenated_streams() {
    let a = plain_jpeg(16, 16, 40);
    let b = plain_jpeg(8, 8, 200);
    let data = [a.clone(), b.clone()].concat();

    let streams = split_streams(&data);
    assert_eq!(streams.len(), 2);
    assert_eq!(streams[0].data, &a[..]);
    assert_eq!(streams[1].offset, a.len());
    assert_eq!(streams[1].data, &b[..]);
}

/// A single JPEG is never reported as two-layer.
#[test]
fn test_single_stream_not_two_layer() {
    let data = plain_jpeg(16, 16, 128);
    match split_container(&data) {
        SplitOutcome::NotTwoLayer { streams, .. } => assert_eq!(streams.len(), 1),
        SplitOutcome::TwoLayer(_) => panic!("single JPEG split as two-layer"),
    }
}

/// Trailing garbage after the last EOI is ignored.
#[test]
fn test_trailing_bytes_ignored() {
    let mut data = [plain_jpeg(8, 8, 10), plain_jpeg(8, 8, 20)].concat();
    data.extend_from_slice(&[0x00, 0x11, 0xFF, 0x00]);
    assert_eq!(split_streams(&data).len(), 2);
}

// ============================================================================
// Written Ultra HDR files
// ============================================================================

/// Written files split into two layers carrying hdrgm parameters.
#[test]
fn test_written_file_is_two_layer() {
    let data = ultrahdr_bytes(32, 16, 4.0);
    let SplitOutcome::TwoLayer(layers) = split_container(&data) else {
        panic!("written file did not split as two-layer");
    };
    assert_eq!(layers.primary.offset, 0);
    assert_eq!(layers.gainmap.offset, layers.primary.data.len());
    assert!(layers.attributes.has_gainmap_keys());
}

/// The MPF directory agrees with the split boundaries.
#[test]
fn test_mpf_directory_matches_split() {
    let data = ultrahdr_bytes(32, 16, 4.0);
    let streams = split_streams(&data);
    let mpf = scan_app_segments(streams[0].data)
        .into_iter()
        .find(|s| s.is_mpf())
        .expect("primary carries an MPF segment");
    let entries = parse_mpf(&mpf).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].offset, 0);
    assert_eq!(entries[1].size as usize, streams[1].data.len());
    assert_eq!(absolute_offset(&entries[1], &mpf), streams[1].offset);
}

/// The embedded ICC profile parses and describes RGB.
#[test]
fn test_embedded_profile_parses() {
    let data = ultrahdr_bytes(16, 16, 2.0);
    let streams = split_streams(&data);
    let icc = extract_icc_profile(streams[0].data).expect("ICC profile");
    let profile = IccProfile::parse(&icc).unwrap();
    assert!(profile.is_rgb());
    assert!(profile.transform().rgb_to_device_xyz().is_ok());
}

// ============================================================================
// Apple-style JPEG
// ============================================================================

/// Headroom-only metadata does not make an ISO two-layer container, but the
/// headroom is still found on the second stream.
#[test]
fn test_apple_style_headroom() {
    let data = apple_style_jpeg(128, 255, 3.0);
    let SplitOutcome::NotTwoLayer { streams, .. } = split_container(&data) else {
        panic!("headroom-only file split as ISO two-layer");
    };
    assert_eq!(streams.len(), 2);
    let headroom = streams[1].apple_headroom().unwrap();
    assert!((headroom - 3.0).abs() < 1e-6);
}
