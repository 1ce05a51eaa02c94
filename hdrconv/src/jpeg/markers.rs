//! JPEG marker walking and APP segment handling.

use hdrconv_core::{Error, Result};

/// Start of Image.
pub const SOI: u8 = 0xD8;
/// End of Image.
pub const EOI: u8 = 0xD9;
/// Start of Scan.
pub const SOS: u8 = 0xDA;
/// APP1 (EXIF/XMP).
pub const APP1: u8 = 0xE1;
/// APP2 (ICC/MPF).
pub const APP2: u8 = 0xE2;

/// XMP APP1 identifier.
pub const XMP_IDENTIFIER: &[u8] = b"http://ns.adobe.com/xap/1.0/\0";
/// Extended XMP APP1 identifier.
pub const XMP_EXTENSION_IDENTIFIER: &[u8] = b"http://ns.adobe.com/xmp/extension/\0";
/// MPF APP2 identifier.
pub const MPF_IDENTIFIER: &[u8] = b"MPF\0";

/// Markers that carry no length field.
#[inline]
pub fn is_standalone(marker: u8) -> bool {
    matches!(marker, 0x00 | 0x01 | SOI | EOI) || (0xD0..=0xD7).contains(&marker)
}

/// An APP segment found in a JPEG header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppSegment {
    /// Full marker byte (0xE0-0xEF).
    pub marker: u8,
    /// Offset of the 0xFF marker byte within the stream.
    pub offset: usize,
    /// Payload (excluding marker and length bytes).
    pub payload: Vec<u8>,
}

impl AppSegment {
    /// Total size on disk: marker, length and payload.
    pub fn encoded_len(&self) -> usize {
        4 + self.payload.len()
    }

    /// APP1 carrying a standard XMP packet.
    pub fn is_xmp(&self) -> bool {
        self.marker == APP1 && self.payload.starts_with(XMP_IDENTIFIER)
    }

    /// APP1 carrying an extended XMP chunk.
    pub fn is_extended_xmp(&self) -> bool {
        self.marker == APP1 && self.payload.starts_with(XMP_EXTENSION_IDENTIFIER)
    }

    /// APP2 carrying an MPF directory.
    pub fn is_mpf(&self) -> bool {
        self.marker == APP2 && self.payload.starts_with(MPF_IDENTIFIER)
    }

    /// APP2 carrying an ICC profile chunk.
    pub fn is_icc(&self) -> bool {
        self.marker == APP2 && self.payload.starts_with(super::icc::ICC_IDENTIFIER)
    }
}

/// Collect the APP segments of one JPEG stream's header region.
///
/// Scanning stops at SOS. A segment whose declared length runs past the
/// buffer is skipped and the scan resumes at the next `0xFF`.
pub fn scan_app_segments(stream: &[u8]) -> Vec<AppSegment> {
    let mut segments = Vec::new();
    if stream.len() < 4 || stream[0] != 0xFF || stream[1] != SOI {
        return segments;
    }

    let mut pos = 2;
    while pos + 1 < stream.len() {
        if stream[pos] != 0xFF {
            pos += 1;
            continue;
        }
        let marker = stream[pos + 1];
        if marker == 0xFF {
            // Fill byte
            pos += 1;
            continue;
        }
        if marker == SOS || marker == EOI {
            break;
        }
        if is_standalone(marker) {
            pos += 2;
            continue;
        }
        if pos + 4 > stream.len() {
            break;
        }

        let length = u16::from_be_bytes([stream[pos + 2], stream[pos + 3]]) as usize;
        if length < 2 || pos + 2 + length > stream.len() {
            log::debug!(
                "skipping malformed segment 0x{:02X} at offset {} (length {})",
                marker,
                pos,
                length
            );
            pos += 2;
            continue;
        }

        if (0xE0..=0xEF).contains(&marker) {
            segments.push(AppSegment {
                marker,
                offset: pos,
                payload: stream[pos + 4..pos + 2 + length].to_vec(),
            });
        }
        pos += 2 + length;
    }

    segments
}

/// Copy `stream`, dropping header APP segments matched by `drop`.
///
/// Everything from SOS onwards is copied verbatim.
pub fn strip_app_segments(stream: &[u8], drop: impl Fn(&AppSegment) -> bool) -> Result<Vec<u8>> {
    expect_soi(stream)?;
    let mut out = Vec::with_capacity(stream.len());
    let mut copied = 0;
    for segment in scan_app_segments(stream) {
        if drop(&segment) {
            out.extend_from_slice(&stream[copied..segment.offset]);
            copied = segment.offset + segment.encoded_len();
        }
    }
    out.extend_from_slice(&stream[copied..]);
    Ok(out)
}

/// Offset at which [`insert_after_soi`] places new segments: after SOI,
/// or after a JFIF APP0 that directly follows it.
pub fn insertion_point(stream: &[u8]) -> Result<usize> {
    expect_soi(stream)?;
    Ok(scan_app_segments(stream)
        .into_iter()
        .find(|s| s.offset == 2 && s.marker == 0xE0)
        .map_or(2, |app0| app0.offset + app0.encoded_len()))
}

/// Insert pre-encoded marker segments directly after SOI.
///
/// A leading JFIF APP0 is kept in front of the inserted segments.
pub fn insert_after_soi(stream: &[u8], segments: &[Vec<u8>]) -> Result<Vec<u8>> {
    let split = insertion_point(stream)?;
    let extra: usize = segments.iter().map(Vec::len).sum();
    let mut out = Vec::with_capacity(stream.len() + extra);
    out.extend_from_slice(&stream[..split]);
    for segment in segments {
        out.extend_from_slice(segment);
    }
    out.extend_from_slice(&stream[split..]);
    Ok(out)
}

/// Encode one marker segment (marker, big-endian length, payload).
pub fn encode_segment(marker: u8, payload: &[u8]) -> Result<Vec<u8>> {
    let length = payload.len() + 2;
    if length > u16::MAX as usize {
        return Err(Error::LimitExceeded(format!(
            "segment payload of {} bytes does not fit one marker",
            payload.len()
        )));
    }
    let mut out = Vec::with_capacity(2 + length);
    out.push(0xFF);
    out.push(marker);
    out.extend_from_slice(&(length as u16).to_be_bytes());
    out.extend_from_slice(payload);
    Ok(out)
}

fn expect_soi(stream: &[u8]) -> Result<()> {
    if stream.len() < 2 || stream[0] != 0xFF || stream[1] != SOI {
        return Err(Error::Format("not a JPEG stream (missing SOI)".into()));
    }
    Ok(())
}
