//! ICC profile chunking across JPEG APP2 markers.

use super::markers::{scan_app_segments, APP2};
use hdrconv_core::{limits, Error, Result};

/// ICC profile APP2 identifier.
pub const ICC_IDENTIFIER: &[u8] = b"ICC_PROFILE\0";

/// Largest profile slice one APP2 marker can carry.
const MAX_CHUNK: usize = 65533 - ICC_IDENTIFIER.len() - 2;

/// Embed ICC profile data into JPEG APP2 marker(s).
///
/// Large profiles are split; chunk sequence numbers are 1-based.
pub fn create_icc_markers(icc_data: &[u8]) -> Result<Vec<Vec<u8>>> {
    let chunks: Vec<&[u8]> = icc_data.chunks(MAX_CHUNK).collect();
    if chunks.len() > u8::MAX as usize {
        return Err(Error::LimitExceeded(format!(
            "ICC profile of {} bytes needs more than 255 APP2 chunks",
            icc_data.len()
        )));
    }
    let total = chunks.len() as u8;

    Ok(chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| {
            let length = 2 + ICC_IDENTIFIER.len() + 2 + chunk.len();
            let mut marker = Vec::with_capacity(2 + length);
            marker.extend_from_slice(&[0xFF, APP2]);
            marker.extend_from_slice(&(length as u16).to_be_bytes());
            marker.extend_from_slice(ICC_IDENTIFIER);
            marker.push((i + 1) as u8);
            marker.push(total);
            marker.extend_from_slice(chunk);
            marker
        })
        .collect())
}

/// Reassemble the ICC profile from one JPEG stream's APP2 chunks.
///
/// Chunks are ordered by sequence number. Returns `None` when the stream
/// carries no profile or the reassembled profile exceeds the size limit.
pub fn extract_icc_profile(stream: &[u8]) -> Option<Vec<u8>> {
    let mut chunks: Vec<(u8, Vec<u8>)> = scan_app_segments(stream)
        .into_iter()
        .filter(|s| s.is_icc() && s.payload.len() >= ICC_IDENTIFIER.len() + 2)
        .map(|s| {
            let seq = s.payload[ICC_IDENTIFIER.len()];
            (seq, s.payload[ICC_IDENTIFIER.len() + 2..].to_vec())
        })
        .collect();

    if chunks.is_empty() {
        return None;
    }
    chunks.sort_by_key(|(seq, _)| *seq);

    let size: usize = chunks.iter().map(|(_, c)| c.len()).sum();
    if size > limits::MAX_ICC_PROFILE_SIZE {
        log::warn!("ignoring {} byte embedded ICC profile", size);
        return None;
    }

    let mut profile = Vec::with_capacity(size);
    for (_, chunk) in chunks {
        profile.extend(chunk);
    }
    Some(profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jpeg::markers::insert_after_soi;

    fn empty_jpeg() -> Vec<u8> {
        vec![0xFF, 0xD8, 0xFF, 0xDA, 0x00, 0x02, 0xFF, 0xD9]
    }

    #[test]
    fn test_small_profile_single_marker() {
        let markers = create_icc_markers(&[7u8; 300]).unwrap();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0][2..4], (2u16 + 12 + 2 + 300).to_be_bytes());
        assert_eq!(markers[0][16], 1);
        assert_eq!(markers[0][17], 1);
    }

    #[test]
    fn test_chunked_profile_reassembles_in_order() {
        let profile: Vec<u8> = (0..150_000u32).map(|i| (i % 251) as u8).collect();
        let mut markers = create_icc_markers(&profile).unwrap();
        assert_eq!(markers.len(), 3);

        // Writers are free to emit chunks out of order.
        markers.swap(0, 2);
        let jpeg = insert_after_soi(&empty_jpeg(), &markers).unwrap();
        assert_eq!(extract_icc_profile(&jpeg).unwrap(), profile);
    }

    #[test]
    fn test_no_profile() {
        assert!(extract_icc_profile(&empty_jpeg()).is_none());
    }
}
