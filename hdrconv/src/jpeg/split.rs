//! Splitting a multi-image JPEG file into its concatenated streams.
//!
//! Stream ends are found by walking marker segments rather than by looking
//! for the first `FF D9` byte pair: ICC sampled curves, MPF offsets and
//! EXIF thumbnails can all contain those bytes inside a segment payload.
//! Entropy-coded data is scanned for the first marker that is neither a
//! stuffed zero nor a restart marker. If a segment length is malformed the
//! walk falls back to a plain byte search for EOI.

use super::markers::{is_standalone, scan_app_segments, AppSegment, EOI, SOI, SOS};
use hdrconv_core::metadata::apple::headroom_from_xmp;
use hdrconv_core::metadata::xmp::{extract_gainmap_attributes, payload_xml, XmpAttributes};

/// One JPEG stream inside a larger buffer.
#[derive(Debug, Clone, Copy)]
pub struct SubStream<'a> {
    /// Offset of the stream's SOI marker in the containing buffer.
    pub offset: usize,
    /// Stream bytes, SOI through EOI inclusive.
    pub data: &'a [u8],
}

impl SubStream<'_> {
    /// APP segments in this stream's header.
    pub fn app_segments(&self) -> Vec<AppSegment> {
        scan_app_segments(self.data)
    }

    /// hdrgm gain map attributes from the first XMP segment carrying them.
    pub fn gainmap_attributes(&self) -> Option<XmpAttributes> {
        self.app_segments()
            .iter()
            .filter(|s| s.is_xmp())
            .find_map(|s| extract_gainmap_attributes(&s.payload))
    }

    /// Apple `HDRGainMapHeadroom` from the stream's XMP, if present and valid.
    pub fn apple_headroom(&self) -> Option<f32> {
        self.app_segments()
            .iter()
            .filter(|s| s.is_xmp())
            .find_map(|s| match headroom_from_xmp(payload_xml(&s.payload)) {
                Ok(headroom) => headroom,
                Err(e) => {
                    log::debug!("ignoring headroom in XMP: {}", e);
                    None
                }
            })
    }
}

/// Find every JPEG stream in `data`, in file order.
///
/// Streams never overlap: the search for the next SOI resumes after the
/// previous stream's EOI. A trailing SOI without a matching EOI is dropped.
pub fn split_streams(data: &[u8]) -> Vec<SubStream<'_>> {
    let mut streams = Vec::new();
    let mut pos = 0;

    while let Some(start) = find_soi(data, pos) {
        let Some(end) = find_stream_end(data, start) else {
            log::debug!("unterminated JPEG stream at offset {}", start);
            break;
        };
        streams.push(SubStream {
            offset: start,
            data: &data[start..end],
        });
        pos = end;
    }

    streams
}

/// Next SOI at or after `from`.
///
/// A real SOI is always followed by another marker, so the byte after
/// `FF D8` must be `FF`. Bare `FF D8` pairs in padding or trailing data
/// would otherwise open a bogus stream ending at the next stray `FF D9`.
fn find_soi(data: &[u8], from: usize) -> Option<usize> {
    data.get(from..)?
        .windows(3)
        .position(|w| w[0] == 0xFF && w[1] == SOI && w[2] == 0xFF)
        .map(|p| from + p)
}

/// Offset just past the EOI that ends the stream starting at `soi`.
pub fn find_stream_end(data: &[u8], soi: usize) -> Option<usize> {
    let mut pos = soi + 2;

    loop {
        if pos + 1 >= data.len() {
            return None;
        }
        if data[pos] != 0xFF {
            return scan_for_eoi(data, pos);
        }
        let marker = data[pos + 1];
        if marker == 0xFF {
            pos += 1;
            continue;
        }
        if marker == EOI {
            return Some(pos + 2);
        }
        if is_standalone(marker) {
            pos += 2;
            continue;
        }
        if pos + 4 > data.len() {
            return None;
        }

        let length = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        if length < 2 || pos + 2 + length > data.len() {
            log::debug!(
                "malformed segment 0x{:02X} at offset {}, falling back to EOI search",
                marker,
                pos
            );
            return scan_for_eoi(data, pos + 2);
        }
        pos += 2 + length;

        if marker == SOS {
            pos = skip_entropy_coded(data, pos);
        }
    }
}

/// Advance past entropy-coded data to the next real marker.
fn skip_entropy_coded(data: &[u8], mut pos: usize) -> usize {
    while pos + 1 < data.len() {
        if data[pos] == 0xFF {
            let next = data[pos + 1];
            // Stuffed zero, restart marker or fill byte
            if next == 0x00 || (0xD0..=0xD7).contains(&next) {
                pos += 2;
                continue;
            }
            if next != 0xFF {
                return pos;
            }
        }
        pos += 1;
    }
    data.len()
}

fn scan_for_eoi(data: &[u8], from: usize) -> Option<usize> {
    data.get(from..)?
        .windows(2)
        .position(|w| w[0] == 0xFF && w[1] == EOI)
        .map(|p| from + p + 2)
}

/// A recognised primary + gain map container.
#[derive(Debug, Clone)]
pub struct TwoLayer<'a> {
    /// Primary (SDR baseline) stream.
    pub primary: SubStream<'a>,
    /// Gain map stream.
    pub gainmap: SubStream<'a>,
    /// hdrgm attributes, from the gain map's XMP or else the primary's.
    pub attributes: XmpAttributes,
}

/// Result of examining a buffer as a two-layer container.
#[derive(Debug, Clone)]
pub enum SplitOutcome<'a> {
    /// Exactly two streams with recoverable gain map metadata.
    TwoLayer(TwoLayer<'a>),
    /// Anything else. Not an error: callers may still read the streams.
    NotTwoLayer {
        /// Streams that were found.
        streams: Vec<SubStream<'a>>,
        /// Why the buffer was not accepted.
        reason: String,
    },
}

impl SplitOutcome<'_> {
    /// True for [`SplitOutcome::TwoLayer`].
    pub fn is_two_layer(&self) -> bool {
        matches!(self, Self::TwoLayer(_))
    }
}

/// Split `data` and check it is a two-layer gain map container.
pub fn split_container(data: &[u8]) -> SplitOutcome<'_> {
    let streams = split_streams(data);
    if streams.len() != 2 {
        let reason = format!("found {} JPEG stream(s), expected 2", streams.len());
        return SplitOutcome::NotTwoLayer { streams, reason };
    }

    let (primary, gainmap) = (streams[0], streams[1]);
    match gainmap
        .gainmap_attributes()
        .or_else(|| primary.gainmap_attributes())
    {
        Some(attributes) => SplitOutcome::TwoLayer(TwoLayer {
            primary,
            gainmap,
            attributes,
        }),
        None => SplitOutcome::NotTwoLayer {
            streams,
            reason: "no hdrgm gain map metadata in any APP1 segment".into(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jpeg::markers::{encode_segment, APP1, APP2, XMP_IDENTIFIER};

    /// Tiny stream: SOI, the given segments, SOS with a short scan, EOI.
    fn stream(segments: &[Vec<u8>], scan: &[u8]) -> Vec<u8> {
        let mut s = vec![0xFF, SOI];
        for seg in segments {
            s.extend_from_slice(seg);
        }
        s.extend_from_slice(&[0xFF, SOS, 0x00, 0x02]);
        s.extend_from_slice(scan);
        s.extend_from_slice(&[0xFF, EOI]);
        s
    }

    fn gainmap_xmp() -> Vec<u8> {
        let xml = r#"<x:xmpmeta xmlns:x="adobe:ns:meta/"><rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"><rdf:Description xmlns:hdrgm="http://ns.adobe.com/hdr-gain-map/1.0/" hdrgm:Version="1.0" hdrgm:GainMapMax="2.0"/></rdf:RDF></x:xmpmeta>"#;
        encode_segment(APP1, &[XMP_IDENTIFIER, xml.as_bytes()].concat()).unwrap()
    }

    #[test]
    fn test_two_streams_in_order() {
        let a = stream(&[], &[1, 2, 3]);
        let b = stream(&[], &[4, 5]);
        let data = [a.clone(), b.clone()].concat();
        let streams = split_streams(&data);
        assert_eq!(streams.len(), 2);
        assert_eq!(streams[0].data, &a[..]);
        assert_eq!(streams[1].offset, a.len());
        assert_eq!(streams[1].data, &b[..]);
    }

    #[test]
    fn test_eoi_bytes_inside_segment_payload() {
        // An APP2 payload that happens to contain FF D9 and FF D8
        let icc = encode_segment(APP2, &[0x01, 0xFF, 0xD9, 0xFF, 0xD8, 0xFF, 0x02]).unwrap();
        let a = stream(&[icc], &[7, 7]);
        let b = stream(&[], &[8]);
        let data = [a.clone(), b].concat();
        let streams = split_streams(&data);
        assert_eq!(streams.len(), 2);
        assert_eq!(streams[0].data.len(), a.len());
    }

    #[test]
    fn test_stuffed_and_restart_markers_in_scan() {
        let a = stream(&[], &[0xFF, 0x00, 0x11, 0xFF, 0xD3, 0x22]);
        let streams = split_streams(&a);
        assert_eq!(streams.len(), 1);
        assert_eq!(streams[0].data.len(), a.len());
    }

    #[test]
    fn test_malformed_length_falls_back() {
        let mut a = stream(&[encode_segment(APP1, b"abcdef").unwrap()], &[1]);
        a[4] = 0xFF;
        a[5] = 0xFF;
        let streams = split_streams(&a);
        assert_eq!(streams.len(), 1);
        assert_eq!(streams[0].data.len(), a.len());
    }

    #[test]
    fn test_unterminated_stream_dropped() {
        let a = stream(&[], &[1]);
        let data = [&a[..], &[0xFF, SOI, 0xFF, 0xDB, 0x00]].concat();
        assert_eq!(split_streams(&data).len(), 1);
    }

    #[test]
    fn test_bare_soi_in_trailing_data_ignored() {
        let a = stream(&[], &[1]);
        let data = [&a[..], &[0xFF, SOI, 0x00, 0x10, 0xFF, EOI]].concat();
        let streams = split_streams(&data);
        assert_eq!(streams.len(), 1);
        assert_eq!(streams[0].data, &a[..]);
    }

    #[test]
    fn test_two_layer_with_gainmap_metadata() {
        let data = [stream(&[], &[1]), stream(&[gainmap_xmp()], &[2])].concat();
        match split_container(&data) {
            SplitOutcome::TwoLayer(t) => {
                assert_eq!(t.attributes.get("GainMapMax").and_then(|v| v.as_f64()), Some(2.0));
            }
            SplitOutcome::NotTwoLayer { reason, .. } => panic!("{}", reason),
        }
    }

    #[test]
    fn test_metadata_in_primary_only() {
        let data = [stream(&[gainmap_xmp()], &[1]), stream(&[], &[2])].concat();
        assert!(split_container(&data).is_two_layer());
    }

    #[test]
    fn test_two_streams_without_metadata() {
        let data = [stream(&[], &[1]), stream(&[], &[2])].concat();
        match split_container(&data) {
            SplitOutcome::NotTwoLayer { streams, .. } => assert_eq!(streams.len(), 2),
            SplitOutcome::TwoLayer(_) => panic!("accepted a container without metadata"),
        }
    }
}
