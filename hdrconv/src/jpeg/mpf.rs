//! Multi-Picture Format (MPF) directory for the primary + gain map pair.
//!
//! MPF is defined by CIPA DC-007. Offsets of every image after the first
//! are relative to the TIFF endianness marker inside the MPF segment.

use super::markers::{AppSegment, APP2, MPF_IDENTIFIER};
use hdrconv_core::{Error, Result};

/// MPF version string.
pub const MPF_VERSION: [u8; 4] = *b"0100";

const TAG_VERSION: u16 = 0xB000;
const TAG_NUMBER_OF_IMAGES: u16 = 0xB001;
const TAG_MP_ENTRY: u16 = 0xB002;

const TYPE_UNDEFINED: u16 = 7;
const TYPE_LONG: u16 = 4;

/// Marker + length + identifier: bytes before the endianness marker.
const HEADER_PREFIX: usize = 4 + MPF_IDENTIFIER.len();

/// Size in bytes of the segment [`create_mpf_segment`] produces.
pub const MPF_SEGMENT_LEN: usize = HEADER_PREFIX + 8 + 2 + 3 * 12 + 4 + 2 * 16;

/// Image type flags for an MP entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum MpImageType {
    /// Baseline MP primary image.
    BaselinePrimary = 0x030000,
    /// Dependent child image (the gain map).
    DependentChild = 0x000000,
}

/// One image listed in an MPF directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MpEntry {
    /// Attribute flags.
    pub attribute: u32,
    /// Stream size in bytes.
    pub size: u32,
    /// Offset as stored (0 for the primary).
    pub offset: u32,
}

/// Create the MPF APP2 segment for a primary stream followed by a gain map.
///
/// `segment_offset` is where this segment's `0xFF` byte will sit in the
/// primary stream; the gain map offset is computed relative to the
/// endianness marker that follows it.
pub fn create_mpf_segment(
    primary_length: usize,
    gainmap_length: usize,
    segment_offset: usize,
) -> Result<Vec<u8>> {
    let endian_pos = segment_offset + HEADER_PREFIX;
    let gainmap_offset = primary_length
        .checked_sub(endian_pos)
        .ok_or_else(|| Error::Format("MPF segment lies outside the primary stream".into()))?;
    let to_u32 = |v: usize| {
        u32::try_from(v).map_err(|_| Error::LimitExceeded(format!("{} bytes exceeds MPF range", v)))
    };

    let mut mpf = Vec::with_capacity(MPF_SEGMENT_LEN - HEADER_PREFIX);
    mpf.extend_from_slice(b"MM\x00\x2A");
    mpf.extend_from_slice(&8u32.to_be_bytes());

    mpf.extend_from_slice(&3u16.to_be_bytes());
    write_ifd_entry(&mut mpf, TAG_VERSION, TYPE_UNDEFINED, 4, u32::from_be_bytes(MPF_VERSION));
    write_ifd_entry(&mut mpf, TAG_NUMBER_OF_IMAGES, TYPE_LONG, 1, 2);
    // Entry table follows the IFD and the next-IFD pointer
    let entries_offset = (mpf.len() + 12 + 4) as u32;
    write_ifd_entry(&mut mpf, TAG_MP_ENTRY, TYPE_UNDEFINED, 32, entries_offset);
    mpf.extend_from_slice(&0u32.to_be_bytes());

    write_mp_entry(&mut mpf, MpImageType::BaselinePrimary, to_u32(primary_length)?, 0);
    write_mp_entry(
        &mut mpf,
        MpImageType::DependentChild,
        to_u32(gainmap_length)?,
        to_u32(gainmap_offset)?,
    );

    let length = 2 + MPF_IDENTIFIER.len() + mpf.len();
    let mut marker = Vec::with_capacity(2 + length);
    marker.extend_from_slice(&[0xFF, APP2]);
    marker.extend_from_slice(&(length as u16).to_be_bytes());
    marker.extend_from_slice(MPF_IDENTIFIER);
    marker.extend_from_slice(&mpf);
    Ok(marker)
}

fn write_ifd_entry(buf: &mut Vec<u8>, tag: u16, type_id: u16, count: u32, value: u32) {
    buf.extend_from_slice(&tag.to_be_bytes());
    buf.extend_from_slice(&type_id.to_be_bytes());
    buf.extend_from_slice(&count.to_be_bytes());
    buf.extend_from_slice(&value.to_be_bytes());
}

fn write_mp_entry(buf: &mut Vec<u8>, image_type: MpImageType, size: u32, offset: u32) {
    buf.extend_from_slice(&(image_type as u32).to_be_bytes());
    buf.extend_from_slice(&size.to_be_bytes());
    buf.extend_from_slice(&offset.to_be_bytes());
    // Dependent image entry numbers
    buf.extend_from_slice(&[0; 4]);
}

/// Parse the MP entries of an MPF APP2 segment.
pub fn parse_mpf(segment: &AppSegment) -> Result<Vec<MpEntry>> {
    if !segment.is_mpf() {
        return Err(Error::Format("not an MPF segment".into()));
    }
    let data = &segment.payload[MPF_IDENTIFIER.len()..];
    if data.len() < 8 {
        return Err(Error::Format("MPF data too short".into()));
    }

    let big_endian = match &data[0..2] {
        b"MM" => true,
        b"II" => false,
        _ => return Err(Error::Format("invalid MPF endianness marker".into())),
    };
    let u16_at = |p: usize| -> Result<u16> {
        let b = data
            .get(p..p + 2)
            .ok_or_else(|| Error::Format("MPF directory truncated".into()))?;
        Ok(if big_endian {
            u16::from_be_bytes([b[0], b[1]])
        } else {
            u16::from_le_bytes([b[0], b[1]])
        })
    };
    let u32_at = |p: usize| -> Result<u32> {
        let b = data
            .get(p..p + 4)
            .ok_or_else(|| Error::Format("MPF directory truncated".into()))?;
        let b = [b[0], b[1], b[2], b[3]];
        Ok(if big_endian {
            u32::from_be_bytes(b)
        } else {
            u32::from_le_bytes(b)
        })
    };

    let ifd = u32_at(4)? as usize;
    let count = u16_at(ifd)? as usize;

    let mut images = 0usize;
    let mut table = None;
    for i in 0..count {
        let entry = ifd + 2 + i * 12;
        match u16_at(entry)? {
            TAG_NUMBER_OF_IMAGES => images = u32_at(entry + 8)? as usize,
            TAG_MP_ENTRY => table = Some(u32_at(entry + 8)? as usize),
            _ => {}
        }
    }

    let table = table.ok_or_else(|| Error::Format("MPF has no MP entry table".into()))?;
    (0..images)
        .map(|i| {
            let p = table + i * 16;
            Ok(MpEntry {
                attribute: u32_at(p)?,
                size: u32_at(p + 4)?,
                offset: u32_at(p + 8)?,
            })
        })
        .collect()
}

/// Absolute file offset of an MP entry, given the segment that listed it.
pub fn absolute_offset(entry: &MpEntry, segment: &AppSegment) -> usize {
    if entry.offset == 0 {
        0
    } else {
        segment.offset + HEADER_PREFIX + entry.offset as usize
    }
}
