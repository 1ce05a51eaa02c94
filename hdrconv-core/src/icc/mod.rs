//! ICC profile parsing.
//!
//! Only the parts of a profile needed for matrix/TRC colour transforms are
//! decoded: header signatures, the tag table, colorant and adaptation
//! matrices, the white point, tone curves and the description. Tags that
//! are missing or malformed are recorded as absent rather than replaced by
//! defaults; in particular a missing colorant matrix is never an identity.

pub mod tags;
pub mod writer;

use crate::color::curve::ToneCurve;
use crate::color::matrix::Matrix3;
use crate::color::transform::ColorTransform;
use crate::limits;
use crate::types::{Error, Result};

pub use tags::Signature;
pub use writer::ProfileBuilder;

/// Size of the fixed ICC header.
pub const HEADER_SIZE: usize = 128;

/// Offset of the tag count, directly after the header.
const TAG_COUNT_OFFSET: usize = 128;

/// Size of one tag table entry (signature, offset, size).
const TAG_ENTRY_SIZE: usize = 12;

/// One entry of the tag table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagEntry {
    /// Tag signature, e.g. `rXYZ`.
    pub signature: Signature,
    /// Byte offset from the start of the profile.
    pub offset: usize,
    /// Byte length.
    pub size: usize,
}

/// Parsed ICC profile record.
#[derive(Debug, Clone)]
pub struct IccProfile {
    /// Profile description (`desc`), if readable.
    pub description: Option<String>,
    /// Profile/device class, e.g. `mntr`.
    pub device_class: Signature,
    /// Data colour space, e.g. `RGB `.
    pub color_space: Signature,
    /// Profile connection space, `XYZ ` or `Lab `.
    pub pcs: Signature,
    /// Major and minor version from the header.
    pub version: (u8, u8),
    /// RGB → PCS XYZ, with rXYZ/gXYZ/bXYZ as columns.
    pub colorant_matrix: Option<Matrix3>,
    /// Device white → D50 adaptation (`chad`).
    pub chromatic_adaptation: Option<Matrix3>,
    /// Media white point (`wtpt`).
    pub white_point: Option<[f64; 3]>,
    /// Representative tone curve (rTRC, else gTRC, else kTRC).
    pub tone_curve: Option<ToneCurve>,
    /// Separate red, green and blue curves when all three are present.
    pub channel_curves: Option<[ToneCurve; 3]>,
    tags: Vec<TagEntry>,
}

impl IccProfile {
    /// Parse a profile from its raw bytes.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() > limits::MAX_ICC_PROFILE_SIZE {
            return Err(Error::LimitExceeded(format!(
                "ICC profile of {} bytes exceeds maximum {}",
                data.len(),
                limits::MAX_ICC_PROFILE_SIZE
            )));
        }
        if data.len() < HEADER_SIZE + 4 {
            return Err(Error::Format(format!(
                "ICC profile too short: {} bytes, need at least {}",
                data.len(),
                HEADER_SIZE + 4
            )));
        }

        let declared = tags::read_u32(data, 0).unwrap_or(0) as usize;
        if declared != data.len() {
            log::debug!(
                "ICC header declares {} bytes, buffer holds {}",
                declared,
                data.len()
            );
        }

        let tags = parse_tag_table(data)?;

        let mut profile = Self {
            description: None,
            device_class: tags::read_sig(data, 12).unwrap_or(Signature([0; 4])),
            color_space: tags::read_sig(data, 16).unwrap_or(Signature([0; 4])),
            pcs: tags::read_sig(data, 20).unwrap_or(Signature([0; 4])),
            version: (data[8], data[9] >> 4),
            colorant_matrix: None,
            chromatic_adaptation: None,
            white_point: None,
            tone_curve: None,
            channel_curves: None,
            tags,
        };

        profile.description = profile.optional_tag(data, b"desc", tags::parse_text);
        profile.white_point = profile.optional_tag(data, b"wtpt", tags::parse_xyz);
        profile.chromatic_adaptation = profile.optional_tag(data, b"chad", tags::parse_sf32_matrix);

        let r = profile.optional_tag(data, b"rXYZ", tags::parse_xyz);
        let g = profile.optional_tag(data, b"gXYZ", tags::parse_xyz);
        let b = profile.optional_tag(data, b"bXYZ", tags::parse_xyz);
        if let (Some(r), Some(g), Some(b)) = (r, g, b) {
            profile.colorant_matrix = Some(Matrix3::from_columns(r, g, b));
        }

        let r_trc = profile.optional_tag(data, b"rTRC", tags::parse_curve);
        let g_trc = profile.optional_tag(data, b"gTRC", tags::parse_curve);
        let b_trc = profile.optional_tag(data, b"bTRC", tags::parse_curve);
        let k_trc = profile.optional_tag(data, b"kTRC", tags::parse_curve);

        profile.tone_curve = r_trc.clone().or_else(|| g_trc.clone()).or(k_trc);
        if let (Some(r), Some(g), Some(b)) = (r_trc, g_trc, b_trc) {
            profile.channel_curves = Some([r, g, b]);
        }

        Ok(profile)
    }

    /// Tag table entries in file order.
    pub fn tags(&self) -> &[TagEntry] {
        &self.tags
    }

    /// First tag entry with the given signature.
    pub fn find_tag(&self, signature: &[u8; 4]) -> Option<&TagEntry> {
        self.tags.iter().find(|t| t.signature.0 == *signature)
    }

    /// Curves to use for per-channel linearisation.
    pub fn curves(&self) -> Option<[ToneCurve; 3]> {
        if let Some(curves) = &self.channel_curves {
            return Some(curves.clone());
        }
        self.tone_curve
            .as_ref()
            .map(|c| [c.clone(), c.clone(), c.clone()])
    }

    /// True when the data colour space is RGB.
    pub fn is_rgb(&self) -> bool {
        self.color_space.0 == *b"RGB "
    }

    /// Colour transform engine for this profile.
    pub fn transform(&self) -> ColorTransform {
        ColorTransform::from_profile(self)
    }

    fn optional_tag<T>(
        &self,
        data: &[u8],
        signature: &[u8; 4],
        parse: impl Fn(&[u8]) -> Result<T>,
    ) -> Option<T> {
        let entry = self.find_tag(signature)?;
        let bytes = &data[entry.offset..entry.offset + entry.size];
        match parse(bytes) {
            Ok(v) => Some(v),
            Err(e) => {
                log::warn!("ignoring unreadable ICC tag {}: {}", entry.signature, e);
                None
            }
        }
    }
}

fn parse_tag_table(data: &[u8]) -> Result<Vec<TagEntry>> {
    let count = tags::read_u32(data, TAG_COUNT_OFFSET)
        .ok_or_else(|| Error::Format("missing tag count".into()))? as usize;
    if count > limits::MAX_ICC_TAGS {
        return Err(Error::Format(format!(
            "ICC tag count {} exceeds maximum {}",
            count,
            limits::MAX_ICC_TAGS
        )));
    }

    let table_start = TAG_COUNT_OFFSET + 4;
    let table_end = table_start + count * TAG_ENTRY_SIZE;
    if table_end > data.len() {
        return Err(Error::Format(format!(
            "tag table of {} entries runs past end of profile ({} bytes)",
            count,
            data.len()
        )));
    }

    let mut entries: Vec<TagEntry> = Vec::with_capacity(count);
    for i in 0..count {
        let at = table_start + i * TAG_ENTRY_SIZE;
        let (Some(signature), Some(offset), Some(size)) = (
            tags::read_sig(data, at),
            tags::read_u32(data, at + 4),
            tags::read_u32(data, at + 8),
        ) else {
            continue;
        };
        let (offset, size) = (offset as usize, size as usize);
        if offset.checked_add(size).map_or(true, |end| end > data.len()) {
            log::debug!("skipping ICC tag {} outside profile bounds", signature);
            continue;
        }
        if entries.iter().any(|e| e.signature == signature) {
            continue;
        }
        entries.push(TagEntry {
            signature,
            offset,
            size,
        });
    }
    Ok(entries)
}
