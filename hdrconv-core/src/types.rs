//! Core types: the error enum and the gain map metadata record.

use thiserror::Error;

/// Errors that can occur while parsing profiles, containers and metadata,
/// or while reconstructing HDR content.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Malformed binary structure (truncated header, bad tag signature, ...).
    #[error("format error: {0}")]
    Format(String),

    /// The operation needs a matrix or curve this profile does not carry.
    #[error("missing capability: {0}")]
    Capability(String),

    /// No registered handler recognizes the stream.
    #[error("no registered format handler recognizes this input")]
    UnidentifiedFormat,

    /// A handler was requested by a name that is not registered.
    #[error("unknown format handler: {0}")]
    UnknownFormat(String),

    /// Gain map metadata is present but internally inconsistent.
    #[error("reconstruction error: {0}")]
    Reconstruction(String),

    /// Image dimensions are invalid (zero or too large).
    #[error("invalid image dimensions: {0}x{1}")]
    InvalidDimensions(u32, u32),

    /// Two images that must share a size do not.
    #[error("dimension mismatch: expected {expected_w}x{expected_h}, got {actual_w}x{actual_h}")]
    DimensionMismatch {
        /// Expected width.
        expected_w: u32,
        /// Expected height.
        expected_h: u32,
        /// Actual width.
        actual_w: u32,
        /// Actual height.
        actual_h: u32,
    },

    /// Input exceeds safety limits.
    #[error("input exceeds safety limit: {0}")]
    LimitExceeded(String),

    /// Pixel decoding through an external codec failed.
    #[error("decoding error: {0}")]
    Decode(String),

    /// Pixel encoding through an external codec failed.
    #[error("encoding error: {0}")]
    Encode(String),

    /// The handler or build does not support this operation.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// Underlying I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type for HDR conversion operations.
pub type Result<T> = core::result::Result<T, Error>;

/// A per-channel metadata value: either one value shared by every colour
/// channel or one value per RGB channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PerChannel {
    /// One value broadcast to all channels.
    Uniform(f32),
    /// Separate red, green and blue values.
    Rgb([f32; 3]),
}

impl PerChannel {
    /// Build from a slice of length 1 or 3.
    pub fn from_slice(values: &[f32]) -> Result<Self> {
        match *values {
            [v] => Ok(Self::Uniform(v)),
            [r, g, b] => Ok(Self::Rgb([r, g, b])),
            _ => Err(Error::Reconstruction(format!(
                "per-channel value must have 1 or 3 entries, got {}",
                values.len()
            ))),
        }
    }

    /// Value for channel `c` (0..3), broadcasting uniform values.
    #[inline]
    pub fn get(&self, c: usize) -> f32 {
        match self {
            Self::Uniform(v) => *v,
            Self::Rgb(v) => v[c.min(2)],
        }
    }

    /// All three channel values.
    pub fn to_array(&self) -> [f32; 3] {
        [self.get(0), self.get(1), self.get(2)]
    }

    /// True if every channel carries the same value.
    pub fn is_uniform(&self) -> bool {
        match self {
            Self::Uniform(_) => true,
            Self::Rgb([r, g, b]) => r == g && g == b,
        }
    }

    /// Number of stored entries (1 or 3).
    pub fn len(&self) -> usize {
        match self {
            Self::Uniform(_) => 1,
            Self::Rgb(_) => 3,
        }
    }

    /// Never true; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Apply `f` to every stored entry.
    pub fn map(&self, f: impl Fn(f32) -> f32) -> Self {
        match self {
            Self::Uniform(v) => Self::Uniform(f(*v)),
            Self::Rgb([r, g, b]) => Self::Rgb([f(*r), f(*g), f(*b)]),
        }
    }
}

impl Default for PerChannel {
    fn default() -> Self {
        Self::Uniform(0.0)
    }
}

impl From<f32> for PerChannel {
    fn from(v: f32) -> Self {
        Self::Uniform(v)
    }
}

impl From<[f32; 3]> for PerChannel {
    fn from(v: [f32; 3]) -> Self {
        Self::Rgb(v)
    }
}

/// Gain map parameters resolved for a single colour channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelParams {
    /// log2 of the minimum content boost.
    pub min: f32,
    /// log2 of the maximum content boost.
    pub max: f32,
    /// Gain map encoding gamma.
    pub gamma: f32,
    /// Offset added to the baseline before the gain is applied.
    pub baseline_offset: f32,
    /// Offset subtracted after the gain is applied.
    pub alternate_offset: f32,
}

/// Gain map metadata (ISO 21496-1 / Adobe hdrgm).
///
/// Boost ranges and headrooms are stored in log2 stops. Fields are public
/// so headers can be rewritten programmatically before re-encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct GainmapMetadata {
    /// Minimum version a reader must support.
    pub minimum_version: u16,
    /// Version of the writer that produced the metadata.
    pub writer_version: u16,
    /// HDR headroom of the baseline rendition (log2).
    pub baseline_hdr_headroom: f32,
    /// HDR headroom of the alternate rendition (log2).
    pub alternate_hdr_headroom: f32,
    /// log2 minimum content boost.
    pub gainmap_min: PerChannel,
    /// log2 maximum content boost.
    pub gainmap_max: PerChannel,
    /// Gamma applied to the encoded gain map.
    pub gainmap_gamma: PerChannel,
    /// Offset applied to the baseline rendition.
    pub baseline_offset: PerChannel,
    /// Offset applied to the alternate rendition.
    pub alternate_offset: PerChannel,
    /// The gain map carries one plane per colour channel.
    pub is_multichannel: bool,
    /// The gain map is applied in the baseline's colour space.
    pub use_base_colour_space: bool,
    /// The baseline is the HDR rendition (inverse gain map).
    pub base_rendition_is_hdr: bool,
}

impl GainmapMetadata {
    /// Metadata with the hdrgm defaults and a 1-stop maximum boost.
    pub fn new() -> Self {
        Self {
            minimum_version: 0,
            writer_version: 0,
            baseline_hdr_headroom: 0.0,
            alternate_hdr_headroom: 1.0,
            gainmap_min: PerChannel::Uniform(0.0),
            gainmap_max: PerChannel::Uniform(1.0),
            gainmap_gamma: PerChannel::Uniform(1.0),
            baseline_offset: PerChannel::Uniform(1.0 / 64.0),
            alternate_offset: PerChannel::Uniform(1.0 / 64.0),
            is_multichannel: false,
            use_base_colour_space: true,
            base_rendition_is_hdr: false,
        }
    }

    /// Resolved parameters for channel `c` (0..3).
    #[inline]
    pub fn channel(&self, c: usize) -> ChannelParams {
        ChannelParams {
            min: self.gainmap_min.get(c),
            max: self.gainmap_max.get(c),
            gamma: self.gainmap_gamma.get(c),
            baseline_offset: self.baseline_offset.get(c),
            alternate_offset: self.alternate_offset.get(c),
        }
    }

    /// Resolved parameters for all three channels.
    pub fn channels(&self) -> [ChannelParams; 3] {
        [self.channel(0), self.channel(1), self.channel(2)]
    }

    /// Check if every per-channel field is uniform.
    pub fn is_single_channel(&self) -> bool {
        [
            &self.gainmap_min,
            &self.gainmap_max,
            &self.gainmap_gamma,
            &self.baseline_offset,
            &self.alternate_offset,
        ]
        .iter()
        .all(|v| v.is_uniform())
    }

    /// Validate that the metadata can drive a reconstruction.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("gainmap_min", &self.gainmap_min),
            ("gainmap_max", &self.gainmap_max),
            ("gainmap_gamma", &self.gainmap_gamma),
            ("baseline_offset", &self.baseline_offset),
            ("alternate_offset", &self.alternate_offset),
        ];
        for (name, value) in fields {
            for (i, v) in value.to_array().iter().enumerate() {
                if !v.is_finite() {
                    return Err(Error::Reconstruction(format!(
                        "{}[{}] must be finite",
                        name, i
                    )));
                }
            }
            if !self.is_multichannel && !value.is_uniform() {
                return Err(Error::Reconstruction(format!(
                    "{} has per-channel values but the gain map is single-channel",
                    name
                )));
            }
        }

        for c in 0..3 {
            let p = self.channel(c);
            if p.gamma <= 0.0 {
                return Err(Error::Reconstruction(format!(
                    "gainmap_gamma[{}] must be positive, got {}",
                    c, p.gamma
                )));
            }
            if p.min > p.max {
                return Err(Error::Reconstruction(format!(
                    "gainmap_min[{}] ({}) > gainmap_max[{}] ({})",
                    c, p.min, c, p.max
                )));
            }
        }

        if !self.baseline_hdr_headroom.is_finite() || !self.alternate_hdr_headroom.is_finite() {
            return Err(Error::Reconstruction("headroom must be finite".into()));
        }

        Ok(())
    }
}

impl Default for GainmapMetadata {
    fn default() -> Self {
        Self::new()
    }
}

/// Reference display luminance values (in nits).
pub mod luminance {
    /// SDR reference white (diffuse white)
    pub const SDR_WHITE_NITS: f32 = 203.0;

    /// Nominal peak of an HLG reference display
    pub const HLG_PEAK_NITS: f32 = 1000.0;

    /// PQ peak luminance
    pub const PQ_PEAK_NITS: f32 = 10000.0;
}
