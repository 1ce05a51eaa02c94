//! Core colour and gain map math for HDR conversion.
//!
//! This crate provides the pure computational components:
//! - ICC profile parsing and generation (matrix/TRC profiles)
//! - Tone curves, transfer functions and RGB ↔ XYZ transforms
//! - Gain map metadata parsing/generation (XMP hdrgm, Apple headroom)
//! - Pixel math for applying/computing gain maps
//! - The typed image, container and intermediate rendering model
//!
//! This crate has **no codec dependency**. For reading and writing
//! containers, use the `hdrconv` crate which provides codec integration.
//!
//! # Example
//!
//! ```ignore
//! use hdrconv_core::{
//!     gainmap::{apply_gainmap_iso, compute_gainmap, EncodeConfig},
//!     icc::IccProfile,
//!     ColorSpace,
//! };
//!
//! // Inspect the baseline's profile
//! let profile = IccProfile::parse(&icc_bytes)?;
//! let xyz = profile.transform().to_reference_white_xyz([0.5, 0.5, 0.5], true)?;
//!
//! // Compute a gain map from linear HDR, then reconstruct it
//! let enc = compute_gainmap(&hdr, width, height, None, ColorSpace::SRGB, &EncodeConfig::default())?;
//! let hdr_again = apply_gainmap_iso(&enc.baseline, &enc.gainmap, &enc.metadata)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod color;
pub mod gainmap;
pub mod icc;
pub mod image;
pub mod metadata;
mod types;

// Re-export core types
pub use types::{luminance, ChannelParams, Error, GainmapMetadata, PerChannel, Result};

pub use color::{ColorSpace, ColorTransform, Matrix3, ParametricCurve, Primaries, ToneCurve, Transfer};
pub use gainmap::{EncodeConfig, GainmapFormula};
pub use icc::IccProfile;
pub use image::{ContainerMetadata, Image, ImageContainer, ImageRole, IntermediateRendering, Samples};

/// Safety limits for parsing and allocation.
pub mod limits {
    /// Maximum XMP string length to parse (16 MB).
    pub const MAX_XMP_LENGTH: usize = 16 * 1024 * 1024;

    /// Maximum image dimension (width or height).
    pub const MAX_IMAGE_DIMENSION: u32 = 65535;

    /// Maximum total pixels (width * height).
    pub const MAX_TOTAL_PIXELS: u64 = 500_000_000; // 500 megapixels

    /// Maximum ICC profile size (4 MB).
    pub const MAX_ICC_PROFILE_SIZE: usize = 4 * 1024 * 1024;

    /// Maximum number of entries in an ICC tag table.
    pub const MAX_ICC_TAGS: usize = 1024;
}
