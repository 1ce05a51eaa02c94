//! hdrconv - read, reconstruct and re-encode gain map HDR images.
//!
//! Gain map containers store an SDR baseline, a gain map and metadata.
//! HDR-capable readers multiply the baseline by the decoded gain to recover
//! the HDR rendition; legacy readers just show the baseline.
//!
//! # Crate Structure
//!
//! - [`hdrconv_core`] - ICC, colour and gain map math (no codec dependency)
//! - `hdrconv` (this crate) - JPEG container handling, format handlers,
//!   composers and file-level helpers
//!
//! # Pipeline
//!
//! ```text
//! bytes -> FormatHandler::read -> ImageContainer
//!       -> Composer -> IntermediateRendering (linear BT.2020)
//!       -> Generator -> ImageContainer -> FormatHandler::write -> bytes
//! ```
//!
//! # Example
//!
//! ```ignore
//! use hdrconv::compose::ComposeConfig;
//! use hdrconv::convert::{read_container, to_intermediate};
//! use hdrconv::registry::FormatRegistry;
//!
//! let registry = FormatRegistry::with_defaults();
//! let container = read_container("photo.jpg", &registry, None)?;
//! let hdr = to_intermediate(&container, None, &ComposeConfig::default())?;
//! println!("peak {:?}", hdr.data().iter().copied().fold(0.0f32, f32::max));
//! ```
//!
//! # Standards
//!
//! - ISO 21496-1 and Adobe XMP (hdrgm namespace)
//! - CIPA DC-007 Multi-Picture Format
//! - ICC.1 matrix/TRC profiles

#![warn(missing_docs)]
#![warn(clippy::all)]

// Re-export everything from hdrconv-core
pub use hdrconv_core::color;
pub use hdrconv_core::gainmap;
pub use hdrconv_core::icc;
pub use hdrconv_core::image;
pub use hdrconv_core::metadata;

pub use hdrconv_core::{
    limits, luminance, ColorSpace, ColorTransform, ContainerMetadata, EncodeConfig, Error,
    GainmapFormula, GainmapMetadata, IccProfile, Image, ImageContainer, ImageRole,
    IntermediateRendering, PerChannel, Result, Samples, Transfer,
};

pub mod codec;
pub mod compose;
pub mod convert;
pub mod formats;
pub mod jpeg;
pub mod registry;

pub use compose::{ComposeConfig, Composer, ComposerHint, Generator};
pub use convert::{from_intermediate, read_container, to_intermediate, write_container};
pub use formats::FormatHandler;
pub use registry::FormatRegistry;
