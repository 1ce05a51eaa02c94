//! Format handlers: the bridge between a file format and [`ImageContainer`].
//!
//! Each handler sniffs its own format, decodes a stream into typed images
//! and metadata, and (where supported) writes a container back out.

pub mod heic;
pub mod ultrahdr;

pub use heic::{HeicPqHandler, HeifDecoder, HeifParts, HDR_GAIN_MAP_URN};
pub use ultrahdr::UltraHdrHandler;

use hdrconv_core::{ImageContainer, Result};
use std::io::{Read, Seek, Write};

/// A seekable byte source.
pub trait ReadSeek: Read + Seek {}

impl<T: Read + Seek> ReadSeek for T {}

/// A concrete file format.
///
/// `identify` may consume bytes; the [`FormatRegistry`](crate::registry::FormatRegistry)
/// restores the stream position around every call.
pub trait FormatHandler: Send + Sync {
    /// Registry name.
    fn name(&self) -> &'static str;

    /// True if the stream holds this format.
    fn identify(&self, stream: &mut dyn ReadSeek) -> Result<bool>;

    /// Decode the stream into a container.
    fn read(&self, stream: &mut dyn ReadSeek) -> Result<ImageContainer>;

    /// Encode a container into this format.
    fn write(&self, out: &mut dyn Write, container: &ImageContainer) -> Result<()>;
}

/// Read up to `n` leading bytes.
pub(crate) fn read_header(stream: &mut dyn ReadSeek, n: usize) -> Result<Vec<u8>> {
    let mut header = Vec::with_capacity(n);
    Read::take(&mut *stream, n as u64).read_to_end(&mut header)?;
    Ok(header)
}

/// Read the rest of the stream.
pub(crate) fn read_all(stream: &mut dyn ReadSeek) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    stream.read_to_end(&mut data)?;
    Ok(data)
}
