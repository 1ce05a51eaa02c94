//! HEIC files following Apple's gain map conventions.
//!
//! The primary image is a Display P3 SDR rendition. The gain map is an
//! auxiliary image identified by a fixed URN, and the headroom comes from
//! the `HDRGainMap` XMP namespace. Pixel decoding goes through the
//! [`HeifDecoder`] seam; the `heif` feature provides a libheif backend.

use super::{read_all, read_header, FormatHandler, ReadSeek};
use hdrconv_core::metadata::apple::{headroom_from_xmp, AppleHdrMetadata};
use hdrconv_core::{
    ColorSpace, ContainerMetadata, Error, Image, ImageContainer, ImageRole, Result, Samples,
};
use std::io::Write;

/// Auxiliary image type URN of Apple HDR gain maps.
pub const HDR_GAIN_MAP_URN: &str = "urn:com:apple:photo:2020:aux:hdrgainmap";

const BRANDS: [&[u8; 4]; 5] = [b"heic", b"heix", b"hevc", b"hevx", b"mif1"];

/// Interleaved 8-bit raster produced by a HEIF decoder.
#[derive(Debug, Clone)]
pub struct HeifRaster {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// 1 or 3.
    pub channels: u8,
    /// Tightly packed samples.
    pub data: Vec<u8>,
}

/// Everything the handler needs from a decoded HEIF file.
#[derive(Debug, Clone)]
pub struct HeifParts {
    /// Primary image.
    pub primary: HeifRaster,
    /// Auxiliary image of type [`HDR_GAIN_MAP_URN`], if present.
    pub gainmap: Option<HeifRaster>,
    /// XMP packets attached to the primary image.
    pub xmp: Vec<Vec<u8>>,
    /// ICC profile of the primary image.
    pub icc_profile: Option<Vec<u8>>,
    /// Maker note values 33 and 48, if the caller extracted them.
    pub maker_note: Option<AppleHdrMetadata>,
}

/// Decodes HEIF bytes into [`HeifParts`].
pub trait HeifDecoder: Send + Sync {
    /// Decode the primary image, the gain map auxiliary image and metadata.
    fn decode(&self, data: &[u8]) -> Result<HeifParts>;
}

/// Handler for Apple gain map HEIC files.
pub struct HeicPqHandler {
    decoder: Box<dyn HeifDecoder>,
}

impl Default for HeicPqHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl HeicPqHandler {
    /// Handler using the build's default decoder.
    pub fn new() -> Self {
        #[cfg(feature = "heif")]
        let decoder: Box<dyn HeifDecoder> = Box::new(libheif::LibHeifDecoder);
        #[cfg(not(feature = "heif"))]
        let decoder: Box<dyn HeifDecoder> = Box::new(Unavailable);
        Self { decoder }
    }

    /// Handler using a caller-supplied decoder.
    pub fn with_decoder(decoder: Box<dyn HeifDecoder>) -> Self {
        Self { decoder }
    }
}

impl FormatHandler for HeicPqHandler {
    fn name(&self) -> &'static str {
        "heic-pq"
    }

    fn identify(&self, stream: &mut dyn ReadSeek) -> Result<bool> {
        let header = read_header(stream, 12)?;
        if header.len() < 12 || &header[4..8] != b"ftyp" {
            return Ok(false);
        }
        Ok(BRANDS.iter().any(|b| &header[8..12] == *b))
    }

    fn read(&self, stream: &mut dyn ReadSeek) -> Result<ImageContainer> {
        let data = read_all(stream)?;
        let parts = self.decoder.decode(&data)?;

        let mut container = ImageContainer::new()
            .with_image(raster_image(parts.primary, ColorSpace::DISPLAY_P3, ImageRole::Sdr)?)?;

        let mut xmp_headroom = None;
        for xml in &parts.xmp {
            match headroom_from_xmp(xml) {
                Ok(Some(h)) => {
                    xmp_headroom = Some(h);
                    break;
                }
                Ok(None) => {}
                Err(e @ Error::Reconstruction(_)) => return Err(e),
                Err(e) => log::debug!("ignoring unparseable XMP packet: {}", e),
            }
        }

        let headroom = match (&parts.gainmap, xmp_headroom, parts.maker_note) {
            (None, _, _) => None,
            (Some(_), Some(h), _) => Some(h),
            (Some(_), None, Some(m)) => Some(m.headroom()),
            (Some(_), None, None) => None,
        };
        if let Some(gainmap) = parts.gainmap {
            container.push(raster_image(gainmap, ColorSpace::REC709, ImageRole::Gainmap)?)?;
        }

        container.metadata = ContainerMetadata {
            gainmap: None,
            headroom,
            icc_profile: parts.icc_profile,
        };
        Ok(container)
    }

    fn write(&self, _out: &mut dyn Write, _container: &ImageContainer) -> Result<()> {
        Err(Error::Unsupported("writing HEIC gain map files".into()))
    }
}

fn raster_image(raster: HeifRaster, space: ColorSpace, role: ImageRole) -> Result<Image> {
    Image::new(
        raster.width,
        raster.height,
        raster.channels,
        Samples::U8(raster.data),
        space,
        role,
    )
}

#[cfg(not(feature = "heif"))]
struct Unavailable;

#[cfg(not(feature = "heif"))]
impl HeifDecoder for Unavailable {
    fn decode(&self, _data: &[u8]) -> Result<HeifParts> {
        Err(Error::Unsupported(
            "HEIC decoding requires the 'heif' feature".into(),
        ))
    }
}

#[cfg(feature = "heif")]
mod libheif {
    use super::{HeifDecoder, HeifParts, HeifRaster, HDR_GAIN_MAP_URN};
    use hdrconv_core::{Error, Result};
    use libheif_rs::{
        AuxiliaryImagesFilter, ColorSpace, HeifContext, ImageHandle, LibHeif, RgbChroma,
    };

    /// HEIF decoding through system libheif.
    pub(super) struct LibHeifDecoder;

    impl HeifDecoder for LibHeifDecoder {
        fn decode(&self, data: &[u8]) -> Result<HeifParts> {
            let lib = LibHeif::new();
            let ctx = HeifContext::read_from_bytes(data)
                .map_err(|e| Error::Decode(format!("HEIF read error: {}", e)))?;
            let handle = ctx
                .primary_image_handle()
                .map_err(|e| Error::Decode(format!("HEIF handle error: {}", e)))?;

            let primary = decode_rgb(&lib, &handle)?;

            let gainmap = handle
                .auxiliary_images(AuxiliaryImagesFilter::empty())
                .into_iter()
                .find(|aux| aux.auxiliary_type().is_ok_and(|t| t == HDR_GAIN_MAP_URN))
                .map(|aux| decode_rgb(&lib, &aux))
                .transpose()?;

            let xmp = handle
                .metadata_block_ids(b"mime")
                .into_iter()
                .filter_map(|id| handle.metadata(id).ok())
                .collect();

            let icc_profile = handle.color_profile_raw().map(|p| p.data);

            Ok(HeifParts {
                primary,
                gainmap,
                xmp,
                icc_profile,
                maker_note: None,
            })
        }
    }

    fn decode_rgb(lib: &LibHeif, handle: &ImageHandle) -> Result<HeifRaster> {
        let image = lib
            .decode(handle, ColorSpace::Rgb(RgbChroma::Rgb), None)
            .map_err(|e| Error::Decode(format!("HEIF decode error: {}", e)))?;
        let plane = image
            .planes()
            .interleaved
            .ok_or_else(|| Error::Decode("no interleaved plane".into()))?;

        let (width, height) = (plane.width, plane.height);
        let row = width as usize * 3;
        let mut data = Vec::with_capacity(row * height as usize);
        for y in 0..height as usize {
            let start = y * plane.stride;
            data.extend_from_slice(&plane.data[start..start + row]);
        }
        Ok(HeifRaster {
            width,
            height,
            channels: 3,
            data,
        })
    }
}
