//! Ultra HDR JPEG: an SDR primary JPEG with a gain map JPEG appended.
//!
//! Layout written by [`UltraHdrHandler::write`]:
//!
//! ```text
//! SOI [APP0] APP1(XMP: hdrgm Version + Container directory) APP2(MPF)
//!     APP2(ICC_PROFILE)... <primary scan> EOI
//! SOI APP1(XMP: hdrgm gain map parameters) <gain map scan> EOI
//! ```

use super::{read_all, FormatHandler, ReadSeek};
use crate::codec::{decode_jpeg, encode_jpeg, DecodeLayout};
use crate::jpeg::markers::{insert_after_soi, insertion_point, strip_app_segments, AppSegment};
use crate::jpeg::mpf::{create_mpf_segment, MPF_SEGMENT_LEN};
use crate::jpeg::{create_icc_markers, extract_icc_profile, split_container, SplitOutcome, SubStream};
use hdrconv_core::icc::ProfileBuilder;
use hdrconv_core::metadata::xmp::{
    create_xmp_app1_marker, generate_gainmap_xmp, generate_primary_xmp, HDRGM_NAMESPACE,
};
use hdrconv_core::metadata::{attributes_for, metadata_from_attributes};
use hdrconv_core::{
    ColorSpace, ContainerMetadata, Error, Image, ImageContainer, ImageRole, Result, Transfer,
};
use std::io::Write;

/// Colour space declared for ISO gain map planes (non-colorimetric, linear).
const GAINMAP_SPACE: ColorSpace = ColorSpace::SRGB.with_transfer(Transfer::Linear);

/// Handler for Ultra HDR / ISO 21496-1 gain map JPEGs.
#[derive(Debug, Clone)]
pub struct UltraHdrHandler {
    base_quality: u8,
    gainmap_quality: u8,
}

impl Default for UltraHdrHandler {
    fn default() -> Self {
        Self {
            base_quality: 95,
            gainmap_quality: 90,
        }
    }
}

impl UltraHdrHandler {
    /// Handler with default JPEG qualities (base 95, gain map 90).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the JPEG qualities used when images have to be re-encoded.
    pub fn with_quality(mut self, base: u8, gainmap: u8) -> Self {
        self.base_quality = base.clamp(1, 100);
        self.gainmap_quality = gainmap.clamp(1, 100);
        self
    }

    fn read_two_layer(
        &self,
        primary: SubStream<'_>,
        gainmap: SubStream<'_>,
        metadata: ContainerMetadata,
        gainmap_space: ColorSpace,
    ) -> Result<ImageContainer> {
        let mut container = ImageContainer::new();
        container.push(decode_jpeg(
            primary.data,
            DecodeLayout::Rgb,
            ColorSpace::SRGB,
            ImageRole::Sdr,
        )?)?;

        match decode_jpeg(gainmap.data, DecodeLayout::Native, gainmap_space, ImageRole::Gainmap) {
            Ok(image) => {
                container.push(image)?;
                container.metadata = metadata;
            }
            Err(e) => {
                log::warn!("gain map stream failed to decode, reading SDR only: {}", e);
                container.metadata.icc_profile = metadata.icc_profile;
            }
        }
        Ok(container)
    }
}

impl FormatHandler for UltraHdrHandler {
    fn name(&self) -> &'static str {
        "ultrahdr"
    }

    fn identify(&self, stream: &mut dyn ReadSeek) -> Result<bool> {
        let data = read_all(stream)?;
        if !data.starts_with(&[0xFF, 0xD8]) {
            return Ok(false);
        }
        if crate::jpeg::split_streams(&data).len() >= 2 {
            return Ok(true);
        }
        let ns = HDRGM_NAMESPACE.as_bytes();
        Ok(data.windows(ns.len()).any(|w| w == ns))
    }

    fn read(&self, stream: &mut dyn ReadSeek) -> Result<ImageContainer> {
        let data = read_all(stream)?;

        match split_container(&data) {
            SplitOutcome::TwoLayer(layers) => {
                let gainmap = match metadata_from_attributes(&layers.attributes) {
                    Ok(gainmap) => gainmap,
                    Err(e) => {
                        log::warn!("unusable gain map metadata, reading SDR only: {}", e);
                        return read_sdr_only(layers.primary);
                    }
                };
                let metadata = ContainerMetadata {
                    gainmap: Some(gainmap),
                    headroom: None,
                    icc_profile: extract_icc_profile(layers.primary.data),
                };
                self.read_two_layer(layers.primary, layers.gainmap, metadata, GAINMAP_SPACE)
            }
            SplitOutcome::NotTwoLayer { streams, reason } => {
                log::debug!("not a two-layer gain map container: {}", reason);

                // Apple-style JPEG: the gain map stream carries a headroom
                // instead of hdrgm parameters.
                if let [primary, gainmap] = *streams.as_slice() {
                    if let Some(headroom) =
                        gainmap.apple_headroom().or_else(|| primary.apple_headroom())
                    {
                        let metadata = ContainerMetadata {
                            gainmap: None,
                            headroom: Some(headroom),
                            icc_profile: extract_icc_profile(primary.data),
                        };
                        return self.read_two_layer(primary, gainmap, metadata, ColorSpace::REC709);
                    }
                }

                let primary = streams
                    .first()
                    .ok_or_else(|| Error::Format("no JPEG stream found".into()))?;
                read_sdr_only(*primary)
            }
        }
    }

    fn write(&self, out: &mut dyn Write, container: &ImageContainer) -> Result<()> {
        let sdr = container
            .image(ImageRole::Sdr)
            .ok_or_else(|| Error::Format("Ultra HDR output needs an SDR image".into()))?;

        let icc = match &container.metadata.icc_profile {
            Some(icc) => icc.clone(),
            None => ProfileBuilder::new(*sdr.color_space()).build(),
        };
        let base = prepare_stream(sdr, self.base_quality, |s| {
            s.is_xmp() || s.is_extended_xmp() || s.is_mpf() || s.is_icc()
        })?;

        let Some(gain) = container.image(ImageRole::Gainmap) else {
            let primary = insert_after_soi(&base, &create_icc_markers(&icc)?)?;
            out.write_all(&primary)?;
            return Ok(());
        };
        let metadata = container.metadata.gainmap.as_ref().ok_or_else(|| {
            Error::Format("Ultra HDR output needs ISO gain map metadata".into())
        })?;
        metadata.validate()?;

        let gainmap = prepare_stream(gain, self.gainmap_quality, |s| {
            s.is_xmp() || s.is_extended_xmp() || s.is_mpf()
        })?;
        let gainmap_xmp = create_xmp_app1_marker(&generate_gainmap_xmp(&attributes_for(metadata)))?;
        let gainmap = insert_after_soi(&gainmap, &[gainmap_xmp])?;

        let primary_xmp = create_xmp_app1_marker(&generate_primary_xmp(gainmap.len()))?;
        let icc_markers = create_icc_markers(&icc)?;
        let icc_len: usize = icc_markers.iter().map(Vec::len).sum();
        let primary_len = base.len() + primary_xmp.len() + MPF_SEGMENT_LEN + icc_len;
        let mpf_at = insertion_point(&base)? + primary_xmp.len();
        let mpf = create_mpf_segment(primary_len, gainmap.len(), mpf_at)?;

        let mut segments = vec![primary_xmp, mpf];
        segments.extend(icc_markers);
        let primary = insert_after_soi(&base, &segments)?;
        debug_assert_eq!(primary.len(), primary_len);

        log::debug!(
            "writing Ultra HDR: primary {} bytes, gain map {} bytes",
            primary.len(),
            gainmap.len()
        );
        out.write_all(&primary)?;
        out.write_all(&gainmap)?;
        Ok(())
    }
}

/// Primary stream alone, as a plain SDR container.
fn read_sdr_only(primary: SubStream<'_>) -> Result<ImageContainer> {
    let mut container = ImageContainer::new().with_image(decode_jpeg(
        primary.data,
        DecodeLayout::Rgb,
        ColorSpace::SRGB,
        ImageRole::Sdr,
    )?)?;
    container.metadata.icc_profile = extract_icc_profile(primary.data);
    Ok(container)
}

/// Source bytes with stale segments removed, or a fresh encode.
fn prepare_stream(image: &Image, quality: u8, stale: impl Fn(&AppSegment) -> bool) -> Result<Vec<u8>> {
    match image.encoded() {
        Some(bytes) => strip_app_segments(bytes, stale),
        None => encode_jpeg(image, quality),
    }
}
