//! Single-layer images whose transfer function carries the HDR range.

use super::working_space::{convert_in_place, from_working_matrix, to_working_matrix};
use super::{Composer, Generator};
use hdrconv_core::icc::ProfileBuilder;
use hdrconv_core::{
    ColorSpace, ContainerMetadata, Error, Image, ImageContainer, ImageRole, IntermediateRendering,
    Result, Samples,
};

/// Linearises the container's primary image with its own transfer.
///
/// The HDR image is preferred, then the SDR one. Single-channel images are
/// broadcast to grey.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleLayerComposer;

impl Composer for SingleLayerComposer {
    fn compose(&self, container: &ImageContainer) -> Result<IntermediateRendering> {
        let image = container
            .image(ImageRole::Hdr)
            .or_else(|| container.image(ImageRole::Sdr))
            .or_else(|| container.images().first())
            .ok_or_else(|| Error::Format("container holds no image".into()))?;

        let transfer = image.color_space().transfer;
        let channels = image.channels() as usize;
        let samples = image.to_f32();
        let mut data = Vec::with_capacity(image.width() as usize * image.height() as usize * 3);
        for px in samples.chunks_exact(channels) {
            for c in 0..3 {
                data.push(transfer.to_linear(px[c.min(channels - 1)]));
            }
        }

        let m = to_working_matrix(image.color_space(), container.metadata.icc_profile.as_deref())?;
        convert_in_place(&mut data, &m);
        IntermediateRendering::new(image.width(), image.height(), data)
    }
}

/// Encodes a rendering as one 16-bit PQ image in BT.2020.
#[derive(Debug, Clone, Copy)]
pub struct SingleLayerGenerator {
    space: ColorSpace,
}

impl Default for SingleLayerGenerator {
    fn default() -> Self {
        Self {
            space: ColorSpace::REC2020_PQ,
        }
    }
}

impl SingleLayerGenerator {
    /// Generator targeting `space` (PQ or HLG transfers keep the HDR range).
    pub fn new(space: ColorSpace) -> Self {
        Self { space }
    }
}

impl Generator for SingleLayerGenerator {
    fn generate(&self, rendering: &IntermediateRendering) -> Result<ImageContainer> {
        if !self.space.transfer.is_hdr() {
            log::warn!(
                "single-layer output with {:?} transfer clips above SDR white",
                self.space.transfer
            );
        }
        let m = from_working_matrix(&self.space)?;
        let mut linear = rendering.data().to_vec();
        convert_in_place(&mut linear, &m);

        let transfer = self.space.transfer;
        let encoded: Vec<u16> = linear
            .iter()
            .map(|&v| (transfer.from_linear(v.max(0.0)).clamp(0.0, 1.0) * 65535.0).round() as u16)
            .collect();

        let image = Image::new(
            rendering.width(),
            rendering.height(),
            3,
            Samples::U16(encoded),
            self.space,
            ImageRole::Hdr,
        )?;
        let mut container = ImageContainer::new().with_image(image)?;
        container.metadata = ContainerMetadata {
            gainmap: None,
            headroom: None,
            icc_profile: Some(ProfileBuilder::new(self.space).build()),
        };
        Ok(container)
    }
}
