//! Baseline plus gain map composition and generation.

use super::working_space::{convert_in_place, from_working_matrix, to_working_matrix};
use super::{ComposeConfig, Composer, Generator};
use hdrconv_core::gainmap::{apply_gainmap_headroom, apply_gainmap_iso, compute_gainmap};
use hdrconv_core::icc::ProfileBuilder;
use hdrconv_core::{
    ColorSpace, ContainerMetadata, EncodeConfig, Error, GainmapFormula, ImageContainer, ImageRole,
    IntermediateRendering, Result,
};

/// Reconstructs HDR from an SDR baseline and its gain map.
///
/// ISO metadata selects the ISO formula; otherwise the headroom formula is
/// used with the container's headroom, falling back to the configured
/// default.
#[derive(Debug, Clone, Copy, Default)]
pub struct GainmapComposer {
    config: ComposeConfig,
}

impl GainmapComposer {
    /// Composer with the given tuning.
    pub fn new(config: ComposeConfig) -> Self {
        Self { config }
    }
}

impl Composer for GainmapComposer {
    fn compose(&self, container: &ImageContainer) -> Result<IntermediateRendering> {
        let base = container
            .image(ImageRole::Sdr)
            .ok_or_else(|| Error::Format("gain map composition needs an SDR baseline".into()))?;
        let gain = container
            .image(ImageRole::Gainmap)
            .ok_or_else(|| Error::Format("gain map composition needs a gain map".into()))?;
        let metadata = &container.metadata;

        let formula = self.config.formula.unwrap_or(if metadata.gainmap.is_some() {
            GainmapFormula::Iso
        } else {
            GainmapFormula::Headroom
        });

        let mut data = match formula {
            GainmapFormula::Iso => {
                let params = metadata.gainmap.as_ref().ok_or_else(|| {
                    Error::Reconstruction("ISO formula needs gain map metadata".into())
                })?;
                apply_gainmap_iso(base, gain, params)?
            }
            GainmapFormula::Headroom => {
                let headroom = metadata.headroom.unwrap_or(self.config.default_headroom);
                log::debug!("applying gain map with headroom {}", headroom);
                apply_gainmap_headroom(base, gain, headroom)?
            }
        };

        let m = to_working_matrix(base.color_space(), metadata.icc_profile.as_deref())?;
        convert_in_place(&mut data, &m);
        IntermediateRendering::new(base.width(), base.height(), data)
    }
}

/// Splits a rendering into an SDR baseline, a gain map and ISO metadata.
#[derive(Debug, Clone)]
pub struct GainmapGenerator {
    baseline_space: ColorSpace,
    config: EncodeConfig,
}

impl Default for GainmapGenerator {
    fn default() -> Self {
        Self::new(ColorSpace::SRGB, EncodeConfig::default())
    }
}

impl GainmapGenerator {
    /// Generator writing its baseline in `baseline_space`.
    pub fn new(baseline_space: ColorSpace, config: EncodeConfig) -> Self {
        Self {
            baseline_space,
            config,
        }
    }
}

impl Generator for GainmapGenerator {
    fn generate(&self, rendering: &IntermediateRendering) -> Result<ImageContainer> {
        let m = from_working_matrix(&self.baseline_space)?;
        let mut hdr = rendering.data().to_vec();
        convert_in_place(&mut hdr, &m);
        // out-of-gamut colours clip at the baseline's primaries
        for v in &mut hdr {
            *v = v.max(0.0);
        }

        let encoding = compute_gainmap(
            &hdr,
            rendering.width(),
            rendering.height(),
            None,
            self.baseline_space,
            &self.config,
        )?;

        let mut container = ImageContainer::new()
            .with_image(encoding.baseline)?
            .with_image(encoding.gainmap)?;
        container.metadata = ContainerMetadata {
            gainmap: Some(encoding.metadata),
            headroom: None,
            icc_profile: Some(ProfileBuilder::new(self.baseline_space).build()),
        };
        Ok(container)
    }
}
