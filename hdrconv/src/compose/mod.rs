//! Composers turn a decoded container into the canonical
//! [`IntermediateRendering`]; generators go the other way.
//!
//! Which composer applies is a pure function of the container's image
//! roles, unless the caller passes an explicit [`ComposerHint`].

mod gainmap;
mod single_layer;
pub mod working_space;

pub use gainmap::{GainmapComposer, GainmapGenerator};
pub use single_layer::{SingleLayerComposer, SingleLayerGenerator};

use hdrconv_core::metadata::apple::DEFAULT_HEADROOM;
use hdrconv_core::{Error, GainmapFormula, ImageContainer, ImageRole, IntermediateRendering, Result};
use std::str::FromStr;

/// Builds the intermediate rendering from a container's components.
pub trait Composer {
    /// Compose the container into linear BT.2020 HDR.
    fn compose(&self, container: &ImageContainer) -> Result<IntermediateRendering>;
}

/// Builds a format-specific container from an intermediate rendering.
pub trait Generator {
    /// Produce the container for one output layout.
    fn generate(&self, rendering: &IntermediateRendering) -> Result<ImageContainer>;
}

/// Composer tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComposeConfig {
    /// Headroom used when a headroom-style container carries none.
    pub default_headroom: f32,
    /// Force one gain map formula instead of choosing from the metadata.
    pub formula: Option<GainmapFormula>,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            default_headroom: DEFAULT_HEADROOM,
            formula: None,
        }
    }
}

impl ComposeConfig {
    /// Set the fallback headroom.
    pub fn with_default_headroom(mut self, headroom: f32) -> Self {
        self.default_headroom = headroom;
        self
    }

    /// Force a gain map formula.
    pub fn with_formula(mut self, formula: GainmapFormula) -> Self {
        self.formula = Some(formula);
        self
    }
}

/// Explicit composer choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposerHint {
    /// Baseline plus gain map.
    Gainmap,
    /// One layer decoded with its own transfer function.
    SingleLayer,
}

impl FromStr for ComposerHint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "gainmap" => Ok(Self::Gainmap),
            "single-layer" => Ok(Self::SingleLayer),
            other => Err(Error::Unsupported(format!("unknown composer hint '{}'", other))),
        }
    }
}

/// Pick the composer for a container. A hint always wins.
pub fn select_composer(container: &ImageContainer, hint: Option<ComposerHint>) -> ComposerHint {
    let selected = hint.unwrap_or(if container.has_role(ImageRole::Gainmap) {
        ComposerHint::Gainmap
    } else {
        ComposerHint::SingleLayer
    });
    log::debug!("selected {:?} composer (hint: {:?})", selected, hint);
    selected
}

impl ComposerHint {
    /// Instantiate the composer this hint names.
    pub fn composer(self, config: &ComposeConfig) -> Box<dyn Composer> {
        match self {
            Self::Gainmap => Box::new(GainmapComposer::new(*config)),
            Self::SingleLayer => Box::new(SingleLayerComposer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hdrconv_core::{ColorSpace, Image, Samples};

    fn image(role: ImageRole) -> Image {
        Image::new(1, 1, 3, Samples::U8(vec![0; 3]), ColorSpace::SRGB, role).unwrap()
    }

    #[test]
    fn test_selection_by_roles() {
        let sdr_only = ImageContainer::new().with_image(image(ImageRole::Sdr)).unwrap();
        assert_eq!(select_composer(&sdr_only, None), ComposerHint::SingleLayer);

        let layered = sdr_only.clone().with_image(image(ImageRole::Gainmap)).unwrap();
        assert_eq!(select_composer(&layered, None), ComposerHint::Gainmap);
    }

    #[test]
    fn test_hint_overrides() {
        let layered = ImageContainer::new()
            .with_image(image(ImageRole::Sdr))
            .unwrap()
            .with_image(image(ImageRole::Gainmap))
            .unwrap();
        assert_eq!(
            select_composer(&layered, Some(ComposerHint::SingleLayer)),
            ComposerHint::SingleLayer
        );
        assert_eq!(
            select_composer(&ImageContainer::new(), Some(ComposerHint::Gainmap)),
            ComposerHint::Gainmap
        );
    }

    #[test]
    fn test_parse_hint() {
        assert_eq!("gainmap".parse::<ComposerHint>().unwrap(), ComposerHint::Gainmap);
        assert_eq!(
            "single-layer".parse::<ComposerHint>().unwrap(),
            ComposerHint::SingleLayer
        );
        assert!("pq".parse::<ComposerHint>().is_err());
    }
}
