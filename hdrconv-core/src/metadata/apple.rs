//! Apple gain map headroom.
//!
//! Apple containers carry a single headroom value instead of hdrgm
//! min/max/gamma. It is stored either directly in XMP
//! (`HDRGainMap:HDRGainMapHeadroom`) or derived from two maker-note
//! values (tags 33 and 48).

use super::xmp::{read_namespace_properties, APPLE_HDRGM_NAMESPACE};
use crate::types::{Error, Result};

/// Headroom assumed when a container does not record one.
pub const DEFAULT_HEADROOM: f32 = 6.0;

/// XMP property holding the headroom.
pub const HEADROOM_PROPERTY: &str = "HDRGainMapHeadroom";

/// Maker-note values that determine the headroom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AppleHdrMetadata {
    /// Maker note tag 33.
    pub maker33: f32,
    /// Maker note tag 48.
    pub maker48: f32,
}

impl AppleHdrMetadata {
    /// Create from the two maker-note values.
    pub fn new(maker33: f32, maker48: f32) -> Self {
        Self { maker33, maker48 }
    }

    /// Headroom in stops. Can be negative; [`Self::headroom`] clamps it.
    pub fn stops(&self) -> f32 {
        let m48 = self.maker48;
        if self.maker33 < 1.0 {
            if m48 <= 0.01 {
                -20.0 * m48 + 1.8
            } else {
                -0.101 * m48 + 1.601
            }
        } else if m48 <= 0.01 {
            -70.0 * m48 + 3.0
        } else {
            -0.303 * m48 + 2.303
        }
    }

    /// Linear headroom multiplier, never below 1.
    pub fn headroom(&self) -> f32 {
        self.stops().max(0.0).exp2()
    }
}

/// Read `HDRGainMapHeadroom` from an XMP document.
///
/// Returns `Ok(None)` when the property is absent. A present but
/// non-numeric or non-positive value is an error.
pub fn headroom_from_xmp(xml: &[u8]) -> Result<Option<f32>> {
    let attrs = read_namespace_properties(xml, APPLE_HDRGM_NAMESPACE)?;
    let Some(value) = attrs.get(HEADROOM_PROPERTY) else {
        return Ok(None);
    };
    match value.as_f64() {
        Some(v) if v.is_finite() && v > 0.0 => Ok(Some(v as f32)),
        _ => Err(Error::Reconstruction(format!(
            "HDRGainMap:{} is not a positive number: {:?}",
            HEADROOM_PROPERTY, value
        ))),
    }
}

/// Resolve the headroom: XMP first, then maker notes, then the default.
pub fn resolve_headroom(xmp: Option<f32>, maker: Option<AppleHdrMetadata>) -> f32 {
    xmp.or_else(|| maker.map(|m| m.headroom()))
        .unwrap_or(DEFAULT_HEADROOM)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maker_note_branches() {
        // maker33 < 1, small maker48
        let m = AppleHdrMetadata::new(0.5, 0.0);
        assert!((m.stops() - 1.8).abs() < 1e-6);
        // maker33 < 1, large maker48
        let m = AppleHdrMetadata::new(0.5, 1.0);
        assert!((m.stops() - 1.5).abs() < 1e-6);
        // maker33 >= 1, small maker48
        let m = AppleHdrMetadata::new(1.0, 0.01);
        assert!((m.stops() - 2.3).abs() < 1e-5);
        // maker33 >= 1, large maker48
        let m = AppleHdrMetadata::new(2.0, 1.0);
        assert!((m.stops() - 2.0).abs() < 1e-6);
        assert!((m.headroom() - 4.0).abs() < 1e-5);
    }

    #[test]
    fn test_negative_stops_clamp_to_unity() {
        let m = AppleHdrMetadata::new(2.0, 100.0);
        assert!(m.stops() < 0.0);
        assert_eq!(m.headroom(), 1.0);
    }

    #[test]
    fn test_headroom_from_xmp() {
        let xml = br#"<x:xmpmeta xmlns:x="adobe:ns:meta/">
  <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
    <rdf:Description rdf:about=""
        xmlns:HDRGainMap="http://ns.apple.com/HDRGainMap/1.0/"
        HDRGainMap:HDRGainMapVersion="65536"
        HDRGainMap:HDRGainMapHeadroom="3.5"/>
  </rdf:RDF>
</x:xmpmeta>"#;
        assert_eq!(headroom_from_xmp(xml).unwrap(), Some(3.5));
    }

    #[test]
    fn test_headroom_absent() {
        let xml = br#"<x:xmpmeta xmlns:x="adobe:ns:meta/">
  <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
    <rdf:Description rdf:about=""/>
  </rdf:RDF>
</x:xmpmeta>"#;
        assert_eq!(headroom_from_xmp(xml).unwrap(), None);
    }

    #[test]
    fn test_resolution_order() {
        let maker = AppleHdrMetadata::new(2.0, 1.0);
        assert_eq!(resolve_headroom(Some(2.5), Some(maker)), 2.5);
        assert!((resolve_headroom(None, Some(maker)) - 4.0).abs() < 1e-5);
        assert_eq!(resolve_headroom(None, None), DEFAULT_HEADROOM);
    }
}
