//! Gain map computation and application.
//!
//! The gain map stores the log2 ratio between an HDR and an SDR rendition,
//! allowing reconstruction of HDR content from the SDR baseline.

pub mod apply;
pub mod compute;
pub mod resample;

pub use apply::{
    apply_gainmap_headroom, apply_gainmap_iso, apply_headroom, apply_iso, iso_multiplier,
    GainmapFormula,
};
pub use compute::{compute_gainmap, percentile, EncodeConfig, GainmapEncoding};
pub use resample::resize_bilinear;
