//! Gain map metadata: XMP parsing and generation, hdrgm mapping and Apple
//! headroom.

pub mod apple;
pub mod hdrgm;
pub mod xmp;

pub use apple::{AppleHdrMetadata, DEFAULT_HEADROOM};
pub use hdrgm::{attributes_for, metadata_from_attributes};
pub use xmp::{extract_gainmap_attributes, XmpAttributes, XmpValue};
