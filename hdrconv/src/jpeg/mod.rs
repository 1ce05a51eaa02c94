//! JPEG container handling: markers, stream splitting, ICC and MPF segments.

pub mod icc;
pub mod markers;
pub mod mpf;
pub mod split;

pub use icc::{create_icc_markers, extract_icc_profile};
pub use markers::{scan_app_segments, AppSegment};
pub use split::{split_container, split_streams, SplitOutcome, SubStream, TwoLayer};
