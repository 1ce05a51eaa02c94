//! Mapping between hdrgm XMP properties and [`GainmapMetadata`].
//!
//! Unknown properties are dropped here; everything past this boundary is
//! typed.

use super::xmp::{XmpAttributes, XmpValue};
use crate::types::{Error, GainmapMetadata, PerChannel, Result};

/// hdrgm default for both offsets.
pub const DEFAULT_OFFSET: f32 = 1.0 / 64.0;

/// Build typed metadata from hdrgm properties.
///
/// Absent properties take the hdrgm defaults. `GainMapMax` has no default
/// and its absence is an error, as is any malformed per-channel list.
pub fn metadata_from_attributes(attrs: &XmpAttributes) -> Result<GainmapMetadata> {
    let gainmap_max = per_channel(attrs, "GainMapMax")?
        .ok_or_else(|| Error::Reconstruction("hdrgm:GainMapMax is missing".into()))?;
    let gainmap_min = per_channel(attrs, "GainMapMin")?.unwrap_or(PerChannel::Uniform(0.0));
    let gainmap_gamma = per_channel(attrs, "Gamma")?.unwrap_or(PerChannel::Uniform(1.0));
    let baseline_offset =
        per_channel(attrs, "OffsetSDR")?.unwrap_or(PerChannel::Uniform(DEFAULT_OFFSET));
    let alternate_offset =
        per_channel(attrs, "OffsetHDR")?.unwrap_or(PerChannel::Uniform(DEFAULT_OFFSET));

    let baseline_hdr_headroom = scalar(attrs, "HDRCapacityMin")?.unwrap_or(0.0);
    let alternate_hdr_headroom = match scalar(attrs, "HDRCapacityMax")? {
        Some(v) => v,
        None => gainmap_max.to_array().into_iter().fold(f32::MIN, f32::max),
    };

    let version = match attrs.get("Version") {
        Some(v) => v.as_f64().map(|v| v.trunc().max(0.0) as u16).unwrap_or(1),
        None => 1,
    };

    let base_rendition_is_hdr = match attrs.get("BaseRenditionIsHDR") {
        Some(v) => v.as_bool().ok_or_else(|| {
            Error::Reconstruction(format!("hdrgm:BaseRenditionIsHDR is not a boolean: {:?}", v))
        })?,
        None => false,
    };

    let is_multichannel = [
        &gainmap_min,
        &gainmap_max,
        &gainmap_gamma,
        &baseline_offset,
        &alternate_offset,
    ]
    .iter()
    .any(|v| v.len() == 3);

    let metadata = GainmapMetadata {
        minimum_version: version,
        writer_version: version,
        baseline_hdr_headroom,
        alternate_hdr_headroom,
        gainmap_min,
        gainmap_max,
        gainmap_gamma,
        baseline_offset,
        alternate_offset,
        is_multichannel,
        use_base_colour_space: true,
        base_rendition_is_hdr,
    };
    metadata.validate()?;
    Ok(metadata)
}

/// hdrgm properties describing `metadata`, in canonical order.
pub fn attributes_for(metadata: &GainmapMetadata) -> Vec<(&'static str, String)> {
    vec![
        ("Version", "1.0".to_string()),
        ("GainMapMin", format_channels(&metadata.gainmap_min)),
        ("GainMapMax", format_channels(&metadata.gainmap_max)),
        ("Gamma", format_channels(&metadata.gainmap_gamma)),
        ("OffsetSDR", format_channels(&metadata.baseline_offset)),
        ("OffsetHDR", format_channels(&metadata.alternate_offset)),
        (
            "HDRCapacityMin",
            format!("{:.6}", metadata.baseline_hdr_headroom),
        ),
        (
            "HDRCapacityMax",
            format!("{:.6}", metadata.alternate_hdr_headroom),
        ),
        (
            "BaseRenditionIsHDR",
            if metadata.base_rendition_is_hdr { "True" } else { "False" }.to_string(),
        ),
    ]
}

fn format_channels(value: &PerChannel) -> String {
    match value {
        PerChannel::Uniform(v) => format!("{:.6}", v),
        PerChannel::Rgb([r, g, b]) => format!("{:.6}, {:.6}, {:.6}", r, g, b),
    }
}

fn per_channel(attrs: &XmpAttributes, name: &str) -> Result<Option<PerChannel>> {
    let Some(value) = attrs.get(name) else {
        return Ok(None);
    };
    let values = numbers(value, name)?;
    PerChannel::from_slice(&values)
        .map(Some)
        .map_err(|e| Error::Reconstruction(format!("hdrgm:{}: {}", name, e)))
}

fn scalar(attrs: &XmpAttributes, name: &str) -> Result<Option<f32>> {
    let Some(value) = attrs.get(name) else {
        return Ok(None);
    };
    match numbers(value, name)?.as_slice() {
        [v] => Ok(Some(*v)),
        other => Err(Error::Reconstruction(format!(
            "hdrgm:{} must be a single value, got {}",
            name,
            other.len()
        ))),
    }
}

fn numbers(value: &XmpValue, name: &str) -> Result<Vec<f32>> {
    value
        .as_f64_list()
        .map(|v| v.into_iter().map(|x| x as f32).collect())
        .ok_or_else(|| {
            Error::Reconstruction(format!("hdrgm:{} is not numeric: {:?}", name, value))
        })
}
