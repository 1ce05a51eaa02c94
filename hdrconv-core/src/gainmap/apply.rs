//! Gain map application for HDR reconstruction.
//!
//! Two formulas are supported. The ISO 21496-1 formula remaps the gain
//! through log2 min/max/gamma metadata. The headroom formula scales the
//! baseline linearly by a single headroom value, for containers that carry
//! no min/max/gamma.

use super::resample::resize_bilinear;
use crate::color::transfer::{bt709_oetf_inv, EotfLut8};
use crate::image::{Image, Samples};
use crate::types::{ChannelParams, Error, GainmapMetadata, Result};

/// Which reconstruction formula to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GainmapFormula {
    /// `hdr = 2^(g^gamma * (max-min) + min) * (base + k_base) - k_alt`.
    Iso,
    /// `hdr = base * (1 + (headroom - 1) * gain)`.
    Headroom,
}

/// Linear gain multiplier for one normalized gain sample.
#[inline]
pub fn iso_multiplier(gain: f32, params: &ChannelParams) -> f32 {
    let g = gain.clamp(0.0, 1.0).powf(params.gamma);
    let log_boost = g * (params.max - params.min) + params.min;
    log_boost.exp2()
}

/// Reconstruct one HDR channel value with the ISO formula.
#[inline]
pub fn apply_iso(base: f32, gain: f32, params: &ChannelParams) -> f32 {
    iso_multiplier(gain, params) * (base + params.baseline_offset) - params.alternate_offset
}

/// Reconstruct one HDR channel value with the headroom formula.
///
/// `gain` is already linear.
#[inline]
pub fn apply_headroom(base: f32, gain: f32, headroom: f32) -> f32 {
    base * (1.0 + (headroom - 1.0) * gain)
}

/// Apply a gain map with the ISO formula.
///
/// `base` is linearised with its declared transfer. The gain map is resized
/// to the baseline's resolution and used as normalized samples;
/// single-channel maps apply to every colour channel. Returns interleaved
/// linear RGB in the baseline's primaries.
///
/// When the metadata marks the baseline as the HDR rendition, the gain map
/// points towards SDR and the baseline is returned unboosted.
pub fn apply_gainmap_iso(
    base: &Image,
    gainmap: &Image,
    metadata: &GainmapMetadata,
) -> Result<Vec<f32>> {
    metadata.validate()?;
    let params = metadata.channels();
    let linear = linear_samples(base);
    let gain = resize_bilinear(gainmap, base.width(), base.height())?;
    let gain = gain.to_f32();

    let base_is_hdr = metadata.base_rendition_is_hdr;
    if base_is_hdr {
        log::debug!("baseline is the HDR rendition, gain map not applied");
    }
    Ok(reconstruct(base, &linear, &gain, gainmap.channels(), |b, g, c| {
        if base_is_hdr {
            b
        } else {
            apply_iso(b, g, &params[c])
        }
    }))
}

/// Apply a gain map with the headroom formula.
///
/// The gain map is linearised with the inverse BT.709 OETF and clipped to
/// `[0,1]`; output is clipped at zero.
pub fn apply_gainmap_headroom(base: &Image, gainmap: &Image, headroom: f32) -> Result<Vec<f32>> {
    if !headroom.is_finite() || headroom <= 0.0 {
        return Err(Error::Reconstruction(format!(
            "headroom must be a positive number, got {}",
            headroom
        )));
    }
    let linear = linear_samples(base);
    let gain = resize_bilinear(gainmap, base.width(), base.height())?;
    let gain: Vec<f32> = gain
        .to_f32()
        .into_iter()
        .map(|g| bt709_oetf_inv(g.clamp(0.0, 1.0)).clamp(0.0, 1.0))
        .collect();

    Ok(reconstruct(base, &linear, &gain, gainmap.channels(), |b, g, _| {
        apply_headroom(b.clamp(0.0, 1.0), g, headroom).max(0.0)
    }))
}

fn reconstruct(
    base: &Image,
    linear: &[f32],
    gain: &[f32],
    gain_channels: u8,
    f: impl Fn(f32, f32, usize) -> f32,
) -> Vec<f32> {
    let pixels = base.width() as usize * base.height() as usize;
    let base_channels = base.channels() as usize;
    let gain_channels = gain_channels as usize;

    let mut out = Vec::with_capacity(pixels * 3);
    for i in 0..pixels {
        for c in 0..3 {
            let b = linear[i * base_channels + c.min(base_channels - 1)];
            let g = gain[i * gain_channels + c.min(gain_channels - 1)];
            out.push(f(b, g, c));
        }
    }
    out
}

/// Samples linearised with the image's declared transfer.
pub(crate) fn linear_samples(image: &Image) -> Vec<f32> {
    let transfer = image.color_space().transfer;
    match image.samples() {
        Samples::U8(v) => {
            let lut = EotfLut8::new(transfer);
            v.iter().map(|&s| lut.lookup(s)).collect()
        }
        other => (0..other.len())
            .map(|i| transfer.to_linear(other.normalized(i)))
            .collect(),
    }
}
