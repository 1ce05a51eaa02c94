//! Gain map computation from a linear HDR rendition.

use super::apply::linear_samples;
use crate::color::gamut::ColorSpace;
use crate::color::transfer::Transfer;
use crate::image::{Image, ImageRole, Samples};
use crate::types::{Error, GainmapMetadata, PerChannel, Result};

/// Configuration for gain map computation.
#[derive(Debug, Clone)]
pub struct EncodeConfig {
    /// Gamma recorded in the metadata; the normalized gain is raised to
    /// `1/gamma` before quantization.
    pub gamma: f32,
    /// Percentile of the log2 ratio taken as the gain map minimum.
    pub low_percentile: f32,
    /// Percentile of the log2 ratio taken as the gain map maximum.
    pub high_percentile: f32,
    /// Added to numerator and denominator of the HDR/SDR ratio.
    pub epsilon: f32,
    /// Upper clip of the HDR/SDR ratio.
    pub max_ratio: f32,
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            gamma: 1.0,
            low_percentile: 1.0,
            high_percentile: 99.0,
            epsilon: 1e-6,
            max_ratio: 1000.0,
        }
    }
}

impl EncodeConfig {
    /// Set the gain map gamma.
    pub fn with_gamma(mut self, gamma: f32) -> Self {
        self.gamma = gamma;
        self
    }

    /// Set the percentiles bounding the gain map range.
    pub fn with_percentiles(mut self, low: f32, high: f32) -> Self {
        self.low_percentile = low;
        self.high_percentile = high;
        self
    }

    fn validate(&self) -> Result<()> {
        if !(self.gamma.is_finite() && self.gamma > 0.0) {
            return Err(Error::Reconstruction(format!(
                "encode gamma must be positive, got {}",
                self.gamma
            )));
        }
        if !(0.0..=100.0).contains(&self.low_percentile)
            || !(0.0..=100.0).contains(&self.high_percentile)
            || self.low_percentile > self.high_percentile
        {
            return Err(Error::Reconstruction(format!(
                "invalid percentile range {}..{}",
                self.low_percentile, self.high_percentile
            )));
        }
        if !(self.epsilon > 0.0 && self.max_ratio > self.epsilon) {
            return Err(Error::Reconstruction(
                "epsilon must be positive and below max_ratio".into(),
            ));
        }
        Ok(())
    }
}

/// Result of gain map computation.
#[derive(Debug, Clone)]
pub struct GainmapEncoding {
    /// 8-bit baseline (role SDR).
    pub baseline: Image,
    /// 8-bit three-channel gain map (role GAINMAP), same size as the baseline.
    pub gainmap: Image,
    /// Metadata describing the gain map.
    pub metadata: GainmapMetadata,
}

/// Compute a gain map for interleaved linear RGB `hdr`.
///
/// `hdr` must already be in `baseline_space`'s primaries. When `baseline` is
/// `None` one is derived with the global `x/(1+x)` curve and encoded with
/// `baseline_space`'s transfer. The log2 HDR/baseline ratio is bounded by
/// the configured percentiles, so highlights beyond them clip.
pub fn compute_gainmap(
    hdr: &[f32],
    width: u32,
    height: u32,
    baseline: Option<&Image>,
    baseline_space: ColorSpace,
    config: &EncodeConfig,
) -> Result<GainmapEncoding> {
    config.validate()?;
    let pixels = width as usize * height as usize;
    if hdr.len() != pixels * 3 {
        return Err(Error::Format(format!(
            "{}x{} RGB rendition needs {} samples, got {}",
            width,
            height,
            pixels * 3,
            hdr.len()
        )));
    }

    let baseline = match baseline {
        Some(b) => {
            if b.width() != width || b.height() != height {
                return Err(Error::DimensionMismatch {
                    expected_w: width,
                    expected_h: height,
                    actual_w: b.width(),
                    actual_h: b.height(),
                });
            }
            to_rgb8(b)?
        }
        None => tone_map_baseline(hdr, width, height, baseline_space)?,
    };

    let base_linear = linear_samples(&baseline);
    let eps = config.epsilon;
    let log_ratio: Vec<f32> = hdr
        .iter()
        .zip(&base_linear)
        .map(|(&h, &b)| ((h + eps) / (b + eps)).clamp(eps, config.max_ratio).log2())
        .collect();

    let mut sorted = log_ratio.clone();
    sorted.sort_unstable_by(f32::total_cmp);
    let min = percentile(&sorted, config.low_percentile);
    let max = percentile(&sorted, config.high_percentile);

    let range = max - min + eps;
    let inv_gamma = 1.0 / config.gamma;
    let gain: Vec<u8> = log_ratio
        .iter()
        .map(|&l| {
            let mut norm = ((l - min) / range).clamp(0.0, 1.0);
            if config.gamma != 1.0 {
                norm = norm.powf(inv_gamma);
            }
            (norm * 255.0).round() as u8
        })
        .collect();

    let peak = hdr.iter().copied().fold(f32::MIN, f32::max);
    let metadata = GainmapMetadata {
        minimum_version: 0,
        writer_version: 1,
        baseline_hdr_headroom: 0.0,
        alternate_hdr_headroom: (peak + 1e-6).max(1e-6).log2(),
        gainmap_min: PerChannel::Rgb([min; 3]),
        gainmap_max: PerChannel::Rgb([max; 3]),
        gainmap_gamma: PerChannel::Rgb([config.gamma; 3]),
        baseline_offset: PerChannel::Rgb([0.0; 3]),
        alternate_offset: PerChannel::Rgb([0.0; 3]),
        is_multichannel: true,
        use_base_colour_space: false,
        base_rendition_is_hdr: false,
    };

    log::debug!(
        "computed {}x{} gain map, log2 range [{:.3}, {:.3}]",
        width,
        height,
        min,
        max
    );

    let gainmap = Image::new(
        width,
        height,
        3,
        Samples::U8(gain),
        ColorSpace::SRGB.with_transfer(Transfer::Linear),
        ImageRole::Gainmap,
    )?;

    Ok(GainmapEncoding {
        baseline,
        gainmap,
        metadata,
    })
}

/// Percentile of sorted data with linear interpolation between ranks.
pub fn percentile(sorted: &[f32], p: f32) -> f32 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = (p / 100.0).clamp(0.0, 1.0) * (n - 1) as f32;
            let lo = rank.floor() as usize;
            let hi = (lo + 1).min(n - 1);
            let frac = rank - lo as f32;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        }
    }
}

fn tone_map_baseline(hdr: &[f32], width: u32, height: u32, space: ColorSpace) -> Result<Image> {
    let transfer = space.transfer;
    let data = hdr
        .iter()
        .map(|&x| {
            let x = x.max(0.0);
            let sdr = x / (1.0 + x);
            (transfer.from_linear(sdr) * 255.0).round().clamp(0.0, 255.0) as u8
        })
        .collect();
    Image::new(width, height, 3, Samples::U8(data), space, ImageRole::Sdr)
}

/// Baseline as 8-bit RGB with role SDR.
fn to_rgb8(image: &Image) -> Result<Image> {
    let rgb: Vec<u8> = match (image.samples(), image.channels()) {
        (Samples::U8(v), 3) => v.clone(),
        _ => {
            let n = image.width() as usize * image.height() as usize;
            let mut out = Vec::with_capacity(n * 3);
            for y in 0..image.height() {
                for x in 0..image.width() {
                    for c in 0..3 {
                        let v = image.sample(x, y, c).clamp(0.0, 1.0);
                        out.push((v * 255.0).round() as u8);
                    }
                }
            }
            out
        }
    };
    Image::new(
        image.width(),
        image.height(),
        3,
        Samples::U8(rgb),
        *image.color_space(),
        ImageRole::Sdr,
    )
}
