//! Transfer functions (EOTF/OETF) for the colour spaces images declare.
//!
//! - OETF: scene linear → encoded
//! - EOTF: encoded → display linear
//!
//! Reference standards:
//! - sRGB: IEC 61966-2-1
//! - BT.709: ITU-R BT.709-6
//! - PQ: SMPTE ST 2084, ITU-R BT.2100
//! - HLG: ITU-R BT.2100, ARIB STD-B67

#![allow(clippy::excessive_precision)]

use crate::types::luminance;

/// Transfer characteristics of an image's encoded samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transfer {
    /// Samples are already linear light.
    Linear,
    /// sRGB piecewise curve (IEC 61966-2-1).
    #[default]
    Srgb,
    /// BT.709 camera OETF.
    Bt709,
    /// Perceptual Quantizer (SMPTE ST 2084).
    Pq,
    /// Hybrid Log-Gamma (BT.2100).
    Hlg,
}

impl Transfer {
    /// Encoded `[0,1]` → linear relative to SDR reference white (1.0).
    ///
    /// PQ and HLG decode to absolute luminance first and are then divided
    /// by [`luminance::SDR_WHITE_NITS`], so their output can exceed 1.0.
    #[inline]
    pub fn to_linear(self, encoded: f32) -> f32 {
        match self {
            Self::Linear => encoded,
            Self::Srgb => srgb_eotf(encoded),
            Self::Bt709 => bt709_oetf_inv(encoded),
            Self::Pq => pq_eotf(encoded) * luminance::PQ_PEAK_NITS / luminance::SDR_WHITE_NITS,
            Self::Hlg => hlg_eotf(encoded, luminance::HLG_PEAK_NITS) / luminance::SDR_WHITE_NITS,
        }
    }

    /// Linear relative to SDR reference white → encoded `[0,1]`.
    #[inline]
    pub fn from_linear(self, linear: f32) -> f32 {
        match self {
            Self::Linear => linear,
            Self::Srgb => srgb_oetf(linear.clamp(0.0, 1.0)),
            Self::Bt709 => bt709_oetf(linear.clamp(0.0, 1.0)),
            Self::Pq => pq_oetf(linear * luminance::SDR_WHITE_NITS / luminance::PQ_PEAK_NITS),
            Self::Hlg => {
                let nits = linear * luminance::SDR_WHITE_NITS;
                hlg_oetf(hlg_ootf_inv(nits, luminance::HLG_PEAK_NITS))
            }
        }
    }

    /// True for the HDR transfer functions (PQ, HLG).
    pub fn is_hdr(self) -> bool {
        matches!(self, Self::Pq | Self::Hlg)
    }
}

// ============================================================================
// sRGB Transfer Function (IEC 61966-2-1)
// ============================================================================

/// sRGB OETF: Linear `[0,1]` → sRGB encoded `[0,1]`
#[inline]
pub fn srgb_oetf(linear: f32) -> f32 {
    if linear <= 0.0031308 {
        linear * 12.92
    } else {
        1.055 * linear.powf(1.0 / 2.4) - 0.055
    }
}

/// sRGB EOTF (inverse OETF): sRGB encoded `[0,1]` → Linear `[0,1]`
#[inline]
pub fn srgb_eotf(encoded: f32) -> f32 {
    if encoded <= 0.04045 {
        encoded / 12.92
    } else {
        ((encoded + 0.055) / 1.055).powf(2.4)
    }
}

// ============================================================================
// BT.709 OETF (ITU-R BT.709-6)
// ============================================================================

/// BT.709 OETF: Linear `[0,1]` → encoded `[0,1]`
#[inline]
pub fn bt709_oetf(linear: f32) -> f32 {
    if linear < 0.018 {
        linear * 4.5
    } else {
        1.099 * linear.powf(0.45) - 0.099
    }
}

/// Inverse BT.709 OETF: encoded `[0,1]` → Linear `[0,1]`
///
/// The threshold is the OETF image of the 0.018 breakpoint.
#[inline]
pub fn bt709_oetf_inv(encoded: f32) -> f32 {
    if encoded <= 0.08145 {
        encoded / 4.5
    } else {
        ((encoded + 0.099) / 1.099).powf(1.0 / 0.45)
    }
}

// ============================================================================
// PQ Transfer Function (SMPTE ST 2084 / ITU-R BT.2100)
// ============================================================================

const PQ_M1: f32 = 2610.0 / 16384.0; // 0.1593017578125
const PQ_M2: f32 = 2523.0 / 4096.0 * 128.0; // 78.84375
const PQ_C1: f32 = 3424.0 / 4096.0; // 0.8359375
const PQ_C2: f32 = 2413.0 / 4096.0 * 32.0; // 18.8515625
const PQ_C3: f32 = 2392.0 / 4096.0 * 32.0; // 18.6875

/// PQ OETF: Linear `[0,1]` (1.0 = 10000 nits) → PQ encoded `[0,1]`
#[inline]
pub fn pq_oetf(linear: f32) -> f32 {
    if linear <= 0.0 {
        return 0.0;
    }

    let y_m1 = linear.powf(PQ_M1);
    let numerator = PQ_C1 + PQ_C2 * y_m1;
    let denominator = 1.0 + PQ_C3 * y_m1;
    (numerator / denominator).powf(PQ_M2)
}

/// PQ EOTF: PQ encoded `[0,1]` → Linear `[0,1]` (1.0 = 10000 nits)
#[inline]
pub fn pq_eotf(encoded: f32) -> f32 {
    if encoded <= 0.0 {
        return 0.0;
    }

    let e_inv_m2 = encoded.powf(1.0 / PQ_M2);
    let numerator = (e_inv_m2 - PQ_C1).max(0.0);
    let denominator = PQ_C2 - PQ_C3 * e_inv_m2;

    if denominator <= 0.0 {
        return 0.0;
    }

    (numerator / denominator).powf(1.0 / PQ_M1)
}

// ============================================================================
// HLG Transfer Function (ITU-R BT.2100 / ARIB STD-B67)
// ============================================================================

const HLG_A: f32 = 0.17883277;
const HLG_B: f32 = 0.28466892; // 1 - 4*a
const HLG_C: f32 = 0.55991073; // 0.5 - a*ln(4*a)

/// HLG OETF: Scene linear `[0,1]` → HLG encoded `[0,1]`
#[inline]
pub fn hlg_oetf(linear: f32) -> f32 {
    if linear <= 0.0 {
        return 0.0;
    }

    if linear <= 1.0 / 12.0 {
        (3.0 * linear).sqrt()
    } else {
        HLG_A * (12.0 * linear - HLG_B).ln() + HLG_C
    }
}

/// HLG inverse OETF: HLG encoded `[0,1]` → Scene linear `[0,1]`
#[inline]
pub fn hlg_oetf_inv(encoded: f32) -> f32 {
    if encoded <= 0.0 {
        return 0.0;
    }

    if encoded <= 0.5 {
        encoded * encoded / 3.0
    } else {
        ((encoded - HLG_C) / HLG_A).exp() / 12.0 + HLG_B / 12.0
    }
}

fn hlg_system_gamma(display_peak_nits: f32) -> f32 {
    (1.2 + 0.42 * (display_peak_nits / 1000.0).log10()).clamp(1.0, 1.5)
}

/// HLG OOTF: scene linear → display luminance in nits.
#[inline]
pub fn hlg_ootf(scene_linear: f32, display_peak_nits: f32) -> f32 {
    let gamma = hlg_system_gamma(display_peak_nits);
    scene_linear.powf(gamma - 1.0) * scene_linear * display_peak_nits
}

/// HLG inverse OOTF: display luminance in nits → scene linear.
#[inline]
pub fn hlg_ootf_inv(display_nits: f32, display_peak_nits: f32) -> f32 {
    if display_nits <= 0.0 || display_peak_nits <= 0.0 {
        return 0.0;
    }

    let gamma = hlg_system_gamma(display_peak_nits);
    (display_nits / display_peak_nits).powf(1.0 / gamma)
}

/// HLG EOTF: HLG encoded `[0,1]` → display luminance in nits.
#[inline]
pub fn hlg_eotf(encoded: f32, display_peak_nits: f32) -> f32 {
    hlg_ootf(hlg_oetf_inv(encoded), display_peak_nits)
}

// ============================================================================
// LUT for 8-bit inputs
// ============================================================================

/// Precomputed linearisation table for 8-bit samples.
pub struct EotfLut8 {
    table: [f32; 256],
}

impl EotfLut8 {
    /// Build the table for `transfer`.
    pub fn new(transfer: Transfer) -> Self {
        Self::from_fn(|v| transfer.to_linear(v))
    }

    /// Build the table from an arbitrary decoding function of `[0,1]` input.
    pub fn from_fn(f: impl Fn(f32) -> f32) -> Self {
        let mut table = [0.0f32; 256];
        for (i, entry) in table.iter_mut().enumerate() {
            *entry = f(i as f32 / 255.0);
        }
        Self { table }
    }

    /// Look up the linear value for an 8-bit encoded value.
    #[inline]
    pub fn lookup(&self, encoded: u8) -> f32 {
        self.table[encoded as usize]
    }
}
