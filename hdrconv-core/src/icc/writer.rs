//! Matrix/TRC display profile generation.
//!
//! Used to embed the baseline colour space when writing containers, and by
//! tests to produce profiles with known matrices and curves.

use super::tags::to_s15_fixed16;
use crate::color::curve::{ParametricCurve, ToneCurve};
use crate::color::gamut::{bradford_adaptation, xy_to_xyz, ColorSpace, D50_XYZ};
use crate::color::matrix::Matrix3;
use crate::color::transfer::Transfer;

/// Number of entries written for sampled HDR curves.
const SAMPLED_CURVE_LEN: usize = 1024;

/// Builds an ICC v4.3 `mntr` RGB profile with an XYZ PCS.
#[derive(Debug, Clone)]
pub struct ProfileBuilder {
    space: ColorSpace,
    description: String,
    curves: Option<[ToneCurve; 3]>,
    colorants: Option<Matrix3>,
    chad: Option<Option<Matrix3>>,
}

impl ProfileBuilder {
    /// Start a profile for `space`, with its transfer as the TRC.
    pub fn new(space: ColorSpace) -> Self {
        Self {
            space,
            description: String::from("RGB"),
            curves: None,
            colorants: None,
            chad: None,
        }
    }

    /// Set the profile description.
    pub fn description(mut self, text: &str) -> Self {
        self.description = text.to_string();
        self
    }

    /// Use one curve for all three channels.
    pub fn tone_curve(mut self, curve: ToneCurve) -> Self {
        self.curves = Some([curve.clone(), curve.clone(), curve]);
        self
    }

    /// Use separate red, green and blue curves.
    pub fn channel_curves(mut self, curves: [ToneCurve; 3]) -> Self {
        self.curves = Some(curves);
        self
    }

    /// Override the PCS colorant matrix (columns are rXYZ, gXYZ, bXYZ).
    pub fn colorants(mut self, m: Matrix3) -> Self {
        self.colorants = Some(m);
        self
    }

    /// Override the `chad` tag; `None` omits it.
    pub fn chromatic_adaptation(mut self, m: Option<Matrix3>) -> Self {
        self.chad = Some(m);
        self
    }

    /// Serialize the profile.
    pub fn build(&self) -> Vec<u8> {
        let white = xy_to_xyz(self.space.white);
        let chad = match self.chad {
            Some(explicit) => explicit,
            None => bradford_adaptation(white, D50_XYZ),
        };
        let colorants = self.colorants.or_else(|| {
            let to_xyz = self.space.rgb_to_xyz()?;
            Some(match chad {
                Some(c) => c.multiply(&to_xyz),
                None => to_xyz,
            })
        });
        let curves = self
            .curves
            .clone()
            .unwrap_or_else(|| {
                let c = tone_curve_for(self.space.transfer);
                [c.clone(), c.clone(), c]
            });

        let mut tags: Vec<([u8; 4], Vec<u8>)> = Vec::with_capacity(10);
        tags.push((*b"desc", mluc_tag(&self.description)));
        tags.push((*b"cprt", mluc_tag("No copyright, use freely")));
        tags.push((*b"wtpt", xyz_tag(D50_XYZ)));
        if let Some(c) = chad {
            tags.push((*b"chad", sf32_tag(&c)));
        }
        if let Some(m) = colorants {
            tags.push((*b"rXYZ", xyz_tag(m.column(0))));
            tags.push((*b"gXYZ", xyz_tag(m.column(1))));
            tags.push((*b"bXYZ", xyz_tag(m.column(2))));
        }
        let [r, g, b] = curves;
        tags.push((*b"rTRC", curve_tag(&r)));
        tags.push((*b"gTRC", curve_tag(&g)));
        tags.push((*b"bTRC", curve_tag(&b)));

        assemble(&tags)
    }
}

/// ICC curve describing a transfer function's decoding direction.
pub fn tone_curve_for(transfer: Transfer) -> ToneCurve {
    match transfer {
        Transfer::Linear => ToneCurve::Linear,
        Transfer::Srgb => ToneCurve::Parametric(ParametricCurve::Srgb {
            g: 2.4,
            a: 1.0 / 1.055,
            b: 0.055 / 1.055,
            c: 1.0 / 12.92,
            d: 0.04045,
        }),
        Transfer::Bt709 => ToneCurve::Parametric(ParametricCurve::Srgb {
            g: 1.0 / 0.45,
            a: 1.0 / 1.099,
            b: 0.099 / 1.099,
            c: 1.0 / 4.5,
            d: 0.081,
        }),
        Transfer::Pq | Transfer::Hlg => {
            let peak = transfer.to_linear(1.0);
            let samples = (0..SAMPLED_CURVE_LEN)
                .map(|i| {
                    let v = i as f32 / (SAMPLED_CURVE_LEN - 1) as f32;
                    (transfer.to_linear(v) / peak).clamp(0.0, 1.0) as f64
                })
                .collect();
            ToneCurve::Sampled(samples)
        }
    }
}

fn assemble(tags: &[([u8; 4], Vec<u8>)]) -> Vec<u8> {
    let mut profile = Vec::with_capacity(1024);

    // Size placeholder, CMM
    profile.extend_from_slice(&[0u8; 8]);
    // Version 4.3.0
    profile.extend_from_slice(&[0x04, 0x30, 0x00, 0x00]);
    profile.extend_from_slice(b"mntr");
    profile.extend_from_slice(b"RGB ");
    profile.extend_from_slice(b"XYZ ");
    // Date/time
    profile.extend_from_slice(&[0u8; 12]);
    profile.extend_from_slice(b"acsp");
    // Platform, flags, manufacturer, model
    profile.extend_from_slice(&[0u8; 16]);
    // Device attributes
    profile.extend_from_slice(&[0u8; 8]);
    // Rendering intent: perceptual
    profile.extend_from_slice(&[0u8; 4]);
    // PCS illuminant
    for v in D50_XYZ {
        profile.extend_from_slice(&to_s15_fixed16(v));
    }
    // Creator, profile ID, reserved
    profile.extend_from_slice(&[0u8; 4 + 16 + 28]);
    debug_assert_eq!(profile.len(), 128);

    profile.extend_from_slice(&(tags.len() as u32).to_be_bytes());
    let mut data_offset = 128 + 4 + tags.len() * 12;
    let mut tag_data = Vec::new();
    for (sig, data) in tags {
        profile.extend_from_slice(sig);
        profile.extend_from_slice(&(data_offset as u32).to_be_bytes());
        profile.extend_from_slice(&(data.len() as u32).to_be_bytes());
        tag_data.extend_from_slice(data);
        pad_to_align4(&mut tag_data);
        data_offset += align4(data.len());
    }
    profile.extend(tag_data);

    let size = profile.len() as u32;
    profile[0..4].copy_from_slice(&size.to_be_bytes());
    profile
}

fn mluc_tag(text: &str) -> Vec<u8> {
    let utf16: Vec<u8> = text.encode_utf16().flat_map(|u| u.to_be_bytes()).collect();
    let mut data = Vec::with_capacity(28 + utf16.len());
    data.extend_from_slice(b"mluc");
    data.extend_from_slice(&[0u8; 4]);
    data.extend_from_slice(&1u32.to_be_bytes()); // records
    data.extend_from_slice(&12u32.to_be_bytes()); // record size
    data.extend_from_slice(b"enUS");
    data.extend_from_slice(&(utf16.len() as u32).to_be_bytes());
    data.extend_from_slice(&28u32.to_be_bytes());
    data.extend_from_slice(&utf16);
    data
}

fn xyz_tag(xyz: [f64; 3]) -> Vec<u8> {
    let mut data = Vec::with_capacity(20);
    data.extend_from_slice(b"XYZ ");
    data.extend_from_slice(&[0u8; 4]);
    for v in xyz {
        data.extend_from_slice(&to_s15_fixed16(v));
    }
    data
}

fn sf32_tag(m: &Matrix3) -> Vec<u8> {
    let mut data = Vec::with_capacity(44);
    data.extend_from_slice(b"sf32");
    data.extend_from_slice(&[0u8; 4]);
    for v in m.0.iter().flatten() {
        data.extend_from_slice(&to_s15_fixed16(*v));
    }
    data
}

fn curve_tag(curve: &ToneCurve) -> Vec<u8> {
    let mut data = Vec::new();
    match curve {
        ToneCurve::Linear => {
            data.extend_from_slice(b"curv\0\0\0\0");
            data.extend_from_slice(&0u32.to_be_bytes());
        }
        ToneCurve::Gamma(g) => {
            data.extend_from_slice(b"curv\0\0\0\0");
            data.extend_from_slice(&1u32.to_be_bytes());
            // u8Fixed8Number
            let fixed = (g * 256.0).round().clamp(0.0, u16::MAX as f64) as u16;
            data.extend_from_slice(&fixed.to_be_bytes());
        }
        ToneCurve::Sampled(samples) => {
            data.extend_from_slice(b"curv\0\0\0\0");
            data.extend_from_slice(&(samples.len() as u32).to_be_bytes());
            for s in samples {
                let v = (s.clamp(0.0, 1.0) * 65535.0).round() as u16;
                data.extend_from_slice(&v.to_be_bytes());
            }
        }
        ToneCurve::Parametric(p) => {
            data.extend_from_slice(b"para\0\0\0\0");
            data.extend_from_slice(&p.function_type().to_be_bytes());
            data.extend_from_slice(&[0u8; 2]);
            for v in p.params() {
                data.extend_from_slice(&to_s15_fixed16(v));
            }
        }
    }
    data
}

fn align4(size: usize) -> usize {
    (size + 3) & !3
}

fn pad_to_align4(data: &mut Vec<u8>) {
    while data.len() % 4 != 0 {
        data.push(0);
    }
}
