//! Tone reproduction curves: evaluation and exact inversion.
//!
//! Every variant clips its input to `[0,1]` before use. Parametric curves
//! follow ICC.1:2022 section 10.18 (IEC 61966-2-1 function types 0-4).

use crate::types::{Error, Result};

/// ICC parametric curve, one variant per function type.
///
/// Each variant carries exactly the parameters its type requires, so the
/// arity of a parsed `para` tag is checked once at construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParametricCurve {
    /// Type 0: `Y = X^g`
    Power {
        /// Exponent.
        g: f64,
    },
    /// Type 1 (CIE 122-1966): `Y = (aX+b)^g` for `X >= -b/a`, else `0`
    Cie122 {
        /// Exponent.
        g: f64,
        /// Slope.
        a: f64,
        /// Offset.
        b: f64,
    },
    /// Type 2 (IEC 61966-3): `Y = (aX+b)^g + c` for `X >= -b/a`, else `c`
    Iec61966 {
        /// Exponent.
        g: f64,
        /// Slope.
        a: f64,
        /// Offset.
        b: f64,
        /// Floor.
        c: f64,
    },
    /// Type 3 (sRGB-like): `Y = (aX+b)^g` for `X >= d`, else `cX`
    Srgb {
        /// Exponent.
        g: f64,
        /// Slope.
        a: f64,
        /// Offset.
        b: f64,
        /// Linear segment slope.
        c: f64,
        /// Breakpoint.
        d: f64,
    },
    /// Type 4: `Y = (aX+b)^g + e` for `X >= d`, else `cX + f`
    Full {
        /// Exponent.
        g: f64,
        /// Slope.
        a: f64,
        /// Offset.
        b: f64,
        /// Linear segment slope.
        c: f64,
        /// Breakpoint.
        d: f64,
        /// Power segment offset.
        e: f64,
        /// Linear segment offset.
        f: f64,
    },
}

/// Number of parameters required by each parametric function type.
pub const PARAMETRIC_ARITY: [usize; 5] = [1, 3, 4, 5, 7];

impl ParametricCurve {
    /// Build from an ICC function type and its parameter list.
    pub fn from_params(function_type: u16, params: &[f64]) -> Result<Self> {
        let expected = PARAMETRIC_ARITY
            .get(function_type as usize)
            .copied()
            .ok_or_else(|| {
                Error::Format(format!("unknown parametric function type {}", function_type))
            })?;
        if params.len() != expected {
            return Err(Error::Format(format!(
                "parametric type {} needs {} parameters, got {}",
                function_type,
                expected,
                params.len()
            )));
        }
        let p = params;
        Ok(match function_type {
            0 => Self::Power { g: p[0] },
            1 => Self::Cie122 {
                g: p[0],
                a: p[1],
                b: p[2],
            },
            2 => Self::Iec61966 {
                g: p[0],
                a: p[1],
                b: p[2],
                c: p[3],
            },
            3 => Self::Srgb {
                g: p[0],
                a: p[1],
                b: p[2],
                c: p[3],
                d: p[4],
            },
            _ => Self::Full {
                g: p[0],
                a: p[1],
                b: p[2],
                c: p[3],
                d: p[4],
                e: p[5],
                f: p[6],
            },
        })
    }

    /// ICC function type (0-4).
    pub fn function_type(&self) -> u16 {
        match self {
            Self::Power { .. } => 0,
            Self::Cie122 { .. } => 1,
            Self::Iec61966 { .. } => 2,
            Self::Srgb { .. } => 3,
            Self::Full { .. } => 4,
        }
    }

    /// Parameters in ICC order.
    pub fn params(&self) -> Vec<f64> {
        match *self {
            Self::Power { g } => vec![g],
            Self::Cie122 { g, a, b } => vec![g, a, b],
            Self::Iec61966 { g, a, b, c } => vec![g, a, b, c],
            Self::Srgb { g, a, b, c, d } => vec![g, a, b, c, d],
            Self::Full { g, a, b, c, d, e, f } => vec![g, a, b, c, d, e, f],
        }
    }

    fn exponent(&self) -> f64 {
        match *self {
            Self::Power { g }
            | Self::Cie122 { g, .. }
            | Self::Iec61966 { g, .. }
            | Self::Srgb { g, .. }
            | Self::Full { g, .. } => g,
        }
    }

    fn evaluate(&self, x: f64) -> f64 {
        match *self {
            Self::Power { g } => x.powf(g),
            Self::Cie122 { g, a, b } => {
                let base = a * x + b;
                if base >= 0.0 {
                    base.powf(g)
                } else {
                    0.0
                }
            }
            Self::Iec61966 { g, a, b, c } => {
                let base = a * x + b;
                if base >= 0.0 {
                    base.powf(g) + c
                } else {
                    c
                }
            }
            Self::Srgb { g, a, b, c, d } => {
                if x >= d {
                    (a * x + b).max(0.0).powf(g)
                } else {
                    c * x
                }
            }
            Self::Full { g, a, b, c, d, e, f } => {
                if x >= d {
                    (a * x + b).max(0.0).powf(g) + e
                } else {
                    c * x + f
                }
            }
        }
    }

    fn invert(&self, y: f64) -> Result<f64> {
        let g = self.exponent();
        if g <= 0.0 || !g.is_finite() {
            return Err(Error::Capability(format!(
                "parametric curve with exponent {} has no inverse",
                g
            )));
        }
        let inv_g = 1.0 / g;
        let power_inverse = |v: f64, a: f64, b: f64| -> Result<f64> {
            if a == 0.0 {
                return Err(Error::Capability(
                    "parametric curve with zero slope has no inverse".into(),
                ));
            }
            Ok((v.max(0.0).powf(inv_g) - b) / a)
        };

        let x = match *self {
            Self::Power { .. } => y.powf(inv_g),
            Self::Cie122 { a, b, .. } => power_inverse(y, a, b)?,
            Self::Iec61966 { a, b, c, .. } => power_inverse(y - c, a, b)?,
            Self::Srgb { a, b, c, d, .. } => {
                let threshold = (a * d + b).max(0.0).powf(g);
                if y >= threshold {
                    power_inverse(y, a, b)?
                } else if c != 0.0 {
                    y / c
                } else {
                    0.0
                }
            }
            Self::Full { a, b, c, d, e, f, .. } => {
                let threshold = (a * d + b).max(0.0).powf(g) + e;
                if y >= threshold {
                    power_inverse(y - e, a, b)?
                } else if c != 0.0 {
                    (y - f) / c
                } else {
                    0.0
                }
            }
        };
        Ok(x.clamp(0.0, 1.0))
    }
}

/// A tone reproduction curve.
#[derive(Debug, Clone, PartialEq)]
pub enum ToneCurve {
    /// Identity.
    Linear,
    /// Pure power law with the given exponent.
    Gamma(f64),
    /// Equally spaced samples in `[0,1]`, interpolated linearly.
    Sampled(Vec<f64>),
    /// ICC parametric function.
    Parametric(ParametricCurve),
}

impl ToneCurve {
    /// Encoded → linear.
    pub fn evaluate(&self, value: f64) -> f64 {
        let v = clip_unit(value);
        match self {
            Self::Linear => v,
            Self::Gamma(g) => v.powf(*g),
            Self::Sampled(samples) => sample_lerp(samples, v),
            Self::Parametric(p) => p.evaluate(v),
        }
    }

    /// Linear → encoded.
    ///
    /// Sampled curves are inverted by searching the monotonic sample table;
    /// flat runs resolve to their lowest input.
    pub fn invert(&self, value: f64) -> Result<f64> {
        let v = clip_unit(value);
        match self {
            Self::Linear => Ok(v),
            Self::Gamma(g) => {
                if *g <= 0.0 || !g.is_finite() {
                    return Err(Error::Capability(format!(
                        "gamma curve with exponent {} has no inverse",
                        g
                    )));
                }
                Ok(v.powf(1.0 / g))
            }
            Self::Sampled(samples) => Ok(sample_inverse(samples, v)),
            Self::Parametric(p) => p.invert(v),
        }
    }

    /// True when evaluation is the identity.
    pub fn is_linear(&self) -> bool {
        match self {
            Self::Linear => true,
            Self::Gamma(g) => *g == 1.0,
            Self::Parametric(ParametricCurve::Power { g }) => *g == 1.0,
            _ => false,
        }
    }
}

#[inline]
fn clip_unit(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

fn sample_lerp(samples: &[f64], v: f64) -> f64 {
    match samples.len() {
        0 => v,
        1 => samples[0],
        n => {
            let pos = v * (n - 1) as f64;
            let lo = (pos.floor() as usize).min(n - 1);
            let hi = (lo + 1).min(n - 1);
            let frac = pos - lo as f64;
            samples[lo] * (1.0 - frac) + samples[hi] * frac
        }
    }
}

fn sample_inverse(samples: &[f64], y: f64) -> f64 {
    let n = samples.len();
    if n == 0 {
        return y;
    }
    if n == 1 {
        return 0.0;
    }
    let increasing = samples[n - 1] >= samples[0];
    let i = if increasing {
        samples.partition_point(|&s| s < y)
    } else {
        samples.partition_point(|&s| s > y)
    };
    if i == 0 {
        return 0.0;
    }
    if i >= n {
        return 1.0;
    }
    let (s0, s1) = (samples[i - 1], samples[i]);
    let t = if s1 != s0 { (y - s0) / (s1 - s0) } else { 0.0 };
    ((i - 1) as f64 + t.clamp(0.0, 1.0)) / (n - 1) as f64
}
