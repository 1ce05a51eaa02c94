//! Colour handling: tone curves, matrices, transfer functions, gamuts and
//! the profile-driven RGB ↔ XYZ transform.

pub mod curve;
pub mod gamut;
pub mod matrix;
pub mod transfer;
pub mod transform;

pub use curve::{ParametricCurve, ToneCurve};
pub use gamut::{ColorSpace, Primaries};
pub use matrix::Matrix3;
pub use transfer::Transfer;
pub use transform::ColorTransform;
