//! Common test utilities for synthetic profile and image generation.
//!
//! These helpers build ICC profiles and rasters programmatically, avoiding
//! the need to include binary test files in the repository.

#![allow(dead_code)]

use hdrconv_core::{ColorSpace, Image, ImageRole, Matrix3, Samples};

/// Encode a value as an ICC s15Fixed16Number.
pub fn s15(value: f64) -> [u8; 4] {
    ((value * 65536.0).round() as i32).to_be_bytes()
}

/// `XYZ ` tag.
pub fn xyz_tag(xyz: [f64; 3]) -> Vec<u8> {
    let mut data = b"XYZ \0\0\0\0".to_vec();
    for v in xyz {
        data.extend_from_slice(&s15(v));
    }
    data
}

/// `sf32` tag holding a row-major 3×3 matrix.
pub fn sf32_tag(m: &Matrix3) -> Vec<u8> {
    let mut data = b"sf32\0\0\0\0".to_vec();
    for v in m.0.iter().flatten() {
        data.extend_from_slice(&s15(*v));
    }
    data
}

/// `curv` tag with a single gamma entry (u8Fixed8).
pub fn gamma_tag(gamma: f64) -> Vec<u8> {
    let mut data = b"curv\0\0\0\0".to_vec();
    data.extend_from_slice(&1u32.to_be_bytes());
    data.extend_from_slice(&((gamma * 256.0).round() as u16).to_be_bytes());
    data
}

/// `para` tag of the given function type.
pub fn para_tag(function_type: u16, params: &[f64]) -> Vec<u8> {
    let mut data = b"para\0\0\0\0".to_vec();
    data.extend_from_slice(&function_type.to_be_bytes());
    data.extend_from_slice(&[0, 0]);
    for p in params {
        data.extend_from_slice(&s15(*p));
    }
    data
}

/// Assemble a minimal RGB/XYZ display profile from raw tags.
pub fn build_profile(tags: &[(&[u8; 4], Vec<u8>)]) -> Vec<u8> {
    let mut header = vec![0u8; 128];
    header[8] = 4;
    header[12..16].copy_from_slice(b"mntr");
    header[16..20].copy_from_slice(b"RGB ");
    header[20..24].copy_from_slice(b"XYZ ");
    header[36..40].copy_from_slice(b"acsp");

    let mut table = (tags.len() as u32).to_be_bytes().to_vec();
    let mut body = Vec::new();
    let mut offset = 128 + 4 + tags.len() * 12;
    for (sig, data) in tags {
        table.extend_from_slice(*sig);
        table.extend_from_slice(&(offset as u32).to_be_bytes());
        table.extend_from_slice(&(data.len() as u32).to_be_bytes());
        body.extend_from_slice(data);
        while body.len() % 4 != 0 {
            body.push(0);
        }
        offset = 128 + 4 + tags.len() * 12 + body.len();
    }

    let mut profile = header;
    profile.extend(table);
    profile.extend(body);
    let size = profile.len() as u32;
    profile[0..4].copy_from_slice(&size.to_be_bytes());
    profile
}

/// Colorant tags for an identity colorant matrix.
pub fn identity_colorants() -> Vec<(&'static [u8; 4], Vec<u8>)> {
    vec![
        (b"rXYZ", xyz_tag([1.0, 0.0, 0.0])),
        (b"gXYZ", xyz_tag([0.0, 1.0, 0.0])),
        (b"bXYZ", xyz_tag([0.0, 0.0, 1.0])),
    ]
}

/// Solid 8-bit RGB image.
pub fn solid_rgb8(width: u32, height: u32, rgb: [u8; 3], space: ColorSpace, role: ImageRole) -> Image {
    let data = (0..width * height).flat_map(|_| rgb).collect();
    Image::new(width, height, 3, Samples::U8(data), space, role).unwrap()
}

/// Solid single-channel 8-bit plane.
pub fn solid_plane(width: u32, height: u32, value: u8, space: ColorSpace, role: ImageRole) -> Image {
    Image::new(
        width,
        height,
        1,
        Samples::U8(vec![value; (width * height) as usize]),
        space,
        role,
    )
    .unwrap()
}

/// Linear HDR gradient from black to `peak` along x.
pub fn hdr_gradient(width: u32, height: u32, peak: f32) -> Vec<f32> {
    let mut data = Vec::with_capacity((width * height * 3) as usize);
    for _y in 0..height {
        for x in 0..width {
            let t = x as f32 / (width - 1).max(1) as f32;
            let v = t * peak;
            data.extend_from_slice(&[v, v, v]);
        }
    }
    data
}
