//! Common test utilities for synthetic image and container generation.
//!
//! Everything is built in memory, so no binary fixtures are needed.

#![allow(dead_code)]

use hdrconv::codec::encode_jpeg;
use hdrconv::compose::GainmapGenerator;
use hdrconv::formats::{FormatHandler, UltraHdrHandler};
use hdrconv::jpeg::markers::insert_after_soi;
use hdrconv::metadata::xmp::create_xmp_app1_marker;
use hdrconv::{
    ColorSpace, Generator, Image, ImageContainer, ImageRole, IntermediateRendering, Samples,
    Transfer,
};

/// Solid 8-bit image.
pub fn solid(width: u32, height: u32, channels: u8, value: u8, role: ImageRole) -> Image {
    let n = (width * height * channels as u32) as usize;
    let space = match role {
        ImageRole::Gainmap => ColorSpace::SRGB.with_transfer(Transfer::Linear),
        _ => ColorSpace::SRGB,
    };
    Image::new(width, height, channels, Samples::U8(vec![value; n]), space, role).unwrap()
}

/// Horizontal sRGB gradient from black to white.
pub fn sdr_gradient(width: u32, height: u32) -> Image {
    let mut data = Vec::with_capacity((width * height * 3) as usize);
    for _ in 0..height {
        for x in 0..width {
            let v = (x * 255 / (width - 1).max(1)) as u8;
            data.extend_from_slice(&[v, v, v]);
        }
    }
    Image::new(width, height, 3, Samples::U8(data), ColorSpace::SRGB, ImageRole::Sdr).unwrap()
}

/// Linear HDR gradient in the working space, from 0.02 to `peak`.
pub fn hdr_rendering(width: u32, height: u32, peak: f32) -> IntermediateRendering {
    let mut data = Vec::with_capacity((width * height * 3) as usize);
    for _ in 0..height {
        for x in 0..width {
            let t = x as f32 / (width - 1).max(1) as f32;
            let v = 0.02 + t * (peak - 0.02);
            data.extend_from_slice(&[v, v, v]);
        }
    }
    IntermediateRendering::new(width, height, data).unwrap()
}

/// Ultra HDR container generated from an HDR gradient.
pub fn generated_container(width: u32, height: u32, peak: f32) -> ImageContainer {
    GainmapGenerator::default()
        .generate(&hdr_rendering(width, height, peak))
        .unwrap()
}

/// Ultra HDR JPEG bytes for an HDR gradient.
pub fn ultrahdr_bytes(width: u32, height: u32, peak: f32) -> Vec<u8> {
    let mut out = Vec::new();
    UltraHdrHandler::new()
        .write(&mut out, &generated_container(width, height, peak))
        .unwrap();
    out
}

/// Plain baseline JPEG.
pub fn plain_jpeg(width: u32, height: u32, value: u8) -> Vec<u8> {
    encode_jpeg(&solid(width, height, 3, value, ImageRole::Sdr), 90).unwrap()
}

/// Apple-style XMP packet carrying only a headroom.
pub fn apple_xmp(headroom: f32) -> String {
    format!(
        r#"<x:xmpmeta xmlns:x="adobe:ns:meta/"><rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"><rdf:Description xmlns:HDRGainMap="http://ns.apple.com/HDRGainMap/1.0/" HDRGainMap:HDRGainMapVersion="65536" HDRGainMap:HDRGainMapHeadroom="{}"/></rdf:RDF></x:xmpmeta>"#,
        headroom
    )
}

/// Two concatenated JPEGs whose second stream carries an Apple headroom.
pub fn apple_style_jpeg(base: u8, gain: u8, headroom: f32) -> Vec<u8> {
    let primary = plain_jpeg(16, 16, base);
    let gainmap = encode_jpeg(&solid(8, 8, 1, gain, ImageRole::Gainmap), 90).unwrap();
    let xmp = create_xmp_app1_marker(&apple_xmp(headroom)).unwrap();
    let gainmap = insert_after_soi(&gainmap, &[xmp]).unwrap();
    [primary, gainmap].concat()
}
