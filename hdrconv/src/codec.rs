//! Pixel codec glue: JPEG decode through zune-jpeg, encode through
//! jpeg-encoder.

use hdrconv_core::{limits, ColorSpace, Error, Image, ImageRole, Result, Samples};
use jpeg_encoder::{ColorType, Encoder};
use zune_core::colorspace::ColorSpace as ZuneColorSpace;
use zune_core::options::DecoderOptions;
use zune_jpeg::JpegDecoder;

/// Requested decode layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeLayout {
    /// Interleaved RGB.
    Rgb,
    /// Single luma plane.
    Luma,
    /// Whatever the stream holds: luma for one component, RGB otherwise.
    Native,
}

/// Decode one JPEG stream into an 8-bit [`Image`].
///
/// The image keeps `stream` as its encoded bytes so writers can pass it
/// through unchanged.
pub fn decode_jpeg(
    stream: &[u8],
    layout: DecodeLayout,
    color_space: ColorSpace,
    role: ImageRole,
) -> Result<Image> {
    let (width, height, components) = probe(stream)?;

    let out = match layout {
        DecodeLayout::Rgb => ZuneColorSpace::RGB,
        DecodeLayout::Luma => ZuneColorSpace::Luma,
        DecodeLayout::Native if components == 1 => ZuneColorSpace::Luma,
        DecodeLayout::Native => ZuneColorSpace::RGB,
    };
    let options = DecoderOptions::default()
        .set_max_width(limits::MAX_IMAGE_DIMENSION as usize)
        .set_max_height(limits::MAX_IMAGE_DIMENSION as usize)
        .jpeg_set_out_colorspace(out);

    let mut decoder = JpegDecoder::new_with_options(options, stream);
    let pixels = decoder
        .decode()
        .map_err(|e| Error::Decode(format!("JPEG decode failed: {:?}", e)))?;

    let pixel_count = width as usize * height as usize;
    let channels = match pixels.len().checked_div(pixel_count) {
        Some(c) if c * pixel_count == pixels.len() => c,
        _ => 0,
    };
    let data = match (channels, out) {
        (1, ZuneColorSpace::Luma) | (3, ZuneColorSpace::RGB) => pixels,
        // Grayscale source decoded as RGB by request
        (1, _) => pixels.iter().flat_map(|&g| [g, g, g]).collect(),
        (3, _) => pixels
            .chunks_exact(3)
            .map(|p| (0.2126 * p[0] as f32 + 0.7152 * p[1] as f32 + 0.0722 * p[2] as f32).round() as u8)
            .collect(),
        _ => {
            return Err(Error::Decode(format!(
                "unsupported JPEG layout: {} bytes for {}x{}",
                pixels.len(),
                width,
                height
            )))
        }
    };
    let channels = if out == ZuneColorSpace::Luma { 1 } else { 3 };

    Ok(Image::new(width, height, channels, Samples::U8(data), color_space, role)?
        .with_encoded(stream.to_vec()))
}

/// Read width, height and component count from the stream headers.
pub fn probe(stream: &[u8]) -> Result<(u32, u32, usize)> {
    let mut decoder = JpegDecoder::new(stream);
    decoder
        .decode_headers()
        .map_err(|e| Error::Decode(format!("JPEG header decode failed: {:?}", e)))?;
    let info = decoder
        .info()
        .ok_or_else(|| Error::Decode("JPEG headers carry no frame info".into()))?;
    Ok((info.width as u32, info.height as u32, info.components as usize))
}

/// Encode an 8-bit image as a baseline JPEG.
pub fn encode_jpeg(image: &Image, quality: u8) -> Result<Vec<u8>> {
    let width = u16::try_from(image.width())
        .map_err(|_| Error::Encode(format!("width {} exceeds JPEG limit", image.width())))?;
    let height = u16::try_from(image.height())
        .map_err(|_| Error::Encode(format!("height {} exceeds JPEG limit", image.height())))?;

    let data: Vec<u8> = match image.samples() {
        Samples::U8(v) => v.clone(),
        _ => image
            .to_f32()
            .iter()
            .map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
            .collect(),
    };
    let color_type = if image.channels() == 1 {
        ColorType::Luma
    } else {
        ColorType::Rgb
    };

    let mut out = Vec::new();
    Encoder::new(&mut out, quality)
        .encode(&data, width, height, color_type)
        .map_err(|e| Error::Encode(format!("JPEG encode failed: {}", e)))?;
    Ok(out)
}
