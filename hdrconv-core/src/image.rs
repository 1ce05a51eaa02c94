//! Image, container and intermediate rendering types.

use crate::color::gamut::ColorSpace;
use crate::limits;
use crate::types::{Error, GainmapMetadata, Result};

/// What an image in a container represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageRole {
    /// Standard dynamic range rendition (the baseline).
    Sdr,
    /// High dynamic range rendition.
    Hdr,
    /// Gain map relating the baseline to the alternate rendition.
    Gainmap,
}

impl core::fmt::Display for ImageRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::Sdr => "SDR",
            Self::Hdr => "HDR",
            Self::Gainmap => "GAINMAP",
        })
    }
}

/// Interleaved sample storage.
#[derive(Debug, Clone, PartialEq)]
pub enum Samples {
    /// 8-bit code values.
    U8(Vec<u8>),
    /// 16-bit code values.
    U16(Vec<u16>),
    /// Floating point values (already normalized or linear).
    F32(Vec<f32>),
}

impl Samples {
    /// Number of stored samples.
    pub fn len(&self) -> usize {
        match self {
            Self::U8(v) => v.len(),
            Self::U16(v) => v.len(),
            Self::F32(v) => v.len(),
        }
    }

    /// True if no samples are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sample `i` normalized to `[0,1]` for integer storage.
    #[inline]
    pub fn normalized(&self, i: usize) -> f32 {
        match self {
            Self::U8(v) => v[i] as f32 / 255.0,
            Self::U16(v) => v[i] as f32 / 65535.0,
            Self::F32(v) => v[i],
        }
    }
}

/// A raster with a declared colour space and role.
///
/// Single-channel images have one sample per pixel; multi-channel images
/// are interleaved RGB.
#[derive(Debug, Clone)]
pub struct Image {
    width: u32,
    height: u32,
    channels: u8,
    samples: Samples,
    color_space: ColorSpace,
    role: ImageRole,
    encoded: Option<Vec<u8>>,
}

impl Image {
    /// Create an image, checking dimensions and sample count.
    pub fn new(
        width: u32,
        height: u32,
        channels: u8,
        samples: Samples,
        color_space: ColorSpace,
        role: ImageRole,
    ) -> Result<Self> {
        validate_dimensions(width, height)?;
        if channels != 1 && channels != 3 {
            return Err(Error::Format(format!(
                "images carry 1 or 3 channels, got {}",
                channels
            )));
        }
        let expected = width as usize * height as usize * channels as usize;
        if samples.len() != expected {
            return Err(Error::Format(format!(
                "{}x{}x{} image needs {} samples, got {}",
                width,
                height,
                channels,
                expected,
                samples.len()
            )));
        }
        Ok(Self {
            width,
            height,
            channels,
            samples,
            color_space,
            role,
            encoded: None,
        })
    }

    /// Attach the compressed bytes this image was decoded from.
    ///
    /// Writers pass these through unchanged instead of re-encoding.
    pub fn with_encoded(mut self, bytes: Vec<u8>) -> Self {
        self.encoded = Some(bytes);
        self
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of interleaved channels (1 or 3).
    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// Declared colour space.
    pub fn color_space(&self) -> &ColorSpace {
        &self.color_space
    }

    /// Role within the container.
    pub fn role(&self) -> ImageRole {
        self.role
    }

    /// Raw sample storage.
    pub fn samples(&self) -> &Samples {
        &self.samples
    }

    /// Source bytes, if the image came from a compressed stream.
    pub fn encoded(&self) -> Option<&[u8]> {
        self.encoded.as_deref()
    }

    /// Normalized sample at `(x, y)` for channel `c`.
    ///
    /// Single-channel images broadcast their value to every channel.
    #[inline]
    pub fn sample(&self, x: u32, y: u32, c: usize) -> f32 {
        let channels = self.channels as usize;
        let c = if channels == 1 { 0 } else { c.min(channels - 1) };
        let idx = (y as usize * self.width as usize + x as usize) * channels + c;
        self.samples.normalized(idx)
    }

    /// All samples as normalized floats.
    pub fn to_f32(&self) -> Vec<f32> {
        match &self.samples {
            Samples::F32(v) => v.clone(),
            other => (0..other.len()).map(|i| other.normalized(i)).collect(),
        }
    }
}

fn validate_dimensions(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(Error::InvalidDimensions(width, height));
    }

    if width > limits::MAX_IMAGE_DIMENSION || height > limits::MAX_IMAGE_DIMENSION {
        return Err(Error::LimitExceeded(format!(
            "dimension {} exceeds maximum {}",
            width.max(height),
            limits::MAX_IMAGE_DIMENSION
        )));
    }

    let total_pixels = width as u64 * height as u64;
    if total_pixels > limits::MAX_TOTAL_PIXELS {
        return Err(Error::LimitExceeded(format!(
            "total pixels {} exceeds maximum {}",
            total_pixels,
            limits::MAX_TOTAL_PIXELS
        )));
    }

    Ok(())
}

/// Typed metadata carried alongside a container's images.
#[derive(Debug, Clone, Default)]
pub struct ContainerMetadata {
    /// ISO 21496-1 / hdrgm gain map parameters.
    pub gainmap: Option<GainmapMetadata>,
    /// Single headroom value (linear multiplier) for headroom-style maps.
    pub headroom: Option<f32>,
    /// ICC profile of the baseline image.
    pub icc_profile: Option<Vec<u8>>,
}

/// Ordered images plus their shared metadata.
#[derive(Debug, Clone, Default)]
pub struct ImageContainer {
    images: Vec<Image>,
    /// Container-level metadata.
    pub metadata: ContainerMetadata,
}

impl ImageContainer {
    /// Empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an image. Each role may appear once.
    pub fn push(&mut self, image: Image) -> Result<()> {
        if self.has_role(image.role()) {
            return Err(Error::Format(format!(
                "container already holds a {} image",
                image.role()
            )));
        }
        self.images.push(image);
        Ok(())
    }

    /// Builder-style [`ImageContainer::push`].
    pub fn with_image(mut self, image: Image) -> Result<Self> {
        self.push(image)?;
        Ok(self)
    }

    /// Images in container order.
    pub fn images(&self) -> &[Image] {
        &self.images
    }

    /// First image with the given role.
    pub fn image(&self, role: ImageRole) -> Option<&Image> {
        self.images.iter().find(|i| i.role() == role)
    }

    /// True if an image with the given role is present.
    pub fn has_role(&self, role: ImageRole) -> bool {
        self.image(role).is_some()
    }
}

/// Linear HDR image in the fixed working space (BT.2020, D65, linear).
///
/// Values are relative to SDR reference white (1.0) and are not clipped.
#[derive(Debug, Clone)]
pub struct IntermediateRendering {
    image: Image,
}

impl IntermediateRendering {
    /// Working space of every rendering.
    pub const COLOR_SPACE: ColorSpace = ColorSpace::BT2020_LINEAR;

    /// Wrap interleaved linear RGB data.
    pub fn new(width: u32, height: u32, data: Vec<f32>) -> Result<Self> {
        let image = Image::new(
            width,
            height,
            3,
            Samples::F32(data),
            Self::COLOR_SPACE,
            ImageRole::Hdr,
        )?;
        Ok(Self { image })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Interleaved linear RGB data.
    pub fn data(&self) -> &[f32] {
        match self.image.samples() {
            Samples::F32(v) => v,
            _ => &[],
        }
    }

    /// Linear RGB at `(x, y)`.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [f32; 3] {
        let idx = (y as usize * self.width() as usize + x as usize) * 3;
        let d = self.data();
        [d[idx], d[idx + 1], d[idx + 2]]
    }

    /// The underlying image (role HDR, working colour space).
    pub fn image(&self) -> &Image {
        &self.image
    }

    /// Unwrap into the underlying image.
    pub fn into_image(self) -> Image {
        self.image
    }
}
