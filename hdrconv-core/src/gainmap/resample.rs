//! Bilinear resampling of gain map planes.

use crate::image::{Image, Samples};
use crate::types::Result;

/// Resize `image` to `width`×`height` with bilinear filtering.
///
/// Sample centres are aligned (`src = (dst + 0.5) * scale - 0.5`) and edges
/// clamp. The result holds normalized `F32` samples with the same channel
/// count, colour space and role as the input.
pub fn resize_bilinear(image: &Image, width: u32, height: u32) -> Result<Image> {
    let channels = image.channels() as usize;
    let data = if image.width() == width && image.height() == height {
        image.to_f32()
    } else {
        let src_w = image.width();
        let src_h = image.height();
        let scale_x = src_w as f32 / width as f32;
        let scale_y = src_h as f32 / height as f32;

        let mut out = Vec::with_capacity(width as usize * height as usize * channels);
        for y in 0..height {
            let (y0, y1, fy) = source_span(y, scale_y, src_h);
            for x in 0..width {
                let (x0, x1, fx) = source_span(x, scale_x, src_w);
                for c in 0..channels {
                    out.push(bilinear(
                        image.sample(x0, y0, c),
                        image.sample(x1, y0, c),
                        image.sample(x0, y1, c),
                        image.sample(x1, y1, c),
                        fx,
                        fy,
                    ));
                }
            }
        }
        out
    };

    Image::new(
        width,
        height,
        image.channels(),
        Samples::F32(data),
        *image.color_space(),
        image.role(),
    )
}

/// Neighbouring source indices and blend weight for destination index `dst`.
#[inline]
fn source_span(dst: u32, scale: f32, src_len: u32) -> (u32, u32, f32) {
    let pos = ((dst as f32 + 0.5) * scale - 0.5).max(0.0);
    let i0 = (pos.floor() as u32).min(src_len - 1);
    let i1 = (i0 + 1).min(src_len - 1);
    (i0, i1, pos - pos.floor())
}

/// Bilinear interpolation.
#[inline(always)]
pub(crate) fn bilinear(v00: f32, v10: f32, v01: f32, v11: f32, fx: f32, fy: f32) -> f32 {
    let top = v00 * (1.0 - fx) + v10 * fx;
    let bottom = v01 * (1.0 - fx) + v11 * fx;
    top * (1.0 - fy) + bottom * fy
}
