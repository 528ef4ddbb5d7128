use std::io::Cursor;

use anyhow::Context;

use crate::{
    foundation::error::{ConvertError, ConvertResult},
    foundation::math::Fnv1a64,
};

/// Encodes straight-alpha RGBA8 pixels as PNG.
pub trait PngEncoder {
    /// Encode `rgba8` (`width * height * 4` bytes), compositing over `background` when given.
    fn encode(
        &self,
        rgba8: &[u8],
        width: u32,
        height: u32,
        background: Option<[u8; 4]>,
    ) -> ConvertResult<Vec<u8>>;
}

/// [`PngEncoder`] backed by the `image` crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImagePngEncoder;

impl PngEncoder for ImagePngEncoder {
    fn encode(
        &self,
        rgba8: &[u8],
        width: u32,
        height: u32,
        background: Option<[u8; 4]>,
    ) -> ConvertResult<Vec<u8>> {
        let expected = (width as usize) * (height as usize) * 4;
        if rgba8.len() != expected {
            return Err(ConvertError::validation(format!(
                "pixel buffer has {} bytes, expected {expected}",
                rgba8.len()
            )));
        }
        let pixels = match background {
            Some(bg) => composite_over(rgba8, bg),
            None => rgba8.to_vec(),
        };
        let img = image::RgbaImage::from_raw(width, height, pixels)
            .context("wrap pixels as rgba image")?;
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .context("encode png")?;
        Ok(buf)
    }
}

/// Source-over composite of straight-alpha pixels onto a straight-alpha background color.
pub fn composite_over(rgba8: &[u8], bg: [u8; 4]) -> Vec<u8> {
    let ba = f64::from(bg[3]) / 255.0;
    let mut out = Vec::with_capacity(rgba8.len());
    for px in rgba8.chunks_exact(4) {
        let sa = f64::from(px[3]) / 255.0;
        let oa = sa + ba * (1.0 - sa);
        if oa <= 0.0 {
            out.extend_from_slice(&[0, 0, 0, 0]);
            continue;
        }
        for c in 0..3 {
            let v = (f64::from(px[c]) * sa + f64::from(bg[c]) * ba * (1.0 - sa)) / oa;
            out.push(v.round().clamp(0.0, 255.0) as u8);
        }
        out.push((oa * 255.0).round() as u8);
    }
    out
}

/// Content-addressed URI for encoded image bytes: `buffer://<fnv1a64 hex>`.
pub fn buffer_uri(bytes: &[u8]) -> String {
    let mut h = Fnv1a64::new_default();
    h.write_bytes(bytes);
    format!("buffer://{:016x}", h.finish())
}

#[cfg(test)]
#[path = "../../tests/unit/raster/png.rs"]
mod tests;
