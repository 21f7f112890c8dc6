pub mod batch;
pub mod fonts;
pub mod normalize;
pub mod text;

use image::{ImageEncoder, Rgb, RgbImage};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid color: {0}")]
    InvalidColor(String),
    #[error("invalid template image: {0}")]
    Template(String),
    #[error("failed to encode png: {0}")]
    Encode(String),
}

/// Parse a `#RRGGBB` hex color (leading `#` optional).
pub fn hex_color(s: &str) -> Result<Rgb<u8>, RenderError> {
    let t = s.trim().trim_start_matches('#');
    if t.len() != 6 {
        return Err(RenderError::InvalidColor(s.to_string()));
    }
    let b = hex::decode(t).map_err(|_| RenderError::InvalidColor(s.to_string()))?;
    Ok(Rgb([b[0], b[1], b[2]]))
}

pub fn encode_png(img: &RgbImage) -> Result<Vec<u8>, RenderError> {
    let mut buf = Vec::new();
    let enc = image::codecs::png::PngEncoder::new(&mut buf);
    enc.write_image(
        img.as_raw(),
        img.width(),
        img.height(),
        image::ExtendedColorType::Rgb8,
    )
    .map_err(|e| RenderError::Encode(e.to_string()))?;
    Ok(buf)
}

/// Fractional position within a template, `(0, 0)` = top-left,
/// `(1, 1)` = bottom-right. Not clamped.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Anchor {
    pub x: f32,
    pub y: f32,
}

impl Anchor {
    pub const CENTER: Anchor = Anchor { x: 0.5, y: 0.5 };

    pub fn to_pixels(self, width: u32, height: u32) -> (f32, f32) {
        (self.x * width as f32, self.y * height as f32)
    }
}
