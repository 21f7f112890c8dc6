use image::{Rgb, RgbImage};
use rusttype::{point, Font, Scale};

/// Floor of the auto-fit search. Text that still overflows at this size is
/// drawn anyway; readable-but-overflowing beats unreadably small.
pub const MIN_FONT_SIZE: f32 = 18.0;

/// Starting size for the auto-fit search, as a fraction of template height.
pub const MAX_HEIGHT_RATIO: f32 = 0.12;

pub const DEFAULT_STROKE_WIDTH: u32 = 3;
pub const DEFAULT_WIDTH_MARGIN: f32 = 0.9;

/// Vertical anchor semantics. Horizontal placement is always centered on
/// the anchor x.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Alignment {
    /// Anchor is the vertical middle of the text (mid-line).
    Center,
    /// Anchor is the ascender line; text hangs below it.
    Top,
    /// Anchor is the descender line; text sits above it.
    Bottom,
}

#[derive(Clone, Copy, Debug)]
pub struct TextStyle {
    pub color: Rgb<u8>,
    pub stroke_color: Rgb<u8>,
    pub stroke_width: u32,
    pub width_margin_ratio: f32,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            color: Rgb([255, 255, 255]),
            stroke_color: Rgb([0, 0, 0]),
            stroke_width: DEFAULT_STROKE_WIDTH,
            width_margin_ratio: DEFAULT_WIDTH_MARGIN,
        }
    }
}

/// Horizontal extent of the rendered glyph ink at `scale`, as
/// `(min_x, max_x)` relative to a layout origin of x = 0. `None` when the
/// text produces no ink (empty or whitespace-only).
fn ink_bounds(font: &Font, scale: Scale, text: &str) -> Option<(f32, f32)> {
    let v = font.v_metrics(scale);
    let mut min_x = f32::MAX;
    let mut max_x = f32::MIN;
    for g in font.layout(text, scale, point(0.0, v.ascent)) {
        if let Some(bb) = g.pixel_bounding_box() {
            min_x = min_x.min(bb.min.x as f32);
            max_x = max_x.max(bb.max.x as f32);
        }
    }
    (max_x > min_x).then_some((min_x, max_x))
}

/// Visual width of `text` at `scale`, including the stroke on both sides.
/// The stroke expands the bounding box; measuring without it would let
/// outlines clip at the template edges.
pub(crate) fn measure_width(font: &Font, scale: Scale, text: &str, stroke_width: u32) -> f32 {
    match ink_bounds(font, scale, text) {
        Some((min_x, max_x)) => (max_x - min_x) + 2.0 * stroke_width as f32,
        None => 0.0,
    }
}

/// Largest font size in `[MIN_FONT_SIZE, floor(height * MAX_HEIGHT_RATIO)]`
/// whose stroke-inclusive width fits in `width * width_margin_ratio`,
/// searching downward in steps of 2. Falls back to `MIN_FONT_SIZE` when
/// nothing in range fits; the caller accepts the overflow.
pub(crate) fn fit_font_size(
    font: &Font,
    text: &str,
    width: u32,
    height: u32,
    stroke_width: u32,
    width_margin_ratio: f32,
) -> f32 {
    let max_size = (height as f32 * MAX_HEIGHT_RATIO).floor();
    let budget = width as f32 * width_margin_ratio;

    let mut size = max_size;
    while size >= MIN_FONT_SIZE {
        if measure_width(font, Scale::uniform(size), text, stroke_width) <= budget {
            return size;
        }
        size -= 2.0;
    }
    MIN_FONT_SIZE
}

/// Draw `text` onto `img`, auto-fitted to the image width and anchored at
/// `anchor_px` with the given alignment. The fill is drawn over a disc of
/// stroke-colored offset copies, which approximates an outline of
/// `stroke_width` pixels.
pub fn render_name(
    img: &mut RgbImage,
    font: &Font,
    text: &str,
    anchor_px: (f32, f32),
    alignment: Alignment,
    style: &TextStyle,
) {
    let size = fit_font_size(
        font,
        text,
        img.width(),
        img.height(),
        style.stroke_width,
        style.width_margin_ratio,
    );
    let scale = Scale::uniform(size);

    let Some((min_x, max_x)) = ink_bounds(font, scale, text) else {
        return;
    };

    let sw = style.stroke_width as f32;
    let (cx, cy) = anchor_px;

    // Center the stroke-inclusive box on the anchor x.
    let total_w = (max_x - min_x) + 2.0 * sw;
    let origin_x = cx - total_w / 2.0 + sw - min_x;

    let v = font.v_metrics(scale);
    let baseline = match alignment {
        Alignment::Center => cy + (v.ascent + v.descent) / 2.0,
        Alignment::Top => cy + v.ascent,
        Alignment::Bottom => cy + v.descent,
    };

    let r = style.stroke_width as i32;
    for dy in -r..=r {
        for dx in -r..=r {
            if dx * dx + dy * dy > r * r {
                continue;
            }
            draw_line(
                img,
                font,
                scale,
                origin_x + dx as f32,
                baseline + dy as f32,
                style.stroke_color,
                text,
            );
        }
    }
    draw_line(img, font, scale, origin_x, baseline, style.color, text);
}

/// Rasterize one line of text with its baseline starting at `(x, baseline)`,
/// alpha-blending glyph coverage into the buffer.
fn draw_line(
    img: &mut RgbImage,
    font: &Font,
    scale: Scale,
    x: f32,
    baseline: f32,
    color: Rgb<u8>,
    text: &str,
) {
    let (w, h) = (img.width(), img.height());
    for g in font.layout(text, scale, point(x, baseline)) {
        if let Some(bb) = g.pixel_bounding_box() {
            g.draw(|gx, gy, cov| {
                let px = gx as i32 + bb.min.x;
                let py = gy as i32 + bb.min.y;
                if px < 0 || py < 0 || cov <= 0.0 {
                    return;
                }
                let (px, py) = (px as u32, py as u32);
                if px >= w || py >= h {
                    return;
                }
                let dst = img.get_pixel_mut(px, py);
                let inv = 1.0 - cov;
                for c in 0..3 {
                    dst.0[c] = (color.0[c] as f32 * cov + dst.0[c] as f32 * inv) as u8;
                }
            });
        }
    }
}
