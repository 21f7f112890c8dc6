use image::{imageops::FilterType, RgbImage};

/// Templates wider than this are scaled down before any rendering so
/// downstream work is fast and output dimensions stay predictable.
pub const MAX_TEMPLATE_WIDTH: u32 = 1000;

/// Bound a template's width to [`MAX_TEMPLATE_WIDTH`], preserving aspect
/// ratio. Images at or under the bound are returned as-is.
pub fn normalize_template(img: RgbImage) -> RgbImage {
    if img.width() <= MAX_TEMPLATE_WIDTH {
        return img;
    }
    let ratio = MAX_TEMPLATE_WIDTH as f32 / img.width() as f32;
    let new_h = (img.height() as f32 * ratio) as u32;
    image::imageops::resize(&img, MAX_TEMPLATE_WIDTH, new_h, FilterType::Lanczos3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_template_is_scaled_to_max_width() {
        let img = RgbImage::new(2000, 1000);
        let out = normalize_template(img);
        assert_eq!((out.width(), out.height()), (1000, 500));
    }

    #[test]
    fn narrow_template_passes_through_unchanged() {
        let img = RgbImage::from_pixel(800, 600, image::Rgb([10, 20, 30]));
        let out = normalize_template(img.clone());
        assert_eq!((out.width(), out.height()), (800, 600));
        assert_eq!(out, img);
    }

    #[test]
    fn exactly_max_width_is_not_resized() {
        let img = RgbImage::new(1000, 777);
        let out = normalize_template(img);
        assert_eq!((out.width(), out.height()), (1000, 777));
    }

    #[test]
    fn height_is_rounded_down() {
        // 1500 -> 1000, height 999 * (1000/1500) = 666.0
        let img = RgbImage::new(1500, 999);
        let out = normalize_template(img);
        assert_eq!((out.width(), out.height()), (1000, 666));
    }
}
