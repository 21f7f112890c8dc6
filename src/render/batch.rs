use std::collections::HashMap;

use image::RgbImage;

use super::{
    encode_png,
    fonts::FontLibrary,
    normalize::normalize_template,
    text::{render_name, Alignment, TextStyle},
    Anchor, RenderError,
};

/// Where preview text is placed: an explicit fractional anchor (text is
/// centered on it) or one of the edge presets with a 5% margin.
#[derive(Clone, Copy, Debug)]
pub enum Placement {
    At(Anchor),
    Preset(Alignment),
}

impl Placement {
    fn resolve(self, width: u32, height: u32) -> ((f32, f32), Alignment) {
        match self {
            Placement::At(a) => (a.to_pixels(width, height), Alignment::Center),
            Placement::Preset(Alignment::Top) => {
                (Anchor { x: 0.5, y: 0.05 }.to_pixels(width, height), Alignment::Top)
            }
            Placement::Preset(Alignment::Bottom) => {
                (Anchor { x: 0.5, y: 0.95 }.to_pixels(width, height), Alignment::Bottom)
            }
            Placement::Preset(Alignment::Center) => {
                (Anchor::CENTER.to_pixels(width, height), Alignment::Center)
            }
        }
    }
}

fn decode_template(bytes: &[u8]) -> Result<RgbImage, RenderError> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| RenderError::Template(e.to_string()))?
        .to_rgb8();
    Ok(normalize_template(img))
}

/// Render one tag per name, cycling through the templates in order
/// (`name i` goes on `template i mod M`). Returns `(filename, png bytes)`
/// pairs in input-name order. An empty template list yields an empty batch.
///
/// `overrides` maps a template index to its text anchor; absent entries
/// default to the template's exact center. Decode failures abort the whole
/// batch: no partial results.
pub fn generate_batch(
    sources: &[Vec<u8>],
    names: &[String],
    fonts: &FontLibrary,
    font_name: &str,
    style: &TextStyle,
    overrides: &HashMap<usize, Anchor>,
) -> Result<Vec<(String, Vec<u8>)>, RenderError> {
    let _perf = crate::perf_scope!("generate_batch");

    if sources.is_empty() {
        return Ok(Vec::new());
    }

    // Normalize each template once; renders work on private clones.
    let templates: Vec<RgbImage> = sources
        .iter()
        .map(|b| decode_template(b))
        .collect::<Result<_, _>>()?;

    let font = fonts.resolve(font_name);

    let mut results = Vec::with_capacity(names.len());
    for (i, name) in names.iter().enumerate() {
        let t = i % templates.len();
        let mut img = templates[t].clone();

        let anchor = overrides.get(&t).copied().unwrap_or(Anchor::CENTER);
        let anchor_px = anchor.to_pixels(img.width(), img.height());
        render_name(&mut img, &font, name, anchor_px, Alignment::Center, style);

        results.push((output_filename(i, name), encode_png(&img)?));
    }
    Ok(results)
}

/// Render a single (template, name) pair and return the encoded PNG.
pub fn generate_preview(
    source: &[u8],
    name: &str,
    fonts: &FontLibrary,
    font_name: &str,
    style: &TextStyle,
    placement: Placement,
) -> Result<Vec<u8>, RenderError> {
    let _perf = crate::perf_scope!("generate_preview");

    let mut img = decode_template(source)?;
    let (anchor_px, alignment) = placement.resolve(img.width(), img.height());
    let font = fonts.resolve(font_name);
    render_name(&mut img, &font, name, anchor_px, alignment, style);
    encode_png(&img)
}

/// Strip a name down to filesystem-safe characters: alphanumerics, spaces,
/// underscores and hyphens, surrounding whitespace trimmed.
fn safe_slug(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '_' | '-'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// `042_Jane Doe.png`. The zero-padded 1-based index guarantees uniqueness
/// and keeps archive listings in batch order; names that slug to nothing
/// get a `resident_<n>` placeholder.
fn output_filename(index: usize, name: &str) -> String {
    let slug = safe_slug(name);
    let slug = if slug.is_empty() {
        format!("resident_{}", index + 1)
    } else {
        slug
    };
    format!("{:03}_{}.png", index + 1, slug)
}

fn fraction(v: &serde_json::Value) -> Option<f32> {
    match v {
        serde_json::Value::Number(n) => n.as_f64().map(|f| f as f32),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Parse a per-template anchor table from JSON of the form
/// `{"0": {"x": 0.5, "y": 0.2}, ...}`, keyed by template index. Entries
/// whose key or coordinates fail to parse are dropped, so downstream
/// rendering falls back to center rather than erroring on cosmetic input.
pub fn parse_position_overrides(raw: &str) -> HashMap<usize, Anchor> {
    let mut out = HashMap::new();
    let Ok(serde_json::Value::Object(map)) = serde_json::from_str(raw) else {
        return out;
    };
    for (key, value) in map {
        let Ok(index) = key.trim().parse::<usize>() else {
            continue;
        };
        let (Some(x), Some(y)) = (
            value.get("x").and_then(fraction),
            value.get("y").and_then(fraction),
        ) else {
            continue;
        };
        out.insert(index, Anchor { x, y });
    }
    out
}

/// Parse a single `{"x": f, "y": f}` anchor; any malformed input is `None`.
pub fn parse_position(raw: &str) -> Option<Anchor> {
    let value: serde_json::Value = serde_json::from_str(raw).ok()?;
    let x = value.get("x").and_then(fraction)?;
    let y = value.get("y").and_then(fraction)?;
    Some(Anchor { x, y })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn solid_png(w: u32, h: u32, color: Rgb<u8>) -> Vec<u8> {
        encode_png(&RgbImage::from_pixel(w, h, color)).unwrap()
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn names_cycle_through_templates_in_order() {
        let sources = vec![
            solid_png(64, 48, Rgb([200, 0, 0])),
            solid_png(64, 48, Rgb([0, 200, 0])),
            solid_png(64, 48, Rgb([0, 0, 200])),
        ];
        let names = names(&["N1", "N2", "N3", "N4", "N5", "N6", "N7"]);
        let fonts = FontLibrary::empty();
        let out = generate_batch(
            &sources,
            &names,
            &fonts,
            "",
            &TextStyle::default(),
            &HashMap::new(),
        )
        .unwrap();

        assert_eq!(out.len(), 7);
        let expected = [
            Rgb([200, 0, 0]),
            Rgb([0, 200, 0]),
            Rgb([0, 0, 200]),
            Rgb([200, 0, 0]),
            Rgb([0, 200, 0]),
            Rgb([0, 0, 200]),
            Rgb([200, 0, 0]),
        ];
        for (i, (_, bytes)) in out.iter().enumerate() {
            let img = image::load_from_memory(bytes).unwrap().to_rgb8();
            // Corner pixel is far from the centered text.
            assert_eq!(*img.get_pixel(0, 0), expected[i], "job {i}");
        }
    }

    #[test]
    fn filenames_are_ordered_unique_and_safe() {
        let sources = vec![solid_png(200, 120, Rgb([50, 50, 50]))];
        let names = names(&["Al Pine", "???", "Bo"]);
        let fonts = FontLibrary::empty();
        let out = generate_batch(
            &sources,
            &names,
            &fonts,
            "",
            &TextStyle::default(),
            &HashMap::new(),
        )
        .unwrap();
        let files: Vec<&str> = out.iter().map(|(f, _)| f.as_str()).collect();
        assert_eq!(
            files,
            ["001_Al Pine.png", "002_resident_2.png", "003_Bo.png"]
        );
    }

    #[test]
    fn empty_template_list_yields_empty_batch() {
        let fonts = FontLibrary::empty();
        let out = generate_batch(
            &[],
            &names(&["Someone"]),
            &fonts,
            "",
            &TextStyle::default(),
            &HashMap::new(),
        )
        .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn corrupt_template_fails_the_whole_batch() {
        let fonts = FontLibrary::empty();
        let sources = vec![
            solid_png(100, 100, Rgb([0, 0, 0])),
            b"definitely not an image".to_vec(),
        ];
        let err = generate_batch(
            &sources,
            &names(&["A", "B"]),
            &fonts,
            "",
            &TextStyle::default(),
            &HashMap::new(),
        );
        assert!(matches!(err, Err(RenderError::Template(_))));
    }

    #[test]
    fn batches_are_reproducible() {
        let sources = vec![solid_png(300, 200, Rgb([10, 60, 110]))];
        let names = names(&["Riley", "Chidi"]);
        let fonts = FontLibrary::empty();
        let style = TextStyle::default();
        let a = generate_batch(&sources, &names, &fonts, "", &style, &HashMap::new()).unwrap();
        let b = generate_batch(&sources, &names, &fonts, "", &style, &HashMap::new()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn override_moves_the_text() {
        let sources = vec![solid_png(400, 300, Rgb([0, 0, 0]))];
        let names = names(&["Page"]);
        let fonts = FontLibrary::empty();
        let style = TextStyle::default();
        let centered =
            generate_batch(&sources, &names, &fonts, "", &style, &HashMap::new()).unwrap();
        let mut overrides = HashMap::new();
        overrides.insert(0, Anchor { x: 0.5, y: 0.2 });
        let shifted = generate_batch(&sources, &names, &fonts, "", &style, &overrides).unwrap();
        assert_ne!(centered[0].1, shifted[0].1);
    }

    #[test]
    fn malformed_override_falls_back_to_center() {
        let overrides = parse_position_overrides(r#"{"0": {"x": "bad", "y": 0.2}}"#);
        assert!(overrides.is_empty());

        // And a batch using it renders identically to one with no overrides.
        let sources = vec![solid_png(400, 300, Rgb([0, 0, 0]))];
        let names = names(&["Page"]);
        let fonts = FontLibrary::empty();
        let style = TextStyle::default();
        let a = generate_batch(&sources, &names, &fonts, "", &style, &overrides).unwrap();
        let b = generate_batch(&sources, &names, &fonts, "", &style, &HashMap::new()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn well_formed_overrides_parse_with_lenient_numbers() {
        let overrides =
            parse_position_overrides(r#"{"1": {"x": 0.25, "y": "0.75"}, "oops": {"x": 0, "y": 0}}"#);
        assert_eq!(overrides.len(), 1);
        assert_eq!(overrides[&1], Anchor { x: 0.25, y: 0.75 });
    }

    #[test]
    fn preview_renders_one_png() {
        let fonts = FontLibrary::empty();
        let png = generate_preview(
            &solid_png(300, 200, Rgb([90, 90, 90])),
            "Ada",
            &fonts,
            "",
            &TextStyle::default(),
            Placement::At(Anchor::CENTER),
        )
        .unwrap();
        let img = image::load_from_memory(&png).unwrap().to_rgb8();
        assert_eq!((img.width(), img.height()), (300, 200));
    }

    #[test]
    fn preview_normalizes_oversized_templates() {
        let fonts = FontLibrary::empty();
        let png = generate_preview(
            &solid_png(2000, 1000, Rgb([90, 90, 90])),
            "Ada",
            &fonts,
            "",
            &TextStyle::default(),
            Placement::Preset(Alignment::Center),
        )
        .unwrap();
        let img = image::load_from_memory(&png).unwrap().to_rgb8();
        assert_eq!((img.width(), img.height()), (1000, 500));
    }
}
