//! Point marker drawing.
//!
//! Resolved symbol content is reduced to its dominant hex tint; rendering
//! the full vector artwork belongs to the symbology engine this crate
//! wraps. Unresolved references degrade to a fixed placeholder glyph, not
//! an error.

use crate::render::blend_pixel;
use crate::style::Color;
use crate::symbol::Symbol;
use image::RgbaImage;

/// Extracts the first hex colour literal from symbol content.
///
/// Scans for `#rrggbb` (or `#rgb`) in the raw bytes, which captures the
/// fill of the common single-colour marker assets.
pub(crate) fn tint(content: &[u8]) -> Option<Color> {
    let is_hex = |b: u8| b.is_ascii_hexdigit();

    let mut i = 0;
    while i < content.len() {
        if content[i] == b'#' {
            let rest = &content[i + 1..];
            let run = rest.iter().take_while(|b| is_hex(**b)).count();
            let take = if run >= 6 {
                6
            } else if run >= 3 {
                3
            } else {
                i += 1;
                continue;
            };
            // Bytes checked hex above, str conversion cannot fail.
            if let Ok(text) = std::str::from_utf8(&content[i..i + 1 + take]) {
                if let Ok(color) = text.parse::<Color>() {
                    return Some(color);
                }
            }
        }
        i += 1;
    }
    None
}

/// Draws a filled disc marker centred on (`cx`, `cy`).
pub(crate) fn draw_disc(canvas: &mut RgbaImage, cx: f64, cy: f64, diameter: f64, color: Color) {
    let radius = (diameter / 2.0).max(0.5);
    let src = color.to_pixel();

    let x0 = (cx - radius).floor() as i64;
    let x1 = (cx + radius).ceil() as i64;
    let y0 = (cy - radius).floor() as i64;
    let y1 = (cy + radius).ceil() as i64;

    for py in y0..=y1 {
        for px in x0..=x1 {
            let dx = px as f64 + 0.5 - cx;
            let dy = py as f64 + 0.5 - cy;
            if dx * dx + dy * dy <= radius * radius {
                blend_pixel(canvas, px, py, src);
            }
        }
    }
}

/// Draws the placeholder glyph for an unresolved symbol reference: a dark
/// square with a black border, sized like the marker it stands in for.
pub(crate) fn draw_placeholder(canvas: &mut RgbaImage, cx: f64, cy: f64, diameter: f64) {
    let half = (diameter / 2.0).max(1.0);
    let fill = Color::opaque(64, 64, 64).to_pixel();
    let border = Color::opaque(0, 0, 0).to_pixel();

    let x0 = (cx - half).round() as i64;
    let x1 = (cx + half).round() as i64;
    let y0 = (cy - half).round() as i64;
    let y1 = (cy + half).round() as i64;

    for py in y0..=y1 {
        for px in x0..=x1 {
            let on_edge = px == x0 || px == x1 || py == y0 || py == y1;
            blend_pixel(canvas, px, py, if on_edge { border } else { fill });
        }
    }
}

/// Draws a marker for a resolved symbol, falling back per the resolution
/// outcome: tinted disc for content, placeholder glyph for a miss.
pub(crate) fn draw_symbol(
    canvas: &mut RgbaImage,
    cx: f64,
    cy: f64,
    diameter: f64,
    symbol: &Symbol,
    fallback: Color,
) {
    match symbol.content() {
        Some(content) => {
            let color = tint(content).unwrap_or(fallback);
            draw_disc(canvas, cx, cy, diameter, color);
        }
        None => draw_placeholder(canvas, cx, cy, diameter),
    }
}
