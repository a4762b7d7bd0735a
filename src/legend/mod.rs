//! Legend layout and rendering.
//!
//! Lays labelled entries out vertically in insertion order: per entry a
//! stack of swatches (one per symbology rule, queried from the style) and
//! the label text beside it. The output image is the content bounding box
//! plus fixed margins, with every metric scaled by DPI so dimensions grow
//! monotonically as DPI grows.

mod font;

use crate::geometry::GeometryKind;
use crate::render::marker;
use crate::style::{Color, Rule, Style, StyleKind};
use crate::symbol::{ResolutionError, SearchPaths};
use image::RgbaImage;
use tracing::debug;

/// One legend line: a style and its label.
pub(crate) struct LegendEntry<'a> {
    pub style: &'a Style,
    pub label: &'a str,
}

/// DPI-scaled layout metrics.
struct Metrics {
    margin: u32,
    swatch: u32,
    swatch_gap: u32,
    label_gap: u32,
    entry_gap: u32,
    text_scale: u32,
}

impl Metrics {
    fn for_dpi(dpi: f64) -> Self {
        let s = dpi / 96.0;
        let scaled = |base: f64| (base * s).ceil().max(1.0) as u32;
        Self {
            margin: scaled(4.0),
            swatch: scaled(16.0),
            swatch_gap: scaled(2.0),
            label_gap: scaled(6.0),
            entry_gap: scaled(4.0),
            text_scale: (2.0 * s).round().max(1.0) as u32,
        }
    }

    fn entry_height(&self, rule_count: usize) -> u32 {
        let stack = match rule_count as u32 {
            0 => self.swatch,
            n => n * self.swatch + (n - 1) * self.swatch_gap,
        };
        stack.max(font::text_height(self.text_scale))
    }

    fn entry_width(&self, label: &str) -> u32 {
        self.swatch + self.label_gap + font::text_width(label, self.text_scale)
    }
}

/// Renders the legend for the given entries at the given DPI.
pub(crate) fn render(
    entries: &[LegendEntry<'_>],
    paths: &SearchPaths,
    dpi: f64,
) -> Result<RgbaImage, ResolutionError> {
    let metrics = Metrics::for_dpi(dpi);

    let content_width = entries
        .iter()
        .map(|e| metrics.entry_width(e.label))
        .max()
        .unwrap_or(0);
    let content_height: u32 = entries
        .iter()
        .map(|e| metrics.entry_height(e.style.rule_count()))
        .sum::<u32>()
        + metrics.entry_gap * (entries.len().saturating_sub(1)) as u32;

    let width = content_width + 2 * metrics.margin;
    let height = content_height + 2 * metrics.margin;
    debug!(width, height, entries = entries.len(), dpi, "Rendering legend");

    let mut canvas = RgbaImage::new(width, height);
    let mut cursor_y = metrics.margin;

    for entry in entries {
        let entry_height = metrics.entry_height(entry.style.rule_count());

        let mut swatch_y = cursor_y;
        for rule in entry.style.rules() {
            draw_swatch(
                &mut canvas,
                metrics.margin,
                swatch_y,
                metrics.swatch,
                entry.style,
                rule,
                paths,
            )?;
            swatch_y += metrics.swatch + metrics.swatch_gap;
        }

        let text_y = cursor_y + (entry_height.saturating_sub(font::text_height(metrics.text_scale))) / 2;
        font::draw_text(
            &mut canvas,
            (metrics.margin + metrics.swatch + metrics.label_gap) as i64,
            text_y as i64,
            entry.label,
            metrics.text_scale,
            Color::opaque(0, 0, 0),
        );

        cursor_y += entry_height + metrics.entry_gap;
    }

    Ok(canvas)
}

/// Draws one rule's swatch in a `size`×`size` box at (`x`, `y`).
fn draw_swatch(
    canvas: &mut RgbaImage,
    x: u32,
    y: u32,
    size: u32,
    style: &Style,
    rule: &Rule,
    paths: &SearchPaths,
) -> Result<(), ResolutionError> {
    let cx = x as f64 + size as f64 / 2.0;
    let cy = y as f64 + size as f64 / 2.0;
    let color = rule.color.with_opacity(rule.opacity);

    match style.kind() {
        StyleKind::Raster => {
            // Neutral block carrying the rule's opacity.
            fill_box(canvas, x, y, size, size, Color::opaque(128, 128, 128).with_opacity(rule.opacity));
        }
        StyleKind::Vector => {
            let geometry = style.geometry().unwrap_or(if rule.marker.is_some() {
                GeometryKind::Point
            } else {
                GeometryKind::Polygon
            });
            match geometry {
                GeometryKind::Point => {
                    let diameter = size as f64 * 0.6;
                    match &rule.marker {
                        Some(reference) => {
                            let symbol = style.resolve_symbol(reference, paths)?;
                            marker::draw_symbol(canvas, cx, cy, diameter, &symbol, color);
                        }
                        None => marker::draw_disc(canvas, cx, cy, diameter, color),
                    }
                }
                GeometryKind::Line => {
                    let thickness = ((size / 8).max(1)) as u32;
                    fill_box(canvas, x, y + size / 2 - thickness / 2, size, thickness, color);
                }
                GeometryKind::Polygon => {
                    // Swatch can be a single pixel at very low DPI.
                    let inset = size.saturating_sub(2).max(1);
                    let offset = (size - inset) / 2;
                    fill_box(canvas, x + offset, y + offset, inset, inset, color);
                }
            }
        }
    }
    Ok(())
}

fn fill_box(canvas: &mut RgbaImage, x: u32, y: u32, w: u32, h: u32, color: Color) {
    let src = color.to_pixel();
    for py in y..y.saturating_add(h) {
        for px in x..x.saturating_add(w) {
            crate::render::blend_pixel(canvas, px as i64, py as i64, src);
        }
    }
}
