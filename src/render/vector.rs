//! Vector feature rasterizer.
//!
//! Draws reprojected features onto the shared canvas, one style rule at a
//! time in rule order. Features outside the requested extent contribute
//! nothing; unresolved marker assets degrade to the placeholder glyph.

use crate::geometry::Geometry;
use crate::render::{blend_pixel, marker, PixelMap};
use crate::style::{Color, Rule, Style};
use crate::symbol::{ResolutionError, SearchPaths, Symbol};
use image::RgbaImage;
use serde_json::Value;
use std::collections::HashSet;

/// A feature already carried into the target CRS.
pub(crate) struct ProjectedFeature<'a> {
    pub geometry: Geometry,
    pub attributes: &'a serde_json::Map<String, Value>,
}

/// Rasterizes one vector layer's features with the given style.
pub(crate) fn draw_layer(
    canvas: &mut RgbaImage,
    map: &PixelMap,
    features: &[ProjectedFeature<'_>],
    style: &Style,
    paths: &SearchPaths,
    scale: f64,
) -> Result<(), ResolutionError> {
    for rule in style.rules() {
        // One resolution per rule; the style's cache serves repeats.
        let symbol = match &rule.marker {
            Some(reference) => Some(style.resolve_symbol(reference, paths)?),
            None => None,
        };

        for feature in features {
            // A style declared for another geometry kind draws nothing;
            // the attachment gate only rejects vector/raster mismatches.
            if style
                .geometry()
                .is_some_and(|declared| declared != feature.geometry.kind())
            {
                continue;
            }
            if !rule_matches(rule, feature.attributes) {
                continue;
            }
            let bbox = match feature.geometry.bbox() {
                Some(bbox) => bbox,
                None => continue,
            };
            if !bbox.intersects(map.extent()) {
                continue;
            }
            draw_feature(canvas, map, &feature.geometry, rule, symbol.as_ref(), scale);
        }
    }
    Ok(())
}

fn rule_matches(rule: &Rule, attributes: &serde_json::Map<String, Value>) -> bool {
    match &rule.filter {
        None => true,
        Some(filter) => attributes.get(&filter.field) == Some(&filter.equals),
    }
}

fn draw_feature(
    canvas: &mut RgbaImage,
    map: &PixelMap,
    geometry: &Geometry,
    rule: &Rule,
    symbol: Option<&Symbol>,
    scale: f64,
) {
    let color = rule.color.with_opacity(rule.opacity);
    match geometry {
        Geometry::Point(p) => {
            let (px, py) = map.to_pixel(p[0], p[1]);
            let diameter = rule.size * scale;
            match symbol {
                Some(symbol) => marker::draw_symbol(canvas, px, py, diameter, symbol, color),
                None => marker::draw_disc(canvas, px, py, diameter, color),
            }
        }
        Geometry::Line(points) => {
            let pixels: Vec<(f64, f64)> = points.iter().map(|p| map.to_pixel(p[0], p[1])).collect();
            stroke(canvas, &pixels, rule.stroke_width * scale, color);
        }
        Geometry::Polygon(rings) => {
            let rings_px: Vec<Vec<(f64, f64)>> = rings
                .iter()
                .map(|ring| ring.iter().map(|p| map.to_pixel(p[0], p[1])).collect())
                .collect();
            fill_polygon(canvas, &rings_px, color);
            for ring in &rings_px {
                let mut closed = ring.clone();
                if let Some(first) = ring.first() {
                    closed.push(*first);
                }
                stroke(canvas, &closed, rule.stroke_width * scale, color);
            }
        }
    }
}

/// Stamps a polyline with round caps.
///
/// Coverage is collected first so overlapping stamps blend exactly once,
/// keeping semi-transparent strokes at their configured alpha.
fn stroke(canvas: &mut RgbaImage, points: &[(f64, f64)], width: f64, color: Color) {
    if points.is_empty() {
        return;
    }
    let radius = (width / 2.0).max(0.5);
    let mut covered: HashSet<(i64, i64)> = HashSet::new();

    let mut stamp = |cx: f64, cy: f64| {
        let x0 = (cx - radius).floor() as i64;
        let x1 = (cx + radius).ceil() as i64;
        let y0 = (cy - radius).floor() as i64;
        let y1 = (cy + radius).ceil() as i64;
        for py in y0..=y1 {
            for px in x0..=x1 {
                let dx = px as f64 + 0.5 - cx;
                let dy = py as f64 + 0.5 - cy;
                if dx * dx + dy * dy <= radius * radius {
                    covered.insert((px, py));
                }
            }
        }
    };

    if points.len() == 1 {
        stamp(points[0].0, points[0].1);
    }
    for segment in points.windows(2) {
        let (x0, y0) = segment[0];
        let (x1, y1) = segment[1];
        let length = (x1 - x0).hypot(y1 - y0);
        let steps = (length / 0.5).ceil().max(1.0) as usize;
        for i in 0..=steps {
            let t = i as f64 / steps as f64;
            stamp(x0 + (x1 - x0) * t, y0 + (y1 - y0) * t);
        }
    }

    let src = color.to_pixel();
    for (px, py) in covered {
        blend_pixel(canvas, px, py, src);
    }
}

/// Even-odd scanline fill over the polygon's rings.
fn fill_polygon(canvas: &mut RgbaImage, rings: &[Vec<(f64, f64)>], color: Color) {
    let ys: Vec<f64> = rings.iter().flatten().map(|p| p.1).collect();
    let (min_y, max_y) = match (
        ys.iter().cloned().reduce(f64::min),
        ys.iter().cloned().reduce(f64::max),
    ) {
        (Some(min), Some(max)) => (min, max),
        _ => return,
    };

    let row_start = (min_y.floor().max(0.0)) as i64;
    let row_end = (max_y.ceil().min(canvas.height() as f64)) as i64;
    let src = color.to_pixel();

    for row in row_start..row_end {
        let scan_y = row as f64 + 0.5;
        let mut crossings: Vec<f64> = Vec::new();

        for ring in rings {
            if ring.len() < 3 {
                continue;
            }
            for i in 0..ring.len() {
                let a = ring[i];
                let b = ring[(i + 1) % ring.len()];
                if (a.1 <= scan_y) != (b.1 <= scan_y) {
                    let t = (scan_y - a.1) / (b.1 - a.1);
                    crossings.push(a.0 + t * (b.0 - a.0));
                }
            }
        }

        crossings.sort_by(f64::total_cmp);
        for pair in crossings.chunks(2) {
            if pair.len() < 2 {
                continue;
            }
            let start = (pair[0] - 0.5).ceil() as i64;
            let end = (pair[1] - 0.5).floor() as i64;
            for px in start..=end {
                blend_pixel(canvas, px, row, src);
            }
        }
    }
}
