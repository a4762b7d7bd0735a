//! Raster layer rasterizer.
//!
//! Resamples a georeferenced raster into the output canvas by inverse
//! mapping: every output pixel is carried back into the layer's CRS and
//! sampled nearest-neighbour. Pixels that fall outside the raster's
//! extent, or that cannot be expressed in the layer's CRS at all,
//! contribute nothing.

use crate::crs::CoordTransform;
use crate::layer::RasterData;
use crate::render::{blend_pixel, PixelMap};
use image::RgbaImage;
use tracing::debug;

/// Draws a raster layer onto the canvas with the given opacity factor.
///
/// `inverse` carries target-CRS world coordinates back into the raster's
/// native CRS.
pub(crate) fn draw_layer(
    canvas: &mut RgbaImage,
    map: &PixelMap,
    raster: &RasterData,
    inverse: &CoordTransform,
    opacity: f64,
) {
    let (width, height) = (canvas.width(), canvas.height());
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 {
        return;
    }

    let src_w = raster.image.width() as f64;
    let src_h = raster.image.height() as f64;
    let extent = &raster.extent;
    let mut drawn: u64 = 0;

    for py in 0..height {
        for px in 0..width {
            let (wx, wy) = map.to_world(px as f64 + 0.5, py as f64 + 0.5);
            // A pixel outside the projection domain has no source data.
            let (sx, sy) = match inverse.apply(wx, wy) {
                Ok(coords) => coords,
                Err(_) => continue,
            };
            if !extent.contains(sx, sy) {
                continue;
            }

            let u = ((sx - extent.minx) / extent.width() * src_w)
                .floor()
                .clamp(0.0, src_w - 1.0) as u32;
            let v = ((extent.maxy - sy) / extent.height() * src_h)
                .floor()
                .clamp(0.0, src_h - 1.0) as u32;

            let mut pixel = *raster.image.get_pixel(u, v);
            pixel[3] = (pixel[3] as f64 * opacity).round() as u8;
            if pixel[3] > 0 {
                blend_pixel(canvas, px as i64, py as i64, pixel);
                drawn += 1;
            }
        }
    }

    debug!(drawn, width, height, "Raster layer resampled");
}
