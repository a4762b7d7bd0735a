//! Rasterization module
//!
//! Shared canvas helpers plus the vector and raster rasterizers used by
//! the map request orchestrator. The compositing convention is fixed
//! here once: straight (non-premultiplied) alpha, alpha-over, byte order
//! R,G,B,A, output surfaces initialized fully transparent.

pub(crate) mod marker;
pub(crate) mod raster;
pub(crate) mod vector;

use crate::geometry::Extent;
use image::{Rgba, RgbaImage};

/// Straight-alpha alpha-over blend of `src` onto `dst`.
pub(crate) fn blend(dst: Rgba<u8>, src: Rgba<u8>) -> Rgba<u8> {
    let sa = src[3] as f64 / 255.0;
    if sa <= 0.0 {
        return dst;
    }
    if sa >= 1.0 {
        return src;
    }
    let da = dst[3] as f64 / 255.0;
    let oa = sa + da * (1.0 - sa);
    if oa <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let channel = |s: u8, d: u8| -> u8 {
        let v = (s as f64 * sa + d as f64 * da * (1.0 - sa)) / oa;
        v.round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        channel(src[0], dst[0]),
        channel(src[1], dst[1]),
        channel(src[2], dst[2]),
        (oa * 255.0).round() as u8,
    ])
}

/// Blends one pixel onto the canvas, ignoring out-of-bounds coordinates.
pub(crate) fn blend_pixel(canvas: &mut RgbaImage, x: i64, y: i64, src: Rgba<u8>) {
    if x < 0 || y < 0 || x >= canvas.width() as i64 || y >= canvas.height() as i64 {
        return;
    }
    let (x, y) = (x as u32, y as u32);
    let dst = *canvas.get_pixel(x, y);
    canvas.put_pixel(x, y, blend(dst, src));
}

/// Mapping between world coordinates (target CRS units) and canvas pixels.
///
/// Pixel y grows downward while world y grows upward; the map flips the
/// axis accordingly.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PixelMap {
    extent: Extent,
    scale_x: f64,
    scale_y: f64,
}

impl PixelMap {
    pub(crate) fn new(extent: Extent, width: u32, height: u32) -> Self {
        Self {
            extent,
            scale_x: width as f64 / extent.width(),
            scale_y: height as f64 / extent.height(),
        }
    }

    /// World coordinate to fractional pixel position.
    #[inline]
    pub(crate) fn to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.extent.minx) * self.scale_x,
            (self.extent.maxy - y) * self.scale_y,
        )
    }

    /// Fractional pixel position back to world coordinates.
    #[inline]
    pub(crate) fn to_world(&self, px: f64, py: f64) -> (f64, f64) {
        (
            self.extent.minx + px / self.scale_x,
            self.extent.maxy - py / self.scale_y,
        )
    }

    #[inline]
    pub(crate) fn extent(&self) -> &Extent {
        &self.extent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blend_opaque_src_wins() {
        let dst = Rgba([10, 20, 30, 255]);
        let src = Rgba([200, 100, 50, 255]);
        assert_eq!(blend(dst, src), src);
    }

    #[test]
    fn test_blend_transparent_src_is_noop() {
        let dst = Rgba([10, 20, 30, 200]);
        assert_eq!(blend(dst, Rgba([255, 255, 255, 0])), dst);
    }

    #[test]
    fn test_blend_half_alpha_on_transparent_keeps_color() {
        // Straight alpha: colour channels survive compositing onto an
        // empty surface, only alpha carries the coverage.
        let out = blend(Rgba([0, 0, 0, 0]), Rgba([100, 150, 200, 127]));
        assert_eq!(out, Rgba([100, 150, 200, 127]));
    }

    #[test]
    fn test_blend_pixel_out_of_bounds_ignored() {
        let mut canvas = RgbaImage::new(4, 4);
        blend_pixel(&mut canvas, -1, 0, Rgba([255, 0, 0, 255]));
        blend_pixel(&mut canvas, 0, 9, Rgba([255, 0, 0, 255]));
        assert!(canvas.pixels().all(|p| p[3] == 0));
    }

    #[test]
    fn test_pixel_map_corners() {
        let map = PixelMap::new(Extent::new(0.0, 0.0, 10.0, 20.0), 100, 200);

        // World top-left maps to pixel origin.
        assert_eq!(map.to_pixel(0.0, 20.0), (0.0, 0.0));
        // World bottom-right maps to the far corner.
        assert_eq!(map.to_pixel(10.0, 0.0), (100.0, 200.0));
    }

    #[test]
    fn test_pixel_map_roundtrip() {
        let map = PixelMap::new(Extent::new(-5.0, -5.0, 5.0, 5.0), 256, 256);
        let (px, py) = map.to_pixel(1.25, -3.5);
        let (x, y) = map.to_world(px, py);
        assert!((x - 1.25).abs() < 1e-12);
        assert!((y - (-3.5)).abs() < 1e-12);
    }
}
