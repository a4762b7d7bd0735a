//! Coordinate reference system module
//!
//! Provides the CRS descriptor used across the crate and coordinate
//! transforms between the supported reference systems. Transforms are
//! pinned through a WGS 84 lon/lat hub: source → geographic → target.

mod types;

pub use types::{
    Crs, CrsError, TransformError, EPSG_WEB_MERCATOR, EPSG_WGS84, EPSG_WORLD_MERCATOR, MAX_LON,
    MAX_MERCATOR_LAT, MIN_LON, MIN_MERCATOR_LAT, WGS84_ECCENTRICITY, WGS84_SEMI_MAJOR,
};

use crate::geometry::Extent;
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

/// Transform from a source CRS into a target CRS.
///
/// Construction is infallible for supported CRS values; domain errors
/// surface per-coordinate from [`CoordTransform::apply`]. When source and
/// target are equal the transform is an identity no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordTransform {
    source: Crs,
    target: Crs,
}

impl CoordTransform {
    /// Creates a transform carrying coordinates from `source` into `target`.
    pub fn new(source: Crs, target: Crs) -> Self {
        Self { source, target }
    }

    /// Whether this transform leaves coordinates unchanged.
    #[inline]
    pub fn is_identity(&self) -> bool {
        self.source == self.target
    }

    /// Transforms a single coordinate pair.
    pub fn apply(&self, x: f64, y: f64) -> Result<(f64, f64), TransformError> {
        if self.is_identity() {
            return Ok((x, y));
        }
        let (lon, lat) = to_geographic(self.source, x, y)?;
        from_geographic(self.target, lon, lat)
    }

    /// Transforms an extent by its corner points.
    ///
    /// Sufficient for the axis-aligned Mercator family supported here;
    /// curvature-aware densification belongs to a full projection engine.
    pub fn apply_extent(&self, extent: &Extent) -> Result<Extent, TransformError> {
        if self.is_identity() {
            return Ok(*extent);
        }
        let (x0, y0) = self.apply(extent.minx, extent.miny)?;
        let (x1, y1) = self.apply(extent.maxx, extent.maxy)?;
        Ok(Extent::new(x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)))
    }

    /// Returns the reverse transform.
    #[inline]
    pub fn inverse(&self) -> Self {
        Self {
            source: self.target,
            target: self.source,
        }
    }
}

/// Converts a coordinate in `crs` to geographic lon/lat degrees.
fn to_geographic(crs: Crs, x: f64, y: f64) -> Result<(f64, f64), TransformError> {
    let result = match crs.epsg() {
        EPSG_WGS84 => {
            if !(MIN_LON..=MAX_LON).contains(&x) || !(-90.0..=90.0).contains(&y) {
                return Err(TransformError::OutOfDomain {
                    x,
                    y,
                    code: crs.epsg(),
                });
            }
            (x, y)
        }
        EPSG_WEB_MERCATOR => {
            let lon = x / WGS84_SEMI_MAJOR * 180.0 / PI;
            let lat = (y / WGS84_SEMI_MAJOR).sinh().atan() * 180.0 / PI;
            (lon, lat)
        }
        EPSG_WORLD_MERCATOR => {
            let lon = x / WGS84_SEMI_MAJOR * 180.0 / PI;
            let lat = ellipsoidal_inverse_lat(y) * 180.0 / PI;
            (lon, lat)
        }
        // Crs construction admits only the codes above.
        other => {
            return Err(TransformError::OutOfDomain { x, y, code: other });
        }
    };

    if result.0.is_finite() && result.1.is_finite() {
        Ok(result)
    } else {
        Err(TransformError::NotFinite { x, y })
    }
}

/// Converts geographic lon/lat degrees to a coordinate in `crs`.
fn from_geographic(crs: Crs, lon: f64, lat: f64) -> Result<(f64, f64), TransformError> {
    let result = match crs.epsg() {
        EPSG_WGS84 => (lon, lat),
        EPSG_WEB_MERCATOR => {
            if !(MIN_MERCATOR_LAT..=MAX_MERCATOR_LAT).contains(&lat) {
                return Err(TransformError::OutOfDomain {
                    x: lon,
                    y: lat,
                    code: crs.epsg(),
                });
            }
            let lat_rad = lat * PI / 180.0;
            (
                WGS84_SEMI_MAJOR * lon * PI / 180.0,
                WGS84_SEMI_MAJOR * lat_rad.tan().asinh(),
            )
        }
        EPSG_WORLD_MERCATOR => {
            // The ellipsoidal projection degenerates at the poles.
            if !(-89.9..=89.9).contains(&lat) {
                return Err(TransformError::OutOfDomain {
                    x: lon,
                    y: lat,
                    code: crs.epsg(),
                });
            }
            let lat_rad = lat * PI / 180.0;
            let e = WGS84_ECCENTRICITY;
            let con = e * lat_rad.sin();
            let ts = (FRAC_PI_4 + lat_rad / 2.0).tan() * ((1.0 - con) / (1.0 + con)).powf(e / 2.0);
            (WGS84_SEMI_MAJOR * lon * PI / 180.0, WGS84_SEMI_MAJOR * ts.ln())
        }
        other => {
            return Err(TransformError::OutOfDomain {
                x: lon,
                y: lat,
                code: other,
            });
        }
    };

    if result.0.is_finite() && result.1.is_finite() {
        Ok(result)
    } else {
        Err(TransformError::NotFinite { x: lon, y: lat })
    }
}

/// Inverse ellipsoidal Mercator latitude by fixed-point iteration.
fn ellipsoidal_inverse_lat(y: f64) -> f64 {
    let e = WGS84_ECCENTRICITY;
    let t = (-y / WGS84_SEMI_MAJOR).exp();
    let mut lat = FRAC_PI_2 - 2.0 * t.atan();
    for _ in 0..15 {
        let con = e * lat.sin();
        let next = FRAC_PI_2 - 2.0 * (t * ((1.0 - con) / (1.0 + con)).powf(e / 2.0)).atan();
        if (next - lat).abs() < 1e-12 {
            return next;
        }
        lat = next;
    }
    lat
}
