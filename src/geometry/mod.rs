//! Geometry primitives
//!
//! Small value types shared by layers, styles and the renderer: bounding
//! extents, geometry kinds and concrete coordinate geometry.

use crate::crs::{CoordTransform, TransformError};

/// Axis-aligned bounding rectangle in some CRS's units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub minx: f64,
    pub miny: f64,
    pub maxx: f64,
    pub maxy: f64,
}

impl Extent {
    /// Creates an extent from its corner ordinates.
    #[inline]
    pub fn new(minx: f64, miny: f64, maxx: f64, maxy: f64) -> Self {
        Self {
            minx,
            miny,
            maxx,
            maxy,
        }
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.maxx - self.minx
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.maxy - self.miny
    }

    /// Whether the extent covers no area.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    /// Whether two extents share any area.
    #[inline]
    pub fn intersects(&self, other: &Extent) -> bool {
        self.minx <= other.maxx
            && self.maxx >= other.minx
            && self.miny <= other.maxy
            && self.maxy >= other.miny
    }

    /// Grows this extent to cover a point.
    pub fn expand_to(&mut self, x: f64, y: f64) {
        self.minx = self.minx.min(x);
        self.miny = self.miny.min(y);
        self.maxx = self.maxx.max(x);
        self.maxy = self.maxy.max(y);
    }

    /// Whether a point lies inside (inclusive).
    #[inline]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.minx && x <= self.maxx && y >= self.miny && y <= self.maxy
    }
}

/// Geometry kinds a vector layer can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    Point,
    Line,
    Polygon,
}

/// Concrete geometry in layer coordinates.
///
/// Polygons hold their outer ring first, holes after; rings are closed
/// implicitly (last vertex connects back to the first).
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point([f64; 2]),
    Line(Vec<[f64; 2]>),
    Polygon(Vec<Vec<[f64; 2]>>),
}

impl Geometry {
    /// The kind tag for this geometry value.
    pub fn kind(&self) -> GeometryKind {
        match self {
            Geometry::Point(_) => GeometryKind::Point,
            Geometry::Line(_) => GeometryKind::Line,
            Geometry::Polygon(_) => GeometryKind::Polygon,
        }
    }

    /// Bounding box, or `None` for a geometry without vertices.
    pub fn bbox(&self) -> Option<Extent> {
        let mut points = self.vertices();
        let first = points.next()?;
        let mut extent = Extent::new(first[0], first[1], first[0], first[1]);
        for p in points {
            extent.expand_to(p[0], p[1]);
        }
        Some(extent)
    }

    /// Iterates every vertex of the geometry.
    pub fn vertices(&self) -> Box<dyn Iterator<Item = &[f64; 2]> + '_> {
        match self {
            Geometry::Point(p) => Box::new(std::iter::once(p)),
            Geometry::Line(points) => Box::new(points.iter()),
            Geometry::Polygon(rings) => Box::new(rings.iter().flatten()),
        }
    }

    /// Reprojects every vertex through a transform.
    ///
    /// Fails on the first out-of-domain vertex; a partially transformed
    /// geometry is never produced.
    pub fn transform(&self, transform: &CoordTransform) -> Result<Geometry, TransformError> {
        if transform.is_identity() {
            return Ok(self.clone());
        }
        let map_points = |points: &[[f64; 2]]| -> Result<Vec<[f64; 2]>, TransformError> {
            points
                .iter()
                .map(|p| transform.apply(p[0], p[1]).map(|(x, y)| [x, y]))
                .collect()
        };

        match self {
            Geometry::Point(p) => {
                let (x, y) = transform.apply(p[0], p[1])?;
                Ok(Geometry::Point([x, y]))
            }
            Geometry::Line(points) => Ok(Geometry::Line(map_points(points)?)),
            Geometry::Polygon(rings) => {
                let rings = rings
                    .iter()
                    .map(|ring| map_points(ring))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Geometry::Polygon(rings))
            }
        }
    }
}
