//! Layer module
//!
//! A [`Layer`] is an immutable handle to a typed geospatial data source:
//! vector features with a fixed geometry kind, or a georeferenced raster.
//! The kind tag is fixed at construction and drives the layer/style
//! compatibility gate in the request orchestrator. Layers are cheap to
//! clone and safe for concurrent read-only use across map requests.

mod geojson;

use crate::crs::Crs;
use crate::geometry::{Extent, Geometry, GeometryKind};
use image::RgbaImage;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Data kind of a layer, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    /// Vector features of one geometry kind
    Vector(GeometryKind),
    /// Georeferenced raster pixels
    Raster,
}

impl LayerKind {
    /// Whether this layer kind carries vector features.
    #[inline]
    pub fn is_vector(&self) -> bool {
        matches!(self, LayerKind::Vector(_))
    }
}

/// Attribute schema entry for a vector layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
}

impl Field {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// One vector feature: geometry plus attribute values.
#[derive(Debug, Clone)]
pub struct Feature {
    pub id: u64,
    pub geometry: Geometry,
    pub attributes: serde_json::Map<String, Value>,
}

impl Feature {
    /// Creates a feature without attributes.
    pub fn new(id: u64, geometry: Geometry) -> Self {
        Self {
            id,
            geometry,
            attributes: serde_json::Map::new(),
        }
    }

    /// Creates a feature with attribute values.
    pub fn with_attributes(
        id: u64,
        geometry: Geometry,
        attributes: serde_json::Map<String, Value>,
    ) -> Self {
        Self {
            id,
            geometry,
            attributes,
        }
    }
}

/// Georeferenced in-memory raster: RGBA pixels pinned to an extent in the
/// layer's CRS.
#[derive(Debug, Clone)]
pub struct RasterData {
    pub extent: Extent,
    pub image: RgbaImage,
}

#[derive(Debug)]
pub(crate) enum LayerSource {
    Features(Vec<Feature>),
    Raster(RasterData),
}

#[derive(Debug)]
struct LayerData {
    kind: LayerKind,
    crs: Crs,
    fields: Vec<Field>,
    source: LayerSource,
}

/// Immutable handle to a typed geospatial data source.
#[derive(Debug, Clone)]
pub struct Layer {
    inner: Arc<LayerData>,
}

impl Layer {
    /// Creates a vector layer from in-memory features.
    ///
    /// Every feature must match `geometry`; a mismatched feature fails
    /// construction rather than render time.
    pub fn from_features(
        geometry: GeometryKind,
        crs: Crs,
        fields: Vec<Field>,
        features: Vec<Feature>,
    ) -> Result<Self, LayerError> {
        for feature in &features {
            if feature.geometry.kind() != geometry {
                return Err(LayerError::GeometryMismatch {
                    feature: feature.id,
                    expected: geometry,
                    actual: feature.geometry.kind(),
                });
            }
        }
        Ok(Self {
            inner: Arc::new(LayerData {
                kind: LayerKind::Vector(geometry),
                crs,
                fields,
                source: LayerSource::Features(features),
            }),
        })
    }

    /// Creates a vector layer from GeoJSON text.
    ///
    /// The geometry kind is inferred from the first feature; the CRS is
    /// EPSG:4326 per RFC 7946.
    pub fn from_geojson_str(text: &str) -> Result<Self, LayerError> {
        let (geometry, fields, features) = geojson::parse(text)?;
        let crs = Crs::from_epsg(crate::crs::EPSG_WGS84)
            .map_err(|e| LayerError::Open(e.to_string()))?;
        Self::from_features(geometry, crs, fields, features)
    }

    /// Creates a vector layer from a GeoJSON file.
    pub fn from_geojson_file(path: impl AsRef<Path>) -> Result<Self, LayerError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_geojson_str(&text)
    }

    /// Creates a raster layer from in-memory pixels pinned to an extent.
    pub fn from_raster(crs: Crs, extent: Extent, image: RgbaImage) -> Result<Self, LayerError> {
        if extent.is_empty() {
            return Err(LayerError::Open("raster extent covers no area".to_string()));
        }
        if image.width() == 0 || image.height() == 0 {
            return Err(LayerError::Open("raster image has no pixels".to_string()));
        }
        Ok(Self {
            inner: Arc::new(LayerData {
                kind: LayerKind::Raster,
                crs,
                fields: Vec::new(),
                source: LayerSource::Raster(RasterData { extent, image }),
            }),
        })
    }

    /// The layer's data kind.
    #[inline]
    pub fn kind(&self) -> LayerKind {
        self.inner.kind
    }

    /// The layer's native reference system.
    #[inline]
    pub fn crs(&self) -> Crs {
        self.inner.crs
    }

    /// Attribute schema (empty for raster layers).
    pub fn fields(&self) -> &[Field] {
        &self.inner.fields
    }

    /// Vector features, or `None` for a raster layer.
    pub fn features(&self) -> Option<&[Feature]> {
        match &self.inner.source {
            LayerSource::Features(features) => Some(features),
            LayerSource::Raster(_) => None,
        }
    }

    /// Raster data, or `None` for a vector layer.
    pub fn raster(&self) -> Option<&RasterData> {
        match &self.inner.source {
            LayerSource::Features(_) => None,
            LayerSource::Raster(raster) => Some(raster),
        }
    }
}

/// Errors raised at layer construction.
#[derive(Debug, Error)]
pub enum LayerError {
    /// I/O failure reading a file-backed source
    #[error("Layer I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Source text could not be parsed
    #[error("Layer parse error: {0}")]
    Parse(String),

    /// Source could not be opened as a layer
    #[error("Cannot open layer: {0}")]
    Open(String),

    /// A feature's geometry kind disagrees with the layer's kind
    #[error("Feature {feature} has {actual:?} geometry, layer expects {expected:?}")]
    GeometryMismatch {
        feature: u64,
        expected: GeometryKind,
        actual: GeometryKind,
    },
}
