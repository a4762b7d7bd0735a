//! Map request orchestration.
//!
//! [`MapRequest`] is a caller-owned accumulator: configure a target CRS,
//! DPI and symbol search paths, attach (layer, style) entries, then ask
//! for a map image or a legend. Rendering never consumes the request; the
//! same configured request serves any number of renders.

use crate::crs::{Crs, TransformError};
use crate::geometry::Extent;
use crate::layer::Layer;
use crate::legend::{self, LegendEntry};
use crate::render::{raster, vector, PixelMap};
use crate::style::{Style, StyleKind};
use crate::symbol::{ResolutionError, SearchPaths};
use image::RgbaImage;
use thiserror::Error;
use tracing::{debug, warn};

/// One attached (layer, style, label) entry.
#[derive(Debug, Clone)]
struct MapEntry {
    layer: Layer,
    style: Style,
    label: Option<String>,
}

/// Accumulates layers and render settings for a headless map render.
#[derive(Debug)]
pub struct MapRequest {
    crs: Option<Crs>,
    dpi: f64,
    entries: Vec<MapEntry>,
    search_paths: SearchPaths,
}

impl Default for MapRequest {
    fn default() -> Self {
        Self::new()
    }
}

impl MapRequest {
    pub fn new() -> Self {
        Self {
            crs: None,
            dpi: 96.0,
            entries: Vec::new(),
            search_paths: SearchPaths::new(),
        }
    }

    /// Sets the target reference system for subsequent renders.
    pub fn set_crs(&mut self, crs: Crs) {
        self.crs = Some(crs);
    }

    /// Target CRS, if one has been set.
    pub fn crs(&self) -> Option<Crs> {
        self.crs
    }

    /// Sets the output resolution in dots per inch.
    pub fn set_dpi(&mut self, dpi: f64) -> Result<(), ConfigurationError> {
        if !dpi.is_finite() || dpi <= 0.0 {
            return Err(ConfigurationError::InvalidDpi(dpi));
        }
        self.dpi = dpi;
        Ok(())
    }

    pub fn dpi(&self) -> f64 {
        self.dpi
    }

    /// Replaces the symbol search path handle used by renders.
    pub fn set_search_paths(&mut self, paths: SearchPaths) {
        self.search_paths = paths;
    }

    pub fn search_paths(&self) -> &SearchPaths {
        &self.search_paths
    }

    /// Attaches a layer with its style; no legend label.
    pub fn add_layer(&mut self, layer: Layer, style: Style) -> Result<usize, RequestError> {
        self.attach(layer, style, None)
    }

    /// Attaches a layer with its style and a legend label.
    pub fn add_layer_labeled(
        &mut self,
        layer: Layer,
        style: Style,
        label: impl Into<String>,
    ) -> Result<usize, RequestError> {
        self.attach(layer, style, Some(label.into()))
    }

    /// Number of attached entries.
    pub fn layer_count(&self) -> usize {
        self.entries.len()
    }

    fn attach(
        &mut self,
        layer: Layer,
        style: Style,
        label: Option<String>,
    ) -> Result<usize, RequestError> {
        // Kind gate runs before the list is touched: a rejected pair must
        // leave the request renderable as it was.
        let compatible = match style.kind() {
            StyleKind::Vector => layer.kind().is_vector(),
            StyleKind::Raster => !layer.kind().is_vector(),
        };
        if !compatible {
            return Err(RequestError::StyleTypeMismatch {
                layer: format!("{:?}", layer.kind()),
                style: style.kind().to_string(),
            });
        }

        let index = self.entries.len();
        debug!(index, label = label.as_deref(), "Layer attached to request");
        self.entries.push(MapEntry {
            layer,
            style,
            label,
        });
        Ok(index)
    }

    /// Renders the attached layers into an RGBA image.
    ///
    /// `extent` is in the target CRS; `size` is the output canvas in
    /// pixels. Layers composite bottom-up in insertion order onto a
    /// transparent surface.
    pub fn render_image(
        &self,
        extent: Extent,
        size: (u32, u32),
    ) -> Result<RenderedImage, RenderError> {
        let crs = self.crs.ok_or(ConfigurationError::MissingCrs)?;
        if extent.is_empty() {
            return Err(ConfigurationError::EmptyExtent.into());
        }

        let (width, height) = size;
        let map = PixelMap::new(extent, width, height);
        let scale = self.dpi / 96.0;
        let mut canvas = RgbaImage::new(width, height);
        debug!(
            width,
            height,
            entries = self.entries.len(),
            epsg = crs.epsg(),
            "Rendering map image"
        );

        for (index, entry) in self.entries.iter().enumerate() {
            let transform = crate::crs::CoordTransform::new(entry.layer.crs(), crs);

            if let Some(features) = entry.layer.features() {
                let mut projected = Vec::with_capacity(features.len());
                for feature in features {
                    let geometry = feature
                        .geometry
                        .transform(&transform)
                        .map_err(|source| RenderError::Reprojection { index, source })?;
                    projected.push(vector::ProjectedFeature {
                        geometry,
                        attributes: &feature.attributes,
                    });
                }
                vector::draw_layer(
                    &mut canvas,
                    &map,
                    &projected,
                    &entry.style,
                    &self.search_paths,
                    scale,
                )?;
            } else if let Some(data) = entry.layer.raster() {
                let opacity = entry
                    .style
                    .rules()
                    .first()
                    .map(|rule| rule.opacity)
                    .unwrap_or(1.0);
                raster::draw_layer(&mut canvas, &map, data, &transform.inverse(), opacity);
            } else {
                warn!(index, "Entry has neither features nor raster data");
            }
        }

        Ok(RenderedImage { image: canvas })
    }

    /// Renders the legend for the labelled entries.
    ///
    /// Entries without a label are skipped; no target CRS is needed.
    pub fn render_legend(&self) -> Result<RenderedImage, RenderError> {
        let entries: Vec<LegendEntry<'_>> = self
            .entries
            .iter()
            .filter_map(|entry| {
                entry.label.as_deref().map(|label| LegendEntry {
                    style: &entry.style,
                    label,
                })
            })
            .collect();

        let image = legend::render(&entries, &self.search_paths, self.dpi)?;
        Ok(RenderedImage { image })
    }
}

/// An RGBA render result, straight alpha, byte order R,G,B,A.
#[derive(Debug, Clone)]
pub struct RenderedImage {
    image: RgbaImage,
}

impl RenderedImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Raw pixel bytes, row-major, 4 bytes per pixel.
    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    /// One pixel's RGBA bytes.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.image.get_pixel(x, y).0
    }

    /// The underlying image buffer.
    pub fn into_inner(self) -> RgbaImage {
        self.image
    }

    /// Encodes the image as PNG bytes.
    pub fn encode_png(&self) -> Result<Vec<u8>, RenderError> {
        let mut bytes = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(std::io::Cursor::new(&mut bytes));
        self.image
            .write_with_encoder(encoder)
            .map_err(|e| RenderError::Encode(e.to_string()))?;
        Ok(bytes)
    }
}

/// Invalid request configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigurationError {
    /// Render was asked for before a target CRS was set
    #[error("No target CRS set on the request")]
    MissingCrs,

    /// DPI must be a positive finite number
    #[error("Invalid DPI {0}; must be > 0")]
    InvalidDpi(f64),

    /// Requested extent covers no area
    #[error("Requested extent covers no area")]
    EmptyExtent,
}

/// Errors raised when attaching an entry.
#[derive(Debug, Error)]
pub enum RequestError {
    /// Layer and style kinds disagree
    #[error("Style type mismatch: {style} style cannot render {layer} layer")]
    StyleTypeMismatch { layer: String, style: String },
}

/// Errors raised during a render.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Reprojecting an entry's features into the target CRS failed
    #[error("Cannot reproject entry {index} into the target CRS: {source}")]
    Reprojection {
        index: usize,
        source: TransformError,
    },

    /// A symbol reference was rejected by the resolution cache
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// Encoding the rendered image failed
    #[error("Image encoding failed: {0}")]
    Encode(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Geometry, GeometryKind};
    use crate::layer::Feature;
    use crate::style::Color;

    fn web_mercator() -> Crs {
        Crs::from_epsg(3857).unwrap()
    }

    fn point_layer(x: f64, y: f64) -> Layer {
        Layer::from_features(
            GeometryKind::Point,
            web_mercator(),
            vec![],
            vec![Feature::new(1, Geometry::Point([x, y]))],
        )
        .unwrap()
    }

    fn point_style() -> Style {
        Style::from_defaults(
            StyleKind::Vector,
            Some(GeometryKind::Point),
            Color::opaque(255, 0, 0),
        )
    }

    #[test]
    fn test_render_without_crs_fails() {
        let request = MapRequest::new();
        let result = request.render_image(Extent::new(0.0, 0.0, 1.0, 1.0), (8, 8));
        assert!(matches!(
            result,
            Err(RenderError::Configuration(ConfigurationError::MissingCrs))
        ));
    }

    #[test]
    fn test_missing_crs_is_recoverable() {
        let mut request = MapRequest::new();
        request
            .add_layer(point_layer(16.0, 16.0), point_style())
            .unwrap();

        let extent = Extent::new(0.0, 0.0, 32.0, 32.0);
        assert!(request.render_image(extent, (32, 32)).is_err());

        request.set_crs(web_mercator());
        let image = request.render_image(extent, (32, 32)).unwrap();
        assert_eq!(image.pixel(16, 16)[0], 255, "Marker renders after fixing CRS");
    }

    #[test]
    fn test_invalid_dpi_rejected() {
        let mut request = MapRequest::new();
        assert!(matches!(
            request.set_dpi(0.0),
            Err(ConfigurationError::InvalidDpi(_))
        ));
        assert!(matches!(
            request.set_dpi(-30.0),
            Err(ConfigurationError::InvalidDpi(_))
        ));
        assert!(request.set_dpi(300.0).is_ok());
        assert!((request.dpi() - 300.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_kind_gate_rejects_mismatch() {
        let mut request = MapRequest::new();
        let raster_style = Style::from_defaults(StyleKind::Raster, None, Color::opaque(0, 0, 0));

        let result = request.add_layer(point_layer(0.0, 0.0), raster_style);
        assert!(matches!(
            result,
            Err(RequestError::StyleTypeMismatch { .. })
        ));
        assert_eq!(request.layer_count(), 0, "Rejected entry must not be kept");
    }

    #[test]
    fn test_kind_gate_allows_geometry_disagreement() {
        // Vector style with a different geometry kind than the layer is a
        // rendering-time concern, not an attachment error.
        let mut request = MapRequest::new();
        let line_style = Style::from_defaults(
            StyleKind::Vector,
            Some(GeometryKind::Line),
            Color::opaque(0, 0, 0),
        );
        assert_eq!(request.add_layer(point_layer(0.0, 0.0), line_style).unwrap(), 0);
    }

    #[test]
    fn test_geometry_disagreement_renders_empty() {
        let mut request = MapRequest::new();
        request.set_crs(web_mercator());
        let line_style = Style::from_defaults(
            StyleKind::Vector,
            Some(GeometryKind::Line),
            Color::opaque(255, 0, 0),
        );
        request
            .add_layer(point_layer(16.0, 16.0), line_style)
            .unwrap();

        let image = request
            .render_image(Extent::new(0.0, 0.0, 32.0, 32.0), (32, 32))
            .unwrap();
        assert!(
            image.as_raw().chunks(4).all(|p| p[3] == 0),
            "Mismatched geometry kind contributes nothing"
        );
    }

    #[test]
    fn test_entry_indices_in_insertion_order() {
        let mut request = MapRequest::new();
        for expected in 0..3 {
            let index = request
                .add_layer(point_layer(0.0, 0.0), point_style())
                .unwrap();
            assert_eq!(index, expected);
        }
        assert_eq!(request.layer_count(), 3);
    }

    #[test]
    fn test_empty_extent_rejected() {
        let mut request = MapRequest::new();
        request.set_crs(web_mercator());
        let result = request.render_image(Extent::new(5.0, 5.0, 5.0, 5.0), (8, 8));
        assert!(matches!(
            result,
            Err(RenderError::Configuration(ConfigurationError::EmptyExtent))
        ));
    }

    #[test]
    fn test_empty_request_renders_transparent() {
        let mut request = MapRequest::new();
        request.set_crs(web_mercator());

        let image = request
            .render_image(Extent::new(0.0, 0.0, 10.0, 10.0), (16, 16))
            .unwrap();
        assert_eq!(image.width(), 16);
        assert_eq!(image.height(), 16);
        assert!(image.as_raw().chunks(4).all(|p| p[3] == 0));
    }

    #[test]
    fn test_layers_composite_in_insertion_order() {
        let mut request = MapRequest::new();
        request.set_crs(web_mercator());

        let square = |color| {
            let layer = Layer::from_features(
                GeometryKind::Polygon,
                web_mercator(),
                vec![],
                vec![Feature::new(
                    1,
                    Geometry::Polygon(vec![vec![
                        [4.0, 4.0],
                        [28.0, 4.0],
                        [28.0, 28.0],
                        [4.0, 28.0],
                    ]]),
                )],
            )
            .unwrap();
            let style = Style::from_defaults(
                StyleKind::Vector,
                Some(GeometryKind::Polygon),
                color,
            );
            (layer, style)
        };

        let (red_layer, red_style) = square(Color::opaque(255, 0, 0));
        let (blue_layer, blue_style) = square(Color::opaque(0, 0, 255));
        request.add_layer(red_layer, red_style).unwrap();
        request.add_layer(blue_layer, blue_style).unwrap();

        let image = request
            .render_image(Extent::new(0.0, 0.0, 32.0, 32.0), (32, 32))
            .unwrap();
        let centre = image.pixel(16, 16);
        assert_eq!(centre[2], 255, "Later entry draws on top");
        assert_eq!(centre[0], 0);
    }

    #[test]
    fn test_render_is_reentrant() {
        let mut request = MapRequest::new();
        request.set_crs(web_mercator());
        request
            .add_layer(point_layer(16.0, 16.0), point_style())
            .unwrap();

        let extent = Extent::new(0.0, 0.0, 32.0, 32.0);
        let first = request.render_image(extent, (32, 32)).unwrap();
        let second = request.render_image(extent, (32, 32)).unwrap();
        assert_eq!(first.as_raw(), second.as_raw());
    }

    #[test]
    fn test_legend_skips_unlabelled_entries() {
        let mut request = MapRequest::new();
        request
            .add_layer(point_layer(0.0, 0.0), point_style())
            .unwrap();
        request
            .add_layer_labeled(point_layer(0.0, 0.0), point_style(), "Stops")
            .unwrap();

        // No CRS set; the legend must not require one.
        let legend = request.render_legend().unwrap();
        assert!(legend.width() > 0 && legend.height() > 0);
    }

    #[test]
    fn test_legend_at_low_dpi() {
        let mut request = MapRequest::new();
        request.set_dpi(6.0).unwrap();
        let layer = Layer::from_features(
            GeometryKind::Polygon,
            web_mercator(),
            vec![],
            vec![Feature::new(
                1,
                Geometry::Polygon(vec![vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]]]),
            )],
        )
        .unwrap();
        let style = Style::from_defaults(
            StyleKind::Vector,
            Some(GeometryKind::Polygon),
            Color::opaque(0, 128, 0),
        );
        request.add_layer_labeled(layer, style, "Parcels").unwrap();

        let legend = request.render_legend().unwrap();
        assert!(legend.width() > 0 && legend.height() > 0);
    }

    #[test]
    fn test_reprojection_failure_names_entry() {
        let mut request = MapRequest::new();
        request.set_crs(web_mercator());
        // Pole latitude is outside the Mercator domain.
        let wgs84 = Crs::from_epsg(4326).unwrap();
        let layer = Layer::from_features(
            GeometryKind::Point,
            wgs84,
            vec![],
            vec![Feature::new(1, Geometry::Point([0.0, 90.0]))],
        )
        .unwrap();
        request.add_layer(layer, point_style()).unwrap();

        let result = request.render_image(Extent::new(0.0, 0.0, 10.0, 10.0), (8, 8));
        assert!(matches!(
            result,
            Err(RenderError::Reprojection { index: 0, .. })
        ));
    }

    #[test]
    fn test_encode_png_signature() {
        let mut request = MapRequest::new();
        request.set_crs(web_mercator());
        let image = request
            .render_image(Extent::new(0.0, 0.0, 4.0, 4.0), (4, 4))
            .unwrap();

        let bytes = image.encode_png().unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }
}
