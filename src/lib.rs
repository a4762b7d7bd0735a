//! Stillmap - headless map rendering requests
//!
//! This library renders typed geospatial layers into RGBA images without a
//! display server: attach layers with their symbology styles to a
//! [`request::MapRequest`], pick a target reference system and DPI, and
//! ask for a map image or a legend.
//!
//! # High-Level API
//!
//! ```ignore
//! use stillmap::crs::Crs;
//! use stillmap::geometry::Extent;
//! use stillmap::layer::Layer;
//! use stillmap::request::MapRequest;
//! use stillmap::style::Style;
//!
//! let mut request = MapRequest::new();
//! request.set_crs(Crs::from_epsg(3857)?);
//!
//! let layer = Layer::from_geojson_file("rivers.geojson")?;
//! let style = Style::from_file("rivers.json")?;
//! request.add_layer_labeled(layer, style, "Rivers")?;
//!
//! let image = request.render_image(Extent::new(4e6, 7e6, 5e6, 8e6), (1024, 768))?;
//! std::fs::write("map.png", image.encode_png()?)?;
//! ```

pub mod crs;
pub mod geometry;
pub mod layer;
pub(crate) mod legend;
pub(crate) mod render;
pub mod request;
pub mod style;
pub mod symbol;

pub use crs::Crs;
pub use geometry::{Extent, GeometryKind};
pub use layer::{Layer, LayerKind};
pub use request::{MapRequest, RenderedImage};
pub use style::{Style, StyleKind};
pub use symbol::{SearchPaths, SymbolResolver};

/// Version of the stillmap library.
///
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
