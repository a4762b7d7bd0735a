//! Coordinate reference system type definitions

use thiserror::Error;

/// Web Mercator (EPSG:3857) valid latitude range
pub const MIN_MERCATOR_LAT: f64 = -85.05112878;
pub const MAX_MERCATOR_LAT: f64 = 85.05112878;

/// Valid longitude range
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;

/// WGS 84 semi-major axis in metres
pub const WGS84_SEMI_MAJOR: f64 = 6_378_137.0;

/// WGS 84 first eccentricity
pub const WGS84_ECCENTRICITY: f64 = 0.081_819_190_842_621_5;

/// Coordinate reference system descriptor.
///
/// Normalized to an EPSG registry code at construction so that two values
/// built from equivalent definitions (a bare code vs. a WKT string carrying
/// the same authority tag) compare equal and reproject identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Crs {
    code: u32,
}

/// Registry codes with built-in projection support.
pub const EPSG_WGS84: u32 = 4326;
pub const EPSG_WEB_MERCATOR: u32 = 3857;
pub const EPSG_WORLD_MERCATOR: u32 = 3395;

const SUPPORTED_CODES: [u32; 3] = [EPSG_WGS84, EPSG_WEB_MERCATOR, EPSG_WORLD_MERCATOR];

impl Crs {
    /// Creates a CRS from an EPSG registry code.
    ///
    /// Fails for codes without built-in projection support.
    pub fn from_epsg(code: u32) -> Result<Self, CrsError> {
        if SUPPORTED_CODES.contains(&code) {
            Ok(Self { code })
        } else {
            Err(CrsError::UnsupportedCode(code))
        }
    }

    /// Creates a CRS from a well-known-text definition string.
    ///
    /// The definition is normalized to its EPSG code via the outermost
    /// `AUTHORITY["EPSG","…"]` tag, so a WKT-built CRS is equal to the
    /// code-built one.
    pub fn from_wkt(wkt: &str) -> Result<Self, CrsError> {
        let trimmed = wkt.trim();
        if trimmed.is_empty() {
            return Err(CrsError::InvalidDefinition(
                "empty definition string".to_string(),
            ));
        }

        // The outermost authority tag is the last one in the definition.
        let marker = "AUTHORITY[\"EPSG\",\"";
        let start = trimmed
            .rfind(marker)
            .ok_or_else(|| CrsError::InvalidDefinition("no EPSG authority tag".to_string()))?
            + marker.len();
        let rest = &trimmed[start..];
        let end = rest
            .find('"')
            .ok_or_else(|| CrsError::InvalidDefinition("unterminated authority tag".to_string()))?;
        let code: u32 = rest[..end]
            .parse()
            .map_err(|_| CrsError::InvalidDefinition(format!("bad EPSG code '{}'", &rest[..end])))?;

        Self::from_epsg(code)
    }

    /// Returns the normalized EPSG registry code.
    #[inline]
    pub fn epsg(&self) -> u32 {
        self.code
    }

    /// Whether coordinates in this CRS are geographic degrees (lon/lat).
    #[inline]
    pub fn is_geographic(&self) -> bool {
        self.code == EPSG_WGS84
    }
}

/// Errors raised at CRS construction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CrsError {
    /// EPSG code without built-in projection support
    #[error("Unsupported EPSG code: {0}")]
    UnsupportedCode(u32),

    /// Definition string could not be normalized to a registry code
    #[error("Invalid CRS definition: {0}")]
    InvalidDefinition(String),
}

/// Errors raised when a coordinate cannot be carried between two systems.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    /// Input coordinate outside the projection's valid domain
    #[error("Coordinate ({x}, {y}) outside valid domain of EPSG:{code}")]
    OutOfDomain { x: f64, y: f64, code: u32 },

    /// Transformed value is not finite
    #[error("Transform produced a non-finite coordinate from ({x}, {y})")]
    NotFinite { x: f64, y: f64 },
}
