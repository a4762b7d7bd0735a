//! Style module
//!
//! A [`Style`] is an immutable handle to a parsed symbology definition,
//! tagged with the data kind it applies to. The definition language is a
//! JSON document; parsing is delegated to `serde_json` and this module
//! only models the result. Each style owns the resolution cache for the
//! symbol assets its rules reference, and clones share identity: the same
//! style attached to several map requests reuses one cache.

mod color;

pub use color::Color;

use crate::geometry::GeometryKind;
use crate::symbol::{ResolutionCache, ResolutionError, SearchPaths, Symbol, SymbolResolver};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Data kind a style applies to, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleKind {
    Vector,
    Raster,
}

impl fmt::Display for StyleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StyleKind::Vector => write!(f, "vector"),
            StyleKind::Raster => write!(f, "raster"),
        }
    }
}

/// Attribute equality filter restricting which features a rule draws.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleFilter {
    pub field: String,
    pub equals: Value,
}

/// One symbology rule.
///
/// Vector rules use `color`, `stroke_width`, `marker` and `size`; raster
/// rules use `opacity`. Unused fields keep their defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Rule {
    /// Legend label for this rule
    #[serde(default)]
    pub label: Option<String>,
    /// Fill/stroke colour, `#rgb`, `#rrggbb` or `#rrggbbaa`
    #[serde(default = "Color::default_black")]
    pub color: Color,
    /// Stroke width in pixels at 96 DPI
    #[serde(default = "default_stroke_width")]
    pub stroke_width: f64,
    /// External symbol reference (marker asset)
    #[serde(default)]
    pub marker: Option<String>,
    /// Marker diameter in pixels at 96 DPI
    #[serde(default = "default_size")]
    pub size: f64,
    /// Opacity factor, 0.0 to 1.0
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    /// Optional attribute filter
    #[serde(default)]
    pub filter: Option<RuleFilter>,
}

fn default_stroke_width() -> f64 {
    1.0
}

fn default_size() -> f64 {
    8.0
}

fn default_opacity() -> f64 {
    1.0
}

#[derive(Debug, Deserialize)]
struct StyleDoc {
    kind: StyleKind,
    #[serde(default)]
    geometry: Option<String>,
    #[serde(default)]
    rules: Vec<Rule>,
}

struct StyleInner {
    kind: StyleKind,
    geometry: Option<GeometryKind>,
    rules: Vec<Rule>,
    resolver: Option<Box<dyn SymbolResolver>>,
    cache: ResolutionCache,
}

/// Immutable handle to a parsed symbology definition.
#[derive(Clone)]
pub struct Style {
    inner: Arc<StyleInner>,
}

impl fmt::Debug for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Style")
            .field("kind", &self.inner.kind)
            .field("geometry", &self.inner.geometry)
            .field("rules", &self.inner.rules.len())
            .field("resolver", &self.inner.resolver.is_some())
            .finish()
    }
}

/// Optional construction parameters for a style.
#[derive(Default)]
pub struct StyleOptions {
    resolver: Option<Box<dyn SymbolResolver>>,
    expected_kind: Option<StyleKind>,
    expected_geometry: Option<GeometryKind>,
}

impl StyleOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a resolver callback for external symbol references.
    pub fn with_resolver(mut self, resolver: impl SymbolResolver + 'static) -> Self {
        self.resolver = Some(Box::new(resolver));
        self
    }

    /// Requires the parsed style to apply to the given data kind.
    pub fn expect_kind(mut self, kind: StyleKind) -> Self {
        self.expected_kind = Some(kind);
        self
    }

    /// Requires the parsed style to declare the given geometry kind.
    pub fn expect_geometry(mut self, geometry: GeometryKind) -> Self {
        self.expected_geometry = Some(geometry);
        self
    }
}

impl Style {
    /// Parses a style from its definition text.
    pub fn from_string(text: &str) -> Result<Self, StyleError> {
        Self::from_string_with(text, StyleOptions::new())
    }

    /// Parses a style with construction options.
    pub fn from_string_with(text: &str, options: StyleOptions) -> Result<Self, StyleError> {
        let doc: StyleDoc =
            serde_json::from_str(text).map_err(|e| StyleError::Parse(e.to_string()))?;

        let geometry = match doc.geometry.as_deref() {
            None => None,
            Some("point") => Some(GeometryKind::Point),
            Some("line") => Some(GeometryKind::Line),
            Some("polygon") => Some(GeometryKind::Polygon),
            Some(other) => {
                return Err(StyleError::Parse(format!(
                    "unknown geometry kind '{}'",
                    other
                )));
            }
        };

        if let Some(expected) = options.expected_kind {
            if doc.kind != expected {
                return Err(StyleError::TypeMismatch {
                    declared: doc.kind.to_string(),
                    expected: expected.to_string(),
                });
            }
        }
        if let (Some(expected), Some(declared)) = (options.expected_geometry, geometry) {
            if declared != expected {
                return Err(StyleError::TypeMismatch {
                    declared: format!("{:?}", declared),
                    expected: format!("{:?}", expected),
                });
            }
        }

        for rule in &doc.rules {
            if !(0.0..=1.0).contains(&rule.opacity) {
                return Err(StyleError::Parse(format!(
                    "rule opacity {} outside 0..=1",
                    rule.opacity
                )));
            }
        }

        Ok(Self {
            inner: Arc::new(StyleInner {
                kind: doc.kind,
                geometry,
                rules: doc.rules,
                resolver: options.resolver,
                cache: ResolutionCache::new(),
            }),
        })
    }

    /// Reads and parses a style definition file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, StyleError> {
        Self::from_file_with(path, StyleOptions::new())
    }

    /// Reads and parses a style definition file with options.
    pub fn from_file_with(path: impl AsRef<Path>, options: StyleOptions) -> Result<Self, StyleError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_string_with(&text, options)
    }

    /// Builds a single-rule default style for the given kind and colour.
    pub fn from_defaults(
        kind: StyleKind,
        geometry: Option<GeometryKind>,
        color: Color,
    ) -> Self {
        let rule = Rule {
            label: None,
            color,
            stroke_width: default_stroke_width(),
            marker: None,
            size: default_size(),
            opacity: default_opacity(),
            filter: None,
        };
        Self {
            inner: Arc::new(StyleInner {
                kind,
                geometry,
                rules: vec![rule],
                resolver: None,
                cache: ResolutionCache::new(),
            }),
        }
    }

    /// The data kind this style applies to.
    #[inline]
    pub fn kind(&self) -> StyleKind {
        self.inner.kind
    }

    /// Declared geometry kind, if the definition names one.
    #[inline]
    pub fn geometry(&self) -> Option<GeometryKind> {
        self.inner.geometry
    }

    /// The parsed symbology rules.
    pub fn rules(&self) -> &[Rule] {
        &self.inner.rules
    }

    /// Number of distinct symbology rules; legend swatch stacks are sized
    /// from this.
    #[inline]
    pub fn rule_count(&self) -> usize {
        self.inner.rules.len()
    }

    /// Resolves a symbol reference through this style's cache.
    pub fn resolve_symbol(
        &self,
        reference: &str,
        paths: &SearchPaths,
    ) -> Result<Symbol, ResolutionError> {
        self.inner
            .cache
            .resolve(reference, self.inner.resolver.as_deref(), paths)
    }

    /// Whether two handles refer to the same style instance (and thus
    /// share one resolution cache).
    pub fn same_instance(&self, other: &Style) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Errors raised at style construction.
#[derive(Debug, Error)]
pub enum StyleError {
    /// I/O failure reading a definition file
    #[error("Style I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Definition text could not be parsed
    #[error("Style parse error: {0}")]
    Parse(String),

    /// Declared kind disagrees with the expected kind
    #[error("Style type mismatch: style is {declared}, expected {expected}")]
    TypeMismatch { declared: String, expected: String },
}
