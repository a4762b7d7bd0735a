//! GeoJSON feature-collection reader.
//!
//! Parsing is delegated to `serde_json`; this module only maps the GeoJSON
//! object model onto the crate's geometry and feature types. Multi-part
//! geometries are split into one feature per part so a layer always carries
//! a single geometry kind.

use crate::geometry::{Geometry, GeometryKind};
use crate::layer::{Feature, Field, LayerError};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct GjFeatureCollection {
    #[serde(rename = "type")]
    kind: String,
    features: Vec<GjFeature>,
}

#[derive(Debug, Deserialize)]
struct GjFeature {
    geometry: Option<GjGeometry>,
    #[serde(default)]
    properties: Option<serde_json::Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct GjGeometry {
    #[serde(rename = "type")]
    kind: String,
    coordinates: Value,
}

/// Parses GeoJSON text into (layer geometry kind, schema, features).
pub(crate) fn parse(text: &str) -> Result<(GeometryKind, Vec<Field>, Vec<Feature>), LayerError> {
    let collection: GjFeatureCollection =
        serde_json::from_str(text).map_err(|e| LayerError::Parse(e.to_string()))?;

    if collection.kind != "FeatureCollection" {
        return Err(LayerError::Parse(format!(
            "expected FeatureCollection, found '{}'",
            collection.kind
        )));
    }

    let mut features = Vec::new();
    let mut fields: Vec<Field> = Vec::new();
    let mut next_id: u64 = 1;

    for gj_feature in collection.features {
        let geometry = match gj_feature.geometry {
            Some(g) => g,
            None => continue, // null geometry carries nothing to render
        };
        let attributes = gj_feature.properties.unwrap_or_default();
        for name in attributes.keys() {
            if !fields.iter().any(|f| f.name == *name) {
                fields.push(Field::new(name.clone()));
            }
        }

        for part in split_geometry(&geometry)? {
            features.push(Feature::with_attributes(next_id, part, attributes.clone()));
            next_id += 1;
        }
    }

    let kind = features
        .first()
        .map(|f| f.geometry.kind())
        .ok_or_else(|| LayerError::Open("feature collection has no geometry".to_string()))?;

    Ok((kind, fields, features))
}

/// Converts one GeoJSON geometry into single-part crate geometries.
fn split_geometry(geometry: &GjGeometry) -> Result<Vec<Geometry>, LayerError> {
    let coords = &geometry.coordinates;
    match geometry.kind.as_str() {
        "Point" => Ok(vec![Geometry::Point(position(coords)?)]),
        "MultiPoint" => positions(coords)?
            .into_iter()
            .map(|p| Ok(Geometry::Point(p)))
            .collect(),
        "LineString" => Ok(vec![Geometry::Line(positions(coords)?)]),
        "MultiLineString" => value_array(coords)?
            .iter()
            .map(|line| Ok(Geometry::Line(positions(line)?)))
            .collect(),
        "Polygon" => Ok(vec![Geometry::Polygon(rings(coords)?)]),
        "MultiPolygon" => value_array(coords)?
            .iter()
            .map(|polygon| Ok(Geometry::Polygon(rings(polygon)?)))
            .collect(),
        other => Err(LayerError::Parse(format!(
            "unsupported geometry type '{}'",
            other
        ))),
    }
}

fn value_array(value: &Value) -> Result<&Vec<Value>, LayerError> {
    value
        .as_array()
        .ok_or_else(|| LayerError::Parse("expected coordinate array".to_string()))
}

/// Reads a single GeoJSON position, ignoring elevation.
fn position(value: &Value) -> Result<[f64; 2], LayerError> {
    let parts = value_array(value)?;
    if parts.len() < 2 {
        return Err(LayerError::Parse("position needs two ordinates".to_string()));
    }
    let x = parts[0]
        .as_f64()
        .ok_or_else(|| LayerError::Parse("non-numeric ordinate".to_string()))?;
    let y = parts[1]
        .as_f64()
        .ok_or_else(|| LayerError::Parse("non-numeric ordinate".to_string()))?;
    Ok([x, y])
}

fn positions(value: &Value) -> Result<Vec<[f64; 2]>, LayerError> {
    value_array(value)?.iter().map(position).collect()
}

fn rings(value: &Value) -> Result<Vec<Vec<[f64; 2]>>, LayerError> {
    value_array(value)?.iter().map(positions).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_point_collection() {
        let text = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature",
                 "geometry": {"type": "Point", "coordinates": [37.61739, 55.75062]},
                 "properties": {"name": "msc", "level": 3}}
            ]
        }"#;

        let (kind, fields, features) = parse(text).unwrap();
        assert_eq!(kind, GeometryKind::Point);
        assert_eq!(features.len(), 1);
        assert_eq!(fields.len(), 2);
        assert_eq!(
            features[0].geometry,
            Geometry::Point([37.61739, 55.75062])
        );
        assert_eq!(features[0].attributes["level"], 3);
    }

    #[test]
    fn test_multipolygon_splits_into_parts() {
        let text = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature",
                 "geometry": {"type": "MultiPolygon", "coordinates": [
                    [[[0,0],[1,0],[1,1],[0,1]]],
                    [[[2,2],[3,2],[3,3],[2,3]]]
                 ]},
                 "properties": {}}
            ]
        }"#;

        let (kind, _, features) = parse(text).unwrap();
        assert_eq!(kind, GeometryKind::Polygon);
        assert_eq!(features.len(), 2, "Each polygon part becomes a feature");
    }

    #[test]
    fn test_not_a_collection() {
        let text = r#"{"type": "Feature", "geometry": null, "properties": {}}"#;
        assert!(parse(text).is_err());
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(parse("{nope"), Err(LayerError::Parse(_))));
    }

    #[test]
    fn test_empty_collection_rejected() {
        let text = r#"{"type": "FeatureCollection", "features": []}"#;
        assert!(matches!(parse(text), Err(LayerError::Open(_))));
    }

    #[test]
    fn test_elevation_ignored() {
        let text = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature",
                 "geometry": {"type": "Point", "coordinates": [1.0, 2.0, 99.0]},
                 "properties": {}}
            ]
        }"#;
        let (_, _, features) = parse(text).unwrap();
        assert_eq!(features[0].geometry, Geometry::Point([1.0, 2.0]));
    }
}
