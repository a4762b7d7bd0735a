//! Integration tests for symbol resolution through the rendering flow.
//!
//! These tests verify the resolution cache behaviour visible to callers:
//! - Resolved marker content outlives the file it came from
//! - Cached misses are retried after the search paths change
//! - Resolver-backed entries survive a search path reset
//! - A style shared between requests shares one cache
//!
//! Run with: `cargo test --test symbol_cache_integration`

use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use stillmap::crs::Crs;
use stillmap::geometry::{Extent, Geometry, GeometryKind};
use stillmap::layer::{Feature, Layer};
use stillmap::request::MapRequest;
use stillmap::style::{Style, StyleOptions};
use stillmap::SearchPaths;

const MARKER_STYLE: &str = r##"{
    "kind": "vector",
    "geometry": "point",
    "rules": [{"color": "#ff0000", "size": 10.0, "marker": "pin.svg"}]
}"##;

const BLUE_SVG: &[u8] = br##"<svg><circle fill="#0000ff" r="4"/></svg>"##;

fn point_layer() -> Layer {
    Layer::from_features(
        GeometryKind::Point,
        Crs::from_epsg(3857).unwrap(),
        vec![],
        vec![Feature::new(1, Geometry::Point([16.0, 16.0]))],
    )
    .unwrap()
}

fn request_with(layer: Layer, style: Style, paths: SearchPaths) -> MapRequest {
    let mut request = MapRequest::new();
    request.set_crs(Crs::from_epsg(3857).unwrap());
    request.set_search_paths(paths);
    request.add_layer(layer, style).unwrap();
    request
}

fn centre_pixel(request: &MapRequest) -> [u8; 4] {
    let image = request
        .render_image(Extent::new(0.0, 0.0, 32.0, 32.0), (32, 32))
        .unwrap();
    image.pixel(16, 16)
}

#[test]
fn test_marker_content_survives_file_deletion() {
    let dir = tempfile::tempdir().unwrap();
    let svg_path = dir.path().join("pin.svg");
    fs::write(&svg_path, BLUE_SVG).unwrap();

    let paths = SearchPaths::new();
    paths.set(vec![dir.path().to_path_buf()]);

    let style = Style::from_string(MARKER_STYLE).unwrap();
    let request = request_with(point_layer(), style, paths);

    assert_eq!(centre_pixel(&request)[2], 255, "Marker drawn with the SVG tint");

    // The cache holds the content bytes, not the path.
    fs::remove_file(&svg_path).unwrap();
    assert_eq!(
        centre_pixel(&request)[2],
        255,
        "Cached content must outlive the source file"
    );
}

#[test]
fn test_cache_survives_request_recreation() {
    let dir = tempfile::tempdir().unwrap();
    let svg_path = dir.path().join("pin.svg");
    fs::write(&svg_path, BLUE_SVG).unwrap();

    let paths = SearchPaths::new();
    paths.set(vec![dir.path().to_path_buf()]);
    let style = Style::from_string(MARKER_STYLE).unwrap();

    let first = request_with(point_layer(), style.clone(), paths.clone());
    assert_eq!(centre_pixel(&first)[2], 255);
    drop(first);

    // A fresh request reusing the same style finds the cached content
    // even though the asset file is gone.
    fs::remove_file(&svg_path).unwrap();
    let second = request_with(point_layer(), style, paths);
    assert_eq!(
        centre_pixel(&second)[2],
        255,
        "The style owns the cache, not the request"
    );
}

#[test]
fn test_unresolved_marker_degrades_to_placeholder() {
    let style = Style::from_string(MARKER_STYLE).unwrap();
    let request = request_with(point_layer(), style, SearchPaths::new());

    let centre = centre_pixel(&request);
    assert_eq!(centre[3], 255, "Placeholder is drawn, not an error");
    assert_eq!(centre[0], 64, "Placeholder fill, not the rule colour");
}

#[test]
fn test_cached_miss_retried_after_path_change() {
    let dir = tempfile::tempdir().unwrap();

    let paths = SearchPaths::new();
    let style = Style::from_string(MARKER_STYLE).unwrap();
    let request = request_with(point_layer(), style, paths.clone());

    // First render misses and caches the miss.
    assert_eq!(centre_pixel(&request)[0], 64);

    // Pointing the search paths at the asset invalidates the cached miss.
    fs::write(dir.path().join("pin.svg"), BLUE_SVG).unwrap();
    paths.set(vec![dir.path().to_path_buf()]);

    assert_eq!(
        centre_pixel(&request)[2],
        255,
        "Reconfigured paths must resolve the previously missing marker"
    );
}

#[test]
fn test_resolver_entries_survive_path_reset() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counting = {
        let calls = Arc::clone(&calls);
        move |reference: &str| {
            calls.fetch_add(1, Ordering::SeqCst);
            (reference == "pin.svg").then(|| BLUE_SVG.to_vec())
        }
    };

    let style =
        Style::from_string_with(MARKER_STYLE, StyleOptions::new().with_resolver(counting)).unwrap();
    let paths = SearchPaths::new();
    let request = request_with(point_layer(), style, paths.clone());

    assert_eq!(centre_pixel(&request)[2], 255);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // Resolver-backed entries do not depend on the search paths.
    paths.reset();
    assert_eq!(centre_pixel(&request)[2], 255);
    assert_eq!(
        calls.load(Ordering::SeqCst),
        1,
        "Path reset must not evict resolver-backed entries"
    );
}

#[test]
fn test_shared_style_shares_one_cache() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counting = {
        let calls = Arc::clone(&calls);
        move |_: &str| {
            calls.fetch_add(1, Ordering::SeqCst);
            Some(BLUE_SVG.to_vec())
        }
    };

    let style =
        Style::from_string_with(MARKER_STYLE, StyleOptions::new().with_resolver(counting)).unwrap();

    // Same style handle attached to two independent requests.
    let first = request_with(point_layer(), style.clone(), SearchPaths::new());
    let second = request_with(point_layer(), style, SearchPaths::new());

    assert_eq!(centre_pixel(&first)[2], 255);
    assert_eq!(centre_pixel(&second)[2], 255);
    assert_eq!(
        calls.load(Ordering::SeqCst),
        1,
        "Clones share identity and thus one resolution cache"
    );
}

#[test]
fn test_first_matching_directory_wins() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    fs::write(first.path().join("pin.svg"), BLUE_SVG).unwrap();
    fs::write(
        second.path().join("pin.svg"),
        br##"<svg><circle fill="#00ff00" r="4"/></svg>"##,
    )
    .unwrap();

    let paths = SearchPaths::new();
    paths.set(vec![first.path().to_path_buf(), second.path().to_path_buf()]);

    let style = Style::from_string(MARKER_STYLE).unwrap();
    let request = request_with(point_layer(), style, paths);

    let centre = centre_pixel(&request);
    assert_eq!(centre[2], 255, "First directory's asset wins");
    assert_eq!(centre[1], 0);
}
