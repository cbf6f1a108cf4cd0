use featurekit_types::{Geometry, GeometryType, Point, SpatialReference};
use pretty_assertions::assert_eq;
use serde_json::json;

// ── Discrimination by coordinate member ──────────────────────────

#[test]
fn xy_is_a_point() {
    let g: Geometry = serde_json::from_value(json!({
        "x": 1.5, "y": 2.5, "spatialReference": {"wkid": 4326}
    }))
    .unwrap();
    assert_eq!(
        g,
        Geometry::Point(Point {
            x: 1.5,
            y: 2.5,
            z: None,
            m: None,
            spatial_reference: Some(SpatialReference::from_wkid(4326)),
        })
    );
}

#[test]
fn points_is_a_multipoint() {
    let g: Geometry = serde_json::from_value(json!({"points": [[1.0, 2.0], [3.0, 4.0]]})).unwrap();
    assert_eq!(g.geometry_type(), GeometryType::Multipoint);
}

#[test]
fn paths_is_a_polyline() {
    let g: Geometry = serde_json::from_value(json!({"paths": [[[0.0, 0.0], [1.0, 1.0]]]})).unwrap();
    assert_eq!(g.geometry_type(), GeometryType::Polyline);
}

#[test]
fn curve_rings_is_a_polygon() {
    let g: Geometry = serde_json::from_value(json!({
        "curveRings": [[[0.0, 0.0], {"c": [[2.0, 0.0], [1.0, 1.0]]}, [0.0, 0.0]]]
    }))
    .unwrap();
    assert_eq!(g.geometry_type(), GeometryType::Polygon);
}

#[test]
fn bounds_is_an_envelope() {
    let g: Geometry = serde_json::from_value(json!({
        "xmin": 0.0, "ymin": 0.0, "xmax": 10.0, "ymax": 5.0
    }))
    .unwrap();
    assert_eq!(g.geometry_type(), GeometryType::Envelope);
}

#[test]
fn empty_object_is_rejected() {
    let result: Result<Geometry, _> = serde_json::from_value(json!({}));
    assert!(result.is_err());
}

// ── Verbatim pass-through ────────────────────────────────────────

#[test]
fn polygon_json_is_reemitted_verbatim() {
    let wire = json!({
        "rings": [[[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [0.0, 0.0]]],
        "spatialReference": {"wkid": 102100, "latestWkid": 3857}
    });
    let g: Geometry = serde_json::from_value(wire.clone()).unwrap();
    assert_eq!(g.to_json(), wire);
}

#[test]
fn curve_paths_are_reemitted_as_curve_paths() {
    let wire = json!({"curvePaths": [[[0.0, 0.0], {"a": [[1.0, 1.0], [0.5, 0.5], 0, 1]}]]});
    let g: Geometry = serde_json::from_value(wire.clone()).unwrap();
    assert_eq!(g.to_json(), wire);
}

#[test]
fn point_with_z_keeps_z() {
    let wire = json!({"x": 1.0, "y": 2.0, "z": 3.0});
    let g: Geometry = serde_json::from_value(wire.clone()).unwrap();
    assert_eq!(g.to_json(), wire);
}

#[test]
fn z_aware_polyline_keeps_has_z() {
    let wire = json!({
        "hasZ": true,
        "paths": [[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]],
        "spatialReference": {"wkid": 4326}
    });
    let g: Geometry = serde_json::from_value(wire.clone()).unwrap();
    let Geometry::Polyline(polyline) = &g else {
        panic!("expected a polyline, got {g:?}");
    };
    assert!(polyline.has_z);
    assert!(!polyline.has_m);
    assert_eq!(g.to_json(), wire);
}

#[test]
fn measured_multipoint_and_polygon_keep_flags() {
    for wire in [
        json!({"hasM": true, "points": [[1.0, 2.0, 7.5]]}),
        json!({"hasZ": true, "hasM": true, "rings": [[[0.0, 0.0, 1.0, 2.0], [1.0, 1.0, 1.0, 2.0]]]}),
    ] {
        let g: Geometry = serde_json::from_value(wire.clone()).unwrap();
        assert_eq!(g.to_json(), wire);
    }
}

// ── Type names ───────────────────────────────────────────────────

#[test]
fn geometry_type_protocol_names() {
    assert_eq!(GeometryType::Point.as_str(), "esriGeometryPoint");
    assert_eq!(GeometryType::Polygon.as_str(), "esriGeometryPolygon");
    let parsed: GeometryType = serde_json::from_value(json!("esriGeometryPolyline")).unwrap();
    assert_eq!(parsed, GeometryType::Polyline);
}
