//! Geometry payloads.
//!
//! Geometries are carried verbatim between the wire and typed records. The
//! variant is discriminated by which coordinate member is populated: `x`/`y`
//! is a point, `points` a multipoint, `paths`/`curvePaths` a polyline,
//! `rings`/`curveRings` a polygon, `xmin`..`ymax` an envelope.

use crate::CoercionError;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// Spatial reference of a geometry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SpatialReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wkid: Option<i32>,
    #[serde(rename = "latestWkid", default, skip_serializing_if = "Option::is_none")]
    pub latest_wkid: Option<i32>,
}

impl SpatialReference {
    /// Creates a spatial reference from a well-known id.
    #[must_use]
    pub const fn from_wkid(wkid: i32) -> Self {
        Self {
            wkid: Some(wkid),
            latest_wkid: None,
        }
    }
}

/// Protocol geometry type names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeometryType {
    #[serde(rename = "esriGeometryPoint")]
    Point,
    #[serde(rename = "esriGeometryMultipoint")]
    Multipoint,
    #[serde(rename = "esriGeometryPolyline")]
    Polyline,
    #[serde(rename = "esriGeometryPolygon")]
    Polygon,
    #[serde(rename = "esriGeometryEnvelope")]
    Envelope,
}

impl GeometryType {
    /// Returns the protocol name, e.g. `esriGeometryPolygon`.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            GeometryType::Point => "esriGeometryPoint",
            GeometryType::Multipoint => "esriGeometryMultipoint",
            GeometryType::Polyline => "esriGeometryPolyline",
            GeometryType::Polygon => "esriGeometryPolygon",
            GeometryType::Envelope => "esriGeometryEnvelope",
        }
    }

    /// Parses a protocol name. Unsupported types (e.g. multipatch) yield `None`.
    #[must_use]
    pub fn from_protocol_name(name: &str) -> Option<Self> {
        match name {
            "esriGeometryPoint" => Some(GeometryType::Point),
            "esriGeometryMultipoint" => Some(GeometryType::Multipoint),
            "esriGeometryPolyline" => Some(GeometryType::Polyline),
            "esriGeometryPolygon" => Some(GeometryType::Polygon),
            "esriGeometryEnvelope" => Some(GeometryType::Envelope),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
    pub m: Option<f64>,
    pub spatial_reference: Option<SpatialReference>,
}

impl Point {
    /// Creates a 2D point without a spatial reference.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            z: None,
            m: None,
            spatial_reference: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Multipoint {
    /// Coordinate tuples (`[x, y]`, `[x, y, z]`, ...).
    pub points: Vec<Vec<f64>>,
    pub has_z: bool,
    pub has_m: bool,
    pub spatial_reference: Option<SpatialReference>,
}

/// A polyline. Each path is kept as raw JSON so curve segments survive.
#[derive(Debug, Clone, PartialEq)]
pub struct Polyline {
    pub paths: Vec<Json>,
    /// True when read from (and written back as) `curvePaths`.
    pub curved: bool,
    pub has_z: bool,
    pub has_m: bool,
    pub spatial_reference: Option<SpatialReference>,
}

/// A polygon. Each ring is kept as raw JSON so curve segments survive.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub rings: Vec<Json>,
    /// True when read from (and written back as) `curveRings`.
    pub curved: bool,
    pub has_z: bool,
    pub has_m: bool,
    pub spatial_reference: Option<SpatialReference>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
    pub spatial_reference: Option<SpatialReference>,
}

/// A geometry payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawGeometry", into = "RawGeometry")]
pub enum Geometry {
    Point(Point),
    Multipoint(Multipoint),
    Polyline(Polyline),
    Polygon(Polygon),
    Envelope(Envelope),
}

impl Geometry {
    /// Returns the protocol geometry type of this payload.
    #[must_use]
    pub const fn geometry_type(&self) -> GeometryType {
        match self {
            Geometry::Point(_) => GeometryType::Point,
            Geometry::Multipoint(_) => GeometryType::Multipoint,
            Geometry::Polyline(_) => GeometryType::Polyline,
            Geometry::Polygon(_) => GeometryType::Polygon,
            Geometry::Envelope(_) => GeometryType::Envelope,
        }
    }

    /// Returns the spatial reference, if any.
    #[must_use]
    pub const fn spatial_reference(&self) -> Option<&SpatialReference> {
        match self {
            Geometry::Point(g) => g.spatial_reference.as_ref(),
            Geometry::Multipoint(g) => g.spatial_reference.as_ref(),
            Geometry::Polyline(g) => g.spatial_reference.as_ref(),
            Geometry::Polygon(g) => g.spatial_reference.as_ref(),
            Geometry::Envelope(g) => g.spatial_reference.as_ref(),
        }
    }

    /// Encodes this geometry as its wire JSON object.
    #[must_use]
    pub fn to_json(&self) -> Json {
        serde_json::to_value(RawGeometry::from(self.clone())).unwrap_or(Json::Null)
    }
}

/// Flat wire shape with every coordinate member optional.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawGeometry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    z: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    m: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    points: Option<Vec<Vec<f64>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    paths: Option<Vec<Json>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    curve_paths: Option<Vec<Json>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rings: Option<Vec<Json>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    curve_rings: Option<Vec<Json>>,
    #[serde(default, skip_serializing_if = "is_false")]
    has_z: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    has_m: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    xmin: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ymin: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    xmax: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ymax: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    spatial_reference: Option<SpatialReference>,
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

impl TryFrom<RawGeometry> for Geometry {
    type Error = CoercionError;

    fn try_from(raw: RawGeometry) -> Result<Self, Self::Error> {
        let spatial_reference = raw.spatial_reference;
        let (has_z, has_m) = (raw.has_z, raw.has_m);
        if let (Some(x), Some(y)) = (raw.x, raw.y) {
            return Ok(Geometry::Point(Point {
                x,
                y,
                z: raw.z,
                m: raw.m,
                spatial_reference,
            }));
        }
        if let Some(points) = raw.points {
            return Ok(Geometry::Multipoint(Multipoint {
                points,
                has_z,
                has_m,
                spatial_reference,
            }));
        }
        if let Some(paths) = raw.paths {
            return Ok(Geometry::Polyline(Polyline {
                paths,
                curved: false,
                has_z,
                has_m,
                spatial_reference,
            }));
        }
        if let Some(paths) = raw.curve_paths {
            return Ok(Geometry::Polyline(Polyline {
                paths,
                curved: true,
                has_z,
                has_m,
                spatial_reference,
            }));
        }
        if let Some(rings) = raw.rings {
            return Ok(Geometry::Polygon(Polygon {
                rings,
                curved: false,
                has_z,
                has_m,
                spatial_reference,
            }));
        }
        if let Some(rings) = raw.curve_rings {
            return Ok(Geometry::Polygon(Polygon {
                rings,
                curved: true,
                has_z,
                has_m,
                spatial_reference,
            }));
        }
        if let (Some(xmin), Some(ymin), Some(xmax), Some(ymax)) =
            (raw.xmin, raw.ymin, raw.xmax, raw.ymax)
        {
            return Ok(Geometry::Envelope(Envelope {
                xmin,
                ymin,
                xmax,
                ymax,
                spatial_reference,
            }));
        }
        Err(CoercionError::InvalidGeometry(
            "no coordinate member populated".to_string(),
        ))
    }
}

impl From<Geometry> for RawGeometry {
    fn from(geometry: Geometry) -> Self {
        match geometry {
            Geometry::Point(p) => RawGeometry {
                x: Some(p.x),
                y: Some(p.y),
                z: p.z,
                m: p.m,
                spatial_reference: p.spatial_reference,
                ..Default::default()
            },
            Geometry::Multipoint(mp) => RawGeometry {
                points: Some(mp.points),
                has_z: mp.has_z,
                has_m: mp.has_m,
                spatial_reference: mp.spatial_reference,
                ..Default::default()
            },
            Geometry::Polyline(pl) if pl.curved => RawGeometry {
                curve_paths: Some(pl.paths),
                has_z: pl.has_z,
                has_m: pl.has_m,
                spatial_reference: pl.spatial_reference,
                ..Default::default()
            },
            Geometry::Polyline(pl) => RawGeometry {
                paths: Some(pl.paths),
                has_z: pl.has_z,
                has_m: pl.has_m,
                spatial_reference: pl.spatial_reference,
                ..Default::default()
            },
            Geometry::Polygon(pg) if pg.curved => RawGeometry {
                curve_rings: Some(pg.rings),
                has_z: pg.has_z,
                has_m: pg.has_m,
                spatial_reference: pg.spatial_reference,
                ..Default::default()
            },
            Geometry::Polygon(pg) => RawGeometry {
                rings: Some(pg.rings),
                has_z: pg.has_z,
                has_m: pg.has_m,
                spatial_reference: pg.spatial_reference,
                ..Default::default()
            },
            Geometry::Envelope(e) => RawGeometry {
                xmin: Some(e.xmin),
                ymin: Some(e.ymin),
                xmax: Some(e.xmax),
                ymax: Some(e.ymax),
                spatial_reference: e.spatial_reference,
                ..Default::default()
            },
        }
    }
}
