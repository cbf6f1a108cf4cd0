//! Wire shapes of the feature service REST protocol.

use featurekit_model::{Geometry, LayerDefinition, WireFeature};
use serde::Deserialize;
use serde_json::{Map, Value as Json};

/// The `error` member every response may carry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceError {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub details: Option<Vec<String>>,
}

/// Response of `/layers`.
#[derive(Debug, Deserialize)]
pub struct LayersResponse {
    #[serde(default)]
    pub layers: Vec<LayerDefinition>,
    #[serde(default)]
    pub tables: Vec<LayerDefinition>,
}

/// Response of an id-only query.
#[derive(Debug, Deserialize)]
pub struct ObjectIdsResponse {
    #[serde(rename = "objectIdFieldName", default)]
    pub object_id_field_name: Option<String>,
    /// Null when nothing matched.
    #[serde(rename = "objectIds", default)]
    pub object_ids: Option<Vec<i64>>,
}

#[derive(Debug, Deserialize)]
pub struct FeatureSet {
    #[serde(default)]
    pub features: Vec<WireFeature>,
    #[serde(rename = "exceededTransferLimit", default)]
    pub exceeded_transfer_limit: bool,
}

#[derive(Debug, Deserialize)]
pub struct CountResponse {
    pub count: u64,
}

/// Per-record outcome of an edit.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EditOutcome {
    #[serde(rename = "objectId", default)]
    pub object_id: Option<i64>,
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<EditError>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EditError {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub description: String,
}

/// Response of `/applyEdits`.
#[derive(Debug, Default, Deserialize)]
pub struct EditResults {
    #[serde(rename = "addResults", default)]
    pub add_results: Vec<EditOutcome>,
    #[serde(rename = "updateResults", default)]
    pub update_results: Vec<EditOutcome>,
    #[serde(rename = "deleteResults", default)]
    pub delete_results: Vec<EditOutcome>,
}

impl EditResults {
    /// The first rejected record across all three result arrays.
    pub fn first_failure(&self) -> Option<&EditOutcome> {
        self.add_results
            .iter()
            .chain(&self.update_results)
            .chain(&self.delete_results)
            .find(|outcome| !outcome.success)
    }

    /// Takes the outcomes of one operation.
    pub fn take(self, operation: EditOperation) -> Vec<EditOutcome> {
        match operation {
            EditOperation::Adds => self.add_results,
            EditOperation::Updates => self.update_results,
            EditOperation::Deletes => self.delete_results,
        }
    }
}

/// Response of the token endpoint.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub token: String,
    /// Expiry in epoch milliseconds.
    #[serde(default)]
    pub expires: Option<i64>,
}

/// One of the three `applyEdits` batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOperation {
    Adds,
    Updates,
    Deletes,
}

impl EditOperation {
    /// The form parameter carrying the payload.
    pub const fn param_name(self) -> &'static str {
        match self {
            EditOperation::Adds => "adds",
            EditOperation::Updates => "updates",
            EditOperation::Deletes => "deletes",
        }
    }
}

/// Spatial relationship of a spatial filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpatialRel {
    #[default]
    Intersects,
    EnvelopeIntersects,
    IndexIntersects,
    Contains,
    Crosses,
    Overlaps,
    Touches,
    Within,
}

impl SpatialRel {
    pub const fn as_str(self) -> &'static str {
        match self {
            SpatialRel::Intersects => "esriSpatialRelIntersects",
            SpatialRel::EnvelopeIntersects => "esriSpatialRelEnvelopeIntersects",
            SpatialRel::IndexIntersects => "esriSpatialRelIndexIntersects",
            SpatialRel::Contains => "esriSpatialRelContains",
            SpatialRel::Crosses => "esriSpatialRelCrosses",
            SpatialRel::Overlaps => "esriSpatialRelOverlaps",
            SpatialRel::Touches => "esriSpatialRelTouches",
            SpatialRel::Within => "esriSpatialRelWithin",
        }
    }
}

/// Restricts a query to records related to a geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialFilter {
    pub geometry: Geometry,
    pub relation: SpatialRel,
}

impl SpatialFilter {
    pub fn new(geometry: Geometry, relation: SpatialRel) -> Self {
        Self { geometry, relation }
    }

    /// The `geometry`, `geometryType`, `spatialRel` and `inSR` query parameters.
    pub fn params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("geometry".to_string(), self.geometry.to_json().to_string()),
            (
                "geometryType".to_string(),
                self.geometry.geometry_type().as_str().to_string(),
            ),
            ("spatialRel".to_string(), self.relation.as_str().to_string()),
        ];
        if let Some(wkid) = self.geometry.spatial_reference().and_then(|sr| sr.wkid) {
            params.push(("inSR".to_string(), wkid.to_string()));
        }
        params
    }
}

/// Encodes a wire record as an edit payload element.
pub fn feature_json(feature: WireFeature) -> Json {
    let mut object = Map::new();
    object.insert("attributes".to_string(), Json::Object(feature.attributes));
    if let Some(geometry) = feature.geometry {
        object.insert("geometry".to_string(), geometry.to_json());
    }
    Json::Object(object)
}
