#![allow(dead_code)]

use chrono::{DateTime, Utc};
use featurekit_model::{feature_record, ConnectionIdentity, LayerDefinition, Schema};
use serde_json::json;
use uuid::Uuid;

feature_record! {
    /// Incident reports on a point layer.
    pub struct Incident: HasGeometry {
        "NAME" => name, set_name: String,
        "STATUS" in "Status" => status, set_status: Option<String>,
        "PRIORITY" => priority, set_priority: Option<i16>,
        "REPORTED" => reported, set_reported: Option<DateTime<Utc>>,
        "GLOBALID" => global_id, set_global_id: Option<Uuid>,
    }
}

feature_record! {
    /// Rows of the attribute-only inspections table.
    pub struct Inspection {
        "INSPECTOR" => inspector, set_inspector: String,
        "STATUS" in "Status" => status, set_status: Option<String>,
    }
}

pub fn identity() -> ConnectionIdentity {
    ConnectionIdentity::new("https://example.com/arcgis/rest/services/City/FeatureServer", None, None)
}

pub fn status_domain() -> serde_json::Value {
    json!({
        "type": "codedValue",
        "name": "Status",
        "codedValues": [
            {"name": "Open", "code": 1},
            {"name": "Closed", "code": 2}
        ]
    })
}

pub fn layer_definitions() -> Vec<LayerDefinition> {
    serde_json::from_value(json!([
        {
            "id": 0,
            "name": "Incidents",
            "type": "Feature Layer",
            "geometryType": "esriGeometryPoint",
            "hasZ": false,
            "maxRecordCount": 2000,
            "fields": [
                {"name": "OBJECTID", "type": "esriFieldTypeOID"},
                {"name": "NAME", "type": "esriFieldTypeString", "length": 50},
                {"name": "STATUS", "type": "esriFieldTypeSmallInteger", "domain": status_domain()},
                {"name": "PRIORITY", "type": "esriFieldTypeSmallInteger"},
                {"name": "REPORTED", "type": "esriFieldTypeDate", "length": 8},
                {"name": "GLOBALID", "type": "esriFieldTypeGlobalID", "length": 38},
                {"name": "NOTES", "type": "esriFieldTypeString", "length": 255}
            ]
        },
        {
            "id": 1,
            "name": "Inspections",
            "type": "Table",
            "fields": [
                {"name": "OBJECTID", "type": "esriFieldTypeOID"},
                {"name": "INSPECTOR", "type": "esriFieldTypeString"},
                {"name": "STATUS", "type": "esriFieldTypeInteger", "domain": status_domain()}
            ]
        }
    ]))
    .unwrap()
}

pub fn schema() -> Schema {
    Schema::build(identity(), layer_definitions()).unwrap()
}
