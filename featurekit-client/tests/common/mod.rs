#![allow(dead_code)]

use featurekit_client::{ClientConfig, Connection, FeatureService, SchemaCache, feature_record};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

feature_record! {
    pub struct Incident: HasGeometry {
        "NAME" => name, set_name: String,
        "STATUS" in "Status" => status, set_status: Option<String>,
    }
}

feature_record! {
    pub struct Inspection {
        "INSPECTOR" => inspector, set_inspector: String,
    }
}

/// Query and form parameters of a recorded request.
pub fn params(request: &Request) -> HashMap<String, String> {
    let mut params: HashMap<String, String> = request
        .url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    let body = String::from_utf8_lossy(&request.body);
    for pair in body.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let decode = |s: &str| {
            urlencoding::decode(&s.replace('+', " "))
                .map(|c| c.into_owned())
                .unwrap_or_default()
        };
        params.insert(decode(key), decode(value));
    }
    params
}

pub fn layers_json(page_size: usize) -> Value {
    json!({
        "layers": [{
            "id": 0,
            "name": "Incidents",
            "type": "Feature Layer",
            "geometryType": "esriGeometryPoint",
            "hasZ": false,
            "maxRecordCount": page_size,
            "fields": [
                {"name": "OBJECTID", "type": "esriFieldTypeOID"},
                {"name": "NAME", "type": "esriFieldTypeString"},
                {"name": "STATUS", "type": "esriFieldTypeSmallInteger", "domain": {
                    "type": "codedValue",
                    "name": "Status",
                    "codedValues": [
                        {"name": "Open", "code": 1},
                        {"name": "Closed", "code": 2}
                    ]
                }}
            ]
        }],
        "tables": [{
            "id": 1,
            "name": "Inspections",
            "type": "Table",
            "maxRecordCount": page_size,
            "fields": [
                {"name": "OBJECTID", "type": "esriFieldTypeOID"},
                {"name": "INSPECTOR", "type": "esriFieldTypeString"}
            ]
        }]
    })
}

pub fn incident_json(id: i64) -> Value {
    json!({
        "attributes": {"OBJECTID": id, "NAME": format!("incident {id}"), "STATUS": 1},
        "geometry": {"x": id as f64, "y": 1.0, "spatialReference": {"wkid": 4326}}
    })
}

pub fn inspection_json(id: i64) -> Value {
    json!({"attributes": {"OBJECTID": id, "INSPECTOR": format!("inspector {id}")}})
}

/// A feature layer with records `1..=total`, served `page_size` at a time.
///
/// Batches by id are answered in reverse order, later batches sooner, so
/// clients have to restore the requested order themselves.
pub struct PagedLayer {
    pub total: i64,
    pub page_size: usize,
    pub table: bool,
    pub log: LayerLog,
}

/// What a [`PagedLayer`] was asked, shared with the test.
#[derive(Clone, Default)]
pub struct LayerLog {
    id_queries: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<HashMap<String, String>>>>,
}

impl LayerLog {
    /// Number of id-only queries received.
    pub fn id_queries(&self) -> usize {
        self.id_queries.load(Ordering::SeqCst)
    }

    /// Parameters of every query received, in arrival order.
    pub fn requests(&self) -> Vec<HashMap<String, String>> {
        self.requests.lock().unwrap().clone()
    }
}

impl PagedLayer {
    pub fn new(total: i64, page_size: usize) -> Self {
        Self {
            total,
            page_size,
            table: false,
            log: LayerLog::default(),
        }
    }

    pub fn table(mut self) -> Self {
        self.table = true;
        self
    }

    fn record(&self, id: i64) -> Value {
        if self.table {
            inspection_json(id)
        } else {
            incident_json(id)
        }
    }
}

impl Respond for PagedLayer {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let params = params(request);
        self.log.requests.lock().unwrap().push(params.clone());

        if params.get("returnIdsOnly").map(String::as_str) == Some("true") {
            self.log.id_queries.fetch_add(1, Ordering::SeqCst);
            let ids: Vec<i64> = (1..=self.total).collect();
            return ResponseTemplate::new(200)
                .set_body_json(json!({"objectIdFieldName": "OBJECTID", "objectIds": ids}));
        }

        if params.get("returnCountOnly").map(String::as_str) == Some("true") {
            return ResponseTemplate::new(200).set_body_json(json!({"count": self.total}));
        }

        if let Some(ids) = params.get("objectIds") {
            let ids: Vec<i64> = ids.split(',').filter_map(|s| s.trim().parse().ok()).collect();
            let first = ids.first().copied().unwrap_or(0);
            let features: Vec<Value> = ids.iter().rev().map(|&id| self.record(id)).collect();
            let delay = (self.total - first).max(0) as u64;
            return ResponseTemplate::new(200)
                .set_body_json(json!({"features": features}))
                .set_delay(Duration::from_millis(delay));
        }

        let last = self.total.min(self.page_size as i64);
        let features: Vec<Value> = (1..=last).map(|id| self.record(id)).collect();
        ResponseTemplate::new(200).set_body_json(json!({
            "features": features,
            "exceededTransferLimit": self.total > last
        }))
    }
}

/// Mounts `/layers` and a paged responder for layers 0 and 1.
///
/// Returns the log of layer 0.
pub async fn mount_service(server: &MockServer, total: i64, page_size: usize) -> LayerLog {
    Mock::given(method("GET"))
        .and(path("/layers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(layers_json(page_size)))
        .mount(server)
        .await;

    let incidents = PagedLayer::new(total, page_size);
    let log = incidents.log.clone();
    Mock::given(path("/0/query"))
        .respond_with(incidents)
        .mount(server)
        .await;
    Mock::given(path("/1/query"))
        .respond_with(PagedLayer::new(total, page_size).table())
        .mount(server)
        .await;
    log
}

/// Installs a test log subscriber once; `RUST_LOG=featurekit_client=debug` shows requests.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub async fn connect(server: &MockServer) -> FeatureService {
    connect_with(server, ClientConfig::default()).await
}

/// Connects with a private schema cache so tests do not share schemas.
pub async fn connect_with(server: &MockServer, config: ClientConfig) -> FeatureService {
    init_tracing();
    let cache = SchemaCache::new();
    FeatureService::connect_with(Connection::new(server.uri()), config, &cache)
        .await
        .unwrap()
}
