//! HTTP calls of the feature service REST protocol.
//!
//! Every request carries `token` (when the connection has one),
//! `gdbVersion` (when set) and `f=json`. Requests without a body are sent as
//! GET with the parameters in the query string; the others as POST with the
//! parameters form-encoded in the body. A response is a failure when the
//! transport fails, the status is not 2xx, the body is not JSON, the body
//! carries a non-null `error` member, or an edit result reports a failed
//! record, even though the HTTP call itself succeeded.

use crate::config::ClientConfig;
use crate::connection::Connection;
use crate::error::{ClientResult, Error, ProtocolCause, ProtocolError};
use crate::protocol::{
    CountResponse, EditOperation, EditOutcome, EditResults, FeatureSet, LayersResponse,
    ObjectIdsResponse, ServiceError,
};
use featurekit_model::{LayerDefinition, WireFeature};
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value as Json;
use std::borrow::Cow;
use tracing::debug;

/// Parameters whose values never appear in logs or errors.
const REDACTED_PARAMS: &[&str] = &["token", "password"];

pub(crate) fn pair(key: &str, value: impl ToString) -> (String, String) {
    (key.to_string(), value.to_string())
}

fn encode_params(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(key, value)| {
            let value: Cow<'_, str> = if REDACTED_PARAMS.contains(&key.as_str()) {
                Cow::Borrowed("***")
            } else {
                urlencoding::encode(value)
            };
            format!("{}={value}", urlencoding::encode(key))
        })
        .collect::<Vec<_>>()
        .join("&")
}

pub(crate) struct Request {
    pub url: String,
    pub params: Vec<(String, String)>,
    pub post: bool,
}

/// A successful response, kept together with its request for diagnostics.
pub(crate) struct Response {
    url: String,
    request_body: Option<String>,
    text: String,
    value: Json,
}

impl Response {
    pub fn decode<R: DeserializeOwned>(&self) -> ClientResult<R> {
        R::deserialize(&self.value).map_err(|e| self.failure(e.into()))
    }

    pub fn failure(&self, cause: ProtocolCause) -> Error {
        ProtocolError {
            url: self.url.clone(),
            request_body: self.request_body.clone(),
            response_body: Some(self.text.clone()),
            cause,
        }
        .into()
    }
}

fn protocol_error(
    url: &str,
    request_body: &Option<String>,
    response_body: Option<String>,
    cause: ProtocolCause,
) -> Error {
    ProtocolError {
        url: url.to_string(),
        request_body: request_body.clone(),
        response_body,
        cause,
    }
    .into()
}

/// Sends one request and screens the response for embedded failures.
pub(crate) async fn execute(http: &Client, request: Request) -> ClientResult<Response> {
    let encoded = encode_params(&request.params);
    let (url, request_body) = if request.post {
        (request.url.clone(), Some(encoded))
    } else {
        (format!("{}?{encoded}", request.url), None)
    };
    debug!(url = %url, post = request.post, "sending request");

    let builder = if request.post {
        http.post(&request.url).form(&request.params)
    } else {
        http.get(&request.url).query(&request.params)
    };
    let response = builder
        .send()
        .await
        .map_err(|e| protocol_error(&url, &request_body, None, e.into()))?;

    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| protocol_error(&url, &request_body, None, e.into()))?;

    if !status.is_success() {
        return Err(protocol_error(
            &url,
            &request_body,
            Some(text),
            ProtocolCause::HttpStatus(status.as_u16()),
        ));
    }

    let value: Json = match serde_json::from_str(&text) {
        Ok(value) => value,
        Err(e) => return Err(protocol_error(&url, &request_body, Some(text), e.into())),
    };

    if let Some(error) = value.get("error").filter(|e| !e.is_null()) {
        let service = ServiceError::deserialize(error).unwrap_or_default();
        return Err(protocol_error(
            &url,
            &request_body,
            Some(text),
            ProtocolCause::Service {
                code: service.code,
                message: service.message,
                details: service.details.unwrap_or_default(),
            },
        ));
    }

    Ok(Response {
        url,
        request_body,
        text,
        value,
    })
}

/// Parameters of an attributed feature query.
#[derive(Debug, Clone, Default)]
pub struct FeatureRequest<'a> {
    pub where_clause: Option<&'a str>,
    /// Restricts the query to these records. Sent as POST.
    pub object_ids: Option<&'a [i64]>,
    pub return_geometry: bool,
    pub return_z: bool,
    pub extra_params: &'a [(String, String)],
}

/// Low-level client for one feature service protocol.
#[derive(Debug, Clone)]
pub struct FeatureServiceClient {
    http: Client,
}

impl FeatureServiceClient {
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        Ok(Self {
            http: config.http_client()?,
        })
    }

    pub fn with_http_client(http: Client) -> Self {
        Self { http }
    }

    async fn request(
        &self,
        connection: &Connection,
        path: &str,
        mut params: Vec<(String, String)>,
        post: bool,
    ) -> ClientResult<Response> {
        if let Some(token) = connection.token() {
            params.push(pair("token", token.value().await?));
        }
        if let Some(version) = connection.gdb_version() {
            params.push(pair("gdbVersion", version));
        }
        params.push(pair("f", "json"));

        let request = Request {
            url: format!("{}/{path}", connection.base_url()),
            params,
            post,
        };
        execute(&self.http, request).await
    }

    /// Fetches the definitions of every layer and table of the service.
    pub async fn fetch_schema(&self, connection: &Connection) -> ClientResult<Vec<LayerDefinition>> {
        debug!(service = connection.base_url(), "fetching layer definitions");
        let response = self.request(connection, "layers", Vec::new(), false).await?;
        let layers: LayersResponse = response.decode()?;
        Ok(layers.layers.into_iter().chain(layers.tables).collect())
    }

    /// Fetches the ids of every record matching `where_clause`.
    pub async fn fetch_object_ids(
        &self,
        connection: &Connection,
        layer_id: i64,
        where_clause: &str,
        extra_params: &[(String, String)],
    ) -> ClientResult<Vec<i64>> {
        debug!(layer_id, where_clause, "querying object ids");
        let mut params = vec![pair("where", where_clause), pair("returnIdsOnly", true)];
        params.extend_from_slice(extra_params);
        let response = self
            .request(connection, &format!("{layer_id}/query"), params, false)
            .await?;
        let ids: ObjectIdsResponse = response.decode()?;
        Ok(ids.object_ids.unwrap_or_default())
    }

    /// Fetches attributed records, in server order.
    pub async fn fetch_features(
        &self,
        connection: &Connection,
        layer_id: i64,
        query: &FeatureRequest<'_>,
    ) -> ClientResult<Vec<WireFeature>> {
        debug!(
            layer_id,
            where_clause = query.where_clause,
            ids = query.object_ids.map(<[i64]>::len),
            "querying features"
        );
        let mut params = Vec::new();
        if let Some(where_clause) = query.where_clause {
            params.push(pair("where", where_clause));
        }
        if let Some(ids) = query.object_ids {
            let joined = ids.iter().map(i64::to_string).collect::<Vec<_>>().join(",");
            params.push(pair("objectIds", joined));
        }
        params.push(pair("outFields", "*"));
        params.push(pair("returnGeometry", query.return_geometry));
        if query.return_geometry {
            params.push(pair("returnZ", query.return_z));
        }
        params.extend_from_slice(query.extra_params);

        let response = self
            .request(
                connection,
                &format!("{layer_id}/query"),
                params,
                query.object_ids.is_some(),
            )
            .await?;
        let set: FeatureSet = response.decode()?;
        Ok(set.features)
    }

    /// Counts the records matching `where_clause`.
    pub async fn fetch_count(
        &self,
        connection: &Connection,
        layer_id: i64,
        where_clause: &str,
        extra_params: &[(String, String)],
    ) -> ClientResult<u64> {
        debug!(layer_id, where_clause, "counting features");
        let mut params = vec![pair("where", where_clause), pair("returnCountOnly", true)];
        params.extend_from_slice(extra_params);
        let response = self
            .request(connection, &format!("{layer_id}/query"), params, false)
            .await?;
        let count: CountResponse = response.decode()?;
        Ok(count.count)
    }

    /// Submits one edit batch.
    ///
    /// Fails as a whole when any record of the batch was rejected.
    pub async fn apply_edits(
        &self,
        connection: &Connection,
        layer_id: i64,
        operation: EditOperation,
        payload: &Json,
    ) -> ClientResult<Vec<EditOutcome>> {
        debug!(layer_id, operation = operation.param_name(), "applying edits");
        let params = vec![pair(operation.param_name(), payload)];
        let response = self
            .request(connection, &format!("{layer_id}/applyEdits"), params, true)
            .await?;
        let results: EditResults = response.decode()?;

        if let Some(failed) = results.first_failure() {
            let (code, description) = failed
                .error
                .as_ref()
                .map_or((0, "edit failed".to_string()), |e| (e.code, e.description.clone()));
            return Err(response.failure(ProtocolCause::EditRejected {
                object_id: failed.object_id,
                code,
                description,
            }));
        }
        Ok(results.take(operation))
    }
}
