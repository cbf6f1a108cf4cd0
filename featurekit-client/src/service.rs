//! Feature store: layer lookup, paged downloads and queries.
//!
//! A download is a lazy stream driven by a small state machine:
//!
//! 1. **First page**: one bounded query with the where clause and spatial
//!    filter. Its records are yielded in server order.
//! 2. **Remaining ids**: only when the query keeps querying and the first
//!    page filled the server's page size. Once the first page has been
//!    consumed, the ids of every matching record are fetched, the ones
//!    already yielded are dropped, and the rest are fetched in batches of
//!    the first page's length with at most `degree_of_parallelism` batches
//!    in flight. Records are yielded in the order the server listed their
//!    ids, whatever order the batches complete in.
//! 3. **Done**.
//!
//! Abandoning the stream abandons the download.

use crate::client::{FeatureRequest, FeatureServiceClient};
use crate::config::ClientConfig;
use crate::connection::Connection;
use crate::error::{ClientResult, Error};
use crate::query::Query;
use crate::schema_cache::SchemaCache;
use featurekit_model::{Feature, Layer, LayerRef, Schema, to_record};
use featurekit_types::ConnectionIdentity;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Records of one download, in order.
pub type RecordStream<T> = BoxStream<'static, ClientResult<T>>;

/// A connected feature service: its schema and the operations on its layers.
#[derive(Debug)]
pub struct FeatureService {
    client: FeatureServiceClient,
    connection: Connection,
    identity: ConnectionIdentity,
    schema: Arc<Schema>,
    config: ClientConfig,
}

impl FeatureService {
    /// Connects with the default configuration and the process-wide schema cache.
    ///
    /// Fails when the schema cannot be fetched or normalized.
    pub async fn connect(connection: Connection) -> ClientResult<Self> {
        Self::connect_with(connection, ClientConfig::default(), SchemaCache::global()).await
    }

    pub async fn connect_with(
        connection: Connection,
        config: ClientConfig,
        cache: &SchemaCache,
    ) -> ClientResult<Self> {
        let client = FeatureServiceClient::new(&config)?;
        let schema = cache.get_or_fetch(&client, &connection).await?;
        Ok(Self {
            identity: connection.identity(),
            client,
            connection,
            schema,
            config,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn identity(&self) -> &ConnectionIdentity {
        &self.identity
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub(crate) fn client(&self) -> &FeatureServiceClient {
        &self.client
    }

    /// Looks up a layer or table by id or (case-insensitive) name.
    pub fn layer(&self, layer: impl Into<LayerRef>) -> ClientResult<&Layer> {
        Ok(self.schema.layer(&layer.into())?)
    }

    fn fetcher(&self, layer: LayerRef) -> ClientResult<Fetcher> {
        let layer = self.schema.layer(&layer)?;
        layer.object_id_field()?;
        Ok(Fetcher {
            client: self.client.clone(),
            connection: self.connection.clone(),
            schema: Arc::clone(&self.schema),
            layer: Arc::new(layer.clone()),
        })
    }

    /// Downloads the records of `layer` matching `query` as a lazy stream.
    ///
    /// Geometry is requested only when `T` has a geometry slot. A failure
    /// mid-stream is yielded as an error item.
    pub fn download<T: Feature>(
        &self,
        layer: impl Into<LayerRef>,
        query: Query,
    ) -> ClientResult<RecordStream<T>> {
        let fetcher = self.fetcher(layer.into())?;
        let start = Paging::FirstPage {
            fetcher,
            dop: query.parallelism_or(self.config.default_parallelism),
            max_ids: self.config.max_ids_per_request.max(1),
            query,
        };
        let pages = stream::try_unfold(start, advance::<T>);
        Ok(pages
            .map_ok(|records| stream::iter(records.into_iter().map(Ok::<T, Error>)))
            .try_flatten()
            .boxed())
    }

    /// Downloads and collects every record `download` would yield.
    pub async fn download_all<T: Feature>(
        &self,
        layer: impl Into<LayerRef>,
        query: Query,
    ) -> ClientResult<Vec<T>> {
        self.download(layer, query)?.try_collect().await
    }

    /// Downloads specific records, in the order of `ids`.
    ///
    /// Ids with no matching record are skipped.
    pub async fn download_by_ids<T: Feature>(
        &self,
        layer: impl Into<LayerRef>,
        ids: &[i64],
    ) -> ClientResult<Vec<T>> {
        let fetcher = self.fetcher(layer.into())?;
        let batches: Vec<Vec<T>> = fetcher
            .batches(
                ids.to_vec(),
                self.config.max_ids_per_request.max(1),
                self.config.default_parallelism.max(1),
                BatchScope::default(),
            )
            .try_collect()
            .await?;
        Ok(batches.into_iter().flatten().collect())
    }

    /// The ids of every record matching `query`.
    pub async fn object_ids(
        &self,
        layer: impl Into<LayerRef>,
        query: &Query,
    ) -> ClientResult<Vec<i64>> {
        let layer = self.layer(layer)?;
        self.client
            .fetch_object_ids(
                &self.connection,
                layer.id,
                &query.where_clause,
                &query.filter_params(),
            )
            .await
    }

    /// The number of records matching `query`.
    pub async fn count(&self, layer: impl Into<LayerRef>, query: &Query) -> ClientResult<u64> {
        let layer = self.layer(layer)?;
        self.client
            .fetch_count(
                &self.connection,
                layer.id,
                &query.where_clause,
                &query.filter_params(),
            )
            .await
    }
}

/// Where clause and parameters every batch of one download repeats.
#[derive(Debug, Default)]
struct BatchScope {
    where_clause: Option<String>,
    params: Vec<(String, String)>,
}

impl BatchScope {
    fn of(query: &Query) -> Self {
        Self {
            where_clause: Some(query.where_clause.clone()),
            params: query.filter_params(),
        }
    }
}

/// Everything a download needs, owned so the stream outlives the service borrow.
#[derive(Clone)]
struct Fetcher {
    client: FeatureServiceClient,
    connection: Connection,
    schema: Arc<Schema>,
    layer: Arc<Layer>,
}

impl Fetcher {
    async fn page<T: Feature>(
        &self,
        where_clause: Option<&str>,
        object_ids: Option<&[i64]>,
        extra_params: &[(String, String)],
    ) -> ClientResult<Vec<T>> {
        let request = FeatureRequest {
            where_clause,
            object_ids,
            return_geometry: T::HAS_GEOMETRY,
            return_z: T::HAS_GEOMETRY && self.layer.has_z,
            extra_params,
        };
        let wires = self
            .client
            .fetch_features(&self.connection, self.layer.id, &request)
            .await?;
        wires
            .iter()
            .map(|wire| to_record::<T>(wire, &self.schema, &self.layer).map_err(Error::from))
            .collect()
    }

    /// Fetches one batch and puts it in the order of `ids`.
    async fn batch<T: Feature>(&self, ids: Vec<i64>, scope: &BatchScope) -> ClientResult<Vec<T>> {
        let records: Vec<T> = self
            .page(scope.where_clause.as_deref(), Some(ids.as_slice()), &scope.params)
            .await?;
        let mut by_id: HashMap<i64, T> = records.into_iter().map(|r| (r.object_id(), r)).collect();
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    /// Fetches `ids` in batches of `size`, `dop` at a time, yielding batches in order.
    /// Every batch repeats the where clause and parameters of `scope`.
    fn batches<T: Feature>(
        self,
        ids: Vec<i64>,
        size: usize,
        dop: usize,
        scope: BatchScope,
    ) -> BoxStream<'static, ClientResult<Vec<T>>> {
        let chunks: Vec<Vec<i64>> = ids.chunks(size).map(<[i64]>::to_vec).collect();
        let scope = Arc::new(scope);
        stream::iter(chunks)
            .map(move |chunk| {
                let fetcher = self.clone();
                let scope = Arc::clone(&scope);
                async move { fetcher.batch::<T>(chunk, &scope).await }
            })
            .buffered(dop)
            .boxed()
    }
}

enum Paging<T> {
    FirstPage {
        fetcher: Fetcher,
        query: Query,
        dop: usize,
        max_ids: usize,
    },
    /// The first page was full: find the ids it did not cover.
    Discover {
        fetcher: Fetcher,
        query: Query,
        seen: HashSet<i64>,
        batch_size: usize,
        dop: usize,
    },
    Remaining(BoxStream<'static, ClientResult<Vec<T>>>),
    Done,
}

async fn advance<T: Feature>(state: Paging<T>) -> ClientResult<Option<(Vec<T>, Paging<T>)>> {
    match state {
        Paging::FirstPage {
            fetcher,
            query,
            dop,
            max_ids,
        } => {
            let first: Vec<T> = fetcher
                .page(Some(query.where_clause.as_str()), None, &query.filter_params())
                .await?;

            let page_len = first.len();
            let full = page_len > 0 && page_len >= fetcher.layer.max_record_count;
            let next = if query.keep_querying && full {
                Paging::Discover {
                    seen: first.iter().map(|r| r.object_id()).collect(),
                    batch_size: page_len.min(max_ids),
                    fetcher,
                    query,
                    dop,
                }
            } else {
                Paging::Done
            };
            Ok(Some((first, next)))
        }
        Paging::Discover {
            fetcher,
            query,
            seen,
            batch_size,
            dop,
        } => {
            let all_ids = fetcher
                .client
                .fetch_object_ids(
                    &fetcher.connection,
                    fetcher.layer.id,
                    &query.where_clause,
                    &query.filter_params(),
                )
                .await?;
            let remaining: Vec<i64> = all_ids.into_iter().filter(|id| !seen.contains(id)).collect();
            debug!(
                layer = %fetcher.layer.name,
                already_yielded = seen.len(),
                remaining = remaining.len(),
                batch_size,
                dop,
                "paging remaining records"
            );
            if remaining.is_empty() {
                return Ok(None);
            }
            let scope = BatchScope::of(&query);
            next_batch(fetcher.batches(remaining, batch_size, dop, scope)).await
        }
        Paging::Remaining(batches) => next_batch(batches).await,
        Paging::Done => Ok(None),
    }
}

async fn next_batch<T: Feature>(
    mut batches: BoxStream<'static, ClientResult<Vec<T>>>,
) -> ClientResult<Option<(Vec<T>, Paging<T>)>> {
    match batches.next().await {
        Some(batch) => Ok(Some((batch?, Paging::Remaining(batches)))),
        None => Ok(None),
    }
}
