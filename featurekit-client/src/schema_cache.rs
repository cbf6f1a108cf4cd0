//! Per-connection schema memoization.

use crate::client::FeatureServiceClient;
use crate::connection::Connection;
use crate::error::{ClientResult, Error};
use featurekit_model::Schema;
use featurekit_types::ConnectionIdentity;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tokio::sync::{Mutex, OnceCell};
use tracing::info;

type Slot = Arc<OnceCell<Arc<Schema>>>;

/// Schemas keyed by connection identity.
///
/// The first request for an identity fetches and normalizes the schema;
/// concurrent requests for the same identity wait for that fetch instead of
/// issuing their own. A failed fetch leaves the slot empty.
#[derive(Debug, Default)]
pub struct SchemaCache {
    slots: Mutex<HashMap<ConnectionIdentity, Slot>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache used by [`crate::FeatureService::connect`].
    pub fn global() -> &'static SchemaCache {
        static GLOBAL: OnceLock<SchemaCache> = OnceLock::new();
        GLOBAL.get_or_init(SchemaCache::new)
    }

    /// Returns the schema of `connection`, fetching it on first use.
    pub async fn get_or_fetch(
        &self,
        client: &FeatureServiceClient,
        connection: &Connection,
    ) -> ClientResult<Arc<Schema>> {
        let identity = connection.identity();
        let slot = {
            let mut slots = self.slots.lock().await;
            Arc::clone(slots.entry(identity.clone()).or_default())
        };

        let schema = slot
            .get_or_try_init(|| async {
                let definitions = client.fetch_schema(connection).await?;
                let schema = Schema::build(identity.clone(), definitions)?;
                info!(
                    service = %identity,
                    layers = schema.layers().len(),
                    domains = schema.domains().count(),
                    "schema loaded"
                );
                Ok::<_, Error>(Arc::new(schema))
            })
            .await?;
        Ok(Arc::clone(schema))
    }

    /// Returns the cached schema of `identity` without fetching.
    pub async fn get(&self, identity: &ConnectionIdentity) -> Option<Arc<Schema>> {
        let slots = self.slots.lock().await;
        slots.get(identity).and_then(|slot| slot.get().cloned())
    }

    /// Drops the cached schema of `identity`; the next request refetches it.
    pub async fn invalidate(&self, identity: &ConnectionIdentity) {
        self.slots.lock().await.remove(identity);
    }
}
