//! Insert, update and delete.
//!
//! Each operation is one `applyEdits` call. A rejected record fails the whole
//! call; nothing is retried or rolled back. Wire failures are returned inside
//! the result rather than as `Err`, which is reserved for precondition and
//! mapping failures detected before anything is sent.

use crate::error::{ClientResult, Error};
use crate::protocol::{EditOperation, EditOutcome, feature_json};
use crate::service::FeatureService;
use featurekit_model::{Feature, LayerRef, to_wire_record};
use featurekit_types::ConnectionIdentity;
use serde_json::Value as Json;
use std::marker::PhantomData;
use tracing::{debug, info, warn};

/// Outcome of an insert.
///
/// The created records are not downloaded until [`InsertResult::features`]
/// is awaited.
#[derive(Debug)]
pub struct InsertResult<T> {
    pub success: bool,
    /// Ids the server assigned, in submission order.
    pub object_ids: Vec<i64>,
    pub error: Option<Error>,
    identity: ConnectionIdentity,
    layer_id: i64,
    records: PhantomData<fn() -> T>,
}

impl<T: Feature> InsertResult<T> {
    fn new(service: &FeatureService, layer_id: i64, object_ids: Vec<i64>) -> Self {
        Self {
            success: true,
            object_ids,
            error: None,
            identity: service.identity().clone(),
            layer_id,
            records: PhantomData,
        }
    }

    fn failed(service: &FeatureService, layer_id: i64, error: Error) -> Self {
        Self {
            success: false,
            error: Some(error),
            ..Self::new(service, layer_id, Vec::new())
        }
    }

    /// Downloads the inserted records in submission order, including values
    /// the server populated. Empty for a failed insert.
    ///
    /// `service` must be connected to the service the records were inserted into.
    pub async fn features(&self, service: &FeatureService) -> ClientResult<Vec<T>> {
        if service.identity() != &self.identity {
            return Err(Error::Precondition(format!(
                "records were inserted into {}, not {}",
                self.identity,
                service.identity()
            )));
        }
        if !self.success || self.object_ids.is_empty() {
            return Ok(Vec::new());
        }
        service
            .download_by_ids(LayerRef::Id(self.layer_id), &self.object_ids)
            .await
    }
}

/// Outcome of an update or delete.
#[derive(Debug)]
pub struct EditResult {
    pub success: bool,
    pub object_ids: Vec<i64>,
    pub error: Option<Error>,
}

impl EditResult {
    fn succeeded(outcomes: &[EditOutcome]) -> Self {
        Self {
            success: true,
            object_ids: outcomes.iter().filter_map(|o| o.object_id).collect(),
            error: None,
        }
    }

    fn failed(error: Error) -> Self {
        Self {
            success: false,
            object_ids: Vec::new(),
            error: Some(error),
        }
    }
}

impl FeatureService {
    /// Inserts `records` into `layer`.
    ///
    /// The caller's records are left untouched; the created ones are
    /// available through [`InsertResult::features`].
    pub async fn insert<T: Feature>(
        &self,
        layer: impl Into<LayerRef>,
        records: &[T],
    ) -> ClientResult<InsertResult<T>> {
        let layer = self.layer(layer)?;
        let mut adds = Vec::with_capacity(records.len());
        for record in records {
            if let Some(wire) = to_wire_record(record, self.schema(), layer, false)? {
                adds.push(feature_json(wire));
            }
        }
        if adds.is_empty() {
            return Ok(InsertResult::new(self, layer.id, Vec::new()));
        }

        let outcomes = match self
            .client()
            .apply_edits(self.connection(), layer.id, EditOperation::Adds, &Json::Array(adds))
            .await
        {
            Ok(outcomes) => outcomes,
            Err(error) => {
                warn!(layer = %layer.name, %error, "insert failed");
                return Ok(InsertResult::failed(self, layer.id, error));
            }
        };

        let object_ids: Vec<i64> = outcomes.iter().filter_map(|o| o.object_id).collect();
        info!(layer = %layer.name, inserted = object_ids.len(), "records inserted");
        Ok(InsertResult::new(self, layer.id, object_ids))
    }

    /// Sends the changed fields of `records` and marks them clean.
    ///
    /// Every record must be bound to this service and all must share one
    /// layer. Records without changes are skipped; when none has changes
    /// nothing is sent and the update succeeds.
    pub async fn update<T: Feature>(&self, records: &mut [T]) -> ClientResult<EditResult> {
        let Some(layer_id) = self.edit_batch_layer(records.iter())? else {
            return Ok(EditResult::succeeded(&[]));
        };
        let layer = self.schema().layer(&LayerRef::Id(layer_id))?;

        let mut updates = Vec::new();
        for record in records.iter() {
            if let Some(wire) = to_wire_record(record, self.schema(), layer, true)? {
                updates.push(feature_json(wire));
            }
        }

        if updates.is_empty() {
            debug!(layer = %layer.name, "no changes to update");
            mark_all_clean(records);
            return Ok(EditResult::succeeded(&[]));
        }

        let count = updates.len();
        match self
            .client()
            .apply_edits(self.connection(), layer.id, EditOperation::Updates, &Json::Array(updates))
            .await
        {
            Ok(outcomes) => {
                info!(layer = %layer.name, updated = count, "records updated");
                mark_all_clean(records);
                Ok(EditResult::succeeded(&outcomes))
            }
            Err(error) => {
                warn!(layer = %layer.name, %error, "update failed");
                Ok(EditResult::failed(error))
            }
        }
    }

    /// Deletes the server rows of `records` and unbinds them.
    ///
    /// Same preconditions as [`FeatureService::update`].
    pub async fn delete<T: Feature>(&self, records: &mut [T]) -> ClientResult<EditResult> {
        let Some(layer_id) = self.edit_batch_layer(records.iter())? else {
            return Ok(EditResult::succeeded(&[]));
        };
        let layer = self.schema().layer(&LayerRef::Id(layer_id))?;
        let ids: Vec<Json> = records.iter().map(|r| Json::from(r.object_id())).collect();

        match self
            .client()
            .apply_edits(self.connection(), layer.id, EditOperation::Deletes, &Json::Array(ids))
            .await
        {
            Ok(outcomes) => {
                info!(layer = %layer.name, deleted = records.len(), "records deleted");
                for record in records.iter_mut() {
                    record.state_mut().unbind();
                }
                Ok(EditResult::succeeded(&outcomes))
            }
            Err(error) => {
                warn!(layer = %layer.name, %error, "delete failed");
                Ok(EditResult::failed(error))
            }
        }
    }

    /// Checks that every record is bound to this service and that all share
    /// one layer, returning that layer. `None` for an empty batch.
    fn edit_batch_layer<'a, T: Feature>(
        &self,
        records: impl Iterator<Item = &'a T>,
    ) -> ClientResult<Option<i64>> {
        let mut layer_id = None;
        for record in records {
            let state = record.state();
            let binding = match state.binding() {
                Some(binding) if state.is_bound() => binding,
                _ => {
                    return Err(Error::Precondition(format!(
                        "{} record is not bound to a server row",
                        T::type_name()
                    )));
                }
            };
            if &binding.identity != self.identity() {
                return Err(Error::Precondition(format!(
                    "record {} belongs to {}, not {}",
                    state.object_id(),
                    binding.identity,
                    self.identity()
                )));
            }
            match layer_id {
                None => layer_id = Some(binding.layer_id),
                Some(id) if id != binding.layer_id => {
                    return Err(Error::Precondition(format!(
                        "records span layers {id} and {}",
                        binding.layer_id
                    )));
                }
                Some(_) => {}
            }
        }
        Ok(layer_id)
    }
}

fn mark_all_clean<T: Feature>(records: &mut [T]) {
    for record in records {
        record.state_mut().mark_clean();
    }
}
