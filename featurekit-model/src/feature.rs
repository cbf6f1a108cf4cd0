//! Feature records and change tracking.
//!
//! A record type implements [`Feature`] by exposing a static table of
//! [`FieldMapping`]s (wire name, declared kind, optional domain, accessor and
//! mutator) and an embedded [`FeatureState`]. Every mutation, whether through
//! a generated typed setter or through [`Feature::set_field_value`], funnels
//! into [`FeatureState::mark_field_changed`], so record types never carry
//! their own dirty-tracking code.

use crate::error::{ModelError, ModelResult};
use featurekit_types::{CoercionResult, ConnectionIdentity, FieldValue, Geometry, ValueKind};
use serde_json::Value as Json;
use std::collections::{BTreeMap, HashMap};

/// Object id of a record that is not bound to a server row.
pub const UNBOUND_OBJECT_ID: i64 = -1;

/// Maps one wire field onto a record type.
pub struct FieldMapping<T> {
    /// Wire (attribute) name.
    pub name: &'static str,
    /// Coded-value domain the record stores display names of.
    pub domain: Option<&'static str>,
    /// Declared native kind.
    pub kind: ValueKind,
    pub get: fn(&T) -> FieldValue,
    /// Raw mutator; does not track changes.
    pub set: fn(&mut T, FieldValue) -> CoercionResult<()>,
}

/// The connection and layer a record was downloaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerBinding {
    pub identity: ConnectionIdentity,
    pub layer_id: i64,
}

/// Per-record bookkeeping: identity, binding, opaque fields and changes.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureState {
    object_id: i64,
    binding: Option<LayerBinding>,
    dirty: bool,
    changed_fields: Vec<String>,
    geometry_changed: bool,
    geometry: Option<Geometry>,
    unmapped: BTreeMap<String, Json>,
}

impl Default for FeatureState {
    fn default() -> Self {
        Self {
            object_id: UNBOUND_OBJECT_ID,
            binding: None,
            dirty: false,
            changed_fields: Vec::new(),
            geometry_changed: false,
            geometry: None,
            unmapped: BTreeMap::new(),
        }
    }
}

impl FeatureState {
    pub fn object_id(&self) -> i64 {
        self.object_id
    }

    pub fn is_bound(&self) -> bool {
        self.object_id >= 0 && self.binding.is_some()
    }

    pub fn binding(&self) -> Option<&LayerBinding> {
        self.binding.as_ref()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Wire names of the fields changed since the last sync, in first-touch order.
    pub fn changed_fields(&self) -> &[String] {
        &self.changed_fields
    }

    pub fn geometry_changed(&self) -> bool {
        self.geometry_changed
    }

    /// True when a changes-only payload would carry anything.
    pub fn has_changes(&self) -> bool {
        !self.changed_fields.is_empty() || self.geometry_changed
    }

    /// Records that `name` changed. Repeated changes to one field are recorded once.
    pub fn mark_field_changed(&mut self, name: &str) {
        if !self.changed_fields.iter().any(|f| f == name) {
            self.changed_fields.push(name.to_string());
        }
        self.dirty = true;
    }

    /// Clears the dirty flag together with the changed fields and geometry flag.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
        self.changed_fields.clear();
        self.geometry_changed = false;
    }

    /// Binds the record to a server row.
    pub fn bind(&mut self, identity: ConnectionIdentity, layer_id: i64, object_id: i64) {
        self.binding = Some(LayerBinding { identity, layer_id });
        self.object_id = object_id;
    }

    /// Detaches the record from its server row after a delete.
    pub fn unbind(&mut self) {
        self.binding = None;
        self.object_id = UNBOUND_OBJECT_ID;
        self.mark_clean();
    }

    pub fn geometry(&self) -> Option<&Geometry> {
        self.geometry.as_ref()
    }

    /// Assigns the geometry. Always counts as a change; geometries are not compared.
    pub fn replace_geometry(&mut self, geometry: Option<Geometry>) {
        self.geometry = geometry;
        self.geometry_changed = true;
        self.dirty = true;
    }

    pub(crate) fn load_geometry(&mut self, geometry: Option<Geometry>) {
        self.geometry = geometry;
    }

    /// Fields the record type does not map, kept verbatim.
    pub fn unmapped(&self) -> &BTreeMap<String, Json> {
        &self.unmapped
    }

    /// Sets an unmapped field, tracking the change when the value differs.
    pub fn set_unmapped(&mut self, name: &str, value: Json) {
        if self.unmapped.get(name) == Some(&value) {
            return;
        }
        self.unmapped.insert(name.to_string(), value);
        self.mark_field_changed(name);
    }

    pub(crate) fn load_unmapped(&mut self, name: String, value: Json) {
        self.unmapped.insert(name, value);
    }
}

/// A typed record of one feature-service layer.
///
/// Usually implemented through [`crate::feature_record!`].
pub trait Feature: Default + Send + Sync + 'static {
    /// Whether the type has a geometry slot. Geometry is only requested from
    /// the server for such types.
    const HAS_GEOMETRY: bool;

    fn type_name() -> &'static str;

    fn mappings() -> &'static [FieldMapping<Self>];

    /// Wire name to position in [`Feature::mappings`], built once per type.
    fn mapping_index() -> &'static HashMap<&'static str, usize>;

    fn state(&self) -> &FeatureState;

    fn state_mut(&mut self) -> &mut FeatureState;

    fn mapping(name: &str) -> Option<&'static FieldMapping<Self>> {
        Self::mapping_index()
            .get(name)
            .and_then(|&i| Self::mappings().get(i))
    }

    fn object_id(&self) -> i64 {
        self.state().object_id()
    }

    fn is_dirty(&self) -> bool {
        self.state().is_dirty()
    }

    fn changed_fields(&self) -> &[String] {
        self.state().changed_fields()
    }

    /// Reads a field by wire name, mapped or unmapped.
    fn field_value(&self, name: &str) -> Option<FieldValue> {
        match Self::mapping(name) {
            Some(mapping) => Some((mapping.get)(self)),
            None => self
                .state()
                .unmapped()
                .get(name)
                .map(FieldValue::from_json_untyped),
        }
    }

    /// Writes a field by wire name through the change tracker.
    ///
    /// Writing a value equal to the current one is a no-op.
    fn set_field_value(&mut self, name: &str, value: FieldValue) -> ModelResult<()> {
        if let Some(mapping) = Self::mapping(name) {
            let before = (mapping.get)(self);
            if before == value {
                return Ok(());
            }
            (mapping.set)(self, value).map_err(|source| ModelError::Coercion {
                type_name: Self::type_name(),
                field: name.to_string(),
                source,
            })?;
            if (mapping.get)(self) != before {
                self.state_mut().mark_field_changed(mapping.name);
            }
            return Ok(());
        }
        if self.state().unmapped().contains_key(name) {
            self.state_mut().set_unmapped(name, value.to_json());
            return Ok(());
        }
        Err(ModelError::UnknownField {
            type_name: Self::type_name(),
            field: name.to_string(),
        })
    }
}

/// Capability of record types that carry a geometry.
pub trait HasGeometry: Feature {
    fn geometry(&self) -> Option<&Geometry> {
        self.state().geometry()
    }

    /// Assigns the geometry; always marks the record dirty.
    fn set_geometry(&mut self, geometry: Option<Geometry>) {
        self.state_mut().replace_geometry(geometry);
    }
}
