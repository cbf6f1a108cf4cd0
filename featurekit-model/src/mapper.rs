//! Attribute mapper: wire records to typed records and back.

use crate::error::{ModelError, ModelResult};
use crate::feature::Feature;
use crate::schema::{Layer, Schema};
use featurekit_types::{CoercionError, FieldValue, Geometry, ValueKind};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use std::collections::HashSet;

/// A record as it travels on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireFeature {
    #[serde(default)]
    pub attributes: Map<String, Json>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Geometry>,
}

/// Finds an attribute by exact name, falling back to an ASCII
/// case-insensitive match.
fn find_attribute<'a>(attributes: &'a Map<String, Json>, name: &str) -> Option<(&'a String, &'a Json)> {
    attributes
        .iter()
        .find(|(k, _)| k.as_str() == name)
        .or_else(|| attributes.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)))
}

/// Builds a typed record from a wire record of `layer`.
///
/// Mapped fields are coerced to their declared kinds; domain-backed fields
/// receive the display name of the wire code. Attributes no mapping claims
/// are kept verbatim. The record is bound to the schema's connection and
/// starts clean.
pub fn to_record<T: Feature>(wire: &WireFeature, schema: &Schema, layer: &Layer) -> ModelResult<T> {
    let oid_field = layer.object_id_field()?;
    let mut record = T::default();
    let mut consumed: HashSet<&str> = HashSet::new();

    for mapping in T::mappings() {
        let (key, raw) = find_attribute(&wire.attributes, mapping.name).ok_or_else(|| {
            ModelError::FieldNotFound {
                type_name: T::type_name(),
                field: mapping.name.to_string(),
            }
        })?;
        consumed.insert(key.as_str());

        let coercion = |source: CoercionError| ModelError::Coercion {
            type_name: T::type_name(),
            field: mapping.name.to_string(),
            source,
        };

        let value = match mapping.domain {
            Some(domain_name) => {
                let domain = schema.domain(domain_name)?;
                let code = match layer.field(mapping.name).and_then(|f| f.field_type.value_kind()) {
                    Some(kind) => kind.decode(raw).map_err(coercion)?,
                    None => FieldValue::from_json_untyped(raw),
                };
                if code.is_null() {
                    FieldValue::Null
                } else {
                    FieldValue::String(domain.name_for(&code)?.to_string())
                }
            }
            None => mapping.kind.decode(raw).map_err(coercion)?,
        };
        (mapping.set)(&mut record, value).map_err(coercion)?;
    }

    let (oid_key, oid_raw) =
        find_attribute(&wire.attributes, &oid_field.name).ok_or_else(|| ModelError::FieldNotFound {
            type_name: T::type_name(),
            field: oid_field.name.clone(),
        })?;
    let object_id = oid_raw.as_i64().ok_or_else(|| ModelError::Coercion {
        type_name: T::type_name(),
        field: oid_field.name.clone(),
        source: CoercionError::Mismatch {
            expected: ValueKind::BigInteger,
            found: oid_raw.to_string(),
        },
    })?;

    let state = record.state_mut();
    for (name, value) in &wire.attributes {
        if name != oid_key && !consumed.contains(name.as_str()) {
            state.load_unmapped(name.clone(), value.clone());
        }
    }
    if T::HAS_GEOMETRY {
        state.load_geometry(wire.geometry.clone());
    }
    state.bind(schema.identity().clone(), layer.id, object_id);
    state.mark_clean();

    Ok(record)
}

/// Builds the wire form of a record of `layer`.
///
/// With `changes_only`, a record without changed fields or geometry yields
/// `None`; otherwise the payload carries the object-id field, the changed
/// fields only, and the geometry only if it changed. Domain-backed values are
/// re-encoded to their stored codes.
pub fn to_wire_record<T: Feature>(
    record: &T,
    schema: &Schema,
    layer: &Layer,
    changes_only: bool,
) -> ModelResult<Option<WireFeature>> {
    let state = record.state();
    if changes_only && !state.has_changes() {
        return Ok(None);
    }

    let changed: HashSet<&str> = state.changed_fields().iter().map(String::as_str).collect();
    let include = |name: &str| !changes_only || changed.contains(name);
    let mut attributes = Map::new();

    if changes_only {
        let oid_field = layer.object_id_field()?;
        attributes.insert(oid_field.name.clone(), Json::from(state.object_id()));
    }

    for mapping in T::mappings() {
        if !include(mapping.name) {
            continue;
        }
        let value = (mapping.get)(record);
        let encoded = match mapping.domain {
            Some(domain_name) if !value.is_null() => {
                let domain = schema.domain(domain_name)?;
                let name = match &value {
                    FieldValue::String(s) => s.clone(),
                    other => other.to_string(),
                };
                domain.code_for(&name)?.to_json()
            }
            _ => value.to_json(),
        };
        attributes.insert(mapping.name.to_string(), encoded);
    }

    for (name, value) in state.unmapped() {
        if include(name.as_str()) {
            attributes.insert(name.clone(), value.clone());
        }
    }

    let geometry = if T::HAS_GEOMETRY && (!changes_only || state.geometry_changed()) {
        state.geometry().cloned()
    } else {
        None
    };

    Ok(Some(WireFeature {
        attributes,
        geometry,
    }))
}
