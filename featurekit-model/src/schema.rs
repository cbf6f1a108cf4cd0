//! Service schema: layers, fields and coded-value domains.
//!
//! The `*Definition` types mirror the JSON returned by the service's
//! `/layers` resource. [`Schema::build`] normalizes them: composite layers
//! (those made of sub-layers) are dropped, layers and tables are merged into
//! one list, and every coded-value domain is decoded into its field's native
//! type exactly once and shared by name.

use crate::error::{ModelError, ModelResult};
use featurekit_types::{ConnectionIdentity, FieldValue, GeometryType, ValueKind};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::collections::HashMap;
use std::fmt;

/// Page size assumed when a layer does not advertise `maxRecordCount`.
pub const DEFAULT_MAX_RECORD_COUNT: usize = 1000;

// ── Wire definitions ─────────────────────────────────────────────

/// A layer or table as described by the `/layers` resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerDefinition {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type", default)]
    pub layer_type: String,
    #[serde(rename = "geometryType", default, skip_serializing_if = "Option::is_none")]
    pub geometry_type: Option<String>,
    #[serde(rename = "hasZ", default)]
    pub has_z: bool,
    #[serde(rename = "maxRecordCount", default, skip_serializing_if = "Option::is_none")]
    pub max_record_count: Option<usize>,
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
    #[serde(rename = "subLayers", default, skip_serializing_if = "Vec::is_empty")]
    pub sub_layers: Vec<Json>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<DomainDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainDefinition {
    #[serde(rename = "type", default)]
    pub domain_type: String,
    pub name: String,
    #[serde(rename = "codedValues", default)]
    pub coded_values: Vec<CodedValueDefinition>,
}

impl DomainDefinition {
    /// Range and inherited domains carry no coded values and are ignored.
    #[must_use]
    pub fn is_coded_value(&self) -> bool {
        self.domain_type.is_empty() || self.domain_type == "codedValue"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodedValueDefinition {
    pub name: String,
    pub code: Json,
}

/// Declared field type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    #[serde(rename = "esriFieldTypeSmallInteger")]
    SmallInteger,
    #[serde(rename = "esriFieldTypeInteger")]
    Integer,
    #[serde(rename = "esriFieldTypeBigInteger")]
    BigInteger,
    #[serde(rename = "esriFieldTypeSingle")]
    Single,
    #[serde(rename = "esriFieldTypeDouble")]
    Double,
    #[serde(rename = "esriFieldTypeString")]
    String,
    #[serde(rename = "esriFieldTypeDate")]
    Date,
    #[serde(rename = "esriFieldTypeOID")]
    ObjectId,
    #[serde(rename = "esriFieldTypeGeometry")]
    Geometry,
    #[serde(rename = "esriFieldTypeBlob")]
    Blob,
    #[serde(rename = "esriFieldTypeRaster")]
    Raster,
    #[serde(rename = "esriFieldTypeGUID")]
    Guid,
    #[serde(rename = "esriFieldTypeGlobalID")]
    GlobalId,
    #[serde(rename = "esriFieldTypeXML")]
    Xml,
    #[serde(other)]
    Unknown,
}

impl FieldType {
    /// Returns the native kind values of this type decode to, if it has one.
    #[must_use]
    pub const fn value_kind(&self) -> Option<ValueKind> {
        match self {
            FieldType::SmallInteger => Some(ValueKind::SmallInteger),
            FieldType::Integer => Some(ValueKind::Integer),
            FieldType::BigInteger | FieldType::ObjectId => Some(ValueKind::BigInteger),
            FieldType::Single => Some(ValueKind::Single),
            FieldType::Double => Some(ValueKind::Double),
            FieldType::String | FieldType::Xml => Some(ValueKind::String),
            FieldType::Date => Some(ValueKind::Date),
            FieldType::Guid | FieldType::GlobalId => Some(ValueKind::Guid),
            FieldType::Geometry | FieldType::Blob | FieldType::Raster | FieldType::Unknown => {
                None
            }
        }
    }
}

// ── Normalized model ─────────────────────────────────────────────

/// A coded value with its code decoded to the field's native type.
#[derive(Debug, Clone, PartialEq)]
pub struct CodedValue {
    pub name: String,
    pub code: FieldValue,
}

/// A named coded-value domain.
#[derive(Debug, Clone, PartialEq)]
pub struct Domain {
    name: String,
    coded_values: Vec<CodedValue>,
}

impl Domain {
    pub fn new(name: impl Into<String>, coded_values: Vec<CodedValue>) -> Self {
        Self {
            name: name.into(),
            coded_values,
        }
    }

    /// Decodes a definition, converting every code to `kind`.
    pub fn decode(definition: &DomainDefinition, kind: ValueKind) -> ModelResult<Self> {
        let coded_values = definition
            .coded_values
            .iter()
            .map(|cv| {
                let code = kind.decode(&cv.code).map_err(|source| ModelError::Coercion {
                    type_name: "Domain",
                    field: definition.name.clone(),
                    source,
                })?;
                Ok(CodedValue {
                    name: cv.name.clone(),
                    code,
                })
            })
            .collect::<ModelResult<Vec<_>>>()?;
        Ok(Self::new(definition.name.clone(), coded_values))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn coded_values(&self) -> &[CodedValue] {
        &self.coded_values
    }

    /// Looks up the display name of a stored code.
    pub fn name_for(&self, code: &FieldValue) -> ModelResult<&str> {
        let mut matches = self.coded_values.iter().filter(|cv| cv.code.loosely_equals(code));
        match (matches.next(), matches.next()) {
            (Some(cv), None) => Ok(&cv.name),
            (None, _) => Err(ModelError::CodeNotFound {
                domain: self.name.clone(),
                code: code.to_string(),
            }),
            (Some(_), Some(_)) => Err(ModelError::AmbiguousCode {
                domain: self.name.clone(),
                code: code.to_string(),
            }),
        }
    }

    /// Looks up the stored code of a display name.
    pub fn code_for(&self, name: &str) -> ModelResult<&FieldValue> {
        let mut matches = self.coded_values.iter().filter(|cv| cv.name == name);
        match (matches.next(), matches.next()) {
            (Some(cv), None) => Ok(&cv.code),
            (None, _) => Err(ModelError::NameNotFound {
                domain: self.name.clone(),
                name: name.to_string(),
            }),
            (Some(_), Some(_)) => Err(ModelError::AmbiguousName {
                domain: self.name.clone(),
                name: name.to_string(),
            }),
        }
    }
}

/// A field of a layer. The domain, if any, is referenced by name.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub alias: Option<String>,
    pub field_type: FieldType,
    pub length: Option<u32>,
    pub domain: Option<String>,
}

/// One queryable layer or table.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub id: i64,
    pub name: String,
    pub layer_type: String,
    pub geometry_type: Option<GeometryType>,
    pub has_z: bool,
    /// The server's maximum page size.
    pub max_record_count: usize,
    pub fields: Vec<Field>,
}

impl Layer {
    /// Looks up a field by name, ignoring ASCII case.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .or_else(|| self.fields.iter().find(|f| f.name.eq_ignore_ascii_case(name)))
    }

    /// Returns the layer's single object-id field.
    pub fn object_id_field(&self) -> ModelResult<&Field> {
        let mut oid_fields = self
            .fields
            .iter()
            .filter(|f| f.field_type == FieldType::ObjectId);
        match (oid_fields.next(), oid_fields.count()) {
            (Some(field), 0) => Ok(field),
            (None, _) => Err(ModelError::MissingObjectIdField {
                layer: self.name.clone(),
            }),
            (Some(_), rest) => Err(ModelError::DuplicateObjectIdField {
                layer: self.name.clone(),
                count: rest + 1,
            }),
        }
    }

    /// True for attribute-only tables.
    pub fn is_table(&self) -> bool {
        self.geometry_type.is_none()
    }
}

/// Selects a layer by numeric id or by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerRef {
    Id(i64),
    Name(String),
}

impl From<i64> for LayerRef {
    fn from(id: i64) -> Self {
        LayerRef::Id(id)
    }
}

impl From<&str> for LayerRef {
    fn from(name: &str) -> Self {
        LayerRef::Name(name.to_string())
    }
}

impl From<String> for LayerRef {
    fn from(name: String) -> Self {
        LayerRef::Name(name)
    }
}

impl fmt::Display for LayerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerRef::Id(id) => write!(f, "#{id}"),
            LayerRef::Name(name) => f.write_str(name),
        }
    }
}

/// Normalized, immutable metadata of one connection.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    identity: ConnectionIdentity,
    layers: Vec<Layer>,
    domains: HashMap<String, Domain>,
}

impl Schema {
    /// Normalizes layer and table definitions fetched for `identity`.
    pub fn build(
        identity: ConnectionIdentity,
        definitions: impl IntoIterator<Item = LayerDefinition>,
    ) -> ModelResult<Self> {
        let mut layers = Vec::new();
        let mut domains: HashMap<String, Domain> = HashMap::new();

        for definition in definitions {
            if !definition.sub_layers.is_empty() {
                continue;
            }

            let mut fields = Vec::with_capacity(definition.fields.len());
            for fd in definition.fields {
                let domain = match fd.domain.as_ref().filter(|d| d.is_coded_value()) {
                    Some(dd) => {
                        if !domains.contains_key(&dd.name) {
                            let kind = fd.field_type.value_kind().ok_or_else(|| {
                                ModelError::UnsupportedDomainField {
                                    field: fd.name.clone(),
                                    field_type: fd.field_type,
                                }
                            })?;
                            domains.insert(dd.name.clone(), Domain::decode(dd, kind)?);
                        }
                        Some(dd.name.clone())
                    }
                    None => None,
                };
                fields.push(Field {
                    name: fd.name,
                    alias: fd.alias,
                    field_type: fd.field_type,
                    length: fd.length,
                    domain,
                });
            }

            layers.push(Layer {
                id: definition.id,
                name: definition.name,
                layer_type: definition.layer_type,
                geometry_type: definition
                    .geometry_type
                    .as_deref()
                    .and_then(GeometryType::from_protocol_name),
                has_z: definition.has_z,
                max_record_count: definition
                    .max_record_count
                    .filter(|n| *n > 0)
                    .unwrap_or(DEFAULT_MAX_RECORD_COUNT),
                fields,
            });
        }

        Ok(Self {
            identity,
            layers,
            domains,
        })
    }

    pub fn identity(&self) -> &ConnectionIdentity {
        &self.identity
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Resolves a layer by id or by name (ASCII case-insensitive).
    pub fn layer(&self, layer: &LayerRef) -> ModelResult<&Layer> {
        let found = match layer {
            LayerRef::Id(id) => self.layers.iter().find(|l| l.id == *id),
            LayerRef::Name(name) => self
                .layers
                .iter()
                .find(|l| l.name.eq_ignore_ascii_case(name)),
        };
        found.ok_or_else(|| ModelError::LayerNotFound(layer.to_string()))
    }

    /// Looks up a shared domain by name.
    pub fn domain(&self, name: &str) -> ModelResult<&Domain> {
        self.domains
            .get(name)
            .ok_or_else(|| ModelError::DomainNotFound(name.to_string()))
    }

    pub fn domains(&self) -> impl Iterator<Item = &Domain> {
        self.domains.values()
    }
}
