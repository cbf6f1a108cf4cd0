//! Error types for the feature model.

use crate::schema::FieldType;
use featurekit_types::CoercionError;
use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while validating schemas and mapping records.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    /// A mapped field is absent from the wire record.
    #[error("field {field} of {type_name} not found on wire record")]
    FieldNotFound {
        type_name: &'static str,
        field: String,
    },

    /// A wire value cannot be coerced to the field's declared type.
    #[error("cannot coerce field {field} of {type_name}: {source}")]
    Coercion {
        type_name: &'static str,
        field: String,
        #[source]
        source: CoercionError,
    },

    /// A name is neither mapped nor present among the unmapped fields.
    #[error("field {field} is not defined on {type_name}")]
    UnknownField {
        type_name: &'static str,
        field: String,
    },

    #[error("layer {layer} has no object-id field")]
    MissingObjectIdField { layer: String },

    #[error("layer {layer} has {count} object-id fields")]
    DuplicateObjectIdField { layer: String, count: usize },

    #[error("layer not found: {0}")]
    LayerNotFound(String),

    #[error("domain not found: {0}")]
    DomainNotFound(String),

    #[error("field {field} of type {field_type:?} cannot carry a coded-value domain")]
    UnsupportedDomainField { field: String, field_type: FieldType },

    #[error("code {code} not found in domain {domain}")]
    CodeNotFound { domain: String, code: String },

    #[error("code {code} is ambiguous in domain {domain}")]
    AmbiguousCode { domain: String, code: String },

    #[error("name {name} not found in domain {domain}")]
    NameNotFound { domain: String, name: String },

    #[error("name {name} is ambiguous in domain {domain}")]
    AmbiguousName { domain: String, name: String },
}
