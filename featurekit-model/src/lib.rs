//! Feature model for featurekit.
//!
//! Defines how typed Rust records correspond to the attribute/geometry/domain
//! model of a feature service:
//! - [`Schema`], [`Layer`], [`Field`], [`Domain`]: normalized service metadata
//! - [`Feature`]: the capability every record type implements, backed by a
//!   static per-type [`FieldMapping`] table
//! - [`HasGeometry`]: implemented only by geometry-bearing record types
//! - [`FeatureState`]: object id, connection binding and change tracking
//! - [`feature_record!`]: generates record types whose setters track changes
//! - [`to_record`] / [`to_wire_record`]: the attribute mapper
//!
//! Nothing here performs I/O; the client crate feeds wire records in and
//! sends the mapper's output back out.

mod error;
mod feature;
mod macros;
mod mapper;
mod schema;

pub use error::{ModelError, ModelResult};
pub use feature::{Feature, FeatureState, FieldMapping, HasGeometry, LayerBinding, UNBOUND_OBJECT_ID};
pub use mapper::{to_record, to_wire_record, WireFeature};
pub use schema::{
    CodedValue, CodedValueDefinition, Domain, DomainDefinition, Field, FieldDefinition, FieldType,
    Layer, LayerDefinition, LayerRef, Schema,
};

pub use featurekit_types::{
    CoercionError, CoercionResult, ConnectionIdentity, FieldValue, Geometry, GeometryType,
    NativeField, ValueKind,
};
