//! Value types for featurekit.
//!
//! This crate defines the I/O-free building blocks shared by the model and
//! the wire client:
//! - [`FieldValue`] and [`ValueKind`]: typed attribute values and the
//!   coercion rules from loosely-typed JSON wire values
//! - [`NativeField`]: Rust types that can back a mapped record field
//! - [`Geometry`]: opaque geometry payloads passed through to/from the wire
//! - [`ConnectionIdentity`]: the value that identifies one logical connection
//!
//! Geometries are carried, never interpreted: computational geometry
//! (distance, intersects, ...) lives outside this crate.

mod geometry;
mod identity;
mod timestamp;
mod value;

pub use geometry::{
    Envelope, Geometry, GeometryType, Multipoint, Point, Polygon, Polyline, SpatialReference,
};
pub use identity::ConnectionIdentity;
pub use timestamp::{from_epoch_millis, to_epoch_millis};
pub use value::{FieldValue, NativeField, ValueKind};

/// Result type alias for value coercion.
pub type CoercionResult<T> = std::result::Result<T, CoercionError>;

/// Errors raised when a value cannot be coerced to its declared type.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoercionError {
    #[error("null value where {expected} is required")]
    Null { expected: ValueKind },

    #[error("cannot coerce {found} to {expected}")]
    Mismatch { expected: ValueKind, found: String },

    #[error("value {value} is out of range for {expected}")]
    OutOfRange { expected: ValueKind, value: String },

    #[error("invalid GUID: {0}")]
    InvalidGuid(String),

    #[error("invalid epoch timestamp: {0}")]
    InvalidTimestamp(i64),

    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),
}
