//! Typed attribute values and wire coercion.
//!
//! Wire attributes arrive as loosely-typed JSON: numbers that may be integral
//! or fractional, dates as epoch milliseconds, GUIDs as braced strings. A
//! [`ValueKind`] names the native type a field is declared with and knows how
//! to coerce a JSON value into a [`FieldValue`] of that type and back.

use crate::timestamp::{from_epoch_millis, to_epoch_millis};
use crate::{CoercionError, CoercionResult};
use chrono::{DateTime, Utc};
use serde_json::Value as Json;
use std::fmt;
use uuid::Uuid;

/// The native type a field value is stored as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    SmallInteger,
    Integer,
    BigInteger,
    Single,
    Double,
    String,
    Date,
    Guid,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::SmallInteger => "small integer",
            ValueKind::Integer => "integer",
            ValueKind::BigInteger => "big integer",
            ValueKind::Single => "single",
            ValueKind::Double => "double",
            ValueKind::String => "string",
            ValueKind::Date => "date",
            ValueKind::Guid => "GUID",
        };
        f.write_str(name)
    }
}

impl ValueKind {
    /// Coerces a JSON wire value into a typed value of this kind.
    ///
    /// JSON `null` always decodes to [`FieldValue::Null`]. Numbers are
    /// accepted from either JSON numbers or numeric strings.
    pub fn decode(self, json: &Json) -> CoercionResult<FieldValue> {
        if json.is_null() {
            return Ok(FieldValue::Null);
        }
        match self {
            ValueKind::SmallInteger => {
                let n = integral(json, self)?;
                i16::try_from(n)
                    .map(FieldValue::SmallInteger)
                    .map_err(|_| out_of_range(self, n))
            }
            ValueKind::Integer => {
                let n = integral(json, self)?;
                i32::try_from(n)
                    .map(FieldValue::Integer)
                    .map_err(|_| out_of_range(self, n))
            }
            ValueKind::BigInteger => integral(json, self).map(FieldValue::BigInteger),
            ValueKind::Single => fractional(json, self).map(|n| FieldValue::Single(n as f32)),
            ValueKind::Double => fractional(json, self).map(FieldValue::Double),
            ValueKind::String => match json {
                Json::String(s) => Ok(FieldValue::String(s.clone())),
                Json::Number(n) => Ok(FieldValue::String(n.to_string())),
                Json::Bool(b) => Ok(FieldValue::String(b.to_string())),
                other => Err(mismatch(self, other)),
            },
            ValueKind::Date => {
                let millis = integral(json, self)?;
                from_epoch_millis(millis).map(FieldValue::Date)
            }
            ValueKind::Guid => match json {
                Json::String(s) => parse_guid(s).map(FieldValue::Guid),
                other => Err(mismatch(self, other)),
            },
        }
    }
}

fn integral(json: &Json, kind: ValueKind) -> CoercionResult<i64> {
    match json {
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(i);
            }
            match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 => {
                    Ok(f as i64)
                }
                _ => Err(mismatch(kind, json)),
            }
        }
        Json::String(s) => s.trim().parse::<i64>().map_err(|_| mismatch(kind, json)),
        other => Err(mismatch(kind, other)),
    }
}

fn fractional(json: &Json, kind: ValueKind) -> CoercionResult<f64> {
    match json {
        Json::Number(n) => n.as_f64().ok_or_else(|| mismatch(kind, json)),
        Json::String(s) => s.trim().parse::<f64>().map_err(|_| mismatch(kind, json)),
        other => Err(mismatch(kind, other)),
    }
}

fn parse_guid(s: &str) -> CoercionResult<Uuid> {
    Uuid::parse_str(s.trim()).map_err(|_| CoercionError::InvalidGuid(s.to_string()))
}

fn mismatch(expected: ValueKind, found: &Json) -> CoercionError {
    CoercionError::Mismatch {
        expected,
        found: found.to_string(),
    }
}

fn out_of_range(expected: ValueKind, value: i64) -> CoercionError {
    CoercionError::OutOfRange {
        expected,
        value: value.to_string(),
    }
}

/// A typed attribute value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldValue {
    #[default]
    Null,
    SmallInteger(i16),
    Integer(i32),
    BigInteger(i64),
    Single(f32),
    Double(f64),
    String(String),
    Date(DateTime<Utc>),
    Guid(Uuid),
}

impl FieldValue {
    /// Returns true for [`FieldValue::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Returns the kind of a non-null value.
    #[must_use]
    pub const fn kind(&self) -> Option<ValueKind> {
        match self {
            FieldValue::Null => None,
            FieldValue::SmallInteger(_) => Some(ValueKind::SmallInteger),
            FieldValue::Integer(_) => Some(ValueKind::Integer),
            FieldValue::BigInteger(_) => Some(ValueKind::BigInteger),
            FieldValue::Single(_) => Some(ValueKind::Single),
            FieldValue::Double(_) => Some(ValueKind::Double),
            FieldValue::String(_) => Some(ValueKind::String),
            FieldValue::Date(_) => Some(ValueKind::Date),
            FieldValue::Guid(_) => Some(ValueKind::Guid),
        }
    }

    /// Returns the value as a string slice if it is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns any integral value widened to `i64`.
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::SmallInteger(n) => Some(*n as i64),
            FieldValue::Integer(n) => Some(*n as i64),
            FieldValue::BigInteger(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns any numeric value widened to `f64`.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Single(n) => Some(f64::from(*n)),
            FieldValue::Double(n) => Some(*n),
            other => other.as_i64().map(|n| n as f64),
        }
    }

    /// Compares two values, treating numbers of different widths as equal
    /// when they denote the same quantity.
    ///
    /// Coded-value domains are shared between fields whose declared types may
    /// differ (e.g. small integer and integer), so code lookups use this
    /// rather than `==`.
    #[must_use]
    pub fn loosely_equals(&self, other: &FieldValue) -> bool {
        if let (Some(a), Some(b)) = (self.as_i64(), other.as_i64()) {
            return a == b;
        }
        if let (Some(a), Some(b)) = (self.as_f64(), other.as_f64()) {
            return a == b;
        }
        self == other
    }

    /// Converts a JSON value without a declared type.
    ///
    /// Used for attributes no mapping claims: integers become big integers,
    /// other numbers doubles, anything structured its JSON text.
    #[must_use]
    pub fn from_json_untyped(json: &Json) -> Self {
        match json {
            Json::Null => FieldValue::Null,
            Json::String(s) => FieldValue::String(s.clone()),
            Json::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::BigInteger(i),
                None => n.as_f64().map_or(FieldValue::Null, FieldValue::Double),
            },
            other => FieldValue::String(other.to_string()),
        }
    }

    /// Encodes this value in its wire form.
    ///
    /// Dates become epoch milliseconds, GUIDs the braced upper-case form.
    #[must_use]
    pub fn to_json(&self) -> Json {
        match self {
            FieldValue::Null => Json::Null,
            FieldValue::SmallInteger(n) => Json::from(*n),
            FieldValue::Integer(n) => Json::from(*n),
            FieldValue::BigInteger(n) => Json::from(*n),
            FieldValue::Single(n) => Json::from(f64::from(*n)),
            FieldValue::Double(n) => Json::from(*n),
            FieldValue::String(s) => Json::String(s.clone()),
            FieldValue::Date(dt) => Json::from(to_epoch_millis(dt)),
            FieldValue::Guid(g) => Json::String(format!("{{{}}}", g.hyphenated()).to_uppercase()),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => f.write_str("null"),
            FieldValue::SmallInteger(n) => write!(f, "{n}"),
            FieldValue::Integer(n) => write!(f, "{n}"),
            FieldValue::BigInteger(n) => write!(f, "{n}"),
            FieldValue::Single(n) => write!(f, "{n}"),
            FieldValue::Double(n) => write!(f, "{n}"),
            FieldValue::String(s) => f.write_str(s),
            FieldValue::Date(dt) => write!(f, "{}", dt.to_rfc3339()),
            FieldValue::Guid(g) => write!(f, "{{{}}}", g.hyphenated()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

/// A Rust type that can back a mapped record field.
///
/// `Option<T>` is implemented for every `T` so nullable fields map to
/// `None`; the plain types reject nulls.
pub trait NativeField: Sized + Clone + PartialEq + Default + Send + Sync + 'static {
    /// The kind wire values are coerced to before conversion.
    const KIND: ValueKind;

    /// Converts a typed value into this Rust type.
    fn from_value(value: FieldValue) -> CoercionResult<Self>;

    /// Converts this Rust value into a typed value.
    fn to_value(&self) -> FieldValue;
}

fn wrong_type(expected: ValueKind, value: &FieldValue) -> CoercionError {
    match value {
        FieldValue::Null => CoercionError::Null { expected },
        other => CoercionError::Mismatch {
            expected,
            found: other.to_string(),
        },
    }
}

macro_rules! integral_native_field {
    ($ty:ty, $kind:ident) => {
        impl NativeField for $ty {
            const KIND: ValueKind = ValueKind::$kind;

            fn from_value(value: FieldValue) -> CoercionResult<Self> {
                let n = value
                    .as_i64()
                    .ok_or_else(|| wrong_type(Self::KIND, &value))?;
                <$ty>::try_from(n).map_err(|_| out_of_range(Self::KIND, n))
            }

            fn to_value(&self) -> FieldValue {
                FieldValue::$kind((*self).into())
            }
        }
    };
}

integral_native_field!(i16, SmallInteger);
integral_native_field!(i32, Integer);
integral_native_field!(i64, BigInteger);

impl NativeField for f32 {
    const KIND: ValueKind = ValueKind::Single;

    fn from_value(value: FieldValue) -> CoercionResult<Self> {
        value
            .as_f64()
            .map(|n| n as f32)
            .ok_or_else(|| wrong_type(Self::KIND, &value))
    }

    fn to_value(&self) -> FieldValue {
        FieldValue::Single(*self)
    }
}

impl NativeField for f64 {
    const KIND: ValueKind = ValueKind::Double;

    fn from_value(value: FieldValue) -> CoercionResult<Self> {
        value.as_f64().ok_or_else(|| wrong_type(Self::KIND, &value))
    }

    fn to_value(&self) -> FieldValue {
        FieldValue::Double(*self)
    }
}

impl NativeField for String {
    const KIND: ValueKind = ValueKind::String;

    fn from_value(value: FieldValue) -> CoercionResult<Self> {
        match value {
            FieldValue::String(s) => Ok(s),
            FieldValue::Null => Err(CoercionError::Null {
                expected: Self::KIND,
            }),
            other => Ok(other.to_string()),
        }
    }

    fn to_value(&self) -> FieldValue {
        FieldValue::String(self.clone())
    }
}

impl NativeField for DateTime<Utc> {
    const KIND: ValueKind = ValueKind::Date;

    fn from_value(value: FieldValue) -> CoercionResult<Self> {
        match value {
            FieldValue::Date(dt) => Ok(dt),
            other => match other.as_i64() {
                Some(millis) => from_epoch_millis(millis),
                None => Err(wrong_type(Self::KIND, &other)),
            },
        }
    }

    fn to_value(&self) -> FieldValue {
        FieldValue::Date(*self)
    }
}

impl NativeField for Uuid {
    const KIND: ValueKind = ValueKind::Guid;

    fn from_value(value: FieldValue) -> CoercionResult<Self> {
        match value {
            FieldValue::Guid(g) => Ok(g),
            FieldValue::String(s) => parse_guid(&s),
            other => Err(wrong_type(Self::KIND, &other)),
        }
    }

    fn to_value(&self) -> FieldValue {
        FieldValue::Guid(*self)
    }
}

impl<T: NativeField> NativeField for Option<T> {
    const KIND: ValueKind = T::KIND;

    fn from_value(value: FieldValue) -> CoercionResult<Self> {
        match value {
            FieldValue::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }

    fn to_value(&self) -> FieldValue {
        self.as_ref().map_or(FieldValue::Null, NativeField::to_value)
    }
}
