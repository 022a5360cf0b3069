//! Runtime value definitions
//!
//! [`PgValue`] is the dynamic value handed to and returned from every field
//! codec. The same enum carries application values (a composite instance, a
//! UUID, a decoded JSON document) and wire values (the forms an adapter can
//! render to SQL).

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PgValue {
    Null,
    Boolean(bool),
    SmallInt(i16),
    Integer(i32),
    BigInt(i64),
    Float(f64),
    Text(String),
    Uuid(Uuid),
    Timestamp(chrono::DateTime<chrono::Utc>),
    Json(serde_json::Value),
    Array(Vec<PgValue>),
    Composite(CompositeInstance),
    /// Name/value pairs, in the order they were given
    Record(Vec<(String, PgValue)>),
}

impl PgValue {
    /// Whether the value counts as "empty" for defaulting purposes.
    ///
    /// Mirrors the usual notion of falsiness: null, `false`, zero, the empty
    /// string and empty sequences/mappings. Composite instances and UUIDs are
    /// never falsy.
    pub fn is_falsy(&self) -> bool {
        match self {
            PgValue::Null => true,
            PgValue::Boolean(b) => !b,
            PgValue::SmallInt(i) => *i == 0,
            PgValue::Integer(i) => *i == 0,
            PgValue::BigInt(i) => *i == 0,
            PgValue::Float(f) => *f == 0.0,
            PgValue::Text(s) => s.is_empty(),
            PgValue::Array(items) => items.is_empty(),
            PgValue::Record(pairs) => pairs.is_empty(),
            PgValue::Json(value) => crate::serialize::json_is_falsy(value),
            PgValue::Uuid(_) | PgValue::Timestamp(_) | PgValue::Composite(_) => false,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, PgValue::Null)
    }

    /// Integer view of any integral variant
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PgValue::SmallInt(i) => Some(i64::from(*i)),
            PgValue::Integer(i) => Some(i64::from(*i)),
            PgValue::BigInt(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PgValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_composite(&self) -> Option<&CompositeInstance> {
        match self {
            PgValue::Composite(instance) => Some(instance),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[PgValue]> {
        match self {
            PgValue::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Short name of the variant, used in error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            PgValue::Null => "null",
            PgValue::Boolean(_) => "boolean",
            PgValue::SmallInt(_) => "smallint",
            PgValue::Integer(_) => "integer",
            PgValue::BigInt(_) => "bigint",
            PgValue::Float(_) => "float",
            PgValue::Text(_) => "text",
            PgValue::Uuid(_) => "uuid",
            PgValue::Timestamp(_) => "timestamp",
            PgValue::Json(_) => "json",
            PgValue::Array(_) => "array",
            PgValue::Composite(_) => "composite",
            PgValue::Record(_) => "record",
        }
    }
}

impl fmt::Display for PgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PgValue::Null => write!(f, "NULL"),
            PgValue::Boolean(b) => write!(f, "{}", b),
            PgValue::SmallInt(i) => write!(f, "{}", i),
            PgValue::Integer(i) => write!(f, "{}", i),
            PgValue::BigInt(i) => write!(f, "{}", i),
            PgValue::Float(v) => write!(f, "{}", v),
            PgValue::Text(s) => write!(f, "'{}'", s),
            PgValue::Uuid(u) => write!(f, "{}", u),
            PgValue::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
            PgValue::Json(v) => write!(f, "{}", v),
            PgValue::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            PgValue::Composite(instance) => write!(f, "{}", instance),
            PgValue::Record(pairs) => {
                write!(f, "{{")?;
                for (i, (key, value)) in pairs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "'{}': {}", key, value)?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// One row of a composite type.
///
/// The slot list always lines up with the owning composite declaration: one
/// value per declared sub-field, in declaration order. Instances are built by
/// the composite field (see `field_codec::CompositeType`), which runs every
/// value through the matching sub-field's coercion first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeInstance {
    type_name: String,
    db_type: String,
    field_names: Vec<String>,
    values: Vec<PgValue>,
}

impl CompositeInstance {
    /// Assemble an instance from already-coerced parts.
    ///
    /// `values` must hold exactly one entry per name in `field_names`.
    pub fn from_parts(
        type_name: impl Into<String>,
        db_type: impl Into<String>,
        field_names: Vec<String>,
        values: Vec<PgValue>,
    ) -> Self {
        debug_assert_eq!(field_names.len(), values.len());
        Self {
            type_name: type_name.into(),
            db_type: db_type.into(),
            field_names,
            values,
        }
    }

    /// Name of the structured-instance type, e.g. `Monarch`
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Database type the instance belongs to, e.g. `monarch`
    pub fn db_type(&self) -> &str {
        &self.db_type
    }

    pub fn field_names(&self) -> &[String] {
        &self.field_names
    }

    pub fn values(&self) -> &[PgValue] {
        &self.values
    }

    pub fn into_values(self) -> Vec<PgValue> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&PgValue> {
        self.position(name).map(|idx| &self.values[idx])
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.field_names.iter().position(|n| n == name)
    }

    /// Iterate `(name, value)` pairs in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PgValue)> {
        self.field_names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// Raw slot access for the composite codec, which coerces before writing.
    #[doc(hidden)]
    pub fn slot_mut(&mut self, idx: usize) -> Option<&mut PgValue> {
        self.values.get_mut(idx)
    }
}

impl fmt::Display for CompositeInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.type_name)?;
        for (i, (name, value)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", name, value)?;
        }
        write!(f, ")")
    }
}

impl<'a> IntoIterator for &'a CompositeInstance {
    type Item = &'a PgValue;
    type IntoIter = std::slice::Iter<'a, PgValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

impl From<String> for PgValue {
    fn from(val: String) -> Self {
        PgValue::Text(val)
    }
}

impl From<&str> for PgValue {
    fn from(val: &str) -> Self {
        PgValue::Text(val.to_string())
    }
}

impl From<i16> for PgValue {
    fn from(val: i16) -> Self {
        PgValue::SmallInt(val)
    }
}

impl From<i32> for PgValue {
    fn from(val: i32) -> Self {
        PgValue::Integer(val)
    }
}

impl From<i64> for PgValue {
    fn from(val: i64) -> Self {
        PgValue::BigInt(val)
    }
}

impl From<f64> for PgValue {
    fn from(val: f64) -> Self {
        PgValue::Float(val)
    }
}

impl From<bool> for PgValue {
    fn from(val: bool) -> Self {
        PgValue::Boolean(val)
    }
}

impl From<Uuid> for PgValue {
    fn from(val: Uuid) -> Self {
        PgValue::Uuid(val)
    }
}

impl From<chrono::DateTime<chrono::Utc>> for PgValue {
    fn from(val: chrono::DateTime<chrono::Utc>) -> Self {
        PgValue::Timestamp(val)
    }
}

impl From<serde_json::Value> for PgValue {
    fn from(val: serde_json::Value) -> Self {
        PgValue::Json(val)
    }
}

impl From<CompositeInstance> for PgValue {
    fn from(val: CompositeInstance) -> Self {
        PgValue::Composite(val)
    }
}

impl<T> From<Vec<T>> for PgValue
where
    T: Into<PgValue>,
{
    fn from(val: Vec<T>) -> Self {
        PgValue::Array(val.into_iter().map(Into::into).collect())
    }
}

impl<T> From<Option<T>> for PgValue
where
    T: Into<PgValue>,
{
    fn from(val: Option<T>) -> Self {
        match val {
            Some(v) => v.into(),
            None => PgValue::Null,
        }
    }
}
