//! Serialization utilities
//!
//! Conversion between serde data and [`PgValue`]. Composite lookups accept a
//! name/value record, so any `Serialize` struct can be used as an operand.

use crate::types::PgValue;
use serde::Serialize;

/// Convert serializable data into a [`PgValue::Record`] (or the matching
/// scalar/array variant when `data` is not a struct or map)
pub fn serialize_to_pg_record<T: Serialize>(data: &T) -> Result<PgValue, serde_json::Error> {
    let value = serde_json::to_value(data)?;
    Ok(json_to_pg_value(value))
}

/// Map a JSON document onto the closest [`PgValue`] variant
pub fn json_to_pg_value(value: serde_json::Value) -> PgValue {
    match value {
        serde_json::Value::String(s) => PgValue::Text(s),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                if i >= i32::MIN as i64 && i <= i32::MAX as i64 {
                    PgValue::Integer(i as i32)
                } else {
                    PgValue::BigInt(i)
                }
            } else if let Some(f) = n.as_f64() {
                PgValue::Float(f)
            } else {
                PgValue::Json(serde_json::Value::Number(n))
            }
        }
        serde_json::Value::Bool(b) => PgValue::Boolean(b),
        serde_json::Value::Null => PgValue::Null,
        serde_json::Value::Array(items) => {
            PgValue::Array(items.into_iter().map(json_to_pg_value).collect())
        }
        serde_json::Value::Object(map) => PgValue::Record(
            map.into_iter()
                .map(|(key, value)| (key, json_to_pg_value(value)))
                .collect(),
        ),
    }
}

/// Map a [`PgValue`] onto a JSON document.
///
/// UUIDs and timestamps become strings; composite instances become objects
/// keyed by sub-field name.
pub fn pg_value_to_json(value: &PgValue) -> serde_json::Value {
    use serde_json::Value;

    match value {
        PgValue::Null => Value::Null,
        PgValue::Boolean(b) => Value::Bool(*b),
        PgValue::SmallInt(i) => Value::from(*i),
        PgValue::Integer(i) => Value::from(*i),
        PgValue::BigInt(i) => Value::from(*i),
        PgValue::Float(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        PgValue::Text(s) => Value::String(s.clone()),
        PgValue::Uuid(u) => Value::String(u.to_string()),
        PgValue::Timestamp(ts) => Value::String(ts.to_rfc3339()),
        PgValue::Json(json) => json.clone(),
        PgValue::Array(items) => Value::Array(items.iter().map(pg_value_to_json).collect()),
        PgValue::Composite(instance) => Value::Object(
            instance
                .iter()
                .map(|(name, value)| (name.to_string(), pg_value_to_json(value)))
                .collect(),
        ),
        PgValue::Record(pairs) => Value::Object(
            pairs
                .iter()
                .map(|(name, value)| (name.clone(), pg_value_to_json(value)))
                .collect(),
        ),
    }
}

pub(crate) fn json_is_falsy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::Bool(b) => !b,
        serde_json::Value::Number(n) => n.as_f64() == Some(0.0),
        serde_json::Value::String(s) => s.is_empty(),
        serde_json::Value::Array(items) => items.is_empty(),
        serde_json::Value::Object(map) => map.is_empty(),
    }
}
