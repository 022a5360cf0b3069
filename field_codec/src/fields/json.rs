//! JSON columns
//!
//! Values are held as `serde_json::Value`. The same field sees both freshly
//! assigned native values and text loaded from the database, so text input
//! is decoded only when it looks like encoded JSON.

use super::{Field, FieldDescription, FieldKind, FieldOptions};
use crate::connection::{Connection, JSON_NATIVE_MIN_VERSION};
use crate::errors::CodecError;
use crate::lookup::{Lookup, LookupSql};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use type_mapping::{pg_value_to_json, PgValue};

/// Kind a JSON field may be restricted to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonKind {
    Object,
    Array,
    String,
    Integer,
    Float,
    Boolean,
}

impl JsonKind {
    pub fn name(self) -> &'static str {
        match self {
            JsonKind::Object => "object",
            JsonKind::Array => "array",
            JsonKind::String => "string",
            JsonKind::Integer => "integer",
            JsonKind::Float => "float",
            JsonKind::Boolean => "boolean",
        }
    }

    /// Empty value of this kind
    pub fn empty(self) -> Value {
        match self {
            JsonKind::Object => Value::Object(serde_json::Map::new()),
            JsonKind::Array => Value::Array(Vec::new()),
            JsonKind::String => Value::String(String::new()),
            JsonKind::Integer => Value::from(0),
            JsonKind::Float => Value::from(0.0),
            JsonKind::Boolean => Value::Bool(false),
        }
    }

    pub fn matches(self, value: &Value) -> bool {
        match self {
            JsonKind::Object => value.is_object(),
            JsonKind::Array => value.is_array(),
            JsonKind::String => value.is_string(),
            JsonKind::Integer => value.is_i64() || value.is_u64(),
            JsonKind::Float => value.is_f64(),
            JsonKind::Boolean => value.is_boolean(),
        }
    }
}

impl FromStr for JsonKind {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "object" | "dict" => Ok(JsonKind::Object),
            "array" | "list" => Ok(JsonKind::Array),
            "string" | "str" => Ok(JsonKind::String),
            "integer" | "int" => Ok(JsonKind::Integer),
            "float" => Ok(JsonKind::Float),
            "boolean" | "bool" => Ok(JsonKind::Boolean),
            other => Err(CodecError::Configuration(format!(
                "If a kind is specified for a JSON field, it must be object, array, string, \
                 integer, float or boolean; got '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for JsonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone)]
pub struct JsonField {
    kind: Option<JsonKind>,
    options: FieldOptions,
}

impl Default for JsonField {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonField {
    pub fn new() -> Self {
        let options = FieldOptions {
            null: true,
            blank: true,
            ..FieldOptions::default()
        };
        Self { kind: None, options }
    }

    /// Restrict values to one kind
    pub fn of_kind(mut self, kind: JsonKind) -> Self {
        self.kind = Some(kind);
        self
    }

    field_options!();

    pub fn json_kind(&self) -> Option<JsonKind> {
        self.kind
    }

    /// Decode text that looks like encoded JSON, leave plain strings alone
    fn decode_text(&self, text: String) -> Result<Value, CodecError> {
        if self.kind != Some(JsonKind::String) {
            if is_integer_text(&text) {
                return Ok(serde_json::from_str(&text)?);
            }
            if is_decimal_text(&text) {
                if let Ok(number) = text.parse::<f64>() {
                    return Ok(Value::from(number));
                }
            }
            if matches!(text.as_str(), "true" | "false" | "null") {
                return Ok(serde_json::from_str(&text)?);
            }
            if text.starts_with(['{', '[']) && text.ends_with(['}', ']']) {
                return Ok(serde_json::from_str(&text)?);
            }
        }

        // a JSON string literal, even for string-kind fields
        if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
            return Ok(serde_json::from_str(&text)?);
        }

        Ok(Value::String(text))
    }

    /// Apply the kind restriction: falsy values of the wrong kind become the
    /// kind's empty value, anything else of the wrong kind is an error
    fn validate_kind(&self, value: Value) -> Result<Value, CodecError> {
        let Some(kind) = self.kind else {
            return Ok(value);
        };
        if kind.matches(&value) {
            return Ok(value);
        }
        if PgValue::Json(value.clone()).is_falsy() {
            return Ok(kind.empty());
        }
        Err(CodecError::TypeMismatch(format!(
            "Expected JSON {}; got {}",
            kind,
            json_kind_name(&value)
        )))
    }
}

impl Field for JsonField {
    fn kind(&self) -> FieldKind {
        FieldKind::Json
    }

    fn options(&self) -> &FieldOptions {
        &self.options
    }

    fn backing_type(&self, conn: &dyn Connection) -> String {
        if conn.server_version() >= JSON_NATIVE_MIN_VERSION {
            "json".to_string()
        } else {
            "text".to_string()
        }
    }

    fn to_native(&self, value: PgValue) -> Result<PgValue, CodecError> {
        let decoded = match value {
            PgValue::Null if self.kind.is_none() => return Ok(PgValue::Null),
            PgValue::Null => Value::Null,
            PgValue::Text(text) => self.decode_text(text)?,
            PgValue::Json(json) => json,
            other => pg_value_to_json(&other),
        };
        self.validate_kind(decoded).map(PgValue::Json)
    }

    fn default_value(&self) -> PgValue {
        match (&self.options.default, self.kind) {
            (Some(value), _) => value.clone(),
            (None, Some(kind)) => PgValue::Json(kind.empty()),
            (None, None) => PgValue::Null,
        }
    }

    fn to_wire(&self, value: PgValue) -> Result<PgValue, CodecError> {
        match self.to_native(value)? {
            PgValue::Json(json) => Ok(PgValue::Text(serde_json::to_string(&json)?)),
            other => Ok(other),
        }
    }

    fn translate_lookup(
        &self,
        lookup: &Lookup,
        _operand: PgValue,
        _conn: &dyn Connection,
    ) -> Result<LookupSql, CodecError> {
        Err(CodecError::unsupported_lookup(self.kind().name(), lookup.name()))
    }

    fn describe(&self) -> FieldDescription {
        let description = FieldDescription::new(FieldKind::Json, "json", &self.options);
        match self.kind {
            Some(kind) => description.with_extra("type", kind.name().into()),
            None => description,
        }
    }
}

fn json_kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_integer_text(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// `12.`, `12.5` or `.5`, optionally negative
fn is_decimal_text(text: &str) -> bool {
    let text = text.strip_prefix('-').unwrap_or(text);
    let Some((whole, fraction)) = text.split_once('.') else {
        return false;
    };
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if whole.is_empty() {
        !fraction.is_empty() && all_digits(fraction)
    } else {
        all_digits(whole) && all_digits(fraction)
    }
}
