//! Built-in scalar columns
//!
//! Plain PostgreSQL types that need no catalog work of their own. They serve
//! as array elements and composite sub-fields, and support the ordinary
//! comparison lookups.

use super::{Field, FieldDescription, FieldKind, FieldOptions};
use crate::connection::Connection;
use crate::errors::CodecError;
use crate::lookup::{comparison, Lookup, LookupSql};
use type_mapping::PgValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Boolean,
    SmallInt,
    Integer,
    BigInt,
    Float,
    Text,
    Varchar(u32),
}

impl ScalarKind {
    pub fn sql_type(self) -> String {
        match self {
            ScalarKind::Boolean => "boolean".to_string(),
            ScalarKind::SmallInt => "smallint".to_string(),
            ScalarKind::Integer => "integer".to_string(),
            ScalarKind::BigInt => "bigint".to_string(),
            ScalarKind::Float => "double precision".to_string(),
            ScalarKind::Text => "text".to_string(),
            ScalarKind::Varchar(len) => format!("varchar({})", len),
        }
    }

    fn is_textual(self) -> bool {
        matches!(self, ScalarKind::Text | ScalarKind::Varchar(_))
    }
}

#[derive(Debug, Clone)]
pub struct ScalarField {
    kind: ScalarKind,
    options: FieldOptions,
}

impl ScalarField {
    pub fn new(kind: ScalarKind) -> Self {
        Self {
            kind,
            options: FieldOptions::default(),
        }
    }

    pub fn boolean() -> Self {
        Self::new(ScalarKind::Boolean)
    }

    pub fn small_integer() -> Self {
        Self::new(ScalarKind::SmallInt)
    }

    pub fn integer() -> Self {
        Self::new(ScalarKind::Integer)
    }

    pub fn big_integer() -> Self {
        Self::new(ScalarKind::BigInt)
    }

    pub fn float() -> Self {
        Self::new(ScalarKind::Float)
    }

    pub fn text() -> Self {
        Self::new(ScalarKind::Text)
    }

    pub fn varchar(max_length: u32) -> Self {
        Self::new(ScalarKind::Varchar(max_length))
    }

    field_options!();

    pub fn scalar_kind(&self) -> ScalarKind {
        self.kind
    }
}

impl Field for ScalarField {
    fn kind(&self) -> FieldKind {
        FieldKind::Scalar
    }

    fn options(&self) -> &FieldOptions {
        &self.options
    }

    fn backing_type(&self, _conn: &dyn Connection) -> String {
        self.kind.sql_type()
    }

    fn to_native(&self, value: PgValue) -> Result<PgValue, CodecError> {
        if value.is_null() {
            return Ok(PgValue::Null);
        }
        match self.kind {
            ScalarKind::Boolean => coerce_bool(value),
            ScalarKind::SmallInt => {
                let n = coerce_i64(value, "smallint")?;
                i16::try_from(n)
                    .map(PgValue::SmallInt)
                    .map_err(|_| CodecError::TypeMismatch(format!("{} is out of range for smallint", n)))
            }
            ScalarKind::Integer => {
                let n = coerce_i64(value, "integer")?;
                i32::try_from(n)
                    .map(PgValue::Integer)
                    .map_err(|_| CodecError::TypeMismatch(format!("{} is out of range for integer", n)))
            }
            ScalarKind::BigInt => coerce_i64(value, "bigint").map(PgValue::BigInt),
            ScalarKind::Float => coerce_f64(value).map(PgValue::Float),
            ScalarKind::Text | ScalarKind::Varchar(_) => coerce_text(value),
        }
    }

    fn default_value(&self) -> PgValue {
        match &self.options.default {
            Some(value) => value.clone(),
            // non-null text columns store the empty string rather than NULL
            None if self.kind.is_textual() && !self.options.null => PgValue::Text(String::new()),
            None => PgValue::Null,
        }
    }

    fn translate_lookup(
        &self,
        lookup: &Lookup,
        operand: PgValue,
        _conn: &dyn Connection,
    ) -> Result<LookupSql, CodecError> {
        let operand = match lookup {
            Lookup::IsNull => operand,
            _ => self.to_wire(operand)?,
        };
        comparison(lookup, operand)
            .ok_or_else(|| CodecError::unsupported_lookup(self.kind().name(), lookup.name()))
    }

    fn describe(&self) -> FieldDescription {
        let description = FieldDescription::new(FieldKind::Scalar, self.kind.sql_type(), &self.options);
        match self.kind {
            ScalarKind::Varchar(len) => description.with_extra("max_length", len.into()),
            _ => description,
        }
    }
}

/// Integer reference to a row of another table.
///
/// Only exists as a column of a model; composite declarations reject it.
#[derive(Debug, Clone)]
pub struct RelationField {
    to: String,
    options: FieldOptions,
}

impl RelationField {
    pub fn foreign_key(to: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            options: FieldOptions::default(),
        }
    }

    field_options!();

    /// Referenced table
    pub fn to(&self) -> &str {
        &self.to
    }
}

impl Field for RelationField {
    fn kind(&self) -> FieldKind {
        FieldKind::Relation
    }

    fn options(&self) -> &FieldOptions {
        &self.options
    }

    fn backing_type(&self, _conn: &dyn Connection) -> String {
        "integer".to_string()
    }

    fn references(&self) -> Option<&str> {
        Some(&self.to)
    }

    fn to_native(&self, value: PgValue) -> Result<PgValue, CodecError> {
        if value.is_null() {
            return Ok(PgValue::Null);
        }
        let n = coerce_i64(value, "integer")?;
        i32::try_from(n)
            .map(PgValue::Integer)
            .map_err(|_| CodecError::TypeMismatch(format!("{} is out of range for integer", n)))
    }

    fn translate_lookup(
        &self,
        lookup: &Lookup,
        operand: PgValue,
        _conn: &dyn Connection,
    ) -> Result<LookupSql, CodecError> {
        let operand = match lookup {
            Lookup::IsNull => operand,
            _ => self.to_wire(operand)?,
        };
        comparison(lookup, operand)
            .ok_or_else(|| CodecError::unsupported_lookup(self.kind().name(), lookup.name()))
    }

    fn describe(&self) -> FieldDescription {
        FieldDescription::new(FieldKind::Relation, "foreign_key", &self.options)
            .with_extra("to", self.to.clone().into())
    }
}

fn coerce_bool(value: PgValue) -> Result<PgValue, CodecError> {
    match value {
        PgValue::Boolean(b) => Ok(PgValue::Boolean(b)),
        PgValue::Text(ref s) => match s.trim().to_ascii_lowercase().as_str() {
            "t" | "true" | "1" => Ok(PgValue::Boolean(true)),
            "f" | "false" | "0" => Ok(PgValue::Boolean(false)),
            _ => Err(CodecError::invalid_text("boolean", s, "not a boolean literal")),
        },
        ref other => match other.as_i64() {
            Some(0) => Ok(PgValue::Boolean(false)),
            Some(1) => Ok(PgValue::Boolean(true)),
            _ => Err(CodecError::mismatch("boolean", other)),
        },
    }
}

fn coerce_i64(value: PgValue, type_name: &str) -> Result<i64, CodecError> {
    if let Some(n) = value.as_i64() {
        return Ok(n);
    }
    match value {
        PgValue::Text(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|e| CodecError::invalid_text(type_name, &s, e)),
        PgValue::Float(f) if f.fract() == 0.0 && f.is_finite() => Ok(f as i64),
        PgValue::Json(serde_json::Value::Number(n)) if n.is_i64() => Ok(n.as_i64().unwrap_or_default()),
        other => Err(CodecError::mismatch(type_name, &other)),
    }
}

fn coerce_f64(value: PgValue) -> Result<f64, CodecError> {
    if let Some(n) = value.as_i64() {
        return Ok(n as f64);
    }
    match value {
        PgValue::Float(f) => Ok(f),
        PgValue::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| CodecError::invalid_text("double precision", &s, e)),
        other => Err(CodecError::mismatch("double precision", &other)),
    }
}

fn coerce_text(value: PgValue) -> Result<PgValue, CodecError> {
    match value {
        PgValue::Text(s) => Ok(PgValue::Text(s)),
        PgValue::Boolean(_)
        | PgValue::SmallInt(_)
        | PgValue::Integer(_)
        | PgValue::BigInt(_)
        | PgValue::Float(_)
        | PgValue::Uuid(_) => Ok(PgValue::Text(value.to_string())),
        PgValue::Json(serde_json::Value::String(s)) => Ok(PgValue::Text(s)),
        other => Err(CodecError::mismatch("text", &other)),
    }
}
