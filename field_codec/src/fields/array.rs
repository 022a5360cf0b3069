//! Array columns
//!
//! An array is parameterized by one element field. Every element read from
//! the database, assigned by the caller or appended later passes through the
//! element field's coercion.

use super::{Field, FieldDescription, FieldKind, FieldOptions, FieldRef, TypeDefinition};
use crate::coercive_list::{Coercer, CoerciveList};
use crate::connection::Connection;
use crate::errors::CodecError;
use crate::lookup::{Lookup, LookupSql};
use crate::registry::AdapterRegistry;
use std::sync::Arc;
use type_mapping::{json_to_pg_value, split_array_text, PgValue};

#[derive(Debug, Clone)]
pub struct ArrayField {
    of: FieldRef,
    options: FieldOptions,
}

impl ArrayField {
    pub fn new(of: impl Field + 'static) -> Self {
        Self::of_ref(Arc::new(of))
    }

    /// Array of an already shared element field
    pub fn of_ref(of: FieldRef) -> Self {
        // null=false would only add NOT NULL; an absent array is stored empty
        let options = FieldOptions {
            null: true,
            ..FieldOptions::default()
        };
        Self { of, options }
    }

    field_options!(fixed_null);

    pub fn of(&self) -> &FieldRef {
        &self.of
    }

    /// Wrap a value in a list that coerces every element through the
    /// element field, now and on every later write
    pub fn coercive_list(&self, value: PgValue) -> Result<CoerciveList<PgValue>, CodecError> {
        let of = Arc::clone(&self.of);
        let coerce: Coercer<PgValue, CodecError> = Arc::new(move |item| of.to_native(item));
        let items = match value {
            PgValue::Null => Vec::new(),
            PgValue::Array(items) => items,
            PgValue::Text(text) => self.parse_text(&text)?,
            PgValue::Json(serde_json::Value::Array(items)) => {
                items.into_iter().map(json_to_pg_value).collect()
            }
            other => return Err(CodecError::mismatch("array", &other)),
        };
        CoerciveList::with_items(coerce, items)
    }

    fn parse_text(&self, text: &str) -> Result<Vec<PgValue>, CodecError> {
        let elements = split_array_text(text)
            .map_err(|e| CodecError::from_text_format("array", text, e))?;
        elements
            .iter()
            .map(|element| self.of.from_text(element.as_deref()))
            .collect()
    }

    /// Operand of `len`: a non-negative integer
    fn length_operand(operand: &PgValue) -> Result<i64, CodecError> {
        let length = match operand {
            PgValue::Text(s) => s.trim().parse::<i64>().ok(),
            other => other.as_i64(),
        };
        match length {
            Some(n) if n >= 0 => Ok(n),
            Some(n) => Err(CodecError::TypeMismatch(format!(
                "Array length must be non-negative; got {}",
                n
            ))),
            None => Err(CodecError::TypeMismatch(format!(
                "Array length lookups require an integer; got {}",
                operand
            ))),
        }
    }
}

impl Field for ArrayField {
    fn kind(&self) -> FieldKind {
        FieldKind::Array
    }

    fn options(&self) -> &FieldOptions {
        &self.options
    }

    fn backing_type(&self, conn: &dyn Connection) -> String {
        format!("{}[]", self.of.backing_type(conn))
    }

    fn to_native(&self, value: PgValue) -> Result<PgValue, CodecError> {
        Ok(PgValue::Array(self.coercive_list(value)?.into_vec()))
    }

    fn check(&self) -> Result<(), CodecError> {
        self.of.check()
    }

    fn default_value(&self) -> PgValue {
        self.options
            .default
            .clone()
            .unwrap_or(PgValue::Array(Vec::new()))
    }

    fn to_wire(&self, value: PgValue) -> Result<PgValue, CodecError> {
        if value.is_falsy() {
            return Ok(PgValue::Array(Vec::new()));
        }
        let items = self
            .coercive_list(value)?
            .into_iter()
            .map(|item| self.of.to_wire(item))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PgValue::Array(items))
    }

    fn from_text(&self, text: Option<&str>) -> Result<PgValue, CodecError> {
        match text {
            Some(text) => Ok(PgValue::Array(self.parse_text(text)?)),
            None => Ok(PgValue::Array(Vec::new())),
        }
    }

    fn translate_lookup(
        &self,
        lookup: &Lookup,
        operand: PgValue,
        conn: &dyn Connection,
    ) -> Result<LookupSql, CodecError> {
        let backing_type = self.backing_type(conn);
        match lookup {
            Lookup::Exact => Ok(LookupSql::new(
                format!("{{field}} = {{value}}::{}", backing_type),
                vec![self.to_wire(operand)?],
            )),
            Lookup::Contains => {
                let is_sequence = matches!(
                    operand,
                    PgValue::Array(_) | PgValue::Json(serde_json::Value::Array(_))
                );
                if is_sequence {
                    Ok(LookupSql::new(
                        format!("{{field}} @> {{value}}::{}", backing_type),
                        vec![self.to_wire(operand)?],
                    ))
                } else {
                    Ok(LookupSql::new(
                        format!("{{value}} = ANY({{field}}::{})", backing_type),
                        vec![self.of.to_wire(operand)?],
                    ))
                }
            }
            Lookup::Len => {
                // the length of an empty array is NULL in PostgreSQL
                if operand.is_falsy() {
                    return Ok(LookupSql::new("ARRAY_LENGTH({field}, 1) IS NULL", vec![]));
                }
                match Self::length_operand(&operand)? {
                    0 => Ok(LookupSql::new("ARRAY_LENGTH({field}, 1) IS NULL", vec![])),
                    n => {
                        let param = i32::try_from(n)
                            .map(PgValue::Integer)
                            .unwrap_or(PgValue::BigInt(n));
                        Ok(LookupSql::new("{value} = ARRAY_LENGTH({field}, 1)", vec![param]))
                    }
                }
            }
            other => Err(CodecError::unsupported_lookup(self.kind().name(), other.name())),
        }
    }

    fn type_definition(&self) -> Option<&dyn TypeDefinition> {
        self.of.type_definition()
    }

    fn register_wire_adapters(&self, registry: &AdapterRegistry) {
        self.of.register_wire_adapters(registry);
    }

    fn describe(&self) -> FieldDescription {
        let of = self.of.describe();
        let mut description =
            FieldDescription::new(FieldKind::Array, format!("{}[]", of.type_name), &self.options);
        description.of = Some(Box::new(of));
        description
    }
}
