//! Timestamp columns
//!
//! Besides timestamps and their text forms, integers and floats are taken
//! as UNIX timestamps in seconds.

use super::{Field, FieldDescription, FieldKind, FieldOptions};
use crate::connection::Connection;
use crate::errors::CodecError;
use crate::lookup::{comparison, Lookup, LookupSql};
use chrono::{DateTime, NaiveDateTime, Utc};
use type_mapping::PgValue;

/// PostgreSQL's default `timestamptz` output, e.g. `2013-03-25 14:00:00+00`
const PG_TIMESTAMPTZ_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f%#z";
const PG_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

#[derive(Debug, Clone)]
pub struct DateTimeField {
    options: FieldOptions,
}

impl Default for DateTimeField {
    fn default() -> Self {
        Self::new()
    }
}

impl DateTimeField {
    pub fn new() -> Self {
        Self {
            options: FieldOptions::default(),
        }
    }

    field_options!();
}

impl Field for DateTimeField {
    fn kind(&self) -> FieldKind {
        FieldKind::DateTime
    }

    fn options(&self) -> &FieldOptions {
        &self.options
    }

    fn backing_type(&self, _conn: &dyn Connection) -> String {
        "timestamp with time zone".to_string()
    }

    fn to_native(&self, value: PgValue) -> Result<PgValue, CodecError> {
        if let Some(seconds) = value.as_i64() {
            return from_unix(seconds, 0).map(PgValue::Timestamp);
        }
        match value {
            PgValue::Null => Ok(PgValue::Null),
            PgValue::Timestamp(ts) => Ok(PgValue::Timestamp(ts)),
            PgValue::Float(seconds) if seconds.is_finite() => {
                let whole = seconds.floor();
                let nanos = ((seconds - whole) * 1_000_000_000.0).round() as u32;
                from_unix(whole as i64, nanos.min(999_999_999)).map(PgValue::Timestamp)
            }
            PgValue::Text(text) => parse_timestamp(&text).map(PgValue::Timestamp),
            other => Err(CodecError::mismatch("timestamp", &other)),
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
        FieldDescription::new(FieldKind::DateTime, "timestamp with time zone", &self.options)
    }
}

fn from_unix(seconds: i64, nanos: u32) -> Result<DateTime<Utc>, CodecError> {
    DateTime::from_timestamp(seconds, nanos).ok_or_else(|| {
        CodecError::TypeMismatch(format!("UNIX timestamp {} is out of range", seconds))
    })
}

fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, CodecError> {
    let text = text.trim();
    if let Ok(seconds) = text.parse::<i64>() {
        return from_unix(seconds, 0);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_str(text, PG_TIMESTAMPTZ_FORMAT) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, PG_TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| CodecError::invalid_text("timestamp", text, e))
}
