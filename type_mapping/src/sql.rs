//! SQL literal utilities
//!
//! Rendering of plain values into SQL text. Values that need type-specific
//! adapters (UUIDs, composite rows, arrays) are rendered by the adapter
//! registry in `field-codec`, which falls back to [`render_scalar_literal`].

use crate::types::PgValue;

/// Quote a string as an SQL literal.
///
/// Single quotes are doubled. Text holding a backslash is emitted as an
/// escape string (`E'...'`) with the backslash doubled, so the literal reads
/// the same regardless of `standard_conforming_strings`.
pub fn quote_literal(value: &str) -> String {
    let escaped = value.replace('\'', "''");
    if escaped.contains('\\') {
        format!("E'{}'", escaped.replace('\\', "\\\\"))
    } else {
        format!("'{}'", escaped)
    }
}

/// Quote an identifier (table, column or type name)
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Render a scalar value as an SQL literal.
///
/// Returns `None` for variants that have no fixed rendering (UUID, arrays,
/// composite instances and name/value records).
pub fn render_scalar_literal(value: &PgValue) -> Option<String> {
    let literal = match value {
        PgValue::Null => "NULL".to_string(),
        PgValue::Boolean(true) => "TRUE".to_string(),
        PgValue::Boolean(false) => "FALSE".to_string(),
        PgValue::SmallInt(i) => i.to_string(),
        PgValue::Integer(i) => i.to_string(),
        PgValue::BigInt(i) => i.to_string(),
        PgValue::Float(f) => {
            if f.is_finite() {
                let text = f.to_string();
                // keep the literal numeric rather than integer-typed
                if text.contains('.') || text.contains('e') {
                    text
                } else {
                    format!("{}.0", text)
                }
            } else if f.is_nan() {
                "'NaN'::double precision".to_string()
            } else if *f > 0.0 {
                "'Infinity'::double precision".to_string()
            } else {
                "'-Infinity'::double precision".to_string()
            }
        }
        PgValue::Text(s) => quote_literal(s),
        PgValue::Timestamp(ts) => format!("{}::timestamptz", quote_literal(&ts.to_rfc3339())),
        PgValue::Json(json) => quote_literal(&json.to_string()),
        PgValue::Uuid(_) | PgValue::Array(_) | PgValue::Composite(_) | PgValue::Record(_) => {
            return None
        }
    };
    Some(literal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_literal_escapes_quotes_and_backslashes() {
        assert_eq!(quote_literal("King"), "'King'");
        assert_eq!(quote_literal("H'Elf"), "'H''Elf'");
        assert_eq!(quote_literal(r"C:\path"), r"E'C:\\path'");
        assert_eq!(quote_literal("Théoden 🐎"), "'Théoden 🐎'");
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("monarch"), "\"monarch\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_scalar_literals() {
        assert_eq!(render_scalar_literal(&PgValue::Null).as_deref(), Some("NULL"));
        assert_eq!(render_scalar_literal(&PgValue::Integer(5)).as_deref(), Some("5"));
        assert_eq!(render_scalar_literal(&PgValue::Float(2.0)).as_deref(), Some("2.0"));
        assert_eq!(render_scalar_literal(&PgValue::Boolean(true)).as_deref(), Some("TRUE"));
        assert_eq!(
            render_scalar_literal(&PgValue::Json(serde_json::json!({"a": 1}))).as_deref(),
            Some("'{\"a\":1}'")
        );
        assert!(render_scalar_literal(&PgValue::Uuid(uuid::Uuid::nil())).is_none());
        assert!(render_scalar_literal(&PgValue::Array(vec![])).is_none());
    }
}
