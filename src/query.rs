//! Record filters
//!
//! A [`Filter`] names a column, a lookup and an operand. The column's field
//! translates it into an SQL fragment; the operands are rendered inline as
//! literals by the connection's wire adapters.

use crate::errors::PgFieldsError;
use crate::model::Model;
use field_codec::{Connection, Lookup, PgValue};
use type_mapping::quote_ident;

/// Separator between column and lookup in `column__lookup` filter keys
pub const LOOKUP_SEPARATOR: &str = "__";

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub lookup: Lookup,
    pub operand: PgValue,
}

impl Filter {
    pub fn new(column: impl Into<String>, lookup: &str, operand: impl Into<PgValue>) -> Self {
        Self {
            column: column.into(),
            lookup: Lookup::parse(lookup),
            operand: operand.into(),
        }
    }

    pub fn exact(column: impl Into<String>, operand: impl Into<PgValue>) -> Self {
        Self::new(column, "exact", operand)
    }

    /// Parse a `column__lookup` key; a bare column means `exact`
    pub fn parse(key: &str, operand: impl Into<PgValue>) -> Self {
        match key.rsplit_once(LOOKUP_SEPARATOR) {
            Some((column, lookup)) => Self::new(column, lookup, operand),
            None => Self::exact(key, operand),
        }
    }

    /// SQL condition for this filter against `model`
    pub fn to_sql(&self, model: &Model, conn: &dyn Connection) -> Result<String, PgFieldsError> {
        let field = model.field(&self.column)?;
        let translated = field.translate_lookup(&self.lookup, self.operand.clone(), conn)?;
        crate::trace_log!(
            "Filter {}__{} -> {}",
            self.column,
            self.lookup,
            translated.template
        );
        Ok(translated.render_inline(&quote_ident(&self.column), conn.adapters())?)
    }
}

/// `WHERE` clause joining every filter with `AND`; empty without filters
pub fn where_clause(
    model: &Model,
    filters: &[Filter],
    conn: &dyn Connection,
) -> Result<String, PgFieldsError> {
    if filters.is_empty() {
        return Ok(String::new());
    }
    let conditions = filters
        .iter()
        .map(|filter| filter.to_sql(model, conn))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(format!(" WHERE {}", conditions.join(" AND ")))
}
