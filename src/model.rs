//! Model declarations and records
//!
//! A [`Model`] is a table name plus an ordered list of columns, each backed
//! by a [`Field`]. A [`Record`] holds one row's application values; every
//! assignment goes through the column's coercion immediately.

use crate::errors::PgFieldsError;
use field_codec::{Connection, Field, FieldDescription, FieldRef, PgValue, ScalarField};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use type_mapping::{pg_value_to_json, quote_ident, validate_quoted_identifier};

/// Name of the implicit serial primary key
pub const AUTO_ID_COLUMN: &str = "id";

/// One declared column
#[derive(Debug, Clone)]
pub struct Column {
    name: String,
    field: FieldRef,
}

impl Column {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field(&self) -> &FieldRef {
        &self.field
    }
}

/// Model declaration before validation
pub struct ModelBuilder {
    table: String,
    columns: Vec<Column>,
}

impl ModelBuilder {
    pub fn field(self, name: impl Into<String>, field: impl Field + 'static) -> Self {
        self.field_ref(name, Arc::new(field))
    }

    pub fn field_ref(mut self, name: impl Into<String>, field: FieldRef) -> Self {
        self.columns.push(Column {
            name: name.into(),
            field,
        });
        self
    }

    /// Validate names and field declarations.
    ///
    /// Without an explicit primary key, a serial `id` column is added first.
    pub fn build(self) -> Result<Arc<Model>, PgFieldsError> {
        validate_quoted_identifier(&self.table)?;

        let mut seen = HashSet::new();
        for column in &self.columns {
            validate_quoted_identifier(&column.name)?;
            if !seen.insert(column.name.as_str()) {
                return Err(PgFieldsError::InvalidModel(format!(
                    "Column '{}' declared more than once on '{}'",
                    column.name, self.table
                )));
            }
            column.field.check()?;
        }

        let has_id_column = seen.contains(AUTO_ID_COLUMN);
        let mut columns = self.columns;
        let auto_id = !columns.iter().any(|c| c.field.options().primary_key);
        if auto_id {
            if has_id_column {
                return Err(PgFieldsError::InvalidModel(format!(
                    "Column '{}' on '{}' needs primary_key when no other primary key is declared",
                    AUTO_ID_COLUMN, self.table
                )));
            }
            let id: FieldRef = Arc::new(ScalarField::integer().primary_key(true));
            columns.insert(
                0,
                Column {
                    name: AUTO_ID_COLUMN.to_string(),
                    field: id,
                },
            );
        }

        crate::debug_log!("Declared model '{}' with {} columns", self.table, columns.len());

        Ok(Arc::new(Model {
            table: self.table,
            columns,
            auto_id,
        }))
    }
}

/// A validated table declaration
#[derive(Debug)]
pub struct Model {
    table: String,
    columns: Vec<Column>,
    auto_id: bool,
}

/// Serializable shape of a model, one description per column
#[derive(Debug, Clone, Serialize)]
pub struct ModelDescription {
    pub table: String,
    pub columns: Vec<(String, FieldDescription)>,
}

impl Model {
    pub fn builder(table: impl Into<String>) -> ModelBuilder {
        ModelBuilder {
            table: table.into(),
            columns: Vec::new(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Whether the primary key is the implicit serial `id`
    pub fn has_auto_id(&self) -> bool {
        self.auto_id
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == column)
    }

    pub fn field(&self, column: &str) -> Result<&FieldRef, PgFieldsError> {
        self.columns
            .iter()
            .find(|c| c.name == column)
            .map(|c| &c.field)
            .ok_or_else(|| PgFieldsError::UnknownColumn {
                model: self.table.clone(),
                column: column.to_string(),
            })
    }

    pub(crate) fn is_auto_id(&self, idx: usize) -> bool {
        self.auto_id && idx == 0
    }

    fn column_sql(&self, idx: usize, column: &Column, conn: &dyn Connection) -> String {
        let name = quote_ident(&column.name);
        if self.is_auto_id(idx) {
            return format!("{} serial PRIMARY KEY", name);
        }

        let options = column.field.options();
        let mut sql = format!("{} {}", name, column.field.backing_type(conn));
        if options.primary_key {
            sql.push_str(" PRIMARY KEY");
        } else {
            sql.push_str(if options.null { " NULL" } else { " NOT NULL" });
            if options.unique {
                sql.push_str(" UNIQUE");
            }
        }
        if let Some(table) = column.field.references() {
            sql.push_str(&format!(" REFERENCES {}", quote_ident(table)));
        }
        sql
    }

    /// `CREATE TABLE IF NOT EXISTS` statement for this model
    pub fn create_table_sql(&self, conn: &dyn Connection) -> String {
        let columns = self
            .columns
            .iter()
            .enumerate()
            .map(|(idx, column)| format!("    {}", self.column_sql(idx, column, conn)))
            .collect::<Vec<_>>()
            .join(",\n");
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n{}\n)",
            quote_ident(&self.table),
            columns
        )
    }

    pub fn drop_table_sql(&self) -> String {
        format!("DROP TABLE IF EXISTS {} CASCADE", quote_ident(&self.table))
    }

    /// Column list casting every column to text, the form records are read in
    pub(crate) fn select_list(&self) -> String {
        self.columns
            .iter()
            .map(|c| format!("{}::text", quote_ident(&c.name)))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn describe(&self) -> ModelDescription {
        ModelDescription {
            table: self.table.clone(),
            columns: self
                .columns
                .iter()
                .map(|c| (c.name.clone(), c.field.describe()))
                .collect(),
        }
    }

    /// A record with every column at its default
    pub fn new_record(self: &Arc<Self>) -> Record {
        let values = self
            .columns
            .iter()
            .enumerate()
            .map(|(idx, c)| {
                if self.is_auto_id(idx) {
                    PgValue::Null
                } else {
                    c.field.default_value()
                }
            })
            .collect();
        Record {
            model: Arc::clone(self),
            values,
        }
    }

    /// A record with the given columns assigned and the rest defaulted
    pub fn record<K, V>(
        self: &Arc<Self>,
        values: impl IntoIterator<Item = (K, V)>,
    ) -> Result<Record, PgFieldsError>
    where
        K: AsRef<str>,
        V: Into<PgValue>,
    {
        let mut record = self.new_record();
        for (column, value) in values {
            record.set(column.as_ref(), value)?;
        }
        Ok(record)
    }
}

/// One row of a model
#[derive(Debug, Clone)]
pub struct Record {
    model: Arc<Model>,
    values: Vec<PgValue>,
}

impl Record {
    pub(crate) fn from_values(model: Arc<Model>, values: Vec<PgValue>) -> Self {
        Self { model, values }
    }

    pub fn model(&self) -> &Arc<Model> {
        &self.model
    }

    pub fn get(&self, column: &str) -> Option<&PgValue> {
        self.model.position(column).map(|idx| &self.values[idx])
    }

    /// Assign a column, coercing through its field
    pub fn set(&mut self, column: &str, value: impl Into<PgValue>) -> Result<(), PgFieldsError> {
        let idx = self
            .model
            .position(column)
            .ok_or_else(|| PgFieldsError::UnknownColumn {
                model: self.model.table.clone(),
                column: column.to_string(),
            })?;
        let coerced = self.model.columns[idx].field.to_native(value.into())?;
        self.values[idx] = coerced;
        Ok(())
    }

    /// Primary key of a saved record with an implicit `id`
    pub fn id(&self) -> Option<i64> {
        if !self.model.auto_id {
            return None;
        }
        self.values.first().and_then(PgValue::as_i64)
    }

    pub fn values(&self) -> &[PgValue] {
        &self.values
    }

    pub(crate) fn values_mut(&mut self) -> &mut [PgValue] {
        &mut self.values
    }

    /// Iterate `(column, value)` pairs in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PgValue)> {
        self.model
            .columns
            .iter()
            .map(|c| c.name.as_str())
            .zip(self.values.iter())
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.iter()
                .map(|(name, value)| (name.to_string(), pg_value_to_json(value)))
                .collect(),
        )
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.model.table == other.model.table && self.values == other.values
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.model.table)?;
        for (i, (name, value)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", name, value)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StubConnection;
    use field_codec::{ArrayField, CompositeField, CompositeType, JsonField, RelationField, UuidField};

    fn monarch() -> Arc<CompositeType> {
        CompositeType::builder("Monarch")
            .field("title", ScalarField::text())
            .field("name", ScalarField::text())
            .field("suffix", ScalarField::integer().with_default(0))
            .build()
            .unwrap()
    }

    fn kingdom() -> Arc<Model> {
        Model::builder("kingdom")
            .field("name", ScalarField::varchar(50))
            .field("monarch", CompositeField::new(monarch()))
            .field("residents", ArrayField::new(ScalarField::text()))
            .field("annals", JsonField::new())
            .field("seal", UuidField::new().auto_add(true))
            .build()
            .unwrap()
    }

    #[test]
    fn test_create_table_sql() {
        let conn = StubConnection::new();
        assert_eq!(
            kingdom().create_table_sql(&conn),
            "CREATE TABLE IF NOT EXISTS \"kingdom\" (\n    \
             \"id\" serial PRIMARY KEY,\n    \
             \"name\" varchar(50) NOT NULL,\n    \
             \"monarch\" monarch NULL,\n    \
             \"residents\" text[] NULL,\n    \
             \"annals\" json NULL,\n    \
             \"seal\" uuid NOT NULL UNIQUE\n)"
        );
    }

    #[test]
    fn test_explicit_primary_key_and_references() {
        let conn = StubConnection::new();
        let model = Model::builder("city")
            .field("code", UuidField::new().primary_key(true))
            .field("kingdom", RelationField::foreign_key("kingdom"))
            .build()
            .unwrap();
        assert!(!model.has_auto_id());
        assert_eq!(model.column_names(), vec!["code", "kingdom"]);
        let sql = model.create_table_sql(&conn);
        assert!(sql.contains("\"code\" uuid PRIMARY KEY"));
        assert!(sql.contains("\"kingdom\" integer NOT NULL REFERENCES \"kingdom\""));
    }

    #[test]
    fn test_invalid_models_rejected() {
        assert!(matches!(
            Model::builder("bad-name").field("a", ScalarField::text()).build(),
            Err(PgFieldsError::InvalidModel(_))
        ));
        assert!(matches!(
            Model::builder("t").field("id", ScalarField::integer()).build(),
            Err(PgFieldsError::InvalidModel(_))
        ));
        assert!(Model::builder("t")
            .field("a", ScalarField::text())
            .field("a", ScalarField::integer())
            .build()
            .is_err());
        assert!(matches!(
            Model::builder("t").field("token", UuidField::new().blank(true)).build(),
            Err(PgFieldsError::Codec(_))
        ));
    }

    #[test]
    fn test_keyword_names_are_quoted() {
        let conn = StubConnection::new();
        let model = Model::builder("order")
            .field("when", ScalarField::text())
            .field("user", ScalarField::integer().null(true))
            .build()
            .unwrap();
        assert_eq!(model.column_names(), vec!["id", "when", "user"]);
        assert_eq!(
            model.create_table_sql(&conn),
            "CREATE TABLE IF NOT EXISTS \"order\" (\n    \"id\" serial PRIMARY KEY,\n    \"when\" text NOT NULL,\n    \"user\" integer NULL\n)"
        );
    }

    #[test]
    fn test_record_assignment_coerces() {
        let model = kingdom();
        let mut record = model.new_record();
        assert_eq!(record.get("residents"), Some(&PgValue::Array(vec![])));
        assert_eq!(record.get("name"), Some(&PgValue::Text(String::new())));
        assert_eq!(record.id(), None);

        record
            .set("monarch", vec![PgValue::from("King"), "Elessar".into(), "2".into()])
            .unwrap();
        let monarch = record.get("monarch").and_then(PgValue::as_composite).unwrap();
        assert_eq!(monarch.get("suffix"), Some(&PgValue::Integer(2)));

        record.set("annals", "[1, 2]").unwrap();
        assert_eq!(record.get("annals"), Some(&PgValue::Json(serde_json::json!([1, 2]))));

        assert!(matches!(
            record.set("seal", "not-a-uuid"),
            Err(PgFieldsError::Codec(_))
        ));
        assert!(matches!(
            record.set("realm", "Gondor"),
            Err(PgFieldsError::UnknownColumn { .. })
        ));
    }

    #[test]
    fn test_record_builder_and_json() {
        let model = kingdom();
        let record = model
            .record([("name", PgValue::from("Gondor")), ("residents", vec!["Beregond"].into())])
            .unwrap();
        let json = record.to_json();
        assert_eq!(json["name"], "Gondor");
        assert_eq!(json["residents"], serde_json::json!(["Beregond"]));
        assert_eq!(json["monarch"]["suffix"], 0);
    }

    #[test]
    fn test_describe_model() {
        let description = kingdom().describe();
        assert_eq!(description.table, "kingdom");
        assert_eq!(description.columns[0].0, "id");
        let json = serde_json::to_value(&description).unwrap();
        assert_eq!(json["columns"][2][1]["kind"], "composite");
    }
}
