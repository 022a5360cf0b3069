//! Record store
//!
//! Reads and writes [`Record`]s of one [`Model`]. Values travel as SQL
//! literals rendered by the connection's wire adapters; every column is read
//! back as text and parsed by its field.

use crate::errors::PgFieldsError;
use crate::model::{Model, Record};
use crate::query::{where_clause, Filter};
use field_codec::{CodecError, Connection, PgValue, Row};
use std::sync::Arc;
use type_mapping::quote_ident;

#[derive(Clone)]
pub struct ModelStore {
    model: Arc<Model>,
    conn: Arc<dyn Connection>,
}

impl std::fmt::Debug for ModelStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelStore")
            .field("table", &self.model.table())
            .finish()
    }
}

impl ModelStore {
    pub fn new(model: Arc<Model>, conn: Arc<dyn Connection>) -> Self {
        Self { model, conn }
    }

    pub fn model(&self) -> &Arc<Model> {
        &self.model
    }

    /// Insert a record.
    ///
    /// Runs each field's pre-save hook first (values it generates are
    /// written back into `record`), then refreshes `record` from the
    /// inserted row.
    pub async fn create(&self, record: &mut Record) -> Result<(), PgFieldsError> {
        if record.model().table() != self.model.table() {
            return Err(PgFieldsError::InvalidModel(format!(
                "Cannot store a '{}' record in '{}'",
                record.model().table(),
                self.model.table()
            )));
        }

        let conn = self.conn.as_ref();
        let mut columns = Vec::new();
        let mut literals = Vec::new();

        for (idx, column) in self.model.columns().iter().enumerate() {
            if self.model.is_auto_id(idx) && record.values()[idx].is_null() {
                continue;
            }
            let field = column.field();
            if let Some(generated) = field.pre_save(&record.values()[idx], true) {
                record.values_mut()[idx] = generated;
            }

            let wire = field.to_wire(record.values()[idx].clone())?;
            let literal = if wire.is_null() {
                "NULL".to_string()
            } else {
                format!(
                    "{}::{}",
                    conn.adapters().render(&wire)?,
                    field.backing_type(conn)
                )
            };
            columns.push(quote_ident(column.name()));
            literals.push(literal);
        }

        let sql = if columns.is_empty() {
            format!(
                "INSERT INTO {} DEFAULT VALUES RETURNING {}",
                quote_ident(self.model.table()),
                self.model.select_list()
            )
        } else {
            format!(
                "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
                quote_ident(self.model.table()),
                columns.join(", "),
                literals.join(", "),
                self.model.select_list()
            )
        };
        crate::debug_log!("Inserting into '{}': {}", self.model.table(), sql);

        let row = conn
            .fetch_all(&sql)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| PgFieldsError::RecordNotFound(self.model.table().to_string()))?;
        *record = self.record_from_row(row)?;
        Ok(())
    }

    /// Every record matching all filters, in primary key order
    pub async fn filter(&self, filters: &[Filter]) -> Result<Vec<Record>, PgFieldsError> {
        let conn = self.conn.as_ref();
        let mut sql = format!(
            "SELECT {} FROM {}{}",
            self.model.select_list(),
            quote_ident(self.model.table()),
            where_clause(&self.model, filters, conn)?
        );
        if let Some(first) = self.model.columns().first() {
            sql.push_str(&format!(" ORDER BY {}", quote_ident(first.name())));
        }

        conn.fetch_all(&sql)
            .await?
            .into_iter()
            .map(|row| self.record_from_row(row))
            .collect()
    }

    pub async fn all(&self) -> Result<Vec<Record>, PgFieldsError> {
        self.filter(&[]).await
    }

    /// The single record matching all filters
    pub async fn get(&self, filters: &[Filter]) -> Result<Record, PgFieldsError> {
        let mut records = self.filter(filters).await?;
        match records.len() {
            0 => Err(PgFieldsError::RecordNotFound(self.model.table().to_string())),
            1 => Ok(records.remove(0)),
            count => Err(PgFieldsError::MultipleRecords {
                model: self.model.table().to_string(),
                count,
            }),
        }
    }

    pub async fn count(&self, filters: &[Filter]) -> Result<u64, PgFieldsError> {
        let conn = self.conn.as_ref();
        let sql = format!(
            "SELECT COUNT(*)::text FROM {}{}",
            quote_ident(self.model.table()),
            where_clause(&self.model, filters, conn)?
        );
        let text = conn
            .fetch_all(&sql)
            .await?
            .into_iter()
            .next()
            .and_then(|row| row.into_iter().next().flatten())
            .ok_or_else(|| CodecError::invalid_text("bigint", "", "COUNT(*) returned no value"))?;
        let count = text
            .trim()
            .parse::<u64>()
            .map_err(|e| CodecError::invalid_text("bigint", &text, e))?;
        Ok(count)
    }

    /// Delete every record matching all filters, returning how many went
    pub async fn delete(&self, filters: &[Filter]) -> Result<u64, PgFieldsError> {
        let conn = self.conn.as_ref();
        let sql = format!(
            "DELETE FROM {}{}",
            quote_ident(self.model.table()),
            where_clause(&self.model, filters, conn)?
        );
        Ok(conn.execute(&sql).await?)
    }

    fn record_from_row(&self, row: Row) -> Result<Record, PgFieldsError> {
        let columns = self.model.columns();
        if row.len() != columns.len() {
            return Err(PgFieldsError::InvalidModel(format!(
                "Row for '{}' has {} columns, expected {}",
                self.model.table(),
                row.len(),
                columns.len()
            )));
        }
        let values = row
            .iter()
            .zip(columns)
            .map(|(cell, column)| column.field().from_text(cell.as_deref()))
            .collect::<Result<Vec<PgValue>, _>>()?;
        Ok(Record::from_values(Arc::clone(&self.model), values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StubConnection;
    use field_codec::{ArrayField, CompositeField, CompositeType, Field, ScalarField, UuidField};

    fn monarch_field() -> CompositeField {
        CompositeField::new(
            CompositeType::builder("Monarch")
                .field("title", ScalarField::text())
                .field("name", ScalarField::text())
                .field("suffix", ScalarField::integer().with_default(0))
                .build()
                .unwrap(),
        )
    }

    fn setup() -> (Arc<StubConnection>, ModelStore) {
        let model = Model::builder("kingdom")
            .field("token", UuidField::new().auto_add(true))
            .field("monarch", monarch_field())
            .field("residents", ArrayField::new(ScalarField::text()))
            .build()
            .unwrap();
        let conn = Arc::new(StubConnection::new());
        for column in model.columns() {
            column.field().register_wire_adapters(conn.adapters());
        }
        let store = ModelStore::new(model, conn.clone());
        (conn, store)
    }

    #[tokio::test]
    async fn test_create_generates_uuid_and_reads_back() {
        let (conn, store) = setup();
        let mut record = store
            .model()
            .record([
                ("monarch", PgValue::from(vec!["King", "Elessar"])),
                ("residents", vec!["Frodo", "Sam"].into()),
            ])
            .unwrap();

        conn.push_result(vec![vec![
            Some("1"),
            Some("5f0c3c8e-4d7b-4a35-9f0e-0c9d1d1e2f3a"),
            Some("(King,Elessar,0)"),
            Some("{Frodo,Sam}"),
        ]]);
        store.create(&mut record).await.unwrap();

        let insert = &conn.statements()[0];
        assert!(insert.starts_with("INSERT INTO \"kingdom\" (\"token\", \"monarch\", \"residents\") VALUES ('"));
        assert!(insert.contains("'::uuid, ROW('King', 'Elessar', 0)::\"monarch\"::monarch, ARRAY['Frodo', 'Sam']::text[])"));
        assert!(insert.ends_with("RETURNING \"id\"::text, \"token\"::text, \"monarch\"::text, \"residents\"::text"));

        assert_eq!(record.id(), Some(1));
        assert!(matches!(record.get("token"), Some(PgValue::Uuid(_))));
        assert_eq!(
            record.get("residents"),
            Some(&PgValue::from(vec!["Frodo", "Sam"]))
        );
    }

    #[tokio::test]
    async fn test_empty_array_is_written_as_empty_literal() {
        let (conn, store) = setup();
        let mut record = store.model().new_record();
        conn.push_result(vec![vec![Some("2"), Some("5f0c3c8e-4d7b-4a35-9f0e-0c9d1d1e2f3a"), None, Some("{}")]]);
        store.create(&mut record).await.unwrap();
        assert!(conn.statements()[0].contains("'{}'::text[]"));
        assert_eq!(record.get("residents"), Some(&PgValue::Array(vec![])));
    }

    #[tokio::test]
    async fn test_filter_renders_lookups() {
        let (conn, store) = setup();
        conn.push_result(vec![]);
        let records = store
            .filter(&[
                Filter::exact("monarch", vec![PgValue::from("King"), "Théoden".into(), PgValue::Integer(2)]),
                Filter::new("residents", "contains", "Éowyn"),
            ])
            .await
            .unwrap();
        assert!(records.is_empty());
        assert_eq!(
            conn.statements()[0],
            "SELECT \"id\"::text, \"token\"::text, \"monarch\"::text, \"residents\"::text \
             FROM \"kingdom\" WHERE \"monarch\" = ROW('King', 'Théoden', 2)::\"monarch\" \
             AND 'Éowyn' = ANY(\"residents\"::text[]) ORDER BY \"id\""
        );
    }

    #[tokio::test]
    async fn test_get_requires_exactly_one() {
        let (conn, store) = setup();
        conn.push_result(vec![]);
        assert!(matches!(
            store.get(&[]).await,
            Err(PgFieldsError::RecordNotFound(_))
        ));

        let row = vec![Some("1"), Some("5f0c3c8e-4d7b-4a35-9f0e-0c9d1d1e2f3a"), None, None];
        conn.push_result(vec![row.clone(), row]);
        assert!(matches!(
            store.get(&[]).await,
            Err(PgFieldsError::MultipleRecords { count: 2, .. })
        ));
    }

    #[tokio::test]
    async fn test_count_and_delete() {
        let (conn, store) = setup();
        conn.push_result(vec![vec![Some("3")]]);
        assert_eq!(store.count(&[Filter::new("residents", "len", 0)]).await.unwrap(), 3);
        assert_eq!(
            conn.statements()[0],
            "SELECT COUNT(*)::text FROM \"kingdom\" WHERE ARRAY_LENGTH(\"residents\", 1) IS NULL"
        );

        assert_eq!(store.delete(&[]).await.unwrap(), 1);
        assert_eq!(conn.statements()[1], "DELETE FROM \"kingdom\"");
    }

    #[tokio::test]
    async fn test_count_rejects_bad_result() {
        let (conn, store) = setup();
        conn.push_result(vec![vec![Some("many")]]);
        assert!(matches!(
            store.count(&[]).await,
            Err(PgFieldsError::Codec(CodecError::InvalidText { .. }))
        ));
        conn.push_result(vec![]);
        assert!(matches!(
            store.count(&[]).await,
            Err(PgFieldsError::Codec(CodecError::InvalidText { .. }))
        ));
    }
}
