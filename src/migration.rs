//! Schema setup
//!
//! Brings the database in line with a [`Model`]: custom types first (so the
//! table's column types resolve), then wire adapters, then the table itself.

use crate::core::PgFields;
use crate::errors::PgFieldsError;
use crate::model::Model;
use field_codec::{materialize, Connection};

/// Create every custom type the model's fields need and install their wire
/// adapters on `conn`. Safe to run repeatedly and concurrently.
pub async fn setup_model(model: &Model, conn: &dyn Connection) -> Result<(), PgFieldsError> {
    for column in model.columns() {
        materialize(column.field().as_ref(), conn).await?;
    }
    crate::debug_log!("Fields of '{}' are ready", model.table());
    Ok(())
}

/// Set the model up and create its table.
/// If recreate is true, drops the existing table first
pub async fn migrate_model(
    model: &Model,
    conn: &dyn Connection,
    recreate: bool,
) -> Result<(), PgFieldsError> {
    setup_model(model, conn).await?;

    if recreate {
        let drop_sql = model.drop_table_sql();
        tracing::info!("Dropping table with SQL: {}", drop_sql);
        conn.execute(&drop_sql).await?;
    }

    let create_table_sql = model.create_table_sql(conn);
    tracing::info!("Creating table with SQL: {}", create_table_sql);
    conn.execute(&create_table_sql).await?;
    Ok(())
}

impl PgFields {
    /// Create the model's types and table on this instance's connection
    pub async fn auto_migrate(&self, model: &Model, recreate: bool) -> Result<(), PgFieldsError> {
        migrate_model(model, self.connection().as_ref(), recreate).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StubConnection;
    use field_codec::{AdapterKey, ArrayField, CompositeField, CompositeType, ScalarField, UuidField};

    fn castle() -> std::sync::Arc<Model> {
        let monarch = CompositeType::builder("Monarch")
            .field("title", ScalarField::text())
            .field("name", ScalarField::text())
            .build()
            .unwrap();
        Model::builder("castle")
            .field("token", UuidField::new().auto_add(true))
            .field("monarch", CompositeField::new(monarch))
            .field("guards", ArrayField::new(ScalarField::integer()))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_migrate_creates_types_before_table() {
        let conn = StubConnection::new();
        let model = castle();
        migrate_model(&model, &conn, true).await.unwrap();

        let statements = conn.statements();
        let create_type = statements
            .iter()
            .position(|s| s.starts_with("CREATE TYPE \"monarch\""))
            .unwrap();
        let drop = statements
            .iter()
            .position(|s| s == "DROP TABLE IF EXISTS \"castle\" CASCADE")
            .unwrap();
        let create_table = statements
            .iter()
            .position(|s| s.starts_with("CREATE TABLE IF NOT EXISTS \"castle\""))
            .unwrap();
        assert!(create_type < drop && drop < create_table);

        assert!(conn.adapters().is_registered(&AdapterKey::Uuid));
        assert!(conn
            .adapters()
            .is_registered(&AdapterKey::Composite("monarch".into())));
    }

    #[tokio::test]
    async fn test_migrate_without_recreate_keeps_table() {
        let conn = StubConnection::new();
        migrate_model(&castle(), &conn, false).await.unwrap();
        assert!(!conn.statements().iter().any(|s| s.starts_with("DROP TABLE")));
    }
}
