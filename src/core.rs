//! Core PgFields functionality
//!
//! This module contains the main PgFields struct, which owns the database
//! connection and the registered models, handing out a [`ModelStore`] for
//! each.

use field_codec::{Connection, PgPoolConnection};
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::PgFieldsError;
use crate::model::Model;
use crate::store::ModelStore;
use config::{AppConfig, DatabaseConfig, FieldsConfig};

/// Main coordinator that manages the database connection and models
pub struct PgFields {
    pool: PgPool,
    connection: Arc<PgPoolConnection>,
    models: HashMap<String, Arc<Model>>,
    fields_config: FieldsConfig,
}

impl PgFields {
    /// Create new PgFields with database connection
    pub async fn new(config: DatabaseConfig) -> Result<Self, PgFieldsError> {
        Self::with_fields_config(config, FieldsConfig::default()).await
    }

    /// Create from a fully loaded application config
    pub async fn from_config(config: AppConfig) -> Result<Self, PgFieldsError> {
        config.validate()?;
        Self::with_fields_config(config.database, config.fields).await
    }

    async fn with_fields_config(
        config: DatabaseConfig,
        fields_config: FieldsConfig,
    ) -> Result<Self, PgFieldsError> {
        let connection_string = config.connection_string();

        let mut pool_options = sqlx::postgres::PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds));

        // Set max lifetime if specified
        if config.max_lifetime_seconds > 0 {
            pool_options =
                pool_options.max_lifetime(Duration::from_secs(config.max_lifetime_seconds));
        }

        let pool = pool_options.connect(&connection_string).await?;
        Self::from_pool(pool, fields_config).await
    }

    /// Wrap an existing pool
    pub async fn from_pool(pool: PgPool, fields_config: FieldsConfig) -> Result<Self, PgFieldsError> {
        let connection = Arc::new(PgPoolConnection::new(pool.clone()).await?);
        tracing::info!(
            "Connected to PostgreSQL (server_version_num {})",
            connection.server_version()
        );
        Ok(Self {
            pool,
            connection,
            models: HashMap::new(),
            fields_config,
        })
    }

    /// Get database pool reference
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// The connection every store and field setup runs on
    pub fn connection(&self) -> &Arc<PgPoolConnection> {
        &self.connection
    }

    pub fn fields_config(&self) -> &FieldsConfig {
        &self.fields_config
    }

    /// Register a model, creating its types and table when `auto_setup` is on
    pub async fn register_model(&mut self, model: Arc<Model>) -> Result<ModelStore, PgFieldsError> {
        let name = model.table().to_string();
        if self.models.contains_key(&name) {
            return Err(PgFieldsError::ModelAlreadyRegistered(name));
        }

        if self.fields_config.auto_setup {
            self.auto_migrate(&model, self.fields_config.recreate_tables)
                .await?;
        } else {
            // types are assumed to exist; adapters are still needed to write values
            for column in model.columns() {
                column
                    .field()
                    .register_wire_adapters(self.connection.adapters());
            }
        }

        self.models.insert(name.clone(), Arc::clone(&model));
        crate::debug_log!("Registered model '{}'", name);
        Ok(self.make_store(model))
    }

    /// Store for a registered model
    pub fn store(&self, name: &str) -> Result<ModelStore, PgFieldsError> {
        self.models
            .get(name)
            .map(|model| self.make_store(Arc::clone(model)))
            .ok_or_else(|| PgFieldsError::ModelNotFound(name.to_string()))
    }

    /// List all registered model names
    pub fn list_models(&self) -> Vec<&String> {
        self.models.keys().collect()
    }

    /// Forget a model; its table and types stay in the database
    pub fn unregister_model(&mut self, name: &str) -> Result<(), PgFieldsError> {
        self.models
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| PgFieldsError::ModelNotFound(name.to_string()))
    }

    /// Check database connection health
    pub async fn health_check(&self) -> Result<(), PgFieldsError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }

    fn make_store(&self, model: Arc<Model>) -> ModelStore {
        let conn: Arc<dyn Connection> = self.connection.clone();
        ModelStore::new(model, conn)
    }
}
