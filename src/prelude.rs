//! Convenience re-exports for common pgfields usage
//!
//! ```rust
//! use pgfields::prelude::*;
//! ```

// Core components
pub use crate::core::PgFields;
pub use crate::errors::PgFieldsError;
pub use crate::migration::{migrate_model, setup_model};
pub use crate::model::{Column, Model, ModelBuilder, Record};
pub use crate::query::Filter;
pub use crate::store::ModelStore;

// Re-export centralized config
pub use config::{AppConfig, DatabaseConfig, FieldsConfig};

// Field types and the connection contract
pub use field_codec::prelude::*;

// Common external dependencies
pub use anyhow;
pub use async_trait;
pub use sqlx;
pub use tokio;
pub use uuid::Uuid;
