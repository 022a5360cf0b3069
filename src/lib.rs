//! # pgfields
//!
//! PostgreSQL-specific field types for a model layer: arrays, composite
//! types, JSON and UUID. Each field knows its column DDL, how to coerce and
//! send values, how to read them back from the server, and which lookups it
//! can translate into SQL.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pgfields::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let mut pg = PgFields::from_config(config).await?;
//!
//!     let monarch = CompositeType::builder("Monarch")
//!         .field("title", ScalarField::text())
//!         .field("name", ScalarField::text())
//!         .field("suffix", ScalarField::integer())
//!         .build()?;
//!
//!     let kingdom = Model::builder("kingdom")
//!         .field("monarch", CompositeField::new(monarch))
//!         .field("residents", ArrayField::new(ScalarField::text()))
//!         .build()?;
//!
//!     let store = pg.register_model(kingdom).await?;
//!
//!     let mut record = store.model().record([
//!         ("monarch", PgValue::from(vec![PgValue::from("King"), "Elessar".into(), PgValue::Integer(2)])),
//!         ("residents", vec!["Frodo", "Sam"].into()),
//!     ])?;
//!     store.create(&mut record).await?;
//!
//!     let found = store.filter(&[Filter::new("residents", "contains", "Sam")]).await?;
//!     println!("Found {} kingdoms", found.len());
//!
//!     Ok(())
//! }
//! ```

/// Conditional debug logging macros
/// These macros only compile in code when the `debug-logging` feature is enabled
#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

pub mod core;
pub mod errors;
pub mod migration;
pub mod model;
pub mod prelude;
pub mod query;
pub mod store;

#[cfg(test)]
mod test_support;

// Re-export the main public types for convenience
pub use crate::core::PgFields;
pub use errors::PgFieldsError;
pub use model::{Model, ModelBuilder, Record};
pub use query::Filter;
pub use store::ModelStore;

// Re-export centralized config
pub use config::{AppConfig, DatabaseConfig, FieldsConfig};

// Re-export internal crates used in the public API
pub use field_codec;
pub use type_mapping;

// Re-export external dependencies used in public API
pub use async_trait;
pub use sqlx;
