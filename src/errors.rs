//! Error types for the pgfields crate
//!
//! This module contains all error types that can be returned by model
//! registration, schema setup and record store operations.

use config::ConfigError;
use field_codec::CodecError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PgFieldsError {
    #[error("Database connection error: {0}")]
    DatabaseConnection(#[from] sqlx::Error),

    #[error("Field error: {0}")]
    Codec(#[from] CodecError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid model declaration: {0}")]
    InvalidModel(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Model already registered: {0}")]
    ModelAlreadyRegistered(String),

    #[error("Unknown column '{column}' on model '{model}'")]
    UnknownColumn { model: String, column: String },

    #[error("No '{0}' record matches the given filters")]
    RecordNotFound(String),

    #[error("Expected one '{model}' record, found {count}")]
    MultipleRecords { model: String, count: usize },
}

impl From<type_mapping::ValidationError> for PgFieldsError {
    fn from(err: type_mapping::ValidationError) -> Self {
        Self::InvalidModel(err.to_string())
    }
}
