use thiserror::Error;
use type_mapping::{PgValue, TextFormatError, ValidationError};

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Unsupported lookup type for {field_kind} field: {lookup}")]
    UnsupportedLookup {
        field_kind: &'static str,
        lookup: String,
    },

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Missing value: {0}")]
    MissingValue(String),

    #[error("Unrecognized key for {type_name}: {field}")]
    UnknownField { type_name: String, field: String },

    #[error("Invalid {type_name} text '{text}': {reason}")]
    InvalidText {
        type_name: String,
        text: String,
        reason: String,
    },

    #[error("No wire adapter registered for {0}")]
    NoAdapter(String),

    #[error("Type already exists: {0}")]
    DuplicateType(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CodecError {
    pub fn unsupported_lookup(field_kind: &'static str, lookup: impl Into<String>) -> Self {
        Self::UnsupportedLookup {
            field_kind,
            lookup: lookup.into(),
        }
    }

    /// Value of the wrong kind for a field
    pub fn mismatch(expected: &str, value: &PgValue) -> Self {
        Self::TypeMismatch(format!(
            "Expected value of type {}; got {}",
            expected,
            value.kind_name()
        ))
    }

    pub fn invalid_text(type_name: &str, text: &str, reason: impl std::fmt::Display) -> Self {
        Self::InvalidText {
            type_name: type_name.to_string(),
            text: text.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn from_text_format(type_name: &str, text: &str, err: TextFormatError) -> Self {
        Self::invalid_text(type_name, text, err)
    }
}

impl From<ValidationError> for CodecError {
    fn from(err: ValidationError) -> Self {
        Self::Configuration(err.to_string())
    }
}
