//! Value model and wire-text helpers shared by the pgfields crates
//!
//! This crate holds the dynamic [`PgValue`] used on both sides of the codec
//! layer, SQL literal quoting, the PostgreSQL text-format tokenizers used by
//! casters, and identifier validation.

pub mod serialize;
pub mod sql;
pub mod text;
pub mod types;
pub mod validate;

pub use serialize::{json_to_pg_value, pg_value_to_json, serialize_to_pg_record};
pub use sql::{quote_ident, quote_literal, render_scalar_literal};
pub use text::{split_array_text, split_record_text, TextFormatError};
pub use types::{CompositeInstance, PgValue};
pub use validate::{validate_identifier, validate_quoted_identifier, ValidationError};
