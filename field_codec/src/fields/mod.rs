//! Field contract
//!
//! A [`Field`] is one column's codec: backing SQL type, coercion to the
//! application value, wire serialization, text parsing and lookup
//! translation. Fields that need a catalog type of their own (composites,
//! and arrays of them) additionally expose a [`TypeDefinition`].

use crate::connection::Connection;
use crate::errors::CodecError;
use crate::lookup::{Lookup, LookupSql};
use crate::registry::AdapterRegistry;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use type_mapping::PgValue;

/// Builder setters shared by every field type.
///
/// `field_options!(fixed_null)` leaves out the `null` setter for fields that
/// are always nullable.
macro_rules! field_options {
    () => {
        pub fn null(mut self, null: bool) -> Self {
            self.options.null = null;
            self
        }

        field_options!(fixed_null);
    };
    (fixed_null) => {
        pub fn blank(mut self, blank: bool) -> Self {
            self.options.blank = blank;
            self
        }

        pub fn unique(mut self, unique: bool) -> Self {
            self.options.unique = unique;
            self
        }

        pub fn primary_key(mut self, primary_key: bool) -> Self {
            self.options.primary_key = primary_key;
            self
        }

        pub fn editable(mut self, editable: bool) -> Self {
            self.options.editable = editable;
            self
        }

        pub fn with_default(mut self, value: impl Into<type_mapping::PgValue>) -> Self {
            self.options.default = Some(value.into());
            self
        }
    };
}

mod array;
mod composite;
mod datetime;
mod json;
mod scalar;
mod uuid_field;


pub use array::ArrayField;
pub use composite::{CompositeField, CompositeType, CompositeTypeBuilder};
pub use datetime::DateTimeField;
pub use json::{JsonField, JsonKind};
pub use scalar::{RelationField, ScalarField, ScalarKind};
pub use uuid_field::{UuidField, UuidGenerator};

/// Shared handle to a field declaration
pub type FieldRef = Arc<dyn Field>;

static CREATION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Next value of the process-wide declaration counter
fn next_creation_counter() -> u64 {
    CREATION_COUNTER.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Scalar,
    Relation,
    Array,
    Composite,
    Json,
    Uuid,
    DateTime,
}

impl FieldKind {
    pub fn name(self) -> &'static str {
        match self {
            FieldKind::Scalar => "scalar",
            FieldKind::Relation => "relation",
            FieldKind::Array => "array",
            FieldKind::Composite => "composite",
            FieldKind::Json => "json",
            FieldKind::Uuid => "uuid",
            FieldKind::DateTime => "datetime",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Declaration-time options common to every field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldOptions {
    pub null: bool,
    pub blank: bool,
    pub unique: bool,
    pub primary_key: bool,
    pub editable: bool,
    pub default: Option<PgValue>,
    /// Position in declaration order across the whole process
    #[serde(skip)]
    pub creation_counter: u64,
}

impl Default for FieldOptions {
    fn default() -> Self {
        Self {
            null: false,
            blank: false,
            unique: false,
            primary_key: false,
            editable: true,
            default: None,
            creation_counter: next_creation_counter(),
        }
    }
}

/// Plain-data description of a field declaration, enough to rebuild an
/// equivalent field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescription {
    pub kind: FieldKind,
    /// Type name as declared, e.g. `integer`, `Monarch`, `uuid`
    pub type_name: String,
    pub options: FieldOptions,
    /// Element field of an array
    #[serde(skip_serializing_if = "Option::is_none")]
    pub of: Option<Box<FieldDescription>>,
    /// Sub-fields of a composite, in declaration order
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub fields: Vec<(String, FieldDescription)>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl FieldDescription {
    pub fn new(kind: FieldKind, type_name: impl Into<String>, options: &FieldOptions) -> Self {
        Self {
            kind,
            type_name: type_name.into(),
            options: options.clone(),
            of: None,
            fields: Vec::new(),
            extra: BTreeMap::new(),
        }
    }

    pub fn with_extra(mut self, key: &str, value: serde_json::Value) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }
}

/// One column's codec.
///
/// `to_native` must accept values it already produced, since callers may
/// coerce the same value more than once.
pub trait Field: Send + Sync + fmt::Debug {
    fn kind(&self) -> FieldKind;

    fn options(&self) -> &FieldOptions;

    /// SQL type the column is declared as
    fn backing_type(&self, conn: &dyn Connection) -> String;

    /// Coerce any accepted input into the application value
    fn to_native(&self, value: PgValue) -> Result<PgValue, CodecError>;

    fn describe(&self) -> FieldDescription;

    /// Validate the declaration itself
    fn check(&self) -> Result<(), CodecError> {
        Ok(())
    }

    fn default_value(&self) -> PgValue {
        self.options().default.clone().unwrap_or(PgValue::Null)
    }

    /// Application value to the value handed to the wire adapters
    fn to_wire(&self, value: PgValue) -> Result<PgValue, CodecError> {
        self.to_native(value)
    }

    /// Parse the server's text output for this column; `None` is SQL NULL
    fn from_text(&self, text: Option<&str>) -> Result<PgValue, CodecError> {
        match text {
            Some(text) => self.to_native(PgValue::Text(text.to_string())),
            None => Ok(PgValue::Null),
        }
    }

    /// Translate a named lookup into an SQL fragment; `exact` only by default
    fn translate_lookup(
        &self,
        lookup: &Lookup,
        operand: PgValue,
        _conn: &dyn Connection,
    ) -> Result<LookupSql, CodecError> {
        match lookup {
            Lookup::Exact => {
                let value = self.to_wire(operand)?;
                Ok(LookupSql::new("{field} = {value}", vec![value]))
            }
            other => Err(CodecError::unsupported_lookup(self.kind().name(), other.name())),
        }
    }

    /// Value to assign just before a row is written, if the field generates one
    fn pre_save(&self, _current: &PgValue, _adding: bool) -> Option<PgValue> {
        None
    }

    /// Table a column of this field references, if any
    fn references(&self) -> Option<&str> {
        None
    }

    /// Catalog type this field depends on, if any
    fn type_definition(&self) -> Option<&dyn TypeDefinition> {
        None
    }

    /// Install the wire adapters this field's values need. Idempotent.
    fn register_wire_adapters(&self, _registry: &AdapterRegistry) {}
}

/// Capability of fields backed by a user-defined catalog type
#[async_trait]
pub trait TypeDefinition: Send + Sync {
    /// Database name of the type
    fn type_name(&self) -> &str;

    /// `CREATE TYPE` statements needed for this type, dependencies first.
    ///
    /// With `only_if_not_exists`, types already present in the catalog are
    /// left out.
    async fn create_type_statements(
        &self,
        conn: &dyn Connection,
        only_if_not_exists: bool,
    ) -> Result<Vec<String>, CodecError>;

    /// The statements as one script, each terminated by `;`
    async fn create_type_sql(
        &self,
        conn: &dyn Connection,
        only_if_not_exists: bool,
    ) -> Result<String, CodecError> {
        let statements = self.create_type_statements(conn, only_if_not_exists).await?;
        Ok(statements
            .iter()
            .map(|stmt| format!("{};", stmt))
            .collect::<Vec<_>>()
            .join("\n"))
    }

    /// Create the type (and its dependencies) unless present.
    ///
    /// A no-op on backends without DDL support. Losing a concurrent
    /// `CREATE TYPE` race counts as success.
    async fn ensure_type_exists(&self, conn: &dyn Connection) -> Result<(), CodecError> {
        if !conn.vendor().supports_ddl() {
            crate::debug_log!(
                "Skipping type creation for '{}' on {:?} backend",
                self.type_name(),
                conn.vendor()
            );
            return Ok(());
        }

        for statement in self.create_type_statements(conn, true).await? {
            match conn.execute(&statement).await {
                Ok(_) => {
                    tracing::info!("Created type for '{}'", self.type_name());
                }
                Err(CodecError::DuplicateType(_msg)) => {
                    crate::debug_log!("Type created concurrently, continuing: {}", _msg);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

/// Per-connection setup of one field: create its catalog type if needed,
/// then install its wire adapters
pub async fn materialize(field: &dyn Field, conn: &dyn Connection) -> Result<(), CodecError> {
    if !conn.vendor().supports_ddl() {
        crate::debug_log!("Skipping field setup on {:?} backend", conn.vendor());
        return Ok(());
    }
    if let Some(definition) = field.type_definition() {
        definition.ensure_type_exists(conn).await?;
    }
    field.register_wire_adapters(conn.adapters());
    Ok(())
}
