//! Type registry
//!
//! Two connection-scoped pieces of state live here: the catalog query that
//! tells whether a named type already exists (used to make `CREATE TYPE`
//! idempotent), and the [`AdapterRegistry`] that renders application values
//! to SQL literals.

use crate::connection::Connection;
use crate::errors::CodecError;
use std::collections::{HashMap, HashSet};
use std::fmt::{self, Debug};
use std::sync::{Arc, RwLock, RwLockReadGuard};
use type_mapping::{quote_ident, render_scalar_literal, PgValue};

/// User-defined types outside the system schemas, excluding the implicit
/// array types PostgreSQL creates alongside every type.
pub const SELECT_TYPES_SQL: &str = r#"
    SELECT n.nspname::text AS schema, t.typname::text AS type
      FROM pg_type t
 LEFT JOIN pg_catalog.pg_namespace n ON n.oid = t.typnamespace
     WHERE (t.typrelid = 0 OR (
            SELECT c.relkind = 'c'
              FROM pg_catalog.pg_class c
             WHERE c.oid = t.typrelid)
           )
       AND NOT EXISTS(
            SELECT 1
              FROM pg_catalog.pg_type el
             WHERE el.oid = t.typelem
               AND el.typarray = t.oid
           )
       AND n.nspname NOT IN ('pg_catalog', 'information_schema')
"#;

/// Names of the custom types currently visible to the connection
pub async fn type_names(conn: &dyn Connection) -> Result<HashSet<String>, CodecError> {
    let rows = conn.fetch_all(SELECT_TYPES_SQL).await?;
    Ok(rows
        .into_iter()
        .filter_map(|row| row.into_iter().nth(1).flatten())
        .collect())
}

/// Whether a type with this name exists; the name is compared lower-cased.
///
/// Issues a fresh catalog query on every call.
pub async fn type_exists(conn: &dyn Connection, type_name: &str) -> Result<bool, CodecError> {
    let type_name = type_name.to_lowercase();
    let exists = type_names(conn).await?.contains(&type_name);
    crate::debug_log!("Type '{}' exists: {}", type_name, exists);
    Ok(exists)
}

/// Renders one kind of application value as SQL text
pub trait WireAdapter: Send + Sync + Debug {
    fn to_sql(&self, value: &PgValue, registry: &AdapterRegistry) -> Result<String, CodecError>;
}

/// What an adapter is registered for
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AdapterKey {
    Uuid,
    /// Composite instances of the named database type
    Composite(String),
}

/// Connection-scoped table of wire adapters.
///
/// Registration replaces any previous adapter under the same key, so
/// repeated or concurrent registration of the same type is harmless.
/// Scalars, text, JSON and arrays render without registration; UUIDs and
/// composite instances need their adapter installed first.
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: RwLock<HashMap<AdapterKey, Arc<dyn WireAdapter>>>,
}

impl Debug for AdapterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("adapter_count", &self.len())
            .finish()
    }
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, key: AdapterKey, adapter: Arc<dyn WireAdapter>) {
        // single inserts leave the map consistent even after a poisoning panic
        let mut adapters = self.adapters.write().unwrap_or_else(|poisoned| {
            tracing::warn!("Adapter registry lock was poisoned; recovering");
            poisoned.into_inner()
        });
        crate::debug_log!("Registering wire adapter for {:?}", key);
        adapters.insert(key, adapter);
    }

    pub fn is_registered(&self, key: &AdapterKey) -> bool {
        self.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<AdapterKey, Arc<dyn WireAdapter>>> {
        self.adapters
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn adapter(&self, key: &AdapterKey) -> Option<Arc<dyn WireAdapter>> {
        self.read().get(key).cloned()
    }

    /// Render a wire value as an SQL literal
    pub fn render(&self, value: &PgValue) -> Result<String, CodecError> {
        match value {
            PgValue::Uuid(_) => self
                .adapter(&AdapterKey::Uuid)
                .ok_or_else(|| CodecError::NoAdapter("uuid".to_string()))?
                .to_sql(value, self),
            PgValue::Composite(instance) => {
                let key = AdapterKey::Composite(instance.db_type().to_string());
                self.adapter(&key)
                    .ok_or_else(|| CodecError::NoAdapter(instance.db_type().to_string()))?
                    .to_sql(value, self)
            }
            PgValue::Array(items) => {
                if items.is_empty() {
                    return Ok("'{}'".to_string());
                }
                let rendered = items
                    .iter()
                    .map(|item| self.render(item))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(format!("ARRAY[{}]", rendered.join(", ")))
            }
            PgValue::Record(_) => Err(CodecError::TypeMismatch(
                "a name/value record must be coerced by a composite field before it can be sent"
                    .to_string(),
            )),
            other => render_scalar_literal(other)
                .ok_or_else(|| CodecError::NoAdapter(other.kind_name().to_string())),
        }
    }
}

/// Renders a composite instance as `ROW(...)::typename`
#[derive(Debug, Clone)]
pub struct CompositeAdapter {
    db_type: String,
}

impl CompositeAdapter {
    pub fn new(db_type: impl Into<String>) -> Self {
        Self {
            db_type: db_type.into(),
        }
    }
}

impl WireAdapter for CompositeAdapter {
    fn to_sql(&self, value: &PgValue, registry: &AdapterRegistry) -> Result<String, CodecError> {
        let PgValue::Composite(instance) = value else {
            return Err(CodecError::mismatch(&self.db_type, value));
        };
        let parts = instance
            .values()
            .iter()
            .map(|v| registry.render(v))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(format!(
            "ROW({})::{}",
            parts.join(", "),
            quote_ident(&self.db_type)
        ))
    }
}

/// Renders a UUID as a single-quoted literal
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidAdapter;

impl WireAdapter for UuidAdapter {
    fn to_sql(&self, value: &PgValue, _registry: &AdapterRegistry) -> Result<String, CodecError> {
        match value {
            PgValue::Uuid(uuid) => Ok(format!("'{}'", uuid)),
            other => Err(CodecError::TypeMismatch(format!(
                "UuidAdapter only understands UUID values; got {}",
                other.kind_name()
            ))),
        }
    }
}
