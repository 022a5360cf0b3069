//! Connection contract
//!
//! The codec layer only needs a handful of primitives from the database
//! driver: run a statement, fetch text rows, report what backend it is and
//! which server version it talks to. [`PgPoolConnection`] provides them over
//! an sqlx pool; tests substitute their own implementation.

use crate::errors::CodecError;
use crate::registry::AdapterRegistry;
use async_trait::async_trait;
use sqlx::{PgPool, Row as _};

/// First server version (`server_version_num`) with a native `json` type
pub const JSON_NATIVE_MIN_VERSION: u32 = 90200;

/// One result row, every column rendered as text
pub type Row = Vec<Option<String>>;

/// Backend kind behind a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vendor {
    PostgreSql,
    /// Stand-in used when the database is disabled (e.g. under tests)
    Dummy,
    Unknown,
}

impl Vendor {
    /// Whether DDL and adapter registration should run at all
    pub fn supports_ddl(self) -> bool {
        matches!(self, Vendor::PostgreSql)
    }
}

#[async_trait]
pub trait Connection: Send + Sync {
    fn vendor(&self) -> Vendor;

    /// Server version in `server_version_num` form (e.g. 90200 for 9.2)
    fn server_version(&self) -> u32;

    /// Wire adapters installed for this connection
    fn adapters(&self) -> &AdapterRegistry;

    /// Execute a statement, returning the affected row count
    async fn execute(&self, sql: &str) -> Result<u64, CodecError>;

    /// Run a query and return every row with its columns as text
    async fn fetch_all(&self, sql: &str) -> Result<Vec<Row>, CodecError>;
}

/// [`Connection`] backed by an sqlx PostgreSQL pool
#[derive(Debug)]
pub struct PgPoolConnection {
    pool: PgPool,
    server_version: u32,
    adapters: AdapterRegistry,
}

impl PgPoolConnection {
    /// Wrap a pool, reading the server version once up front
    pub async fn new(pool: PgPool) -> Result<Self, CodecError> {
        let row = sqlx::query("SELECT current_setting('server_version_num')")
            .fetch_one(&pool)
            .await
            .map_err(|e| map_sqlx_error(e, ""))?;
        let raw: String = row.try_get(0).map_err(|e| map_sqlx_error(e, ""))?;
        let server_version = raw.trim().parse::<u32>().map_err(|_| {
            CodecError::Database(format!("Unrecognized server_version_num '{}'", raw))
        })?;

        crate::debug_log!("Connected to PostgreSQL server version {}", server_version);

        Ok(Self {
            pool,
            server_version,
            adapters: AdapterRegistry::new(),
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Connection for PgPoolConnection {
    fn vendor(&self) -> Vendor {
        Vendor::PostgreSql
    }

    fn server_version(&self) -> u32 {
        self.server_version
    }

    fn adapters(&self) -> &AdapterRegistry {
        &self.adapters
    }

    async fn execute(&self, sql: &str) -> Result<u64, CodecError> {
        crate::trace_log!("Executing SQL: {}", sql);
        let result = sqlx::raw_sql(sql)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(e, sql))?;
        Ok(result.rows_affected())
    }

    async fn fetch_all(&self, sql: &str) -> Result<Vec<Row>, CodecError> {
        crate::trace_log!("Fetching SQL: {}", sql);
        let rows = sqlx::raw_sql(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(e, sql))?;

        rows.iter()
            .map(|row| {
                (0..row.len())
                    .map(|idx| row.try_get::<Option<String>, _>(idx))
                    .collect::<Result<Row, _>>()
                    .map_err(|e| map_sqlx_error(e, sql))
            })
            .collect()
    }
}

/// Map driver errors onto the codec taxonomy.
///
/// `duplicate_object` (42710) is what a losing concurrent `CREATE TYPE`
/// raises; the same race can also surface as a unique violation (23505) on
/// the catalog index.
fn map_sqlx_error(err: sqlx::Error, sql: &str) -> CodecError {
    if let sqlx::Error::Database(db_err) = &err {
        let is_create_type = sql.trim_start().to_ascii_uppercase().starts_with("CREATE TYPE");
        match db_err.code().as_deref() {
            Some("42710") => return CodecError::DuplicateType(db_err.message().to_string()),
            Some("23505") if is_create_type => {
                return CodecError::DuplicateType(db_err.message().to_string())
            }
            _ => {}
        }
    }
    CodecError::Database(err.to_string())
}
