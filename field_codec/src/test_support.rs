//! In-memory [`Connection`] for unit tests

use crate::connection::{Connection, Row, Vendor};
use crate::errors::CodecError;
use crate::registry::AdapterRegistry;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Records executed statements and answers catalog queries from a set of
/// known type names. `CREATE TYPE "x"` adds `x` to that set.
pub struct MockConnection {
    vendor: Vendor,
    server_version: u32,
    adapters: AdapterRegistry,
    types: Mutex<BTreeSet<String>>,
    executed: Mutex<Vec<String>>,
    fetches: AtomicUsize,
    /// Report every CREATE TYPE as a duplicate, as a losing concurrent creator would see
    race_on_create: bool,
}

impl MockConnection {
    pub fn new() -> Self {
        Self {
            vendor: Vendor::PostgreSql,
            server_version: 150004,
            adapters: AdapterRegistry::new(),
            types: Mutex::new(BTreeSet::new()),
            executed: Mutex::new(Vec::new()),
            fetches: AtomicUsize::new(0),
            race_on_create: false,
        }
    }

    pub fn dummy() -> Self {
        Self {
            vendor: Vendor::Dummy,
            ..Self::new()
        }
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.server_version = version;
        self
    }

    pub fn with_types(self, names: &[&str]) -> Self {
        self.types
            .lock()
            .unwrap()
            .extend(names.iter().map(|n| n.to_string()));
        self
    }

    pub fn racing(mut self) -> Self {
        self.race_on_create = true;
        self
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connection for MockConnection {
    fn vendor(&self) -> Vendor {
        self.vendor
    }

    fn server_version(&self) -> u32 {
        self.server_version
    }

    fn adapters(&self) -> &AdapterRegistry {
        &self.adapters
    }

    async fn execute(&self, sql: &str) -> Result<u64, CodecError> {
        self.executed.lock().unwrap().push(sql.to_string());
        if let Some(rest) = sql.trim_start().strip_prefix("CREATE TYPE \"") {
            let name = rest.split('"').next().unwrap_or_default().to_string();
            if self.race_on_create {
                return Err(CodecError::DuplicateType(format!("type \"{}\" already exists", name)));
            }
            self.types.lock().unwrap().insert(name);
        }
        Ok(0)
    }

    async fn fetch_all(&self, _sql: &str) -> Result<Vec<Row>, CodecError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .types
            .lock()
            .unwrap()
            .iter()
            .map(|name| vec![Some("public".to_string()), Some(name.clone())])
            .collect())
    }
}
