//! Scripted [`Connection`] for unit tests

use async_trait::async_trait;
use field_codec::{AdapterRegistry, CodecError, Connection, Row, Vendor};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Records every statement and answers queries from a queue of canned
/// result sets (an empty result once the queue runs dry)
pub struct StubConnection {
    adapters: AdapterRegistry,
    statements: Mutex<Vec<String>>,
    results: Mutex<VecDeque<Vec<Row>>>,
}

impl StubConnection {
    pub fn new() -> Self {
        Self {
            adapters: AdapterRegistry::new(),
            statements: Mutex::new(Vec::new()),
            results: Mutex::new(VecDeque::new()),
        }
    }

    pub fn push_result(&self, rows: Vec<Vec<Option<&str>>>) {
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(|cell| cell.map(str::to_string)).collect())
            .collect();
        self.results.lock().unwrap().push_back(rows);
    }

    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }
}

#[async_trait]
impl Connection for StubConnection {
    fn vendor(&self) -> Vendor {
        Vendor::PostgreSql
    }

    fn server_version(&self) -> u32 {
        160002
    }

    fn adapters(&self) -> &AdapterRegistry {
        &self.adapters
    }

    async fn execute(&self, sql: &str) -> Result<u64, CodecError> {
        self.statements.lock().unwrap().push(sql.to_string());
        Ok(1)
    }

    async fn fetch_all(&self, sql: &str) -> Result<Vec<Row>, CodecError> {
        self.statements.lock().unwrap().push(sql.to_string());
        Ok(self.results.lock().unwrap().pop_front().unwrap_or_default())
    }
}
