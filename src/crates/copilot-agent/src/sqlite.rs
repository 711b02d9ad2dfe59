//! SQLite-backed query execution and schema introspection
//!
//! The default [`QueryExecutor`](crate::collab::QueryExecutor) for batch
//! runs. Every execution failure (bad SQL, missing table, unreadable
//! file) comes back as data in [`QueryResult::error`]; nothing here
//! panics or propagates into the workflow.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde_json::{json, Value};

use crate::collab::{CollabError, QueryExecutor};
use crate::state::QueryResult;

/// Tables of the Northwind retail schema, in canonical spelling, used to
/// derive table citations from query text.
const KNOWN_TABLES: &[&str] = &[
    "Orders",
    "Order Details",
    "Products",
    "Customers",
    "Categories",
    "Suppliers",
    "Employees",
    "Shippers",
];

/// [`QueryExecutor`] over a SQLite database file.
pub struct SqliteExecutor {
    conn: Mutex<Connection>,
}

impl SqliteExecutor {
    /// Open the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CollabError> {
        let conn = Connection::open(path.as_ref())
            .map_err(|e| CollabError::Unavailable(e.to_string()))?;
        Ok(Self::from_connection(conn))
    }

    /// Wrap an existing connection (e.g. in-memory, for tests).
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn run(&self, sql: &str) -> rusqlite::Result<QueryResult> {
        let conn = self.conn.lock().expect("sqlite connection lock poisoned");
        let mut stmt = conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let width = columns.len();

        let mut rows = Vec::new();
        let mut raw = stmt.query([])?;
        while let Some(row) = raw.next()? {
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                values.push(match row.get_ref(i)? {
                    ValueRef::Null => Value::Null,
                    ValueRef::Integer(v) => json!(v),
                    ValueRef::Real(v) => json!(v),
                    ValueRef::Text(bytes) => json!(String::from_utf8_lossy(bytes)),
                    ValueRef::Blob(bytes) => json!(format!("<{} byte blob>", bytes.len())),
                });
            }
            rows.push(values);
        }

        Ok(QueryResult {
            columns,
            rows,
            error: None,
            tables_used: tables_in_query(sql),
        })
    }

    fn introspect(&self) -> rusqlite::Result<String> {
        let conn = self.conn.lock().expect("sqlite connection lock poisoned");
        let mut parts = Vec::new();

        let mut stmt =
            conn.prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;

        for name in names.iter().filter(|n| !n.starts_with("sqlite_")) {
            parts.push(format!("\nTable: {name}"));
            let mut columns = conn.prepare(&format!("PRAGMA table_info(\"{name}\")"))?;
            let infos = columns
                .query_map([], |row| {
                    Ok((row.get::<_, String>(1)?, row.get::<_, String>(2)?))
                })?
                .collect::<rusqlite::Result<Vec<(String, String)>>>()?;
            for (column, kind) in infos {
                parts.push(format!("  {column} ({kind})"));
            }
        }

        Ok(parts.join("\n"))
    }
}

#[async_trait]
impl QueryExecutor for SqliteExecutor {
    async fn schema(&self) -> Result<String, CollabError> {
        self.introspect()
            .map_err(|e| CollabError::Backend(e.to_string()))
    }

    async fn execute(&self, sql: &str) -> QueryResult {
        match self.run(sql) {
            Ok(result) => result,
            Err(e) => QueryResult::failed(e.to_string()),
        }
    }
}

/// Canonical names of the known tables mentioned in `sql`.
pub fn tables_in_query(sql: &str) -> Vec<String> {
    let upper = sql.to_uppercase();
    KNOWN_TABLES
        .iter()
        .filter(|table| upper.contains(&table.to_uppercase()))
        .map(|table| table.to_string())
        .collect()
}
