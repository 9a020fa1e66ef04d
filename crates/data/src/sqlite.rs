//! SQLite adapter for the structured store.

use crate::guard::QueryGuard;
use crate::result::{ResultSet, Value};
use crate::runner::StructuredQueryRunner;
use crate::schema::SchemaCatalog;
use epiqa_core::{AppError, AppResult};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Runs queries against a SQLite database file.
///
/// Each call opens its own connection on the blocking pool, so the runner
/// is freely shareable across tasks.
#[derive(Debug, Clone)]
pub struct SqliteQueryRunner {
    db_path: PathBuf,
    read_only: bool,
    guard: Option<QueryGuard>,
}

impl SqliteQueryRunner {
    /// Read-only runner with the query guard enabled.
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            read_only: true,
            guard: Some(QueryGuard),
        }
    }

    /// Allow writes at the connection level. The guard still applies unless
    /// disabled separately.
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Skip the query guard.
    pub fn without_guard(mut self) -> Self {
        self.guard = None;
        self
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Introspect `table` into a schema catalog via `PRAGMA table_info`.
    pub async fn describe_table(&self, table: &str) -> AppResult<SchemaCatalog> {
        let db_path = self.db_path.clone();
        let read_only = self.read_only;
        let table = table.to_string();

        tokio::task::spawn_blocking(move || {
            let conn = open(&db_path, read_only)?;
            let pragma = format!("PRAGMA table_info(\"{}\")", table.replace('"', "\"\""));
            let mut stmt = conn
                .prepare(&pragma)
                .map_err(|e| AppError::Execution(e.to_string()))?;

            let rows = stmt
                .query_map([], |row| {
                    let name: String = row.get(1)?;
                    let kind: String = row.get(2)?;
                    Ok((name, kind))
                })
                .map_err(|e| AppError::Execution(e.to_string()))?;

            let mut columns = BTreeMap::new();
            for row in rows {
                let (name, kind) = row.map_err(|e| AppError::Execution(e.to_string()))?;
                let kind = if kind.is_empty() { "ANY".to_string() } else { kind };
                columns.insert(name, kind);
            }

            if columns.is_empty() {
                return Err(AppError::Execution(format!("no such table: {}", table)));
            }

            tracing::debug!(table = %table, columns = columns.len(), "Described table");
            Ok(SchemaCatalog::new(table, columns))
        })
        .await
        .map_err(|e| AppError::Execution(format!("Query task failed: {}", e)))?
    }
}

fn open(db_path: &Path, read_only: bool) -> AppResult<Connection> {
    let flags = if read_only {
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX
    } else {
        OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX
    };

    Connection::open_with_flags(db_path, flags).map_err(|e| {
        AppError::Execution(format!(
            "Failed to open database {}: {}",
            db_path.display(),
            e
        ))
    })
}

fn execute(conn: &Connection, query: &str) -> rusqlite::Result<ResultSet> {
    let mut stmt = conn.prepare(query)?;
    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let width = columns.len();

    let mut rows = Vec::new();
    let mut cursor = stmt.query([])?;
    while let Some(row) = cursor.next()? {
        let mut values = Vec::with_capacity(width);
        for idx in 0..width {
            values.push(match row.get_ref(idx)? {
                ValueRef::Null => Value::Null,
                ValueRef::Integer(v) => Value::Integer(v),
                ValueRef::Real(v) => Value::Real(v),
                ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
                ValueRef::Blob(bytes) => Value::Blob(bytes.to_vec()),
            });
        }
        rows.push(values);
    }

    Ok(ResultSet::new(columns, rows))
}

#[async_trait::async_trait]
impl StructuredQueryRunner for SqliteQueryRunner {
    #[tracing::instrument(skip(self), fields(db = %self.db_path.display()))]
    async fn run_query(&self, query: &str) -> AppResult<ResultSet> {
        let statement = match &self.guard {
            Some(guard) => guard.check(query)?,
            None => query.to_string(),
        };

        let db_path = self.db_path.clone();
        let read_only = self.read_only;

        let result = tokio::task::spawn_blocking(move || {
            let conn = open(&db_path, read_only)?;
            execute(&conn, &statement).map_err(|e| AppError::Execution(e.to_string()))
        })
        .await
        .map_err(|e| AppError::Execution(format!("Query task failed: {}", e)))??;

        tracing::debug!(rows = result.len(), "Query executed");
        Ok(result)
    }
}
