//! # Tickflow Warehouse
//!
//! DuckDB-backed append-only sink for processed tick records.
//!
//! ## Contract
//!
//! - Fixed schema: `symbol TEXT, price DOUBLE, "timestamp" TEXT,
//!   processing_status TEXT`. Upstream fields outside this schema
//!   (`volume`, `change_percent`) are not persisted.
//! - Write mode is append-only: plain `INSERT`, no upsert, no dedup, no
//!   delete path. Redelivered payloads become additional rows.
//! - Table creation is idempotent (create-if-absent on open).
//!
//! ## Security
//!
//! Row values are always bound as query parameters. The table name is the
//! only interpolated identifier and is validated as a bare identifier before
//! any SQL is built.

pub mod migrations;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use ::duckdb::{Connection, ToSql};
use thiserror::Error;

/// Errors that can occur during sink operations.
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// `DuckDB` database error.
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    /// I/O error (database directory creation).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Configured table name is not a bare identifier.
    #[error("invalid table name '{0}': expected letters, digits, or '_' starting with a letter")]
    InvalidTableName(String),
}

/// Configuration for the tick sink.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    /// Path to the `DuckDB` database file.
    pub db_path: PathBuf,
    /// Name of the append-only tick table.
    pub table: String,
}

impl WarehouseConfig {
    pub fn new(db_path: impl Into<PathBuf>, table: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            table: table.into(),
        }
    }
}

/// One persisted row. This is the narrowed, post-enrichment shape; every row
/// carries exactly one `processing_status`.
#[derive(Debug, Clone, PartialEq)]
pub struct TickRow {
    pub symbol: String,
    pub price: f64,
    pub timestamp: Option<String>,
    pub processing_status: String,
}

struct WarehouseInner {
    config: WarehouseConfig,
    connection: Mutex<Connection>,
}

/// Append-only analytical sink for processed ticks.
#[derive(Clone)]
pub struct TickWarehouse {
    inner: Arc<WarehouseInner>,
}

impl TickWarehouse {
    /// Open (creating if absent) the database file and apply migrations.
    pub fn open(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        validate_table_name(&config.table)?;

        if let Some(parent) = config.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let connection = Connection::open(&config.db_path)?;
        connection.execute_batch("PRAGMA disable_progress_bar;")?;
        migrations::apply_migrations(&connection, &config.table)?;

        Ok(Self {
            inner: Arc::new(WarehouseInner {
                config,
                connection: Mutex::new(connection),
            }),
        })
    }

    pub fn table(&self) -> &str {
        &self.inner.config.table
    }

    pub fn db_path(&self) -> &Path {
        self.inner.config.db_path.as_path()
    }

    /// Append rows inside a single transaction. Plain `INSERT` only; the
    /// sink never rewrites or deduplicates existing rows.
    pub fn append_ticks(&self, rows: &[TickRow]) -> Result<(), WarehouseError> {
        if rows.is_empty() {
            return Ok(());
        }

        let connection = self.lock_connection();
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<(), WarehouseError> {
            let sql = format!(
                "INSERT INTO {} (symbol, price, \"timestamp\", processing_status) \
                 VALUES (?, ?, ?, ?)",
                self.table()
            );
            for row in rows {
                let params: [&dyn ToSql; 4] = [
                    &row.symbol,
                    &row.price,
                    &row.timestamp,
                    &row.processing_status,
                ];
                connection.execute(&sql, params.as_slice())?;
            }
            Ok(())
        })();

        finalize_transaction(&connection, result)
    }

    /// Total row count, used by tests and startup logging.
    pub fn count_ticks(&self) -> Result<u64, WarehouseError> {
        let connection = self.lock_connection();
        let count: i64 = connection.query_row(
            &format!("SELECT COUNT(*) FROM {}", self.table()),
            [],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }

    /// Fetch up to `limit` rows in insertion order.
    pub fn fetch_ticks(&self, limit: usize) -> Result<Vec<TickRow>, WarehouseError> {
        let connection = self.lock_connection();
        let sql = format!(
            "SELECT symbol, price, \"timestamp\", processing_status FROM {} LIMIT ?",
            self.table()
        );
        let mut statement = connection.prepare(&sql)?;
        let mapped = statement.query_map([limit as i64], |row| {
            Ok(TickRow {
                symbol: row.get(0)?,
                price: row.get(1)?,
                timestamp: row.get(2)?,
                processing_status: row.get(3)?,
            })
        })?;

        let mut rows = Vec::new();
        for row in mapped {
            rows.push(row?);
        }
        Ok(rows)
    }

    /// Column names of the tick table, in declaration order.
    pub fn column_names(&self) -> Result<Vec<String>, WarehouseError> {
        let connection = self.lock_connection();
        let sql = format!("PRAGMA table_info('{}')", self.table());
        let mut statement = connection.prepare(&sql)?;
        let mapped = statement.query_map([], |row| row.get::<_, String>(1))?;

        let mut names = Vec::new();
        for name in mapped {
            names.push(name?);
        }
        Ok(names)
    }

    fn lock_connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.inner
            .connection
            .lock()
            .expect("warehouse connection mutex poisoned")
    }
}

fn finalize_transaction(
    connection: &Connection,
    result: Result<(), WarehouseError>,
) -> Result<(), WarehouseError> {
    match result {
        Ok(()) => {
            connection.execute_batch("COMMIT")?;
            Ok(())
        }
        Err(error) => {
            let _ = connection.execute_batch("ROLLBACK");
            Err(error)
        }
    }
}

fn validate_table_name(table: &str) -> Result<(), WarehouseError> {
    let mut chars = table.chars();
    let valid_start = chars
        .next()
        .is_some_and(|ch| ch.is_ascii_alphabetic() || ch == '_');
    let valid_rest = table
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '_');

    if valid_start && valid_rest {
        Ok(())
    } else {
        Err(WarehouseError::InvalidTableName(table.to_string()))
    }
}
