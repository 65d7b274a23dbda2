//! Schema management for the tick sink.
//!
//! Table creation is idempotent: DDL uses `IF NOT EXISTS` and applied
//! versions are tracked in `schema_migrations`, so opening an existing
//! database is a no-op.

use ::duckdb::Connection;

/// Apply the sink schema for the configured table.
///
/// The persisted schema is deliberately narrow: `volume` and
/// `change_percent` travel on the wire but are not columns here.
pub fn apply_migrations(connection: &Connection, table: &str) -> Result<(), ::duckdb::Error> {
    connection.execute_batch(
        r"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version TEXT PRIMARY KEY,
    applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
",
    )?;

    let migrations = [
        (
            format!("0001_{table}_table"),
            format!(
                r#"
CREATE TABLE IF NOT EXISTS {table} (
    symbol TEXT NOT NULL,
    price DOUBLE NOT NULL,
    "timestamp" TEXT,
    processing_status TEXT NOT NULL
);
"#
            ),
        ),
        (
            format!("0002_{table}_indexes"),
            format!("CREATE INDEX IF NOT EXISTS idx_{table}_symbol ON {table}(symbol);"),
        ),
    ];

    for (version, sql) in &migrations {
        let query = format!(
            "SELECT COUNT(*) FROM schema_migrations WHERE version = '{}'",
            escape_sql_string(version)
        );
        let applied_count: i64 = connection.query_row(query.as_str(), [], |row| row.get(0))?;

        if applied_count == 0 {
            connection.execute_batch(sql)?;
            let insert = format!(
                "INSERT INTO schema_migrations (version) VALUES ('{}')",
                escape_sql_string(version)
            );
            connection.execute_batch(insert.as_str())?;
        }
    }

    Ok(())
}

fn escape_sql_string(value: &str) -> String {
    value.replace('\'', "''")
}
