//! SQLite engine primitives over `rusqlite`.

use super::{ExecResult, Row};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::value::Value;
use rusqlite::{params_from_iter, Connection};
use std::path::Path;

pub(super) fn connect(config: &Config) -> Result<Connection> {
    let path = config.data_source_name.as_str();
    if !is_memory(path) {
        ensure_parent_dir(Path::new(path))?;
    }

    let conn =
        Connection::open(path).map_err(|e| Error::connection("failed to open database", e))?;

    if config.use_write_ahead_logs {
        // The pragma answers with the resulting mode, so it has to be read as a query.
        let mode: String = conn
            .query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))
            .map_err(|e| Error::connection("failed to switch to WAL mode", e))?;
        tracing::debug!(journal_mode = %mode, "journal mode set");
    }

    conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
        .map_err(|e| Error::connection("failed to ping database", e))?;

    Ok(conn)
}

fn is_memory(path: &str) -> bool {
    path.is_empty() || path == ":memory:" || path.starts_with("file:")
}

/// Create the directory holding the database file (0755) if it is missing.
fn ensure_parent_dir(path: &Path) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => return Ok(()),
    };
    if dir.exists() {
        return Ok(());
    }

    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o755);
    }
    builder
        .create(dir)
        .map_err(|e| Error::connection("failed to create directory", e))?;
    tracing::debug!(dir = %dir.display(), "created database directory");
    Ok(())
}

pub(super) fn exec(conn: &Connection, sql: &str, params: &[Value]) -> Result<ExecResult> {
    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| Error::execution("failed to prepare statement", e))?;
    let affected = stmt
        .execute(params_from_iter(params.iter()))
        .map_err(|e| Error::execution("failed to execute statement", e))?;
    Ok(ExecResult::new(
        Some(conn.last_insert_rowid()),
        Some(affected as u64),
    ))
}

pub(super) fn query(conn: &Connection, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| Error::execution("failed to prepare query", e))?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    let mut rows = stmt
        .query(params_from_iter(params.iter()))
        .map_err(|e| Error::execution("failed to execute query", e))?;

    let mut out = Vec::new();
    while let Some(row) = rows
        .next()
        .map_err(|e| Error::execution("failed to read row", e))?
    {
        let values = (0..columns.len())
            .map(|i| row.get_ref(i).map(Value::from))
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| Error::execution("failed to read column", e))?;
        out.push(Row::new(columns.clone(), values));
    }
    Ok(out)
}

pub(super) fn batch(conn: &Connection, sql: &str) -> Result<()> {
    conn.execute_batch(sql)
        .map_err(|e| Error::execution("failed to execute statement", e))
}

pub(super) fn close(conn: Connection) -> Result<()> {
    conn.close()
        .map_err(|(_, e)| Error::connection("failed to close database", e))
}
