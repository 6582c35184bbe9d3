//! PostgreSQL engine primitives over the blocking `postgres` client.

use super::{ExecResult, Row};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::value::Value;
use postgres::types::{ToSql, Type};
use postgres::{Client, NoTls};

pub(super) fn connect(config: &Config) -> Result<Client> {
    let mut client = Client::connect(&config.data_source_name, NoTls)
        .map_err(|e| Error::connection(describe("failed to open database", &e), e))?;
    client
        .batch_execute("SELECT 1")
        .map_err(|e| Error::connection(describe("failed to ping database", &e), e))?;
    Ok(client)
}

/// `postgres::Error` displays as "db error"; the server's message goes into
/// the context so it survives a plain `to_string()`.
fn describe(context: &str, e: &postgres::Error) -> String {
    match e.as_db_error() {
        Some(db) => format!("{context}: {}", db.message()),
        None => context.to_string(),
    }
}

fn execution(context: &str, e: postgres::Error) -> Error {
    Error::execution(describe(context, &e), e)
}

fn bind(params: &[Value]) -> Vec<&(dyn ToSql + Sync)> {
    params.iter().map(|v| v as &(dyn ToSql + Sync)).collect()
}

pub(super) fn exec(client: &mut Client, sql: &str, params: &[Value]) -> Result<ExecResult> {
    let stmt = client
        .prepare(sql)
        .map_err(|e| execution("failed to prepare statement", e))?;
    let affected = client
        .execute(&stmt, &bind(params))
        .map_err(|e| execution("failed to execute statement", e))?;
    // The server has no last-insert-id; inserts that need one go through RETURNING.
    Ok(ExecResult::new(None, Some(affected)))
}

pub(super) fn query(client: &mut Client, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
    let stmt = client
        .prepare(sql)
        .map_err(|e| execution("failed to prepare query", e))?;
    let columns: Vec<String> = stmt.columns().iter().map(|c| c.name().to_string()).collect();

    let rows = client
        .query(&stmt, &bind(params))
        .map_err(|e| execution("failed to execute query", e))?;

    rows.iter()
        .map(|row| {
            let values = (0..columns.len())
                .map(|i| read_value(row, i))
                .collect::<std::result::Result<Vec<_>, postgres::Error>>()
                .map_err(|e| execution("failed to read column", e))?;
            Ok(Row::new(columns.clone(), values))
        })
        .collect()
}

fn read_value(row: &postgres::Row, index: usize) -> std::result::Result<Value, postgres::Error> {
    let ty = row.columns()[index].type_().clone();
    let value = match ty {
        Type::BOOL => row.try_get::<_, Option<bool>>(index)?.map(Value::Boolean),
        Type::INT2 => row
            .try_get::<_, Option<i16>>(index)?
            .map(|v| Value::Integer(v.into())),
        Type::INT4 => row
            .try_get::<_, Option<i32>>(index)?
            .map(|v| Value::Integer(v.into())),
        Type::INT8 => row.try_get::<_, Option<i64>>(index)?.map(Value::Integer),
        Type::OID => row
            .try_get::<_, Option<u32>>(index)?
            .map(|v| Value::Integer(v.into())),
        Type::FLOAT4 => row
            .try_get::<_, Option<f32>>(index)?
            .map(|v| Value::Real(v.into())),
        Type::FLOAT8 => row.try_get::<_, Option<f64>>(index)?.map(Value::Real),
        Type::BYTEA => row.try_get::<_, Option<Vec<u8>>>(index)?.map(Value::Blob),
        _ => row.try_get::<_, Option<String>>(index)?.map(Value::Text),
    };
    Ok(value.unwrap_or(Value::Null))
}

pub(super) fn batch(client: &mut Client, sql: &str) -> Result<()> {
    client
        .batch_execute(sql)
        .map_err(|e| execution("failed to execute statement", e))
}

pub(super) fn close(client: Client) -> Result<()> {
    client
        .close()
        .map_err(|e| Error::connection(describe("failed to close database", &e), e))
}
