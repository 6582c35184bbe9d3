//! Dialect adapters and the shared connection handle.
//!
//! [`Dialect`] owns everything that differs between engines when building
//! statements: placeholder syntax, column types and the primary-key
//! fragment. [`Database`] owns the open connection and the low-level
//! query/exec/transaction primitives, including the insert-id strategy.

mod pg;
mod sqlite;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::schema::{ColumnDefinition, DataType, Model, TableDefinition};
use crate::value::{FromValue, Value};
use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};
use std::thread::{self, ThreadId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    Postgres,
}

impl Dialect {
    /// Select a dialect from a driver name.
    pub fn from_driver(driver: &str) -> Result<Self> {
        match driver.trim().to_ascii_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(Dialect::Sqlite),
            "postgres" | "postgresql" | "pg" => Ok(Dialect::Postgres),
            other => Err(Error::Config(format!("unsupported driver: {other:?}"))),
        }
    }

    /// Parameter marker for the 1-based `index`.
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Dialect::Sqlite => "?".to_string(),
            Dialect::Postgres => format!("${index}"),
        }
    }

    /// SQL type of a column, including the primary-key fragment.
    pub fn column_type(&self, column: &ColumnDefinition) -> String {
        let base = match (self, column.data_type) {
            (_, DataType::Integer) => "INTEGER",
            (_, DataType::Text) => "TEXT",
            (Dialect::Sqlite, DataType::Real) => "REAL",
            (Dialect::Postgres, DataType::Real) => "DOUBLE PRECISION",
            (_, DataType::Boolean) => "BOOLEAN",
            (Dialect::Sqlite, DataType::Blob) => "BLOB",
            (Dialect::Postgres, DataType::Blob) => "BYTEA",
        };
        if !column.primary_key {
            return base.to_string();
        }
        match (self, column.data_type) {
            (Dialect::Postgres, DataType::Integer) => "SERIAL PRIMARY KEY".to_string(),
            _ => format!("{base} PRIMARY KEY"),
        }
    }

    pub fn column_sql(&self, column: &ColumnDefinition) -> String {
        let mut sql = format!("{} {}", column.name, self.column_type(column));
        if let Some(constraint) = &column.constraint {
            sql.push(' ');
            sql.push_str(&constraint.to_uppercase());
        }
        sql
    }

    /// `CREATE TABLE IF NOT EXISTS` statement for `M`.
    pub fn create_table_sql<M: Model>(&self) -> Result<String> {
        let table = TableDefinition::of::<M>()?;
        let columns: Vec<String> = table.columns.iter().map(|c| self.column_sql(c)).collect();
        Ok(format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            table.name,
            columns.join(", ")
        ))
    }
}

/// One row read from a result set.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get<T: FromValue>(&self, index: usize) -> Result<T> {
        let value = self.values.get(index).cloned().ok_or_else(|| {
            Error::InvalidModel(format!("row has no column at index {index}"))
        })?;
        T::from_value(value)
    }

    pub fn get_by_name<T: FromValue>(&self, name: &str) -> Result<T> {
        let index = self
            .columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::InvalidModel(format!("row has no column named {name}")))?;
        self.get(index)
    }
}

/// Outcome of a mutating statement.
///
/// Both accessors can fail independently: an engine may be unable to report
/// an inserted id or an affected-row count for a given statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecResult {
    last_insert_id: Option<i64>,
    rows_affected: Option<u64>,
}

impl ExecResult {
    pub(crate) fn new(last_insert_id: Option<i64>, rows_affected: Option<u64>) -> Self {
        Self {
            last_insert_id,
            rows_affected,
        }
    }

    /// Result manufactured from a `RETURNING` scan.
    pub(crate) fn synthetic(last_insert_id: i64) -> Self {
        Self::new(Some(last_insert_id), Some(1))
    }

    pub fn last_insert_id(&self) -> Result<i64> {
        self.last_insert_id.ok_or_else(|| {
            Error::Unsupported("last insert id is not reported for this statement".to_string())
        })
    }

    pub fn rows_affected(&self) -> Result<u64> {
        self.rows_affected.ok_or_else(|| {
            Error::Unsupported("rows affected is not reported for this statement".to_string())
        })
    }
}

enum Backend {
    Sqlite(rusqlite::Connection),
    Postgres(postgres::Client),
}

impl Backend {
    fn exec(&mut self, sql: &str, params: &[Value]) -> Result<ExecResult> {
        tracing::debug!(sql, params = params.len(), "exec");
        match self {
            Backend::Sqlite(conn) => sqlite::exec(conn, sql, params),
            Backend::Postgres(client) => pg::exec(client, sql, params),
        }
    }

    fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        tracing::debug!(sql, params = params.len(), "query");
        match self {
            Backend::Sqlite(conn) => sqlite::query(conn, sql, params),
            Backend::Postgres(client) => pg::query(client, sql, params),
        }
    }

    fn batch(&mut self, sql: &str) -> Result<()> {
        tracing::debug!(sql, "batch");
        match self {
            Backend::Sqlite(conn) => sqlite::batch(conn, sql),
            Backend::Postgres(client) => pg::batch(client, sql),
        }
    }
}

/// An open connection plus the dialect selected for it.
///
/// Access to the engine is serialised internally, so a `Database` can be
/// shared by reference. Callers remain responsible for transaction isolation.
///
/// While a [`Transaction`] is open, other threads wait for it to finish. The
/// thread that opened it gets [`Error::Unsupported`] from this handle instead
/// of waiting on itself; it should go through the transaction.
pub struct Database {
    dialect: Dialect,
    backend: Mutex<Backend>,
    tx_owner: Mutex<Option<ThreadId>>,
}

impl Database {
    /// Open the engine named by `config.driver_name` and check it is alive.
    pub fn connect(config: &Config) -> Result<Self> {
        let dialect = Dialect::from_driver(&config.driver_name)?;
        if config.encrypt_at_rest {
            tracing::warn!("encryption at rest is not implemented; opening unencrypted");
        }

        let backend = match dialect {
            Dialect::Sqlite => Backend::Sqlite(sqlite::connect(config)?),
            Dialect::Postgres => Backend::Postgres(pg::connect(config)?),
        };
        tracing::info!(driver = %config.driver_name, ?dialect, "database connected");

        Ok(Self {
            dialect,
            backend: Mutex::new(backend),
            tx_owner: Mutex::new(None),
        })
    }

    /// Private in-memory SQLite database.
    pub fn open_in_memory() -> Result<Self> {
        Self::connect(&Config::sqlite(":memory:"))
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn placeholder(&self, index: usize) -> String {
        self.dialect.placeholder(index)
    }

    pub fn create_table_sql<M: Model>(&self) -> Result<String> {
        self.dialect.create_table_sql::<M>()
    }

    /// Create the table for `M` if it does not exist yet.
    pub fn create_table<M: Model>(&self) -> Result<()> {
        let sql = self
            .create_table_sql::<M>()
            .map_err(|e| e.context("create table"))?;
        self.lock()?
            .batch(&sql)
            .map_err(|e| e.context("failed to create table"))
    }

    pub fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.lock()?.query(sql, params)
    }

    /// First row of the result set, if any.
    pub fn query_row(&self, sql: &str, params: &[Value]) -> Result<Option<Row>> {
        Ok(self.query(sql, params)?.into_iter().next())
    }

    pub fn exec(&self, sql: &str, params: &[Value]) -> Result<ExecResult> {
        self.lock()?.exec(sql, params)
    }

    /// Run an INSERT and report the generated key of `primary_key`.
    ///
    /// SQLite reports the rowid natively. Postgres gets a `RETURNING` clause
    /// and a synthetic result; without a primary key it is a plain exec.
    pub fn exec_insert(
        &self,
        sql: &str,
        params: &[Value],
        primary_key: Option<&str>,
    ) -> Result<ExecResult> {
        let mut backend = self.lock()?;
        match (self.dialect, primary_key) {
            (Dialect::Postgres, Some(pk)) => {
                let returning = format!("{sql} RETURNING {pk}");
                let row = backend
                    .query(&returning, params)?
                    .into_iter()
                    .next()
                    .ok_or_else(|| {
                        Error::execution(
                            "failed to scan inserted id",
                            format!("insert returned no {pk} value"),
                        )
                    })?;
                let id: i64 = row
                    .get(0)
                    .map_err(|e| e.context("failed to scan inserted id"))?;
                Ok(ExecResult::synthetic(id))
            }
            _ => backend.exec(sql, params),
        }
    }

    /// Start a transaction. It must be finished with [`Transaction::commit`]
    /// or [`Transaction::rollback`]; dropping it rolls back.
    ///
    /// The transaction holds the connection until it finishes, so use its own
    /// `exec`/`query` methods rather than this handle in the meantime.
    pub fn begin_tx(&self) -> Result<Transaction<'_>> {
        let mut backend = self.lock()?;
        backend
            .batch("BEGIN")
            .map_err(|e| e.context("failed to begin transaction"))?;
        *self.owner() = Some(thread::current().id());
        Ok(Transaction {
            backend,
            owner: &self.tx_owner,
            finished: false,
        })
    }

    /// Release the connection.
    pub fn close(self) -> Result<()> {
        let backend = self
            .backend
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match backend {
            Backend::Sqlite(conn) => sqlite::close(conn),
            Backend::Postgres(client) => pg::close(client),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Backend>> {
        match self.backend.try_lock() {
            Ok(backend) => return Ok(backend),
            Err(TryLockError::Poisoned(poisoned)) => return Ok(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => {}
        }
        if *self.owner() == Some(thread::current().id()) {
            return Err(Error::Unsupported(
                "connection is held by an open transaction on this thread".to_string(),
            ));
        }
        Ok(self.backend.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn owner(&self) -> MutexGuard<'_, Option<ThreadId>> {
        self.tx_owner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// An open transaction on a [`Database`].
pub struct Transaction<'db> {
    backend: MutexGuard<'db, Backend>,
    owner: &'db Mutex<Option<ThreadId>>,
    finished: bool,
}

impl Transaction<'_> {
    pub fn exec(&mut self, sql: &str, params: &[Value]) -> Result<ExecResult> {
        self.backend.exec(sql, params)
    }

    pub fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.backend.query(sql, params)
    }

    pub fn query_row(&mut self, sql: &str, params: &[Value]) -> Result<Option<Row>> {
        Ok(self.query(sql, params)?.into_iter().next())
    }

    pub fn commit(mut self) -> Result<()> {
        self.finished = true;
        self.backend
            .batch("COMMIT")
            .map_err(|e| e.context("failed to commit transaction"))
    }

    pub fn rollback(mut self) -> Result<()> {
        self.finished = true;
        self.backend
            .batch("ROLLBACK")
            .map_err(|e| e.context("failed to roll back transaction"))
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.finished {
            tracing::warn!("transaction dropped without commit or rollback; rolling back");
            if let Err(e) = self.backend.batch("ROLLBACK") {
                tracing::warn!(error = %e, "rollback of dropped transaction failed");
            }
        }
        // Cleared before the connection guard is released
        *self.owner.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Field;

    fn column(name: &str, data_type: DataType, primary_key: bool) -> ColumnDefinition {
        ColumnDefinition {
            name: name.to_string(),
            data_type,
            primary_key,
            constraint: None,
        }
    }

    #[test]
    fn sqlite_placeholder_is_constant() {
        for index in [1, 2, 10, 99] {
            assert_eq!(Dialect::Sqlite.placeholder(index), "?");
        }
    }

    #[test]
    fn postgres_placeholder_is_numbered() {
        assert_eq!(Dialect::Postgres.placeholder(1), "$1");
        assert_eq!(Dialect::Postgres.placeholder(10), "$10");
    }

    #[test]
    fn primary_key_fragment_per_dialect() {
        let id = column("id", DataType::Integer, true);
        assert_eq!(Dialect::Sqlite.column_type(&id), "INTEGER PRIMARY KEY");
        assert_eq!(Dialect::Postgres.column_type(&id), "SERIAL PRIMARY KEY");

        let code = column("code", DataType::Text, true);
        assert_eq!(Dialect::Sqlite.column_type(&code), "TEXT PRIMARY KEY");
        assert_eq!(Dialect::Postgres.column_type(&code), "TEXT PRIMARY KEY");
    }

    #[test]
    fn real_type_differs_per_dialect() {
        let price = column("price", DataType::Real, false);
        assert_eq!(Dialect::Sqlite.column_type(&price), "REAL");
        assert_eq!(Dialect::Postgres.column_type(&price), "DOUBLE PRECISION");
    }

    #[test]
    fn blob_type_differs_per_dialect() {
        let data = column("data", DataType::Blob, false);
        assert_eq!(Dialect::Sqlite.column_type(&data), "BLOB");
        assert_eq!(Dialect::Postgres.column_type(&data), "BYTEA");
    }

    #[test]
    fn constraint_is_uppercased_verbatim() {
        let mut email = column("email", DataType::Text, false);
        email.constraint = Some("unique not null".to_string());
        assert_eq!(Dialect::Sqlite.column_sql(&email), "email TEXT UNIQUE NOT NULL");
    }

    #[test]
    fn driver_names_select_dialect() {
        assert_eq!(Dialect::from_driver("sqlite3").unwrap(), Dialect::Sqlite);
        assert_eq!(Dialect::from_driver("Postgres").unwrap(), Dialect::Postgres);
        assert_eq!(
            Dialect::from_driver("mysql").unwrap_err().kind(),
            crate::ErrorKind::Config
        );
    }

    #[test]
    fn exec_result_accessors_fail_independently() {
        let result = ExecResult::new(None, Some(3));
        assert_eq!(result.rows_affected().unwrap(), 3);
        assert_eq!(
            result.last_insert_id().unwrap_err().kind(),
            crate::ErrorKind::Unsupported
        );
        let synthetic = ExecResult::synthetic(42);
        assert_eq!(synthetic.last_insert_id().unwrap(), 42);
        assert_eq!(synthetic.rows_affected().unwrap(), 1);
    }

    #[test]
    fn row_lookup_by_name_ignores_case() {
        let row = Row::new(
            vec!["id".into(), "name".into()],
            vec![Value::Integer(3), Value::Text("ada".into())],
        );
        assert_eq!(row.get_by_name::<String>("NAME").unwrap(), "ada");
        assert_eq!(row.get::<i64>(0).unwrap(), 3);
        assert!(row.get::<i64>(5).is_err());
    }

    #[derive(Default)]
    struct Widget;

    impl Model for Widget {
        fn fields() -> Vec<Field> {
            vec![
                Field::new("id", DataType::Integer).primary_key(),
                Field::new("label", DataType::Text).constraint("not null"),
            ]
        }

        fn values(&self) -> Result<Vec<Value>> {
            Ok(vec![Value::Integer(0), Value::Text(String::new())])
        }

        fn assign(&mut self, _row: &mut crate::RowReader) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn create_table_sql_lists_columns_in_order() {
        assert_eq!(
            Dialect::Sqlite.create_table_sql::<Widget>().unwrap(),
            "CREATE TABLE IF NOT EXISTS widget (id INTEGER PRIMARY KEY, label TEXT NOT NULL)"
        );
        assert_eq!(
            Dialect::Postgres.create_table_sql::<Widget>().unwrap(),
            "CREATE TABLE IF NOT EXISTS widget (id SERIAL PRIMARY KEY, label TEXT NOT NULL)"
        );
    }
}
