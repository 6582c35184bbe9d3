//! Model-centric CRUD over a [`Database`].
//!
//! Statements are built from the cached [`TableDefinition`] of the model
//! type and parameterised with the connection's dialect placeholders.

use crate::adapter::{Database, ExecResult};
use crate::error::{Error, Result, ResultExt};
use crate::schema::{Model, RowReader, TableDefinition};
use crate::value::Value;

/// Message of the error returned when a lookup target is not a record.
pub const INVALID_FIND_TARGET: &str = "model must be a non-nil pointer to a struct";

pub trait Repository {
    /// Insert when the primary key holds its zero value (or there is no
    /// primary key), update otherwise. A record whose natural key is zero
    /// can only be written with [`Repository::insert`].
    fn save<M: Model>(&self, model: &M) -> Result<ExecResult>;

    /// Insert `model`, leaving the primary key to the database.
    fn insert<M: Model>(&self, model: &M) -> Result<ExecResult>;

    /// Load the row with primary key `id` into `model`. On failure `model`
    /// is left as it was.
    fn find_by_id<M: Model>(&self, model: &mut M, id: impl Into<Value>) -> Result<()>;

    /// Update every non-key column of the row identified by the model's
    /// primary key. Matching nothing is not an error.
    fn update<M: Model>(&self, model: &M) -> Result<ExecResult>;

    /// Delete the row identified by the model's primary key. Matching
    /// nothing is not an error.
    fn delete<M: Model>(&self, model: &M) -> Result<ExecResult>;
}

/// [`Repository`] backed by a borrowed [`Database`].
#[derive(Clone, Copy)]
pub struct OrmRepository<'db> {
    db: &'db Database,
}

impl<'db> OrmRepository<'db> {
    pub fn new(db: &'db Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &'db Database {
        self.db
    }

    fn placeholders(&self, count: usize) -> Vec<String> {
        (1..=count).map(|i| self.db.placeholder(i)).collect()
    }
}

impl Repository for OrmRepository<'_> {
    fn save<M: Model>(&self, model: &M) -> Result<ExecResult> {
        let table = TableDefinition::of::<M>().context("save")?;
        let Some(pk) = table.primary_key else {
            return self.insert(model);
        };

        let values = table.values_of(model).context("save")?;
        if values[pk].is_zero() {
            self.insert(model)
        } else {
            self.update(model)
        }
    }

    fn insert<M: Model>(&self, model: &M) -> Result<ExecResult> {
        let table = TableDefinition::of::<M>().context("insert")?;
        let values = table.values_of(model).context("insert")?;

        let (columns, params): (Vec<&str>, Vec<Value>) = table
            .columns
            .iter()
            .zip(values)
            .filter(|(column, _)| !column.primary_key)
            .map(|(column, value)| (column.name.as_str(), value))
            .unzip();
        let pk = table
            .primary_key
            .map(|i| table.columns[i].name.as_str());

        let sql = if columns.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", table.name)
        } else {
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                table.name,
                columns.join(", "),
                self.placeholders(columns.len()).join(", ")
            )
        };
        self.db.exec_insert(&sql, &params, pk).context("insert")
    }

    fn find_by_id<M: Model>(&self, model: &mut M, id: impl Into<Value>) -> Result<()> {
        let table = TableDefinition::of::<M>().map_err(|e| match e {
            Error::InvalidModel(_) => Error::InvalidModel(INVALID_FIND_TARGET.to_string()),
            other => other,
        })?;
        let pk = table.primary_key_column().context("find_by_id")?;
        let columns = table.column_names();
        let id = id.into();

        let sql = format!(
            "SELECT {} FROM {} WHERE {} = {}",
            columns.join(", "),
            table.name,
            pk.name,
            self.db.placeholder(1)
        );
        let Some(row) = self.db.query_row(&sql, &[id.clone()]).context("find_by_id")? else {
            return Err(
                Error::NotFound(format!("{} with {} = {:?}", table.name, pk.name, id))
                    .context("find_by_id"),
            );
        };

        if row.len() != columns.len() {
            return Err(Error::InvalidModel(format!(
                "expected {} columns from {}, got {}",
                columns.len(),
                table.name,
                row.len()
            ))
            .context("find_by_id"));
        }

        let mut loaded = M::default();
        let mut reader = RowReader::new(columns, row.into_values());
        loaded
            .assign(&mut reader)
            .context("failed to scan row into model")?;
        *model = loaded;
        Ok(())
    }

    fn update<M: Model>(&self, model: &M) -> Result<ExecResult> {
        let table = TableDefinition::of::<M>().context("update")?;
        let pk = table.primary_key_column().context("update")?;
        let mut values = table.values_of(model).context("update")?;
        let pk_value = values[table.primary_key_index()?].clone();

        let mut set_clauses = Vec::with_capacity(table.columns.len());
        let mut params = Vec::with_capacity(table.columns.len());
        for (column, value) in table.columns.iter().zip(values.drain(..)) {
            if column.primary_key {
                continue;
            }
            params.push(value);
            set_clauses.push(format!("{} = {}", column.name, self.db.placeholder(params.len())));
        }
        if set_clauses.is_empty() {
            return Err(Error::InvalidModel("no fields to update".to_string()).context("update"));
        }
        params.push(pk_value);

        let sql = format!(
            "UPDATE {} SET {} WHERE {} = {}",
            table.name,
            set_clauses.join(", "),
            pk.name,
            self.db.placeholder(params.len())
        );
        self.db.exec(&sql, &params).context("update")
    }

    fn delete<M: Model>(&self, model: &M) -> Result<ExecResult> {
        let table = TableDefinition::of::<M>().context("delete")?;
        let pk = table.primary_key_column().context("delete")?;
        let mut values = table.values_of(model).context("delete")?;
        let pk_value = values.swap_remove(table.primary_key_index()?);

        let sql = format!(
            "DELETE FROM {} WHERE {} = {}",
            table.name,
            pk.name,
            self.db.placeholder(1)
        );
        self.db.exec(&sql, &[pk_value]).context("delete")
    }
}
