//! Minimal model-to-table mapping over SQLite and PostgreSQL.
//!
//! # Intention
//!
//! - Derive table name, columns and primary key from a model description.
//! - Generate dialect-correct DDL and DML and bind rows back onto models.
//! - Offer repository-style CRUD plus raw query/exec/transaction passthrough.
//!
//! # Architectural Boundaries
//!
//! - No relationships, migrations, query builder or pooling policy.
//! - Nothing here retries; every failure goes back to the caller.
//!
//! ```ignore
//! use liteforge::{model, Config, Database, OrmRepository, Repository};
//!
//! model! {
//!     #[derive(Debug, Clone, Default, PartialEq)]
//!     pub struct Note {
//!         #[pk]
//!         pub id: i64,
//!         #[constraint = "not null"]
//!         pub body: String,
//!     }
//! }
//!
//! let db = Database::connect(&Config::sqlite("data/notes.db"))?;
//! db.create_table::<Note>()?;
//! let repo = OrmRepository::new(&db);
//! let id = repo.save(&Note { id: 0, body: "hello".into() })?.last_insert_id()?;
//! ```

mod macros;

pub mod adapter;
pub mod config;
pub mod datastore;
pub mod error;
pub mod repository;
pub mod schema;
pub mod value;

pub use adapter::{Database, Dialect, ExecResult, Row, Transaction};
pub use config::Config;
pub use datastore::{ApiDataStore, DataStore, OrmDataStore, User};
pub use error::{Error, ErrorKind, Result};
pub use repository::{OrmRepository, Repository, INVALID_FIND_TARGET};
pub use schema::{
    field_info, primary_key_column, primary_key_value, table_name, ColumnDefinition, DataType,
    Field, Model, RowReader, SqlField, TableDefinition,
};
pub use value::{FromValue, ToValue, Value};
