//! Model metadata: table name, ordered columns, primary key.
//!
//! A model describes itself once through [`Model::fields`]; the resulting
//! [`TableDefinition`] is validated and cached per type. Column order is the
//! field declaration order and is the same for writes ([`Model::values`])
//! and reads ([`Model::assign`]).

use crate::error::{Error, Result};
use crate::value::{FromValue, Value};
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

/// Semantic type of a model field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Integer,
    Text,
    Real,
    Boolean,
    Blob,
}

/// Maps a Rust field type to its column type. Types without a more specific
/// mapping are stored as TEXT.
pub trait SqlField {
    const DATA_TYPE: DataType = DataType::Text;
}

macro_rules! sql_field {
    ($kind:ident: $($t:ty),*) => {
        $(
            impl SqlField for $t {
                const DATA_TYPE: DataType = DataType::$kind;
            }
        )*
    };
}

sql_field!(Integer: i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
sql_field!(Real: f32, f64);
sql_field!(Boolean: bool);
sql_field!(Text: String);
sql_field!(Blob: Vec<u8>);

impl<T: SqlField> SqlField for Option<T> {
    const DATA_TYPE: DataType = T::DATA_TYPE;
}

/// Declaration of one model field, in the model's field order.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub data_type: DataType,
    pub primary_key: bool,
    pub constraint: Option<String>,
}

impl Field {
    pub fn new(name: &str, data_type: DataType) -> Self {
        Self {
            name: name.to_string(),
            data_type,
            primary_key: false,
            constraint: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Column constraint text such as "unique not null". Emitted verbatim
    /// (uppercased) into CREATE TABLE.
    pub fn constraint(mut self, constraint: &str) -> Self {
        self.constraint = Some(constraint.to_string());
        self
    }
}

/// A record type mapped onto one table.
///
/// Usually implemented through [`crate::model!`].
pub trait Model: Default + 'static {
    /// Defaults to the lowercased type name without its module path.
    fn table_name() -> String {
        default_table_name(std::any::type_name::<Self>())
    }

    /// Fields in declaration order.
    fn fields() -> Vec<Field>;

    /// Current field contents, in the same order as [`Model::fields`].
    fn values(&self) -> Result<Vec<Value>>;

    /// Bind scanned values onto the fields, in the same order as [`Model::fields`].
    fn assign(&mut self, row: &mut RowReader) -> Result<()>;
}

fn default_table_name(type_name: &str) -> String {
    let without_generics = type_name.split('<').next().unwrap_or(type_name);
    without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics)
        .to_lowercase()
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub name: String,
    pub data_type: DataType,
    pub primary_key: bool,
    pub constraint: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableDefinition {
    pub name: String,
    pub columns: Vec<ColumnDefinition>,
    /// Index into `columns` of the primary key, if any.
    pub primary_key: Option<usize>,
}

static TABLES: OnceLock<RwLock<HashMap<TypeId, Arc<TableDefinition>>>> = OnceLock::new();

impl TableDefinition {
    /// Validated, cached definition for `M`.
    pub fn of<M: Model>() -> Result<Arc<TableDefinition>> {
        let cache = TABLES.get_or_init(Default::default);
        let key = TypeId::of::<M>();

        if let Some(table) = cache
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&key)
        {
            return Ok(Arc::clone(table));
        }

        let table = Arc::new(Self::describe::<M>()?);
        cache
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key, Arc::clone(&table));
        Ok(table)
    }

    fn describe<M: Model>() -> Result<TableDefinition> {
        let name = M::table_name();
        let fields = M::fields();
        if fields.is_empty() {
            return Err(Error::InvalidModel(format!(
                "{name} must be a struct with at least one field"
            )));
        }

        let mut keys = fields.iter().enumerate().filter(|(_, f)| f.primary_key);
        let primary_key = keys.next().map(|(i, _)| i);
        if keys.next().is_some() {
            tracing::warn!(
                table = %name,
                "model marks more than one primary key; using the first"
            );
        }

        // Only the winning key keeps its flag
        let columns: Vec<ColumnDefinition> = fields
            .into_iter()
            .enumerate()
            .map(|(i, f)| ColumnDefinition {
                name: f.name.to_lowercase(),
                data_type: f.data_type,
                primary_key: primary_key == Some(i),
                constraint: f.constraint.filter(|c| !c.trim().is_empty()),
            })
            .collect();

        Ok(TableDefinition {
            name,
            columns,
            primary_key,
        })
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn primary_key_index(&self) -> Result<usize> {
        self.primary_key
            .ok_or_else(|| Error::NoPrimaryKey(self.name.clone()))
    }

    pub fn primary_key_column(&self) -> Result<&ColumnDefinition> {
        Ok(&self.columns[self.primary_key_index()?])
    }

    /// Current values of `model`, checked against the column count.
    pub fn values_of<M: Model>(&self, model: &M) -> Result<Vec<Value>> {
        let values = model.values()?;
        if values.len() != self.columns.len() {
            return Err(Error::InvalidModel(format!(
                "{} declares {} columns but produced {} values",
                self.name,
                self.columns.len(),
                values.len()
            )));
        }
        Ok(values)
    }
}

/// Lowercased type name of `M`, or its override.
pub fn table_name<M: Model>() -> Result<String> {
    Ok(TableDefinition::of::<M>()?.name.clone())
}

/// Column names and current values of `model`, in declaration order.
pub fn field_info<M: Model>(model: &M) -> Result<(Vec<String>, Vec<Value>)> {
    let table = TableDefinition::of::<M>()?;
    let values = table.values_of(model)?;
    Ok((table.column_names(), values))
}

pub fn primary_key_column<M: Model>() -> Result<String> {
    let table = TableDefinition::of::<M>()?;
    let column = table.primary_key_column()?;
    Ok(column.name.clone())
}

pub fn primary_key_value<M: Model>(model: &M) -> Result<Value> {
    let table = TableDefinition::of::<M>()?;
    let index = table.primary_key_index()?;
    let mut values = table.values_of(model)?;
    Ok(values.swap_remove(index))
}

/// Positional reader handed to [`Model::assign`].
pub struct RowReader {
    columns: Vec<String>,
    values: std::vec::IntoIter<Value>,
    position: usize,
}

impl RowReader {
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        Self {
            columns,
            values: values.into_iter(),
            position: 0,
        }
    }

    /// Take the next column value and convert it to the field type.
    pub fn next<T: FromValue>(&mut self) -> Result<T> {
        let position = self.position;
        let column = self
            .columns
            .get(position)
            .cloned()
            .unwrap_or_else(|| format!("#{position}"));
        let value = self.values.next().ok_or_else(|| {
            Error::InvalidModel(format!("row has no value for column {column}"))
        })?;
        self.position += 1;
        T::from_value(value).map_err(|e| e.context(format!("column {column}")))
    }
}
