use liteforge::{model, DataType, Dialect, Field, Model};

model! {
    #[derive(Debug, Clone, Default, PartialEq)]
    struct Customer {
        #[pk]
        id: i64,
        #[constraint = "unique not null"]
        username: String,
        #[constraint = "unique"]
        email: String,
        age: i32,
        is_active: bool,
    }
}

model! {
    #[derive(Debug, Clone, Default, PartialEq)]
    struct Reading {
        #[pk]
        code: String,
        celsius: f64,
    }
}

model! {
    #[derive(Debug, Clone, Default)]
    pub struct Document {
        /// Generated key.
        #[allow(dead_code)]
        #[pk]
        pub id: i64,
        #[constraint = "not null"]
        /// Raw bytes as uploaded.
        #[allow(unused)]
        pub body: Vec<u8>,
        #[cfg_attr(test, allow(dead_code))]
        pub pages: Option<u32>,
    }
}

fn normalize(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[test]
fn test_create_table_sql_sqlite() {
    let sql = Dialect::Sqlite.create_table_sql::<Customer>().unwrap();
    let expected = "CREATE TABLE IF NOT EXISTS customer (
        id INTEGER PRIMARY KEY,
        username TEXT UNIQUE NOT NULL,
        email TEXT UNIQUE,
        age INTEGER,
        is_active BOOLEAN
    )";
    assert_eq!(normalize(&sql), normalize(expected).replace("( ", "(").replace(" )", ")"));
}

#[test]
fn test_create_table_sql_postgres() {
    let sql = Dialect::Postgres.create_table_sql::<Customer>().unwrap();
    let expected = "CREATE TABLE IF NOT EXISTS customer (
        id SERIAL PRIMARY KEY,
        username TEXT UNIQUE NOT NULL,
        email TEXT UNIQUE,
        age INTEGER,
        is_active BOOLEAN
    )";
    assert_eq!(normalize(&sql), normalize(expected).replace("( ", "(").replace(" )", ")"));
}

#[test]
fn test_non_integer_primary_key_and_real_columns() {
    assert_eq!(
        Dialect::Sqlite.create_table_sql::<Reading>().unwrap(),
        "CREATE TABLE IF NOT EXISTS reading (code TEXT PRIMARY KEY, celsius REAL)"
    );
    assert_eq!(
        Dialect::Postgres.create_table_sql::<Reading>().unwrap(),
        "CREATE TABLE IF NOT EXISTS reading (code TEXT PRIMARY KEY, celsius DOUBLE PRECISION)"
    );
}

#[test]
fn test_placeholders() {
    for index in 1..=12 {
        assert_eq!(Dialect::Sqlite.placeholder(index), "?");
        assert_eq!(Dialect::Postgres.placeholder(index), format!("${index}"));
    }
}

#[test]
fn test_metadata_extraction() {
    let customer = Customer {
        id: 7,
        username: "u".into(),
        email: "e".into(),
        age: 40,
        is_active: true,
    };
    let (columns, values) = liteforge::field_info(&customer).unwrap();
    assert_eq!(columns, ["id", "username", "email", "age", "is_active"]);
    assert_eq!(values.len(), 5);
    assert_eq!(liteforge::table_name::<Customer>().unwrap(), "customer");
    assert_eq!(liteforge::primary_key_column::<Customer>().unwrap(), "id");
    assert_eq!(
        liteforge::primary_key_value(&customer).unwrap(),
        liteforge::Value::Integer(7)
    );
}

#[test]
fn test_field_attributes_mix_with_column_markers() {
    assert_eq!(
        Document::fields(),
        vec![
            Field::new("id", DataType::Integer).primary_key(),
            Field::new("body", DataType::Blob).constraint("not null"),
            Field::new("pages", DataType::Integer),
        ]
    );
    assert_eq!(
        Dialect::Postgres.create_table_sql::<Document>().unwrap(),
        "CREATE TABLE IF NOT EXISTS document (id SERIAL PRIMARY KEY, body BYTEA NOT NULL, pages INTEGER)"
    );
    assert_eq!(
        Dialect::Sqlite.create_table_sql::<Document>().unwrap(),
        "CREATE TABLE IF NOT EXISTS document (id INTEGER PRIMARY KEY, body BLOB NOT NULL, pages INTEGER)"
    );

    let doc = Document {
        id: 2,
        body: b"%PDF".to_vec(),
        pages: None,
    };
    assert_eq!(
        doc.values().unwrap(),
        vec![
            liteforge::Value::Integer(2),
            liteforge::Value::Blob(b"%PDF".to_vec()),
            liteforge::Value::Null,
        ]
    );
}
