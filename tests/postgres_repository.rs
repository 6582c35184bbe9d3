// Runs against a live server only when LITEFORGE_POSTGRES_URL is set, e.g.
// LITEFORGE_POSTGRES_URL="host=localhost user=postgres password=postgres dbname=liteforge"

use anyhow::Result;
use liteforge::{model, Config, Database, Dialect, ErrorKind, Model, OrmRepository, Repository};

model! {
    #[derive(Debug, Clone, Default, PartialEq)]
    struct PgGadget {
        #[pk]
        id: i32,
        #[constraint = "not null"]
        label: String,
        weight: f64,
        in_stock: bool,
    }
}

model! {
    #[derive(Debug, Clone, Default, PartialEq)]
    struct PgSpring {
        #[pk]
        id: i64,
        label: String,
    }
}

model! {
    #[derive(Debug, Clone, Default, PartialEq)]
    struct PgBadge {
        #[pk]
        id: i64,
        #[constraint = "unique not null"]
        code: String,
        image: Vec<u8>,
    }
}

// Fresh table for `M` on the configured server, or None when no server is configured.
fn connect<M: Model>() -> Result<Option<Database>> {
    let Ok(url) = std::env::var("LITEFORGE_POSTGRES_URL") else {
        eprintln!("LITEFORGE_POSTGRES_URL not set; skipping postgres test");
        return Ok(None);
    };
    let db = Database::connect(&Config::postgres(url))?;
    assert_eq!(db.dialect(), Dialect::Postgres);
    db.exec(&format!("DROP TABLE IF EXISTS {}", M::table_name()), &[])?;
    db.create_table::<M>()?;
    Ok(Some(db))
}

#[test]
fn test_postgres_crud_cycle() -> Result<()> {
    let Some(db) = connect::<PgGadget>()? else {
        return Ok(());
    };
    let repo = OrmRepository::new(&db);

    let gadget = PgGadget {
        id: 0,
        label: "lever".to_string(),
        weight: 1.25,
        in_stock: true,
    };
    let result = repo.save(&gadget)?;
    let id = result.last_insert_id()?;
    assert!(id > 0);
    assert_eq!(result.rows_affected()?, 1);

    let mut found = PgGadget::default();
    repo.find_by_id(&mut found, id)?;
    assert_eq!(found, PgGadget { id: id as i32, ..gadget.clone() });

    let updated = PgGadget {
        weight: 2.5,
        ..found.clone()
    };
    assert_eq!(repo.save(&updated)?.rows_affected()?, 1);

    assert_eq!(repo.delete(&updated)?.rows_affected()?, 1);
    let err = repo.find_by_id(&mut PgGadget::default(), id).unwrap_err();
    assert!(err.is_not_found());

    // Executing the DDL again is harmless
    db.create_table::<PgGadget>()?;
    db.close()?;
    Ok(())
}

#[test]
fn test_postgres_plain_exec_has_no_insert_id() -> Result<()> {
    let Some(db) = connect::<PgSpring>()? else {
        return Ok(());
    };
    let result = db.exec("INSERT INTO pgspring (label) VALUES ($1)", &["coil".into()])?;
    assert_eq!(result.rows_affected()?, 1);
    assert!(result.last_insert_id().is_err());
    Ok(())
}

#[test]
fn test_postgres_errors_carry_server_message() -> Result<()> {
    let Some(db) = connect::<PgBadge>()? else {
        return Ok(());
    };
    let repo = OrmRepository::new(&db);

    let badge = PgBadge {
        id: 0,
        code: "gold".to_string(),
        image: vec![1, 2, 3],
    };
    let id = repo.save(&badge)?.last_insert_id()?;
    let mut found = PgBadge::default();
    repo.find_by_id(&mut found, id)?;
    assert_eq!(found.image, vec![1, 2, 3]);

    let err = repo.save(&badge).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Execution);
    assert!(
        err.to_string().contains("duplicate key value"),
        "unexpected message: {err}"
    );

    // A mismatched parameter fails on the client before reaching the server
    let err = db
        .exec("UPDATE pgbadge SET code = $1", &[liteforge::Value::Integer(1)])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Execution);
    Ok(())
}
