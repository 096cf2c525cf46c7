//! Forward-only migrations keyed on `schema_meta.schema_version`.
//!
//! Steps live in [`MIGRATIONS`], ordered by the version they produce. Each
//! step and its version bump commit together or not at all.

use rusqlite::{Connection, OptionalExtension};

use crate::embedding::local::DEFAULT_MODEL;

struct Migration {
    to: u32,
    name: &'static str,
    apply: fn(&Connection) -> rusqlite::Result<()>,
}

const MIGRATIONS: &[Migration] = &[Migration {
    to: 2,
    name: "record embedding model",
    apply: record_embedding_model,
}];

/// Version a fully migrated database reports.
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

fn get_meta(conn: &Connection, key: &str) -> rusqlite::Result<Option<String>> {
    conn.query_row("SELECT value FROM schema_meta WHERE key = ?1", [key], |row| {
        row.get(0)
    })
    .optional()
}

fn set_meta(conn: &Connection, key: &str, value: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO schema_meta (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        [key, value],
    )?;
    Ok(())
}

/// Schema version stored in the database. Unparseable values read as 0.
pub fn get_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    Ok(get_meta(conn, "schema_version")?
        .and_then(|v| v.parse().ok())
        .unwrap_or(0))
}

/// Model that produced the stored vectors, once recorded.
pub fn get_embedding_model(conn: &Connection) -> rusqlite::Result<Option<String>> {
    get_meta(conn, "embedding_model")
}

pub fn set_embedding_model(conn: &Connection, model: &str) -> rusqlite::Result<()> {
    set_meta(conn, "embedding_model", model)
}

/// Apply every step newer than the stored version.
pub fn run_migrations(conn: &Connection) -> rusqlite::Result<()> {
    let current = get_schema_version(conn)?;
    let pending = MIGRATIONS.iter().filter(|m| m.to > current);

    for step in pending {
        tracing::info!(to = step.to, name = step.name, "applying migration");
        let tx = conn.unchecked_transaction()?;
        (step.apply)(&tx)?;
        set_meta(&tx, "schema_version", &step.to.to_string())?;
        tx.commit()?;
    }

    Ok(())
}

fn record_embedding_model(conn: &Connection) -> rusqlite::Result<()> {
    if get_embedding_model(conn)?.is_none() {
        set_embedding_model(conn, DEFAULT_MODEL)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v1_db() -> Connection {
        crate::db::load_sqlite_vec();
        let conn = Connection::open_in_memory().unwrap();
        crate::db::schema::init_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn steps_are_ordered_and_end_at_current() {
        assert!(MIGRATIONS.windows(2).all(|w| w[0].to < w[1].to));
        assert_eq!(MIGRATIONS.last().map(|m| m.to), Some(CURRENT_SCHEMA_VERSION));
    }

    #[test]
    fn upgrade_records_the_default_model() {
        let conn = v1_db();
        assert_eq!(get_schema_version(&conn).unwrap(), 1);
        assert!(get_embedding_model(&conn).unwrap().is_none());

        run_migrations(&conn).unwrap();

        assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);
        assert_eq!(get_embedding_model(&conn).unwrap().as_deref(), Some(DEFAULT_MODEL));
    }

    #[test]
    fn upgrade_keeps_an_already_recorded_model() {
        let conn = v1_db();
        set_embedding_model(&conn, "custom-model").unwrap();
        run_migrations(&conn).unwrap();
        assert_eq!(get_embedding_model(&conn).unwrap().as_deref(), Some("custom-model"));
    }

    #[test]
    fn rerunning_is_a_no_op() {
        let conn = v1_db();
        run_migrations(&conn).unwrap();
        set_embedding_model(&conn, "after-re-embed").unwrap();
        run_migrations(&conn).unwrap();

        assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);
        assert_eq!(get_embedding_model(&conn).unwrap().as_deref(), Some("after-re-embed"));
    }

    #[test]
    fn garbage_version_reads_as_zero() {
        let conn = v1_db();
        set_meta(&conn, "schema_version", "not-a-number").unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), 0);
    }
}
