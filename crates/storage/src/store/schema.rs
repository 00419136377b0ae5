#![forbid(unsafe_code)]

use super::StoreError;
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::BTreeSet;

const SCHEMA_VERSION: i64 = 1;

const REQUIRED_TABLES: [&str; 4] = ["census_state", "users", "crops", "family_members"];

/// Refuses to open a database that was not created by this schema version.
pub(crate) fn preflight_gate(conn: &Connection) -> Result<(), StoreError> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
    )?;
    let mut rows = stmt.query([])?;
    let mut tables = BTreeSet::new();
    while let Some(row) = rows.next()? {
        tables.insert(row.get::<_, String>(0)?);
    }

    if tables.is_empty() {
        return Ok(());
    }

    let required: BTreeSet<&str> = REQUIRED_TABLES.into_iter().collect();

    if tables
        .iter()
        .any(|table| !required.contains(table.as_str()))
    {
        return Err(StoreError::InvalidInput(
            "RESET_REQUIRED: unsupported tables detected",
        ));
    }

    for table in required {
        if !tables.contains(table) {
            return Err(StoreError::InvalidInput(
                "RESET_REQUIRED: required table is missing",
            ));
        }
    }

    let version = conn
        .query_row(
            "SELECT schema_version FROM census_state WHERE singleton=1",
            [],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;

    match version {
        Some(v) if v == SCHEMA_VERSION => Ok(()),
        Some(_) => Err(StoreError::InvalidInput(
            "RESET_REQUIRED: schema version mismatch",
        )),
        None => Err(StoreError::InvalidInput(
            "RESET_REQUIRED: schema state row is missing",
        )),
    }
}

pub(crate) fn install_schema(conn: &Connection, now_ms: i64) -> Result<(), StoreError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS census_state (
          singleton INTEGER PRIMARY KEY CHECK(singleton = 1),
          schema_version INTEGER NOT NULL,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS users (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          name TEXT NOT NULL,
          last_name TEXT NOT NULL,
          ci TEXT NOT NULL UNIQUE,
          date_of_birth TEXT NOT NULL,
          has_ruc INTEGER NOT NULL,
          ruc_number TEXT,
          gender TEXT NOT NULL,
          has_farm INTEGER NOT NULL,
          farm_ha REAL,
          farm_name TEXT,
          has_workers INTEGER NOT NULL,
          total_workers INTEGER,
          men_workers INTEGER,
          woman_workers INTEGER,
          over18_workers INTEGER,
          under18_workers INTEGER,
          minor_workers_occupation TEXT,
          has_pregnant_workers INTEGER NOT NULL,
          pregnant_workers INTEGER,
          pregnant_workers_occupation TEXT,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL,
          CHECK(has_ruc = 1 OR ruc_number IS NULL),
          CHECK(has_farm = 1 OR farm_name IS NULL)
        );

        CREATE TABLE IF NOT EXISTS crops (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
          crop_name TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_crops_user ON crops(user_id);

        CREATE TABLE IF NOT EXISTS family_members (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
          name TEXT NOT NULL,
          last_name TEXT NOT NULL,
          ci TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_family_members_user ON family_members(user_id);
        "#,
    )?;

    conn.execute(
        "INSERT INTO census_state(singleton, schema_version, created_at_ms, updated_at_ms) \
         VALUES (1, ?1, ?2, ?2) \
         ON CONFLICT(singleton) DO UPDATE SET schema_version=excluded.schema_version, updated_at_ms=excluded.updated_at_ms",
        params![SCHEMA_VERSION, now_ms],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_database_passes_the_gate_and_installs() {
        let conn = Connection::open_in_memory().expect("sqlite");
        preflight_gate(&conn).expect("empty db is accepted");
        install_schema(&conn, 1).expect("install");
        preflight_gate(&conn).expect("installed db is accepted");
        install_schema(&conn, 2).expect("install is idempotent");
    }

    #[test]
    fn foreign_tables_require_a_reset() {
        let conn = Connection::open_in_memory().expect("sqlite");
        conn.execute_batch("CREATE TABLE branches(name TEXT)")
            .expect("foreign table");
        let err = preflight_gate(&conn).expect_err("unknown table");
        assert_eq!(err.code(), "RESET_REQUIRED");
    }

    #[test]
    fn version_mismatch_requires_a_reset() {
        let conn = Connection::open_in_memory().expect("sqlite");
        install_schema(&conn, 1).expect("install");
        conn.execute("UPDATE census_state SET schema_version=99", [])
            .expect("bump version");
        let err = preflight_gate(&conn).expect_err("version mismatch");
        assert_eq!(err.code(), "RESET_REQUIRED");
    }
}
