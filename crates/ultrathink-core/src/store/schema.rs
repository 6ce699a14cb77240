//! SQLite schema DDL and migrations for the version tracking database.

use rusqlite::Connection;

use crate::errors::UltrathinkResult;

/// Current schema version. Migrations run from whatever the DB currently
/// reports up to this value.
pub const SCHEMA_VERSION: i32 = 1;

/// Core DDL: 4 CREATE TABLE + 5 CREATE INDEX, all replay-safe.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    // ── tables (4) ──────────────────────────────────────────────────────
    "CREATE TABLE IF NOT EXISTS tracker_meta (
        key TEXT PRIMARY KEY,
        value TEXT
    );",
    "CREATE TABLE IF NOT EXISTS versions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        version_string TEXT UNIQUE NOT NULL,
        major INTEGER NOT NULL,
        minor INTEGER NOT NULL,
        patch INTEGER NOT NULL,
        pre_release TEXT,
        build_metadata TEXT,
        created_timestamp TEXT NOT NULL,
        snapshot_file TEXT,
        is_current BOOLEAN NOT NULL DEFAULT FALSE,
        notes TEXT
    );",
    "CREATE TABLE IF NOT EXISTS version_changes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        from_version_id INTEGER REFERENCES versions(id),
        to_version_id INTEGER NOT NULL REFERENCES versions(id),
        change_type TEXT NOT NULL,
        element_name TEXT NOT NULL,
        severity TEXT NOT NULL,
        description TEXT,
        created_timestamp TEXT NOT NULL
    );",
    "CREATE TABLE IF NOT EXISTS deprecations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        element_name TEXT NOT NULL,
        deprecated_in_version_id INTEGER NOT NULL REFERENCES versions(id),
        removal_target_version_id INTEGER REFERENCES versions(id),
        reason TEXT,
        alternative TEXT,
        created_timestamp TEXT NOT NULL
    );",
    // ── indexes (5) ─────────────────────────────────────────────────────
    "CREATE INDEX IF NOT EXISTS idx_versions_string ON versions(version_string);",
    "CREATE INDEX IF NOT EXISTS idx_changes_to_version ON version_changes(to_version_id);",
    "CREATE INDEX IF NOT EXISTS idx_deprecations_element ON deprecations(element_name);",
    "CREATE INDEX IF NOT EXISTS idx_changes_version_pair \
     ON version_changes(from_version_id, to_version_id);",
    "CREATE INDEX IF NOT EXISTS idx_versions_current ON versions(is_current);",
];

// ─── Migration framework ────────────────────────────────────────────────────

/// Run pending migrations up to [`SCHEMA_VERSION`], one SAVEPOINT per step.
pub fn migrate_schema(conn: &Connection) -> UltrathinkResult<()> {
    let mut current_version = get_schema_version(conn);

    while current_version < SCHEMA_VERSION {
        let next_version = current_version + 1;
        conn.execute_batch("SAVEPOINT ultrathink_migrate_step;")?;

        let step_result = (|| -> UltrathinkResult<()> {
            match next_version {
                1 => migrate_to_v1(conn)?,
                _ => {}
            }
            set_schema_version(conn, next_version)?;
            conn.execute_batch("RELEASE SAVEPOINT ultrathink_migrate_step;")?;
            Ok(())
        })();

        match step_result {
            Ok(()) => current_version = next_version,
            Err(e) => {
                let _ = conn.execute_batch("ROLLBACK TO SAVEPOINT ultrathink_migrate_step;");
                let _ = conn.execute_batch("RELEASE SAVEPOINT ultrathink_migrate_step;");
                return Err(e);
            }
        }
    }

    Ok(())
}

/// Stored schema version, 0 when absent or unparseable.
pub(crate) fn get_schema_version(conn: &Connection) -> i32 {
    let result: Result<String, _> = conn.query_row(
        "SELECT value FROM tracker_meta WHERE key = 'schema_version';",
        [],
        |row| row.get(0),
    );
    match result {
        Ok(v) => v.parse::<i32>().unwrap_or(0),
        Err(_) => 0,
    }
}

fn set_schema_version(conn: &Connection, version: i32) -> UltrathinkResult<()> {
    conn.execute(
        "INSERT INTO tracker_meta(key, value) \
         VALUES('schema_version', ?1) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value;",
        rusqlite::params![version.to_string()],
    )?;
    Ok(())
}

// ─── Individual migration steps ─────────────────────────────────────────────

/// v0 -> v1: every table and index in [`SCHEMA_STATEMENTS`].
fn migrate_to_v1(conn: &Connection) -> UltrathinkResult<()> {
    for stmt in SCHEMA_STATEMENTS {
        conn.execute_batch(stmt)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        conn
    }

    fn count(conn: &Connection, kind: &str) -> i64 {
        conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = ?1 AND name NOT LIKE 'sqlite_%';",
            [kind],
            |row| row.get(0),
        )
        .unwrap()
    }

    #[test]
    fn schema_statement_counts() {
        assert_eq!(SCHEMA_STATEMENTS.len(), 9);
    }

    #[test]
    fn migrate_fresh_database() {
        let conn = fresh();
        assert_eq!(get_schema_version(&conn), 0);
        migrate_schema(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), 1);
        assert_eq!(count(&conn, "table"), 4);
        assert_eq!(count(&conn, "index"), 5);
    }

    #[test]
    fn migrate_idempotent() {
        let conn = fresh();
        migrate_schema(&conn).unwrap();
        migrate_schema(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), SCHEMA_VERSION);

        assert_eq!(count(&conn, "index"), 5);
    }
}
