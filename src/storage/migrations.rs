/// Database schema migration management
///
/// Brings an on-disk store from any historical version up to the version
/// the running code expects. Every step is additive (new table, new
/// defaulted column) and individually idempotent: a step checks whether
/// its table/column already exists before creating it, so a crash
/// mid-migration is repaired by simply running again. The version marker
/// is persisted after each step, never before.

use rusqlite::{Connection, OptionalExtension};

use crate::storage::StorageError;

/// Schema version the running code expects
pub const CURRENT_VERSION: i32 = 3;

/// Bring the schema up to [`CURRENT_VERSION`]
///
/// Applies each pending version step in ascending order. On failure the
/// marker is left at the last fully-applied step and the error is fatal:
/// the repository must not serve reads or writes.
pub fn migrate(conn: &Connection) -> Result<(), StorageError> {
    ensure_version_table(conn)
        .map_err(|e| StorageError::Migration(format!("version table: {e}")))?;

    let from = current_version(conn)?;
    for version in (from + 1)..=CURRENT_VERSION {
        apply_step(conn, version)
            .map_err(|e| StorageError::Migration(format!("step v{version}: {e}")))?;
        set_version(conn, version)
            .map_err(|e| StorageError::Migration(format!("marker v{version}: {e}")))?;
        tracing::info!("applied schema migration to v{version}");
    }

    Ok(())
}

/// Read the persisted schema version marker
///
/// A brand-new store reports 0. A store written before version tracking
/// existed has a habits table but no marker; that is detected once and
/// reported as version 1 so the additive steps pick up from there.
pub fn current_version(conn: &Connection) -> Result<i32, StorageError> {
    let recorded: Option<i32> = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .optional()
        .map_err(|e| StorageError::Migration(format!("reading version marker: {e}")))?;

    if let Some(version) = recorded {
        return Ok(version);
    }

    // Legacy fallback: pre-marker databases already have the habits table
    let legacy = table_exists(conn, "habits")
        .map_err(|e| StorageError::Migration(format!("legacy detection: {e}")))?;
    Ok(if legacy { 1 } else { 0 })
}

fn ensure_version_table(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        )",
        [],
    )?;
    Ok(())
}

fn set_version(conn: &Connection, version: i32) -> Result<(), rusqlite::Error> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

fn apply_step(conn: &Connection, version: i32) -> Result<(), rusqlite::Error> {
    match version {
        1 => migration_v1(conn),
        2 => migration_v2(conn),
        3 => migration_v3(conn),
        other => Err(rusqlite::Error::InvalidParameterName(format!(
            "unknown schema version {other}"
        ))),
    }
}

/// v1: the habits table
fn migration_v1(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS habits (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            start_date TEXT NOT NULL,
            end_date TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;
    Ok(())
}

/// v2: reminder columns on habits
///
/// `reminder_time` stays nullable; rows written before v2 read back as
/// the 09:00 default.
fn migration_v2(conn: &Connection) -> Result<(), rusqlite::Error> {
    ensure_column(
        conn,
        "habits",
        "reminder_enabled",
        "INTEGER NOT NULL DEFAULT 0",
    )?;
    ensure_column(conn, "habits", "reminder_time", "TEXT")?;
    Ok(())
}

/// v3: the habit_tasks table, cascade-deleted with its owner
fn migration_v3(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS habit_tasks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            habit_id INTEGER NOT NULL,
            title TEXT NOT NULL,
            is_completed INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (habit_id) REFERENCES habits (id) ON DELETE CASCADE
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_habit_tasks_habit_created
         ON habit_tasks (habit_id, created_at)",
        [],
    )?;
    Ok(())
}

/// Add a column only if the table does not already have it
fn ensure_column(
    conn: &Connection,
    table: &str,
    column: &str,
    definition: &str,
) -> Result<(), rusqlite::Error> {
    if !column_exists(conn, table, column)? {
        let sql = format!("ALTER TABLE {table} ADD COLUMN {column} {definition}");
        conn.execute(&sql, [])?;
    }
    Ok(())
}

fn column_exists(conn: &Connection, table: &str, column: &str) -> Result<bool, rusqlite::Error> {
    let pragma = format!("PRAGMA table_info({table})");
    let mut stmt = conn.prepare(&pragma)?;
    let mut rows = stmt.query([])?;

    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name.eq_ignore_ascii_case(column) {
            return Ok(true);
        }
    }

    Ok(false)
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool, rusqlite::Error> {
    conn.query_row(
        "SELECT 1 FROM sqlite_master WHERE type='table' AND name=?1",
        [table],
        |_| Ok(true),
    )
    .optional()
    .map(|found| found.unwrap_or(false))
}
