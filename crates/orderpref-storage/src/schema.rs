use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;
use tracing::{debug, info};

/// Table holding one preference row per user.
pub const TABLE: &str = "glpi_plugin_order_preferences";

const USERS_ID_INDEX: &str = "glpi_plugin_order_preferences_users_id";

/// Failures while installing or removing the preference table. These are
/// fatal for the operator running the command.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("connection lock poisoned: {reason}")]
    Lock { reason: String },
}

/// Create the table on first install, or bring an existing one up to date.
pub fn install(conn: &Connection) -> Result<(), SchemaError> {
    if !table_exists(conn, TABLE)? {
        info!(table = TABLE, "installing table");
        conn.execute_batch(&format!(
            "CREATE TABLE {TABLE} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                users_id INTEGER NOT NULL DEFAULT 0,
                template VARCHAR(255) DEFAULT NULL,
                sign VARCHAR(255) DEFAULT NULL
            );
            CREATE INDEX {USERS_ID_INDEX} ON {TABLE} (users_id);"
        ))?;
        return Ok(());
    }
    upgrade(conn)
}

/// Drop the table and everything in it.
pub fn uninstall(conn: &Connection) -> Result<(), SchemaError> {
    info!(table = TABLE, "dropping table");
    conn.execute_batch(&format!("DROP TABLE IF EXISTS {TABLE};"))?;
    Ok(())
}

/// Rename legacy `ID`/`user_id` columns and make sure the user index exists.
fn upgrade(conn: &Connection) -> Result<(), SchemaError> {
    let columns = column_names(conn, TABLE)?;

    // Column names compare case-insensitively in SQLite; hop through a
    // temporary name so the stored spelling actually changes.
    if columns.iter().any(|c| c == "ID") {
        debug!(table = TABLE, "renaming legacy ID column");
        conn.execute_batch(&format!(
            "ALTER TABLE {TABLE} RENAME COLUMN ID TO id_legacy;
             ALTER TABLE {TABLE} RENAME COLUMN id_legacy TO id;"
        ))?;
    }
    if columns.iter().any(|c| c == "user_id") && !columns.iter().any(|c| c == "users_id") {
        debug!(table = TABLE, "renaming legacy user_id column");
        conn.execute_batch(&format!(
            "ALTER TABLE {TABLE} RENAME COLUMN user_id TO users_id;"
        ))?;
    }
    conn.execute_batch(&format!(
        "CREATE INDEX IF NOT EXISTS {USERS_ID_INDEX} ON {TABLE} (users_id);"
    ))?;
    Ok(())
}

pub fn table_exists(conn: &Connection, name: &str) -> Result<bool, SchemaError> {
    let found = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1 LIMIT 1",
            params![name],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Column names of `table` in declaration order.
pub fn column_names(conn: &Connection, table: &str) -> Result<Vec<String>, SchemaError> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(1))?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}
