use std::{
    path::Path,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use orderpref_core::preferences::{
    PreferenceError, PreferenceField, PreferenceId, PreferenceRecord, PreferenceRepository, UserId,
};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use tracing::{debug, instrument};

use crate::schema::{self, SchemaError, TABLE};

/// Preference repository backed by a SQLite database file.
pub struct SqlitePreferenceRepo {
    conn: Mutex<Connection>,
}

impl SqlitePreferenceRepo {
    /// Open (or create) the database at `path` and install the table.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        debug!(?path, "opening preference database");
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn in_memory() -> Result<Self, SchemaError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, SchemaError> {
        schema::install(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open the database without touching the schema.
    pub fn open_uninstalled(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        Ok(Self {
            conn: Mutex::new(Connection::open(path)?),
        })
    }

    pub fn install(&self) -> Result<(), SchemaError> {
        let conn = self.conn.lock().map_err(|err| poisoned_schema(&err))?;
        schema::install(&conn)
    }

    pub fn uninstall(&self) -> Result<(), SchemaError> {
        let conn = self.conn.lock().map_err(|err| poisoned_schema(&err))?;
        schema::uninstall(&conn)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, PreferenceError> {
        self.conn.lock().map_err(|err| PreferenceError::Storage {
            reason: format!("lock poisoned: {err}"),
        })
    }
}

#[async_trait]
impl PreferenceRepository for SqlitePreferenceRepo {
    // Lookup and insert share one immediate transaction, which takes the
    // database write lock up front; concurrent callers cannot both insert.
    #[instrument(skip(self))]
    async fn ensure_exists(&self, user_id: UserId) -> Result<PreferenceId, PreferenceError> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(storage_err)?;

        let existing: Option<i64> = tx
            .query_row(
                &format!("SELECT id FROM {TABLE} WHERE users_id = ?1 ORDER BY id ASC LIMIT 1"),
                params![user_id.0],
                |row| row.get(0),
            )
            .optional()
            .map_err(storage_err)?;

        let id = match existing {
            Some(id) => id,
            None => {
                tx.execute(
                    &format!("INSERT INTO {TABLE} (users_id, template, sign) VALUES (?1, '', '')"),
                    params![user_id.0],
                )
                .map_err(storage_err)?;
                let id = tx.last_insert_rowid();
                debug!(%user_id, id, "created default preference");
                id
            }
        };
        tx.commit().map_err(storage_err)?;
        Ok(PreferenceId(id))
    }

    #[instrument(skip(self))]
    async fn get_field(
        &self,
        field: PreferenceField,
        user_id: UserId,
    ) -> Result<String, PreferenceError> {
        let conn = self.lock()?;
        let value: Option<Option<String>> = conn
            .query_row(
                &format!(
                    "SELECT {} FROM {TABLE} WHERE users_id = ?1 ORDER BY id ASC LIMIT 1",
                    field.column()
                ),
                params![user_id.0],
                |row| row.get(0),
            )
            .optional()
            .map_err(storage_err)?;
        Ok(value.flatten().unwrap_or_default())
    }

    #[instrument(skip(self))]
    async fn update(&self, record: &PreferenceRecord) -> Result<(), PreferenceError> {
        // SQLite ignores the VARCHAR(255) length, so enforce it here.
        record.validate()?;
        let conn = self.lock()?;
        let changed = conn
            .execute(
                &format!("UPDATE {TABLE} SET template = ?1, sign = ?2 WHERE id = ?3"),
                params![record.template, record.signature, record.id.0],
            )
            .map_err(storage_err)?;
        if changed == 0 {
            return Err(PreferenceError::NotFound { id: record.id });
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_by_user(
        &self,
        user_id: UserId,
    ) -> Result<Option<PreferenceRecord>, PreferenceError> {
        let conn = self.lock()?;
        conn.query_row(
            &format!(
                "SELECT id, users_id, template, sign FROM {TABLE}
                 WHERE users_id = ?1 ORDER BY id ASC LIMIT 1"
            ),
            params![user_id.0],
            map_row,
        )
        .optional()
        .map_err(storage_err)
    }

    #[instrument(skip(self))]
    async fn get(&self, id: PreferenceId) -> Result<Option<PreferenceRecord>, PreferenceError> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT id, users_id, template, sign FROM {TABLE} WHERE id = ?1"),
            params![id.0],
            map_row,
        )
        .optional()
        .map_err(storage_err)
    }
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<PreferenceRecord> {
    Ok(PreferenceRecord {
        id: PreferenceId(row.get(0)?),
        user_id: UserId(row.get(1)?),
        template: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        signature: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
    })
}

fn storage_err<E: ToString>(err: E) -> PreferenceError {
    PreferenceError::Storage {
        reason: err.to_string(),
    }
}

fn poisoned_schema<E: ToString>(err: &E) -> SchemaError {
    SchemaError::Lock {
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ensure_exists_is_get_or_create() {
        let repo = SqlitePreferenceRepo::in_memory().expect("repo");
        let first = repo.ensure_exists(UserId(11)).await.expect("create");
        let again = repo.ensure_exists(UserId(11)).await.expect("lookup");
        let other = repo.ensure_exists(UserId(12)).await.expect("create other");
        assert_eq!(first, again);
        assert_ne!(first, other);

        let count: i64 = repo
            .lock()
            .expect("lock")
            .query_row(
                &format!("SELECT COUNT(*) FROM {TABLE} WHERE users_id = 11"),
                [],
                |row| row.get(0),
            )
            .expect("count");
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn fresh_record_has_empty_fields() {
        let repo = SqlitePreferenceRepo::in_memory().expect("repo");
        repo.ensure_exists(UserId(1)).await.expect("create");
        let template = repo
            .get_field(PreferenceField::Template, UserId(1))
            .await
            .expect("template");
        assert_eq!(template, "");
    }

    #[tokio::test]
    async fn missing_user_reads_as_empty() {
        let repo = SqlitePreferenceRepo::in_memory().expect("repo");
        let signature = repo
            .get_field(PreferenceField::Signature, UserId(99))
            .await
            .expect("signature");
        assert_eq!(signature, "");
        assert!(repo.find_by_user(UserId(99)).await.expect("find").is_none());
    }

    #[tokio::test]
    async fn update_then_get_field() {
        let repo = SqlitePreferenceRepo::in_memory().expect("repo");
        let id = repo.ensure_exists(UserId(2)).await.expect("create");
        repo.update(&PreferenceRecord {
            id,
            user_id: UserId(2),
            template: "invoice.odt".into(),
            signature: "bob.png".into(),
        })
        .await
        .expect("update");

        assert_eq!(
            repo.get_field(PreferenceField::Template, UserId(2))
                .await
                .expect("template"),
            "invoice.odt"
        );
        assert_eq!(
            repo.get_field(PreferenceField::Signature, UserId(2))
                .await
                .expect("signature"),
            "bob.png"
        );
        let record = repo.get(id).await.expect("get").expect("record");
        assert_eq!(record.signature, "bob.png");
    }

    #[tokio::test]
    async fn update_unknown_id_is_not_found() {
        let repo = SqlitePreferenceRepo::in_memory().expect("repo");
        let err = repo
            .update(&PreferenceRecord {
                id: PreferenceId(404),
                user_id: UserId(1),
                template: String::new(),
                signature: String::new(),
            })
            .await
            .expect_err("should fail");
        assert_eq!(err, PreferenceError::NotFound { id: PreferenceId(404) });
    }

    #[tokio::test]
    async fn update_rejects_values_longer_than_column() {
        let repo = SqlitePreferenceRepo::in_memory().expect("repo");
        let id = repo.ensure_exists(UserId(6)).await.expect("create");
        let err = repo
            .update(&PreferenceRecord {
                id,
                user_id: UserId(6),
                template: "t".repeat(404),
                signature: String::new(),
            })
            .await
            .expect_err("should fail");
        assert!(matches!(err, PreferenceError::Invalid { .. }));

        let template = repo
            .get_field(PreferenceField::Template, UserId(6))
            .await
            .expect("template");
        assert_eq!(template, "");

        repo.update(&PreferenceRecord {
            id,
            user_id: UserId(6),
            template: "t".repeat(255),
            signature: String::new(),
        })
        .await
        .expect("255 characters fit");
    }

    #[tokio::test]
    async fn duplicates_resolve_to_first_record() {
        let repo = SqlitePreferenceRepo::in_memory().expect("repo");
        {
            let conn = repo.lock().expect("lock");
            conn.execute_batch(&format!(
                "INSERT INTO {TABLE} (users_id, template, sign) VALUES (5, 'first.odt', NULL);
                 INSERT INTO {TABLE} (users_id, template, sign) VALUES (5, 'second.odt', NULL);"
            ))
            .expect("seed duplicates");
        }
        let template = repo
            .get_field(PreferenceField::Template, UserId(5))
            .await
            .expect("template");
        assert_eq!(template, "first.odt");
        let id = repo.ensure_exists(UserId(5)).await.expect("ensure");
        assert_eq!(id, PreferenceId(1));
    }

    #[tokio::test]
    async fn persists_across_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("prefs.db");
        let id = {
            let repo = SqlitePreferenceRepo::open(&path).expect("open");
            repo.ensure_exists(UserId(3)).await.expect("create")
        };
        let repo = SqlitePreferenceRepo::open(&path).expect("reopen");
        assert_eq!(repo.ensure_exists(UserId(3)).await.expect("lookup"), id);
    }

    #[tokio::test]
    async fn uninstall_then_install_starts_empty() {
        let repo = SqlitePreferenceRepo::in_memory().expect("repo");
        repo.ensure_exists(UserId(1)).await.expect("create");
        repo.uninstall().expect("uninstall");
        repo.install().expect("install");
        assert!(repo.find_by_user(UserId(1)).await.expect("find").is_none());
    }
}
