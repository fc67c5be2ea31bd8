use std::{
    fmt,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of a stored preference record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PreferenceId(pub i64);

impl fmt::Display for PreferenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the owning user, as assigned by the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One user's template and signature choice.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PreferenceRecord {
    pub id: PreferenceId,
    pub user_id: UserId,
    /// Template file name, empty when none chosen.
    pub template: String,
    /// Signature file name, empty when none chosen.
    pub signature: String,
}

/// Longest template or signature name the storage column holds, in characters.
pub const MAX_VALUE_LEN: usize = 255;

impl PreferenceRecord {
    /// Reject values that do not fit the storage columns.
    pub fn validate(&self) -> Result<(), PreferenceError> {
        for field in [PreferenceField::Template, PreferenceField::Signature] {
            let len = self.value(field).chars().count();
            if len > MAX_VALUE_LEN {
                return Err(PreferenceError::Invalid {
                    reason: format!(
                        "{} is {len} characters, limit is {MAX_VALUE_LEN}",
                        field.column()
                    ),
                });
            }
        }
        Ok(())
    }

    pub fn value(&self, field: PreferenceField) -> &str {
        match field {
            PreferenceField::Template => &self.template,
            PreferenceField::Signature => &self.signature,
        }
    }
}

/// Fields that can be read individually through [`PreferenceRepository::get_field`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreferenceField {
    Template,
    Signature,
}

impl PreferenceField {
    /// Storage column backing the field.
    pub fn column(self) -> &'static str {
        match self {
            PreferenceField::Template => "template",
            PreferenceField::Signature => "sign",
        }
    }
}

/// Errors produced by preference repositories.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PreferenceError {
    /// No record carries the given id.
    #[error("preference not found: {id}")]
    NotFound { id: PreferenceId },
    /// Record values rejected before reaching storage.
    #[error("invalid preference: {reason}")]
    Invalid { reason: String },
    /// Underlying storage failure.
    #[error("storage failure: {reason}")]
    Storage { reason: String },
}

/// Repository contract for per-user preference records.
///
/// A user without a record is not an error: `get_field` answers with an empty
/// string and `find_by_user` with `None`.
#[async_trait]
pub trait PreferenceRepository: Send + Sync {
    /// Return the user's record id, inserting an empty record first if none exists.
    async fn ensure_exists(&self, user_id: UserId) -> Result<PreferenceId, PreferenceError>;

    /// Read one field from the user's first record, or `""` without one.
    async fn get_field(
        &self,
        field: PreferenceField,
        user_id: UserId,
    ) -> Result<String, PreferenceError>;

    /// Persist the template and signature of an existing record.
    async fn update(&self, record: &PreferenceRecord) -> Result<(), PreferenceError>;

    /// First record owned by the user, if any.
    async fn find_by_user(
        &self,
        user_id: UserId,
    ) -> Result<Option<PreferenceRecord>, PreferenceError>;

    /// Record with the given id, if any.
    async fn get(&self, id: PreferenceId) -> Result<Option<PreferenceRecord>, PreferenceError>;
}

/// In-memory repository for tests and smoke runs.
#[derive(Debug, Default, Clone)]
pub struct InMemoryPreferenceRepo {
    inner: Arc<Mutex<InMemoryState>>,
}

#[derive(Debug, Default)]
struct InMemoryState {
    last_id: i64,
    records: Vec<PreferenceRecord>,
}

impl InMemoryPreferenceRepo {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, InMemoryState>, PreferenceError> {
        self.inner.lock().map_err(|err| PreferenceError::Storage {
            reason: format!("lock poisoned: {err}"),
        })
    }
}

impl InMemoryState {
    // Records are kept in insertion order, so the first match has the lowest id.
    fn first_for(&self, user_id: UserId) -> Option<&PreferenceRecord> {
        self.records.iter().find(|r| r.user_id == user_id)
    }
}

#[async_trait]
impl PreferenceRepository for InMemoryPreferenceRepo {
    async fn ensure_exists(&self, user_id: UserId) -> Result<PreferenceId, PreferenceError> {
        let mut state = self.lock()?;
        if let Some(existing) = state.first_for(user_id) {
            return Ok(existing.id);
        }
        state.last_id += 1;
        let id = PreferenceId(state.last_id);
        state.records.push(PreferenceRecord {
            id,
            user_id,
            template: String::new(),
            signature: String::new(),
        });
        Ok(id)
    }

    async fn get_field(
        &self,
        field: PreferenceField,
        user_id: UserId,
    ) -> Result<String, PreferenceError> {
        let state = self.lock()?;
        Ok(state
            .first_for(user_id)
            .map(|r| r.value(field).to_string())
            .unwrap_or_default())
    }

    async fn update(&self, record: &PreferenceRecord) -> Result<(), PreferenceError> {
        record.validate()?;
        let mut state = self.lock()?;
        let stored = state
            .records
            .iter_mut()
            .find(|r| r.id == record.id)
            .ok_or(PreferenceError::NotFound { id: record.id })?;
        stored.template = record.template.clone();
        stored.signature = record.signature.clone();
        Ok(())
    }

    async fn find_by_user(
        &self,
        user_id: UserId,
    ) -> Result<Option<PreferenceRecord>, PreferenceError> {
        let state = self.lock()?;
        Ok(state.first_for(user_id).cloned())
    }

    async fn get(&self, id: PreferenceId) -> Result<Option<PreferenceRecord>, PreferenceError> {
        let state = self.lock()?;
        Ok(state.records.iter().find(|r| r.id == id).cloned())
    }
}
