use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{
    files::{FileCatalog, FileEntry},
    preferences::{PreferenceError, PreferenceId, PreferenceRecord, PreferenceRepository, UserId},
};

/// Placeholder label shown when a dropdown has nothing to offer.
pub const EMPTY_VALUE: &str = "-----";

/// Item type on which the preference tab is shown.
pub const PREFERENCE_ITEM_TYPE: &str = "Preference";

/// Tab label for the preference page.
pub const TAB_NAME: &str = "Orders";

/// Selection list for one preference field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Dropdown {
    /// Form field name.
    pub name: String,
    /// `(value, label)` pairs in display order.
    pub options: Vec<(String, String)>,
    /// Currently stored value.
    pub selected: String,
}

impl Dropdown {
    pub fn from_files(name: &str, files: &[FileEntry], selected: &str) -> Self {
        let options = if files.is_empty() {
            vec![("0".to_string(), EMPTY_VALUE.to_string())]
        } else {
            files
                .iter()
                .map(|f| (f.name.clone(), f.name.clone()))
                .collect()
        };
        Self {
            name: name.to_string(),
            options,
            selected: selected.to_string(),
        }
    }
}

/// Everything the host needs to render the preference form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PreferenceForm {
    pub id: PreferenceId,
    pub user_id: UserId,
    /// `"<name> - <version>"` heading.
    pub title: String,
    pub template: Dropdown,
    pub signature: Dropdown,
    /// Path of the chosen signature image, when one is set.
    pub signature_preview: Option<PathBuf>,
}

/// Values posted back from the form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FormSubmission {
    pub id: PreferenceId,
    pub user_id: UserId,
    pub template: String,
    pub signature: String,
}

impl From<FormSubmission> for PreferenceRecord {
    fn from(value: FormSubmission) -> Self {
        PreferenceRecord {
            id: value.id,
            user_id: value.user_id,
            template: value.template,
            signature: value.signature,
        }
    }
}

/// Label of the preference tab for `item_type`, if the tab applies to it.
pub fn tab_name_for_item(item_type: &str) -> Option<&'static str> {
    (item_type == PREFERENCE_ITEM_TYPE).then_some(TAB_NAME)
}

/// Ties the repository and the file catalog together for the form layer.
pub struct PreferenceService<R: PreferenceRepository> {
    repo: R,
    catalog: FileCatalog,
    title: String,
}

impl<R: PreferenceRepository> PreferenceService<R> {
    pub fn new(repo: R, catalog: FileCatalog, title: impl Into<String>) -> Self {
        Self {
            repo,
            catalog,
            title: title.into(),
        }
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    pub fn catalog(&self) -> &FileCatalog {
        &self.catalog
    }

    /// Build the form for an existing record.
    #[instrument(skip(self))]
    pub async fn form(
        &self,
        id: PreferenceId,
        session_user: &str,
    ) -> Result<PreferenceForm, PreferenceError> {
        let record = self
            .repo
            .get(id)
            .await?
            .ok_or(PreferenceError::NotFound { id })?;

        let templates = self.catalog.templates();
        let signatures = self.catalog.signatures(session_user);
        debug!(
            templates = templates.len(),
            signatures = signatures.len(),
            "building preference form"
        );

        let signature_preview = (!record.signature.is_empty())
            .then(|| self.catalog.signature_path(&record.signature));

        Ok(PreferenceForm {
            id: record.id,
            user_id: record.user_id,
            title: self.title.clone(),
            template: Dropdown::from_files("template", &templates, &record.template),
            signature: Dropdown::from_files("sign", &signatures, &record.signature),
            signature_preview,
        })
    }

    /// Tab hook: on the preference page, make sure the user has a record and
    /// return its form. Other item types get nothing.
    #[instrument(skip(self))]
    pub async fn display_tab(
        &self,
        item_type: &str,
        user_id: UserId,
        session_user: &str,
    ) -> Result<Option<PreferenceForm>, PreferenceError> {
        if tab_name_for_item(item_type).is_none() {
            return Ok(None);
        }
        let id = self.repo.ensure_exists(user_id).await?;
        self.form(id, session_user).await.map(Some)
    }

    /// Persist a posted form.
    #[instrument(skip(self))]
    pub async fn submit(&self, submission: FormSubmission) -> Result<(), PreferenceError> {
        self.repo.update(&submission.into()).await
    }
}
