use std::{
    fs,
    path::{Path, PathBuf},
    time::SystemTime,
};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Kind of file being listed; signatures are scoped to their owner by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Template,
    Signature,
}

/// How modification dates are rendered in listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateFormat {
    /// `YYYY-MM-DD`
    #[default]
    Ymd,
    /// `DD-MM-YYYY`
    Dmy,
    /// `MM-DD-YYYY`
    Mdy,
}

impl DateFormat {
    fn pattern(self) -> &'static str {
        match self {
            DateFormat::Ymd => "%Y-%m-%d",
            DateFormat::Dmy => "%d-%m-%Y",
            DateFormat::Mdy => "%m-%d-%Y",
        }
    }

    pub fn render(self, time: SystemTime) -> String {
        DateTime::<Local>::from(time)
            .format(self.pattern())
            .to_string()
    }
}

/// A listed file: name, display date of last modification, extension.
///
/// Field order matters: ordering compares name first.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    pub modified: String,
    pub extension: String,
}

/// List regular files in `directory` whose extension equals `extension` exactly.
///
/// Signature listings additionally keep only files whose base name matches
/// `session_user` case-insensitively. The result is sorted in reverse
/// lexicographic order. A missing or unreadable directory yields an empty list.
pub fn list_files(
    directory: &Path,
    extension: &str,
    category: FileCategory,
    session_user: &str,
    date_format: DateFormat,
) -> Vec<FileEntry> {
    let entries = match fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(err) => {
            debug!(?directory, %err, "directory not listable, no files");
            return Vec::new();
        }
    };

    let mut files = Vec::new();
    for entry in entries.flatten() {
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if name == "." || name == ".." {
            continue;
        }
        // symlink_metadata does not follow links, so links are not regular files.
        let Ok(meta) = fs::symlink_metadata(entry.path()) else {
            continue;
        };
        if !meta.file_type().is_file() {
            continue;
        }
        let (base, ext) = split_name(&name);
        if ext != extension {
            continue;
        }
        if category == FileCategory::Signature
            && base.to_lowercase() != session_user.to_lowercase()
        {
            continue;
        }
        let Ok(modified) = meta.modified() else {
            continue;
        };
        let extension = ext.to_string();
        files.push(FileEntry {
            name,
            modified: date_format.render(modified),
            extension,
        });
    }

    files.sort_by(|a, b| b.cmp(a));
    files
}

/// Split a file name into its first dot-separated segment and the text after
/// the last dot. A name without a dot is all extension and has an empty base.
fn split_name(name: &str) -> (&str, &str) {
    match name.rsplit_once('.') {
        Some((stem, ext)) => {
            let base = stem.split('.').next().unwrap_or_default();
            (base, ext)
        }
        None => ("", name),
    }
}

/// The two configured file stores the preference form picks from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCatalog {
    pub template_dir: PathBuf,
    pub template_extension: String,
    pub signature_dir: PathBuf,
    pub signature_extension: String,
    pub date_format: DateFormat,
}

impl FileCatalog {
    pub fn templates(&self) -> Vec<FileEntry> {
        list_files(
            &self.template_dir,
            &self.template_extension,
            FileCategory::Template,
            "",
            self.date_format,
        )
    }

    pub fn signatures(&self, session_user: &str) -> Vec<FileEntry> {
        list_files(
            &self.signature_dir,
            &self.signature_extension,
            FileCategory::Signature,
            session_user,
            self.date_format,
        )
    }

    pub fn at_least_one_template(&self) -> bool {
        !self.templates().is_empty()
    }

    pub fn at_least_one_signature(&self, session_user: &str) -> bool {
        !self.signatures(session_user).is_empty()
    }

    /// Location of a signature file inside the signature store.
    pub fn signature_path(&self, name: &str) -> PathBuf {
        self.signature_dir.join(name)
    }
}
