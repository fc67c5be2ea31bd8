use std::path::PathBuf;

use crate::config::Config;
use color_eyre::Result;
use dirs::data_dir;
use orderpref_storage::sqlite_store::SqlitePreferenceRepo;
use tracing::debug;

/// Resolve the default data directory for order preferences.
pub fn default_data_dir() -> Result<PathBuf> {
    let base = data_dir().ok_or_else(|| color_eyre::eyre::eyre!("no data dir available"))?;
    Ok(base.join("orderpref"))
}

/// Database file from config, or `<data dir>/orderpref.db`.
pub fn database_path(config: &Config) -> Result<PathBuf> {
    match &config.database {
        Some(path) => Ok(path.clone()),
        None => Ok(default_data_dir()?.join("orderpref.db")),
    }
}

/// Open the repository, installing or upgrading the table as needed.
pub fn repo_from_config(config: &Config) -> Result<SqlitePreferenceRepo> {
    let path = database_path(config)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    debug!(?path, "initializing preference store");
    Ok(SqlitePreferenceRepo::open(path)?)
}

/// Open an existing database file as-is, without creating the table.
/// `None` when there is no database file yet.
pub fn existing_repo_from_config(config: &Config) -> Result<Option<SqlitePreferenceRepo>> {
    let path = database_path(config)?;
    if !path.exists() {
        debug!(?path, "no preference database on disk");
        return Ok(None);
    }
    debug!(?path, "opening preference store without install");
    Ok(Some(SqlitePreferenceRepo::open_uninstalled(path)?))
}
