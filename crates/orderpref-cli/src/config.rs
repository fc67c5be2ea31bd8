use std::{
    fs,
    path::{Path, PathBuf},
};

use color_eyre::Result;
use dirs::config_dir;
use orderpref_core::files::{DateFormat, FileCatalog};
use serde::{Deserialize, Serialize};

use crate::storage;

pub const DEFAULT_TEMPLATE_EXTENSION: &str = "odt";
pub const DEFAULT_SIGNATURE_EXTENSION: &str = "png";

/// User-level configuration loaded from `~/.config/orderpref/config.toml` (platform-specific).
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Override for the SQLite database file.
    pub database: Option<PathBuf>,
    /// Directory holding document templates.
    pub template_dir: Option<PathBuf>,
    /// Directory holding signature images.
    pub signature_dir: Option<PathBuf>,
    pub template_extension: Option<String>,
    pub signature_extension: Option<String>,
    /// Display format for file modification dates.
    pub date_format: Option<DateFormat>,
}

impl Config {
    /// Fill every unset field with its default.
    pub fn resolved(&self) -> Result<Config> {
        let template_dir = match &self.template_dir {
            Some(dir) => dir.clone(),
            None => storage::default_data_dir()?.join("templates"),
        };
        let signature_dir = match &self.signature_dir {
            Some(dir) => dir.clone(),
            None => storage::default_data_dir()?.join("signatures"),
        };
        Ok(Config {
            database: Some(storage::database_path(self)?),
            template_dir: Some(template_dir),
            signature_dir: Some(signature_dir),
            template_extension: Some(
                self.template_extension
                    .clone()
                    .unwrap_or_else(|| DEFAULT_TEMPLATE_EXTENSION.to_string()),
            ),
            signature_extension: Some(
                self.signature_extension
                    .clone()
                    .unwrap_or_else(|| DEFAULT_SIGNATURE_EXTENSION.to_string()),
            ),
            date_format: Some(self.date_format.unwrap_or_default()),
        })
    }

    /// File stores the preference form picks from.
    pub fn catalog(&self) -> Result<FileCatalog> {
        let resolved = self.resolved()?;
        Ok(FileCatalog {
            template_dir: resolved.template_dir.unwrap_or_default(),
            template_extension: resolved.template_extension.unwrap_or_default(),
            signature_dir: resolved.signature_dir.unwrap_or_default(),
            signature_extension: resolved.signature_extension.unwrap_or_default(),
            date_format: resolved.date_format.unwrap_or_default(),
        })
    }
}

/// Load config from the default path; if missing, return defaults.
pub fn load() -> Result<Config> {
    let path = default_path()?;
    load_from_path(path)
}

/// Load config from a given path; if missing or empty, return defaults.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Config::default());
    }
    let contents = fs::read_to_string(path)?;
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }
    let cfg: Config = toml::from_str(&contents)?;
    Ok(cfg)
}

/// Resolve the default config path (platform aware).
pub fn default_path() -> Result<PathBuf> {
    let base = config_dir().ok_or_else(|| color_eyre::eyre::eyre!("no config dir available"))?;
    Ok(base.join("orderpref").join("config.toml"))
}

/// Write the given config to the default path unless a file is already there.
pub fn write_default_if_missing(config: &Config) -> Result<PathBuf> {
    let path = default_path()?;
    write_to_path_if_missing(config, &path)?;
    Ok(path)
}

fn write_to_path_if_missing(config: &Config, path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let body = toml::to_string_pretty(config)?;
    fs::write(path, body)?;
    Ok(())
}
