//! Layered configuration for the library cache.
//!
//! Sources, lowest precedence first:
//!
//! 1. Built-in defaults ([`Config::default()`]).
//! 2. A configuration file, in TOML, YAML or JSON (picked by extension).
//!    Without an explicit path, `config.toml` in the platform config
//!    directory is used if it exists.
//! 3. Environment variables prefixed `SHELF_`, with nested keys separated
//!    by `__` (`SHELF_PREFERENCES__COVER_FORMAT=png`).

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use shelf_model::UserCategories;
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "SHELF_";
const DEFAULT_COVER_FORMAT: &str = "jpeg";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root directory of the library, for the local backend.
    pub library: Option<PathBuf>,
    pub preferences: Preferences,
}

/// Caller preferences consulted while composing metadata records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub user_categories: UserCategories,
    /// Image format label attached to cover bytes returned as data.
    pub cover_format: String,
}
impl Default for Preferences {
    fn default() -> Self {
        Self {
            user_categories: UserCategories::new(),
            cover_format: DEFAULT_COVER_FORMAT.to_string(),
        }
    }
}

impl Config {
    /// Loads configuration from every source.
    ///
    /// An explicit `path` must exist. The default location is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        match path {
            Some(path) => figment = merge_file(figment, path, true)?,
            None => {
                if let Some(path) = default_path() {
                    figment = merge_file(figment, &path, false)?;
                }
            },
        }
        let config: Self = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if let Some(library) = &self.library
            && !library.is_absolute()
        {
            exn::bail!(ErrorKind::Invalid(format!("library path must be absolute: {}", library.display())));
        }
        if self.preferences.cover_format.trim().is_empty() {
            exn::bail!(ErrorKind::Invalid("cover_format must not be empty".to_string()));
        }
        for (category, members) in &self.preferences.user_categories {
            if let Some(member) = members.iter().find(|m| m.field.is_empty()) {
                exn::bail!(ErrorKind::Invalid(format!(
                    "user category {category:?} member {:?} names no field",
                    member.name
                )));
            }
        }
        Ok(())
    }
}

/// Location of the configuration file used when none is given.
pub fn default_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "shelf").map(|dirs| dirs.config_dir().join("config.toml"))
}

fn merge_file(figment: Figment, path: &Path, required: bool) -> Result<Figment> {
    if !required && !path.is_file() {
        return Ok(figment);
    }
    tracing::debug!(path = %path.display(), "Loading configuration file");
    let extension = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
    Ok(match extension.as_deref() {
        Some("toml") => figment.merge(Toml::file_exact(path)),
        Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path)),
        Some("json") => figment.merge(Json::file_exact(path)),
        _ => exn::bail!(ErrorKind::Invalid(format!(
            "unsupported configuration file type: {}",
            path.display()
        ))),
    })
}
