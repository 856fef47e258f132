//! Layered configuration for bookshelf.
//!
//! Values are resolved in order, later sources overriding earlier ones:
//!
//! 1. Built-in defaults.
//! 2. A TOML file: the one passed explicitly, otherwise `bookshelf.toml` in
//!    the platform configuration directory if it exists.
//! 3. Environment variables prefixed with `BOOKSHELF_`, using `__` to reach
//!    nested keys (`BOOKSHELF_DATABASE__MAX_CONNECTIONS=10`).
//!
//! ```toml
//! [database]
//! path = "/var/lib/bookshelf/bookshelf.db"
//! max_connections = 5
//! timeout = 3000
//!
//! [listing]
//! page_size = 20
//!
//! [log]
//! level = "info"
//! ```

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_PREFIX: &str = "BOOKSHELF_";
pub const CONFIG_FILE_NAME: &str = "bookshelf.toml";
const DATABASE_FILE_NAME: &str = "bookshelf.db";
const MAX_PAGE_SIZE: i64 = 100;

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "bookshelf")
}

/// `bookshelf.toml` in the platform configuration directory.
pub fn default_config_file() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite database file; created if missing.
    pub path: PathBuf,
    pub max_connections: u32,
    /// Per-operation deadline, in milliseconds.
    pub timeout: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        let path = project_dirs()
            .map(|dirs| dirs.data_local_dir().join(DATABASE_FILE_NAME))
            .unwrap_or_else(|| PathBuf::from(DATABASE_FILE_NAME));
        Self {
            path,
            max_connections: 5,
            timeout: 3000,
        }
    }
}

impl DatabaseConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    /// Page size used when a listing request doesn't ask for one.
    pub page_size: i64,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self { page_size: 20 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default `tracing` filter directive, e.g. `info` or `bookshelf_store=debug`.
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub listing: ListingConfig,
    pub log: LogConfig,
}

impl Config {
    /// The merged sources, before extraction.
    ///
    /// An explicit `file` must exist; the default file is optional.
    pub fn figment(file: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        match file {
            Some(file) if !file.is_file() => exn::bail!(ErrorKind::NotFound(file.to_path_buf())),
            Some(file) => figment = figment.merge(Toml::file_exact(file)),
            None => {
                if let Some(file) = default_config_file().filter(|file| file.is_file()) {
                    figment = figment.merge(Toml::file_exact(file));
                }
            },
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Load and validate configuration from every source.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let figment = Self::figment(file)?;
        if let Some(file) = file {
            tracing::debug!(file = %file.display(), "loading configuration");
        }
        let config: Self = figment.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.path.as_os_str().is_empty() {
            exn::bail!(ErrorKind::Invalid("database.path"));
        }
        if self.database.max_connections == 0 {
            exn::bail!(ErrorKind::Invalid("database.max_connections"));
        }
        if self.database.timeout == 0 {
            exn::bail!(ErrorKind::Invalid("database.timeout"));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&self.listing.page_size) {
            exn::bail!(ErrorKind::Invalid("listing.page_size"));
        }
        if self.log.level.trim().is_empty() {
            exn::bail!(ErrorKind::Invalid("log.level"));
        }
        Ok(())
    }
}
