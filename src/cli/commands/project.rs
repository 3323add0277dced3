use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};

use crate::adapters::sqlite::store::SqliteStore;
use crate::cli::context;
use crate::config::app_config::AppConfig;
use crate::core::errors::{PoolError, Result};
use crate::core::services::customer_service::CustomerService;

/// An initialized project directory and its configuration.
pub struct Project {
    pub dir: PathBuf,
    pub config: AppConfig,
}

impl Project {
    /// Load the project from the directory selected with `--dir`.
    pub fn load() -> Result<Self> {
        let dir = context::poolboard_dir();
        if !dir.exists() {
            return Err(PoolError::InvalidConfig {
                detail: format!(
                    "poolboard is not initialized ({} not found). Run 'poolboard init' first.",
                    dir.display()
                ),
            });
        }
        let config = AppConfig::load(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            config,
        })
    }

    pub fn database_path(&self) -> PathBuf {
        self.config.database_path(&self.dir)
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.config.backup_dir(&self.dir)
    }

    /// Open the store, migrating first when `auto_migrate` is on.
    pub fn open_store(&self) -> Result<SqliteStore> {
        SqliteStore::open(&self.database_path(), self.config.poolboard.auto_migrate)
    }

    /// Open the store behind a [`CustomerService`] acting as `actor`
    /// (falling back to the configured actor).
    pub fn service(&self, actor: Option<&str>) -> Result<CustomerService<SqliteStore>> {
        let actor = resolve_actor(actor, &self.config);
        Ok(CustomerService::new(self.open_store()?, actor))
    }
}

/// `--actor` / `POOLBOARD_ACTOR` wins over the config value.
pub fn resolve_actor(flag: Option<&str>, config: &AppConfig) -> String {
    flag.map(str::trim)
        .filter(|a| !a.is_empty())
        .unwrap_or(&config.poolboard.actor)
        .to_string()
}

/// Today's date in local time, for the upcoming-maintenance count.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Display a path relative to the working directory when possible.
pub fn display_path(path: &Path) -> String {
    std::env::current_dir()
        .ok()
        .and_then(|cwd| path.strip_prefix(cwd).ok().map(Path::to_path_buf))
        .unwrap_or_else(|| path.to_path_buf())
        .display()
        .to_string()
}
