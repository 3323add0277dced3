use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cli::context::validate_simple_filename;
use crate::core::errors::{PoolError, Result};

/// Current format version supported by this build of poolboard.
pub const CURRENT_FORMAT_VERSION: u32 = 1;

/// Top-level configuration read from `.poolboard/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub poolboard: PoolboardSection,
    #[serde(default)]
    pub export: ExportSection,
    #[serde(default)]
    pub backup: BackupSection,
}

impl AppConfig {
    /// Load the configuration from `{dir}/config.toml`.
    ///
    /// After parsing, validates file names (no path traversal from a
    /// tampered config), the page size and the export delimiter.
    pub fn load(dir: &Path) -> Result<Self> {
        let config_path = dir.join("config.toml");
        if !config_path.exists() {
            return Err(PoolError::InvalidConfig {
                detail: format!(
                    "{} not found. Run 'poolboard init' first.",
                    config_path.display()
                ),
            });
        }
        let content = std::fs::read_to_string(&config_path)?;
        let config: Self = toml::from_str(&content).map_err(|e| PoolError::InvalidConfig {
            detail: format!("Failed to parse config.toml: {e}"),
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.poolboard.format_version > CURRENT_FORMAT_VERSION {
            return Err(PoolError::FormatVersionTooNew {
                project_version: self.poolboard.format_version,
                supported_version: CURRENT_FORMAT_VERSION,
            });
        }
        validate_simple_filename(&self.poolboard.database, "database file")?;
        validate_simple_filename(&self.export.file_name, "export file")?;
        validate_simple_filename(&self.backup.directory, "backup directory")?;

        if self.poolboard.page_size == 0 {
            return Err(PoolError::InvalidConfig {
                detail: "page_size must be at least 1".into(),
            });
        }
        if self.poolboard.actor.trim().is_empty() {
            return Err(PoolError::InvalidConfig {
                detail: "actor cannot be empty".into(),
            });
        }
        self.export.delimiter_char()?;
        Ok(())
    }

    /// Serialized defaults, written by `poolboard init`.
    pub fn default_toml() -> Result<String> {
        toml::to_string_pretty(&Self::default()).map_err(|e| PoolError::InvalidConfig {
            detail: format!("Failed to serialize default config: {e}"),
        })
    }

    pub fn database_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.poolboard.database)
    }

    pub fn backup_dir(&self, dir: &Path) -> PathBuf {
        dir.join(&self.backup.directory)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            poolboard: PoolboardSection {
                format_version: CURRENT_FORMAT_VERSION,
                database: "poolboard.db".into(),
                actor: "staff".into(),
                page_size: 20,
                auto_migrate: true,
            },
            export: ExportSection::default(),
            backup: BackupSection::default(),
        }
    }
}

/// The `[poolboard]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolboardSection {
    /// Format version for backward compatibility. Defaults to 1 if missing.
    #[serde(default = "default_format_version")]
    pub format_version: u32,
    pub database: String,
    /// Audit actor used when neither `--actor` nor `POOLBOARD_ACTOR` is set.
    pub actor: String,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_true")]
    pub auto_migrate: bool,
}

fn default_format_version() -> u32 {
    1
}

fn default_page_size() -> usize {
    20
}

fn default_true() -> bool {
    true
}

/// The `[export]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSection {
    pub delimiter: String,
    pub file_name: String,
}

impl ExportSection {
    /// The delimiter as a single character.
    pub fn delimiter_char(&self) -> Result<char> {
        let mut chars = self.delimiter.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if !c.is_alphanumeric() && c != '"' && c != '\n' && c != '\r' => {
                Ok(c)
            }
            _ => Err(PoolError::InvalidConfig {
                detail: format!(
                    "export delimiter must be a single non-alphanumeric character, got '{}'",
                    self.delimiter
                ),
            }),
        }
    }
}

impl Default for ExportSection {
    fn default() -> Self {
        Self {
            delimiter: ",".into(),
            file_name: "customers_filtered.csv".into(),
        }
    }
}

/// The `[backup]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupSection {
    pub directory: String,
    /// Backups older than this are pruned after each new backup; 0 keeps all.
    pub retention_days: u32,
}

impl Default for BackupSection {
    fn default() -> Self {
        Self {
            directory: "backups".into(),
            retention_days: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(content: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("config.toml"), content).unwrap();
        dir
    }

    #[test]
    fn default_toml_loads_back() {
        let dir = write_config(&AppConfig::default_toml().unwrap());
        let config = AppConfig::load(dir.path()).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn optional_sections_take_defaults() {
        let dir = write_config(
            "[poolboard]\ndatabase = \"customers.db\"\nactor = \"office\"\n",
        );
        let config = AppConfig::load(dir.path()).unwrap();
        assert_eq!(config.poolboard.page_size, 20);
        assert!(config.poolboard.auto_migrate);
        assert_eq!(config.export.delimiter, ",");
        assert_eq!(config.backup.retention_days, 30);
        assert_eq!(
            config.database_path(dir.path()),
            dir.path().join("customers.db")
        );
    }

    #[test]
    fn missing_config_points_to_init() {
        let dir = TempDir::new().unwrap();
        let err = AppConfig::load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("poolboard init"));
    }

    #[test]
    fn rejects_newer_format_version() {
        let dir = write_config(
            "[poolboard]\nformat_version = 9\ndatabase = \"p.db\"\nactor = \"staff\"\n",
        );
        assert!(matches!(
            AppConfig::load(dir.path()),
            Err(PoolError::FormatVersionTooNew { .. })
        ));
    }

    #[test]
    fn rejects_path_traversal_in_database() {
        let dir = write_config("[poolboard]\ndatabase = \"../evil.db\"\nactor = \"staff\"\n");
        assert!(AppConfig::load(dir.path()).is_err());
    }

    #[test]
    fn rejects_bad_delimiter_and_page_size() {
        let dir = write_config(
            "[poolboard]\ndatabase = \"p.db\"\nactor = \"staff\"\n\
             [export]\ndelimiter = \";;\"\nfile_name = \"out.csv\"\n",
        );
        assert!(AppConfig::load(dir.path()).is_err());

        let dir = write_config(
            "[poolboard]\ndatabase = \"p.db\"\nactor = \"staff\"\npage_size = 0\n",
        );
        assert!(AppConfig::load(dir.path()).is_err());
    }

    #[test]
    fn delimiter_accepts_tab_and_semicolon() {
        let section = ExportSection {
            delimiter: "\t".into(),
            ..ExportSection::default()
        };
        assert_eq!(section.delimiter_char().unwrap(), '\t');
        let section = ExportSection {
            delimiter: ";".into(),
            ..ExportSection::default()
        };
        assert_eq!(section.delimiter_char().unwrap(), ';');
    }
}
