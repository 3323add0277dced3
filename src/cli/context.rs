use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::core::errors::{PoolError, Result};

const DEFAULT_DIR: &str = ".poolboard";

static POOLBOARD_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Initialize the global project directory path.
/// If `custom` is provided, uses that path; otherwise defaults to `.poolboard`.
pub fn init(custom: Option<&str>) {
    let dir = custom
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DIR));
    let _ = POOLBOARD_DIR.set(dir);
}

/// Get the current project directory path.
pub fn poolboard_dir() -> &'static Path {
    POOLBOARD_DIR
        .get()
        .map(|p| p.as_path())
        .unwrap_or(Path::new(DEFAULT_DIR))
}

/// Reject file names that could escape the project directory.
pub fn validate_simple_filename(name: &str, what: &str) -> Result<()> {
    let invalid = name.trim().is_empty()
        || name.contains('/')
        || name.contains('\\')
        || name == "."
        || name == ".."
        || name.contains('\0');
    if invalid {
        return Err(PoolError::InvalidConfig {
            detail: format!("{what} '{name}' must be a plain file name inside the project directory"),
        });
    }
    Ok(())
}
