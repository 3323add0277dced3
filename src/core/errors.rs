use std::path::PathBuf;

/// All domain errors for poolboard.
///
/// Validation and conflict errors are reported before anything is written.
/// Persistence errors are raised after the active transaction has been
/// rolled back, so the store never holds a partial write.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("Invalid input: {detail}")]
    Validation { detail: String },

    #[error(
        "A customer named '{name}' already exists\n\n  \
         Customer names are unique regardless of letter case.\n  \
         Pick another name or update the existing customer instead."
    )]
    DuplicateName { name: String },

    #[error(
        "Customer '{name}' not found\n\n  \
         Run 'poolboard list --search <text>' to look up the exact name."
    )]
    NotFound { name: String },

    #[error(
        "Unknown field '{field}'\n\n  \
         Valid fields: {valid}"
    )]
    UnknownField { field: String, valid: String },

    /// The database rejected an operation. The raw driver error is logged
    /// where it is converted and never shown to the user.
    #[error(
        "Could not save changes\n\n  \
         Nothing was written. Try again, or run with --verbose for details."
    )]
    Persistence,

    #[error(
        "Database schema does not match this build: {detail}\n\n  \
         Run 'poolboard migrate up' to bring the database up to date."
    )]
    SchemaMismatch { detail: String },

    #[error("Migration failed: {detail}")]
    Migration { detail: String },

    #[error("Invalid configuration: {detail}")]
    InvalidConfig { detail: String },

    #[error(
        "This project uses format version {project_version}, but this poolboard \
         only supports up to version {supported_version}.\n\n  \
         Install a newer poolboard build to open it."
    )]
    FormatVersionTooNew {
        project_version: u32,
        supported_version: u32,
    },

    #[error("Import failed for {path}: {detail}")]
    Import { path: PathBuf, detail: String },

    #[error("Could not render output: {detail}")]
    Render { detail: String },

    #[error("Backup error: {detail}")]
    Backup { detail: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PoolError {
    /// Shorthand for a validation error.
    pub fn validation(detail: impl Into<String>) -> Self {
        Self::Validation {
            detail: detail.into(),
        }
    }
}

impl From<sqlx::Error> for PoolError {
    fn from(e: sqlx::Error) -> Self {
        tracing::error!(error = %e, "database operation failed");
        Self::Persistence
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PoolError>;
