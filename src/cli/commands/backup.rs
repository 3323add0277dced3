use chrono::Local;

use crate::adapters::backup::backup_manager::BackupManager;
use crate::cli::BackupAction;
use crate::cli::commands::project::{Project, display_path};
use crate::cli::output;
use crate::core::errors::Result;

/// Execute the `poolboard backup` command.
///
/// Backups are plain copies of the database file taken while no store is
/// open, each with a SHA-256 sidecar checked before any restore.
pub fn execute(action: &BackupAction) -> Result<()> {
    let project = Project::load()?;
    let manager = BackupManager::new(
        project.backup_dir(),
        project.config.backup.retention_days,
    );

    match action {
        BackupAction::Create => {
            let now = Local::now().naive_local();
            let info = manager.create(&project.database_path(), now)?;
            output::success(&format!(
                "Backup created: {} ({} bytes)",
                display_path(&info.path),
                info.size
            ));
            for removed in manager.prune(now)? {
                output::warning(&format!("Removed expired backup {removed}"));
            }
        }
        BackupAction::List => {
            let backups = manager.list()?;
            if backups.is_empty() {
                output::warning("No backups yet. Run 'poolboard backup create'.");
                return Ok(());
            }
            let rows: Vec<Vec<String>> = backups
                .iter()
                .map(|b| {
                    vec![
                        b.file_name.clone(),
                        b.created.format("%d/%m/%Y %H:%M:%S").to_string(),
                        b.size.to_string(),
                        if b.has_checksum { "yes" } else { "no" }.to_string(),
                    ]
                })
                .collect();
            output::table(&["FILE", "CREATED", "BYTES", "CHECKSUM"], &rows);
        }
        BackupAction::Restore { file } => {
            manager.restore(file, &project.database_path())?;
            output::success(&format!("Restored {file}"));
        }
    }
    Ok(())
}
