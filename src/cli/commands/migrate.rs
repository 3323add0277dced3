use crate::adapters::sqlite::migrations::{self, MIGRATIONS};
use crate::adapters::sqlite::store::SqliteStore;
use crate::cli::MigrateAction;
use crate::cli::commands::project::Project;
use crate::cli::output;
use crate::core::errors::Result;

/// Execute the `poolboard migrate` command.
///
/// Connects without schema validation so an outdated database can be
/// inspected and upgraded.
pub fn execute(action: &MigrateAction) -> Result<()> {
    let project = Project::load()?;
    let store = SqliteStore::connect(&project.database_path())?;

    match action {
        MigrateAction::Status => {
            let current = store.schema_version()?;
            output::header("Schema versions");
            for m in MIGRATIONS {
                let mark = if m.version <= current { "applied" } else { "pending" };
                println!("  v{:<3} {:<8} {}", m.version, mark, m.name);
            }
            println!();
            output::field("current", &format!("v{current}"));
            output::field("latest", &format!("v{}", migrations::latest_version()));
        }
        MigrateAction::Up { to } => {
            let applied = store.migrate_up(*to)?;
            if applied.is_empty() {
                output::success(&format!(
                    "Database already at v{}",
                    store.schema_version()?
                ));
            } else {
                for v in &applied {
                    output::success(&format!("Applied v{v}"));
                }
            }
        }
        MigrateAction::Down { to } => {
            let reverted = store.migrate_down(*to)?;
            if reverted.is_empty() {
                output::success(&format!("Nothing to revert (at v{})", store.schema_version()?));
            } else {
                for v in &reverted {
                    output::warning(&format!("Reverted v{v}"));
                }
            }
        }
    }
    Ok(())
}
