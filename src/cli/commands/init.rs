use crate::adapters::sqlite::store::SqliteStore;
use crate::cli::commands::project::display_path;
use crate::cli::{context, output};
use crate::config::app_config::AppConfig;
use crate::core::errors::{PoolError, Result};

/// Execute the `poolboard init` command.
///
/// Creates the project directory, writes a default `config.toml` and
/// creates the database at the latest schema version.
pub fn execute(verbose: bool) -> Result<()> {
    let dir = context::poolboard_dir();
    if dir.join("config.toml").exists() {
        return Err(PoolError::InvalidConfig {
            detail: format!(
                "poolboard is already initialized here ({} exists)",
                dir.display()
            ),
        });
    }

    output::header("poolboard — Initializing project");

    std::fs::create_dir_all(dir)?;
    output::success(&format!("Created {}/", display_path(dir)));

    std::fs::write(dir.join("config.toml"), AppConfig::default_toml()?)?;
    output::success("Generated config.toml with defaults");

    let config = AppConfig::load(dir)?;
    let db_path = config.database_path(dir);
    let store = SqliteStore::open(&db_path, true)?;
    output::success(&format!(
        "Created database {} (schema v{})",
        display_path(&db_path),
        store.schema_version()?
    ));

    output::success("Project ready.\n");
    print_next_steps(verbose);
    Ok(())
}

fn print_next_steps(verbose: bool) {
    println!("  Next steps:");
    println!("    poolboard import --csv <report.csv>   Bring in the legacy spreadsheet");
    println!("    poolboard add \"Customer name\"         Add a customer by hand");
    println!("    poolboard list                        Browse customers");
    if verbose {
        println!();
        println!("  Set POOLBOARD_ACTOR to record your name in the change history.");
        println!("  Edit config.toml to change the page size, export delimiter or backup retention.");
    }
}
