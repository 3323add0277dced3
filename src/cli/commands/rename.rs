use crate::cli::commands::project::Project;
use crate::cli::output;
use crate::core::errors::Result;

/// Execute the `poolboard rename` command.
pub fn execute(old: &str, new: &str, actor: Option<&str>) -> Result<()> {
    let project = Project::load()?;
    let service = project.service(actor)?;

    let customer = service.rename(old, new)?;
    output::success(&format!("Renamed '{}' to '{}'", old.trim(), customer.name));
    Ok(())
}
