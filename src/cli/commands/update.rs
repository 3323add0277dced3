use crate::cli::commands::project::Project;
use crate::cli::output;
use crate::core::errors::Result;

/// Execute the `poolboard update` command.
///
/// All assignments are applied in one transaction: either every field
/// changes (each with its own history entry) or none does.
pub fn execute(name: &str, assignments: &[String], actor: Option<&str>) -> Result<()> {
    let project = Project::load()?;
    let service = project.service(actor)?;

    let customer = service.update(name, assignments)?;
    output::success(&format!(
        "Updated '{}' ({} field{})",
        customer.name,
        assignments.len(),
        if assignments.len() == 1 { "" } else { "s" }
    ));
    Ok(())
}
