use crate::cli::commands::project::Project;
use crate::cli::output;
use crate::core::errors::Result;

/// Execute the `poolboard techs` command.
///
/// Lists the distinct normalized technicians currently assigned.
pub fn execute(actor: Option<&str>) -> Result<()> {
    let project = Project::load()?;
    let service = project.service(actor)?;
    let options = service.filter_options()?;

    if options.technicians.is_empty() {
        output::warning("No technicians assigned yet");
        return Ok(());
    }
    output::header(&format!("Technicians ({})", options.technicians.len()));
    for technician in &options.technicians {
        println!("  {technician}");
    }
    Ok(())
}
