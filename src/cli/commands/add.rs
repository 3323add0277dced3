use crate::cli::commands::project::Project;
use crate::cli::output;
use crate::core::errors::Result;
use crate::core::services::customer_service::CustomerForm;
use crate::core::services::dates;

/// Execute the `poolboard add` command.
pub fn execute(form: CustomerForm, actor: Option<&str>) -> Result<()> {
    let project = Project::load()?;
    let service = project.service(actor)?;

    let customer = service.create(form)?;
    output::success(&format!("Added '{}'", customer.name));
    output::field("status", customer.status.as_str());
    output::field("technician", &customer.technician);
    if let Some(next) = dates::format_date(customer.next_service_date) {
        output::field("next service", &next);
    }
    Ok(())
}
