use std::collections::BTreeMap;

use crate::cli::commands::project::Project;
use crate::cli::output;
use crate::core::errors::Result;
use crate::core::traits::customer_store::CustomerStore;

/// Execute the `poolboard normalize-techs` command.
pub fn execute(dry_run: bool, actor: Option<&str>) -> Result<()> {
    let project = Project::load()?;
    let service = project.service(actor)?;

    let fixes = service.normalize_technicians(dry_run)?;
    if fixes.is_empty() {
        output::success("All technician names are already normalized");
    } else {
        output::header(if dry_run {
            "Would change"
        } else {
            "Changed"
        });
        for fix in &fixes {
            println!("  {}: '{}' → '{}'", fix.customer, fix.from, fix.to);
        }
        if dry_run {
            output::warning(&format!(
                "Dry run: {} customers not modified",
                fixes.len()
            ));
        } else {
            output::success(&format!("Normalized {} customers", fixes.len()));
        }
    }

    // The distribution reflects stored values, so it is shown after writing.
    let mut distribution: BTreeMap<String, usize> = BTreeMap::new();
    for customer in service.store().list()? {
        *distribution.entry(customer.technician).or_default() += 1;
    }
    output::header("Customers per technician");
    for (technician, count) in &distribution {
        output::field(technician, &count.to_string());
    }
    Ok(())
}
