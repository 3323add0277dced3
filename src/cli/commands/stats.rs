use colored::Colorize;

use crate::cli::commands::project::{Project, today};
use crate::cli::output;
use crate::core::errors::Result;
use crate::core::services::projection::format_currency;

/// Execute the `poolboard stats` command.
pub fn execute(actor: Option<&str>) -> Result<()> {
    let project = Project::load()?;
    let service = project.service(actor)?;

    let dashboard = service.dashboard(today())?;
    let breakdown = service.breakdown()?;

    output::header("poolboard — Statistics");
    output::field("active customers", &dashboard.active_count.to_string());
    output::field(
        "monthly revenue",
        &format_currency(Some(dashboard.active_revenue)),
    );
    output::field("upcoming services", &dashboard.upcoming_count.to_string());

    println!("\n{}", "  By status".bold());
    if breakdown.per_status.is_empty() {
        println!("  {}", "no customers yet".dimmed());
    }
    for (status, count) in &breakdown.per_status {
        output::field(status.label(), &count.to_string());
    }

    println!("\n{}", "  Revenue by technician (active customers)".bold());
    if breakdown.revenue_by_technician.is_empty() {
        println!("  {}", "no active customers".dimmed());
    }
    for (technician, revenue) in &breakdown.revenue_by_technician {
        output::field(technician, &format_currency(Some(*revenue)));
    }
    Ok(())
}
