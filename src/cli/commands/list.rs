use colored::Colorize;

use crate::cli::FilterArgs;
use crate::cli::commands::project::{Project, today};
use crate::cli::output;
use crate::core::errors::{PoolError, Result};
use crate::core::models::display_row::{DisplayColumn, Page, RowAction};
use crate::core::services::projection;

pub struct ListOptions<'a> {
    pub filters: &'a FilterArgs,
    pub page: usize,
    pub page_size: Option<usize>,
    pub options: bool,
    pub json: bool,
}

/// Execute the `poolboard list` command.
///
/// Filters the customers, projects them for display and prints one page
/// under the dashboard totals.
pub fn execute(opts: ListOptions<'_>, actor: Option<&str>) -> Result<()> {
    let project = Project::load()?;
    let service = project.service(actor)?;

    if opts.options {
        let options = service.filter_options()?;
        return print_options(&options);
    }

    let criteria = opts.filters.criteria()?;
    let customers = service.query(&criteria)?;
    let refs: Vec<_> = customers.iter().collect();
    let page_size = opts.page_size.unwrap_or(project.config.poolboard.page_size);
    let page = projection::paginate(projection::project(&refs), opts.page, page_size);

    if opts.json {
        let text = serde_json::to_string_pretty(&page).map_err(|e| PoolError::Render {
            detail: format!("failed to serialize page: {e}"),
        })?;
        println!("{text}");
        return Ok(());
    }

    let stats = service.dashboard(today())?;
    output::header("poolboard — Customers");
    println!(
        "  {} active   {} monthly revenue   {} upcoming services\n",
        stats.active_count.to_string().cyan(),
        projection::format_currency(Some(stats.active_revenue)).cyan(),
        stats.upcoming_count.to_string().cyan(),
    );

    print_page(&page);
    Ok(())
}

fn print_page(page: &Page) {
    if page.rows.is_empty() {
        output::warning("No customers match these filters");
        return;
    }

    let mut headers = vec!["#"];
    headers.extend(DisplayColumn::ALL.iter().map(|c| c.label()));

    let rows: Vec<Vec<String>> = page
        .rows
        .iter()
        .map(|r| {
            let RowAction::Edit { index, .. } = &r.action;
            let mut cells = vec![(index + 1).to_string()];
            cells.extend(DisplayColumn::ALL.iter().map(|c| r.row.cell(*c).to_string()));
            cells
        })
        .collect();
    output::table(&headers, &rows);

    println!(
        "\n  {}",
        format!(
            "Page {} of {} ({} customers)",
            page.number, page.page_count, page.total_rows
        )
        .dimmed()
    );
}

fn print_options(options: &crate::core::services::option_cache::FilterOptions) -> Result<()> {
    output::header("Filter options");
    let statuses: Vec<&str> = options.statuses.iter().map(|s| s.as_str()).collect();
    let months: Vec<String> = options.months.iter().map(|m| format!("{m:02}")).collect();
    output::field("status", &format!("all, {}", statuses.join(", ")));
    output::field(
        "technician",
        &format!("all, unassigned, {}", options.technicians.join(", ")),
    );
    output::field("month", &format!("all, {}", months.join(", ")));
    Ok(())
}
