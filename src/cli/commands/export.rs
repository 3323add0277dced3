use std::path::PathBuf;

use crate::cli::FilterArgs;
use crate::cli::commands::project::{Project, display_path};
use crate::cli::output;
use crate::core::errors::Result;
use crate::core::services::export_service::ExportService;

/// Execute the `poolboard export` command.
///
/// Applies the same filters as `list` and writes the matching customers
/// as delimited text, to a file or to stdout.
pub fn execute(
    filters: &FilterArgs,
    output_path: Option<&str>,
    to_stdout: bool,
    actor: Option<&str>,
) -> Result<()> {
    let project = Project::load()?;
    let service = project.service(actor)?;
    let exporter = ExportService::new(project.config.export.delimiter_char()?)?;

    let customers = service.query(&filters.criteria()?)?;
    let refs: Vec<_> = customers.iter().collect();
    let text = exporter.render(&refs);

    if to_stdout {
        print!("{text}");
        return Ok(());
    }

    // Without -o the configured file lands in the project directory.
    let path = output_path
        .map(PathBuf::from)
        .unwrap_or_else(|| project.dir.join(&project.config.export.file_name));
    std::fs::write(&path, text)?;
    tracing::info!(path = %path.display(), rows = customers.len(), "export written");
    output::success(&format!(
        "Exported {} customer{} to {}",
        customers.len(),
        if customers.len() == 1 { "" } else { "s" },
        display_path(&path)
    ));
    Ok(())
}
