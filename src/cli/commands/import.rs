use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};

use crate::adapters::legacy::report_importer::LegacyImporter;
use crate::cli::commands::project::Project;
use crate::cli::output;
use crate::core::errors::Result;

/// Execute the `poolboard import` command.
///
/// Reads the legacy report (and optional JSON side store) and inserts the
/// customers that do not exist yet, each as an audited creation.
pub fn execute(csv: &str, json: Option<&str>, quiet: bool) -> Result<()> {
    let project = Project::load()?;
    let service = project.service(None)?;

    let importer = LegacyImporter::new(',');
    let data = importer.load(Path::new(csv), json.map(Path::new))?;

    for rejected in &data.rejected {
        output::warning(&format!(
            "Skipped {} '{}': {}",
            rejected.origin, rejected.name, rejected.reason
        ));
    }

    let pb = if quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(data.customers.len() as u64)
    };
    pb.set_style(
        ProgressStyle::with_template("  {bar:30.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let summary = service.import(data.customers, |name| {
        pb.set_message(name.to_string());
        pb.inc(1);
    })?;
    pb.finish_and_clear();

    output::success(&format!("Imported {} customers", summary.imported));
    if summary.skipped > 0 {
        output::warning(&format!(
            "{} already existed and were left unchanged",
            summary.skipped
        ));
    }
    if !data.rejected.is_empty() {
        output::warning(&format!("{} rows had invalid values", data.rejected.len()));
    }
    Ok(())
}
