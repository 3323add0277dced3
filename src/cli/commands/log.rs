use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use colored::Colorize;

use crate::cli::commands::project::Project;
use crate::cli::output;
use crate::core::errors::{PoolError, Result};
use crate::core::models::audit_entry::{AuditAction, AuditEntry};
use crate::core::traits::audit::AuditLog;

/// Execute the `poolboard log` command.
///
/// Displays the change history with optional filters for customer, date,
/// and entry count.
pub fn execute(customer: Option<&str>, since: Option<&str>, last: Option<usize>) -> Result<()> {
    let project = Project::load()?;
    let store = project.open_store()?;

    let since_dt = since.map(parse_since).transpose()?;
    let entries = store.history(customer, since_dt)?;

    if entries.is_empty() {
        output::header("poolboard log");
        output::warning("No history entries found");
        if customer.is_some() || since.is_some() {
            println!("  Try removing filters to see all entries.");
        }
        return Ok(());
    }

    // --last N keeps the newest N, still printed oldest first.
    let skip = last.map_or(0, |n| entries.len().saturating_sub(n));
    let display = &entries[skip..];

    output::header(&format!("poolboard log ({} entries)", display.len()));
    println!();
    for entry in display {
        print_entry(entry);
    }
    Ok(())
}

/// Parse `YYYY-MM-DD` (midnight UTC) or a full RFC 3339 timestamp.
fn parse_since(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| {
            PoolError::validation(format!(
                "invalid date '{s}'. Expected YYYY-MM-DD, e.g. 2026-01-15"
            ))
        })
        .map(|d| Utc.from_utc_datetime(&d.and_hms_opt(0, 0, 0).expect("midnight is always valid")))
}

fn print_entry(entry: &AuditEntry) {
    let date = entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string();
    let action = match entry.action {
        AuditAction::Create => "create".green().to_string(),
        AuditAction::Update => "update".cyan().to_string(),
    };
    let change = match (&entry.action, entry.field.as_deref()) {
        (AuditAction::Create, _) => String::new(),
        (_, Some(field)) => format!(
            "{field}: {} → {}",
            entry.old_value.as_deref().unwrap_or("—"),
            entry.new_value.as_deref().unwrap_or("—")
        ),
        (_, None) => String::new(),
    };

    println!(
        "  {} {} {:<8} {:<24} {} {}",
        date.dimmed(),
        "│".dimmed(),
        action,
        entry.customer_name,
        change,
        format!("by {}", entry.actor).dimmed(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn since_accepts_date_and_timestamp() {
        let day = parse_since("2026-01-15").unwrap();
        assert_eq!(day.to_rfc3339(), "2026-01-15T00:00:00+00:00");
        let ts = parse_since("2026-01-15T10:30:00-03:00").unwrap();
        assert_eq!(ts.to_rfc3339(), "2026-01-15T13:30:00+00:00");
        assert!(parse_since("15/01/2026").is_err());
    }
}
