use chrono::NaiveDate;

/// Day-first format used on screen, in exports and in the legacy report.
pub const DISPLAY_FORMAT: &str = "%d/%m/%Y";

/// Accepted input formats, tried in order. Day-first wins over the US
/// month-first form, which only applies when the day-first parse fails.
const INPUT_FORMATS: [&str; 3] = [DISPLAY_FORMAT, "%Y-%m-%d", "%m/%d/%Y"];

/// Parse a service date from free text.
///
/// Returns `None` for empty or unparseable input instead of failing, so a
/// malformed cell can never abort a filter pass.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    INPUT_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
}

/// Format a date for display, or `None` when absent.
pub fn format_date(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format(DISPLAY_FORMAT).to_string())
}
