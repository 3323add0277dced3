use rust_decimal::Decimal;

use crate::core::errors::{PoolError, Result};
use crate::core::models::customer::Customer;
use crate::core::services::dates;

/// Export column order. Fixed: downstream spreadsheets rely on it.
pub const EXPORT_HEADER: [&str; 7] = [
    "name",
    "status",
    "technician",
    "filter type",
    "filter value",
    "last service date",
    "next service date",
];

/// Serializes filtered customers to delimited text.
///
/// Fields containing the delimiter, a quote, or a line break are wrapped
/// in double quotes with inner quotes doubled. Values are raw (canonical
/// status, plain decimal, `dd/mm/yyyy` dates), not display-formatted.
pub struct ExportService {
    delimiter: char,
}

impl ExportService {
    pub fn new(delimiter: char) -> Result<Self> {
        if delimiter == '"' || delimiter == '\n' || delimiter == '\r' || delimiter.is_alphanumeric() {
            return Err(PoolError::InvalidConfig {
                detail: format!("'{delimiter}' cannot be used as an export delimiter"),
            });
        }
        Ok(Self { delimiter })
    }

    /// Render the header plus one line per customer, `\n`-terminated.
    pub fn render(&self, rows: &[&Customer]) -> String {
        let mut out = String::new();
        self.push_line(&mut out, EXPORT_HEADER.iter().map(|h| h.to_string()));
        for c in rows {
            self.push_line(&mut out, Self::fields(c).into_iter());
        }
        out
    }

    fn fields(c: &Customer) -> [String; 7] {
        [
            c.name.clone(),
            c.status.as_str().to_string(),
            c.technician.clone(),
            c.filter_type.clone().unwrap_or_default(),
            plain_amount(c.filter_value),
            dates::format_date(c.last_service_date).unwrap_or_default(),
            dates::format_date(c.next_service_date).unwrap_or_default(),
        ]
    }

    fn push_line(&self, out: &mut String, fields: impl Iterator<Item = String>) {
        for (i, field) in fields.enumerate() {
            if i > 0 {
                out.push(self.delimiter);
            }
            out.push_str(&self.quote(&field));
        }
        out.push('\n');
    }

    fn quote(&self, field: &str) -> String {
        let needs_quotes = field.contains(self.delimiter)
            || field.contains('"')
            || field.contains('\n')
            || field.contains('\r');
        if needs_quotes {
            format!("\"{}\"", field.replace('"', "\"\""))
        } else {
            field.to_string()
        }
    }
}

fn plain_amount(value: Decimal) -> String {
    format!("{:.2}", value.round_dp(2))
}

/// Split delimited text into records, honoring the quoting rules used by
/// [`ExportService`]. Used to read legacy spreadsheet reports.
pub fn parse_delimited(content: &str, delimiter: char) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => field.push(ch),
            }
            continue;
        }
        match ch {
            '"' if field.is_empty() => in_quotes = true,
            c if c == delimiter => record.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            _ => field.push(ch),
        }
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }
    records
}
