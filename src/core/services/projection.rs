use rust_decimal::{Decimal, RoundingStrategy};

use crate::core::models::customer::Customer;
use crate::core::models::display_row::{DisplayRow, Page, PageRow, RowAction};
use crate::core::services::dates;

/// Shown for absent text and zero amounts.
pub const EMPTY_PLACEHOLDER: &str = "—";

/// Shown for absent service dates.
pub const NO_DATE_PLACEHOLDER: &str = "Not scheduled";

/// Format the filtered rows for display. Pure: the customers are borrowed
/// and never modified.
pub fn project(rows: &[&Customer]) -> Vec<DisplayRow> {
    rows.iter().copied().map(project_one).collect()
}

fn project_one(c: &Customer) -> DisplayRow {
    DisplayRow {
        name: c.name.clone(),
        status: c.status.label().to_string(),
        technician: c.technician.clone(),
        filter_type: c
            .filter_type
            .clone()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| EMPTY_PLACEHOLDER.to_string()),
        route_value: format_currency(Some(c.route_value)),
        filter_value: format_currency(Some(c.filter_value)),
        last_service: dates::format_date(c.last_service_date)
            .unwrap_or_else(|| NO_DATE_PLACEHOLDER.to_string()),
        next_service: dates::format_date(c.next_service_date)
            .unwrap_or_else(|| NO_DATE_PLACEHOLDER.to_string()),
    }
}

/// `$1,234.50` style currency, or the placeholder for zero / absent amounts.
pub fn format_currency(value: Option<Decimal>) -> String {
    match value {
        Some(v) if v > Decimal::ZERO => {
            let rounded = v.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
            let text = format!("{rounded:.2}");
            let (whole, cents) = text.split_once('.').unwrap_or((text.as_str(), "00"));
            format!("${}.{cents}", group_thousands(whole))
        }
        _ => EMPTY_PLACEHOLDER.to_string(),
    }
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Slice `rows` into a 1-based page of `page_size` rows.
///
/// Out-of-range page numbers are clamped to the nearest valid page. Each
/// rendered row carries an edit action pointing at its absolute index.
pub fn paginate(rows: Vec<DisplayRow>, page: usize, page_size: usize) -> Page {
    let page_size = page_size.max(1);
    let total_rows = rows.len();
    let page_count = total_rows.div_ceil(page_size).max(1);
    let number = page.clamp(1, page_count);
    let start = (number - 1) * page_size;

    let rows = rows
        .into_iter()
        .enumerate()
        .skip(start)
        .take(page_size)
        .map(|(index, row)| PageRow {
            action: RowAction::Edit {
                index,
                customer: row.name.clone(),
            },
            row,
        })
        .collect();

    Page {
        number,
        page_count,
        total_rows,
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::customer::CustomerStatus;
    use chrono::{NaiveDate, Utc};

    fn customer(name: &str) -> Customer {
        Customer {
            id: 1,
            name: name.to_string(),
            status: CustomerStatus::ActiveNoRoute,
            technician: "Pedro Santos".into(),
            route_value: Decimal::ZERO,
            filter_type: Some("Hayward C750".into()),
            filter_value: Decimal::new(123450, 2),
            last_service_date: NaiveDate::from_ymd_opt(2025, 11, 3),
            next_service_date: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn projects_labels_currency_and_dates() {
        let c = customer("Casa Azul");
        let rows = project(&[&c]);
        let row = &rows[0];
        assert_eq!(row.name, "Casa Azul");
        assert_eq!(row.status, "○ Active (no route)");
        assert_eq!(row.filter_type, "Hayward C750");
        assert_eq!(row.filter_value, "$1,234.50");
        assert_eq!(row.route_value, EMPTY_PLACEHOLDER);
        assert_eq!(row.last_service, "03/11/2025");
        assert_eq!(row.next_service, NO_DATE_PLACEHOLDER);
    }

    #[test]
    fn projection_leaves_source_untouched() {
        let c = customer("Casa Azul");
        let before = c.clone();
        let _ = project(&[&c]);
        assert_eq!(c, before);
    }

    #[test]
    fn blank_filter_type_uses_placeholder() {
        let mut c = customer("X");
        c.filter_type = Some("  ".into());
        assert_eq!(project(&[&c])[0].filter_type, EMPTY_PLACEHOLDER);
    }

    #[test]
    fn currency_formatting() {
        assert_eq!(format_currency(None), EMPTY_PLACEHOLDER);
        assert_eq!(format_currency(Some(Decimal::ZERO)), EMPTY_PLACEHOLDER);
        assert_eq!(format_currency(Some(Decimal::new(150, 0))), "$150.00");
        assert_eq!(format_currency(Some(Decimal::new(1_000_000, 0))), "$1,000,000.00");
        assert_eq!(format_currency(Some(Decimal::new(9995, 3))), "$10.00");
    }

    fn rows(n: usize) -> Vec<DisplayRow> {
        (0..n)
            .map(|i| {
                let c = customer(&format!("Customer {i:02}"));
                project(&[&c]).remove(0)
            })
            .collect()
    }

    #[test]
    fn pagination_actions_use_absolute_indices() {
        let page = paginate(rows(45), 2, 20);
        assert_eq!(page.number, 2);
        assert_eq!(page.page_count, 3);
        assert_eq!(page.total_rows, 45);
        assert_eq!(page.rows.len(), 20);
        assert_eq!(
            page.rows[0].action,
            RowAction::Edit {
                index: 20,
                customer: "Customer 20".into()
            }
        );
    }

    #[test]
    fn last_page_is_partial_and_out_of_range_clamps() {
        let page = paginate(rows(45), 99, 20);
        assert_eq!(page.number, 3);
        assert_eq!(page.rows.len(), 5);

        let first = paginate(rows(3), 0, 20);
        assert_eq!(first.number, 1);
        assert_eq!(first.rows.len(), 3);
    }

    #[test]
    fn empty_input_yields_one_empty_page() {
        let page = paginate(Vec::new(), 1, 20);
        assert_eq!(page.page_count, 1);
        assert!(page.rows.is_empty());
    }
}
