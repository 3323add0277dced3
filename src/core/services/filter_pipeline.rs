use chrono::{Datelike, NaiveDate};

use crate::core::models::customer::{Customer, UNASSIGNED};
use crate::core::models::filter::{FilterCriteria, MonthFilter, StatusFilter, TechnicianFilter};
use crate::core::services::technician_normalizer;

/// Apply every active criterion to `rows`.
///
/// The predicates are independent and conjunctive, so their order does not
/// matter. The result keeps the input order. Inactive customers are only
/// dropped by an explicit status filter; no path hides them implicitly.
pub fn filter<'a>(rows: &'a [Customer], criteria: &FilterCriteria) -> Vec<&'a Customer> {
    let needle = search_needle(criteria.search.as_deref());

    rows.iter()
        .filter(|c| matches_status(c, criteria.status))
        .filter(|c| matches_technician(c, &criteria.technician))
        .filter(|c| matches_month(c, criteria.month))
        .filter(|c| matches_search(c, needle.as_deref()))
        .collect()
}

/// Lower-cased search text, or `None` when the search is blank.
fn search_needle(search: Option<&str>) -> Option<String> {
    search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
}

fn matches_status(customer: &Customer, filter: StatusFilter) -> bool {
    match filter {
        StatusFilter::All => true,
        StatusFilter::Only(status) => customer.status == status,
    }
}

fn matches_technician(customer: &Customer, filter: &TechnicianFilter) -> bool {
    match filter {
        TechnicianFilter::All => true,
        TechnicianFilter::Unassigned => {
            technician_normalizer::normalize(Some(&customer.technician)) == UNASSIGNED
        }
        TechnicianFilter::Named(name) => {
            technician_normalizer::normalize(Some(&customer.technician))
                == technician_normalizer::normalize(Some(name))
        }
    }
}

fn matches_month(customer: &Customer, filter: MonthFilter) -> bool {
    match filter {
        MonthFilter::All => true,
        MonthFilter::Month(month) => [customer.last_service_date, customer.next_service_date]
            .into_iter()
            .flatten()
            .any(|d: NaiveDate| d.month() == month),
    }
}

fn matches_search(customer: &Customer, needle: Option<&str>) -> bool {
    match needle {
        None => true,
        Some(needle) => customer.name.to_lowercase().contains(needle),
    }
}
