use std::str::FromStr;

use crate::core::errors::PoolError;
use crate::core::models::customer::{CustomerStatus, UNASSIGNED};
use crate::core::services::technician_normalizer;

/// Sentinel words that select every value of a filter.
const ALL_WORDS: [&str; 3] = ["all", "todos", "*"];

fn is_all(s: &str) -> bool {
    ALL_WORDS.contains(&s.trim().to_lowercase().as_str())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Only(CustomerStatus),
}

impl FromStr for StatusFilter {
    type Err = PoolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if is_all(s) {
            return Ok(StatusFilter::All);
        }
        Ok(StatusFilter::Only(s.parse()?))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TechnicianFilter {
    #[default]
    All,
    Unassigned,
    /// A normalized technician name.
    Named(String),
}

impl FromStr for TechnicianFilter {
    type Err = PoolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if is_all(s) {
            return Ok(TechnicianFilter::All);
        }
        let normalized = technician_normalizer::normalize(Some(s));
        if normalized == UNASSIGNED {
            Ok(TechnicianFilter::Unassigned)
        } else {
            Ok(TechnicianFilter::Named(normalized))
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MonthFilter {
    #[default]
    All,
    /// Calendar month, 1 through 12.
    Month(u32),
}

impl FromStr for MonthFilter {
    type Err = PoolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if is_all(s) {
            return Ok(MonthFilter::All);
        }
        match s.trim().parse::<u32>() {
            Ok(m @ 1..=12) => Ok(MonthFilter::Month(m)),
            _ => Err(PoolError::validation(format!(
                "'{}' is not a month. Use 1-12 or 'all'",
                s.trim()
            ))),
        }
    }
}

/// Filter selections supplied by the presentation layer.
///
/// Every active criterion is an independent predicate; a row is kept only
/// if it satisfies all of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub status: StatusFilter,
    pub technician: TechnicianFilter,
    pub month: MonthFilter,
    pub search: Option<String>,
}
