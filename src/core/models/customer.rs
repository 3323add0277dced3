use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::errors::PoolError;

/// Canonical technician token for customers without an assigned technician.
pub const UNASSIGNED: &str = "Unassigned";

/// Lifecycle state of a customer.
///
/// Any status may follow any other; only the vocabulary is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CustomerStatus {
    #[serde(rename = "Active (routed)")]
    ActiveRouted,
    #[serde(rename = "Active (no route)")]
    ActiveNoRoute,
    Inactive,
    Lead,
}

impl CustomerStatus {
    pub const ALL: [CustomerStatus; 4] = [
        CustomerStatus::ActiveRouted,
        CustomerStatus::ActiveNoRoute,
        CustomerStatus::Inactive,
        CustomerStatus::Lead,
    ];

    /// Value stored in the database and written to exports.
    pub fn as_str(self) -> &'static str {
        match self {
            CustomerStatus::ActiveRouted => "Active (routed)",
            CustomerStatus::ActiveNoRoute => "Active (no route)",
            CustomerStatus::Inactive => "Inactive",
            CustomerStatus::Lead => "Lead",
        }
    }

    /// Display label with a status marker, used by the projection.
    pub fn label(self) -> &'static str {
        match self {
            CustomerStatus::ActiveRouted => "✓ Active",
            CustomerStatus::ActiveNoRoute => "○ Active (no route)",
            CustomerStatus::Inactive => "✕ Inactive",
            CustomerStatus::Lead => "⚬ Lead",
        }
    }

    /// Active customers count towards revenue and the active total.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            CustomerStatus::ActiveRouted | CustomerStatus::ActiveNoRoute
        )
    }
}

impl fmt::Display for CustomerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CustomerStatus {
    type Err = PoolError;

    /// Accepts the canonical values (any case) plus the legacy labels
    /// found in older databases and spreadsheet exports.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        let status = match lowered.as_str() {
            "active (routed)" | "active" | "ativo" => CustomerStatus::ActiveRouted,
            "active (no route)" | "ativo sem rota" | "ativo (sem rota)" => {
                CustomerStatus::ActiveNoRoute
            }
            "inactive" | "inativo" => CustomerStatus::Inactive,
            "lead" => CustomerStatus::Lead,
            _ => {
                return Err(PoolError::validation(format!(
                    "unknown status '{}'. Expected one of: {}",
                    s.trim(),
                    CustomerStatus::ALL
                        .iter()
                        .map(|st| st.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                )));
            }
        };
        Ok(status)
    }
}

/// A persisted customer record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub status: CustomerStatus,
    pub technician: String,
    pub route_value: Decimal,
    pub filter_type: Option<String>,
    pub filter_value: Decimal,
    pub last_service_date: Option<NaiveDate>,
    pub next_service_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    /// Monthly revenue from this customer. Filter changes are one-off
    /// charges and do not count.
    pub fn monthly_revenue(&self) -> Decimal {
        self.route_value
    }
}

/// Key used for name uniqueness and lookup: trimmed and lower-cased with
/// full Unicode case mapping, so `ÁGUA` and `água` collide.
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Add up amounts, failing instead of overflowing.
pub fn sum_amounts(amounts: impl IntoIterator<Item = Decimal>) -> Result<Decimal, PoolError> {
    amounts.into_iter().try_fold(Decimal::ZERO, |total, amount| {
        total.checked_add(amount).ok_or_else(|| {
            PoolError::validation("revenue total is too large to compute; check the stored amounts")
        })
    })
}

/// Input for `CustomerStore::create`. Omitted fields take the defaults:
/// status `Lead`, technician `Unassigned`, monetary values zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewCustomer {
    pub name: String,
    pub status: Option<CustomerStatus>,
    pub technician: Option<String>,
    pub route_value: Option<Decimal>,
    pub filter_type: Option<String>,
    pub filter_value: Option<Decimal>,
    pub last_service_date: Option<NaiveDate>,
    pub next_service_date: Option<NaiveDate>,
}

impl NewCustomer {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}
