use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::core::errors::{PoolError, Result};
use crate::core::models::customer::CustomerStatus;
use crate::core::services::{dates, technician_normalizer};

/// Editable customer fields.
///
/// Every field maps to exactly one storage column through [`FIELD_TABLE`].
/// The name is not in this enum: renaming has its own operation because it
/// must keep the uniqueness invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CustomerField {
    Status,
    Technician,
    RouteValue,
    FilterType,
    FilterValue,
    LastServiceDate,
    NextServiceDate,
}

/// One row of the field table: enum variant, CLI key, storage column,
/// and the legacy spreadsheet headers that map to it.
pub struct FieldSpec {
    pub field: CustomerField,
    pub key: &'static str,
    pub column: &'static str,
    pub aliases: &'static [&'static str],
}

pub const FIELD_TABLE: [FieldSpec; 7] = [
    FieldSpec {
        field: CustomerField::Status,
        key: "status",
        column: "status",
        aliases: &["Status"],
    },
    FieldSpec {
        field: CustomerField::Technician,
        key: "technician",
        column: "technician",
        aliases: &["Route Tech", "piscineiro", "tech"],
    },
    FieldSpec {
        field: CustomerField::RouteValue,
        key: "route_value",
        column: "route_value",
        aliases: &["Route Price", "valor_rota"],
    },
    FieldSpec {
        field: CustomerField::FilterType,
        key: "filter_type",
        column: "filter_type",
        aliases: &["tipo_filtro"],
    },
    FieldSpec {
        field: CustomerField::FilterValue,
        key: "filter_value",
        column: "filter_value",
        aliases: &["valor_filtro"],
    },
    FieldSpec {
        field: CustomerField::LastServiceDate,
        key: "last_service",
        column: "last_service_date",
        aliases: &["Ultima Troca", "Last Changed", "ultima_troca"],
    },
    FieldSpec {
        field: CustomerField::NextServiceDate,
        key: "next_service",
        column: "next_service_date",
        aliases: &["Proxima Troca", "Next Change", "proxima_troca"],
    },
];

impl CustomerField {
    pub fn spec(self) -> &'static FieldSpec {
        FIELD_TABLE
            .iter()
            .find(|s| s.field == self)
            .expect("every CustomerField has a FIELD_TABLE row")
    }

    pub fn key(self) -> &'static str {
        self.spec().key
    }

    pub fn column(self) -> &'static str {
        self.spec().column
    }

    /// Comma-separated list of accepted keys, for error messages.
    pub fn valid_keys() -> String {
        FIELD_TABLE
            .iter()
            .map(|s| s.key)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Convert raw form text into a typed value for this field.
    ///
    /// Technician names are normalized, monetary input must be a
    /// non-negative decimal, and dates must parse when non-empty (an empty
    /// string clears the date).
    pub fn parse_value(self, raw: &str) -> Result<FieldValue> {
        let trimmed = raw.trim();
        match self {
            CustomerField::Status => Ok(FieldValue::Status(trimmed.parse()?)),
            CustomerField::Technician => Ok(FieldValue::Text(Some(
                technician_normalizer::normalize(Some(trimmed)),
            ))),
            CustomerField::FilterType => Ok(FieldValue::Text(
                (!trimmed.is_empty()).then(|| trimmed.to_string()),
            )),
            CustomerField::RouteValue | CustomerField::FilterValue => {
                Ok(FieldValue::Money(parse_money(trimmed)?))
            }
            CustomerField::LastServiceDate | CustomerField::NextServiceDate => {
                if trimmed.is_empty() {
                    return Ok(FieldValue::Date(None));
                }
                dates::parse_date(trimmed)
                    .map(|d| FieldValue::Date(Some(d)))
                    .ok_or_else(|| {
                        PoolError::validation(format!(
                            "'{trimmed}' is not a valid date for {}. Use DD/MM/YYYY or YYYY-MM-DD",
                            self.key()
                        ))
                    })
            }
        }
    }
}

impl fmt::Display for CustomerField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for CustomerField {
    type Err = PoolError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim();
        FIELD_TABLE
            .iter()
            .find(|spec| {
                spec.key.eq_ignore_ascii_case(wanted)
                    || spec.aliases.iter().any(|a| a.eq_ignore_ascii_case(wanted))
            })
            .map(|spec| spec.field)
            .ok_or_else(|| PoolError::UnknownField {
                field: wanted.to_string(),
                valid: CustomerField::valid_keys(),
            })
    }
}

/// Largest amount accepted for a single route or filter value.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// Parse a monetary amount. Empty input is zero; negatives and amounts
/// above [`MAX_AMOUNT`] are rejected.
///
/// A leading `$` and thousands separators are tolerated so values copied
/// from the formatted table parse back.
pub fn parse_money(raw: &str) -> Result<Decimal> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|c| *c != ',')
        .collect();
    if cleaned.is_empty() {
        return Ok(Decimal::ZERO);
    }
    let value: Decimal = cleaned
        .parse()
        .map_err(|_| PoolError::validation(format!("'{}' is not a valid amount", raw.trim())))?;
    if value.is_sign_negative() && !value.is_zero() {
        return Err(PoolError::validation(format!(
            "amount cannot be negative (got {value})"
        )));
    }
    if value > MAX_AMOUNT {
        return Err(PoolError::validation(format!(
            "amount {value} is above the {MAX_AMOUNT} limit"
        )));
    }
    Ok(value.round_dp(2))
}

/// A typed value for one [`CustomerField`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Status(CustomerStatus),
    Text(Option<String>),
    Money(Decimal),
    Date(Option<NaiveDate>),
}

impl FieldValue {
    /// Text recorded in the audit log for this value.
    pub fn audit_text(&self) -> Option<String> {
        match self {
            FieldValue::Status(s) => Some(s.as_str().to_string()),
            FieldValue::Text(t) => t.clone(),
            FieldValue::Money(m) => Some(m.to_string()),
            FieldValue::Date(d) => d.map(|d| d.format("%Y-%m-%d").to_string()),
        }
    }

    /// Whether this value is the right kind for `field`.
    pub fn fits(&self, field: CustomerField) -> bool {
        matches!(
            (field, self),
            (CustomerField::Status, FieldValue::Status(_))
                | (CustomerField::Technician, FieldValue::Text(Some(_)))
                | (CustomerField::FilterType, FieldValue::Text(_))
                | (CustomerField::RouteValue, FieldValue::Money(_))
                | (CustomerField::FilterValue, FieldValue::Money(_))
                | (CustomerField::LastServiceDate, FieldValue::Date(_))
                | (CustomerField::NextServiceDate, FieldValue::Date(_))
        )
    }
}

/// A single field assignment, as applied by `update` / `update_batch`.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    pub field: CustomerField,
    pub value: FieldValue,
}

impl FieldChange {
    pub fn new(field: CustomerField, value: FieldValue) -> Self {
        Self { field, value }
    }

    /// Parse a `key=value` pair from the command line.
    pub fn parse_assignment(pair: &str) -> Result<Self> {
        let (key, raw) = pair.split_once('=').ok_or_else(|| {
            PoolError::validation(format!("expected field=value, got '{pair}'"))
        })?;
        let field: CustomerField = key.parse()?;
        let value = field.parse_value(raw)?;
        Ok(Self { field, value })
    }
}
