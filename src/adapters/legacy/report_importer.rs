use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::core::errors::{PoolError, Result};
use crate::core::models::customer::{NewCustomer, name_key};
use crate::core::models::field::CustomerField;
use crate::core::services::customer_service::CustomerForm;
use crate::core::services::export_service::parse_delimited;

/// A legacy row that could not be converted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRow {
    pub origin: String,
    pub name: String,
    pub reason: String,
}

/// Everything read from the legacy files, ready for insertion.
#[derive(Debug, Default)]
pub struct LegacyData {
    pub customers: Vec<NewCustomer>,
    pub rejected: Vec<RejectedRow>,
}

/// Layout of the legacy JSON side store.
///
/// `_new_customers` holds rows added through the old dashboard; every other
/// object-valued key is a customer name mapping legacy headers to values
/// that override the report. `_audit_log` is not imported.
#[derive(Debug, Default, Deserialize)]
struct SideStore {
    #[serde(rename = "_new_customers", default)]
    new_customers: Vec<BTreeMap<String, Value>>,
    #[serde(rename = "_audit_log", default)]
    _audit_log: Vec<Value>,
    #[serde(flatten)]
    entries: BTreeMap<String, Value>,
}

/// A row keyed by mapped column, still holding raw text.
#[derive(Debug, Default)]
struct RawCustomer {
    origin: String,
    name: String,
    fields: HashMap<CustomerField, String>,
}

#[derive(Debug, Clone, Copy)]
enum Column {
    Name,
    Field(CustomerField),
    Ignored,
}

fn classify(header: &str) -> Column {
    let header = header.trim().trim_start_matches('\u{feff}');
    if header.eq_ignore_ascii_case("name") || header.eq_ignore_ascii_case("nome") {
        return Column::Name;
    }
    header.parse().map_or(Column::Ignored, Column::Field)
}

fn json_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Null => Some(String::new()),
        _ => None,
    }
}

/// Reads the spreadsheet report and JSON side store of the old dashboard.
pub struct LegacyImporter {
    delimiter: char,
}

impl LegacyImporter {
    pub fn new(delimiter: char) -> Self {
        Self { delimiter }
    }

    /// Read both sources, apply side-store overrides, and convert every
    /// row. Rows that fail validation are collected in `rejected`.
    pub fn load(&self, report: &Path, side_store: Option<&Path>) -> Result<LegacyData> {
        let mut rows = self.read_report(report)?;

        if let Some(path) = side_store {
            let store = read_side_store(path)?;
            rows.extend(store.new_customers.iter().enumerate().map(|(i, obj)| {
                raw_from_object(format!("side store entry {}", i + 1), obj)
            }));
            apply_overrides(&mut rows, &store.entries);
        }

        let mut data = LegacyData::default();
        for raw in rows {
            match convert(&raw) {
                Ok(customer) => data.customers.push(customer),
                Err(e) => {
                    warn!(origin = %raw.origin, name = %raw.name, error = %e, "skipping legacy row");
                    data.rejected.push(RejectedRow {
                        origin: raw.origin,
                        name: raw.name,
                        reason: e.to_string(),
                    });
                }
            }
        }
        debug!(
            accepted = data.customers.len(),
            rejected = data.rejected.len(),
            "legacy data loaded"
        );
        Ok(data)
    }

    fn read_report(&self, path: &Path) -> Result<Vec<RawCustomer>> {
        let content = fs::read_to_string(path).map_err(|e| import_error(path, e.to_string()))?;
        let mut records = parse_delimited(&content, self.delimiter).into_iter();

        let header = records
            .next()
            .ok_or_else(|| import_error(path, "the report is empty"))?;
        let columns: Vec<Column> = header.iter().map(String::as_str).map(classify).collect();
        if !columns.iter().any(|c| matches!(c, Column::Name)) {
            return Err(import_error(path, "the report has no 'Name' column"));
        }

        let rows = records
            .enumerate()
            .filter(|(_, record)| record.iter().any(|f| !f.trim().is_empty()))
            .map(|(i, record)| {
                // Line 1 is the header.
                let mut raw = RawCustomer {
                    origin: format!("report line {}", i + 2),
                    ..RawCustomer::default()
                };
                for (column, value) in columns.iter().zip(record) {
                    match column {
                        Column::Name => raw.name = value.trim().to_string(),
                        Column::Field(field) => {
                            raw.fields.insert(*field, value);
                        }
                        Column::Ignored => {}
                    }
                }
                raw
            })
            .collect();
        Ok(rows)
    }
}

fn import_error(path: &Path, detail: impl Into<String>) -> PoolError {
    PoolError::Import {
        path: PathBuf::from(path),
        detail: detail.into(),
    }
}

fn read_side_store(path: &Path) -> Result<SideStore> {
    let content = fs::read_to_string(path).map_err(|e| import_error(path, e.to_string()))?;
    serde_json::from_str(&content).map_err(|e| import_error(path, format!("invalid JSON: {e}")))
}

fn raw_from_object(origin: String, obj: &BTreeMap<String, Value>) -> RawCustomer {
    let mut raw = RawCustomer {
        origin,
        ..RawCustomer::default()
    };
    for (key, value) in obj {
        let Some(text) = json_text(value) else { continue };
        match classify(key) {
            Column::Name => raw.name = text.trim().to_string(),
            Column::Field(field) => {
                raw.fields.insert(field, text);
            }
            Column::Ignored => {}
        }
    }
    raw
}

fn apply_overrides(rows: &mut [RawCustomer], entries: &BTreeMap<String, Value>) {
    for (name, value) in entries {
        let Value::Object(fields) = value else { continue };
        let index = rows
            .iter()
            .position(|r| r.name == *name)
            .or_else(|| rows.iter().position(|r| name_key(&r.name) == name_key(name)));
        let Some(row) = index.map(|i| &mut rows[i]) else {
            debug!(name = %name, "override for unknown customer ignored");
            continue;
        };
        for (key, value) in fields {
            if let (Column::Field(field), Some(text)) = (classify(key), json_text(value)) {
                row.fields.insert(field, text);
            }
        }
    }
}

fn convert(raw: &RawCustomer) -> Result<NewCustomer> {
    // Blank cells mean "not set" in the report, not "clear".
    let get = |field: CustomerField| {
        raw.fields
            .get(&field)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };
    CustomerForm {
        name: raw.name.clone(),
        status: get(CustomerField::Status),
        technician: get(CustomerField::Technician),
        route_value: get(CustomerField::RouteValue),
        filter_type: get(CustomerField::FilterType),
        filter_value: get(CustomerField::FilterValue),
        last_service: get(CustomerField::LastServiceDate),
        next_service: get(CustomerField::NextServiceDate),
    }
    .into_new_customer()
}
