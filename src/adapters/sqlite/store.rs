use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tokio::runtime::Runtime;
use tracing::{debug, info};

use crate::adapters::sqlite::migrations;
use crate::core::errors::{PoolError, Result};
use crate::core::models::audit_entry::{AuditAction, AuditEntry};
use crate::core::models::customer::{
    Customer, CustomerStatus, NewCustomer, UNASSIGNED, name_key, sum_amounts,
};
use crate::core::models::field::{CustomerField, FIELD_TABLE, FieldChange, FieldValue};
use crate::core::traits::audit::AuditLog;
use crate::core::traits::customer_store::CustomerStore;

const CUSTOMER_COLUMNS: &str = "id, name, status, technician, route_value, filter_type, \
     filter_value, last_service_date, next_service_date, created_at, updated_at";

/// SQLite-backed customer store and audit log.
///
/// The store owns a single-threaded Tokio runtime and blocks on every
/// `sqlx` call, so callers stay synchronous.
pub struct SqliteStore {
    // Declared before `rt` so the pool is dropped while the runtime lives.
    pool: SqlitePool,
    rt: Runtime,
    path: PathBuf,
    generation: AtomicU64,
}

#[derive(sqlx::FromRow)]
struct CustomerRow {
    id: i64,
    name: String,
    status: String,
    technician: String,
    route_value: String,
    filter_type: Option<String>,
    filter_value: String,
    last_service_date: Option<NaiveDate>,
    next_service_date: Option<NaiveDate>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CustomerRow> for Customer {
    type Error = PoolError;

    fn try_from(row: CustomerRow) -> Result<Self> {
        let status: CustomerStatus = row.status.parse().map_err(|_| PoolError::SchemaMismatch {
            detail: format!("customer '{}' has unknown status '{}'", row.name, row.status),
        })?;
        Ok(Customer {
            id: row.id,
            status,
            technician: row.technician,
            route_value: stored_amount(&row.name, &row.route_value)?,
            filter_type: row.filter_type,
            filter_value: stored_amount(&row.name, &row.filter_value)?,
            last_service_date: row.last_service_date,
            next_service_date: row.next_service_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
            name: row.name,
        })
    }
}

fn stored_amount(name: &str, raw: &str) -> Result<Decimal> {
    raw.trim().parse().map_err(|_| PoolError::SchemaMismatch {
        detail: format!("customer '{name}' has a non-numeric amount '{raw}'"),
    })
}

#[derive(sqlx::FromRow)]
struct AuditRow {
    id: i64,
    customer_id: Option<i64>,
    customer_name: String,
    action: String,
    field: Option<String>,
    old_value: Option<String>,
    new_value: Option<String>,
    actor: String,
    timestamp: DateTime<Utc>,
}

impl TryFrom<AuditRow> for AuditEntry {
    type Error = PoolError;

    fn try_from(row: AuditRow) -> Result<Self> {
        Ok(AuditEntry {
            id: row.id,
            customer_id: row.customer_id,
            customer_name: row.customer_name,
            action: row.action.parse()?,
            field: row.field,
            old_value: row.old_value,
            new_value: row.new_value,
            actor: row.actor,
            timestamp: row.timestamp,
        })
    }
}

struct AuditRecord<'a> {
    customer_id: i64,
    customer_name: &'a str,
    action: AuditAction,
    field: Option<&'a str>,
    old_value: Option<String>,
    new_value: Option<String>,
    actor: &'a str,
    timestamp: DateTime<Utc>,
}

impl SqliteStore {
    /// Connect without touching the schema. Used by `migrate`.
    pub fn connect(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Delete)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        // One connection: every operation is sequential, and a transaction
        // must never wait on a second connection holding the write lock.
        let pool = rt.block_on(
            SqlitePoolOptions::new()
                .max_connections(1)
                .connect_with(options),
        )?;
        debug!(path = %path.display(), "database opened");

        Ok(Self {
            pool,
            rt,
            path: path.to_path_buf(),
            generation: AtomicU64::new(0),
        })
    }

    /// Connect, optionally migrate to the latest version, and check that
    /// every mapped field has a column in the live schema.
    pub fn open(path: &Path, auto_migrate: bool) -> Result<Self> {
        let store = Self::connect(path)?;
        if auto_migrate {
            let applied = store.migrate_up(None)?;
            if !applied.is_empty() {
                info!(?applied, "database migrated");
            }
        }
        store.validate_schema()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn schema_version(&self) -> Result<i64> {
        self.rt.block_on(migrations::current_version(&self.pool))
    }

    pub fn migrate_up(&self, target: Option<i64>) -> Result<Vec<i64>> {
        self.rt.block_on(migrations::migrate_up(&self.pool, target))
    }

    pub fn migrate_down(&self, target: i64) -> Result<Vec<i64>> {
        self.rt.block_on(migrations::migrate_down(&self.pool, target))
    }

    fn validate_schema(&self) -> Result<()> {
        self.rt.block_on(async {
            let columns: Vec<String> =
                sqlx::query_scalar("SELECT name FROM pragma_table_info('customers')")
                    .fetch_all(&self.pool)
                    .await?;
            if columns.is_empty() {
                return Err(PoolError::SchemaMismatch {
                    detail: "the customers table does not exist".into(),
                });
            }
            let missing: Vec<&str> = ["name", "name_key"]
                .into_iter()
                .chain(FIELD_TABLE.iter().map(|spec| spec.column))
                .filter(|col| !columns.iter().any(|c| c.as_str() == *col))
                .collect();
            if !missing.is_empty() {
                return Err(PoolError::SchemaMismatch {
                    detail: format!("missing customer columns: {}", missing.join(", ")),
                });
            }
            Ok::<_, PoolError>(())
        })
    }

    fn committed(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    async fn find_in(tx: &mut Transaction<'_, Sqlite>, name: &str) -> Result<Option<Customer>> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE name_key = ?");
        let row: Option<CustomerRow> = sqlx::query_as(&sql)
            .bind(name_key(name))
            .fetch_optional(&mut **tx)
            .await?;
        row.map(Customer::try_from).transpose()
    }

    async fn fetch_by_id(tx: &mut Transaction<'_, Sqlite>, id: i64) -> Result<Customer> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?");
        let row: CustomerRow = sqlx::query_as(&sql).bind(id).fetch_one(&mut **tx).await?;
        row.try_into()
    }

    /// Insert one customer and its `create` entry inside `tx`.
    async fn insert_in(
        tx: &mut Transaction<'_, Sqlite>,
        customer: &NewCustomer,
        actor: &str,
    ) -> Result<Customer> {
        let name = customer.name.trim();
        if Self::find_in(tx, name).await?.is_some() {
            return Err(PoolError::DuplicateName {
                name: name.to_string(),
            });
        }

        let now = Utc::now();
        let status = customer.status.unwrap_or(CustomerStatus::Lead);
        let technician = customer.technician.as_deref().unwrap_or(UNASSIGNED);
        let id = sqlx::query(
            "INSERT INTO customers (name, name_key, status, technician, route_value, filter_type, \
             filter_value, last_service_date, next_service_date, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(name)
        .bind(name_key(name))
        .bind(status.as_str())
        .bind(technician)
        .bind(customer.route_value.unwrap_or_default().to_string())
        .bind(customer.filter_type.as_deref())
        .bind(customer.filter_value.unwrap_or_default().to_string())
        .bind(customer.last_service_date)
        .bind(customer.next_service_date)
        .bind(now)
        .bind(now)
        .execute(&mut **tx)
        .await
        .map_err(|e| duplicate_or(e, name))?
        .last_insert_rowid();

        Self::record(
            tx,
            AuditRecord {
                customer_id: id,
                customer_name: name,
                action: AuditAction::Create,
                field: None,
                old_value: None,
                new_value: Some(name.to_string()),
                actor,
                timestamp: now,
            },
        )
        .await?;

        Self::fetch_by_id(tx, id).await
    }

    async fn record(tx: &mut Transaction<'_, Sqlite>, entry: AuditRecord<'_>) -> Result<()> {
        sqlx::query(
            "INSERT INTO audit (customer_id, customer_name, action, field, old_value, new_value, actor, timestamp) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(entry.customer_id)
        .bind(entry.customer_name)
        .bind(entry.action.as_str())
        .bind(entry.field)
        .bind(entry.old_value)
        .bind(entry.new_value)
        .bind(entry.actor)
        .bind(entry.timestamp)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

impl Drop for SqliteStore {
    fn drop(&mut self) {
        self.rt.block_on(self.pool.close());
    }
}

/// Current value of `field` on `customer`, as a [`FieldValue`].
fn current_value(customer: &Customer, field: CustomerField) -> FieldValue {
    match field {
        CustomerField::Status => FieldValue::Status(customer.status),
        CustomerField::Technician => FieldValue::Text(Some(customer.technician.clone())),
        CustomerField::RouteValue => FieldValue::Money(customer.route_value),
        CustomerField::FilterType => FieldValue::Text(customer.filter_type.clone()),
        CustomerField::FilterValue => FieldValue::Money(customer.filter_value),
        CustomerField::LastServiceDate => FieldValue::Date(customer.last_service_date),
        CustomerField::NextServiceDate => FieldValue::Date(customer.next_service_date),
    }
}

fn validate_batch(changes: &[FieldChange]) -> Result<()> {
    if changes.is_empty() {
        return Err(PoolError::validation("no fields to update"));
    }
    let mut seen = HashSet::new();
    for change in changes {
        if !seen.insert(change.field) {
            return Err(PoolError::validation(format!(
                "field '{}' appears more than once",
                change.field
            )));
        }
        if !change.value.fits(change.field) {
            return Err(PoolError::validation(format!(
                "value of the wrong kind for field '{}'",
                change.field
            )));
        }
    }
    Ok(())
}

fn check_new(customer: &NewCustomer) -> Result<()> {
    if customer.name.trim().is_empty() {
        return Err(PoolError::validation("customer name is required"));
    }
    let money = [customer.route_value, customer.filter_value];
    if money.iter().flatten().any(|m| m.is_sign_negative() && !m.is_zero()) {
        return Err(PoolError::validation("amounts cannot be negative"));
    }
    Ok(())
}

fn duplicate_or(e: sqlx::Error, name: &str) -> PoolError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => PoolError::DuplicateName {
            name: name.to_string(),
        },
        _ => e.into(),
    }
}

impl CustomerStore for SqliteStore {
    fn list(&self) -> Result<Vec<Customer>> {
        let sql =
            format!("SELECT {CUSTOMER_COLUMNS} FROM customers ORDER BY name_key, id");
        let rows: Vec<CustomerRow> = self
            .rt
            .block_on(sqlx::query_as(&sql).fetch_all(&self.pool))?;
        debug!(count = rows.len(), "customers listed");
        rows.into_iter().map(Customer::try_from).collect()
    }

    fn find(&self, name: &str) -> Result<Option<Customer>> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE name_key = ?");
        let row: Option<CustomerRow> = self
            .rt
            .block_on(sqlx::query_as(&sql).bind(name_key(name)).fetch_optional(&self.pool))?;
        row.map(Customer::try_from).transpose()
    }

    fn create(&self, customer: &NewCustomer, actor: &str) -> Result<Customer> {
        check_new(customer)?;

        let created = self.rt.block_on(async {
            let mut tx = self.pool.begin().await?;
            let created = Self::insert_in(&mut tx, customer, actor).await?;
            tx.commit().await?;
            Ok::<_, PoolError>(created)
        })?;

        self.committed();
        info!(name = %created.name, id = created.id, actor, "customer created");
        Ok(created)
    }

    fn create_batch(&self, customers: &[NewCustomer], actor: &str) -> Result<Vec<Customer>> {
        for customer in customers {
            check_new(customer)?;
        }
        if customers.is_empty() {
            return Ok(Vec::new());
        }

        let created = self.rt.block_on(async {
            let mut tx = self.pool.begin().await?;
            let mut created = Vec::with_capacity(customers.len());
            for customer in customers {
                created.push(Self::insert_in(&mut tx, customer, actor).await?);
            }
            tx.commit().await?;
            Ok::<_, PoolError>(created)
        })?;

        self.committed();
        info!(count = created.len(), actor, "customers created");
        Ok(created)
    }

    fn update_batch(&self, name: &str, changes: &[FieldChange], actor: &str) -> Result<Customer> {
        validate_batch(changes)?;
        let name = name.trim();

        let updated = self.rt.block_on(async {
            let mut tx = self.pool.begin().await?;
            let current = Self::find_in(&mut tx, name)
                .await?
                .ok_or_else(|| PoolError::NotFound {
                    name: name.to_string(),
                })?;

            let now = Utc::now();
            for change in changes {
                let column = change.field.column();
                let sql = format!("UPDATE customers SET {column} = ?, updated_at = ? WHERE id = ?");
                let query = sqlx::query(&sql);
                let query = match &change.value {
                    FieldValue::Status(s) => query.bind(s.as_str()),
                    FieldValue::Text(t) => query.bind(t.clone()),
                    FieldValue::Money(m) => query.bind(m.to_string()),
                    FieldValue::Date(d) => query.bind(*d),
                };
                query
                    .bind(now)
                    .bind(current.id)
                    .execute(&mut *tx)
                    .await?;

                Self::record(
                    &mut tx,
                    AuditRecord {
                        customer_id: current.id,
                        customer_name: &current.name,
                        action: AuditAction::Update,
                        field: Some(change.field.key()),
                        old_value: current_value(&current, change.field).audit_text(),
                        new_value: change.value.audit_text(),
                        actor,
                        timestamp: now,
                    },
                )
                .await?;
            }

            let updated = Self::fetch_by_id(&mut tx, current.id).await?;
            tx.commit().await?;
            Ok::<_, PoolError>(updated)
        })?;

        self.committed();
        info!(
            name = %updated.name,
            fields = changes.len(),
            actor,
            "customer updated"
        );
        Ok(updated)
    }

    fn rename(&self, old_name: &str, new_name: &str, actor: &str) -> Result<Customer> {
        let old_name = old_name.trim();
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(PoolError::validation("new name is required"));
        }

        let renamed = self.rt.block_on(async {
            let mut tx = self.pool.begin().await?;
            let current = Self::find_in(&mut tx, old_name)
                .await?
                .ok_or_else(|| PoolError::NotFound {
                    name: old_name.to_string(),
                })?;
            if let Some(holder) = Self::find_in(&mut tx, new_name).await?
                && holder.id != current.id
            {
                return Err(PoolError::DuplicateName {
                    name: new_name.to_string(),
                });
            }

            let now = Utc::now();
            sqlx::query("UPDATE customers SET name = ?, name_key = ?, updated_at = ? WHERE id = ?")
                .bind(new_name)
                .bind(name_key(new_name))
                .bind(now)
                .bind(current.id)
                .execute(&mut *tx)
                .await
                .map_err(|e| duplicate_or(e, new_name))?;

            Self::record(
                &mut tx,
                AuditRecord {
                    customer_id: current.id,
                    customer_name: &current.name,
                    action: AuditAction::Update,
                    field: Some("name"),
                    old_value: Some(current.name.clone()),
                    new_value: Some(new_name.to_string()),
                    actor,
                    timestamp: now,
                },
            )
            .await?;

            let renamed = Self::fetch_by_id(&mut tx, current.id).await?;
            tx.commit().await?;
            Ok::<_, PoolError>(renamed)
        })?;

        self.committed();
        info!(from = old_name, to = %renamed.name, actor, "customer renamed");
        Ok(renamed)
    }

    fn active_count(&self) -> Result<u64> {
        let count: i64 = self.rt.block_on(
            sqlx::query_scalar("SELECT COUNT(*) FROM customers WHERE status IN (?, ?)")
                .bind(CustomerStatus::ActiveRouted.as_str())
                .bind(CustomerStatus::ActiveNoRoute.as_str())
                .fetch_one(&self.pool),
        )?;
        Ok(count.max(0) as u64)
    }

    fn active_revenue(&self) -> Result<Decimal> {
        let rows: Vec<(String, String)> = self.rt.block_on(
            sqlx::query_as("SELECT name, route_value FROM customers WHERE status IN (?, ?)")
                .bind(CustomerStatus::ActiveRouted.as_str())
                .bind(CustomerStatus::ActiveNoRoute.as_str())
                .fetch_all(&self.pool),
        )?;
        let amounts = rows
            .iter()
            .map(|(name, route)| stored_amount(name, route))
            .collect::<Result<Vec<_>>>()?;
        sum_amounts(amounts)
    }

    fn upcoming_count(&self, today: NaiveDate) -> Result<u64> {
        let count: i64 = self.rt.block_on(
            sqlx::query_scalar(
                "SELECT COUNT(*) FROM customers \
                 WHERE next_service_date IS NOT NULL AND next_service_date >= ?",
            )
            .bind(today)
            .fetch_one(&self.pool),
        )?;
        Ok(count.max(0) as u64)
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

impl AuditLog for SqliteStore {
    fn history(
        &self,
        customer: Option<&str>,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<AuditEntry>> {
        let customer = customer.map(str::trim);
        let key = customer.map(name_key);
        let rows: Vec<AuditRow> = self.rt.block_on(
            sqlx::query_as(
                "SELECT a.id, a.customer_id, a.customer_name, a.action, a.field, \
                        a.old_value, a.new_value, a.actor, a.timestamp \
                 FROM audit a LEFT JOIN customers c ON c.id = a.customer_id \
                 WHERE (? IS NULL OR a.customer_name = ? COLLATE NOCASE OR c.name_key = ?) \
                   AND (? IS NULL OR a.timestamp >= ?) \
                 ORDER BY a.id",
            )
            .bind(customer)
            .bind(customer)
            .bind(key)
            .bind(since)
            .bind(since)
            .fetch_all(&self.pool),
        )?;
        rows.into_iter().map(AuditEntry::try_from).collect()
    }
}
