use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::core::errors::Result;
use crate::core::models::customer::{Customer, NewCustomer};
use crate::core::models::field::FieldChange;

/// Port for persisting customers.
///
/// Every mutating call runs as one transaction together with its audit
/// entries: it either commits completely or leaves the store untouched.
pub trait CustomerStore {
    /// All customers, ordered by name (case-insensitive).
    fn list(&self) -> Result<Vec<Customer>>;

    /// Case-insensitive lookup by name.
    fn find(&self, name: &str) -> Result<Option<Customer>>;

    /// Case-insensitive existence check.
    fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.find(name)?.is_some())
    }

    /// Insert a customer, filling defaults for omitted fields.
    /// Fails with `DuplicateName` if the name is already taken.
    fn create(&self, customer: &NewCustomer, actor: &str) -> Result<Customer>;

    /// Insert several customers in one transaction. Any failure (a taken
    /// name included) inserts none of them.
    fn create_batch(&self, customers: &[NewCustomer], actor: &str) -> Result<Vec<Customer>>;

    /// Apply one field change.
    fn update(&self, name: &str, change: &FieldChange, actor: &str) -> Result<Customer> {
        self.update_batch(name, std::slice::from_ref(change), actor)
    }

    /// Apply several field changes in one transaction, writing one audit
    /// entry per field.
    fn update_batch(&self, name: &str, changes: &[FieldChange], actor: &str) -> Result<Customer>;

    /// Rename a customer. Fails if another customer holds `new_name`.
    fn rename(&self, old_name: &str, new_name: &str, actor: &str) -> Result<Customer>;

    /// Number of customers with an active status.
    fn active_count(&self) -> Result<u64>;

    /// Sum of route values over active customers. Fails instead of
    /// overflowing.
    fn active_revenue(&self) -> Result<Decimal>;

    /// Customers whose next service date is on or after `today`.
    fn upcoming_count(&self, today: NaiveDate) -> Result<u64>;

    /// Write counter, bumped by every committed mutation.
    fn generation(&self) -> u64;
}
