use std::collections::{BTreeMap, HashSet};
use std::rc::Rc;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::core::errors::{PoolError, Result};
use crate::core::models::customer::{Customer, CustomerStatus, NewCustomer, name_key, sum_amounts};
use crate::core::models::field::{CustomerField, FieldChange, FieldValue};
use crate::core::models::filter::FilterCriteria;
use crate::core::services::filter_pipeline;
use crate::core::services::option_cache::{FilterOptions, OptionCache};
use crate::core::services::technician_normalizer;
use crate::core::traits::customer_store::CustomerStore;

/// Actor recorded for rows written by the legacy importer.
pub const IMPORT_ACTOR: &str = "import";

/// Raw form input for a new customer. Every field except the name is
/// optional; omitted fields take the store defaults.
#[derive(Debug, Clone, Default)]
pub struct CustomerForm {
    pub name: String,
    pub status: Option<String>,
    pub technician: Option<String>,
    pub route_value: Option<String>,
    pub filter_type: Option<String>,
    pub filter_value: Option<String>,
    pub last_service: Option<String>,
    pub next_service: Option<String>,
}

impl CustomerForm {
    /// Validate and convert into a [`NewCustomer`].
    pub fn into_new_customer(self) -> Result<NewCustomer> {
        let mut customer = NewCustomer::named(validate_name(&self.name)?);
        let fields = [
            (CustomerField::Status, self.status),
            (CustomerField::Technician, self.technician),
            (CustomerField::RouteValue, self.route_value),
            (CustomerField::FilterType, self.filter_type),
            (CustomerField::FilterValue, self.filter_value),
            (CustomerField::LastServiceDate, self.last_service),
            (CustomerField::NextServiceDate, self.next_service),
        ];
        for (field, raw) in fields {
            let Some(raw) = raw else { continue };
            apply_value(&mut customer, field, field.parse_value(&raw)?)?;
        }
        Ok(customer)
    }
}

fn apply_value(customer: &mut NewCustomer, field: CustomerField, value: FieldValue) -> Result<()> {
    match (field, value) {
        (CustomerField::Status, FieldValue::Status(s)) => customer.status = Some(s),
        (CustomerField::Technician, FieldValue::Text(t)) => customer.technician = t,
        (CustomerField::FilterType, FieldValue::Text(t)) => customer.filter_type = t,
        (CustomerField::RouteValue, FieldValue::Money(m)) => customer.route_value = Some(m),
        (CustomerField::FilterValue, FieldValue::Money(m)) => customer.filter_value = Some(m),
        (CustomerField::LastServiceDate, FieldValue::Date(d)) => customer.last_service_date = d,
        (CustomerField::NextServiceDate, FieldValue::Date(d)) => customer.next_service_date = d,
        (field, _) => {
            return Err(PoolError::validation(format!(
                "value of the wrong kind for field '{field}'"
            )));
        }
    }
    Ok(())
}

/// Trim and check a customer name.
pub fn validate_name(raw: &str) -> Result<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(PoolError::validation("customer name is required"));
    }
    if name.chars().any(char::is_control) {
        return Err(PoolError::validation(
            "customer name cannot contain control characters",
        ));
    }
    Ok(name.to_string())
}

/// Headline numbers shown above the customer table.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardStats {
    pub active_count: u64,
    pub active_revenue: Decimal,
    pub upcoming_count: u64,
}

/// Detailed breakdown for `poolboard stats`.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsBreakdown {
    pub per_status: Vec<(CustomerStatus, u64)>,
    /// Revenue over active customers, keyed by normalized technician.
    pub revenue_by_technician: Vec<(String, Decimal)>,
}

/// A technician value that changes under normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TechnicianFix {
    pub customer: String,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
}

/// Validates user input and drives a [`CustomerStore`].
pub struct CustomerService<S: CustomerStore> {
    store: S,
    actor: String,
    options: OptionCache,
}

impl<S: CustomerStore> CustomerService<S> {
    pub fn new(store: S, actor: impl Into<String>) -> Self {
        Self {
            store,
            actor: actor.into(),
            options: OptionCache::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Customers matching `criteria`, in store order.
    pub fn query(&self, criteria: &FilterCriteria) -> Result<Vec<Customer>> {
        let all = self.store.list()?;
        let matched = filter_pipeline::filter(&all, criteria)
            .into_iter()
            .cloned()
            .collect();
        Ok(matched)
    }

    /// Selector choices, reloaded only after a committed write.
    pub fn filter_options(&self) -> Result<Rc<FilterOptions>> {
        self.options.get_or_load(self.store.generation(), || {
            Ok(FilterOptions::from_customers(&self.store.list()?))
        })
    }

    pub fn create(&self, form: CustomerForm) -> Result<Customer> {
        let customer = form.into_new_customer()?;
        self.store.create(&customer, &self.actor)
    }

    /// Apply `key=value` assignments to one customer in a single transaction.
    pub fn update(&self, name: &str, assignments: &[String]) -> Result<Customer> {
        if assignments.is_empty() {
            return Err(PoolError::validation(
                "nothing to update. Pass at least one field=value pair",
            ));
        }
        let changes = assignments
            .iter()
            .map(|a| FieldChange::parse_assignment(a))
            .collect::<Result<Vec<_>>>()?;
        self.store.update_batch(name.trim(), &changes, &self.actor)
    }

    pub fn rename(&self, old_name: &str, new_name: &str) -> Result<Customer> {
        let new_name = validate_name(new_name)?;
        self.store.rename(old_name.trim(), &new_name, &self.actor)
    }

    pub fn dashboard(&self, today: NaiveDate) -> Result<DashboardStats> {
        Ok(DashboardStats {
            active_count: self.store.active_count()?,
            active_revenue: self.store.active_revenue()?,
            upcoming_count: self.store.upcoming_count(today)?,
        })
    }

    pub fn breakdown(&self) -> Result<StatsBreakdown> {
        let customers = self.store.list()?;

        let mut per_status: BTreeMap<CustomerStatus, u64> = BTreeMap::new();
        let mut amounts: BTreeMap<String, Vec<Decimal>> = BTreeMap::new();
        for c in &customers {
            *per_status.entry(c.status).or_default() += 1;
            if c.status.is_active() {
                let tech = technician_normalizer::normalize(Some(&c.technician));
                amounts.entry(tech).or_default().push(c.monthly_revenue());
            }
        }

        let mut revenue_by_technician = amounts
            .into_iter()
            .map(|(tech, values)| Ok((tech, sum_amounts(values)?)))
            .collect::<Result<Vec<(String, Decimal)>>>()?;
        revenue_by_technician.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        Ok(StatsBreakdown {
            per_status: per_status.into_iter().collect(),
            revenue_by_technician,
        })
    }

    /// Re-normalize every stored technician. With `dry_run` nothing is
    /// written; otherwise each changed row is updated (and audited).
    pub fn normalize_technicians(&self, dry_run: bool) -> Result<Vec<TechnicianFix>> {
        let fixes: Vec<TechnicianFix> = self
            .store
            .list()?
            .into_iter()
            .filter_map(|c| {
                let to = technician_normalizer::normalize(Some(&c.technician));
                (to != c.technician).then(|| TechnicianFix {
                    customer: c.name,
                    from: c.technician,
                    to,
                })
            })
            .collect();

        if dry_run {
            return Ok(fixes);
        }
        for fix in &fixes {
            let change = FieldChange::new(
                CustomerField::Technician,
                FieldValue::Text(Some(fix.to.clone())),
            );
            self.store.update(&fix.customer, &change, &self.actor)?;
        }
        tracing::info!(count = fixes.len(), "technicians normalized");
        Ok(fixes)
    }

    /// Insert legacy rows, skipping names that already exist (or repeat
    /// within the batch). `on_row` is called once per input row while the
    /// rows are checked. The remaining rows are inserted in one transaction,
    /// so a failure imports nothing.
    pub fn import<F>(&self, rows: Vec<NewCustomer>, mut on_row: F) -> Result<ImportSummary>
    where
        F: FnMut(&str),
    {
        let mut summary = ImportSummary::default();
        let mut seen: HashSet<String> = HashSet::new();
        let mut pending = Vec::with_capacity(rows.len());

        for row in rows {
            on_row(&row.name);
            if !seen.insert(name_key(&row.name)) || self.store.exists(&row.name)? {
                tracing::debug!(name = %row.name, "skipping existing customer");
                summary.skipped += 1;
                continue;
            }
            pending.push(row);
        }

        summary.imported = self.store.create_batch(&pending, IMPORT_ACTOR)?.len();
        tracing::info!(
            imported = summary.imported,
            skipped = summary.skipped,
            "legacy import finished"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::customer::UNASSIGNED;
    use crate::core::models::filter::StatusFilter;
    use chrono::Utc;
    use std::cell::{Cell, RefCell};

    /// In-memory store used to exercise the service without SQLite.
    #[derive(Default)]
    struct MemoryStore {
        rows: RefCell<Vec<Customer>>,
        generation: Cell<u64>,
        lists: Cell<usize>,
    }

    impl MemoryStore {
        fn seed(&self, name: &str, status: CustomerStatus, tech: &str, route: i64) {
            let id = self.rows.borrow().len() as i64 + 1;
            self.rows.borrow_mut().push(Customer {
                id,
                name: name.into(),
                status,
                technician: tech.into(),
                route_value: Decimal::new(route, 0),
                filter_type: None,
                filter_value: Decimal::ZERO,
                last_service_date: None,
                next_service_date: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            });
        }

        fn position(&self, name: &str) -> Result<usize> {
            self.rows
                .borrow()
                .iter()
                .position(|c| name_key(&c.name) == name_key(name))
                .ok_or_else(|| PoolError::NotFound { name: name.into() })
        }
    }

    impl CustomerStore for MemoryStore {
        fn list(&self) -> Result<Vec<Customer>> {
            self.lists.set(self.lists.get() + 1);
            Ok(self.rows.borrow().clone())
        }

        fn find(&self, name: &str) -> Result<Option<Customer>> {
            Ok(self
                .rows
                .borrow()
                .iter()
                .find(|c| name_key(&c.name) == name_key(name))
                .cloned())
        }

        fn create(&self, c: &NewCustomer, _actor: &str) -> Result<Customer> {
            if self.exists(&c.name)? {
                return Err(PoolError::DuplicateName {
                    name: c.name.clone(),
                });
            }
            self.seed(
                &c.name,
                c.status.unwrap_or(CustomerStatus::Lead),
                c.technician.as_deref().unwrap_or(UNASSIGNED),
                0,
            );
            self.generation.set(self.generation.get() + 1);
            Ok(self.rows.borrow().last().cloned().unwrap())
        }

        fn create_batch(&self, batch: &[NewCustomer], actor: &str) -> Result<Vec<Customer>> {
            for c in batch {
                if self.exists(&c.name)? {
                    return Err(PoolError::DuplicateName {
                        name: c.name.clone(),
                    });
                }
            }
            batch.iter().map(|c| self.create(c, actor)).collect()
        }

        fn update_batch(&self, name: &str, changes: &[FieldChange], _actor: &str) -> Result<Customer> {
            let idx = self.position(name)?;
            let mut rows = self.rows.borrow_mut();
            for change in changes {
                match &change.value {
                    FieldValue::Text(Some(t)) if change.field == CustomerField::Technician => {
                        rows[idx].technician = t.clone()
                    }
                    FieldValue::Status(s) => rows[idx].status = *s,
                    FieldValue::Money(m) if change.field == CustomerField::RouteValue => {
                        rows[idx].route_value = *m
                    }
                    _ => {}
                }
            }
            self.generation.set(self.generation.get() + 1);
            Ok(rows[idx].clone())
        }

        fn rename(&self, old: &str, new: &str, _actor: &str) -> Result<Customer> {
            let idx = self.position(old)?;
            self.rows.borrow_mut()[idx].name = new.into();
            self.generation.set(self.generation.get() + 1);
            Ok(self.rows.borrow()[idx].clone())
        }

        fn active_count(&self) -> Result<u64> {
            Ok(self.rows.borrow().iter().filter(|c| c.status.is_active()).count() as u64)
        }

        fn active_revenue(&self) -> Result<Decimal> {
            sum_amounts(
                self.rows
                    .borrow()
                    .iter()
                    .filter(|c| c.status.is_active())
                    .map(Customer::monthly_revenue),
            )
        }

        fn upcoming_count(&self, today: NaiveDate) -> Result<u64> {
            Ok(self
                .rows
                .borrow()
                .iter()
                .filter(|c| c.next_service_date.is_some_and(|d| d >= today))
                .count() as u64)
        }

        fn generation(&self) -> u64 {
            self.generation.get()
        }
    }

    fn service() -> CustomerService<MemoryStore> {
        CustomerService::new(MemoryStore::default(), "tester")
    }

    #[test]
    fn form_requires_name_and_valid_values() {
        let empty = CustomerForm {
            name: "   ".into(),
            ..CustomerForm::default()
        };
        assert!(matches!(
            empty.into_new_customer(),
            Err(PoolError::Validation { .. })
        ));

        let negative = CustomerForm {
            name: "Casa".into(),
            filter_value: Some("-3".into()),
            ..CustomerForm::default()
        };
        assert!(negative.into_new_customer().is_err());

        let bad_date = CustomerForm {
            name: "Casa".into(),
            next_service: Some("31/02/2025".into()),
            ..CustomerForm::default()
        };
        assert!(bad_date.into_new_customer().is_err());
    }

    #[test]
    fn form_converts_and_normalizes() {
        let form = CustomerForm {
            name: "  Casa Azul ".into(),
            status: Some("ativo sem rota".into()),
            technician: Some("vini  penner.".into()),
            route_value: Some("$1,200.50".into()),
            next_service: Some("2026-03-01".into()),
            ..CustomerForm::default()
        };
        let c = form.into_new_customer().unwrap();
        assert_eq!(c.name, "Casa Azul");
        assert_eq!(c.status, Some(CustomerStatus::ActiveNoRoute));
        assert_eq!(c.technician.as_deref(), Some("Vini Penner"));
        assert_eq!(c.route_value, Some(Decimal::new(120050, 2)));
        assert_eq!(c.next_service_date, NaiveDate::from_ymd_opt(2026, 3, 1));
        assert_eq!(c.filter_value, None);
    }

    #[test]
    fn update_rejects_unknown_fields_before_writing() {
        let svc = service();
        svc.store().seed("Casa", CustomerStatus::Lead, "Pedro", 0);
        let before = svc.store().generation();
        let err = svc
            .update("Casa", &["status=Lead".into(), "colour=blue".into()])
            .unwrap_err();
        assert!(matches!(err, PoolError::UnknownField { .. }));
        assert_eq!(svc.store().generation(), before);
    }

    #[test]
    fn update_requires_assignments() {
        let svc = service();
        assert!(svc.update("Casa", &[]).is_err());
    }

    #[test]
    fn query_applies_filters() {
        let svc = service();
        svc.store().seed("A", CustomerStatus::Lead, "Pedro", 0);
        svc.store().seed("B", CustomerStatus::ActiveRouted, "Pedro", 0);
        let criteria = FilterCriteria {
            status: StatusFilter::Only(CustomerStatus::Lead),
            ..FilterCriteria::default()
        };
        let rows = svc.query(&criteria).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "A");
    }

    #[test]
    fn filter_options_reload_only_after_writes() {
        let svc = service();
        svc.store().seed("A", CustomerStatus::Lead, "Pedro", 0);

        svc.filter_options().unwrap();
        svc.filter_options().unwrap();
        assert_eq!(svc.store().lists.get(), 1);

        svc.create(CustomerForm {
            name: "B".into(),
            technician: Some("lucca".into()),
            ..CustomerForm::default()
        })
        .unwrap();
        let opts = svc.filter_options().unwrap();
        assert_eq!(svc.store().lists.get(), 2);
        assert_eq!(opts.technicians, vec!["Lucca", "Pedro"]);
    }

    #[test]
    fn breakdown_counts_statuses_and_active_revenue() {
        let svc = service();
        svc.store().seed("A", CustomerStatus::ActiveRouted, "Pedro", 100);
        svc.store().seed("B", CustomerStatus::ActiveNoRoute, "pedro", 50);
        svc.store().seed("C", CustomerStatus::Inactive, "Lucca", 999);
        svc.store().seed("D", CustomerStatus::ActiveRouted, "Lucca", 20);

        let stats = svc.breakdown().unwrap();
        assert_eq!(
            stats.per_status,
            vec![
                (CustomerStatus::ActiveRouted, 2),
                (CustomerStatus::ActiveNoRoute, 1),
                (CustomerStatus::Inactive, 1),
            ]
        );
        assert_eq!(
            stats.revenue_by_technician,
            vec![
                ("Pedro".to_string(), Decimal::new(150, 0)),
                ("Lucca".to_string(), Decimal::new(20, 0)),
            ]
        );
    }

    #[test]
    fn normalize_technicians_dry_run_writes_nothing() {
        let svc = service();
        svc.store().seed("A", CustomerStatus::Lead, "lucca .", 0);
        svc.store().seed("B", CustomerStatus::Lead, "Pedro", 0);

        let fixes = svc.normalize_technicians(true).unwrap();
        assert_eq!(
            fixes,
            vec![TechnicianFix {
                customer: "A".into(),
                from: "lucca .".into(),
                to: "Lucca".into(),
            }]
        );
        assert_eq!(svc.store().generation(), 0);

        svc.normalize_technicians(false).unwrap();
        assert_eq!(svc.store().find("A").unwrap().unwrap().technician, "Lucca");
        assert!(svc.normalize_technicians(true).unwrap().is_empty());
    }

    #[test]
    fn import_skips_existing_and_repeated_names() {
        let svc = service();
        svc.store().seed("Casa", CustomerStatus::Lead, "Pedro", 0);
        let rows = vec![
            NewCustomer::named("casa"),
            NewCustomer::named("Nova"),
            NewCustomer::named("NOVA"),
        ];
        let mut seen = Vec::new();
        let summary = svc.import(rows, |name| seen.push(name.to_string())).unwrap();
        assert_eq!(summary, ImportSummary { imported: 1, skipped: 2 });
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn import_matches_accented_names_regardless_of_case() {
        let svc = service();
        svc.store().seed("Água Clara", CustomerStatus::Lead, "Pedro", 0);
        let rows = vec![
            NewCustomer::named("ÁGUA CLARA"),
            NewCustomer::named("João"),
            NewCustomer::named("JOÃO"),
        ];
        let summary = svc.import(rows, |_| {}).unwrap();
        assert_eq!(summary, ImportSummary { imported: 1, skipped: 2 });
    }

    #[test]
    fn breakdown_overflow_is_an_error() {
        let svc = service();
        svc.store().seed("A", CustomerStatus::ActiveRouted, "Pedro", 0);
        svc.store().seed("B", CustomerStatus::ActiveRouted, "Pedro", 0);
        for row in svc.store().rows.borrow_mut().iter_mut() {
            row.route_value = Decimal::MAX;
        }
        assert!(matches!(svc.breakdown(), Err(PoolError::Validation { .. })));
        assert!(svc.dashboard(NaiveDate::MIN).is_err());
    }

    #[test]
    fn mismatched_field_value_is_rejected() {
        let mut customer = NewCustomer::named("Casa");
        let err = apply_value(
            &mut customer,
            CustomerField::Status,
            FieldValue::Money(Decimal::ONE),
        )
        .unwrap_err();
        assert!(matches!(err, PoolError::Validation { .. }));
        assert_eq!(customer, NewCustomer::named("Casa"));
    }
}
