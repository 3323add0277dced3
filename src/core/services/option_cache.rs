use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use chrono::Datelike;

use crate::core::errors::Result;
use crate::core::models::customer::{Customer, CustomerStatus};
use crate::core::services::technician_normalizer;

/// Choices offered by the filter selectors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOptions {
    pub statuses: Vec<CustomerStatus>,
    pub technicians: Vec<String>,
    /// Months (1-12) that appear in any last/next service date.
    pub months: Vec<u32>,
}

impl FilterOptions {
    pub fn from_customers(customers: &[Customer]) -> Self {
        let statuses: BTreeSet<CustomerStatus> = customers.iter().map(|c| c.status).collect();
        let months: BTreeSet<u32> = customers
            .iter()
            .flat_map(|c| [c.last_service_date, c.next_service_date])
            .flatten()
            .map(|d| d.month())
            .collect();
        Self {
            statuses: statuses.into_iter().collect(),
            technicians: technician_normalizer::distinct_technicians(
                customers.iter().map(|c| c.technician.as_str()),
            ),
            months: months.into_iter().collect(),
        }
    }
}

/// Read-through cache for [`FilterOptions`], keyed by store generation.
///
/// A cached value is served only while the store generation is unchanged;
/// any committed write bumps the generation and the next read reloads.
#[derive(Default)]
pub struct OptionCache {
    slot: RefCell<Option<(u64, Rc<FilterOptions>)>>,
}

impl OptionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_load<F>(&self, generation: u64, load: F) -> Result<Rc<FilterOptions>>
    where
        F: FnOnce() -> Result<FilterOptions>,
    {
        if let Some((cached_gen, options)) = self.slot.borrow().as_ref()
            && *cached_gen == generation
        {
            return Ok(Rc::clone(options));
        }

        tracing::debug!(generation, "reloading filter options");
        let options = Rc::new(load()?);
        *self.slot.borrow_mut() = Some((generation, Rc::clone(&options)));
        Ok(options)
    }
}
