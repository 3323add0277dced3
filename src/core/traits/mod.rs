pub mod audit;
pub mod customer_store;
