pub mod audit_entry;
pub mod customer;
pub mod display_row;
pub mod field;
pub mod filter;
