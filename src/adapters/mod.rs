pub mod backup;
pub mod legacy;
pub mod sqlite;
