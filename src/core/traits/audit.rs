use crate::core::errors::Result;
use crate::core::models::audit_entry::AuditEntry;

/// Port for querying the audit log. Entries are only ever written by the
/// store, inside the transaction of the change they record.
pub trait AuditLog {
    /// Entries oldest first, optionally limited to one customer (matched
    /// case-insensitively by the name recorded on the entry, or by the
    /// customer's current name) and to entries at or after `since`.
    fn history(
        &self,
        customer: Option<&str>,
        since: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<Vec<AuditEntry>>;
}
