//! AuditTable - the generic tabular storage interface
//!
//! The engine issues exactly four shapes of access:
//! (a) atomic batch application (insert + close-open-row),
//! (b) chain reads by key,
//! (c) open-row lookup for the validity-interval close step,
//! (d) enumeration of all element keys ever seen for an owner's
//!     collection attribute.
//!
//! Reads never block writers: rows already committed are immutable
//! except for the single open -> closed transition, which `apply`
//! performs atomically.

use crate::change::{ElementKey, OwnerKey, RowKey};

use super::{AuditRow, TableResult, WriteBatch};

/// Tabular storage for audit rows.
pub trait AuditTable: Send + Sync {
    /// Applies a batch atomically.
    ///
    /// Every `CloseOpen` precondition is checked before anything is
    /// mutated; a failed batch leaves the table untouched.
    fn apply(&self, batch: WriteBatch) -> TableResult<()>;

    /// Returns the full chain for a key, ascending by start revision.
    fn rows_for_key(&self, key: &RowKey) -> TableResult<Vec<AuditRow>>;

    /// Returns the currently open row for a key, if any.
    ///
    /// Fails with `MultipleOpenRows` if the open-row invariant is
    /// violated in the stored data.
    fn open_row(&self, key: &RowKey) -> TableResult<Option<AuditRow>>;

    /// Enumerates every element key ever seen for one collection
    /// attribute of an owner, in key order.
    fn element_keys(&self, owner: &OwnerKey, attribute: &str) -> TableResult<Vec<ElementKey>>;

    /// Returns the total number of persisted rows.
    fn row_count(&self) -> TableResult<usize>;
}
