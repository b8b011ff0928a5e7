//! AuditRow - the persisted audit record
//!
//! Both encodings persist {key, kind, payload, start_revision}; the
//! validity-interval encoding additionally maintains end_revision:
//! - open row: end_revision = None (currently true fact)
//! - closed row: end_revision = Some(r), set exactly once when a later
//!   fact supersedes this row
//!
//! Append-only rows never transition; they are immutable from creation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::change::{ChangeKind, RowKey};
use crate::revision::RevisionId;

/// One persisted audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRow {
    key: RowKey,
    kind: ChangeKind,
    payload: Value,
    start_revision: RevisionId,
    end_revision: Option<RevisionId>,
}

impl AuditRow {
    /// Creates a row that is true from `start_revision` onwards.
    ///
    /// This is the only constructor: every row starts open (or, in the
    /// append-only encoding, permanently without an end revision).
    pub fn open(key: RowKey, kind: ChangeKind, payload: Value, start_revision: RevisionId) -> Self {
        Self {
            key,
            kind,
            payload,
            start_revision,
            end_revision: None,
        }
    }

    /// Returns the addressing key.
    #[inline]
    pub fn key(&self) -> &RowKey {
        &self.key
    }

    /// Returns the change classification.
    #[inline]
    pub fn kind(&self) -> ChangeKind {
        self.kind
    }

    /// Returns the persisted state snapshot.
    #[inline]
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Returns the revision at which this row became true.
    #[inline]
    pub fn start_revision(&self) -> RevisionId {
        self.start_revision
    }

    /// Returns the revision at which this row was superseded, if any.
    #[inline]
    pub fn end_revision(&self) -> Option<RevisionId> {
        self.end_revision
    }

    /// Returns true if no later fact has superseded this row.
    #[inline]
    pub fn is_open(&self) -> bool {
        self.end_revision.is_none()
    }

    /// Returns true if this row is valid at the target revision.
    ///
    /// Interval containment: start <= target < end (open rows extend
    /// to infinity).
    pub fn contains(&self, target: RevisionId) -> bool {
        self.start_revision <= target && self.end_revision.map_or(true, |end| target < end)
    }

    /// Closes this row at the given revision.
    ///
    /// Crate-internal: only `AuditTable::apply` may transition a row,
    /// and only once.
    pub(crate) fn close(&mut self, end: RevisionId) {
        debug_assert!(self.end_revision.is_none(), "row closed twice");
        self.end_revision = Some(end);
    }
}

/// One operation of a write batch.
#[derive(Debug, Clone, PartialEq)]
pub enum RowOp {
    /// Insert a new row.
    Insert(AuditRow),
    /// Close the currently open row for a key.
    ///
    /// `expected_start` is an optimistic check: the operation fails if
    /// the open row's start revision does not match, which means a
    /// concurrent writer got there first.
    CloseOpen {
        key: RowKey,
        expected_start: RevisionId,
        end: RevisionId,
    },
}

/// All row operations of one revision, applied atomically.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteBatch {
    revision: RevisionId,
    ops: Vec<RowOp>,
}

impl WriteBatch {
    /// Creates a batch for the given revision.
    pub fn new(revision: RevisionId, ops: Vec<RowOp>) -> Self {
        Self { revision, ops }
    }

    /// Returns the revision this batch belongs to.
    #[inline]
    pub fn revision(&self) -> RevisionId {
        self.revision
    }

    /// Returns the operations in application order.
    #[inline]
    pub fn ops(&self) -> &[RowOp] {
        &self.ops
    }

    /// Returns true if the batch contains no operations.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}
