//! Audit table error types
//!
//! `StaleOpenRow` is the optimistic-check failure of the validity-
//! interval close step: the open row a batch expected to close was
//! already closed (or removed) by a concurrent writer. It is
//! retryable by re-driving the unit-of-work.
//!
//! `MultipleOpenRows` is an invariant violation in the stored data
//! itself (for instance from manual tampering) and is FATAL: readers
//! must surface it rather than silently pick a row.

use crate::change::RowKey;
use crate::revision::RevisionId;

/// Errors from audit table operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    /// The open row to close did not match the batch's expectation.
    StaleOpenRow {
        key: RowKey,
        expected_start: RevisionId,
        found_start: Option<RevisionId>,
    },
    /// More than one open row exists for a key.
    MultipleOpenRows { key: RowKey, open_rows: usize },
    /// Backend-specific storage failure.
    Backend(String),
}

impl TableError {
    /// Returns true if the stored history itself is corrupt.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TableError::MultipleOpenRows { .. })
    }
}

impl std::fmt::Display for TableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableError::StaleOpenRow {
                key,
                expected_start,
                found_start,
            } => match found_start {
                Some(found) => write!(
                    f,
                    "stale open row for {}: expected start revision {}, found {}",
                    key, expected_start, found
                ),
                None => write!(
                    f,
                    "stale open row for {}: expected start revision {}, but no open row exists",
                    key, expected_start
                ),
            },
            TableError::MultipleOpenRows { key, open_rows } => {
                write!(
                    f,
                    "FATAL: {} open rows for {} (at most one may be open)",
                    open_rows, key
                )
            }
            TableError::Backend(msg) => write!(f, "audit table backend failure: {}", msg),
        }
    }
}

impl std::error::Error for TableError {}

/// Result type for audit table operations.
pub type TableResult<T> = Result<T, TableError>;
