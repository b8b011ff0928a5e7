//! Strategy error types
//!
//! - `ConcurrentModification` - the validity-interval close step lost
//!   a race for the open row; the unit-of-work may be re-driven
//! - `MalformedHistory` - more than one open row for a key; a fatal
//!   data-integrity failure, never silently resolved
//! - `Table` - any other storage failure, passed through

use crate::change::RowKey;
use crate::store::TableError;

/// Errors from strategy writes and reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrategyError {
    /// The open row was already closed by a concurrent writer.
    ConcurrentModification { key: RowKey },
    /// The open-row invariant is violated in stored data.
    MalformedHistory { key: RowKey, open_rows: usize },
    /// Underlying table failure.
    Table(TableError),
}

impl StrategyError {
    /// Returns true if the stored history itself is corrupt.
    pub fn is_fatal(&self) -> bool {
        matches!(self, StrategyError::MalformedHistory { .. })
    }
}

impl std::fmt::Display for StrategyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyError::ConcurrentModification { key } => {
                write!(f, "concurrent modification of audit chain {}", key)
            }
            StrategyError::MalformedHistory { key, open_rows } => {
                write!(
                    f,
                    "FATAL: malformed history for {}: {} open rows",
                    key, open_rows
                )
            }
            StrategyError::Table(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for StrategyError {}

impl From<TableError> for StrategyError {
    fn from(err: TableError) -> Self {
        match err {
            TableError::StaleOpenRow { key, .. } => StrategyError::ConcurrentModification { key },
            TableError::MultipleOpenRows { key, open_rows } => {
                StrategyError::MalformedHistory { key, open_rows }
            }
            other => StrategyError::Table(other),
        }
    }
}

/// Result type for strategy operations.
pub type StrategyResult<T> = Result<T, StrategyError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::OwnerKey;
    use crate::revision::RevisionId;

    #[test]
    fn test_stale_open_row_maps_to_concurrent_modification() {
        let key = RowKey::entity(OwnerKey::new("Person", "1"));
        let err: StrategyError = TableError::StaleOpenRow {
            key: key.clone(),
            expected_start: RevisionId::new(1),
            found_start: None,
        }
        .into();

        assert_eq!(err, StrategyError::ConcurrentModification { key });
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_multiple_open_rows_maps_to_malformed_history() {
        let key = RowKey::entity(OwnerKey::new("Person", "1"));
        let err: StrategyError = TableError::MultipleOpenRows {
            key: key.clone(),
            open_rows: 3,
        }
        .into();

        assert_eq!(
            err,
            StrategyError::MalformedHistory { key, open_rows: 3 }
        );
        assert!(err.is_fatal());
    }
}
