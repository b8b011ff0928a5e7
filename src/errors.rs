//! Engine-level error taxonomy
//!
//! Everything the engine can fail with, as seen by the enclosing
//! commit:
//! - `Sequencing` - revision allocation failed; commit aborts, no rows
//! - `ConcurrentModification` - the validity-interval close step lost
//!   a race; the caller may re-drive the unit-of-work
//! - `InconsistentKeyMapping` - a collection element has no stable key
//! - `MalformedHistory` - the open-row invariant is violated in stored
//!   data; fatal
//! - `UnknownEntity` / `UnknownAttribute` - a snapshot was recorded
//!   against unconfigured metadata
//! - `Config` - the configuration itself is malformed
//! - `Table` - any other storage failure
//!
//! None of these are retried automatically by the engine.

use thiserror::Error;

use crate::change::{CollectorError, RowKey};
use crate::metadata::MetadataError;
use crate::revision::SequencerError;
use crate::store::TableError;
use crate::strategy::StrategyError;

/// Result type for engine operations.
pub type AuditResult<T> = Result<T, AuditError>;

/// Errors surfaced by the audit engine.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Revision allocation could not be completed.
    #[error("revision sequencing failed: {0}")]
    Sequencing(#[from] SequencerError),

    /// A concurrent writer superseded the open row first.
    #[error("concurrent modification of audit chain {key}")]
    ConcurrentModification { key: RowKey },

    /// A collection element could not be mapped onto a stable key.
    #[error("inconsistent element key mapping: {0}")]
    InconsistentKeyMapping(#[from] CollectorError),

    /// One unit-of-work recorded two changes for the same audit chain.
    ///
    /// Applying both would put two open rows in place under the
    /// validity-interval encoding, so the commit is rejected whole.
    #[error("conflicting snapshots for audit chain {key} in one unit-of-work")]
    ConflictingSnapshots { key: RowKey },

    /// More than one open row exists for a key.
    #[error("malformed history for {key}: {open_rows} open rows")]
    MalformedHistory { key: RowKey, open_rows: usize },

    /// The entity type is not configured for auditing.
    #[error("entity type '{0}' is not configured for auditing")]
    UnknownEntity(String),

    /// The collection attribute is not configured for auditing.
    #[error("attribute '{attribute}' of entity '{entity}' is not configured for auditing")]
    UnknownAttribute { entity: String, attribute: String },

    /// The audit configuration is malformed.
    #[error("invalid audit configuration: {0}")]
    Config(#[from] MetadataError),

    /// Storage-layer failure.
    #[error("audit table failure: {0}")]
    Table(TableError),
}

impl AuditError {
    /// Returns true if the stored history itself is corrupt and the
    /// process should treat the audit data as untrustworthy.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AuditError::MalformedHistory { .. })
    }
}

impl From<StrategyError> for AuditError {
    fn from(err: StrategyError) -> Self {
        match err {
            StrategyError::ConcurrentModification { key } => {
                AuditError::ConcurrentModification { key }
            }
            StrategyError::MalformedHistory { key, open_rows } => {
                AuditError::MalformedHistory { key, open_rows }
            }
            StrategyError::Table(err) => AuditError::Table(err),
        }
    }
}

impl From<TableError> for AuditError {
    fn from(err: TableError) -> Self {
        AuditError::from(StrategyError::from(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::OwnerKey;
    use crate::revision::RevisionId;

    #[test]
    fn test_only_malformed_history_is_fatal() {
        let key = RowKey::entity(OwnerKey::new("Person", "1"));

        assert!(AuditError::MalformedHistory {
            key: key.clone(),
            open_rows: 2
        }
        .is_fatal());
        assert!(!AuditError::ConcurrentModification { key }.is_fatal());
        assert!(!AuditError::UnknownEntity("Order".to_string()).is_fatal());
    }

    #[test]
    fn test_table_conflict_maps_through() {
        let key = RowKey::entity(OwnerKey::new("Person", "1"));
        let err: AuditError = TableError::StaleOpenRow {
            key: key.clone(),
            expected_start: RevisionId::new(1),
            found_start: None,
        }
        .into();

        assert!(matches!(
            err,
            AuditError::ConcurrentModification { key: k } if k == key
        ));
    }
}
