//! Audit Strategies - the two physical encodings of history
//!
//! - `AppendOnly` - every fact becomes one immutable row tagged with
//!   the revision at which it became true; point-in-time reads scan
//!   for the latest applicable row
//! - `ValidityInterval` - every fact closes the previously open row
//!   and (unless it is a deletion) opens a new one; point-in-time
//!   reads are a single interval-containment lookup
//!
//! The two are interchangeable at the read-contract level: identical
//! fact histories must yield identical logical results from `read_at`
//! and from collection reconstruction. They differ only in write cost
//! and physical row count growth.
//!
//! The strategy is a closed tagged variant selected once at
//! configuration time; dispatch goes through the `AuditStrategy`
//! trait, never through dynamic loading.

mod append_only;
mod errors;
mod validity_interval;

pub use append_only::AppendOnlyStrategy;
pub use errors::{StrategyError, StrategyResult};
pub use validity_interval::ValidityIntervalStrategy;

use serde::{Deserialize, Serialize};

use crate::change::{AuditFact, RowKey};
use crate::revision::RevisionId;
use crate::store::{AuditRow, AuditTable, RowOp};

/// The closed set of physical encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Immutable, ever-growing log.
    AppendOnly,
    /// Closed/open validity intervals per key.
    ValidityInterval,
}

impl StrategyKind {
    /// Returns the stable string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::AppendOnly => "append_only",
            StrategyKind::ValidityInterval => "validity_interval",
        }
    }

    /// Constructs the strategy implementation for this kind.
    pub fn strategy(&self) -> Box<dyn AuditStrategy> {
        match self {
            StrategyKind::AppendOnly => Box::new(AppendOnlyStrategy),
            StrategyKind::ValidityInterval => Box::new(ValidityIntervalStrategy),
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Pluggable policy deciding how facts are persisted and how
/// historical queries are answered.
pub trait AuditStrategy: Send + Sync {
    /// Returns which encoding this strategy implements.
    fn kind(&self) -> StrategyKind;

    /// Plans the row operations encoding one fact at one revision.
    ///
    /// Planning is pure with respect to the table: it reads current
    /// state but mutates nothing. The engine folds every fact of a
    /// revision into one batch so the revision applies atomically.
    fn plan_write(
        &self,
        table: &dyn AuditTable,
        fact: &AuditFact,
        revision: RevisionId,
    ) -> StrategyResult<Vec<RowOp>>;

    /// Returns the row valid for a key at the target revision.
    ///
    /// Absent if the key did not exist at that revision, including
    /// when its latest applicable change is a deletion.
    fn read_at(
        &self,
        table: &dyn AuditTable,
        key: &RowKey,
        revision: RevisionId,
    ) -> StrategyResult<Option<AuditRow>>;
}
