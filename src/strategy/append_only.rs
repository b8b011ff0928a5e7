//! Append-Only Strategy - history as an immutable log
//!
//! State machine per key: an ordered chain of rows; no transition ever
//! mutates a prior row. Writing is one insert per fact, deletions
//! included (an explicit DEL row, never a missing row). The point-in-
//! time read is "latest row with start revision <= target, absent if
//! that row is a deletion".
//!
//! Cheap writes, reads that scan the chain.

use crate::change::{AuditFact, RowKey};
use crate::revision::RevisionId;
use crate::store::{AuditRow, AuditTable, RowOp};

use super::{AuditStrategy, StrategyKind, StrategyResult};

/// The append-only physical encoding.
pub struct AppendOnlyStrategy;

impl AuditStrategy for AppendOnlyStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::AppendOnly
    }

    fn plan_write(
        &self,
        _table: &dyn AuditTable,
        fact: &AuditFact,
        revision: RevisionId,
    ) -> StrategyResult<Vec<RowOp>> {
        // One immutable row per fact; no prior row is touched.
        Ok(vec![RowOp::Insert(AuditRow::open(
            fact.key().clone(),
            fact.kind(),
            fact.payload().clone(),
            revision,
        ))])
    }

    fn read_at(
        &self,
        table: &dyn AuditTable,
        key: &RowKey,
        revision: RevisionId,
    ) -> StrategyResult<Option<AuditRow>> {
        let rows = table.rows_for_key(key)?;

        // Latest row with start revision <= target; the chain is
        // ascending, so scan from the back.
        let latest = rows
            .into_iter()
            .rev()
            .find(|row| row.start_revision() <= revision);

        Ok(latest.filter(|row| !row.kind().is_deletion()))
    }
}
