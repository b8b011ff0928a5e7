//! Validity-Interval Strategy - history as closed/open intervals
//!
//! State machine per key: at most one row may be open (no end
//! revision) at a time. Writing a fact closes the currently open row
//! at the new revision and, unless the fact is a deletion, inserts the
//! new open row - both inside the same atomic batch. A deletion only
//! closes.
//!
//! The close carries the open row's start revision as an optimistic
//! check, so two units-of-work racing for the same key cannot both
//! close it: the loser's batch is rejected whole and surfaces as a
//! concurrent-modification conflict. The engine never proceeds to
//! insert a second open row for the key.
//!
//! One extra update per change buys an O(1)-shaped point-in-time read:
//! a single interval-containment lookup, no chain scan semantics.

use crate::change::{AuditFact, RowKey};
use crate::revision::RevisionId;
use crate::store::{AuditRow, AuditTable, RowOp};

use super::{AuditStrategy, StrategyError, StrategyKind, StrategyResult};

/// The validity-interval physical encoding.
pub struct ValidityIntervalStrategy;

impl AuditStrategy for ValidityIntervalStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ValidityInterval
    }

    fn plan_write(
        &self,
        table: &dyn AuditTable,
        fact: &AuditFact,
        revision: RevisionId,
    ) -> StrategyResult<Vec<RowOp>> {
        let mut ops = Vec::with_capacity(2);

        if let Some(open) = table.open_row(fact.key())? {
            ops.push(RowOp::CloseOpen {
                key: fact.key().clone(),
                expected_start: open.start_revision(),
                end: revision,
            });
        }

        // A deletion closes the prior row and inserts nothing; absence
        // of an open row IS the deleted state.
        if !fact.kind().is_deletion() {
            ops.push(RowOp::Insert(AuditRow::open(
                fact.key().clone(),
                fact.kind(),
                fact.payload().clone(),
                revision,
            )));
        }

        Ok(ops)
    }

    fn read_at(
        &self,
        table: &dyn AuditTable,
        key: &RowKey,
        revision: RevisionId,
    ) -> StrategyResult<Option<AuditRow>> {
        let rows = table.rows_for_key(key)?;
        let mut matches = rows.into_iter().filter(|row| row.contains(revision));

        let row = matches.next();
        let extra = matches.count();
        if extra > 0 {
            // Overlapping intervals: the open-row invariant is broken
            // in the stored data.
            return Err(StrategyError::MalformedHistory {
                key: key.clone(),
                open_rows: extra + 1,
            });
        }

        Ok(row.filter(|row| !row.kind().is_deletion()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::{AuditFact, OwnerKey};
    use crate::store::{MemoryAuditTable, WriteBatch};
    use serde_json::json;

    fn key() -> RowKey {
        RowKey::entity(OwnerKey::new("Person", "1"))
    }

    fn write(table: &MemoryAuditTable, fact: AuditFact, revision: u64) {
        let revision = RevisionId::new(revision);
        let ops = ValidityIntervalStrategy
            .plan_write(table, &fact, revision)
            .unwrap();
        table.apply(WriteBatch::new(revision, ops)).unwrap();
    }

    fn open_rows(table: &MemoryAuditTable, key: &RowKey) -> usize {
        table
            .rows_for_key(key)
            .unwrap()
            .iter()
            .filter(|r| r.is_open())
            .count()
    }

    #[test]
    fn test_first_write_opens_a_row() {
        let table = MemoryAuditTable::new();
        write(&table, AuditFact::added(key(), json!("v1")), 1);

        let rows = table.rows_for_key(&key()).unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].is_open());
    }

    #[test]
    fn test_superseding_write_closes_in_place() {
        let table = MemoryAuditTable::new();
        write(&table, AuditFact::added(key(), json!("v1")), 1);
        write(&table, AuditFact::modified(key(), json!("v2")), 2);

        let rows = table.rows_for_key(&key()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].end_revision(), Some(RevisionId::new(2)));
        assert!(rows[1].is_open());
        assert_eq!(open_rows(&table, &key()), 1);
    }

    #[test]
    fn test_deletion_only_closes() {
        let table = MemoryAuditTable::new();
        write(&table, AuditFact::added(key(), json!("v1")), 1);
        write(&table, AuditFact::deleted(key()), 2);

        let rows = table.rows_for_key(&key()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].end_revision(), Some(RevisionId::new(2)));
        assert_eq!(open_rows(&table, &key()), 0);
    }

    #[test]
    fn test_read_at_is_interval_containment() {
        let table = MemoryAuditTable::new();
        write(&table, AuditFact::added(key(), json!("v1")), 1);
        write(&table, AuditFact::modified(key(), json!("v2")), 3);

        let at_1 = ValidityIntervalStrategy
            .read_at(&table, &key(), RevisionId::new(1))
            .unwrap()
            .unwrap();
        assert_eq!(at_1.payload(), &json!("v1"));

        let at_2 = ValidityIntervalStrategy
            .read_at(&table, &key(), RevisionId::new(2))
            .unwrap()
            .unwrap();
        assert_eq!(at_2.payload(), &json!("v1"));

        let at_3 = ValidityIntervalStrategy
            .read_at(&table, &key(), RevisionId::new(3))
            .unwrap()
            .unwrap();
        assert_eq!(at_3.payload(), &json!("v2"));
    }

    #[test]
    fn test_read_after_deletion_is_absent() {
        let table = MemoryAuditTable::new();
        write(&table, AuditFact::added(key(), json!("v1")), 1);
        write(&table, AuditFact::deleted(key()), 2);

        assert!(ValidityIntervalStrategy
            .read_at(&table, &key(), RevisionId::new(2))
            .unwrap()
            .is_none());
        assert!(ValidityIntervalStrategy
            .read_at(&table, &key(), RevisionId::new(1))
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_reinsert_after_deletion_opens_fresh_interval() {
        let table = MemoryAuditTable::new();
        write(&table, AuditFact::added(key(), json!("v1")), 1);
        write(&table, AuditFact::deleted(key()), 2);
        write(&table, AuditFact::added(key(), json!("v2")), 3);

        let rows = table.rows_for_key(&key()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(open_rows(&table, &key()), 1);

        assert!(ValidityIntervalStrategy
            .read_at(&table, &key(), RevisionId::new(2))
            .unwrap()
            .is_none());
        let at_3 = ValidityIntervalStrategy
            .read_at(&table, &key(), RevisionId::new(3))
            .unwrap()
            .unwrap();
        assert_eq!(at_3.payload(), &json!("v2"));
    }

    #[test]
    fn test_lost_race_surfaces_as_concurrent_modification() {
        let table = MemoryAuditTable::new();
        write(&table, AuditFact::added(key(), json!("v1")), 1);

        // Two writers plan against the same open row.
        let plan_a = ValidityIntervalStrategy
            .plan_write(&table, &AuditFact::modified(key(), json!("a")), RevisionId::new(2))
            .unwrap();
        let plan_b = ValidityIntervalStrategy
            .plan_write(&table, &AuditFact::modified(key(), json!("b")), RevisionId::new(3))
            .unwrap();

        // Writer A commits first.
        table.apply(WriteBatch::new(RevisionId::new(2), plan_a)).unwrap();

        // Writer B's close is now stale; the whole batch is rejected
        // and no second open row appears.
        let err: StrategyError = table
            .apply(WriteBatch::new(RevisionId::new(3), plan_b))
            .unwrap_err()
            .into();
        assert_eq!(err, StrategyError::ConcurrentModification { key: key() });
        assert_eq!(open_rows(&table, &key()), 1);
    }

    #[test]
    fn test_overlapping_intervals_are_fatal_on_read() {
        let table = MemoryAuditTable::new();
        // Simulate tampered data: two open rows inserted raw.
        for revision in [1u64, 2] {
            table
                .apply(WriteBatch::new(
                    RevisionId::new(revision),
                    vec![RowOp::Insert(AuditRow::open(
                        key(),
                        crate::change::ChangeKind::Add,
                        json!("v"),
                        RevisionId::new(revision),
                    ))],
                ))
                .unwrap();
        }

        let err = ValidityIntervalStrategy
            .read_at(&table, &key(), RevisionId::new(5))
            .unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(err, StrategyError::MalformedHistory { .. }));
    }
}
