//! Historical Reader - point-in-time reconstruction
//!
//! Given an entity type, primary key, and target revision, rebuilds
//! the logical state (entity payload plus collection contents) by
//! delegating to the active strategy's query shape.
//!
//! Reads are stateless and restartable: re-calling any query has no
//! side effects, and reads never block writers.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde_json::Value;

use crate::change::{ElementKey, OwnerKey, RowKey};
use crate::errors::{AuditError, AuditResult};
use crate::metadata::AuditConfig;
use crate::revision::RevisionId;
use crate::store::AuditTable;
use crate::strategy::AuditStrategy;

/// A reconstructed collection: element key to element state.
pub type CollectionState = BTreeMap<ElementKey, Value>;

/// The logical state of an entity at one revision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RestoredEntity {
    /// Scalar/embedded state.
    attributes: Value,
    /// Reconstructed collection attributes, by attribute name.
    collections: BTreeMap<String, CollectionState>,
}

impl RestoredEntity {
    /// Returns the scalar/embedded state.
    #[inline]
    pub fn attributes(&self) -> &Value {
        &self.attributes
    }

    /// Returns one reconstructed collection attribute.
    pub fn collection(&self, attribute: &str) -> Option<&CollectionState> {
        self.collections.get(attribute)
    }

    /// Returns all reconstructed collection attributes.
    #[inline]
    pub fn collections(&self) -> &BTreeMap<String, CollectionState> {
        &self.collections
    }
}

/// Stateless historical reads over one strategy and table.
pub struct HistoricalReader<'a> {
    config: &'a AuditConfig,
    strategy: &'a dyn AuditStrategy,
    table: &'a dyn AuditTable,
}

impl<'a> HistoricalReader<'a> {
    /// Creates a reader over the given configuration, strategy, and
    /// table.
    pub fn new(
        config: &'a AuditConfig,
        strategy: &'a dyn AuditStrategy,
        table: &'a dyn AuditTable,
    ) -> Self {
        Self {
            config,
            strategy,
            table,
        }
    }

    /// Returns the entity's scalar/embedded state at a revision.
    ///
    /// Absent if the entity did not exist then, including when its
    /// latest applicable change is a deletion.
    pub fn find_entity_at(
        &self,
        entity: &str,
        id: &str,
        revision: RevisionId,
    ) -> AuditResult<Option<Value>> {
        let key = RowKey::entity(OwnerKey::new(entity, id));
        let row = self.strategy.read_at(self.table, &key, revision)?;
        Ok(row.map(|row| row.payload().clone()))
    }

    /// Reconstructs one collection attribute at a revision.
    ///
    /// Enumerates every element key ever seen for the attribute,
    /// applies the strategy's read per key, and keeps the survivors.
    pub fn find_collection_at(
        &self,
        owner: &OwnerKey,
        attribute: &str,
        revision: RevisionId,
    ) -> AuditResult<CollectionState> {
        let mut collection = BTreeMap::new();

        for element in self.table.element_keys(owner, attribute)? {
            let key = RowKey::element(owner.clone(), attribute, element.clone());
            if let Some(row) = self.strategy.read_at(self.table, &key, revision)? {
                collection.insert(element, row.payload().clone());
            }
        }

        Ok(collection)
    }

    /// Reconstructs the full logical state of an entity at a revision.
    ///
    /// Absent if the entity itself is absent, regardless of surviving
    /// collection rows.
    pub fn state_at(
        &self,
        entity: &str,
        id: &str,
        revision: RevisionId,
    ) -> AuditResult<Option<RestoredEntity>> {
        let audit = self
            .config
            .entity(entity)
            .ok_or_else(|| AuditError::UnknownEntity(entity.to_string()))?;

        let Some(attributes) = self.find_entity_at(entity, id, revision)? else {
            return Ok(None);
        };

        let owner = OwnerKey::new(entity, id);
        let mut collections = BTreeMap::new();
        for collection in audit.collections() {
            let state = self.find_collection_at(&owner, collection.attribute(), revision)?;
            collections.insert(collection.attribute().to_string(), state);
        }

        Ok(Some(RestoredEntity {
            attributes,
            collections,
        }))
    }

    /// Returns the ordered change history of an entity.
    ///
    /// One `(revision, state)` pair per revision at which the entity
    /// or any of its audited collections changed and the entity still
    /// existed afterwards. A deleting revision produces no pair, under
    /// either strategy.
    pub fn history(&self, entity: &str, id: &str) -> AuditResult<Vec<(RevisionId, RestoredEntity)>> {
        let mut history = Vec::new();
        for revision in self.change_revisions(entity, id)? {
            if let Some(state) = self.state_at(entity, id, revision)? {
                history.push((revision, state));
            }
        }
        Ok(history)
    }

    /// Returns every revision that touched the entity, deletions
    /// included, in ascending order.
    pub fn revisions_of(&self, entity: &str, id: &str) -> AuditResult<Vec<RevisionId>> {
        Ok(self.change_revisions(entity, id)?.into_iter().collect())
    }

    /// The set of revisions at which anything about the entity
    /// changed.
    ///
    /// Derived from row boundaries: start revisions under both
    /// encodings, plus end revisions under the validity-interval
    /// encoding (a close with no successor is how that encoding spells
    /// a deletion). The resulting set is identical for both.
    fn change_revisions(&self, entity: &str, id: &str) -> AuditResult<BTreeSet<RevisionId>> {
        let audit = self
            .config
            .entity(entity)
            .ok_or_else(|| AuditError::UnknownEntity(entity.to_string()))?;
        let owner = OwnerKey::new(entity, id);

        let mut keys = vec![RowKey::entity(owner.clone())];
        for collection in audit.collections() {
            for element in self.table.element_keys(&owner, collection.attribute())? {
                keys.push(RowKey::element(
                    owner.clone(),
                    collection.attribute(),
                    element,
                ));
            }
        }

        let mut revisions = BTreeSet::new();
        for key in keys {
            for row in self.table.rows_for_key(&key)? {
                revisions.insert(row.start_revision());
                if let Some(end) = row.end_revision() {
                    revisions.insert(end);
                }
            }
        }
        Ok(revisions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::{AuditFact, ChangeKind};
    use crate::metadata::{EntityAudit, KeyRule};
    use crate::store::{AuditRow, MemoryAuditTable, RowOp, WriteBatch};
    use crate::strategy::{AppendOnlyStrategy, StrategyKind};
    use serde_json::json;

    fn config() -> AuditConfig {
        AuditConfig::new(StrategyKind::AppendOnly)
            .with_entity(EntityAudit::new("Person").with_collection("embs", KeyRule::MapKey))
    }

    fn insert(table: &MemoryAuditTable, key: RowKey, kind: ChangeKind, payload: Value, rev: u64) {
        table
            .apply(WriteBatch::new(
                RevisionId::new(rev),
                vec![RowOp::Insert(AuditRow::open(
                    key,
                    kind,
                    payload,
                    RevisionId::new(rev),
                ))],
            ))
            .unwrap();
    }

    #[test]
    fn test_state_at_assembles_entity_and_collections() {
        let config = config();
        let table = MemoryAuditTable::new();
        let owner = OwnerKey::new("Person", "1");

        insert(
            &table,
            RowKey::entity(owner.clone()),
            ChangeKind::Add,
            json!({"name": "Ada"}),
            1,
        );
        insert(
            &table,
            RowKey::element(owner.clone(), "embs", ElementKey::new("a")),
            ChangeKind::Add,
            json!("value1"),
            1,
        );

        let reader = HistoricalReader::new(&config, &AppendOnlyStrategy, &table);
        let state = reader
            .state_at("Person", "1", RevisionId::new(1))
            .unwrap()
            .unwrap();

        assert_eq!(state.attributes(), &json!({"name": "Ada"}));
        assert_eq!(
            state.collection("embs").unwrap()[&ElementKey::new("a")],
            json!("value1")
        );
    }

    #[test]
    fn test_absent_entity_hides_collection_rows() {
        let config = config();
        let table = MemoryAuditTable::new();
        let owner = OwnerKey::new("Person", "1");

        // Collection row exists at revision 1 but the entity row does
        // not appear until revision 2.
        insert(
            &table,
            RowKey::element(owner.clone(), "embs", ElementKey::new("a")),
            ChangeKind::Add,
            json!("value1"),
            1,
        );
        insert(
            &table,
            RowKey::entity(owner),
            ChangeKind::Add,
            json!({}),
            2,
        );

        let reader = HistoricalReader::new(&config, &AppendOnlyStrategy, &table);
        assert!(reader
            .state_at("Person", "1", RevisionId::new(1))
            .unwrap()
            .is_none());
        assert!(reader
            .state_at("Person", "1", RevisionId::new(2))
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_unknown_entity_is_an_error() {
        let config = config();
        let table = MemoryAuditTable::new();
        let reader = HistoricalReader::new(&config, &AppendOnlyStrategy, &table);

        let err = reader
            .state_at("Order", "1", RevisionId::new(1))
            .unwrap_err();
        assert!(matches!(err, AuditError::UnknownEntity(name) if name == "Order"));
    }

    #[test]
    fn test_reads_are_restartable() {
        let config = config();
        let table = MemoryAuditTable::new();
        let owner = OwnerKey::new("Person", "1");
        insert(
            &table,
            RowKey::entity(owner),
            ChangeKind::Add,
            json!({"name": "Ada"}),
            1,
        );

        let reader = HistoricalReader::new(&config, &AppendOnlyStrategy, &table);
        let first = reader.state_at("Person", "1", RevisionId::new(1)).unwrap();
        let second = reader.state_at("Person", "1", RevisionId::new(1)).unwrap();
        assert_eq!(first, second);
        assert_eq!(table.row_count().unwrap(), 1);
    }

    #[test]
    fn test_revisions_of_includes_deletions() {
        let config = config();
        let table = MemoryAuditTable::new();
        let owner = OwnerKey::new("Person", "1");

        insert(
            &table,
            RowKey::entity(owner.clone()),
            ChangeKind::Add,
            json!({}),
            1,
        );
        insert(
            &table,
            RowKey::entity(owner),
            ChangeKind::Del,
            Value::Null,
            2,
        );

        let reader = HistoricalReader::new(&config, &AppendOnlyStrategy, &table);
        let revisions = reader.revisions_of("Person", "1").unwrap();
        assert_eq!(revisions, vec![RevisionId::new(1), RevisionId::new(2)]);

        // But history carries no pair for the deleting revision.
        let history = reader.history("Person", "1").unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].0, RevisionId::new(1));
    }

    #[test]
    fn test_find_collection_discards_deleted_elements() {
        let config = config();
        let table = MemoryAuditTable::new();
        let owner = OwnerKey::new("Person", "1");
        let element = RowKey::element(owner.clone(), "embs", ElementKey::new("a"));

        insert(&table, element.clone(), ChangeKind::Add, json!("v"), 1);
        insert(&table, element, ChangeKind::Del, Value::Null, 2);

        let reader = HistoricalReader::new(&config, &AppendOnlyStrategy, &table);
        let at_1 = reader
            .find_collection_at(&owner, "embs", RevisionId::new(1))
            .unwrap();
        assert_eq!(at_1.len(), 1);

        let at_2 = reader
            .find_collection_at(&owner, "embs", RevisionId::new(2))
            .unwrap();
        assert!(at_2.is_empty());
    }
}
