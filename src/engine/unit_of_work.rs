//! UnitOfWork - snapshot capture for one commit
//!
//! The persistence layer records before/after snapshots here as it
//! flushes; the engine consumes the whole unit-of-work at commit.
//! Snapshots are plain values: the engine never reaches back into the
//! caller's change tracking.

use std::collections::BTreeMap;

use serde_json::Value;
use uuid::Uuid;

use crate::change::OwnerKey;

/// Before/after snapshot of one entity's scalar/embedded state.
#[derive(Debug, Clone)]
pub(crate) struct EntitySnapshot {
    owner: OwnerKey,
    before: Option<Value>,
    after: Option<Value>,
}

impl EntitySnapshot {
    pub(crate) fn owner(&self) -> &OwnerKey {
        &self.owner
    }

    pub(crate) fn before(&self) -> Option<&Value> {
        self.before.as_ref()
    }

    pub(crate) fn after(&self) -> Option<&Value> {
        self.after.as_ref()
    }
}

/// Before/after snapshot of a map-valued attribute, pre-keyed by the
/// caller.
#[derive(Debug, Clone)]
pub(crate) struct KeyedCollectionSnapshot {
    owner: OwnerKey,
    attribute: String,
    before: BTreeMap<String, Value>,
    after: BTreeMap<String, Value>,
}

impl KeyedCollectionSnapshot {
    pub(crate) fn owner(&self) -> &OwnerKey {
        &self.owner
    }

    pub(crate) fn attribute(&self) -> &str {
        &self.attribute
    }

    pub(crate) fn before(&self) -> &BTreeMap<String, Value> {
        &self.before
    }

    pub(crate) fn after(&self) -> &BTreeMap<String, Value> {
        &self.after
    }
}

/// Before/after snapshot of an unkeyed element collection; the
/// configured key rule projects it at commit time.
#[derive(Debug, Clone)]
pub(crate) struct ElementCollectionSnapshot {
    owner: OwnerKey,
    attribute: String,
    before: Vec<Value>,
    after: Vec<Value>,
}

impl ElementCollectionSnapshot {
    pub(crate) fn owner(&self) -> &OwnerKey {
        &self.owner
    }

    pub(crate) fn attribute(&self) -> &str {
        &self.attribute
    }

    pub(crate) fn before(&self) -> &[Value] {
        &self.before
    }

    pub(crate) fn after(&self) -> &[Value] {
        &self.after
    }
}

/// One committing unit-of-work's recorded snapshots.
#[derive(Debug, Clone)]
pub struct UnitOfWork {
    /// Correlation id for logging; not part of history.
    id: Uuid,
    entities: Vec<EntitySnapshot>,
    keyed_collections: Vec<KeyedCollectionSnapshot>,
    element_collections: Vec<ElementCollectionSnapshot>,
}

impl UnitOfWork {
    /// Creates an empty unit-of-work.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            entities: Vec::new(),
            keyed_collections: Vec::new(),
            element_collections: Vec::new(),
        }
    }

    /// Returns the correlation id.
    #[inline]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Records an entity's before/after state.
    ///
    /// Absent before = insert; absent after = delete.
    pub fn record_entity(
        &mut self,
        entity: impl Into<String>,
        id: impl Into<String>,
        before: Option<Value>,
        after: Option<Value>,
    ) {
        self.entities.push(EntitySnapshot {
            owner: OwnerKey::new(entity, id),
            before,
            after,
        });
    }

    /// Records a map-valued attribute's before/after entries.
    pub fn record_keyed_collection(
        &mut self,
        entity: impl Into<String>,
        id: impl Into<String>,
        attribute: impl Into<String>,
        before: BTreeMap<String, Value>,
        after: BTreeMap<String, Value>,
    ) {
        self.keyed_collections.push(KeyedCollectionSnapshot {
            owner: OwnerKey::new(entity, id),
            attribute: attribute.into(),
            before,
            after,
        });
    }

    /// Records an unkeyed element collection's before/after elements.
    pub fn record_collection(
        &mut self,
        entity: impl Into<String>,
        id: impl Into<String>,
        attribute: impl Into<String>,
        before: Vec<Value>,
        after: Vec<Value>,
    ) {
        self.element_collections.push(ElementCollectionSnapshot {
            owner: OwnerKey::new(entity, id),
            attribute: attribute.into(),
            before,
            after,
        });
    }

    /// Returns true if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
            && self.keyed_collections.is_empty()
            && self.element_collections.is_empty()
    }

    pub(crate) fn entities(&self) -> &[EntitySnapshot] {
        &self.entities
    }

    pub(crate) fn keyed_collections(&self) -> &[KeyedCollectionSnapshot] {
        &self.keyed_collections
    }

    pub(crate) fn element_collections(&self) -> &[ElementCollectionSnapshot] {
        &self.element_collections
    }
}

impl Default for UnitOfWork {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_unit_of_work_is_empty() {
        let uow = UnitOfWork::new();
        assert!(uow.is_empty());
    }

    #[test]
    fn test_recording_fills_unit_of_work() {
        let mut uow = UnitOfWork::new();
        uow.record_entity("Person", "1", None, Some(json!({})));
        assert!(!uow.is_empty());
        assert_eq!(uow.entities().len(), 1);
    }

    #[test]
    fn test_correlation_ids_are_distinct() {
        assert_ne!(UnitOfWork::new().id(), UnitOfWork::new().id());
    }
}
