//! Audit configuration types
//!
//! Explicit serde-derived structures with constructor helpers; the
//! whole configuration is immutable once handed to the engine.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::strategy::StrategyKind;

use super::MetadataError;

/// How a collection element's stable key is derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum KeyRule {
    /// The attribute is a map; the map key is the element key.
    MapKey,
    /// Copy a named scalar field of the element as its identity.
    NaturalKey {
        /// Field to extract the key from.
        field: String,
    },
    /// Key elements by their position in the sequence.
    Positional,
}

impl KeyRule {
    /// Creates a natural-key rule for the given field.
    pub fn natural_key(field: impl Into<String>) -> Self {
        KeyRule::NaturalKey {
            field: field.into(),
        }
    }
}

/// One audited collection-valued attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionAudit {
    /// Attribute name on the owning entity.
    attribute: String,
    /// Element key extraction rule.
    rule: KeyRule,
}

impl CollectionAudit {
    /// Creates an audited collection attribute.
    pub fn new(attribute: impl Into<String>, rule: KeyRule) -> Self {
        Self {
            attribute: attribute.into(),
            rule,
        }
    }

    /// Returns the attribute name.
    #[inline]
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Returns the key extraction rule.
    #[inline]
    pub fn rule(&self) -> &KeyRule {
        &self.rule
    }
}

/// One audited entity type and its audited collection attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityAudit {
    /// Entity type name.
    entity: String,
    /// Audited collection attributes.
    collections: Vec<CollectionAudit>,
}

impl EntityAudit {
    /// Creates an audited entity with no collection attributes.
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            collections: Vec::new(),
        }
    }

    /// Adds an audited collection attribute.
    pub fn with_collection(mut self, attribute: impl Into<String>, rule: KeyRule) -> Self {
        self.collections.push(CollectionAudit::new(attribute, rule));
        self
    }

    /// Returns the entity type name.
    #[inline]
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Returns the audited collection attributes.
    #[inline]
    pub fn collections(&self) -> &[CollectionAudit] {
        &self.collections
    }

    /// Looks up one audited collection attribute.
    pub fn collection(&self, attribute: &str) -> Option<&CollectionAudit> {
        self.collections.iter().find(|c| c.attribute == attribute)
    }
}

/// The full audit configuration: strategy selection plus the set of
/// audited entity types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Physical encoding, selected once at configuration time.
    strategy: StrategyKind,
    /// Audited entity types.
    entities: Vec<EntityAudit>,
}

impl AuditConfig {
    /// Creates a configuration for the given strategy.
    pub fn new(strategy: StrategyKind) -> Self {
        Self {
            strategy,
            entities: Vec::new(),
        }
    }

    /// Registers an audited entity type.
    pub fn with_entity(mut self, entity: EntityAudit) -> Self {
        self.entities.push(entity);
        self
    }

    /// Returns the selected strategy kind.
    #[inline]
    pub fn strategy(&self) -> StrategyKind {
        self.strategy
    }

    /// Looks up an audited entity type.
    pub fn entity(&self, name: &str) -> Option<&EntityAudit> {
        self.entities.iter().find(|e| e.entity == name)
    }

    /// Returns true if the entity type is audited.
    pub fn is_audited(&self, name: &str) -> bool {
        self.entity(name).is_some()
    }

    /// Looks up the key rule for one collection attribute.
    pub fn collection_rule(&self, entity: &str, attribute: &str) -> Option<&KeyRule> {
        self.entity(entity)?.collection(attribute).map(|c| c.rule())
    }

    /// Validates the configuration.
    ///
    /// Rejects duplicate entity or attribute registrations and empty
    /// natural-key field names.
    pub fn validate(&self) -> Result<(), MetadataError> {
        let mut seen_entities = HashSet::new();
        for entity in &self.entities {
            if !seen_entities.insert(entity.entity.as_str()) {
                return Err(MetadataError::DuplicateEntity(entity.entity.clone()));
            }

            let mut seen_attributes = HashSet::new();
            for collection in &entity.collections {
                if !seen_attributes.insert(collection.attribute.as_str()) {
                    return Err(MetadataError::DuplicateAttribute {
                        entity: entity.entity.clone(),
                        attribute: collection.attribute.clone(),
                    });
                }
                if let KeyRule::NaturalKey { field } = &collection.rule {
                    if field.is_empty() {
                        return Err(MetadataError::EmptyNaturalKeyField {
                            entity: entity.entity.clone(),
                            attribute: collection.attribute.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}
