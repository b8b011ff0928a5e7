//! Audit Keys - the stable identities history is keyed by
//!
//! - `OwnerKey` - entity type + primary key of the audited owner
//! - `AttributePath` - the entity itself, or one collection attribute
//! - `ElementKey` - stable identity of one collection element
//! - `RowKey` - the full (owner, attribute, element) addressing triple
//!
//! Rows for the same `RowKey` form a logical chronological chain;
//! independent elements can change across revisions without disturbing
//! sibling elements.
//!
//! These are PURE TYPES with NO behavior beyond construction and access.

use serde::{Deserialize, Serialize};

/// Entity type plus primary key of the audited owner.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OwnerKey {
    /// Entity type name.
    entity: String,
    /// Primary key, rendered to its stable string form.
    id: String,
}

impl OwnerKey {
    /// Creates an owner key.
    pub fn new(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Returns the entity type name.
    #[inline]
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Returns the primary key.
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl std::fmt::Display for OwnerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.entity, self.id)
    }
}

/// What part of the owner a fact or row describes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AttributePath {
    /// The entity's own scalar/embedded state.
    Entity,
    /// One named collection-valued attribute.
    Collection(String),
}

impl AttributePath {
    /// Returns the collection attribute name, if any.
    pub fn collection_name(&self) -> Option<&str> {
        match self {
            AttributePath::Entity => None,
            AttributePath::Collection(name) => Some(name),
        }
    }
}

/// Stable identity of one collection element.
///
/// The surrogate under which an element is individually versioned: a
/// map key, a copy of the element's natural identity, or a positional
/// ordinal, depending on the configured extraction rule.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementKey(String);

impl ElementKey {
    /// Creates an element key from its stable string form.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Creates a positional element key from an ordinal.
    pub fn positional(index: usize) -> Self {
        Self(index.to_string())
    }

    /// Returns the stable string form.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ElementKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The full addressing triple of one audit chain.
///
/// Entity-level chains have no element key; collection-element chains
/// carry the attribute path and the element's stable identity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RowKey {
    owner: OwnerKey,
    attribute: AttributePath,
    element: Option<ElementKey>,
}

impl RowKey {
    /// Creates the entity-level key for an owner.
    pub fn entity(owner: OwnerKey) -> Self {
        Self {
            owner,
            attribute: AttributePath::Entity,
            element: None,
        }
    }

    /// Creates the key for one element of a collection attribute.
    pub fn element(owner: OwnerKey, attribute: impl Into<String>, element: ElementKey) -> Self {
        Self {
            owner,
            attribute: AttributePath::Collection(attribute.into()),
            element: Some(element),
        }
    }

    /// Returns the owner key.
    #[inline]
    pub fn owner(&self) -> &OwnerKey {
        &self.owner
    }

    /// Returns the attribute path.
    #[inline]
    pub fn attribute(&self) -> &AttributePath {
        &self.attribute
    }

    /// Returns the element key, absent for entity-level chains.
    #[inline]
    pub fn element_key(&self) -> Option<&ElementKey> {
        self.element.as_ref()
    }

    /// Returns true if this is an entity-level key.
    #[inline]
    pub fn is_entity_level(&self) -> bool {
        matches!(self.attribute, AttributePath::Entity)
    }
}

// Reads naturally in error messages: `Person#1`, `Person#1.phones[home]`.
impl std::fmt::Display for RowKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.owner)?;
        if let AttributePath::Collection(name) = &self.attribute {
            write!(f, ".{}", name)?;
        }
        if let Some(element) = &self.element {
            write!(f, "[{}]", element)?;
        }
        Ok(())
    }
}
