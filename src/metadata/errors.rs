//! Metadata error types
//!
//! A malformed configuration fails at startup, not at commit time.

use thiserror::Error;

/// Errors from audit configuration validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetadataError {
    /// The same entity type was registered twice.
    #[error("entity '{0}' is registered more than once")]
    DuplicateEntity(String),

    /// The same collection attribute was registered twice for one entity.
    #[error("attribute '{attribute}' of entity '{entity}' is registered more than once")]
    DuplicateAttribute { entity: String, attribute: String },

    /// A natural-key rule names an empty field.
    #[error("attribute '{attribute}' of entity '{entity}' has an empty natural-key field")]
    EmptyNaturalKeyField { entity: String, attribute: String },
}
