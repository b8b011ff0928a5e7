//! Change collection error types
//!
//! An element that cannot be mapped onto a stable key would corrupt
//! history silently, so key-mapping failures are always surfaced to
//! the caller and the unit-of-work aborts before any row is written.

use thiserror::Error;

use super::ElementKey;

/// Errors from projecting collection elements onto a key space.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollectorError {
    /// An element has no value for the configured natural-key field.
    #[error("collection '{attribute}': element {index} has no '{field}' field to key by")]
    MissingNaturalKey {
        attribute: String,
        field: String,
        index: usize,
    },

    /// The natural-key field holds a non-scalar value.
    #[error("collection '{attribute}': element {index} key field '{field}' is not a scalar")]
    NonScalarNaturalKey {
        attribute: String,
        field: String,
        index: usize,
    },

    /// Two elements map to the same key. Silent overwriting is never
    /// acceptable here.
    #[error("collection '{attribute}': duplicate element key '{key}'")]
    DuplicateElementKey { attribute: String, key: ElementKey },

    /// A map-keyed attribute was recorded as an unkeyed sequence; its
    /// keys cannot be derived from the elements.
    #[error("collection '{attribute}': map-keyed attribute recorded without its keys")]
    UnkeyedMapCollection { attribute: String },
}
