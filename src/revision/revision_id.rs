//! RevisionId - Totally ordered revision identity
//!
//! - Totally orders all committed units-of-work
//! - Independent of wall-clock time
//! - No two units-of-work share the same identity
//!
//! This is a PURE TYPE with NO behavior beyond construction and access.

use serde::{Deserialize, Serialize};

/// A totally ordered, opaque revision identity.
///
/// Every audit row carries the revision at which it became true (and,
/// in the validity-interval encoding, the revision at which it stopped
/// being true). The ordering of revision identities is the sole
/// authority for point-in-time reads.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevisionId(u64);

impl RevisionId {
    /// Creates a new RevisionId with the given value.
    ///
    /// This is the only way to construct a RevisionId.
    /// No Default implementation exists to prevent accidental construction.
    #[inline]
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the underlying value.
    ///
    /// This accessor exists for serialization and debugging only.
    /// Application code should not depend on the internal representation.
    #[inline]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RevisionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
