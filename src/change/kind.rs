//! ChangeKind - ADD / MOD / DEL classification
//!
//! Deletions are explicit, NOT represented via Option or missing rows.
//! A deletion fact is fully ordered in the key's history like any
//! other change.

use serde::{Deserialize, Serialize};

/// The classification of one change to an entity or collection element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    /// The entity or element came into existence at this revision.
    Add,
    /// The entity or element changed state at this revision.
    Mod,
    /// The entity or element ceased to exist at this revision.
    Del,
}

impl ChangeKind {
    /// Returns the stable string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Add => "ADD",
            ChangeKind::Mod => "MOD",
            ChangeKind::Del => "DEL",
        }
    }

    /// Returns true if this change removes the entity or element.
    #[inline]
    pub fn is_deletion(&self) -> bool {
        matches!(self, ChangeKind::Del)
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
