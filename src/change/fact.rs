//! AuditFact - transient description of one change in one revision
//!
//! A fact carries everything a strategy needs to encode the change
//! physically: the row key it belongs to, the change classification,
//! and a structural snapshot of the new state (Null for deletions).
//!
//! Facts are never persisted; the active strategy turns each fact into
//! one or two row operations.

use serde_json::Value;

use super::{ChangeKind, RowKey};

/// A computed description of what changed for one entity or collection
/// element in one revision.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditFact {
    key: RowKey,
    kind: ChangeKind,
    payload: Value,
}

impl AuditFact {
    /// Creates an ADD fact carrying the initial state.
    pub fn added(key: RowKey, payload: Value) -> Self {
        Self {
            key,
            kind: ChangeKind::Add,
            payload,
        }
    }

    /// Creates a MOD fact carrying the new state.
    pub fn modified(key: RowKey, payload: Value) -> Self {
        Self {
            key,
            kind: ChangeKind::Mod,
            payload,
        }
    }

    /// Creates a DEL fact. Deletions carry no payload.
    pub fn deleted(key: RowKey) -> Self {
        Self {
            key,
            kind: ChangeKind::Del,
            payload: Value::Null,
        }
    }

    /// Returns the row key this fact belongs to.
    #[inline]
    pub fn key(&self) -> &RowKey {
        &self.key
    }

    /// Returns the change classification.
    #[inline]
    pub fn kind(&self) -> ChangeKind {
        self.kind
    }

    /// Returns the structural snapshot of the new state.
    #[inline]
    pub fn payload(&self) -> &Value {
        &self.payload
    }
}
