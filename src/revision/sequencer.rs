//! RevisionSequencer - Monotone revision allocation
//!
//! The sequencer is the sole source of revision identities:
//! - Identities are assigned strictly increasing, exactly once
//! - An allocation is *pending* until the unit-of-work commits
//! - A pending allocation that is aborted leaves no observable trace
//! - Commit records the wall-clock timestamp of the revision
//!
//! The sequencer tracks the highest identity ever allocated, so an
//! aborted allocation's identity is never reused. History therefore
//! may contain gaps, but never ties or reordering.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::RevisionId;

/// An immutable revision record: identity plus commit timestamp.
///
/// Created exactly once per committed unit-of-work; never mutated or
/// deleted afterwards. All fields are private to enforce immutability.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    /// The totally ordered revision identity.
    id: RevisionId,
    /// Wall-clock timestamp captured at commit.
    timestamp: DateTime<Utc>,
}

impl Revision {
    /// Creates a new revision record.
    pub fn new(id: RevisionId, timestamp: DateTime<Utc>) -> Self {
        Self { id, timestamp }
    }

    /// Returns the revision identity.
    #[inline]
    pub fn id(&self) -> RevisionId {
        self.id
    }

    /// Returns the commit timestamp.
    #[inline]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Errors from revision sequencing.
///
/// Any of these aborts the enclosing commit: no audit rows for the
/// unit-of-work may be written once sequencing has failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequencerError {
    /// The identity is not a pending allocation (never begun, already
    /// committed, or already aborted).
    NotPending { id: u64 },
    /// A recovered revision identity is not strictly greater than the
    /// highest identity already known.
    NonMonotonic { observed: u64, highest: u64 },
}

impl std::fmt::Display for SequencerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SequencerError::NotPending { id } => {
                write!(f, "revision {} is not a pending allocation", id)
            }
            SequencerError::NonMonotonic { observed, highest } => {
                write!(
                    f,
                    "non-monotonic revision identity: observed {} but highest is {}",
                    observed, highest
                )
            }
        }
    }
}

impl std::error::Error for SequencerError {}

/// Allocates monotonically increasing revision identities.
///
/// Lifecycle per identity: `begin` -> pending -> (`mark_committed` |
/// `abort`). Only committed identities have a `Revision` record and
/// are visible to history queries.
#[derive(Debug, Default)]
pub struct RevisionSequencer {
    /// Highest identity ever handed out by `begin` or recovered.
    highest_allocated: u64,
    /// Allocations whose unit-of-work has not yet committed or aborted.
    pending: BTreeSet<u64>,
    /// Committed revisions, keyed by identity.
    committed: BTreeMap<u64, Revision>,
}

impl RevisionSequencer {
    /// Creates a sequencer for a fresh history.
    ///
    /// For resuming an existing history, use `observe_recovered` to
    /// replay the durable revision log first.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the next revision identity.
    ///
    /// The returned identity is strictly greater than any identity
    /// previously returned, including aborted ones. The allocation is
    /// pending until `mark_committed` or `abort` is called.
    pub fn begin(&mut self) -> RevisionId {
        self.highest_allocated += 1;
        self.pending.insert(self.highest_allocated);
        RevisionId::new(self.highest_allocated)
    }

    /// Commits a pending allocation, recording its timestamp.
    ///
    /// Must be called at most once per allocation, and only after every
    /// audit row of the unit-of-work has been applied.
    pub fn mark_committed(
        &mut self,
        id: RevisionId,
        timestamp: DateTime<Utc>,
    ) -> Result<Revision, SequencerError> {
        if !self.pending.remove(&id.value()) {
            return Err(SequencerError::NotPending { id: id.value() });
        }
        let revision = Revision::new(id, timestamp);
        self.committed.insert(id.value(), revision.clone());
        Ok(revision)
    }

    /// Aborts a pending allocation.
    ///
    /// The identity is retired, never reused, and never observable
    /// through `revision` or `revisions`.
    pub fn abort(&mut self, id: RevisionId) -> Result<(), SequencerError> {
        if !self.pending.remove(&id.value()) {
            return Err(SequencerError::NotPending { id: id.value() });
        }
        Ok(())
    }

    /// Replays a committed revision from a durable log.
    ///
    /// Identities must be observed in strictly increasing order;
    /// recovery never reassigns identities.
    pub fn observe_recovered(&mut self, revision: Revision) -> Result<(), SequencerError> {
        let id = revision.id().value();
        if id <= self.highest_allocated {
            return Err(SequencerError::NonMonotonic {
                observed: id,
                highest: self.highest_allocated,
            });
        }
        self.highest_allocated = id;
        self.committed.insert(id, revision);
        Ok(())
    }

    /// Looks up a committed revision by identity.
    pub fn revision(&self, id: RevisionId) -> Option<&Revision> {
        self.committed.get(&id.value())
    }

    /// Returns all committed revisions in identity order.
    pub fn revisions(&self) -> Vec<Revision> {
        self.committed.values().cloned().collect()
    }

    /// Returns the highest committed revision identity, if any.
    pub fn highest_committed(&self) -> Option<RevisionId> {
        self.committed
            .keys()
            .next_back()
            .map(|id| RevisionId::new(*id))
    }
}
