//! Revision Domain Types
//!
//! Defines the vocabulary of temporal versioning:
//! - `RevisionId` - Totally ordered revision identity
//! - `Revision` - Immutable revision record (identity + wall-clock timestamp)
//! - `RevisionSequencer` - Monotone revision allocation with a
//!   pending/committed/aborted lifecycle
//!
//! Exactly one revision exists per committed unit-of-work. A revision
//! that was allocated but whose unit-of-work rolled back leaves no
//! observable trace.

mod revision_id;
mod sequencer;

pub use revision_id::RevisionId;
pub use sequencer::{Revision, RevisionSequencer, SequencerError};
