//! revaudit - A strict, deterministic revision auditing engine
//!
//! Records, for every committed unit-of-work, the state of audited
//! entities and their collection-valued attributes, so that past states
//! can be reconstructed and change history queried. Two physical
//! encodings (append-only log and validity-interval log) produce
//! equivalent logical history.

pub mod change;
pub mod engine;
pub mod errors;
pub mod metadata;
pub mod observability;
pub mod reader;
pub mod revision;
pub mod store;
pub mod strategy;
