//! Change Vocabulary and Collection
//!
//! This module provides:
//! - `ChangeKind` - ADD / MOD / DEL classification of a change
//! - `OwnerKey`, `AttributePath`, `ElementKey`, `RowKey` - the stable
//!   identities audit history is keyed by
//! - `AuditFact` - a transient description of one change in one revision
//! - `ChangeCollector` - pure before/after diffing
//!
//! Facts are produced and consumed within one revision's processing;
//! they are never persisted as such (see `store::AuditRow`).

mod collector;
mod errors;
mod fact;
mod key;
mod kind;

pub use collector::ChangeCollector;
pub use errors::CollectorError;
pub use fact::AuditFact;
pub use key::{AttributePath, ElementKey, OwnerKey, RowKey};
pub use kind::ChangeKind;
