//! Audit Metadata - static configuration of what gets audited
//!
//! Replaces reflective/annotation-driven discovery with an explicit
//! configuration structure built once at startup and validated before
//! the engine accepts any unit-of-work:
//! - `KeyRule` - how a collection element's stable key is derived
//! - `CollectionAudit` - one audited collection attribute
//! - `EntityAudit` - one audited entity type
//! - `AuditConfig` - the full configuration, including the strategy
//!   selection
//!
//! The configuration is passed by reference into the collector and
//! reader; nothing is discovered at commit time.

mod errors;
mod types;

pub use errors::MetadataError;
pub use types::{AuditConfig, CollectionAudit, EntityAudit, KeyRule};
