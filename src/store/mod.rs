//! Tabular Audit Storage
//!
//! The engine writes and reads audit history through a generic tabular
//! interface; it does not itself map object graphs to tables.
//!
//! This module provides:
//! - `AuditRow` - the persisted record, in either physical encoding
//! - `RowOp` / `WriteBatch` - the atomic write vocabulary
//! - `AuditTable` - the storage trait
//! - `MemoryAuditTable` - the in-memory reference implementation
//!
//! A batch is applied all-or-nothing: either every operation of a
//! revision lands, or none do.

mod errors;
mod memory;
mod row;
mod table;

pub use errors::{TableError, TableResult};
pub use memory::MemoryAuditTable;
pub use row::{AuditRow, RowOp, WriteBatch};
pub use table::AuditTable;
