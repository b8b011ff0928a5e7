//! MemoryAuditTable - in-memory reference implementation
//!
//! All state lives behind a single RwLock:
//! - `apply` takes the write lock, validates every precondition, and
//!   only then mutates, so a failed batch leaves no trace and a reader
//!   sees either the fully-open or fully-closed state of a row
//! - reads take the read lock and copy out, so they never block each
//!   other and never observe a partial batch

use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::change::{AttributePath, ElementKey, OwnerKey, RowKey};
use crate::revision::RevisionId;

use super::{AuditRow, AuditTable, RowOp, TableError, TableResult, WriteBatch};

/// In-memory audit table.
#[derive(Debug, Default)]
pub struct MemoryAuditTable {
    state: RwLock<TableState>,
}

#[derive(Debug, Default)]
struct TableState {
    /// Chains by key; each chain ascending by start revision.
    chains: BTreeMap<RowKey, Vec<AuditRow>>,
}

/// Simulated open-row state of one key while validating a batch.
///
/// `start` is only meaningful while exactly one row is open.
struct OpenSim {
    count: usize,
    start: Option<RevisionId>,
}

impl TableState {
    /// Index of the single open row in a chain.
    ///
    /// `Err` carries the open-row count when the invariant is violated.
    fn open_index(&self, key: &RowKey) -> Result<Option<usize>, usize> {
        let Some(chain) = self.chains.get(key) else {
            return Ok(None);
        };
        let open: Vec<usize> = chain
            .iter()
            .enumerate()
            .filter(|(_, row)| row.is_open())
            .map(|(i, _)| i)
            .collect();
        match open.len() {
            0 => Ok(None),
            1 => Ok(Some(open[0])),
            n => Err(n),
        }
    }
}

impl MemoryAuditTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }
}

impl AuditTable for MemoryAuditTable {
    fn apply(&self, batch: WriteBatch) -> TableResult<()> {
        let mut state = self.state.write().expect("audit table lock poisoned");

        // Validate the whole batch before mutating anything, walking
        // the ops against a simulated open-row view so that opens the
        // batch itself creates or closes are accounted for regardless
        // of op ordering.
        let mut simulated: BTreeMap<&RowKey, OpenSim> = BTreeMap::new();
        for op in batch.ops() {
            let key = match op {
                RowOp::Insert(row) => row.key(),
                RowOp::CloseOpen { key, .. } => key,
            };
            if !simulated.contains_key(key) {
                let current = match state.open_index(key) {
                    Ok(Some(i)) => OpenSim {
                        count: 1,
                        start: Some(state.chains[key][i].start_revision()),
                    },
                    Ok(None) => OpenSim {
                        count: 0,
                        start: None,
                    },
                    Err(n) => {
                        return Err(TableError::MultipleOpenRows {
                            key: key.clone(),
                            open_rows: n,
                        })
                    }
                };
                simulated.insert(key, current);
            }
            let sim = simulated.get_mut(key).expect("seeded above");

            match op {
                RowOp::Insert(row) => {
                    sim.count += 1;
                    sim.start = if sim.count == 1 {
                        Some(row.start_revision())
                    } else {
                        None
                    };
                }
                RowOp::CloseOpen {
                    key,
                    expected_start,
                    ..
                } => match sim.count {
                    0 => {
                        return Err(TableError::StaleOpenRow {
                            key: key.clone(),
                            expected_start: *expected_start,
                            found_start: None,
                        })
                    }
                    1 => {
                        if sim.start != Some(*expected_start) {
                            return Err(TableError::StaleOpenRow {
                                key: key.clone(),
                                expected_start: *expected_start,
                                found_start: sim.start,
                            });
                        }
                        sim.count = 0;
                        sim.start = None;
                    }
                    n => {
                        return Err(TableError::MultipleOpenRows {
                            key: key.clone(),
                            open_rows: n,
                        })
                    }
                },
            }
        }

        for op in batch.ops() {
            match op {
                RowOp::CloseOpen { key, end, .. } => {
                    // Validated above; the open row still exists.
                    let index = state
                        .open_index(key)
                        .expect("open-row invariant")
                        .expect("validated open row");
                    let chain = state.chains.get_mut(key).expect("validated chain");
                    chain[index].close(*end);
                }
                RowOp::Insert(row) => {
                    let chain = state.chains.entry(row.key().clone()).or_default();
                    // Chains stay sorted by start revision; inserts
                    // are monotone in normal operation.
                    let at = chain
                        .iter()
                        .position(|r| r.start_revision() > row.start_revision())
                        .unwrap_or(chain.len());
                    chain.insert(at, row.clone());
                }
            }
        }

        Ok(())
    }

    fn rows_for_key(&self, key: &RowKey) -> TableResult<Vec<AuditRow>> {
        let state = self.state.read().expect("audit table lock poisoned");
        Ok(state.chains.get(key).cloned().unwrap_or_default())
    }

    fn open_row(&self, key: &RowKey) -> TableResult<Option<AuditRow>> {
        let state = self.state.read().expect("audit table lock poisoned");
        match state.open_index(key) {
            Ok(index) => Ok(index.map(|i| state.chains[key][i].clone())),
            Err(n) => Err(TableError::MultipleOpenRows {
                key: key.clone(),
                open_rows: n,
            }),
        }
    }

    fn element_keys(&self, owner: &OwnerKey, attribute: &str) -> TableResult<Vec<ElementKey>> {
        let state = self.state.read().expect("audit table lock poisoned");
        let keys = state
            .chains
            .keys()
            .filter(|key| {
                key.owner() == owner
                    && key.attribute() == &AttributePath::Collection(attribute.to_string())
            })
            .filter_map(|key| key.element_key().cloned())
            .collect();
        Ok(keys)
    }

    fn row_count(&self) -> TableResult<usize> {
        let state = self.state.read().expect("audit table lock poisoned");
        Ok(state.chains.values().map(Vec::len).sum())
    }
}
