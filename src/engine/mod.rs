//! Audit Engine - unit-of-work orchestration
//!
//! Control flow on commit:
//! 1. resolve metadata for every recorded snapshot (nothing is written
//!    if any snapshot refers to unconfigured metadata)
//! 2. collect facts (entity diffs, collection symmetric differences)
//! 3. a unit-of-work with zero facts is a no-op: no revision, no rows
//! 4. allocate the revision
//! 5. plan every fact through the active strategy and apply the whole
//!    revision as one atomic batch
//! 6. on failure after allocation, abort the pending revision -
//!    all-or-nothing per revision
//! 7. on success, commit the revision with its wall-clock timestamp
//!
//! Commits are serialized by the engine; reads go through
//! `HistoricalReader` and never block writers.

mod unit_of_work;

pub use unit_of_work::UnitOfWork;

use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::Utc;

use crate::change::{AuditFact, ChangeCollector, ElementKey};
use crate::errors::{AuditError, AuditResult};
use crate::metadata::AuditConfig;
use crate::observability::{Logger, Severity};
use crate::reader::{CollectionState, HistoricalReader, RestoredEntity};
use crate::revision::{Revision, RevisionId, RevisionSequencer};
use crate::store::{AuditTable, MemoryAuditTable, RowOp, WriteBatch};
use crate::strategy::AuditStrategy;

/// The revision auditing engine.
///
/// Owns the sequencer, the active strategy, and the audit table;
/// invoked by the persistence layer once per committing unit-of-work.
pub struct AuditEngine {
    config: AuditConfig,
    sequencer: Mutex<RevisionSequencer>,
    strategy: Box<dyn AuditStrategy>,
    table: Box<dyn AuditTable>,
}

impl AuditEngine {
    /// Creates an engine over an in-memory audit table.
    ///
    /// The configuration is validated here; a malformed configuration
    /// never reaches commit time.
    pub fn new(config: AuditConfig) -> AuditResult<Self> {
        Self::with_table(config, Box::new(MemoryAuditTable::new()))
    }

    /// Creates an engine over a caller-supplied audit table.
    pub fn with_table(config: AuditConfig, table: Box<dyn AuditTable>) -> AuditResult<Self> {
        config.validate()?;
        let strategy = config.strategy().strategy();
        Ok(Self {
            config,
            sequencer: Mutex::new(RevisionSequencer::new()),
            strategy,
            table,
        })
    }

    /// Starts an empty unit-of-work.
    pub fn begin(&self) -> UnitOfWork {
        UnitOfWork::new()
    }

    /// Commits a unit-of-work.
    ///
    /// Returns the committed revision, or None if the unit-of-work
    /// produced no facts (no-op suppression: no revision is allocated
    /// and no rows are written).
    pub fn commit(&self, uow: UnitOfWork) -> AuditResult<Option<Revision>> {
        let uow_id = uow.id().to_string();
        let facts = self.collect_facts(&uow)?;

        if facts.is_empty() {
            Logger::log(Severity::Info, "unit_of_work_noop", &[("uow", &uow_id)]);
            return Ok(None);
        }

        let mut sequencer = self.sequencer.lock().expect("sequencer lock poisoned");
        let revision_id = sequencer.begin();

        match self.apply_facts(&facts, revision_id) {
            Ok(()) => {
                let revision = sequencer.mark_committed(revision_id, Utc::now())?;
                Logger::log(
                    Severity::Info,
                    "revision_committed",
                    &[
                        ("uow", &uow_id),
                        ("revision", &revision_id.to_string()),
                        ("facts", &facts.len().to_string()),
                    ],
                );
                Ok(Some(revision))
            }
            Err(err) => {
                // All-or-nothing per revision: the batch did not land,
                // so retiring the pending allocation erases the
                // revision entirely. An abort failure must not mask
                // the root cause, so it is logged and swallowed.
                if let Err(abort_err) = sequencer.abort(revision_id) {
                    Logger::log_stderr(
                        Severity::Error,
                        "revision_abort_failed",
                        &[
                            ("revision", &revision_id.to_string()),
                            ("reason", &abort_err.to_string()),
                        ],
                    );
                }
                let severity = if err.is_fatal() {
                    Severity::Fatal
                } else {
                    Severity::Error
                };
                Logger::log_stderr(
                    severity,
                    "revision_aborted",
                    &[
                        ("uow", &uow_id),
                        ("revision", &revision_id.to_string()),
                        ("reason", &err.to_string()),
                    ],
                );
                Err(err)
            }
        }
    }

    /// Returns a stateless reader over this engine's history.
    pub fn reader(&self) -> HistoricalReader<'_> {
        HistoricalReader::new(&self.config, self.strategy.as_ref(), self.table.as_ref())
    }

    /// Reconstructs the full logical state of an entity at a revision.
    pub fn state_at(
        &self,
        entity: &str,
        id: &str,
        revision: RevisionId,
    ) -> AuditResult<Option<RestoredEntity>> {
        self.reader().state_at(entity, id, revision)
    }

    /// Reconstructs one collection attribute of an entity at a
    /// revision.
    pub fn collection_at(
        &self,
        entity: &str,
        id: &str,
        attribute: &str,
        revision: RevisionId,
    ) -> AuditResult<CollectionState> {
        let owner = crate::change::OwnerKey::new(entity, id);
        self.reader().find_collection_at(&owner, attribute, revision)
    }

    /// Returns the ordered change history of an entity.
    pub fn history(&self, entity: &str, id: &str) -> AuditResult<Vec<(RevisionId, RestoredEntity)>> {
        self.reader().history(entity, id)
    }

    /// Returns every revision that touched an entity, deletions
    /// included.
    pub fn revisions_of(&self, entity: &str, id: &str) -> AuditResult<Vec<RevisionId>> {
        self.reader().revisions_of(entity, id)
    }

    /// Looks up a committed revision's metadata.
    pub fn revision(&self, id: RevisionId) -> Option<Revision> {
        let sequencer = self.sequencer.lock().expect("sequencer lock poisoned");
        sequencer.revision(id).cloned()
    }

    /// Returns all committed revisions in order.
    pub fn revisions(&self) -> Vec<Revision> {
        let sequencer = self.sequencer.lock().expect("sequencer lock poisoned");
        sequencer.revisions()
    }

    /// Returns the audit table, for inspection.
    pub fn table(&self) -> &dyn AuditTable {
        self.table.as_ref()
    }

    /// Collects every fact of the unit-of-work, validating metadata
    /// first. Fails before anything is written.
    fn collect_facts(&self, uow: &UnitOfWork) -> AuditResult<Vec<AuditFact>> {
        let mut facts = Vec::new();

        for snapshot in uow.entities() {
            let owner = snapshot.owner();
            if !self.config.is_audited(owner.entity()) {
                return Err(AuditError::UnknownEntity(owner.entity().to_string()));
            }
            if let Some(fact) = ChangeCollector::entity_change(
                owner,
                snapshot.before(),
                snapshot.after(),
            ) {
                facts.push(fact);
            }
        }

        for snapshot in uow.keyed_collections() {
            let owner = snapshot.owner();
            self.require_collection(owner.entity(), snapshot.attribute())?;
            let before = Self::to_element_keys(snapshot.before());
            let after = Self::to_element_keys(snapshot.after());
            facts.extend(ChangeCollector::collection_change(
                owner,
                snapshot.attribute(),
                &before,
                &after,
            ));
        }

        for snapshot in uow.element_collections() {
            let owner = snapshot.owner();
            let rule = self.require_collection(owner.entity(), snapshot.attribute())?;
            let before =
                ChangeCollector::project_elements(rule, snapshot.attribute(), snapshot.before())?;
            let after =
                ChangeCollector::project_elements(rule, snapshot.attribute(), snapshot.after())?;
            facts.extend(ChangeCollector::collection_change(
                owner,
                snapshot.attribute(),
                &before,
                &after,
            ));
        }

        // A chain can take exactly one change per revision; a second
        // fact for the same key means the unit-of-work recorded the
        // same entity or attribute twice.
        let mut seen = std::collections::BTreeSet::new();
        for fact in &facts {
            if !seen.insert(fact.key()) {
                return Err(AuditError::ConflictingSnapshots {
                    key: fact.key().clone(),
                });
            }
        }

        Ok(facts)
    }

    /// Plans all facts and applies them as one atomic batch.
    fn apply_facts(&self, facts: &[AuditFact], revision: RevisionId) -> AuditResult<()> {
        let mut ops: Vec<RowOp> = Vec::new();
        for fact in facts {
            ops.extend(self.strategy.plan_write(self.table.as_ref(), fact, revision)?);
        }
        self.table.apply(WriteBatch::new(revision, ops))?;
        Ok(())
    }

    fn require_collection(
        &self,
        entity: &str,
        attribute: &str,
    ) -> AuditResult<&crate::metadata::KeyRule> {
        if !self.config.is_audited(entity) {
            return Err(AuditError::UnknownEntity(entity.to_string()));
        }
        self.config
            .collection_rule(entity, attribute)
            .ok_or_else(|| AuditError::UnknownAttribute {
                entity: entity.to_string(),
                attribute: attribute.to_string(),
            })
    }

    fn to_element_keys(entries: &BTreeMap<String, serde_json::Value>) -> BTreeMap<ElementKey, serde_json::Value> {
        entries
            .iter()
            .map(|(k, v)| (ElementKey::new(k.clone()), v.clone()))
            .collect()
    }
}
