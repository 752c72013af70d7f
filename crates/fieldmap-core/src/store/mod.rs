//! Transactional state for one mapping session.
//!
//! The store owns the field mapping table and the structured document. Every
//! change goes through a transition that snapshots the previous state, so a
//! whole user gesture can be undone in one step.

pub mod action;
pub mod edits;
pub mod history;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::document::lines::check_invariants;
use crate::document::{FieldKey, InvariantIssue, StructuredDocument};
use crate::mapping::{FieldMappingEntry, FieldMappingTable, GeometryContext, MappingOperation};
use crate::models::config::StoreConfig;
use crate::models::fragment::{FragmentId, SourceFragment};

pub use action::StoreAction;
pub use history::{History, TransactionSnapshot};

/// Link (or unlink) one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldUpdate {
    pub key: FieldKey,
    /// `None` or an empty list clears the mapping.
    #[serde(default)]
    pub source_ids: Option<Vec<FragmentId>>,
}

impl FieldUpdate {
    /// Map `key` to the given fragments.
    pub fn set(key: FieldKey, source_ids: Vec<FragmentId>) -> Self {
        Self {
            key,
            source_ids: Some(source_ids),
        }
    }

    /// Unmap `key`.
    pub fn clear(key: FieldKey) -> Self {
        Self {
            key,
            source_ids: None,
        }
    }
}

impl From<MappingOperation> for FieldUpdate {
    fn from(op: MappingOperation) -> Self {
        match op {
            MappingOperation::Clear { key } => FieldUpdate::clear(key),
            MappingOperation::Set { key, entry } => FieldUpdate::set(key, entry.source_ids),
        }
    }
}

/// What a transition did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReport {
    /// Whether the state moved (and, for edits, a history step was recorded).
    pub changed: bool,
    /// Line-item keys dropped because their line no longer exists.
    pub purged_keys: Vec<FieldKey>,
    /// Consistency problems found after the transition.
    pub issues: Vec<InvariantIssue>,
}

impl TransactionReport {
    fn moved(changed: bool) -> Self {
        Self {
            changed,
            ..Self::default()
        }
    }
}

/// Mapping table and document with undo/redo.
#[derive(Debug, Clone, Default)]
pub struct TransactionStore {
    table: FieldMappingTable,
    document: StructuredDocument,
    history: History,
    geometry: GeometryContext,
    config: StoreConfig,
}

impl TransactionStore {
    /// Create an empty store with default settings.
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    /// Create an empty store.
    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            history: History::with_limit(config.history_limit),
            config,
            ..Self::default()
        }
    }

    /// Set the fragment list geometry is resolved against.
    pub fn with_fragments(mut self, fragments: &[SourceFragment]) -> Self {
        self.geometry = GeometryContext::new(fragments);
        self
    }

    /// Start from an existing document. History is not touched.
    pub fn with_document(mut self, document: StructuredDocument) -> Self {
        self.document = document;
        self
    }

    pub fn field_mapping_table(&self) -> &FieldMappingTable {
        &self.table
    }

    pub fn structured_document(&self) -> &StructuredDocument {
        &self.document
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Fragment id → keys of the fields referencing it.
    pub fn reverse_index(&self) -> BTreeMap<FragmentId, Vec<FieldKey>> {
        self.table.reverse_index()
    }

    /// Current state as a snapshot.
    pub fn snapshot(&self) -> TransactionSnapshot {
        TransactionSnapshot {
            field_mapping_table: self.table.clone(),
            structured_document: self.document.clone(),
        }
    }

    /// Set or clear one mapping. Returns whether the table changed.
    pub fn apply_field_update(&mut self, key: FieldKey, source_ids: Option<Vec<FragmentId>>) -> bool {
        self.apply_batch(vec![FieldUpdate { key, source_ids }])
    }

    /// Apply several updates as one undo step. Returns whether the table changed.
    ///
    /// Line-item keys whose line is missing from the current document are dropped.
    pub fn apply_batch(&mut self, updates: Vec<FieldUpdate>) -> bool {
        let mut table = self.table.clone();
        for update in &updates {
            apply_update(&mut table, update, &self.geometry);
        }
        let purged_keys = purge_orphans(&mut table, &self.document);
        for key in &purged_keys {
            warn!("Dropping update for {}: line does not exist", key);
        }

        if table == self.table {
            debug!("Batch of {} updates left the table unchanged", updates.len());
            return false;
        }

        self.history.record(self.snapshot());
        self.table = table;
        debug!("Applied batch of {} updates", updates.len());
        true
    }

    /// Apply mapping updates and swap in a new document as one undo step.
    ///
    /// Line-item keys whose line is missing from `document` are purged.
    pub fn apply_transaction(
        &mut self,
        field_updates: Vec<FieldUpdate>,
        document: StructuredDocument,
    ) -> TransactionReport {
        let mut table = self.table.clone();
        for update in &field_updates {
            apply_update(&mut table, update, &self.geometry);
        }
        let purged_keys = purge_orphans(&mut table, &document);

        if table == self.table && document == self.document {
            debug!("Transaction left state unchanged");
            return TransactionReport::moved(false);
        }

        self.history.record(self.snapshot());
        self.table = table;
        self.document = document;

        debug!(
            "Applied transaction: {} updates, {} keys purged",
            field_updates.len(),
            purged_keys.len()
        );

        TransactionReport {
            changed: true,
            purged_keys,
            issues: self.diagnose(),
        }
    }

    /// Replace the whole table as one undo step.
    pub fn replace_all(&mut self, mut table: FieldMappingTable) -> TransactionReport {
        table.refresh_geometry(&self.geometry);
        let purged_keys = purge_orphans(&mut table, &self.document);

        if table == self.table {
            return TransactionReport::moved(false);
        }

        self.history.record(self.snapshot());
        self.table = table;
        debug!("Replaced mapping table ({} entries)", self.table.len());

        TransactionReport {
            changed: true,
            purged_keys,
            issues: self.diagnose(),
        }
    }

    /// Step back one transition. Returns whether anything moved.
    pub fn undo(&mut self) -> bool {
        let current = self.snapshot();
        match self.history.undo(current) {
            Some(previous) => {
                self.restore(previous);
                debug!("Undo ({} steps left)", self.history.undo_depth());
                true
            }
            None => false,
        }
    }

    /// Step forward one transition. Returns whether anything moved.
    pub fn redo(&mut self) -> bool {
        let current = self.snapshot();
        match self.history.redo(current) {
            Some(next) => {
                self.restore(next);
                debug!("Redo ({} steps left)", self.history.redo_depth());
                true
            }
            None => false,
        }
    }

    /// Swap the fragment list and refresh every cached geometry. Not recorded in history.
    pub fn recompute_geometry(&mut self, fragments: &[SourceFragment]) {
        self.geometry = GeometryContext::new(fragments);
        self.table.refresh_geometry(&self.geometry);
        debug!("Recomputed geometry against {} fragments", self.geometry.len());
    }

    /// Drop all state and history.
    pub fn reset(&mut self) {
        self.table = FieldMappingTable::new();
        self.document = StructuredDocument::new();
        self.history.clear();
    }

    fn restore(&mut self, snapshot: TransactionSnapshot) {
        self.table = snapshot.field_mapping_table;
        self.table.refresh_geometry(&self.geometry);
        self.document = snapshot.structured_document;
    }

    fn diagnose(&self) -> Vec<InvariantIssue> {
        if !self.config.check_invariants {
            return Vec::new();
        }

        let issues = check_invariants(&self.document, self.table.keys());
        for issue in &issues {
            warn!("Invariant violation: {}", issue);
        }
        issues
    }
}

fn apply_update(table: &mut FieldMappingTable, update: &FieldUpdate, context: &GeometryContext) {
    match update.source_ids.as_deref() {
        Some(ids) if !ids.is_empty() => {
            table.insert(update.key.clone(), FieldMappingEntry::new(ids.to_vec(), context));
        }
        _ => {
            table.remove(&update.key);
        }
    }
}

fn purge_orphans(table: &mut FieldMappingTable, document: &StructuredDocument) -> Vec<FieldKey> {
    let purged = table.retain_keys(|key| {
        key.line_item_ref()
            .is_none_or(|k| document.has_line(k.line_number))
    });
    if !purged.is_empty() {
        debug!("Purged {} orphaned keys", purged.len());
    }
    purged
}
