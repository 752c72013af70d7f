//! Serializable store transitions, for edit scripts and foreign callers.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{FieldUpdate, TransactionReport, TransactionStore};
use crate::document::{FieldKey, StructuredDocument};
use crate::mapping::FieldMappingTable;
use crate::models::fragment::{FragmentId, SourceFragment};

/// One store transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StoreAction {
    /// Set or clear a single mapping.
    UpdateField {
        key: FieldKey,
        #[serde(default)]
        source_ids: Option<Vec<FragmentId>>,
    },
    /// Several mapping updates as one step.
    Batch { updates: Vec<FieldUpdate> },
    /// Mapping updates plus a replacement document.
    Transaction {
        #[serde(default)]
        field_updates: Vec<FieldUpdate>,
        document: StructuredDocument,
    },
    /// Swap the whole mapping table.
    ReplaceAll { table: FieldMappingTable },
    Undo,
    Redo,
    /// Swap the fragment list used for cached geometry.
    RecomputeGeometry { fragments: Vec<SourceFragment> },
    RemoveLine { line_number: u32 },
    InsertLineAfter { line_number: u32 },
    AddLine {
        #[serde(default)]
        line_number: Option<u32>,
    },
    LinkFragments {
        key: FieldKey,
        source_ids: Vec<FragmentId>,
    },
    SetValue {
        key: FieldKey,
        #[serde(default)]
        value: Option<String>,
    },
}

impl StoreAction {
    /// Short name, as it appears in the `action` tag.
    pub fn name(&self) -> &'static str {
        match self {
            StoreAction::UpdateField { .. } => "update_field",
            StoreAction::Batch { .. } => "batch",
            StoreAction::Transaction { .. } => "transaction",
            StoreAction::ReplaceAll { .. } => "replace_all",
            StoreAction::Undo => "undo",
            StoreAction::Redo => "redo",
            StoreAction::RecomputeGeometry { .. } => "recompute_geometry",
            StoreAction::RemoveLine { .. } => "remove_line",
            StoreAction::InsertLineAfter { .. } => "insert_line_after",
            StoreAction::AddLine { .. } => "add_line",
            StoreAction::LinkFragments { .. } => "link_fragments",
            StoreAction::SetValue { .. } => "set_value",
        }
    }
}

impl TransactionStore {
    /// Run one action. `changed` reports whether the state moved.
    pub fn dispatch(&mut self, action: StoreAction) -> TransactionReport {
        debug!("Dispatching {}", action.name());

        match action {
            StoreAction::UpdateField { key, source_ids } => {
                TransactionReport::moved(self.apply_field_update(key, source_ids))
            }
            StoreAction::Batch { updates } => TransactionReport::moved(self.apply_batch(updates)),
            StoreAction::Transaction {
                field_updates,
                document,
            } => self.apply_transaction(field_updates, document),
            StoreAction::ReplaceAll { table } => self.replace_all(table),
            StoreAction::Undo => TransactionReport::moved(self.undo()),
            StoreAction::Redo => TransactionReport::moved(self.redo()),
            StoreAction::RecomputeGeometry { fragments } => {
                self.recompute_geometry(&fragments);
                TransactionReport::moved(false)
            }
            StoreAction::RemoveLine { line_number } => self.remove_line_item(line_number),
            StoreAction::InsertLineAfter { line_number } => self.insert_line_after(line_number),
            StoreAction::AddLine { line_number } => self.add_line_item(line_number),
            StoreAction::LinkFragments { key, source_ids } => self.link_fragments(key, source_ids),
            StoreAction::SetValue { key, value } => self.set_field_value(&key, value),
        }
    }
}
