//! User gestures, each applied as a single transaction.

use tracing::{debug, warn};

use super::{FieldUpdate, TransactionReport, TransactionStore};
use crate::document::lines;
use crate::document::FieldKey;
use crate::mapping::remap_for_shift;
use crate::models::fragment::FragmentId;
use crate::rules::ExtractionOutcome;

impl TransactionStore {
    /// Delete a line item and renumber the lines after it, carrying their mappings along.
    pub fn remove_line_item(&mut self, line_number: u32) -> TransactionReport {
        let outcome = lines::remove(self.structured_document(), line_number);
        if outcome.removed_keys.is_empty() {
            debug!("Line {} does not exist, nothing removed", line_number);
            return TransactionReport::default();
        }

        let mut updates: Vec<FieldUpdate> = outcome
            .removed_keys
            .into_iter()
            .map(FieldUpdate::clear)
            .collect();
        updates.extend(
            remap_for_shift(self.field_mapping_table(), &outcome.remapped_keys)
                .into_iter()
                .map(FieldUpdate::from),
        );

        self.apply_transaction(updates, outcome.document)
    }

    /// Insert a blank line after `after_line_number` (0 = at the top).
    pub fn insert_line_after(&mut self, after_line_number: u32) -> TransactionReport {
        let outcome = lines::insert_after(self.structured_document(), after_line_number);
        if outcome.new_line_number.is_none() {
            debug!("Line {} does not exist, nothing inserted", after_line_number);
            return TransactionReport::default();
        }

        let updates = remap_for_shift(self.field_mapping_table(), &outcome.remapped_keys)
            .into_iter()
            .map(FieldUpdate::from)
            .collect();

        self.apply_transaction(updates, outcome.document)
    }

    /// Append a blank line, at `line_number` when given.
    pub fn add_line_item(&mut self, line_number: Option<u32>) -> TransactionReport {
        let document = lines::add_blank(self.structured_document(), line_number);
        self.apply_transaction(Vec::new(), document)
    }

    /// Point a field at a new set of fragments, creating its line if needed.
    pub fn link_fragments(&mut self, key: FieldKey, source_ids: Vec<FragmentId>) -> TransactionReport {
        let document = match key.line_item_ref() {
            Some(k) => lines::ensure_exists(self.structured_document(), k.line_number),
            None => self.structured_document().clone(),
        };
        self.apply_transaction(vec![FieldUpdate::set(key, source_ids)], document)
    }

    /// Edit the value behind a field without touching its mapping.
    pub fn set_field_value(&mut self, key: &FieldKey, value: Option<String>) -> TransactionReport {
        let mut document = match key.line_item_ref() {
            Some(k) => lines::ensure_exists(self.structured_document(), k.line_number),
            None => self.structured_document().clone(),
        };
        document.set_value(key, value);
        self.apply_transaction(Vec::new(), document)
    }

    /// Write every extracted value into the document and link it to its fragments.
    ///
    /// Field ids that are not valid keys are skipped.
    pub fn apply_extraction(&mut self, outcome: &ExtractionOutcome) -> TransactionReport {
        let mut document = self.structured_document().clone();
        let mut updates = Vec::new();

        for extraction in &outcome.extractions {
            let key = match FieldKey::parse(&extraction.field_id) {
                Ok(key) => key,
                Err(e) => {
                    warn!("Skipping extraction for {:?}: {}", extraction.field_id, e);
                    continue;
                }
            };

            if let Some(k) = key.line_item_ref() {
                document = lines::ensure_exists(&document, k.line_number);
            }
            document.set_value(&key, Some(extraction.value.clone()));
            updates.push(FieldUpdate::set(key, extraction.source_fragment_ids()));
        }

        debug!("Applying {} extracted fields", updates.len());
        self.apply_transaction(updates, document)
    }
}
