//! Undo/redo history of store snapshots.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::document::StructuredDocument;
use crate::mapping::FieldMappingTable;

/// Point-in-time copy of the store's semantic state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionSnapshot {
    pub field_mapping_table: FieldMappingTable,
    pub structured_document: StructuredDocument,
}

/// Past and future snapshots.
///
/// `past` is oldest first. `future` is nearest first: its front is the state
/// the next redo restores.
#[derive(Debug, Clone, Default)]
pub struct History {
    past: Vec<TransactionSnapshot>,
    future: VecDeque<TransactionSnapshot>,
    limit: usize,
}

impl History {
    /// Create a history capped at `limit` undo steps (0 = unlimited).
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Number of undo steps available.
    pub fn undo_depth(&self) -> usize {
        self.past.len()
    }

    /// Number of redo steps available.
    pub fn redo_depth(&self) -> usize {
        self.future.len()
    }

    /// Record the state before an edit. Clears the redo stack.
    pub fn record(&mut self, before: TransactionSnapshot) {
        self.past.push(before);
        if self.limit > 0 && self.past.len() > self.limit {
            let excess = self.past.len() - self.limit;
            self.past.drain(..excess);
        }
        self.future.clear();
    }

    /// Step back: returns the snapshot to restore, stashing `current` for redo.
    pub fn undo(&mut self, current: TransactionSnapshot) -> Option<TransactionSnapshot> {
        let previous = self.past.pop()?;
        self.future.push_front(current);
        Some(previous)
    }

    /// Step forward: returns the snapshot to restore, stashing `current` for undo.
    pub fn redo(&mut self, current: TransactionSnapshot) -> Option<TransactionSnapshot> {
        let next = self.future.pop_front()?;
        self.past.push(current);
        Some(next)
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(number: &str) -> TransactionSnapshot {
        TransactionSnapshot {
            field_mapping_table: FieldMappingTable::new(),
            structured_document: StructuredDocument::new().with_header("document_number", number),
        }
    }

    #[test]
    fn test_undo_redo_order() {
        let mut history = History::default();
        history.record(snapshot("0"));
        history.record(snapshot("1"));

        // Current state is "2".
        let restored = history.undo(snapshot("2")).unwrap();
        assert_eq!(restored, snapshot("1"));
        let restored = history.undo(restored).unwrap();
        assert_eq!(restored, snapshot("0"));
        assert!(history.undo(snapshot("x")).is_none());

        assert_eq!(history.redo(snapshot("0")), Some(snapshot("1")));
        assert_eq!(history.redo(snapshot("1")), Some(snapshot("2")));
        assert!(!history.can_redo());
    }

    #[test]
    fn test_record_clears_future() {
        let mut history = History::default();
        history.record(snapshot("0"));
        history.undo(snapshot("1"));
        assert!(history.can_redo());

        history.record(snapshot("0"));
        assert!(!history.can_redo());
    }

    #[test]
    fn test_limit_drops_oldest() {
        let mut history = History::with_limit(2);
        for n in 0..5 {
            history.record(snapshot(&n.to_string()));
        }
        assert_eq!(history.undo_depth(), 2);
        assert_eq!(history.undo(snapshot("5")), Some(snapshot("4")));
        assert_eq!(history.undo(snapshot("4")), Some(snapshot("3")));
        assert!(!history.can_undo());
    }
}
