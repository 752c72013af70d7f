//! Collision-safe mapping moves for renumbered line items.
//!
//! A shift can move line 2 to 3 and line 3 to 4 in the same batch, so a key
//! may be both a source and a destination. Entries are captured up front, all
//! sources are cleared, and only then are destinations written.

use serde::{Deserialize, Serialize};

use super::{FieldMappingEntry, FieldMappingTable};
use crate::document::{FieldKey, KeyRemap};

/// A single mapping table edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum MappingOperation {
    /// Remove the entry for `key`.
    Clear { key: FieldKey },
    /// Write `entry` under `key`.
    Set {
        key: FieldKey,
        entry: FieldMappingEntry,
    },
}

impl MappingOperation {
    /// The key this operation touches.
    pub fn key(&self) -> &FieldKey {
        match self {
            MappingOperation::Clear { key } => key,
            MappingOperation::Set { key, .. } => key,
        }
    }

    /// Apply to a table in place.
    pub fn apply(&self, table: &mut FieldMappingTable) {
        match self {
            MappingOperation::Clear { key } => {
                table.remove(key);
            }
            MappingOperation::Set { key, entry } => {
                table.insert(key.clone(), entry.clone());
            }
        }
    }
}

/// Turn key renames into clear-then-set operations against `table`.
///
/// Pairs whose source key is unmapped produce nothing.
pub fn remap_for_shift(table: &FieldMappingTable, pairs: &[KeyRemap]) -> Vec<MappingOperation> {
    let captured: Vec<(&KeyRemap, FieldMappingEntry)> = pairs
        .iter()
        .filter_map(|pair| table.get(&pair.old_key).map(|e| (pair, e.clone())))
        .collect();

    let clears = captured.iter().map(|(pair, _)| MappingOperation::Clear {
        key: pair.old_key.clone(),
    });
    let sets = captured.iter().map(|(pair, entry)| MappingOperation::Set {
        key: pair.new_key.clone(),
        entry: entry.clone(),
    });

    clears.chain(sets).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{LineItemColumn, encode_line_item_key};
    use crate::mapping::GeometryContext;
    use pretty_assertions::assert_eq;

    fn entry(ids: &[&str]) -> FieldMappingEntry {
        FieldMappingEntry::new(
            ids.iter().map(|s| s.to_string()).collect(),
            &GeometryContext::default(),
        )
    }

    fn remap(old: (u32, LineItemColumn), new: (u32, LineItemColumn)) -> KeyRemap {
        KeyRemap {
            old_key: encode_line_item_key(old.0, old.1),
            new_key: encode_line_item_key(new.0, new.1),
        }
    }

    #[test]
    fn test_shift_chain_clears_before_sets() {
        use LineItemColumn::{Description, Sku};

        let mut table: FieldMappingTable = [
            (encode_line_item_key(2, Sku), entry(&["a"])),
            (encode_line_item_key(2, Description), entry(&["b"])),
            (encode_line_item_key(3, Sku), entry(&["c"])),
        ]
        .into_iter()
        .collect();

        let pairs = vec![
            remap((2, Sku), (3, Sku)),
            remap((2, Description), (3, Description)),
            remap((3, Sku), (4, Sku)),
        ];

        let ops = remap_for_shift(&table, &pairs);
        assert_eq!(ops.len(), 6);
        let first_set = ops
            .iter()
            .position(|op| matches!(op, MappingOperation::Set { .. }))
            .unwrap();
        assert_eq!(first_set, 3);
        assert!(
            ops[..3]
                .iter()
                .all(|op| matches!(op, MappingOperation::Clear { .. }))
        );

        for op in &ops {
            op.apply(&mut table);
        }

        let keys: Vec<&str> = table.keys().map(|k| k.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "line_items.3.description",
                "line_items.3.sku",
                "line_items.4.sku",
            ]
        );
        assert_eq!(table.get(&encode_line_item_key(3, Sku)), Some(&entry(&["a"])));
        assert_eq!(
            table.get(&encode_line_item_key(3, Description)),
            Some(&entry(&["b"]))
        );
        assert_eq!(table.get(&encode_line_item_key(4, Sku)), Some(&entry(&["c"])));
    }

    #[test]
    fn test_pair_order_does_not_matter() {
        use LineItemColumn::Sku;

        let table: FieldMappingTable = [
            (encode_line_item_key(1, Sku), entry(&["x"])),
            (encode_line_item_key(2, Sku), entry(&["y"])),
        ]
        .into_iter()
        .collect();

        // Reversed chain: 2 -> 3 listed after 1 -> 2.
        let pairs = vec![remap((1, Sku), (2, Sku)), remap((2, Sku), (3, Sku))];
        let mut forward = table.clone();
        for op in remap_for_shift(&table, &pairs) {
            op.apply(&mut forward);
        }

        let reversed: Vec<KeyRemap> = pairs.iter().rev().cloned().collect();
        let mut backward = table.clone();
        for op in remap_for_shift(&table, &reversed) {
            op.apply(&mut backward);
        }

        assert_eq!(forward, backward);
        assert_eq!(forward.get(&encode_line_item_key(2, Sku)), Some(&entry(&["x"])));
        assert_eq!(forward.get(&encode_line_item_key(3, Sku)), Some(&entry(&["y"])));
        assert!(!forward.contains(&encode_line_item_key(1, Sku)));
    }

    #[test]
    fn test_unmapped_sources_emit_nothing() {
        let ops = remap_for_shift(
            &FieldMappingTable::new(),
            &[remap((1, LineItemColumn::Unit), (2, LineItemColumn::Unit))],
        );
        assert!(ops.is_empty());
    }
}
