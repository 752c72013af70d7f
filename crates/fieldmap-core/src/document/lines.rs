//! Line item insertion, removal and renumbering.
//!
//! Every function here is pure: it takes a document and returns a new one,
//! together with the key remaps the mapping table needs to follow along.
//! Operations on line numbers that do not exist leave the document unchanged.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::key::{FieldKey, encode_line_item_key};
use super::{LineItem, LineItemColumn, StructuredDocument};

/// One key rename caused by renumbering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRemap {
    pub old_key: FieldKey,
    pub new_key: FieldKey,
}

/// Result of removing a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveOutcome {
    /// Document after removal and compaction.
    pub document: StructuredDocument,
    /// Column keys of the removed line.
    pub removed_keys: Vec<FieldKey>,
    /// Renames for every column of every shifted line.
    pub remapped_keys: Vec<KeyRemap>,
}

/// Result of inserting a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertOutcome {
    /// Document after the insertion.
    pub document: StructuredDocument,
    /// Renames for every column of every shifted line.
    pub remapped_keys: Vec<KeyRemap>,
    /// Number of the inserted line, `None` when nothing was inserted.
    pub new_line_number: Option<u32>,
}

/// A consistency problem between a document and its mapping keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InvariantIssue {
    /// Two or more items share a line number.
    DuplicateLine { line_number: u32 },
    /// A mapping key points at a line that does not exist.
    OrphanField { key: FieldKey },
}

impl fmt::Display for InvariantIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvariantIssue::DuplicateLine { line_number } => {
                write!(f, "duplicate line number {}", line_number)
            }
            InvariantIssue::OrphanField { key } => {
                write!(f, "orphan field {} references a missing line", key)
            }
        }
    }
}

/// First positive line number not yet used.
pub fn next_sequential(doc: &StructuredDocument) -> u32 {
    let used: BTreeSet<u32> = doc.line_items.iter().map(|i| i.line_number).collect();
    let mut candidate = 1;
    for number in used {
        if number > candidate {
            break;
        }
        if number == candidate {
            candidate += 1;
        }
    }
    candidate
}

/// Add an empty line at `line_number`, or at the next sequential number.
///
/// No-op when the target number is already taken.
pub fn add_blank(doc: &StructuredDocument, line_number: Option<u32>) -> StructuredDocument {
    let target = line_number.unwrap_or_else(|| next_sequential(doc));
    let mut next = doc.clone();
    if target == 0 || doc.has_line(target) {
        return next;
    }

    next.line_items.push(LineItem::blank(target));
    next.sort_lines();
    debug!("Added blank line {}", target);
    next
}

/// Add an empty line only if it is missing.
pub fn ensure_exists(doc: &StructuredDocument, line_number: u32) -> StructuredDocument {
    add_blank(doc, Some(line_number))
}

/// Remove a line and close the gap it leaves.
pub fn remove(doc: &StructuredDocument, line_number: u32) -> RemoveOutcome {
    if !doc.has_line(line_number) {
        return RemoveOutcome {
            document: doc.clone(),
            removed_keys: Vec::new(),
            remapped_keys: Vec::new(),
        };
    }

    let removed_keys = column_keys(line_number);
    let remapped_keys = shift_remaps(doc, |n| n > line_number, |n| n - 1);

    let mut next = doc.clone();
    next.line_items.retain(|i| i.line_number != line_number);
    for item in &mut next.line_items {
        if item.line_number > line_number {
            item.line_number -= 1;
        }
    }
    next.sort_lines();

    debug!(
        "Removed line {}, shifted {} keys down",
        line_number,
        remapped_keys.len()
    );

    RemoveOutcome {
        document: next,
        removed_keys,
        remapped_keys,
    }
}

/// Insert an empty line directly after `after_line_number`, shifting later lines up.
///
/// `after_line_number == 0` inserts at the top. No-op when the referenced line is missing
/// or when shifting would push a line number past `u32::MAX`.
pub fn insert_after(doc: &StructuredDocument, after_line_number: u32) -> InsertOutcome {
    let unchanged = || InsertOutcome {
        document: doc.clone(),
        remapped_keys: Vec::new(),
        new_line_number: None,
    };

    if after_line_number != 0 && !doc.has_line(after_line_number) {
        return unchanged();
    }

    let Some(new_line_number) = after_line_number.checked_add(1) else {
        debug!("Cannot insert after line {}: line numbers exhausted", after_line_number);
        return unchanged();
    };
    if doc.has_line(u32::MAX) {
        debug!("Cannot insert after line {}: shift would overflow", after_line_number);
        return unchanged();
    }

    let remapped_keys = shift_remaps(doc, |n| n >= new_line_number, |n| n + 1);

    let mut next = doc.clone();
    for item in &mut next.line_items {
        if item.line_number >= new_line_number {
            item.line_number += 1;
        }
    }
    next.line_items.push(LineItem::blank(new_line_number));
    next.sort_lines();

    debug!(
        "Inserted line {}, shifted {} keys up",
        new_line_number,
        remapped_keys.len()
    );

    InsertOutcome {
        document: next,
        remapped_keys,
        new_line_number: Some(new_line_number),
    }
}

/// Check line numbering and mapping keys against each other.
pub fn check_invariants<'a>(
    doc: &StructuredDocument,
    mapping_keys: impl IntoIterator<Item = &'a FieldKey>,
) -> Vec<InvariantIssue> {
    let mut issues = Vec::new();

    let mut seen = BTreeSet::new();
    let mut duplicates = BTreeSet::new();
    for item in &doc.line_items {
        if !seen.insert(item.line_number) {
            duplicates.insert(item.line_number);
        }
    }
    issues.extend(
        duplicates
            .into_iter()
            .map(|line_number| InvariantIssue::DuplicateLine { line_number }),
    );

    for key in mapping_keys {
        if let Some(line_key) = key.line_item_ref() {
            if !seen.contains(&line_key.line_number) {
                issues.push(InvariantIssue::OrphanField { key: key.clone() });
            }
        }
    }

    issues
}

fn column_keys(line_number: u32) -> Vec<FieldKey> {
    LineItemColumn::ALL
        .into_iter()
        .map(|c| encode_line_item_key(line_number, c))
        .collect()
}

fn shift_remaps(
    doc: &StructuredDocument,
    shifted: impl Fn(u32) -> bool,
    renumber: impl Fn(u32) -> u32,
) -> Vec<KeyRemap> {
    let lines: BTreeSet<u32> = doc
        .line_items
        .iter()
        .map(|i| i.line_number)
        .filter(|n| shifted(*n))
        .collect();

    lines
        .into_iter()
        .flat_map(|old| {
            let new = renumber(old);
            LineItemColumn::ALL.into_iter().map(move |c| KeyRemap {
                old_key: encode_line_item_key(old, c),
                new_key: encode_line_item_key(new, c),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn doc_with_lines(numbers: &[u32]) -> StructuredDocument {
        let mut doc = StructuredDocument::new();
        for n in numbers {
            doc.line_items
                .push(LineItem::blank(*n).with(LineItemColumn::Sku, format!("SKU-{n}")));
        }
        doc
    }

    fn key(line: u32, column: LineItemColumn) -> FieldKey {
        encode_line_item_key(line, column)
    }

    #[test]
    fn test_next_sequential_fills_gaps() {
        assert_eq!(next_sequential(&doc_with_lines(&[])), 1);
        assert_eq!(next_sequential(&doc_with_lines(&[1, 3])), 2);
        assert_eq!(next_sequential(&doc_with_lines(&[1, 2, 3])), 4);
        assert_eq!(next_sequential(&doc_with_lines(&[2, 3])), 1);
    }

    #[test]
    fn test_add_blank() {
        let doc = doc_with_lines(&[1, 3]);
        assert_eq!(add_blank(&doc, None).line_numbers(), vec![1, 2, 3]);
        assert_eq!(add_blank(&doc, Some(5)).line_numbers(), vec![1, 3, 5]);
        assert_eq!(add_blank(&doc, Some(3)), doc);
    }

    #[test]
    fn test_ensure_exists_is_idempotent() {
        let doc = ensure_exists(&doc_with_lines(&[1]), 2);
        assert_eq!(doc.line_numbers(), vec![1, 2]);
        assert_eq!(ensure_exists(&doc, 2), doc);
    }

    #[test]
    fn test_remove_compacts_and_remaps() {
        let outcome = remove(&doc_with_lines(&[1, 2, 3, 4]), 2);

        assert_eq!(outcome.document.line_numbers(), vec![1, 2, 3]);
        assert_eq!(
            outcome.document.line(2).and_then(|i| i.get(LineItemColumn::Sku)),
            Some("SKU-3")
        );
        assert_eq!(outcome.removed_keys.len(), LineItemColumn::ALL.len());
        assert_eq!(outcome.removed_keys[0], key(2, LineItemColumn::Sku));

        // Two shifted lines, every column, ascending by old line.
        assert_eq!(outcome.remapped_keys.len(), 2 * LineItemColumn::ALL.len());
        assert_eq!(
            outcome.remapped_keys[0],
            KeyRemap {
                old_key: key(3, LineItemColumn::Sku),
                new_key: key(2, LineItemColumn::Sku),
            }
        );
        assert_eq!(
            outcome.remapped_keys[1],
            KeyRemap {
                old_key: key(3, LineItemColumn::Description),
                new_key: key(2, LineItemColumn::Description),
            }
        );
        assert_eq!(
            outcome.remapped_keys[LineItemColumn::ALL.len()].old_key,
            key(4, LineItemColumn::Sku)
        );
    }

    #[test]
    fn test_remove_missing_line_is_noop() {
        let doc = doc_with_lines(&[1, 2]);
        let outcome = remove(&doc, 7);
        assert_eq!(outcome.document, doc);
        assert!(outcome.removed_keys.is_empty());
        assert!(outcome.remapped_keys.is_empty());
    }

    #[test]
    fn test_insert_after_shifts_up() {
        let outcome = insert_after(&doc_with_lines(&[1, 2, 3]), 1);

        assert_eq!(outcome.new_line_number, Some(2));
        assert_eq!(outcome.document.line_numbers(), vec![1, 2, 3, 4]);
        assert_eq!(outcome.document.line(2), Some(&LineItem::blank(2)));
        assert_eq!(
            outcome.document.line(3).and_then(|i| i.get(LineItemColumn::Sku)),
            Some("SKU-2")
        );
        assert_eq!(
            outcome.remapped_keys[0],
            KeyRemap {
                old_key: key(2, LineItemColumn::Sku),
                new_key: key(3, LineItemColumn::Sku),
            }
        );
        assert_eq!(outcome.remapped_keys.len(), 2 * LineItemColumn::ALL.len());
    }

    #[test]
    fn test_insert_at_top_and_after_last() {
        let doc = doc_with_lines(&[1]);
        assert_eq!(insert_after(&doc, 0).document.line_numbers(), vec![1, 2]);

        let outcome = insert_after(&doc, 1);
        assert_eq!(outcome.new_line_number, Some(2));
        assert!(outcome.remapped_keys.is_empty());

        let outcome = insert_after(&doc, 5);
        assert_eq!(outcome.new_line_number, None);
        assert_eq!(outcome.document, doc);
    }

    #[test]
    fn test_insert_near_max_line_is_noop() {
        let doc = doc_with_lines(&[1, u32::MAX]);

        let outcome = insert_after(&doc, u32::MAX);
        assert_eq!(outcome.new_line_number, None);
        assert_eq!(outcome.document, doc);

        // Line u32::MAX would have to shift up.
        let outcome = insert_after(&doc, 1);
        assert_eq!(outcome.new_line_number, None);
        assert!(outcome.remapped_keys.is_empty());
        assert_eq!(outcome.document, doc);

        let outcome = insert_after(&doc_with_lines(&[1, u32::MAX - 1]), 1);
        assert_eq!(outcome.new_line_number, Some(2));
        assert_eq!(outcome.document.line_numbers(), vec![1, 2, u32::MAX]);
    }

    #[test]
    fn test_check_invariants() {
        let mut doc = doc_with_lines(&[1, 2]);
        doc.line_items.push(LineItem::blank(2));

        let header = FieldKey::header("document_number").unwrap();
        let ok = key(1, LineItemColumn::Sku);
        let orphan = key(3, LineItemColumn::Amount);

        let issues = check_invariants(&doc, [&header, &ok, &orphan]);
        assert_eq!(
            issues,
            vec![
                InvariantIssue::DuplicateLine { line_number: 2 },
                InvariantIssue::OrphanField { key: orphan },
            ]
        );

        assert!(check_invariants(&doc_with_lines(&[1]), [&header, &ok]).is_empty());
    }
}
