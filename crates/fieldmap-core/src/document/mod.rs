//! Structured document model: header scalars plus numbered line items.

pub mod key;
pub mod lines;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use key::{FieldKey, LineItemKey, decode_line_item_key, encode_line_item_key, is_line_item_key};
pub use lines::{InsertOutcome, InvariantIssue, KeyRemap, RemoveOutcome};

/// Line item columns, in their fixed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineItemColumn {
    Sku,
    Description,
    Quantity,
    Unit,
    UnitPrice,
    Amount,
}

impl LineItemColumn {
    /// All columns in their fixed order.
    pub const ALL: [LineItemColumn; 6] = [
        LineItemColumn::Sku,
        LineItemColumn::Description,
        LineItemColumn::Quantity,
        LineItemColumn::Unit,
        LineItemColumn::UnitPrice,
        LineItemColumn::Amount,
    ];

    /// Column name as used in field keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            LineItemColumn::Sku => "sku",
            LineItemColumn::Description => "description",
            LineItemColumn::Quantity => "quantity",
            LineItemColumn::Unit => "unit",
            LineItemColumn::UnitPrice => "unit_price",
            LineItemColumn::Amount => "amount",
        }
    }

    /// Parse a column name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }
}

impl fmt::Display for LineItemColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single line item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Position in the item list (1-based).
    pub line_number: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
}

impl LineItem {
    /// Create an item with no column values.
    pub fn blank(line_number: u32) -> Self {
        Self {
            line_number,
            ..Self::default()
        }
    }

    /// Get a column value.
    pub fn get(&self, column: LineItemColumn) -> Option<&str> {
        self.slot(column).as_deref()
    }

    /// Set or clear a column value.
    pub fn set(&mut self, column: LineItemColumn, value: Option<String>) {
        *self.slot_mut(column) = value;
    }

    /// Builder-style column setter.
    pub fn with(mut self, column: LineItemColumn, value: impl Into<String>) -> Self {
        self.set(column, Some(value.into()));
        self
    }

    fn slot(&self, column: LineItemColumn) -> &Option<String> {
        match column {
            LineItemColumn::Sku => &self.sku,
            LineItemColumn::Description => &self.description,
            LineItemColumn::Quantity => &self.quantity,
            LineItemColumn::Unit => &self.unit,
            LineItemColumn::UnitPrice => &self.unit_price,
            LineItemColumn::Amount => &self.amount,
        }
    }

    fn slot_mut(&mut self, column: LineItemColumn) -> &mut Option<String> {
        match column {
            LineItemColumn::Sku => &mut self.sku,
            LineItemColumn::Description => &mut self.description,
            LineItemColumn::Quantity => &mut self.quantity,
            LineItemColumn::Unit => &mut self.unit,
            LineItemColumn::UnitPrice => &mut self.unit_price,
            LineItemColumn::Amount => &mut self.amount,
        }
    }
}

/// The normalized record being produced and edited.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredDocument {
    /// Header scalars keyed by field name.
    #[serde(default)]
    pub header: BTreeMap<String, String>,

    /// Line items, kept sorted by line number.
    #[serde(default)]
    pub line_items: Vec<LineItem>,
}

impl StructuredDocument {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style header setter.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.header.insert(name.into(), value.into());
        self
    }

    /// Builder-style line item append.
    pub fn with_line(mut self, item: LineItem) -> Self {
        self.line_items.push(item);
        self
    }

    /// Line numbers in list order.
    pub fn line_numbers(&self) -> Vec<u32> {
        self.line_items.iter().map(|i| i.line_number).collect()
    }

    /// Check if a line number exists.
    pub fn has_line(&self, line_number: u32) -> bool {
        self.line_items.iter().any(|i| i.line_number == line_number)
    }

    /// Get a line item by number.
    pub fn line(&self, line_number: u32) -> Option<&LineItem> {
        self.line_items.iter().find(|i| i.line_number == line_number)
    }

    /// Get a mutable line item by number.
    pub fn line_mut(&mut self, line_number: u32) -> Option<&mut LineItem> {
        self.line_items
            .iter_mut()
            .find(|i| i.line_number == line_number)
    }

    /// Read the value behind a field key.
    pub fn value(&self, key: &FieldKey) -> Option<&str> {
        match key.line_item_ref() {
            Some(k) => self.line(k.line_number).and_then(|i| i.get(k.column)),
            None => self.header.get(key.as_str()).map(String::as_str),
        }
    }

    /// Write the value behind a field key.
    ///
    /// Line-item writes to a missing line are ignored; callers create the line first.
    pub fn set_value(&mut self, key: &FieldKey, value: Option<String>) {
        match key.line_item_ref() {
            Some(k) => {
                if let Some(item) = self.line_mut(k.line_number) {
                    item.set(k.column, value);
                }
            }
            None => match value {
                Some(v) => {
                    self.header.insert(key.as_str().to_string(), v);
                }
                None => {
                    self.header.remove(key.as_str());
                }
            },
        }
    }

    pub(crate) fn sort_lines(&mut self) {
        self.line_items.sort_by_key(|i| i.line_number);
    }
}
