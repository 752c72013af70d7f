//! Field key encoding.
//!
//! Header keys are bare field names. Line-item keys have the form
//! `line_items.<line>.<column>`. Header names may not contain `.`, so the two
//! forms never collide.

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::LineItemColumn;
use crate::error::KeyError;

const LINE_ITEM_PREFIX: &str = "line_items";

lazy_static! {
    static ref LINE_ITEM_KEY: Regex = Regex::new(r"^line_items\.([1-9][0-9]*)\.([a-z_]+)$").unwrap();
}

/// Identifier of a structured-document field.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldKey(String);

impl FieldKey {
    /// Build a header key.
    pub fn header(name: impl Into<String>) -> Result<Self, KeyError> {
        let name = name.into();
        if name.is_empty() {
            return Err(KeyError::Empty);
        }
        if name.contains('.') {
            return Err(KeyError::ReservedSeparator(name));
        }
        Ok(Self(name))
    }

    /// Build a line-item key.
    pub fn line_item(line_number: u32, column: LineItemColumn) -> Result<Self, KeyError> {
        if line_number == 0 {
            return Err(KeyError::ZeroLine);
        }
        Ok(encode_line_item_key(line_number, column))
    }

    /// Parse either key form.
    pub fn parse(raw: &str) -> Result<Self, KeyError> {
        if is_line_item_key(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Self::header(raw)
        }
    }

    /// The encoded key.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode the line-item reference, if this is a line-item key.
    pub fn line_item_ref(&self) -> Option<LineItemKey> {
        decode_line_item_key(&self.0)
    }

    /// Check if this is a header key.
    pub fn is_header(&self) -> bool {
        !is_line_item_key(&self.0)
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for FieldKey {
    type Error = KeyError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw)
    }
}

impl From<FieldKey> for String {
    fn from(key: FieldKey) -> Self {
        key.0
    }
}

impl AsRef<str> for FieldKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Decoded line-item key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LineItemKey {
    pub line_number: u32,
    pub column: LineItemColumn,
}

impl LineItemKey {
    /// Re-encode this reference.
    pub fn encode(&self) -> FieldKey {
        encode_line_item_key(self.line_number, self.column)
    }
}

/// Encode a line-item column key.
///
/// `line_number` must be positive: `line_items.0.<column>` never decodes.
/// Use [`FieldKey::line_item`] when the number is not already known to be valid.
pub fn encode_line_item_key(line_number: u32, column: LineItemColumn) -> FieldKey {
    FieldKey(format!("{}.{}.{}", LINE_ITEM_PREFIX, line_number, column.as_str()))
}

/// Decode a line-item key; `None` for header keys and anything malformed.
pub fn decode_line_item_key(key: &str) -> Option<LineItemKey> {
    let caps = LINE_ITEM_KEY.captures(key)?;
    let line_number = caps[1].parse().ok()?;
    let column = LineItemColumn::from_name(&caps[2])?;
    Some(LineItemKey {
        line_number,
        column,
    })
}

/// Check if a key refers to a line-item column.
pub fn is_line_item_key(key: &str) -> bool {
    decode_line_item_key(key).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_round_trip_all_columns() {
        for line_number in [1, 2, 9, 10, 57, 1000, u32::MAX] {
            for column in LineItemColumn::ALL {
                let key = encode_line_item_key(line_number, column);
                assert_eq!(
                    decode_line_item_key(key.as_str()),
                    Some(LineItemKey {
                        line_number,
                        column
                    })
                );
            }
        }
    }

    #[test]
    fn test_decode_rejects_non_conforming() {
        for raw in [
            "",
            "sku",
            "document_number",
            "line_items",
            "line_items.0.sku",
            "line_items.01.sku",
            "line_items.-1.sku",
            "line_items.2.price",
            "line_items.2.sku.extra",
            "line_items.99999999999.sku",
            "2-sku",
        ] {
            assert_eq!(decode_line_item_key(raw), None, "{raw}");
            assert!(!is_line_item_key(raw));
        }
    }

    #[test]
    fn test_header_keys_never_collide() {
        assert!(FieldKey::header("document_number").unwrap().is_header());
        assert_eq!(
            FieldKey::header("line_items.1.sku"),
            Err(KeyError::ReservedSeparator("line_items.1.sku".to_string()))
        );
        assert_eq!(FieldKey::header(""), Err(KeyError::Empty));
        assert_eq!(
            FieldKey::line_item(0, LineItemColumn::Sku),
            Err(KeyError::ZeroLine)
        );
    }

    #[test]
    fn test_zero_line_encoding_does_not_decode() {
        let raw = encode_line_item_key(0, LineItemColumn::Sku);
        assert_eq!(decode_line_item_key(raw.as_str()), None);
        assert!(FieldKey::line_item(0, LineItemColumn::Sku).is_err());
        assert_eq!(
            FieldKey::line_item(1, LineItemColumn::Sku).map(|k| k.line_item_ref()),
            Ok(Some(LineItemKey {
                line_number: 1,
                column: LineItemColumn::Sku,
            }))
        );
    }

    #[test]
    fn test_parse_either_form() {
        let key = FieldKey::parse("line_items.3.amount").unwrap();
        assert_eq!(key.line_item_ref().map(|k| k.line_number), Some(3));
        assert!(FieldKey::parse("total").unwrap().is_header());
        assert!(FieldKey::parse("line_items.0.amount").is_err());
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let key = encode_line_item_key(4, LineItemColumn::UnitPrice);
        assert_eq!(
            serde_json::to_string(&key).unwrap(),
            "\"line_items.4.unit_price\""
        );
        assert!(serde_json::from_str::<FieldKey>("\"a.b\"").is_err());
    }
}
