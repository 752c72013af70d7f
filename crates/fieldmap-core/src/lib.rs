//! Core library for mapping positioned text fragments onto structured documents.
//!
//! This crate provides:
//! - Field key encoding for header and line-item fields
//! - Anchor-rule extraction over OCR-style text fragments
//! - Line item insertion/removal with mapping renumbering
//! - A transactional mapping store with undo/redo

pub mod document;
pub mod error;
pub mod mapping;
pub mod models;
pub mod rules;
pub mod store;

pub use document::{
    FieldKey, LineItem, LineItemColumn, LineItemKey, StructuredDocument, decode_line_item_key,
    encode_line_item_key, is_line_item_key,
};
pub use error::{FieldmapError, KeyError, Result, RuleError};
pub use mapping::{FieldMappingEntry, FieldMappingTable, GeometryContext, MappingOperation};
pub use models::{FieldmapConfig, LayoutMap, SourceFragment};
pub use rules::{ExtractionOutcome, FieldExtraction, RuleEngine};
pub use store::{FieldUpdate, StoreAction, TransactionReport, TransactionStore};
