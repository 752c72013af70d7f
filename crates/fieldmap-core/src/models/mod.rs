//! Data models shared across the extraction engine and the mapping store.

pub mod config;
pub mod fragment;
pub mod layout;

pub use config::{ExtractionConfig, FieldmapConfig, StoreConfig};
pub use fragment::{FragmentId, Point, Rect, SourceFragment};
pub use layout::{
    AbsoluteRule, AnchorConfig, AnchorRule, FieldRules, InstanceFrom, LayoutMap, MatchMode,
    OffsetRect, PageScope, ParsePattern, ParserConfig, PositionConfig, RegexMatchRule, Rule,
    StartingPosition,
};
