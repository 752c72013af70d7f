//! Layout maps: per-field rule chains consumed by the rule engine.
//!
//! These types are supplied by the persistence layer and are read-only to the core.

use serde::{Deserialize, Serialize};

use super::fragment::Rect;

/// A named set of field rule chains.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutMap {
    /// Display name of the layout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Rule chains, one per extracted field.
    #[serde(default)]
    pub fields: Vec<FieldRules>,
}

impl LayoutMap {
    /// Load a layout map from a JSON file.
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// The rule chain for one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRules {
    /// Field identifier; usually an encoded field key.
    pub id: String,

    /// Rules to try, lowest priority value first.
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl FieldRules {
    pub fn new(id: impl Into<String>, rules: Vec<Rule>) -> Self {
        Self {
            id: id.into(),
            rules,
        }
    }

    /// Rules in evaluation order (ascending priority, stable for ties).
    pub fn ordered_rules(&self) -> Vec<&Rule> {
        let mut rules: Vec<&Rule> = self.rules.iter().collect();
        rules.sort_by_key(|r| r.priority());
        rules
    }
}

/// A single extraction rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Rule {
    /// Locate a label fragment and read the value next to it.
    Anchor(AnchorRule),
    /// Match a pattern against the page text.
    RegexMatch(RegexMatchRule),
    /// Read a fixed page region.
    Absolute(AbsoluteRule),
}

impl Rule {
    /// Get the rule identifier.
    pub fn id(&self) -> &str {
        match self {
            Rule::Anchor(r) => &r.id,
            Rule::RegexMatch(r) => &r.id,
            Rule::Absolute(r) => &r.id,
        }
    }

    /// Get the rule priority (lower runs first).
    pub fn priority(&self) -> i32 {
        match self {
            Rule::Anchor(r) => r.priority,
            Rule::RegexMatch(r) => r.priority,
            Rule::Absolute(r) => r.priority,
        }
    }

    /// Human-readable variant name.
    pub fn kind(&self) -> &'static str {
        match self {
            Rule::Anchor(_) => "anchor",
            Rule::RegexMatch(_) => "regex_match",
            Rule::Absolute(_) => "absolute",
        }
    }
}

/// Anchor rule: find a label, then read a region relative to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorRule {
    pub id: String,

    #[serde(default)]
    pub priority: i32,

    /// How to find the label fragment.
    pub anchor: AnchorConfig,

    /// Where the value sits relative to the label.
    #[serde(default)]
    pub position: PositionConfig,

    /// How to turn the region text into a value.
    #[serde(default)]
    pub parser: ParserConfig,
}

impl AnchorRule {
    /// Create an anchor rule with default position and parser settings.
    pub fn new(id: impl Into<String>, aliases: &[&str]) -> Self {
        Self {
            id: id.into(),
            priority: 0,
            anchor: AnchorConfig {
                aliases: aliases.iter().map(|a| a.to_string()).collect(),
                ..AnchorConfig::default()
            },
            position: PositionConfig::default(),
            parser: ParserConfig::default(),
        }
    }

    /// Set the rule priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Set the alias match mode.
    pub fn with_match_mode(mut self, mode: MatchMode) -> Self {
        self.anchor.match_mode = mode;
        self
    }

    /// Set which match to use as the anchor.
    pub fn with_instance(mut self, instance: u32, from: InstanceFrom) -> Self {
        self.anchor.instance = instance;
        self.anchor.instance_from = from;
        self
    }

    /// Set the page scope.
    pub fn with_page_scope(mut self, scope: PageScope) -> Self {
        self.anchor.page_scope = scope;
        self
    }

    /// Restrict the anchor search to a zone (fractional or absolute).
    pub fn with_search_zone(mut self, zone: Rect) -> Self {
        self.anchor.search_zone = Some(zone);
        self
    }

    /// Set the value region relative to the anchor.
    pub fn with_position(mut self, start: StartingPosition, offset: OffsetRect) -> Self {
        self.position = PositionConfig {
            starting_position: start,
            offset_rect: offset,
        };
        self
    }

    /// Set the parser.
    pub fn with_parser(mut self, parser: ParserConfig) -> Self {
        self.parser = parser;
        self
    }
}

/// Label search settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnchorConfig {
    /// Label texts to look for.
    pub aliases: Vec<String>,

    /// How fragment text is compared against an alias.
    pub match_mode: MatchMode,

    /// Compare case-insensitively.
    pub ignore_case: bool,

    /// Collapse runs of whitespace before comparing.
    pub normalize_whitespace: bool,

    /// Which match to use (1-based).
    pub instance: u32,

    /// Count `instance` from the first or the last match.
    pub instance_from: InstanceFrom,

    /// Pages to search.
    pub page_scope: PageScope,

    /// Region the label must lie in; `None` searches the whole page.
    pub search_zone: Option<Rect>,
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            aliases: Vec::new(),
            match_mode: MatchMode::Exact,
            ignore_case: true,
            normalize_whitespace: true,
            instance: 1,
            instance_from: InstanceFrom::Start,
            page_scope: PageScope::Any,
            search_zone: None,
        }
    }
}

/// Alias comparison mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    #[default]
    Exact,
    StartsWith,
    Contains,
    EndsWith,
}

impl MatchMode {
    /// Test normalized fragment text against a normalized alias.
    pub fn matches(&self, text: &str, alias: &str) -> bool {
        match self {
            MatchMode::Exact => text == alias,
            MatchMode::StartsWith => text.starts_with(alias),
            MatchMode::Contains => text.contains(alias),
            MatchMode::EndsWith => text.ends_with(alias),
        }
    }
}

/// Direction in which anchor instances are counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceFrom {
    #[default]
    Start,
    End,
}

/// Pages an anchor may be found on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageScope {
    First,
    Last,
    #[default]
    Any,
}

/// Value region placement relative to the anchor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionConfig {
    /// Anchor corner used as the origin.
    pub starting_position: StartingPosition,

    /// Region offset and size from that corner.
    pub offset_rect: OffsetRect,
}

/// Corner of the anchor's bounding rectangle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartingPosition {
    TopLeft,
    #[default]
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Offset of the value region from the origin corner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OffsetRect {
    pub top: f32,
    pub left: f32,
    pub width: f32,
    pub height: f32,
}

impl OffsetRect {
    pub fn new(top: f32, left: f32, width: f32, height: f32) -> Self {
        Self {
            top,
            left,
            width,
            height,
        }
    }
}

/// Value parsing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Patterns to try, lowest priority value first.
    pub patterns: Vec<ParsePattern>,

    /// Use the whole region text when no pattern matches.
    pub fallback_to_full_text: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            patterns: Vec::new(),
            fallback_to_full_text: true,
        }
    }
}

impl ParserConfig {
    /// Parser with only the full-text fallback.
    pub fn full_text() -> Self {
        Self::default()
    }

    /// Add a pattern.
    pub fn with_pattern(mut self, regex: impl Into<String>, priority: i32) -> Self {
        self.patterns.push(ParsePattern {
            regex: regex.into(),
            priority,
        });
        self
    }

    /// Set the full-text fallback.
    pub fn with_fallback(mut self, fallback: bool) -> Self {
        self.fallback_to_full_text = fallback;
        self
    }
}

/// A prioritized parser pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsePattern {
    pub regex: String,
    #[serde(default)]
    pub priority: i32,
}

/// Pattern rule over the page text. Modeled but not evaluated yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegexMatchRule {
    pub id: String,
    #[serde(default)]
    pub priority: i32,
    pub pattern: String,
}

/// Fixed-region rule. Modeled but not evaluated yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbsoluteRule {
    pub id: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    pub rect: Rect,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_rule_deserialization() {
        let json = r#"{
            "name": "acme",
            "fields": [{
                "id": "invoice_number",
                "rules": [
                    {"type": "regex_match", "id": "r2", "priority": 2, "pattern": "INV-\\d+"},
                    {"type": "anchor", "id": "r1", "priority": 1,
                     "anchor": {"aliases": ["Invoice Number"], "match_mode": "starts_with"},
                     "position": {"starting_position": "top_right",
                                  "offset_rect": {"width": 200, "height": 20}},
                     "parser": {"patterns": [{"regex": "(\\S+)", "priority": 1}]}}
                ]
            }]
        }"#;

        let map: LayoutMap = serde_json::from_str(json).unwrap();
        let field = &map.fields[0];
        let ordered: Vec<&str> = field.ordered_rules().iter().map(|r| r.id()).collect();
        assert_eq!(ordered, vec!["r1", "r2"]);

        let Rule::Anchor(anchor) = &field.rules[1] else {
            panic!("expected anchor rule");
        };
        assert_eq!(anchor.anchor.match_mode, MatchMode::StartsWith);
        assert_eq!(anchor.anchor.instance, 1);
        assert!(anchor.anchor.ignore_case);
        assert_eq!(anchor.position.offset_rect.width, 200.0);
        assert!(anchor.parser.fallback_to_full_text);
    }

    #[test]
    fn test_match_modes() {
        assert!(MatchMode::Exact.matches("total", "total"));
        assert!(!MatchMode::Exact.matches("total:", "total"));
        assert!(MatchMode::StartsWith.matches("total:", "total"));
        assert!(MatchMode::Contains.matches("grand total:", "total"));
        assert!(MatchMode::EndsWith.matches("grand total", "total"));
    }
}
