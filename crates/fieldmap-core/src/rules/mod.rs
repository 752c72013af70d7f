//! Rule-based field extraction over positioned text fragments.
//!
//! Each field carries a chain of rules tried in ascending priority. The first
//! rule that yields a value wins. Errors inside one rule (a bad pattern, say)
//! are recorded and never stop the remaining rules or fields.

mod anchor;
pub mod parser;
pub mod reading;

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::RuleError;
use crate::models::config::ExtractionConfig;
use crate::models::fragment::SourceFragment;
use crate::models::layout::{FieldRules, LayoutMap, Rule};

pub use reading::TextSegment;

/// A value extracted for one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldExtraction {
    /// Field the value belongs to.
    pub field_id: String,
    /// Parsed value.
    pub value: String,
    /// Region text, one segment per line, with contributing fragments.
    pub segments: Vec<TextSegment>,
    /// Rule that produced the value.
    pub rule_id: String,
}

impl FieldExtraction {
    /// All contributing fragment ids in segment order, without duplicates.
    pub fn source_fragment_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for id in self.segments.iter().flat_map(|s| &s.source_fragment_ids) {
            if !ids.contains(id) {
                ids.push(id.clone());
            }
        }
        ids
    }
}

/// A rule failure recorded for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionIssue {
    pub field_id: String,
    pub rule_id: String,
    pub message: String,
}

/// Result of one extraction run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionOutcome {
    /// One entry per matched field.
    pub extractions: Vec<FieldExtraction>,
    /// Winning rule of each matched field.
    pub matched_rule_ids: Vec<String>,
    /// Rules that were evaluated and produced nothing.
    pub unmatched_rule_ids: Vec<String>,
    /// Fields no rule could fill.
    #[serde(default)]
    pub unmatched_field_ids: Vec<String>,
    /// Rule errors, for diagnostics only.
    pub errors: Vec<ExtractionIssue>,
    /// Wall-clock time of the run.
    #[serde(default)]
    pub processing_time_ms: u64,
}

impl ExtractionOutcome {
    /// Look up the extraction for a field.
    pub fn get(&self, field_id: &str) -> Option<&FieldExtraction> {
        self.extractions.iter().find(|e| e.field_id == field_id)
    }
}

/// Value produced by a single rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RuleValue {
    pub value: String,
    pub segments: Vec<TextSegment>,
}

/// Outcome of dispatching one rule.
#[derive(Debug)]
enum RuleOutcome {
    Value(RuleValue),
    NoMatch,
    NotImplemented(RuleError),
}

/// Fragments plus the page facts every rule needs.
pub(crate) struct FragmentSet<'a> {
    pub fragments: &'a [SourceFragment],
    /// Smallest and largest page number seen.
    pub page_range: Option<(u32, u32)>,
    pub page_width: f32,
    pub page_height: f32,
}

impl<'a> FragmentSet<'a> {
    pub fn new(fragments: &'a [SourceFragment], config: &ExtractionConfig) -> Self {
        let page_range = fragments
            .iter()
            .map(|f| f.page)
            .fold(None, |range: Option<(u32, u32)>, page| match range {
                None => Some((page, page)),
                Some((lo, hi)) => Some((lo.min(page), hi.max(page))),
            });

        let (page_width, page_height) = if fragments.is_empty() {
            (config.default_page_width, config.default_page_height)
        } else {
            fragments.iter().map(|f| f.bounds()).fold(
                (f32::NEG_INFINITY, f32::NEG_INFINITY),
                |(w, h), r| (w.max(r.right), h.max(r.bottom)),
            )
        };

        Self {
            fragments,
            page_range,
            page_width,
            page_height,
        }
    }
}

/// Evaluates field rule chains against fragment sets.
///
/// The engine holds only configuration, so one instance can serve any number
/// of documents, including from several threads.
#[derive(Debug, Clone, Default)]
pub struct RuleEngine {
    config: ExtractionConfig,
}

impl RuleEngine {
    /// Create an engine with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine from configuration.
    pub fn with_config(config: ExtractionConfig) -> Self {
        Self { config }
    }

    /// Run every field of a layout map.
    pub fn extract_layout(&self, layout: &LayoutMap, fragments: &[SourceFragment]) -> ExtractionOutcome {
        self.extract(&layout.fields, fragments)
    }

    /// Run the rule chain of each field against `fragments`.
    pub fn extract(&self, fields: &[FieldRules], fragments: &[SourceFragment]) -> ExtractionOutcome {
        let start = Instant::now();
        let set = FragmentSet::new(fragments, &self.config);
        let mut outcome = ExtractionOutcome::default();

        info!(
            "Extracting {} fields from {} fragments",
            fields.len(),
            fragments.len()
        );

        for field in fields {
            let mut matched = false;

            for rule in field.ordered_rules() {
                let mut errors = Vec::new();
                let result = self.evaluate(rule, &set, &mut errors);

                outcome
                    .errors
                    .extend(errors.into_iter().map(|e| ExtractionIssue {
                        field_id: field.id.clone(),
                        rule_id: rule.id().to_string(),
                        message: e.to_string(),
                    }));

                match result {
                    RuleOutcome::Value(RuleValue { value, segments }) => {
                        debug!("Field {} matched by rule {}: {:?}", field.id, rule.id(), value);
                        outcome.matched_rule_ids.push(rule.id().to_string());
                        outcome.extractions.push(FieldExtraction {
                            field_id: field.id.clone(),
                            value,
                            segments,
                            rule_id: rule.id().to_string(),
                        });
                        matched = true;
                        break;
                    }
                    RuleOutcome::NoMatch => {
                        debug!("Rule {} produced no value for {}", rule.id(), field.id);
                        outcome.unmatched_rule_ids.push(rule.id().to_string());
                    }
                    RuleOutcome::NotImplemented(reason) => {
                        debug!("Skipping rule {}: {}", rule.id(), reason);
                        outcome.unmatched_rule_ids.push(rule.id().to_string());
                    }
                }
            }

            if !matched {
                outcome.unmatched_field_ids.push(field.id.clone());
            }
        }

        outcome.processing_time_ms = start.elapsed().as_millis() as u64;

        info!(
            "Matched {} of {} fields ({} rule errors)",
            outcome.extractions.len(),
            fields.len(),
            outcome.errors.len()
        );

        outcome
    }

    fn evaluate(&self, rule: &Rule, set: &FragmentSet<'_>, errors: &mut Vec<RuleError>) -> RuleOutcome {
        match rule {
            Rule::Anchor(anchor_rule) => {
                match anchor::evaluate(anchor_rule, set, self.config.line_overlap_ratio, errors) {
                    Some(value) => RuleOutcome::Value(value),
                    None => RuleOutcome::NoMatch,
                }
            }
            Rule::RegexMatch(_) => RuleOutcome::NotImplemented(RuleError::NotImplemented("regex_match")),
            Rule::Absolute(_) => RuleOutcome::NotImplemented(RuleError::NotImplemented("absolute")),
        }
    }
}
