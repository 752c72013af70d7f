//! Anchor rule evaluation: find a label fragment, read the region next to it.

use tracing::{debug, trace};

use super::parser::parse_value;
use super::reading::{self, AssembledText};
use super::{FragmentSet, RuleValue};
use crate::error::RuleError;
use crate::models::fragment::{Rect, SourceFragment};
use crate::models::layout::{
    AnchorConfig, AnchorRule, InstanceFrom, PageScope, PositionConfig, StartingPosition,
};

/// Evaluate an anchor rule. `None` means the rule produced no value.
pub(super) fn evaluate(
    rule: &AnchorRule,
    set: &FragmentSet<'_>,
    overlap_ratio: f32,
    errors: &mut Vec<RuleError>,
) -> Option<RuleValue> {
    let anchor = select_anchor(&rule.anchor, set)?;
    let region = search_rect(&anchor.bounds(), &rule.position);

    trace!(
        "Anchor {} on page {}, search region {:?}",
        anchor.id, anchor.page, region
    );

    let candidates: Vec<&SourceFragment> = set
        .fragments
        .iter()
        .filter(|f| f.page == anchor.page && f.bounds().intersects(&region))
        .collect();

    let lines = reading::group_lines(candidates, overlap_ratio);
    let AssembledText { text, segments } = reading::assemble(&lines)?;
    let value = parse_value(&text, &rule.parser, errors)?;

    Some(RuleValue { value, segments })
}

/// Pick the anchor fragment for a label configuration.
pub(super) fn select_anchor<'a>(
    config: &AnchorConfig,
    set: &FragmentSet<'a>,
) -> Option<&'a SourceFragment> {
    let zone = config.search_zone.map(|z| normalize_zone(z, set));
    let aliases: Vec<String> = config
        .aliases
        .iter()
        .map(|a| normalize_text(a, config))
        .filter(|a| !a.is_empty())
        .collect();

    let matches: Vec<&SourceFragment> = set
        .fragments
        .iter()
        .filter(|f| set.in_scope(f.page, config.page_scope))
        .filter(|f| zone.is_none_or(|z| z.contains(&f.bounds())))
        .filter(|f| {
            let text = normalize_text(&f.text, config);
            aliases.iter().any(|a| config.match_mode.matches(&text, a))
        })
        .collect();

    debug!(
        "{} anchor candidates for aliases {:?}",
        matches.len(),
        config.aliases
    );

    let instance = config.instance as usize;
    if instance == 0 || instance > matches.len() {
        return None;
    }

    let index = match config.instance_from {
        InstanceFrom::Start => instance - 1,
        InstanceFrom::End => matches.len() - instance,
    };
    Some(matches[index])
}

/// Scale a fractional zone to page pixels; absolute zones pass through.
pub(super) fn normalize_zone(zone: Rect, set: &FragmentSet<'_>) -> Rect {
    let fractional = [zone.top, zone.left, zone.right, zone.bottom]
        .iter()
        .all(|v| *v <= 1.0);
    if !fractional {
        return zone;
    }

    Rect {
        top: zone.top * set.page_height,
        left: zone.left * set.page_width,
        right: zone.right * set.page_width,
        bottom: zone.bottom * set.page_height,
    }
}

/// Build the value region from the anchor's corner and the offset.
pub(super) fn search_rect(anchor: &Rect, position: &PositionConfig) -> Rect {
    let (x, y) = match position.starting_position {
        StartingPosition::TopLeft => (anchor.left, anchor.top),
        StartingPosition::TopRight => (anchor.right, anchor.top),
        StartingPosition::BottomLeft => (anchor.left, anchor.bottom),
        StartingPosition::BottomRight => (anchor.right, anchor.bottom),
    };

    let offset = &position.offset_rect;
    let left = x + offset.left;
    let top = y + offset.top;
    let right = left + offset.width;
    let bottom = top + offset.height;

    Rect {
        top: top.min(bottom),
        left: left.min(right),
        right: left.max(right),
        bottom: top.max(bottom),
    }
}

fn normalize_text(text: &str, config: &AnchorConfig) -> String {
    let text = if config.normalize_whitespace {
        reading::collapse_whitespace(text)
    } else {
        text.to_string()
    };

    if config.ignore_case {
        text.to_lowercase()
    } else {
        text
    }
}

impl FragmentSet<'_> {
    fn in_scope(&self, page: u32, scope: PageScope) -> bool {
        match (scope, self.page_range) {
            (PageScope::Any, _) => true,
            (PageScope::First, Some((first, _))) => page == first,
            (PageScope::Last, Some((_, last))) => page == last,
            (_, None) => false,
        }
    }
}
