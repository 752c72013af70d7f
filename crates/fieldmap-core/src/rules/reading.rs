//! Reading-order grouping of fragments into lines of text.

use serde::{Deserialize, Serialize};

use crate::models::fragment::{FragmentId, SourceFragment};

/// One line of combined text and the fragments it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSegment {
    pub text: String,
    pub source_fragment_ids: Vec<FragmentId>,
}

/// Text assembled from a set of fragments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledText {
    /// Lines joined with `\n`.
    pub text: String,
    /// One segment per non-empty line.
    pub segments: Vec<TextSegment>,
}

/// Group fragments into reading-order lines.
///
/// Fragments are sorted by top edge. A fragment joins the current line when it
/// overlaps the line's last fragment vertically by more than `overlap_ratio`
/// of their average height. Each line is then sorted left to right.
pub fn group_lines<'a>(
    mut fragments: Vec<&'a SourceFragment>,
    overlap_ratio: f32,
) -> Vec<Vec<&'a SourceFragment>> {
    fragments.sort_by(|a, b| {
        a.bounds()
            .top
            .partial_cmp(&b.bounds().top)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut lines: Vec<Vec<&SourceFragment>> = Vec::new();
    for fragment in fragments {
        let joins = lines
            .last()
            .and_then(|line| line.last())
            .map(|prev| same_line(prev, fragment, overlap_ratio))
            .unwrap_or(false);

        match lines.last_mut() {
            Some(line) if joins => line.push(fragment),
            _ => lines.push(vec![fragment]),
        }
    }

    for line in &mut lines {
        line.sort_by(|a, b| {
            a.bounds()
                .left
                .partial_cmp(&b.bounds().left)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    lines
}

fn same_line(a: &SourceFragment, b: &SourceFragment, overlap_ratio: f32) -> bool {
    let (ra, rb) = (a.bounds(), b.bounds());
    let average_height = (ra.height() + rb.height()) / 2.0;
    if average_height <= 0.0 {
        return false;
    }
    ra.vertical_overlap(&rb) > overlap_ratio * average_height
}

/// Collapse whitespace runs and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Build combined text from grouped lines. `None` when no fragment has text.
pub fn assemble(lines: &[Vec<&SourceFragment>]) -> Option<AssembledText> {
    let segments: Vec<TextSegment> = lines
        .iter()
        .filter_map(|line| {
            let parts: Vec<(String, &FragmentId)> = line
                .iter()
                .map(|f| (collapse_whitespace(&f.text), &f.id))
                .filter(|(text, _)| !text.is_empty())
                .collect();

            if parts.is_empty() {
                return None;
            }

            Some(TextSegment {
                text: parts
                    .iter()
                    .map(|(t, _)| t.as_str())
                    .collect::<Vec<_>>()
                    .join(" "),
                source_fragment_ids: parts.iter().map(|(_, id)| (*id).clone()).collect(),
            })
        })
        .collect();

    if segments.is_empty() {
        return None;
    }

    let text = segments
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    Some(AssembledText { text, segments })
}
