//! Reading revisions back out of an annotated document.

use super::markup::RevisionKind;
use crate::compare::{FormatDelta, Formatting};
use crate::tree::{vocab, Document, NodeId};
use serde::Serialize;
use std::collections::BTreeSet;

/// One revision found in an annotated document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevisionRecord {
    pub id: u32,
    pub author: String,
    pub date: String,
    pub kind: RevisionKind,
    pub text: String,
    /// Range name shared by the two halves of a move.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub move_group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format_delta: Option<FormatDelta>,
}

/// Paragraph keys that describe the mark or the section rather than the
/// paragraph's own formatting.
const PARAGRAPH_ONLY_EXCLUDED: &[&str] = &["mark", vocab::SECT_PR];

/// Lists every revision in document order.
///
/// Content wrappers become one record each. Markers nested in property
/// containers (row, cell and paragraph-mark tags) describe structure and are
/// not reported; the content they cover carries its own wrappers.
pub fn extract_revisions(doc: &Document) -> Vec<RevisionRecord> {
    let Some(root) = doc.root() else {
        return Vec::new();
    };
    let mut records = Vec::new();
    let mut move_from_name: Option<String> = None;
    let mut move_to_name: Option<String> = None;

    for node in doc.descendants(root) {
        let Some(tag) = doc.tag(node) else { continue };
        match tag {
            vocab::MOVE_FROM_RANGE_START => {
                move_from_name = doc.attribute(node, vocab::ATTR_NAME).map(str::to_string);
                continue;
            }
            vocab::MOVE_TO_RANGE_START => {
                move_to_name = doc.attribute(node, vocab::ATTR_NAME).map(str::to_string);
                continue;
            }
            _ => {}
        }
        let Some(kind) = RevisionKind::from_tag(tag) else { continue };

        let record = match tag {
            vocab::R_PR_CHANGE => run_property_change(doc, node),
            vocab::P_PR_CHANGE => paragraph_property_change(doc, node),
            _ if is_property_level(doc, node) => None,
            _ => {
                let move_group = match kind {
                    RevisionKind::MoveSource => move_from_name.clone(),
                    RevisionKind::MoveDestination => move_to_name.clone(),
                    _ => None,
                };
                Some(RevisionRecord {
                    move_group,
                    ..base_record(doc, node, kind, doc.inline_text(node))
                })
            }
        };
        records.extend(record);
    }
    tracing::debug!(records = records.len(), "extracted revisions");
    records
}

fn is_property_level(doc: &Document, node: NodeId) -> bool {
    doc.parent(node)
        .and_then(|p| doc.tag(p))
        .is_some_and(vocab::is_property_container)
}

fn base_record(doc: &Document, node: NodeId, kind: RevisionKind, text: String) -> RevisionRecord {
    RevisionRecord {
        id: doc
            .attribute(node, vocab::ATTR_ID)
            .and_then(|id| id.parse().ok())
            .unwrap_or(0),
        author: doc.attribute(node, vocab::ATTR_AUTHOR).unwrap_or_default().to_string(),
        date: doc.attribute(node, vocab::ATTR_DATE).unwrap_or_default().to_string(),
        kind,
        text,
        move_group: None,
        format_delta: None,
    }
}

/// Snapshot of the properties recorded inside a change marker.
fn previous_properties(doc: &Document, change: NodeId, tag: &str) -> Formatting {
    doc.child_by_tag(change, tag)
        .map(|props| Formatting::from_properties(doc, props))
        .unwrap_or_default()
}

fn run_property_change(doc: &Document, change: NodeId) -> Option<RevisionRecord> {
    let rpr = doc.parent(change)?;
    let run = doc.parent(rpr)?;
    let old = previous_properties(doc, change, vocab::R_PR);
    let new = Formatting::from_properties(doc, rpr);
    Some(RevisionRecord {
        format_delta: FormatDelta::between(&old, &new),
        ..base_record(doc, change, RevisionKind::FormatChange, doc.inline_text(run))
    })
}

fn paragraph_property_change(doc: &Document, change: NodeId) -> Option<RevisionRecord> {
    let ppr = doc.parent(change)?;
    let paragraph = doc.parent(ppr)?;
    let old = previous_properties(doc, change, vocab::P_PR).without(PARAGRAPH_ONLY_EXCLUDED);
    let new = Formatting::from_properties(doc, ppr).without(PARAGRAPH_ONLY_EXCLUDED);
    Some(RevisionRecord {
        format_delta: FormatDelta::between(&old, &new),
        ..base_record(doc, change, RevisionKind::FormatChange, doc.inline_text(paragraph))
    })
}

/// Revision totals of a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RevisionCounts {
    pub insertions: usize,
    pub deletions: usize,
    pub moves: usize,
    pub format_changes: usize,
}

impl RevisionCounts {
    pub fn total(&self) -> usize {
        self.insertions + self.deletions + self.moves + self.format_changes
    }
}

/// Counts revisions, treating adjacent sibling wrappers with the same kind,
/// author and date as one revision. A move counts once for its pair of
/// ranges.
pub fn count_revisions(doc: &Document) -> RevisionCounts {
    let mut counts = RevisionCounts::default();
    let Some(root) = doc.root() else {
        return counts;
    };
    count_in_subtree(doc, root, &mut counts);

    let move_names: BTreeSet<&str> = doc
        .descendants(root)
        .filter(|&n| doc.tag(n) == Some(vocab::MOVE_FROM_RANGE_START))
        .filter_map(|n| doc.attribute(n, vocab::ATTR_NAME))
        .collect();
    counts.moves = move_names.len();
    counts
}

/// Grouping key: kind plus author and date, never the id.
fn revision_key(doc: &Document, node: NodeId) -> Option<(RevisionKind, String, String)> {
    let kind = RevisionKind::from_tag(doc.tag(node)?)?;
    if kind != RevisionKind::FormatChange && is_property_level(doc, node) {
        return None;
    }
    Some((
        kind,
        doc.attribute(node, vocab::ATTR_AUTHOR).unwrap_or_default().to_string(),
        doc.attribute(node, vocab::ATTR_DATE).unwrap_or_default().to_string(),
    ))
}

fn count_in_subtree(doc: &Document, node: NodeId, counts: &mut RevisionCounts) {
    let mut last_key = None;
    for child in doc.children(node) {
        match revision_key(doc, child) {
            Some(key) => {
                if last_key.as_ref() != Some(&key) {
                    match key.0 {
                        RevisionKind::Insertion => counts.insertions += 1,
                        RevisionKind::Deletion => counts.deletions += 1,
                        RevisionKind::FormatChange => counts.format_changes += 1,
                        // Counted per range name.
                        RevisionKind::MoveSource | RevisionKind::MoveDestination => {}
                    }
                }
                last_key = Some(key);
            }
            None => {
                last_key = None;
                count_in_subtree(doc, child, counts);
            }
        }
    }
}
