//! Resolving revisions: the accepted view is the modified document, the
//! rejected view is the original.

use super::markup::RevisionKind;
use crate::tree::{vocab, Document, DocumentNode, NodeId};
use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Markers that vanish in either view.
static ELEMENTS_TO_REMOVE: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        vocab::MOVE_FROM_RANGE_START,
        vocab::MOVE_FROM_RANGE_END,
        vocab::MOVE_TO_RANGE_START,
        vocab::MOVE_TO_RANGE_END,
        vocab::CELL_INS,
        vocab::CELL_DEL,
        vocab::R_PR_CHANGE,
        vocab::P_PR_CHANGE,
    ]
    .into_iter()
    .collect()
});

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum View {
    Accepted,
    Rejected,
}

impl View {
    /// Whether content wrapped in `kind` is dropped from this view.
    fn drops(self, kind: RevisionKind) -> bool {
        match self {
            View::Accepted => kind.is_removal(),
            View::Rejected => matches!(kind, RevisionKind::Insertion | RevisionKind::MoveDestination),
        }
    }

    /// Cell marker naming a cell absent from this view.
    fn dropped_cell_marker(self) -> &'static str {
        match self {
            View::Accepted => vocab::CELL_DEL,
            View::Rejected => vocab::CELL_INS,
        }
    }
}

/// Applies every revision, yielding the modified document.
pub fn accept_revisions(doc: &Document) -> Document {
    resolve(doc, View::Accepted)
}

/// Undoes every revision, yielding the original document.
pub fn reject_revisions(doc: &Document) -> Document {
    resolve(doc, View::Rejected)
}

fn resolve(source: &Document, view: View) -> Document {
    let mut result = Document::new();
    if let Some(root) = source.root() {
        if let Some(children) = transform_node(source, root, &mut result, None, view) {
            if children.len() == 1 {
                result.set_root(Some(children[0]));
            }
        }
    }
    result
}

fn add(result: &mut Document, parent: Option<NodeId>, data: DocumentNode) -> NodeId {
    match parent {
        Some(p) => result.add_child(p, data),
        None => result.add_root(data),
    }
}

fn transform_node(
    source: &Document,
    node: NodeId,
    result: &mut Document,
    parent: Option<NodeId>,
    view: View,
) -> Option<Vec<NodeId>> {
    let data = source.get(node)?;
    let DocumentNode::Element { tag, attributes } = data else {
        return Some(vec![add(result, parent, data.clone())]);
    };
    let tag = tag.as_str();

    if ELEMENTS_TO_REMOVE.contains(tag) {
        return None;
    }

    if let Some(kind) = RevisionKind::from_tag(tag) {
        let in_properties = source
            .parent(node)
            .and_then(|p| source.tag(p))
            .is_some_and(vocab::is_property_container);
        if in_properties || view.drops(kind) {
            return None;
        }
        let mut unwrapped = Vec::new();
        for child in source.children(node) {
            if let Some(children) = transform_node(source, child, result, parent, view) {
                unwrapped.extend(children);
            }
        }
        return if unwrapped.is_empty() { None } else { Some(unwrapped) };
    }

    match tag {
        vocab::TR if has_marker(source, node, vocab::TR_PR, |t| dropped_wrapper(view, t)) => return None,
        vocab::TC if has_marker(source, node, vocab::TC_PR, |t| t == view.dropped_cell_marker()) => return None,
        vocab::P if paragraph_mark_dropped(source, node, view) => return None,
        vocab::DEL_TEXT if view == View::Accepted => return None,
        _ => {}
    }

    let out_tag = if tag == vocab::DEL_TEXT { vocab::T } else { tag };
    let new_id = add(result, parent, DocumentNode::element_with_attrs(out_tag, attributes.clone()));

    if view == View::Rejected {
        if let Some(previous) = previous_properties(source, node) {
            restore_properties(source, node, previous, result, new_id, view);
            return Some(vec![new_id]);
        }
    }

    for child in source.children(node) {
        transform_node(source, child, result, Some(new_id), view);
    }
    Some(vec![new_id])
}

fn dropped_wrapper(view: View, tag: &str) -> bool {
    RevisionKind::from_tag(tag).is_some_and(|kind| kind.wrapper_tag().is_some() && view.drops(kind))
}

/// Whether the property container `props_tag` of `node` holds a child
/// matching `pred`.
fn has_marker(source: &Document, node: NodeId, props_tag: &str, pred: impl Fn(&str) -> bool) -> bool {
    source
        .child_by_tag(node, props_tag)
        .map(|props| source.element_children(props).any(|c| source.tag(c).is_some_and(&pred)))
        .unwrap_or(false)
}

fn paragraph_mark_dropped(source: &Document, paragraph: NodeId, view: View) -> bool {
    source
        .child_by_tag(paragraph, vocab::P_PR)
        .is_some_and(|ppr| has_marker(source, ppr, vocab::R_PR, |t| dropped_wrapper(view, t)))
}

/// The `rPr`/`pPr` snapshot stored in a change marker of a property
/// container.
fn previous_properties(source: &Document, node: NodeId) -> Option<NodeId> {
    let (change_tag, props_tag) = match source.tag(node)? {
        vocab::R_PR => (vocab::R_PR_CHANGE, vocab::R_PR),
        vocab::P_PR => (vocab::P_PR_CHANGE, vocab::P_PR),
        _ => return None,
    };
    let change = source.child_by_tag(node, change_tag)?;
    Some(
        source
            .child_by_tag(change, props_tag)
            .unwrap_or(change),
    )
}

/// Fills `target` with the old properties. A paragraph keeps its current
/// mark and section properties, which the change marker does not record.
fn restore_properties(
    source: &Document,
    node: NodeId,
    previous: NodeId,
    result: &mut Document,
    target: NodeId,
    view: View,
) {
    let is_paragraph = source.tag(node) == Some(vocab::P_PR);
    for child in source.children(previous) {
        if is_paragraph && matches!(source.tag(child), Some(vocab::R_PR) | Some(vocab::SECT_PR)) {
            continue;
        }
        transform_node(source, child, result, Some(target), view);
    }
    if is_paragraph {
        for child in source.element_children(node) {
            if matches!(source.tag(child), Some(vocab::R_PR) | Some(vocab::SECT_PR)) {
                transform_node(source, child, result, Some(target), view);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::{parse, serialize};
    use pretty_assertions::assert_eq;

    const ANNOTATED: &str = r#"<document><body><p><r><t xml:space="preserve">the </t></r><del id="1" author="a" date="d"><r><delText>quick</delText></r></del><ins id="2" author="a" date="d"><r><t>slow</t></r></ins><r><t xml:space="preserve"> fox</t></r></p><p><pPr><rPr><del id="3" author="a" date="d"/></rPr></pPr><del id="4" author="a" date="d"><r><delText>gone</delText></r></del></p></body></document>"#;

    #[test]
    fn accepting_keeps_insertions() {
        let doc = parse(ANNOTATED).unwrap();
        assert_eq!(accept_revisions(&doc).plain_text(), "the slow fox");
    }

    #[test]
    fn rejecting_keeps_deletions() {
        let doc = parse(ANNOTATED).unwrap();
        assert_eq!(reject_revisions(&doc).plain_text(), "the quick fox\ngone");
    }

    #[test]
    fn rejected_text_uses_plain_text_elements() {
        let doc = parse(ANNOTATED).unwrap();
        let xml = serialize(&reject_revisions(&doc)).unwrap();
        assert!(!xml.contains("delText"));
        assert!(!xml.contains("<w:del "));
        assert!(!xml.contains("<w:ins "));
    }

    #[test]
    fn rows_tagged_as_removed_disappear() {
        let doc = parse(
            r#"<document><body><tbl><tr><tc><p><r><t>kept</t></r></p></tc></tr><tr><trPr><ins id="1" author="a" date="d"/></trPr><tc><p><ins id="2" author="a" date="d"><r><t>added</t></r></ins></p></tc></tr></tbl></body></document>"#,
        )
        .unwrap();
        assert_eq!(accept_revisions(&doc).plain_text(), "kept\nadded");
        assert_eq!(reject_revisions(&doc).plain_text(), "kept");
    }

    #[test]
    fn rejecting_restores_old_run_properties() {
        let doc = parse(
            r#"<document><body><p><r><rPr><b/><rPrChange id="1" author="a" date="d"><rPr><i/></rPr></rPrChange></rPr><t>word</t></r></p></body></document>"#,
        )
        .unwrap();
        let rejected = serialize(&reject_revisions(&doc)).unwrap();
        assert!(rejected.contains("<w:rPr><w:i/></w:rPr>"), "{rejected}");
        let accepted = serialize(&accept_revisions(&doc)).unwrap();
        assert!(accepted.contains("<w:rPr><w:b/></w:rPr>"), "{accepted}");
    }

    #[test]
    fn rejecting_restores_old_paragraph_properties() {
        let doc = parse(
            r#"<document><body><p><pPr><jc val="center"/><rPr><b/></rPr><pPrChange id="1" author="a" date="d"><pPr><jc val="left"/></pPr></pPrChange></pPr><r><t>x</t></r></p></body></document>"#,
        )
        .unwrap();
        let rejected = serialize(&reject_revisions(&doc)).unwrap();
        assert!(rejected.contains(r#"<w:pPr><w:jc w:val="left"/><w:rPr><w:b/></w:rPr></w:pPr>"#), "{rejected}");
    }
}
