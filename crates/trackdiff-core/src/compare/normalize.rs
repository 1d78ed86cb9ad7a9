//! Normalizer: copies an input tree, drops comparison-irrelevant nodes and
//! stamps every element with a [`Unid`].

use super::context::CompareContext;
use crate::error::{CompareError, Result};
use crate::tree::{vocab, Document, DocumentNode, NodeId, Unid};
use std::collections::HashMap;

/// A normalized copy of one input document.
#[derive(Debug, Clone)]
pub struct NormalizedTree {
    pub doc: Document,
    unid_of: HashMap<NodeId, Unid>,
    node_of: HashMap<Unid, NodeId>,
}

impl NormalizedTree {
    pub fn root(&self) -> Option<NodeId> {
        self.doc.root()
    }

    pub fn unid(&self, node: NodeId) -> Option<Unid> {
        self.unid_of.get(&node).copied()
    }

    pub fn node(&self, unid: Unid) -> Option<NodeId> {
        self.node_of.get(&unid).copied()
    }

    pub fn contains(&self, unid: Unid) -> bool {
        self.node_of.contains_key(&unid)
    }

    /// Unids from the root down to `node`, inclusive.
    pub fn path_to(&self, node: NodeId) -> Vec<Unid> {
        let mut path: Vec<Unid> = self
            .doc
            .ancestors(node)
            .filter_map(|n| self.unid(n))
            .collect();
        path.reverse();
        path
    }

    /// The element whose children are the top-level blocks: `body` when the
    /// tree has one near the root, otherwise the root itself.
    pub fn block_container(&self) -> Option<NodeId> {
        let root = self.root()?;
        if self.doc.tag(root) == Some(vocab::BODY) {
            return Some(root);
        }
        self.doc
            .child_by_tag(root, vocab::BODY)
            .or(Some(root))
    }
}

/// Copies `input` into a fresh arena, assigning Unids depth-first from the
/// context's counter.
pub(crate) fn normalize(input: &Document, ctx: &mut CompareContext) -> Result<NormalizedTree> {
    let root = input
        .root()
        .ok_or_else(|| CompareError::structural("input document has no root element"))?;

    let mut tree = NormalizedTree {
        doc: Document::new(),
        unid_of: HashMap::new(),
        node_of: HashMap::new(),
    };
    copy_node(input, root, &mut tree, None, ctx);
    if tree.doc.root().is_none() {
        return Err(CompareError::structural("input root element was removed by normalization"));
    }
    Ok(tree)
}

fn copy_node(
    input: &Document,
    node: NodeId,
    tree: &mut NormalizedTree,
    parent: Option<NodeId>,
    ctx: &mut CompareContext,
) {
    let Some(data) = input.get(node) else { return };

    match data {
        DocumentNode::Text(text) => {
            let Some(parent) = parent else { return };
            let keeps_whitespace = matches!(
                tree.doc.tag(parent),
                Some(vocab::T) | Some("instrText")
            );
            if keeps_whitespace || !text.trim().is_empty() {
                tree.doc.add_child(parent, DocumentNode::text(text));
            }
        }
        DocumentNode::Element { tag, attributes } => {
            if vocab::is_ignored(tag) {
                return;
            }
            if vocab::is_revision_wrapper(tag) {
                let in_properties = parent
                    .and_then(|p| tree.doc.tag(p))
                    .map(vocab::is_property_container)
                    .unwrap_or(false);
                if !in_properties {
                    for child in input.children(node) {
                        copy_node(input, child, tree, parent, ctx);
                    }
                }
                return;
            }

            let tag = if tag == vocab::DEL_TEXT { vocab::T } else { tag.as_str() };
            let attributes = attributes
                .iter()
                .filter(|a| !a.name.starts_with("rsid"))
                .cloned()
                .collect();
            let data = DocumentNode::element_with_attrs(tag, attributes);
            let new_id = match parent {
                Some(p) => tree.doc.add_child(p, data),
                None => tree.doc.add_root(data),
            };
            let unid = ctx.next_unid();
            tree.unid_of.insert(new_id, unid);
            tree.node_of.insert(unid, new_id);

            for child in input.children(node) {
                copy_node(input, child, tree, Some(new_id), ctx);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::settings::CompareSettings;
    use crate::xml::parse;

    fn normalize_xml(xml: &str, ctx: &mut CompareContext) -> NormalizedTree {
        normalize(&parse(xml).unwrap(), ctx).unwrap()
    }

    #[test]
    fn unids_are_depth_first_and_unique_across_trees() {
        let settings = CompareSettings::default();
        let mut ctx = CompareContext::new(&settings);
        let a = normalize_xml("<document><body><p/></body></document>", &mut ctx);
        let b = normalize_xml("<document><body><p/></body></document>", &mut ctx);

        let root_a = a.root().unwrap();
        let root_b = b.root().unwrap();
        assert_eq!(a.unid(root_a), Some(Unid(1)));
        assert_eq!(b.unid(root_b), Some(Unid(4)));
        assert!(!a.contains(Unid(4)));

        let p = a.doc.descendants(root_a).last().unwrap();
        assert_eq!(a.path_to(p), vec![Unid(1), Unid(2), Unid(3)]);
    }

    #[test]
    fn prior_revisions_are_unwrapped_without_losing_text() {
        let settings = CompareSettings::default();
        let mut ctx = CompareContext::new(&settings);
        let tree = normalize_xml(
            r#"<document><body><p>
                <ins id="1"><r><t>new </t></r></ins>
                <del id="2"><r><delText>old</delText></r></del>
                <proofErr type="spellStart"/>
            </p></body></document>"#,
            &mut ctx,
        );
        assert_eq!(tree.doc.plain_text(), "new old");
        let root = tree.root().unwrap();
        let tags: Vec<_> = tree
            .doc
            .descendants(root)
            .filter_map(|n| tree.doc.tag(n).map(str::to_string))
            .collect();
        assert!(!tags.iter().any(|t| t == "ins" || t == "del" || t == "delText" || t == "proofErr"));
    }

    #[test]
    fn property_level_revision_marks_are_dropped() {
        let settings = CompareSettings::default();
        let mut ctx = CompareContext::new(&settings);
        let tree = normalize_xml(
            r#"<document><body><p><pPr><rPr><ins id="1"/></rPr></pPr></p></body></document>"#,
            &mut ctx,
        );
        let root = tree.root().unwrap();
        assert!(tree.doc.descendants(root).all(|n| tree.doc.tag(n) != Some("ins")));
    }

    #[test]
    fn rsid_attributes_are_removed() {
        let settings = CompareSettings::default();
        let mut ctx = CompareContext::new(&settings);
        let tree = normalize_xml(r#"<document><body><p rsidR="00A1" keep="1"/></body></document>"#, &mut ctx);
        let root = tree.root().unwrap();
        let p = tree.doc.descendants(root).last().unwrap();
        assert_eq!(tree.doc.attribute(p, "rsidR"), None);
        assert_eq!(tree.doc.attribute(p, "keep"), Some("1"));
    }

    #[test]
    fn block_container_prefers_body() {
        let settings = CompareSettings::default();
        let mut ctx = CompareContext::new(&settings);
        let tree = normalize_xml("<document><body><p/></body></document>", &mut ctx);
        let body = tree.block_container().unwrap();
        assert_eq!(tree.doc.tag(body), Some("body"));

        let bare = normalize_xml("<body><p/></body>", &mut ctx);
        assert_eq!(bare.block_container(), bare.root());
    }
}
