//! Rebuilds an annotated document from the classified atom stream.
//!
//! Atoms are grouped level by level on their ancestor paths: every group of
//! adjacent atoms sharing the unid at a level becomes one copy of that
//! element, taken from whichever normalized tree holds the unid. Inline
//! content is additionally grouped by revision so that each change becomes
//! one `ins`, `del`, `moveFrom` or `moveTo` wrapper.

use super::atom::{AtomContent, ComparisonAtom, CorrelationStatus};
use super::context::CompareContext;
use super::normalize::NormalizedTree;
use crate::error::{CompareError, Result};
use crate::revision::RevisionKind;
use crate::tree::{vocab, Attribute, Document, DocumentNode, NodeId, Unid};
use crate::util::{group_adjacent_ranges, needs_space_preserve};
use std::collections::{HashMap, HashSet};

/// Move range side: `true` for the source, `false` for the destination.
type RangeKey = (u32, bool);

/// Grouping key for inline content: one wrapper per distinct key.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RevisionKey {
    status: CorrelationStatus,
    move_group: Option<u32>,
    format: Option<(String, Option<Unid>)>,
}

pub(crate) fn reconstruct(
    atoms: &[ComparisonAtom],
    original: &NormalizedTree,
    modified: &NormalizedTree,
    ctx: &mut CompareContext,
) -> Result<Document> {
    if atoms.is_empty() {
        let mut out = Document::new();
        if let Some(root) = modified.root() {
            modified.doc.copy_subtree(root, &mut out, None);
        }
        return Ok(out);
    }

    let mut builder = Reconstructor::new(original, modified, ctx, atoms)?;
    builder.emit_blocks(None, atoms, 0)?;
    builder.finish()
}

struct Reconstructor<'a, 's> {
    original: &'a NormalizedTree,
    modified: &'a NormalizedTree,
    ctx: &'a mut CompareContext<'s>,
    out: Document,
    author: String,
    date: String,
    /// Containers above the modified block container.
    spine: HashSet<Unid>,
    open_ranges: HashMap<RangeKey, u32>,
    remaining: HashMap<RangeKey, usize>,
    range_names: HashMap<u32, String>,
}

impl<'a, 's> Reconstructor<'a, 's> {
    fn new(
        original: &'a NormalizedTree,
        modified: &'a NormalizedTree,
        ctx: &'a mut CompareContext<'s>,
        atoms: &[ComparisonAtom],
    ) -> Result<Self> {
        let spine = modified
            .block_container()
            .map(|c| modified.path_to(c).into_iter().collect())
            .unwrap_or_default();

        let mut remaining: HashMap<RangeKey, usize> = HashMap::new();
        let mut range_names = HashMap::new();
        for atom in atoms {
            if let Some(group) = &atom.move_group {
                let key = (group.id, atom.status == CorrelationStatus::MovedSource);
                *remaining.entry(key).or_default() += 1;
                range_names.insert(group.id, group.name.clone());
            }
        }
        for &(id, is_source) in remaining.keys() {
            if !remaining.contains_key(&(id, !is_source)) {
                return Err(CompareError::structural(format!(
                    "move group {id} has no {} side",
                    if is_source { "destination" } else { "source" }
                )));
            }
        }

        Ok(Self {
            original,
            modified,
            author: ctx.settings.author_name().to_string(),
            date: ctx.settings.revision_date(),
            ctx,
            out: Document::new(),
            spine,
            open_ranges: HashMap::new(),
            remaining,
            range_names,
        })
    }

    fn finish(self) -> Result<Document> {
        if let Some(((id, _), _)) = self.open_ranges.iter().next() {
            return Err(CompareError::structural(format!("move range for group {id} was never closed")));
        }
        Ok(self.out)
    }

    fn source(&self, unid: Unid) -> Result<(&'a NormalizedTree, NodeId)> {
        let modified: &'a NormalizedTree = self.modified;
        let original: &'a NormalizedTree = self.original;
        if let Some(node) = modified.node(unid) {
            return Ok((modified, node));
        }
        original
            .node(unid)
            .map(|node| (original, node))
            .ok_or_else(|| CompareError::structural(format!("element {unid} not found in either input")))
    }

    fn new_element(&mut self, parent: Option<NodeId>, data: DocumentNode) -> NodeId {
        match parent {
            Some(p) => self.out.add_child(p, data),
            None => self.out.add_root(data),
        }
    }

    fn clone_element(&mut self, parent: Option<NodeId>, tree: &NormalizedTree, node: NodeId) -> NodeId {
        let data = match tree.doc.get(node) {
            Some(DocumentNode::Element { tag, attributes }) => {
                DocumentNode::element_with_attrs(tag, attributes.clone())
            }
            _ => DocumentNode::element("unknown"),
        };
        self.new_element(parent, data)
    }

    fn revision_attrs(&mut self) -> Result<Vec<Attribute>> {
        let id = self.ctx.next_revision_id()?.to_string();
        Ok(vec![
            Attribute::new(vocab::ATTR_ID, &id),
            Attribute::new(vocab::ATTR_AUTHOR, &self.author),
            Attribute::new(vocab::ATTR_DATE, &self.date),
        ])
    }

    fn add_marker(&mut self, parent: NodeId, tag: &str) -> Result<NodeId> {
        let attrs = self.revision_attrs()?;
        Ok(self.out.add_child(parent, DocumentNode::element_with_attrs(tag, attrs)))
    }

    /// Block-level children: containers, paragraphs and body-level leaves.
    fn emit_blocks(&mut self, parent: Option<NodeId>, atoms: &[ComparisonAtom], level: usize) -> Result<()> {
        for (unid, range) in group_adjacent_ranges(atoms, |a| a.ancestor_path.get(level).copied()) {
            let group = &atoms[range];
            let unid = unid.ok_or_else(|| path_too_short(&group[0], level))?;
            let (tree, node) = self.source(unid)?;

            if is_leaf_at(&group[0], level) && !group[0].content.is_empty_container() {
                let parent = parent.ok_or_else(|| CompareError::structural("leaf atom at document root"))?;
                self.emit_inline(parent, group, level)?;
                continue;
            }
            match tree.doc.tag(node) {
                Some(vocab::P) => self.emit_paragraph(parent, tree, node, group, level)?,
                _ => self.emit_container(parent, tree, node, group, level)?,
            }
        }
        Ok(())
    }

    fn emit_container(
        &mut self,
        parent: Option<NodeId>,
        tree: &'a NormalizedTree,
        node: NodeId,
        atoms: &[ComparisonAtom],
        level: usize,
    ) -> Result<()> {
        let elem = self.clone_element(parent, tree, node);
        let on_spine = tree.unid(node).is_some_and(|u| self.spine.contains(&u));
        let is_block_container = on_spine && tree.block_container() == Some(node);

        // Children that carry no atoms: property containers, plus anything
        // beside the path down to the body.
        let mut trailing = Vec::new();
        let mut seen_content = false;
        for child in tree.doc.element_children(node) {
            let child_on_spine = tree.unid(child).is_some_and(|u| self.spine.contains(&u));
            let passthrough = tree.doc.tag(child).is_some_and(vocab::is_property_container)
                || (on_spine && !is_block_container && !child_on_spine);
            if !passthrough {
                seen_content = true;
            } else if seen_content {
                trailing.push(child);
            } else {
                tree.doc.copy_subtree(child, &mut self.out, Some(elem));
            }
        }

        match tree.doc.tag(node) {
            Some(vocab::TR) => self.tag_whole_container(elem, atoms, vocab::TR_PR, vocab::INS, vocab::DEL)?,
            Some(vocab::TC) => {
                self.tag_whole_container(elem, atoms, vocab::TC_PR, vocab::CELL_INS, vocab::CELL_DEL)?
            }
            _ => {}
        }

        // Empty-container atoms stand for this element itself and come first.
        let own = atoms.iter().take_while(|a| is_leaf_at(a, level)).count();
        self.emit_blocks(Some(elem), &atoms[own..], level + 1)?;

        for child in trailing {
            tree.doc.copy_subtree(child, &mut self.out, Some(elem));
        }
        Ok(())
    }

    /// Rows and cells whose content is entirely on one side get a marker in
    /// their property container.
    fn tag_whole_container(
        &mut self,
        elem: NodeId,
        atoms: &[ComparisonAtom],
        props_tag: &str,
        inserted_tag: &str,
        deleted_tag: &str,
    ) -> Result<()> {
        let marker = if atoms.iter().all(|a| a.status.is_removal()) {
            deleted_tag
        } else if atoms.iter().all(|a| a.status.is_addition()) {
            inserted_tag
        } else {
            return Ok(());
        };
        let props = match self.out.child_by_tag(elem, props_tag) {
            Some(p) => p,
            None => self.out.add_first_child(elem, DocumentNode::element(props_tag)),
        };
        self.add_marker(props, marker)?;
        Ok(())
    }

    fn emit_paragraph(
        &mut self,
        parent: Option<NodeId>,
        tree: &'a NormalizedTree,
        node: NodeId,
        atoms: &[ComparisonAtom],
        level: usize,
    ) -> Result<()> {
        let p = self.clone_element(parent, tree, node);
        let (mark, inline) = match atoms.split_last() {
            Some((last, rest)) if last.content.is_paragraph_mark() && is_leaf_at(last, level) => (Some(last), rest),
            _ => (None, atoms),
        };

        let source_ppr = tree.doc.child_by_tag(node, vocab::P_PR);
        let mut ppr = source_ppr.and_then(|src| tree.doc.copy_subtree(src, &mut self.out, Some(p)));

        if let Some(mark) = mark {
            if let Some(tag) = wrapper_tag(mark.status) {
                let ppr_node = *ppr.get_or_insert_with(|| self.out.add_child(p, DocumentNode::element(vocab::P_PR)));
                let rpr = match self.out.child_by_tag(ppr_node, vocab::R_PR) {
                    Some(r) => r,
                    None => self.out.add_child(ppr_node, DocumentNode::element(vocab::R_PR)),
                };
                self.add_marker(rpr, tag)?;
            } else if mark.status == CorrelationStatus::FormatChanged {
                let ppr_node = *ppr.get_or_insert_with(|| self.out.add_child(p, DocumentNode::element(vocab::P_PR)));
                self.add_paragraph_property_change(ppr_node, mark)?;
            }
        }

        self.emit_inline(p, inline, level + 1)?;

        if let Some(mark) = mark {
            if let Some(key) = range_key(mark) {
                self.open_range(p, key)?;
                self.consume(p, key, 1);
            }
        }
        Ok(())
    }

    /// `pPrChange` holding the paragraph properties of the original.
    fn add_paragraph_property_change(&mut self, ppr: NodeId, mark: &ComparisonAtom) -> Result<()> {
        let change = self.add_marker(ppr, vocab::P_PR_CHANGE)?;
        let old_ppr = self.out.add_child(change, DocumentNode::element(vocab::P_PR));
        let Some(counterpart) = &mark.counterpart else {
            return Ok(());
        };
        let Some(&p_unid) = counterpart.ancestor_path.last() else {
            return Ok(());
        };
        let (tree, p) = self.source(p_unid)?;
        if let Some(src) = tree.doc.child_by_tag(p, vocab::P_PR) {
            for child in tree.doc.element_children(src) {
                if !matches!(tree.doc.tag(child), Some(vocab::R_PR) | Some(vocab::SECT_PR)) {
                    tree.doc.copy_subtree(child, &mut self.out, Some(old_ppr));
                }
            }
        }
        Ok(())
    }

    /// Inline content, one revision wrapper per run of equal revision keys.
    fn emit_inline(&mut self, parent: NodeId, atoms: &[ComparisonAtom], level: usize) -> Result<()> {
        let groups = group_adjacent_ranges(atoms, |a| self.revision_key(a));
        for (key, range) in groups {
            let group = &atoms[range];
            match wrapper_tag(key.status) {
                None => self.emit_inline_nodes(parent, group, level)?,
                Some(tag) => {
                    let side = range_key(&group[0]);
                    if let Some(side) = side {
                        self.open_range(parent, side)?;
                    }
                    let wrapper = self.add_marker(parent, tag)?;
                    self.emit_inline_nodes(wrapper, group, level)?;
                    if let Some(side) = side {
                        self.consume(parent, side, group.len());
                    }
                }
            }
        }
        Ok(())
    }

    fn revision_key(&self, atom: &ComparisonAtom) -> RevisionKey {
        let format = atom.format_delta.as_ref().map(|delta| {
            let run = atom
                .counterpart
                .as_ref()
                .and_then(|c| self.enclosing_run(&c.ancestor_path));
            (delta.signature(), run)
        });
        RevisionKey {
            status: atom.status,
            move_group: atom.move_group.as_ref().map(|g| g.id),
            format,
        }
    }

    fn enclosing_run(&self, path: &[Unid]) -> Option<Unid> {
        path.iter().rev().copied().find(|&u| {
            self.source(u)
                .map(|(tree, node)| tree.doc.tag(node) == Some(vocab::R))
                .unwrap_or(false)
        })
    }

    fn emit_inline_nodes(&mut self, parent: NodeId, atoms: &[ComparisonAtom], level: usize) -> Result<()> {
        for (unid, range) in group_adjacent_ranges(atoms, |a| a.ancestor_path.get(level).copied()) {
            let group = &atoms[range];
            let unid = unid.ok_or_else(|| path_too_short(&group[0], level))?;
            let (tree, node) = self.source(unid)?;

            if is_leaf_at(&group[0], level) {
                tree.doc.copy_subtree(node, &mut self.out, Some(parent));
                continue;
            }
            match tree.doc.tag(node) {
                Some(vocab::R) => self.emit_run(parent, tree, node, group, level)?,
                _ => {
                    let elem = self.clone_element(Some(parent), tree, node);
                    for child in tree.doc.element_children(node) {
                        if tree.doc.tag(child).is_some_and(vocab::is_property_container) {
                            tree.doc.copy_subtree(child, &mut self.out, Some(elem));
                        }
                    }
                    self.emit_inline_nodes(elem, group, level + 1)?;
                }
            }
        }
        Ok(())
    }

    fn emit_run(
        &mut self,
        parent: NodeId,
        tree: &'a NormalizedTree,
        node: NodeId,
        atoms: &[ComparisonAtom],
        level: usize,
    ) -> Result<()> {
        let run = self.clone_element(Some(parent), tree, node);
        let mut rpr = tree
            .doc
            .child_by_tag(node, vocab::R_PR)
            .and_then(|src| tree.doc.copy_subtree(src, &mut self.out, Some(run)));

        let first = &atoms[0];
        if first.status == CorrelationStatus::FormatChanged {
            let rpr_node = *rpr.get_or_insert_with(|| self.out.add_child(run, DocumentNode::element(vocab::R_PR)));
            self.add_run_property_change(rpr_node, first)?;
        }

        let removed = first.status.is_removal();
        for (unid, range) in group_adjacent_ranges(atoms, |a| a.ancestor_path.get(level + 1).copied()) {
            let group = &atoms[range];
            let unid = unid.ok_or_else(|| path_too_short(&group[0], level + 1))?;
            let (tree, child) = self.source(unid)?;
            if matches!(group[0].content, AtomContent::Text(_)) {
                let text: String = group.iter().map(|a| a.text()).collect();
                let tag = if removed { vocab::DEL_TEXT } else { vocab::T };
                let mut attrs = Vec::new();
                if needs_space_preserve(&text) {
                    attrs.push(Attribute::new(vocab::ATTR_SPACE, "preserve"));
                }
                let t = self.out.add_child(run, DocumentNode::element_with_attrs(tag, attrs));
                self.out.add_child(t, DocumentNode::text(&text));
            } else {
                tree.doc.copy_subtree(child, &mut self.out, Some(run));
            }
        }
        Ok(())
    }

    /// `rPrChange` holding the run properties of the original.
    fn add_run_property_change(&mut self, rpr: NodeId, atom: &ComparisonAtom) -> Result<()> {
        let change = self.add_marker(rpr, vocab::R_PR_CHANGE)?;
        let old_rpr = self.out.add_child(change, DocumentNode::element(vocab::R_PR));
        let Some(run) = atom.counterpart.as_ref().and_then(|c| self.enclosing_run(&c.ancestor_path)) else {
            return Ok(());
        };
        let (tree, run) = self.source(run)?;
        if let Some(src) = tree.doc.child_by_tag(run, vocab::R_PR) {
            for child in tree.doc.element_children(src) {
                tree.doc.copy_subtree(child, &mut self.out, Some(old_rpr));
            }
        }
        Ok(())
    }

    fn open_range(&mut self, parent: NodeId, key: RangeKey) -> Result<()> {
        if self.open_ranges.contains_key(&key) {
            return Ok(());
        }
        let id = self.ctx.next_revision_id()?;
        let name = self.range_names.get(&key.0).cloned().unwrap_or_default();
        let (tag, _) = range_tags(key);
        let attrs = vec![
            Attribute::new(vocab::ATTR_ID, &id.to_string()),
            Attribute::new(vocab::ATTR_NAME, &name),
            Attribute::new(vocab::ATTR_AUTHOR, &self.author),
            Attribute::new(vocab::ATTR_DATE, &self.date),
        ];
        self.out.add_child(parent, DocumentNode::element_with_attrs(tag, attrs));
        self.open_ranges.insert(key, id);
        Ok(())
    }

    /// Counts `n` emitted atoms of a move side and closes its range after
    /// the last one.
    fn consume(&mut self, parent: NodeId, key: RangeKey, n: usize) {
        let left = self.remaining.entry(key).or_default();
        *left = left.saturating_sub(n);
        if *left > 0 {
            return;
        }
        if let Some(id) = self.open_ranges.remove(&key) {
            let (_, tag) = range_tags(key);
            self.out.add_child(
                parent,
                DocumentNode::element_with_attrs(tag, vec![Attribute::new(vocab::ATTR_ID, &id.to_string())]),
            );
        }
    }
}

fn is_leaf_at(atom: &ComparisonAtom, level: usize) -> bool {
    atom.ancestor_path.len() == level + 1
}

fn path_too_short(atom: &ComparisonAtom, level: usize) -> CompareError {
    CompareError::structural(format!(
        "atom {:?} has no ancestor at depth {level} (path length {})",
        atom.content,
        atom.ancestor_path.len()
    ))
}

fn wrapper_tag(status: CorrelationStatus) -> Option<&'static str> {
    RevisionKind::from_status(status).and_then(RevisionKind::wrapper_tag)
}

fn range_tags(key: RangeKey) -> (&'static str, &'static str) {
    let kind = if key.1 { RevisionKind::MoveSource } else { RevisionKind::MoveDestination };
    kind.range_tags().unwrap_or_default()
}

fn range_key(atom: &ComparisonAtom) -> Option<RangeKey> {
    let group = atom.move_group.as_ref()?;
    Some((group.id, atom.status == CorrelationStatus::MovedSource))
}
