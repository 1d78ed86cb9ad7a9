//! Block-level units of correlation.
//!
//! A block is a paragraph, a table, a table row, a table cell, or any other
//! body-level element (treated as opaque). Every block carries a content
//! hash: two blocks with the same hash are interchangeable for correlation.

use super::atom::ComparisonAtom;
use super::atomizer::{atomize_paragraph, empty_container_atom, leaf_atom};
use super::formatting::Formatting;
use super::normalize::NormalizedTree;
use super::settings::CompareSettings;
use crate::hash::Sha1Accumulator;
use crate::tree::{vocab, NodeId, Unid};
use crate::util::Hashable;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Paragraph,
    Table,
    Row,
    Cell,
    Opaque,
}

#[derive(Debug, Clone)]
pub struct Block {
    pub kind: BlockKind,
    pub unid: Unid,
    pub hash: String,
    /// Atoms of a paragraph or opaque block, or the single empty-container
    /// atom of a table, row or cell without children.
    pub atoms: Vec<ComparisonAtom>,
    /// Rows of a table, cells of a row, blocks of a cell.
    pub children: Vec<Block>,
}

impl Block {
    fn leaf(kind: BlockKind, unid: Unid, atoms: Vec<ComparisonAtom>) -> Self {
        let mut acc = Sha1Accumulator::new();
        acc.field(kind_tag(kind));
        for atom in &atoms {
            acc.field(atom.key()).field(&atom.formatting.signature());
        }
        Self { kind, unid, hash: acc.finish(), atoms, children: Vec::new() }
    }

    fn nested(tree: &NormalizedTree, node: NodeId, kind: BlockKind, unid: Unid, children: Vec<Block>) -> Self {
        let mut acc = Sha1Accumulator::new();
        acc.field(kind_tag(kind));
        for child in &children {
            acc.field(&child.hash);
        }
        let atoms = if children.is_empty() {
            vec![empty_container_atom(tree, node)]
        } else {
            Vec::new()
        };
        Self { kind, unid, hash: acc.finish(), atoms, children }
    }

    /// Every atom of the block in document order.
    pub fn atoms(&self) -> Vec<&ComparisonAtom> {
        let mut out = Vec::new();
        self.collect_atoms(&mut out);
        out
    }

    fn collect_atoms<'a>(&'a self, out: &mut Vec<&'a ComparisonAtom>) {
        out.extend(self.atoms.iter());
        for child in &self.children {
            child.collect_atoms(out);
        }
    }

    /// Consumes the block, yielding its atoms in document order.
    pub fn into_atoms(self) -> Vec<ComparisonAtom> {
        let mut out = self.atoms;
        for child in self.children {
            out.extend(child.into_atoms());
        }
        out
    }

    /// Distinct word keys of the block.
    pub fn word_set(&self) -> BTreeSet<&str> {
        self.atoms()
            .into_iter()
            .filter(|a| a.is_word())
            .map(|a| a.key())
            .collect()
    }
}

impl Hashable for Block {
    fn hash(&self) -> &str {
        &self.hash
    }
}

fn kind_tag(kind: BlockKind) -> &'static str {
    match kind {
        BlockKind::Paragraph => vocab::P,
        BlockKind::Table => vocab::TBL,
        BlockKind::Row => vocab::TR,
        BlockKind::Cell => vocab::TC,
        BlockKind::Opaque => "opaque",
    }
}

/// Blocks directly under `container`. Property children are skipped; they
/// belong to the container and are restored when it is rebuilt.
pub(crate) fn build_blocks(
    tree: &NormalizedTree,
    container: NodeId,
    settings: &CompareSettings,
) -> Vec<Block> {
    tree.doc
        .element_children(container)
        .filter_map(|child| build_block(tree, child, settings))
        .collect()
}

fn build_block(tree: &NormalizedTree, node: NodeId, settings: &CompareSettings) -> Option<Block> {
    let tag = tree.doc.tag(node)?;
    if vocab::is_property_container(tag) {
        return None;
    }
    let unid = tree.unid(node)?;
    let block = match tag {
        vocab::P => Block::leaf(BlockKind::Paragraph, unid, atomize_paragraph(tree, node, settings)),
        vocab::TBL => {
            let rows = tree
                .doc
                .element_children(node)
                .filter(|&r| tree.doc.tag(r) == Some(vocab::TR))
                .filter_map(|r| build_row(tree, r, settings))
                .collect();
            Block::nested(tree, node, BlockKind::Table, unid, rows)
        }
        _ => Block::leaf(
            BlockKind::Opaque,
            unid,
            vec![leaf_atom(tree, node, Formatting::new())],
        ),
    };
    Some(block)
}

fn build_row(tree: &NormalizedTree, row: NodeId, settings: &CompareSettings) -> Option<Block> {
    let cells = tree
        .doc
        .element_children(row)
        .filter(|&c| tree.doc.tag(c) == Some(vocab::TC))
        .filter_map(|c| {
            let unid = tree.unid(c)?;
            Some(Block::nested(tree, c, BlockKind::Cell, unid, build_blocks(tree, c, settings)))
        })
        .collect();
    Some(Block::nested(tree, row, BlockKind::Row, tree.unid(row)?, cells))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::context::CompareContext;
    use crate::compare::normalize::normalize;
    use crate::xml::parse;

    fn blocks_of(xml: &str) -> Vec<Block> {
        let settings = CompareSettings::default();
        let mut ctx = CompareContext::new(&settings);
        let tree = normalize(&parse(xml).unwrap(), &mut ctx).unwrap();
        let body = tree.block_container().unwrap();
        build_blocks(&tree, body, &settings)
    }

    #[test]
    fn equal_content_hashes_equal() {
        let a = blocks_of("<document><body><p><r><t>Same words</t></r></p></body></document>");
        let b = blocks_of("<document><body><p><r><t>Same words</t></r></p></body></document>");
        assert_eq!(a[0].hash, b[0].hash);
    }

    #[test]
    fn formatting_changes_the_hash() {
        let a = blocks_of("<document><body><p><r><t>word</t></r></p></body></document>");
        let b = blocks_of("<document><body><p><r><rPr><b/></rPr><t>word</t></r></p></body></document>");
        assert_ne!(a[0].hash, b[0].hash);
    }

    #[test]
    fn tables_nest_rows_cells_and_blocks() {
        let blocks = blocks_of(
            r#"<document><body>
                <tbl><tblPr/><tr><tc><p><r><t>a</t></r></p></tc><tc><p/></tc></tr></tbl>
                <sectPr/>
            </body></document>"#,
        );
        assert_eq!(blocks.len(), 1);
        let table = &blocks[0];
        assert_eq!(table.kind, BlockKind::Table);
        assert_eq!(table.children.len(), 1);
        let row = &table.children[0];
        assert_eq!(row.children.len(), 2);
        assert_eq!(row.children[0].children[0].kind, BlockKind::Paragraph);
        // "a" and two paragraph marks
        assert_eq!(table.atoms().len(), 3);
        assert_eq!(table.word_set().into_iter().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn empty_containers_carry_one_atom() {
        let blocks = blocks_of(
            r#"<document><body>
                <tbl><tr><tc><p/></tc><tc><tcPr/></tc></tr></tbl>
                <tbl><tblPr/><tblGrid/></tbl>
            </body></document>"#,
        );
        let cells = &blocks[0].children[0].children;
        assert!(cells[0].atoms.is_empty());
        assert_eq!(cells[1].atoms.len(), 1);
        assert!(cells[1].atoms[0].content.is_empty_container());

        let empty_table = &blocks[1];
        assert!(empty_table.children.is_empty());
        assert_eq!(empty_table.atoms().len(), 1);
        assert_eq!(empty_table.atoms[0].ancestor_path.last().copied(), Some(empty_table.unid));
    }

    #[test]
    fn unknown_body_elements_are_opaque() {
        let blocks = blocks_of("<document><body><sdt><sdtContent><p/></sdtContent></sdt></body></document>");
        assert_eq!(blocks[0].kind, BlockKind::Opaque);
        assert_eq!(blocks[0].atoms.len(), 1);
    }
}
