use super::node::DocumentNode;
use super::vocab;
use indextree::{Arena, NodeId};

/// A document tree stored in an arena and addressed by [`NodeId`].
///
/// Parent links are kept by the arena, so nodes never hold back-pointers.
#[derive(Clone, Debug, Default)]
pub struct Document {
    arena: Arena<DocumentNode>,
    root: Option<NodeId>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn set_root(&mut self, root: Option<NodeId>) {
        self.root = root;
    }

    pub fn get(&self, id: NodeId) -> Option<&DocumentNode> {
        self.arena.get(id).filter(|n| !n.is_removed()).map(|node| node.get())
    }

    pub fn add_root(&mut self, data: DocumentNode) -> NodeId {
        let id = self.arena.new_node(data);
        self.root = Some(id);
        id
    }

    pub fn add_child(&mut self, parent: NodeId, data: DocumentNode) -> NodeId {
        let child = self.arena.new_node(data);
        parent.append(child, &mut self.arena);
        child
    }

    /// Adds `data` as the first child of `parent`.
    pub fn add_first_child(&mut self, parent: NodeId, data: DocumentNode) -> NodeId {
        let child = self.arena.new_node(data);
        parent.prepend(child, &mut self.arena);
        child
    }

    pub fn tag(&self, node: NodeId) -> Option<&str> {
        self.get(node).and_then(|n| n.tag())
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.get(node).and_then(|n| n.attribute(name))
    }

    pub fn children(&self, parent: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        parent.children(&self.arena)
    }

    pub fn element_children(&self, parent: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(parent)
            .filter(move |&c| self.get(c).map(|n| n.is_element()).unwrap_or(false))
    }

    pub fn child_by_tag(&self, parent: NodeId, tag: &str) -> Option<NodeId> {
        self.children(parent).find(|&c| self.tag(c) == Some(tag))
    }

    pub fn descendants(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        node.descendants(&self.arena)
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.arena.get(node)?.parent()
    }

    pub fn ancestors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        node.ancestors(&self.arena)
    }

    /// Number of live nodes reachable from the root.
    pub fn node_count(&self) -> usize {
        self.root.map(|r| self.descendants(r).count()).unwrap_or(0)
    }

    /// Concatenated character data of every text node below `node`.
    pub fn text_content(&self, node: NodeId) -> String {
        self.descendants(node)
            .filter_map(|d| self.get(d).and_then(|n| n.text_content()))
            .collect()
    }

    /// Deep-copies the subtree at `src` into `dest`, appending it under
    /// `dest_parent` (or as the new root when `None`).
    pub fn copy_subtree(&self, src: NodeId, dest: &mut Document, dest_parent: Option<NodeId>) -> Option<NodeId> {
        let data = self.get(src)?.clone();
        let new_id = match dest_parent {
            Some(parent) => dest.add_child(parent, data),
            None => dest.add_root(data),
        };
        for child in self.children(src) {
            self.copy_subtree(child, dest, Some(new_id));
        }
        Some(new_id)
    }

    /// Paragraph text joined by newlines.
    ///
    /// Text inside `t` and `delText` counts; `tab` contributes a tab. Nested
    /// paragraphs (inside table cells) appear in document order.
    pub fn plain_text(&self) -> String {
        let Some(root) = self.root else {
            return String::new();
        };
        let paragraphs: Vec<String> = self
            .descendants(root)
            .filter(|&d| self.tag(d) == Some(vocab::P))
            .map(|p| self.inline_text(p))
            .collect();
        paragraphs.join("\n")
    }

    /// Visible text below `node`, stopping at nested paragraphs.
    pub fn inline_text(&self, node: NodeId) -> String {
        let mut text = String::new();
        for node in self.descendants(node).skip(1) {
            match self.tag(node) {
                // Nested paragraphs are reported on their own.
                Some(vocab::P) => break,
                Some(vocab::T) | Some(vocab::DEL_TEXT) => text.push_str(&self.text_content(node)),
                Some("tab") => text.push('\t'),
                _ => {}
            }
        }
        text
    }
}
