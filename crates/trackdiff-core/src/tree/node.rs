use std::fmt;

/// An attribute on a [`DocumentNode::Element`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}=\"{}\"", self.name, self.value)
    }
}

/// Payload of one node in a [`Document`](super::Document).
///
/// Elements carry a tag and ordered attributes; children live in the arena.
/// Text nodes carry their character data and have no children.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DocumentNode {
    Element {
        tag: String,
        attributes: Vec<Attribute>,
    },
    Text(String),
}

impl DocumentNode {
    pub fn element(tag: &str) -> Self {
        Self::Element {
            tag: tag.to_string(),
            attributes: Vec::new(),
        }
    }

    pub fn element_with_attrs(tag: &str, attributes: Vec<Attribute>) -> Self {
        Self::Element {
            tag: tag.to_string(),
            attributes,
        }
    }

    pub fn text(content: &str) -> Self {
        Self::Text(content.to_string())
    }

    pub fn is_element(&self) -> bool {
        matches!(self, Self::Element { .. })
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            Self::Element { tag, .. } => Some(tag),
            Self::Text(_) => None,
        }
    }

    pub fn attributes(&self) -> &[Attribute] {
        match self {
            Self::Element { attributes, .. } => attributes,
            Self::Text(_) => &[],
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes()
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn text_content(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Element { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_exposes_tag_and_attributes() {
        let node = DocumentNode::element_with_attrs("b", vec![Attribute::new("val", "0")]);
        assert!(node.is_element());
        assert_eq!(node.tag(), Some("b"));
        assert_eq!(node.attribute("val"), Some("0"));
        assert_eq!(node.attribute("missing"), None);
    }

    #[test]
    fn text_node_has_no_tag() {
        let node = DocumentNode::text("hello");
        assert!(!node.is_element());
        assert_eq!(node.tag(), None);
        assert!(node.attributes().is_empty());
        assert_eq!(node.text_content(), Some("hello"));
    }
}
