use super::{W_NS, XML_NS};
use crate::error::{CompareError, Result};
use crate::tree::{Attribute, Document, DocumentNode, NodeId};

pub fn parse(xml: &str) -> Result<Document> {
    let doc = roxmltree::Document::parse_with_options(
        xml,
        roxmltree::ParsingOptions {
            allow_dtd: true,
            ..Default::default()
        },
    )
    .map_err(|e| CompareError::XmlParse {
        message: e.to_string(),
        location: format!("line {}", e.pos().row),
    })?;

    let mut tree = Document::new();
    build_tree(doc.root_element(), &mut tree, None);
    Ok(tree)
}

fn build_tree(node: roxmltree::Node, tree: &mut Document, parent: Option<NodeId>) {
    let data = match node.node_type() {
        roxmltree::NodeType::Element => {
            let mut attributes = declared_namespaces(node);
            attributes.extend(node.attributes().map(|attr| Attribute {
                name: qualified_name(node, attr.namespace(), attr.name()),
                value: attr.value().to_string(),
            }));
            let tag = qualified_name(node, node.tag_name().namespace(), node.tag_name().name());
            DocumentNode::element_with_attrs(&tag, attributes)
        }
        roxmltree::NodeType::Text => match node.text() {
            Some(text) => DocumentNode::text(text),
            None => return,
        },
        // Comments and processing instructions carry no document content.
        _ => return,
    };

    let new_id = match parent {
        Some(parent_id) => tree.add_child(parent_id, data),
        None => tree.add_root(data),
    };

    for child in node.children() {
        build_tree(child, tree, Some(new_id));
    }
}

/// WordprocessingML and unqualified names keep their local name; names in
/// any other namespace keep the prefix they were written with.
fn qualified_name(node: roxmltree::Node, namespace: Option<&str>, local: &str) -> String {
    match namespace {
        None | Some(W_NS) => local.to_string(),
        Some(XML_NS) => format!("xml:{local}"),
        Some(uri) => match node.lookup_prefix(uri) {
            Some(prefix) if !prefix.is_empty() => format!("{prefix}:{local}"),
            _ => local.to_string(),
        },
    }
}

/// `xmlns:*` declarations first made on `node`, other than the
/// WordprocessingML namespace the writer always declares.
fn declared_namespaces(node: roxmltree::Node) -> Vec<Attribute> {
    let inherited: Vec<(Option<&str>, &str)> = node
        .parent_element()
        .map(|p| p.namespaces().map(|ns| (ns.name(), ns.uri())).collect())
        .unwrap_or_default();
    node.namespaces()
        .filter(|ns| ns.uri() != W_NS && ns.uri() != XML_NS)
        .filter(|ns| !inherited.contains(&(ns.name(), ns.uri())))
        .filter_map(|ns| {
            ns.name().map(|prefix| Attribute {
                name: format!("xmlns:{prefix}"),
                value: ns.uri().to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_strips_namespace_prefixes() {
        let xml = r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
            <w:body><w:p><w:r><w:t xml:space="preserve">Hello </w:t></w:r></w:p></w:body>
        </w:document>"#;
        let doc = parse(xml).unwrap();
        let root = doc.root().unwrap();
        assert_eq!(doc.tag(root), Some("document"));

        let t = doc
            .descendants(root)
            .find(|&n| doc.tag(n) == Some("t"))
            .unwrap();
        assert_eq!(doc.attribute(t, "xml:space"), Some("preserve"));
        assert_eq!(doc.text_content(t), "Hello ");
    }

    #[test]
    fn parse_accepts_unprefixed_markup() {
        let doc = parse(r#"<document><body><p><r><b val="0"/></r></p></body></document>"#).unwrap();
        let root = doc.root().unwrap();
        let b = doc.descendants(root).find(|&n| doc.tag(n) == Some("b")).unwrap();
        assert_eq!(doc.attribute(b, "val"), Some("0"));
    }

    #[test]
    fn parse_keeps_prefixes_of_other_namespaces() {
        let xml = r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"
                xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
            <w:body><w:p><w:r><w:drawing>
                <a:graphic xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main">
                    <a:blip r:embed="rId5" cstate="print"/>
                </a:graphic>
            </w:drawing></w:r></w:p></w:body>
        </w:document>"#;
        let doc = parse(xml).unwrap();
        let root = doc.root().unwrap();
        assert_eq!(
            doc.attribute(root, "xmlns:r"),
            Some("http://schemas.openxmlformats.org/officeDocument/2006/relationships")
        );
        assert_eq!(doc.attribute(root, "xmlns:w"), None);

        let graphic = doc.descendants(root).find(|&n| doc.tag(n) == Some("a:graphic")).unwrap();
        assert_eq!(
            doc.attribute(graphic, "xmlns:a"),
            Some("http://schemas.openxmlformats.org/drawingml/2006/main")
        );
        let blip = doc.descendants(root).find(|&n| doc.tag(n) == Some("a:blip")).unwrap();
        assert_eq!(doc.attribute(blip, "r:embed"), Some("rId5"));
        assert_eq!(doc.attribute(blip, "cstate"), Some("print"));
        assert!(doc.descendants(root).any(|n| doc.tag(n) == Some("drawing")));
    }

    #[test]
    fn parse_preserves_attribute_order() {
        let doc = parse(r#"<root a="1" b="2" c="3"/>"#).unwrap();
        let names: Vec<_> = doc
            .get(doc.root().unwrap())
            .unwrap()
            .attributes()
            .iter()
            .map(|a| a.name.clone())
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn parse_reports_location_of_malformed_input() {
        let err = parse("<root><unclosed></root>").unwrap_err();
        assert!(matches!(err, CompareError::XmlParse { .. }));
        assert!(err.to_string().contains("line 1"));
    }
}
