use super::W_NS;
use crate::error::{CompareError, Result};
use crate::tree::{Document, DocumentNode, NodeId};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;

const W_PREFIX: &str = "w";

pub fn serialize(doc: &Document) -> Result<String> {
    let bytes = serialize_bytes(doc)?;
    String::from_utf8(bytes).map_err(|e| CompareError::XmlWrite(e.to_string()))
}

pub fn serialize_bytes(doc: &Document) -> Result<Vec<u8>> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))
        .map_err(write_error)?;

    if let Some(root_id) = doc.root() {
        write_node(doc, root_id, &mut writer, true)?;
    }

    Ok(writer.into_inner().into_inner())
}

fn write_error(e: impl std::fmt::Display) -> CompareError {
    CompareError::XmlWrite(e.to_string())
}

fn qualified(name: &str) -> String {
    if name.contains(':') {
        name.to_string()
    } else {
        format!("{W_PREFIX}:{name}")
    }
}

/// Attributes of WordprocessingML elements take the `w:` prefix; those of
/// elements from other namespaces stay unqualified.
fn qualified_attribute(element: &str, name: &str) -> String {
    if element.contains(':') {
        name.to_string()
    } else {
        qualified(name)
    }
}

fn write_node<W: std::io::Write>(
    doc: &Document,
    node_id: NodeId,
    writer: &mut Writer<W>,
    is_root: bool,
) -> Result<()> {
    let Some(node_data) = doc.get(node_id) else {
        return Ok(());
    };

    match node_data {
        DocumentNode::Text(text) => {
            writer
                .write_event(Event::Text(BytesText::new(text)))
                .map_err(write_error)?;
        }
        DocumentNode::Element { tag, attributes } => {
            let tag_name = qualified(tag);
            let mut elem = BytesStart::new(tag_name.as_str());
            if is_root {
                elem.push_attribute(("xmlns:w", W_NS));
            }
            for attr in attributes {
                let attr_name = qualified_attribute(tag, &attr.name);
                elem.push_attribute((attr_name.as_str(), attr.value.as_str()));
            }

            let children: Vec<_> = doc.children(node_id).collect();
            if children.is_empty() {
                writer.write_event(Event::Empty(elem)).map_err(write_error)?;
            } else {
                writer.write_event(Event::Start(elem)).map_err(write_error)?;
                for child_id in children {
                    write_node(doc, child_id, writer, false)?;
                }
                writer
                    .write_event(Event::End(BytesEnd::new(tag_name.as_str())))
                    .map_err(write_error)?;
            }
        }
    }

    Ok(())
}
