//! Textual XML support: the fallback parser for inputs that are not binary
//! XML, and the serializer that turns decoded trees back into readable
//! documents.

use std::fmt;

use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Error as QuickXmlError, Reader, Writer};

use crate::types::{NodeId, TreeSink, XmlChild, XmlTree};

/// Result alias for textual XML operations.
pub type TextXmlResult<T> = Result<T, TextXmlError>;

/// Errors surfaced by the textual XML parser and serializer.
#[derive(Debug)]
pub enum TextXmlError {
    /// The underlying XML reader or writer failed.
    Xml(String),
    /// The document structure is unusable (unbalanced tags, no root).
    Malformed(String),
}

impl fmt::Display for TextXmlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextXmlError::Xml(msg) => write!(f, "XML error: {msg}"),
            TextXmlError::Malformed(msg) => write!(f, "malformed XML document: {msg}"),
        }
    }
}

impl std::error::Error for TextXmlError {}

impl From<QuickXmlError> for TextXmlError {
    fn from(value: QuickXmlError) -> Self {
        TextXmlError::Xml(value.to_string())
    }
}

impl From<AttrError> for TextXmlError {
    fn from(value: AttrError) -> Self {
        TextXmlError::Xml(value.to_string())
    }
}

/// Parses a plain-text XML document into an [`XmlTree`].
///
/// Qualified names are kept verbatim; no namespace processing happens on
/// this path. Comments, processing instructions and the doctype are dropped,
/// and surrounding whitespace is trimmed from text content.
pub fn parse_document(xml: &str) -> TextXmlResult<XmlTree> {
    let mut reader = Reader::from_reader(xml.as_bytes());
    reader.config_mut().trim_text(true);
    let mut buffer = Vec::new();
    let mut tree = XmlTree::new();
    let mut stack = vec![tree.root()];

    loop {
        match reader.read_event_into(&mut buffer)? {
            Event::Start(start) => {
                let parent = *stack.last().ok_or_else(stack_underflow)?;
                let id = open_element(&mut tree, parent, &start)?;
                stack.push(id);
            }
            Event::Empty(start) => {
                let parent = *stack.last().ok_or_else(stack_underflow)?;
                open_element(&mut tree, parent, &start)?;
            }
            Event::End(_) => {
                if stack.len() <= 1 {
                    return Err(TextXmlError::Malformed(
                        "unbalanced end tag".to_string(),
                    ));
                }
                stack.pop();
            }
            Event::Text(text) => {
                if stack.len() > 1 {
                    let content = text.unescape()?;
                    if !content.is_empty() {
                        let current = *stack.last().ok_or_else(stack_underflow)?;
                        tree.add_text(current, &content);
                    }
                }
            }
            Event::CData(cdata) => {
                if stack.len() > 1 {
                    let content = std::str::from_utf8(cdata.as_ref())
                        .map_err(|err| TextXmlError::Malformed(err.to_string()))?;
                    let current = *stack.last().ok_or_else(stack_underflow)?;
                    tree.add_text(current, content);
                }
            }
            Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
            Event::Eof => break,
        }
        buffer.clear();
    }

    if stack.len() != 1 {
        return Err(TextXmlError::Malformed(
            "unclosed elements at end of document".to_string(),
        ));
    }
    if tree.document_element().is_none() {
        return Err(TextXmlError::Malformed(
            "document has no root element".to_string(),
        ));
    }
    Ok(tree)
}

fn stack_underflow() -> TextXmlError {
    TextXmlError::Malformed("element stack underflow".to_string())
}

fn open_element(
    tree: &mut XmlTree,
    parent: NodeId,
    start: &BytesStart<'_>,
) -> TextXmlResult<NodeId> {
    let name_ref = start.name();
    let name = std::str::from_utf8(name_ref.as_ref())
        .map_err(|err| TextXmlError::Malformed(err.to_string()))?;
    let id = tree.add_child_element(parent, name);
    for attr in start.attributes() {
        let attr = attr?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|err| TextXmlError::Malformed(err.to_string()))?;
        let value = attr.unescape_value()?;
        tree.add_attribute(id, key, &value);
    }
    Ok(id)
}

/// Serializes a tree as indented textual XML with a standard declaration.
pub fn write_document(tree: &XmlTree) -> TextXmlResult<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
        .map_err(|err| TextXmlError::Xml(err.to_string()))?;
    for id in tree.child_elements(tree.root()) {
        write_element(tree, id, &mut writer)?;
    }
    String::from_utf8(writer.into_inner())
        .map_err(|err| TextXmlError::Malformed(err.to_string()))
}

fn write_element(
    tree: &XmlTree,
    id: NodeId,
    writer: &mut Writer<Vec<u8>>,
) -> TextXmlResult<()> {
    let node = tree.node(id);
    let mut start = BytesStart::new(node.name.as_str());
    for (key, value) in &node.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }
    if node.children.is_empty() {
        writer
            .write_event(Event::Empty(start))
            .map_err(|err| TextXmlError::Xml(err.to_string()))?;
        return Ok(());
    }
    writer
        .write_event(Event::Start(start))
        .map_err(|err| TextXmlError::Xml(err.to_string()))?;
    for child in &node.children {
        match child {
            XmlChild::Element(child_id) => write_element(tree, *child_id, writer)?,
            XmlChild::Text(text) => {
                writer
                    .write_event(Event::Text(BytesText::new(text)))
                    .map_err(|err| TextXmlError::Xml(err.to_string()))?;
            }
        }
    }
    writer
        .write_event(Event::End(BytesEnd::new(node.name.as_str())))
        .map_err(|err| TextXmlError::Xml(err.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_document() {
        let xml = r#"<manifest package="com.example">
            <application android:label="Demo &amp; Co">
                <activity android:name=".Main"/>
            </application>
        </manifest>"#;
        let tree = parse_document(xml).unwrap();
        let manifest = tree.document_element().unwrap();
        assert_eq!(tree.node(manifest).name, "manifest");
        assert_eq!(tree.attribute(manifest, "package"), Some("com.example"));
        let app = tree.find_child(manifest, "application").unwrap();
        assert_eq!(tree.attribute(app, "android:label"), Some("Demo & Co"));
        let activity = tree.find_child(app, "activity").unwrap();
        assert_eq!(tree.attribute(activity, "android:name"), Some(".Main"));
    }

    #[test]
    fn parses_text_content() {
        let tree = parse_document("<a><b>  hello  </b></a>").unwrap();
        let a = tree.document_element().unwrap();
        let b = tree.find_child(a, "b").unwrap();
        assert_eq!(tree.text(b), Some("hello"));
    }

    #[test]
    fn rejects_unbalanced_documents() {
        assert!(parse_document("<a><b></a>").is_err());
        assert!(parse_document("<a>").is_err());
        assert!(parse_document("").is_err());
    }

    #[test]
    fn writes_indented_document_with_declaration() {
        let mut tree = XmlTree::new();
        let root = tree.root();
        let manifest = tree.add_child_element(root, "manifest");
        tree.add_attribute(manifest, "xmlns:android", "urn:android");
        let app = tree.add_child_element(manifest, "application");
        tree.add_attribute(app, "android:label", "a<b");

        let xml = write_document(&tree).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
        assert!(xml.contains("<manifest xmlns:android=\"urn:android\">"));
        assert!(xml.contains("<application android:label=\"a&lt;b\"/>"));
        assert!(xml.contains("</manifest>"));
    }

    #[test]
    fn roundtrips_through_text() {
        let mut tree = XmlTree::new();
        let root = tree.root();
        let elem = tree.add_child_element(root, "resources");
        let item = tree.add_child_element(elem, "string");
        tree.add_attribute(item, "name", "app_name");
        tree.add_text(item, "Demo");

        let xml = write_document(&tree).unwrap();
        let reparsed = parse_document(&xml).unwrap();
        let resources = reparsed.document_element().unwrap();
        let string = reparsed.find_child(resources, "string").unwrap();
        assert_eq!(reparsed.attribute(string, "name"), Some("app_name"));
        assert_eq!(reparsed.text(string), Some("Demo"));
    }
}
