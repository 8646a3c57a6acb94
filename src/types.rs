//! The XML tree model shared by the binary decoder, the textual fallback
//! parser and the serializer.

/// Handle to a node inside an [`XmlTree`]. Handles are only meaningful for
/// the tree that created them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeId(usize);

/// Receiver for decoded document structure.
///
/// The decoder appends elements, attributes and text strictly in stream
/// order and never removes or merges anything. In particular it does not
/// deduplicate `xmlns:*` attributes, so sibling elements can legitimately
/// receive identical namespace declarations.
pub trait TreeSink {
    type ElementId: Copy;

    /// The synthetic document node that top-level elements attach to.
    fn root(&self) -> Self::ElementId;

    /// Appends an ordered child element and returns its handle.
    fn add_child_element(&mut self, parent: Self::ElementId, name: &str) -> Self::ElementId;

    /// Appends an attribute. Order is preserved and duplicates are kept.
    fn add_attribute(&mut self, element: Self::ElementId, name: &str, value: &str);

    /// Appends a text child.
    fn add_text(&mut self, element: Self::ElementId, text: &str);
}

/// An ordered child of an element: a nested element or a run of text.
#[derive(Debug, PartialEq, Eq)]
pub enum XmlChild {
    Element(NodeId),
    Text(String),
}

/// One element node. Attribute names are fully qualified (`android:label`,
/// `xmlns:android`); the tree does not model namespaces beyond that.
#[derive(Debug, Default)]
pub struct XmlNode {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlChild>,
}

/// An arena-backed XML document. Node 0 is the synthetic document node; a
/// well-formed document has exactly one element child there.
#[derive(Debug)]
pub struct XmlTree {
    nodes: Vec<XmlNode>,
}

impl XmlTree {
    pub fn new() -> Self {
        XmlTree {
            nodes: vec![XmlNode::default()],
        }
    }

    pub fn node(&self, id: NodeId) -> &XmlNode {
        &self.nodes[id.0]
    }

    /// The document's root element, when one exists.
    pub fn document_element(&self) -> Option<NodeId> {
        self.child_elements(self.root()).next()
    }

    /// Child elements of `id`, in document order.
    pub fn child_elements(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.node(id).children.iter().filter_map(|child| match child {
            XmlChild::Element(id) => Some(*id),
            XmlChild::Text(_) => None,
        })
    }

    /// First child element of `id` with the given name.
    pub fn find_child(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.child_elements(id).find(|&child| self.node(child).name == name)
    }

    /// Value of the first attribute with the given qualified name.
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.node(id)
            .attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// First text child of `id`.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.node(id).children.iter().find_map(|child| match child {
            XmlChild::Text(text) => Some(text.as_str()),
            XmlChild::Element(_) => None,
        })
    }
}

impl Default for XmlTree {
    fn default() -> Self {
        XmlTree::new()
    }
}

impl TreeSink for XmlTree {
    type ElementId = NodeId;

    fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn add_child_element(&mut self, parent: NodeId, name: &str) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(XmlNode {
            name: name.to_string(),
            attributes: Vec::new(),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(XmlChild::Element(id));
        id
    }

    fn add_attribute(&mut self, element: NodeId, name: &str, value: &str) {
        self.nodes[element.0]
            .attributes
            .push((name.to_string(), value.to_string()));
    }

    fn add_text(&mut self, element: NodeId, text: &str) {
        self.nodes[element.0]
            .children
            .push(XmlChild::Text(text.to_string()));
    }
}
