//! Native node handles
//!
//! A [`NativeNode`] is a cheap, cloneable reference to one node of a parsed
//! document. It keeps the document alive through an `Arc`, so handles can
//! outlive the value that produced them and move freely between threads.

use super::document::{is_namespace_declaration, XmlDocument};
use super::node::{NodeId, NodeKind};
use super::serialize::serialize_node;
use crate::core::entities::escape_attribute_into;
use crate::error::Result;
use std::fmt;
use std::sync::Arc;

#[derive(Clone)]
pub struct NativeNode {
    doc: Arc<XmlDocument>,
    id: NodeId,
    /// Set for attribute handles: index into the attribute list of `id`
    attribute: Option<usize>,
}

impl NativeNode {
    pub(crate) fn new(doc: Arc<XmlDocument>, id: NodeId) -> Self {
        NativeNode {
            doc,
            id,
            attribute: None,
        }
    }

    /// Handle to attribute `index` of element `owner`
    pub(crate) fn attribute_of(doc: Arc<XmlDocument>, owner: NodeId, index: usize) -> Self {
        NativeNode {
            doc,
            id: owner,
            attribute: Some(index),
        }
    }

    /// Handle to the root element of `doc`, if it has one
    pub fn root_of(doc: Arc<XmlDocument>) -> Option<Self> {
        let id = doc.root_element_id()?;
        Some(NativeNode::new(doc, id))
    }

    pub fn document(&self) -> &Arc<XmlDocument> {
        &self.doc
    }

    /// Arena id of the node, or of the owning element for attribute handles
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> NodeKind {
        if self.attribute.is_some() {
            return NodeKind::Attribute;
        }
        self.doc.node_kind(self.id).unwrap_or(NodeKind::Document)
    }

    pub fn is_element(&self) -> bool {
        self.kind() == NodeKind::Element
    }

    pub fn is_attribute(&self) -> bool {
        self.attribute.is_some()
    }

    /// (name, value) of an attribute handle
    fn own_attribute(&self) -> Option<(&str, &str)> {
        let attr = self.doc.attributes(self.id).get(self.attribute?)?;
        let strings = self.doc.strings();
        Some((strings.get(attr.name_id), strings.get(attr.value_id)))
    }

    /// Qualified element or attribute name, PI target, or "" for other node
    /// kinds
    pub fn name(&self) -> &str {
        match self.attribute {
            Some(_) => self.own_attribute().map_or("", |(name, _)| name),
            None => self.doc.node_name(self.id).unwrap_or_default(),
        }
    }

    /// Attribute value by exact qualified name. Namespace declarations are
    /// not attributes here.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        if self.is_attribute() || is_namespace_declaration(name) {
            return None;
        }
        self.doc.get_attribute(self.id, name)
    }

    /// Attributes in document order, namespace declarations excluded
    pub fn attributes(&self) -> Vec<(&str, &str)> {
        if self.is_attribute() {
            return Vec::new();
        }
        self.doc
            .get_attribute_values(self.id)
            .into_iter()
            .filter(|(name, _)| !is_namespace_declaration(name))
            .collect()
    }

    /// Direct text and CDATA children of an element, the value of an
    /// attribute, or the content of a character-data node
    pub fn text(&self) -> String {
        match self.kind() {
            NodeKind::Element | NodeKind::Document => self.doc.direct_text(self.id),
            NodeKind::Attribute => self.own_attribute().map_or_else(String::new, |(_, value)| value.to_string()),
            _ => self.doc.text_content(self.id).unwrap_or_default().to_string(),
        }
    }

    /// All descendant text concatenated
    pub fn string_value(&self) -> String {
        if self.is_attribute() {
            return self.text();
        }
        self.doc.string_value(self.id)
    }

    pub fn element_children(&self) -> Vec<NativeNode> {
        if self.is_attribute() {
            return Vec::new();
        }
        self.doc
            .element_children(self.id)
            .map(|id| NativeNode::new(Arc::clone(&self.doc), id))
            .collect()
    }

    /// Parent element, or the owning element of an attribute; `None` at the
    /// root element
    pub fn parent(&self) -> Option<NativeNode> {
        if self.is_attribute() {
            return Some(NativeNode::new(Arc::clone(&self.doc), self.id));
        }
        let parent = self.doc.parent_of(self.id)?;
        (self.doc.node_kind(parent) == Some(NodeKind::Element))
            .then(|| NativeNode::new(Arc::clone(&self.doc), parent))
    }

    /// Standalone XML for this node and its descendants. Attribute handles
    /// serialize as `name="value"`.
    pub fn to_xml(&self) -> String {
        match self.own_attribute() {
            Some((name, value)) => {
                let mut buf = String::with_capacity(name.len() + value.len() + 3);
                buf.push_str(name);
                buf.push_str("=\"");
                escape_attribute_into(value, &mut buf);
                buf.push('"');
                buf
            }
            None => serialize_node(&self.doc, self.id),
        }
    }
}

impl PartialEq for NativeNode {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.doc, &other.doc) && self.id == other.id && self.attribute == other.attribute
    }
}

impl Eq for NativeNode {}

impl fmt::Debug for NativeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeNode")
            .field("id", &self.id)
            .field("attribute", &self.attribute)
            .field("kind", &self.kind())
            .field("name", &self.name())
            .finish()
    }
}

/// Parse a well-formed XML document and return a handle to its root element
pub fn parse(xml: &str) -> Result<NativeNode> {
    let doc = XmlDocument::parse_strict(xml)?;
    // A strict parse always yields a root element
    let id = doc.root_element_id().unwrap_or_default();
    Ok(NativeNode::new(Arc::new(doc), id))
}

/// Parse any input, recovering from malformed markup. `None` when no element
/// could be recovered.
pub fn parse_lenient(xml: &str) -> Option<NativeNode> {
    NativeNode::root_of(Arc::new(XmlDocument::parse(xml)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_returns_root_element() {
        let root = parse("<root a=\"1\"><x/>text</root>").unwrap();
        assert_eq!(root.name(), "root");
        assert_eq!(root.attribute("a"), Some("1"));
        assert_eq!(root.text(), "text");
        assert!(root.parent().is_none());
    }

    #[test]
    fn test_namespace_declarations_hidden() {
        let root = parse("<r xmlns=\"urn:x\" xmlns:p=\"urn:p\" p:k=\"v\" id=\"1\"/>").unwrap();
        assert_eq!(root.attributes(), [("p:k", "v"), ("id", "1")]);
        assert_eq!(root.attribute("xmlns"), None);
        assert_eq!(root.attribute("p:k"), Some("v"));
    }

    #[test]
    fn test_children_and_parent() {
        let root = parse("<r><a/><!--c--><b/></r>").unwrap();
        let children = root.element_children();
        assert_eq!(children.iter().map(NativeNode::name).collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(children[0].parent(), Some(root.clone()));
    }

    #[test]
    fn test_equality_is_per_document() {
        let a = parse("<r/>").unwrap();
        let b = parse("<r/>").unwrap();
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn test_attribute_handles() {
        let root = parse("<r xmlns:p=\"urn:p\" id=\"a &amp; b\"/>").unwrap();
        let id = NativeNode::attribute_of(Arc::clone(root.document()), root.id(), 1);
        assert!(id.is_attribute());
        assert_eq!(id.kind(), NodeKind::Attribute);
        assert_eq!(id.name(), "id");
        assert_eq!(id.text(), "a & b");
        assert_eq!(id.string_value(), "a & b");
        assert_eq!(id.to_xml(), "id=\"a &amp; b\"");
        assert!(id.attributes().is_empty());
        assert!(id.element_children().is_empty());
        assert_eq!(id.parent(), Some(root.clone()));
        assert_ne!(id, root);
    }

    #[test]
    fn test_parse_error_offset() {
        let err = parse("<a>1 < 2</a>").unwrap_err();
        match err {
            crate::Error::Parse(e) => assert_eq!(e.offset, 5),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_lenient() {
        let root = parse_lenient("<a><b>x</a>").unwrap();
        assert_eq!(root.name(), "a");
        assert!(parse_lenient("just text").is_none());
    }

    #[test]
    fn test_handles_are_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<NativeNode>();
    }
}
