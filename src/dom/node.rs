//! XML Node representation
//!
//! Uses NodeId (u32) for compact, cache-friendly node references.

/// Compact node identifier (index into arena)
pub type NodeId = u32;

/// The document node always occupies slot 0
pub const DOCUMENT_NODE: NodeId = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Element,
    Text,
    CData,
    Comment,
    ProcessingInstruction,
    /// Only reported by attribute handles; the arena never stores attributes
    /// as nodes
    Attribute,
}

/// An XML node in the arena
#[derive(Debug, Clone)]
pub struct XmlNode {
    pub kind: NodeKind,
    /// Parent node (None for the document node)
    pub parent: Option<NodeId>,
    pub first_child: Option<NodeId>,
    pub last_child: Option<NodeId>,
    pub prev_sibling: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
    /// String pool id of the element name or PI target
    pub name_id: u32,
    /// String pool id of text, CDATA, comment or PI data content
    pub value_id: u32,
    /// Start of attributes in the attribute arena (elements only)
    pub attr_start: u32,
    pub attr_count: u32,
}

impl XmlNode {
    fn with_kind(kind: NodeKind, parent: Option<NodeId>) -> Self {
        XmlNode {
            kind,
            parent,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            name_id: 0,
            value_id: 0,
            attr_start: 0,
            attr_count: 0,
        }
    }

    pub fn document() -> Self {
        Self::with_kind(NodeKind::Document, None)
    }

    pub fn element(name_id: u32, parent: NodeId) -> Self {
        XmlNode {
            name_id,
            ..Self::with_kind(NodeKind::Element, Some(parent))
        }
    }

    /// Character data node (text, CDATA or comment)
    pub fn character_data(kind: NodeKind, value_id: u32, parent: NodeId) -> Self {
        XmlNode {
            value_id,
            ..Self::with_kind(kind, Some(parent))
        }
    }

    pub fn processing_instruction(name_id: u32, value_id: u32, parent: NodeId) -> Self {
        XmlNode {
            name_id,
            value_id,
            ..Self::with_kind(NodeKind::ProcessingInstruction, Some(parent))
        }
    }

    #[inline]
    pub fn is_element(&self) -> bool {
        self.kind == NodeKind::Element
    }

    /// Text or CDATA
    #[inline]
    pub fn is_text(&self) -> bool {
        matches!(self.kind, NodeKind::Text | NodeKind::CData)
    }

    #[inline]
    pub fn has_children(&self) -> bool {
        self.first_child.is_some()
    }
}

/// Stored attribute
#[derive(Debug, Clone, Copy)]
pub struct XmlAttribute {
    pub name_id: u32,
    pub value_id: u32,
}

impl XmlAttribute {
    pub fn new(name_id: u32, value_id: u32) -> Self {
        XmlAttribute { name_id, value_id }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_creation() {
        let doc = XmlNode::document();
        assert_eq!(doc.kind, NodeKind::Document);
        assert!(doc.parent.is_none());
        assert!(!doc.has_children());
    }

    #[test]
    fn test_element_node() {
        let elem = XmlNode::element(1, DOCUMENT_NODE);
        assert!(elem.is_element());
        assert_eq!(elem.parent, Some(DOCUMENT_NODE));
        assert_eq!(elem.name_id, 1);
    }

    #[test]
    fn test_character_data_kinds() {
        assert!(XmlNode::character_data(NodeKind::CData, 3, 1).is_text());
        assert!(!XmlNode::character_data(NodeKind::Comment, 3, 1).is_text());
    }
}
