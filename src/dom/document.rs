//! XML Document - Arena-based DOM representation
//!
//! Efficient DOM storage with:
//! - Arena allocation for nodes and attributes
//! - NodeId indices for traversal
//! - String interning for names, values and character data
//!
//! A document is immutable once built and is shared behind an `Arc` by
//! every [`NativeNode`](super::NativeNode) that points into it.

use super::node::{NodeId, NodeKind, XmlAttribute, XmlNode, DOCUMENT_NODE};
use super::strings::StringPool;
use crate::error::ParseError;
use crate::reader::{SliceReader, StartElement, XmlEvent};
use std::borrow::Cow;

/// URI permanently bound to the `xml` prefix
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

#[derive(Debug)]
pub struct XmlDocument {
    nodes: Vec<XmlNode>,
    attributes: Vec<XmlAttribute>,
    strings: StringPool,
    /// Root element node ID (not the document node)
    root_element: Option<NodeId>,
}

impl XmlDocument {
    fn empty() -> Self {
        XmlDocument {
            nodes: vec![XmlNode::document()],
            attributes: Vec::with_capacity(64),
            strings: StringPool::new(),
            root_element: None,
        }
    }

    /// Parse an XML document, recovering from malformed markup
    pub fn parse(input: &str) -> Self {
        let mut doc = Self::empty();
        // The lenient reader never reports errors
        let _ = doc.build(input.as_bytes(), false);
        doc
    }

    /// Parse an XML document, rejecting anything that is not well-formed
    pub fn parse_strict(input: &str) -> Result<Self, ParseError> {
        let mut doc = Self::empty();
        doc.build(input.as_bytes(), true)?;
        Ok(doc)
    }

    fn build(&mut self, input: &[u8], strict: bool) -> Result<(), ParseError> {
        let mut reader = if strict {
            SliceReader::new_strict(input)
        } else {
            SliceReader::new(input)
        };
        // stack[i + 1] is the node opened by tag_stack[i]
        let mut stack: Vec<NodeId> = vec![DOCUMENT_NODE];
        let mut tag_stack: Vec<&[u8]> = Vec::new();
        let mut seen_root = false;

        loop {
            let offset = reader.position();
            let parent = *stack.last().unwrap_or(&DOCUMENT_NODE);
            let at_top_level = stack.len() == 1;

            match reader.next_event()? {
                XmlEvent::EndDocument => break,

                XmlEvent::StartElement(elem) => {
                    if at_top_level {
                        Self::check_root(&mut seen_root, strict, offset)?;
                    }
                    let id = self.handle_element(&elem, parent);
                    stack.push(id);
                    tag_stack.push(elem.name);
                }

                XmlEvent::EmptyElement(elem) => {
                    if at_top_level {
                        Self::check_root(&mut seen_root, strict, offset)?;
                    }
                    self.handle_element(&elem, parent);
                }

                XmlEvent::EndElement(end) => {
                    if strict {
                        match tag_stack.pop() {
                            Some(open) if open == end.name => {
                                stack.pop();
                            }
                            Some(open) => {
                                return Err(ParseError::new(
                                    format!(
                                        "Tag mismatch: <{}> closed with </{}>",
                                        String::from_utf8_lossy(open),
                                        String::from_utf8_lossy(end.name)
                                    ),
                                    offset,
                                ));
                            }
                            None => {
                                return Err(ParseError::new(
                                    format!(
                                        "Unexpected end tag: </{}> without matching start tag",
                                        String::from_utf8_lossy(end.name)
                                    ),
                                    offset,
                                ));
                            }
                        }
                    } else if let Some(depth) = tag_stack.iter().rposition(|open| *open == end.name) {
                        // Implicitly close anything left open inside the matched element
                        tag_stack.truncate(depth);
                        stack.truncate(depth + 1);
                    }
                }

                XmlEvent::Text(content) => {
                    if at_top_level {
                        if strict && !content.iter().all(u8::is_ascii_whitespace) {
                            return Err(ParseError::new("Text content not allowed at document level", offset));
                        }
                        continue;
                    }
                    self.append_character_data(parent, NodeKind::Text, &lossy(&content));
                }

                XmlEvent::CData(content) => {
                    if at_top_level {
                        if strict {
                            return Err(ParseError::new("CDATA section not allowed at document level", offset));
                        }
                        continue;
                    }
                    self.append_character_data(parent, NodeKind::CData, &lossy(content));
                }

                XmlEvent::Comment(content) => {
                    self.append_character_data(parent, NodeKind::Comment, &lossy(content));
                }

                XmlEvent::ProcessingInstruction { target, data } => {
                    let name_id = self.strings.intern(&lossy(target));
                    let value_id = data.map_or(0, |d| self.strings.intern(&lossy(d)));
                    self.push_node(XmlNode::processing_instruction(name_id, value_id, parent));
                }

                XmlEvent::DocType(_) => {
                    if strict && (seen_root || !at_top_level) {
                        return Err(ParseError::new("DOCTYPE must come before root element", offset));
                    }
                }

                XmlEvent::XmlDeclaration => {}
            }
        }

        if strict {
            if let Some(open) = tag_stack.first() {
                return Err(ParseError::new(
                    format!("Unclosed tag: <{}>", String::from_utf8_lossy(open)),
                    input.len(),
                ));
            }
            if self.root_element.is_none() {
                return Err(ParseError::new("Document has no root element", input.len()));
            }
        }

        tracing::trace!(nodes = self.nodes.len(), strict, "built document");
        Ok(())
    }

    fn check_root(seen_root: &mut bool, strict: bool, offset: usize) -> Result<(), ParseError> {
        if *seen_root && strict {
            return Err(ParseError::new("Document has multiple root elements", offset));
        }
        *seen_root = true;
        Ok(())
    }

    /// Create an element node with its attributes. Duplicate attribute names
    /// keep their first position and take the last value.
    fn handle_element(&mut self, elem: &StartElement<'_>, parent: NodeId) -> NodeId {
        let name_id = self.strings.intern(&lossy(elem.name));
        let mut node = XmlNode::element(name_id, parent);

        let attr_start = self.attributes.len();
        for attr in &elem.attributes {
            let attr_name_id = self.strings.intern(&lossy(attr.name));
            let attr_value_id = self.strings.intern(&lossy(&attr.value));
            match self.attributes[attr_start..]
                .iter_mut()
                .find(|existing| existing.name_id == attr_name_id)
            {
                Some(existing) => existing.value_id = attr_value_id,
                None => self.attributes.push(XmlAttribute::new(attr_name_id, attr_value_id)),
            }
        }
        node.attr_start = attr_start as u32;
        node.attr_count = (self.attributes.len() - attr_start) as u32;

        let node_id = self.push_node(node);
        if self.root_element.is_none() && parent == DOCUMENT_NODE {
            self.root_element = Some(node_id);
        }
        node_id
    }

    /// Append text, CDATA or a comment. Adjacent text runs are merged into one node.
    fn append_character_data(&mut self, parent: NodeId, kind: NodeKind, content: &str) {
        if content.is_empty() && kind != NodeKind::Comment {
            return;
        }

        if kind == NodeKind::Text {
            let last = self.nodes[parent as usize].last_child;
            if let Some(last_id) = last.filter(|&id| self.nodes[id as usize].kind == NodeKind::Text) {
                let merged = format!("{}{}", self.strings.get(self.nodes[last_id as usize].value_id), content);
                self.nodes[last_id as usize].value_id = self.strings.intern(&merged);
                return;
            }
        }

        let value_id = self.strings.intern(content);
        self.push_node(XmlNode::character_data(kind, value_id, parent));
    }

    fn push_node(&mut self, node: XmlNode) -> NodeId {
        let parent = node.parent.unwrap_or(DOCUMENT_NODE);
        let node_id = self.nodes.len() as NodeId;
        self.nodes.push(node);
        self.link_child(parent, node_id);
        node_id
    }

    /// Link a child node to its parent
    fn link_child(&mut self, parent_id: NodeId, child_id: NodeId) {
        let last_child_opt = self.nodes[parent_id as usize].last_child;

        if let Some(last_child_id) = last_child_opt {
            self.nodes[child_id as usize].prev_sibling = Some(last_child_id);
            self.nodes[last_child_id as usize].next_sibling = Some(child_id);
        } else {
            self.nodes[parent_id as usize].first_child = Some(child_id);
        }
        self.nodes[parent_id as usize].last_child = Some(child_id);
    }

    /// Get the root element (first element child of the document node)
    pub fn root_element(&self) -> Option<&XmlNode> {
        self.root_element.map(|id| &self.nodes[id as usize])
    }

    pub fn root_element_id(&self) -> Option<NodeId> {
        self.root_element
    }

    pub fn get_node(&self, id: NodeId) -> Option<&XmlNode> {
        self.nodes.get(id as usize)
    }

    pub fn node_kind(&self, id: NodeId) -> Option<NodeKind> {
        self.get_node(id).map(|n| n.kind)
    }

    /// Qualified name of an element, or target of a processing instruction
    pub fn node_name(&self, id: NodeId) -> Option<&str> {
        let node = self.get_node(id)?;
        match node.kind {
            NodeKind::Element | NodeKind::ProcessingInstruction => Some(self.strings.get(node.name_id)),
            _ => None,
        }
    }

    /// Node name without its prefix
    pub fn node_local_name(&self, id: NodeId) -> Option<&str> {
        let name = self.node_name(id)?;
        Some(name.split_once(':').map_or(name, |(_, local)| local))
    }

    pub fn node_prefix(&self, id: NodeId) -> Option<&str> {
        self.node_name(id)?.split_once(':').map(|(prefix, _)| prefix)
    }

    /// Content of a text, CDATA, comment or processing-instruction node
    pub fn text_content(&self, id: NodeId) -> Option<&str> {
        let node = self.get_node(id)?;
        match node.kind {
            NodeKind::Document | NodeKind::Element => None,
            _ => Some(self.strings.get(node.value_id)),
        }
    }

    /// Attributes of an element, namespace declarations included
    pub fn attributes(&self, id: NodeId) -> &[XmlAttribute] {
        match self.get_node(id) {
            Some(node) => {
                let start = node.attr_start as usize;
                let end = start + node.attr_count as usize;
                self.attributes.get(start..end).unwrap_or(&[])
            }
            None => &[],
        }
    }

    pub fn get_attribute(&self, node_id: NodeId, name: &str) -> Option<&str> {
        self.attributes(node_id)
            .iter()
            .find(|attr| self.strings.get(attr.name_id) == name)
            .map(|attr| self.strings.get(attr.value_id))
    }

    /// All (name, value) pairs in document order, namespace declarations included
    pub fn get_attribute_values(&self, node_id: NodeId) -> Vec<(&str, &str)> {
        self.attributes(node_id)
            .iter()
            .map(|attr| (self.strings.get(attr.name_id), self.strings.get(attr.value_id)))
            .collect()
    }

    pub fn strings(&self) -> &StringPool {
        &self.strings
    }

    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.get_node(id)?.parent
    }

    pub fn next_sibling_of(&self, id: NodeId) -> Option<NodeId> {
        self.get_node(id)?.next_sibling
    }

    pub fn prev_sibling_of(&self, id: NodeId) -> Option<NodeId> {
        self.get_node(id)?.prev_sibling
    }

    pub fn children(&self, id: NodeId) -> ChildIter<'_> {
        let first = self.get_node(id).and_then(|n| n.first_child);
        ChildIter { doc: self, next: first }
    }

    /// Element children only, in document order
    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .filter(|&child| self.node_kind(child) == Some(NodeKind::Element))
    }

    /// All descendants in document order (depth-first, pre-order)
    pub fn descendants(&self, id: NodeId) -> DescendantIter<'_> {
        let mut stack = Vec::new();
        if let Some(node) = self.get_node(id) {
            let mut child_id = node.last_child;
            while let Some(cid) = child_id {
                stack.push(cid);
                child_id = self.get_node(cid).and_then(|n| n.prev_sibling);
            }
        }
        DescendantIter { doc: self, stack }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// XPath string-value: concatenated descendant text for documents and
    /// elements, the content itself for every other kind
    pub fn string_value(&self, id: NodeId) -> String {
        match self.node_kind(id) {
            Some(NodeKind::Document | NodeKind::Element) => self
                .descendants(id)
                .filter(|&d| self.get_node(d).is_some_and(XmlNode::is_text))
                .filter_map(|d| self.text_content(d))
                .collect(),
            Some(_) => self.text_content(id).unwrap_or_default().to_string(),
            None => String::new(),
        }
    }

    /// Text and CDATA directly under `id`, ignoring nested elements
    pub fn direct_text(&self, id: NodeId) -> String {
        self.children(id)
            .filter(|&c| self.get_node(c).is_some_and(XmlNode::is_text))
            .filter_map(|c| self.text_content(c))
            .collect()
    }

    /// Namespace URI of an element, resolved through in-scope `xmlns` declarations
    pub fn namespace_uri(&self, id: NodeId) -> Option<&str> {
        if self.node_kind(id) != Some(NodeKind::Element) {
            return None;
        }
        let declaration: Cow<'_, str> = match self.node_prefix(id) {
            Some("xml") => return Some(XML_NAMESPACE),
            Some(prefix) => Cow::Owned(format!("xmlns:{prefix}")),
            None => Cow::Borrowed("xmlns"),
        };

        let mut current = Some(id);
        while let Some(node_id) = current {
            if let Some(uri) = self.get_attribute(node_id, &declaration) {
                return (!uri.is_empty()).then_some(uri);
            }
            current = self.parent_of(node_id);
        }
        None
    }

    /// Namespace declarations visible at `id` but made on its ancestors,
    /// nearest declaration winning
    pub fn inherited_namespaces(&self, id: NodeId) -> Vec<(&str, &str)> {
        let mut declared: Vec<&str> = self
            .get_attribute_values(id)
            .into_iter()
            .filter(|(name, _)| is_namespace_declaration(name))
            .map(|(name, _)| name)
            .collect();
        let mut inherited = Vec::new();

        let mut current = self.parent_of(id);
        while let Some(node_id) = current {
            for (name, value) in self.get_attribute_values(node_id) {
                if is_namespace_declaration(name) && !declared.contains(&name) {
                    declared.push(name);
                    inherited.push((name, value));
                }
            }
            current = self.parent_of(node_id);
        }
        inherited
    }
}

/// True for `xmlns` and `xmlns:*` attribute names
#[inline]
pub fn is_namespace_declaration(name: &str) -> bool {
    name == "xmlns" || name.starts_with("xmlns:")
}

#[inline]
fn lossy(bytes: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(bytes)
}

/// Iterator over child nodes
pub struct ChildIter<'d> {
    doc: &'d XmlDocument,
    next: Option<NodeId>,
}

impl Iterator for ChildIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.next_sibling_of(current);
        Some(current)
    }
}

/// Iterator over descendant nodes (depth-first)
pub struct DescendantIter<'d> {
    doc: &'d XmlDocument,
    stack: Vec<NodeId>,
}

impl Iterator for DescendantIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.stack.pop()?;

        // Push children in reverse so the first child is visited next
        if let Some(node) = self.doc.get_node(current) {
            let mut child_id = node.last_child;
            while let Some(id) = child_id {
                self.stack.push(id);
                child_id = self.doc.prev_sibling_of(id);
            }
        }

        Some(current)
    }
}
