//! Subtree serialization
//!
//! Writes a node back out as XML text. Comments are rewritten so the output
//! stays well-formed even when the document was recovered by a lenient
//! parse, and the result re-parses in strict mode into an equivalent tree.

use super::document::XmlDocument;
use super::node::{NodeId, NodeKind};
use crate::core::entities::{escape_attribute_into, escape_text_into};

enum StackEntry {
    Enter(NodeId),
    Close(NodeId),
}

/// Serialize a node and everything below it.
///
/// When `node_id` is an element, namespace declarations it inherits from its
/// ancestors are copied onto it so prefixes inside the fragment still resolve.
/// Iterative, so deeply nested input cannot overflow the call stack.
pub fn serialize_node(doc: &XmlDocument, node_id: NodeId) -> String {
    let mut buf = String::with_capacity(256);
    let mut stack: Vec<StackEntry> = Vec::with_capacity(64);
    stack.push(StackEntry::Enter(node_id));

    while let Some(entry) = stack.pop() {
        match entry {
            StackEntry::Close(id) => {
                buf.push_str("</");
                buf.push_str(doc.node_name(id).unwrap_or_default());
                buf.push('>');
            }
            StackEntry::Enter(current_id) => {
                let node = match doc.get_node(current_id) {
                    Some(n) => n,
                    None => continue,
                };

                match node.kind {
                    NodeKind::Element => {
                        buf.push('<');
                        buf.push_str(doc.node_name(current_id).unwrap_or_default());

                        for (name, value) in doc.get_attribute_values(current_id) {
                            push_attribute(&mut buf, name, value);
                        }
                        if current_id == node_id {
                            for (name, value) in doc.inherited_namespaces(current_id) {
                                push_attribute(&mut buf, name, value);
                            }
                        }

                        if !node.has_children() {
                            buf.push_str("/>");
                            continue;
                        }
                        buf.push('>');
                        stack.push(StackEntry::Close(current_id));

                        let mut child_id = node.last_child;
                        while let Some(cid) = child_id {
                            stack.push(StackEntry::Enter(cid));
                            child_id = doc.prev_sibling_of(cid);
                        }
                    }
                    NodeKind::Text => {
                        escape_text_into(doc.text_content(current_id).unwrap_or_default(), &mut buf);
                    }
                    NodeKind::CData => {
                        buf.push_str("<![CDATA[");
                        buf.push_str(doc.text_content(current_id).unwrap_or_default());
                        buf.push_str("]]>");
                    }
                    NodeKind::Comment => {
                        push_comment(&mut buf, doc.text_content(current_id).unwrap_or_default());
                    }
                    NodeKind::ProcessingInstruction => {
                        buf.push_str("<?");
                        buf.push_str(doc.node_name(current_id).unwrap_or_default());
                        let data = doc.text_content(current_id).unwrap_or_default();
                        if !data.is_empty() {
                            buf.push(' ');
                            buf.push_str(data);
                        }
                        buf.push_str("?>");
                    }
                    NodeKind::Attribute => {}
                    NodeKind::Document => {
                        let mut child_id = node.last_child;
                        while let Some(cid) = child_id {
                            stack.push(StackEntry::Enter(cid));
                            child_id = doc.prev_sibling_of(cid);
                        }
                    }
                }
            }
        }
    }

    buf
}

#[inline]
fn push_attribute(buf: &mut String, name: &str, value: &str) {
    buf.push(' ');
    buf.push_str(name);
    buf.push_str("=\"");
    escape_attribute_into(value, buf);
    buf.push('"');
}

/// `--` and a trailing `-` are not allowed inside comments; a space is
/// inserted after each offending hyphen
fn push_comment(buf: &mut String, text: &str) {
    buf.push_str("<!--");
    let mut prev_hyphen = false;
    for c in text.chars() {
        if c == '-' && prev_hyphen {
            buf.push(' ');
        }
        buf.push(c);
        prev_hyphen = c == '-';
    }
    if prev_hyphen {
        buf.push(' ');
    }
    buf.push_str("-->");
}
