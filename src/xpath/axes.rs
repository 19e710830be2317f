//! XPath Axes Implementation
//!
//! Node axes return nodes in axis order: document order for forward axes,
//! nearest-first for reverse axes. Attributes are not arena nodes, so the
//! attribute axis is handled by the evaluator through [`select_attributes`].
//!
//! Node ids are allocated in document order while parsing, which lets
//! `following` and `preceding` work on id ranges.

use super::compiler::CompiledNodeTest;
use super::parser::Axis;
use super::value::AttributeValue;
use crate::dom::{is_namespace_declaration, NodeId, NodeKind, XmlDocument};

/// Navigate along an axis from a context node
pub fn navigate(doc: &XmlDocument, context: NodeId, axis: Axis) -> Vec<NodeId> {
    match axis {
        Axis::Child => doc.children(context).collect(),
        Axis::Descendant => doc.descendants(context).collect(),
        Axis::DescendantOrSelf => std::iter::once(context).chain(doc.descendants(context)).collect(),
        Axis::Parent => doc.parent_of(context).into_iter().collect(),
        Axis::Ancestor => ancestors(doc, context).collect(),
        Axis::AncestorOrSelf => std::iter::once(context).chain(ancestors(doc, context)).collect(),
        Axis::FollowingSibling => siblings(context, |id| doc.next_sibling_of(id)),
        Axis::PrecedingSibling => siblings(context, |id| doc.prev_sibling_of(id)),
        Axis::Following => following_axis(doc, context),
        Axis::Preceding => preceding_axis(doc, context),
        Axis::Self_ => vec![context],
        // Namespace nodes are not modelled; attributes go through select_attributes
        Axis::Attribute | Axis::Namespace => Vec::new(),
    }
}

fn ancestors(doc: &XmlDocument, context: NodeId) -> impl Iterator<Item = NodeId> + '_ {
    std::iter::successors(doc.parent_of(context), move |&id| doc.parent_of(id))
}

fn siblings(context: NodeId, next: impl Fn(NodeId) -> Option<NodeId>) -> Vec<NodeId> {
    std::iter::successors(next(context), |&id| next(id)).collect()
}

/// Every node after the context's subtree, in document order
fn following_axis(doc: &XmlDocument, context: NodeId) -> Vec<NodeId> {
    let mut current = Some(context);
    while let Some(id) = current {
        if let Some(next) = doc.next_sibling_of(id) {
            return (next..doc.node_count() as NodeId).collect();
        }
        current = doc.parent_of(id);
    }
    Vec::new()
}

/// Every node before the context that is not one of its ancestors, nearest first
fn preceding_axis(doc: &XmlDocument, context: NodeId) -> Vec<NodeId> {
    let mut excluded: Vec<NodeId> = ancestors(doc, context).collect();
    excluded.sort_unstable();
    (0..context)
        .rev()
        .filter(|id| excluded.binary_search(id).is_err())
        .collect()
}

/// Check if a node matches a node test on a non-attribute axis
pub fn matches_node_test(doc: &XmlDocument, node_id: NodeId, node_test: &CompiledNodeTest) -> bool {
    let Some(kind) = doc.node_kind(node_id) else {
        return false;
    };

    match node_test {
        CompiledNodeTest::Any => kind == NodeKind::Element,
        CompiledNodeTest::Name(name) | CompiledNodeTest::QName(name) => {
            kind == NodeKind::Element && doc.node_name(node_id) == Some(name.as_str())
        }
        CompiledNodeTest::NamespaceWildcard(prefix) => {
            kind == NodeKind::Element && doc.node_name(node_id).is_some_and(|n| n.starts_with(prefix.as_str()))
        }
        CompiledNodeTest::Node => true,
        CompiledNodeTest::Text => matches!(kind, NodeKind::Text | NodeKind::CData),
        CompiledNodeTest::Comment => kind == NodeKind::Comment,
        CompiledNodeTest::ProcessingInstruction(target) => {
            kind == NodeKind::ProcessingInstruction
                && target.as_deref().is_none_or(|t| doc.node_name(node_id) == Some(t))
        }
    }
}

/// Attributes of `node_id` selected by `node_test`, in document order.
/// Namespace declarations are not attributes.
pub fn select_attributes(doc: &XmlDocument, node_id: NodeId, node_test: &CompiledNodeTest, out: &mut Vec<AttributeValue>) {
    for (index, (name, value)) in doc.get_attribute_values(node_id).into_iter().enumerate() {
        if is_namespace_declaration(name) {
            continue;
        }
        let selected = match node_test {
            CompiledNodeTest::Any | CompiledNodeTest::Node => true,
            CompiledNodeTest::Name(n) | CompiledNodeTest::QName(n) => name == n,
            CompiledNodeTest::NamespaceWildcard(prefix) => name.starts_with(prefix.as_str()),
            _ => false,
        };
        if selected {
            out.push(AttributeValue::new(node_id, index, value));
        }
    }
}
