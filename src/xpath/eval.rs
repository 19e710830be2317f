//! XPath Evaluation Engine
//!
//! Evaluates compiled XPath expressions against an XML document.

use super::axes::{matches_node_test, navigate, select_attributes};
use super::compiler::{CompiledExpr, CompiledNodeTest, Op};
use super::functions::{self, number_of};
use super::parser::{Axis, BinaryOp};
use super::value::{parse_number, XPathValue};
use crate::dom::{NodeId, XmlDocument, DOCUMENT_NODE};
use std::collections::HashSet;

/// Evaluation context
pub struct EvalContext<'a> {
    pub doc: &'a XmlDocument,
    pub context_node: NodeId,
    pub context_position: usize,
    pub context_size: usize,
}

impl<'a> EvalContext<'a> {
    /// Context rooted at `node` with position and size 1
    pub fn new(doc: &'a XmlDocument, node: NodeId) -> Self {
        EvalContext {
            doc,
            context_node: node,
            context_position: 1,
            context_size: 1,
        }
    }
}

/// Evaluate an XPath expression with the root element as context node
#[must_use = "XPath evaluation result should be used"]
pub fn evaluate(doc: &XmlDocument, xpath: &str) -> Result<XPathValue, String> {
    let context = doc.root_element_id().unwrap_or(DOCUMENT_NODE);
    evaluate_from_node(doc, context, xpath)
}

/// Evaluate an XPath expression from a specific context node
#[must_use = "XPath evaluation result should be used"]
pub fn evaluate_from_node(doc: &XmlDocument, context_node: NodeId, xpath: &str) -> Result<XPathValue, String> {
    let compiled = super::compiler::compile(xpath)?;
    evaluate_compiled(&compiled, &EvalContext::new(doc, context_node))
}

/// Evaluate a compiled expression
pub fn evaluate_compiled(expr: &CompiledExpr, ctx: &EvalContext<'_>) -> Result<XPathValue, String> {
    let mut stack: Vec<XPathValue> = Vec::with_capacity(8);

    for op in &expr.ops {
        let value = match op {
            // Absolute paths start at the document node
            Op::Root => XPathValue::single_node(DOCUMENT_NODE),

            Op::Context => XPathValue::single_node(ctx.context_node),

            Op::Navigate(axis, node_test, predicates) => {
                let input = pop(&mut stack)?;
                navigate_step(ctx.doc, input, *axis, node_test, predicates)?
            }

            Op::Predicate(pred_expr) => match pop(&mut stack)? {
                XPathValue::NodeSet(nodes) => XPathValue::NodeSet(filter_nodes(ctx.doc, nodes, pred_expr)?),
                other => return Err(format!("Predicate applied to {}, expected a node-set", other.type_name())),
            },

            Op::Union => {
                let right = pop(&mut stack)?;
                let left = pop(&mut stack)?;
                union(left, right)?
            }

            Op::Number(n) => XPathValue::Number(*n),

            Op::String(s) => XPathValue::String(s.clone()),

            Op::Variable(name) => return Err(format!("Unbound variable: ${}", name)),

            Op::Negate => {
                let val = pop(&mut stack)?;
                XPathValue::Number(-number_of(ctx.doc, &val))
            }

            Op::Binary(op) => {
                let right = pop(&mut stack)?;
                let left = pop(&mut stack)?;
                binary(ctx.doc, *op, &left, &right)
            }

            Op::Call(name, arg_count) => {
                let split = stack
                    .len()
                    .checked_sub(*arg_count)
                    .ok_or_else(|| format!("Missing arguments for {}()", name))?;
                let args = stack.split_off(split);
                functions::call(
                    name,
                    args,
                    ctx.doc,
                    ctx.context_node,
                    ctx.context_position,
                    ctx.context_size,
                )?
            }
        };
        stack.push(value);
    }

    pop(&mut stack)
}

fn pop(stack: &mut Vec<XPathValue>) -> Result<XPathValue, String> {
    stack.pop().ok_or_else(|| "Malformed expression: operand stack underflow".to_string())
}

fn navigate_step(
    doc: &XmlDocument,
    input: XPathValue,
    axis: Axis,
    node_test: &CompiledNodeTest,
    predicates: &[CompiledExpr],
) -> Result<XPathValue, String> {
    let nodes = match input {
        XPathValue::NodeSet(nodes) => nodes,
        other => return Err(format!("Location step applied to {}, expected a node-set", other.type_name())),
    };

    if axis == Axis::Attribute {
        let mut selected = Vec::new();
        for node in nodes {
            select_attributes(doc, node, node_test, &mut selected);
        }
        return Ok(XPathValue::Attributes(selected));
    }

    let mut seen = HashSet::with_capacity(nodes.len());
    let mut result = Vec::with_capacity(nodes.len());
    for node in nodes {
        let mut candidates: Vec<NodeId> = navigate(doc, node, axis)
            .into_iter()
            .filter(|&candidate| matches_node_test(doc, candidate, node_test))
            .collect();
        // Proximity positions follow axis order, so predicates run before merging
        for pred in predicates {
            candidates = filter_nodes(doc, candidates, pred)?;
        }
        result.extend(candidates.into_iter().filter(|&c| seen.insert(c)));
    }
    // Node ids are allocated in document order
    result.sort_unstable();
    Ok(XPathValue::NodeSet(result))
}

/// Keep the nodes for which `pred` holds, numbering positions in the given order.
/// A numeric predicate result is compared against the position.
fn filter_nodes(doc: &XmlDocument, nodes: Vec<NodeId>, pred: &CompiledExpr) -> Result<Vec<NodeId>, String> {
    let size = nodes.len();
    let mut filtered = Vec::new();

    for (i, node) in nodes.into_iter().enumerate() {
        let pred_ctx = EvalContext {
            doc,
            context_node: node,
            context_position: i + 1,
            context_size: size,
        };

        let include = match evaluate_compiled(pred, &pred_ctx)? {
            XPathValue::Number(n) => (i + 1) as f64 == n,
            other => other.to_boolean(),
        };
        if include {
            filtered.push(node);
        }
    }

    Ok(filtered)
}

fn union(left: XPathValue, right: XPathValue) -> Result<XPathValue, String> {
    match (left, right) {
        (XPathValue::NodeSet(l), XPathValue::NodeSet(r)) => {
            let mut seen: HashSet<NodeId> = l.iter().copied().collect();
            let mut result = l;
            result.extend(r.into_iter().filter(|n| seen.insert(*n)));
            result.sort_unstable();
            Ok(XPathValue::NodeSet(result))
        }
        (XPathValue::Attributes(mut l), XPathValue::Attributes(r)) => {
            let mut seen: HashSet<(NodeId, usize)> = l.iter().map(|a| (a.owner, a.index)).collect();
            l.extend(r.into_iter().filter(|a| seen.insert((a.owner, a.index))));
            l.sort_by_key(|a| (a.owner, a.index));
            Ok(XPathValue::Attributes(l))
        }
        (l, r) => Err(format!(
            "Union requires two node-sets, got {} and {}",
            l.type_name(),
            r.type_name()
        )),
    }
}

fn binary(doc: &XmlDocument, op: BinaryOp, left: &XPathValue, right: &XPathValue) -> XPathValue {
    let number = |f: fn(f64, f64) -> f64| XPathValue::Number(f(number_of(doc, left), number_of(doc, right)));
    match op {
        BinaryOp::Or => XPathValue::Boolean(left.to_boolean() || right.to_boolean()),
        BinaryOp::And => XPathValue::Boolean(left.to_boolean() && right.to_boolean()),
        BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
            XPathValue::Boolean(compare(doc, op, left, right))
        }
        BinaryOp::Add => number(|a, b| a + b),
        BinaryOp::Sub => number(|a, b| a - b),
        BinaryOp::Mul => number(|a, b| a * b),
        BinaryOp::Div => number(|a, b| a / b),
        BinaryOp::Mod => number(|a, b| a % b),
    }
}

/// String-values of a node-set or attribute value list
fn member_strings(doc: &XmlDocument, value: &XPathValue) -> Option<Vec<String>> {
    match value {
        XPathValue::NodeSet(nodes) => Some(nodes.iter().map(|&n| doc.string_value(n)).collect()),
        XPathValue::Attributes(values) => Some(values.iter().map(|a| a.value.clone()).collect()),
        _ => None,
    }
}

/// XPath 1.0 comparison. Node-sets compare existentially over the
/// string-values of their members.
fn compare(doc: &XmlDocument, op: BinaryOp, left: &XPathValue, right: &XPathValue) -> bool {
    let equality = matches!(op, BinaryOp::Eq | BinaryOp::NotEq);

    match (member_strings(doc, left), member_strings(doc, right)) {
        (Some(ls), Some(rs)) => ls
            .iter()
            .any(|l| rs.iter().any(|r| compare_strings_as(op, equality, l, r))),
        (Some(members), None) => compare_members(op, &members, right, false),
        (None, Some(members)) => compare_members(op, &members, left, true),
        (None, None) => {
            if equality {
                match (left, right) {
                    (XPathValue::Boolean(_), _) | (_, XPathValue::Boolean(_)) => {
                        compare_ordered(op, left.to_boolean(), right.to_boolean())
                    }
                    (XPathValue::Number(_), _) | (_, XPathValue::Number(_)) => {
                        compare_numbers(op, left.to_number(), right.to_number())
                    }
                    _ => compare_ordered(op, left.to_string_value(), right.to_string_value()),
                }
            } else {
                compare_numbers(op, left.to_number(), right.to_number())
            }
        }
    }
}

/// Compare node-set members against a scalar. `flipped` means the members
/// were on the right-hand side of the operator.
fn compare_members(op: BinaryOp, members: &[String], scalar: &XPathValue, flipped: bool) -> bool {
    let ordered = |a: f64, b: f64| if flipped { compare_numbers(op, b, a) } else { compare_numbers(op, a, b) };

    match scalar {
        XPathValue::Boolean(b) => {
            let set = !members.is_empty();
            if flipped {
                compare_ordered_bool(op, *b, set)
            } else {
                compare_ordered_bool(op, set, *b)
            }
        }
        XPathValue::Number(n) => members.iter().any(|m| ordered(parse_number(m), *n)),
        _ => {
            let s = scalar.to_string_value();
            if matches!(op, BinaryOp::Eq | BinaryOp::NotEq) {
                members.iter().any(|m| compare_ordered(op, m.as_str(), s.as_str()))
            } else {
                let n = parse_number(&s);
                members.iter().any(|m| ordered(parse_number(m), n))
            }
        }
    }
}

fn compare_strings_as(op: BinaryOp, equality: bool, l: &str, r: &str) -> bool {
    if equality {
        compare_ordered(op, l, r)
    } else {
        compare_numbers(op, parse_number(l), parse_number(r))
    }
}

fn compare_ordered_bool(op: BinaryOp, l: bool, r: bool) -> bool {
    match op {
        BinaryOp::Eq | BinaryOp::NotEq => compare_ordered(op, l, r),
        _ => compare_numbers(op, f64::from(u8::from(l)), f64::from(u8::from(r))),
    }
}

/// Equality only; ordering operators never reach here for non-numbers
fn compare_ordered<T: PartialEq>(op: BinaryOp, l: T, r: T) -> bool {
    match op {
        BinaryOp::NotEq => l != r,
        _ => l == r,
    }
}

fn compare_numbers(op: BinaryOp, l: f64, r: f64) -> bool {
    match op {
        BinaryOp::Eq => l == r,
        BinaryOp::NotEq => l != r,
        BinaryOp::Lt => l < r,
        BinaryOp::LtEq => l <= r,
        BinaryOp::Gt => l > r,
        BinaryOp::GtEq => l >= r,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(xml: &str) -> XmlDocument {
        XmlDocument::parse_strict(xml).unwrap()
    }

    fn names(doc: &XmlDocument, xpath: &str) -> Vec<String> {
        let result = evaluate(doc, xpath).unwrap();
        result
            .as_nodeset()
            .unwrap()
            .iter()
            .map(|&id| doc.node_name(id).unwrap_or("#").to_string())
            .collect()
    }

    fn ids(doc: &XmlDocument, xpath: &str) -> Vec<String> {
        let result = evaluate(doc, xpath).unwrap();
        result
            .as_nodeset()
            .unwrap()
            .iter()
            .map(|&id| doc.get_attribute(id, "id").unwrap_or("-").to_string())
            .collect()
    }

    #[test]
    fn test_simple_path() {
        let doc = doc("<root><child/></root>");
        assert_eq!(names(&doc, "/root/child"), ["child"]);
        assert_eq!(names(&doc, "/root"), ["root"]);
    }

    #[test]
    fn test_relative_paths_start_at_root_element() {
        let doc = doc("<item><item id=\"1\"/></item>");
        assert_eq!(ids(&doc, "item"), ["1"]);
        assert_eq!(ids(&doc, "descendant-or-self::item"), ["-", "1"]);
        assert_eq!(names(&doc, "."), ["item"]);
    }

    #[test]
    fn test_descendant() {
        let doc = doc("<root><a><b/></a></root>");
        assert_eq!(names(&doc, "//b"), ["b"]);
    }

    #[test]
    fn test_positional_predicate_is_per_parent() {
        let doc = doc("<r><g><i id=\"1\"/><i id=\"2\"/></g><g><i id=\"3\"/></g></r>");
        assert_eq!(ids(&doc, "//i[1]"), ["1", "3"]);
        assert_eq!(ids(&doc, "(//i)[1]"), ["1"]);
        assert_eq!(ids(&doc, "//i[last()]"), ["2", "3"]);
    }

    #[test]
    fn test_reverse_axis_positions() {
        let doc = doc("<r><a id=\"1\"/><a id=\"2\"/><a id=\"3\"/></r>");
        assert_eq!(ids(&doc, "/r/a[3]/preceding-sibling::a[1]"), ["2"]);
        assert_eq!(ids(&doc, "/r/a[3]/preceding-sibling::a"), ["1", "2"]);
    }

    #[test]
    fn test_attribute_predicates() {
        let doc = doc("<r><a id=\"1\" flag=\"\"/><a id=\"2\"/><a id=\"3\" class=\"x y\"/></r>");
        assert_eq!(ids(&doc, "//a[@flag]"), ["1"]);
        assert_eq!(ids(&doc, "//a[@id = '2']"), ["2"]);
        assert_eq!(ids(&doc, "//a[@id != '2']"), ["1", "3"]);
        assert_eq!(ids(&doc, "//a[not(@class)]"), ["1", "2"]);
        assert_eq!(ids(&doc, "//a[@id > 1]"), ["2", "3"]);
        assert_eq!(
            ids(&doc, "//a[contains(concat(' ', normalize-space(@class), ' '), ' y ')]"),
            ["3"]
        );
    }

    #[test]
    fn test_attribute_step_yields_values() {
        let doc = doc("<r><a id=\"1\"/><a id=\"2\"/></r>");
        let result = evaluate(&doc, "//a/@id").unwrap();
        let values: Vec<_> = result.as_attributes().unwrap().iter().map(|a| a.value.as_str()).collect();
        assert_eq!(values, ["1", "2"]);
        assert_eq!(result.as_attributes().unwrap()[1].owner, doc.root_element_id().unwrap() + 2);
        assert_eq!(evaluate(&doc, "count(//@id)").unwrap(), XPathValue::Number(2.0));
    }

    #[test]
    fn test_count_and_arithmetic() {
        let doc = doc("<root><a>2</a><b>3</b><c/></root>");
        assert_eq!(evaluate(&doc, "count(/root/*)").unwrap().to_number(), 3.0);
        assert_eq!(evaluate(&doc, "/root/a * /root/b").unwrap().to_number(), 6.0);
        assert_eq!(evaluate(&doc, "7 mod 3 + 10 div 4").unwrap().to_number(), 3.5);
        assert_eq!(evaluate(&doc, "-/root/a").unwrap().to_number(), -2.0);
        assert_eq!(evaluate(&doc, "sum(/root/a | /root/b)").unwrap().to_number(), 5.0);
    }

    #[test]
    fn test_comparisons() {
        let doc = doc("<r><v>1</v><v>5</v></r>");
        let truth = |xpath: &str| evaluate(&doc, xpath).unwrap().to_boolean();
        assert!(truth("//v = 5"));
        assert!(truth("//v != 5"));
        assert!(truth("//v < 2"));
        assert!(!truth("//v > 5"));
        assert!(truth("3 > //v"));
        assert!(truth("//v = '1'"));
        assert!(truth("//v = true()"));
        assert!(truth("//missing = false()"));
        assert!(truth("'1' = 1"));
        assert!(truth("true() = 'x'"));
    }

    #[test]
    fn test_union_and_string_functions() {
        let doc = doc("<root>hello</root>");
        assert_eq!(evaluate(&doc, "string-length('hello')").unwrap().to_number(), 5.0);
        assert_eq!(evaluate(&doc, "string()").unwrap().to_string_value(), "hello");
        assert_eq!(names(&doc, "/root | /root"), ["root"]);
    }

    #[test]
    fn test_node_type_tests() {
        let doc = doc("<r>t<!--c--><?p d?><e/></r>");
        assert_eq!(evaluate(&doc, "count(/r/node())").unwrap().to_number(), 4.0);
        assert_eq!(evaluate(&doc, "count(/r/text())").unwrap().to_number(), 1.0);
        assert_eq!(evaluate(&doc, "count(//comment())").unwrap().to_number(), 1.0);
        assert_eq!(evaluate(&doc, "name(//processing-instruction('p'))").unwrap().to_string_value(), "p");
    }

    #[test]
    fn test_errors() {
        let doc = doc("<r a=\"1\"/>");
        assert!(evaluate(&doc, "$x").is_err());
        assert!(evaluate(&doc, "'a' | 'b'").is_err());
        assert!(evaluate(&doc, "@a/b").is_err());
        assert!(evaluate(&doc, "frobnicate()").is_err());
        assert!(evaluate(&doc, "'a'[1]").is_err());
    }
}
