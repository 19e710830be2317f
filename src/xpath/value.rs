//! XPath Value Types
//!
//! XPath 1.0 has four data types: node-set, boolean, number, and string.
//! Attribute steps produce a fifth, a list of selected attributes, since
//! attributes are not nodes in the arena.

use crate::dom::NodeId;

#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub enum XPathValue {
    /// A set of nodes in document order, no duplicates
    NodeSet(Vec<NodeId>),
    Boolean(bool),
    Number(f64),
    String(String),
    /// Attributes selected by an attribute step, in document order
    Attributes(Vec<AttributeValue>),
}

/// One attribute selected by an attribute step
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeValue {
    /// Element carrying the attribute
    pub owner: NodeId,
    /// Position in the owner's attribute list
    pub index: usize,
    pub value: String,
}

impl AttributeValue {
    pub fn new(owner: NodeId, index: usize, value: impl Into<String>) -> Self {
        AttributeValue {
            owner,
            index,
            value: value.into(),
        }
    }
}

impl XPathValue {
    pub fn empty_nodeset() -> Self {
        XPathValue::NodeSet(Vec::new())
    }

    pub fn single_node(id: NodeId) -> Self {
        XPathValue::NodeSet(vec![id])
    }

    /// XPath boolean() semantics
    pub fn to_boolean(&self) -> bool {
        match self {
            XPathValue::NodeSet(nodes) => !nodes.is_empty(),
            XPathValue::Boolean(b) => *b,
            XPathValue::Number(n) => *n != 0.0 && !n.is_nan(),
            XPathValue::String(s) => !s.is_empty(),
            XPathValue::Attributes(list) => !list.is_empty(),
        }
    }

    /// XPath number() semantics for values that need no document access.
    /// Node-sets yield NaN; resolve them through the document first.
    pub fn to_number(&self) -> f64 {
        match self {
            XPathValue::NodeSet(_) => f64::NAN,
            XPathValue::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            XPathValue::Number(n) => *n,
            XPathValue::String(s) => parse_number(s),
            XPathValue::Attributes(list) => list.first().map_or(f64::NAN, |a| parse_number(&a.value)),
        }
    }

    /// XPath string() semantics for values that need no document access.
    /// Node-sets yield ""; resolve them through the document first.
    pub fn to_string_value(&self) -> String {
        match self {
            XPathValue::NodeSet(_) => String::new(),
            XPathValue::Boolean(b) => if *b { "true" } else { "false" }.to_string(),
            XPathValue::Number(n) => format_number(*n),
            XPathValue::String(s) => s.clone(),
            XPathValue::Attributes(list) => list.first().map(|a| a.value.clone()).unwrap_or_default(),
        }
    }

    pub fn is_nodeset(&self) -> bool {
        matches!(self, XPathValue::NodeSet(_))
    }

    pub fn is_attributes(&self) -> bool {
        matches!(self, XPathValue::Attributes(_))
    }

    pub fn as_nodeset(&self) -> Option<&[NodeId]> {
        match self {
            XPathValue::NodeSet(nodes) => Some(nodes),
            _ => None,
        }
    }

    pub fn as_attributes(&self) -> Option<&[AttributeValue]> {
        match self {
            XPathValue::Attributes(list) => Some(list),
            _ => None,
        }
    }

    /// Name of the value's type for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            XPathValue::NodeSet(_) => "node-set",
            XPathValue::Boolean(_) => "boolean",
            XPathValue::Number(_) => "number",
            XPathValue::String(_) => "string",
            XPathValue::Attributes(_) => "attribute list",
        }
    }
}

/// String to number conversion: optional whitespace, optional minus, digits
/// with an optional fraction. Anything else is NaN.
pub fn parse_number(s: &str) -> f64 {
    let trimmed = s.trim_matches([' ', '\t', '\n', '\r']);
    let digits = trimmed.strip_prefix('-').unwrap_or(trimmed);
    let valid = !digits.is_empty()
        && digits != "."
        && digits.bytes().filter(|&b| b == b'.').count() <= 1
        && digits.bytes().all(|b| b.is_ascii_digit() || b == b'.');
    if valid {
        trimmed.parse().unwrap_or(f64::NAN)
    } else {
        f64::NAN
    }
}

/// Number to string conversion without exponent notation
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == n.trunc() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl Default for XPathValue {
    fn default() -> Self {
        XPathValue::empty_nodeset()
    }
}

impl From<bool> for XPathValue {
    fn from(b: bool) -> Self {
        XPathValue::Boolean(b)
    }
}

impl From<f64> for XPathValue {
    fn from(n: f64) -> Self {
        XPathValue::Number(n)
    }
}

impl From<String> for XPathValue {
    fn from(s: String) -> Self {
        XPathValue::String(s)
    }
}

impl From<&str> for XPathValue {
    fn from(s: &str) -> Self {
        XPathValue::String(s.to_string())
    }
}

impl From<Vec<NodeId>> for XPathValue {
    fn from(nodes: Vec<NodeId>) -> Self {
        XPathValue::NodeSet(nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boolean_conversion() {
        assert!(XPathValue::NodeSet(vec![1]).to_boolean());
        assert!(!XPathValue::NodeSet(vec![]).to_boolean());
        assert!(!XPathValue::Number(f64::NAN).to_boolean());
        assert!(!XPathValue::String(String::new()).to_boolean());
        // An attribute that is present but empty still counts
        assert!(XPathValue::Attributes(vec![AttributeValue::new(1, 0, "")]).to_boolean());
    }

    #[test]
    fn test_number_conversion() {
        assert_eq!(XPathValue::Boolean(true).to_number(), 1.0);
        assert_eq!(XPathValue::from(" 42 ").to_number(), 42.0);
        assert_eq!(XPathValue::from("-1.5").to_number(), -1.5);
        assert!(XPathValue::from("abc").to_number().is_nan());
        assert!(XPathValue::from("1e3").to_number().is_nan());
        assert!(XPathValue::from("+1").to_number().is_nan());
    }

    #[test]
    fn test_string_conversion() {
        assert_eq!(XPathValue::Boolean(false).to_string_value(), "false");
        assert_eq!(XPathValue::Number(42.0).to_string_value(), "42");
        assert_eq!(XPathValue::Number(3.25).to_string_value(), "3.25");
        assert_eq!(XPathValue::Number(-0.0).to_string_value(), "0");
        assert_eq!(XPathValue::Number(f64::INFINITY).to_string_value(), "Infinity");
        assert_eq!(
            XPathValue::Attributes(vec![AttributeValue::new(1, 0, "a"), AttributeValue::new(2, 0, "b")])
                .to_string_value(),
            "a"
        );
    }
}
