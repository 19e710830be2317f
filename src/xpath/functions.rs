//! XPath 1.0 Functions
//!
//! Core function library:
//!
//! Node Set Functions:
//! - position(), last(), count(), local-name(), namespace-uri(), name()
//!
//! String Functions:
//! - string(), concat(), starts-with(), contains(), substring(),
//!   substring-before(), substring-after(), string-length(),
//!   normalize-space(), translate()
//!
//! Boolean Functions:
//! - boolean(), not(), true(), false(), lang()
//!
//! Number Functions:
//! - number(), sum(), floor(), ceiling(), round()

use super::value::{parse_number, XPathValue};
use crate::dom::{NodeId, XmlDocument};

/// Evaluate a function call
pub fn call(
    name: &str,
    args: Vec<XPathValue>,
    doc: &XmlDocument,
    context: NodeId,
    position: usize,
    size: usize,
) -> Result<XPathValue, String> {
    match name {
        // Node Set Functions
        "position" => no_args(name, &args).map(|_| XPathValue::Number(position as f64)),
        "last" => no_args(name, &args).map(|_| XPathValue::Number(size as f64)),
        "count" => fn_count(&args),
        "local-name" => {
            let node = node_arg(name, &args, context)?;
            Ok(XPathValue::String(
                node.and_then(|n| doc.node_local_name(n)).unwrap_or_default().to_string(),
            ))
        }
        "namespace-uri" => {
            let node = node_arg(name, &args, context)?;
            Ok(XPathValue::String(
                node.and_then(|n| doc.namespace_uri(n)).unwrap_or_default().to_string(),
            ))
        }
        "name" => {
            let node = node_arg(name, &args, context)?;
            Ok(XPathValue::String(
                node.and_then(|n| doc.node_name(n)).unwrap_or_default().to_string(),
            ))
        }
        "id" => Err("id() is not supported: documents carry no DTD attribute types".to_string()),

        // String Functions
        "string" => Ok(XPathValue::String(optional_string_arg(name, &args, doc, context)?)),
        "concat" => fn_concat(&args, doc),
        "starts-with" => {
            let [s, prefix] = string_args::<2>(name, &args, doc)?;
            Ok(XPathValue::Boolean(s.starts_with(prefix.as_str())))
        }
        "contains" => {
            let [s, pattern] = string_args::<2>(name, &args, doc)?;
            Ok(XPathValue::Boolean(s.contains(pattern.as_str())))
        }
        "substring" => fn_substring(&args, doc),
        "substring-before" => {
            let [s, pattern] = string_args::<2>(name, &args, doc)?;
            let result = s.find(pattern.as_str()).map_or("", |pos| &s[..pos]);
            Ok(XPathValue::String(result.to_string()))
        }
        "substring-after" => {
            let [s, pattern] = string_args::<2>(name, &args, doc)?;
            let result = s.find(pattern.as_str()).map_or("", |pos| &s[pos + pattern.len()..]);
            Ok(XPathValue::String(result.to_string()))
        }
        "string-length" => {
            let s = optional_string_arg(name, &args, doc, context)?;
            Ok(XPathValue::Number(s.chars().count() as f64))
        }
        "normalize-space" => {
            let s = optional_string_arg(name, &args, doc, context)?;
            Ok(XPathValue::String(s.split_ascii_whitespace().collect::<Vec<_>>().join(" ")))
        }
        "translate" => fn_translate(&args, doc),

        // Boolean Functions
        "boolean" => one_arg(name, &args).map(|v| XPathValue::Boolean(v.to_boolean())),
        "not" => one_arg(name, &args).map(|v| XPathValue::Boolean(!v.to_boolean())),
        "true" => no_args(name, &args).map(|_| XPathValue::Boolean(true)),
        "false" => no_args(name, &args).map(|_| XPathValue::Boolean(false)),
        "lang" => fn_lang(&args, doc, context),

        // Number Functions
        "number" => {
            let n = match args.as_slice() {
                [] => parse_number(&doc.string_value(context)),
                [value] => number_of(doc, value),
                _ => return Err("number() takes 0 or 1 arguments".to_string()),
            };
            Ok(XPathValue::Number(n))
        }
        "sum" => fn_sum(&args, doc),
        "floor" => one_arg(name, &args).map(|v| XPathValue::Number(number_of(doc, v).floor())),
        "ceiling" => one_arg(name, &args).map(|v| XPathValue::Number(number_of(doc, v).ceil())),
        "round" => one_arg(name, &args).map(|v| XPathValue::Number(xpath_round(number_of(doc, v)))),

        _ => Err(format!("Unknown function: {}()", name)),
    }
}

/// String-value of any XPath value; node-sets use their first node
pub(crate) fn string_of(doc: &XmlDocument, value: &XPathValue) -> String {
    match value {
        XPathValue::NodeSet(nodes) => nodes.first().map(|&n| doc.string_value(n)).unwrap_or_default(),
        _ => value.to_string_value(),
    }
}

/// Number-value of any XPath value; node-sets use their first node
pub(crate) fn number_of(doc: &XmlDocument, value: &XPathValue) -> f64 {
    match value {
        XPathValue::NodeSet(_) => parse_number(&string_of(doc, value)),
        _ => value.to_number(),
    }
}

/// XPath round(): nearest integer, halves towards positive infinity
pub(crate) fn xpath_round(n: f64) -> f64 {
    if n.is_finite() {
        (n + 0.5).floor()
    } else {
        n
    }
}

fn no_args(name: &str, args: &[XPathValue]) -> Result<(), String> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(format!("{}() takes no arguments", name))
    }
}

fn one_arg<'v>(name: &str, args: &'v [XPathValue]) -> Result<&'v XPathValue, String> {
    match args {
        [value] => Ok(value),
        _ => Err(format!("{}() requires exactly 1 argument", name)),
    }
}

fn string_args<const N: usize>(name: &str, args: &[XPathValue], doc: &XmlDocument) -> Result<[String; N], String> {
    if args.len() != N {
        return Err(format!("{}() requires exactly {} arguments", name, N));
    }
    Ok(std::array::from_fn(|i| string_of(doc, &args[i])))
}

fn optional_string_arg(name: &str, args: &[XPathValue], doc: &XmlDocument, context: NodeId) -> Result<String, String> {
    match args {
        [] => Ok(doc.string_value(context)),
        [value] => Ok(string_of(doc, value)),
        _ => Err(format!("{}() takes 0 or 1 arguments", name)),
    }
}

/// Node argument of the name functions: the context node when omitted, the
/// first node of a node-set otherwise (`None` for an empty set)
fn node_arg(name: &str, args: &[XPathValue], context: NodeId) -> Result<Option<NodeId>, String> {
    match args {
        [] => Ok(Some(context)),
        [XPathValue::NodeSet(nodes)] => Ok(nodes.first().copied()),
        [other] => Err(format!("{}() argument must be a node-set, got {}", name, other.type_name())),
        _ => Err(format!("{}() takes 0 or 1 arguments", name)),
    }
}

fn fn_count(args: &[XPathValue]) -> Result<XPathValue, String> {
    match args {
        [XPathValue::NodeSet(nodes)] => Ok(XPathValue::Number(nodes.len() as f64)),
        [XPathValue::Attributes(values)] => Ok(XPathValue::Number(values.len() as f64)),
        [other] => Err(format!("count() argument must be a node-set, got {}", other.type_name())),
        _ => Err("count() requires exactly 1 argument".to_string()),
    }
}

fn fn_concat(args: &[XPathValue], doc: &XmlDocument) -> Result<XPathValue, String> {
    if args.len() < 2 {
        return Err("concat() requires at least 2 arguments".to_string());
    }
    Ok(XPathValue::String(args.iter().map(|a| string_of(doc, a)).collect()))
}

/// Characters at positions p with round(start) <= p < round(start) + round(length)
fn fn_substring(args: &[XPathValue], doc: &XmlDocument) -> Result<XPathValue, String> {
    let (s, start, length) = match args {
        [s, start] => (s, start, None),
        [s, start, length] => (s, start, Some(length)),
        _ => return Err("substring() requires 2 or 3 arguments".to_string()),
    };

    let s = string_of(doc, s);
    let start = xpath_round(number_of(doc, start));
    let end = length.map(|len| start + xpath_round(number_of(doc, len)));

    let result = s
        .chars()
        .enumerate()
        .filter(|(i, _)| {
            let p = (*i + 1) as f64;
            p >= start && end.is_none_or(|end| p < end)
        })
        .map(|(_, c)| c)
        .collect();
    Ok(XPathValue::String(result))
}

fn fn_translate(args: &[XPathValue], doc: &XmlDocument) -> Result<XPathValue, String> {
    let [s, from, to] = string_args::<3>("translate", args, doc)?;
    let from: Vec<char> = from.chars().collect();
    let to: Vec<char> = to.chars().collect();

    let result = s
        .chars()
        .filter_map(|c| match from.iter().position(|&fc| fc == c) {
            Some(pos) => to.get(pos).copied(),
            None => Some(c),
        })
        .collect();
    Ok(XPathValue::String(result))
}

/// True when the nearest xml:lang on the ancestor-or-self axis equals the
/// argument or starts with it followed by `-`, ignoring case
fn fn_lang(args: &[XPathValue], doc: &XmlDocument, context: NodeId) -> Result<XPathValue, String> {
    let target = string_of(doc, one_arg("lang", args)?).to_lowercase();

    let mut node = Some(context);
    while let Some(id) = node {
        if let Some(lang) = doc.get_attribute(id, "xml:lang") {
            let lang = lang.to_lowercase();
            let matched = lang == target
                || (lang.starts_with(&target) && lang.as_bytes().get(target.len()) == Some(&b'-'));
            return Ok(XPathValue::Boolean(matched));
        }
        node = doc.parent_of(id);
    }
    Ok(XPathValue::Boolean(false))
}

fn fn_sum(args: &[XPathValue], doc: &XmlDocument) -> Result<XPathValue, String> {
    match args {
        [XPathValue::NodeSet(nodes)] => Ok(XPathValue::Number(
            nodes.iter().map(|&n| parse_number(&doc.string_value(n))).sum(),
        )),
        [XPathValue::Attributes(values)] => Ok(XPathValue::Number(
            values.iter().map(|a| parse_number(&a.value)).sum(),
        )),
        [other] => Err(format!("sum() argument must be a node-set, got {}", other.type_name())),
        _ => Err("sum() requires exactly 1 argument".to_string()),
    }
}
