//! XML Attribute Parsing
//!
//! Parses the attribute list between an element name and its closing `>`.

use super::entities::{decode_text, decode_text_strict};
use super::scanner::{is_name_char, is_name_start_char, is_whitespace};
use memchr::memchr;
use std::borrow::Cow;

/// A parsed XML attribute
#[derive(Debug, Clone)]
pub struct Attribute<'a> {
    /// Qualified name as written (may include a prefix)
    pub name: &'a [u8],
    /// Value with entities decoded
    pub value: Cow<'a, [u8]>,
}

impl<'a> Attribute<'a> {
    pub fn new(name: &'a [u8], value: Cow<'a, [u8]>) -> Self {
        Attribute { name, value }
    }

    pub fn name_str(&self) -> Option<&str> {
        std::str::from_utf8(self.name).ok()
    }

    pub fn value_str(&self) -> Option<&str> {
        std::str::from_utf8(self.value.as_ref()).ok()
    }

    /// Namespace prefix (before the colon), if any
    pub fn prefix(&self) -> Option<&'a [u8]> {
        memchr(b':', self.name).map(|pos| &self.name[..pos])
    }

    /// True for `xmlns` and `xmlns:*` declarations
    pub fn is_namespace_declaration(&self) -> bool {
        self.name == b"xmlns" || self.name.starts_with(b"xmlns:")
    }
}

/// Parse attributes leniently: malformed names are dropped along with their
/// values, missing values become empty strings and unquoted values run to the
/// next whitespace.
pub fn parse_attributes(input: &[u8]) -> Vec<Attribute<'_>> {
    let mut attrs = Vec::new();
    let mut pos = 0;

    loop {
        pos = skip_whitespace(input, pos);
        if pos >= input.len() || input[pos] == b'/' || input[pos] == b'>' {
            break;
        }

        let name_start = pos;
        let well_formed = is_name_start_char(input[pos]);
        if well_formed {
            while pos < input.len() && is_name_char(input[pos]) {
                pos += 1;
            }
        } else {
            while pos < input.len() && !is_whitespace(input[pos]) && !matches!(input[pos], b'=' | b'/' | b'>') {
                pos += 1;
            }
        }
        let name = &input[name_start..pos];
        let mut keep = |value| {
            if well_formed {
                attrs.push(Attribute::new(name, value));
            }
        };

        pos = skip_whitespace(input, pos);
        if pos >= input.len() || input[pos] != b'=' {
            // HTML-style boolean attribute
            keep(Cow::Borrowed(b""));
            continue;
        }
        pos = skip_whitespace(input, pos + 1);
        if pos >= input.len() {
            keep(Cow::Borrowed(b""));
            break;
        }

        let quote = input[pos];
        if quote != b'"' && quote != b'\'' {
            let value_start = pos;
            while pos < input.len() && !is_whitespace(input[pos]) && input[pos] != b'>' {
                pos += 1;
            }
            keep(decode_text(&input[value_start..pos]));
            continue;
        }

        let value_start = pos + 1;
        let value_end = memchr(quote, &input[value_start..])
            .map(|i| value_start + i)
            .unwrap_or(input.len());
        keep(decode_text(&input[value_start..value_end]));
        pos = value_end + 1;
    }

    attrs
}

/// Parse attributes, rejecting anything that is not well-formed XML.
///
/// Returns the byte offset (relative to `input`) and a message on failure.
pub fn parse_attributes_strict(input: &[u8]) -> Result<Vec<Attribute<'_>>, (usize, &'static str)> {
    let mut attrs: Vec<Attribute<'_>> = Vec::new();
    let mut pos = 0;

    loop {
        let before_ws = pos;
        pos = skip_whitespace(input, pos);
        if pos >= input.len() {
            break;
        }
        if pos == before_ws && pos > 0 {
            return Err((pos, "Attributes must be separated by whitespace"));
        }

        if !is_name_start_char(input[pos]) {
            return Err((pos, "Attribute name must start with letter, underscore, or colon"));
        }
        let name_start = pos;
        while pos < input.len() && is_name_char(input[pos]) {
            pos += 1;
        }
        let name = &input[name_start..pos];

        pos = skip_whitespace(input, pos);
        if pos >= input.len() || input[pos] != b'=' {
            return Err((name_start, "Attribute value required"));
        }
        pos = skip_whitespace(input, pos + 1);

        let quote = match input.get(pos) {
            Some(&q) if q == b'"' || q == b'\'' => q,
            _ => return Err((pos, "Attribute value must be quoted")),
        };
        let value_start = pos + 1;
        let value_end = memchr(quote, &input[value_start..])
            .map(|i| value_start + i)
            .ok_or((pos, "Attribute value has mismatched quotes"))?;
        let raw = &input[value_start..value_end];
        if let Some(lt) = memchr(b'<', raw) {
            return Err((value_start + lt, "Attribute value cannot contain '<'"));
        }
        let value = decode_text_strict(raw).map_err(|msg| (value_start, msg))?;

        if attrs.iter().any(|a| a.name == name) {
            return Err((name_start, "Duplicate attribute"));
        }
        attrs.push(Attribute::new(name, value));
        pos = value_end + 1;
    }

    Ok(attrs)
}

#[inline]
fn skip_whitespace(input: &[u8], mut pos: usize) -> usize {
    while pos < input.len() && is_whitespace(input[pos]) {
        pos += 1;
    }
    pos
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_attributes() {
        let attrs = parse_attributes(b" id=\"test\" class=\"foo\"");
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[0].name_str(), Some("id"));
        assert_eq!(attrs[0].value_str(), Some("test"));
        assert_eq!(attrs[1].name_str(), Some("class"));
        assert_eq!(attrs[1].value_str(), Some("foo"));
    }

    #[test]
    fn test_single_quoted() {
        let attrs = parse_attributes(b" id='te\"st'");
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs[0].value_str(), Some("te\"st"));
    }

    #[test]
    fn test_namespace_declaration() {
        let attrs = parse_attributes(b" xmlns:xlink=\"http://www.w3.org/1999/xlink\" xlink:href=\"#a\"");
        assert_eq!(attrs.len(), 2);
        assert!(attrs[0].is_namespace_declaration());
        assert_eq!(attrs[1].prefix(), Some(b"xlink" as &[u8]));
        assert!(!attrs[1].is_namespace_declaration());
    }

    #[test]
    fn test_entity_in_value() {
        let attrs = parse_attributes(b" title=\"&lt;hello&gt;\"");
        assert_eq!(attrs[0].value_str(), Some("<hello>"));
    }

    #[test]
    fn test_lenient_boolean_and_unquoted() {
        let attrs = parse_attributes(b" checked value=on");
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[0].value_str(), Some(""));
        assert_eq!(attrs[1].value_str(), Some("on"));
    }

    #[test]
    fn test_lenient_drops_malformed_names() {
        let attrs = parse_attributes(b" 1x=\"v\" -y z=\"1\" \"q\"=w ok");
        let names: Vec<_> = attrs.iter().filter_map(Attribute::name_str).collect();
        assert_eq!(names, ["z", "ok"]);
        assert_eq!(attrs[0].value_str(), Some("1"));
    }

    #[test]
    fn test_whitespace_handling() {
        let attrs = parse_attributes(b"  id  =  \"test\"  ");
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs[0].name_str(), Some("id"));
        assert_eq!(attrs[0].value_str(), Some("test"));
    }

    #[test]
    fn test_strict_accepts_well_formed() {
        let attrs = parse_attributes_strict(b" a=\"1\" b='2'").unwrap();
        assert_eq!(attrs.len(), 2);
    }

    #[test]
    fn test_strict_errors() {
        assert!(parse_attributes_strict(b" checked").is_err());
        assert!(parse_attributes_strict(b" a=1").is_err());
        assert!(parse_attributes_strict(b" a=\"1").is_err());
        assert!(parse_attributes_strict(b" a=\"1\"b=\"2\"").is_err());
        assert!(parse_attributes_strict(b" a=\"<\"").is_err());
        assert_eq!(
            parse_attributes_strict(b" a=\"1\" a=\"2\"").unwrap_err().1,
            "Duplicate attribute"
        );
    }
}
