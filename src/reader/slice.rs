//! Slice Reader
//!
//! Pull parser over a byte slice. Names, comments and CDATA borrow from the
//! input; text and attribute values are only copied when entities need
//! decoding.
//!
//! Lenient mode recovers from malformed markup (stray `<`, unterminated
//! constructs, unquoted attributes). Strict mode reports the first
//! well-formedness problem with its byte offset.

use super::events::{EndElement, StartElement, XmlEvent};
use crate::core::attributes::{parse_attributes, parse_attributes_strict, Attribute};
use crate::core::entities::{decode_text, decode_text_strict};
use crate::core::scanner::Scanner;
use crate::error::ParseError;
use std::borrow::Cow;

pub struct SliceReader<'a> {
    scanner: Scanner<'a>,
    strict: bool,
    done: bool,
}

impl<'a> SliceReader<'a> {
    /// Create a new slice reader (lenient mode)
    pub fn new(input: &'a [u8]) -> Self {
        SliceReader {
            scanner: Scanner::new(input),
            strict: false,
            done: false,
        }
    }

    /// Create a new slice reader in strict mode
    pub fn new_strict(input: &'a [u8]) -> Self {
        SliceReader {
            strict: true,
            ..Self::new(input)
        }
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Byte offset of the next unread input
    pub fn position(&self) -> usize {
        self.scanner.position()
    }

    /// Get the next XML event
    pub fn next_event(&mut self) -> Result<XmlEvent<'a>, ParseError> {
        loop {
            if self.scanner.is_eof() {
                return Ok(XmlEvent::EndDocument);
            }

            let event = if self.scanner.peek() != Some(b'<') {
                Some(self.read_text()?)
            } else if self.scanner.starts_with(b"<!--") {
                Some(self.read_comment()?)
            } else if self.scanner.starts_with(b"<![CDATA[") {
                Some(self.read_cdata()?)
            } else if self.scanner.starts_with(b"<!") {
                Some(self.read_doctype()?)
            } else if self.scanner.starts_with(b"<?") {
                self.read_processing_instruction()?
            } else if self.scanner.starts_with(b"</") {
                self.read_end_tag()?
            } else {
                Some(self.read_start_tag()?)
            };

            if let Some(event) = event {
                return Ok(event);
            }
        }
    }

    fn error(&self, message: &str, offset: usize) -> ParseError {
        ParseError::new(message, offset)
    }

    /// Consume up to and past `terminator`; lenient mode runs to end of input
    fn read_until(&mut self, terminator: &[u8], start: usize, what: &str) -> Result<&'a [u8], ParseError> {
        let content_start = self.scanner.position();
        match self.scanner.find_sequence(terminator) {
            Some(end) => {
                self.scanner.set_position(end + terminator.len());
                Ok(self.scanner.slice(content_start, end))
            }
            None if self.strict => Err(self.error(&format!("Unterminated {what}"), start)),
            None => {
                self.scanner.set_position(self.scanner.len());
                Ok(self.scanner.tail(content_start))
            }
        }
    }

    fn read_text(&mut self) -> Result<XmlEvent<'a>, ParseError> {
        let start = self.scanner.position();
        let end = self.scanner.find_tag_start().unwrap_or(self.scanner.len());
        self.scanner.set_position(end);
        let raw = self.scanner.slice(start, end);

        let text = if self.strict {
            decode_text_strict(raw).map_err(|msg| self.error(msg, start))?
        } else {
            decode_text(raw)
        };
        Ok(XmlEvent::Text(text))
    }

    fn read_comment(&mut self) -> Result<XmlEvent<'a>, ParseError> {
        let start = self.scanner.position();
        self.scanner.advance(4);
        let content = self.read_until(b"-->", start, "comment")?;
        if self.strict && content.windows(2).any(|w| w == b"--") {
            return Err(self.error("'--' not allowed inside comment", start));
        }
        Ok(XmlEvent::Comment(content))
    }

    fn read_cdata(&mut self) -> Result<XmlEvent<'a>, ParseError> {
        let start = self.scanner.position();
        self.scanner.advance(9);
        let content = self.read_until(b"]]>", start, "CDATA section")?;
        Ok(XmlEvent::CData(content))
    }

    /// `<!DOCTYPE ...>` including an internal subset in brackets
    fn read_doctype(&mut self) -> Result<XmlEvent<'a>, ParseError> {
        let start = self.scanner.position();
        self.scanner.advance(2);
        let content_start = self.scanner.position();
        if self.strict && !self.scanner.starts_with(b"DOCTYPE") {
            return Err(self.error("Invalid markup declaration", start));
        }

        let mut depth = 0usize;
        let mut quote: Option<u8> = None;
        while let Some(b) = self.scanner.peek() {
            match quote {
                Some(q) if b == q => quote = None,
                Some(_) => {}
                None => match b {
                    b'"' | b'\'' => quote = Some(b),
                    b'[' => depth += 1,
                    b']' => depth = depth.saturating_sub(1),
                    b'>' if depth == 0 => {
                        let content = self.scanner.slice(content_start, self.scanner.position());
                        self.scanner.advance(1);
                        return Ok(XmlEvent::DocType(content));
                    }
                    _ => {}
                },
            }
            self.scanner.advance(1);
        }

        if self.strict {
            return Err(self.error("Unterminated DOCTYPE declaration", start));
        }
        Ok(XmlEvent::DocType(self.scanner.tail(content_start)))
    }

    fn read_processing_instruction(&mut self) -> Result<Option<XmlEvent<'a>>, ParseError> {
        let start = self.scanner.position();
        self.scanner.advance(2);
        let target = self.scanner.read_name();
        let body = self.read_until(b"?>", start, "processing instruction")?;

        let Some(target) = target else {
            if self.strict {
                return Err(self.error("Processing instruction missing target", start));
            }
            return Ok(None);
        };

        if target.eq_ignore_ascii_case(b"xml") {
            if self.strict && (target != b"xml" || start != 0) {
                return Err(self.error("XML declaration allowed only at the start of the document", start));
            }
            return Ok(Some(XmlEvent::XmlDeclaration));
        }

        let data = body.trim_ascii();
        Ok(Some(XmlEvent::ProcessingInstruction {
            target,
            data: (!data.is_empty()).then_some(data),
        }))
    }

    fn read_end_tag(&mut self) -> Result<Option<XmlEvent<'a>>, ParseError> {
        let start = self.scanner.position();
        self.scanner.advance(2);
        let name = self.scanner.read_name();
        self.scanner.skip_whitespace();

        match (name, self.scanner.peek()) {
            (Some(name), Some(b'>')) => {
                self.scanner.advance(1);
                Ok(Some(XmlEvent::EndElement(EndElement::new(name))))
            }
            _ if self.strict => Err(self.error("Malformed end tag", start)),
            (name, _) => {
                // Drop everything up to the next '>'
                let end = self.scanner.find_tag_end_quoted().map_or(self.scanner.len(), |p| p + 1);
                self.scanner.set_position(end);
                Ok(name.map(|n| XmlEvent::EndElement(EndElement::new(n))))
            }
        }
    }

    fn read_start_tag(&mut self) -> Result<XmlEvent<'a>, ParseError> {
        let start = self.scanner.position();
        self.scanner.advance(1);

        let Some(name) = self.scanner.read_name() else {
            if self.strict {
                return Err(self.error("Invalid element name", start));
            }
            // A lone '<' is treated as character data
            return Ok(XmlEvent::Text(Cow::Borrowed(self.scanner.slice(start, start + 1))));
        };

        let attr_start = self.scanner.position();
        let end = match self.scanner.find_tag_end_quoted() {
            Some(end) => end,
            None if self.strict => return Err(self.error("Unterminated start tag", start)),
            None => self.scanner.len(),
        };
        self.scanner.set_position(end + 1);

        let mut content = self.scanner.slice(attr_start, end);
        let is_empty = content.last() == Some(&b'/');
        if is_empty {
            content = &content[..content.len() - 1];
        }

        let attributes = self.parse_tag_attributes(content, attr_start)?;
        let element = StartElement::new(name, attributes);
        Ok(if is_empty {
            XmlEvent::EmptyElement(element)
        } else {
            XmlEvent::StartElement(element)
        })
    }

    fn parse_tag_attributes(&self, content: &'a [u8], offset: usize) -> Result<Vec<Attribute<'a>>, ParseError> {
        if !self.strict {
            return Ok(parse_attributes(content));
        }
        if content.first().is_some_and(|b| !b.is_ascii_whitespace()) {
            return Err(self.error("Invalid character in element name", offset));
        }
        parse_attributes_strict(content).map_err(|(at, msg)| self.error(msg, offset + at))
    }
}

impl<'a> Iterator for SliceReader<'a> {
    type Item = Result<XmlEvent<'a>, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_event() {
            Ok(XmlEvent::EndDocument) => {
                self.done = true;
                None
            }
            Ok(event) => Some(Ok(event)),
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events(input: &[u8]) -> Vec<XmlEvent<'_>> {
        SliceReader::new(input).collect::<Result<_, _>>().unwrap()
    }

    #[test]
    fn test_simple_element() {
        let events = events(b"<root>hello</root>");
        assert_eq!(events.len(), 3);
        assert!(matches!(&events[0], XmlEvent::StartElement(e) if e.name_str() == Some("root")));
        assert!(matches!(&events[1], XmlEvent::Text(t) if t.as_ref() == b"hello"));
        assert!(matches!(&events[2], XmlEvent::EndElement(e) if e.name_str() == Some("root")));
    }

    #[test]
    fn test_empty_element() {
        let events = events(b"<br/>");
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], XmlEvent::EmptyElement(e) if e.name_str() == Some("br")));
    }

    #[test]
    fn test_attributes() {
        let events = events(b"<div id=\"main\" class=\"container\"/>");
        let XmlEvent::EmptyElement(e) = &events[0] else {
            panic!("Expected EmptyElement");
        };
        assert_eq!(e.get_attribute_value("id"), Some("main"));
        assert_eq!(e.get_attribute_value("class"), Some("container"));
    }

    #[test]
    fn test_cdata_and_comment() {
        let events = events(b"<s><![CDATA[a<b]]><!-- note --></s>");
        assert!(matches!(&events[1], XmlEvent::CData(c) if *c == b"a<b"));
        assert!(matches!(&events[2], XmlEvent::Comment(c) if *c == b" note "));
    }

    #[test]
    fn test_declaration_doctype_and_pi() {
        let events = events(b"<?xml version=\"1.0\"?><!DOCTYPE r [<!ENTITY x \"y\">]><?style href=\"a\"?><r/>");
        assert!(matches!(events[0], XmlEvent::XmlDeclaration));
        assert!(matches!(&events[1], XmlEvent::DocType(d) if d.starts_with(b"DOCTYPE r")));
        assert!(matches!(&events[2], XmlEvent::ProcessingInstruction { target, data: Some(d) }
            if *target == b"style" && *d == b"href=\"a\""));
        assert!(events[3].is_start_element());
    }

    #[test]
    fn test_lenient_recovers_stray_lt() {
        let events = events(b"<a>1 < 2</a>");
        let texts: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                XmlEvent::Text(t) => Some(t.as_ref().to_vec()),
                _ => None,
            })
            .collect();
        assert_eq!(texts.concat(), b"1 < 2");
    }

    #[test]
    fn test_strict_reports_offsets() {
        let err = SliceReader::new_strict(b"<a>1 < 2</a>")
            .collect::<Result<Vec<_>, _>>()
            .unwrap_err();
        assert_eq!(err.offset, 5);

        let err = SliceReader::new_strict(b"<a><!-- open")
            .collect::<Result<Vec<_>, _>>()
            .unwrap_err();
        assert_eq!(err.message, "Unterminated comment");
        assert_eq!(err.offset, 3);
    }

    #[test]
    fn test_strict_rejects_bad_attributes() {
        let result: Result<Vec<_>, _> = SliceReader::new_strict(b"<a x=1/>").collect();
        assert!(result.is_err());
    }
}
