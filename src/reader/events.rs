//! XML Event Types
//!
//! Event types for pull-parser style XML processing.

use crate::core::attributes::Attribute;
use std::borrow::Cow;

/// XML parsing event
#[derive(Debug, Clone)]
pub enum XmlEvent<'a> {
    /// Start of an element: <name attrs...>
    StartElement(StartElement<'a>),
    /// End of an element: </name>
    EndElement(EndElement<'a>),
    /// Empty element: <name attrs.../>
    EmptyElement(StartElement<'a>),
    /// Text content between tags, entities decoded
    Text(Cow<'a, [u8]>),
    /// CDATA section content
    CData(&'a [u8]),
    /// Comment content
    Comment(&'a [u8]),
    /// Processing instruction: <?target data?>
    ProcessingInstruction {
        target: &'a [u8],
        data: Option<&'a [u8]>,
    },
    /// XML declaration: <?xml version="1.0"?>
    XmlDeclaration,
    /// DOCTYPE declaration, internal subset included
    DocType(&'a [u8]),
    /// End of document
    EndDocument,
}

/// Start element event data
#[derive(Debug, Clone)]
pub struct StartElement<'a> {
    /// Full element name (may include prefix)
    pub name: &'a [u8],
    pub attributes: Vec<Attribute<'a>>,
}

impl<'a> StartElement<'a> {
    pub fn new(name: &'a [u8], attributes: Vec<Attribute<'a>>) -> Self {
        StartElement { name, attributes }
    }

    pub fn name_str(&self) -> Option<&str> {
        std::str::from_utf8(self.name).ok()
    }

    pub fn get_attribute_value(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .rev()
            .find(|a| a.name == name.as_bytes())
            .and_then(|a| a.value_str())
    }
}

/// End element event data
#[derive(Debug, Clone)]
pub struct EndElement<'a> {
    pub name: &'a [u8],
}

impl<'a> EndElement<'a> {
    pub fn new(name: &'a [u8]) -> Self {
        EndElement { name }
    }

    pub fn name_str(&self) -> Option<&str> {
        std::str::from_utf8(self.name).ok()
    }
}

impl<'a> XmlEvent<'a> {
    pub fn is_start_element(&self) -> bool {
        matches!(self, XmlEvent::StartElement(_) | XmlEvent::EmptyElement(_))
    }
}
