//! XML Reader Module
//!
//! - SliceReader: pull parser over a byte slice, lenient or strict
//! - Events: XML event types for pull parsing

pub mod events;
pub mod slice;

pub use events::{EndElement, StartElement, XmlEvent};
pub use slice::SliceReader;
