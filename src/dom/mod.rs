//! DOM Module - Arena-based document representation
//!
//! Provides an immutable document tree with:
//! - Compact NodeId-based node references
//! - Interned strings for names and content
//! - Shared node handles and subtree serialization

mod document;
mod handle;
mod node;
mod serialize;
mod strings;

pub use document::{is_namespace_declaration, ChildIter, DescendantIter, XmlDocument, XML_NAMESPACE};
pub use handle::{parse, parse_lenient, NativeNode};
pub use node::{NodeId, NodeKind, XmlAttribute, XmlNode, DOCUMENT_NODE};
pub use serialize::serialize_node;
pub use strings::StringPool;
