//! xmlbrowser - immutable, queryable XML trees
//!
//! Layers:
//! - core / reader: memchr-accelerated scanning and a pull reader
//! - dom: arena document, serializer and shared [`NativeNode`] handles
//! - xpath: XPath 1.0 with a compiled-expression cache
//! - css: CSS selectors translated to XPath
//! - tree: [`TreeNode`] with attribute lookup, child indices and descendant search
//! - dump: [`raw_tree_dump`] to nested JSON values
//!
//! ```
//! use xmlbrowser::TreeNode;
//!
//! let tree = TreeNode::parse(r#"<root><item id="1"/><item id="2"/></root>"#).unwrap();
//! assert_eq!(tree.children_of_tag("item").len(), 2);
//!
//! let found = tree.search_descendants_by_xpath("//item[@id = '2']", None).unwrap();
//! assert_eq!(found[0].attribute("id"), Some("2"));
//! ```

pub mod config;
pub mod core;
pub mod css;
pub mod dom;
pub mod dump;
pub mod error;
pub mod reader;
pub mod tree;
pub mod xpath;

pub use config::Options;
#[cfg(feature = "css")]
pub use css::CssSelectorConverter;
pub use css::SelectorTranslator;
pub use dom::{parse, parse_lenient, NativeNode, XmlDocument};
pub use dump::{raw_tree_dump, raw_tree_dump_strict};
pub use error::{Error, ParseError, Result};
pub use tree::{TreeBuilder, TreeNode};
