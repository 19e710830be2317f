//! Immutable element trees
//!
//! A [`TreeNode`] mirrors one element of a parsed document: its tag,
//! attributes, text, element children (in order and grouped by tag) and a
//! serialized copy of its own subtree that descendant searches run against.
//! Trees are built once by a [`TreeBuilder`] and never change afterwards.

mod builder;
mod search;

pub use builder::TreeBuilder;

use crate::dom::NativeNode;
use crate::error::{Error, Result};
use builder::SearchContext;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

pub struct TreeNode {
    tag: String,
    attributes: IndexMap<String, String>,
    value: String,
    trimmed_value: String,
    children: Vec<Arc<TreeNode>>,
    children_by_tag: IndexMap<String, Vec<Arc<TreeNode>>>,
    serialized_subtree: Option<String>,
    native: NativeNode,
    context: Arc<SearchContext>,
}

impl TreeNode {
    /// Parse well-formed XML with default options and build its tree.
    ///
    /// ```
    /// use xmlbrowser::TreeNode;
    ///
    /// let tree = TreeNode::parse(r#"<root><item id="1"/><item id="2"/></root>"#).unwrap();
    /// let second = tree.child_by_tag_and_index("item", 1).unwrap();
    /// assert_eq!(second.attribute("id"), Some("2"));
    /// ```
    pub fn parse(xml: &str) -> Result<TreeNode> {
        TreeBuilder::new().parse(xml)
    }

    /// Build a tree for `node` with default options
    pub fn from_native(node: &NativeNode) -> TreeNode {
        TreeBuilder::new().build(node)
    }

    /// Qualified name as written in the document
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Direct text content
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn trimmed_value(&self) -> &str {
        &self.trimmed_value
    }

    // ---- attributes ----

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Attribute value, or `default` when the attribute is absent
    pub fn attribute_or<'a>(&'a self, name: &str, default: Option<&'a str>) -> Option<&'a str> {
        self.attribute(name).or(default)
    }

    pub fn required_attribute(&self, name: &str) -> Result<&str> {
        self.attribute(name).ok_or_else(|| Error::MissingAttribute {
            name: name.to_string(),
        })
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// All attributes in document order
    pub fn attributes(&self) -> &IndexMap<String, String> {
        &self.attributes
    }

    // ---- children ----

    /// First element child, or the first child named `tag`. An empty tag is
    /// treated as no filter.
    pub fn first_child(&self, tag: Option<&str>) -> Option<&TreeNode> {
        match tag.filter(|t| !t.is_empty()) {
            Some(tag) => self.child_by_tag_and_index(tag, 0),
            None => self.children.first().map(Arc::as_ref),
        }
    }

    /// Native handle of [`first_child`](Self::first_child)
    pub fn first_child_native(&self, tag: Option<&str>) -> Option<&NativeNode> {
        self.first_child(tag).map(TreeNode::native)
    }

    /// `index`-th child named `tag` (zero-based)
    pub fn child_by_tag_and_index(&self, tag: &str, index: usize) -> Option<&TreeNode> {
        self.children_by_tag.get(tag)?.get(index).map(Arc::as_ref)
    }

    pub fn has_children_of_tag(&self, tag: &str) -> bool {
        self.children_by_tag.contains_key(tag)
    }

    /// Element children in document order
    pub fn children(&self) -> &[Arc<TreeNode>] {
        &self.children
    }

    /// Children named `tag` in document order; empty for unknown tags
    pub fn children_of_tag(&self, tag: &str) -> &[Arc<TreeNode>] {
        self.children_by_tag.get(tag).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Children grouped by tag, groups ordered by first appearance
    pub fn children_by_tag(&self) -> &IndexMap<String, Vec<Arc<TreeNode>>> {
        &self.children_by_tag
    }

    // ---- origin ----

    pub fn native(&self) -> &NativeNode {
        &self.native
    }

    /// XML of this node's subtree as captured at construction
    pub fn serialized_subtree(&self) -> Option<&str> {
        self.serialized_subtree.as_deref()
    }
}

impl fmt::Debug for TreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeNode")
            .field("tag", &self.tag)
            .field("attributes", &self.attributes)
            .field("value", &self.value)
            .field("children", &self.children)
            .finish_non_exhaustive()
    }
}
