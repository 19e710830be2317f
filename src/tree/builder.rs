//! Tree construction
//!
//! A [`TreeBuilder`] carries the pieces every node of one tree shares: the
//! options, the optional selector translator and the compiled-XPath cache.
//! Nodes re-wrapped from search results join the same shared context.

use super::TreeNode;
use crate::config::Options;
use crate::css::SelectorTranslator;
use crate::dom::{self, NativeNode};
use crate::error::{Error, ParseError, Result};
use crate::xpath::XPathCache;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// State shared by all nodes built from one [`TreeBuilder`]
pub(crate) struct SearchContext {
    pub(crate) translator: Option<Arc<dyn SelectorTranslator>>,
    pub(crate) cache: XPathCache,
    pub(crate) options: Options,
}

impl fmt::Debug for SearchContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchContext")
            .field("has_translator", &self.translator.is_some())
            .field("cache", &self.cache)
            .field("options", &self.options)
            .finish()
    }
}

/// Builds [`TreeNode`]s from native nodes or XML text.
///
/// ```
/// use xmlbrowser::{Options, TreeBuilder};
///
/// let builder = TreeBuilder::with_options(Options::default().xpath_cache_capacity(8));
/// let tree = builder.parse("<root><item/></root>").unwrap();
/// assert_eq!(tree.children().len(), 1);
/// ```
#[derive(Clone)]
pub struct TreeBuilder {
    options: Options,
    translator: Option<Arc<dyn SelectorTranslator>>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::with_options(Options::default())
    }

    /// Builder with the bundled CSS converter (when the `css` feature is on)
    /// configured from `options`
    pub fn with_options(options: Options) -> Self {
        let translator = default_translator(&options);
        TreeBuilder { options, translator }
    }

    /// Replace the selector translator
    pub fn with_translator(mut self, translator: Arc<dyn SelectorTranslator>) -> Self {
        self.translator = Some(translator);
        self
    }

    /// Build trees that reject CSS searches
    pub fn without_translator(mut self) -> Self {
        self.translator = None;
        self
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn has_translator(&self) -> bool {
        self.translator.is_some()
    }

    /// Mirror `root` and its element subtree
    pub fn build(&self, root: &NativeNode) -> TreeNode {
        let context = Arc::new(SearchContext {
            translator: self.translator.clone(),
            cache: XPathCache::new(self.options.cache_capacity()),
            options: self.options.clone(),
        });
        build_tree(&context, root)
    }

    /// Parse `xml` and build a tree rooted at its root element. Parsing is
    /// strict unless the options ask for lenient parsing.
    pub fn parse(&self, xml: &str) -> Result<TreeNode> {
        let root = if self.options.is_lenient() {
            dom::parse_lenient(xml)
                .ok_or_else(|| Error::Parse(ParseError::new("Document has no root element", 0)))?
        } else {
            dom::parse(xml)?
        };
        Ok(self.build(&root))
    }
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TreeBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeBuilder")
            .field("options", &self.options)
            .field("has_translator", &self.translator.is_some())
            .finish()
    }
}

#[cfg(feature = "css")]
fn default_translator(options: &Options) -> Option<Arc<dyn SelectorTranslator>> {
    Some(Arc::new(crate::css::CssSelectorConverter::new(options.uses_html_selectors())))
}

#[cfg(not(feature = "css"))]
fn default_translator(_options: &Options) -> Option<Arc<dyn SelectorTranslator>> {
    None
}

/// Characters stripped from both ends of a trimmed value. Unicode spaces
/// such as U+00A0 are content.
const TRIMMED_WHITESPACE: [char; 6] = [' ', '\t', '\n', '\r', '\0', '\x0B'];

/// Node whose element children are still being built
struct Frame {
    native: NativeNode,
    pending: std::vec::IntoIter<NativeNode>,
    children: Vec<Arc<TreeNode>>,
}

impl Frame {
    fn new(native: NativeNode) -> Self {
        let pending = native.element_children().into_iter();
        Frame {
            native,
            pending,
            children: Vec::new(),
        }
    }
}

/// Post-order walk with an explicit stack so deep documents cannot overflow
/// the call stack
pub(crate) fn build_tree(context: &Arc<SearchContext>, root: &NativeNode) -> TreeNode {
    let mut stack: Vec<Frame> = Vec::new();
    let mut current = Frame::new(root.clone());
    let mut built = 0usize;

    loop {
        if let Some(child) = current.pending.next() {
            stack.push(std::mem::replace(&mut current, Frame::new(child)));
            continue;
        }

        let node = finish_node(context, current);
        built += 1;

        match stack.pop() {
            Some(mut parent) => {
                parent.children.push(Arc::new(node));
                current = parent;
            }
            None => {
                tracing::debug!(tag = node.tag(), nodes = built, "built tree");
                return node;
            }
        }
    }
}

fn finish_node(context: &Arc<SearchContext>, frame: Frame) -> TreeNode {
    let Frame { native, children, .. } = frame;

    let mut children_by_tag: IndexMap<String, Vec<Arc<TreeNode>>> = IndexMap::new();
    for child in &children {
        children_by_tag
            .entry(child.tag().to_string())
            .or_default()
            .push(Arc::clone(child));
    }

    let attributes = native
        .attributes()
        .into_iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();

    let serialized_subtree =
        (context.options.captures_subtree() && native.is_element()).then(|| native.to_xml());

    let value = native.text();
    TreeNode {
        tag: native.name().to_string(),
        attributes,
        trimmed_value: value.trim_matches(TRIMMED_WHITESPACE).to_string(),
        value,
        children,
        children_by_tag,
        serialized_subtree,
        native,
        context: Arc::clone(context),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_shares_context() {
        let tree = TreeBuilder::new().parse("<a><b><c/></b></a>").unwrap();
        let b = tree.first_child(None).unwrap();
        let c = b.first_child(None).unwrap();
        assert!(Arc::ptr_eq(&tree.context, &c.context));
    }

    #[test]
    fn test_deep_document() {
        let depth = 1000;
        let xml = format!("{}{}", "<n>".repeat(depth), "</n>".repeat(depth));
        let tree = TreeBuilder::with_options(Options::default().capture_subtree(false))
            .parse(&xml)
            .unwrap();

        let mut node = &tree;
        let mut levels = 1;
        while let Some(child) = node.first_child(None) {
            node = child;
            levels += 1;
        }
        assert_eq!(levels, depth);
    }

    #[test]
    fn test_capture_subtree_option() {
        let captured = TreeBuilder::new().parse("<a><b/></a>").unwrap();
        assert_eq!(captured.serialized_subtree(), Some("<a><b/></a>"));

        let skipped = TreeBuilder::with_options(Options::default().capture_subtree(false))
            .parse("<a><b/></a>")
            .unwrap();
        assert!(skipped.serialized_subtree().is_none());
    }

    #[test]
    fn test_lenient_parse() {
        let builder = TreeBuilder::with_options(Options::default().lenient_parsing(true));
        let tree = builder.parse("<a><b></a>").unwrap();
        assert_eq!(tree.tag(), "a");
        assert!(builder.parse("no markup").is_err());
        assert!(TreeBuilder::new().parse("<a><b></a>").is_err());
    }

    #[test]
    fn test_without_translator() {
        let builder = TreeBuilder::new().without_translator();
        assert!(!builder.has_translator());
    }
}
