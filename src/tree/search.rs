//! Descendant search
//!
//! Every search re-parses the node's captured subtree into a fresh document
//! whose root element is the node itself, then evaluates XPath with that
//! element as the context node. CSS selectors are translated to XPath first.

use super::builder::build_tree;
use super::TreeNode;
use crate::dom::{NativeNode, XmlDocument, DOCUMENT_NODE};
use crate::error::{Error, Result};
use crate::xpath::{evaluate_compiled, EvalContext, XPathValue};
use std::sync::Arc;

impl TreeNode {
    /// Native nodes matched by `xpath`, in document order.
    ///
    /// `limit` of `None` is unbounded; a limit of zero or less returns an
    /// empty list without evaluating anything. Attribute steps yield
    /// attribute handles. Expressions that evaluate to a number, string or
    /// boolean match nothing.
    ///
    /// ```
    /// use xmlbrowser::TreeNode;
    ///
    /// let tree = TreeNode::parse("<root><a/><b/></root>").unwrap();
    /// let found = tree.search_descendants_by_xpath("/root", None).unwrap();
    /// assert_eq!(found.len(), 1);
    /// assert_eq!(found[0].name(), "root");
    /// ```
    pub fn search_descendants_by_xpath(&self, xpath: &str, limit: Option<i64>) -> Result<Vec<NativeNode>> {
        if limit.is_some_and(|limit| limit <= 0) {
            return Ok(Vec::new());
        }

        let Some(subtree) = self.serialized_subtree.as_deref() else {
            tracing::warn!(tag = %self.tag, xpath, "search on a node without a captured subtree");
            return Err(Error::SearchUnsupported { tag: self.tag.clone() });
        };

        let compiled = self
            .context
            .cache
            .get_or_compile(xpath)
            .map_err(|message| Error::query(xpath, message))?;

        let doc = if self.context.options.is_lenient() {
            XmlDocument::parse(subtree)
        } else {
            XmlDocument::parse_strict(subtree)?
        };
        let doc = Arc::new(doc);
        let Some(root) = doc.root_element_id() else {
            return Err(Error::SearchUnsupported { tag: self.tag.clone() });
        };

        let ctx = EvalContext::new(&doc, root);
        let value = evaluate_compiled(&compiled, &ctx).map_err(|message| Error::query(xpath, message))?;
        let mut found: Vec<NativeNode> = match value {
            XPathValue::NodeSet(mut nodes) => {
                // The document node stands in for its root element
                for id in &mut nodes {
                    if *id == DOCUMENT_NODE {
                        *id = root;
                    }
                }
                nodes.dedup();
                nodes
                    .into_iter()
                    .map(|id| NativeNode::new(Arc::clone(&doc), id))
                    .collect()
            }
            XPathValue::Attributes(selected) => selected
                .into_iter()
                .map(|attr| NativeNode::attribute_of(Arc::clone(&doc), attr.owner, attr.index))
                .collect(),
            other => {
                tracing::debug!(tag = %self.tag, xpath, kind = other.type_name(), "xpath result is not a node-set");
                Vec::new()
            }
        };

        if let Some(limit) = limit {
            found.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }
        tracing::debug!(tag = %self.tag, xpath, matches = found.len(), "xpath search");
        Ok(found)
    }

    /// [`search_descendants_by_xpath`](Self::search_descendants_by_xpath),
    /// wrapping each match in a new tree that shares this tree's options,
    /// translator and cache
    pub fn search_descendants_by_xpath_as_nodes(&self, xpath: &str, limit: Option<i64>) -> Result<Vec<TreeNode>> {
        let found = self.search_descendants_by_xpath(xpath, limit)?;
        Ok(self.wrap_all(&found))
    }

    /// Native nodes matched by the CSS selector `css`
    pub fn search_descendants_by_css(&self, css: &str, limit: Option<i64>) -> Result<Vec<NativeNode>> {
        let xpath = self.translate(css)?;
        self.search_descendants_by_xpath(&xpath, limit)
    }

    pub fn search_descendants_by_css_as_nodes(&self, css: &str, limit: Option<i64>) -> Result<Vec<TreeNode>> {
        let xpath = self.translate(css)?;
        self.search_descendants_by_xpath_as_nodes(&xpath, limit)
    }

    pub fn first_descendant_by_xpath(&self, xpath: &str) -> Result<Option<NativeNode>> {
        Ok(self.search_descendants_by_xpath(xpath, Some(1))?.into_iter().next())
    }

    pub fn first_descendant_by_xpath_as_node(&self, xpath: &str) -> Result<Option<TreeNode>> {
        Ok(self.search_descendants_by_xpath_as_nodes(xpath, Some(1))?.into_iter().next())
    }

    pub fn first_descendant_by_css(&self, css: &str) -> Result<Option<NativeNode>> {
        Ok(self.search_descendants_by_css(css, Some(1))?.into_iter().next())
    }

    pub fn first_descendant_by_css_as_node(&self, css: &str) -> Result<Option<TreeNode>> {
        Ok(self.search_descendants_by_css_as_nodes(css, Some(1))?.into_iter().next())
    }

    /// Run several XPath searches against this node, each on its own re-parse.
    /// Results are in input order; with the `parallel` feature the searches
    /// run on the rayon pool.
    pub fn search_descendants_by_xpath_batch(&self, xpaths: &[&str], limit: Option<i64>) -> Vec<Result<Vec<NativeNode>>> {
        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            xpaths
                .par_iter()
                .map(|xpath| self.search_descendants_by_xpath(xpath, limit))
                .collect()
        }

        #[cfg(not(feature = "parallel"))]
        {
            xpaths
                .iter()
                .map(|xpath| self.search_descendants_by_xpath(xpath, limit))
                .collect()
        }
    }

    fn translate(&self, css: &str) -> Result<String> {
        let translator = self
            .context
            .translator
            .as_ref()
            .ok_or(Error::SelectorEngineUnavailable)?;
        translator.to_xpath(css)
    }

    fn wrap_all(&self, found: &[NativeNode]) -> Vec<TreeNode> {
        found.iter().map(|native| build_tree(&self.context, native)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Options;
    use crate::css::SelectorTranslator;
    use crate::tree::TreeBuilder;

    const ITEMS: &str = r#"<root><item id="1"/><group><item id="2"><item id="3"/></item></group></root>"#;

    fn ids(nodes: &[NativeNode]) -> Vec<&str> {
        nodes.iter().filter_map(|n| n.attribute("id")).collect()
    }

    #[test]
    fn test_xpath_root_matches_node_itself() {
        let tree = TreeNode::parse("<root><a/><b/></root>").unwrap();
        let found = tree.search_descendants_by_xpath("/root", None).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name(), "root");
    }

    #[test]
    fn test_xpath_descendants_in_document_order() {
        let tree = TreeNode::parse(ITEMS).unwrap();
        let found = tree.search_descendants_by_xpath("//item", None).unwrap();
        assert_eq!(ids(&found), ["1", "2", "3"]);
    }

    #[test]
    fn test_limits() {
        let tree = TreeNode::parse(ITEMS).unwrap();
        assert_eq!(tree.search_descendants_by_xpath("//item", Some(2)).unwrap().len(), 2);
        assert_eq!(tree.search_descendants_by_xpath("//item", Some(10)).unwrap().len(), 3);
        assert!(tree.search_descendants_by_xpath("//item", Some(0)).unwrap().is_empty());
        assert!(tree.search_descendants_by_xpath("//item", Some(-3)).unwrap().is_empty());
        // limit <= 0 short-circuits before the expression is compiled
        assert!(tree.search_descendants_by_xpath("//[", Some(0)).unwrap().is_empty());
    }

    #[test]
    fn test_search_is_scoped_to_subtree() {
        let tree = TreeNode::parse(ITEMS).unwrap();
        let group = tree.first_child(Some("group")).unwrap();
        let found = group.search_descendants_by_xpath("//item", None).unwrap();
        assert_eq!(ids(&found), ["2", "3"]);

        let itself = group.search_descendants_by_xpath("/group", None).unwrap();
        assert_eq!(itself.len(), 1);
        assert!(group.search_descendants_by_xpath("/root", None).unwrap().is_empty());
    }

    #[test]
    fn test_query_errors() {
        let tree = TreeNode::parse(ITEMS).unwrap();
        assert!(matches!(
            tree.search_descendants_by_xpath("//item[", None),
            Err(Error::Query { expression, .. }) if expression == "//item["
        ));
        assert!(matches!(
            tree.search_descendants_by_xpath("'a' | 'b'", None),
            Err(Error::Query { .. })
        ));
    }

    #[test]
    fn test_scalar_results_match_nothing() {
        let tree = TreeNode::parse(ITEMS).unwrap();
        for xpath in ["count(//item)", "string(//item/@id)", "//item = 1", "1 + 1"] {
            assert!(tree.search_descendants_by_xpath(xpath, None).unwrap().is_empty(), "{xpath}");
        }
    }

    #[test]
    fn test_attribute_steps_return_attribute_handles() {
        let tree = TreeNode::parse(ITEMS).unwrap();
        let found = tree.search_descendants_by_xpath("//item/@id", None).unwrap();
        let values: Vec<_> = found.iter().map(NativeNode::text).collect();
        assert_eq!(values, ["1", "2", "3"]);
        assert!(found.iter().all(|n| n.is_attribute() && n.name() == "id"));
        assert_eq!(found[1].parent().unwrap().attribute("id"), Some("2"));

        let limited = tree.search_descendants_by_xpath("//@id", Some(1)).unwrap();
        assert_eq!(limited.len(), 1);

        let nodes = tree.search_descendants_by_xpath_as_nodes("//group/item/@id", None).unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].tag(), "id");
        assert_eq!(nodes[0].value(), "2");
        assert!(nodes[0].children().is_empty());
        assert!(nodes[0].serialized_subtree().is_none());
    }

    #[test]
    fn test_document_node_maps_to_root_element() {
        let tree = TreeNode::parse(ITEMS).unwrap();
        let found = tree.search_descendants_by_xpath("/", None).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name(), "root");

        let nodes = tree.search_descendants_by_xpath_as_nodes("..", None).unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].tag(), "root");
        assert!(nodes[0].serialized_subtree().is_some());

        assert_eq!(tree.search_descendants_by_xpath("/ | /root", None).unwrap().len(), 1);
    }

    #[test]
    fn test_search_on_lenient_tree() {
        let builder = TreeBuilder::with_options(Options::default().lenient_parsing(true));
        let tree = builder.parse("<a><!-- x -- y --><c/></a>").unwrap();
        let found = tree.search_descendants_by_xpath("//c", None).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name(), "c");

        // a tree built with strict options from a recovered document
        let recovered = crate::dom::parse_lenient("<a><!-- x -- y --><c/></a>").unwrap();
        let strict = TreeNode::from_native(&recovered);
        assert_eq!(strict.search_descendants_by_xpath("//c", None).unwrap().len(), 1);
    }

    #[test]
    fn test_search_unsupported_without_subtree() {
        let tree = TreeBuilder::with_options(Options::default().capture_subtree(false))
            .parse(ITEMS)
            .unwrap();
        assert!(matches!(
            tree.search_descendants_by_xpath("//item", None),
            Err(Error::SearchUnsupported { tag }) if tag == "root"
        ));
        // limit <= 0 still wins
        assert!(tree.search_descendants_by_xpath("//item", Some(0)).unwrap().is_empty());
    }

    #[test]
    fn test_as_nodes_share_context() {
        let tree = TreeNode::parse(ITEMS).unwrap();
        let nodes = tree.search_descendants_by_xpath_as_nodes("//group/item", None).unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].attribute("id"), Some("2"));
        assert_eq!(nodes[0].children().len(), 1);
        assert!(Arc::ptr_eq(&nodes[0].context, &tree.context));

        // results can be searched again
        let nested = nodes[0].search_descendants_by_xpath("item", None).unwrap();
        assert_eq!(ids(&nested), ["3"]);
    }

    #[test]
    fn test_first_variants() {
        let tree = TreeNode::parse(ITEMS).unwrap();
        let first = tree.first_descendant_by_xpath("//item").unwrap().unwrap();
        assert_eq!(first.attribute("id"), Some("1"));
        assert!(tree.first_descendant_by_xpath("//missing").unwrap().is_none());

        let node = tree.first_descendant_by_xpath_as_node("//group").unwrap().unwrap();
        assert_eq!(node.tag(), "group");
    }

    #[cfg(feature = "css")]
    #[test]
    fn test_css_search() {
        let tree = TreeNode::parse(r#"<root><item id="1"/><item id="2"/></root>"#).unwrap();
        let found = tree.search_descendants_by_css("item", None).unwrap();
        assert_eq!(ids(&found), ["1", "2"]);

        let first = tree.first_descendant_by_css("item").unwrap().unwrap();
        assert_eq!(first.attribute("id"), Some("1"));

        let node = tree.first_descendant_by_css_as_node("item:last-child").unwrap().unwrap();
        assert_eq!(node.attribute("id"), Some("2"));

        let nodes = tree.search_descendants_by_css_as_nodes("root > item[id='2']", None).unwrap();
        assert_eq!(nodes.len(), 1);
    }

    #[cfg(feature = "css")]
    #[test]
    fn test_css_selector_error() {
        let tree = TreeNode::parse(ITEMS).unwrap();
        assert!(matches!(
            tree.search_descendants_by_css("item[", None),
            Err(Error::Selector { .. })
        ));
    }

    #[test]
    fn test_missing_translator_checked_before_translation() {
        let tree = TreeBuilder::new().without_translator().parse(ITEMS).unwrap();
        assert!(matches!(
            tree.search_descendants_by_css("item[", None),
            Err(Error::SelectorEngineUnavailable)
        ));
        assert!(matches!(
            tree.first_descendant_by_css_as_node("item"),
            Err(Error::SelectorEngineUnavailable)
        ));
    }

    #[test]
    fn test_custom_translator() {
        struct TagOnly;

        impl SelectorTranslator for TagOnly {
            fn to_xpath(&self, css: &str) -> Result<String> {
                Ok(format!("descendant::{}", css))
            }
        }

        let tree = TreeBuilder::new()
            .with_translator(Arc::new(TagOnly))
            .parse(ITEMS)
            .unwrap();
        let found = tree.search_descendants_by_css("item", None).unwrap();
        assert_eq!(ids(&found), ["1", "2", "3"]);
    }

    #[test]
    fn test_batch_search_keeps_input_order() {
        let tree = TreeNode::parse(ITEMS).unwrap();
        let results = tree.search_descendants_by_xpath_batch(&["//group", "//item", "//["], Some(2));
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().len(), 1);
        assert_eq!(ids(results[1].as_ref().unwrap()), ["1", "2"]);
        assert!(results[2].is_err());
    }
}
