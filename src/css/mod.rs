//! CSS Selectors
//!
//! Selector groups are parsed into compound selectors and translated to
//! XPath 1.0, which the tree layer then evaluates like any other query.

#[cfg(feature = "css")]
pub mod parser;
#[cfg(feature = "css")]
pub mod translator;

use crate::error::Result;
#[cfg(feature = "css")]
use crate::error::Error;

#[cfg(feature = "css")]
pub use translator::{xpath_literal, Translator, XPathExpr};

/// Converts CSS selectors to XPath expressions.
///
/// Tree nodes hold the translator as a trait object, so any conversion
/// engine can be plugged in through [`TreeBuilder`](crate::TreeBuilder).
pub trait SelectorTranslator: Send + Sync {
    /// Translate `css` to an XPath expression rooted at the context node
    fn to_xpath(&self, css: &str) -> Result<String>;
}

/// Bundled CSS to XPath converter.
///
/// In HTML mode (the default) element and attribute names are lowercased
/// and the HTML pseudo-classes (`:checked`, `:link`, `:enabled`, ...) are
/// available.
///
/// ```
/// use xmlbrowser::{CssSelectorConverter, SelectorTranslator};
///
/// let converter = CssSelectorConverter::default();
/// assert_eq!(converter.to_xpath("ul > li").unwrap(), "descendant-or-self::ul/li");
/// ```
#[cfg(feature = "css")]
#[derive(Debug, Clone, Copy)]
pub struct CssSelectorConverter {
    translator: Translator,
    html: bool,
}

#[cfg(feature = "css")]
impl CssSelectorConverter {
    pub fn new(html: bool) -> Self {
        CssSelectorConverter {
            translator: Translator::new(html),
            html,
        }
    }

    pub fn is_html(&self) -> bool {
        self.html
    }
}

#[cfg(feature = "css")]
impl Default for CssSelectorConverter {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(feature = "css")]
impl SelectorTranslator for CssSelectorConverter {
    fn to_xpath(&self, css: &str) -> Result<String> {
        let xpath = self
            .translator
            .css_to_xpath(css)
            .map_err(|message| Error::selector(css, message))?;
        tracing::trace!(css, xpath = %xpath, "translated css selector");
        Ok(xpath)
    }
}

#[cfg(all(test, feature = "css"))]
mod tests {
    use super::*;

    #[test]
    fn test_converter_modes() {
        assert!(CssSelectorConverter::default().is_html());
        assert_eq!(
            CssSelectorConverter::new(false).to_xpath("Item").unwrap(),
            "descendant-or-self::Item"
        );
    }

    #[test]
    fn test_selector_error_carries_selector() {
        let err = CssSelectorConverter::default().to_xpath("a >").unwrap_err();
        match err {
            Error::Selector { selector, .. } => assert_eq!(selector, "a >"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_trait_object() {
        let translator: Box<dyn SelectorTranslator> = Box::new(CssSelectorConverter::default());
        assert_eq!(translator.to_xpath("#x").unwrap(), "descendant-or-self::*[@id = 'x']");
    }
}
