//! Runtime options shared by every node of a tree

/// Default number of compiled XPath expressions kept per tree
pub const DEFAULT_XPATH_CACHE_CAPACITY: usize = 128;

/// Options applied when building a tree and searching it.
///
/// ```
/// use xmlbrowser::Options;
///
/// let options = Options::default()
///     .capture_subtree(false)
///     .xpath_cache_capacity(16);
/// assert!(!options.captures_subtree());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    capture_subtree: bool,
    xpath_cache_capacity: usize,
    html_selectors: bool,
    lenient_parsing: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            capture_subtree: true,
            xpath_cache_capacity: DEFAULT_XPATH_CACHE_CAPACITY,
            html_selectors: true,
            lenient_parsing: false,
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialize each element's subtree at construction so it can be searched.
    /// Without it every descendant search fails with `SearchUnsupported`.
    pub fn capture_subtree(mut self, capture: bool) -> Self {
        self.capture_subtree = capture;
        self
    }

    /// Capacity of the compiled-expression cache; 0 disables caching.
    pub fn xpath_cache_capacity(mut self, capacity: usize) -> Self {
        self.xpath_cache_capacity = capacity;
        self
    }

    /// Translate CSS selectors in HTML mode (lowercased names, form pseudo-classes).
    pub fn html_selectors(mut self, html: bool) -> Self {
        self.html_selectors = html;
        self
    }

    /// Recover from malformed markup instead of rejecting it when parsing text.
    pub fn lenient_parsing(mut self, lenient: bool) -> Self {
        self.lenient_parsing = lenient;
        self
    }

    pub fn captures_subtree(&self) -> bool {
        self.capture_subtree
    }

    pub fn cache_capacity(&self) -> usize {
        self.xpath_cache_capacity
    }

    pub fn uses_html_selectors(&self) -> bool {
        self.html_selectors
    }

    pub fn is_lenient(&self) -> bool {
        self.lenient_parsing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = Options::default();
        assert!(options.captures_subtree());
        assert_eq!(options.cache_capacity(), DEFAULT_XPATH_CACHE_CAPACITY);
        assert!(options.uses_html_selectors());
        assert!(!options.is_lenient());
    }

    #[test]
    fn test_builder_setters() {
        let options = Options::new()
            .capture_subtree(false)
            .xpath_cache_capacity(0)
            .html_selectors(false)
            .lenient_parsing(true);
        assert!(!options.captures_subtree());
        assert_eq!(options.cache_capacity(), 0);
        assert!(!options.uses_html_selectors());
        assert!(options.is_lenient());
    }
}
