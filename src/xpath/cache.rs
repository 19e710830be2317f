//! Compiled expression cache
//!
//! Compiling an XPath expression is cheap next to re-parsing a subtree, but
//! the same handful of expressions tends to run over and over, so compiled
//! forms are kept in a bounded LRU keyed by expression text.

use super::compiler::{compile, CompiledExpr};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};

pub struct XPathCache {
    /// `None` when caching is disabled
    entries: Option<Mutex<LruCache<String, Arc<CompiledExpr>>>>,
}

impl XPathCache {
    /// Cache holding at most `capacity` expressions; 0 disables caching
    pub fn new(capacity: usize) -> Self {
        XPathCache {
            entries: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
        }
    }

    /// Return the compiled form of `xpath`, compiling and caching it on a miss.
    /// Compile errors are not cached.
    pub fn get_or_compile(&self, xpath: &str) -> Result<Arc<CompiledExpr>, String> {
        let Some(entries) = &self.entries else {
            return compile(xpath).map(Arc::new);
        };

        if let Some(hit) = entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(xpath)
        {
            tracing::trace!(xpath, "compiled xpath cache hit");
            return Ok(Arc::clone(hit));
        }

        // Compile outside the lock; a concurrent miss on the same text just
        // compiles twice
        let compiled = Arc::new(compile(xpath)?);
        entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .put(xpath.to_string(), Arc::clone(&compiled));
        Ok(compiled)
    }

    pub fn len(&self) -> usize {
        self.entries
            .as_ref()
            .map_or(0, |e| e.lock().unwrap_or_else(PoisonError::into_inner).len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for XPathCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XPathCache")
            .field("enabled", &self.entries.is_some())
            .field("len", &self.len())
            .finish()
    }
}
