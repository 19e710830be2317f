//! String Interning Pool
//!
//! Deduplicated storage for element names, attribute names and values, and
//! character data. All strings live in one contiguous buffer; ids are
//! offsets into an entry table, so nodes stay `Copy`-sized.
//!
//! Uses hash-based lookup to avoid storing duplicate string data.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

#[derive(Debug)]
pub struct StringPool {
    /// (offset, length) into `data`, indexed by string id
    entries: Vec<(u32, u32)>,
    data: String,
    /// Hash of string content -> ids with that hash
    hash_index: HashMap<u64, Vec<u32>>,
}

impl Default for StringPool {
    fn default() -> Self {
        Self::new()
    }
}

impl StringPool {
    pub fn new() -> Self {
        StringPool {
            // Entry 0 is reserved for the empty string
            entries: vec![(0, 0)],
            data: String::with_capacity(4096),
            hash_index: HashMap::new(),
        }
    }

    #[inline]
    fn compute_hash(s: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        s.hash(&mut hasher);
        hasher.finish()
    }

    /// Intern a string, returning the id of an identical entry if one exists
    pub fn intern(&mut self, s: &str) -> u32 {
        if s.is_empty() {
            return 0;
        }

        let hash = Self::compute_hash(s);
        if let Some(ids) = self.hash_index.get(&hash) {
            if let Some(&id) = ids.iter().find(|&&id| self.get(id) == s) {
                return id;
            }
        }

        let offset = self.data.len() as u32;
        self.data.push_str(s);
        let id = self.entries.len() as u32;
        self.entries.push((offset, s.len() as u32));
        self.hash_index.entry(hash).or_default().push(id);
        id
    }

    /// Resolve an id; unknown ids resolve to the empty string
    pub fn get(&self, id: u32) -> &str {
        match self.entries.get(id as usize) {
            Some(&(offset, len)) => {
                let start = offset as usize;
                self.data.get(start..start + len as usize).unwrap_or("")
            }
            None => "",
        }
    }

    /// Number of distinct strings, the reserved empty entry included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.len() <= 1
    }

    /// Bytes of string data held by the pool
    pub fn bytes_used(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_and_get() {
        let mut pool = StringPool::new();
        let id = pool.intern("hello");
        assert!(id > 0);
        assert_eq!(pool.get(id), "hello");
    }

    #[test]
    fn test_intern_duplicate() {
        let mut pool = StringPool::new();
        let id1 = pool.intern("hello");
        let id2 = pool.intern("hello");
        assert_eq!(id1, id2);
        assert_eq!(pool.bytes_used(), 5);
    }

    #[test]
    fn test_intern_different() {
        let mut pool = StringPool::new();
        assert_ne!(pool.intern("hello"), pool.intern("world"));
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn test_empty_string() {
        let mut pool = StringPool::new();
        assert_eq!(pool.intern(""), 0);
        assert_eq!(pool.get(0), "");
        assert!(pool.is_empty());
    }

    #[test]
    fn test_long_strings_are_not_truncated() {
        let mut pool = StringPool::new();
        let long = "x".repeat(70_000);
        let id = pool.intern(&long);
        assert_eq!(pool.get(id).len(), 70_000);
    }

    #[test]
    fn test_unknown_id() {
        let pool = StringPool::new();
        assert_eq!(pool.get(42), "");
    }
}
