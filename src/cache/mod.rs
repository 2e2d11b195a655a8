//! In-memory cache of compiled schemas.
//!
//! Entries are keyed by a content hash of everything that affects the
//! output, so a changed source file, field list or symbol table is simply a
//! different key. Nothing is ever invalidated in place.
//!
//! # Key Format
//!
//! ```text
//! compiled:{format_version}:{content_hash}
//! ```

mod hash;
pub use hash::compute_hash;

use std::collections::HashMap;

/// Bump when the shape of cached output changes.
pub const CACHE_FORMAT_VERSION: u32 = 1;

/// Helper for generating cache keys.
pub struct CacheKey;

impl CacheKey {
    /// Key for a compiled schema with the given content hash.
    pub fn compiled(content_hash: &str) -> String {
        format!("compiled:{}:{}", CACHE_FORMAT_VERSION, content_hash)
    }
}

/// Hit and miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
}

/// String-keyed store that remembers how often it was useful.
#[derive(Debug)]
pub struct MemoryCache<V> {
    entries: HashMap<String, V>,
    stats: CacheStats,
}

impl<V> Default for MemoryCache<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            stats: CacheStats::default(),
        }
    }
}

impl<V> MemoryCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up `key`, counting a hit or a miss.
    pub fn get(&mut self, key: &str) -> Option<&V> {
        match self.entries.get(key) {
            Some(value) => {
                self.stats.hits += 1;
                Some(value)
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn insert(&mut self, key: String, value: V) {
        self.entries.insert(key, value);
    }

    /// Return the entry for `key`, computing and storing it on a miss.
    ///
    /// A failed computation stores nothing.
    pub fn get_or_try_insert_with<E>(
        &mut self,
        key: &str,
        compute: impl FnOnce() -> Result<V, E>,
    ) -> Result<&V, E> {
        if self.entries.contains_key(key) {
            self.stats.hits += 1;
        } else {
            self.stats.misses += 1;
            let value = compute()?;
            self.entries.insert(key.to_string(), value);
        }
        // Present in both branches
        Ok(&self.entries[key])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Drop all entries; counters are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
