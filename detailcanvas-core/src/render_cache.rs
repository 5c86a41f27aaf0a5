//! Per-layer render cache.
//!
//! Each layer memoizes its last rasterized bitmap together with the key it
//! was rendered for. The key is recomputed on every render and compared
//! structurally, so any change to an appearance-affecting attribute forces a
//! re-render while unrelated edits (a rename, a move) reuse the bitmap.

use std::sync::Arc;

use image::RgbaImage;

/// Cached bitmap plus the key it was rendered for.
#[derive(Debug, Clone)]
struct CacheEntry<K> {
    key: K,
    bitmap: Arc<RgbaImage>,
}

/// Cache statistics, exposed for instrumentation and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Renders served from the cache.
    pub hits: u64,
    /// Renders that rasterized a fresh bitmap.
    pub renders: u64,
    /// Explicit invalidations (source changes).
    pub invalidations: u64,
}

/// Single-entry memo of a layer's rendered bitmap.
#[derive(Debug, Clone)]
pub struct RenderCache<K> {
    entry: Option<CacheEntry<K>>,
    stats: CacheStats,
}

impl<K: PartialEq> RenderCache<K> {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entry: None,
            stats: CacheStats::default(),
        }
    }

    /// Return the cached bitmap if it was rendered for `key`, otherwise call
    /// `render` and cache its result.
    ///
    /// A `None` from `render` empties the cache so a stale bitmap is never
    /// served for a key it was not rendered for.
    pub fn get_or_render<F>(&mut self, key: K, render: F) -> Option<Arc<RgbaImage>>
    where
        F: FnOnce() -> Option<RgbaImage>,
    {
        if let Some(entry) = &self.entry {
            if entry.key == key {
                self.stats.hits += 1;
                return Some(Arc::clone(&entry.bitmap));
            }
        }

        self.stats.renders += 1;
        match render() {
            Some(bitmap) => {
                let bitmap = Arc::new(bitmap);
                self.entry = Some(CacheEntry {
                    key,
                    bitmap: Arc::clone(&bitmap),
                });
                Some(bitmap)
            }
            None => {
                self.entry = None;
                None
            }
        }
    }

    /// Whether a bitmap rendered for `key` is cached.
    #[must_use]
    pub fn is_fresh(&self, key: &K) -> bool {
        self.entry.as_ref().is_some_and(|entry| entry.key == *key)
    }

    /// Drop the cached bitmap.
    pub fn invalidate(&mut self) {
        if self.entry.take().is_some() {
            self.stats.invalidations += 1;
        }
    }

    /// Cache statistics.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}

impl<K: PartialEq> Default for RenderCache<K> {
    fn default() -> Self {
        Self::new()
    }
}
