//! Shared in-memory cache of recognition results.
//!
//! Read-through: a miss runs the recognizer and stores the text only if the
//! call succeeded. Keys combine the page content hash, the region and the
//! segmentation mode, so two documents with identical pixels share entries.
//!
//! The cache holds at most `capacity` entries. Once full, the oldest entry is
//! evicted for each new one, so a long-lived orchestrator fed a stream of
//! distinct pages keeps a fixed footprint.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use parking_lot::Mutex;

use super::types::PSMMode;
use crate::error::Result;
use crate::types::BoundingBox;

/// Entries kept when no capacity is given.
pub const DEFAULT_CACHE_CAPACITY: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub content_hash: u64,
    pub region: BoundingBox,
    pub mode: PSMMode,
}

impl CacheKey {
    pub fn new(content_hash: u64, region: BoundingBox, mode: PSMMode) -> Self {
        Self {
            content_hash,
            region,
            mode,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

#[derive(Debug)]
pub struct RecognitionCache {
    entries: DashMap<CacheKey, String, ahash::RandomState>,
    /// Keys in insertion order; the front is evicted first.
    order: Mutex<VecDeque<CacheKey>>,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl Default for RecognitionCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }
}

impl RecognitionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache holding at most `capacity` entries (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: DashMap::with_hasher(ahash::RandomState::new()),
            order: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, key: &CacheKey) -> Option<String> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Returns the cached text for `key`, or runs `recognize` and caches its
    /// successful result.
    ///
    /// The map is not locked while `recognize` runs; two threads missing on
    /// the same key may both recognize, and the later insert wins with an
    /// identical value.
    pub fn get_or_recognize<F>(&self, key: CacheKey, recognize: F) -> Result<String>
    where
        F: FnOnce() -> Result<String>,
    {
        if let Some(text) = self.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(text);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let text = recognize()?;
        self.insert(key, text.clone());
        Ok(text)
    }

    fn insert(&self, key: CacheKey, text: String) {
        let mut order = self.order.lock();
        if self.entries.insert(key, text).is_some() {
            return;
        }

        order.push_back(key);
        while order.len() > self.capacity {
            if let Some(oldest) = order.pop_front() {
                self.entries.remove(&oldest);
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        let mut order = self.order.lock();
        order.clear();
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            capacity: self.capacity,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}
