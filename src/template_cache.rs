//! Compiled Template Cache
//!
//! Bounded cache of compiled URI templates to avoid re-parsing on repeated
//! dispatch. Purely an optimization layer: matching behaves identically
//! with or without it, and `clear` is safe at any time: in-flight lookups
//! hold `Arc`s to their compiled templates and are unaffected.

use {
    crate::error::McpResult,
    crate::template::{CompiledTemplate, ParamMap},
    dashmap::DashMap,
    std::sync::atomic::{AtomicU64, Ordering},
    std::sync::Arc,
    tracing::trace,
};

struct CacheEntry {
    template: Arc<CompiledTemplate>,
    last_used: AtomicU64,
}

/// Cache statistics for monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub size: usize,
    pub capacity: usize,
}

pub struct TemplateCache {
    capacity: usize,
    entries: DashMap<String, CacheEntry>,
    tick: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl TemplateCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: DashMap::new(),
            tick: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Look up a compiled template, compiling and inserting on miss.
    /// When the cache is at capacity the least-recently-used entry is
    /// evicted first.
    pub fn get_or_compile(&self, template: &str) -> McpResult<Arc<CompiledTemplate>> {
        let now = self.tick.fetch_add(1, Ordering::Relaxed);

        if let Some(entry) = self.entries.get(template) {
            entry.last_used.store(now, Ordering::Relaxed);
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(&entry.template));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let compiled = Arc::new(CompiledTemplate::compile(template)?);

        if self.entries.len() >= self.capacity {
            self.evict_lru();
        }
        self.entries.insert(
            template.to_string(),
            CacheEntry {
                template: Arc::clone(&compiled),
                last_used: AtomicU64::new(now),
            },
        );
        trace!(template = %template, "Compiled template cached");

        Ok(compiled)
    }

    /// Whether `uri` matches `template`, using the cache.
    pub fn matches(&self, uri: &str, template: &str) -> bool {
        self.get_or_compile(template)
            .map(|t| t.matches(uri))
            .unwrap_or(false)
    }

    /// Extract parameters from `uri` per `template`, using the cache.
    pub fn extract(&self, uri: &str, template: &str) -> Option<ParamMap> {
        self.get_or_compile(template).ok()?.extract(uri)
    }

    /// Drop every cached entry. Callers holding compiled templates keep
    /// working; the next lookup for each template recompiles.
    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            size: self.entries.len(),
            capacity: self.capacity,
        }
    }

    fn evict_lru(&self) {
        let mut oldest: Option<(String, u64)> = None;
        for entry in self.entries.iter() {
            let used = entry.last_used.load(Ordering::Relaxed);
            match &oldest {
                Some((_, current)) if *current <= used => {}
                _ => oldest = Some((entry.key().clone(), used)),
            }
        }
        if let Some((key, _)) = oldest {
            self.entries.remove(&key);
            self.evictions.fetch_add(1, Ordering::Relaxed);
            trace!(template = %key, "Evicted least-recently-used template");
        }
    }
}
