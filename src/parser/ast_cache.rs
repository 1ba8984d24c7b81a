// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Shared parse cache for expressions
//!
//! Parsed trees are keyed by the exact source text. The cache is pure
//! memoization: a lookup that misses, expires or was evicted only costs a
//! re-parse. Failed parses are never stored. Two threads compiling the same
//! uncached source may both parse it; the second insert simply replaces the
//! first with an equal tree.

use super::ParseResult;
use crate::ast::ExpressionNode;
use crate::config::AstCacheConfig;
use dashmap::DashMap;
use log::{debug, trace};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Shared AST that can be safely cloned across threads
pub type SharedAst = Arc<ExpressionNode>;

/// Statistics about the AST cache performance
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AstCacheStats {
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses
    pub misses: u64,
    /// Number of entries currently cached
    pub entries: usize,
    /// Number of entries evicted because the cache was full
    pub evictions: u64,
}

impl AstCacheStats {
    /// Calculate cache hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        if self.hits + self.misses == 0 {
            0.0
        } else {
            (self.hits as f64) / ((self.hits + self.misses) as f64) * 100.0
        }
    }
}

/// Cache entry with metadata
#[derive(Debug)]
struct CacheEntry {
    ast: SharedAst,
    created_at: Instant,
    last_accessed: Instant,
}

impl CacheEntry {
    fn new(ast: SharedAst) -> Self {
        let now = Instant::now();
        Self {
            ast,
            created_at: now,
            last_accessed: now,
        }
    }

    fn access(&mut self) -> SharedAst {
        self.last_accessed = Instant::now();
        Arc::clone(&self.ast)
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() > ttl
    }
}

/// Thread-safe AST cache with least-recently-used eviction
#[derive(Debug)]
pub struct AstCache {
    cache: DashMap<String, CacheEntry>,
    config: AstCacheConfig,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl AstCache {
    /// Create a new AST cache with default configuration
    pub fn new() -> Self {
        Self::with_config(AstCacheConfig::default())
    }

    /// Create a new AST cache with custom configuration
    pub fn with_config(config: AstCacheConfig) -> Self {
        Self {
            cache: DashMap::new(),
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// The configuration this cache was built with
    pub fn config(&self) -> &AstCacheConfig {
        &self.config
    }

    fn stores_entries(&self) -> bool {
        self.config.enabled && self.config.max_entries > 0
    }

    /// Get a cached AST or None if not found or expired
    pub fn get(&self, expression: &str) -> Option<SharedAst> {
        if !self.stores_entries() {
            return None;
        }

        if let Some(mut entry) = self.cache.get_mut(expression) {
            if let Some(ttl) = self.config.entry_ttl {
                if entry.is_expired(ttl) {
                    drop(entry);
                    self.cache.remove(expression);
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    trace!("Parse cache entry expired: {expression}");
                    return None;
                }
            }

            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!("Parse cache hit: {expression}");
            Some(entry.access())
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            None
        }
    }

    /// Cache an AST for future use and return the shared handle
    pub fn put(&self, expression: &str, ast: ExpressionNode) -> SharedAst {
        let shared_ast = Arc::new(ast);
        if !self.stores_entries() {
            return shared_ast;
        }

        if self.cache.len() >= self.config.max_entries && !self.cache.contains_key(expression) {
            self.cleanup();
            if self.cache.len() >= self.config.max_entries {
                self.evict_lru_entries();
            }
        }

        self.cache
            .insert(expression.to_string(), CacheEntry::new(Arc::clone(&shared_ast)));
        shared_ast
    }

    /// Return the cached tree for `expression`, or build it with `parse` and
    /// cache the result. Errors from `parse` are returned and not cached.
    pub fn get_or_parse<F>(&self, expression: &str, parse: F) -> ParseResult<SharedAst>
    where
        F: FnOnce(&str) -> ParseResult<ExpressionNode>,
    {
        if let Some(ast) = self.get(expression) {
            return Ok(ast);
        }

        debug!("Parse cache miss, compiling: {expression}");
        let ast = parse(expression)?;
        Ok(self.put(expression, ast))
    }

    /// Get cache statistics
    pub fn stats(&self) -> AstCacheStats {
        AstCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.cache.len(),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    /// Clear all cached entries; statistics are kept
    pub fn clear(&self) {
        self.cache.clear();
    }

    /// Remove expired entries; runs before eviction when the cache is full
    pub fn cleanup(&self) {
        if let Some(ttl) = self.config.entry_ttl {
            self.cache.retain(|_, entry| !entry.is_expired(ttl));
        }
    }

    /// Evict least recently used entries when cache is full
    fn evict_lru_entries(&self) {
        let mut entries: Vec<(String, Instant)> = self
            .cache
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().last_accessed))
            .collect();

        // Oldest first
        entries.sort_by_key(|(_, last_accessed)| *last_accessed);

        // Remove the oldest 20% of entries, at least one
        let remove_count = (self.config.max_entries / 5).max(1);
        for (key, _) in entries.into_iter().take(remove_count) {
            if self.cache.remove(&key).is_some() {
                self.evictions.fetch_add(1, Ordering::Relaxed);
                trace!("Parse cache evicted: {key}");
            }
        }
    }
}

impl Default for AstCache {
    fn default() -> Self {
        Self::new()
    }
}
