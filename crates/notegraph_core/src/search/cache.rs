//! Bounded token cache reused across index rebuilds.
//!
//! # Invariants
//! - Keys are `(note id, updated_at)`; a changed timestamp is a cache miss.
//! - Eviction is FIFO by insertion once `capacity` is exceeded.
//! - `evictions` counts capacity evictions over the cache lifetime; `clear`
//!   does not reset it.

use std::collections::{HashMap, VecDeque};

type CacheKey = (String, String);

/// Tokenized fields of one note version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedTokens {
    pub title_tokens: Vec<String>,
    pub body_tokens: Vec<String>,
}

#[derive(Debug)]
pub struct TokenCache {
    capacity: usize,
    entries: HashMap<CacheKey, CachedTokens>,
    order: VecDeque<CacheKey>,
    evictions: usize,
}

impl TokenCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: VecDeque::new(),
            evictions: 0,
        }
    }

    pub fn get(&self, id: &str, updated_at: &str) -> Option<&CachedTokens> {
        self.entries.get(&(id.to_string(), updated_at.to_string()))
    }

    /// Stores tokens for a note version, evicting the oldest entries.
    pub fn insert(&mut self, id: &str, updated_at: &str, tokens: CachedTokens) {
        let key = (id.to_string(), updated_at.to_string());
        if self.entries.insert(key.clone(), tokens).is_none() {
            self.order.push_back(key);
        }
        while self.entries.len() > self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            if self.entries.remove(&oldest).is_some() {
                self.evictions += 1;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn evictions(&self) -> usize {
        self.evictions
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}
