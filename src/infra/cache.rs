//! In-memory cache store adapter.
//!
//! A single-process `CacheStore` with TTL (lazy expiry) and `*`-wildcard
//! pattern deletes. Serves as the default store for single-node deployments
//! and as the test double for the engine's integration tests.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;

use crate::application::repos::{CacheFault, CacheStore};
use crate::cache::lock::{rw_read, rw_write};

const SOURCE: &str = "infra::cache";

struct Entry {
    value: Value,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// In-memory key-value cache with per-entry TTL.
///
/// Expired entries are absent: they are dropped lazily on the next
/// operation that touches them, so there is no stale-but-served state.
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        rw_read(&self.entries, SOURCE, "len")
            .values()
            .filter(|entry| entry.is_live(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Force a key's expiry into the past. Test affordance for exercising
    /// the TTL self-heal path without waiting out a real TTL.
    pub fn expire_now(&self, key: &str) {
        let mut entries = rw_write(&self.entries, SOURCE, "expire_now");
        if let Some(entry) = entries.get_mut(key) {
            entry.expires_at = Instant::now();
        }
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheFault> {
        let now = Instant::now();
        let mut entries = rw_write(&self.entries, SOURCE, "get");
        match entries.get(key) {
            Some(entry) if entry.is_live(now) => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Value, ttl_seconds: u64) -> Result<(), CacheFault> {
        let entry = Entry {
            value,
            expires_at: Instant::now() + Duration::from_secs(ttl_seconds),
        };
        rw_write(&self.entries, SOURCE, "set").insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheFault> {
        let now = Instant::now();
        let mut entries = rw_write(&self.entries, SOURCE, "delete");
        match entries.remove(key) {
            Some(entry) => Ok(entry.is_live(now)),
            None => Ok(false),
        }
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<u64, CacheFault> {
        let now = Instant::now();
        let mut entries = rw_write(&self.entries, SOURCE, "delete_pattern");
        let matched: Vec<String> = entries
            .iter()
            .filter(|(key, entry)| entry.is_live(now) && glob_match(pattern, key))
            .map(|(key, _)| key.clone())
            .collect();
        let count = matched.len() as u64;
        for key in matched {
            entries.remove(&key);
        }
        Ok(count)
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheFault> {
        let now = Instant::now();
        let mut entries = rw_write(&self.entries, SOURCE, "exists");
        match entries.get(key) {
            Some(entry) if entry.is_live(now) => Ok(true),
            Some(_) => {
                entries.remove(key);
                Ok(false)
            }
            None => Ok(false),
        }
    }

    async fn clear(&self) -> Result<u64, CacheFault> {
        let now = Instant::now();
        let mut entries = rw_write(&self.entries, SOURCE, "clear");
        let live = entries.values().filter(|entry| entry.is_live(now)).count() as u64;
        entries.clear();
        Ok(live)
    }
}

/// `*`-wildcard match. Greedy with backtracking; no other metacharacters.
fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern = pattern.as_bytes();
    let text = text.as_bytes();
    let (mut p, mut t) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == b'*' {
            star = Some((p, t));
            p += 1;
        } else if let Some((star_p, star_t)) = star {
            p = star_p + 1;
            t = star_t + 1;
            star = Some((star_p, star_t + 1));
        } else {
            return false;
        }
    }
    while p < pattern.len() && pattern[p] == b'*' {
        p += 1;
    }
    p == pattern.len()
}
