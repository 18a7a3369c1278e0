//! Scope index: the secondary index behind scope-driven invalidation.
//!
//! Tracks which list cache keys depend on which scopes, in both directions,
//! so purging a scope touches only the entries registered under it rather
//! than scanning the whole keyspace.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use super::keys::{CacheKey, ScopeTag};
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::index";

/// `ScopeTag -> set<CacheKey>` with the reverse mapping for cleanup.
///
/// Maintained by the read path whenever a list entry is populated; drained
/// by the write path when a mutation touches a scope.
pub struct ScopeIndex {
    scope_to_keys: RwLock<HashMap<ScopeTag, HashSet<CacheKey>>>,
    key_to_scopes: RwLock<HashMap<CacheKey, HashSet<ScopeTag>>>,
}

impl ScopeIndex {
    pub fn new() -> Self {
        Self {
            scope_to_keys: RwLock::new(HashMap::new()),
            key_to_scopes: RwLock::new(HashMap::new()),
        }
    }

    /// Register a populated list entry under the scopes its query depends on.
    pub fn register(&self, key: CacheKey, scopes: HashSet<ScopeTag>) {
        let mut s2k = rw_write(&self.scope_to_keys, SOURCE, "register.scopes");
        let mut k2s = rw_write(&self.key_to_scopes, SOURCE, "register.keys");

        for scope in &scopes {
            s2k.entry(scope.clone()).or_default().insert(key.clone());
        }
        k2s.insert(key, scopes);
    }

    /// All keys currently registered under a scope.
    pub fn keys_for_scope(&self, scope: &ScopeTag) -> HashSet<CacheKey> {
        rw_read(&self.scope_to_keys, SOURCE, "keys_for_scope")
            .get(scope)
            .cloned()
            .unwrap_or_default()
    }

    /// Remove and return every key registered under a scope, cleaning the
    /// reverse mapping as it goes. The returned keys are the purge set.
    pub fn drain_scope(&self, scope: &ScopeTag) -> HashSet<CacheKey> {
        let mut s2k = rw_write(&self.scope_to_keys, SOURCE, "drain_scope.scopes");
        let mut k2s = rw_write(&self.key_to_scopes, SOURCE, "drain_scope.keys");

        let keys = s2k.remove(scope).unwrap_or_default();
        for key in &keys {
            if let Some(scopes) = k2s.get_mut(key) {
                scopes.remove(scope);
                if scopes.is_empty() {
                    k2s.remove(key);
                }
            }
        }
        keys
    }

    /// Remove one key from every scope it was registered under.
    ///
    /// Called when an entry is purged outside a scope drain (exact-key or
    /// pattern deletes) so the index never accumulates dead keys.
    pub fn remove_key(&self, key: &CacheKey) {
        let mut s2k = rw_write(&self.scope_to_keys, SOURCE, "remove_key.scopes");
        let mut k2s = rw_write(&self.key_to_scopes, SOURCE, "remove_key.keys");

        if let Some(scopes) = k2s.remove(key) {
            for scope in scopes {
                if let Some(keys) = s2k.get_mut(&scope) {
                    keys.remove(key);
                    if keys.is_empty() {
                        s2k.remove(&scope);
                    }
                }
            }
        }
    }

    pub fn clear(&self) {
        rw_write(&self.scope_to_keys, SOURCE, "clear.scopes").clear();
        rw_write(&self.key_to_scopes, SOURCE, "clear.keys").clear();
    }

    pub fn scope_count(&self) -> usize {
        rw_read(&self.scope_to_keys, SOURCE, "scope_count").len()
    }

    pub fn key_count(&self) -> usize {
        rw_read(&self.key_to_scopes, SOURCE, "key_count").len()
    }
}

impl Default for ScopeIndex {
    fn default() -> Self {
        Self::new()
    }
}
