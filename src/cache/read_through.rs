//! Read-through cache for detail and list queries.
//!
//! Get-or-load: serve hits from the cache store, populate on miss from the
//! authoritative loader, and never let a cache fault reach the caller — any
//! store error or timeout degrades the read to a plain load.

use std::future::Future;
use std::sync::Arc;

use metrics::counter;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::application::filter::FilterSpec;
use crate::application::repos::{CacheFault, CacheStore, StoreError};
use crate::domain::ListingRecord;

use super::config::CacheConfig;
use super::index::ScopeIndex;
use super::keys::{CacheKey, detail_key, list_key, list_scopes};

const METRIC_HIT: &str = "freshet_cache_hit_total";
const METRIC_MISS: &str = "freshet_cache_miss_total";
const METRIC_BYPASS: &str = "freshet_cache_bypass_total";

/// Read-side engine: derives keys, consults the cache store, and populates
/// misses, registering list entries in the scope index as it goes.
pub struct ReadThroughCache {
    config: CacheConfig,
    cache: Arc<dyn CacheStore>,
    index: Arc<ScopeIndex>,
}

impl ReadThroughCache {
    pub fn new(config: CacheConfig, cache: Arc<dyn CacheStore>, index: Arc<ScopeIndex>) -> Self {
        Self {
            config,
            cache,
            index,
        }
    }

    /// Get-or-load a list query.
    ///
    /// A key derivation failure bypasses the cache for this query; the read
    /// itself fails only when the loader does.
    pub async fn get_list<F, Fut>(
        &self,
        filter: &FilterSpec,
        loader: F,
    ) -> Result<Vec<ListingRecord>, StoreError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<ListingRecord>, StoreError>>,
    {
        if !self.config.enabled {
            return loader().await;
        }

        let key = match list_key(filter) {
            Ok(key) => key,
            Err(err) => {
                debug!(error = %err, "List query bypasses cache: key not canonicalizable");
                counter!(METRIC_BYPASS, "kind" => "list").increment(1);
                return loader().await;
            }
        };

        if let Some(value) = self.cached_value(&key).await {
            match serde_json::from_value::<Vec<ListingRecord>>(value) {
                Ok(records) => {
                    counter!(METRIC_HIT, "kind" => "list").increment(1);
                    return Ok(records);
                }
                Err(err) => {
                    warn!(key = %key, error = %err, "Discarding undecodable cached list");
                }
            }
        }

        counter!(METRIC_MISS, "kind" => "list").increment(1);
        let records = loader().await?;

        if let Ok(value) = serde_json::to_value(&records) {
            if self.populate(&key, value).await {
                self.index.register(key, list_scopes(filter));
            }
        }

        Ok(records)
    }

    /// Get-or-load a single entity. Absent entities are not cached.
    pub async fn get_detail<F, Fut>(
        &self,
        id: Uuid,
        viewer: Option<Uuid>,
        loader: F,
    ) -> Result<Option<ListingRecord>, StoreError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<ListingRecord>, StoreError>>,
    {
        if !self.config.enabled {
            return loader().await;
        }

        let key = detail_key(id, viewer);

        if let Some(value) = self.cached_value(&key).await {
            match serde_json::from_value::<ListingRecord>(value) {
                Ok(record) => {
                    counter!(METRIC_HIT, "kind" => "detail").increment(1);
                    return Ok(Some(record));
                }
                Err(err) => {
                    warn!(key = %key, error = %err, "Discarding undecodable cached detail");
                }
            }
        }

        counter!(METRIC_MISS, "kind" => "detail").increment(1);
        let record = loader().await?;

        if let Some(record) = &record
            && let Ok(value) = serde_json::to_value(record)
        {
            self.populate(&key, value).await;
        }

        Ok(record)
    }

    /// Fetch a cached value, swallowing faults as misses.
    async fn cached_value(&self, key: &CacheKey) -> Option<Value> {
        match self.bounded(self.cache.get(key.as_str())).await {
            Ok(value) => value,
            Err(fault) => {
                warn!(key = %key, error = %fault, "Cache read failed; treating as miss");
                None
            }
        }
    }

    /// Store a loaded value unless a concurrent invalidation landed during
    /// the load.
    ///
    /// The `exists` re-check is the anti-dogpile guard: a key that
    /// reappeared between our miss and this set was populated by a reader
    /// who loaded after the invalidation, so their value is at least as
    /// fresh as ours and must not be clobbered. On any fault the set is
    /// skipped; the next reader repopulates.
    ///
    /// Returns true when the value was written.
    async fn populate(&self, key: &CacheKey, value: Value) -> bool {
        match self.bounded(self.cache.exists(key.as_str())).await {
            Ok(true) => {
                debug!(key = %key, "Skipping cache set: key repopulated during load");
                return false;
            }
            Ok(false) => {}
            Err(fault) => {
                debug!(key = %key, error = %fault, "Skipping cache set: existence check failed");
                return false;
            }
        }

        match self
            .bounded(self.cache.set(key.as_str(), value, self.config.ttl_seconds))
            .await
        {
            Ok(()) => true,
            Err(fault) => {
                warn!(key = %key, error = %fault, "Cache populate failed");
                false
            }
        }
    }

    async fn bounded<T>(
        &self,
        op: impl Future<Output = Result<T, CacheFault>>,
    ) -> Result<T, CacheFault> {
        match tokio::time::timeout(self.config.op_timeout(), op).await {
            Ok(result) => result,
            Err(_) => Err(CacheFault::Timeout),
        }
    }
}
