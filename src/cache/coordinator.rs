//! Write path: write-then-invalidate sequencing.
//!
//! Every mutation goes to the authoritative store first; only after the
//! write commits does the invalidation fan-out run. Invalidating before the
//! commit would let a concurrent reader repopulate the cache with pre-write
//! data that outlives the purge. Invalidation failures are logged per
//! target and never gate mutation success; the TTL bounds the resulting
//! staleness.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::application::repos::{
    CacheFault, CacheStore, CreateListingParams, EntityStore, StoreError, UpdateListingFields,
};
use crate::domain::ListingRecord;

use super::config::CacheConfig;
use super::index::ScopeIndex;
use super::planner::{InvalidationPlan, MutationKind};

const METRIC_INVALIDATION_MS: &str = "freshet_invalidation_ms";
const METRIC_PURGED: &str = "freshet_invalidation_purged_total";
const METRIC_FAILED: &str = "freshet_invalidation_failed_total";

/// Coordinates authoritative writes with dependent cache invalidation.
pub struct MutationCoordinator {
    config: CacheConfig,
    store: Arc<dyn EntityStore>,
    cache: Arc<dyn CacheStore>,
    index: Arc<ScopeIndex>,
}

impl MutationCoordinator {
    pub fn new(
        config: CacheConfig,
        store: Arc<dyn EntityStore>,
        cache: Arc<dyn CacheStore>,
        index: Arc<ScopeIndex>,
    ) -> Self {
        Self {
            config,
            store,
            cache,
            index,
        }
    }

    #[instrument(skip(self, params))]
    pub async fn create(&self, params: CreateListingParams) -> Result<ListingRecord, StoreError> {
        let record = self.store.create(params).await?;
        self.invalidate(MutationKind::Created, None, Some(&record))
            .await;
        Ok(record)
    }

    /// Partial field update. Returns false when no such listing exists.
    #[instrument(skip(self, fields))]
    pub async fn update(&self, id: Uuid, fields: UpdateListingFields) -> Result<bool, StoreError> {
        if fields.is_empty() {
            return Err(StoreError::invalid_input("update carries no fields"));
        }
        let Some((prior, new)) = self.store.update(id, fields).await? else {
            return Ok(false);
        };
        self.invalidate(MutationKind::Updated, Some(&prior), Some(&new))
            .await;
        Ok(true)
    }

    /// Flip the viewer's like flag. Returns the new flag, or `None` when no
    /// such listing exists. Counter-only by construction, so the planner
    /// takes the narrow path.
    #[instrument(skip(self))]
    pub async fn toggle_like(&self, id: Uuid, viewer: Uuid) -> Result<Option<bool>, StoreError> {
        let Some(current) = self.store.get_by_id(id, Some(viewer)).await? else {
            return Ok(None);
        };
        let liked = !current.liked_by_viewer.unwrap_or(false);
        let Some((prior, new)) = self.store.set_liked(id, viewer, liked).await? else {
            return Ok(None);
        };
        self.invalidate(MutationKind::Updated, Some(&prior), Some(&new))
            .await;
        Ok(Some(liked))
    }

    /// Delete a listing. Returns false when no such listing exists.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let Some(prior) = self.store.delete(id).await? else {
            return Ok(false);
        };
        self.invalidate(MutationKind::Deleted, Some(&prior), None)
            .await;
        Ok(true)
    }

    /// Remove every listing and flush the cache wholesale. Returns the
    /// count removed from the authoritative store.
    #[instrument(skip(self))]
    pub async fn purge_all(&self) -> Result<u64, StoreError> {
        let removed = self.store.purge_all().await?;
        if self.config.enabled {
            if let Err(fault) = self.bounded(self.cache.clear()).await {
                warn!(error = %fault, "Cache flush failed after purge; TTL bounds staleness");
            }
            self.index.clear();
        }
        Ok(removed)
    }

    /// Fan out the purge set for a committed mutation.
    ///
    /// Each delete carries its own error boundary: a failed purge is logged
    /// and counted, never retried synchronously, never surfaced.
    async fn invalidate(
        &self,
        kind: MutationKind,
        prior: Option<&ListingRecord>,
        new: Option<&ListingRecord>,
    ) {
        if !self.config.enabled {
            return;
        }

        let started_at = Instant::now();
        let plan = InvalidationPlan::for_mutation(kind, prior, new);
        info!(kind = ?kind, plan = %plan, "Invalidation fan-out starting");

        let mut purged: u64 = 0;

        for scope in &plan.scopes {
            for key in self.index.drain_scope(scope) {
                match self.bounded(self.cache.delete(key.as_str())).await {
                    Ok(deleted) => purged += u64::from(deleted),
                    Err(fault) => {
                        counter!(METRIC_FAILED).increment(1);
                        warn!(scope = %scope, key = %key, error = %fault, "Scope purge failed");
                    }
                }
            }
        }

        for key in &plan.keys {
            self.index.remove_key(key);
            match self.bounded(self.cache.delete(key.as_str())).await {
                Ok(deleted) => purged += u64::from(deleted),
                Err(fault) => {
                    counter!(METRIC_FAILED).increment(1);
                    warn!(key = %key, error = %fault, "Key purge failed");
                }
            }
        }

        for pattern in &plan.patterns {
            match self.bounded(self.cache.delete_pattern(pattern.as_str())).await {
                Ok(count) => purged += count,
                Err(fault) => {
                    counter!(METRIC_FAILED).increment(1);
                    warn!(pattern = %pattern, error = %fault, "Pattern purge failed");
                }
            }
        }

        counter!(METRIC_PURGED).increment(purged);
        histogram!(METRIC_INVALIDATION_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);
        info!(kind = ?kind, purged, "Invalidation fan-out complete");
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
