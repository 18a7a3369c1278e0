//! Collaborator traits describing the authoritative store and the cache store.
//!
//! Both are injected handles, never module-level singletons: every engine
//! component takes the stores it needs at construction time, which keeps
//! test doubles trivial and hidden global state out of the crate.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::application::filter::FilterSpec;
use crate::domain::{Category, ListingRecord};

/// Failures of the authoritative store. The only error class that
/// propagates to callers of the engine.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("store timeout")]
    Timeout,
}

impl StoreError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }
}

/// Failures of the cache store. Never surfaced to engine callers: reads
/// degrade to misses, invalidations are logged and dropped.
#[derive(Debug, Error)]
pub enum CacheFault {
    #[error("cache store error: {0}")]
    Backend(String),
    #[error("cache operation timed out")]
    Timeout,
    #[error("cached value could not be decoded: {0}")]
    Codec(String),
}

impl CacheFault {
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct CreateListingParams {
    pub owner_id: Uuid,
    pub group_ids: Vec<Uuid>,
    pub name: String,
    pub featured: bool,
    pub category: Category,
}

/// Partial update: `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdateListingFields {
    pub owner_id: Option<Uuid>,
    pub group_ids: Option<Vec<Uuid>>,
    pub name: Option<String>,
    pub featured: Option<bool>,
    pub category: Option<Category>,
    pub like_count: Option<i64>,
}

impl UpdateListingFields {
    pub fn is_empty(&self) -> bool {
        self.owner_id.is_none()
            && self.group_ids.is_none()
            && self.name.is_none()
            && self.featured.is_none()
            && self.category.is_none()
            && self.like_count.is_none()
    }
}

/// Authoritative CRUD over the listing collection.
///
/// Mutating operations return prior/new snapshots so the invalidation
/// planner can compute scope differences without a second read.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn create(&self, params: CreateListingParams) -> Result<ListingRecord, StoreError>;

    async fn get_by_id(
        &self,
        id: Uuid,
        viewer: Option<Uuid>,
    ) -> Result<Option<ListingRecord>, StoreError>;

    /// Filtered, sorted, paginated read. The filter's `viewer` drives the
    /// personalized decorations on each returned record.
    async fn get_all(&self, filter: &FilterSpec) -> Result<Vec<ListingRecord>, StoreError>;

    async fn get_by_owner(&self, owner_id: Uuid) -> Result<Vec<ListingRecord>, StoreError>;

    /// Returns `(prior, new)` snapshots, or `None` when no such listing exists.
    async fn update(
        &self,
        id: Uuid,
        fields: UpdateListingFields,
    ) -> Result<Option<(ListingRecord, ListingRecord)>, StoreError>;

    /// Sets the viewer's like flag and adjusts the counter accordingly.
    /// Returns `(prior, new)` snapshots, or `None` when no such listing exists.
    async fn set_liked(
        &self,
        id: Uuid,
        viewer: Uuid,
        liked: bool,
    ) -> Result<Option<(ListingRecord, ListingRecord)>, StoreError>;

    /// Returns the prior snapshot, or `None` when no such listing exists.
    async fn delete(&self, id: Uuid) -> Result<Option<ListingRecord>, StoreError>;

    /// Removes every listing; returns the count removed.
    async fn purge_all(&self) -> Result<u64, StoreError>;
}

/// Key-value cache with TTL, existence check, single-key delete and
/// glob-pattern delete. Externally synchronized; the engine issues only
/// independent key operations and never assumes cross-key transactions.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheFault>;

    async fn set(&self, key: &str, value: Value, ttl_seconds: u64) -> Result<(), CacheFault>;

    async fn delete(&self, key: &str) -> Result<bool, CacheFault>;

    /// Deletes every key matching a `*`-wildcard pattern; returns the count.
    async fn delete_pattern(&self, pattern: &str) -> Result<u64, CacheFault>;

    async fn exists(&self, key: &str) -> Result<bool, CacheFault>;

    /// Drops every entry; returns the count dropped.
    async fn clear(&self) -> Result<u64, CacheFault>;
}

/// Optional decoration source for owner display names, consulted by the
/// store's mapping step before records reach the cache.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn display_name(&self, owner_id: Uuid) -> Option<String>;
}
