//! Freshet keeps cached listing reads consistent with authoritative writes.
//!
//! The engine derives canonical cache keys from filtered queries, serves
//! reads through the cache with single-flight population, and purges the
//! precise set of keys a mutation can have staled. Cache trouble never
//! breaks a request: reads degrade to store loads and invalidation
//! failures are logged and dropped.

pub mod application;
pub mod cache;
pub mod domain;
pub mod infra;

pub use application::filter::{FilterSpec, PageRequest, SortDirection, SortField, SortSpec};
pub use application::repos::{
    CacheStore, CreateListingParams, EntityStore, IdentityResolver, StoreError,
    UpdateListingFields,
};
pub use cache::{CacheConfig, MutationCoordinator, MutationKind, ReadThroughCache, ScopeIndex};
pub use domain::{Category, ListingRecord};
