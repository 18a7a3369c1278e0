//! Cache-consistency engine.
//!
//! Four cooperating pieces keep cached reads consistent with writes:
//!
//! - **key derivation** ([`keys`]): canonical cache keys from typed queries,
//!   and the scope tags that tie entities to the list entries they affect
//! - **scope index** ([`index`]): `scope -> cache keys` so invalidation
//!   touches only the entries registered under a mutated scope
//! - **read-through** ([`read_through`]): get-or-load with an anti-dogpile
//!   existence re-check before every populate
//! - **write path** ([`planner`], [`coordinator`]): write-then-invalidate,
//!   with a narrow purge set for counter-only churn
//!
//! The engine is best-effort and TTL-bounded: cache faults degrade reads to
//! the authoritative store and never fail a mutation.

pub mod config;
pub mod coordinator;
pub mod index;
pub mod keys;
pub(crate) mod lock;
pub mod planner;
pub mod read_through;

pub use config::CacheConfig;
pub use coordinator::MutationCoordinator;
pub use index::ScopeIndex;
pub use keys::{CacheKey, KeyError, KeyPattern, ScopeTag};
pub use planner::{InvalidationPlan, MutationKind};
pub use read_through::ReadThroughCache;
