//! Cache key derivation.
//!
//! Turns a `FilterSpec` into a canonical cache key string, an entity into the
//! set of scope tags it belongs to, and exact keys into the glob patterns
//! covering their per-viewer variants.
//!
//! Key layout:
//!
//! - `listing:<id>` / `listing:<id>:viewer:<viewer>` — detail entries
//! - `listings:all` / `listings:all:viewer:<viewer>` — the default listing
//! - `listings:f:<segments>` — any other list query; predicate segments
//!   render in one fixed lexicographic order (`category`, `featured`,
//!   `group`, `owner`) followed by `sort`, `page`, and `viewer` sections,
//!   so construction order never affects the key.

use std::collections::HashSet;
use std::fmt;

use thiserror::Error;
use uuid::Uuid;

use crate::application::filter::{FilterSpec, SortField};
use crate::domain::ListingRecord;

/// Upper bound on a canonicalizable page size. Anything larger fails closed
/// and the caller bypasses the cache for that query.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Reserved key for the no-predicate, default-sort, first-page listing.
const ALL_KEY: &str = "listings:all";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("page request cannot be canonicalized: page {page}, limit {limit}")]
    Pagination { page: u32, limit: u32 },
}

/// A canonical cache key string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A `*`-wildcard pattern over the keyspace, used only toward
/// `CacheStore::delete_pattern`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyPattern(String);

impl KeyPattern {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A dimension a cached list depends on. When a mutation touches a scope,
/// every list entry tagged with it must be purged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScopeTag {
    /// The unscoped listing family: every no-predicate list entry.
    All,
    Owner(Uuid),
    Group(Uuid),
    /// An exact-match filterable field value, e.g. `featured=true`.
    Field {
        name: &'static str,
        value: String,
    },
    /// A sort-order family. Every entity participates in every order.
    Order(SortField),
}

impl fmt::Display for ScopeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Owner(id) => write!(f, "owner:{id}"),
            Self::Group(id) => write!(f, "group:{id}"),
            Self::Field { name, value } => write!(f, "filter:{name}={value}"),
            Self::Order(field) => write!(f, "order:{}", field.as_str()),
        }
    }
}

/// Key for a single-entity read, personalized when a viewer is present.
pub fn detail_key(id: Uuid, viewer: Option<Uuid>) -> CacheKey {
    match viewer {
        Some(viewer) => CacheKey(format!("listing:{id}:viewer:{viewer}")),
        None => CacheKey(format!("listing:{id}")),
    }
}

/// Pattern covering every viewer-scoped detail variant of one entity.
pub fn detail_viewer_pattern(id: Uuid) -> KeyPattern {
    KeyPattern(format!("listing:{id}:viewer:*"))
}

/// The default listing key, personalized when a viewer is present.
pub fn all_key(viewer: Option<Uuid>) -> CacheKey {
    match viewer {
        Some(viewer) => CacheKey(format!("{ALL_KEY}:viewer:{viewer}")),
        None => CacheKey(ALL_KEY.to_string()),
    }
}

/// Pattern covering every viewer-scoped variant of the default listing.
pub fn all_viewer_pattern() -> KeyPattern {
    KeyPattern(format!("{ALL_KEY}:viewer:*"))
}

/// Canonical key for a list query.
///
/// Set-equal specs derive equal keys regardless of construction order; the
/// predicate-free default spec maps to the distinct `listings:all` constant.
pub fn list_key(filter: &FilterSpec) -> Result<CacheKey, KeyError> {
    let page = filter.page;
    if page.page == 0 || page.limit == 0 || page.limit > MAX_PAGE_LIMIT {
        return Err(KeyError::Pagination {
            page: page.page,
            limit: page.limit,
        });
    }

    if !filter.has_predicates() && filter.sort.is_none() && page.is_default() {
        return Ok(all_key(filter.viewer));
    }

    // Fixed lexicographic predicate order: category, featured, group, owner.
    let mut segments = Vec::new();
    if let Some(category) = filter.category {
        segments.push(format!("category={}", category.as_str()));
    }
    if let Some(featured) = filter.featured {
        segments.push(format!("featured={featured}"));
    }
    if let Some(group) = filter.group {
        segments.push(format!("group={group}"));
    }
    if let Some(owner) = filter.owner {
        segments.push(format!("owner={owner}"));
    }
    if let Some(sort) = filter.sort {
        segments.push(format!(
            "sort={}.{}",
            sort.field.as_str(),
            sort.direction.as_str()
        ));
    }
    segments.push(format!("page={}.{}", page.page, page.limit));
    if let Some(viewer) = filter.viewer {
        segments.push(format!("viewer={viewer}"));
    }

    Ok(CacheKey(format!("listings:f:{}", segments.join(":"))))
}

/// Scope tags an entity currently belongs to: its owner, each group, each
/// filterable field value, and one order tag per sort field.
pub fn scopes_for(entity: &ListingRecord) -> HashSet<ScopeTag> {
    let mut scopes = HashSet::new();
    scopes.insert(ScopeTag::Owner(entity.owner_id));
    for group_id in &entity.group_ids {
        scopes.insert(ScopeTag::Group(*group_id));
    }
    scopes.insert(ScopeTag::Field {
        name: "featured",
        value: entity.featured.to_string(),
    });
    scopes.insert(ScopeTag::Field {
        name: "category",
        value: entity.category.as_str().to_string(),
    });
    for field in SortField::ALL {
        scopes.insert(ScopeTag::Order(field));
    }
    scopes
}

/// Scope tags a cached list entry depends on, derived from its query.
///
/// The viewer does not contribute a scope: personalized variants share the
/// scopes of their unpersonalized query.
pub fn list_scopes(filter: &FilterSpec) -> HashSet<ScopeTag> {
    let mut scopes = HashSet::new();
    if let Some(owner) = filter.owner {
        scopes.insert(ScopeTag::Owner(owner));
    }
    if let Some(group) = filter.group {
        scopes.insert(ScopeTag::Group(group));
    }
    if let Some(featured) = filter.featured {
        scopes.insert(ScopeTag::Field {
            name: "featured",
            value: featured.to_string(),
        });
    }
    if let Some(category) = filter.category {
        scopes.insert(ScopeTag::Field {
            name: "category",
            value: category.as_str().to_string(),
        });
    }
    if let Some(sort) = filter.sort {
        scopes.insert(ScopeTag::Order(sort.field));
    }
    if !filter.has_predicates() {
        scopes.insert(ScopeTag::All);
    }
    scopes
}
