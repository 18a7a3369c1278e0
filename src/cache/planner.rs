//! Invalidation plan generation.
//!
//! Given a mutation and the entity snapshots around it, computes the set of
//! cache keys, key patterns, and scopes that must be purged so no cached
//! result affected by the write survives. Purges commute and are idempotent,
//! so the plan is unordered.

use std::collections::HashSet;
use std::fmt;

use crate::application::filter::SortField;
use crate::domain::ListingRecord;

use super::keys::{
    CacheKey, KeyPattern, ScopeTag, all_key, all_viewer_pattern, detail_key, detail_viewer_pattern,
    scopes_for,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Created,
    Updated,
    Deleted,
}

/// Purge targets for one mutation.
///
/// `keys` are deleted exactly, `patterns` via glob delete (the unbounded
/// per-viewer families), and `scopes` are drained through the scope index.
/// Viewer-scoped list entries carry the same scopes as their unpersonalized
/// query, so scope drains cover them without globbing.
#[derive(Debug, Default)]
pub struct InvalidationPlan {
    pub keys: HashSet<CacheKey>,
    pub patterns: HashSet<KeyPattern>,
    pub scopes: HashSet<ScopeTag>,
}

impl fmt::Display for InvalidationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "InvalidationPlan {{ keys: {}, patterns: {}, scopes: {} }}",
            self.keys.len(),
            self.patterns.len(),
            self.scopes.len(),
        )
    }
}

impl InvalidationPlan {
    /// Compute the purge set for a mutation.
    ///
    /// `prior` is absent on create, `new` on delete. An update whose
    /// snapshots differ only in the like counter takes the narrow path:
    /// owner/group/field scopes are preserved across the counter churn, and
    /// only the rank-sensitive families (the default listing, every sort
    /// order) plus the entity's detail variants are purged.
    pub fn for_mutation(
        kind: MutationKind,
        prior: Option<&ListingRecord>,
        new: Option<&ListingRecord>,
    ) -> Self {
        let mut plan = Self::default();

        // Any mutation can change membership or rank of the default listing.
        plan.keys.insert(all_key(None));
        plan.patterns.insert(all_viewer_pattern());
        plan.scopes.insert(ScopeTag::All);

        if matches!(kind, MutationKind::Updated | MutationKind::Deleted) {
            if let Some(entity) = prior.or(new) {
                plan.keys.insert(detail_key(entity.id, None));
                plan.patterns.insert(detail_viewer_pattern(entity.id));
            }
        }

        let counter_only = kind == MutationKind::Updated
            && matches!(
                (prior, new),
                (Some(p), Some(n)) if p.differs_only_in_like_count(n)
            );

        if counter_only {
            // Counter churn is high-frequency; a full scope purge per toggle
            // would be an invalidation storm. Rank-coupled orderings still
            // purge, everything keyed purely on membership survives.
            for field in SortField::ALL {
                plan.scopes.insert(ScopeTag::Order(field));
            }
        } else {
            // The union handles an entity moving between scopes, e.g. a
            // re-assigned owner: both the old and new owner's lists purge.
            if let Some(entity) = prior {
                plan.scopes.extend(scopes_for(entity));
            }
            if let Some(entity) = new {
                plan.scopes.extend(scopes_for(entity));
            }
        }

        plan
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty() && self.patterns.is_empty() && self.scopes.is_empty()
    }
}
