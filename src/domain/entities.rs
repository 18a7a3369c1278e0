//! Domain entities mirrored from the authoritative store.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Exact-match filterable classification of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Standard,
    Premium,
    Archive,
}

impl Category {
    /// Stable lowercase name used inside cache key segments.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Premium => "premium",
            Self::Archive => "archive",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "standard" => Some(Self::Standard),
            "premium" => Some(Self::Premium),
            "archive" => Some(Self::Archive),
            _ => None,
        }
    }
}

/// The cached aggregate: a mutable, filterable listing.
///
/// Every field except `id` may change over the record's lifetime.
/// `owner_display_name` and `liked_by_viewer` are decorations applied by the
/// store's mapping step; `liked_by_viewer` is present only on viewer-scoped
/// reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingRecord {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub group_ids: Vec<Uuid>,
    pub name: String,
    pub featured: bool,
    pub category: Category,
    pub like_count: i64,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub owner_display_name: Option<String>,
    pub liked_by_viewer: Option<bool>,
}

impl ListingRecord {
    /// True when `other` differs from `self` only in the like counter
    /// (and the decorations/timestamp that ride along with it).
    ///
    /// Drives the narrow invalidation path for counter churn.
    pub fn differs_only_in_like_count(&self, other: &Self) -> bool {
        self.id == other.id
            && self.owner_id == other.owner_id
            && self.group_ids == other.group_ids
            && self.name == other.name
            && self.featured == other.featured
            && self.category == other.category
            && self.created_at == other.created_at
            && self.like_count != other.like_count
    }
}
