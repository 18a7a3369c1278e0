//! In-memory authoritative store adapter.
//!
//! Implements the full `EntityStore` contract, including filter/sort/paginate
//! semantics and viewer decoration, against process-local state. Used as the
//! engine's test double and as a single-process default.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::filter::{FilterSpec, SortDirection, SortField, SortSpec};
use crate::application::repos::{
    CreateListingParams, EntityStore, IdentityResolver, StoreError, UpdateListingFields,
};
use crate::cache::lock::{rw_read, rw_write};
use crate::domain::ListingRecord;

const SOURCE: &str = "infra::memory";

#[derive(Default)]
struct Inner {
    listings: HashMap<Uuid, ListingRecord>,
    likes: HashMap<Uuid, HashSet<Uuid>>,
}

/// Process-local listing store.
pub struct MemoryListings {
    inner: RwLock<Inner>,
    resolver: Option<Arc<dyn IdentityResolver>>,
}

impl MemoryListings {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            resolver: None,
        }
    }

    /// With an identity resolver decorating owner display names on reads
    /// and snapshots.
    pub fn with_resolver(resolver: Arc<dyn IdentityResolver>) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            resolver: Some(resolver),
        }
    }

    async fn decorate(&self, mut record: ListingRecord) -> ListingRecord {
        if let Some(resolver) = &self.resolver {
            record.owner_display_name = resolver.display_name(record.owner_id).await;
        }
        record
    }

    async fn decorate_all(&self, records: Vec<ListingRecord>) -> Vec<ListingRecord> {
        let mut decorated = Vec::with_capacity(records.len());
        for record in records {
            decorated.push(self.decorate(record).await);
        }
        decorated
    }
}

impl Default for MemoryListings {
    fn default() -> Self {
        Self::new()
    }
}

fn matches(record: &ListingRecord, filter: &FilterSpec) -> bool {
    if let Some(owner) = filter.owner
        && record.owner_id != owner
    {
        return false;
    }
    if let Some(group) = filter.group
        && !record.group_ids.contains(&group)
    {
        return false;
    }
    if let Some(featured) = filter.featured
        && record.featured != featured
    {
        return false;
    }
    if let Some(category) = filter.category
        && record.category != category
    {
        return false;
    }
    true
}

fn compare(a: &ListingRecord, b: &ListingRecord, sort: Option<SortSpec>) -> Ordering {
    // Default order: newest first, id as the stable tie-break.
    let spec = sort.unwrap_or(SortSpec {
        field: SortField::CreatedAt,
        direction: SortDirection::Desc,
    });
    let ordering = match spec.field {
        SortField::LikeCount => a.like_count.cmp(&b.like_count),
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
    };
    let ordering = match spec.direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    };
    ordering.then_with(|| a.id.cmp(&b.id))
}

#[async_trait]
impl EntityStore for MemoryListings {
    async fn create(&self, params: CreateListingParams) -> Result<ListingRecord, StoreError> {
        if params.name.trim().is_empty() {
            return Err(StoreError::invalid_input("listing name must not be empty"));
        }
        let now = OffsetDateTime::now_utc();
        let record = ListingRecord {
            id: Uuid::new_v4(),
            owner_id: params.owner_id,
            group_ids: params.group_ids,
            name: params.name,
            featured: params.featured,
            category: params.category,
            like_count: 0,
            created_at: now,
            updated_at: now,
            owner_display_name: None,
            liked_by_viewer: None,
        };
        rw_write(&self.inner, SOURCE, "create")
            .listings
            .insert(record.id, record.clone());
        Ok(self.decorate(record).await)
    }

    async fn get_by_id(
        &self,
        id: Uuid,
        viewer: Option<Uuid>,
    ) -> Result<Option<ListingRecord>, StoreError> {
        let record = {
            let inner = rw_read(&self.inner, SOURCE, "get_by_id");
            inner.listings.get(&id).cloned().map(|mut record| {
                record.liked_by_viewer = viewer.map(|viewer| {
                    inner
                        .likes
                        .get(&id)
                        .is_some_and(|likes| likes.contains(&viewer))
                });
                record
            })
        };
        match record {
            Some(record) => Ok(Some(self.decorate(record).await)),
            None => Ok(None),
        }
    }

    async fn get_all(&self, filter: &FilterSpec) -> Result<Vec<ListingRecord>, StoreError> {
        let page = filter.page;
        if page.page == 0 || page.limit == 0 {
            return Err(StoreError::invalid_input("page and limit must be positive"));
        }

        let records = {
            let inner = rw_read(&self.inner, SOURCE, "get_all");
            let mut records: Vec<ListingRecord> = inner
                .listings
                .values()
                .filter(|record| matches(record, filter))
                .cloned()
                .collect();
            records.sort_by(|a, b| compare(a, b, filter.sort));

            let offset = (page.page as usize - 1).saturating_mul(page.limit as usize);
            let mut records: Vec<ListingRecord> = records
                .into_iter()
                .skip(offset)
                .take(page.limit as usize)
                .collect();

            if let Some(viewer) = filter.viewer {
                for record in &mut records {
                    record.liked_by_viewer = Some(
                        inner
                            .likes
                            .get(&record.id)
                            .is_some_and(|likes| likes.contains(&viewer)),
                    );
                }
            }
            records
        };

        Ok(self.decorate_all(records).await)
    }

    async fn get_by_owner(&self, owner_id: Uuid) -> Result<Vec<ListingRecord>, StoreError> {
        let filter = FilterSpec {
            owner: Some(owner_id),
            ..Default::default()
        };
        let records = {
            let inner = rw_read(&self.inner, SOURCE, "get_by_owner");
            let mut records: Vec<ListingRecord> = inner
                .listings
                .values()
                .filter(|record| matches(record, &filter))
                .cloned()
                .collect();
            records.sort_by(|a, b| compare(a, b, None));
            records
        };
        Ok(self.decorate_all(records).await)
    }

    async fn update(
        &self,
        id: Uuid,
        fields: UpdateListingFields,
    ) -> Result<Option<(ListingRecord, ListingRecord)>, StoreError> {
        let snapshots = {
            let mut inner = rw_write(&self.inner, SOURCE, "update");
            let Some(record) = inner.listings.get_mut(&id) else {
                return Ok(None);
            };
            let prior = record.clone();
            if let Some(owner_id) = fields.owner_id {
                record.owner_id = owner_id;
            }
            if let Some(group_ids) = fields.group_ids {
                record.group_ids = group_ids;
            }
            if let Some(name) = fields.name {
                record.name = name;
            }
            if let Some(featured) = fields.featured {
                record.featured = featured;
            }
            if let Some(category) = fields.category {
                record.category = category;
            }
            if let Some(like_count) = fields.like_count {
                record.like_count = like_count;
            }
            record.updated_at = OffsetDateTime::now_utc();
            (prior, record.clone())
        };
        let (prior, new) = snapshots;
        Ok(Some((self.decorate(prior).await, self.decorate(new).await)))
    }

    async fn set_liked(
        &self,
        id: Uuid,
        viewer: Uuid,
        liked: bool,
    ) -> Result<Option<(ListingRecord, ListingRecord)>, StoreError> {
        let snapshots = {
            let mut guard = rw_write(&self.inner, SOURCE, "set_liked");
            let inner = &mut *guard;
            if !inner.listings.contains_key(&id) {
                return Ok(None);
            }
            let likes = inner.likes.entry(id).or_default();
            let was_liked = likes.contains(&viewer);
            if liked {
                likes.insert(viewer);
            } else {
                likes.remove(&viewer);
            }

            let record = inner
                .listings
                .get_mut(&id)
                .ok_or(StoreError::NotFound)?;
            let mut prior = record.clone();
            prior.liked_by_viewer = Some(was_liked);

            if liked != was_liked {
                record.like_count += if liked { 1 } else { -1 };
                record.updated_at = OffsetDateTime::now_utc();
            }
            let mut new = record.clone();
            new.liked_by_viewer = Some(liked);
            (prior, new)
        };
        let (prior, new) = snapshots;
        Ok(Some((self.decorate(prior).await, self.decorate(new).await)))
    }

    async fn delete(&self, id: Uuid) -> Result<Option<ListingRecord>, StoreError> {
        let mut inner = rw_write(&self.inner, SOURCE, "delete");
        inner.likes.remove(&id);
        Ok(inner.listings.remove(&id))
    }

    async fn purge_all(&self) -> Result<u64, StoreError> {
        let mut inner = rw_write(&self.inner, SOURCE, "purge_all");
        let count = inner.listings.len() as u64;
        inner.listings.clear();
        inner.likes.clear();
        Ok(count)
    }
}

/// Fixed-map identity resolver for tests and demos.
pub struct StaticIdentityResolver {
    names: HashMap<Uuid, String>,
}

impl StaticIdentityResolver {
    pub fn new(names: HashMap<Uuid, String>) -> Self {
        Self { names }
    }
}

#[async_trait]
impl IdentityResolver for StaticIdentityResolver {
    async fn display_name(&self, owner_id: Uuid) -> Option<String> {
        self.names.get(&owner_id).cloned()
    }
}
