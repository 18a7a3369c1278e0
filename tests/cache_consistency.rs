//! End-to-end consistency checks wiring the read-through cache and the
//! mutation coordinator over the in-memory adapters.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use freshet::application::filter::{FilterSpec, SortDirection, SortField, SortSpec};
use freshet::application::repos::{
    CacheFault, CacheStore, CreateListingParams, EntityStore, StoreError, UpdateListingFields,
};
use freshet::cache::keys::{detail_key, list_key};
use freshet::cache::{CacheConfig, MutationCoordinator, ReadThroughCache, ScopeIndex};
use freshet::domain::Category;
use freshet::infra::cache::MemoryCacheStore;
use freshet::infra::memory::MemoryListings;
use serde_json::Value;
use uuid::Uuid;

struct Engine {
    store: Arc<MemoryListings>,
    cache: Arc<MemoryCacheStore>,
    reads: ReadThroughCache,
    writes: MutationCoordinator,
}

fn engine() -> Engine {
    let config = CacheConfig::default();
    let store = Arc::new(MemoryListings::new());
    let cache = Arc::new(MemoryCacheStore::new());
    let index = Arc::new(ScopeIndex::new());
    let reads = ReadThroughCache::new(config.clone(), cache.clone(), index.clone());
    let writes = MutationCoordinator::new(config, store.clone(), cache.clone(), index);
    Engine {
        store,
        cache,
        reads,
        writes,
    }
}

fn params(owner: Uuid, name: &str) -> CreateListingParams {
    CreateListingParams {
        owner_id: owner,
        group_ids: vec![],
        name: name.to_string(),
        featured: false,
        category: Category::Standard,
    }
}

/// Run a list read and report whether the loader had to hit the store.
async fn listed(engine: &Engine, filter: &FilterSpec) -> (Vec<String>, bool) {
    let loads = AtomicUsize::new(0);
    let records = engine
        .reads
        .get_list(filter, || async {
            loads.fetch_add(1, Ordering::SeqCst);
            engine.store.get_all(filter).await
        })
        .await
        .expect("list read");
    let names = records.into_iter().map(|record| record.name).collect();
    (names, loads.load(Ordering::SeqCst) > 0)
}

#[tokio::test]
async fn equivalent_queries_share_one_cache_entry() {
    let engine = engine();
    let owner = Uuid::new_v4();
    engine.writes.create(params(owner, "A")).await.unwrap();

    let owner_text = owner.to_string();
    let forward =
        FilterSpec::from_pairs([("owner", owner_text.as_str()), ("featured", "false")]).unwrap();
    let reversed =
        FilterSpec::from_pairs([("featured", "false"), ("owner", owner_text.as_str())]).unwrap();

    assert_eq!(
        list_key(&forward).unwrap().as_str(),
        list_key(&reversed).unwrap().as_str()
    );

    let (_, first_loaded) = listed(&engine, &forward).await;
    let (_, second_loaded) = listed(&engine, &reversed).await;
    assert!(first_loaded);
    assert!(!second_loaded, "reordered predicates must hit the same entry");
    assert_eq!(engine.cache.len(), 1);
}

#[tokio::test]
async fn updates_are_visible_on_the_next_read() {
    let engine = engine();
    let owner = Uuid::new_v4();
    let record = engine.writes.create(params(owner, "Before")).await.unwrap();

    let filter = FilterSpec::default();
    let (names, _) = listed(&engine, &filter).await;
    assert_eq!(names, vec!["Before"]);

    let updated = engine
        .writes
        .update(
            record.id,
            UpdateListingFields {
                name: Some("After".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(updated);

    let (names, loaded) = listed(&engine, &filter).await;
    assert!(loaded, "mutation must purge the stale list entry");
    assert_eq!(names, vec!["After"]);
}

#[tokio::test]
async fn mutations_leave_unrelated_scopes_cached() {
    let engine = engine();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    let target = engine.writes.create(params(alice, "Alice's")).await.unwrap();
    engine.writes.create(params(bob, "Bob's")).await.unwrap();

    let alices = FilterSpec {
        owner: Some(alice),
        ..Default::default()
    };
    let bobs = FilterSpec {
        owner: Some(bob),
        ..Default::default()
    };
    listed(&engine, &alices).await;
    listed(&engine, &bobs).await;

    engine
        .writes
        .update(
            target.id,
            UpdateListingFields {
                featured: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let (_, alice_loaded) = listed(&engine, &alices).await;
    let (_, bob_loaded) = listed(&engine, &bobs).await;
    assert!(alice_loaded, "mutated owner's list must be repopulated");
    assert!(!bob_loaded, "unrelated owner's list must survive the purge");

    // A create under a third owner leaves both cached owner lists alone.
    engine
        .writes
        .create(params(Uuid::new_v4(), "Carol's"))
        .await
        .unwrap();
    let (_, alice_loaded) = listed(&engine, &alices).await;
    let (_, bob_loaded) = listed(&engine, &bobs).await;
    assert!(!alice_loaded);
    assert!(!bob_loaded);
}

#[tokio::test]
async fn like_toggles_spare_membership_scopes() {
    let engine = engine();
    let owner = Uuid::new_v4();
    let viewer = Uuid::new_v4();
    let record = engine.writes.create(params(owner, "Mittens")).await.unwrap();

    let owner_list = FilterSpec {
        owner: Some(owner),
        ..Default::default()
    };
    let ranked = FilterSpec {
        sort: Some(SortSpec {
            field: SortField::LikeCount,
            direction: SortDirection::Desc,
        }),
        ..Default::default()
    };
    listed(&engine, &owner_list).await;
    listed(&engine, &ranked).await;

    let liked = engine.writes.toggle_like(record.id, viewer).await.unwrap();
    assert_eq!(liked, Some(true));

    let (_, owner_loaded) = listed(&engine, &owner_list).await;
    let (_, ranked_loaded) = listed(&engine, &ranked).await;
    assert!(
        !owner_loaded,
        "counter-only churn must not purge membership-scoped lists"
    );
    assert!(ranked_loaded, "rank-ordered lists must be purged");
}

#[tokio::test]
async fn delete_purges_detail_and_viewer_variants() {
    let engine = engine();
    let owner = Uuid::new_v4();
    let viewer = Uuid::new_v4();
    let record = engine.writes.create(params(owner, "Mittens")).await.unwrap();

    let owner_list = FilterSpec {
        owner: Some(owner),
        ..Default::default()
    };
    listed(&engine, &owner_list).await;
    engine
        .reads
        .get_detail(record.id, None, || async {
            engine.store.get_by_id(record.id, None).await
        })
        .await
        .unwrap();
    engine
        .reads
        .get_detail(record.id, Some(viewer), || async {
            engine.store.get_by_id(record.id, Some(viewer)).await
        })
        .await
        .unwrap();
    assert_eq!(engine.cache.len(), 3);

    assert!(engine.writes.delete(record.id).await.unwrap());

    let (names, owner_reloaded) = listed(&engine, &owner_list).await;
    assert!(owner_reloaded, "owner-scoped list must be purged on delete");
    assert!(names.is_empty());

    let anonymous = detail_key(record.id, None);
    let personalized = detail_key(record.id, Some(viewer));
    assert!(engine.cache.get(anonymous.as_str()).await.unwrap().is_none());
    assert!(
        engine
            .cache
            .get(personalized.as_str())
            .await
            .unwrap()
            .is_none(),
        "viewer variants must go with the base detail entry"
    );
}

#[tokio::test]
async fn expired_entries_reload_from_the_store() {
    let engine = engine();
    let owner = Uuid::new_v4();
    engine.writes.create(params(owner, "A")).await.unwrap();

    let filter = FilterSpec::default();
    let (_, first_loaded) = listed(&engine, &filter).await;
    assert!(first_loaded);

    let key = list_key(&filter).unwrap();
    engine.cache.expire_now(key.as_str());

    let (_, reloaded) = listed(&engine, &filter).await;
    assert!(reloaded, "an expired entry is a miss, not a hit");
}

/// Cache store that fails every operation.
struct DeadCache;

#[async_trait]
impl CacheStore for DeadCache {
    async fn get(&self, _key: &str) -> Result<Option<Value>, CacheFault> {
        Err(CacheFault::backend("down"))
    }

    async fn set(&self, _key: &str, _value: Value, _ttl_seconds: u64) -> Result<(), CacheFault> {
        Err(CacheFault::backend("down"))
    }

    async fn delete(&self, _key: &str) -> Result<bool, CacheFault> {
        Err(CacheFault::backend("down"))
    }

    async fn delete_pattern(&self, _pattern: &str) -> Result<u64, CacheFault> {
        Err(CacheFault::backend("down"))
    }

    async fn exists(&self, _key: &str) -> Result<bool, CacheFault> {
        Err(CacheFault::backend("down"))
    }

    async fn clear(&self) -> Result<u64, CacheFault> {
        Err(CacheFault::backend("down"))
    }
}

#[tokio::test]
async fn dead_cache_never_gates_reads_or_writes() {
    let config = CacheConfig::default();
    let store = Arc::new(MemoryListings::new());
    let cache: Arc<dyn CacheStore> = Arc::new(DeadCache);
    let index = Arc::new(ScopeIndex::new());
    let reads = ReadThroughCache::new(config.clone(), cache.clone(), index.clone());
    let writes = MutationCoordinator::new(config, store.clone(), cache, index);

    let owner = Uuid::new_v4();
    let record = writes.create(params(owner, "Mittens")).await.unwrap();

    let filter = FilterSpec::default();
    let records = reads
        .get_list(&filter, || async { store.get_all(&filter).await })
        .await
        .expect("read must degrade to the store");
    assert_eq!(records.len(), 1);

    assert!(
        writes
            .update(
                record.id,
                UpdateListingFields {
                    name: Some("Still here".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
    );
    assert!(writes.delete(record.id).await.unwrap());
}

#[tokio::test]
async fn purge_all_flushes_store_and_cache() {
    let engine = engine();
    let owner = Uuid::new_v4();
    engine.writes.create(params(owner, "A")).await.unwrap();
    engine.writes.create(params(owner, "B")).await.unwrap();
    listed(&engine, &FilterSpec::default()).await;
    assert!(!engine.cache.is_empty());

    assert_eq!(engine.writes.purge_all().await.unwrap(), 2);
    assert!(engine.cache.is_empty());

    let (names, _) = listed(&engine, &FilterSpec::default()).await;
    assert!(names.is_empty());
}

#[tokio::test]
async fn invalid_pagination_fails_closed_but_still_answers() {
    let engine = engine();
    let owner = Uuid::new_v4();
    engine.writes.create(params(owner, "A")).await.unwrap();

    // Over the cap: uncacheable yet servable.
    let oversized = FilterSpec {
        page: freshet::application::filter::PageRequest {
            page: 1,
            limit: 500,
        },
        ..Default::default()
    };
    assert!(list_key(&oversized).is_err());

    let (names, loaded) = listed(&engine, &oversized).await;
    assert!(loaded);
    assert_eq!(names, vec!["A"]);
    assert!(engine.cache.is_empty(), "uncacheable reads must not populate");
}

#[tokio::test]
async fn empty_update_is_rejected_before_the_store() {
    let engine = engine();
    let owner = Uuid::new_v4();
    let record = engine.writes.create(params(owner, "A")).await.unwrap();

    let err = engine
        .writes
        .update(record.id, UpdateListingFields::default())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidInput { .. }));
}
