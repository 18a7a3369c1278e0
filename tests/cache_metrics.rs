use std::collections::HashSet;
use std::sync::Arc;

use freshet::application::filter::FilterSpec;
use freshet::application::repos::{CreateListingParams, EntityStore, UpdateListingFields};
use freshet::cache::{CacheConfig, MutationCoordinator, ReadThroughCache, ScopeIndex};
use freshet::domain::Category;
use freshet::infra::cache::MemoryCacheStore;
use freshet::infra::memory::MemoryListings;
use metrics_util::debugging::DebuggingRecorder;
use uuid::Uuid;

#[tokio::test]
async fn cache_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let config = CacheConfig::default();
    let store = Arc::new(MemoryListings::new());
    let cache = Arc::new(MemoryCacheStore::new());
    let index = Arc::new(ScopeIndex::new());
    let reads = ReadThroughCache::new(config.clone(), cache.clone(), index.clone());
    let writes = MutationCoordinator::new(config, store.clone(), cache, index);

    let owner = Uuid::new_v4();
    let record = writes
        .create(CreateListingParams {
            owner_id: owner,
            group_ids: vec![],
            name: "Metrics".to_string(),
            featured: false,
            category: Category::Standard,
        })
        .await
        .expect("create listing");

    // Miss then hit on the same list query.
    let filter = FilterSpec::default();
    for _ in 0..2 {
        reads
            .get_list(&filter, || async { store.get_all(&filter).await })
            .await
            .expect("list read");
    }

    // Uncacheable pagination bypasses.
    let oversized = FilterSpec {
        page: freshet::application::filter::PageRequest {
            page: 1,
            limit: 500,
        },
        ..Default::default()
    };
    reads
        .get_list(&oversized, || async { store.get_all(&oversized).await })
        .await
        .expect("bypassed read");

    // A purge pass over the populated cache.
    writes
        .update(
            record.id,
            UpdateListingFields {
                name: Some("Renamed".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("update listing");

    let seen: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite, _, _, _)| composite.key().name().to_string())
        .collect();

    for expected in [
        "freshet_cache_hit_total",
        "freshet_cache_miss_total",
        "freshet_cache_bypass_total",
        "freshet_invalidation_purged_total",
        "freshet_invalidation_ms",
    ] {
        assert!(seen.contains(expected), "missing metric key: {expected}");
    }
}
