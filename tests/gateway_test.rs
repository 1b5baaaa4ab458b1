use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use comic_gateway::cache::LatestCache;
use comic_gateway::config::Config;
use comic_gateway::error::GatewayError;
use comic_gateway::gateway::Gateway;
use comic_gateway::sample::RandomSampler;
use comic_gateway::search::SearchOrchestrator;
use comic_gateway::types::{Comic, ComicApi, FetchOutcome, Pagination};

fn comic(id: u32, title: &str) -> Comic {
    Comic {
        id,
        title: title.to_string(),
        alt_text: String::new(),
        transcript: String::new(),
        image_url: format!("https://example.com/{id}.png"),
        published_date: "2024-01-01".to_string(),
    }
}

/// Scripted in-memory archive standing in for the upstream origin.
#[derive(Default)]
struct StubArchive {
    comics: HashMap<u32, Comic>,
    latest: Mutex<Option<Comic>>,
    broken: HashSet<u32>,
    fetch_delay: Duration,
    scramble_completion: bool,
    latest_calls: AtomicU64,
    fetch_calls: AtomicU64,
    in_flight: AtomicI64,
    max_in_flight: AtomicI64,
}

impl StubArchive {
    fn with_latest(latest: Comic) -> Self {
        let mut archive = Self::default();
        archive.comics.insert(latest.id, latest.clone());
        archive.latest = Mutex::new(Some(latest));
        archive
    }

    fn insert(&mut self, comic: Comic) {
        self.comics.insert(comic.id, comic);
    }

    fn latest_calls(&self) -> u64 {
        self.latest_calls.load(Ordering::SeqCst)
    }

    fn fetch_calls(&self) -> u64 {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ComicApi for StubArchive {
    fn source_name(&self) -> &'static str {
        "stub"
    }

    async fn fetch_latest(&self) -> comic_gateway::error::Result<Comic> {
        self.latest_calls.fetch_add(1, Ordering::SeqCst);
        self.latest
            .lock()
            .unwrap()
            .clone()
            .ok_or(GatewayError::Upstream { status: 502 })
    }

    async fn fetch_by_id(&self, id: u32) -> comic_gateway::error::Result<FetchOutcome> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        if !self.fetch_delay.is_zero() {
            tokio::time::sleep(self.fetch_delay).await;
        }
        if self.scramble_completion {
            // Completion order varies with the id so it never mirrors the
            // order the requests were issued in.
            tokio::time::sleep(Duration::from_millis(((id % 5) * 3) as u64)).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.broken.contains(&id) {
            return Err(GatewayError::Upstream { status: 503 });
        }
        Ok(self
            .comics
            .get(&id)
            .cloned()
            .map(FetchOutcome::Found)
            .unwrap_or(FetchOutcome::NotFound))
    }
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.search_range = 100;
    config.search_batch_size = 20;
    config.sample_attempts = 5;
    config
}

// ---------------------------------------------------------------------------
// Latest cache

#[tokio::test]
async fn latest_cache_serves_fresh_entries_without_refetch() -> Result<()> {
    let archive = StubArchive::with_latest(comic(100, "A Tree"));
    let cache = LatestCache::new(Duration::from_secs(60));

    let first = cache.get(&archive).await?;
    let second = cache.get(&archive).await?;

    assert_eq!(first, second);
    assert_eq!(archive.latest_calls(), 1);
    Ok(())
}

#[tokio::test]
async fn latest_cache_refreshes_after_ttl_expiry() -> Result<()> {
    let archive = StubArchive::with_latest(comic(100, "A Tree"));
    let cache = LatestCache::new(Duration::from_millis(20));

    cache.get(&archive).await?;
    tokio::time::sleep(Duration::from_millis(40)).await;
    cache.get(&archive).await?;

    assert_eq!(archive.latest_calls(), 2);
    Ok(())
}

#[tokio::test]
async fn latest_cache_propagates_refresh_failure_instead_of_serving_stale() -> Result<()> {
    let archive = StubArchive::with_latest(comic(100, "A Tree"));
    let cache = LatestCache::new(Duration::from_millis(20));

    cache.get(&archive).await?;

    // The origin goes dark after the first fetch.
    archive.latest.lock().unwrap().take();
    tokio::time::sleep(Duration::from_millis(40)).await;

    assert!(cache.get(&archive).await.is_err());
    Ok(())
}

// ---------------------------------------------------------------------------
// Random sampler

#[tokio::test]
async fn sampler_returns_a_comic_from_the_id_range() {
    let mut archive = StubArchive::with_latest(comic(10, "Latest"));
    for id in 1..=10 {
        archive.insert(comic(id, "Comic"));
    }

    let latest = comic(10, "Latest");
    let sampler = RandomSampler::new(5);
    let picked = sampler.sample(&archive, &latest).await;

    assert!((1..=10).contains(&picked.id));
    assert_eq!(archive.fetch_calls(), 1);
}

#[tokio::test]
async fn sampler_falls_back_to_latest_after_exhausting_attempts() {
    // Every id is a gap, including the latest one.
    let archive = StubArchive::default();
    let latest = comic(200, "Latest");

    let sampler = RandomSampler::new(5);
    let picked = sampler.sample(&archive, &latest).await;

    assert_eq!(picked, latest);
    assert_eq!(archive.fetch_calls(), 5);
}

#[tokio::test]
async fn sampler_treats_fetch_failures_as_misses() {
    let mut archive = StubArchive::with_latest(comic(50, "Latest"));
    archive.broken = (1..=50).collect();
    let latest = comic(50, "Latest");

    let sampler = RandomSampler::new(5);
    let picked = sampler.sample(&archive, &latest).await;

    assert_eq!(picked, latest);
    assert_eq!(archive.fetch_calls(), 5);
}

// ---------------------------------------------------------------------------
// Search

#[tokio::test]
async fn search_finds_recent_matches() {
    let mut archive = StubArchive::with_latest(comic(100, "A Tree"));
    archive.insert(comic(99, "Forest"));
    let searcher = SearchOrchestrator::new(Arc::new(archive), 100, 20);

    let result = searcher.search(100, "tree", 1, 10).await;

    assert_eq!(result.query, "tree");
    assert_eq!(result.total, 1);
    assert_eq!(result.results, vec![comic(100, "A Tree")]);
    assert_eq!(
        result.pagination,
        Pagination { page: 1, limit: 10, total_pages: 1, offset: 0 }
    );
}

#[tokio::test]
async fn search_window_clamps_at_the_first_comic() {
    let archive = Arc::new(StubArchive::with_latest(comic(50, "Latest")));
    let searcher = SearchOrchestrator::new(Arc::clone(&archive) as Arc<dyn ComicApi>, 100, 20);

    searcher.search(50, "anything", 1, 10).await;

    // Exactly ids 50 down to 1; nothing at or below zero is requested.
    assert_eq!(archive.fetch_calls(), 50);
}

#[tokio::test]
async fn search_reports_empty_result_with_zeroed_pagination() {
    let archive = StubArchive::with_latest(comic(100, "A Tree"));
    let searcher = SearchOrchestrator::new(Arc::new(archive), 100, 20);

    let result = searcher.search(100, "no such phrase", 3, 25).await;

    assert!(result.results.is_empty());
    assert_eq!(result.total, 0);
    assert_eq!(
        result.pagination,
        Pagination { page: 0, limit: 25, total_pages: 0, offset: 0 }
    );
}

#[tokio::test]
async fn search_preserves_recency_order_regardless_of_completion_order() {
    let mut archive = StubArchive::with_latest(comic(100, "tree 100"));
    for id in 91..=99 {
        archive.insert(comic(id, &format!("tree {id}")));
    }
    archive.scramble_completion = true;
    let searcher = SearchOrchestrator::new(Arc::new(archive), 10, 4);

    let result = searcher.search(100, "tree", 1, 10).await;

    let ids: Vec<u32> = result.results.iter().map(|c| c.id).collect();
    assert_eq!(ids, (91..=100).rev().collect::<Vec<u32>>());
}

#[tokio::test]
async fn search_pagination_slices_the_match_set() {
    let mut archive = StubArchive::with_latest(comic(100, "tree 100"));
    for id in 86..=99 {
        archive.insert(comic(id, &format!("tree {id}")));
    }
    let searcher = SearchOrchestrator::new(Arc::new(archive), 100, 20);

    let result = searcher.search(100, "tree", 2, 5).await;

    assert_eq!(result.total, 15);
    assert_eq!(result.pagination.total_pages, 3);
    assert_eq!(result.pagination.offset, 5);
    let ids: Vec<u32> = result.results.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![95, 94, 93, 92, 91]);
}

#[tokio::test]
async fn search_clamps_page_to_the_last_page() {
    let mut archive = StubArchive::with_latest(comic(100, "tree 100"));
    for id in 96..=99 {
        archive.insert(comic(id, &format!("tree {id}")));
    }
    let searcher = SearchOrchestrator::new(Arc::new(archive), 100, 20);

    let result = searcher.search(100, "tree", 40, 2).await;

    assert_eq!(result.pagination.total_pages, 3);
    assert_eq!(result.pagination.page, 3);
    assert_eq!(result.pagination.offset, 4);
    assert_eq!(result.results.len(), 1);
}

#[tokio::test]
async fn search_skips_ids_that_fail_to_fetch() {
    let mut archive = StubArchive::with_latest(comic(100, "tree 100"));
    archive.insert(comic(99, "tree 99"));
    archive.insert(comic(98, "tree 98"));
    archive.broken.insert(99);
    let searcher = SearchOrchestrator::new(Arc::new(archive), 100, 20);

    let result = searcher.search(100, "tree", 1, 10).await;

    let ids: Vec<u32> = result.results.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![100, 98]);
    assert_eq!(result.total, 2);
}

#[tokio::test]
async fn search_caps_in_flight_upstream_requests() {
    let mut archive = StubArchive::with_latest(comic(60, "Latest"));
    archive.fetch_delay = Duration::from_millis(2);
    let archive = Arc::new(archive);
    let searcher = SearchOrchestrator::new(Arc::clone(&archive) as Arc<dyn ComicApi>, 60, 7);

    searcher.search(60, "anything", 1, 10).await;

    assert!(archive.max_in_flight.load(Ordering::SeqCst) <= 7);
    assert_eq!(archive.fetch_calls(), 60);
}

// ---------------------------------------------------------------------------
// Gateway wiring

#[tokio::test]
async fn gateway_keeps_missing_ids_distinct_from_failures() -> Result<()> {
    let archive = StubArchive::with_latest(comic(100, "A Tree"));
    let gateway = Gateway::new(Arc::new(archive), &test_config());

    assert_eq!(gateway.by_id(12345).await?, FetchOutcome::NotFound);
    assert!(matches!(
        gateway.by_id(100).await?,
        FetchOutcome::Found(ref c) if c.id == 100
    ));
    Ok(())
}

#[tokio::test]
async fn gateway_random_never_errors_once_latest_is_known() -> Result<()> {
    // Sparse archive: only the latest id resolves.
    let archive = StubArchive::with_latest(comic(500, "Latest"));
    let gateway = Gateway::new(Arc::new(archive), &test_config());

    for _ in 0..10 {
        let picked = gateway.random().await?;
        assert!(picked.id >= 1 && picked.id <= 500);
    }
    Ok(())
}

#[tokio::test]
async fn gateway_search_reuses_the_cached_latest() -> Result<()> {
    let mut archive = StubArchive::with_latest(comic(100, "A Tree"));
    archive.insert(comic(99, "Forest"));
    let archive = Arc::new(archive);
    let gateway = Gateway::new(Arc::clone(&archive) as Arc<dyn ComicApi>, &test_config());

    gateway.search("tree", 1, 10).await?;
    gateway.search("forest", 1, 10).await?;

    assert_eq!(archive.latest_calls(), 1);
    Ok(())
}
