use std::sync::Arc;

use crate::cache::LatestCache;
use crate::config::Config;
use crate::error::Result;
use crate::sample::RandomSampler;
use crate::search::SearchOrchestrator;
use crate::types::{Comic, ComicApi, FetchOutcome, SearchResult};

/// Core façade over the upstream source: latest, by-id, random and search,
/// sharing one latest-comic cache. Each operation is an independent pipeline
/// over the current cache and window state; nothing persists across calls.
pub struct Gateway {
    source: Arc<dyn ComicApi>,
    cache: LatestCache,
    sampler: RandomSampler,
    searcher: SearchOrchestrator,
}

impl Gateway {
    pub fn new(source: Arc<dyn ComicApi>, config: &Config) -> Self {
        Self {
            cache: LatestCache::new(config.cache_ttl()),
            sampler: RandomSampler::new(config.sample_attempts),
            searcher: SearchOrchestrator::new(
                Arc::clone(&source),
                config.search_range,
                config.search_batch_size,
            ),
            source,
        }
    }

    /// The newest comic, served from the cache within its TTL.
    pub async fn latest(&self) -> Result<Comic> {
        self.cache.get(self.source.as_ref()).await
    }

    /// One comic by id. A missing id is an expected outcome, kept distinct
    /// from upstream failures so callers can map the two differently.
    pub async fn by_id(&self, id: u32) -> Result<FetchOutcome> {
        self.source.fetch_by_id(id).await
    }

    /// A pseudo-random comic. Fails only when no latest comic is obtainable
    /// at all; sampling misses degrade to the latest comic instead.
    pub async fn random(&self) -> Result<Comic> {
        let latest = self.latest().await?;
        Ok(self.sampler.sample(self.source.as_ref(), &latest).await)
    }

    /// Substring search over the recent window, paginated. Inputs are
    /// expected to be validated by the calling layer.
    pub async fn search(&self, query: &str, page: u32, limit: u32) -> Result<SearchResult> {
        let latest = self.latest().await?;
        Ok(self.searcher.search(latest.id, query, page, limit).await)
    }
}
