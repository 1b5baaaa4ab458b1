use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, instrument, warn};

use crate::metrics::search as search_metrics;
use crate::types::{Comic, ComicApi, FetchOutcome, Pagination, SearchResult};

/// Substring search over the most recent span of the archive.
///
/// The scan is bounded: only `range` ids below the newest comic are ever
/// fetched, and at most `batch_size` requests are in flight at any instant.
/// Every id in the window is fetched even once a page of matches exists.
pub struct SearchOrchestrator {
    source: Arc<dyn ComicApi>,
    range: u32,
    batch_size: usize,
}

impl SearchOrchestrator {
    pub fn new(source: Arc<dyn ComicApi>, range: u32, batch_size: usize) -> Self {
        Self {
            source,
            range,
            batch_size: batch_size.max(1),
        }
    }

    /// Scan ids descending from `max_id`, match case-insensitively against
    /// title, transcript and alt text, and slice out the requested page.
    /// Ids that are missing or fail to fetch are skipped; the scan itself
    /// never fails.
    #[instrument(skip(self))]
    pub async fn search(&self, max_id: u32, query: &str, page: u32, limit: u32) -> SearchResult {
        let needle = query.to_lowercase();

        let start_id = max_id;
        let end_id = max_id.saturating_sub(self.range.saturating_sub(1)).max(1);
        let ids: Vec<u32> = (end_id..=start_id).rev().collect();
        debug!("Scanning {} ids from {} down to {}", ids.len(), start_id, end_id);
        search_metrics::window_scanned(ids.len());

        let matches = self.scan(&ids, &needle).await;
        debug!("{} of {} scanned comics matched", matches.len(), ids.len());
        search_metrics::matches_found(matches.len());

        let total = matches.len();
        let pagination = paginate(total, page, limit);
        let results = matches
            .into_iter()
            .skip(pagination.offset as usize)
            .take(pagination.limit as usize)
            .collect();

        SearchResult {
            query: query.to_string(),
            results,
            total: total as u32,
            pagination,
        }
    }

    /// Fetch every id with at most `batch_size` requests in flight and
    /// reassemble matches in window order. Completion order within the
    /// fan-out carries no meaning; position in the id window does.
    async fn scan(&self, ids: &[u32], needle: &str) -> Vec<Comic> {
        let semaphore = Arc::new(Semaphore::new(self.batch_size));
        let mut tasks = JoinSet::new();

        for (position, &id) in ids.iter().enumerate() {
            let source = Arc::clone(&self.source);
            let semaphore = Arc::clone(&semaphore);
            let needle = needle.to_string();

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
                let comic = match source.fetch_by_id(id).await {
                    Ok(FetchOutcome::Found(comic)) => Some(comic),
                    Ok(FetchOutcome::NotFound) => None,
                    Err(e) => {
                        warn!("Fetch of comic {} failed during search, skipping: {}", id, e);
                        None
                    }
                };
                (position, comic.filter(|c| matches_query(c, &needle)))
            });
        }

        let mut slots: Vec<Option<Comic>> = vec![None; ids.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((position, comic)) => slots[position] = comic,
                Err(e) => warn!("Search fetch task failed to join: {}", e),
            }
        }

        slots.into_iter().flatten().collect()
    }
}

/// Case-insensitive substring match over the searchable text of a comic.
fn matches_query(comic: &Comic, needle: &str) -> bool {
    let haystack = format!(
        "{}\n{}\n{}",
        comic.title, comic.transcript, comic.alt_text
    )
    .to_lowercase();
    haystack.contains(needle)
}

/// Pagination arithmetic for the search response: zero pages when nothing
/// matched, otherwise the page is clamped into `[1, total_pages]` and the
/// offset derived from the clamped page.
pub fn paginate(total: usize, page: u32, limit: u32) -> Pagination {
    if total == 0 {
        return Pagination {
            page: 0,
            limit,
            total_pages: 0,
            offset: 0,
        };
    }

    let total = total as u32;
    let total_pages = (total + limit - 1) / limit;
    let page = page.clamp(1, total_pages);

    Pagination {
        page,
        limit,
        total_pages,
        offset: (page - 1) * limit,
    }
}
