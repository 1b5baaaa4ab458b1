use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::Result;
use crate::metrics::latest_cache;
use crate::types::{Comic, ComicApi};

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Comic,
    fetched_at: Instant,
}

/// Single-slot TTL cache for the newest comic.
///
/// The slot is the only shared mutable state in the core. The lock is never
/// held across the refresh await, so two callers observing a stale entry may
/// both refresh; the refresh is idempotent and the last write wins. There is
/// no explicit invalidation: the only path to a fresh value is TTL expiry.
pub struct LatestCache {
    entry: Mutex<Option<CacheEntry>>,
    ttl: Duration,
}

impl LatestCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entry: Mutex::new(None),
            ttl,
        }
    }

    /// Return the cached comic while the entry is fresh, otherwise fetch a
    /// new one from the source and store it. A failed refresh is propagated;
    /// the stale entry is not served in its place.
    pub async fn get(&self, source: &dyn ComicApi) -> Result<Comic> {
        if let Some(comic) = self.fresh_value() {
            latest_cache::hit();
            return Ok(comic);
        }

        latest_cache::miss();
        let value = source.fetch_latest().await?;
        debug!("Latest cache refreshed with comic {}", value.id);

        let mut slot = self.entry.lock().unwrap();
        *slot = Some(CacheEntry {
            value: value.clone(),
            fetched_at: Instant::now(),
        });
        Ok(value)
    }

    fn fresh_value(&self) -> Option<Comic> {
        let slot = self.entry.lock().unwrap();
        let entry = slot.as_ref()?;
        if entry.fetched_at.elapsed() < self.ttl {
            Some(entry.value.clone())
        } else {
            None
        }
    }
}
