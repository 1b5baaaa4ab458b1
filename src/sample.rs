use rand::Rng;
use tracing::debug;

use crate::types::{Comic, ComicApi, FetchOutcome};

/// Picks a pseudo-random comic with a bounded number of draws.
///
/// The archive has scattered id gaps, so each draw may miss; the sampler
/// tries at most `attempts` ids and then hands back the latest comic, which
/// is already known to exist. The caller always receives a comic.
pub struct RandomSampler {
    attempts: u32,
}

impl RandomSampler {
    pub fn new(attempts: u32) -> Self {
        Self { attempts }
    }

    /// Draw uniformly random ids in `[1, latest.id]` until one resolves.
    /// Gaps and per-draw fetch failures move on to the next draw rather
    /// than aborting.
    pub async fn sample(&self, source: &dyn ComicApi, latest: &Comic) -> Comic {
        let max_id = latest.id.max(1);

        for attempt in 0..self.attempts {
            let id = rand::thread_rng().gen_range(1..=max_id);
            match source.fetch_by_id(id).await {
                Ok(FetchOutcome::Found(comic)) => return comic,
                Ok(FetchOutcome::NotFound) => {
                    debug!("Random draw {} hit a gap at id {}", attempt, id);
                }
                Err(e) => {
                    debug!("Random draw {} failed at id {}: {}", attempt, id, e);
                }
            }
        }

        latest.clone()
    }
}
