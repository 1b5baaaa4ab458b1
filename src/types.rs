use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Canonical comic record returned to all callers, independent of raw
/// upstream payload variations. Produced only by [`crate::normalize`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comic {
    pub id: u32,
    pub title: String,
    pub alt_text: String,
    pub transcript: String,
    pub image_url: String,
    /// `YYYY-MM-DD`, or empty when the origin omits the date parts.
    pub published_date: String,
}

/// Outcome of a by-id fetch. The archive has withdrawn and missing ids, so
/// a 404 is an expected result rather than a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Found(Comic),
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
    pub offset: u32,
}

/// One page of search matches, constructed fresh per request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub query: String,
    pub results: Vec<Comic>,
    pub total: u32,
    pub pagination: Pagination,
}

/// Core trait that all comic sources must implement.
#[async_trait::async_trait]
pub trait ComicApi: Send + Sync {
    /// Unique identifier for this source
    fn source_name(&self) -> &'static str;

    /// Fetch the newest comic. The origin always serves one, so there is no
    /// not-found case here; any failure means the origin itself is erroring.
    async fn fetch_latest(&self) -> Result<Comic>;

    /// Fetch one comic by id. Exactly one outbound request per call.
    async fn fetch_by_id(&self, id: u32) -> Result<FetchOutcome>;
}
