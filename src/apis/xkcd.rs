use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use tracing::{debug, instrument, warn};

use crate::error::{GatewayError, Result};
use crate::metrics::upstream;
use crate::normalize::{normalize, RawComic};
use crate::types::{Comic, ComicApi, FetchOutcome};

pub const XKCD_SOURCE: &str = "xkcd";

/// Client for the xkcd JSON interface: `/info.0.json` for the newest comic
/// and `/{id}/info.0.json` for a specific one.
pub struct XkcdApi {
    client: Client,
    origin: String,
}

impl XkcdApi {
    pub fn new(origin: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("comic_gateway/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            origin: origin.trim_end_matches('/').to_string(),
        })
    }

    fn latest_url(&self) -> String {
        format!("{}/info.0.json", self.origin)
    }

    fn comic_url(&self, id: u32) -> String {
        format!("{}/{}/info.0.json", self.origin, id)
    }

    async fn get(&self, url: &str) -> Result<Response> {
        match self.client.get(url).send().await {
            Ok(response) => Ok(response),
            Err(e) => {
                warn!("Request to {} failed in transit: {}", url, e);
                upstream::fetch_error(XKCD_SOURCE);
                Err(e.into())
            }
        }
    }

    async fn decode(&self, response: Response) -> Result<Comic> {
        let raw: RawComic = response.json().await.map_err(|e| {
            warn!("Malformed payload from upstream: {}", e);
            upstream::fetch_error(XKCD_SOURCE);
            GatewayError::from(e)
        })?;
        upstream::fetch_success(XKCD_SOURCE);
        Ok(normalize(&raw))
    }
}

#[async_trait::async_trait]
impl ComicApi for XkcdApi {
    fn source_name(&self) -> &'static str {
        XKCD_SOURCE
    }

    #[instrument(skip(self))]
    async fn fetch_latest(&self) -> Result<Comic> {
        let url = self.latest_url();
        debug!("Fetching latest comic from {}", url);

        let response = self.get(&url).await?;
        let status = response.status();
        if !status.is_success() {
            warn!("Upstream returned {} for {}", status, url);
            upstream::fetch_error(XKCD_SOURCE);
            return Err(GatewayError::Upstream {
                status: status.as_u16(),
            });
        }

        self.decode(response).await
    }

    #[instrument(skip(self))]
    async fn fetch_by_id(&self, id: u32) -> Result<FetchOutcome> {
        let url = self.comic_url(id);
        debug!("Fetching comic {} from {}", id, url);

        let response = self.get(&url).await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!("Comic {} does not exist upstream", id);
            upstream::fetch_not_found(XKCD_SOURCE);
            return Ok(FetchOutcome::NotFound);
        }
        if !status.is_success() {
            warn!("Upstream returned {} for {}", status, url);
            upstream::fetch_error(XKCD_SOURCE);
            return Err(GatewayError::Upstream {
                status: status.as_u16(),
            });
        }

        let comic = self.decode(response).await?;
        Ok(FetchOutcome::Found(comic))
    }
}
