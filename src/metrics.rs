//! Metrics catalog and recording helpers using standard Prometheus naming
//! conventions.

use std::fmt;
use std::net::SocketAddr;

/// Enum representing all metric names used by the gateway.
/// This eliminates magic strings and provides compile-time safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Upstream fetches
    UpstreamFetchSuccess,
    UpstreamFetchNotFound,
    UpstreamFetchError,

    // Latest-comic cache
    LatestCacheHit,
    LatestCacheMiss,

    // Search fan-out
    SearchWindowIds,
    SearchMatches,

    // HTTP layer
    RequestsServed,
    RequestsRateLimited,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::UpstreamFetchSuccess => "comic_gateway_upstream_fetch_success_total",
            MetricName::UpstreamFetchNotFound => "comic_gateway_upstream_fetch_not_found_total",
            MetricName::UpstreamFetchError => "comic_gateway_upstream_fetch_error_total",
            MetricName::LatestCacheHit => "comic_gateway_latest_cache_hit_total",
            MetricName::LatestCacheMiss => "comic_gateway_latest_cache_miss_total",
            MetricName::SearchWindowIds => "comic_gateway_search_window_ids",
            MetricName::SearchMatches => "comic_gateway_search_matches",
            MetricName::RequestsServed => "comic_gateway_requests_served_total",
            MetricName::RequestsRateLimited => "comic_gateway_requests_rate_limited_total",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Install the Prometheus exporter on `COMIC_METRICS_PORT` (default 9898).
/// Install failure is logged, not fatal.
pub fn init_metrics() {
    let port: u16 = std::env::var("COMIC_METRICS_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(9898);
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new().with_http_listener(addr);
    match builder.install() {
        Ok(()) => {
            tracing::info!("Prometheus exporter listening on http://{}/metrics", addr);
        }
        Err(e) => {
            tracing::warn!("Prometheus exporter install failed (possibly already installed): {}", e);
        }
    }
}

/// Upstream fetch outcomes, labeled by source.
pub mod upstream {
    use super::MetricName;

    pub fn fetch_success(source: &str) {
        ::metrics::counter!(MetricName::UpstreamFetchSuccess.as_str(), "source" => source.to_string())
            .increment(1);
    }

    pub fn fetch_not_found(source: &str) {
        ::metrics::counter!(MetricName::UpstreamFetchNotFound.as_str(), "source" => source.to_string())
            .increment(1);
    }

    pub fn fetch_error(source: &str) {
        ::metrics::counter!(MetricName::UpstreamFetchError.as_str(), "source" => source.to_string())
            .increment(1);
    }
}

pub mod latest_cache {
    use super::MetricName;

    pub fn hit() {
        ::metrics::counter!(MetricName::LatestCacheHit.as_str()).increment(1);
    }

    pub fn miss() {
        ::metrics::counter!(MetricName::LatestCacheMiss.as_str()).increment(1);
    }
}

pub mod search {
    use super::MetricName;

    pub fn window_scanned(ids: usize) {
        ::metrics::histogram!(MetricName::SearchWindowIds.as_str()).record(ids as f64);
    }

    pub fn matches_found(count: usize) {
        ::metrics::histogram!(MetricName::SearchMatches.as_str()).record(count as f64);
    }
}

pub mod server {
    use super::MetricName;

    pub fn request_served(endpoint: &str) {
        ::metrics::counter!(MetricName::RequestsServed.as_str(), "endpoint" => endpoint.to_string())
            .increment(1);
    }

    pub fn request_rate_limited() {
        ::metrics::counter!(MetricName::RequestsRateLimited.as_str()).increment(1);
    }
}
