use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderValue, Method, Request, StatusCode, Uri},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use hyper::Server;
use serde::Deserialize;
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::{error, info};

use crate::config::Config;
use crate::error::GatewayError;
use crate::gateway::Gateway;
use crate::limiter::RequestLimiter;
use crate::metrics::server as server_metrics;
use crate::types::FetchOutcome;

/// Shared state for all HTTP handlers.
pub struct AppState {
    pub gateway: Gateway,
    limiter: RequestLimiter,
    total_requests: AtomicU64,
    endpoint_stats: Mutex<HashMap<String, u64>>,
    started_at: Instant,
}

impl AppState {
    pub fn new(gateway: Gateway, config: &Config) -> Self {
        Self {
            gateway,
            limiter: RequestLimiter::new(
                config.rate_limit.max_requests,
                config.rate_limit.window_seconds,
            ),
            total_requests: AtomicU64::new(0),
            endpoint_stats: Mutex::new(HashMap::new()),
            started_at: Instant::now(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    q: Option<String>,
    page: Option<String>,
    limit: Option<String>,
}

/// Validate search inputs the way the public contract documents them:
/// `q` trimmed to 1..=100 chars, `page >= 1`, `limit` in 1..=50.
fn parse_search_params(
    params: &SearchParams,
) -> std::result::Result<(String, u32, u32), &'static str> {
    let q = params.q.as_deref().unwrap_or("").trim().to_string();
    if q.is_empty() || q.chars().count() > 100 {
        return Err("Query must be between 1 and 100 characters");
    }

    let page = match &params.page {
        None => 1,
        Some(raw) => raw
            .parse::<u32>()
            .ok()
            .filter(|p| *p >= 1)
            .ok_or("Page must be a positive integer")?,
    };

    let limit = match &params.limit {
        None => 10,
        Some(raw) => raw
            .parse::<u32>()
            .ok()
            .filter(|l| (1..=50).contains(l))
            .ok_or("Limit must be between 1 and 50")?,
    };

    Ok((q, page, limit))
}

fn parse_comic_id(raw: &str) -> Option<u32> {
    raw.parse::<u32>().ok().filter(|id| *id >= 1)
}

fn validation_error(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

/// Map an internal failure to the public 500 body. Upstream detail goes to
/// the log only, never to the client.
fn internal_error(err: GatewayError) -> Response {
    error!("Request failed: {}", err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": "Internal Server Error",
            "message": "Something went wrong on our end"
        })),
    )
        .into_response()
}

fn comic_not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Comic not found",
            "message": "The requested comic does not exist"
        })),
    )
        .into_response()
}

async fn get_latest(State(state): State<Arc<AppState>>) -> Response {
    match state.gateway.latest().await {
        Ok(comic) => Json(comic).into_response(),
        Err(e) => internal_error(e),
    }
}

async fn get_random(State(state): State<Arc<AppState>>) -> Response {
    match state.gateway.random().await {
        Ok(comic) => Json(comic).into_response(),
        Err(e) => internal_error(e),
    }
}

async fn search_comics(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Response {
    let (query, page, limit) = match parse_search_params(&params) {
        Ok(parsed) => parsed,
        Err(message) => return validation_error(message),
    };

    match state.gateway.search(&query, page, limit).await {
        Ok(result) => Json(result).into_response(),
        Err(e) => internal_error(e),
    }
}

async fn get_comic(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    let id = match parse_comic_id(&id) {
        Some(id) => id,
        None => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "Invalid comic ID",
                    "message": "Comic ID must be a positive integer"
                })),
            )
                .into_response();
        }
    };

    match state.gateway.by_id(id).await {
        Ok(FetchOutcome::Found(comic)) => Json(comic).into_response(),
        Ok(FetchOutcome::NotFound) => comic_not_found(),
        Err(e) => internal_error(e),
    }
}

/// Health check endpoint
async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime": state.started_at.elapsed().as_secs(),
    }))
}

/// Per-endpoint request counters, keyed `METHOD /path`.
async fn stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let endpoint_stats = state.endpoint_stats.lock().unwrap().clone();
    Json(json!({
        "totalRequests": state.total_requests.load(Ordering::Relaxed),
        "endpointStats": endpoint_stats,
        "uptime": state.started_at.elapsed().as_secs(),
    }))
}

async fn api_not_found(uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Endpoint not found",
            "path": uri.path(),
        })),
    )
}

/// Rate limiting, request logging and the stats counters, applied around
/// every route. Rejected requests are not counted in the stats.
async fn track_requests(
    State(state): State<Arc<AppState>>,
    req: Request<Body>,
    next: Next<Body>,
) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    if path.starts_with("/api") && !state.limiter.try_acquire() {
        server_metrics::request_rate_limited();
        info!("Rate limited {} {}", method, path);
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": "Too many requests, please try again later" })),
        )
            .into_response();
    }

    let started = Instant::now();
    let response = next.run(req).await;

    state.total_requests.fetch_add(1, Ordering::Relaxed);
    {
        let mut stats = state.endpoint_stats.lock().unwrap();
        *stats.entry(format!("{} {}", method, path)).or_insert(0) += 1;
    }
    server_metrics::request_served(&path);

    info!(
        "{} {} -> {} in {}ms",
        method,
        path,
        response.status().as_u16(),
        started.elapsed().as_millis()
    );
    response
}

/// Create the HTTP server with all routes and middleware.
pub fn create_server(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/api/comics/latest", get(get_latest))
        .route("/api/comics/random", get(get_random))
        .route("/api/comics/search", get(search_comics))
        .route("/api/comics/:id", get(get_comic))
        .route("/api/health", get(health))
        .route("/api/stats", get(stats))
        .route("/api/*path", axum::routing::any(api_not_found))
        // Anything outside /api serves the static frontend
        .fallback_service(ServeDir::new("public"))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            track_requests,
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(ServiceBuilder::new().layer(cors))
        .with_state(state)
}

/// Start the HTTP server on the specified port
pub async fn start_server(state: Arc<AppState>, port: u16) -> anyhow::Result<()> {
    let app = create_server(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    println!("🚀 HTTP server running on http://localhost:{port}");
    println!("💚 Health check: http://localhost:{port}/api/health");
    println!("📚 Comics API:   http://localhost:{port}/api/comics/latest");

    Server::bind(&addr).serve(app.into_make_service()).await?;

    Ok(())
}
