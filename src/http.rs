//! HTTP transport module for compare-brief
//!
//! Axum router exposing brief generation, share-link resolution, local
//! history, and plain JSON health/metrics endpoints.

use std::collections::HashMap;
use std::{cmp::Ordering, sync::Arc};

use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::{Path, Query, State},
    http::{Method, StatusCode, header},
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::brief::{Brief, BriefRequest, CandidateFallbacks, RawCandidate, validate_candidate};
use crate::codec::{self, ShareLink};
use crate::config::Config;
use crate::error::{BriefError, Result};
use crate::service::{BriefService, LatestRequest, catch_all_brief};
use crate::store::{BriefStore, JsonFileStore, MemoryStore, StoredBrief};

/// Views tracked for last-request-wins before idle ones are pruned.
const MAX_TRACKED_VIEWS: usize = 1024;

/// Example questions offered on the explore screen.
pub const EXPLORE_SUGGESTIONS: &[(&str, &str)] = &[
    ("Tech", "Best smartphone under $800"),
    ("Finance", "Best savings account with high APY"),
    ("Health", "Best health insurance plans for freelancers"),
    ("Travel", "Best travel credit card with no annual fee"),
    ("Food", "Best meal kit delivery service"),
    ("Home", "Best robot vacuum for pet hair"),
];

/// Shared state for HTTP server
#[derive(Clone)]
pub struct HttpState {
    pub config: Arc<Config>,
    pub service: Arc<BriefService>,
    pub store: Arc<dyn BriefStore>,
    pub views: Arc<ViewSlots>,
    pub metrics: Arc<Mutex<HttpMetrics>>,
}

impl HttpState {
    pub fn new(config: Arc<Config>, service: BriefService, store: Arc<dyn BriefStore>) -> Self {
        Self {
            config,
            service: Arc::new(service),
            store,
            views: Arc::new(ViewSlots::default()),
            metrics: Arc::new(Mutex::new(HttpMetrics::new())),
        }
    }
}

/// Metrics for HTTP server
#[derive(Debug, Clone)]
pub struct HttpMetrics {
    pub total_requests: u64,
    pub last_request_unix: u64,
    pub errors_total: u64,
    pub degraded_total: u64,
    pub latencies: Vec<f64>, // ring buffer for p95
}

impl HttpMetrics {
    fn new() -> Self {
        Self {
            total_requests: 0,
            last_request_unix: unix_now(),
            errors_total: 0,
            degraded_total: 0,
            latencies: Vec::with_capacity(256),
        }
    }
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// One [`LatestRequest`] slot per client view id
#[derive(Debug, Default)]
pub struct ViewSlots {
    slots: std::sync::Mutex<HashMap<String, Arc<LatestRequest>>>,
}

impl ViewSlots {
    pub fn slot(&self, view: &str) -> Arc<LatestRequest> {
        let mut slots = self.slots.lock().unwrap_or_else(|p| p.into_inner());
        if slots.len() >= MAX_TRACKED_VIEWS && !slots.contains_key(view) {
            slots.retain(|_, slot| Arc::strong_count(slot) > 1);
        }
        slots.entry(view.to_string()).or_default().clone()
    }
}

/// Health check endpoint
pub async fn health_handler() -> impl IntoResponse {
    "ok"
}

#[derive(Debug, Default, Deserialize)]
pub struct GenerateParams {
    #[serde(default)]
    pub strict: Option<String>,
    #[serde(default)]
    pub view: Option<String>,
}

/// Brief generation endpoint. Degraded results are still HTTP 200 and carry `_mode`.
pub async fn generate_handler(
    State(state): State<HttpState>,
    Query(params): Query<GenerateParams>,
    body: Bytes,
) -> Response {
    let value: Value = serde_json::from_slice(&body).unwrap_or_else(|e| {
        tracing::debug!("Unreadable request body, using defaults: {}", e);
        Value::Null
    });
    let request = BriefRequest::from_json(&value);
    let strict = params
        .strict
        .as_deref()
        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));
    let view = value
        .get("viewId")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or(params.view);

    let service = state.service.clone();
    let outcome = match view {
        Some(view) => {
            let slot = state.views.slot(&view);
            slot.run(service.generate_or_demo(request, strict)).await
        }
        None => service.generate_or_demo(request, strict).await,
    };

    match outcome {
        Ok(brief) => {
            if brief.is_degraded() {
                let mut m = state.metrics.lock().await;
                m.degraded_total = m.degraded_total.saturating_add(1);
            }
            (StatusCode::OK, Json(brief)).into_response()
        }
        Err(err) => {
            tracing::info!("Brief request failed: {}", err);
            err.into_response()
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ResolveParams {
    pub data: Option<String>,
    pub id: Option<String>,
}

fn not_on_this_device(id: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "not available on this device/browser, use a portable link instead",
            "kind": "not_found",
            "id": id,
        })),
    )
        .into_response()
}

/// Resolve a portable (`?data=`) or local (`?id=`) share link.
pub async fn resolve_handler(
    State(state): State<HttpState>,
    Query(params): Query<ResolveParams>,
) -> Response {
    let link = match (params.data, params.id) {
        (Some(data), _) if !data.trim().is_empty() => ShareLink::Portable(data),
        (_, Some(id)) if !id.trim().is_empty() => ShareLink::Local(id.trim().to_string()),
        _ => {
            return BriefError::InvalidInput {
                message: "expected a `data` or `id` parameter".to_string(),
            }
            .into_response();
        }
    };
    match resolve_link(state.store.as_ref(), &link) {
        Ok(Some(brief)) => Json(brief).into_response(),
        Ok(None) => match link {
            ShareLink::Local(id) => not_on_this_device(&id),
            ShareLink::Portable(_) => not_on_this_device(""),
        },
        Err(err) => err.into_response(),
    }
}

/// `Ok(None)` is a store miss; `Err` is a corrupt portable payload.
pub fn resolve_link(store: &dyn BriefStore, link: &ShareLink) -> Result<Option<Brief>> {
    match link {
        ShareLink::Portable(data) => codec::decode(data).map(Some),
        ShareLink::Local(id) => Ok(store.get(id)),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareResponse {
    pub id: String,
    pub local_url: String,
    pub portable_url: String,
    pub data: String,
}

/// Save a brief locally and return both share link forms.
pub async fn share_handler(State(state): State<HttpState>, body: Bytes) -> Response {
    let value: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            return BriefError::InvalidInput {
                message: format!("body is not JSON: {e}"),
            }
            .into_response();
        }
    };
    match share(&state, value) {
        Ok(resp) => (StatusCode::CREATED, Json(resp)).into_response(),
        Err(err) => err.into_response(),
    }
}

fn share(state: &HttpState, value: Value) -> Result<ShareResponse> {
    let mode = value
        .get("_mode")
        .and_then(Value::as_str)
        .map(str::to_string);
    let mut brief = validate_candidate(&RawCandidate::new(value), &CandidateFallbacks::default());
    brief.mode = mode;

    let data = codec::encode(&brief)?;
    let origin = &state.config.server.public_origin;
    let id = state.store.save(brief);
    Ok(ShareResponse {
        local_url: codec::local_url(origin, &id),
        portable_url: codec::portable_url_for(origin, &data),
        id,
        data,
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<usize>,
}

pub async fn history_handler(
    State(state): State<HttpState>,
    Query(params): Query<HistoryParams>,
) -> impl IntoResponse {
    let limit = params.limit.unwrap_or(state.config.store.history_limit);
    let items: Vec<StoredBrief> = state.store.recent(limit);
    Json(json!({ "items": items }))
}

pub async fn delete_history_item(
    State(state): State<HttpState>,
    Path(id): Path<String>,
) -> Response {
    if state.store.remove(&id) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        not_on_this_device(&id)
    }
}

pub async fn clear_history(State(state): State<HttpState>) -> impl IntoResponse {
    state.store.clear();
    StatusCode::NO_CONTENT
}

pub async fn explore_handler() -> impl IntoResponse {
    let items: Vec<Value> = EXPLORE_SUGGESTIONS
        .iter()
        .map(|(label, query)| json!({ "label": label, "query": query }))
        .collect();
    Json(json!({ "items": items }))
}

/// Metrics endpoint
pub async fn metrics_handler(State(state): State<HttpState>) -> impl IntoResponse {
    let metrics = state.metrics.lock().await.clone();

    let (avg_latency_ms, p95_latency_ms) = if metrics.latencies.is_empty() {
        (None, None)
    } else {
        let sum: f64 = metrics.latencies.iter().sum();
        let avg = sum / metrics.latencies.len() as f64;
        let mut sorted = metrics.latencies.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        let p95_idx = (sorted.len() as f64 * 0.95) as usize;
        let p95 = sorted.get(p95_idx.min(sorted.len() - 1)).copied();
        (Some(avg), p95)
    };

    Json(json!({
        "metrics_version": "1",
        "live": state.service.is_live(),
        "total_requests": metrics.total_requests,
        "last_request_unix": metrics.last_request_unix,
        "errors_total": metrics.errors_total,
        "degraded_total": metrics.degraded_total,
        "avg_latency_ms": avg_latency_ms,
        "p95_latency_ms": p95_latency_ms,
    }))
}

/// Anything that panics inside a handler still renders a brief.
fn handle_panic(_err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    tracing::error!("Handler panicked; serving catch-all brief");
    (StatusCode::OK, Json(catch_all_brief())).into_response()
}

fn cors_layer(open: bool) -> CorsLayer {
    if open {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
    } else {
        CorsLayer::new()
    }
}

/// Build the application router
pub fn router(state: HttpState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/api/brief", post(generate_handler))
        .route("/api/brief/resolve", get(resolve_handler))
        .route("/api/share", post(share_handler))
        .route("/api/history", get(history_handler).delete(clear_history))
        .route("/api/history/:id", delete(delete_history_item))
        .route("/api/explore", get(explore_handler))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(middleware::from_fn_with_state(
            state.metrics.clone(),
            |State(metrics): State<Arc<Mutex<HttpMetrics>>>,
             req: axum::http::Request<Body>,
             next: axum::middleware::Next| async move {
                let is_api = req.uri().path().starts_with("/api/");
                let start = std::time::Instant::now();
                let resp = next.run(req).await;
                if is_api {
                    let latency_ms = start.elapsed().as_millis() as f64;
                    let mut m = metrics.lock().await;
                    if latency_ms > 0.0 {
                        m.latencies.push(latency_ms);
                        if m.latencies.len() > 256 {
                            m.latencies.remove(0);
                        }
                    }
                    if !resp.status().is_success() {
                        m.errors_total = m.errors_total.saturating_add(1);
                    }
                    m.total_requests = m.total_requests.saturating_add(1);
                    m.last_request_unix = unix_now();
                }
                resp
            },
        ))
        .layer(cors_layer(state.config.server.cors_open))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Open the configured history store, falling back to memory.
pub fn open_store(config: &Config) -> Arc<dyn BriefStore> {
    match &config.store.path {
        Some(path) => {
            tracing::info!("Brief history at {}", path.display());
            Arc::new(JsonFileStore::new(path.clone()))
        }
        None => {
            tracing::info!("Brief history kept in memory");
            Arc::new(MemoryStore::new())
        }
    }
}

/// Start the HTTP server
pub async fn start_http_server(config: Arc<Config>) -> anyhow::Result<()> {
    let service = BriefService::from_config(&config)?;
    let store = open_store(&config);
    let bind = config.server.bind;
    let app = router(HttpState::new(config, service, store));

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind HTTP listener: {}", e))?;

    tracing::info!("Starting HTTP server on {}", bind);

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

    Ok(())
}
