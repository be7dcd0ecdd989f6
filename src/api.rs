use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::event::Event;
use crate::ingest::Pipeline;
use crate::market::{CalendarEvent, CalendarFilter, Stock};
use crate::quotes::{QuoteChain, SourcedQuote};
use crate::store::{DynEventStore, DynMarketStore, EventFilter};
use crate::summarize::{DynSummarizer, SummaryResult};

pub const LIVENESS: &str = "market-digest backend is running";

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub events: DynEventStore,
    pub market: DynMarketStore,
    pub quotes: Arc<QuoteChain>,
    pub summarizer: DynSummarizer,
}

/// Read-path failure surfaced to the caller as 5xx, or a caller mistake as 4xx.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::Internal(e) => {
                tracing::error!(target: "api", error = ?e, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}"))
            }
        };
        (status, Json(json!({ "error": msg }))).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError::Internal(e)
    }
}

/// Empty list or `*` means any origin.
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    if allowed_origins.is_empty() || allowed_origins.iter().any(|o| o == "*") {
        return base.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(target: "api", origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    base.allow_origin(AllowOrigin::list(origins))
}

pub fn router(state: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(|| async { LIVENESS }))
        .route("/health", get(|| async { Json(json!({ "status": "ok" })) }))
        .route("/api/fetch-live", post(fetch_live))
        .route("/api/events", get(list_events))
        .route("/api/stock/{ticker}", get(live_quote))
        .route("/api/stocks/{ticker}", get(stock_snapshot))
        .route("/api/calendar", get(list_calendar))
        .route("/api/summary", post(summarize_text))
        .layer(cors_layer(allowed_origins))
        .with_state(state)
}

#[derive(serde::Serialize)]
struct FetchLiveResp {
    success: bool,
    inserted: usize,
}

async fn fetch_live(State(state): State<AppState>) -> Json<FetchLiveResp> {
    let report = state.pipeline.run_cycle().await;
    Json(FetchLiveResp {
        success: true,
        inserted: report.inserted,
    })
}

async fn list_events(
    State(state): State<AppState>,
    Query(filter): Query<EventFilter>,
) -> Result<Json<Vec<Event>>, ApiError> {
    let events = state.events.query(&filter).await?;
    Ok(Json(events))
}

async fn live_quote(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> Result<Json<SourcedQuote>, ApiError> {
    state
        .quotes
        .lookup(&ticker)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("No quote available".into()))
}

async fn stock_snapshot(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> Result<Json<Stock>, ApiError> {
    state
        .market
        .stock(&ticker)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Stock not found".into()))
}

async fn list_calendar(
    State(state): State<AppState>,
    Query(filter): Query<CalendarFilter>,
) -> Result<Json<Vec<CalendarEvent>>, ApiError> {
    Ok(Json(state.market.calendar(&filter).await?))
}

#[derive(serde::Deserialize)]
struct SummaryReq {
    #[serde(default)]
    text: Option<String>,
}

async fn summarize_text(
    State(state): State<AppState>,
    Json(body): Json<SummaryReq>,
) -> Result<Json<SummaryResult>, ApiError> {
    let text = body
        .text
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("text required".into()))?;
    Ok(Json(state.summarizer.summarize(&text).await))
}
