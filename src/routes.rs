use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

use crate::aggregator::{Aggregator, TimeFilter};
use crate::cache::{CacheMetadata, CacheStore};
use crate::error::FeedListError;
use crate::feeds::FeedList;

pub struct AppState {
    pub aggregator: Arc<Aggregator>,
    pub feeds: Arc<RwLock<FeedList>>,
    pub cache: Option<CacheStore>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/articles", get(articles))
        .route("/refresh", post(refresh))
        .route("/refresh/status", get(refresh_status))
        .route("/feeds", get(list_feeds).post(add_feed).delete(remove_feed))
        .route("/cache/status", get(cache_status))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// Custom error type
pub enum AppError {
    BadRequest(String),
    Conflict(String),
    NotFound(String),
    Internal(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error: {}", err),
            ),
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

impl From<FeedListError> for AppError {
    fn from(err: FeedListError) -> Self {
        match err {
            FeedListError::InvalidUrl(_) => AppError::BadRequest(err.to_string()),
            FeedListError::Duplicate(_) => AppError::Conflict(err.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Deserialize)]
pub struct ArticlesQuery {
    pub filter: Option<String>,
}

#[derive(Deserialize)]
pub struct FeedBody {
    pub url: String,
}

#[derive(Deserialize)]
pub struct FeedQuery {
    pub url: String,
}

#[derive(Serialize)]
pub struct RefreshStatus {
    pub refreshing: bool,
    pub refreshed_at: Option<DateTime<Utc>>,
    pub total: usize,
    pub sources: usize,
    pub failed_sources: usize,
}

// Route handlers
pub async fn articles(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ArticlesQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = match query.filter.as_deref() {
        Some(raw) => raw.parse::<TimeFilter>().map_err(AppError::BadRequest)?,
        None => TimeFilter::All,
    };
    Ok(Json(state.aggregator.view(filter).await))
}

pub async fn refresh(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let aggregator = state.aggregator.clone();
    let urls = state.feeds.read().await.urls().to_vec();
    tokio::spawn(async move {
        aggregator.refresh(&urls).await;
    });

    Json(serde_json::json!({ "refreshing": true }))
}

pub async fn refresh_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.aggregator.snapshot().await;
    Json(RefreshStatus {
        refreshing: state.aggregator.is_refreshing(),
        refreshed_at: snapshot.refreshed_at,
        total: snapshot.articles.len(),
        sources: snapshot.sources,
        failed_sources: snapshot.failed_sources,
    })
}

pub async fn list_feeds(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.feeds.read().await.urls().to_vec())
}

pub async fn add_feed(
    State(state): State<Arc<AppState>>,
    Json(body): Json<FeedBody>,
) -> Result<impl IntoResponse, AppError> {
    state.feeds.write().await.add(&body.url)?;
    Ok((StatusCode::CREATED, Json(state.feeds.read().await.urls().to_vec())))
}

pub async fn remove_feed(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FeedQuery>,
) -> Result<impl IntoResponse, AppError> {
    if state.feeds.write().await.remove(&query.url) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("feed not subscribed: {}", query.url)))
    }
}

pub async fn cache_status(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let Some(cache) = &state.cache else {
        return Ok(Json(None::<CacheMetadata>));
    };
    let client = state.aggregator.resolver().client();
    let metadata = cache
        .metadata(client)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;
    Ok(Json(metadata))
}

pub async fn health() -> impl IntoResponse {
    "OK"
}
