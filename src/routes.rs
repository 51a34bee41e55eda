use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::{IntoResponse, Json},
    routing::{delete, get},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    config::Config,
    error::{ApiError, Result},
    favorites::FavoritesStore,
    weather::{CacheLookup, WeatherApiClient, WeatherCache, WeatherKind},
};

const LOOKUP_FAILED: &str = "City not found or API error";
const HISTORY_LOOKUP_FAILED: &str = "City/date not found or API error";

// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub weather_client: Arc<WeatherApiClient>,
    pub weather_cache: Arc<WeatherCache>,
    pub favorites: Arc<FavoritesStore>,
}

impl AppState {
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let weather_client = Arc::new(WeatherApiClient::new(config)?);
        let weather_cache = Arc::new(WeatherCache::new(weather_client.clone()));
        let favorites = Arc::new(FavoritesStore::load(&config.favorites_path).await);

        Ok(Self {
            weather_client,
            weather_cache,
            favorites,
        })
    }
}

// Request/Response types
#[derive(Debug, Deserialize)]
pub struct AddFavoriteRequest {
    pub city: String,
}

#[derive(Debug, Serialize)]
pub struct FavoritesResponse {
    pub favorites: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: String,
    pub cached_entries: u64,
}

fn require_city(city: &str) -> Result<&str> {
    let city = city.trim();
    if city.is_empty() {
        return Err(ApiError::BadRequest("City must not be empty".to_string()));
    }
    Ok(city)
}

fn cached_json(lookup: CacheLookup) -> impl IntoResponse {
    let marker = if lookup.from_cache { "HIT" } else { "MISS" };
    ([("x-cache", marker)], Json(lookup.payload))
}

// Route handlers
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        cached_entries: state.weather_cache.entry_count().await,
    })
}

pub async fn get_current(
    State(state): State<AppState>,
    Path(city): Path<String>,
) -> Result<impl IntoResponse> {
    let city = require_city(&city)?;

    match state.weather_cache.get(WeatherKind::Current, city).await {
        Ok(lookup) => Ok(cached_json(lookup)),
        Err(e) => {
            tracing::error!("Current weather lookup for {} failed: {}", city, e);
            Err(ApiError::Upstream(LOOKUP_FAILED))
        }
    }
}

pub async fn get_forecast(
    State(state): State<AppState>,
    Path(city): Path<String>,
) -> Result<impl IntoResponse> {
    let city = require_city(&city)?;

    match state.weather_cache.get(WeatherKind::Forecast, city).await {
        Ok(lookup) => Ok(cached_json(lookup)),
        Err(e) => {
            tracing::error!("Forecast lookup for {} failed: {}", city, e);
            Err(ApiError::Upstream(LOOKUP_FAILED))
        }
    }
}

pub async fn get_history(
    State(state): State<AppState>,
    Path((city, date)): Path<(String, String)>,
) -> Result<Json<Value>> {
    let city = require_city(&city)?;

    // Dates are passed through; the provider decides what it accepts.
    match state.weather_client.fetch_history(city, &date).await {
        Ok(body) => Ok(Json(body)),
        Err(e) => {
            tracing::error!("History lookup for {} on {} failed: {}", city, date, e);
            Err(ApiError::Upstream(HISTORY_LOOKUP_FAILED))
        }
    }
}

pub async fn list_favorites(State(state): State<AppState>) -> Json<FavoritesResponse> {
    Json(FavoritesResponse {
        favorites: state.favorites.list().await,
    })
}

pub async fn add_favorite(
    State(state): State<AppState>,
    payload: std::result::Result<Json<AddFavoriteRequest>, JsonRejection>,
) -> Result<Json<FavoritesResponse>> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::warn!("Rejected favorites body: {}", rejection.body_text());
        ApiError::BadRequest(rejection.body_text())
    })?;
    let city = require_city(&request.city)?;
    let favorites = state.favorites.add(city).await?;
    Ok(Json(FavoritesResponse { favorites }))
}

pub async fn remove_favorite(
    State(state): State<AppState>,
    Path(city): Path<String>,
) -> Result<Json<FavoritesResponse>> {
    let favorites = state.favorites.remove(&city).await?;
    Ok(Json(FavoritesResponse { favorites }))
}

// Create the router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/weather/current/:city", get(get_current))
        .route("/weather/forecast/:city", get(get_forecast))
        .route("/weather/history/:city/:date", get(get_history))
        .route("/weather/favorites", get(list_favorites).post(add_favorite))
        .route("/weather/favorites/:city", delete(remove_favorite))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
