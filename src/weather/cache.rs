use super::weatherapi::{UpstreamError, WeatherApiClient};
use chrono::{DateTime, Utc};
use moka::future::Cache;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub const CACHE_TTL: Duration = Duration::from_secs(15 * 60);
pub const FORECAST_DAYS: u8 = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WeatherKind {
    Current,
    Forecast,
}

impl WeatherKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WeatherKind::Current => "current weather",
            WeatherKind::Forecast => "forecast",
        }
    }
}

#[derive(Clone, Debug)]
pub struct CachedWeather {
    pub payload: Value,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct CacheLookup {
    pub payload: Value,
    pub from_cache: bool,
}

/// City names are matched case-insensitively; "lat,lon" keys pass through as-is.
pub fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase()
}

/// Memoizes current and forecast responses per normalized key.
///
/// Entries expire `ttl` after they were fetched and are only replaced by a
/// successful refresh. A failed fetch stores nothing, so the next request
/// tries the provider again. Concurrent misses on the same key share one
/// upstream request.
pub struct WeatherCache {
    client: Arc<WeatherApiClient>,
    current: Cache<String, CachedWeather>,
    forecast: Cache<String, CachedWeather>,
}

impl WeatherCache {
    pub fn new(client: Arc<WeatherApiClient>) -> Self {
        Self::with_ttl(client, CACHE_TTL)
    }

    pub fn with_ttl(client: Arc<WeatherApiClient>, ttl: Duration) -> Self {
        Self {
            client,
            current: Cache::builder().time_to_live(ttl).build(),
            forecast: Cache::builder().time_to_live(ttl).build(),
        }
    }

    pub async fn get(
        &self,
        kind: WeatherKind,
        key: &str,
    ) -> Result<CacheLookup, Arc<UpstreamError>> {
        let key = normalize_key(key);

        let entry = self
            .cache_for(kind)
            .entry(key.clone())
            .or_try_insert_with(self.fetch(kind, &key))
            .await?;

        let from_cache = !entry.is_fresh();
        let cached = entry.into_value();

        if from_cache {
            let age = Utc::now() - cached.fetched_at;
            tracing::info!(
                "Serving {} for {} from cache (age {}s)",
                kind.as_str(),
                key,
                age.num_seconds()
            );
        }

        Ok(CacheLookup {
            payload: cached.payload,
            from_cache,
        })
    }

    pub async fn entry_count(&self) -> u64 {
        // Counts only settle once moka has applied its pending writes.
        self.current.run_pending_tasks().await;
        self.forecast.run_pending_tasks().await;
        self.current.entry_count() + self.forecast.entry_count()
    }

    fn cache_for(&self, kind: WeatherKind) -> &Cache<String, CachedWeather> {
        match kind {
            WeatherKind::Current => &self.current,
            WeatherKind::Forecast => &self.forecast,
        }
    }

    async fn fetch(&self, kind: WeatherKind, key: &str) -> Result<CachedWeather, UpstreamError> {
        tracing::info!("Fetching {} for {} from provider", kind.as_str(), key);

        let payload = match kind {
            WeatherKind::Current => self.client.fetch_current(key).await?,
            WeatherKind::Forecast => self.client.fetch_forecast(key, FORECAST_DAYS).await?,
        };

        Ok(CachedWeather {
            payload,
            fetched_at: Utc::now(),
        })
    }
}
