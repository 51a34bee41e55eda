use crate::config::Config;
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;

/// Every variant is reported to callers as the same upstream failure; the
/// distinction only exists for the logs.
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("API error: HTTP {status}: {body}")]
    ApiError { status: u16, body: String },
    #[error("JSON parsing failed: {0}")]
    JsonParsing(#[from] serde_json::Error),
}

/// Thin client for the WeatherAPI.com REST endpoints.
pub struct WeatherApiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl WeatherApiClient {
    pub fn new(config: &Config) -> Result<Self, UpstreamError> {
        // No timeout: a hung provider only stalls the request waiting on it.
        let client = Client::builder()
            .user_agent("WeatherProxy/1.0")
            .build()?;

        Ok(Self {
            client,
            api_key: config.weather_api_key.clone(),
            base_url: config.weather_api_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn fetch_current(&self, query: &str) -> Result<Value, UpstreamError> {
        self.get_json("current.json", &[("q", query)]).await
    }

    pub async fn fetch_forecast(&self, query: &str, days: u8) -> Result<Value, UpstreamError> {
        self.get_json("forecast.json", &[("q", query), ("days", &days.to_string())])
            .await
    }

    pub async fn fetch_history(&self, city: &str, date: &str) -> Result<Value, UpstreamError> {
        self.get_json("history.json", &[("q", city), ("dt", date)]).await
    }

    async fn get_json(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<Value, UpstreamError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        // The key stays out of the log line.
        tracing::debug!(%url, ?params, "Fetching from weather provider");

        let response = self
            .client
            .get(&url)
            .query(&[("key", self.api_key.as_str())])
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::ApiError {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str) -> WeatherApiClient {
        let config = Config {
            weather_api_key: "test-key".to_string(),
            weather_api_base_url: base_url.to_string(),
            favorites_path: PathBuf::from("unused.json"),
            bind_addr: "127.0.0.1:0".to_string(),
        };
        WeatherApiClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_current_sends_key_and_query() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/current.json"))
            .and(query_param("key", "test-key"))
            .and(query_param("q", "london"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "location": {"name": "London"},
                "current": {"temp_c": 11.0}
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = test_client(&mock_server.uri());
        let body = client.fetch_current("london").await.unwrap();

        assert_eq!(body["location"]["name"], "London");
        assert_eq!(body["current"]["temp_c"], 11.0);
    }

    #[tokio::test]
    async fn test_fetch_forecast_passes_days() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/forecast.json"))
            .and(query_param("q", "oslo"))
            .and(query_param("days", "5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "forecast": {"forecastday": []}
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = test_client(&format!("{}/", mock_server.uri()));
        let body = client.fetch_forecast("oslo", 5).await.unwrap();

        assert!(body["forecast"]["forecastday"].is_array());
    }

    #[tokio::test]
    async fn test_fetch_history_passes_date() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/history.json"))
            .and(query_param("q", "Rome"))
            .and(query_param("dt", "2024-03-01"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = test_client(&mock_server.uri());
        let body = client.fetch_history("Rome", "2024-03-01").await.unwrap();

        assert_eq!(body["ok"], true);
    }

    #[tokio::test]
    async fn test_non_success_status_is_api_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/current.json"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"code": 1006, "message": "No matching location found."}
            })))
            .mount(&mock_server)
            .await;

        let client = test_client(&mock_server.uri());
        let err = client.fetch_current("atlantis").await.unwrap_err();

        match err {
            UpstreamError::ApiError { status, body } => {
                assert_eq!(status, 400);
                assert!(body.contains("No matching location"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_parse_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/current.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&mock_server)
            .await;

        let client = test_client(&mock_server.uri());
        let err = client.fetch_current("paris").await.unwrap_err();

        assert!(matches!(err, UpstreamError::JsonParsing(_)));
    }
}
