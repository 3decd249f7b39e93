//! Giphy search client.
//!
//! [`GiphyClient`] issues one `GET /v1/gifs/search` per lookup and reports
//! the first result's URL. Every failure degrades to a non-fatal
//! [`MediaOutcome`].

use async_trait::async_trait;
use gifbot_core::{CoreError, GiphySettings, GiphyError, MediaLookup, MediaOutcome};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

const GIPHY_SEARCH_URL: &str = "https://api.giphy.com/v1/gifs/search";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    data: Vec<GifObject>,
}

#[derive(Debug, Deserialize)]
struct GifObject {
    url: String,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Clone)]
pub struct GiphyClient {
    http_client: Client,
    api_key: String,
    rating: String,
    limit: u32,
    timeout_secs: u64,
    search_url: String,
}

impl GiphyClient {
    pub fn new(settings: &GiphySettings) -> Result<Self, CoreError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| CoreError::Internal {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            http_client,
            api_key: settings.api_key.clone(),
            rating: settings.rating.clone(),
            limit: settings.limit.max(1),
            timeout_secs: settings.timeout_secs,
            search_url: GIPHY_SEARCH_URL.to_string(),
        })
    }

    /// Points the client at another search endpoint.
    pub fn with_search_url(mut self, url: impl Into<String>) -> Self {
        self.search_url = url.into();
        self
    }

    /// URL of the first result, `None` when the search matched nothing.
    pub async fn search(&self, search_term: &str) -> Result<Option<String>, CoreError> {
        let limit = self.limit.to_string();
        let params = [
            ("api_key", self.api_key.as_str()),
            ("q", search_term),
            ("limit", limit.as_str()),
            ("rating", self.rating.as_str()),
        ];

        debug!("Searching Giphy for '{}'", search_term);
        let response = self
            .http_client
            .get(&self.search_url)
            .query(&params)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CoreError::Giphy(status_error(status)));
        }

        let body = response.bytes().await.map_err(|e| self.transport_error(e))?;
        let parsed: SearchResponse = serde_json::from_slice(&body).map_err(|e| {
            CoreError::Giphy(GiphyError::InvalidResponse {
                details: e.to_string(),
            })
        })?;

        Ok(parsed.data.into_iter().next().map(|gif| {
            debug!("First result: {}", gif.title.as_deref().unwrap_or("(untitled)"));
            gif.url
        }))
    }

    fn transport_error(&self, error: reqwest::Error) -> CoreError {
        if error.is_timeout() {
            CoreError::Giphy(GiphyError::RequestTimeout {
                seconds: self.timeout_secs,
            })
        } else {
            // The request URL carries the api key
            CoreError::Network(error.without_url())
        }
    }
}

impl fmt::Debug for GiphyClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GiphyClient")
            .field("api_key", &"<redacted>")
            .field("rating", &self.rating)
            .field("limit", &self.limit)
            .field("search_url", &self.search_url)
            .finish()
    }
}

fn status_error(status: StatusCode) -> GiphyError {
    match status.as_u16() {
        401 | 403 => GiphyError::InvalidApiKey,
        429 => GiphyError::RateLimitExceeded,
        code if status.is_server_error() => GiphyError::ServerError { status_code: code },
        code => GiphyError::InvalidResponse {
            details: format!("unexpected status {code}"),
        },
    }
}

#[async_trait]
impl MediaLookup for GiphyClient {
    async fn find(&self, search_term: &str) -> MediaOutcome {
        match self.search(search_term).await {
            Ok(Some(url)) => {
                info!("Found gif: {}", url);
                MediaOutcome::Found(url)
            }
            Ok(None) => {
                info!("No gifs found for '{}'", search_term);
                MediaOutcome::NoResults
            }
            Err(e) => {
                debug!("Giphy lookup for '{}' failed", search_term);
                MediaOutcome::Failed(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_settings() -> GiphySettings {
        GiphySettings {
            api_key: "test-key".to_string(),
            timeout_secs: 1,
            ..GiphySettings::default()
        }
    }

    fn test_client(server: &MockServer) -> GiphyClient {
        GiphyClient::new(&test_settings())
            .unwrap()
            .with_search_url(format!("{}/v1/gifs/search", server.uri()))
    }

    #[tokio::test]
    async fn test_find_returns_first_result() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/gifs/search"))
            .and(query_param("api_key", "test-key"))
            .and(query_param("q", "you got this"))
            .and(query_param("limit", "1"))
            .and(query_param("rating", "pg-13"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    {"id": "a1", "url": "https://giphy.com/gifs/first", "title": "First"},
                    {"id": "b2", "url": "https://giphy.com/gifs/second"}
                ],
                "pagination": {"count": 2}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        match client.find("you got this").await {
            MediaOutcome::Found(url) => assert_eq!(url, "https://giphy.com/gifs/first"),
            other => panic!("Expected Found, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_results_are_no_results() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": []
            })))
            .mount(&server)
            .await;

        let outcome = test_client(&server).find("nothing").await;
        assert!(matches!(outcome, MediaOutcome::NoResults));
    }

    #[tokio::test]
    async fn test_malformed_body_is_failure() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let outcome = test_client(&server).find("funny").await;
        assert!(matches!(
            outcome,
            MediaOutcome::Failed(CoreError::Giphy(GiphyError::InvalidResponse { .. }))
        ));
    }

    #[tokio::test]
    async fn test_bad_api_key_is_failure() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let outcome = test_client(&server).find("funny").await;
        assert!(matches!(
            outcome,
            MediaOutcome::Failed(CoreError::Giphy(GiphyError::InvalidApiKey))
        ));
    }

    #[tokio::test]
    async fn test_server_error_is_failure() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let outcome = test_client(&server).find("funny").await;
        assert!(matches!(
            outcome,
            MediaOutcome::Failed(CoreError::Giphy(GiphyError::ServerError { status_code: 503 }))
        ));
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"data": []}))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let outcome = test_client(&server).find("funny").await;
        assert!(matches!(
            outcome,
            MediaOutcome::Failed(CoreError::Giphy(GiphyError::RequestTimeout { seconds: 1 }))
        ));
    }

    #[tokio::test]
    async fn test_connection_refused_is_failure() {
        let client = GiphyClient::new(&test_settings())
            .unwrap()
            .with_search_url("http://127.0.0.1:9/v1/gifs/search");

        let outcome = client.find("funny").await;
        assert!(matches!(outcome, MediaOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn test_transport_error_does_not_expose_api_key() {
        let settings = GiphySettings {
            api_key: "SECRET-GIPHY-KEY".to_string(),
            ..test_settings()
        };
        let client = GiphyClient::new(&settings)
            .unwrap()
            .with_search_url("http://127.0.0.1:9/v1/gifs/search");

        let error = client.search("funny").await.unwrap_err();
        assert!(matches!(error, CoreError::Network(_)));
        assert!(!error.to_string().contains("SECRET-GIPHY-KEY"));
        assert!(!format!("{:?}", error).contains("SECRET-GIPHY-KEY"));
    }
}
