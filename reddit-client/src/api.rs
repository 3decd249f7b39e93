use crate::rate_limiter::{RateLimitConfig, RateLimiter};
use chrono::{TimeZone, Utc};
use gifbot_core::{Comment, CoreError, RedditApiError};
use reqwest::{Client, Method, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

pub const REDDIT_API_BASE: &str = "https://oauth.reddit.com";

const DELETED_AUTHOR: &str = "[deleted]";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListing<T> {
    pub kind: String,
    pub data: RedditListingData<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingData<T> {
    pub children: Vec<RedditListingChild<T>>,
    pub after: Option<String>,
    pub before: Option<String>,
    pub dist: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingChild<T> {
    pub kind: String,
    pub data: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditCommentData {
    pub id: String,
    pub author: String,
    #[serde(default)]
    pub author_fullname: Option<String>,
    pub body: String,
    pub created_utc: f64,
    pub subreddit: String,
    #[serde(default)]
    pub link_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditUserData {
    pub id: String,
    pub name: String,
    pub created_utc: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct CommentSubmitResponse {
    json: CommentSubmitJson,
}

#[derive(Debug, Clone, Deserialize)]
struct CommentSubmitJson {
    #[serde(default)]
    errors: Vec<Vec<serde_json::Value>>,
}

/// Request payload beyond the endpoint itself.
pub enum RequestBody<'a> {
    None,
    Query(&'a [(&'a str, &'a str)]),
    Form(&'a [(&'a str, &'a str)]),
}

#[derive(Debug)]
pub struct RedditApiClient {
    http_client: Client,
    rate_limiter: RateLimiter,
    user_agent: String,
    api_base: String,
}

impl RedditApiClient {
    pub fn new(user_agent: String) -> Result<Self, CoreError> {
        let http_client = Client::builder()
            .user_agent(&user_agent)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| CoreError::Internal {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            http_client,
            rate_limiter: RateLimiter::new(RateLimitConfig::reddit_oauth()),
            user_agent,
            api_base: REDDIT_API_BASE.to_string(),
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Sends an authenticated request. Non-success statuses become typed
    /// errors; `on_not_found` supplies the error for a 404.
    pub async fn make_request(
        &self,
        method: Method,
        endpoint: &str,
        access_token: &str,
        body: RequestBody<'_>,
        on_not_found: impl FnOnce() -> RedditApiError,
    ) -> Result<Response, CoreError> {
        let url = format!("{}{}", self.api_base, endpoint);

        let waited = self.rate_limiter.acquire_permit().await;
        debug!(
            "Acquired rate limit permit for {} {} after {:?}",
            method, endpoint, waited
        );

        let mut request_builder = self
            .http_client
            .request(method.clone(), &url)
            .bearer_auth(access_token);

        request_builder = match body {
            RequestBody::None => request_builder,
            RequestBody::Query(params) => request_builder.query(params),
            RequestBody::Form(fields) => request_builder.form(fields),
        };

        debug!("Making Reddit API request: {} {}", method, endpoint);
        let response = request_builder.send().await.map_err(|e| {
            debug!("Network error for {} {}: {}", method, endpoint, e);
            if e.is_timeout() {
                CoreError::RedditApi(RedditApiError::RequestTimeout)
            } else {
                CoreError::Network(e)
            }
        })?;

        let status = response.status();
        if status.is_success() {
            debug!("Request successful: {} {}", status, endpoint);
            return Ok(response);
        }

        debug!("Request failed with status: {} for {}", status, endpoint);
        let api_error = match status.as_u16() {
            429 => {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                RedditApiError::RateLimitExceeded { retry_after }
            }
            401 => RedditApiError::InvalidToken,
            403 => RedditApiError::Forbidden {
                resource: endpoint.to_string(),
            },
            404 => on_not_found(),
            code if status.is_server_error() => RedditApiError::ServerError { status_code: code },
            code => RedditApiError::InvalidResponse {
                details: format!("unexpected status {} for {}", code, endpoint),
            },
        };
        Err(CoreError::RedditApi(api_error))
    }

    pub async fn get_user_info(&self, access_token: &str) -> Result<RedditUserData, CoreError> {
        let response = self
            .make_request(
                Method::GET,
                "/api/v1/me",
                access_token,
                RequestBody::None,
                || RedditApiError::InvalidResponse {
                    details: "Account endpoint not found".to_string(),
                },
            )
            .await?;

        let user_data: RedditUserData = response.json().await.map_err(|e| {
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!("Failed to parse user data: {e}"),
            })
        })?;

        debug!("Retrieved user info for: {}", user_data.name);
        Ok(user_data)
    }

    /// Newest comments across the subreddit, newest first.
    pub async fn get_subreddit_comments(
        &self,
        access_token: &str,
        subreddit: &str,
        limit: u32,
    ) -> Result<RedditListing<RedditCommentData>, CoreError> {
        let endpoint = format!("/r/{}/comments", subreddit);
        let limit_str = limit.to_string();
        let params = [("limit", limit_str.as_str()), ("raw_json", "1")];

        let response = self
            .make_request(
                Method::GET,
                &endpoint,
                access_token,
                RequestBody::Query(&params),
                || RedditApiError::SubredditNotFound {
                    subreddit: subreddit.to_string(),
                },
            )
            .await?;

        let listing: RedditListing<RedditCommentData> = response.json().await.map_err(|e| {
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!("Failed to parse comments for r/{}: {}", subreddit, e),
            })
        })?;

        info!(
            "Retrieved {} comments from r/{}",
            listing.data.children.len(),
            subreddit
        );
        Ok(listing)
    }

    /// Replies to the comment `comment_id` (bare id or `t1_` fullname).
    pub async fn post_comment(
        &self,
        access_token: &str,
        comment_id: &str,
        text: &str,
    ) -> Result<(), CoreError> {
        let thing_id = comment_fullname(comment_id);
        let fields = [
            ("api_type", "json"),
            ("thing_id", thing_id.as_str()),
            ("text", text),
        ];

        let response = self
            .make_request(
                Method::POST,
                "/api/comment",
                access_token,
                RequestBody::Form(&fields),
                || RedditApiError::CommentNotFound {
                    comment_id: comment_id.to_string(),
                },
            )
            .await?;

        let submitted: CommentSubmitResponse = response.json().await.map_err(|e| {
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!("Failed to parse comment submission response: {e}"),
            })
        })?;

        if !submitted.json.errors.is_empty() {
            let reason = submitted
                .json
                .errors
                .iter()
                .map(|entry| {
                    entry
                        .iter()
                        .filter_map(|part| part.as_str())
                        .collect::<Vec<_>>()
                        .join(": ")
                })
                .collect::<Vec<_>>()
                .join("; ");
            return Err(CoreError::RedditApi(RedditApiError::ReplyRejected {
                reason,
            }));
        }

        info!("Posted reply to {}", thing_id);
        Ok(())
    }
}

pub fn comment_fullname(comment_id: &str) -> String {
    if comment_id.starts_with("t1_") {
        comment_id.to_string()
    } else {
        format!("t1_{}", comment_id)
    }
}

impl RedditCommentData {
    /// Converts to the pipeline's [`Comment`]. `None` when the timestamp is
    /// out of range.
    pub fn into_comment(self) -> Option<Comment> {
        let millis = (self.created_utc * 1000.0).round() as i64;
        let created_utc = Utc.timestamp_millis_opt(millis).single()?;

        let deleted = self.author == DELETED_AUTHOR;
        Some(Comment {
            id: self.id,
            author_id: if deleted { None } else { self.author_fullname },
            author_name: if deleted { None } else { Some(self.author) },
            body: self.body,
            created_utc,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(server: &MockServer) -> RedditApiClient {
        RedditApiClient::new("test-user-agent/1.0".to_string())
            .unwrap()
            .with_api_base(server.uri())
    }

    fn comment_json(id: &str, author: &str, fullname: Option<&str>, created: f64) -> serde_json::Value {
        serde_json::json!({
            "kind": "t1",
            "data": {
                "id": id,
                "author": author,
                "author_fullname": fullname,
                "body": format!("body of {}", id),
                "created_utc": created,
                "subreddit": "test",
                "link_id": "t3_post"
            }
        })
    }

    #[test]
    fn test_comment_fullname() {
        assert_eq!(comment_fullname("abc"), "t1_abc");
        assert_eq!(comment_fullname("t1_abc"), "t1_abc");
    }

    #[test]
    fn test_comment_conversion() {
        let data = RedditCommentData {
            id: "c1".to_string(),
            author: "alice".to_string(),
            author_fullname: Some("t2_alice".to_string()),
            body: "having a rough day".to_string(),
            created_utc: 1_640_995_200.0,
            subreddit: "test".to_string(),
            link_id: None,
        };

        let comment = data.into_comment().unwrap();
        assert_eq!(comment.id, "c1");
        assert_eq!(comment.author_id.as_deref(), Some("t2_alice"));
        assert_eq!(comment.created_utc.timestamp(), 1_640_995_200);
    }

    #[test]
    fn test_deleted_author_has_no_identity() {
        let data = RedditCommentData {
            id: "c2".to_string(),
            author: "[deleted]".to_string(),
            author_fullname: None,
            body: "[removed]".to_string(),
            created_utc: 1_640_995_200.0,
            subreddit: "test".to_string(),
            link_id: None,
        };

        let comment = data.into_comment().unwrap();
        assert_eq!(comment.author_id, None);
        assert_eq!(comment.display_author(), "[deleted]");
    }

    #[tokio::test]
    async fn test_get_subreddit_comments() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/r/test/comments"))
            .and(query_param("limit", "100"))
            .and(header("authorization", "Bearer token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "kind": "Listing",
                "data": {
                    "children": [
                        comment_json("c2", "bob", Some("t2_bob"), 1_700_000_100.0),
                        comment_json("c1", "alice", Some("t2_alice"), 1_700_000_000.0)
                    ],
                    "after": null,
                    "before": null,
                    "dist": 2
                }
            })))
            .mount(&server)
            .await;

        let listing = test_client(&server)
            .get_subreddit_comments("token", "test", 100)
            .await
            .unwrap();

        assert_eq!(listing.data.children.len(), 2);
        assert_eq!(listing.data.children[0].data.id, "c2");
    }

    #[tokio::test]
    async fn test_missing_subreddit_maps_to_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/r/nowhere/comments"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let result = test_client(&server)
            .get_subreddit_comments("token", "nowhere", 100)
            .await;

        match result {
            Err(CoreError::RedditApi(RedditApiError::SubredditNotFound { subreddit })) => {
                assert_eq!(subreddit, "nowhere")
            }
            other => panic!("Expected SubredditNotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rate_limit_honours_retry_after() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "42"))
            .mount(&server)
            .await;

        let result = test_client(&server)
            .get_subreddit_comments("token", "test", 100)
            .await;

        assert!(matches!(
            result,
            Err(CoreError::RedditApi(RedditApiError::RateLimitExceeded { retry_after: 42 }))
        ));
    }

    #[tokio::test]
    async fn test_post_comment_success() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/comment"))
            .and(body_string_contains("thing_id=t1_c1"))
            .and(body_string_contains("api_type=json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "json": {"errors": [], "data": {"things": []}}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = test_client(&server)
            .post_comment("token", "c1", "https://giphy.com/gifs/x")
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_post_comment_rejected() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/comment"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "json": {"errors": [["RATELIMIT", "you are doing that too much", "ratelimit"]]}
            })))
            .mount(&server)
            .await;

        let result = test_client(&server)
            .post_comment("token", "c1", "text")
            .await;

        match result {
            Err(CoreError::RedditApi(RedditApiError::ReplyRejected { reason })) => {
                assert!(reason.starts_with("RATELIMIT"))
            }
            other => panic!("Expected ReplyRejected, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_post_comment_forbidden() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let result = test_client(&server)
            .post_comment("token", "c1", "text")
            .await;
        assert!(matches!(
            result,
            Err(CoreError::RedditApi(RedditApiError::Forbidden { .. }))
        ));
    }
}
