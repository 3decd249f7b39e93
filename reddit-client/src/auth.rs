//! Script-app authentication: the OAuth2 resource-owner password grant
//! Reddit offers to bots acting as their own account.

use gifbot_core::{CoreError, RedditApiError, RedditCredentials};
use oauth2::basic::BasicClient;
use oauth2::{
    AuthUrl, ClientId, ClientSecret, HttpRequest, HttpResponse, RequestTokenError,
    ResourceOwnerPassword, ResourceOwnerUsername, Scope, TokenResponse, TokenUrl,
};
use std::time::{Duration, SystemTime};
use tracing::{debug, info};

pub const REDDIT_AUTH_URL: &str = "https://www.reddit.com/api/v1/authorize";
pub const REDDIT_TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";

/// Lifetime Reddit grants when the token response omits `expires_in`.
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone)]
pub struct RedditToken {
    pub access_token: String,
    pub expires_at: SystemTime,
}

impl RedditToken {
    pub fn is_expired(&self) -> bool {
        SystemTime::now() >= self.expires_at
    }
}

pub struct PasswordAuthenticator {
    oauth_client: BasicClient,
    http_client: reqwest::Client,
    username: String,
    password: String,
}

impl PasswordAuthenticator {
    pub fn new(credentials: &RedditCredentials, user_agent: &str) -> Result<Self, CoreError> {
        Self::with_token_url(credentials, user_agent, REDDIT_TOKEN_URL)
    }

    pub fn with_token_url(
        credentials: &RedditCredentials,
        user_agent: &str,
        token_url: &str,
    ) -> Result<Self, CoreError> {
        let http_client = reqwest::Client::builder()
            .user_agent(user_agent)
            // Token endpoints must not follow redirects
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| CoreError::Internal {
                message: format!("failed to build OAuth HTTP client: {e}"),
            })?;

        Ok(Self {
            oauth_client: build_oauth_client(credentials, token_url)?,
            http_client,
            username: credentials.username.clone(),
            password: credentials.password.clone(),
        })
    }

    pub fn get_required_scopes() -> Vec<&'static str> {
        vec!["identity", "read", "submit"]
    }

    pub async fn request_token(&self) -> Result<RedditToken, CoreError> {
        let username = ResourceOwnerUsername::new(self.username.clone());
        let password = ResourceOwnerPassword::new(self.password.clone());

        let mut request = self.oauth_client.exchange_password(&username, &password);
        for scope in Self::get_required_scopes() {
            request = request.add_scope(Scope::new(scope.to_string()));
        }

        debug!("Requesting access token for u/{}", self.username);
        let http_client = self.http_client.clone();
        let token = request
            .request_async(|req| send_oauth_request(http_client, req))
            .await
            .map_err(|e| {
                let reason = match e {
                    RequestTokenError::ServerResponse(resp) => resp.error().to_string(),
                    RequestTokenError::Request(e) => format!("token request failed: {e}"),
                    RequestTokenError::Parse(e, body) => format!(
                        "unexpected token response ({e}): {}",
                        String::from_utf8_lossy(&body)
                    ),
                    RequestTokenError::Other(reason) => reason,
                };
                CoreError::RedditApi(RedditApiError::AuthenticationFailed { reason })
            })?;

        let lifetime = token.expires_in().unwrap_or(DEFAULT_TOKEN_LIFETIME);

        info!("Obtained Reddit access token valid for {:?}", lifetime);
        Ok(RedditToken {
            access_token: token.access_token().secret().clone(),
            expires_at: SystemTime::now() + lifetime,
        })
    }
}

fn build_oauth_client(
    credentials: &RedditCredentials,
    token_url: &str,
) -> Result<BasicClient, CoreError> {
    let auth_url = AuthUrl::new(REDDIT_AUTH_URL.to_string()).map_err(|e| CoreError::Internal {
        message: format!("invalid authorization URL: {e}"),
    })?;
    let token_url = TokenUrl::new(token_url.to_string()).map_err(|e| CoreError::Internal {
        message: format!("invalid token URL: {e}"),
    })?;

    Ok(BasicClient::new(
        ClientId::new(credentials.client_id.clone()),
        Some(ClientSecret::new(credentials.client_secret.clone())),
        auth_url,
        Some(token_url),
    ))
}

/// Runs an oauth2 token request through our reqwest client so Reddit sees
/// the bot's user agent.
async fn send_oauth_request(
    http_client: reqwest::Client,
    request: HttpRequest,
) -> Result<HttpResponse, reqwest::Error> {
    let response = http_client
        .request(request.method, request.url.as_str())
        .headers(request.headers)
        .body(request.body)
        .send()
        .await?;

    let status_code = response.status();
    let headers = response.headers().clone();
    let body = response.bytes().await?.to_vec();

    Ok(HttpResponse {
        status_code,
        headers,
        body,
    })
}
