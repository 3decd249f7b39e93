pub mod api;
pub mod auth;
pub mod rate_limiter;


pub use api::{RedditApiClient, RedditCommentData, RedditListing, RequestBody};
pub use auth::{PasswordAuthenticator, RedditToken};
pub use rate_limiter::{RateLimitConfig, RateLimiter};

use async_trait::async_trait;
use gifbot_core::{Comment, CoreError, ForumClient, Identity, RedditApiError, RedditCredentials};
use tracing::{info, warn};

/// Reddit as the bot's forum: authenticates once, then lists comments and
/// posts replies with the resulting token.
pub struct RedditClient {
    api: RedditApiClient,
    authenticator: PasswordAuthenticator,
    token: Option<RedditToken>,
}

impl RedditClient {
    pub fn new(credentials: &RedditCredentials) -> Result<Self, CoreError> {
        let user_agent = credentials.user_agent();
        Ok(Self {
            authenticator: PasswordAuthenticator::new(credentials, &user_agent)?,
            api: RedditApiClient::new(user_agent)?,
            token: None,
        })
    }

    /// Client talking to `api_base` and `token_url` instead of reddit.com.
    pub fn with_endpoints(
        credentials: &RedditCredentials,
        api_base: &str,
        token_url: &str,
    ) -> Result<Self, CoreError> {
        let user_agent = credentials.user_agent();
        Ok(Self {
            authenticator: PasswordAuthenticator::with_token_url(
                credentials,
                &user_agent,
                token_url,
            )?,
            api: RedditApiClient::new(user_agent)?.with_api_base(api_base),
            token: None,
        })
    }

    /// Obtains a token and resolves the bot's own account.
    pub async fn authenticate(&mut self) -> Result<Identity, CoreError> {
        let token = self.authenticator.request_token().await?;
        let user = self.api.get_user_info(&token.access_token).await?;

        let identity = Identity {
            account_id: format!("t2_{}", user.id),
            username: user.name,
        };
        info!(
            "Connected to Reddit as u/{} ({})",
            identity.username,
            self.api.user_agent()
        );

        self.token = Some(token);
        Ok(identity)
    }

    fn access_token(&self) -> Result<&str, CoreError> {
        match &self.token {
            Some(token) if !token.is_expired() => Ok(&token.access_token),
            _ => Err(CoreError::RedditApi(RedditApiError::InvalidToken)),
        }
    }
}

#[async_trait]
impl ForumClient for RedditClient {
    async fn list_recent_comments(
        &self,
        source: &str,
        page_size: u32,
    ) -> Result<Vec<Comment>, CoreError> {
        let access_token = self.access_token()?;
        let listing = self
            .api
            .get_subreddit_comments(access_token, source, page_size)
            .await?;

        let comments = listing
            .data
            .children
            .into_iter()
            .filter_map(|child| {
                let id = child.data.id.clone();
                let comment = child.data.into_comment();
                if comment.is_none() {
                    warn!("Dropping comment {} with invalid timestamp", id);
                }
                comment
            })
            .collect();
        Ok(comments)
    }

    async fn post_reply(&self, comment_id: &str, text: &str) -> Result<(), CoreError> {
        let access_token = self.access_token()?;
        self.api.post_comment(access_token, comment_id, text).await
    }
}
