//! Capabilities the reply pipeline consumes. The Reddit and Giphy clients
//! implement these; tests substitute in-memory fakes.

use crate::error::CoreError;
use crate::types::{Comment, MediaOutcome};
use async_trait::async_trait;

#[async_trait]
pub trait ForumClient: Send + Sync {
    /// Up to `page_size` recent comments of `source`, newest first.
    async fn list_recent_comments(
        &self,
        source: &str,
        page_size: u32,
    ) -> Result<Vec<Comment>, CoreError>;

    async fn post_reply(&self, comment_id: &str, text: &str) -> Result<(), CoreError>;
}

#[async_trait]
pub trait MediaLookup: Send + Sync {
    /// Searches for `search_term`, yielding the first result's URL.
    async fn find(&self, search_term: &str) -> MediaOutcome;
}

/// Record of comment ids that already received a reply.
pub trait ProcessedStore {
    fn seen(&self, comment_id: &str) -> bool;

    /// Idempotent.
    fn mark_seen(&mut self, comment_id: &str);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
