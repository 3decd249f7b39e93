use gifbot_core::{Comment, CoreError, ForumClient};

/// One page of a source's most recent comments, newest first. Each call
/// starts from the top of the listing.
pub struct CommentFeed<'a> {
    forum: &'a dyn ForumClient,
    page_size: u32,
}

impl<'a> CommentFeed<'a> {
    pub fn new(forum: &'a dyn ForumClient, page_size: u32) -> Self {
        Self { forum, page_size }
    }

    pub async fn recent(&self, source: &str) -> Result<std::vec::IntoIter<Comment>, CoreError> {
        let mut comments = self
            .forum
            .list_recent_comments(source, self.page_size)
            .await?;

        // Stable, so equal timestamps keep the forum's order
        comments.sort_by(|a, b| b.created_utc.cmp(&a.created_utc));
        comments.truncate(self.page_size as usize);
        Ok(comments.into_iter())
    }
}
