pub mod feed;
pub mod keyword;
pub mod pipeline;

pub use feed::CommentFeed;
pub use keyword::{KeywordMatch, KeywordMatcher};
pub use pipeline::{compose_reply, ReplyPipeline, REPLY_FOOTER};
