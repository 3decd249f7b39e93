//! The per-invocation reply pipeline.
//!
//! One invocation walks the configured sources in order and each source's
//! comments newest first. A comment is evaluated only if it is inside the
//! time window, not already processed, and not written by the bot itself.
//! The first comment that both matches a trigger and yields a media URL gets
//! a reply, after which the run is over: at most one reply per invocation.

use crate::feed::CommentFeed;
use crate::keyword::KeywordMatcher;
use chrono::{DateTime, Duration, Utc};
use gifbot_core::{
    Comment, ErrorReporter, ForumClient, Identity, IssuedReply, MediaLookup, MediaOutcome,
    ProcessedStore, RunResult, TriggerTable,
};
use tracing::{debug, info};

pub const REPLY_FOOTER: &str = "\n\n---\n^(🤖 bot)";

const DEFAULT_WINDOW_MINUTES: i64 = 15;
const DEFAULT_PAGE_SIZE: u32 = 100;
const PREVIEW_CHARS: usize = 60;

pub fn compose_reply(media_url: &str) -> String {
    format!("{media_url}{REPLY_FOOTER}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum RunState {
    Scanning,
    Replied(IssuedReply),
}

impl RunState {
    fn is_terminal(&self) -> bool {
        matches!(self, RunState::Replied(_))
    }
}

/// What happened to a single comment.
#[derive(Debug)]
enum Evaluation {
    OutsideWindow,
    AlreadyProcessed,
    SelfAuthored,
    NoMatch,
    MediaAbsent,
    ReplyFailed,
    Replied(IssuedReply),
}

impl Evaluation {
    fn in_window(&self) -> bool {
        !matches!(self, Evaluation::OutsideWindow)
    }

    fn inspected(&self) -> bool {
        matches!(
            self,
            Evaluation::NoMatch
                | Evaluation::MediaAbsent
                | Evaluation::ReplyFailed
                | Evaluation::Replied(_)
        )
    }
}

pub struct ReplyPipeline<'a> {
    forum: &'a dyn ForumClient,
    media: &'a dyn MediaLookup,
    identity: Identity,
    matcher: KeywordMatcher,
    sources: Vec<String>,
    window: Duration,
    page_size: u32,
    reporter: ErrorReporter,
}

impl<'a> ReplyPipeline<'a> {
    pub fn new(
        forum: &'a dyn ForumClient,
        media: &'a dyn MediaLookup,
        identity: Identity,
        triggers: TriggerTable,
        sources: Vec<String>,
    ) -> Self {
        Self {
            forum,
            media,
            identity,
            matcher: KeywordMatcher::new(triggers),
            sources,
            window: Duration::minutes(DEFAULT_WINDOW_MINUTES),
            page_size: DEFAULT_PAGE_SIZE,
            reporter: ErrorReporter::new(),
        }
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub async fn run(&self, store: &mut dyn ProcessedStore) -> RunResult {
        self.run_at(Utc::now(), store).await
    }

    /// Runs one invocation as if the current time were `now`.
    pub async fn run_at(&self, now: DateTime<Utc>, store: &mut dyn ProcessedStore) -> RunResult {
        // A window reaching past the earliest representable instant covers everything.
        let cutoff = now
            .checked_sub_signed(self.window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let feed = CommentFeed::new(self.forum, self.page_size);
        let mut result = RunResult::default();
        let mut state = RunState::Scanning;

        for source in &self.sources {
            if state.is_terminal() {
                break;
            }

            info!("Checking r/{}...", source);
            let comments = match feed.recent(source).await {
                Ok(comments) => comments,
                Err(e) => {
                    info!("Error checking r/{}, moving on", source);
                    self.reporter.report_warning(&e);
                    result.sources_failed += 1;
                    continue;
                }
            };
            result.sources_scanned += 1;

            let mut in_window = 0;
            let mut inspected = 0;
            for comment in comments {
                if state.is_terminal() {
                    break;
                }

                result.comments_seen += 1;
                let evaluation = self.evaluate(source, &comment, now, cutoff, store).await;
                if evaluation.in_window() {
                    in_window += 1;
                }
                if evaluation.inspected() {
                    inspected += 1;
                }

                if let Evaluation::Replied(reply) = evaluation {
                    store.mark_seen(&reply.comment_id);
                    state = RunState::Replied(reply);
                }
            }

            result.comments_in_window += in_window;
            result.comments_inspected += inspected;

            if !state.is_terminal() {
                info!(
                    "Checked {} recent comments ({} in timeframe), no matches",
                    inspected, in_window
                );
            }
        }

        match state {
            RunState::Replied(reply) => {
                result.replied = true;
                result.reply = Some(reply);
            }
            RunState::Scanning => info!("No matching comments found this run"),
        }
        result
    }

    async fn evaluate(
        &self,
        source: &str,
        comment: &Comment,
        now: DateTime<Utc>,
        cutoff: DateTime<Utc>,
        store: &dyn ProcessedStore,
    ) -> Evaluation {
        if comment.created_utc < cutoff {
            return Evaluation::OutsideWindow;
        }
        if store.seen(&comment.id) {
            info!("Skipping already processed comment {}", comment.id);
            return Evaluation::AlreadyProcessed;
        }
        if self.is_self_authored(comment) {
            info!("Skipping our own comment {}", comment.id);
            return Evaluation::SelfAuthored;
        }

        let age_minutes = (now - comment.created_utc).num_seconds() as f64 / 60.0;
        debug!(
            "Checking comment by u/{} ({:.1}m old): '{}'",
            comment.display_author(),
            age_minutes,
            comment.preview(PREVIEW_CHARS)
        );

        let Some(hit) = self.matcher.match_text(&comment.body) else {
            return Evaluation::NoMatch;
        };
        info!(
            "MATCH FOUND in comment {} by u/{}: keyword '{}' -> searching for '{}'",
            comment.id,
            comment.display_author(),
            hit.trigger,
            hit.search_term
        );

        let media_url = match self.media.find(hit.search_term).await {
            MediaOutcome::Found(url) => url,
            MediaOutcome::NoResults => {
                info!("Skipping comment {} - no gif found", comment.id);
                return Evaluation::MediaAbsent;
            }
            MediaOutcome::Failed(e) => {
                info!("Skipping comment {} - media search failed", comment.id);
                self.reporter.report_warning(&e);
                return Evaluation::MediaAbsent;
            }
        };

        match self
            .forum
            .post_reply(&comment.id, &compose_reply(&media_url))
            .await
        {
            Ok(()) => {
                info!("REPLIED successfully to comment {}", comment.id);
                Evaluation::Replied(IssuedReply {
                    source: source.to_string(),
                    comment_id: comment.id.clone(),
                    trigger: hit.trigger.to_string(),
                    media_url,
                })
            }
            Err(e) => {
                info!("Failed to reply to comment {}", comment.id);
                self.reporter.report_warning(&e);
                Evaluation::ReplyFailed
            }
        }
    }

    /// Compares stable account ids; falls back to a case-insensitive name
    /// comparison only when the forum gave no id for a live author.
    fn is_self_authored(&self, comment: &Comment) -> bool {
        match (&comment.author_id, &comment.author_name) {
            (Some(id), _) => *id == self.identity.account_id,
            (None, Some(name)) => name.eq_ignore_ascii_case(&self.identity.username),
            (None, None) => false,
        }
    }
}
