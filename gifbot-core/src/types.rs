use crate::error::CoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A forum comment as observed by the bot. Owned by the forum; never mutated here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub id: String,
    /// Stable account identifier of the author, `None` when the author was deleted.
    pub author_id: Option<String>,
    /// Display name, for logging only.
    pub author_name: Option<String>,
    pub body: String,
    pub created_utc: DateTime<Utc>,
}

impl Comment {
    /// Body shortened to `max_chars` characters on a single line.
    pub fn preview(&self, max_chars: usize) -> String {
        self.body
            .chars()
            .take(max_chars)
            .map(|c| if c == '\n' { ' ' } else { c })
            .collect()
    }

    pub fn display_author(&self) -> &str {
        self.author_name.as_deref().unwrap_or("[deleted]")
    }
}

/// The authenticated bot account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Stable account identifier, compared against `Comment::author_id`.
    pub account_id: String,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerRule {
    pub phrase: String,
    pub search: String,
}

impl TriggerRule {
    pub fn new(phrase: impl Into<String>, search: impl Into<String>) -> Self {
        Self {
            phrase: phrase.into().to_lowercase(),
            search: search.into(),
        }
    }
}

/// Ordered trigger table. Declaration order is match precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerTable {
    rules: Vec<TriggerRule>,
}

impl TriggerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a rule. Returns `false` and leaves the table unchanged when the
    /// phrase is already present.
    pub fn insert(&mut self, phrase: impl Into<String>, search: impl Into<String>) -> bool {
        let rule = TriggerRule::new(phrase, search);
        if self.rules.iter().any(|r| r.phrase == rule.phrase) {
            return false;
        }
        self.rules.push(rule);
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = &TriggerRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl<P: Into<String>, S: Into<String>> FromIterator<(P, S)> for TriggerTable {
    fn from_iter<I: IntoIterator<Item = (P, S)>>(iter: I) -> Self {
        let mut table = TriggerTable::new();
        for (phrase, search) in iter {
            table.insert(phrase, search);
        }
        table
    }
}

/// Result of one media search. Failures are values, not errors, so a search
/// can never abort a run.
#[derive(Debug)]
pub enum MediaOutcome {
    Found(String),
    NoResults,
    Failed(CoreError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedReply {
    pub source: String,
    pub comment_id: String,
    pub trigger: String,
    pub media_url: String,
}

/// Outcome of a single pipeline invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunResult {
    pub replied: bool,
    pub reply: Option<IssuedReply>,
    /// Comments read from the feeds, including ones outside the window.
    pub comments_seen: usize,
    /// Comments whose age was within the window.
    pub comments_in_window: usize,
    /// Comments that reached keyword matching.
    pub comments_inspected: usize,
    pub sources_scanned: usize,
    pub sources_failed: usize,
}
