use gifbot_core::ProcessedStore;
use std::collections::HashSet;
use tracing::debug;


/// Comment ids the bot has replied to during this process.
///
/// Nothing is persisted; a restart begins with an empty set. Swap in another
/// [`ProcessedStore`] to keep the record across runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    processed: HashSet<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProcessedStore for MemoryStore {
    fn seen(&self, comment_id: &str) -> bool {
        self.processed.contains(comment_id)
    }

    fn mark_seen(&mut self, comment_id: &str) {
        if self.processed.insert(comment_id.to_string()) {
            debug!("Marked comment {} as processed", comment_id);
        }
    }

    fn len(&self) -> usize {
        self.processed.len()
    }
}
