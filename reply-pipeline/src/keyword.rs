use gifbot_core::TriggerTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeywordMatch<'a> {
    pub trigger: &'a str,
    pub search_term: &'a str,
}

/// Literal, case-insensitive substring matching against an ordered trigger
/// table. The first declared phrase found in the text wins.
#[derive(Debug, Clone)]
pub struct KeywordMatcher {
    table: TriggerTable,
}

impl KeywordMatcher {
    pub fn new(table: TriggerTable) -> Self {
        Self { table }
    }

    pub fn match_text(&self, text: &str) -> Option<KeywordMatch<'_>> {
        if text.is_empty() {
            return None;
        }
        let normalized = text.to_lowercase();

        self.table
            .iter()
            .filter(|rule| !rule.phrase.is_empty())
            .find(|rule| normalized.contains(rule.phrase.as_str()))
            .map(|rule| KeywordMatch {
                trigger: &rule.phrase,
                search_term: &rule.search,
            })
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(rules: &[(&str, &str)]) -> KeywordMatcher {
        KeywordMatcher::new(rules.iter().copied().collect())
    }

    #[test]
    fn test_first_declared_trigger_wins() {
        let matcher = matcher(&[("gif me", "funny"), ("show me a gif", "funny")]);

        let hit = matcher.match_text("please gif me something").unwrap();
        assert_eq!(hit.trigger, "gif me");
        assert_eq!(hit.search_term, "funny");
    }

    #[test]
    fn test_overlap_resolved_by_declaration_order() {
        let matcher = matcher(&[("need a gif", "random"), ("gif", "generic")]);
        assert_eq!(
            matcher.match_text("I need a gif").unwrap().search_term,
            "random"
        );

        let reversed = self::matcher(&[("gif", "generic"), ("need a gif", "random")]);
        assert_eq!(
            reversed.match_text("I need a gif").unwrap().search_term,
            "generic"
        );
    }

    #[test]
    fn test_matching_ignores_case() {
        let matcher = matcher(&[("Cheer Me Up", "cheer up")]);
        let hit = matcher.match_text("Someone CHEER ME UP please").unwrap();
        assert_eq!(hit.trigger, "cheer me up");
        assert_eq!(hit.search_term, "cheer up");
    }

    #[test]
    fn test_no_match() {
        let matcher = matcher(&[("gif me", "funny")]);
        assert!(matcher.match_text("no trigger here").is_none());
    }

    #[test]
    fn test_empty_body_never_matches() {
        let matcher = matcher(&[("gif me", "funny")]);
        assert!(matcher.match_text("").is_none());
    }

    #[test]
    fn test_empty_table_never_matches() {
        let matcher = KeywordMatcher::new(TriggerTable::new());
        assert!(matcher.is_empty());
        assert!(matcher.match_text("gif me anything").is_none());
    }
}
