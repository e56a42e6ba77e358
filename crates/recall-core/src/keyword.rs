// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keyword AND-matching shared by the semantic index and in-process long-term search.

/// A parsed keyword query: the lowercased whitespace tokens of the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordQuery {
    tokens: Vec<String>,
}

impl KeywordQuery {
    pub fn parse(query: &str) -> Self {
        Self {
            tokens: query.split_whitespace().map(str::to_lowercase).collect(),
        }
    }

    /// A query without tokens matches nothing.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// True when every token occurs as a substring of `content`, ignoring case.
    pub fn matches(&self, content: &str) -> bool {
        if self.tokens.is_empty() {
            return false;
        }
        let haystack = content.to_lowercase();
        self.tokens.iter().all(|t| haystack.contains(t.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_tokens_must_match() {
        let q = KeywordQuery::parse("pizza  Tuesday");
        assert!(q.matches("We had PIZZA on tuesday"));
        assert!(!q.matches("We had pizza on monday"));
    }

    #[test]
    fn tokens_are_substrings() {
        let q = KeywordQuery::parse("llam");
        assert!(q.matches("Hola, me llamo Ana"));
    }

    #[test]
    fn unicode_case_folding() {
        let q = KeywordQuery::parse("AÑOS");
        assert!(q.matches("tengo 28 años"));
    }

    #[test]
    fn blank_query_matches_nothing() {
        let q = KeywordQuery::parse("   \t ");
        assert!(q.is_empty());
        assert!(!q.matches("anything"));
    }
}
