// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pattern-based fact extraction from user messages.
//!
//! Pure string matching, no model calls. Recognises English and Spanish
//! phrasings and always emits canonical keys (`name`, `age`,
//! `preference_<trigger>`). Paraphrases are simply missed.

use std::sync::LazyLock;

use regex::Regex;

/// A key/value pair pulled out of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFact {
    pub key: String,
    pub value: String,
}

impl ExtractedFact {
    fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

static NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:my name is|me llamo|mi nombre es)\s+(\p{L}+)").unwrap()
});

static AGE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bi(?:\s+am|'m|’m)\s+(\d{1,3})\s+years?\s+old\b|\btengo\s+(\d{1,3})\s+años\b")
        .unwrap()
});

/// Preference triggers in match order.
const PREFERENCE_TRIGGERS: &[&str] = &[
    "i like",
    "i prefer",
    "favorite",
    "i enjoy",
    "me gusta",
    "prefiero",
    "favorito",
    "disfruto",
];

static PREFERENCE_PATTERNS: LazyLock<Vec<(String, Regex)>> = LazyLock::new(|| {
    PREFERENCE_TRIGGERS
        .iter()
        .map(|trigger| {
            let key = format!("preference_{}", trigger.replace(' ', "_"));
            let pattern = format!(r"(?i)\b{}\b([^.!?\n]*)", regex::escape(trigger));
            (key, Regex::new(&pattern).unwrap())
        })
        .collect()
});

/// Characters stripped from the end of a preference value.
const TRAILING_PUNCTUATION: &[char] = &[',', ';', ':', '.', '!', '?', '¡', '¿', '"', '\''];

/// Extracts every recognised fact from `message`.
///
/// Each rule fires at most once (first occurrence). Output order is name,
/// age, then preferences in trigger order.
pub fn extract_facts(message: &str) -> Vec<ExtractedFact> {
    let mut facts = Vec::new();

    if let Some(name) = NAME_PATTERN.captures(message).and_then(|c| c.get(1)) {
        facts.push(ExtractedFact::new("name", capitalize(name.as_str())));
    }

    if let Some(age) = AGE_PATTERN
        .captures(message)
        .and_then(|c| c.get(1).or_else(|| c.get(2)))
    {
        facts.push(ExtractedFact::new("age", age.as_str()));
    }

    for (key, pattern) in PREFERENCE_PATTERNS.iter() {
        let Some(rest) = pattern.captures(message).and_then(|c| c.get(1)) else {
            continue;
        };
        let value = rest
            .as_str()
            .trim()
            .trim_end_matches(TRAILING_PUNCTUATION)
            .trim();
        if !value.is_empty() {
            facts.push(ExtractedFact::new(key.as_str(), value));
        }
    }

    facts
}

/// First character uppercased, the rest lowercased.
fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
