// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Context fragments and prompt rendering.
//!
//! Fragments are rendered in a fixed order: facts, recent conversation,
//! relevant snippets, long-term memory, then the user's message. Empty
//! fragments are left out.

use std::fmt::Write;

use recall_core::{ConversationTurn, Fact, Role, SemanticContextEntry};

/// One labeled block of prior information.
#[derive(Debug, Clone)]
pub enum Fragment {
    Facts(Vec<Fact>),
    /// Oldest first.
    History(Vec<ConversationTurn>),
    Semantic(Vec<SemanticContextEntry>),
    LongTerm(Vec<String>),
}

impl Fragment {
    pub fn title(&self) -> &'static str {
        match self {
            Fragment::Facts(_) => "KNOWN FACTS",
            Fragment::History(_) => "RECENT CONVERSATION",
            Fragment::Semantic(_) => "RELEVANT CONTEXT",
            Fragment::LongTerm(_) => "LONG-TERM MEMORY",
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Fragment::Facts(v) => v.is_empty(),
            Fragment::History(v) => v.is_empty(),
            Fragment::Semantic(v) => v.is_empty(),
            Fragment::LongTerm(v) => v.is_empty(),
        }
    }

    fn render_into(&self, out: &mut String) {
        let title = self.title();
        let _ = writeln!(out, "--- {title} ---");
        match self {
            Fragment::Facts(facts) => {
                for fact in facts {
                    let _ = writeln!(out, "- {}: {}", fact.key, fact.value);
                }
            }
            Fragment::History(turns) => {
                for turn in turns {
                    let speaker = match turn.role {
                        Role::User => "USER",
                        Role::Agent => "AGENT",
                    };
                    let _ = writeln!(out, "{speaker}: {}", turn.content);
                }
            }
            Fragment::Semantic(entries) => {
                for entry in entries {
                    let _ = writeln!(
                        out,
                        "- {} (relevance: {:.2})",
                        entry.content, entry.relevance_score
                    );
                }
            }
            Fragment::LongTerm(memories) => {
                for memory in memories {
                    let _ = writeln!(out, "- {memory}");
                }
            }
        }
        let _ = writeln!(out, "--- END {title} ---");
        out.push('\n');
    }
}

/// Renders the non-empty fragments in the given order followed by the message.
pub fn render_prompt(fragments: &[Fragment], message: &str) -> String {
    let mut out = String::new();
    for fragment in fragments.iter().filter(|f| !f.is_empty()) {
        fragment.render_into(&mut out);
    }
    let _ = write!(out, "User: {message}");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use recall_core::ContextType;

    fn fact(key: &str, value: &str) -> Fact {
        Fact {
            user_id: "u1".into(),
            session_id: "s1".into(),
            key: key.into(),
            value: value.into(),
            timestamp: "2026-01-01T00:00:00.000Z".into(),
        }
    }

    fn turn(id: i64, role: Role, content: &str) -> ConversationTurn {
        ConversationTurn {
            id,
            user_id: "u1".into(),
            session_id: "s1".into(),
            role,
            content: content.into(),
            timestamp: "2026-01-01T00:00:00.000Z".into(),
        }
    }

    #[test]
    fn bare_message_when_nothing_is_known() {
        let prompt = render_prompt(&[Fragment::Facts(vec![]), Fragment::LongTerm(vec![])], "hi");
        assert_eq!(prompt, "User: hi");
    }

    #[test]
    fn fragments_keep_their_order() {
        let fragments = vec![
            Fragment::Facts(vec![fact("name", "Ana")]),
            Fragment::History(vec![turn(1, Role::User, "hola"), turn(2, Role::Agent, "¡hola!")]),
            Fragment::Semantic(vec![SemanticContextEntry {
                id: 1,
                user_id: "u1".into(),
                session_id: "s1".into(),
                context_type: ContextType::AgentResponse,
                content: "¡hola!".into(),
                relevance_score: 0.8,
                timestamp: "2026-01-01T00:00:00.000Z".into(),
            }]),
            Fragment::LongTerm(vec!["Ana likes tea".into()]),
        ];
        let prompt = render_prompt(&fragments, "¿qué sabes?");

        let facts = prompt.find("--- KNOWN FACTS ---").unwrap();
        let history = prompt.find("--- RECENT CONVERSATION ---").unwrap();
        let semantic = prompt.find("--- RELEVANT CONTEXT ---").unwrap();
        let long_term = prompt.find("--- LONG-TERM MEMORY ---").unwrap();
        assert!(facts < history && history < semantic && semantic < long_term);

        assert!(prompt.contains("- name: Ana\n"));
        assert!(prompt.contains("USER: hola\nAGENT: ¡hola!\n"));
        assert!(prompt.contains("- ¡hola! (relevance: 0.80)\n"));
        assert!(prompt.ends_with("--- END LONG-TERM MEMORY ---\n\nUser: ¿qué sabes?"));
    }
}
