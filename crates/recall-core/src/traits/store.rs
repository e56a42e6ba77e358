// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Context store trait: conversation log, fact table and semantic index.

use async_trait::async_trait;

use crate::error::RecallError;
use crate::types::{ContextType, ConversationTurn, Fact, Role, SemanticContextEntry, StoreCounts};

/// The per-user stores the context assembler reads before a completion and
/// writes after it.
///
/// Implemented by the SQLite storage and by the process-local store. Every
/// operation is keyed by `user_id`; `session_id` is provenance only.
#[async_trait]
pub trait ContextStore: Send + Sync {
    /// Appends one turn to the conversation log.
    async fn log_turn(
        &self,
        user_id: &str,
        session_id: &str,
        role: Role,
        content: &str,
    ) -> Result<ConversationTurn, RecallError>;

    /// Most recent turns for the user, newest first.
    async fn recent_turns(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ConversationTurn>, RecallError>;

    /// Replaces any fact sharing `(user_id, key)`.
    async fn upsert_fact(
        &self,
        user_id: &str,
        session_id: &str,
        key: &str,
        value: &str,
    ) -> Result<(), RecallError>;

    /// One fact per key, most recently written first.
    async fn facts(&self, user_id: &str) -> Result<Vec<Fact>, RecallError>;

    /// Adds a snippet to the semantic context index.
    async fn index_context(
        &self,
        user_id: &str,
        session_id: &str,
        context_type: ContextType,
        content: &str,
        relevance_score: f64,
    ) -> Result<(), RecallError>;

    /// Keyword search over the user's snippets: every whitespace token of
    /// `query` must occur in the content (case-insensitive). Ordered by
    /// relevance then recency, at most `limit` entries.
    async fn search_context(
        &self,
        user_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SemanticContextEntry>, RecallError>;

    /// Record counts for diagnostics.
    async fn counts(&self, user_id: &str) -> Result<StoreCounts, RecallError>;
}
