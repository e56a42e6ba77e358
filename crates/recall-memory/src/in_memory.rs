// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory session backend.
//!
//! Everything lives in an [`InMemoryStore`] created by the caller and handed
//! to [`InMemorySessionBackend::new`]. The store is process-wide, populated on
//! first use, and gone when the process exits.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use recall_core::types::now_timestamp;
use recall_core::{
    AdapterType, BackendCapabilities, BackendKind, ContextStore, ContextType, ConversationTurn,
    Fact, HealthStatus, KeywordQuery, MemoryBackend, PluginAdapter, RecallError, Role,
    SemanticContextEntry, Session, SessionPolicy, StoreCounts,
};

use crate::registry::SessionRegistry;

/// A turn promoted into long-term memory by a commit.
#[derive(Debug, Clone)]
struct LongTermEntry {
    seq: i64,
    role: Role,
    content: String,
}

impl LongTermEntry {
    fn score(&self) -> f64 {
        ContextType::for_role(self.role).default_relevance()
    }
}

/// Process-wide transient store shared by every session of the in-memory backend.
#[derive(Default)]
pub struct InMemoryStore {
    next_id: AtomicI64,
    /// user id -> turns, oldest first
    turns: DashMap<String, Vec<ConversationTurn>>,
    /// user id -> facts, oldest write first
    facts: DashMap<String, Vec<Fact>>,
    /// user id -> snippets, oldest first
    semantic: DashMap<String, Vec<SemanticContextEntry>>,
    /// user id -> committed turns
    long_term: DashMap<String, Vec<LongTermEntry>>,
    /// session id -> number of that session's turns already committed
    watermarks: DashMap<String, usize>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Promotes the session's turns logged since the previous commit.
    /// Returns how many entries were added.
    fn commit(&self, session: &Session) -> usize {
        let pending: Vec<LongTermEntry> = {
            let Some(turns) = self.turns.get(&session.user_id) else {
                return 0;
            };
            let mut mark = self.watermarks.entry(session.id.clone()).or_insert(0);
            let session_turns: Vec<&ConversationTurn> =
                turns.iter().filter(|t| t.session_id == session.id).collect();
            let fresh: Vec<LongTermEntry> = session_turns
                .iter()
                .skip(*mark)
                .map(|t| LongTermEntry {
                    seq: t.id,
                    role: t.role,
                    content: t.content.clone(),
                })
                .collect();
            *mark = session_turns.len();
            fresh
        };
        let added = pending.len();
        if added > 0 {
            self.long_term
                .entry(session.user_id.clone())
                .or_default()
                .extend(pending);
        }
        added
    }

    /// Keyword search over committed entries: score, then recency.
    fn search_long_term(&self, user_id: &str, query: &str, limit: usize) -> Vec<String> {
        let query = KeywordQuery::parse(query);
        if query.is_empty() {
            return Vec::new();
        }
        let Some(entries) = self.long_term.get(user_id) else {
            return Vec::new();
        };
        let mut hits: Vec<&LongTermEntry> =
            entries.iter().filter(|e| query.matches(&e.content)).collect();
        hits.sort_by(|a, b| b.score().total_cmp(&a.score()).then(b.seq.cmp(&a.seq)));
        hits.into_iter()
            .take(limit)
            .map(|e| e.content.clone())
            .collect()
    }

    fn long_term_len(&self, user_id: &str) -> usize {
        self.long_term.get(user_id).map(|e| e.len()).unwrap_or(0)
    }
}

#[async_trait]
impl ContextStore for InMemoryStore {
    async fn log_turn(
        &self,
        user_id: &str,
        session_id: &str,
        role: Role,
        content: &str,
    ) -> Result<ConversationTurn, RecallError> {
        let turn = ConversationTurn {
            id: self.next_id(),
            user_id: user_id.to_string(),
            session_id: session_id.to_string(),
            role,
            content: content.to_string(),
            timestamp: now_timestamp(),
        };
        self.turns
            .entry(user_id.to_string())
            .or_default()
            .push(turn.clone());
        Ok(turn)
    }

    async fn recent_turns(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ConversationTurn>, RecallError> {
        Ok(self
            .turns
            .get(user_id)
            .map(|turns| turns.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn upsert_fact(
        &self,
        user_id: &str,
        session_id: &str,
        key: &str,
        value: &str,
    ) -> Result<(), RecallError> {
        let mut facts = self.facts.entry(user_id.to_string()).or_default();
        facts.retain(|f| f.key != key);
        facts.push(Fact {
            user_id: user_id.to_string(),
            session_id: session_id.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            timestamp: now_timestamp(),
        });
        Ok(())
    }

    async fn facts(&self, user_id: &str) -> Result<Vec<Fact>, RecallError> {
        Ok(self
            .facts
            .get(user_id)
            .map(|facts| facts.iter().rev().cloned().collect())
            .unwrap_or_default())
    }

    async fn index_context(
        &self,
        user_id: &str,
        session_id: &str,
        context_type: ContextType,
        content: &str,
        relevance_score: f64,
    ) -> Result<(), RecallError> {
        let entry = SemanticContextEntry {
            id: self.next_id(),
            user_id: user_id.to_string(),
            session_id: session_id.to_string(),
            context_type,
            content: content.to_string(),
            relevance_score,
            timestamp: now_timestamp(),
        };
        self.semantic
            .entry(user_id.to_string())
            .or_default()
            .push(entry);
        Ok(())
    }

    async fn search_context(
        &self,
        user_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SemanticContextEntry>, RecallError> {
        let query = KeywordQuery::parse(query);
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let Some(entries) = self.semantic.get(user_id) else {
            return Ok(Vec::new());
        };
        let mut hits: Vec<SemanticContextEntry> = entries
            .iter()
            .filter(|e| query.matches(&e.content))
            .cloned()
            .collect();
        hits.sort_by(|a, b| {
            b.relevance_score
                .total_cmp(&a.relevance_score)
                .then(b.id.cmp(&a.id))
        });
        hits.truncate(limit);
        Ok(hits)
    }

    async fn counts(&self, user_id: &str) -> Result<StoreCounts, RecallError> {
        Ok(StoreCounts {
            facts: self.facts.get(user_id).map(|f| f.len()).unwrap_or(0),
            turns: self.turns.get(user_id).map(|t| t.len()).unwrap_or(0),
            semantic_entries: self.semantic.get(user_id).map(|s| s.len()).unwrap_or(0),
        })
    }
}

/// Memory backend keeping sessions, turns and long-term memory in process.
pub struct InMemorySessionBackend {
    store: Arc<InMemoryStore>,
    registry: SessionRegistry,
    top_k: usize,
}

impl InMemorySessionBackend {
    pub fn new(store: Arc<InMemoryStore>, policy: SessionPolicy, top_k: usize) -> Self {
        Self {
            store,
            registry: SessionRegistry::new(BackendKind::InMemorySession, policy),
            top_k,
        }
    }

    /// Number of long-term entries committed for the user.
    pub fn long_term_count(&self, user_id: &str) -> usize {
        self.store.long_term_len(user_id)
    }
}

#[async_trait]
impl PluginAdapter for InMemorySessionBackend {
    fn name(&self) -> &str {
        BackendKind::InMemorySession.as_str()
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Backend
    }

    async fn health_check(&self) -> Result<HealthStatus, RecallError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), RecallError> {
        debug!(sessions = self.registry.len(), "in-memory backend discarded");
        Ok(())
    }
}

#[async_trait]
impl MemoryBackend for InMemorySessionBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::InMemorySession
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            persistent: false,
            semantic_search: false,
            long_term_in_context: false,
            description: "process-local sessions and keyword memory, cleared on restart"
                .to_string(),
        }
    }

    fn store(&self) -> &dyn ContextStore {
        self.store.as_ref()
    }

    async fn create_or_resume_session(
        &self,
        user_id: &str,
        requested: Option<&str>,
    ) -> Result<Session, RecallError> {
        Ok(self.registry.get_or_create(user_id, requested))
    }

    async fn append_turn(
        &self,
        session: &Session,
        role: Role,
        content: &str,
    ) -> Result<(), RecallError> {
        self.store
            .log_turn(&session.user_id, &session.id, role, content)
            .await?;
        self.registry.touch(session);
        Ok(())
    }

    async fn search_long_term(&self, user_id: &str, query: &str) -> Vec<String> {
        self.store.search_long_term(user_id, query, self.top_k)
    }

    async fn commit_session(&self, session: &Session) -> Result<(), RecallError> {
        let added = self.store.commit(session);
        debug!(session_id = %session.id, added, "session committed to in-memory long-term store");
        Ok(())
    }

    async fn sessions_for(&self, user_id: &str) -> Result<Vec<Session>, RecallError> {
        Ok(self.registry.sessions_for(user_id))
    }
}
