// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cloud-semantic backend: sessions and long-term memory in a managed memory
//! bank, with facts, turns and the keyword index mirrored into a local store.

pub mod client;
pub mod types;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, warn};

use recall_core::{
    AdapterType, BackendCapabilities, BackendKind, ContextStore, HealthStatus, KeywordQuery,
    MemoryBackend, PluginAdapter, RecallError, Role, Session, SessionPolicy,
};

pub use client::MemoryBankClient;

use crate::registry::SessionRegistry;

const KIND: BackendKind = BackendKind::CloudSemantic;

/// Appended versus committed turn counts of one session.
#[derive(Debug, Default, Clone, Copy)]
struct CommitProgress {
    appended: u64,
    committed: u64,
}

pub struct CloudSemanticBackend {
    client: MemoryBankClient,
    mirror: Arc<dyn ContextStore>,
    registry: SessionRegistry,
    /// local session id -> remote session resource name
    remote_sessions: DashMap<String, String>,
    progress: DashMap<String, CommitProgress>,
    top_k: usize,
    last_remote_ok: AtomicBool,
}

impl CloudSemanticBackend {
    pub fn new(
        client: MemoryBankClient,
        mirror: Arc<dyn ContextStore>,
        policy: SessionPolicy,
        top_k: usize,
    ) -> Self {
        Self {
            client,
            mirror,
            registry: SessionRegistry::new(KIND, policy),
            remote_sessions: DashMap::new(),
            progress: DashMap::new(),
            top_k,
            last_remote_ok: AtomicBool::new(true),
        }
    }

    /// Remote resource name for a local session, created on first use.
    async fn remote_session(&self, session: &Session) -> Result<String, RecallError> {
        if let Some(name) = self.remote_sessions.get(&session.id) {
            return Ok(name.clone());
        }
        let created = self.client.create_session(&session.user_id).await?;
        debug!(session_id = %session.id, remote = %created, "remote session created");
        Ok(self
            .remote_sessions
            .entry(session.id.clone())
            .or_insert(created)
            .clone())
    }

    fn record<T>(&self, result: &Result<T, RecallError>) {
        self.last_remote_ok.store(result.is_ok(), Ordering::Relaxed);
    }
}

#[async_trait]
impl PluginAdapter for CloudSemanticBackend {
    fn name(&self) -> &str {
        KIND.as_str()
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Backend
    }

    async fn health_check(&self) -> Result<HealthStatus, RecallError> {
        if self.last_remote_ok.load(Ordering::Relaxed) {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Degraded(
                "last memory bank request failed".to_string(),
            ))
        }
    }

    async fn shutdown(&self) -> Result<(), RecallError> {
        debug!(
            remote_sessions = self.remote_sessions.len(),
            "cloud-semantic backend shut down"
        );
        Ok(())
    }
}

#[async_trait]
impl MemoryBackend for CloudSemanticBackend {
    fn kind(&self) -> BackendKind {
        KIND
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            persistent: true,
            semantic_search: true,
            long_term_in_context: true,
            description: format!(
                "managed memory bank at {} with local mirror",
                self.client.engine_url()
            ),
        }
    }

    fn store(&self) -> &dyn ContextStore {
        self.mirror.as_ref()
    }

    async fn create_or_resume_session(
        &self,
        user_id: &str,
        requested: Option<&str>,
    ) -> Result<Session, RecallError> {
        Ok(self.registry.get_or_create(user_id, requested))
    }

    /// Mirrors the turn locally, then appends it to the remote session.
    async fn append_turn(
        &self,
        session: &Session,
        role: Role,
        content: &str,
    ) -> Result<(), RecallError> {
        self.mirror
            .log_turn(&session.user_id, &session.id, role, content)
            .await?;
        self.registry.touch(session);

        let result = match self.remote_session(session).await {
            Ok(name) => self.client.append_event(&name, role, content).await,
            Err(e) => Err(e),
        };
        self.record(&result);
        result?;
        self.progress.entry(session.id.clone()).or_default().appended += 1;
        Ok(())
    }

    async fn search_long_term(&self, user_id: &str, query: &str) -> Vec<String> {
        if KeywordQuery::parse(query).is_empty() {
            return Vec::new();
        }
        let result = self.client.retrieve_memories(user_id, query, self.top_k).await;
        self.record(&result);
        match result {
            Ok(memories) => memories,
            Err(e) => {
                warn!(user_id, error = %e, "memory bank search failed (non-fatal)");
                Vec::new()
            }
        }
    }

    /// Skipped when nothing was appended since the last successful commit.
    async fn commit_session(&self, session: &Session) -> Result<(), RecallError> {
        let snapshot = self
            .progress
            .get(&session.id)
            .map(|p| *p)
            .unwrap_or_default();
        if snapshot.appended == snapshot.committed {
            debug!(session_id = %session.id, "nothing new to commit");
            return Ok(());
        }
        let Some(name) = self.remote_sessions.get(&session.id).map(|n| n.clone()) else {
            return Ok(());
        };

        let result = self.client.generate_memories(&name).await;
        self.record(&result);
        result?;
        if let Some(mut progress) = self.progress.get_mut(&session.id) {
            progress.committed = progress.committed.max(snapshot.appended);
        }
        debug!(session_id = %session.id, turns = snapshot.appended, "memory generation requested");
        Ok(())
    }

    async fn sessions_for(&self, user_id: &str) -> Result<Vec<Session>, RecallError> {
        Ok(self.registry.sessions_for(user_id))
    }
}
