// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Local-relational backend: sessions, turns and memory in the SQLite file.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use recall_core::{
    AdapterType, BackendCapabilities, BackendKind, ContextStore, HealthStatus, MemoryBackend,
    PluginAdapter, RecallError, Role, Session, SessionPolicy,
};
use recall_storage::SqliteStorage;

const KIND: BackendKind = BackendKind::LocalRelational;

/// Durable backend. Long-term search is the keyword index of the same database,
/// which the assembler already reads, so it is not added to the context twice.
pub struct LocalRelationalBackend {
    storage: Arc<SqliteStorage>,
    policy: SessionPolicy,
    top_k: usize,
}

impl LocalRelationalBackend {
    /// `storage` must already be initialized.
    pub fn new(storage: Arc<SqliteStorage>, policy: SessionPolicy, top_k: usize) -> Self {
        Self {
            storage,
            policy,
            top_k,
        }
    }
}

#[async_trait]
impl PluginAdapter for LocalRelationalBackend {
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
        match self.storage.health_check().await {
            Ok(status) => Ok(status),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), RecallError> {
        self.storage.shutdown().await
    }
}

#[async_trait]
impl MemoryBackend for LocalRelationalBackend {
    fn kind(&self) -> BackendKind {
        KIND
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            persistent: true,
            semantic_search: false,
            long_term_in_context: false,
            description: "SQLite sessions, facts and keyword index, survives restarts".to_string(),
        }
    }

    fn store(&self) -> &dyn ContextStore {
        self.storage.as_ref()
    }

    async fn create_or_resume_session(
        &self,
        user_id: &str,
        requested: Option<&str>,
    ) -> Result<Session, RecallError> {
        self.storage
            .get_or_create_session(user_id, KIND, requested, self.policy)
            .await
    }

    async fn append_turn(
        &self,
        session: &Session,
        role: Role,
        content: &str,
    ) -> Result<(), RecallError> {
        self.storage
            .log_turn(&session.user_id, &session.id, role, content)
            .await?;
        self.storage.touch_session(&session.id).await
    }

    async fn search_long_term(&self, user_id: &str, query: &str) -> Vec<String> {
        match self.storage.search_context(user_id, query, self.top_k).await {
            Ok(entries) => entries.into_iter().map(|e| e.content).collect(),
            Err(e) => {
                warn!(user_id, error = %e, "long-term search failed (non-fatal)");
                Vec::new()
            }
        }
    }

    async fn commit_session(&self, session: &Session) -> Result<(), RecallError> {
        let changed = self.storage.mark_committed(&session.id).await?;
        debug!(session_id = %session.id, changed, "session commit recorded");
        Ok(())
    }

    async fn sessions_for(&self, user_id: &str) -> Result<Vec<Session>, RecallError> {
        self.storage.sessions_for(user_id, KIND).await
    }

    fn storage_location(&self) -> Option<String> {
        Some(self.storage.database_path().to_string())
    }
}
