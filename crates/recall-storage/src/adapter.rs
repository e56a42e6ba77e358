// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the context store and session registry.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use recall_config::model::StorageConfig;
use recall_core::{
    AdapterType, BackendKind, ContextStore, ContextType, ConversationTurn, Fact, HealthStatus,
    PluginAdapter, RecallError, Role, SemanticContextEntry, Session, SessionPolicy, StoreCounts,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed storage adapter.
///
/// Wraps a [`Database`] handle and delegates to the typed query modules.
/// The database is opened by [`SqliteStorage::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    ///
    /// The database connection is not opened until [`initialize`](Self::initialize) is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Opens the database and applies migrations. Fails if called twice.
    pub async fn initialize(&self) -> Result<(), RecallError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| RecallError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    /// Checkpoints the WAL. The connection stays usable.
    pub async fn close(&self) -> Result<(), RecallError> {
        self.db()?.close().await
    }

    /// Returns a reference to the underlying Database, or an error if not initialized.
    pub fn db(&self) -> Result<&Database, RecallError> {
        self.db.get().ok_or_else(|| RecallError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    pub fn database_path(&self) -> &str {
        &self.config.database_path
    }

    // --- Session registry ---

    pub async fn get_or_create_session(
        &self,
        user_id: &str,
        backend: BackendKind,
        requested: Option<&str>,
        policy: SessionPolicy,
    ) -> Result<Session, RecallError> {
        queries::sessions::get_or_create(self.db()?, user_id, backend, requested, policy).await
    }

    pub async fn sessions_for(
        &self,
        user_id: &str,
        backend: BackendKind,
    ) -> Result<Vec<Session>, RecallError> {
        queries::sessions::sessions_for_user(self.db()?, user_id, backend).await
    }

    pub async fn touch_session(&self, session_id: &str) -> Result<(), RecallError> {
        queries::sessions::touch_session(self.db()?, session_id).await
    }

    /// See [`queries::sessions::mark_committed`].
    pub async fn mark_committed(&self, session_id: &str) -> Result<bool, RecallError> {
        queries::sessions::mark_committed(self.db()?, session_id).await
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, RecallError> {
        self.db()?.ping().await?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), RecallError> {
        if let Some(db) = self.db.get() {
            db.close().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl ContextStore for SqliteStorage {
    async fn log_turn(
        &self,
        user_id: &str,
        session_id: &str,
        role: Role,
        content: &str,
    ) -> Result<ConversationTurn, RecallError> {
        queries::conversation::log_turn(self.db()?, user_id, session_id, role, content).await
    }

    async fn recent_turns(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ConversationTurn>, RecallError> {
        queries::conversation::recent_turns(self.db()?, user_id, limit).await
    }

    async fn upsert_fact(
        &self,
        user_id: &str,
        session_id: &str,
        key: &str,
        value: &str,
    ) -> Result<(), RecallError> {
        queries::facts::upsert_fact(self.db()?, user_id, session_id, key, value).await
    }

    async fn facts(&self, user_id: &str) -> Result<Vec<Fact>, RecallError> {
        queries::facts::facts_for_user(self.db()?, user_id).await
    }

    async fn index_context(
        &self,
        user_id: &str,
        session_id: &str,
        context_type: ContextType,
        content: &str,
        relevance_score: f64,
    ) -> Result<(), RecallError> {
        queries::semantic::index_context(
            self.db()?,
            user_id,
            session_id,
            context_type,
            content,
            relevance_score,
        )
        .await
    }

    async fn search_context(
        &self,
        user_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SemanticContextEntry>, RecallError> {
        queries::semantic::search_context(self.db()?, user_id, query, limit).await
    }

    async fn counts(&self, user_id: &str) -> Result<StoreCounts, RecallError> {
        let db = self.db()?;
        Ok(StoreCounts {
            facts: queries::facts::count_facts(db, user_id).await?,
            turns: queries::conversation::count_turns(db, user_id).await?,
            semantic_entries: queries::semantic::count_entries(db, user_id).await?,
        })
    }
}
