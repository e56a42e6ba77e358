// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` wires a complete Recall stack over a temp SQLite database:
//! the selected memory backend, a mock or failing completion provider, the
//! context assembler and the HTTP router.

use std::sync::Arc;

use recall_config::model::StorageConfig;
use recall_config::RecallConfig;
use recall_context::{AssemblerSettings, ContextAssembler, TurnOutcome, TurnRequest};
use recall_core::{BackendKind, CompletionProvider, MemoryBackend, RecallError};
use recall_gateway::{router, GatewayState};
use recall_memory::build_backend;
use recall_storage::SqliteStorage;

use crate::mock_memory_bank::MockMemoryBank;
use crate::mock_provider::{FailingProvider, MockProvider};

enum ProviderChoice {
    Mock(Vec<String>),
    Failing,
    None,
}

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    backend: BackendKind,
    provider: ProviderChoice,
    long_term_memories: Vec<String>,
    history_limit: Option<usize>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            backend: BackendKind::LocalRelational,
            provider: ProviderChoice::Mock(Vec::new()),
            long_term_memories: Vec::new(),
            history_limit: None,
        }
    }

    pub fn with_backend(mut self, kind: BackendKind) -> Self {
        self.backend = kind;
        self
    }

    pub fn with_mock_responses(mut self, responses: Vec<String>) -> Self {
        self.provider = ProviderChoice::Mock(responses);
        self
    }

    /// Runs without a completion provider, as with no API key configured.
    pub fn without_provider(mut self) -> Self {
        self.provider = ProviderChoice::None;
        self
    }

    pub fn with_failing_provider(mut self) -> Self {
        self.provider = ProviderChoice::Failing;
        self
    }

    /// Memories the mock memory bank returns on retrieval (cloud backend only).
    pub fn with_long_term_memories(mut self, memories: Vec<String>) -> Self {
        self.long_term_memories = memories;
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = Some(limit);
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, RecallError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| RecallError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db");

        let mut config = RecallConfig::default();
        config.backend.kind = self.backend;
        config.storage = StorageConfig {
            database_path: db_path.to_string_lossy().into_owned(),
            wal_mode: true,
        };
        config.agent.system_prompt = "You are a test assistant.".to_string();
        if let Some(limit) = self.history_limit {
            config.context.history_limit = limit;
        }

        let memory_bank = if self.backend == BackendKind::CloudSemantic {
            let bank = MockMemoryBank::with_memories(self.long_term_memories).await;
            config.cloud = bank.cloud_config();
            Some(bank)
        } else {
            None
        };

        let storage = SqliteStorage::new(config.storage.clone());
        storage.initialize().await?;
        let storage = Arc::new(storage);

        let backend = build_backend(&config, Arc::clone(&storage))?;

        let mut mock_provider = None;
        let provider: Option<Arc<dyn CompletionProvider>> = match self.provider {
            ProviderChoice::Mock(responses) => {
                let mock = Arc::new(MockProvider::with_responses(responses));
                mock_provider = Some(Arc::clone(&mock));
                Some(mock)
            }
            ProviderChoice::Failing => Some(Arc::new(FailingProvider)),
            ProviderChoice::None => None,
        };

        let assembler = ContextAssembler::new(
            Arc::clone(&backend),
            provider,
            AssemblerSettings::from_config(&config),
        );

        Ok(TestHarness {
            assembler,
            backend,
            storage,
            mock_provider,
            memory_bank,
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with mock adapters and temp storage.
pub struct TestHarness {
    pub assembler: ContextAssembler,
    pub backend: Arc<dyn MemoryBackend>,
    /// SQLite storage (temp DB, cleaned up on drop).
    pub storage: Arc<SqliteStorage>,
    /// Present unless the harness runs without a provider or with a failing one.
    pub mock_provider: Option<Arc<MockProvider>>,
    /// Present for the cloud-semantic backend.
    pub memory_bank: Option<MockMemoryBank>,
    pub config: RecallConfig,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Runs one turn in a fresh or resumed session for `user_id`.
    pub async fn send(&self, user_id: &str, message: &str) -> TurnOutcome {
        self.send_in(user_id, message, None).await
    }

    /// Runs one turn, echoing `session_id` back as a client would.
    pub async fn send_in(
        &self,
        user_id: &str,
        message: &str,
        session_id: Option<&str>,
    ) -> TurnOutcome {
        self.assembler
            .handle_turn(TurnRequest {
                user_id: user_id.to_string(),
                message: message.to_string(),
                session_id: session_id.map(str::to_string),
            })
            .await
    }

    /// The HTTP application over this harness' assembler.
    pub fn router(&self) -> axum::Router {
        router(GatewayState {
            assembler: self.assembler.clone(),
        })
    }

    /// Waits for background session commits to finish.
    pub async fn settle(&self) {
        self.assembler.drain().await;
    }
}
