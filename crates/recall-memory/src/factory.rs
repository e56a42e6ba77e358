// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builds the single memory backend selected by configuration.

use std::sync::Arc;

use recall_config::RecallConfig;
use recall_core::{BackendKind, MemoryBackend, RecallError, SessionPolicy};
use recall_storage::SqliteStorage;
use tracing::info;

use crate::cloud::{CloudSemanticBackend, MemoryBankClient};
use crate::in_memory::{InMemorySessionBackend, InMemoryStore};
use crate::local::LocalRelationalBackend;

/// Builds the backend named by `config.backend.kind`.
///
/// `storage` must be initialized. It backs the local-relational variant and is
/// the mirror of the cloud-semantic one. Missing cloud identity is a
/// [`RecallError::Config`].
pub fn build_backend(
    config: &RecallConfig,
    storage: Arc<SqliteStorage>,
) -> Result<Arc<dyn MemoryBackend>, RecallError> {
    let policy = SessionPolicy::with_idle_timeout(config.session.idle_timeout());
    let top_k = config.context.long_term_top_k;

    let backend: Arc<dyn MemoryBackend> = match config.backend.kind {
        BackendKind::LocalRelational => {
            Arc::new(LocalRelationalBackend::new(storage, policy, top_k))
        }
        BackendKind::InMemorySession => Arc::new(InMemorySessionBackend::new(
            Arc::new(InMemoryStore::new()),
            policy,
            top_k,
        )),
        BackendKind::CloudSemantic => {
            let client = MemoryBankClient::new(&config.cloud)?;
            Arc::new(CloudSemanticBackend::new(client, storage, policy, top_k))
        }
    };

    info!(
        backend = backend.kind().as_str(),
        persistent = backend.capabilities().persistent,
        "memory backend selected"
    );
    Ok(backend)
}
