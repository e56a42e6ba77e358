// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `recall serve` command implementation.
//!
//! Opens storage, builds the configured memory backend and completion
//! provider, and runs the HTTP gateway until a shutdown signal arrives.

use std::sync::Arc;

use recall_config::RecallConfig;
use recall_context::{AssemblerSettings, ContextAssembler};
use recall_core::{CompletionProvider, PluginAdapter, RecallError};
use recall_gateway::{start_server, GatewayState, ServerConfig};
use recall_gemini::GeminiProvider;
use recall_memory::build_backend;
use recall_storage::SqliteStorage;
use tracing::{info, warn};

use crate::shutdown;

/// Runs the `recall serve` command.
pub async fn run_serve(config: RecallConfig) -> Result<(), RecallError> {
    init_tracing(&config.agent.log_level);

    info!(agent = %config.agent.name, "starting recall serve");

    let storage = {
        let storage = SqliteStorage::new(config.storage.clone());
        storage.initialize().await?;
        Arc::new(storage)
    };

    let backend = build_backend(&config, Arc::clone(&storage))?;

    let provider: Option<Arc<dyn CompletionProvider>> =
        match GeminiProvider::from_config(&config.provider)? {
            Some(provider) => Some(Arc::new(provider)),
            None => {
                warn!("replies will use fallback responses until a provider API key is set");
                None
            }
        };

    let assembler = ContextAssembler::new(
        Arc::clone(&backend),
        provider,
        AssemblerSettings::from_config(&config),
    );

    let cancel = shutdown::install_signal_handler();
    let server_config = ServerConfig {
        host: config.gateway.host.clone(),
        port: config.gateway.port,
    };
    let served = start_server(
        &server_config,
        GatewayState {
            assembler: assembler.clone(),
        },
        cancel.clone(),
    )
    .await;

    info!("draining background session commits");
    assembler.drain().await;

    if let Err(e) = backend.shutdown().await {
        warn!(error = %e, "backend shutdown failed (non-fatal)");
    }
    if let Err(e) = storage.shutdown().await {
        warn!(error = %e, "storage checkpoint failed (non-fatal)");
    }

    served?;
    info!("recall serve shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("recall={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
