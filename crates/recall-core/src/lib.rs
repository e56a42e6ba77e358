// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Recall memory layer.
//!
//! Provides the error taxonomy, the domain types (sessions, facts, turns,
//! semantic snippets) and the adapter traits implemented by the storage,
//! memory backend and completion provider crates.

pub mod error;
pub mod keyword;
pub mod traits;
pub mod types;

pub use error::RecallError;
pub use keyword::KeywordQuery;
pub use types::{
    AdapterType, BackendCapabilities, BackendKind, CompletionRequest, CompletionResponse,
    ContextType, ConversationTurn, Fact, HealthStatus, Role, SemanticContextEntry, Session,
    SessionPolicy, StoreCounts,
};

pub use traits::{CompletionProvider, ContextStore, MemoryBackend, PluginAdapter};
