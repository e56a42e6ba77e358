// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Recall memory layer.

use thiserror::Error;

/// The primary error type shared by every adapter trait and core operation.
#[derive(Debug, Error)]
pub enum RecallError {
    /// Missing credential, missing backend identifier, or an invalid setting.
    /// The only variant that is allowed to stop the process.
    #[error("configuration error: {0}")]
    Config(String),

    /// Local storage errors (connection, query failure, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A memory backend (local or remote) could not serve the request.
    #[error("backend `{backend}` unavailable: {message}")]
    BackendUnavailable {
        backend: String,
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Completion provider failure (transport, API error, empty answer).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RecallError {
    /// Shorthand for a [`RecallError::BackendUnavailable`] without an underlying source.
    pub fn unavailable(backend: impl Into<String>, message: impl Into<String>) -> Self {
        RecallError::BackendUnavailable {
            backend: backend.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Whether this error must terminate the process.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RecallError::Config(_))
    }
}
