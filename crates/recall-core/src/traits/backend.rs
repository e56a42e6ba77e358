// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory backend trait: the capability set shared by all backend variants.

use async_trait::async_trait;

use crate::error::RecallError;
use crate::traits::adapter::PluginAdapter;
use crate::traits::store::ContextStore;
use crate::types::{BackendCapabilities, BackendKind, Role, Session};

/// A swappable memory backend.
///
/// Exactly one backend is selected per process. The context assembler is
/// written against this trait only and consults [`capabilities`] instead of
/// matching on [`kind`].
///
/// [`capabilities`]: MemoryBackend::capabilities
/// [`kind`]: MemoryBackend::kind
#[async_trait]
pub trait MemoryBackend: PluginAdapter {
    /// Which variant this is.
    fn kind(&self) -> BackendKind;

    /// Capability summary for health reports and context assembly.
    fn capabilities(&self) -> BackendCapabilities;

    /// Facts, conversation log and semantic index backing this variant.
    fn store(&self) -> &dyn ContextStore;

    /// Resumes the user's session or creates one.
    ///
    /// `requested` is an identifier echoed by the caller. It is resumed when it
    /// belongs to this user on this backend, adopted when unknown, and ignored
    /// when owned by someone else.
    async fn create_or_resume_session(
        &self,
        user_id: &str,
        requested: Option<&str>,
    ) -> Result<Session, RecallError>;

    /// Records one turn of `session`.
    async fn append_turn(
        &self,
        session: &Session,
        role: Role,
        content: &str,
    ) -> Result<(), RecallError>;

    /// Searches long-term memory. Never fails: any backend error yields an
    /// empty result.
    async fn search_long_term(&self, user_id: &str, query: &str) -> Vec<String>;

    /// Promotes the session's turns into long-term memory. Idempotent.
    async fn commit_session(&self, session: &Session) -> Result<(), RecallError>;

    /// Sessions known for the user, most recently created first.
    async fn sessions_for(&self, user_id: &str) -> Result<Vec<Session>, RecallError>;

    /// Location of durable local state, if any (shown by diagnostics).
    fn storage_location(&self) -> Option<String> {
        None
    }
}
