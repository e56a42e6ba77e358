// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turn orchestration: session, context, completion, persistence, commit.

use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn, Instrument};

use recall_config::RecallConfig;
use recall_core::types::new_session_id;
use recall_core::{
    CompletionProvider, CompletionRequest, ContextType, MemoryBackend, RecallError, Role, Session,
};
use recall_memory::extract_facts;

use crate::fallback::fallback_response;
use crate::fragments::{render_prompt, Fragment};
use crate::state::{TurnMachine, TurnState};

/// Tunables taken from configuration.
#[derive(Debug, Clone)]
pub struct AssemblerSettings {
    pub history_limit: usize,
    pub semantic_top_k: usize,
    pub model: String,
    pub system_prompt: String,
    pub max_tokens: u32,
}

impl AssemblerSettings {
    pub fn from_config(config: &RecallConfig) -> Self {
        Self {
            history_limit: config.context.history_limit,
            semantic_top_k: config.context.semantic_top_k,
            model: config.provider.model.clone(),
            system_prompt: config.agent.system_prompt.clone(),
            max_tokens: config.provider.max_tokens,
        }
    }
}

impl Default for AssemblerSettings {
    fn default() -> Self {
        Self::from_config(&RecallConfig::default())
    }
}

/// An inbound chat message.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub user_id: String,
    pub message: String,
    pub session_id: Option<String>,
}

/// What the caller gets back for a turn. Always carries a reply and a usable
/// session id.
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    pub response: String,
    pub session_id: String,
    pub user_id: String,
    /// Facts known for the user after this turn.
    pub memories_count: usize,
    pub state: TurnState,
    /// Non-fatal failures hit while handling the turn.
    pub notices: Vec<String>,
}

struct Shared {
    backend: Arc<dyn MemoryBackend>,
    provider: Option<Arc<dyn CompletionProvider>>,
    settings: AssemblerSettings,
    session_locks: DashMap<String, Arc<Mutex<()>>>,
    commits: TaskTracker,
}

/// Builds the context for each turn and persists it afterwards.
///
/// Turns of one session run one at a time. Once a turn has a session, the
/// rest of it runs in its own task, so a caller that goes away does not leave
/// a half-persisted turn. The long-term commit runs in the background; use
/// [`ContextAssembler::drain`] to wait for it.
#[derive(Clone)]
pub struct ContextAssembler {
    shared: Arc<Shared>,
}

impl ContextAssembler {
    pub fn new(
        backend: Arc<dyn MemoryBackend>,
        provider: Option<Arc<dyn CompletionProvider>>,
        settings: AssemblerSettings,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                backend,
                provider,
                settings,
                session_locks: DashMap::new(),
                commits: TaskTracker::new(),
            }),
        }
    }

    pub fn backend(&self) -> &Arc<dyn MemoryBackend> {
        &self.shared.backend
    }

    pub fn provider_configured(&self) -> bool {
        self.shared.provider.is_some()
    }

    pub fn settings(&self) -> &AssemblerSettings {
        &self.shared.settings
    }

    /// Handles one turn. Never fails: errors become notices or a fallback reply.
    pub async fn handle_turn(&self, request: TurnRequest) -> TurnOutcome {
        let TurnRequest {
            user_id,
            message,
            session_id,
        } = request;
        let mut machine = TurnMachine::new(&user_id);
        let mut notices = Vec::new();

        let backend = &self.shared.backend;
        let session = match backend
            .create_or_resume_session(&user_id, session_id.as_deref())
            .await
        {
            Ok(session) => session,
            Err(e) => {
                warn!(user_id, error = %e, "session resolution failed, using ephemeral session (non-fatal)");
                notices.push(format!("session could not be stored: {e}"));
                let id = session_id.clone().unwrap_or_else(new_session_id);
                Session::new(id, &user_id, backend.kind())
            }
        };
        advance(&mut machine, TurnState::SessionResolved);

        let guard = self.lock_session(&session.id).await;
        let shared = Arc::clone(&self.shared);
        let turn_session = session.clone();
        let turn_message = message.clone();
        let handle = tokio::spawn(
            async move {
                let outcome = shared
                    .run_turn(turn_session, turn_message, machine, notices)
                    .await;
                drop(guard);
                outcome
            }
            .in_current_span(),
        );

        let outcome = match handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(user_id, session_id = %session.id, error = %e, "turn task failed");
                TurnOutcome {
                    response: fallback_response(&message, &[]),
                    session_id: session.id.clone(),
                    user_id: user_id.clone(),
                    memories_count: 0,
                    state: TurnState::FallbackResponse,
                    notices: vec![format!("turn aborted: {e}")],
                }
            }
        };
        self.release_session_lock(&session.id);
        outcome
    }

    /// Waits for every background commit spawned so far.
    pub async fn drain(&self) {
        let commits = &self.shared.commits;
        commits.close();
        commits.wait().await;
        commits.reopen();
    }

    async fn lock_session(&self, session_id: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .shared
            .session_locks
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Drops the lock entry once nobody else holds or waits on it.
    fn release_session_lock(&self, session_id: &str) {
        self.shared
            .session_locks
            .remove_if(session_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl Shared {
    async fn run_turn(
        self: Arc<Self>,
        session: Session,
        message: String,
        mut machine: TurnMachine,
        mut notices: Vec<String>,
    ) -> TurnOutcome {
        let store = self.backend.store();
        let user_id = session.user_id.as_str();

        // Context
        let facts = store.facts(user_id).await.unwrap_or_else(|e| {
            note(&mut notices, "facts unavailable", &e);
            Vec::new()
        });
        let mut history = store
            .recent_turns(user_id, self.settings.history_limit)
            .await
            .unwrap_or_else(|e| {
                note(&mut notices, "history unavailable", &e);
                Vec::new()
            });
        history.reverse();
        let semantic = store
            .search_context(user_id, &message, self.settings.semantic_top_k)
            .await
            .unwrap_or_else(|e| {
                note(&mut notices, "semantic context unavailable", &e);
                Vec::new()
            });
        let long_term = if self.backend.capabilities().long_term_in_context {
            self.backend.search_long_term(user_id, &message).await
        } else {
            Vec::new()
        };
        let prompt = render_prompt(
            &[
                Fragment::Facts(facts.clone()),
                Fragment::History(history),
                Fragment::Semantic(semantic),
                Fragment::LongTerm(long_term),
            ],
            &message,
        );
        advance(&mut machine, TurnState::ContextBuilt);

        // Completion
        let response = match self.complete(&mut machine, prompt).await {
            Ok(text) => {
                advance(&mut machine, TurnState::ResponseReceived);
                text
            }
            Err(e) => {
                warn!(user_id, session_id = %session.id, error = %e, "completion failed, using fallback response (non-fatal)");
                machine.fall_back();
                fallback_response(&message, &facts)
            }
        };

        // Persistence
        for fact in extract_facts(&message) {
            if let Err(e) = store
                .upsert_fact(user_id, &session.id, &fact.key, &fact.value)
                .await
            {
                note(&mut notices, "fact not saved", &e);
            }
        }
        for (role, text) in [(Role::User, message.as_str()), (Role::Agent, response.as_str())] {
            if let Err(e) = self.backend.append_turn(&session, role, text).await {
                note(&mut notices, "turn not logged", &e);
            }
            let kind = ContextType::for_role(role);
            if let Err(e) = store
                .index_context(user_id, &session.id, kind, text, kind.default_relevance())
                .await
            {
                note(&mut notices, "context not indexed", &e);
            }
        }
        if machine.state() == TurnState::ResponseReceived {
            advance(&mut machine, TurnState::Persisted);
        }

        let memories_count = store
            .facts(user_id)
            .await
            .map(|current| current.len())
            .unwrap_or(facts.len());

        self.spawn_commit(session.clone());

        info!(
            user_id,
            session_id = %session.id,
            state = %machine.state(),
            notices = notices.len(),
            "turn complete"
        );
        TurnOutcome {
            response,
            session_id: session.id,
            user_id: session.user_id,
            memories_count,
            state: machine.state(),
            notices,
        }
    }

    async fn complete(
        &self,
        machine: &mut TurnMachine,
        prompt: String,
    ) -> Result<String, RecallError> {
        let Some(provider) = &self.provider else {
            return Err(RecallError::Provider {
                message: "no completion provider configured".into(),
                source: None,
            });
        };
        advance(machine, TurnState::CompletionRequested);
        let request = CompletionRequest {
            model: self.settings.model.clone(),
            system_prompt: Some(self.settings.system_prompt.clone()),
            prompt,
            max_tokens: self.settings.max_tokens,
        };
        let response = provider.complete(request).await?;
        let text = response.content.trim();
        if text.is_empty() {
            return Err(RecallError::Provider {
                message: "completion returned no text".into(),
                source: None,
            });
        }
        Ok(text.to_string())
    }

    fn spawn_commit(&self, session: Session) {
        let backend = Arc::clone(&self.backend);
        self.commits.spawn(
            async move {
                match backend.commit_session(&session).await {
                    Ok(()) => debug!(session_id = %session.id, "session committed"),
                    Err(e) => {
                        warn!(session_id = %session.id, error = %e, "session commit failed (non-fatal)")
                    }
                }
            }
            .in_current_span(),
        );
    }
}

fn advance(machine: &mut TurnMachine, next: TurnState) {
    if let Err(e) = machine.advance(next) {
        warn!(error = %e, "turn state rejected");
    }
}

fn note(notices: &mut Vec<String>, what: &str, error: &RecallError) {
    warn!(error = %error, "{what} (non-fatal)");
    notices.push(format!("{what}: {error}"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use recall_core::{
        AdapterType, BackendCapabilities, BackendKind, CompletionResponse, ContextStore,
        HealthStatus, PluginAdapter, SessionPolicy,
    };
    use recall_memory::{InMemorySessionBackend, InMemoryStore};
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;
    use tracing_test::traced_test;

    /// Replies with a fixed text and keeps every prompt it saw.
    #[derive(Default)]
    struct RecordingProvider {
        prompts: StdMutex<Vec<String>>,
    }

    #[async_trait]
    impl PluginAdapter for RecordingProvider {
        fn name(&self) -> &str {
            "recording"
        }
        fn version(&self) -> semver::Version {
            semver::Version::new(0, 1, 0)
        }
        fn adapter_type(&self) -> AdapterType {
            AdapterType::Provider
        }
        async fn health_check(&self) -> Result<HealthStatus, RecallError> {
            Ok(HealthStatus::Healthy)
        }
        async fn shutdown(&self) -> Result<(), RecallError> {
            Ok(())
        }
    }

    #[async_trait]
    impl CompletionProvider for RecordingProvider {
        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> Result<CompletionResponse, RecallError> {
            self.prompts.lock().unwrap().push(request.prompt);
            Ok(CompletionResponse {
                content: "  Entendido.  ".into(),
                model: request.model,
                finish_reason: Some("STOP".into()),
            })
        }
    }

    /// Takes its time before answering.
    struct SlowProvider {
        delay: Duration,
    }

    #[async_trait]
    impl PluginAdapter for SlowProvider {
        fn name(&self) -> &str {
            "slow"
        }
        fn version(&self) -> semver::Version {
            semver::Version::new(0, 1, 0)
        }
        fn adapter_type(&self) -> AdapterType {
            AdapterType::Provider
        }
        async fn health_check(&self) -> Result<HealthStatus, RecallError> {
            Ok(HealthStatus::Healthy)
        }
        async fn shutdown(&self) -> Result<(), RecallError> {
            Ok(())
        }
    }

    #[async_trait]
    impl CompletionProvider for SlowProvider {
        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> Result<CompletionResponse, RecallError> {
            tokio::time::sleep(self.delay).await;
            Ok(CompletionResponse {
                content: "Despacio.".into(),
                model: request.model,
                finish_reason: Some("STOP".into()),
            })
        }
    }

    /// Backend whose sessions and turn log always fail.
    struct BrokenBackend {
        store: InMemoryStore,
    }

    #[async_trait]
    impl PluginAdapter for BrokenBackend {
        fn name(&self) -> &str {
            "broken"
        }
        fn version(&self) -> semver::Version {
            semver::Version::new(0, 1, 0)
        }
        fn adapter_type(&self) -> AdapterType {
            AdapterType::Backend
        }
        async fn health_check(&self) -> Result<HealthStatus, RecallError> {
            Ok(HealthStatus::Unhealthy("broken".into()))
        }
        async fn shutdown(&self) -> Result<(), RecallError> {
            Ok(())
        }
    }

    #[async_trait]
    impl MemoryBackend for BrokenBackend {
        fn kind(&self) -> BackendKind {
            BackendKind::CloudSemantic
        }
        fn capabilities(&self) -> BackendCapabilities {
            BackendCapabilities {
                persistent: true,
                semantic_search: true,
                long_term_in_context: true,
                description: "always down".into(),
            }
        }
        fn store(&self) -> &dyn ContextStore {
            &self.store
        }
        async fn create_or_resume_session(
            &self,
            _user_id: &str,
            _requested: Option<&str>,
        ) -> Result<Session, RecallError> {
            Err(RecallError::unavailable("broken", "connection refused"))
        }
        async fn append_turn(
            &self,
            _session: &Session,
            _role: Role,
            _content: &str,
        ) -> Result<(), RecallError> {
            Err(RecallError::unavailable("broken", "connection refused"))
        }
        async fn search_long_term(&self, _user_id: &str, _query: &str) -> Vec<String> {
            Vec::new()
        }
        async fn commit_session(&self, _session: &Session) -> Result<(), RecallError> {
            Err(RecallError::unavailable("broken", "connection refused"))
        }
        async fn sessions_for(&self, _user_id: &str) -> Result<Vec<Session>, RecallError> {
            Ok(Vec::new())
        }
    }

    fn in_memory() -> Arc<InMemorySessionBackend> {
        Arc::new(InMemorySessionBackend::new(
            Arc::new(InMemoryStore::new()),
            SessionPolicy::default(),
            3,
        ))
    }

    fn turn(user_id: &str, message: &str, session_id: Option<&str>) -> TurnRequest {
        TurnRequest {
            user_id: user_id.into(),
            message: message.into(),
            session_id: session_id.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn two_turns_accumulate_facts_and_history() {
        let backend = in_memory();
        let provider = Arc::new(RecordingProvider::default());
        let assembler = ContextAssembler::new(
            backend.clone(),
            Some(provider.clone()),
            AssemblerSettings::default(),
        );

        let first = assembler.handle_turn(turn("demo", "Hola, me llamo Ana", None)).await;
        assert_eq!(first.response, "Entendido.");
        assert_eq!(first.state, TurnState::Persisted);
        assert_eq!(first.memories_count, 1);
        assert!(first.notices.is_empty());

        let second = assembler
            .handle_turn(turn("demo", "Tengo 28 años", Some(&first.session_id)))
            .await;
        assert_eq!(second.session_id, first.session_id);
        assert_eq!(second.memories_count, 2);

        let prompts = provider.prompts.lock().unwrap().clone();
        assert_eq!(prompts[0], "User: Hola, me llamo Ana");
        assert!(prompts[1].contains("- name: Ana\n"));
        assert!(prompts[1].contains("USER: Hola, me llamo Ana\nAGENT: Entendido.\n"));
        assert!(prompts[1].ends_with("User: Tengo 28 años"));

        let turns = backend.store().recent_turns("demo", 10).await.unwrap();
        let contents: Vec<&str> = turns.iter().rev().map(|t| t.content.as_str()).collect();
        assert_eq!(
            contents,
            vec!["Hola, me llamo Ana", "Entendido.", "Tengo 28 años", "Entendido."]
        );
        assert_eq!(backend.store().counts("demo").await.unwrap().semantic_entries, 4);
    }

    #[tokio::test]
    #[traced_test]
    async fn missing_provider_falls_back_and_still_persists() {
        let backend = in_memory();
        let assembler = ContextAssembler::new(backend.clone(), None, AssemblerSettings::default());

        let outcome = assembler.handle_turn(turn("demo", "Hola, me llamo Ana", None)).await;
        assert_eq!(outcome.state, TurnState::FallbackResponse);
        assert_eq!(
            outcome.response,
            "¡Hola! Soy tu asistente con memoria persistente. ¿En qué puedo ayudarte?"
        );
        assert_eq!(outcome.memories_count, 1);
        assert_eq!(backend.store().recent_turns("demo", 10).await.unwrap().len(), 2);
        assert!(logs_contain("completion failed"));
    }

    #[tokio::test]
    async fn commit_runs_in_background() {
        let backend = in_memory();
        let assembler = ContextAssembler::new(backend.clone(), None, AssemblerSettings::default());

        assembler.handle_turn(turn("u1", "I like green tea", None)).await;
        assembler.drain().await;
        assert_eq!(backend.long_term_count("u1"), 2);

        assembler.handle_turn(turn("u1", "and oolong", None)).await;
        assembler.drain().await;
        assert_eq!(backend.long_term_count("u1"), 4);
    }

    #[tokio::test]
    #[traced_test]
    async fn broken_backend_still_answers_with_usable_session() {
        let backend = Arc::new(BrokenBackend {
            store: InMemoryStore::new(),
        });
        let provider = Arc::new(RecordingProvider::default());
        let assembler =
            ContextAssembler::new(backend, Some(provider), AssemblerSettings::default());

        let outcome = assembler
            .handle_turn(turn("u1", "my name is bob", Some("client-session")))
            .await;
        assert_eq!(outcome.session_id, "client-session");
        assert_eq!(outcome.response, "Entendido.");
        assert_eq!(outcome.state, TurnState::Persisted);
        assert_eq!(outcome.memories_count, 1);
        // session + two turn logs
        assert_eq!(outcome.notices.len(), 3);
        assembler.drain().await;
        assert!(logs_contain("session commit failed (non-fatal)"));

        let fresh = assembler.handle_turn(turn("u1", "hi", None)).await;
        assert!(!fresh.session_id.is_empty());
    }

    #[tokio::test]
    async fn session_locks_are_released() {
        let backend = in_memory();
        let assembler = ContextAssembler::new(backend, None, AssemblerSettings::default());
        let outcome = assembler.handle_turn(turn("u1", "hello", None)).await;
        assert!(!assembler.shared.session_locks.contains_key(&outcome.session_id));
    }

    #[tokio::test]
    async fn dropped_caller_still_persists_the_turn() {
        let backend = in_memory();
        let provider = Arc::new(SlowProvider {
            delay: Duration::from_millis(200),
        });
        let assembler =
            ContextAssembler::new(backend.clone(), Some(provider), AssemblerSettings::default());

        let dropped = tokio::time::timeout(
            Duration::from_millis(50),
            assembler.handle_turn(turn("demo", "Me llamo Ana", Some("slow-session"))),
        )
        .await;
        assert!(dropped.is_err());

        tokio::time::timeout(Duration::from_secs(5), async {
            while backend.store().recent_turns("demo", 10).await.unwrap().len() < 2 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("turn should be persisted after the caller went away");

        let turns = backend.store().recent_turns("demo", 10).await.unwrap();
        assert_eq!(turns[0].content, "Despacio.");
        assert_eq!(turns[1].content, "Me llamo Ana");
        let facts = backend.store().facts("demo").await.unwrap();
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].value, "Ana");

        // Waits on the session lock until the abandoned turn has finished.
        let next = assembler
            .handle_turn(turn("demo", "Tengo 28 años", Some("slow-session")))
            .await;
        assert_eq!(next.session_id, "slow-session");
        assert_eq!(next.state, TurnState::Persisted);
        assert_eq!(next.memories_count, 2);

        assembler.drain().await;
        assert_eq!(backend.store().recent_turns("demo", 10).await.unwrap().len(), 4);
        assert_eq!(backend.long_term_count("demo"), 4);
    }
}
