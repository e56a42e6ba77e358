// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across adapter traits and the Recall crates.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Timestamp layout used for every persisted record (UTC, millisecond precision).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Current UTC time rendered with [`TIMESTAMP_FORMAT`].
pub fn now_timestamp() -> String {
    Utc::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Parses a timestamp produced by [`now_timestamp`] (or any RFC 3339 value).
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

impl HealthStatus {
    /// Short label for JSON reports.
    pub fn label(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded(_) => "degraded",
            HealthStatus::Unhealthy(_) => "unhealthy",
        }
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }
}

/// Identifies the kind of adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Backend,
    Provider,
    Storage,
}

/// The three interchangeable memory backend variants.
///
/// Parsing accepts the canonical kebab-case names as well as the deployment
/// aliases `database`, `adk` and `vertex`.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    /// Tables in a local SQLite file.
    #[default]
    #[strum(to_string = "local-relational", serialize = "database", serialize = "local")]
    #[serde(alias = "database", alias = "local")]
    LocalRelational,
    /// Process-local maps, cleared on restart.
    #[strum(to_string = "in-memory-session", serialize = "adk", serialize = "in-memory")]
    #[serde(alias = "adk", alias = "in-memory")]
    InMemorySession,
    /// A managed memory service reached over the network.
    #[strum(to_string = "cloud-semantic", serialize = "vertex", serialize = "cloud")]
    #[serde(alias = "vertex", alias = "cloud")]
    CloudSemantic,
}

impl BackendKind {
    pub const ALL: [BackendKind; 3] = [
        BackendKind::LocalRelational,
        BackendKind::InMemorySession,
        BackendKind::CloudSemantic,
    ];

    /// Canonical identifier, also used as the session scope.
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::LocalRelational => "local-relational",
            BackendKind::InMemorySession => "in-memory-session",
            BackendKind::CloudSemantic => "cloud-semantic",
        }
    }
}

/// Author of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
}

impl Role {
    /// Convert to string for storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Agent => "agent",
        }
    }

    /// Parse from a stored string. Anything that is not an agent turn is a user turn.
    pub fn from_str_value(s: &str) -> Self {
        match s {
            "agent" | "assistant" | "model" => Role::Agent,
            _ => Role::User,
        }
    }
}

/// Kind of snippet held by the semantic context index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextType {
    UserMessage,
    AgentResponse,
}

impl ContextType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextType::UserMessage => "user_message",
            ContextType::AgentResponse => "agent_response",
        }
    }

    pub fn from_str_value(s: &str) -> Self {
        match s {
            "agent_response" => ContextType::AgentResponse,
            _ => ContextType::UserMessage,
        }
    }

    /// The snippet type recorded for a turn authored by `role`.
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::User => ContextType::UserMessage,
            Role::Agent => ContextType::AgentResponse,
        }
    }

    /// Static relevance prior: user content outranks agent content.
    pub fn default_relevance(&self) -> f64 {
        match self {
            ContextType::UserMessage => 1.0,
            ContextType::AgentResponse => 0.8,
        }
    }
}

/// A conversation session owned by one user on one backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub backend: BackendKind,
    pub created_at: String,
    pub last_activity_at: String,
}

impl Session {
    /// Creates a session stamped with the current time.
    pub fn new(id: String, user_id: &str, backend: BackendKind) -> Self {
        let now = now_timestamp();
        Self {
            id,
            user_id: user_id.to_string(),
            backend,
            created_at: now.clone(),
            last_activity_at: now,
        }
    }

    /// Creates a session with a freshly generated identifier.
    pub fn generate(user_id: &str, backend: BackendKind) -> Self {
        Self::new(new_session_id(), user_id, backend)
    }
}

/// Generates an opaque session identifier (UUID v4).
pub fn new_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Reuse policy for the most recent session of a (user, backend) pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionPolicy {
    /// A session idle for longer than this is not resumed. `None` always resumes.
    pub idle_timeout: Option<Duration>,
}

impl SessionPolicy {
    pub fn with_idle_timeout(idle_timeout: Option<Duration>) -> Self {
        Self { idle_timeout }
    }

    /// Whether `session` may be resumed at `now`.
    pub fn allows_reuse(&self, session: &Session, now: DateTime<Utc>) -> bool {
        let Some(limit) = self.idle_timeout else {
            return true;
        };
        let Some(last) = parse_timestamp(&session.last_activity_at) else {
            return false;
        };
        match (now - last).to_std() {
            Ok(idle) => idle <= limit,
            // Clock skew: last activity in the future counts as fresh.
            Err(_) => true,
        }
    }
}

/// A structured key/value datum extracted from a user message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    pub user_id: String,
    /// Provenance only; facts are scoped by user.
    pub session_id: String,
    pub key: String,
    pub value: String,
    pub timestamp: String,
}

/// One logged user or agent turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Insertion sequence, used to break timestamp ties.
    pub id: i64,
    pub user_id: String,
    pub session_id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: String,
}

/// A text snippet held by the semantic context index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticContextEntry {
    pub id: i64,
    pub user_id: String,
    pub session_id: String,
    pub context_type: ContextType,
    pub content: String,
    pub relevance_score: f64,
    pub timestamp: String,
}

/// Record counts for one user in a context store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreCounts {
    pub facts: usize,
    pub turns: usize,
    pub semantic_entries: usize,
}

/// What a backend can do, reported by `/health` and consulted by the assembler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendCapabilities {
    /// Data survives a process restart.
    pub persistent: bool,
    /// Long-term search is ranked by an external semantic service.
    pub semantic_search: bool,
    /// Long-term search results form their own context fragment.
    pub long_term_in_context: bool,
    pub description: String,
}

/// A request to a completion provider.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub system_prompt: Option<String>,
    /// Assembled context followed by the user's message.
    pub prompt: String,
    pub max_tokens: u32,
}

/// A response from a completion provider.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionResponse {
    pub content: String,
    pub model: String,
    pub finish_reason: Option<String>,
}
