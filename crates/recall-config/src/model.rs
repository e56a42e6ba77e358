// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Recall memory layer.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use recall_core::BackendKind;
use serde::{Deserialize, Serialize};

/// Top-level Recall configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RecallConfig {
    /// Agent identity and logging.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Which memory backend variant this process runs.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Completion provider (Gemini) settings.
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Local SQLite storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Session reuse policy.
    #[serde(default)]
    pub session: SessionConfig,

    /// Context assembly bounds.
    #[serde(default)]
    pub context: ContextConfig,

    /// Cloud-semantic memory service identity.
    #[serde(default)]
    pub cloud: CloudConfig,

    /// HTTP gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,
}

impl RecallConfig {
    /// A copy with every credential replaced by a mask, for display.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.provider.api_key = copy.provider.api_key.as_deref().map(mask_secret);
        copy.cloud.api_key = copy.cloud.api_key.as_deref().map(mask_secret);
        copy
    }
}

/// Masks a secret, keeping at most four characters at each end.
///
/// Values shorter than 10 characters are fully masked.
pub fn mask_secret(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() < 10 {
        return "****".to_string();
    }
    let prefix: String = chars[..4].iter().collect();
    let suffix: String = chars[chars.len() - 4..].iter().collect();
    format!("{prefix}...{suffix}")
}

/// Agent identity and behavior configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the agent.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// System prompt sent with every completion request.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
            system_prompt: default_system_prompt(),
        }
    }
}

fn default_agent_name() -> String {
    "recall".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_system_prompt() -> String {
    "You are a helpful assistant with persistent memory. Use the known facts and the \
     earlier conversation to give personal, relevant answers, and reply in the \
     language the user writes in."
        .to_string()
}

/// Memory backend selection. Fixed for the process lifetime.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    /// `local-relational` (alias `database`), `in-memory-session` (alias `adk`)
    /// or `cloud-semantic` (alias `vertex`).
    #[serde(default)]
    pub kind: BackendKind,
}

/// Completion provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// API key. `None` disables completions; every turn gets a fallback reply.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum output tokens per completion.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// API base URL.
    #[serde(default = "default_provider_base_url")]
    pub base_url: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            base_url: default_provider_base_url(),
        }
    }
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_provider_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL journal mode.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("recall").join("recall.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("recall.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Session reuse configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Start a new session when the most recent one has been idle this long.
    /// Unset means the most recent session is always resumed.
    #[serde(default)]
    pub idle_timeout_secs: Option<u64>,
}

impl SessionConfig {
    pub fn idle_timeout(&self) -> Option<std::time::Duration> {
        self.idle_timeout_secs.map(std::time::Duration::from_secs)
    }
}

/// Bounds for the assembled context block.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ContextConfig {
    /// Number of recent turns included.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Number of semantic index matches included.
    #[serde(default = "default_semantic_top_k")]
    pub semantic_top_k: usize,

    /// Number of long-term memory results requested from the backend.
    #[serde(default = "default_long_term_top_k")]
    pub long_term_top_k: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
            semantic_top_k: default_semantic_top_k(),
            long_term_top_k: default_long_term_top_k(),
        }
    }
}

fn default_history_limit() -> usize {
    5
}

fn default_semantic_top_k() -> usize {
    5
}

fn default_long_term_top_k() -> usize {
    3
}

/// Identity of the managed memory service used by the cloud-semantic backend.
///
/// Every field is required when that backend is selected.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CloudConfig {
    #[serde(default)]
    pub project: Option<String>,

    #[serde(default)]
    pub location: Option<String>,

    /// Agent engine (reasoning engine) identifier.
    #[serde(default)]
    pub engine_id: Option<String>,

    /// Credential distinct from `provider.api_key`.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Overrides the regional endpoint derived from `location`.
    #[serde(default)]
    pub base_url: Option<String>,
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = RecallConfig::default();
        assert_eq!(config.agent.name, "recall");
        assert_eq!(config.backend.kind, BackendKind::LocalRelational);
        assert_eq!(config.provider.model, "gemini-2.0-flash");
        assert!(config.provider.api_key.is_none());
        assert_eq!(config.context.history_limit, 5);
        assert_eq!(config.context.semantic_top_k, 5);
        assert_eq!(config.context.long_term_top_k, 3);
        assert!(config.session.idle_timeout().is_none());
        assert_eq!(config.gateway.port, 8000);
        assert!(config.storage.database_path.ends_with("recall.db"));
    }

    #[test]
    fn redacted_masks_both_credentials() {
        let mut config = RecallConfig::default();
        config.provider.api_key = Some("AIzaSyD-provider-key-1234".to_string());
        config.cloud.api_key = Some("short".to_string());
        let redacted = config.redacted();
        assert_eq!(redacted.provider.api_key.as_deref(), Some("AIza...1234"));
        assert_eq!(redacted.cloud.api_key.as_deref(), Some("****"));
        assert_eq!(config.cloud.api_key.as_deref(), Some("short"));
    }

    #[test]
    fn idle_timeout_converts_to_duration() {
        let session = SessionConfig {
            idle_timeout_secs: Some(90),
        };
        assert_eq!(
            session.idle_timeout(),
            Some(std::time::Duration::from_secs(90))
        );
    }
}
