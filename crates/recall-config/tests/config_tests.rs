// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Recall configuration system.

use recall_config::diagnostic::ConfigError;
use recall_config::model::RecallConfig;
use recall_config::{load_and_validate, load_and_validate_str, load_config_from_str};
use recall_core::BackendKind;
use serial_test::serial;

/// Valid TOML with all known sections deserializes successfully.
#[test]
fn valid_toml_deserializes_into_recall_config() {
    let toml = r#"
[agent]
name = "memory-demo"
log_level = "debug"
system_prompt = "Be brief."

[backend]
kind = "in-memory-session"

[provider]
api_key = "AIza-test"
model = "gemini-1.5-pro"
max_tokens = 256
timeout_secs = 10

[storage]
database_path = "/tmp/recall-test.db"
wal_mode = false

[session]
idle_timeout_secs = 1800

[context]
history_limit = 4
semantic_top_k = 3
long_term_top_k = 2

[cloud]
project = "demo-project"
location = "europe-west4"

[gateway]
host = "0.0.0.0"
port = 9000
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.agent.name, "memory-demo");
    assert_eq!(config.agent.system_prompt, "Be brief.");
    assert_eq!(config.backend.kind, BackendKind::InMemorySession);
    assert_eq!(config.provider.api_key.as_deref(), Some("AIza-test"));
    assert_eq!(config.provider.model, "gemini-1.5-pro");
    assert_eq!(config.provider.max_tokens, 256);
    assert_eq!(config.storage.database_path, "/tmp/recall-test.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.session.idle_timeout_secs, Some(1800));
    assert_eq!(config.context.history_limit, 4);
    assert_eq!(config.cloud.location.as_deref(), Some("europe-west4"));
    assert_eq!(config.gateway.port, 9000);
}

/// Deployment aliases are accepted for the backend kind.
#[test]
fn backend_aliases_deserialize() {
    for (alias, expected) in [
        ("database", BackendKind::LocalRelational),
        ("adk", BackendKind::InMemorySession),
        ("vertex", BackendKind::CloudSemantic),
    ] {
        let toml = format!("[backend]\nkind = \"{alias}\"\n");
        let config = load_config_from_str(&toml).unwrap();
        assert_eq!(config.backend.kind, expected, "alias {alias}");
    }
}

/// Unknown key in a section produces an UnknownKey diagnostic with a suggestion.
#[test]
fn unknown_key_produces_suggestion() {
    let toml = r#"
[context]
histroy_limit = 3
"#;
    let errors = load_and_validate_str(toml).unwrap_err();
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        ConfigError::UnknownKey {
            key, suggestion, ..
        } => {
            assert_eq!(key, "histroy_limit");
            assert_eq!(suggestion.as_deref(), Some("history_limit"));
        }
        other => panic!("expected UnknownKey, got {other:?}"),
    }
}

/// Unknown top-level sections are rejected.
#[test]
fn unknown_section_is_rejected() {
    let errors = load_and_validate_str("[telemetry]\nenabled = true\n").unwrap_err();
    assert!(matches!(&errors[0], ConfigError::UnknownKey { key, .. } if key == "telemetry"));
}

/// A wrong value type is reported as InvalidType.
#[test]
fn wrong_type_produces_invalid_type() {
    let errors = load_and_validate_str("[gateway]\nport = \"eighty\"\n").unwrap_err();
    assert!(matches!(&errors[0], ConfigError::InvalidType { key, .. } if key.contains("port")));
}

/// An unknown backend name is a configuration error.
#[test]
fn unknown_backend_kind_is_rejected() {
    let errors = load_and_validate_str("[backend]\nkind = \"redis\"\n").unwrap_err();
    assert!(!errors.is_empty());
}

/// Selecting the cloud backend without its identity fails validation at load time.
#[test]
fn cloud_backend_requires_identity() {
    let errors = load_and_validate_str("[backend]\nkind = \"cloud-semantic\"\n").unwrap_err();
    let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
    assert_eq!(messages.len(), 4, "{messages:?}");
    assert!(messages.iter().any(|m| m.contains("cloud.engine_id")));
    assert!(messages.iter().any(|m| m.contains("cloud.api_key")));
}

#[test]
fn cloud_backend_with_identity_is_valid() {
    let toml = r#"
[backend]
kind = "vertex"

[cloud]
project = "demo-project"
location = "us-central1"
engine_id = "4242"
api_key = "vertex-secret"
"#;
    let config = load_and_validate_str(toml).unwrap();
    assert_eq!(config.backend.kind, BackendKind::CloudSemantic);
}

/// Empty input yields the compiled defaults.
#[test]
fn empty_toml_yields_defaults() {
    let config = load_and_validate_str("").unwrap();
    let defaults = RecallConfig::default();
    assert_eq!(config.backend.kind, defaults.backend.kind);
    assert_eq!(config.provider.model, defaults.provider.model);
    assert_eq!(config.context.semantic_top_k, defaults.context.semantic_top_k);
}

/// Deployment variables select the backend and feed the cloud identity.
#[test]
#[serial]
fn deployment_env_vars_override_defaults() {
    // SAFETY: test-only env mutation, serialized with #[serial].
    unsafe {
        std::env::set_var("SELECTED_AGENT", "vertex");
        std::env::set_var("AGENT_MODEL", "gemini-test-model");
        std::env::set_var("GOOGLE_API_KEY_VERTEX", "vertex-env-key");
        std::env::set_var("AGENT_ENGINE_ID", "engine-from-env");
        std::env::set_var("GOOGLE_CLOUD_PROJECT", "project-from-env");
        std::env::set_var("GOOGLE_CLOUD_LOCATION", "us-central1");
    }
    let result = load_and_validate();
    unsafe {
        for key in [
            "SELECTED_AGENT",
            "AGENT_MODEL",
            "GOOGLE_API_KEY_VERTEX",
            "AGENT_ENGINE_ID",
            "GOOGLE_CLOUD_PROJECT",
            "GOOGLE_CLOUD_LOCATION",
        ] {
            std::env::remove_var(key);
        }
    }

    let config = result.expect("env-provided cloud identity should validate");
    assert_eq!(config.backend.kind, BackendKind::CloudSemantic);
    assert_eq!(config.provider.model, "gemini-test-model");
    assert_eq!(config.cloud.api_key.as_deref(), Some("vertex-env-key"));
    assert_eq!(config.cloud.engine_id.as_deref(), Some("engine-from-env"));
    assert_eq!(config.cloud.project.as_deref(), Some("project-from-env"));
}

/// Prefixed variables win over deployment variables.
#[test]
#[serial]
fn prefixed_env_vars_take_precedence() {
    unsafe {
        std::env::set_var("SELECTED_AGENT", "adk");
        std::env::set_var("RECALL_BACKEND_KIND", "database");
        std::env::set_var("RECALL_CONTEXT_HISTORY_LIMIT", "7");
    }
    let result = load_and_validate();
    unsafe {
        std::env::remove_var("SELECTED_AGENT");
        std::env::remove_var("RECALL_BACKEND_KIND");
        std::env::remove_var("RECALL_CONTEXT_HISTORY_LIMIT");
    }

    let config = result.unwrap();
    assert_eq!(config.backend.kind, BackendKind::LocalRelational);
    assert_eq!(config.context.history_limit, 7);
}

/// Prefixed keys with underscores inside the field name keep them.
#[test]
#[serial]
fn prefixed_env_vars_map_multi_word_fields() {
    unsafe {
        std::env::set_var("RECALL_BACKEND_KIND", "adk");
        std::env::set_var("RECALL_CLOUD_ENGINE_ID", "engine-prefixed");
        std::env::set_var("RECALL_CLOUD_PROJECT", "project-prefixed");
        std::env::set_var("RECALL_CLOUD_API_KEY", "cloud-prefixed-key");
        std::env::set_var("RECALL_CLOUD_LOCATION", "europe-west1");
    }
    let result = load_and_validate();
    unsafe {
        std::env::remove_var("RECALL_BACKEND_KIND");
        std::env::remove_var("RECALL_CLOUD_ENGINE_ID");
        std::env::remove_var("RECALL_CLOUD_PROJECT");
        std::env::remove_var("RECALL_CLOUD_API_KEY");
        std::env::remove_var("RECALL_CLOUD_LOCATION");
    }

    let config = result.unwrap();
    assert_eq!(config.backend.kind, BackendKind::CloudSemantic);
    assert_eq!(config.cloud.engine_id.as_deref(), Some("engine-prefixed"));
    assert_eq!(config.cloud.project.as_deref(), Some("project-prefixed"));
    assert_eq!(config.cloud.api_key.as_deref(), Some("cloud-prefixed-key"));
    assert_eq!(config.cloud.location.as_deref(), Some("europe-west1"));
}
