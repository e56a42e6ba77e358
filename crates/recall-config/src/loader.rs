// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./recall.toml` > `~/.config/recall/recall.toml` > `/etc/recall/recall.toml`
//! with environment variable overrides via the `RECALL_` prefix and the
//! well-known deployment variables (`SELECTED_AGENT`, `GOOGLE_API_KEY`, ...).

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::RecallConfig;

/// Deployment variables and the config keys they populate.
pub const DEPLOYMENT_ENV_KEYS: &[(&str, &str)] = &[
    ("SELECTED_AGENT", "backend.kind"),
    ("AGENT_MODEL", "provider.model"),
    ("GOOGLE_API_KEY", "provider.api_key"),
    ("GOOGLE_API_KEY_VERTEX", "cloud.api_key"),
    ("AGENT_ENGINE_ID", "cloud.engine_id"),
    ("GOOGLE_CLOUD_PROJECT", "cloud.project"),
    ("GOOGLE_CLOUD_LOCATION", "cloud.location"),
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/recall/recall.toml` (system-wide)
/// 3. `~/.config/recall/recall.toml` (user XDG config)
/// 4. `./recall.toml` (local directory)
/// 5. Deployment variables (`SELECTED_AGENT`, `AGENT_MODEL`, ...)
/// 6. `RECALL_*` environment variables
pub fn load_config() -> Result<RecallConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<RecallConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RecallConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<RecallConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RecallConfig::default()))
        .merge(Toml::file(path))
        .merge(deployment_env_provider())
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(RecallConfig::default()))
        .merge(Toml::file("/etc/recall/recall.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("recall/recall.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("recall.toml"))
        .merge(deployment_env_provider())
        .merge(env_provider())
}

/// `RECALL_*` variables, mapped with `Env::map()` rather than `Env::split("_")`
/// so that `RECALL_CLOUD_ENGINE_ID` becomes `cloud.engine_id`, not `cloud.engine.id`.
fn env_provider() -> Env {
    Env::prefixed("RECALL_").map(|key| {
        // `key` keeps the env var's case here; figment lowercases after mapping.
        let key_str = key.as_str().to_ascii_lowercase();
        let mapped = key_str
            .replacen("agent_", "agent.", 1)
            .replacen("backend_", "backend.", 1)
            .replacen("provider_", "provider.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("session_", "session.", 1)
            .replacen("context_", "context.", 1)
            .replacen("cloud_", "cloud.", 1)
            .replacen("gateway_", "gateway.", 1);
        mapped.into()
    })
}

/// Unprefixed deployment variables.
fn deployment_env_provider() -> Env {
    let names: Vec<String> = DEPLOYMENT_ENV_KEYS
        .iter()
        .map(|(env, _)| env.to_ascii_lowercase())
        .collect();
    let names: Vec<&str> = names.iter().map(String::as_str).collect();
    Env::raw().only(&names).map(|key| {
        let key_str = key.as_str();
        let mapped = DEPLOYMENT_ENV_KEYS
            .iter()
            .find(|(env, _)| env.eq_ignore_ascii_case(key_str))
            .map(|(_, target)| (*target).to_string())
            .unwrap_or_else(|| key_str.to_string());
        mapped.into()
    })
}
