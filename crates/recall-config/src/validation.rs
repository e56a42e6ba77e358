// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes:
//! non-empty paths, sane context bounds, and the identifiers the
//! cloud-semantic backend needs before the first request arrives.

use recall_core::BackendKind;

use crate::diagnostic::ConfigError;
use crate::model::RecallConfig;

/// Upper bound for every top-K / history setting.
const MAX_CONTEXT_ITEMS: usize = 50;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &RecallConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.agent.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "agent.log_level `{}` is not one of {}",
                config.agent.log_level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.gateway.host.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "gateway.host must not be empty".to_string(),
        });
    }

    if config.gateway.port == 0 {
        errors.push(ConfigError::Validation {
            message: "gateway.port must be non-zero".to_string(),
        });
    }

    for (key, value) in [
        ("context.history_limit", config.context.history_limit),
        ("context.semantic_top_k", config.context.semantic_top_k),
        ("context.long_term_top_k", config.context.long_term_top_k),
    ] {
        if value == 0 || value > MAX_CONTEXT_ITEMS {
            errors.push(ConfigError::Validation {
                message: format!("{key} must be between 1 and {MAX_CONTEXT_ITEMS}, got {value}"),
            });
        }
    }

    if config.session.idle_timeout_secs == Some(0) {
        errors.push(ConfigError::Validation {
            message: "session.idle_timeout_secs must be positive when set".to_string(),
        });
    }

    if config.provider.timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "provider.timeout_secs must be positive".to_string(),
        });
    }

    if config.backend.kind == BackendKind::CloudSemantic {
        let cloud = &config.cloud;
        for (key, value) in [
            ("cloud.project", &cloud.project),
            ("cloud.location", &cloud.location),
            ("cloud.engine_id", &cloud.engine_id),
            ("cloud.api_key", &cloud.api_key),
        ] {
            if value.as_deref().is_none_or(|v| v.trim().is_empty()) {
                errors.push(ConfigError::Validation {
                    message: format!("{key} is required when backend.kind = cloud-semantic"),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
