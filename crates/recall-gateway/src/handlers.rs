// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway REST API.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use recall_context::TurnRequest;
use recall_core::types::now_timestamp;
use recall_core::{BackendCapabilities, BackendKind, HealthStatus, Role, Session, StoreCounts};

use crate::server::GatewayState;

/// Characters of turn content shown by `/debug`.
const DEBUG_PREVIEW_CHARS: usize = 100;
const DEBUG_RECENT_TURNS: usize = 10;

/// Request body for POST /chat.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub user_id: String,
    pub message: String,
    /// Echo of a previously returned session id.
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Response body for POST /chat.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub session_id: String,
    pub user_id: String,
    pub memories_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notices: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MemoryItem {
    pub key: String,
    pub value: String,
    pub session_id: String,
    pub timestamp: String,
}

/// Response body for GET /memories/{user_id}.
#[derive(Debug, Serialize, Deserialize)]
pub struct MemoriesResponse {
    pub user_id: String,
    pub backend: String,
    pub memories: Vec<MemoryItem>,
    pub count: usize,
}

/// Response body for GET /health.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `healthy` or `degraded`.
    pub status: String,
    pub api_key_configured: bool,
    pub backend: String,
    pub backend_health: String,
    pub model: String,
    pub capabilities: BackendCapabilities,
    pub available_backends: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TurnPreview {
    pub session_id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: String,
}

/// Response body for GET /debug/{user_id}.
#[derive(Debug, Serialize, Deserialize)]
pub struct DebugResponse {
    pub backend: String,
    pub user_id: String,
    pub sessions: Vec<Session>,
    pub counts: StoreCounts,
    pub recent_turns: Vec<TurnPreview>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_size_bytes: Option<u64>,
    pub timestamp: String,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

/// POST /chat
///
/// Runs one turn. Backend and provider failures never fail the request; they
/// show up as a fallback reply or in `notices`.
pub async fn post_chat(
    State(state): State<GatewayState>,
    Json(body): Json<ChatRequest>,
) -> Response {
    if body.user_id.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "user_id must not be empty");
    }
    if body.message.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "message must not be empty");
    }

    let outcome = state
        .assembler
        .handle_turn(TurnRequest {
            user_id: body.user_id,
            message: body.message,
            session_id: body.session_id.filter(|s| !s.trim().is_empty()),
        })
        .await;

    Json(ChatResponse {
        response: outcome.response,
        session_id: outcome.session_id,
        user_id: outcome.user_id,
        memories_count: outcome.memories_count,
        notices: outcome.notices,
    })
    .into_response()
}

/// GET /memories/{user_id}
pub async fn get_memories(
    State(state): State<GatewayState>,
    Path(user_id): Path<String>,
) -> Response {
    let backend = state.assembler.backend();
    match backend.store().facts(&user_id).await {
        Ok(facts) => {
            let memories: Vec<MemoryItem> = facts
                .into_iter()
                .map(|f| MemoryItem {
                    key: f.key,
                    value: f.value,
                    session_id: f.session_id,
                    timestamp: f.timestamp,
                })
                .collect();
            Json(MemoriesResponse {
                user_id,
                backend: backend.kind().to_string(),
                count: memories.len(),
                memories,
            })
            .into_response()
        }
        Err(e) => {
            tracing::warn!(user_id, error = %e, "failed to read memories");
            error_response(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
        }
    }
}

/// GET /health
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    let backend = state.assembler.backend();
    let backend_health = match backend.health_check().await {
        Ok(status) => status,
        Err(e) => HealthStatus::Unhealthy(e.to_string()),
    };
    let api_key_configured = state.assembler.provider_configured();
    let status = if backend_health.is_healthy() && api_key_configured {
        "healthy"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status: status.to_string(),
        api_key_configured,
        backend: backend.kind().to_string(),
        backend_health: backend_health.label().to_string(),
        model: state.assembler.settings().model.clone(),
        capabilities: backend.capabilities(),
        available_backends: BackendKind::ALL.iter().map(|k| k.to_string()).collect(),
    })
}

/// GET /debug/{user_id}
///
/// Unauthenticated dump of everything stored for a user. Local development only.
pub async fn get_debug(
    State(state): State<GatewayState>,
    Path(user_id): Path<String>,
) -> Response {
    let backend = state.assembler.backend();
    let store = backend.store();

    let sessions = backend.sessions_for(&user_id).await;
    let counts = store.counts(&user_id).await;
    let turns = store.recent_turns(&user_id, DEBUG_RECENT_TURNS).await;
    let (sessions, counts, turns) = match (sessions, counts, turns) {
        (Ok(s), Ok(c), Ok(t)) => (s, c, t),
        (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => {
            tracing::warn!(user_id, error = %e, "failed to build debug report");
            return error_response(StatusCode::SERVICE_UNAVAILABLE, e.to_string());
        }
    };

    let database_path = backend.storage_location();
    let database_size_bytes = match &database_path {
        Some(path) => tokio::fs::metadata(path).await.ok().map(|m| m.len()),
        None => None,
    };

    Json(DebugResponse {
        backend: backend.kind().to_string(),
        user_id,
        sessions,
        counts,
        recent_turns: turns
            .into_iter()
            .map(|t| TurnPreview {
                session_id: t.session_id,
                role: t.role,
                content: preview(&t.content),
                timestamp: t.timestamp,
            })
            .collect(),
        database_path,
        database_size_bytes,
        timestamp: now_timestamp(),
    })
    .into_response()
}

/// First [`DEBUG_PREVIEW_CHARS`] characters, with an ellipsis when cut.
fn preview(content: &str) -> String {
    let mut chars = content.chars();
    let head: String = chars.by_ref().take(DEBUG_PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
