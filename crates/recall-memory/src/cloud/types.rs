// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request/response bodies of the managed memory bank REST API.

use serde::{Deserialize, Serialize};

// --- Sessions ---

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub user_id: String,
}

/// Long-running operation or session resource; only the name is read.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceName {
    pub name: String,
}

// --- Events ---

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendEventRequest {
    /// `user` or `agent`.
    pub author: String,
    pub invocation_id: String,
    /// RFC 3339.
    pub timestamp: String,
    pub content: EventContent,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventContent {
    /// `user` or `model`.
    pub role: String,
    pub parts: Vec<TextPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextPart {
    pub text: String,
}

// --- Memories ---

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateMemoriesRequest {
    pub vertex_session_source: SessionSource,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSource {
    /// Full resource name of the remote session.
    pub session: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrieveMemoriesRequest {
    pub scope: MemoryScope,
    pub similarity_search_params: SimilaritySearchParams,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemoryScope {
    pub app_name: String,
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilaritySearchParams {
    pub search_query: String,
    pub top_k: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrieveMemoriesResponse {
    #[serde(default)]
    pub retrieved_memories: Vec<RetrievedMemory>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetrievedMemory {
    pub memory: Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Memory {
    #[serde(default)]
    pub fact: String,
}

/// Google API error envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: String,
}
