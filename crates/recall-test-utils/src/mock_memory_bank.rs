// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process stand-in for the cloud memory bank.
//!
//! [`MockMemoryBank`] runs a wiremock server that accepts session creation,
//! event appends, memory generation and retrieval for a single reasoning
//! engine. Retrieval returns a fixed list of memories.

use std::sync::atomic::{AtomicU64, Ordering};

use recall_config::model::CloudConfig;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

const PROJECT: &str = "test-project";
const LOCATION: &str = "us-central1";
const ENGINE: &str = "test-engine";

/// Hands out `.../sessions/{n}` names with increasing `n`.
struct SessionNames {
    next: AtomicU64,
}

impl Respond for SessionNames {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let id = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": format!(
                "projects/{PROJECT}/locations/{LOCATION}/reasoningEngines/{ENGINE}/sessions/{id}/operations/op-{id}"
            )
        }))
    }
}

pub struct MockMemoryBank {
    server: MockServer,
}

impl MockMemoryBank {
    /// Starts a memory bank with nothing to retrieve.
    pub async fn start() -> Self {
        Self::with_memories(Vec::new()).await
    }

    /// Starts a memory bank whose retrieval always returns `memories`.
    pub async fn with_memories(memories: Vec<String>) -> Self {
        let server = MockServer::start().await;
        let engine = engine_path();

        Mock::given(method("POST"))
            .and(path(format!("{engine}/sessions")))
            .respond_with(SessionNames {
                next: AtomicU64::new(0),
            })
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path_regex(r"/sessions/[^/]+:appendEvent$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path(format!("{engine}/memories:generate")))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": format!("{}/operations/generate-1", engine.trim_start_matches('/'))
            })))
            .mount(&server)
            .await;

        let retrieved: Vec<serde_json::Value> = memories
            .into_iter()
            .map(|fact| serde_json::json!({"memory": {"fact": fact}}))
            .collect();
        Mock::given(method("POST"))
            .and(path(format!("{engine}/memories:retrieve")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"retrievedMemories": retrieved})),
            )
            .mount(&server)
            .await;

        Self { server }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// Cloud settings pointing at this server.
    pub fn cloud_config(&self) -> CloudConfig {
        CloudConfig {
            project: Some(PROJECT.to_string()),
            location: Some(LOCATION.to_string()),
            engine_id: Some(ENGINE.to_string()),
            api_key: Some("test-cloud-key".to_string()),
            base_url: Some(self.uri()),
        }
    }

    /// Number of received requests whose path ends with `suffix`.
    pub async fn requests_ending_with(&self, suffix: &str) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path().ends_with(suffix))
            .count()
    }

    pub async fn sessions_created(&self) -> usize {
        self.requests_ending_with("/sessions").await
    }

    pub async fn events_appended(&self) -> usize {
        self.requests_ending_with(":appendEvent").await
    }

    pub async fn generations(&self) -> usize {
        self.requests_ending_with("/memories:generate").await
    }

    pub async fn retrievals(&self) -> usize {
        self.requests_ending_with("/memories:retrieve").await
    }
}

fn engine_path() -> String {
    format!("/v1beta1/projects/{PROJECT}/locations/{LOCATION}/reasoningEngines/{ENGINE}")
}
