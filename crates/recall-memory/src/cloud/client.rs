// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the managed memory bank attached to an agent engine.
//!
//! Handles authentication, URL construction and a single retry on transient
//! errors. Every failure surfaces as [`RecallError::BackendUnavailable`].

use std::time::Duration;

use recall_config::model::CloudConfig;
use recall_core::{RecallError, Role};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use super::types::{
    ApiErrorResponse, AppendEventRequest, CreateSessionRequest, EventContent,
    GenerateMemoriesRequest, MemoryScope, ResourceName, RetrieveMemoriesRequest,
    RetrieveMemoriesResponse, SessionSource, SimilaritySearchParams, TextPart,
};

const BACKEND: &str = "cloud-semantic";

/// Client for one agent engine's sessions and memories.
#[derive(Debug, Clone)]
pub struct MemoryBankClient {
    client: reqwest::Client,
    engine_url: String,
    engine_id: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl MemoryBankClient {
    /// Builds a client from the cloud section. Every identity field and the
    /// credential must be present.
    pub fn new(config: &CloudConfig) -> Result<Self, RecallError> {
        let required = |value: &Option<String>, key: &str| {
            value
                .as_deref()
                .filter(|v| !v.trim().is_empty())
                .map(str::to_string)
                .ok_or_else(|| RecallError::Config(format!("cloud.{key} is required")))
        };
        let project = required(&config.project, "project")?;
        let location = required(&config.location, "location")?;
        let engine_id = required(&config.engine_id, "engine_id")?;
        let api_key = required(&config.api_key, "api_key")?;

        let mut headers = HeaderMap::new();
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(&api_key).map_err(|e| {
                RecallError::Config(format!("invalid cloud API key header value: {e}"))
            })?,
        );
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| RecallError::BackendUnavailable {
                backend: BACKEND.into(),
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        let host = config
            .base_url
            .clone()
            .unwrap_or_else(|| format!("https://{location}-aiplatform.googleapis.com"));
        let engine_url = format!(
            "{}/v1beta1/projects/{project}/locations/{location}/reasoningEngines/{engine_id}",
            host.trim_end_matches('/')
        );

        Ok(Self {
            client,
            engine_url,
            engine_id,
            max_retries: 1,
            retry_delay: Duration::from_secs(1),
        })
    }

    /// Shortens the retry delay (tests).
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn engine_url(&self) -> &str {
        &self.engine_url
    }

    /// Creates a remote session and returns its full resource name.
    pub async fn create_session(&self, user_id: &str) -> Result<String, RecallError> {
        let body = CreateSessionRequest {
            user_id: user_id.to_string(),
        };
        let created: ResourceName = self
            .post(&format!("{}/sessions", self.engine_url), &body)
            .await?;
        let id = parse_session_id(&created.name).ok_or_else(|| {
            RecallError::unavailable(BACKEND, format!("unexpected session name `{}`", created.name))
        })?;
        Ok(format!("{}/sessions/{id}", self.engine_url))
    }

    /// Appends one turn to a remote session.
    pub async fn append_event(
        &self,
        session_name: &str,
        role: Role,
        text: &str,
    ) -> Result<(), RecallError> {
        let content_role = match role {
            Role::User => "user",
            Role::Agent => "model",
        };
        let body = AppendEventRequest {
            author: role.as_str().to_string(),
            invocation_id: uuid::Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            content: EventContent {
                role: content_role.to_string(),
                parts: vec![TextPart {
                    text: text.to_string(),
                }],
            },
        };
        let _: serde_json::Value = self
            .post(&format!("{session_name}:appendEvent"), &body)
            .await?;
        Ok(())
    }

    /// Asks the service to distil memories from a remote session.
    pub async fn generate_memories(&self, session_name: &str) -> Result<(), RecallError> {
        let body = GenerateMemoriesRequest {
            vertex_session_source: SessionSource {
                session: session_name.to_string(),
            },
        };
        let _: serde_json::Value = self
            .post(&format!("{}/memories:generate", self.engine_url), &body)
            .await?;
        Ok(())
    }

    /// Similarity search over the user's memories.
    pub async fn retrieve_memories(
        &self,
        user_id: &str,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<String>, RecallError> {
        let body = RetrieveMemoriesRequest {
            scope: MemoryScope {
                app_name: self.engine_id.clone(),
                user_id: user_id.to_string(),
            },
            similarity_search_params: SimilaritySearchParams {
                search_query: query.to_string(),
                top_k,
            },
        };
        let response: RetrieveMemoriesResponse = self
            .post(&format!("{}/memories:retrieve", self.engine_url), &body)
            .await?;
        Ok(response
            .retrieved_memories
            .into_iter()
            .map(|m| m.memory.fact)
            .filter(|fact| !fact.is_empty())
            .take(top_k)
            .collect())
    }

    /// Retries once on 429, 500 and 503.
    async fn post<B: Serialize, R: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<R, RecallError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, url, "retrying memory bank request after transient error");
                tokio::time::sleep(self.retry_delay).await;
            }

            let response = self
                .client
                .post(url)
                .json(body)
                .send()
                .await
                .map_err(|e| RecallError::BackendUnavailable {
                    backend: BACKEND.into(),
                    message: format!("HTTP request failed: {e}"),
                    source: Some(Box::new(e)),
                })?;

            let status = response.status();
            debug!(status = %status, attempt, url, "memory bank response received");

            if status.is_success() {
                let text = response.text().await.map_err(|e| RecallError::BackendUnavailable {
                    backend: BACKEND.into(),
                    message: format!("failed to read response body: {e}"),
                    source: Some(Box::new(e)),
                })?;
                let text = if text.trim().is_empty() { "{}" } else { text.as_str() };
                return serde_json::from_str(text).map_err(|e| RecallError::BackendUnavailable {
                    backend: BACKEND.into(),
                    message: format!("failed to parse memory bank response: {e}"),
                    source: Some(Box::new(e)),
                });
            }

            let text = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ApiErrorResponse>(&text) {
                Ok(api_err) => format!(
                    "memory bank error {} ({}): {}",
                    api_err.error.code, api_err.error.status, api_err.error.message
                ),
                Err(_) => format!("memory bank returned {status}: {text}"),
            };

            if is_transient_error(status) && attempt < self.max_retries {
                warn!(status = %status, "transient memory bank error, will retry");
                last_error = Some(RecallError::unavailable(BACKEND, message));
                continue;
            }
            return Err(RecallError::unavailable(BACKEND, message));
        }

        Err(last_error
            .unwrap_or_else(|| RecallError::unavailable(BACKEND, "request failed after retries")))
    }
}

/// Extracts the session id from `.../sessions/{id}` or
/// `.../sessions/{id}/operations/{op}`.
pub fn parse_session_id(name: &str) -> Option<&str> {
    let (_, rest) = name.split_once("/sessions/")?;
    let id = rest.split('/').next()?;
    (!id.is_empty()).then_some(id)
}

fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 503)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ENGINE_PATH: &str =
        "/v1beta1/projects/proj/locations/us-central1/reasoningEngines/engine-1";

    fn cloud_config(base_url: &str) -> CloudConfig {
        CloudConfig {
            project: Some("proj".into()),
            location: Some("us-central1".into()),
            engine_id: Some("engine-1".into()),
            api_key: Some("cloud-key".into()),
            base_url: Some(base_url.to_string()),
        }
    }

    fn client(base_url: &str) -> MemoryBankClient {
        MemoryBankClient::new(&cloud_config(base_url))
            .unwrap()
            .with_retry_delay(Duration::from_millis(10))
    }

    #[test]
    fn session_id_parsing() {
        assert_eq!(parse_session_id("projects/p/reasoningEngines/e/sessions/123"), Some("123"));
        assert_eq!(
            parse_session_id("projects/p/reasoningEngines/e/sessions/456/operations/op-9"),
            Some("456")
        );
        assert_eq!(parse_session_id("projects/p/operations/op-9"), None);
        assert_eq!(parse_session_id("x/sessions/"), None);
    }

    #[test]
    fn missing_identity_is_config_error() {
        let mut config = cloud_config("http://localhost");
        config.engine_id = None;
        let err = MemoryBankClient::new(&config).unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("engine_id"), "got: {err}");
    }

    #[test]
    fn default_endpoint_is_regional() {
        let mut config = cloud_config("unused");
        config.base_url = None;
        let client = MemoryBankClient::new(&config).unwrap();
        assert!(client
            .engine_url()
            .starts_with("https://us-central1-aiplatform.googleapis.com/v1beta1/projects/proj"));
    }

    #[tokio::test]
    async fn create_session_sends_key_and_parses_name() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("{ENGINE_PATH}/sessions")))
            .and(header("x-goog-api-key", "cloud-key"))
            .and(body_partial_json(serde_json::json!({"userId": "u1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "projects/proj/locations/us-central1/reasoningEngines/engine-1/sessions/777/operations/op-1"
            })))
            .mount(&server)
            .await;

        let client = client(&server.uri());
        let name = client.create_session("u1").await.unwrap();
        assert!(name.ends_with("/reasoningEngines/engine-1/sessions/777"), "got: {name}");
    }

    #[tokio::test]
    async fn retrieve_retries_on_503() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("{ENGINE_PATH}/memories:retrieve")))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("{ENGINE_PATH}/memories:retrieve")))
            .and(body_partial_json(serde_json::json!({
                "scope": {"app_name": "engine-1", "user_id": "u1"},
                "similaritySearchParams": {"searchQuery": "tea", "topK": 2}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "retrievedMemories": [
                    {"memory": {"fact": "likes green tea"}},
                    {"memory": {"fact": ""}},
                    {"memory": {"fact": "drinks tea at 5"}}
                ]
            })))
            .mount(&server)
            .await;

        let facts = client(&server.uri())
            .retrieve_memories("u1", "tea", 2)
            .await
            .unwrap();
        assert_eq!(facts, vec!["likes green tea", "drinks tea at 5"]);
    }

    #[tokio::test]
    async fn client_error_is_backend_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "error": {"code": 403, "message": "denied", "status": "PERMISSION_DENIED"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server.uri())
            .generate_memories("projects/proj/sessions/1")
            .await
            .unwrap_err();
        assert!(matches!(err, RecallError::BackendUnavailable { .. }));
        assert!(err.to_string().contains("PERMISSION_DENIED"), "got: {err}");
    }

    #[tokio::test]
    async fn append_event_maps_agent_to_model_role() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("{ENGINE_PATH}/sessions/9:appendEvent")))
            .and(body_partial_json(serde_json::json!({
                "author": "agent",
                "content": {"role": "model", "parts": [{"text": "hi"}]}
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server.uri());
        let session = format!("{}/sessions/9", client.engine_url());
        client.append_event(&session, Role::Agent, "hi").await.unwrap();
    }
}
