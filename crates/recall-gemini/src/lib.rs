// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Google Gemini completion provider for the Recall memory layer.
//!
//! Implements [`CompletionProvider`] over the `generateContent` REST API.

pub mod client;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use recall_config::model::ProviderConfig;
use recall_core::{
    AdapterType, CompletionProvider, CompletionRequest, CompletionResponse, HealthStatus,
    PluginAdapter, RecallError,
};
use tracing::{debug, info};

use crate::client::GeminiClient;
use crate::types::{Content, GenerateContentRequest, GenerationConfig};

/// Gemini provider implementing [`CompletionProvider`].
pub struct GeminiProvider {
    client: GeminiClient,
    default_model: String,
}

impl GeminiProvider {
    /// Builds the provider, or `None` when no API key is configured.
    pub fn from_config(config: &ProviderConfig) -> Result<Option<Self>, RecallError> {
        let Some(api_key) = config.api_key.as_deref().filter(|k| !k.trim().is_empty()) else {
            info!("no Gemini API key configured, completions disabled");
            return Ok(None);
        };
        let client = GeminiClient::new(
            api_key,
            &config.base_url,
            Duration::from_secs(config.timeout_secs),
        )?;
        info!(model = config.model, "Gemini provider initialized");
        Ok(Some(Self::with_client(client, config.model.clone())))
    }

    pub fn with_client(client: GeminiClient, default_model: String) -> Self {
        Self {
            client,
            default_model,
        }
    }

    fn to_request(request: &CompletionRequest) -> GenerateContentRequest {
        GenerateContentRequest {
            system_instruction: request
                .system_prompt
                .as_deref()
                .filter(|s| !s.is_empty())
                .map(Content::system),
            contents: vec![Content::user(request.prompt.clone())],
            generation_config: GenerationConfig {
                max_output_tokens: request.max_tokens,
            },
        }
    }
}

#[async_trait]
impl PluginAdapter for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
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
impl CompletionProvider for GeminiProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, RecallError> {
        let model = if request.model.is_empty() {
            self.default_model.clone()
        } else {
            request.model.clone()
        };
        let body = Self::to_request(&request);
        let response = self.client.generate_content(&model, &body).await?;
        let content = response.text();
        debug!(model, chars = content.len(), "completion received");
        Ok(CompletionResponse {
            content,
            model: response.model_version.clone().unwrap_or(model),
            finish_reason: response.finish_reason(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: &str, api_key: Option<&str>) -> ProviderConfig {
        ProviderConfig {
            api_key: api_key.map(str::to_string),
            base_url: base_url.to_string(),
            ..ProviderConfig::default()
        }
    }

    #[test]
    fn no_key_means_no_provider() {
        assert!(GeminiProvider::from_config(&config("http://x", None)).unwrap().is_none());
        assert!(GeminiProvider::from_config(&config("http://x", Some("  "))).unwrap().is_none());
    }

    #[tokio::test]
    async fn complete_sends_system_instruction_and_prompt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
            .and(body_partial_json(serde_json::json!({
                "systemInstruction": {"parts": [{"text": "be kind"}]},
                "contents": [{"role": "user", "parts": [{"text": "User: hola"}]}],
                "generationConfig": {"maxOutputTokens": 256}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{"content": {"parts": [{"text": "¡Hola!"}]}, "finishReason": "STOP"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = GeminiProvider::from_config(&config(&server.uri(), Some("key")))
            .unwrap()
            .unwrap();
        let response = provider
            .complete(CompletionRequest {
                model: "gemini-2.0-flash".into(),
                system_prompt: Some("be kind".into()),
                prompt: "User: hola".into(),
                max_tokens: 256,
            })
            .await
            .unwrap();
        assert_eq!(response.content, "¡Hola!");
        assert_eq!(response.model, "gemini-2.0-flash");
        assert_eq!(response.finish_reason.as_deref(), Some("STOP"));
    }
}
