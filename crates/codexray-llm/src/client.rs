use async_trait::async_trait;
use codexray_core::error::ProviderError;
use codexray_core::pipeline::Generator;
use codexray_core::types::{ModelSelection, Provider};
use reqwest::Client;
use tracing::{debug, warn};

use crate::config::GatewayConfig;
use crate::error::{LlmError, Result};
use crate::providers::{anthropic, gemini, openai};
use crate::router::{resolve_model, ResolvedModel};
use crate::types::{ChatRequest, ChatResponse};

/// Routes prompts to the selected provider with one shared HTTP client.
#[derive(Debug, Clone)]
pub struct Gateway {
    config: GatewayConfig,
    client: Client,
}

impl Gateway {
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(LlmError::from)?;
        Ok(Self { config, client })
    }

    pub fn resolve(&self, selection: &ModelSelection) -> ResolvedModel {
        resolve_model(selection, &self.config)
    }

    /// One prompt, one response. A Claude "model not found" is retried once
    /// on OpenAI's default model when the fallback policy allows it; if that
    /// retry also fails the original Claude error is returned.
    pub async fn complete(
        &self,
        prompt: &str,
        selection: &ModelSelection,
    ) -> std::result::Result<ChatResponse, ProviderError> {
        let first = self.complete_once(prompt, selection).await;
        let err = match first {
            Ok(resp) => return Ok(resp),
            Err(err) => err,
        };
        let Some(retry) = self.config.fallback.fallback_for(&err) else {
            return Err(err);
        };
        warn!(error = %err, "claude model not found, retrying on openai");
        match self.complete_once(prompt, &retry).await {
            Ok(resp) => Ok(resp),
            Err(fallback_err) => {
                warn!(error = %fallback_err, "openai fallback failed");
                Err(err)
            }
        }
    }

    async fn complete_once(
        &self,
        prompt: &str,
        selection: &ModelSelection,
    ) -> std::result::Result<ChatResponse, ProviderError> {
        let resolved = self.resolve(selection);
        let provider = resolved.provider;
        debug!(
            provider = %provider,
            model = %resolved.model,
            prompt_chars = prompt.len(),
            "dispatching prompt"
        );
        let resp = self
            .dispatch(resolved, prompt)
            .await
            .map_err(|e| e.into_provider_error(provider))?;
        debug!(
            provider = %provider,
            prompt_tokens = resp.usage.prompt_tokens,
            completion_tokens = resp.usage.completion_tokens,
            total_tokens = resp.usage.total_tokens,
            "provider usage"
        );
        Ok(resp)
    }

    async fn dispatch(&self, resolved: ResolvedModel, prompt: &str) -> Result<ChatResponse> {
        let req =
            ChatRequest::new(resolved.model, prompt).temperature(self.config.temperature);
        match resolved.provider {
            Provider::Openai => openai::chat(&self.client, &resolved.config, req).await,
            Provider::Gemini => gemini::chat(&self.client, &resolved.config, req).await,
            Provider::Claude => {
                let req = req.max_tokens(self.config.claude_max_tokens);
                anthropic::chat(&self.client, &resolved.config, req).await
            }
        }
    }
}

#[async_trait]
impl Generator for Gateway {
    async fn generate(
        &self,
        prompt: &str,
        selection: &ModelSelection,
    ) -> std::result::Result<String, ProviderError> {
        self.complete(prompt, selection).await.map(|r| r.content)
    }
}
