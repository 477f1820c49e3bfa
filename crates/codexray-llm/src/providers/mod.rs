use crate::config::ProviderConfig;
use crate::error::{LlmError, Result};
use std::env;

pub mod anthropic;
pub mod gemini;
pub mod openai;

/// Inline key first, then the configured environment variable.
pub fn resolve_api_key(cfg: &ProviderConfig) -> Result<String> {
    if let Some(key) = cfg.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
        return Ok(key.to_string());
    }
    if let Some(env_key) = cfg.api_key_env.as_deref() {
        return env::var(env_key)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| LlmError::MissingApiKey(env_key.to_string()));
    }
    Err(LlmError::MissingApiKey("<unset>".into()))
}

pub(crate) fn base_url(cfg: &ProviderConfig) -> Result<String> {
    cfg.base_url
        .as_deref()
        .map(|b| b.trim_end_matches('/').to_string())
        .ok_or_else(|| LlmError::Config("base_url required".into()))
}
