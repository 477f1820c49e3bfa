use codexray_core::types::{ModelSelection, Provider};

use crate::config::{GatewayConfig, ProviderConfig};

pub const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const GEMINI_DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const CLAUDE_DEFAULT_MODEL: &str = "claude-3-5-sonnet-latest";

#[derive(Debug, Clone)]
pub struct ResolvedModel {
    pub provider: Provider,
    pub model: String,
    pub config: ProviderConfig,
}

/// Merges the configured overrides for the selected provider over its
/// built-in defaults and picks the model: explicit, then configured default,
/// then built-in default.
pub fn resolve_model(selection: &ModelSelection, config: &GatewayConfig) -> ResolvedModel {
    let provider = selection.provider;
    let provider_cfg = config
        .providers
        .get(&provider)
        .cloned()
        .unwrap_or_default()
        .layered_over(default_provider_config(provider));

    let model = selection
        .model
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .or_else(|| provider_cfg.default_model.clone())
        .unwrap_or_else(|| default_model(provider).to_string());

    ResolvedModel {
        provider,
        model,
        config: provider_cfg,
    }
}

pub fn default_model(provider: Provider) -> &'static str {
    match provider {
        Provider::Openai => OPENAI_DEFAULT_MODEL,
        Provider::Gemini => GEMINI_DEFAULT_MODEL,
        Provider::Claude => CLAUDE_DEFAULT_MODEL,
    }
}

pub fn default_provider_config(provider: Provider) -> ProviderConfig {
    let cfg = ProviderConfig::default();
    match provider {
        Provider::Openai => cfg
            .with_base_url("https://api.openai.com/v1")
            .with_api_key_env("OPENAI_API_KEY"),
        Provider::Gemini => cfg
            .with_base_url("https://generativelanguage.googleapis.com/v1beta")
            .with_api_key_env("GEMINI_API_KEY"),
        Provider::Claude => cfg
            .with_base_url("https://api.anthropic.com")
            .with_api_key_env("ANTHROPIC_API_KEY"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_model_wins() {
        let config = GatewayConfig::default();
        let resolved = resolve_model(
            &ModelSelection::new(Provider::Claude, Some("claude-3-haiku".into())),
            &config,
        );
        assert_eq!(resolved.provider, Provider::Claude);
        assert_eq!(resolved.model, "claude-3-haiku");
        assert_eq!(
            resolved.config.api_key_env.as_deref(),
            Some("ANTHROPIC_API_KEY")
        );
    }

    #[test]
    fn blank_model_uses_configured_then_builtin_default() {
        let config = GatewayConfig::default().with_provider(
            Provider::Gemini,
            ProviderConfig::default().with_default_model("gemini-2.0-flash"),
        );
        let selection = ModelSelection {
            provider: Provider::Gemini,
            model: Some("  ".into()),
        };
        assert_eq!(resolve_model(&selection, &config).model, "gemini-2.0-flash");

        let selection = ModelSelection::new(Provider::Openai, None);
        let resolved = resolve_model(&selection, &config);
        assert_eq!(resolved.model, OPENAI_DEFAULT_MODEL);
        assert_eq!(
            resolved.config.base_url.as_deref(),
            Some("https://api.openai.com/v1")
        );
    }

    #[test]
    fn base_url_override_keeps_default_key_env() {
        let config = GatewayConfig::default().with_provider(
            Provider::Openai,
            ProviderConfig::default().with_base_url("http://127.0.0.1:9999"),
        );
        let resolved = resolve_model(&ModelSelection::default(), &config);
        assert_eq!(resolved.config.base_url.as_deref(), Some("http://127.0.0.1:9999"));
        assert_eq!(resolved.config.api_key_env.as_deref(), Some("OPENAI_API_KEY"));
    }
}
