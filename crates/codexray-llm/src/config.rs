use codexray_core::config::Config as AppConfig;
use codexray_core::types::Provider;
use std::collections::HashMap;
use std::time::Duration;

use crate::fallback::FallbackPolicy;

pub const DEFAULT_TEMPERATURE: f32 = 0.3;
pub const DEFAULT_CLAUDE_MAX_TOKENS: u32 = 4096;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Per-provider overrides. Unset fields fall back to the built-in defaults
/// in [`crate::router`].
#[derive(Debug, Clone, Default)]
pub struct ProviderConfig {
    pub base_url: Option<String>,
    pub api_key_env: Option<String>,
    pub api_key: Option<String>,
    pub default_model: Option<String>,
    pub extra_headers: HashMap<String, String>,
}

impl ProviderConfig {
    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        self.base_url = Some(base.into());
        self
    }

    pub fn with_api_key_env(mut self, env: impl Into<String>) -> Self {
        self.api_key_env = Some(env.into());
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    /// Fields set on `self` win over `base`.
    pub fn layered_over(self, base: ProviderConfig) -> ProviderConfig {
        let mut extra_headers = base.extra_headers;
        extra_headers.extend(self.extra_headers);
        ProviderConfig {
            base_url: self.base_url.or(base.base_url),
            api_key_env: self.api_key_env.or(base.api_key_env),
            api_key: self.api_key.or(base.api_key),
            default_model: self.default_model.or(base.default_model),
            extra_headers,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub providers: HashMap<Provider, ProviderConfig>,
    pub temperature: f32,
    pub claude_max_tokens: u32,
    pub timeout: Duration,
    pub fallback: FallbackPolicy,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            providers: HashMap::new(),
            temperature: DEFAULT_TEMPERATURE,
            claude_max_tokens: DEFAULT_CLAUDE_MAX_TOKENS,
            timeout: DEFAULT_TIMEOUT,
            fallback: FallbackPolicy::default(),
        }
    }
}

impl GatewayConfig {
    pub fn with_provider(mut self, provider: Provider, config: ProviderConfig) -> Self {
        self.providers.insert(provider, config);
        self
    }

    pub fn with_fallback(mut self, fallback: FallbackPolicy) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds the gateway settings from the application config file/env layer.
    pub fn from_app_config(config: &AppConfig) -> Self {
        let mut gateway = GatewayConfig {
            temperature: config.analysis.temperature,
            fallback: FallbackPolicy {
                claude_to_openai: config.fallback.claude_to_openai,
            },
            ..GatewayConfig::default()
        };
        for provider in Provider::ALL {
            if let Some(p) = config.provider(provider) {
                gateway.providers.insert(
                    provider,
                    ProviderConfig {
                        base_url: p.base_url.clone(),
                        api_key_env: p.api_key_env.clone(),
                        default_model: p.default_model.clone(),
                        extra_headers: p.headers.clone(),
                        ..ProviderConfig::default()
                    },
                );
            }
        }
        gateway
    }
}
