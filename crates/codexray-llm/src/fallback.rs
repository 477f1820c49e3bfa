use codexray_core::error::ProviderError;
use codexray_core::types::{ModelSelection, Provider};

/// When a Claude model is unknown upstream, optionally retry once on OpenAI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FallbackPolicy {
    pub claude_to_openai: bool,
}

impl FallbackPolicy {
    pub fn enabled() -> Self {
        Self {
            claude_to_openai: true,
        }
    }

    /// The selection to retry with, if this failure qualifies.
    pub fn fallback_for(&self, err: &ProviderError) -> Option<ModelSelection> {
        if !self.claude_to_openai || err.provider != Provider::Claude {
            return None;
        }
        if err.is_not_found() || err.message.contains("not_found_error") {
            return Some(ModelSelection::new(Provider::Openai, None));
        }
        None
    }
}
