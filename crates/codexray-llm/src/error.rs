use codexray_core::error::ProviderError;
use codexray_core::types::Provider;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("missing api key: set {0}")]
    MissingApiKey(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("http {status}: {message}")]
    Status { status: u16, message: String },
    #[error("parse error: {0}")]
    Parse(String),
}

impl LlmError {
    /// Tags the failure with the provider it came from.
    pub fn into_provider_error(self, provider: Provider) -> ProviderError {
        match self {
            LlmError::Status { status, message } => {
                ProviderError::new(provider, Some(status), message)
            }
            other => ProviderError::new(provider, None, other.to_string()),
        }
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        LlmError::Transport(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LlmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_errors_keep_their_code() {
        let err = LlmError::Status {
            status: 429,
            message: "slow down".into(),
        }
        .into_provider_error(Provider::Gemini);
        assert_eq!(err.status, Some(429));
        assert_eq!(err.to_string(), "gemini http 429: slow down");
    }

    #[test]
    fn other_errors_have_no_status() {
        let err = LlmError::MissingApiKey("OPENAI_API_KEY".into())
            .into_provider_error(Provider::Openai);
        assert_eq!(err.status, None);
        assert!(err.message.contains("OPENAI_API_KEY"));
    }
}
