use thiserror::Error;

use crate::types::Provider;

#[derive(Debug, Error)]
#[error("unknown provider: {0}")]
pub struct UnknownProvider(pub String);

/// An upstream model call that failed, either in transport or with a non-2xx
/// response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{provider}{}: {message}", status_part(.status))]
pub struct ProviderError {
    pub provider: Provider,
    pub status: Option<u16>,
    pub message: String,
}

impl ProviderError {
    pub fn new(provider: Provider, status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            provider,
            status,
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status == Some(404)
    }
}

fn status_part(status: &Option<u16>) -> String {
    status.map(|s| format!(" http {s}")).unwrap_or_default()
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("no code to analyze")]
    EmptyInput,
    #[error("analysis failed: {0}")]
    Failed(#[from] ProviderError),
}

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("invalid GitHub repository URL: {0}")]
    InvalidUrl(String),
    #[error("no supported source files found in the repository")]
    EmptyRepository,
    #[error("repository or branch not found{}", upstream_suffix(.message))]
    NotFound { message: Option<String> },
    #[error(
        "GitHub token missing or insufficient; private repositories require a token{}",
        upstream_suffix(.message)
    )]
    Unauthorized { status: u16, message: Option<String> },
    #[error("failed to fetch repository{}", upstream_suffix(.message))]
    Fetch {
        status: Option<u16>,
        message: Option<String>,
    },
    #[error("repository archive exceeds {limit} bytes")]
    TooLarge { limit: usize },
    #[error("unreadable repository archive: {0}")]
    Archive(String),
}

fn upstream_suffix(message: &Option<String>) -> String {
    match message {
        Some(m) if !m.trim().is_empty() => format!(" (GitHub: {m})"),
        _ => String::new(),
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("no token provided")]
    MissingToken,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt record {id}: {source}")]
    Corrupt {
        id: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
}
