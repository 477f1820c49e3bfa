//! GitHub HTTP surface: repository archives, repo listing and the OAuth
//! code exchange.

use codexray_core::bundle::{bundle_archive, ArchiveFilter, RepoBundle, RepoRef};
use codexray_core::config::GithubConfig;
use codexray_core::error::RepoError;
use codexray_llm::http::upstream_message;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;
use tracing::{debug, info};

const AGENT: &str = concat!("codexray/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum GithubError {
    #[error("GitHub OAuth is not configured: set {0}")]
    MissingCredentials(String),
    #[error("GitHub http {status}: {message}")]
    Status { status: u16, message: String },
    #[error("GitHub request failed: {0}")]
    Transport(String),
    #[error("GitHub OAuth exchange failed: {0}")]
    OAuth(String),
}

impl From<reqwest::Error> for GithubError {
    fn from(err: reqwest::Error) -> Self {
        GithubError::Transport(err.to_string())
    }
}

/// The subset of a GitHub repository object the frontend renders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoSummary {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub html_url: String,
    pub private: bool,
    pub description: Option<String>,
    pub default_branch: Option<String>,
    pub language: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenExchange {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GithubClient {
    client: Client,
    api_base: String,
    oauth_base: String,
    client_id_env: String,
    client_secret_env: String,
    scope: String,
    max_archive_bytes: usize,
    filter: ArchiveFilter,
}

impl GithubClient {
    pub fn new(config: &GithubConfig, client: Client) -> Self {
        Self {
            client,
            api_base: config.api_base_url.trim_end_matches('/').to_string(),
            oauth_base: config.oauth_base_url.trim_end_matches('/').to_string(),
            client_id_env: config.client_id_env.clone(),
            client_secret_env: config.client_secret_env.clone(),
            scope: config.scope.clone(),
            max_archive_bytes: config.max_archive_bytes,
            filter: config.archive_filter(),
        }
    }

    /// Downloads the default-branch zipball and bundles its source files.
    pub async fn fetch_repo_text(
        &self,
        repo_url: &str,
        token: Option<&str>,
    ) -> Result<RepoBundle, RepoError> {
        let repo = RepoRef::parse(repo_url)?;
        let url = format!("{}/repos/{}/{}/zipball", self.api_base, repo.owner, repo.repo);
        info!(owner = %repo.owner, repo = %repo.repo, authenticated = token.is_some(), "fetching repository archive");

        let mut req = self.client.get(&url).header(USER_AGENT, AGENT);
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            req = req.bearer_auth(token);
        }
        let mut resp = req.send().await.map_err(|e| RepoError::Fetch {
            status: None,
            message: Some(e.to_string()),
        })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(map_archive_status(status.as_u16(), &body));
        }

        let limit = self.max_archive_bytes;
        if resp.content_length().is_some_and(|len| len as usize > limit) {
            return Err(RepoError::TooLarge { limit });
        }
        let mut bytes = Vec::new();
        while let Some(chunk) = resp.chunk().await.map_err(|e| RepoError::Fetch {
            status: None,
            message: Some(e.to_string()),
        })? {
            if bytes.len() + chunk.len() > limit {
                return Err(RepoError::TooLarge { limit });
            }
            bytes.extend_from_slice(&chunk);
        }
        debug!(bytes = bytes.len(), "downloaded repository archive");

        bundle_archive(&bytes, &self.filter)
    }

    /// Most recently updated repositories visible to the token (one page of 100).
    pub async fn list_repos(&self, token: &str) -> Result<Vec<RepoSummary>, GithubError> {
        let url = format!("{}/user/repos", self.api_base);
        let resp = self
            .client
            .get(url)
            .query(&[("per_page", "100"), ("sort", "updated")])
            .header(USER_AGENT, AGENT)
            .header(ACCEPT, "application/vnd.github+json")
            .bearer_auth(token)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GithubError::Status {
                status: status.as_u16(),
                message: upstream_message(&body),
            });
        }
        Ok(resp.json().await?)
    }

    pub fn authorize_url(&self) -> Result<String, GithubError> {
        let client_id = self.credential(&self.client_id_env)?;
        let url = Url::parse_with_params(
            &format!("{}/login/oauth/authorize", self.oauth_base),
            &[("client_id", client_id.as_str()), ("scope", self.scope.as_str())],
        )
        .map_err(|e| GithubError::OAuth(e.to_string()))?;
        Ok(url.to_string())
    }

    /// Trades an OAuth callback code for an access token.
    pub async fn exchange_code(&self, code: &str) -> Result<String, GithubError> {
        let client_id = self.credential(&self.client_id_env)?;
        let client_secret = self.credential(&self.client_secret_env)?;
        let resp = self
            .client
            .post(format!("{}/login/oauth/access_token", self.oauth_base))
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, AGENT)
            .json(&serde_json::json!({
                "client_id": client_id,
                "client_secret": client_secret,
                "code": code,
            }))
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GithubError::Status {
                status: status.as_u16(),
                message: upstream_message(&body),
            });
        }
        let parsed: TokenExchange = resp.json().await?;
        match parsed.access_token.filter(|t| !t.is_empty()) {
            Some(token) => Ok(token),
            None => Err(GithubError::OAuth(
                parsed
                    .error_description
                    .or(parsed.error)
                    .unwrap_or_else(|| "no access_token in response".to_string()),
            )),
        }
    }

    fn credential(&self, var: &str) -> Result<String, GithubError> {
        env::var(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| GithubError::MissingCredentials(var.to_string()))
    }
}

fn map_archive_status(status: u16, body: &str) -> RepoError {
    let message = Some(upstream_message(body)).filter(|m| !m.trim().is_empty());
    match status {
        404 => RepoError::NotFound { message },
        401 | 403 => RepoError::Unauthorized { status, message },
        _ => RepoError::Fetch {
            status: Some(status),
            message,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_status_mapping() {
        match map_archive_status(404, r#"{"message":"Not Found"}"#) {
            RepoError::NotFound { message } => assert_eq!(message.as_deref(), Some("Not Found")),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            map_archive_status(403, ""),
            RepoError::Unauthorized {
                status: 403,
                message: None
            }
        ));
        assert!(matches!(
            map_archive_status(502, "bad gateway"),
            RepoError::Fetch {
                status: Some(502),
                ..
            }
        ));
    }

    #[test]
    fn not_found_message_mentions_upstream() {
        let err = map_archive_status(404, r#"{"message":"Not Found"}"#);
        assert_eq!(
            err.to_string(),
            "repository or branch not found (GitHub: Not Found)"
        );
    }
}
