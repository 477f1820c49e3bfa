use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::bundle::{ArchiveFilter, DEFAULT_MAX_ARCHIVE_BYTES};
use crate::paths::{codexray_home, home_dir};
use crate::pipeline::PipelineConfig;
use crate::types::Provider;

pub const DEFAULT_BIND: &str = "0.0.0.0:5000";
pub const DEFAULT_BODY_LIMIT: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub server: ServerConfig,
    pub analysis: AnalysisConfig,
    pub providers: HashMap<String, ProviderConfig>,
    pub fallback: FallbackConfig,
    pub github: GithubConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind: String,
    pub data_dir: PathBuf,
    pub frontend_base_url: String,
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            data_dir: codexray_home(),
            frontend_base_url: "http://localhost:5173".to_string(),
            body_limit_bytes: DEFAULT_BODY_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub large_input_threshold: usize,
    pub chunk_size: usize,
    pub temperature: f32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let pipeline = PipelineConfig::default();
        Self {
            large_input_threshold: pipeline.large_input_threshold,
            chunk_size: pipeline.chunk_size,
            temperature: 0.3,
        }
    }
}

impl AnalysisConfig {
    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            large_input_threshold: self.large_input_threshold,
            chunk_size: self.chunk_size.max(1),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProviderConfig {
    pub base_url: Option<String>,
    pub api_key_env: Option<String>,
    pub default_model: Option<String>,
    /// Sent with every request to this provider (proxies, org ids).
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FallbackConfig {
    /// Retry a Claude "model not found" once against OpenAI's default model.
    pub claude_to_openai: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    pub api_base_url: String,
    pub oauth_base_url: String,
    pub client_id_env: String,
    pub client_secret_env: String,
    pub scope: String,
    pub max_archive_bytes: usize,
    pub max_file_bytes: usize,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.github.com".to_string(),
            oauth_base_url: "https://github.com".to_string(),
            client_id_env: "GITHUB_CLIENT_ID".to_string(),
            client_secret_env: "GITHUB_CLIENT_SECRET".to_string(),
            scope: "repo read:user".to_string(),
            max_archive_bytes: DEFAULT_MAX_ARCHIVE_BYTES,
            max_file_bytes: ArchiveFilter::default().max_file_bytes,
        }
    }
}

impl GithubConfig {
    pub fn archive_filter(&self) -> ArchiveFilter {
        ArchiveFilter {
            max_file_bytes: self.max_file_bytes,
            ..ArchiveFilter::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct ConfigFile {
    pub server: Option<ServerFile>,
    pub analysis: Option<AnalysisFile>,
    pub providers: Option<HashMap<String, ProviderConfig>>,
    pub fallback: Option<FallbackConfig>,
    pub github: Option<GithubFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct ServerFile {
    pub bind: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub frontend_base_url: Option<String>,
    pub body_limit_bytes: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct AnalysisFile {
    pub large_input_threshold: Option<usize>,
    pub chunk_size: Option<usize>,
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct GithubFile {
    pub api_base_url: Option<String>,
    pub oauth_base_url: Option<String>,
    pub client_id_env: Option<String>,
    pub client_secret_env: Option<String>,
    pub scope: Option<String>,
    pub max_archive_bytes: Option<usize>,
    pub max_file_bytes: Option<usize>,
}

impl Config {
    pub fn load_with_profile(profile: Option<&str>) -> Result<Self> {
        let mut config = Config::default();
        for path in default_config_paths(profile) {
            if path.exists() {
                let file = load_config_file(&path)?;
                config.merge(file);
            }
        }
        config.apply_env()?;
        Ok(config)
    }

    pub fn provider(&self, provider: Provider) -> Option<&ProviderConfig> {
        self.providers.get(provider.as_str())
    }

    fn merge(&mut self, other: ConfigFile) {
        if let Some(server) = other.server {
            merge_server(&mut self.server, server);
        }
        if let Some(analysis) = other.analysis {
            merge_analysis(&mut self.analysis, analysis);
        }
        if let Some(providers) = other.providers {
            for (k, v) in providers {
                self.providers
                    .entry(k)
                    .and_modify(|existing| merge_provider(existing, &v))
                    .or_insert(v);
            }
        }
        if let Some(fallback) = other.fallback {
            self.fallback = fallback;
        }
        if let Some(github) = other.github {
            merge_github(&mut self.github, github);
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(bind) = env::var("CODEXRAY_BIND") {
            self.server.bind = bind;
        } else if let Ok(port) = env::var("PORT") {
            let port: u16 = port
                .trim()
                .parse()
                .with_context(|| format!("invalid PORT value {port:?}"))?;
            self.server.bind = format!("0.0.0.0:{port}");
        }
        if let Ok(dir) = env::var("CODEXRAY_DATA_DIR") {
            self.server.data_dir = PathBuf::from(dir);
        }
        if let Ok(url) = env::var("FRONTEND_BASE_URL") {
            self.server.frontend_base_url = url;
        }
        if let Some(v) = env_usize("CODEXRAY_LARGE_INPUT_THRESHOLD")? {
            self.analysis.large_input_threshold = v;
        }
        if let Some(v) = env_usize("CODEXRAY_CHUNK_SIZE")? {
            self.analysis.chunk_size = v;
        }
        for (provider, var) in [
            (Provider::Openai, "OPENAI_MODEL"),
            (Provider::Gemini, "GEMINI_MODEL"),
            (Provider::Claude, "CLAUDE_MODEL"),
        ] {
            if let Ok(model) = env::var(var) {
                if !model.trim().is_empty() {
                    self.providers
                        .entry(provider.as_str().to_string())
                        .or_default()
                        .default_model = Some(model.trim().to_string());
                }
            }
        }
        if let Ok(flag) = env::var("CLAUDE_FALLBACK_TO_OPENAI") {
            self.fallback.claude_to_openai = parse_bool(&flag);
        }
        Ok(())
    }
}

fn env_usize(name: &str) -> Result<Option<usize>> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("invalid {name} value {raw:?}")),
        Err(_) => Ok(None),
    }
}

fn parse_bool(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content =
        fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
    let parsed: ConfigFile =
        toml::from_str(&content).with_context(|| format!("parse config {}", path.display()))?;
    Ok(parsed)
}

fn default_config_paths(profile: Option<&str>) -> Vec<PathBuf> {
    let mut paths = Vec::new();

    paths.push(codexray_home().join("config.toml"));
    if let Some(home) = home_dir() {
        paths.push(home.join(".config/codexray/config.toml"));
    }
    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        paths.push(PathBuf::from(xdg).join("codexray/config.toml"));
    }
    paths.push(PathBuf::from("./codexray.toml"));

    if let Ok(custom) = env::var("CODEXRAY_CONFIG_PATH") {
        paths.push(PathBuf::from(custom));
    }

    if let Some(name) = profile {
        paths.push(codexray_home().join("profiles").join(format!("{name}.toml")));
        if let Some(home) = home_dir() {
            paths.push(
                home.join(".config/codexray/profiles")
                    .join(format!("{name}.toml")),
            );
        }
        if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
            paths.push(
                PathBuf::from(xdg)
                    .join("codexray/profiles")
                    .join(format!("{name}.toml")),
            );
        }
        paths.push(PathBuf::from(format!("./codexray.{name}.toml")));
    }
    paths
}

fn merge_server(target: &mut ServerConfig, other: ServerFile) {
    if let Some(bind) = other.bind {
        target.bind = bind;
    }
    if let Some(dir) = other.data_dir {
        target.data_dir = dir;
    }
    if let Some(url) = other.frontend_base_url {
        target.frontend_base_url = url;
    }
    if let Some(limit) = other.body_limit_bytes {
        target.body_limit_bytes = limit;
    }
}

fn merge_analysis(target: &mut AnalysisConfig, other: AnalysisFile) {
    if let Some(v) = other.large_input_threshold {
        target.large_input_threshold = v;
    }
    if let Some(v) = other.chunk_size {
        target.chunk_size = v;
    }
    if let Some(v) = other.temperature {
        target.temperature = v;
    }
}

fn merge_provider(target: &mut ProviderConfig, other: &ProviderConfig) {
    if other.base_url.is_some() {
        target.base_url = other.base_url.clone();
    }
    if other.api_key_env.is_some() {
        target.api_key_env = other.api_key_env.clone();
    }
    if other.default_model.is_some() {
        target.default_model = other.default_model.clone();
    }
    target
        .headers
        .extend(other.headers.iter().map(|(k, v)| (k.clone(), v.clone())));
}

fn merge_github(target: &mut GithubConfig, other: GithubFile) {
    if let Some(v) = other.api_base_url {
        target.api_base_url = v;
    }
    if let Some(v) = other.oauth_base_url {
        target.oauth_base_url = v;
    }
    if let Some(v) = other.client_id_env {
        target.client_id_env = v;
    }
    if let Some(v) = other.client_secret_env {
        target.client_secret_env = v;
    }
    if let Some(v) = other.scope {
        target.scope = v;
    }
    if let Some(v) = other.max_archive_bytes {
        target.max_archive_bytes = v;
    }
    if let Some(v) = other.max_file_bytes {
        target.max_file_bytes = v;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const ENV_VARS: &[&str] = &[
        "CODEXRAY_BIND",
        "PORT",
        "CODEXRAY_DATA_DIR",
        "FRONTEND_BASE_URL",
        "CODEXRAY_LARGE_INPUT_THRESHOLD",
        "CODEXRAY_CHUNK_SIZE",
        "OPENAI_MODEL",
        "GEMINI_MODEL",
        "CLAUDE_MODEL",
        "CLAUDE_FALLBACK_TO_OPENAI",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn file_values_merge_over_defaults() {
        let mut config = Config::default();
        let file: ConfigFile = toml::from_str(
            r#"
            [analysis]
            chunk_size = 8000

            [providers.claude]
            default_model = "claude-3-haiku"

            [providers.openai.headers]
            OpenAI-Organization = "org-acme"

            [fallback]
            claude_to_openai = true

            [github]
            max_file_bytes = 1024
            "#,
        )
        .unwrap();
        config.merge(file);

        assert_eq!(config.analysis.chunk_size, 8000);
        assert_eq!(config.analysis.large_input_threshold, 15_000);
        assert_eq!(
            config
                .provider(Provider::Claude)
                .and_then(|p| p.default_model.as_deref()),
            Some("claude-3-haiku")
        );
        assert_eq!(
            config.provider(Provider::Openai).unwrap().headers["OpenAI-Organization"],
            "org-acme"
        );
        assert!(config.fallback.claude_to_openai);
        assert_eq!(config.github.archive_filter().max_file_bytes, 1024);
        assert_eq!(config.github.max_archive_bytes, 50 * 1024 * 1024);
    }

    #[test]
    #[serial]
    fn env_overrides_apply() {
        clear_env();
        env::set_var("PORT", "8088");
        env::set_var("GEMINI_MODEL", "gemini-2.0-flash");
        env::set_var("CLAUDE_FALLBACK_TO_OPENAI", "true");
        env::set_var("CODEXRAY_CHUNK_SIZE", "500");

        let mut config = Config::default();
        config.apply_env().unwrap();
        clear_env();

        assert_eq!(config.server.bind, "0.0.0.0:8088");
        assert_eq!(
            config
                .provider(Provider::Gemini)
                .and_then(|p| p.default_model.as_deref()),
            Some("gemini-2.0-flash")
        );
        assert!(config.fallback.claude_to_openai);
        assert_eq!(config.analysis.pipeline().chunk_size, 500);
    }

    #[test]
    #[serial]
    fn invalid_numeric_env_is_an_error() {
        clear_env();
        env::set_var("CODEXRAY_LARGE_INPUT_THRESHOLD", "lots");
        let mut config = Config::default();
        let err = config.apply_env().unwrap_err();
        clear_env();
        assert!(err.to_string().contains("CODEXRAY_LARGE_INPUT_THRESHOLD"));
    }
}
