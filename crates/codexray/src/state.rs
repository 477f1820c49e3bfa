use anyhow::{Context, Result};
use codexray_core::config::Config;
use codexray_core::ledger::TokenLedger;
use codexray_core::pipeline::{Generator, PipelineConfig};
use codexray_core::store::{FileStore, MemoryStore, RecordStore};
use codexray_llm::{Gateway, GatewayConfig};
use std::sync::Arc;
use std::time::Duration;

use crate::github::GithubClient;

/// Everything a request handler needs, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<dyn Generator>,
    pub store: Arc<dyn RecordStore>,
    pub ledger: TokenLedger,
    pub github: GithubClient,
    pub pipeline: PipelineConfig,
    pub frontend_base_url: String,
}

impl AppState {
    /// Real providers and a file store under the configured data dir, or a
    /// memory store when `ephemeral` is set.
    pub fn from_config(config: &Config, ephemeral: bool, timeout: Duration) -> Result<Self> {
        let gateway = Gateway::new(GatewayConfig::from_app_config(config).with_timeout(timeout))
            .context("build provider gateway")?;
        let store: Arc<dyn RecordStore> = if ephemeral {
            Arc::new(MemoryStore::new())
        } else {
            Arc::new(FileStore::new(&config.server.data_dir))
        };
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("build GitHub http client")?;
        Ok(Self::new(config, Arc::new(gateway), store, GithubClient::new(&config.github, http)))
    }

    pub fn new(
        config: &Config,
        generator: Arc<dyn Generator>,
        store: Arc<dyn RecordStore>,
        github: GithubClient,
    ) -> Self {
        Self {
            generator,
            store,
            ledger: TokenLedger::in_memory(),
            github,
            pipeline: config.analysis.pipeline(),
            frontend_base_url: config.server.frontend_base_url.trim_end_matches('/').to_string(),
        }
    }
}
