use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::fs;
use tracing::info;

use crate::{read_stdin_code, AnalyzeArgs, AppContext};
use codexray::github::GithubClient;
use codexray_core::output::{write_json, write_jsonl, OutputFormat};
use codexray_core::pipeline::{AnalysisPipeline, EchoGenerator, Generator};
use codexray_core::store::{FileStore, RecordStore};
use codexray_core::types::{AnalysisOptions, AnalysisRequest, ModelSelection, Provider};
use codexray_llm::{Gateway, GatewayConfig};

#[derive(Serialize)]
#[serde(untagged)]
enum AnalyzeOutput {
    Saved(codexray_core::types::AnalysisRecord),
    Unsaved(codexray_core::types::NewAnalysis),
}

impl AnalyzeOutput {
    fn result_text(&self) -> &str {
        match self {
            AnalyzeOutput::Saved(r) => &r.result_text,
            AnalyzeOutput::Unsaved(n) => &n.result_text,
        }
    }
}

pub(crate) async fn handle_analyze(
    ctx: &AppContext,
    args: AnalyzeArgs,
    format: OutputFormat,
) -> Result<()> {
    let config = &ctx.config;
    let options = parse_options(&args.options)?;
    let provider = match args.provider.as_deref() {
        Some(p) => p.parse::<Provider>()?,
        None => Provider::default(),
    };
    let selection = ModelSelection::new(provider, args.model.clone());

    let input_text = if let Some(code) = args.code {
        code
    } else if let Some(path) = args.file.as_ref() {
        let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
        String::from_utf8_lossy(&bytes).into_owned()
    } else if let Some(repo_url) = args.repo.as_deref() {
        let http = reqwest::Client::builder()
            .timeout(ctx.timeout)
            .build()
            .context("build GitHub http client")?;
        let github = GithubClient::new(&config.github, http);
        let bundle = github
            .fetch_repo_text(repo_url, args.github_token.as_deref())
            .await?;
        info!(
            files = bundle.stats.file_count,
            skipped = bundle.stats.skipped,
            estimated_tokens = bundle.stats.estimated_tokens,
            "repository bundled"
        );
        bundle.text
    } else {
        read_stdin_code()?
    };

    let request = AnalysisRequest {
        input_text,
        options,
        user_instruction: args.prompt.unwrap_or_default(),
        model_selection: selection,
    };

    let generator: Box<dyn Generator> = if args.dry_run {
        Box::new(EchoGenerator)
    } else {
        Box::new(Gateway::new(
            GatewayConfig::from_app_config(config).with_timeout(ctx.timeout),
        )?)
    };
    let pipeline = AnalysisPipeline::new(generator.as_ref(), config.analysis.pipeline());
    let result = pipeline.analyze(&request).await?;
    let new = request.into_new_analysis(result);

    let output = if args.dry_run || args.no_save {
        AnalyzeOutput::Unsaved(new)
    } else {
        let store = FileStore::new(&config.server.data_dir);
        let record = store.create(new)?;
        info!(id = %record.id, dir = %store.dir().display(), "analysis saved");
        AnalyzeOutput::Saved(record)
    };

    match format {
        OutputFormat::Json => write_json(&output),
        OutputFormat::Jsonl => write_jsonl("analysis", &output),
        OutputFormat::Text => {
            println!("{}", output.result_text());
            Ok(())
        }
    }
}

fn parse_options(names: &[String]) -> Result<AnalysisOptions> {
    let mut options = AnalysisOptions::default();
    for name in names {
        let key = name.trim().to_ascii_lowercase();
        if !options.set(&key, true) {
            return Err(anyhow!(
                "unknown option {name:?} (expected architecture, security, performance, testing, style or dependencies)"
            ));
        }
    }
    Ok(options)
}
