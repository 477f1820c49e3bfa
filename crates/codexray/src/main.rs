use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::env;
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod commands;

use codexray_core::config::Config;
use codexray_core::output::OutputFormat;

#[derive(Parser)]
#[command(
    name = "codexray",
    version,
    about = "LLM-backed source code analysis for snippets, files and GitHub repositories"
)]
struct Cli {
    #[arg(long, global = true, value_name = "json|jsonl|text")]
    format: Option<String>,

    #[arg(long, global = true)]
    profile: Option<String>,

    #[arg(long, global = true, default_value = "120")]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Commands,
}

pub(crate) struct AppContext {
    config: Config,
    timeout: Duration,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API.
    Serve(ServeArgs),
    /// Analyze code once and print the result.
    Analyze(AnalyzeArgs),
    /// Inspect stored analyses.
    History(HistoryArgs),
}

#[derive(Args)]
pub(crate) struct ServeArgs {
    #[arg(long)]
    bind: Option<String>,

    /// Keep analyses in memory instead of the data dir.
    #[arg(long)]
    ephemeral: bool,
}

#[derive(Args)]
#[command(group(clap::ArgGroup::new("source").args(["code", "file", "repo"])))]
pub(crate) struct AnalyzeArgs {
    #[arg(long)]
    code: Option<String>,

    #[arg(long, short = 'f')]
    file: Option<PathBuf>,

    /// GitHub repository URL.
    #[arg(long)]
    repo: Option<String>,

    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: Option<String>,

    /// Extra analysis focus (architecture, security, performance, testing, style, dependencies).
    #[arg(long = "option", value_name = "NAME")]
    options: Vec<String>,

    /// Free-text instruction appended to the prompt.
    #[arg(long, short)]
    prompt: Option<String>,

    #[arg(long)]
    provider: Option<String>,

    #[arg(long)]
    model: Option<String>,

    /// Echo the built prompt instead of calling a provider.
    #[arg(long)]
    dry_run: bool,

    #[arg(long)]
    no_save: bool,
}

#[derive(Args)]
pub(crate) struct HistoryArgs {
    #[command(subcommand)]
    command: HistoryCommand,
}

#[derive(Subcommand)]
pub(crate) enum HistoryCommand {
    List,
    Show { id: String },
    Delete { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv();
    init_tracing();

    let cli = Cli::parse();
    let format = resolve_format(cli.format.as_deref())?;
    let config = Config::load_with_profile(cli.profile.as_deref())?;
    let ctx = AppContext {
        config,
        timeout: Duration::from_secs(cli.timeout_secs),
    };

    match cli.command {
        Commands::Serve(args) => commands::serve::handle_serve(&ctx, args).await,
        Commands::Analyze(args) => commands::analyze::handle_analyze(&ctx, args, format).await,
        Commands::History(args) => commands::history::handle_history(&ctx, args, format),
    }
}

fn load_dotenv() {
    if let Ok(path) = env::var("DOTENV_CONFIG_PATH") {
        if dotenvy::from_path(&path).is_ok() {
            return;
        }
    }
    let _ = dotenvy::dotenv();
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn resolve_format(flag: Option<&str>) -> Result<OutputFormat> {
    if let Some(fmt) = flag {
        return fmt.parse();
    }
    if env::var("CODEXRAY_AGENT").ok().as_deref() == Some("1") {
        return Ok(OutputFormat::Json);
    }
    Ok(OutputFormat::Text)
}

pub(crate) fn read_stdin_code() -> Result<String> {
    let mut buf = String::new();
    if !io::stdin().is_terminal() {
        io::stdin()
            .read_to_string(&mut buf)
            .context("read code from stdin")?;
        if !buf.trim().is_empty() {
            return Ok(buf);
        }
    }
    Err(anyhow!("code is required (--code, --file, --repo, or stdin)"))
}
