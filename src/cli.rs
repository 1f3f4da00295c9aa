//! Command-line front end: parses arguments, drives a [`RequestLifecycle`] and renders its state.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::fmt::Write as _;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};

use crate::models::{AnalysisMode, CompletedAnalysis, RequestState};
use crate::services::analysis::classify_train_error;
use crate::services::{resolve_api_base_url, AnalysisClient, ConfigStore, RequestLifecycle};

/// NewsCheck CLI.
#[derive(Parser, Debug)]
#[command(name = "newscheck")]
#[command(version)]
#[command(about = "Check news articles against a remote authenticity classifier")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Base URL of the analysis service (overrides NEWSCHECK_API_URL and the config file).
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Directory holding config.json.
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,

    /// Output format.
    #[arg(short, long, global = true, value_enum, default_value = "human")]
    pub format: OutputFormat,

    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze article text (argument, --file, or stdin).
    Text {
        /// Article text. Read from stdin when neither this nor --file is given.
        text: Option<String>,

        /// Read the article text from a file.
        #[arg(short = 'i', long, conflicts_with = "text")]
        file: Option<PathBuf>,
    },

    /// Analyze the article at a URL.
    Url {
        /// Article URL, starting with http:// or https://.
        url: String,
    },

    /// Ask the service to retrain its model.
    Train,

    /// Inspect or change stored configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the resolved service URL and config file location.
    Show,
    /// Store the service base URL.
    SetUrl { url: String },
}

fn config_store(cli: &Cli) -> Option<ConfigStore> {
    cli.config_dir
        .clone()
        .or_else(ConfigStore::default_config_dir)
        .map(ConfigStore::new)
}

fn build_client(base_url: &str, store: Option<&ConfigStore>) -> anyhow::Result<AnalysisClient> {
    let proxy = match store.map(ConfigStore::get_proxy).transpose() {
        Ok(proxy) => proxy.flatten(),
        Err(e) => {
            warn!(error = %e, "config.proxy_unreadable");
            None
        }
    };

    match proxy.as_ref().and_then(|p| p.url_for(base_url)) {
        Some(proxy_url) => {
            info!(proxy = %proxy_url, "http.proxy_enabled");
            AnalysisClient::with_proxy(base_url, proxy_url).context("invalid proxy configuration")
        }
        None => AnalysisClient::new(base_url).context("failed to build HTTP client"),
    }
}

fn read_text_input(text: Option<String>, file: Option<PathBuf>) -> anyhow::Result<String> {
    if let Some(text) = text {
        return Ok(text);
    }
    if let Some(path) = file {
        return std::fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()));
    }
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("failed to read text from stdin")?;
    Ok(buf)
}

pub async fn execute(cli: Cli) -> anyhow::Result<ExitCode> {
    let store = config_store(&cli);
    let format = cli.format;

    let (mode, content) = match cli.command {
        Commands::Text { text, file } => (AnalysisMode::Text, read_text_input(text, file)?),
        Commands::Url { url } => (AnalysisMode::Url, url),
        Commands::Train => {
            let base_url = resolve_api_base_url(cli.api_url.as_deref(), store.as_ref());
            let client = build_client(&base_url, store.as_ref())?;
            return Ok(match client.train().await {
                Ok(status) => {
                    println!("Model training: {}", status);
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    warn!(error = %e, "train.failed");
                    eprintln!("Training failed: {}", classify_train_error(&e));
                    ExitCode::FAILURE
                }
            });
        }
        Commands::Config { action } => {
            let store = store.context("no config directory available on this platform")?;
            match action {
                ConfigAction::Show => {
                    let base_url = resolve_api_base_url(cli.api_url.as_deref(), Some(&store));
                    println!("Config file: {}", store.config_file().display());
                    println!("Service URL: {}", base_url);
                }
                ConfigAction::SetUrl { url } => {
                    store.set_api_base_url(&url)?;
                    println!("Service URL set to {}", url.trim());
                }
            }
            return Ok(ExitCode::SUCCESS);
        }
    };

    let base_url = resolve_api_base_url(cli.api_url.as_deref(), store.as_ref());
    let client = build_client(&base_url, store.as_ref())?;
    let lifecycle = RequestLifecycle::new(client);

    let state = lifecycle.submit_and_wait(mode, content).await;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&state)?),
        OutputFormat::Human => match &state {
            RequestState::Failed(err) => eprintln!("{}", err),
            other => print!("{}", render_state(other)),
        },
    }

    Ok(match state {
        RequestState::Succeeded(_) => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    })
}

/// Human-readable rendering of a request state.
pub fn render_state(state: &RequestState) -> String {
    match state {
        RequestState::Idle => "Ready.\n".to_string(),
        RequestState::Validating => "Checking input...\n".to_string(),
        RequestState::InFlight => "Analyzing...\n".to_string(),
        RequestState::Failed(err) => format!("Error: {}\n", err),
        RequestState::Succeeded(done) => render_analysis(done),
    }
}

fn render_analysis(done: &CompletedAnalysis) -> String {
    let d = &done.display;
    let mut out = String::new();
    let _ = writeln!(out, "{}", d.verdict);
    let _ = writeln!(out, "Confidence: {}% probability of being fake", d.confidence_percent);
    let _ = writeln!(out);
    let _ = writeln!(out, "Polarity:     {} ({} sentiment)", d.polarity, d.sentiment_class);
    let _ = writeln!(out, "Subjectivity: {} ({})", d.subjectivity, d.subjectivity_class);

    if !done.corroboration.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Related Sources ({})", done.corroboration.len());
        for (i, item) in done.corroboration.iter().enumerate() {
            let _ = writeln!(out, "  {}. {}", i + 1, item.title.as_deref().unwrap_or("(untitled)"));
            if let Some(link) = &item.link {
                let _ = writeln!(out, "     {}", link);
            }
            if let Some(snippet) = &item.snippet {
                let _ = writeln!(out, "     {}", snippet);
            }
        }
    }
    out
}
