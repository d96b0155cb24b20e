//! insight-extract: binary entrypoint
//! Reads an intelligence aggregate (and optional value-proposition context)
//! from JSON files, runs the extraction pipeline and prints the categorized
//! insights as JSON on stdout. Logs go to stderr.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use insight_extractor::insights::config::{load_config_default, load_config_from};
use insight_extractor::telemetry::Metrics;
use insight_extractor::{
    extract_with_fallback, Insight, InsightPipeline, IntelligenceAggregate,
    ValuePropositionContext,
};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Command-line arguments for insight-extract
#[derive(Parser, Debug)]
#[command(name = "insight-extract")]
#[command(about = "Extract categorized insights from a research aggregate")]
#[command(version)]
struct Args {
    /// Intelligence aggregate JSON file
    #[arg(short, long)]
    aggregate: Option<PathBuf>,

    /// Value-proposition context JSON file
    #[arg(short, long)]
    context: Option<PathBuf>,

    /// Config file (TOML or JSON); overrides INSIGHTS_CONFIG_PATH and config/insights.*
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log every progress callback
    #[arg(long)]
    progress: bool,

    /// Print the Prometheus exposition to stderr after the run
    #[arg(long)]
    metrics: bool,

    /// Emit logs as JSON lines
    #[arg(long, env = "INSIGHTS_JSON_LOGS")]
    json_logs: bool,
}

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("insights=info,warn"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {what} from {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {what} {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; INSIGHTS_CONFIG_PATH and RUST_LOG may come from there.
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    init_tracing(args.json_logs);

    let config = match &args.config {
        Some(p) => load_config_from(p)?,
        None => load_config_default()?,
    };
    let metrics = if args.metrics {
        Some(Metrics::init(&config)?)
    } else {
        None
    };

    let aggregate: Option<IntelligenceAggregate> = args
        .aggregate
        .as_deref()
        .map(|p| read_json(p, "aggregate"))
        .transpose()?;
    let context: Option<ValuePropositionContext> = args
        .context
        .as_deref()
        .map(|p| read_json(p, "value-proposition context"))
        .transpose()?;

    let pipeline = InsightPipeline::new(config.pipeline);
    let mut log_progress = |acc: &[Insight], label: &str| {
        info!(target: "insights", step = label, total = acc.len(), "progress");
    };
    let progress: Option<&mut (dyn FnMut(&[Insight], &str) + Send)> = if args.progress {
        Some(&mut log_progress)
    } else {
        None
    };

    let insights =
        extract_with_fallback(&pipeline, aggregate.as_ref(), context.as_ref(), progress).await;

    let out = serde_json::to_string_pretty(&insights).context("serializing insights")?;
    println!("{out}");

    if let Some(m) = metrics {
        eprintln!("{}", m.render());
    }
    Ok(())
}
