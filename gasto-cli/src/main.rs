use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use gasto_core::{ExpenseRecord, PipelineError, RawMessage, SystemClock};
use gasto_pipeline::{CategoryClassifier, ExpensePipeline};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

mod config;
mod dispatch;
mod llm;
mod state;

use config::Config;
use llm::LlmClassifier;

const LONG_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GASTO_BUILD_SHA"), ")");

#[derive(Parser, Debug)]
#[command(
    name = "gasto",
    version,
    long_version = LONG_VERSION,
    about = "Turn free-text expense messages into categorized records"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Process one message and print the record as JSON
    Parse {
        text: String,

        /// Sender identifier attached to the record
        #[arg(long)]
        user: Option<String>,

        /// POST the record to this URL (overrides webhook.url in config)
        #[arg(long)]
        webhook: Option<String>,
    },

    /// Process a CSV of `text,user_id` rows, one JSON line per record
    Batch {
        #[arg(long)]
        csv: PathBuf,
    },

    /// Process a message and learn its merchant into a category
    Learn {
        text: String,

        #[arg(long)]
        category: String,
    },

    /// List categories and their keywords
    Categories,

    /// Configuration file helpers
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write the default config to ~/.gasto/config.toml
    Init,
}

#[derive(Debug, Deserialize)]
struct BatchRow {
    text: String,
    #[serde(default)]
    user_id: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Parse { text, user, webhook } => {
            let cfg = config::load_config()?;
            let (pipeline, _) = build_pipeline(&cfg)?;

            let mut message = RawMessage::new(text);
            if let Some(user) = user {
                message = message.with_user(user);
            }

            let record = match pipeline.process(&message) {
                Ok(record) => record,
                Err(err) => reject(&err),
            };
            println!("{}", serde_json::to_string_pretty(&record)?);
            eprintln!("{}", record.summary());

            if let Some(url) = webhook.or(cfg.webhook.url.clone()) {
                if let Err(e) = dispatch::post_record(&url, &record, cfg.webhook.timeout()).await {
                    eprintln!("Webhook failed: {e:#}");
                }
            }
        }

        Command::Batch { csv } => {
            let cfg = config::load_config()?;
            let (pipeline, _) = build_pipeline(&cfg)?;
            run_batch(&pipeline, &cfg, &csv).await?;
        }

        Command::Learn { text, category } => {
            let cfg = config::load_config()?;
            let (pipeline, keywords_path) = build_pipeline(&cfg)?;

            let record = match pipeline.process(&RawMessage::new(text)) {
                Ok(record) => record,
                Err(err) => reject(&err),
            };
            let added = pipeline
                .learn(&record, &category)
                .with_context(|| format!("learn {:?}", record.merchant))?;

            if added {
                state::save_keyword_table(&keywords_path, pipeline.keyword_table())?;
                println!("Learned \"{}\" -> {}", record.merchant, category);
            } else if !record.has_merchant() {
                println!("Nothing learned: no merchant found in the message");
            } else {
                println!("\"{}\" already maps to {}", record.merchant, category);
            }
        }

        Command::Categories => {
            let table = state::load_keyword_table(&state::keywords_path()?)?;
            for entry in table.snapshot() {
                println!("{} ({})", entry.name, entry.keywords.len());
                if !entry.keywords.is_empty() {
                    println!("  {}", entry.keywords.join(", "));
                }
            }
        }

        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
        },
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Pipeline wired from config plus the persisted keyword table
fn build_pipeline(cfg: &Config) -> Result<(ExpensePipeline, PathBuf)> {
    let keywords_path = state::keywords_path()?;
    let table = Arc::new(state::load_keyword_table(&keywords_path)?);
    let clock = SystemClock::from_name(&cfg.pipeline.timezone)
        .with_context(|| format!("pipeline.timezone = {:?}", cfg.pipeline.timezone))?;

    let mut builder = ExpensePipeline::builder()
        .keyword_table(table)
        .clock(Arc::new(clock))
        .default_category(cfg.pipeline.default_category.clone())
        .date_precedence(cfg.pipeline.date_precedence)
        .model_timeout(cfg.llm.timeout());
    if let Some(roots) = &cfg.pipeline.income_roots {
        builder = builder.income_roots(roots.clone());
    }
    if let Some(classifier) = LlmClassifier::from_config(&cfg.llm)? {
        let classifier: Arc<dyn CategoryClassifier> = Arc::new(classifier);
        builder = builder.classifier(classifier);
    }

    Ok((builder.build()?, keywords_path))
}

fn reject(err: &PipelineError) -> ! {
    eprintln!("{err}");
    println!("{}", err.user_message());
    std::process::exit(2);
}

async fn run_batch(pipeline: &ExpensePipeline, cfg: &Config, path: &Path) -> Result<()> {
    if !path.exists() {
        bail!("CSV not found: {}", path.display());
    }
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("open {}", path.display()))?;

    let mut records: Vec<ExpenseRecord> = Vec::new();
    let mut rejected = 0usize;
    for (i, row) in reader.deserialize::<BatchRow>().enumerate() {
        let row = row.with_context(|| format!("{} row {}", path.display(), i + 1))?;
        let mut message = RawMessage::new(row.text);
        if let Some(user) = row.user_id.filter(|u| !u.is_empty()) {
            message = message.with_user(user);
        }

        match pipeline.process(&message) {
            Ok(record) => {
                println!("{}", serde_json::to_string(&record)?);
                if let Some(url) = &cfg.webhook.url {
                    if let Err(e) = dispatch::post_record(url, &record, cfg.webhook.timeout()).await {
                        warn!(row = i + 1, "webhook failed: {e:#}");
                    }
                }
                records.push(record);
            }
            Err(err) => {
                rejected += 1;
                eprintln!("row {}: {err}", i + 1);
            }
        }
    }

    eprintln!("{}", batch_summary(&records, rejected));
    Ok(())
}

fn batch_summary(records: &[ExpenseRecord], rejected: usize) -> String {
    let mut by_source: BTreeMap<&str, usize> = BTreeMap::new();
    for r in records {
        let source = r.category_source.map(|s| s.as_str()).unwrap_or("none");
        *by_source.entry(source).or_default() += 1;
    }
    let sources = by_source
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(" ");
    let income = records.iter().filter(|r| r.is_income()).count();
    format!(
        "Processed {} messages: {} records ({} income), {} rejected | {}",
        records.len() + rejected,
        records.len(),
        income,
        rejected,
        sources
    )
}
