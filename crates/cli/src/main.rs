//! evalqc CLI - evaluation quality control and analytics.

use std::path::PathBuf;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use evalqc_analytics::{AnalyticsService, ComparisonRequest, EngineConfig, Timeframe};
use evalqc_core::{ContentId, CriterionId, Domain, EvaluatorId};
use evalqc_quality::EvaluatorScope;
use evalqc_storage::JsonStore;
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "evalqc")]
#[command(about = "Quality control and analytics for human evaluations of AI content", long_about = None)]
struct Cli {
    /// Store directory
    #[arg(long, default_value = ".evalqc")]
    store: PathBuf,

    /// JSON file with threshold overrides
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List quality flags for every evaluation
    Flags,
    /// Reliability and scoring patterns of one evaluator
    Evaluator {
        /// Evaluator ID
        id: String,
        /// Only evaluations in this domain
        #[arg(long)]
        domain: Option<String>,
    },
    /// Inter-rater agreement on one content item
    Agreement {
        /// Content ID
        content_id: String,
    },
    /// Aggregate trusted scores for a domain
    Aggregate {
        /// Domain slug, e.g. creative_writing
        #[arg(long)]
        domain: String,
        /// Only this model (human baseline is always included)
        #[arg(long)]
        model: Option<String>,
    },
    /// Compare models
    Compare {
        /// Models to compare (repeatable)
        #[arg(long = "model")]
        models: Vec<String>,
        /// Domains to include (repeatable)
        #[arg(long = "domain")]
        domains: Vec<String>,
        /// Criteria to include (repeatable)
        #[arg(long = "criterion")]
        criteria: Vec<String>,
        /// last_7_days, last_30_days, last_90_days, last_year or all_time
        #[arg(long, default_value = "last_30_days")]
        timeframe: String,
    },
    /// Human-AI gap report
    Gaps {
        /// Domains to include (repeatable)
        #[arg(long = "domain")]
        domains: Vec<String>,
    },
    /// Ranked improvement suggestions
    Suggest {
        /// Only this model
        #[arg(long)]
        model: Option<String>,
        /// Measure against this model instead of human content
        #[arg(long)]
        benchmark: Option<String>,
    },
    /// Full report
    Report,
}

#[derive(Serialize)]
struct EvaluatorOutput {
    reliability: evalqc_quality::EvaluatorReport,
    patterns: evalqc_quality::PatternReport,
}

fn init_logging() {
    // stdout carries the JSON output
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn load_config(path: Option<&PathBuf>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading config {}", path.display()))?;
    let config = EngineConfig::from_json(&json)
        .with_context(|| format!("parsing config {}", path.display()))?;
    debug!("Loaded config from {}", path.display());
    Ok(config)
}

fn render<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", render(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref()).await?;
    let store = JsonStore::new(&cli.store)
        .await
        .with_context(|| format!("opening store {}", cli.store.display()))?;
    info!("Using store at {}", cli.store.display());
    let service = AnalyticsService::new(store).with_config(config);

    match cli.command {
        Commands::Flags => {
            print_json(&service.quality_report().await?)?;
        }
        Commands::Evaluator { id, domain } => {
            let evaluator = EvaluatorId::new(id);
            let scope = EvaluatorScope {
                domain: domain.map(Domain::from),
                ..Default::default()
            };
            let output = EvaluatorOutput {
                reliability: service.evaluator_report(&evaluator, &scope).await?,
                patterns: service.pattern_report(&evaluator, &scope).await?,
            };
            print_json(&output)?;
        }
        Commands::Agreement { content_id } => {
            let content: ContentId = content_id
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid content ID: {content_id}"))?;
            let report = service.inter_rater_agreement(&content).await?;
            if report.is_none() {
                info!("Fewer than two evaluators rated {}", content);
            }
            print_json(&report)?;
        }
        Commands::Aggregate { domain, model } => {
            let scores = service.aggregate(&Domain::from(domain), model.as_deref()).await?;
            print_json(&scores)?;
        }
        Commands::Compare { models, domains, criteria, timeframe } => {
            let timeframe: Timeframe = timeframe.parse().map_err(anyhow::Error::msg)?;
            let request = ComparisonRequest {
                models,
                domains: domains.into_iter().map(Domain::from).collect(),
                criteria: criteria.into_iter().map(CriterionId::new).collect(),
                timeframe,
                now: None,
            };
            print_json(&service.comparison_report(&request).await?)?;
        }
        Commands::Gaps { domains } => {
            let domains: Vec<Domain> = domains.into_iter().map(Domain::from).collect();
            print_json(&service.gaps_report(&domains).await?)?;
        }
        Commands::Suggest { model, benchmark } => {
            let report = service.suggestions_report(model.as_deref(), benchmark.as_deref()).await?;
            print_json(&report)?;
        }
        Commands::Report => {
            print_json(&service.full_report().await?)?;
        }
    }

    Ok(())
}
