use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use assess_ai::config::AppConfig;
use assess_ai::consistency::ConsistencyChecker;
use assess_ai::error::AppError;
use assess_ai::evaluator::{HttpTransport, ResponseCache, TextEvaluator};
use assess_ai::risk::{self, RiskMetrics};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;

use crate::server;

#[derive(Parser, Debug)]
#[command(
    name = "Institutional Assessment Platform",
    about = "Score institutional self-assessments and run consistency and risk analysis",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Check a JSON file of responses for cross-item contradictions
    Consistency(ConsistencyArgs),
    /// Compute a rule-based risk prediction from a JSON metrics file
    Risk(RiskArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug)]
pub(crate) struct ConsistencyArgs {
    /// Path to a JSON object mapping item codes to raw answer values
    #[arg(long)]
    file: PathBuf,
    /// Also run the model-assisted pass (needs evaluator credentials)
    #[arg(long)]
    use_ai: bool,
}

#[derive(Args, Debug)]
pub(crate) struct RiskArgs {
    /// Path to a JSON object of assessment metrics
    #[arg(long)]
    file: PathBuf,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Consistency(args) => run_consistency(args).await,
        Command::Risk(args) => run_risk(args),
    }
}

async fn run_consistency(args: ConsistencyArgs) -> Result<(), AppError> {
    let raw = std::fs::read_to_string(&args.file)?;
    let responses: BTreeMap<String, Value> = serde_json::from_str(&raw)
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;

    let config = AppConfig::load()?.evaluator;
    let transport = HttpTransport::new(&config)?;
    let evaluator = Arc::new(TextEvaluator::new(
        Arc::new(transport),
        ResponseCache::new(config.cache_ttl),
    ));

    let report = ConsistencyChecker::new(evaluator, config.model)
        .check(&responses, args.use_ai)
        .await;

    println!("{}", render_json(&report)?);
    Ok(())
}

fn run_risk(args: RiskArgs) -> Result<(), AppError> {
    let raw = std::fs::read_to_string(&args.file)?;
    let metrics: RiskMetrics = serde_json::from_str(&raw)
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;

    let prediction = risk::predict(&metrics);
    println!("{}", render_json(&prediction)?);
    Ok(())
}

fn render_json<T: serde::Serialize>(value: &T) -> Result<String, AppError> {
    serde_json::to_string_pretty(value)
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err).into())
}
