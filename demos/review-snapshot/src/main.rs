//! Reviews one certificate request against a snapshot file and prints the
//! verdict as JSON.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use approver_policy::config::{ApproverConfig, LogFormat};
use approver_policy::prelude::*;
use approver_policy::telemetry::init_tracing;
use clap::Parser;
use tracing::{debug, info};

#[derive(Debug, Parser)]
#[command(name = "review-snapshot", about = "Review a certificate request offline")]
struct Cli {
    /// Snapshot holding policies, RBAC objects and namespaces.
    #[arg(long)]
    snapshot: PathBuf,

    /// Certificate request to review, as JSON.
    #[arg(long)]
    request: PathBuf,

    /// Optional configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Deny a policy with a reason, as `policy=reason`. Repeatable.
    #[arg(long = "deny", value_name = "POLICY=REASON")]
    denials: Vec<String>,

    /// Override the configured log format.
    #[arg(long)]
    log_format: Option<LogFormat>,
}

fn parse_denials(raw: &[String]) -> Result<BTreeMap<String, String>> {
    raw.iter()
        .map(|entry| match entry.split_once('=') {
            Some((policy, reason)) if !policy.is_empty() => {
                Ok((policy.to_owned(), reason.to_owned()))
            }
            _ => bail!("invalid --deny value `{entry}`, expected POLICY=REASON"),
        })
        .collect()
}

fn load_config(cli: &Cli) -> Result<ApproverConfig> {
    let mut config = match &cli.config {
        Some(path) => ApproverConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ApproverConfig::default(),
    };
    config.apply_env_overrides()?;
    if let Some(format) = cli.log_format {
        config.log.format = format;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_tracing(&config.log)?;

    let snapshot = Snapshot::load(&cli.snapshot)
        .await
        .with_context(|| format!("loading snapshot {}", cli.snapshot.display()))?;
    let raw_request = tokio::fs::read_to_string(&cli.request)
        .await
        .with_context(|| format!("reading request {}", cli.request.display()))?;
    let request: CertificateRequest =
        serde_json::from_str(&raw_request).context("decoding certificate request")?;

    let denials = parse_denials(&cli.denials)?;
    debug!(denied = denials.len(), "configured denials");
    let evaluator = FnEvaluator::new("cli-denials", move |policy, _request| {
        Ok(match denials.get(policy.name()) {
            Some(reason) => EvaluationResponse::denied(reason.clone()),
            None => EvaluationResponse::not_denied(""),
        })
    });

    let store = Arc::new(InMemoryStore::from_snapshot(snapshot)?);
    info!(stats = ?store.stats().await, "snapshot loaded");

    let manager = ReviewManager::from_config(&config.review, store)
        .evaluator(Arc::new(evaluator))
        .build()?;
    let response = manager.review(&request).await?;

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
