// src/main.rs

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use log::{error, info};

use mapping_datagen::{config::Config, cost_model::Metric, orchestrator::RunOrchestrator};

/// Generate surrogate cost-model training data for one random mapping problem.
#[derive(Parser, Debug)]
#[command(name = "mapping-datagen")]
#[command(about = "Sample mappings, normalize their cost by the oracle and write dataset files")]
struct Args {
    /// JSON configuration file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output directory for data_{i}.jsonl files and problem.log
    #[arg(short, long)]
    path: Option<PathBuf>,

    /// Number of dataset files
    #[arg(short = 'n', long)]
    num_files: Option<usize>,

    /// Records per dataset file
    #[arg(short, long)]
    samples_per_file: Option<usize>,

    /// Records expected for the problem (informational)
    #[arg(long)]
    samples_per_problem: Option<usize>,

    /// Worker threads (default: available parallelism)
    #[arg(short = 'j', long)]
    concurrency: Option<usize>,

    /// Seed for the problem draw and sampling (default: random)
    #[arg(long)]
    seed: Option<u64>,

    /// Cost metric: raw or edp
    #[arg(long, value_parser = parse_metric)]
    metric: Option<Metric>,
}

fn parse_metric(s: &str) -> Result<Metric, String> {
    match s.to_ascii_lowercase().as_str() {
        "raw" => Ok(Metric::Raw),
        "edp" => Ok(Metric::Edp),
        other => Err(format!("unknown metric '{}', expected raw or edp", other)),
    }
}

impl Args {
    fn into_config(self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => Config::default(),
        };
        if let Some(path) = self.path {
            config.output_dir = path;
        }
        if let Some(n) = self.num_files {
            config.num_files = n;
        }
        if let Some(n) = self.samples_per_file {
            config.samples_per_file = n;
        }
        if self.samples_per_problem.is_some() {
            config.samples_per_problem = self.samples_per_problem;
        }
        if self.concurrency.is_some() {
            config.concurrency = self.concurrency;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if let Some(metric) = self.metric {
            config.metric = metric;
        }
        Ok(config)
    }
}

/// Main entry point for `mapping-datagen`.
fn main() -> anyhow::Result<()> {
    // Default filter is "info" if RUST_LOG is not set.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    let config = Args::parse().into_config()?;
    info!("Configuration: {:?}", config);

    let orchestrator =
        RunOrchestrator::from_config(config).context("Failed to set up the generation run")?;
    info!(
        "Using seed {} (pass --seed {} to reproduce this problem)",
        orchestrator.seed(),
        orchestrator.seed()
    );

    match orchestrator.run() {
        Ok(summary) => {
            info!(
                "Generated {} records in {} files.",
                summary.records, summary.files
            );
            Ok(())
        }
        Err(e) => {
            error!("Generation run failed: {}", e);
            Err(e).context("Generation run failed")
        }
    }
}
