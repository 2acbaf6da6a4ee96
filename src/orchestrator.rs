// src/orchestrator.rs
//! Owns the lifecycle of one generation run: problem draw, oracle cost,
//! output directory, parallel dispatch of batches and the final problem log.
//!
//! A run is a straight line with no resumption. Rerunning without a fixed
//! seed draws a different problem; the seed in use is logged so any run can
//! be reproduced.

use std::fs;

use crate::batch::{BatchReport, BatchWriter};
use crate::config::Config;
use crate::cost_model::{AnalyticCostModel, CostModel, Worker};
use crate::dispatch::dispatch;
use crate::error::{DataGenError, Result};
use crate::problem::{Problem, ProblemGenerator, RandomProblemGenerator};
use crate::record::OracleCost;

/// Totals of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub seed: u64,
    pub files: usize,
    pub records: usize,
    pub sample_failures: usize,
}

pub struct RunOrchestrator<C: CostModel> {
    config: Config,
    seed: u64,
    problem: Problem,
    model: C,
}

impl RunOrchestrator<AnalyticCostModel> {
    /// Validates `config`, resolves the seed and draws a random problem for
    /// the analytic cost model.
    pub fn from_config(config: Config) -> Result<Self> {
        config.validate()?;
        let seed = config.seed.unwrap_or_else(rand::random);
        let mut generator = RandomProblemGenerator::new(seed);
        Ok(Self::new(config, seed, &mut generator, |problem| {
            AnalyticCostModel::new(*problem)
        }))
    }
}

impl<C: CostModel> RunOrchestrator<C> {
    /// Draws the run's single problem and binds a cost model to it.
    pub fn new<G, F>(config: Config, seed: u64, generator: &mut G, build_model: F) -> Self
    where
        G: ProblemGenerator + ?Sized,
        F: FnOnce(&Problem) -> C,
    {
        let problem = generator.generate();
        log::info!("Drew problem (seed {}): {}", seed, problem.to_string().trim_end());
        let model = build_model(&problem);
        RunOrchestrator {
            config,
            seed,
            problem,
            model,
        }
    }

    pub fn problem(&self) -> &Problem {
        &self.problem
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn run(&self) -> Result<RunSummary> {
        let config = &self.config;
        log::info!(
            "We will run 1 problem, with {} mappings in it ({} files x {} records).",
            config.samples_per_problem(),
            config.num_files,
            config.samples_per_file
        );

        let oracle = self
            .model
            .oracle_cost(config.metric)
            .map_err(DataGenError::OracleUnavailable)
            .and_then(OracleCost::new)?;
        log::info!("Oracle cost ({:?}): {:?}", config.metric, oracle.components());

        if !config.output_dir.is_dir() {
            log::info!("Creating the dataset path at {}", config.output_dir.display());
        }
        fs::create_dir_all(&config.output_dir)
            .map_err(|e| DataGenError::io(&config.output_dir, e))?;

        let writer = BatchWriter::new(
            &self.model,
            &oracle,
            config.metric,
            &config.output_dir,
            config.samples_per_file,
            self.seed,
        );
        let reports: Vec<BatchReport> =
            dispatch(config.num_files, config.concurrency, |worker_id, index| {
                let mut worker = Worker::new(worker_id, self.seed);
                writer.write_batch(index, &mut worker)
            })?;

        let log_path = config.problem_log_path();
        fs::write(&log_path, self.problem.to_string())
            .map_err(|e| DataGenError::io(&log_path, e))?;

        let summary = RunSummary {
            seed: self.seed,
            files: reports.len(),
            records: reports.iter().map(|r| r.records).sum(),
            sample_failures: reports.iter().map(|r| r.sample_failures).sum(),
        };
        log::info!(
            "All done: {} files, {} records, {} failed samples retried. Problem written to {}",
            summary.files,
            summary.records,
            summary.sample_failures,
            log_path.display()
        );
        Ok(summary)
    }
}
