// src/config.rs

//! Defines the configuration for a data generation run.
//!
//! The struct can be deserialized from a JSON file and is then overridden by
//! command-line flags. Default values match a small local run: a handful of
//! files with a few hundred records each, written under `data/unprocessed`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::cost_model::Metric;
use crate::error::{DataGenError, Result};

/// Name of the problem dump written next to the dataset files.
pub const PROBLEM_LOG_FILE: &str = "problem.log";

/// Represents the complete configuration of a generation run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)] // Missing fields fall back to `Config::default()`.
pub struct Config {
    /// Directory receiving `data_{i}.jsonl` files and `problem.log`.
    pub output_dir: PathBuf,
    /// Number of dataset files to produce.
    pub num_files: usize,
    /// Records per dataset file.
    pub samples_per_file: usize,
    /// Records expected for the problem. Informational only; defaults to
    /// `num_files * samples_per_file`.
    pub samples_per_problem: Option<usize>,
    /// Worker count. `None` uses the host's available parallelism.
    pub concurrency: Option<usize>,
    /// Seed for the problem draw and all sampling streams.
    /// `None` draws a fresh seed, so reruns see a different problem.
    pub seed: Option<u64>,
    /// Cost metric requested from the cost model.
    pub metric: Metric,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            output_dir: PathBuf::from("data/unprocessed"),
            num_files: 8,
            samples_per_file: 500,
            samples_per_problem: None,
            concurrency: None,
            seed: None,
            metric: Metric::Raw,
        }
    }
}

impl Config {
    /// Loads a configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| DataGenError::io(path, e))?;
        serde_json::from_str(&text).map_err(|e| {
            DataGenError::InvalidConfig(format!("{}: {}", path.display(), e))
        })
    }

    /// Rejects configurations that cannot produce a dataset.
    pub fn validate(&self) -> Result<()> {
        if self.num_files == 0 {
            return Err(DataGenError::InvalidConfig(
                "num_files must be at least 1".to_string(),
            ));
        }
        if self.samples_per_file == 0 {
            return Err(DataGenError::InvalidConfig(
                "samples_per_file must be at least 1".to_string(),
            ));
        }
        if self.concurrency == Some(0) {
            return Err(DataGenError::InvalidConfig(
                "concurrency must be at least 1 when given".to_string(),
            ));
        }
        Ok(())
    }

    /// Total records a run will write.
    pub fn total_samples(&self) -> usize {
        self.num_files * self.samples_per_file
    }

    /// The advertised records-per-problem figure.
    ///
    /// This is never enforced; a value that disagrees with
    /// `num_files * samples_per_file` only produces a warning.
    pub fn samples_per_problem(&self) -> usize {
        let total = self.total_samples();
        match self.samples_per_problem {
            Some(n) if n != total => {
                log::warn!(
                    "samples_per_problem={} does not match num_files * samples_per_file = {}; \
                     the file layout wins",
                    n,
                    total
                );
                n
            }
            Some(n) => n,
            None => total,
        }
    }

    pub fn problem_log_path(&self) -> PathBuf {
        self.output_dir.join(PROBLEM_LOG_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::io::Write;
    use test_log::test;

    #[test]
    fn it_should_provide_a_valid_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.metric, Metric::Raw);
        assert_eq!(config.samples_per_problem(), config.total_samples());
    }

    #[test]
    fn it_should_reject_zero_counts() {
        let config = Config {
            num_files: 0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(DataGenError::InvalidConfig(_))));

        let config = Config {
            samples_per_file: 0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(DataGenError::InvalidConfig(_))));

        let config = Config {
            concurrency: Some(0),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(DataGenError::InvalidConfig(_))));
    }

    #[test]
    fn it_should_keep_a_mismatching_samples_per_problem_without_enforcing_it() {
        let config = Config {
            num_files: 3,
            samples_per_file: 5,
            samples_per_problem: Some(100),
            ..Config::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.samples_per_problem(), 100);
        assert_eq!(config.total_samples(), 15);
    }

    #[test]
    fn it_should_load_partial_json_with_defaults() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(
            file,
            r#"{{ "output_dir": "out", "num_files": 3, "metric": "edp" }}"#
        )?;

        let config = Config::load(file.path())?;
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.num_files, 3);
        assert_eq!(config.metric, Metric::Edp);
        assert_eq!(config.samples_per_file, Config::default().samples_per_file);
        Ok(())
    }

    #[test]
    fn it_should_report_malformed_json_as_invalid_config() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(file, "{{ not json")?;

        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, DataGenError::InvalidConfig(_)));
        Ok(())
    }
}
