// src/error.rs

//! Error types for the data generation pipeline.
//!
//! `CostModelError` is the recoverable class: the resilient sampler absorbs it
//! and retries. Everything in `DataGenError` surfaces to the caller.

use std::path::PathBuf;
use thiserror::Error;

/// A failure reported by a cost model while sampling or evaluating a mapping.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CostModelError {
    #[error("Unmappable candidate: {0}")]
    Unmappable(String),
    #[error("Evaluation failed: {0}")]
    Evaluation(String),
}

#[derive(Error, Debug)]
pub enum DataGenError {
    #[error("Invalid oracle cost at component {index}: {value} (must be finite and > 0)")]
    InvalidOracle { index: usize, value: f64 },
    #[error("Cost vector has {actual} components, oracle has {expected}")]
    CostLengthMismatch { expected: usize, actual: usize },
    #[error("Oracle cost could not be computed: {0}")]
    OracleUnavailable(#[source] CostModelError),
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to serialize records for {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to spawn worker {worker}: {source}")]
    WorkerSpawn {
        worker: usize,
        #[source]
        source: std::io::Error,
    },
    #[error("Worker {0} panicked")]
    WorkerPanicked(usize),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl DataGenError {
    /// Wraps an I/O error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DataGenError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, DataGenError>;
