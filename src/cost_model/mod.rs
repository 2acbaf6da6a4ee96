// src/cost_model/mod.rs

//! The cost model seam.
//!
//! A cost model is bound to one [`Problem`](crate::problem::Problem) and is
//! shared read-only by every worker, so implementations must be `Sync` and
//! keep no mutable state of their own. Anything a sampler has to mutate (its
//! random stream) lives in the [`Worker`] context the dispatcher hands to each
//! thread.

pub mod analytic;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CostModelError;

pub use analytic::AnalyticCostModel;

/// Which cost the model reports.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Every cost component, unreduced.
    #[default]
    Raw,
    /// Energy-delay product, a single component.
    Edp,
}

/// Explicit worker identity assigned by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(pub usize);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker-{}", self.0)
    }
}

/// Per-worker sampling state.
pub struct Worker {
    id: WorkerId,
    rng: StdRng,
}

impl Worker {
    pub fn new(id: WorkerId, seed: u64) -> Self {
        Self {
            id,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Restarts the random stream from `seed`.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }
}

/// Cost-model operations the generator depends on.
pub trait CostModel: Sync {
    /// A candidate solution. Opaque to the pipeline.
    type Mapping;

    /// Best achievable cost for the bound problem.
    fn oracle_cost(&self, metric: Metric) -> Result<Vec<f64>, CostModelError>;

    /// Samples one mapping and evaluates it. May fail for candidates that
    /// cannot be mapped; callers are expected to retry.
    fn map_cost(
        &self,
        metric: Metric,
        worker: &mut Worker,
    ) -> Result<(Self::Mapping, Vec<f64>), CostModelError>;

    /// Encodes a mapping as a fixed-length network input.
    fn input_vector(&self, mapping: &Self::Mapping) -> Vec<f32>;
}
