// src/testing.rs

//! Deterministic cost models for tests.

use rand::Rng;

use crate::cost_model::{CostModel, Metric, Worker};
use crate::error::CostModelError;

/// Draws a value from the worker's stream and rejects multiples of three.
///
/// The raw cost is `[2x, x]` against an oracle of `[2, 1]`, so every
/// normalized record reads `[x, x]` with input `[x]`.
pub struct SequenceModel;

impl CostModel for SequenceModel {
    type Mapping = u32;

    fn oracle_cost(&self, _metric: Metric) -> Result<Vec<f64>, CostModelError> {
        Ok(vec![2.0, 1.0])
    }

    fn map_cost(
        &self,
        _metric: Metric,
        worker: &mut Worker,
    ) -> Result<(u32, Vec<f64>), CostModelError> {
        let x: u32 = worker.rng().gen_range(1..1000);
        if x % 3 == 0 {
            return Err(CostModelError::Unmappable(format!("{} is a multiple of three", x)));
        }
        Ok((x, vec![2.0 * x as f64, x as f64]))
    }

    fn input_vector(&self, mapping: &u32) -> Vec<f32> {
        vec![*mapping as f32]
    }
}

/// Reports a zero oracle component.
pub struct ZeroOracleModel;

impl CostModel for ZeroOracleModel {
    type Mapping = ();

    fn oracle_cost(&self, _metric: Metric) -> Result<Vec<f64>, CostModelError> {
        Ok(vec![1.0, 0.0])
    }

    fn map_cost(
        &self,
        _metric: Metric,
        _worker: &mut Worker,
    ) -> Result<((), Vec<f64>), CostModelError> {
        Ok(((), vec![1.0, 1.0]))
    }

    fn input_vector(&self, _mapping: &()) -> Vec<f32> {
        Vec::new()
    }
}
