// src/record.rs

//! Training records and oracle-relative cost normalization.

use serde::{Deserialize, Serialize};

use crate::cost_model::CostModel;
use crate::error::{DataGenError, Result};

/// Oracle cost vector. Every component is finite and strictly positive.
#[derive(Debug, Clone, PartialEq)]
pub struct OracleCost(Vec<f64>);

impl OracleCost {
    /// Validates a cost vector reported by a cost model's oracle.
    pub fn new(components: Vec<f64>) -> Result<Self> {
        check_denominators(&components)?;
        Ok(OracleCost(components))
    }

    pub fn components(&self) -> &[f64] {
        &self.0
    }
}

/// One `(input, normalized cost)` training pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub input: Vec<f32>,
    pub cost: Vec<f64>,
}

fn check_denominators(oracle: &[f64]) -> Result<()> {
    match oracle
        .iter()
        .enumerate()
        .find(|(_, v)| !(v.is_finite() && **v > 0.0))
    {
        Some((index, &value)) => Err(DataGenError::InvalidOracle { index, value }),
        None => Ok(()),
    }
}

/// Divides `raw` by `oracle` component-wise.
///
/// Fails instead of producing an infinite or NaN component.
pub fn normalize_cost(raw: &[f64], oracle: &[f64]) -> Result<Vec<f64>> {
    if raw.len() != oracle.len() {
        return Err(DataGenError::CostLengthMismatch {
            expected: oracle.len(),
            actual: raw.len(),
        });
    }
    check_denominators(oracle)?;
    Ok(raw.iter().zip(oracle).map(|(r, o)| r / o).collect())
}

/// Turns sampled mappings into records against a fixed oracle.
pub struct RecordBuilder<'a, C: CostModel> {
    model: &'a C,
    oracle: &'a OracleCost,
}

impl<'a, C: CostModel> RecordBuilder<'a, C> {
    pub fn new(model: &'a C, oracle: &'a OracleCost) -> Self {
        Self { model, oracle }
    }

    pub fn build(&self, mapping: &C::Mapping, raw_cost: &[f64]) -> Result<Record> {
        let cost = normalize_cost(raw_cost, self.oracle.components())?;
        Ok(Record {
            input: self.model.input_vector(mapping),
            cost,
        })
    }
}
