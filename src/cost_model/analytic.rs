// src/cost_model/analytic.rs

//! A closed-form cost model for a convolution mapped onto a PE array.
//!
//! The memory hierarchy has four tiling levels, innermost first: per-PE
//! registers, the spatial fan-out across PEs, the global buffer and DRAM.
//! A mapping assigns every loop dimension one factor per level (their product
//! is the dimension's bound) plus a loop order for the temporal levels.
//!
//! Costs follow the usual reuse argument: a tensor tile is refetched once per
//! iteration of the outer loops up to the innermost loop that indexes it.
//! Loops inside that point reuse the resident tile.

use rand::seq::SliceRandom;
use rand::Rng;

use super::{CostModel, Metric, Worker};
use crate::error::CostModelError;
use crate::problem::{dim, Problem, NUM_DIMS};

/// Tiling levels, innermost first.
pub const NUM_LEVELS: usize = 4;
pub const LEVEL_REGISTER: usize = 0;
pub const LEVEL_SPATIAL: usize = 1;
pub const LEVEL_BUFFER: usize = 2;
pub const LEVEL_DRAM: usize = 3;

/// Components of a `Metric::Raw` cost vector.
pub const RAW_COMPONENTS: [&str; 4] = ["energy_pj", "cycles", "dram_accesses", "buffer_accesses"];

/// Length of [`AnalyticCostModel::input_vector`] output:
/// bounds, per-level factors, loop order and hardware resources.
pub const INPUT_DIM: usize = NUM_DIMS + NUM_DIMS * NUM_LEVELS + NUM_DIMS + 3;

// Energy per word access / per MAC, normalized to a register access.
const DRAM_ENERGY: f64 = 200.0;
const BUFFER_ENERGY: f64 = 6.0;
const REGISTER_ENERGY: f64 = 1.0;
const MAC_ENERGY: f64 = 1.0;

/// DRAM words deliverable per cycle.
const DRAM_WORDS_PER_CYCLE: f64 = 4.0;

const MAX_REGISTER_FACTOR: u32 = 2;
const MAX_SPATIAL_FACTOR: u32 = 16;

/// Scale for log2-encoded quantities in the input vector.
const LOG2_SCALE: f32 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tensor {
    Weights,
    Inputs,
    Outputs,
}

const TENSORS: [Tensor; 3] = [Tensor::Weights, Tensor::Inputs, Tensor::Outputs];

impl Tensor {
    fn indexed_by(self, d: usize) -> bool {
        match self {
            Tensor::Weights => matches!(d, dim::K | dim::C | dim::R | dim::S),
            // R and S index inputs through the sliding window.
            Tensor::Inputs => d != dim::K,
            Tensor::Outputs => matches!(d, dim::N | dim::K | dim::P | dim::Q),
        }
    }

    fn footprint(self, tile: &[u32; NUM_DIMS]) -> u64 {
        let t = |d: usize| tile[d] as u64;
        match self {
            Tensor::Weights => t(dim::K) * t(dim::C) * t(dim::R) * t(dim::S),
            Tensor::Inputs => {
                t(dim::N) * t(dim::C) * (t(dim::P) + t(dim::R) - 1) * (t(dim::Q) + t(dim::S) - 1)
            }
            Tensor::Outputs => t(dim::N) * t(dim::K) * t(dim::P) * t(dim::Q),
        }
    }
}

/// Tile factors per dimension and level plus the temporal loop order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    /// `factors[d][level]`; the product over levels equals bound `d`.
    pub factors: [[u32; NUM_LEVELS]; NUM_DIMS],
    /// Temporal loop order, outermost first. A permutation of `0..NUM_DIMS`.
    pub order: [usize; NUM_DIMS],
}

impl Mapping {
    /// Cumulative tile size of each dimension up to and including `level`.
    pub fn tile(&self, level: usize) -> [u32; NUM_DIMS] {
        let mut tile = [1u32; NUM_DIMS];
        for (d, factors) in self.factors.iter().enumerate() {
            tile[d] = factors[..=level].iter().product();
        }
        tile
    }

    pub fn spatial_fanout(&self) -> u64 {
        self.factors
            .iter()
            .map(|f| f[LEVEL_SPATIAL] as u64)
            .product()
    }
}

/// Per-component cost of one mapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostBreakdown {
    pub energy_pj: f64,
    pub cycles: f64,
    pub dram_accesses: f64,
    pub buffer_accesses: f64,
}

impl CostBreakdown {
    fn to_vector(self, metric: Metric) -> Vec<f64> {
        match metric {
            Metric::Raw => vec![
                self.energy_pj,
                self.cycles,
                self.dram_accesses,
                self.buffer_accesses,
            ],
            Metric::Edp => vec![self.energy_pj * self.cycles],
        }
    }
}

/// Cost model bound to a single problem.
#[derive(Debug, Clone)]
pub struct AnalyticCostModel {
    problem: Problem,
}

impl AnalyticCostModel {
    pub fn new(problem: Problem) -> Self {
        Self { problem }
    }

    pub fn problem(&self) -> &Problem {
        &self.problem
    }

    /// Draws a random factorization and loop order. The result may not fit
    /// the buffer or register capacities; see [`Self::check_fits`].
    pub fn sample_mapping<R: Rng + ?Sized>(&self, rng: &mut R) -> Mapping {
        let bounds = self.problem.layer.bounds();
        let mut factors = [[1u32; NUM_LEVELS]; NUM_DIMS];
        // Spatial factors never exceed the PE array; storage may still overflow.
        let mut pe_budget = self.problem.hardware.num_pes;
        for (d, &bound) in bounds.iter().enumerate() {
            let mut remaining = bound;
            let register = pick_divisor(remaining, MAX_REGISTER_FACTOR, rng);
            remaining /= register;
            let spatial = pick_divisor(remaining, MAX_SPATIAL_FACTOR.min(pe_budget), rng);
            remaining /= spatial;
            pe_budget /= spatial;
            let buffer = pick_divisor(remaining, remaining, rng);
            remaining /= buffer;
            factors[d] = [register, spatial, buffer, remaining];
        }

        let mut order = [0usize; NUM_DIMS];
        for (i, slot) in order.iter_mut().enumerate() {
            *slot = i;
        }
        order.shuffle(rng);

        Mapping { factors, order }
    }

    /// Checks that a mapping respects PE count and storage capacities.
    pub fn check_fits(&self, mapping: &Mapping) -> Result<(), CostModelError> {
        let hw = &self.problem.hardware;

        let fanout = mapping.spatial_fanout();
        if fanout > hw.num_pes as u64 {
            return Err(CostModelError::Unmappable(format!(
                "spatial fan-out {} exceeds {} PEs",
                fanout, hw.num_pes
            )));
        }

        let register_tile = mapping.tile(LEVEL_REGISTER);
        let register_words: u64 = TENSORS.iter().map(|t| t.footprint(&register_tile)).sum();
        if register_words > hw.register_words {
            return Err(CostModelError::Unmappable(format!(
                "register tile needs {} words, capacity is {}",
                register_words, hw.register_words
            )));
        }

        let buffer_tile = mapping.tile(LEVEL_BUFFER);
        let buffer_words: u64 = TENSORS.iter().map(|t| t.footprint(&buffer_tile)).sum();
        if buffer_words > hw.buffer_words {
            return Err(CostModelError::Unmappable(format!(
                "buffer tile needs {} words, capacity is {}",
                buffer_words, hw.buffer_words
            )));
        }

        Ok(())
    }

    /// Evaluates a mapping that already passed [`Self::check_fits`].
    pub fn evaluate(&self, mapping: &Mapping) -> CostBreakdown {
        let macs = self.problem.layer.macs() as f64;

        let buffer_tile = mapping.tile(LEVEL_BUFFER);
        let dram_iters = |d: usize| mapping.factors[d][LEVEL_DRAM];
        let dram_accesses: u64 = TENSORS
            .iter()
            .map(|&t| t.footprint(&buffer_tile) * refetches(t, &mapping.order, dram_iters))
            .sum();

        let spatial_tile = mapping.tile(LEVEL_SPATIAL);
        let outer_iters =
            |d: usize| mapping.factors[d][LEVEL_BUFFER] * mapping.factors[d][LEVEL_DRAM];
        let buffer_accesses: u64 = TENSORS
            .iter()
            .map(|&t| t.footprint(&spatial_tile) * refetches(t, &mapping.order, outer_iters))
            .sum();

        let compute_cycles = (macs / mapping.spatial_fanout() as f64).ceil();
        let memory_cycles = (dram_accesses as f64 / DRAM_WORDS_PER_CYCLE).ceil();
        let cycles = compute_cycles.max(memory_cycles);

        let energy_pj = macs * (MAC_ENERGY + 3.0 * REGISTER_ENERGY)
            + dram_accesses as f64 * DRAM_ENERGY
            + buffer_accesses as f64 * BUFFER_ENERGY;

        CostBreakdown {
            energy_pj,
            cycles,
            dram_accesses: dram_accesses as f64,
            buffer_accesses: buffer_accesses as f64,
        }
    }

    /// Lower bound on every component: each tensor crosses DRAM and the
    /// buffer exactly once and every PE is busy every cycle.
    fn oracle_breakdown(&self) -> CostBreakdown {
        let layer = &self.problem.layer;
        let macs = layer.macs() as f64;
        let full = layer.bounds();
        let compulsory: u64 = TENSORS.iter().map(|t| t.footprint(&full)).sum();

        let compute_cycles = (macs / self.problem.hardware.num_pes as f64).ceil();
        let memory_cycles = (compulsory as f64 / DRAM_WORDS_PER_CYCLE).ceil();

        CostBreakdown {
            energy_pj: macs * (MAC_ENERGY + 3.0 * REGISTER_ENERGY)
                + compulsory as f64 * (DRAM_ENERGY + BUFFER_ENERGY),
            cycles: compute_cycles.max(memory_cycles),
            dram_accesses: compulsory as f64,
            buffer_accesses: compulsory as f64,
        }
    }
}

impl CostModel for AnalyticCostModel {
    type Mapping = Mapping;

    fn oracle_cost(&self, metric: Metric) -> Result<Vec<f64>, CostModelError> {
        Ok(self.oracle_breakdown().to_vector(metric))
    }

    fn map_cost(
        &self,
        metric: Metric,
        worker: &mut Worker,
    ) -> Result<(Mapping, Vec<f64>), CostModelError> {
        let mapping = self.sample_mapping(worker.rng());
        self.check_fits(&mapping)?;
        let cost = self.evaluate(&mapping).to_vector(metric);
        if let Some(bad) = cost.iter().find(|c| !c.is_finite()) {
            return Err(CostModelError::Evaluation(format!(
                "non-finite cost component {}",
                bad
            )));
        }
        Ok((mapping, cost))
    }

    fn input_vector(&self, mapping: &Mapping) -> Vec<f32> {
        let bounds = self.problem.layer.bounds();
        let hw = &self.problem.hardware;
        let mut v = Vec::with_capacity(INPUT_DIM);

        v.extend(bounds.iter().map(|&b| log_scaled(b as u64)));

        for (d, factors) in mapping.factors.iter().enumerate() {
            let total = (bounds[d] as f32).log2();
            for &f in factors {
                // Share of the dimension's log-extent spent at this level.
                v.push(if total > 0.0 { (f as f32).log2() / total } else { 0.0 });
            }
        }

        let mut position = [0f32; NUM_DIMS];
        for (pos, &d) in mapping.order.iter().enumerate() {
            position[d] = pos as f32 / (NUM_DIMS - 1) as f32;
        }
        v.extend_from_slice(&position);

        v.push(log_scaled(hw.num_pes as u64));
        v.push(log_scaled(hw.buffer_words));
        v.push(log_scaled(hw.register_words));
        v
    }
}

/// Times a tensor's tile is refetched across the loops described by `iters`,
/// walking `order` outermost first.
fn refetches(tensor: Tensor, order: &[usize; NUM_DIMS], iters: impl Fn(usize) -> u32) -> u64 {
    let innermost = order
        .iter()
        .rposition(|&d| tensor.indexed_by(d) && iters(d) > 1);
    match innermost {
        Some(pos) => order[..=pos].iter().map(|&d| iters(d) as u64).product(),
        None => 1,
    }
}

fn pick_divisor<R: Rng + ?Sized>(n: u32, cap: u32, rng: &mut R) -> u32 {
    let divisors: Vec<u32> = (1..=n.min(cap)).filter(|d| n % d == 0).collect();
    divisors.choose(rng).copied().unwrap_or(1)
}

fn log_scaled(x: u64) -> f32 {
    (x.max(1) as f32).log2() / LOG2_SCALE
}
