// src/problem.rs

//! Problem definitions: a convolution layer plus the accelerator it must be
//! mapped onto, and a seeded random generator for them.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of loop dimensions in a convolution layer.
pub const NUM_DIMS: usize = 7;

/// Loop dimension names, in the order used by [`LayerShape::bounds`].
pub const DIM_NAMES: [&str; NUM_DIMS] = ["N", "K", "C", "R", "S", "P", "Q"];

/// Index of each dimension within a bounds array.
pub mod dim {
    pub const N: usize = 0;
    pub const K: usize = 1;
    pub const C: usize = 2;
    pub const R: usize = 3;
    pub const S: usize = 4;
    pub const P: usize = 5;
    pub const Q: usize = 6;
}

/// Convolution layer bounds (unit stride).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LayerShape {
    /// Batch size.
    pub n: u32,
    /// Output channels.
    pub k: u32,
    /// Input channels.
    pub c: u32,
    /// Filter height.
    pub r: u32,
    /// Filter width.
    pub s: u32,
    /// Output height.
    pub p: u32,
    /// Output width.
    pub q: u32,
}

impl LayerShape {
    pub fn bounds(&self) -> [u32; NUM_DIMS] {
        [self.n, self.k, self.c, self.r, self.s, self.p, self.q]
    }

    /// Multiply-accumulate operations in the layer.
    pub fn macs(&self) -> u64 {
        self.bounds().iter().map(|&b| b as u64).product()
    }
}

/// Accelerator resources a mapping has to fit into.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Hardware {
    /// Processing elements in the spatial array.
    pub num_pes: u32,
    /// Capacity of the shared global buffer, in words.
    pub buffer_words: u64,
    /// Capacity of each PE's register file, in words.
    pub register_words: u64,
}

/// One workload/hardware configuration. Immutable once generated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Problem {
    pub layer: LayerShape,
    pub hardware: Hardware,
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bounds = self.layer.bounds();
        write!(f, "layer:")?;
        for (name, bound) in DIM_NAMES.iter().zip(bounds.iter()) {
            write!(f, " {}={}", name, bound)?;
        }
        writeln!(f)?;
        writeln!(f, "macs: {}", self.layer.macs())?;
        writeln!(
            f,
            "hardware: num_pes={} buffer_words={} register_words={}",
            self.hardware.num_pes, self.hardware.buffer_words, self.hardware.register_words
        )
    }
}

/// Source of problems for a run.
pub trait ProblemGenerator {
    fn generate(&mut self) -> Problem;
}

// Choice tables loosely follow common CNN layers and small edge accelerators.
const BATCH_CHOICES: &[u32] = &[1, 2, 4, 8, 16];
const CHANNEL_CHOICES: &[u32] = &[16, 32, 64, 96, 128, 256];
const FILTER_CHOICES: &[u32] = &[1, 3, 5, 7];
const OUTPUT_CHOICES: &[u32] = &[7, 14, 28, 56];
const PE_CHOICES: &[u32] = &[64, 128, 168, 256];
const BUFFER_CHOICES: &[u64] = &[16 * 1024, 32 * 1024, 64 * 1024, 128 * 1024];
const REGISTER_CHOICES: &[u64] = &[64, 128, 256, 512];

/// Draws problems uniformly from fixed choice tables.
pub struct RandomProblemGenerator {
    rng: StdRng,
}

impl RandomProblemGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn pick<T: Copy>(&mut self, choices: &[T]) -> T {
        // Choice tables are non-empty constants.
        *choices.choose(&mut self.rng).unwrap_or(&choices[0])
    }
}

impl ProblemGenerator for RandomProblemGenerator {
    fn generate(&mut self) -> Problem {
        let filter = self.pick(FILTER_CHOICES);
        let output = self.pick(OUTPUT_CHOICES);
        let layer = LayerShape {
            n: self.pick(BATCH_CHOICES),
            k: self.pick(CHANNEL_CHOICES),
            c: self.pick(CHANNEL_CHOICES),
            r: filter,
            s: filter,
            p: output,
            q: output,
        };
        let hardware = Hardware {
            num_pes: self.pick(PE_CHOICES),
            buffer_words: self.pick(BUFFER_CHOICES),
            register_words: self.pick(REGISTER_CHOICES),
        };
        Problem { layer, hardware }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_should_draw_the_same_problem_for_the_same_seed() {
        let a = RandomProblemGenerator::new(7).generate();
        let b = RandomProblemGenerator::new(7).generate();
        assert_eq!(a, b);
    }

    #[test]
    fn it_should_draw_bounds_from_the_choice_tables() {
        let mut generator = RandomProblemGenerator::new(11);
        for _ in 0..32 {
            let problem = generator.generate();
            assert!(BATCH_CHOICES.contains(&problem.layer.n));
            assert!(CHANNEL_CHOICES.contains(&problem.layer.k));
            assert!(CHANNEL_CHOICES.contains(&problem.layer.c));
            assert_eq!(problem.layer.r, problem.layer.s);
            assert_eq!(problem.layer.p, problem.layer.q);
            assert!(PE_CHOICES.contains(&problem.hardware.num_pes));
        }
    }

    #[test]
    fn it_should_render_every_bound_in_the_problem_log() {
        let problem = Problem {
            layer: LayerShape { n: 1, k: 16, c: 32, r: 3, s: 3, p: 14, q: 14 },
            hardware: Hardware { num_pes: 64, buffer_words: 16384, register_words: 64 },
        };
        let text = problem.to_string();
        assert!(text.contains("N=1 K=16 C=32 R=3 S=3 P=14 Q=14"));
        assert!(text.contains("macs: 903168"));
        assert!(text.contains("num_pes=64 buffer_words=16384 register_words=64"));
    }
}
