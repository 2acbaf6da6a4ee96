// src/lib.rs

//! Training data generation for surrogate mapping cost models.
//!
//! One run draws a single problem, computes its oracle cost once, then fills
//! `num_files` dataset files in parallel with `(input vector, normalized
//! cost)` records sampled from a [`cost_model::CostModel`].

pub mod batch;
pub mod config;
pub mod cost_model;
pub mod dispatch;
pub mod error;
pub mod orchestrator;
pub mod problem;
pub mod record;
pub mod sampler;

#[cfg(test)]
mod testing;
