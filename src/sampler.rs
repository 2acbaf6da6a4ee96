// src/sampler.rs

//! Resilient sampling: keeps asking the cost model for a mapping until one
//! evaluates successfully.
//!
//! There is no retry limit and no backoff. A cost model that never succeeds
//! blocks the calling worker forever.

use std::fmt::Display;

use crate::cost_model::{CostModel, Metric, Worker, WorkerId};

/// One successfully evaluated mapping.
#[derive(Debug, Clone)]
pub struct Sample<M> {
    pub mapping: M,
    pub raw_cost: Vec<f64>,
    /// Failed attempts absorbed before this sample succeeded.
    pub failures: usize,
}

/// Runs `attempt` until it returns `Ok`, logging every failure.
///
/// Returns the value together with the number of failed attempts.
pub fn retry_until_ok<T, E, F>(worker: WorkerId, mut attempt: F) -> (T, usize)
where
    E: Display,
    F: FnMut() -> Result<T, E>,
{
    let mut failures = 0usize;
    loop {
        match attempt() {
            Ok(value) => return (value, failures),
            Err(e) => {
                failures += 1;
                log::warn!("{}: sampling attempt {} failed: {}", worker, failures, e);
            }
        }
    }
}

pub struct ResilientSampler<'a, C: CostModel> {
    model: &'a C,
    metric: Metric,
}

impl<'a, C: CostModel> ResilientSampler<'a, C> {
    pub fn new(model: &'a C, metric: Metric) -> Self {
        Self { model, metric }
    }

    /// Draws one `(mapping, cost)` pair using the worker's random stream.
    pub fn sample(&self, worker: &mut Worker) -> Sample<C::Mapping> {
        let id = worker.id();
        let ((mapping, raw_cost), failures) =
            retry_until_ok(id, || self.model.map_cost(self.metric, worker));
        Sample {
            mapping,
            raw_cost,
            failures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CostModelError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use test_log::test;

    /// Fails the first `failures` calls, then returns a fixed sample.
    struct FlakyModel {
        failures: usize,
        calls: AtomicUsize,
    }

    impl CostModel for FlakyModel {
        type Mapping = usize;

        fn oracle_cost(&self, _metric: Metric) -> Result<Vec<f64>, CostModelError> {
            Ok(vec![1.0])
        }

        fn map_cost(
            &self,
            _metric: Metric,
            _worker: &mut Worker,
        ) -> Result<(usize, Vec<f64>), CostModelError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(CostModelError::Unmappable(format!("call {}", call)))
            } else {
                Ok((call, vec![4.0, 8.0]))
            }
        }

        fn input_vector(&self, mapping: &usize) -> Vec<f32> {
            vec![*mapping as f32]
        }
    }

    #[test]
    fn it_should_return_the_first_success_and_count_k_failures() {
        for k in [0usize, 1, 5] {
            let model = FlakyModel { failures: k, calls: AtomicUsize::new(0) };
            let sampler = ResilientSampler::new(&model, Metric::Raw);
            let mut worker = Worker::new(WorkerId(0), 0);

            let sample = sampler.sample(&mut worker);
            assert_eq!(sample.failures, k);
            assert_eq!(sample.mapping, k);
            assert_eq!(sample.raw_cost, vec![4.0, 8.0]);
            assert_eq!(model.calls.load(Ordering::SeqCst), k + 1);
        }
    }

    #[test]
    fn it_should_retry_a_single_failure_and_return_the_second_result() {
        let mut calls = 0;
        let (value, failures) = retry_until_ok(WorkerId(3), || {
            calls += 1;
            if calls == 1 {
                Err("first call fails")
            } else {
                Ok(calls * 10)
            }
        });
        assert_eq!(value, 20);
        assert_eq!(failures, 1);
    }
}
