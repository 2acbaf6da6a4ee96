// src/dispatch.rs

//! Work dispatch across a pool of scoped worker threads.
//!
//! Workers race for unit indices through a shared atomic counter, the same
//! scheme as work-stealing row rendering: no channels, no per-unit
//! allocation, one `fetch_add` per claim. Each worker carries an explicit
//! [`WorkerId`] for the whole dispatch.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread;

use crate::cost_model::WorkerId;
use crate::error::{DataGenError, Result};

/// Worker count for a dispatch: the requested value or the host's available
/// parallelism, clamped to `[1, total_units]`.
pub fn resolve_concurrency(requested: Option<usize>, total_units: usize) -> usize {
    let wanted = requested.unwrap_or_else(|| {
        thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    });
    wanted.clamp(1, total_units.max(1))
}

/// Runs `unit(worker, index)` once for every index in `0..total_units`.
///
/// Blocks until every worker has joined. The first failing unit stops
/// workers from claiming further indices and its error is returned; units
/// already running finish normally. A panicking unit is reported as
/// [`DataGenError::WorkerPanicked`]. On success the results are ordered by
/// unit index, not completion order.
pub fn dispatch<T, F>(total_units: usize, concurrency: Option<usize>, unit: F) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(WorkerId, usize) -> Result<T> + Sync,
{
    if total_units == 0 {
        return Ok(Vec::new());
    }
    let num_workers = resolve_concurrency(concurrency, total_units);
    log::info!(
        "Dispatching {} units across {} workers",
        total_units,
        num_workers
    );

    let next_unit = AtomicUsize::new(0);
    let failed = AtomicBool::new(false);
    let first_error: Mutex<Option<DataGenError>> = Mutex::new(None);
    let results: Mutex<Vec<Option<T>>> = Mutex::new((0..total_units).map(|_| None).collect());

    let record_failure = |err: DataGenError| {
        failed.store(true, Ordering::Release);
        let mut slot = first_error.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(err);
        }
    };

    thread::scope(|s| {
        let next_unit = &next_unit;
        let failed = &failed;
        let results = &results;
        let record_failure = &record_failure;
        let unit = &unit;

        let mut handles = Vec::with_capacity(num_workers);
        for w in 0..num_workers {
            let id = WorkerId(w);
            let spawned = thread::Builder::new()
                .name(format!("datagen-{}", w))
                .spawn_scoped(s, move || loop {
                    if failed.load(Ordering::Acquire) {
                        break;
                    }
                    let index = next_unit.fetch_add(1, Ordering::Relaxed);
                    if index >= total_units {
                        break;
                    }
                    match panic::catch_unwind(AssertUnwindSafe(|| unit(id, index))) {
                        Ok(Ok(value)) => {
                            results.lock().unwrap_or_else(PoisonError::into_inner)[index] =
                                Some(value);
                        }
                        Ok(Err(e)) => {
                            log::error!("{}: unit {} failed: {}", id, index, e);
                            record_failure(e);
                            break;
                        }
                        Err(_) => {
                            log::error!("{}: unit {} panicked", id, index);
                            record_failure(DataGenError::WorkerPanicked(w));
                            break;
                        }
                    }
                });
            match spawned {
                Ok(handle) => handles.push((w, handle)),
                Err(source) => {
                    record_failure(DataGenError::WorkerSpawn { worker: w, source });
                    break;
                }
            }
        }

        for (w, handle) in handles {
            if handle.join().is_err() {
                record_failure(DataGenError::WorkerPanicked(w));
            }
        }
    });

    if let Some(err) = first_error
        .into_inner()
        .unwrap_or_else(PoisonError::into_inner)
    {
        return Err(err);
    }

    // Without a recorded failure every slot was filled.
    Ok(results
        .into_inner()
        .unwrap_or_else(PoisonError::into_inner)
        .into_iter()
        .flatten()
        .collect())
}
